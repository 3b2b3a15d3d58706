use crate::entities::entity::{Entity, EntityBody, EntityKey, EntityRef, PublicId};
use crate::world::position::{Position, TilePos, TILE_SIZE};
use crate::world::viewport::Viewport;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

/// Where entities placed outside the zone end up.
pub const FALLBACK_POSITION: Position = Position::new(100, 100);

/// Highest public id a zone hands out; 0 and 65535 are reserved on the wire.
pub const MAX_CAPACITY: u16 = u16::MAX - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub u16);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    #[error("zone {zone} is full ({capacity} public ids in use)")]
    ZoneFull { zone: ZoneId, capacity: u16 },
    #[error("unknown zone {0}")]
    UnknownZone(ZoneId),
    #[error("zone {0} is not hosted by this server")]
    NotHosted(ZoneId),
    #[error("structural change requested while a tick is in progress")]
    TickInProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFilter {
    All,
    Beings,
    Characters,
    /// Ground items and effects.
    Fixed,
}

impl QueryFilter {
    pub fn accepts(self, entity: &Entity) -> bool {
        match self {
            QueryFilter::All => true,
            QueryFilter::Beings => entity.being().is_some(),
            QueryFilter::Characters => entity.as_character().is_some(),
            QueryFilter::Fixed => {
                matches!(entity.body(), EntityBody::Item(_) | EntityBody::Effect(_))
            }
        }
    }
}

type BucketKey = (u16, u16);

/// One independently simulated map and the registry of everything on it.
#[derive(Debug)]
pub struct Zone {
    id: ZoneId,
    name: String,
    width: u16,
    height: u16,
    capacity: u16,
    bucket_size: u16,
    pub hosted: bool,
    pub pinned: bool,
    slots: BTreeMap<PublicId, Entity>,
    keys: HashMap<EntityKey, PublicId>,
    buckets: HashMap<BucketKey, BTreeSet<PublicId>>,
    bucket_of: HashMap<PublicId, BucketKey>,
    moved: BTreeSet<PublicId>,
    characters: usize,
}

impl Zone {
    /// `width` and `height` are in tiles.
    pub fn new(
        id: ZoneId,
        name: impl Into<String>,
        width: u16,
        height: u16,
        capacity: u16,
        bucket_size: u16,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            width,
            height,
            capacity: capacity.clamp(1, MAX_CAPACITY),
            bucket_size: bucket_size.max(TILE_SIZE),
            hosted: true,
            pinned: false,
            slots: BTreeMap::new(),
            keys: HashMap::new(),
            buckets: HashMap::new(),
            bucket_of: HashMap::new(),
            moved: BTreeSet::new(),
            characters: 0,
        }
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn character_count(&self) -> usize {
        self.characters
    }

    /// Hosted here and either pinned or occupied by at least one character.
    pub fn is_active(&self) -> bool {
        self.hosted && (self.pinned || self.characters > 0)
    }

    pub fn contains_tile(&self, tile: TilePos) -> bool {
        tile.x < self.width && tile.y < self.height
    }

    pub fn contains(&self, position: Position) -> bool {
        self.contains_tile(position.tile())
    }

    /// Registers `entity` under the lowest free public id. Out-of-bounds
    /// positions are moved to [`FALLBACK_POSITION`]. On failure the entity
    /// is dropped.
    pub fn insert(&mut self, mut entity: Entity) -> Result<PublicId, InsertError> {
        if !self.hosted {
            tracing::error!(zone = %self.id, kind = ?entity.kind(), "zone not hosted, entity dropped");
            return Err(InsertError::NotHosted(self.id));
        }
        let Some(id) = self.free_id() else {
            tracing::error!(zone = %self.id, kind = ?entity.kind(), "zone full, entity dropped");
            return Err(InsertError::ZoneFull {
                zone: self.id,
                capacity: self.capacity,
            });
        };
        if !self.contains(entity.position()) {
            tracing::error!(
                zone = %self.id,
                x = entity.position().x,
                y = entity.position().y,
                "entity placed outside the zone, moved to fallback position"
            );
            entity.step_to(FALLBACK_POSITION);
        }
        entity.attach(self.id, id);
        if entity.as_character().is_some() {
            self.characters += 1;
        }
        let bucket = self.bucket_key(entity.position());
        self.keys.insert(entity.key(), id);
        self.buckets.entry(bucket).or_default().insert(id);
        self.bucket_of.insert(id, bucket);
        tracing::debug!(zone = %self.id, id = id.0, kind = ?entity.kind(), "entity inserted");
        self.slots.insert(id, entity);
        Ok(id)
    }

    /// Detaches the entity and frees its public id for reuse.
    pub fn remove(&mut self, id: PublicId) -> Option<Entity> {
        let mut entity = self.slots.remove(&id)?;
        self.keys.remove(&entity.key());
        if let Some(bucket) = self.bucket_of.remove(&id) {
            if let Some(members) = self.buckets.get_mut(&bucket) {
                members.remove(&id);
                if members.is_empty() {
                    self.buckets.remove(&bucket);
                }
            }
        }
        self.moved.remove(&id);
        if entity.as_character().is_some() {
            self.characters = self.characters.saturating_sub(1);
        }
        entity.detach();
        tracing::debug!(zone = %self.id, id = id.0, kind = ?entity.kind(), "entity removed");
        Some(entity)
    }

    pub fn remove_key(&mut self, key: EntityKey) -> Option<Entity> {
        let id = *self.keys.get(&key)?;
        self.remove(id)
    }

    pub fn get(&self, id: PublicId) -> Option<&Entity> {
        self.slots.get(&id)
    }

    pub fn get_mut(&mut self, id: PublicId) -> Option<&mut Entity> {
        self.slots.get_mut(&id)
    }

    pub fn id_of(&self, key: EntityKey) -> Option<PublicId> {
        self.keys.get(&key).copied()
    }

    pub fn get_by_key(&self, key: EntityKey) -> Option<&Entity> {
        self.id_of(key).and_then(|id| self.slots.get(&id))
    }

    pub fn get_by_key_mut(&mut self, key: EntityKey) -> Option<&mut Entity> {
        let id = self.id_of(key)?;
        self.slots.get_mut(&id)
    }

    /// `None` once the referenced entity is gone, even if its public id
    /// now belongs to someone else.
    pub fn resolve(&self, target: EntityRef) -> Option<&Entity> {
        self.slots
            .get(&target.id)
            .filter(|entity| entity.key() == target.key)
    }

    pub fn resolve_mut(&mut self, target: EntityRef) -> Option<&mut Entity> {
        self.slots
            .get_mut(&target.id)
            .filter(|entity| entity.key() == target.key)
    }

    /// Every entity, in public id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.slots.values()
    }

    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> + '_ {
        self.slots.values_mut()
    }

    pub fn ids(&self) -> Vec<PublicId> {
        self.slots.keys().copied().collect()
    }

    /// Entities whose current or previous-tick position lies within the
    /// square of half-width `radius` around `point`, sorted by public id.
    pub fn entities_within(
        &self,
        point: Position,
        radius: u16,
        filter: QueryFilter,
    ) -> Vec<PublicId> {
        let view = Viewport::around(point, radius);
        let (min_x, min_y) = self.bucket_key(view.min);
        let (max_x, max_y) = self.bucket_key(view.max);
        let mut found = BTreeSet::new();
        for bx in min_x..=max_x {
            for by in min_y..=max_y {
                if let Some(members) = self.buckets.get(&(bx, by)) {
                    found.extend(members.iter().copied());
                }
            }
        }
        found.extend(self.moved.iter().copied());
        found
            .into_iter()
            .filter(|id| {
                self.slots.get(id).is_some_and(|entity| {
                    filter.accepts(entity)
                        && (view.contains(entity.position())
                            || view.contains(entity.old_position()))
                })
            })
            .collect()
    }

    /// Moves entities whose position crossed a bucket boundary and records
    /// who moved this tick.
    pub(crate) fn rebucket(&mut self) {
        let bucket_size = self.bucket_size;
        for (id, entity) in &self.slots {
            if entity.position() != entity.old_position() {
                self.moved.insert(*id);
            }
            let bucket = bucket_for(entity.position(), bucket_size);
            let previous = self.bucket_of.insert(*id, bucket);
            if previous == Some(bucket) {
                continue;
            }
            if let Some(previous) = previous {
                if let Some(members) = self.buckets.get_mut(&previous) {
                    members.remove(id);
                    if members.is_empty() {
                        self.buckets.remove(&previous);
                    }
                }
            }
            self.buckets.entry(bucket).or_default().insert(*id);
        }
    }

    pub(crate) fn flush(&mut self) {
        for entity in self.slots.values_mut() {
            entity.flush();
        }
        self.moved.clear();
    }

    fn bucket_key(&self, position: Position) -> BucketKey {
        bucket_for(position, self.bucket_size)
    }

    fn free_id(&self) -> Option<PublicId> {
        let mut candidate: u16 = 1;
        for id in self.slots.keys() {
            if id.0 != candidate {
                break;
            }
            candidate = candidate.checked_add(1)?;
        }
        (candidate <= self.capacity).then_some(PublicId(candidate))
    }
}

fn bucket_for(position: Position, bucket_size: u16) -> BucketKey {
    (position.x / bucket_size, position.y / bucket_size)
}
