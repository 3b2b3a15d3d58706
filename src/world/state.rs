use crate::combat::damage::CombatRng;
use crate::config::WorldConfig;
use crate::entities::entity::{Entity, EntityBody, EntityKey, PublicId};
use crate::entities::item::ItemClassDb;
use crate::net::dispatch::Dispatch;
use crate::net::game;
use crate::persistence::accounts::{AccountConnection, CharacterSnapshot};
use crate::scripting::ZoneScript;
use crate::world::deferred::{DeferredQueue, DelayedEvent};
use crate::world::path::{Pathfinder, StraightPathfinder};
use crate::world::position::Position;
use crate::world::time::GameClock;
use crate::world::zone::{InsertError, QueryFilter, Zone, ZoneId};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("entity {0:?} is not on any zone")]
    UnknownEntity(EntityKey),
    #[error("structural change requested while a tick is in progress")]
    TickInProgress,
    #[error(transparent)]
    Insert(#[from] InsertError),
}

/// Everything one game server simulates, plus the collaborators it talks to.
pub struct GameState {
    pub(crate) zones: BTreeMap<ZoneId, Zone>,
    pub(crate) queue: DeferredQueue,
    pub(crate) visual_range: u16,
    pub(crate) items: ItemClassDb,
    pub(crate) dispatch: Box<dyn Dispatch>,
    pub(crate) accounts: Box<dyn AccountConnection>,
    pub(crate) scripts: HashMap<ZoneId, Box<dyn ZoneScript>>,
    pub(crate) pathfinder: Box<dyn Pathfinder>,
    pub(crate) clock: GameClock,
    pub(crate) combat_rng: CombatRng,
    pub(crate) in_tick: bool,
    next_key: u64,
}

impl GameState {
    pub fn new(
        config: &WorldConfig,
        dispatch: Box<dyn Dispatch>,
        accounts: Box<dyn AccountConnection>,
    ) -> Self {
        let zones = config
            .build_zones()
            .into_iter()
            .map(|zone| (zone.id(), zone))
            .collect();
        Self {
            zones,
            queue: DeferredQueue::default(),
            visual_range: config.visual_range,
            items: config.item_db(),
            dispatch,
            accounts,
            scripts: HashMap::new(),
            pathfinder: Box::new(StraightPathfinder),
            clock: GameClock::from_millis(config.tick_ms),
            combat_rng: CombatRng::from_seed(config.combat_seed),
            in_tick: false,
            next_key: 1,
        }
    }

    pub fn set_script(&mut self, zone: ZoneId, script: Box<dyn ZoneScript>) {
        self.scripts.insert(zone, script);
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(&id)
    }

    pub fn zone_mut(&mut self, id: ZoneId) -> Option<&mut Zone> {
        self.zones.get_mut(&id)
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> + '_ {
        self.zones.values()
    }

    pub fn visual_range(&self) -> u16 {
        self.visual_range
    }

    pub fn items(&self) -> &ItemClassDb {
        &self.items
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn locate(&self, key: EntityKey) -> Option<(ZoneId, PublicId)> {
        self.zones
            .values()
            .find_map(|zone| zone.id_of(key).map(|id| (zone.id(), id)))
    }

    pub fn entity(&self, key: EntityKey) -> Option<&Entity> {
        self.zones.values().find_map(|zone| zone.get_by_key(key))
    }

    pub fn entity_mut(&mut self, key: EntityKey) -> Option<&mut Entity> {
        self.zones
            .values_mut()
            .find_map(|zone| zone.get_by_key_mut(key))
    }

    fn ensure_key(&mut self, entity: &mut Entity) -> EntityKey {
        if entity.key() == EntityKey::default() {
            entity.assign_key(EntityKey(self.next_key));
            self.next_key += 1;
        }
        entity.key()
    }

    fn check_unlocked(&self) -> Result<(), InsertError> {
        if cfg!(debug_assertions) && self.in_tick {
            return Err(InsertError::TickInProgress);
        }
        Ok(())
    }

    /// Places an entity on its zone right away. Characters get the map
    /// change message and are reported online.
    pub fn insert(&mut self, mut entity: Entity) -> Result<EntityKey, InsertError> {
        self.check_unlocked()?;
        let key = self.ensure_key(&mut entity);
        let zone_id = entity.zone();
        let zone = self
            .zones
            .get_mut(&zone_id)
            .ok_or(InsertError::UnknownZone(zone_id))?;
        let id = zone.insert(entity)?;
        let Some(entity) = zone.get(id) else {
            return Ok(key);
        };
        if let Some(character) = entity.as_character() {
            let message = game::player_map_change(zone.name(), entity.position());
            self.dispatch.send_to(character.connection, &message);
            self.accounts
                .update_online_status(character.database_id, true);
            tracing::info!(zone = %zone_id, id = id.0, name = entity.name().unwrap_or(""), "character entered zone");
        }
        Ok(key)
    }

    /// Like [`GameState::insert`], but a failure destroys the entity and
    /// drops the client of a character.
    pub fn insert_safe(&mut self, entity: Entity) -> bool {
        let connection = entity.as_character().map(|character| character.connection);
        match self.insert(entity) {
            Ok(_) => true,
            Err(err) => {
                tracing::error!("insert failed: {err}");
                if let Some(connection) = connection {
                    self.dispatch.kill(connection);
                }
                false
            }
        }
    }

    /// Detaches an entity from its zone and tells nearby characters it is
    /// gone. The entity is handed back to the caller.
    pub fn remove(&mut self, key: EntityKey) -> Result<Entity, StateError> {
        if self.check_unlocked().is_err() {
            return Err(StateError::TickInProgress);
        }
        let (zone_id, id) = self.locate(key).ok_or(StateError::UnknownEntity(key))?;
        let range = self.visual_range;
        let zone = self
            .zones
            .get_mut(&zone_id)
            .ok_or(StateError::UnknownEntity(key))?;
        let entity = zone.remove(id).ok_or(StateError::UnknownEntity(key))?;
        let position = entity.position();

        let notice = if entity.capabilities().movable {
            Some(game::being_leave(id))
        } else if let EntityBody::Item(_) = entity.body() {
            Some(game::items(0, position))
        } else {
            None
        };
        if let Some(notice) = notice {
            for other in zone.entities_within(position, range, QueryFilter::Characters) {
                let Some(observer) = zone.get(other) else {
                    continue;
                };
                if !observer.position().in_range_of(position, range) {
                    continue;
                }
                if let Some(character) = observer.as_character() {
                    self.dispatch.send_to(character.connection, &notice);
                }
            }
        }
        if let Some(character) = entity.as_character() {
            self.accounts
                .update_online_status(character.database_id, false);
            tracing::info!(zone = %zone_id, id = id.0, name = entity.name().unwrap_or(""), "character left zone");
        }
        Ok(entity)
    }

    /// Moves an entity to another zone or position. A character whose
    /// destination is not hosted here is redirected to another server.
    pub fn warp(
        &mut self,
        key: EntityKey,
        zone: ZoneId,
        position: Position,
    ) -> Result<(), StateError> {
        let mut entity = self.remove(key)?;
        entity.set_zone(zone);
        entity.set_position(position);
        if let Some(snapshot) = CharacterSnapshot::capture(&entity) {
            self.accounts.send_character_data(snapshot);
        }
        let hosted = self.zones.get(&zone).is_some_and(|target| target.hosted);
        if hosted {
            self.insert_safe(entity);
            return Ok(());
        }
        match entity.as_character() {
            Some(character) => {
                tracing::info!(zone = %zone, database_id = character.database_id, "redirecting character");
                self.accounts.redirect(character.database_id);
                self.dispatch.prepare_server_change(character.connection);
            }
            None => {
                tracing::warn!(zone = %zone, kind = ?entity.kind(), "warp target not hosted, entity dropped");
            }
        }
        Ok(())
    }

    /// Queues an insert for the end of the tick. Returns the key the entity
    /// will be known by.
    pub fn enqueue_insert(&mut self, mut entity: Entity) -> EntityKey {
        let key = self.ensure_key(&mut entity);
        self.queue.enqueue_insert(entity);
        key
    }

    pub fn enqueue_remove(&mut self, key: EntityKey) {
        self.queue.enqueue_remove(key);
    }

    pub fn enqueue_warp(&mut self, key: EntityKey, zone: ZoneId, position: Position) {
        self.queue.enqueue_warp(key, zone, position);
    }

    /// Applies every queued structural change. Returns how many were taken.
    pub(crate) fn drain_deferred(&mut self) -> usize {
        let events = self.queue.take();
        let count = events.len();
        for (key, event) in events {
            match event {
                DelayedEvent::Remove => match self.remove(key) {
                    Ok(entity) => {
                        if let Some(character) = entity.as_character() {
                            self.dispatch.kill(character.connection);
                        }
                    }
                    Err(err) => tracing::debug!("deferred remove skipped: {err}"),
                },
                DelayedEvent::Insert(entity) => {
                    self.insert_safe(*entity);
                }
                DelayedEvent::Warp { zone, position } => {
                    if let Err(err) = self.warp(key, zone, position) {
                        tracing::warn!("deferred warp skipped: {err}");
                    }
                }
            }
        }
        count
    }

    /// Sends `text` from `speaker` to every character that can see it.
    pub fn say_around(&mut self, speaker: EntityKey, text: &str) {
        let Some((zone_id, _)) = self.locate(speaker) else {
            return;
        };
        let range = self.visual_range;
        let Some(zone) = self.zones.get(&zone_id) else {
            return;
        };
        let Some(source) = zone.get_by_key(speaker) else {
            return;
        };
        let position = source.position();
        let message = game::say(speaker_id(Some(source)), text);
        for id in zone.entities_within(position, range, QueryFilter::Characters) {
            let Some(listener) = zone.get(id) else {
                continue;
            };
            if !listener.position().in_range_of(position, range) {
                continue;
            }
            if let Some(character) = listener.as_character() {
                self.dispatch.send_to(character.connection, &message);
            }
        }
    }

    /// Only characters can be told anything; `source` `None` is the server.
    pub fn say_to(&mut self, destination: EntityKey, source: Option<EntityKey>, text: &str) {
        let Some(connection) = self
            .entity(destination)
            .and_then(Entity::as_character)
            .map(|character| character.connection)
        else {
            return;
        };
        let message = game::say(speaker_id(source.and_then(|key| self.entity(key))), text);
        self.dispatch.send_to(connection, &message);
    }

    pub fn say_to_all(&mut self, text: &str) {
        self.dispatch
            .send_to_everyone(&game::say(PublicId::SERVER, text));
    }
}

fn speaker_id(source: Option<&Entity>) -> PublicId {
    match source {
        None => PublicId::SERVER,
        Some(entity) if !entity.capabilities().movable => PublicId::ANONYMOUS,
        Some(entity) => entity.public_id().unwrap_or(PublicId::ANONYMOUS),
    }
}
