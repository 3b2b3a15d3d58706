use crate::entities::entity::{Entity, EntityKey};
use crate::world::position::Position;
use crate::world::zone::ZoneId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelayedEvent {
    Insert(Box<Entity>),
    Remove,
    Warp { zone: ZoneId, position: Position },
}

/// Structural changes requested during a tick. At most one event is kept
/// per entity: the first one queued wins, except that a removal overrides
/// anything else pending for it.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    events: BTreeMap<EntityKey, DelayedEvent>,
}

impl DeferredQueue {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn pending(&self, key: EntityKey) -> Option<&DelayedEvent> {
        self.events.get(&key)
    }

    /// The entity must already carry its key.
    pub fn enqueue_insert(&mut self, entity: Entity) {
        let key = entity.key();
        if let Some(pending) = self.events.get(&key) {
            tracing::debug!(key = key.0, ?pending, "insert ignored, event already pending");
            return;
        }
        self.events
            .insert(key, DelayedEvent::Insert(Box::new(entity)));
    }

    /// Returns the entity of a pending insert that this removal cancelled.
    pub fn enqueue_remove(&mut self, key: EntityKey) -> Option<Entity> {
        match self.events.insert(key, DelayedEvent::Remove) {
            Some(DelayedEvent::Insert(entity)) => Some(*entity),
            _ => None,
        }
    }

    pub fn enqueue_warp(&mut self, key: EntityKey, zone: ZoneId, position: Position) {
        if let Some(pending) = self.events.get(&key) {
            tracing::debug!(key = key.0, zone = %zone, ?pending, "warp ignored, event already pending");
            return;
        }
        self.events
            .insert(key, DelayedEvent::Warp { zone, position });
    }

    /// Hands over every pending event in key order.
    pub fn take(&mut self) -> Vec<(EntityKey, DelayedEvent)> {
        std::mem::take(&mut self.events).into_iter().collect()
    }
}
