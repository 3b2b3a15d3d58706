use crate::entities::being::Action;
use crate::entities::effects::StatusEffectId;
use crate::entities::entity::{Entity, EntityRef};
use crate::entities::stats::AttributeId;
use crate::world::position::{Direction, Position};
use crate::world::time::GameTick;
use crate::world::zone::{Zone, ZoneId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("script failed: {0}")]
    Failed(String),
    #[error("script panicked: {0}")]
    Panicked(String),
}

/// Read-only look at a zone handed to its script once per tick.
#[derive(Debug, Clone, Copy)]
pub struct ZoneView<'a> {
    pub zone: &'a Zone,
    pub tick: GameTick,
}

impl<'a> ZoneView<'a> {
    pub fn entities(&self) -> impl Iterator<Item = &'a Entity> + 'a {
        self.zone.entities()
    }

    pub fn resolve(&self, target: EntityRef) -> Option<&'a Entity> {
        self.zone.resolve(target)
    }
}

/// What a script asks the zone to do. Requests are applied in order after
/// the script returns, and only if it returns `Ok`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptAction {
    Walk {
        entity: EntityRef,
        destination: Position,
    },
    SetAction {
        entity: EntityRef,
        action: Action,
    },
    Face {
        entity: EntityRef,
        direction: Direction,
    },
    Attack {
        entity: EntityRef,
        target: EntityRef,
    },
    StopAttack {
        entity: EntityRef,
    },
    Damage {
        entity: EntityRef,
        amount: u16,
    },
    Modify {
        entity: EntityRef,
        attribute: AttributeId,
        value: i32,
        duration: u32,
        level: u8,
    },
    Dispel {
        entity: EntityRef,
        level: u8,
    },
    ApplyStatus {
        entity: EntityRef,
        status: StatusEffectId,
        ticks: u32,
    },
    Say {
        speaker: EntityRef,
        text: String,
    },
    Spawn(Box<Entity>),
    Despawn(EntityRef),
    Warp {
        entity: EntityRef,
        zone: ZoneId,
        position: Position,
    },
    Effect {
        effect_id: u16,
        position: Position,
        being: Option<EntityRef>,
    },
}

pub trait ZoneScript {
    fn update(&mut self, view: &ZoneView<'_>) -> Result<Vec<ScriptAction>, ScriptError>;
}

/// Adapter so plain closures can serve as zone scripts.
pub struct FnScript<F>(pub F);

impl<F> ZoneScript for FnScript<F>
where
    F: FnMut(&ZoneView<'_>) -> Result<Vec<ScriptAction>, ScriptError>,
{
    fn update(&mut self, view: &ZoneView<'_>) -> Result<Vec<ScriptAction>, ScriptError> {
        (self.0)(view)
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
