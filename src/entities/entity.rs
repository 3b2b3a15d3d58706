use crate::entities::being::{Action, Being, BeingRole, Character, MonsterInfo, NpcInfo};
use crate::entities::inventory::EquipSlot;
use crate::entities::item::ItemClassId;
use crate::world::position::{Direction, Position};
use crate::world::zone::ZoneId;

/// Server-wide serial assigned when an entity first enters the game state.
/// Never reused, unlike [`PublicId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EntityKey(pub u64);

/// Identifier clients see. Unique within a zone while the entity is on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicId(pub u16);

impl PublicId {
    pub const SERVER: PublicId = PublicId(0);
    pub const ANONYMOUS: PublicId = PublicId(u16::MAX);
}

/// Entity kind as sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Item = 0,
    Generic = 1,
    Npc = 2,
    Monster = 3,
    Character = 4,
    Effect = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub movable: bool,
    pub fightable: bool,
    pub speaks: bool,
}

impl EntityKind {
    pub fn wire(self) -> u8 {
        self as u8
    }

    pub fn capabilities(self) -> Capabilities {
        let (movable, fightable, speaks) = match self {
            EntityKind::Character => (true, true, true),
            EntityKind::Monster => (true, true, false),
            EntityKind::Npc => (true, false, true),
            EntityKind::Item | EntityKind::Generic | EntityKind::Effect => (false, false, false),
        };
        Capabilities {
            movable,
            fightable,
            speaks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateFlag {
    NewOnMap,
    PositionChanged,
    DirectionChanged,
    LooksChanged,
    ActionChanged,
    Attack,
    HealthChanged,
}

/// What changed on an entity during the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateFlags {
    pub new_on_map: bool,
    pub position_changed: bool,
    pub direction_changed: bool,
    pub looks_changed: bool,
    pub action_changed: bool,
    pub attack: bool,
    pub health_changed: bool,
}

impl UpdateFlags {
    fn slot(&mut self, flag: UpdateFlag) -> &mut bool {
        match flag {
            UpdateFlag::NewOnMap => &mut self.new_on_map,
            UpdateFlag::PositionChanged => &mut self.position_changed,
            UpdateFlag::DirectionChanged => &mut self.direction_changed,
            UpdateFlag::LooksChanged => &mut self.looks_changed,
            UpdateFlag::ActionChanged => &mut self.action_changed,
            UpdateFlag::Attack => &mut self.attack,
            UpdateFlag::HealthChanged => &mut self.health_changed,
        }
    }

    pub fn raise(&mut self, flag: UpdateFlag) {
        *self.slot(flag) = true;
    }

    pub fn is_raised(&self, flag: UpdateFlag) -> bool {
        let mut copy = *self;
        *copy.slot(flag)
    }

    pub fn any(&self) -> bool {
        *self != UpdateFlags::default()
    }

    pub fn clear(&mut self) {
        *self = UpdateFlags::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroundItem {
    pub class: ItemClassId,
    pub amount: u16,
}

/// One-shot visual effect, either on the ground or attached to a being.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectInstance {
    pub effect_id: u16,
    pub being: Option<EntityRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityBody {
    Being(Box<Being>),
    Item(GroundItem),
    Effect(EffectInstance),
    Generic,
}

/// Weak reference to an entity on a zone. It resolves to nothing once the
/// entity leaves or its public id is recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: PublicId,
    pub key: EntityKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    key: EntityKey,
    public_id: Option<PublicId>,
    zone: ZoneId,
    position: Position,
    old_position: Position,
    flags: UpdateFlags,
    body: EntityBody,
}

impl Entity {
    pub fn new(zone: ZoneId, position: Position, body: EntityBody) -> Self {
        Self {
            key: EntityKey::default(),
            public_id: None,
            zone,
            position,
            old_position: position,
            flags: UpdateFlags::default(),
            body,
        }
    }

    pub fn character(
        name: impl Into<String>,
        character: Character,
        zone: ZoneId,
        position: Position,
    ) -> Self {
        let being = Being::new(name, BeingRole::Character(character));
        Self::new(zone, position, EntityBody::Being(Box::new(being)))
    }

    pub fn monster(name: impl Into<String>, species: u16, zone: ZoneId, position: Position) -> Self {
        let being = Being::new(name, BeingRole::Monster(MonsterInfo { species }));
        Self::new(zone, position, EntityBody::Being(Box::new(being)))
    }

    pub fn npc(name: impl Into<String>, npc_id: u16, zone: ZoneId, position: Position) -> Self {
        let being = Being::new(name, BeingRole::Npc(NpcInfo { npc_id }));
        Self::new(zone, position, EntityBody::Being(Box::new(being)))
    }

    pub fn item(class: ItemClassId, amount: u16, zone: ZoneId, position: Position) -> Self {
        Self::new(
            zone,
            position,
            EntityBody::Item(GroundItem { class, amount }),
        )
    }

    pub fn effect(
        effect_id: u16,
        being: Option<EntityRef>,
        zone: ZoneId,
        position: Position,
    ) -> Self {
        Self::new(
            zone,
            position,
            EntityBody::Effect(EffectInstance { effect_id, being }),
        )
    }

    pub fn key(&self) -> EntityKey {
        self.key
    }

    pub fn public_id(&self) -> Option<PublicId> {
        self.public_id
    }

    pub fn zone(&self) -> ZoneId {
        self.zone
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Position at the end of the previous tick.
    pub fn old_position(&self) -> Position {
        self.old_position
    }

    pub fn flags(&self) -> UpdateFlags {
        self.flags
    }

    pub fn body(&self) -> &EntityBody {
        &self.body
    }

    pub fn kind(&self) -> EntityKind {
        match &self.body {
            EntityBody::Being(being) => match being.role {
                BeingRole::Character(_) => EntityKind::Character,
                BeingRole::Monster(_) => EntityKind::Monster,
                BeingRole::Npc(_) => EntityKind::Npc,
            },
            EntityBody::Item(_) => EntityKind::Item,
            EntityBody::Effect(_) => EntityKind::Effect,
            EntityBody::Generic => EntityKind::Generic,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.kind().capabilities()
    }

    pub fn being(&self) -> Option<&Being> {
        match &self.body {
            EntityBody::Being(being) => Some(being),
            _ => None,
        }
    }

    pub fn being_mut(&mut self) -> Option<&mut Being> {
        match &mut self.body {
            EntityBody::Being(being) => Some(being),
            _ => None,
        }
    }

    pub fn as_character(&self) -> Option<&Character> {
        self.being().and_then(Being::character)
    }

    pub fn as_character_mut(&mut self) -> Option<&mut Character> {
        self.being_mut().and_then(Being::character_mut)
    }

    pub fn name(&self) -> Option<&str> {
        self.being().map(|being| being.name.as_str())
    }

    pub fn reference(&self) -> Option<EntityRef> {
        self.public_id.map(|id| EntityRef {
            kind: self.kind(),
            id,
            key: self.key,
        })
    }

    pub fn raise(&mut self, flag: UpdateFlag) {
        self.flags.raise(flag);
    }

    /// Teleports the entity. Any walk in progress is dropped.
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
        self.flags.raise(UpdateFlag::PositionChanged);
        if let Some(being) = self.being_mut() {
            being.clear_destination();
        }
    }

    pub fn set_direction(&mut self, direction: Direction) {
        let Some(being) = self.being_mut() else {
            return;
        };
        if being.direction != direction {
            being.direction = direction;
            self.flags.raise(UpdateFlag::DirectionChanged);
        }
    }

    pub fn set_action(&mut self, action: Action) {
        let Some(being) = self.being_mut() else {
            return;
        };
        if being.action != action {
            being.action = action;
            self.flags.raise(UpdateFlag::ActionChanged);
        }
    }

    /// Starts a walk; the path is computed during the next move phase.
    pub fn set_destination(&mut self, destination: Position) {
        if let Some(being) = self.being_mut() {
            if being.is_dead() {
                return;
            }
            being.destination = Some(destination);
            being.path.clear();
        }
    }

    pub fn equip(&mut self, slot: EquipSlot, item: Option<ItemClassId>) {
        let Some(character) = self.as_character_mut() else {
            return;
        };
        if character.looks.equipment.set(slot, item) {
            self.flags.raise(UpdateFlag::LooksChanged);
        }
    }

    /// Records a hit; returns the health actually lost.
    pub fn apply_damage(&mut self, amount: u16) -> u16 {
        let Some(being) = self.being_mut() else {
            return 0;
        };
        if being.is_dead() {
            return 0;
        }
        let lost = being.attributes.apply_damage(amount);
        being.hits.push(amount);
        self.flags.raise(UpdateFlag::HealthChanged);
        lost
    }

    pub(crate) fn assign_key(&mut self, key: EntityKey) {
        self.key = key;
    }

    pub(crate) fn attach(&mut self, zone: ZoneId, id: PublicId) {
        self.zone = zone;
        self.public_id = Some(id);
        self.old_position = self.position;
        self.flags.raise(UpdateFlag::NewOnMap);
    }

    pub(crate) fn detach(&mut self) {
        self.public_id = None;
    }

    pub(crate) fn set_zone(&mut self, zone: ZoneId) {
        self.zone = zone;
    }

    /// Raw position update used by walking; flags are raised by the caller.
    pub(crate) fn step_to(&mut self, position: Position) {
        self.position = position;
    }

    /// End-of-tick reset of every per-tick change record.
    pub(crate) fn flush(&mut self) {
        self.flags.clear();
        self.old_position = self.position;
        if let Some(being) = self.being_mut() {
            being.hits.clear();
            if let Some(character) = being.character_mut() {
                character.looks.equipment.clear_changes();
            }
        }
    }
}
