use crate::combat::damage::DamageKind;
use crate::entities::effects::StatusEffects;
use crate::entities::entity::EntityRef;
use crate::entities::inventory::Looks;
use crate::entities::stats::{AttributeId, Attributes};
use crate::world::position::{Direction, Position, TilePos};
use std::collections::{BTreeMap, VecDeque};

const TICKS_PER_HP_REGENERATION: i32 = 100;
const MONSTER_DECAY_TICKS: i32 = 50;
const DEFAULT_SPEED_MS_PER_TILE: u16 = 250;

/// Current activity. Discriminants are the wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Stand = 0,
    Walk = 1,
    Attack = 2,
    Sit = 3,
    Dead = 4,
    Hurt = 5,
}

impl Action {
    pub fn wire(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttackType {
    #[default]
    Hit = 0x00,
    Critical = 0x0a,
    Flee = 0x0b,
}

impl AttackType {
    pub fn wire(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    MonsterDecay,
    AttackCooldown,
    HealthRegen,
}

/// Countdown timers. A timer counts down to -1 once per tick; it is running
/// while positive and "just finished" on the tick it reaches 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timers {
    values: BTreeMap<TimerKind, i32>,
}

impl Timers {
    pub fn get(&self, kind: TimerKind) -> i32 {
        self.values.get(&kind).copied().unwrap_or(-1)
    }

    /// Only ever extends a timer.
    pub fn set_soft(&mut self, kind: TimerKind, value: i32) {
        if self.get(kind) < value {
            self.values.insert(kind, value);
        }
    }

    pub fn set_hard(&mut self, kind: TimerKind, value: i32) {
        self.values.insert(kind, value);
    }

    pub fn is_running(&self, kind: TimerKind) -> bool {
        self.get(kind) > 0
    }

    pub fn just_finished(&self, kind: TimerKind) -> bool {
        self.get(kind) == 0
    }

    pub fn tick(&mut self) {
        for value in self.values.values_mut() {
            if *value > -1 {
                *value -= 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartyId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    pub database_id: u32,
    pub connection: ConnectionId,
    pub party: Option<PartyId>,
    pub looks: Looks,
}

impl Character {
    pub fn new(database_id: u32, connection: ConnectionId) -> Self {
        Self {
            database_id,
            connection,
            party: None,
            looks: Looks::default(),
        }
    }

    pub fn shares_party_with(&self, other: &Character) -> bool {
        self.party.is_some() && self.party == other.party
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonsterInfo {
    pub species: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpcInfo {
    pub npc_id: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeingRole {
    Character(Character),
    Monster(MonsterInfo),
    Npc(NpcInfo),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackProfile {
    /// Reach in world units, square test like visibility.
    pub range: u16,
    pub cooldown_ticks: i32,
    /// Upper bound of the random bonus added to each hit.
    pub damage_delta: u16,
    pub damage_kind: DamageKind,
}

impl Default for AttackProfile {
    fn default() -> Self {
        Self {
            range: 48,
            cooldown_ticks: 10,
            damage_delta: 0,
            damage_kind: DamageKind::Physical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshOutcome {
    pub health_changed: bool,
    pub died: bool,
    pub decayed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Being {
    pub name: String,
    pub direction: Direction,
    pub action: Action,
    pub destination: Option<Position>,
    pub path: VecDeque<TilePos>,
    /// Walking speed in milliseconds per tile.
    pub speed: u16,
    pub attributes: Attributes,
    pub status: StatusEffects,
    pub timers: Timers,
    pub target: Option<EntityRef>,
    pub attack: AttackProfile,
    pub role: BeingRole,
    pub(crate) move_millis: u32,
    pub(crate) hits: Vec<u16>,
    /// Outcome of the most recent swing, sent with the attack animation.
    pub(crate) last_attack: AttackType,
}

impl Being {
    pub fn new(name: impl Into<String>, role: BeingRole) -> Self {
        Self {
            name: name.into(),
            direction: Direction::default(),
            action: Action::Stand,
            destination: None,
            path: VecDeque::new(),
            speed: DEFAULT_SPEED_MS_PER_TILE,
            attributes: Attributes::default(),
            status: StatusEffects::default(),
            timers: Timers::default(),
            target: None,
            attack: AttackProfile::default(),
            role,
            move_millis: 0,
            hits: Vec::new(),
            last_attack: AttackType::Hit,
        }
    }

    pub fn character(&self) -> Option<&Character> {
        match &self.role {
            BeingRole::Character(character) => Some(character),
            _ => None,
        }
    }

    pub fn character_mut(&mut self) -> Option<&mut Character> {
        match &mut self.role {
            BeingRole::Character(character) => Some(character),
            _ => None,
        }
    }

    pub fn is_monster(&self) -> bool {
        matches!(self.role, BeingRole::Monster(_))
    }

    pub fn is_dead(&self) -> bool {
        self.action == Action::Dead
    }

    /// Damage instances taken since the last flush.
    pub fn hits_taken(&self) -> &[u16] {
        &self.hits
    }

    pub fn health(&self) -> i32 {
        self.attributes.health()
    }

    /// Tiles per second.
    pub fn speed_tiles_per_second(&self) -> f32 {
        1000.0 / f32::from(self.speed.max(1))
    }

    /// Speed scaled by ten to keep one decimal digit in a byte.
    pub fn wire_speed(&self) -> u8 {
        (self.speed_tiles_per_second() * 10.0).round().clamp(0.0, 255.0) as u8
    }

    pub fn clear_destination(&mut self) {
        self.destination = None;
        self.path.clear();
        self.move_millis = 0;
    }

    /// Per-tick self update: timers, regeneration, modifiers, status
    /// effects and death.
    pub(crate) fn refresh(&mut self) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::default();
        self.timers.tick();

        if !self.is_dead() && self.attributes.health() <= 0 {
            self.die(&mut outcome);
        } else if self.is_dead()
            && self.is_monster()
            && self.timers.just_finished(TimerKind::MonsterDecay)
        {
            outcome.decayed = true;
        }

        if !self.is_dead()
            && self.attributes.health() < self.attributes.max_health()
            && !self.timers.is_running(TimerKind::HealthRegen)
        {
            self.timers
                .set_hard(TimerKind::HealthRegen, TICKS_PER_HP_REGENERATION);
            let regen = self.attributes.effective(AttributeId::HealthRegen);
            if self.attributes.heal(regen) > 0 {
                outcome.health_changed = true;
            }
        }

        let expired = self.attributes.tick_modifiers();
        if expired
            .iter()
            .any(|id| matches!(id, AttributeId::Health | AttributeId::MaxHealth))
        {
            outcome.health_changed = true;
        }
        self.status.tick();

        // Expiring modifiers can take a being to zero as well.
        if !self.is_dead() && self.attributes.health() <= 0 {
            self.die(&mut outcome);
        }
        outcome
    }

    fn die(&mut self, outcome: &mut RefreshOutcome) {
        self.action = Action::Dead;
        self.clear_destination();
        self.target = None;
        outcome.died = true;
        if self.is_monster() {
            self.timers
                .set_hard(TimerKind::MonsterDecay, MONSTER_DECAY_TICKS);
        }
    }
}
