use crate::entities::being::AttackType;
use crate::entities::stats::{AttributeId, Attributes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DamageKind {
    #[default]
    Physical,
    Magical,
    /// Ignores defense and evasion entirely.
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Damage {
    pub base: u16,
    /// Upper bound of the random bonus rolled on top of `base`.
    pub delta: u16,
    /// Chance to hit, rolled against the defender's evade.
    pub cth: u16,
    pub kind: DamageKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackOutcome {
    pub amount: u16,
    pub attack_type: AttackType,
}

/// Deterministic generator for combat rolls.
#[derive(Debug, Clone, Copy)]
pub struct CombatRng {
    state: u64,
}

impl CombatRng {
    pub fn from_seed(seed: u64) -> Self {
        let seed = if seed == 0 { 0x9e3779b97f4a7c15 } else { seed };
        Self { state: seed }
    }

    /// Inclusive on both ends.
    pub fn roll_range(&mut self, min: u32, max: u32) -> u32 {
        let (min, max) = if min >= max { (min, min) } else { (min, max) };
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        let span = u64::from(max - min) + 1;
        let value = (self.state >> 32) % span;
        min + value as u32
    }
}

impl Default for CombatRng {
    fn default() -> Self {
        Self::from_seed(0)
    }
}

fn clamp_u16(value: i32) -> u16 {
    value.clamp(0, i32::from(u16::MAX)) as u16
}

impl Damage {
    pub fn from_attacker(attacker: &Attributes, delta: u16, kind: DamageKind) -> Self {
        Self {
            base: clamp_u16(attacker.effective(AttributeId::Attack)),
            delta,
            cth: clamp_u16(attacker.effective(AttributeId::Accuracy)),
            kind,
        }
    }

    /// Amount left after the defender's mitigation.
    pub fn against(self, defender: &Attributes) -> u16 {
        match self.kind {
            DamageKind::Physical => {
                let defense = defender.effective(AttributeId::Defense);
                (i32::from(self.base) - defense).max(0) as u16
            }
            DamageKind::Magical | DamageKind::Direct => self.base,
        }
    }

    /// Rolls hit against evade, then the bonus, then mitigation. A bonus
    /// that comes up at its maximum is a critical hit.
    pub fn resolve(self, defender: &Attributes, rng: &mut CombatRng) -> AttackOutcome {
        if self.kind != DamageKind::Direct {
            let hit = rng.roll_range(0, u32::from(self.cth));
            let evade = rng.roll_range(0, u32::from(clamp_u16(defender.effective(AttributeId::Evade))));
            if evade > hit {
                return AttackOutcome {
                    amount: 0,
                    attack_type: AttackType::Flee,
                };
            }
        }
        let luck = rng.roll_range(0, u32::from(self.delta));
        let rolled = Damage {
            base: self.base.saturating_add(luck as u16),
            ..self
        };
        let attack_type = if self.delta > 0 && luck == u32::from(self.delta) {
            AttackType::Critical
        } else {
            AttackType::Hit
        };
        AttackOutcome {
            amount: rolled.against(defender),
            attack_type,
        }
    }
}
