#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeId {
    Health,
    MaxHealth,
    HealthRegen,
    Attack,
    Defense,
    /// Chance to hit.
    Accuracy,
    Evade,
}

impl AttributeId {
    pub const COUNT: usize = 7;

    pub const ALL: [AttributeId; Self::COUNT] = [
        AttributeId::Health,
        AttributeId::MaxHealth,
        AttributeId::HealthRegen,
        AttributeId::Attack,
        AttributeId::Defense,
        AttributeId::Accuracy,
        AttributeId::Evade,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn wire(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeModifier {
    pub attribute: AttributeId,
    pub value: i32,
    /// Remaining ticks; 0 means permanent.
    pub duration: u32,
    /// Dispel strength needed to remove it; 0 means it cannot be dispelled.
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attributes {
    base: [i32; AttributeId::COUNT],
    modifiers: Vec<AttributeModifier>,
}

impl Default for Attributes {
    fn default() -> Self {
        let mut base = [0; AttributeId::COUNT];
        base[AttributeId::Health.index()] = 100;
        base[AttributeId::MaxHealth.index()] = 100;
        base[AttributeId::HealthRegen.index()] = 1;
        base[AttributeId::Attack.index()] = 10;
        base[AttributeId::Accuracy.index()] = 10;
        Self {
            base,
            modifiers: Vec::new(),
        }
    }
}

impl Attributes {
    pub fn base(&self, id: AttributeId) -> i32 {
        self.base[id.index()]
    }

    pub fn set_base(&mut self, id: AttributeId, value: i32) {
        self.base[id.index()] = value;
    }

    /// Base plus every active modifier, never below zero.
    pub fn effective(&self, id: AttributeId) -> i32 {
        let bonus: i32 = self
            .modifiers
            .iter()
            .filter(|modifier| modifier.attribute == id)
            .map(|modifier| modifier.value)
            .sum();
        self.base(id).saturating_add(bonus).max(0)
    }

    pub fn modifiers(&self) -> &[AttributeModifier] {
        &self.modifiers
    }

    pub fn apply_modifier(&mut self, attribute: AttributeId, value: i32, duration: u32, level: u8) {
        self.modifiers.push(AttributeModifier {
            attribute,
            value,
            duration,
            level,
        });
    }

    /// Counts every timed modifier down by one tick and drops the ones that
    /// reach zero. Returns the attributes whose value may have changed.
    pub fn tick_modifiers(&mut self) -> Vec<AttributeId> {
        let mut expired = Vec::new();
        self.modifiers.retain_mut(|modifier| {
            if modifier.duration == 0 {
                return true;
            }
            modifier.duration -= 1;
            if modifier.duration == 0 {
                expired.push(modifier.attribute);
                return false;
            }
            true
        });
        expired
    }

    pub fn dispel_modifiers(&mut self, level: u8) -> usize {
        let before = self.modifiers.len();
        self.modifiers
            .retain(|modifier| modifier.level == 0 || modifier.level > level);
        before - self.modifiers.len()
    }

    pub fn health(&self) -> i32 {
        self.effective(AttributeId::Health)
    }

    pub fn max_health(&self) -> i32 {
        self.effective(AttributeId::MaxHealth)
    }

    /// Lowers base health, returning the amount actually removed.
    pub fn apply_damage(&mut self, amount: u16) -> u16 {
        let current = self.base(AttributeId::Health).max(0);
        let applied = i32::from(amount).min(current);
        self.set_base(AttributeId::Health, current - applied);
        applied as u16
    }

    /// Raises base health up to the effective maximum, returning the gain.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let current = self.base(AttributeId::Health);
        let max = self.max_health();
        if amount <= 0 || current >= max {
            return 0;
        }
        let healed = current.saturating_add(amount).min(max);
        self.set_base(AttributeId::Health, healed);
        healed - current
    }
}
