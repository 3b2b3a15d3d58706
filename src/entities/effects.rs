use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusEffectId(pub u16);

/// Active status effects and their remaining ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusEffects {
    active: BTreeMap<StatusEffectId, u32>,
}

impl StatusEffects {
    /// Applies an effect, keeping the longer remaining time if it is
    /// already active.
    pub fn apply(&mut self, id: StatusEffectId, ticks: u32) {
        if ticks == 0 {
            return;
        }
        let entry = self.active.entry(id).or_insert(0);
        *entry = (*entry).max(ticks);
    }

    pub fn remove(&mut self, id: StatusEffectId) -> bool {
        self.active.remove(&id).is_some()
    }

    pub fn has(&self, id: StatusEffectId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn remaining(&self, id: StatusEffectId) -> Option<u32> {
        self.active.get(&id).copied()
    }

    pub fn set_remaining(&mut self, id: StatusEffectId, ticks: u32) {
        if ticks == 0 {
            self.active.remove(&id);
        } else if let Some(entry) = self.active.get_mut(&id) {
            *entry = ticks;
        }
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Counts every effect down one tick; returns the ones that ran out.
    pub fn tick(&mut self) -> Vec<StatusEffectId> {
        let mut expired = Vec::new();
        self.active.retain(|id, remaining| {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                expired.push(*id);
                false
            } else {
                true
            }
        });
        expired
    }
}
