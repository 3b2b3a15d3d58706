use std::time::Duration;

/// Number of ticks run since the server started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GameTick(pub u64);

/// Simulated time. Walking speeds and timers are expressed against it, so a
/// slow tick never changes how far a being walks per tick.
#[derive(Debug, Clone)]
pub struct GameClock {
    tick_ms: u32,
    tick: GameTick,
}

impl GameClock {
    pub fn from_millis(tick_ms: u64) -> Self {
        Self {
            tick_ms: tick_ms.clamp(1, u64::from(u32::MAX)) as u32,
            tick: GameTick::default(),
        }
    }

    pub fn tick_length(&self) -> Duration {
        Duration::from_millis(u64::from(self.tick_ms))
    }

    pub fn tick_millis(&self) -> u32 {
        self.tick_ms
    }

    pub fn now(&self) -> GameTick {
        self.tick
    }

    /// Moves on to the next tick and returns it.
    pub fn step(&mut self) -> GameTick {
        self.tick.0 = self.tick.0.saturating_add(1);
        self.tick
    }

    pub fn simulated(&self) -> Duration {
        self.tick_length().saturating_mul(self.tick.0.min(u64::from(u32::MAX)) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_ticks_become_one_millisecond() {
        let clock = GameClock::from_millis(0);
        assert_eq!(clock.tick_millis(), 1);
        assert_eq!(clock.tick_length(), Duration::from_millis(1));
    }

    #[test]
    fn stepping_counts_simulated_time() {
        let mut clock = GameClock::from_millis(100);
        assert_eq!(clock.now(), GameTick(0));
        clock.step();
        assert_eq!(clock.step(), GameTick(2));
        assert_eq!(clock.simulated(), Duration::from_millis(200));
    }
}
