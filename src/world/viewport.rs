use crate::world::position::Position;

/// Axis-aligned square an observer receives updates about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub center: Position,
    pub min: Position,
    pub max: Position,
    pub range: u16,
}

impl Viewport {
    pub fn around(center: Position, range: u16) -> Self {
        let min = Position {
            x: center.x.saturating_sub(range),
            y: center.y.saturating_sub(range),
        };
        let max = Position {
            x: center.x.saturating_add(range),
            y: center.y.saturating_add(range),
        };
        Self {
            center,
            min,
            max,
            range,
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= self.min.x
            && position.x <= self.max.x
            && position.y >= self.min.y
            && position.y <= self.max.y
    }
}
