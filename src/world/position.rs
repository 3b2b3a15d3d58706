/// Edge length of a map tile, in world units (pixels).
pub const TILE_SIZE: u16 = 32;

/// World coordinate in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TilePos {
    pub x: u16,
    pub y: u16,
}

/// Facing direction. Discriminants are the wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Up = 1,
    #[default]
    Down = 2,
    Left = 3,
    Right = 4,
}

impl Position {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Square area test: both axis deltas within `range`.
    pub fn in_range_of(self, other: Position, range: u16) -> bool {
        self.x.abs_diff(other.x) <= range && self.y.abs_diff(other.y) <= range
    }

    pub fn tile(self) -> TilePos {
        TilePos {
            x: self.x / TILE_SIZE,
            y: self.y / TILE_SIZE,
        }
    }
}

impl TilePos {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    pub fn center(self) -> Position {
        Position {
            x: self.x.saturating_mul(TILE_SIZE).saturating_add(TILE_SIZE / 2),
            y: self.y.saturating_mul(TILE_SIZE).saturating_add(TILE_SIZE / 2),
        }
    }

    /// One step toward `target`, moving diagonally while both axes differ.
    pub fn step_toward(self, target: TilePos) -> TilePos {
        let step = |from: u16, to: u16| match from.cmp(&to) {
            std::cmp::Ordering::Less => from + 1,
            std::cmp::Ordering::Greater => from - 1,
            std::cmp::Ordering::Equal => from,
        };
        TilePos {
            x: step(self.x, target.x),
            y: step(self.y, target.y),
        }
    }
}

impl Direction {
    pub fn wire(self) -> u8 {
        self as u8
    }

    /// Facing for a move from `from` to `to`. The dominant axis wins; ties
    /// favour the horizontal axis. `None` when the points coincide.
    pub fn toward(from: Position, to: Position) -> Option<Self> {
        let dx = i32::from(to.x) - i32::from(from.x);
        let dy = i32::from(to.y) - i32::from(from.y);
        if dx == 0 && dy == 0 {
            return None;
        }
        if dx.abs() >= dy.abs() {
            Some(if dx > 0 { Direction::Right } else { Direction::Left })
        } else {
            Some(if dy > 0 { Direction::Down } else { Direction::Up })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcg_next(state: &mut u64) -> u32 {
        *state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        (*state >> 32) as u32
    }

    #[test]
    fn range_test_is_a_square() {
        let center = Position::new(100, 100);
        assert!(center.in_range_of(Position::new(420, 420), 320));
        assert!(!center.in_range_of(Position::new(421, 100), 320));
        assert!(center.in_range_of(Position::new(0, 0), 320));
    }

    #[test]
    fn range_test_is_symmetric() {
        let mut state = 0xfeed_face_cafe_beef;
        for _ in 0..256 {
            let a = Position::new(
                (lcg_next(&mut state) % 2000) as u16,
                (lcg_next(&mut state) % 2000) as u16,
            );
            let b = Position::new(
                (lcg_next(&mut state) % 2000) as u16,
                (lcg_next(&mut state) % 2000) as u16,
            );
            assert_eq!(a.in_range_of(b, 320), b.in_range_of(a, 320));
        }
    }

    #[test]
    fn tile_center_roundtrips_through_tile() {
        let tile = TilePos::new(7, 3);
        assert_eq!(tile.center(), Position::new(240, 112));
        assert_eq!(tile.center().tile(), tile);
    }

    #[test]
    fn step_toward_reaches_target() {
        let mut tile = TilePos::new(2, 9);
        let target = TilePos::new(6, 4);
        let mut steps = 0;
        while tile != target {
            tile = tile.step_toward(target);
            steps += 1;
        }
        assert_eq!(steps, 5);
    }

    #[test]
    fn direction_follows_dominant_axis() {
        let origin = Position::new(100, 100);
        assert_eq!(Direction::toward(origin, Position::new(140, 110)), Some(Direction::Right));
        assert_eq!(Direction::toward(origin, Position::new(90, 40)), Some(Direction::Up));
        assert_eq!(Direction::toward(origin, origin), None);
    }
}
