use crate::world::position::TilePos;
use crate::world::zone::Zone;
use std::collections::VecDeque;

/// Computes walking paths. The returned path excludes `from` and ends at
/// `to`; `None` means the destination cannot be reached.
pub trait Pathfinder {
    fn find_path(&self, zone: &Zone, from: TilePos, to: TilePos) -> Option<VecDeque<TilePos>>;
}

/// Walks straight at the destination, diagonally while both axes differ.
/// Zones carry no collision data, so only the bounds are checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightPathfinder;

impl Pathfinder for StraightPathfinder {
    fn find_path(&self, zone: &Zone, from: TilePos, to: TilePos) -> Option<VecDeque<TilePos>> {
        if !zone.contains_tile(to) {
            return None;
        }
        let mut path = VecDeque::new();
        let mut current = from;
        while current != to {
            current = current.step_toward(to);
            path.push_back(current);
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::zone::ZoneId;

    #[test]
    fn straight_path_goes_diagonal_first() {
        let zone = Zone::new(ZoneId(1), "field", 20, 20, 16, 256);
        let path = StraightPathfinder
            .find_path(&zone, TilePos::new(1, 1), TilePos::new(4, 2))
            .expect("path");
        assert_eq!(
            path,
            VecDeque::from(vec![
                TilePos::new(2, 2),
                TilePos::new(3, 2),
                TilePos::new(4, 2)
            ])
        );
    }

    #[test]
    fn destinations_outside_the_zone_are_unreachable() {
        let zone = Zone::new(ZoneId(1), "field", 20, 20, 16, 256);
        assert!(StraightPathfinder
            .find_path(&zone, TilePos::new(1, 1), TilePos::new(20, 2))
            .is_none());
        assert_eq!(
            StraightPathfinder.find_path(&zone, TilePos::new(3, 3), TilePos::new(3, 3)),
            Some(VecDeque::new())
        );
    }
}
