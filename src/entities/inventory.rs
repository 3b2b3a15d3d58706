use crate::entities::item::{ItemClassDb, ItemClassId};

/// Equipment slots that show on a character. The index is the bit in the
/// looks slot mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EquipSlot {
    Fight1,
    Head,
    Torso,
    Legs,
}

impl EquipSlot {
    pub const COUNT: usize = 4;

    pub fn index(self) -> usize {
        self as usize
    }
}

pub const EQUIP_SLOTS: [EquipSlot; EquipSlot::COUNT] = [
    EquipSlot::Fight1,
    EquipSlot::Head,
    EquipSlot::Torso,
    EquipSlot::Legs,
];

/// Slot mask bit telling the client to clear every slot before applying.
pub const LOOKS_CLEAR_FIRST: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    #[default]
    Male = 0,
    Female = 1,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Equipment {
    slots: [Option<ItemClassId>; EquipSlot::COUNT],
    changed: u8,
}

/// Appearance slots as written on the wire: the slot mask followed by one
/// sprite id per set bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooksEncoding {
    pub mask: u8,
    pub sprites: Vec<u16>,
}

impl LooksEncoding {
    pub fn clears_first(&self) -> bool {
        self.mask & LOOKS_CLEAR_FIRST != 0
    }
}

impl Equipment {
    pub fn slot(&self, slot: EquipSlot) -> Option<ItemClassId> {
        self.slots[slot.index()]
    }

    /// Returns true when the slot content actually changed.
    pub fn set(&mut self, slot: EquipSlot, item: Option<ItemClassId>) -> bool {
        let entry = &mut self.slots[slot.index()];
        if *entry == item {
            return false;
        }
        *entry = item;
        self.changed |= 1 << slot.index();
        true
    }

    pub fn changed_mask(&self) -> u8 {
        self.changed
    }

    pub fn clear_changes(&mut self) {
        self.changed = 0;
    }

    /// Picks the smaller of the full and the diff encoding. Visible sprites
    /// are resolved through `items`; unknown or empty slots count as empty.
    /// Equal slot counts pick the full encoding. `force_full` is used for
    /// characters that just came into view.
    pub fn encode(&self, items: &ItemClassDb, force_full: bool) -> LooksEncoding {
        let mut sprites = [0u16; EquipSlot::COUNT];
        let mut mask_full = 0u8;
        let mut nb_full = 0;
        let mask_diff = self.changed;
        let nb_diff = mask_diff.count_ones();
        for slot in EQUIP_SLOTS {
            let sprite = items.sprite(self.slot(slot));
            sprites[slot.index()] = sprite;
            if sprite != 0 {
                nb_full += 1;
                mask_full |= 1 << slot.index();
            }
        }

        let full = force_full || nb_full <= nb_diff;
        let mask = if full {
            mask_full | LOOKS_CLEAR_FIRST
        } else {
            mask_diff
        };
        let sprites = EQUIP_SLOTS
            .iter()
            .filter(|slot| mask & (1 << slot.index()) != 0)
            .map(|slot| sprites[slot.index()])
            .collect();
        LooksEncoding { mask, sprites }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Looks {
    pub hair_style: u8,
    pub hair_color: u8,
    pub gender: Gender,
    pub equipment: Equipment,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::item::ItemClass;

    fn items() -> ItemClassDb {
        ItemClassDb::from_classes((1..=4).map(|n| ItemClass {
            id: ItemClassId(100 + n),
            name: format!("gear {n}"),
            sprite: 10 * n,
        }))
    }

    #[test]
    fn full_encoding_wins_when_fewer_slots_are_occupied() {
        let items = items();
        let mut equipment = Equipment::default();
        equipment.set(EquipSlot::Head, Some(ItemClassId(102)));
        equipment.clear_changes();
        equipment.set(EquipSlot::Torso, Some(ItemClassId(103)));
        equipment.set(EquipSlot::Torso, None);
        equipment.set(EquipSlot::Legs, Some(ItemClassId(104)));
        equipment.set(EquipSlot::Legs, None);
        let encoding = equipment.encode(&items, false);
        assert!(encoding.clears_first());
        assert_eq!(encoding.mask, 0b0010 | LOOKS_CLEAR_FIRST);
        assert_eq!(encoding.sprites, vec![20]);
    }

    #[test]
    fn diff_encoding_wins_when_fewer_slots_changed() {
        let items = items();
        let mut equipment = Equipment::default();
        for (slot, id) in EQUIP_SLOTS.iter().zip(101..) {
            equipment.set(*slot, Some(ItemClassId(id)));
        }
        equipment.clear_changes();
        equipment.set(EquipSlot::Legs, None);
        let encoding = equipment.encode(&items, false);
        assert!(!encoding.clears_first());
        assert_eq!(encoding.mask, 0b1000);
        assert_eq!(encoding.sprites, vec![0]);
    }

    #[test]
    fn equal_counts_choose_full_encoding() {
        let items = items();
        let mut equipment = Equipment::default();
        equipment.set(EquipSlot::Fight1, Some(ItemClassId(101)));
        let encoding = equipment.encode(&items, false);
        assert_eq!(encoding.mask, 0b0001 | LOOKS_CLEAR_FIRST);
        assert_eq!(encoding.sprites, vec![10]);
    }

    #[test]
    fn choice_follows_slot_counts() {
        let items = items();
        let mut state = 0x5eed_u64;
        for _ in 0..200 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let bits = (state >> 33) as u8;
            let mut equipment = Equipment::default();
            for slot in EQUIP_SLOTS {
                if bits & (1 << slot.index()) != 0 {
                    equipment.set(slot, Some(ItemClassId(101 + slot.index() as u16)));
                }
            }
            equipment.clear_changes();
            for slot in EQUIP_SLOTS {
                if bits & (0x10 << slot.index()) != 0 {
                    let next = equipment.slot(slot).map_or(Some(ItemClassId(104)), |_| None);
                    equipment.set(slot, next);
                }
            }
            let occupied = EQUIP_SLOTS
                .iter()
                .filter(|slot| equipment.slot(**slot).is_some())
                .count() as u32;
            let changed = equipment.changed_mask().count_ones();
            let encoding = equipment.encode(&items, false);
            assert_eq!(encoding.clears_first(), occupied <= changed);
            assert_eq!(encoding.sprites.len() as u32, occupied.min(changed));
        }
    }

    #[test]
    fn unknown_items_count_as_empty_slots() {
        let items = items();
        let mut equipment = Equipment::default();
        equipment.set(EquipSlot::Head, Some(ItemClassId(999)));
        let encoding = equipment.encode(&items, true);
        assert_eq!(encoding.mask, LOOKS_CLEAR_FIRST);
        assert!(encoding.sprites.is_empty());
    }
}
