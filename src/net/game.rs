use crate::entities::being::{Action, AttackType};
use crate::entities::entity::{EntityKind, PublicId};
use crate::entities::inventory::{Looks, LooksEncoding};
use crate::entities::stats::{AttributeId, Attributes};
use crate::net::packet::PacketWriter;
use crate::world::position::{Direction, Position};

pub const OPCODE_PLAYER_MAP_CHANGE: u16 = 0x0100;
pub const OPCODE_PLAYER_ATTRIBUTE_CHANGE: u16 = 0x0130;
pub const OPCODE_BEING_ENTER: u16 = 0x0200;
pub const OPCODE_BEING_LEAVE: u16 = 0x0201;
pub const OPCODE_ITEM_APPEAR: u16 = 0x0202;
pub const OPCODE_BEING_LOOKS_CHANGE: u16 = 0x0210;
pub const OPCODE_BEING_ACTION_CHANGE: u16 = 0x0271;
pub const OPCODE_BEING_DIR_CHANGE: u16 = 0x0272;
pub const OPCODE_BEING_HEALTH_CHANGE: u16 = 0x0274;
pub const OPCODE_BEINGS_MOVE: u16 = 0x0280;
pub const OPCODE_ITEMS: u16 = 0x0281;
pub const OPCODE_BEING_ATTACK: u16 = 0x0291;
pub const OPCODE_SAY: u16 = 0x02c1;
pub const OPCODE_BEINGS_DAMAGE: u16 = 0x0310;
pub const OPCODE_CREATE_EFFECT_POS: u16 = 0x0320;
pub const OPCODE_CREATE_EFFECT_BEING: u16 = 0x0322;
pub const OPCODE_REDIRECT: u16 = 0x0530;

/// Move fragment flag: coordinates and speed follow.
pub const MOVING_POSITION: u8 = 0x01;

/// Kind-specific tail of a BEING_ENTER message.
#[derive(Debug, Clone, Copy)]
pub enum EnterDetails<'a> {
    Character {
        name: &'a str,
        looks: &'a Looks,
        encoding: &'a LooksEncoding,
    },
    Monster {
        species: u16,
        name: &'a str,
    },
    Npc {
        npc_id: u16,
        name: &'a str,
    },
}

pub fn write_position(writer: &mut PacketWriter, position: Position) {
    writer.write_u16_be(position.x);
    writer.write_u16_be(position.y);
}

pub fn write_looks(writer: &mut PacketWriter, encoding: &LooksEncoding) {
    writer.write_u8(encoding.mask);
    for sprite in &encoding.sprites {
        writer.write_u16_be(*sprite);
    }
}

pub fn player_map_change(map_name: &str, position: Position) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_PLAYER_MAP_CHANGE);
    writer.write_string(map_name);
    write_position(&mut writer, position);
    writer
}

/// Status summary: one entry per attribute with base and effective value.
pub fn player_attribute_change(attributes: &Attributes) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_PLAYER_ATTRIBUTE_CHANGE);
    for id in AttributeId::ALL {
        writer.write_u8(id.wire());
        writer.write_u16_be(clamp_u16(attributes.base(id)));
        writer.write_u16_be(clamp_u16(attributes.effective(id)));
    }
    writer
}

pub fn being_enter(
    kind: EntityKind,
    id: PublicId,
    action: Action,
    position: Position,
    details: EnterDetails<'_>,
) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_BEING_ENTER);
    writer.write_u8(kind.wire());
    writer.write_u16_be(id.0);
    writer.write_u8(action.wire());
    write_position(&mut writer, position);
    match details {
        EnterDetails::Character {
            name,
            looks,
            encoding,
        } => {
            writer.write_string(name);
            writer.write_u8(looks.hair_style);
            writer.write_u8(looks.hair_color);
            writer.write_u8(looks.gender as u8);
            write_looks(&mut writer, encoding);
        }
        EnterDetails::Monster { species, name } => {
            writer.write_u16_be(species);
            writer.write_string(name);
        }
        EnterDetails::Npc { npc_id, name } => {
            writer.write_u16_be(npc_id);
            writer.write_string(name);
        }
    }
    writer
}

pub fn being_leave(id: PublicId) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_BEING_LEAVE);
    writer.write_u16_be(id.0);
    writer
}

pub fn being_attack(id: PublicId, direction: Direction, attack_type: AttackType) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_BEING_ATTACK);
    writer.write_u16_be(id.0);
    writer.write_u8(direction.wire());
    writer.write_u8(attack_type.wire());
    writer
}

pub fn being_action_change(id: PublicId, action: Action) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_BEING_ACTION_CHANGE);
    writer.write_u16_be(id.0);
    writer.write_u8(action.wire());
    writer
}

pub fn being_looks_change(id: PublicId, looks: &Looks, encoding: &LooksEncoding) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_BEING_LOOKS_CHANGE);
    writer.write_u16_be(id.0);
    write_looks(&mut writer, encoding);
    writer.write_u16_be(u16::from(looks.hair_style));
    writer.write_u16_be(u16::from(looks.hair_color));
    writer.write_u16_be(looks.gender as u16);
    writer
}

pub fn being_dir_change(id: PublicId, direction: Direction) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_BEING_DIR_CHANGE);
    writer.write_u16_be(id.0);
    writer.write_u8(direction.wire());
    writer
}

pub fn being_health_change(id: PublicId, health: i32) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_BEING_HEALTH_CHANGE);
    writer.write_u16_be(id.0);
    writer.write_u16_be(clamp_u16(health));
    writer
}

pub fn write_move_entry(writer: &mut PacketWriter, id: PublicId, position: Position, speed: u8) {
    writer.write_u16_be(id.0);
    writer.write_u8(MOVING_POSITION);
    write_position(writer, position);
    writer.write_u8(speed);
}

pub fn write_damage_entry(writer: &mut PacketWriter, id: PublicId, amount: u16) {
    writer.write_u16_be(id.0);
    writer.write_u16_be(amount);
}

/// `item_kind` 0 means the item is gone.
pub fn write_item_entry(writer: &mut PacketWriter, item_kind: u16, position: Position) {
    writer.write_u16_be(item_kind);
    write_position(writer, position);
}

pub fn items(item_kind: u16, position: Position) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_ITEMS);
    write_item_entry(&mut writer, item_kind, position);
    writer
}

pub fn item_appear(item_kind: u16, position: Position) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_ITEM_APPEAR);
    write_item_entry(&mut writer, item_kind, position);
    writer
}

pub fn create_effect_being(effect_id: u16, being: PublicId) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_CREATE_EFFECT_BEING);
    writer.write_u16_be(effect_id);
    writer.write_u16_be(being.0);
    writer
}

pub fn create_effect_pos(effect_id: u16, position: Position) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_CREATE_EFFECT_POS);
    writer.write_u16_be(effect_id);
    write_position(&mut writer, position);
    writer
}

pub fn say(speaker: PublicId, text: &str) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_SAY);
    writer.write_u16_be(speaker.0);
    writer.write_string(text);
    writer
}

pub fn redirect(database_id: u32) -> PacketWriter {
    let mut writer = PacketWriter::new(OPCODE_REDIRECT);
    writer.write_u32_be(database_id);
    writer
}

fn clamp_u16(value: i32) -> u16 {
    value.clamp(0, i32::from(u16::MAX)) as u16
}
