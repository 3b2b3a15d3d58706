use crate::entities::being::BeingRole;
use crate::entities::entity::{EntityBody, PublicId};
use crate::entities::item::ItemClassDb;
use crate::net::dispatch::Dispatch;
use crate::net::game::{self, EnterDetails};
use crate::net::packet::PacketWriter;
use crate::world::position::Position;
use crate::world::zone::{QueryFilter, Zone};
use std::collections::BTreeSet;

/// Entities that may concern an observer moving from `old` to `new`.
fn candidates(
    zone: &Zone,
    old: Position,
    new: Position,
    range: u16,
    filter: QueryFilter,
) -> BTreeSet<PublicId> {
    let mut found: BTreeSet<PublicId> = zone.entities_within(old, range, filter).into_iter().collect();
    if new != old {
        found.extend(zone.entities_within(new, range, filter));
    }
    found
}

/// Sends the character `observer` everything that changed around it this
/// tick. Only reads the zone.
pub fn inform_player(
    zone: &Zone,
    observer: PublicId,
    range: u16,
    items: &ItemClassDb,
    dispatch: &mut dyn Dispatch,
) {
    let Some(player) = zone.get(observer) else {
        return;
    };
    let Some(character) = player.as_character() else {
        return;
    };
    let connection = character.connection;
    let p_old = player.old_position();
    let p_new = player.position();
    let p_new_on_map = player.flags().new_on_map;

    let mut move_msg = PacketWriter::new(game::OPCODE_BEINGS_MOVE);
    let mut damage_msg = PacketWriter::new(game::OPCODE_BEINGS_DAMAGE);

    for id in candidates(zone, p_old, p_new, range, QueryFilter::Beings) {
        let Some(other) = zone.get(id) else {
            continue;
        };
        let Some(being) = other.being() else {
            continue;
        };
        let flags = other.flags();
        let o_old = other.old_position();
        let o_new = other.position();
        let was_in_range =
            p_old.in_range_of(o_old, range) && !p_new_on_map && !flags.new_on_map;
        let will_be_in_range = p_new.in_range_of(o_new, range);

        if !was_in_range && !will_be_in_range {
            continue;
        }

        if was_in_range && will_be_in_range {
            if flags.attack && id != observer {
                let message = game::being_attack(id, being.direction, being.last_attack);
                dispatch.send_to(connection, &message);
            }
            if flags.action_changed {
                dispatch.send_to(connection, &game::being_action_change(id, being.action));
            }
            if flags.looks_changed {
                if let Some(looks) = being.character().map(|c| &c.looks) {
                    let encoding = looks.equipment.encode(items, false);
                    dispatch.send_to(connection, &game::being_looks_change(id, looks, &encoding));
                }
            }
            if flags.direction_changed {
                dispatch.send_to(connection, &game::being_dir_change(id, being.direction));
            }
            if flags.health_changed && other.capabilities().fightable {
                for hit in being.hits_taken() {
                    game::write_damage_entry(&mut damage_msg, id, *hit);
                }
            }
            if o_old == o_new {
                continue;
            }
        }

        if !will_be_in_range {
            dispatch.send_to(connection, &game::being_leave(id));
            continue;
        }

        if !was_in_range {
            let encoding;
            let details = match &being.role {
                BeingRole::Character(c) => {
                    encoding = c.looks.equipment.encode(items, true);
                    EnterDetails::Character {
                        name: &being.name,
                        looks: &c.looks,
                        encoding: &encoding,
                    }
                }
                BeingRole::Monster(monster) => EnterDetails::Monster {
                    species: monster.species,
                    name: &being.name,
                },
                BeingRole::Npc(npc) => EnterDetails::Npc {
                    npc_id: npc.npc_id,
                    name: &being.name,
                },
            };
            let message = game::being_enter(other.kind(), id, being.action, o_new, details);
            dispatch.send_to(connection, &message);
        }

        if o_old != o_new {
            game::write_move_entry(&mut move_msg, id, o_new, being.wire_speed());
        }
    }

    if move_msg.has_payload() {
        dispatch.send_to(connection, &move_msg);
    }
    if damage_msg.has_payload() {
        dispatch.send_to(connection, &damage_msg);
    }

    // Status goes out after the being batches and before party health and
    // fixed objects; the client reads them in this order.
    if let Some(being) = player.being() {
        dispatch.send_to(connection, &game::player_attribute_change(&being.attributes));
    }

    for member in zone.entities() {
        let Some(id) = member.public_id() else {
            continue;
        };
        if id == observer || !member.flags().health_changed {
            continue;
        }
        let Some(other) = member.as_character() else {
            continue;
        };
        if character.shares_party_with(other) {
            let health = member.being().map_or(0, |being| being.health());
            dispatch.send_to(connection, &game::being_health_change(id, health));
        }
    }

    let mut item_msg = PacketWriter::new(game::OPCODE_ITEMS);
    for id in candidates(zone, p_old, p_new, range, QueryFilter::Fixed) {
        let Some(fixed) = zone.get(id) else {
            continue;
        };
        let position = fixed.position();
        let flags = fixed.flags();
        let will_be_in_range = p_new.in_range_of(position, range);
        let was_in_range =
            p_old.in_range_of(position, range) && !p_new_on_map && !flags.new_on_map;
        if will_be_in_range == was_in_range {
            continue;
        }
        match fixed.body() {
            EntityBody::Item(item) => {
                if flags.new_on_map {
                    dispatch.send_to(connection, &game::item_appear(item.class.0, position));
                } else {
                    let kind = if will_be_in_range { item.class.0 } else { 0 };
                    game::write_item_entry(&mut item_msg, kind, position);
                }
            }
            EntityBody::Effect(effect) => {
                if !flags.new_on_map {
                    continue;
                }
                let anchor = effect
                    .being
                    .and_then(|target| zone.resolve(target))
                    .and_then(|target| target.public_id());
                let message = match anchor {
                    Some(being) => game::create_effect_being(effect.effect_id, being),
                    None => game::create_effect_pos(effect.effect_id, position),
                };
                dispatch.send_to(connection, &message);
            }
            EntityBody::Being(_) | EntityBody::Generic => {}
        }
    }
    if item_msg.has_payload() {
        dispatch.send_to(connection, &item_msg);
    }
}
