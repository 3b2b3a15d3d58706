use crate::combat::damage::{AttackOutcome, Damage};
use crate::entities::being::{Action, AttackType, Being, TimerKind};
use crate::entities::entity::{Entity, EntityBody, EntityKey, EntityRef, PublicId, UpdateFlag};
use crate::scripting::zone_script::panic_message;
use crate::scripting::{ScriptAction, ScriptError, ZoneView};
use crate::world::path::Pathfinder;
use crate::world::position::{Direction, TilePos};
use crate::world::state::GameState;
use crate::world::sync;
use crate::world::time::GameTick;
use crate::world::zone::{Zone, ZoneId};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub zones_updated: usize,
    pub script_faults: Vec<(ZoneId, ScriptError)>,
    pub deferred_applied: usize,
}

#[derive(Debug, Clone, Copy)]
struct PendingAttack {
    attacker: PublicId,
    target: PublicId,
    outcome: AttackOutcome,
    facing: Option<Direction>,
    cooldown: i32,
}

impl GameState {
    /// Advances every active zone by one tick, then applies the structural
    /// changes queued while it ran.
    pub fn update(&mut self) -> TickReport {
        let tick = self.clock.now();
        let mut report = TickReport {
            tick: tick.0,
            ..TickReport::default()
        };
        let active: Vec<ZoneId> = self
            .zones
            .values()
            .filter(|zone| zone.is_active())
            .map(Zone::id)
            .collect();

        self.in_tick = true;
        for zone_id in active {
            self.refresh_zone(zone_id);
            if let Err(err) = self.run_script(zone_id, tick) {
                tracing::error!(zone = %zone_id, "{err}");
                report.script_faults.push((zone_id, err));
            }
            self.act_zone(zone_id);
            self.move_zone(zone_id);
            self.synchronize_zone(zone_id);
            self.flush_zone(zone_id);
            report.zones_updated += 1;
        }
        self.in_tick = false;

        report.deferred_applied = self.drain_deferred();
        self.clock.step();
        report
    }

    fn refresh_zone(&mut self, zone_id: ZoneId) {
        let Some(zone) = self.zones.get_mut(&zone_id) else {
            return;
        };
        let mut decayed = Vec::new();
        for entity in zone.entities_mut() {
            let key = entity.key();
            let Some(being) = entity.being_mut() else {
                continue;
            };
            let outcome = being.refresh();
            if outcome.health_changed {
                entity.raise(UpdateFlag::HealthChanged);
            }
            if outcome.died {
                entity.raise(UpdateFlag::ActionChanged);
            }
            if outcome.decayed {
                decayed.push(key);
            }
        }
        for key in decayed {
            self.queue.enqueue_remove(key);
        }
    }

    /// Runs the zone script and applies what it asked for. A failing or
    /// panicking script leaves the zone untouched.
    fn run_script(&mut self, zone_id: ZoneId, tick: GameTick) -> Result<(), ScriptError> {
        let (Some(script), Some(zone)) = (self.scripts.get_mut(&zone_id), self.zones.get(&zone_id))
        else {
            return Ok(());
        };
        let view = ZoneView { zone, tick };
        let actions = match panic::catch_unwind(AssertUnwindSafe(|| script.update(&view))) {
            Ok(result) => result?,
            Err(payload) => return Err(ScriptError::Panicked(panic_message(payload.as_ref()))),
        };
        for action in actions {
            self.apply_script_action(zone_id, action);
        }
        Ok(())
    }

    fn resolve_key(&self, zone_id: ZoneId, target: EntityRef) -> Option<EntityKey> {
        self.zones
            .get(&zone_id)
            .and_then(|zone| zone.resolve(target))
            .map(Entity::key)
    }

    fn apply_script_action(&mut self, zone_id: ZoneId, action: ScriptAction) {
        match action {
            ScriptAction::Spawn(entity) => {
                self.enqueue_insert(*entity);
            }
            ScriptAction::Effect {
                effect_id,
                position,
                being,
            } => {
                self.enqueue_insert(Entity::effect(effect_id, being, zone_id, position));
            }
            ScriptAction::Despawn(target) => {
                if let Some(key) = self.resolve_key(zone_id, target) {
                    self.enqueue_remove(key);
                }
            }
            ScriptAction::Warp {
                entity,
                zone,
                position,
            } => {
                if let Some(key) = self.resolve_key(zone_id, entity) {
                    self.enqueue_warp(key, zone, position);
                }
            }
            ScriptAction::Say { speaker, text } => {
                if let Some(key) = self.resolve_key(zone_id, speaker) {
                    self.say_around(key, &text);
                }
            }
            other => {
                let Some(zone) = self.zones.get_mut(&zone_id) else {
                    return;
                };
                apply_entity_action(zone, other);
            }
        }
    }

    /// Attacks are chosen against the state at the start of the phase and
    /// applied afterwards.
    fn act_zone(&mut self, zone_id: ZoneId) {
        let Some(zone) = self.zones.get_mut(&zone_id) else {
            return;
        };
        let rng = &mut self.combat_rng;
        let mut attacks = Vec::new();
        let mut lost_targets = Vec::new();
        for entity in zone.entities() {
            let (Some(id), Some(being)) = (entity.public_id(), entity.being()) else {
                continue;
            };
            if being.action != Action::Attack || being.is_dead() {
                continue;
            }
            let Some(target_ref) = being.target else {
                lost_targets.push(id);
                continue;
            };
            let target = zone
                .resolve(target_ref)
                .filter(|target| target.capabilities().fightable)
                .filter(|target| target.being().is_some_and(|b| !b.is_dead()));
            let Some(target) = target else {
                lost_targets.push(id);
                continue;
            };
            if being.timers.is_running(TimerKind::AttackCooldown) {
                continue;
            }
            if !entity
                .position()
                .in_range_of(target.position(), being.attack.range)
            {
                continue;
            }
            let Some(target_being) = target.being() else {
                continue;
            };
            let outcome = Damage::from_attacker(
                &being.attributes,
                being.attack.damage_delta,
                being.attack.damage_kind,
            )
            .resolve(&target_being.attributes, rng);
            attacks.push(PendingAttack {
                attacker: id,
                target: target_ref.id,
                outcome,
                facing: Direction::toward(entity.position(), target.position()),
                cooldown: being.attack.cooldown_ticks,
            });
        }

        for id in lost_targets {
            if let Some(entity) = zone.get_mut(id) {
                if let Some(being) = entity.being_mut() {
                    being.target = None;
                }
                entity.set_action(Action::Stand);
            }
        }
        for attack in attacks {
            if let Some(attacker) = zone.get_mut(attack.attacker) {
                if let Some(facing) = attack.facing {
                    attacker.set_direction(facing);
                }
                attacker.raise(UpdateFlag::Attack);
                if let Some(being) = attacker.being_mut() {
                    being
                        .timers
                        .set_hard(TimerKind::AttackCooldown, attack.cooldown);
                    being.last_attack = attack.outcome.attack_type;
                }
            }
            if attack.outcome.attack_type == AttackType::Flee {
                continue;
            }
            if let Some(target) = zone.get_mut(attack.target) {
                target.apply_damage(attack.outcome.amount);
            }
        }
    }

    fn move_zone(&mut self, zone_id: ZoneId) {
        let tick_millis = self.clock.tick_millis();
        let pathfinder = &*self.pathfinder;
        let Some(zone) = self.zones.get_mut(&zone_id) else {
            return;
        };
        for id in zone.ids() {
            let path = plan_path(zone, pathfinder, id);
            if let Some(entity) = zone.get_mut(id) {
                walk(entity, path, tick_millis);
            }
        }
        zone.rebucket();
    }

    fn synchronize_zone(&mut self, zone_id: ZoneId) {
        let Some(zone) = self.zones.get(&zone_id) else {
            return;
        };
        let observers: Vec<PublicId> = zone
            .entities()
            .filter(|entity| entity.as_character().is_some())
            .filter_map(Entity::public_id)
            .collect();
        for observer in observers {
            sync::inform_player(
                zone,
                observer,
                self.visual_range,
                &self.items,
                self.dispatch.as_mut(),
            );
        }
    }

    fn flush_zone(&mut self, zone_id: ZoneId) {
        let Some(zone) = self.zones.get_mut(&zone_id) else {
            return;
        };
        let shown: Vec<EntityKey> = zone
            .entities()
            .filter(|entity| matches!(entity.body(), EntityBody::Effect(_)))
            .filter(|entity| entity.flags().new_on_map)
            .map(Entity::key)
            .collect();
        zone.flush();
        for key in shown {
            self.queue.enqueue_remove(key);
        }
    }
}

fn apply_entity_action(zone: &mut Zone, action: ScriptAction) {
    let target = match &action {
        ScriptAction::Walk { entity, .. }
        | ScriptAction::SetAction { entity, .. }
        | ScriptAction::Face { entity, .. }
        | ScriptAction::Attack { entity, .. }
        | ScriptAction::StopAttack { entity }
        | ScriptAction::Damage { entity, .. }
        | ScriptAction::Modify { entity, .. }
        | ScriptAction::Dispel { entity, .. }
        | ScriptAction::ApplyStatus { entity, .. } => *entity,
        _ => return,
    };
    let Some(entity) = zone.resolve_mut(target) else {
        tracing::debug!(zone = %zone.id(), id = target.id.0, "script target is gone");
        return;
    };
    match action {
        ScriptAction::Walk { destination, .. } => entity.set_destination(destination),
        ScriptAction::SetAction { action, .. } => entity.set_action(action),
        ScriptAction::Face { direction, .. } => entity.set_direction(direction),
        ScriptAction::Attack { target, .. } => {
            if let Some(being) = entity.being_mut() {
                being.target = Some(target);
            }
            entity.set_action(Action::Attack);
        }
        ScriptAction::StopAttack { .. } => {
            if let Some(being) = entity.being_mut() {
                being.target = None;
            }
            if entity.being().is_some_and(|being| being.action == Action::Attack) {
                entity.set_action(Action::Stand);
            }
        }
        ScriptAction::Damage { amount, .. } => {
            entity.apply_damage(amount);
        }
        ScriptAction::Modify {
            attribute,
            value,
            duration,
            level,
            ..
        } => change_attributes(entity, |being| {
            being
                .attributes
                .apply_modifier(attribute, value, duration, level)
        }),
        ScriptAction::Dispel { level, .. } => change_attributes(entity, |being| {
            being.attributes.dispel_modifiers(level);
        }),
        ScriptAction::ApplyStatus { status, ticks, .. } => {
            if let Some(being) = entity.being_mut() {
                being.status.apply(status, ticks);
            }
        }
        _ => {}
    }
}

/// Raises health-changed when `change` moved effective health.
fn change_attributes(entity: &mut Entity, change: impl FnOnce(&mut Being)) {
    let Some(being) = entity.being_mut() else {
        return;
    };
    let before = (being.attributes.health(), being.attributes.max_health());
    change(being);
    let after = (being.attributes.health(), being.attributes.max_health());
    if before != after {
        entity.raise(UpdateFlag::HealthChanged);
    }
}

enum PathPlan {
    Keep,
    Replace(VecDeque<TilePos>),
    Unreachable,
}

fn plan_path(zone: &Zone, pathfinder: &dyn Pathfinder, id: PublicId) -> PathPlan {
    let Some(entity) = zone.get(id) else {
        return PathPlan::Keep;
    };
    let Some(being) = entity.being() else {
        return PathPlan::Keep;
    };
    let Some(destination) = being.destination else {
        return PathPlan::Keep;
    };
    let goal = destination.tile();
    let current = entity.position().tile();
    let fresh = being.path.back() == Some(&goal) || (being.path.is_empty() && current == goal);
    if fresh {
        return PathPlan::Keep;
    }
    match pathfinder.find_path(zone, current, goal) {
        Some(path) => PathPlan::Replace(path),
        None => PathPlan::Unreachable,
    }
}

/// Advances a being along its path by one tick's worth of walking.
fn walk(entity: &mut Entity, plan: PathPlan, tick_millis: u32) {
    let start = entity.position();
    let Some(being) = entity.being_mut() else {
        return;
    };
    let Some(destination) = being.destination else {
        return;
    };
    if being.is_dead() {
        being.clear_destination();
        return;
    }
    match plan {
        PathPlan::Keep => {}
        PathPlan::Replace(path) => being.path = path,
        PathPlan::Unreachable => {
            tracing::debug!(x = destination.x, y = destination.y, "destination unreachable");
            being.clear_destination();
            if being.action == Action::Walk {
                entity.set_action(Action::Stand);
            }
            return;
        }
    }

    let goal = destination.tile();
    let speed = u32::from(being.speed.max(1));
    let mut position = start;
    if being.path.is_empty() {
        // Already on the destination tile.
        position = destination;
    } else {
        being.move_millis += tick_millis;
        while being.move_millis >= speed {
            let Some(next) = being.path.pop_front() else {
                break;
            };
            being.move_millis -= speed;
            position = if next == goal {
                destination
            } else {
                next.center()
            };
        }
    }
    let arrived = position == destination && being.path.is_empty();
    if arrived {
        being.clear_destination();
    }
    let walking = being.action == Action::Walk;
    let idle = being.action == Action::Stand;

    if position != start {
        if let Some(facing) = Direction::toward(start, position) {
            entity.set_direction(facing);
        }
        entity.step_to(position);
        entity.raise(UpdateFlag::PositionChanged);
    }
    if arrived && walking {
        entity.set_action(Action::Stand);
    } else if !arrived && idle {
        entity.set_action(Action::Walk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WorldConfig, ZoneConfig};
    use crate::entities::being::{Character, ConnectionId, PartyId};
    use crate::entities::stats::AttributeId;
    use crate::net::dispatch::{Outbox, OutboxLog, SentMessage};
    use crate::net::game;
    use crate::persistence::accounts::AccountQueue;
    use crate::scripting::FnScript;
    use crate::world::position::Position;

    const HERO: ConnectionId = ConnectionId(1);

    fn zone_config(id: u16, name: &str) -> ZoneConfig {
        ZoneConfig {
            id: ZoneId(id),
            name: name.to_string(),
            width: 100,
            height: 100,
            capacity: None,
            hosted: true,
            pinned: false,
        }
    }

    fn world() -> (GameState, Outbox) {
        let config = WorldConfig {
            zones: vec![zone_config(1, "Tulimshar"), zone_config(3, "Hurnscald")],
            ..WorldConfig::default()
        };
        let outbox = Outbox::new();
        let (accounts, _requests) = AccountQueue::channel();
        let state = GameState::new(&config, Box::new(outbox.clone()), Box::new(accounts));
        (state, outbox)
    }

    fn hero(state: &mut GameState, connection: u32, zone: u16, x: u16, y: u16) -> EntityKey {
        let entity = Entity::character(
            format!("hero{connection}"),
            Character::new(connection, ConnectionId(connection)),
            ZoneId(zone),
            Position::new(x, y),
        );
        state.insert(entity).expect("insert character")
    }

    fn monster(state: &mut GameState, x: u16, y: u16) -> EntityKey {
        state
            .insert(Entity::monster("Maggot", 1002, ZoneId(1), Position::new(x, y)))
            .expect("insert monster")
    }

    /// Game messages other than the per-tick status block.
    fn world_messages(log: &OutboxLog, connection: ConnectionId) -> Vec<&SentMessage> {
        log.to(connection)
            .filter(|message| message.id() != game::OPCODE_PLAYER_ATTRIBUTE_CHANGE)
            .collect()
    }

    fn reference(state: &GameState, key: EntityKey) -> EntityRef {
        state
            .entity(key)
            .and_then(Entity::reference)
            .expect("reference")
    }

    #[test]
    fn entering_entity_gets_one_enter_and_no_move() {
        let (mut state, outbox) = world();
        hero(&mut state, 1, 1, 100, 100);
        state.update();
        outbox.drain();

        monster(&mut state, 150, 150);
        state.update();
        let log = outbox.drain();
        assert_eq!(log.count_to(HERO, game::OPCODE_BEING_ENTER), 1);
        assert_eq!(log.count_to(HERO, game::OPCODE_BEINGS_MOVE), 0);
        assert_eq!(log.count_to(HERO, game::OPCODE_BEING_LEAVE), 0);
        let enter = log
            .to(HERO)
            .find(|message| message.id() == game::OPCODE_BEING_ENTER)
            .expect("enter");
        assert_eq!(enter.data[6..10], [0, 150, 0, 150]);
    }

    #[test]
    fn teleported_observer_sees_one_leave_and_no_move_for_it() {
        let (mut state, outbox) = world();
        let observer = hero(&mut state, 1, 1, 100, 100);
        let maggot = monster(&mut state, 110, 110);
        state.update();
        outbox.drain();

        let maggot_id = state.locate(maggot).expect("located").1;
        state
            .entity_mut(observer)
            .expect("observer")
            .set_position(Position::new(500, 500));
        state.update();
        let log = outbox.drain();
        assert_eq!(log.count_to(HERO, game::OPCODE_BEING_LEAVE), 1);
        let leave = log
            .to(HERO)
            .find(|message| message.id() == game::OPCODE_BEING_LEAVE)
            .expect("leave");
        assert_eq!(leave.data[2..4], maggot_id.0.to_be_bytes());
        // Only the observer's own entry may travel in the move batch.
        for message in log
            .to(HERO)
            .filter(|message| message.id() == game::OPCODE_BEINGS_MOVE)
        {
            assert_eq!(message.data.len(), 2 + 8);
            assert_ne!(message.data[2..4], maggot_id.0.to_be_bytes());
        }
    }

    #[test]
    fn party_health_reaches_members_out_of_sight() {
        let (mut state, outbox) = world();
        let first = hero(&mut state, 1, 1, 100, 100);
        let second = hero(&mut state, 2, 1, 3000, 3000);
        for key in [first, second] {
            let character = state
                .entity_mut(key)
                .and_then(Entity::as_character_mut)
                .expect("character");
            character.party = Some(PartyId(4));
        }
        state.update();
        outbox.drain();

        state.entity_mut(second).expect("second").apply_damage(10);
        state.update();
        let log = outbox.drain();
        assert_eq!(log.count_to(HERO, game::OPCODE_BEING_HEALTH_CHANGE), 1);
        assert_eq!(log.count_to(HERO, game::OPCODE_BEING_ENTER), 0);
    }

    #[test]
    fn idle_world_sends_only_status() {
        let (mut state, outbox) = world();
        hero(&mut state, 1, 1, 100, 100);
        monster(&mut state, 120, 120);
        state.update();
        outbox.drain();

        state.update();
        let log = outbox.drain();
        assert!(world_messages(&log, HERO).is_empty());
        assert_eq!(log.count_to(HERO, game::OPCODE_PLAYER_ATTRIBUTE_CHANGE), 1);
    }

    #[test]
    fn every_entity_is_flushed_after_a_tick() {
        let (mut state, _outbox) = world();
        let key = hero(&mut state, 1, 1, 100, 100);
        monster(&mut state, 150, 150);
        state
            .entity_mut(key)
            .expect("hero")
            .set_destination(Position::new(400, 100));
        state.update();
        let zone = state.zone(ZoneId(1)).expect("zone");
        for entity in zone.entities() {
            assert!(!entity.flags().any());
            assert_eq!(entity.old_position(), entity.position());
            assert!(entity.being().is_some_and(|being| being.hits_taken().is_empty()));
        }
    }

    #[test]
    fn queued_removal_beats_insert_and_warp() {
        let (mut state, outbox) = world();
        let key = hero(&mut state, 1, 1, 100, 100);
        let pending = state.enqueue_insert(Entity::monster(
            "Maggot",
            1002,
            ZoneId(1),
            Position::new(200, 200),
        ));
        state.enqueue_remove(pending);
        state.enqueue_warp(key, ZoneId(3), Position::new(50, 50));
        state.enqueue_remove(key);

        let report = state.update();
        assert_eq!(report.deferred_applied, 2);
        assert!(state.entity(pending).is_none());
        assert!(state.entity(key).is_none());
        assert_eq!(outbox.drain().killed, vec![HERO]);
    }

    #[test]
    fn first_queued_event_wins_for_warps_and_inserts() {
        let (mut state, _outbox) = world();
        let walker = hero(&mut state, 1, 1, 100, 100);
        state.enqueue_warp(walker, ZoneId(1), Position::new(200, 200));
        state.enqueue_warp(walker, ZoneId(3), Position::new(900, 900));
        let newcomer = state.enqueue_insert(Entity::monster(
            "Maggot",
            1002,
            ZoneId(1),
            Position::new(60, 60),
        ));
        state.enqueue_warp(newcomer, ZoneId(3), Position::new(700, 700));

        let report = state.update();
        assert_eq!(report.deferred_applied, 2);
        assert_eq!(state.locate(walker).map(|(zone, _)| zone), Some(ZoneId(1)));
        assert_eq!(
            state.entity(walker).map(Entity::position),
            Some(Position::new(200, 200))
        );
        assert_eq!(state.locate(newcomer).map(|(zone, _)| zone), Some(ZoneId(1)));
        assert_eq!(
            state.entity(newcomer).map(Entity::position),
            Some(Position::new(60, 60))
        );
    }

    #[test]
    fn deferred_insert_that_cannot_land_drops_the_client() {
        let mut cramped = zone_config(1, "Tulimshar");
        cramped.capacity = Some(1);
        let elsewhere = ZoneConfig {
            hosted: false,
            ..zone_config(5, "Candor")
        };
        let config = WorldConfig {
            zones: vec![cramped, elsewhere],
            ..WorldConfig::default()
        };
        let outbox = Outbox::new();
        let (accounts, _requests) = AccountQueue::channel();
        let mut state = GameState::new(&config, Box::new(outbox.clone()), Box::new(accounts));
        monster(&mut state, 100, 100);

        let late = state.enqueue_insert(Entity::character(
            "late",
            Character::new(1, HERO),
            ZoneId(1),
            Position::new(120, 120),
        ));
        let report = state.update();
        assert_eq!(report.deferred_applied, 1);
        assert!(state.entity(late).is_none());
        assert_eq!(state.zone(ZoneId(1)).map(Zone::len), Some(1));
        let log = outbox.drain();
        assert_eq!(log.killed, vec![HERO]);
        assert_eq!(log.count_to(HERO, game::OPCODE_PLAYER_MAP_CHANGE), 0);

        let visitor = ConnectionId(2);
        let stray = state.enqueue_insert(Entity::character(
            "visitor",
            Character::new(2, visitor),
            ZoneId(5),
            Position::new(64, 64),
        ));
        state.update();
        assert!(state.entity(stray).is_none());
        assert_eq!(outbox.drain().killed, vec![visitor]);
    }

    #[test]
    fn failing_script_leaves_its_zone_alone() {
        let (mut state, outbox) = world();
        let first = hero(&mut state, 1, 1, 100, 100);
        let second = hero(&mut state, 2, 3, 100, 100);
        let speaker = reference(&state, second);
        state.set_script(
            ZoneId(1),
            Box::new(FnScript(|_: &ZoneView<'_>| -> Result<Vec<ScriptAction>, ScriptError> {
                panic!("script exploded")
            })),
        );
        state.set_script(
            ZoneId(3),
            Box::new(FnScript(move |_: &ZoneView<'_>| -> Result<Vec<ScriptAction>, ScriptError> {
                Ok(vec![ScriptAction::Say {
                    speaker,
                    text: "hello".to_string(),
                }])
            })),
        );

        let report = state.update();
        assert_eq!(report.zones_updated, 2);
        assert_eq!(
            report.script_faults,
            vec![(ZoneId(1), ScriptError::Panicked("script exploded".to_string()))]
        );
        assert_eq!(
            state.entity(first).and_then(Entity::being).map(|being| being.health()),
            Some(100)
        );
        assert_eq!(outbox.drain().count_to(ConnectionId(2), game::OPCODE_SAY), 1);
    }

    #[test]
    fn script_errors_discard_their_actions() {
        let (mut state, _outbox) = world();
        let key = hero(&mut state, 1, 1, 100, 100);
        state.set_script(
            ZoneId(1),
            Box::new(FnScript(|_: &ZoneView<'_>| -> Result<Vec<ScriptAction>, ScriptError> {
                Err(ScriptError::Failed("missing npc".to_string()))
            })),
        );
        let report = state.update();
        assert_eq!(report.script_faults.len(), 1);
        assert!(state.entity(key).is_some());
    }

    #[test]
    fn script_actions_drive_entities() {
        let (mut state, _outbox) = world();
        let key = hero(&mut state, 1, 1, 100, 100);
        let target = reference(&state, key);
        state.set_script(
            ZoneId(1),
            Box::new(FnScript(move |view: &ZoneView<'_>| -> Result<Vec<ScriptAction>, ScriptError> {
                if view.tick.0 > 0 {
                    return Ok(Vec::new());
                }
                Ok(vec![
                    ScriptAction::Damage {
                        entity: target,
                        amount: 25,
                    },
                    ScriptAction::Modify {
                        entity: target,
                        attribute: AttributeId::Defense,
                        value: 5,
                        duration: 0,
                        level: 0,
                    },
                    ScriptAction::Face {
                        entity: target,
                        direction: Direction::Left,
                    },
                ])
            })),
        );
        state.update();
        let being = state.entity(key).and_then(Entity::being).expect("being");
        assert_eq!(being.health(), 75);
        assert_eq!(being.attributes.effective(AttributeId::Defense), 5);
        assert_eq!(being.direction, Direction::Left);
    }

    #[test]
    fn dead_monster_decays_and_leaves() {
        let (mut state, outbox) = world();
        hero(&mut state, 1, 1, 100, 100);
        let maggot = monster(&mut state, 150, 150);
        state
            .entity_mut(maggot)
            .and_then(Entity::being_mut)
            .expect("maggot")
            .attributes
            .set_base(AttributeId::Health, 0);

        state.update();
        let being = state.entity(maggot).and_then(Entity::being).expect("maggot");
        assert_eq!(being.action, Action::Dead);
        for _ in 0..10 {
            state.update();
        }
        assert!(state.entity(maggot).is_some());
        for _ in 0..50 {
            state.update();
        }
        assert!(state.entity(maggot).is_none());
        assert_eq!(outbox.drain().count_to(HERO, game::OPCODE_BEING_LEAVE), 1);
    }

    #[test]
    fn monster_attack_hits_once_per_cooldown() {
        let (mut state, outbox) = world();
        let victim = hero(&mut state, 1, 1, 100, 100);
        let maggot = monster(&mut state, 130, 100);
        state.update();
        outbox.drain();

        let target = reference(&state, victim);
        let attacker = state.entity_mut(maggot).expect("maggot");
        if let Some(being) = attacker.being_mut() {
            being.target = Some(target);
        }
        attacker.set_action(Action::Attack);
        state.update();
        let log = outbox.drain();
        assert_eq!(log.count_to(HERO, game::OPCODE_BEING_ATTACK), 1);
        assert_eq!(log.count_to(HERO, game::OPCODE_BEINGS_DAMAGE), 1);
        let maggot_view = state.entity(maggot).and_then(Entity::being).expect("maggot");
        assert_eq!(maggot_view.direction, Direction::Left);
        assert_eq!(
            state.entity(victim).and_then(Entity::being).map(|being| being.health()),
            Some(90)
        );

        state.update();
        assert_eq!(outbox.drain().count_to(HERO, game::OPCODE_BEING_ATTACK), 0);
    }

    #[test]
    fn evaded_attack_is_shown_but_deals_nothing() {
        let (mut state, outbox) = world();
        let victim = hero(&mut state, 1, 1, 100, 100);
        let maggot = monster(&mut state, 130, 100);
        state
            .entity_mut(victim)
            .and_then(Entity::being_mut)
            .expect("victim")
            .attributes
            .set_base(AttributeId::Evade, 1000);
        state.update();
        outbox.drain();

        let target = reference(&state, victim);
        let attacker = state.entity_mut(maggot).expect("maggot");
        if let Some(being) = attacker.being_mut() {
            being.target = Some(target);
            being.attributes.set_base(AttributeId::Accuracy, 0);
        }
        attacker.set_action(Action::Attack);
        state.update();
        let log = outbox.drain();
        let attack = log
            .to(HERO)
            .find(|message| message.id() == game::OPCODE_BEING_ATTACK)
            .expect("attack");
        assert_eq!(attack.data[5], AttackType::Flee.wire());
        assert_eq!(log.count_to(HERO, game::OPCODE_BEINGS_DAMAGE), 0);
        assert_eq!(
            state.entity(victim).and_then(Entity::being).map(|being| being.health()),
            Some(100)
        );
        let maggot_view = state.entity(maggot).and_then(Entity::being).expect("maggot");
        assert!(maggot_view.timers.is_running(TimerKind::AttackCooldown));
    }

    #[test]
    fn attacker_without_target_stands() {
        let (mut state, _outbox) = world();
        hero(&mut state, 1, 1, 100, 100);
        let maggot = monster(&mut state, 130, 100);
        state
            .entity_mut(maggot)
            .expect("maggot")
            .set_action(Action::Attack);
        state.update();
        let being = state.entity(maggot).and_then(Entity::being).expect("maggot");
        assert_eq!(being.action, Action::Stand);
    }

    #[test]
    fn walking_takes_speed_into_account() {
        let (mut state, _outbox) = world();
        let start = TilePos::new(3, 3).center();
        let destination = TilePos::new(5, 3).center();
        let key = hero(&mut state, 1, 1, start.x, start.y);
        state
            .entity_mut(key)
            .expect("hero")
            .set_destination(destination);

        state.update();
        let being = state.entity(key).and_then(Entity::being).expect("hero");
        assert_eq!(being.action, Action::Walk);
        assert_eq!(state.entity(key).map(Entity::position), Some(start));

        for _ in 0..2 {
            state.update();
        }
        assert_eq!(
            state.entity(key).map(Entity::position),
            Some(TilePos::new(4, 3).center())
        );

        for _ in 0..2 {
            state.update();
        }
        let entity = state.entity(key).expect("hero");
        assert_eq!(entity.position(), destination);
        let being = entity.being().expect("hero");
        assert_eq!(being.destination, None);
        assert_eq!(being.action, Action::Stand);
        assert_eq!(being.direction, Direction::Right);
    }

    #[test]
    fn unreachable_destination_is_dropped() {
        let (mut state, _outbox) = world();
        let key = hero(&mut state, 1, 1, 100, 100);
        state
            .entity_mut(key)
            .expect("hero")
            .set_destination(Position::new(60000, 100));
        state.update();
        let entity = state.entity(key).expect("hero");
        assert_eq!(entity.position(), Position::new(100, 100));
        assert_eq!(entity.being().and_then(|being| being.destination), None);
    }

    #[test]
    fn effects_are_shown_once_then_removed() {
        let (mut state, outbox) = world();
        hero(&mut state, 1, 1, 100, 100);
        let effect = state.enqueue_insert(Entity::effect(7, None, ZoneId(1), Position::new(120, 120)));
        state.update();
        assert!(state.entity(effect).is_some());
        outbox.drain();

        state.update();
        assert_eq!(outbox.drain().count_to(HERO, game::OPCODE_CREATE_EFFECT_POS), 1);
        assert!(state.entity(effect).is_none());
        state.update();
        assert_eq!(outbox.drain().count_to(HERO, game::OPCODE_CREATE_EFFECT_POS), 0);
    }

    #[test]
    fn empty_zones_are_skipped() {
        let (mut state, _outbox) = world();
        monster(&mut state, 100, 100);
        let report = state.update();
        assert_eq!(report.zones_updated, 0);
        assert_eq!(report.tick, 0);
        assert_eq!(state.clock().now(), GameTick(1));
    }
}
