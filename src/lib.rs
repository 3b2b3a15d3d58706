pub mod combat;
mod config;
pub mod entities;
pub mod net;
pub mod persistence;
pub mod scripting;
pub mod telemetry;
pub mod world;

pub use config::{AppConfig, ConfigError, WorldConfig, ZoneConfig};
pub use entities::entity::{Entity, EntityKey, EntityKind, EntityRef, PublicId};
pub use net::dispatch::{Dispatch, Outbox};
pub use net::packet::{PacketReader, PacketWriter};
pub use persistence::accounts::{AccountConnection, AccountQueue, CharacterSnapshot};
pub use scripting::{FnScript, ScriptAction, ScriptError, ZoneScript, ZoneView};
pub use world::state::{GameState, StateError};
pub use world::tick::TickReport;
pub use world::zone::{InsertError, Zone, ZoneId};

pub fn run(args: &[String]) -> Result<(), String> {
    let config = AppConfig::from_args(args).map_err(|err| err.to_string())?;
    telemetry::logging::init(&config.root)?;
    let mut world = WorldConfig::load(&config.root).map_err(|err| err.to_string())?;
    if let Some(tick_ms) = config.tick_ms_override {
        world.tick_ms = tick_ms;
    }
    tracing::info!(
        root = %config.root.display(),
        zones = world.zones.len(),
        items = world.items.len(),
        tick_ms = world.tick_ms,
        "world loaded"
    );

    let outbox = Outbox::new();
    let (accounts, writer) = AccountQueue::spawn_writer(&config.root)?;
    let mut state = GameState::new(&world, Box::new(outbox.clone()), Box::new(accounts));
    let tick_length = state.clock().tick_length();

    let mut ticks = 0u64;
    while config.max_ticks == 0 || ticks < config.max_ticks {
        let started = std::time::Instant::now();
        let report = state.update();
        let sent = outbox.drain();
        tracing::debug!(
            tick = report.tick,
            zones = report.zones_updated,
            deferred = report.deferred_applied,
            messages = sent.sent.len(),
            "tick done"
        );
        for (zone, err) in &report.script_faults {
            tracing::warn!(zone = %zone, "zone script skipped this tick: {err}");
        }
        ticks += 1;
        let elapsed = started.elapsed();
        if elapsed < tick_length {
            std::thread::sleep(tick_length - elapsed);
        } else {
            tracing::warn!(tick = report.tick, elapsed_ms = elapsed.as_millis() as u64, "tick overran");
        }
    }

    let state_time = state.clock().simulated();
    drop(state);
    if writer.join().is_err() {
        tracing::error!("account writer thread panicked");
    }
    tracing::info!(
        ticks,
        simulated_ms = state_time.as_millis() as u64,
        "shutting down"
    );
    Ok(())
}
