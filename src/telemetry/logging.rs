use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const HEADER_LINE: &str = "-------------------------------------------------------------------------------";
const HEADER_TITLE: &str = "Mana - World State Server";
const GAME_LOG: &str = "game.log";

/// Sends every `tracing` event to stderr and to `<root>/log/game.log`.
/// `RUST_LOG` picks the level, `info` otherwise. Calling it again is a no-op.
pub fn init(root: &Path) -> Result<(), String> {
    let log_dir = root.join("log");
    std::fs::create_dir_all(&log_dir)
        .map_err(|err| format!("log directory create failed: {}", err))?;
    let file = open_log(&log_dir.join(GAME_LOG))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init();
    if installed.is_err() {
        tracing::debug!("logging already initialized");
    }
    Ok(())
}

fn open_log(path: &Path) -> Result<File, String> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| format!("open log {} failed: {}", path.display(), err))?;
    if file.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
        write_header(&mut file)?;
    }
    Ok(file)
}

fn write_header(file: &mut File) -> Result<(), String> {
    let started = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    writeln!(file, "{HEADER_LINE}").map_err(|err| format!("header write failed: {}", err))?;
    writeln!(file, "{HEADER_TITLE}").map_err(|err| format!("header write failed: {}", err))?;
    writeln!(file, "{GAME_LOG} - started at unix time {started}")
        .map_err(|err| format!("header write failed: {}", err))?;
    Ok(())
}
