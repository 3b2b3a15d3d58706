use crate::entities::item::{ItemClass, ItemClassDb};
use crate::world::zone::{Zone, ZoneId};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("usage: mana <root> [max_ticks]")]
    Usage,
    #[error("invalid max_ticks {0:?}")]
    InvalidTicks(String),
    #[error("world config read failed for {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("world config parse failed for {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("zone {0} is defined twice")]
    DuplicateZone(ZoneId),
    #[error("zone {0} has no area")]
    EmptyZone(ZoneId),
}

#[derive(Debug)]
pub struct AppConfig {
    pub root: PathBuf,
    /// 0 runs until the process is stopped.
    pub max_ticks: u64,
    pub tick_ms_override: Option<u64>,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        if args.len() < 2 {
            return Err(ConfigError::Usage);
        }
        let root = Path::new(&args[1]).to_path_buf();
        let max_ticks = match args.get(2) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTicks(value.clone()))?,
            None => env_number("MANA_MAX_TICKS").unwrap_or(0),
        };
        let tick_ms_override = env_number("MANA_TICK_MS").filter(|ms| *ms > 0);
        Ok(Self {
            root,
            max_ticks,
            tick_ms_override,
        })
    }
}

fn env_number(name: &str) -> Option<u64> {
    let value = std::env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(number) => Some(number),
        Err(_) => {
            tracing::warn!(name, value = trimmed, "ignoring invalid environment override");
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub tick_ms: u64,
    /// Half-width of the square each character receives updates about.
    pub visual_range: u16,
    pub default_capacity: u16,
    pub bucket_size: u16,
    pub zones: Vec<ZoneConfig>,
    pub items: Vec<ItemClass>,
    /// Seeds combat rolls; 0 picks a fixed default.
    pub combat_seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            visual_range: 320,
            default_capacity: 1024,
            bucket_size: 256,
            zones: Vec::new(),
            items: Vec::new(),
            combat_seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneConfig {
    pub id: ZoneId,
    pub name: String,
    pub width: u16,
    pub height: u16,
    #[serde(default)]
    pub capacity: Option<u16>,
    #[serde(default = "default_true")]
    pub hosted: bool,
    #[serde(default)]
    pub pinned: bool,
}

fn default_true() -> bool {
    true
}

impl WorldConfig {
    pub fn parse(data: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `<root>/world.yaml`; a missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join("world.yaml");
        match fs::read_to_string(&path) {
            Ok(data) => Self::parse(&data, &path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "world config missing, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::BTreeSet::new();
        for zone in &self.zones {
            if !seen.insert(zone.id) {
                return Err(ConfigError::DuplicateZone(zone.id));
            }
            if zone.width == 0 || zone.height == 0 {
                return Err(ConfigError::EmptyZone(zone.id));
            }
        }
        Ok(())
    }

    pub fn build_zones(&self) -> Vec<Zone> {
        self.zones
            .iter()
            .map(|zone| {
                let mut built = Zone::new(
                    zone.id,
                    zone.name.clone(),
                    zone.width,
                    zone.height,
                    zone.capacity.unwrap_or(self.default_capacity),
                    self.bucket_size,
                );
                built.hosted = zone.hosted;
                built.pinned = zone.pinned;
                built
            })
            .collect()
    }

    pub fn item_db(&self) -> ItemClassDb {
        ItemClassDb::from_classes(self.items.iter().cloned())
    }
}
