use crate::entities::entity::Entity;
use crate::entities::inventory::EQUIP_SLOTS;
use crate::entities::stats::AttributeId;
use crate::net::game;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Link to the account server. Every call is fire-and-forget: it must not
/// block a tick and its outcome is never read back by the simulation.
pub trait AccountConnection {
    fn send_character_data(&mut self, snapshot: CharacterSnapshot);
    fn update_online_status(&mut self, database_id: u32, online: bool);
    /// Hands a character over to whichever server hosts its new zone.
    fn redirect(&mut self, database_id: u32);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterSnapshot {
    pub database_id: u32,
    pub name: String,
    pub zone: u16,
    pub x: u16,
    pub y: u16,
    pub health: i32,
    pub max_health: i32,
    pub hair_style: u8,
    pub hair_color: u8,
    pub gender: u8,
    pub equipment: Vec<Option<u16>>,
}

impl CharacterSnapshot {
    pub fn capture(entity: &Entity) -> Option<Self> {
        let being = entity.being()?;
        let character = being.character()?;
        let looks = &character.looks;
        Some(Self {
            database_id: character.database_id,
            name: being.name.clone(),
            zone: entity.zone().0,
            x: entity.position().x,
            y: entity.position().y,
            health: being.attributes.base(AttributeId::Health),
            max_health: being.attributes.base(AttributeId::MaxHealth),
            hair_style: looks.hair_style,
            hair_color: looks.hair_color,
            gender: looks.gender as u8,
            equipment: EQUIP_SLOTS
                .iter()
                .map(|slot| looks.equipment.slot(*slot).map(|item| item.0))
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRequest {
    CharacterData(CharacterSnapshot),
    OnlineStatus { database_id: u32, online: bool },
    /// Encoded redirect message, ready for the account server link.
    Redirect { database_id: u32, message: Vec<u8> },
}

/// Queues requests on a channel; whoever holds the receiver does the slow
/// work off the tick thread.
#[derive(Debug, Clone)]
pub struct AccountQueue {
    sender: Sender<AccountRequest>,
}

impl AccountQueue {
    pub fn channel() -> (Self, Receiver<AccountRequest>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }

    /// Starts a worker that stores character data as YAML under
    /// `<root>/save/characters/`. The worker exits once every queue handle
    /// is dropped.
    pub fn spawn_writer(root: &Path) -> Result<(Self, JoinHandle<()>), String> {
        let dir = root.join("save").join("characters");
        fs::create_dir_all(&dir).map_err(|err| {
            format!("character save dir create failed for {}: {}", dir.display(), err)
        })?;
        let (queue, receiver) = Self::channel();
        let handle = thread::Builder::new()
            .name("account-writer".to_string())
            .spawn(move || run_writer(&dir, receiver))
            .map_err(|err| format!("account writer spawn failed: {err}"))?;
        Ok((queue, handle))
    }

    fn push(&self, request: AccountRequest) {
        if self.sender.send(request).is_err() {
            tracing::warn!("account queue closed, request dropped");
        }
    }
}

impl AccountConnection for AccountQueue {
    fn send_character_data(&mut self, snapshot: CharacterSnapshot) {
        self.push(AccountRequest::CharacterData(snapshot));
    }

    fn update_online_status(&mut self, database_id: u32, online: bool) {
        self.push(AccountRequest::OnlineStatus {
            database_id,
            online,
        });
    }

    fn redirect(&mut self, database_id: u32) {
        let message = game::redirect(database_id).into_vec();
        self.push(AccountRequest::Redirect {
            database_id,
            message,
        });
    }
}

fn snapshot_path(dir: &Path, database_id: u32) -> PathBuf {
    dir.join(format!("{database_id}.yaml"))
}

fn save_snapshot(dir: &Path, snapshot: &CharacterSnapshot) -> Result<(), String> {
    let path = snapshot_path(dir, snapshot.database_id);
    let data = serde_yaml::to_string(snapshot)
        .map_err(|err| format!("character serialize failed for {}: {}", snapshot.name, err))?;
    fs::write(&path, data)
        .map_err(|err| format!("character save write failed for {}: {}", path.display(), err))
}

fn run_writer(dir: &Path, receiver: Receiver<AccountRequest>) {
    for request in receiver {
        match request {
            AccountRequest::CharacterData(snapshot) => {
                if let Err(err) = save_snapshot(dir, &snapshot) {
                    tracing::error!("{err}");
                }
            }
            AccountRequest::OnlineStatus {
                database_id,
                online,
            } => {
                tracing::info!(database_id, online, "online status");
            }
            AccountRequest::Redirect { database_id, .. } => {
                tracing::info!(database_id, "character redirected");
            }
        }
    }
}
