use crate::entities::being::ConnectionId;
use crate::net::packet::PacketWriter;
use std::sync::{Arc, Mutex, MutexGuard};

/// Outbound side of the game. Owns the transport; the simulation only hands
/// it finished messages.
pub trait Dispatch {
    fn send_to(&mut self, connection: ConnectionId, message: &PacketWriter);
    fn send_to_everyone(&mut self, message: &PacketWriter);
    /// Drops a client whose character left the game.
    fn kill(&mut self, connection: ConnectionId);
    fn prepare_server_change(&mut self, connection: ConnectionId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Connection(ConnectionId),
    Everyone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: Recipient,
    pub data: Vec<u8>,
}

impl SentMessage {
    pub fn id(&self) -> u16 {
        match self.data.as_slice() {
            [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]),
            _ => 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct OutboxLog {
    pub sent: Vec<SentMessage>,
    pub killed: Vec<ConnectionId>,
    pub server_changes: Vec<ConnectionId>,
}

impl OutboxLog {
    pub fn to(&self, connection: ConnectionId) -> impl Iterator<Item = &SentMessage> + '_ {
        self.sent
            .iter()
            .filter(move |message| message.recipient == Recipient::Connection(connection))
    }

    pub fn count_to(&self, connection: ConnectionId, id: u16) -> usize {
        self.to(connection).filter(|message| message.id() == id).count()
    }
}

/// Dispatcher that records everything it is asked to send. Clones share the
/// same log, so one handle can go into the game state and another can read.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    log: Arc<Mutex<OutboxLog>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> MutexGuard<'_, OutboxLog> {
        match self.log.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Takes everything recorded so far, leaving the log empty.
    pub fn drain(&self) -> OutboxLog {
        std::mem::take(&mut *self.log())
    }
}

impl Dispatch for Outbox {
    fn send_to(&mut self, connection: ConnectionId, message: &PacketWriter) {
        self.log().sent.push(SentMessage {
            recipient: Recipient::Connection(connection),
            data: message.as_slice().to_vec(),
        });
    }

    fn send_to_everyone(&mut self, message: &PacketWriter) {
        self.log().sent.push(SentMessage {
            recipient: Recipient::Everyone,
            data: message.as_slice().to_vec(),
        });
    }

    fn kill(&mut self, connection: ConnectionId) {
        self.log().killed.push(connection);
    }

    fn prepare_server_change(&mut self, connection: ConnectionId) {
        self.log().server_changes.push(connection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_log() {
        let reader = Outbox::new();
        let mut writer = reader.clone();
        writer.send_to(ConnectionId(3), &PacketWriter::new(0x0201));
        writer.send_to_everyone(&PacketWriter::new(0x02c1));
        writer.kill(ConnectionId(3));
        let log = reader.drain();
        assert_eq!(log.sent.len(), 2);
        assert_eq!(log.count_to(ConnectionId(3), 0x0201), 1);
        assert_eq!(log.sent[1].recipient, Recipient::Everyone);
        assert_eq!(log.killed, vec![ConnectionId(3)]);
        assert!(reader.log().sent.is_empty());
    }
}
