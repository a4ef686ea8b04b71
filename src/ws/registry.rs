use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::SyncPolicy;
use crate::models::messages::{
    CodeChangeMessage, ConnectionId, DisconnectedMessage, ErrorMessage, JoinedMessage,
    ServerEvent, SyncCodeMessage,
};
use super::room::{Participant, Room};

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub outbound_capacity: usize,
    pub sync_policy: SyncPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 100,
            sync_policy: SyncPolicy::All,
        }
    }
}

/// Read-only view of one room.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub connections: usize,
    pub joined: usize,
    pub rooms: usize,
}

pub enum RegistryCommand {
    Connect {
        conn_id: ConnectionId,
        outbound: mpsc::Sender<ServerEvent>,
    },
    Join {
        conn_id: ConnectionId,
        room: String,
        display_name: String,
    },
    SyncCode {
        conn_id: ConnectionId,
        target: ConnectionId,
        code: Option<String>,
    },
    CodeChange {
        conn_id: ConnectionId,
        code: String,
    },
    Reject {
        conn_id: ConnectionId,
        reason: String,
    },
    Disconnect {
        conn_id: ConnectionId,
    },
    Rooms {
        reply: oneshot::Sender<Vec<RoomSnapshot>>,
    },
    Room {
        room_id: String,
        reply: oneshot::Sender<Option<RoomSnapshot>>,
    },
    Stats {
        reply: oneshot::Sender<RegistryStats>,
    },
}

/// Handle to the registry actor (cheap to clone).
///
/// A single task owns every room and every connection's outbound queue.
/// Commands go over an unbounded channel and are processed one at a time,
/// so membership changes and the announcements derived from them never
/// interleave.
#[derive(Clone)]
pub struct RegistryHandle {
    command_tx: mpsc::UnboundedSender<RegistryCommand>,
    outbound_capacity: usize,
}

impl RegistryHandle {
    pub fn spawn(config: RegistryConfig) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let outbound_capacity = config.outbound_capacity.max(1);
        tokio::spawn(registry_loop(Registry::new(config), command_rx));
        Self {
            command_tx,
            outbound_capacity,
        }
    }

    /// Register a freshly opened channel. The registry keeps the only
    /// sender; the returned receiver ends once the connection is removed.
    pub fn connect(&self, conn_id: ConnectionId) -> mpsc::Receiver<ServerEvent> {
        let (outbound, rx) = mpsc::channel(self.outbound_capacity);
        self.send(RegistryCommand::Connect { conn_id, outbound });
        rx
    }

    pub fn join(&self, conn_id: ConnectionId, room: String, display_name: String) {
        self.send(RegistryCommand::Join {
            conn_id,
            room,
            display_name,
        });
    }

    pub fn sync_code(&self, conn_id: ConnectionId, target: ConnectionId, code: Option<String>) {
        self.send(RegistryCommand::SyncCode {
            conn_id,
            target,
            code,
        });
    }

    pub fn code_change(&self, conn_id: ConnectionId, code: String) {
        self.send(RegistryCommand::CodeChange { conn_id, code });
    }

    /// Report a protocol violation; the connection gets an error event and is evicted.
    pub fn reject(&self, conn_id: ConnectionId, reason: impl Into<String>) {
        self.send(RegistryCommand::Reject {
            conn_id,
            reason: reason.into(),
        });
    }

    pub fn disconnect(&self, conn_id: ConnectionId) {
        self.send(RegistryCommand::Disconnect { conn_id });
    }

    pub async fn rooms(&self) -> Vec<RoomSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::Rooms { reply });
        rx.await.unwrap_or_default()
    }

    pub async fn room(&self, room_id: &str) -> Option<RoomSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::Room {
            room_id: room_id.to_string(),
            reply,
        });
        rx.await.ok().flatten()
    }

    pub async fn stats(&self) -> RegistryStats {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::Stats { reply });
        rx.await.unwrap_or_default()
    }

    fn send(&self, cmd: RegistryCommand) {
        if self.command_tx.send(cmd).is_err() {
            warn!("Registry channel closed, command dropped");
        }
    }
}

struct Connection {
    outbound: mpsc::Sender<ServerEvent>,
    room: Option<String>,
}

struct Registry {
    config: RegistryConfig,
    connections: HashMap<ConnectionId, Connection>,
    rooms: HashMap<String, Room>,
    evictions: VecDeque<(ConnectionId, String)>,
}

async fn registry_loop(
    mut registry: Registry,
    mut command_rx: mpsc::UnboundedReceiver<RegistryCommand>,
) {
    while let Some(cmd) = command_rx.recv().await {
        registry.handle(cmd);
    }
    debug!("Registry loop stopped");
}

impl Registry {
    fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            connections: HashMap::new(),
            rooms: HashMap::new(),
            evictions: VecDeque::new(),
        }
    }

    fn handle(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Connect { conn_id, outbound } => {
                debug!("Connection {} registered", conn_id);
                self.connections.insert(
                    conn_id,
                    Connection {
                        outbound,
                        room: None,
                    },
                );
            }
            RegistryCommand::Join {
                conn_id,
                room,
                display_name,
            } => self.join(conn_id, room, display_name),
            RegistryCommand::SyncCode {
                conn_id,
                target,
                code,
            } => self.sync_code(conn_id, target, code),
            RegistryCommand::CodeChange { conn_id, code } => self.code_change(conn_id, code),
            RegistryCommand::Reject { conn_id, reason } => self.reject(conn_id, reason),
            RegistryCommand::Disconnect { conn_id } => self.remove_connection(&conn_id),
            RegistryCommand::Rooms { reply } => {
                let mut rooms: Vec<_> = self.rooms.values().map(snapshot).collect();
                rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at));
                let _ = reply.send(rooms);
            }
            RegistryCommand::Room { room_id, reply } => {
                let _ = reply.send(self.rooms.get(&room_id).map(snapshot));
            }
            RegistryCommand::Stats { reply } => {
                let _ = reply.send(RegistryStats {
                    connections: self.connections.len(),
                    joined: self.rooms.values().map(Room::len).sum(),
                    rooms: self.rooms.len(),
                });
            }
        }

        // Evictions can cascade: announcing one departure may overflow
        // another member's queue.
        while let Some((conn_id, reason)) = self.evictions.pop_front() {
            warn!("Evicting connection {}: {}", conn_id, reason);
            self.remove_connection(&conn_id);
        }
    }

    fn join(&mut self, conn_id: ConnectionId, room_id: String, display_name: String) {
        let current_room = match self.connections.get(&conn_id) {
            Some(conn) => conn.room.clone(),
            // Already gone; the join raced with a disconnect.
            None => return,
        };
        if let Some(current) = current_room {
            self.reject(conn_id, format!("already joined room '{}'", current));
            return;
        }

        // Stored exactly as sent; clients compare names byte for byte.
        if room_id.trim().is_empty() {
            self.reject(conn_id, "room must not be empty".to_string());
            return;
        }
        if display_name.trim().is_empty() {
            self.reject(conn_id, "displayName must not be empty".to_string());
            return;
        }

        let room = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            info!("Room '{}' created", room_id);
            Room::new(room_id.clone())
        });
        room.admit(conn_id.clone(), display_name.clone());
        if let Some(conn) = self.connections.get_mut(&conn_id) {
            conn.room = Some(room_id.clone());
        }

        let sync_source = match self.config.sync_policy {
            SyncPolicy::All => None,
            SyncPolicy::Elected => room.eldest_except(&conn_id),
        };
        let joined = JoinedMessage {
            members: room.members(),
            joiner_name: display_name.clone(),
            joiner_connection_id: conn_id.clone(),
            sync_source,
        };
        let recipients: Vec<ConnectionId> =
            room.participants().iter().map(|p| p.connection_id.clone()).collect();

        info!(
            "{} ({}) joined room '{}' ({} members)",
            display_name,
            conn_id,
            room_id,
            recipients.len()
        );

        for recipient in &recipients {
            self.deliver(recipient, ServerEvent::Joined(joined.clone()));
        }
    }

    fn sync_code(&mut self, conn_id: ConnectionId, target: ConnectionId, code: Option<String>) {
        let Some(room_id) = self.joined_room(&conn_id, "sync-code") else {
            return;
        };

        let target_present = self
            .rooms
            .get(&room_id)
            .map(|room| room.contains(&target))
            .unwrap_or(false);
        if !target_present {
            debug!(
                "Dropping sync-code from {} to {}: target is not in room '{}'",
                conn_id, target, room_id
            );
            return;
        }

        self.deliver(&target, ServerEvent::SyncCode(SyncCodeMessage { code }));
    }

    fn code_change(&mut self, conn_id: ConnectionId, code: String) {
        let Some(room_id) = self.joined_room(&conn_id, "code-change") else {
            return;
        };

        let others = match self.rooms.get(&room_id) {
            Some(room) => room.others(&conn_id),
            None => return,
        };
        for other in &others {
            self.deliver(
                other,
                ServerEvent::CodeChange(CodeChangeMessage { code: code.clone() }),
            );
        }
    }

    /// The room a sender has joined. Anything else is a protocol violation
    /// and the sender gets rejected.
    fn joined_room(&mut self, conn_id: &ConnectionId, event: &str) -> Option<String> {
        let room = self.connections.get(conn_id)?.room.clone();
        if room.is_none() {
            self.reject(conn_id.clone(), format!("{} sent before join", event));
        }
        room
    }

    fn reject(&mut self, conn_id: ConnectionId, reason: String) {
        if let Some(conn) = self.connections.get(&conn_id) {
            // Best effort: a full queue just means the client never sees why.
            let _ = conn.outbound.try_send(ServerEvent::Error(ErrorMessage {
                message: reason.clone(),
            }));
        }
        self.evictions.push_back((conn_id, reason));
    }

    fn deliver(&mut self, conn_id: &ConnectionId, event: ServerEvent) {
        let Some(conn) = self.connections.get(conn_id) else {
            return;
        };
        match conn.outbound.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.evictions.push_back((
                    conn_id.clone(),
                    format!("outbound queue full while sending {}", event.kind()),
                ));
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // Writer already gone, the socket handler's disconnect is on its way.
                debug!("Outbound channel for {} closed", conn_id);
            }
        }
    }

    fn remove_connection(&mut self, conn_id: &ConnectionId) {
        let Some(conn) = self.connections.remove(conn_id) else {
            return;
        };
        // Dropping `conn` drops the last outbound sender, ending the writer.
        let Some(room_id) = conn.room else {
            debug!("Connection {} closed before joining", conn_id);
            return;
        };

        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        let Some(participant) = room.remove(conn_id) else {
            return;
        };
        info!(
            "{} ({}) left room '{}'",
            participant.display_name, conn_id, room_id
        );

        if room.is_empty() {
            self.rooms.remove(&room_id);
            info!("Room '{}' is empty and was discarded", room_id);
            return;
        }

        let remaining: Vec<ConnectionId> =
            room.participants().iter().map(|p| p.connection_id.clone()).collect();
        let departed = DisconnectedMessage {
            connection_id: conn_id.clone(),
            display_name: participant.display_name,
        };
        for member in &remaining {
            self.deliver(member, ServerEvent::Disconnected(departed.clone()));
        }
    }
}

fn snapshot(room: &Room) -> RoomSnapshot {
    RoomSnapshot {
        id: room.id.clone(),
        created_at: room.created_at,
        participants: room.participants().to_vec(),
    }
}
