//! Authenticated WebSocket session binding and identity-scoped fan-out.
//!
//! The hub owns two maps per connection: the identity it authenticated as and
//! the set of groups it joined. A reverse index (group -> connections) makes
//! pushes cheap. Nothing here touches persisted state.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc::{Receiver, Sender, channel, error::TrySendError};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::jwt::{SigningDomain, TokenCodec};
use crate::application::ports::notifier::{Notifier, timestamp};

pub type ConnectionId = Uuid;

pub const UNAUTHORIZED_MESSAGE: &str = "err_user_unauthorized";

/// Events buffered per connection before new ones are dropped.
pub const OUTBOX_CAPACITY: usize = 256;

const IDENTITY_GROUP_PREFIX: &str = "user_";

/// Group every connection of an identity joins on successful handshake.
pub fn identity_group(user_id: Uuid) -> String {
    format!("{IDENTITY_GROUP_PREFIX}{user_id}")
}

/// Frame sent to a client: `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundEvent {
    pub event: String,
    pub data: Value,
}

impl OutboundEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn error(message: &str) -> Self {
        Self::new("error", json!({ "message": message }))
    }
}

/// Frame received from a client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinRoom { room: String },
    LeaveRoom { room: String },
    Ping,
}

struct Connection {
    identity: Option<Uuid>,
    groups: HashSet<String>,
    outbox: Sender<OutboundEvent>,
}

impl Connection {
    /// Queue without waiting. A full outbox means the client is not reading,
    /// so the event is dropped for that client only.
    fn push(&self, conn_id: ConnectionId, event: OutboundEvent) -> bool {
        match self.outbox.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(connection_id = %conn_id, event = %event.event, "Outbox full, dropping event");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[derive(Default)]
struct HubState {
    connections: HashMap<ConnectionId, Connection>,
    members: HashMap<String, HashSet<ConnectionId>>,
}

impl HubState {
    fn join(&mut self, conn_id: ConnectionId, group: &str) -> bool {
        let Some(conn) = self.connections.get_mut(&conn_id) else {
            return false;
        };
        conn.groups.insert(group.to_string());
        self.members
            .entry(group.to_string())
            .or_default()
            .insert(conn_id);
        true
    }

    fn leave(&mut self, conn_id: ConnectionId, group: &str) {
        if let Some(conn) = self.connections.get_mut(&conn_id) {
            conn.groups.remove(group);
        }
        if let Some(members) = self.members.get_mut(group) {
            members.remove(&conn_id);
            if members.is_empty() {
                self.members.remove(group);
            }
        }
    }
}

pub struct SessionHub {
    codec: TokenCodec,
    state: RwLock<HubState>,
}

impl SessionHub {
    pub fn new(codec: TokenCodec) -> Self {
        Self {
            codec,
            state: RwLock::new(HubState::default()),
        }
    }

    /// Track a new, not yet authenticated connection.
    pub fn connect(&self) -> (ConnectionId, Receiver<OutboundEvent>) {
        let (outbox, inbox) = channel(OUTBOX_CAPACITY);
        let conn_id = Uuid::new_v4();
        self.state.write().connections.insert(
            conn_id,
            Connection {
                identity: None,
                groups: HashSet::new(),
                outbox,
            },
        );
        (conn_id, inbox)
    }

    /// Verify the handshake token against the primary domain and bind the
    /// connection to its identity group. On failure the client gets an
    /// `error` event and the caller must close the socket.
    pub fn authenticate(&self, conn_id: ConnectionId, token: Option<&str>) -> AppResult<Uuid> {
        let result = match token.map(str::trim).filter(|t| !t.is_empty()) {
            None => Err(AppError::TokenNotProvided),
            Some(token) => self
                .codec
                .verify(token, SigningDomain::Access)
                .map_err(|_| AppError::Unauthorized)
                .and_then(|claims| claims.user_id()),
        };

        let user_id = match result {
            Ok(user_id) => user_id,
            Err(err) => {
                tracing::warn!(connection_id = %conn_id, error = %err, "WebSocket authentication failed");
                self.send(conn_id, OutboundEvent::error(UNAUTHORIZED_MESSAGE));
                return Err(err);
            }
        };

        {
            let mut state = self.state.write();
            let Some(conn) = state.connections.get_mut(&conn_id) else {
                // Disconnected mid-handshake.
                return Err(AppError::NotFound);
            };
            conn.identity = Some(user_id);
            state.join(conn_id, &identity_group(user_id));
        }

        tracing::info!(connection_id = %conn_id, user_id = %user_id, "WebSocket session bound");
        self.send(
            conn_id,
            OutboundEvent::new(
                "connected",
                json!({
                    "message": "Connected to notifications",
                    "userId": user_id,
                    "timestamp": timestamp(),
                }),
            ),
        );
        Ok(user_id)
    }

    pub fn identity_of(&self, conn_id: ConnectionId) -> Option<Uuid> {
        self.state
            .read()
            .connections
            .get(&conn_id)
            .and_then(|c| c.identity)
    }

    pub fn groups_of(&self, conn_id: ConnectionId) -> HashSet<String> {
        self.state
            .read()
            .connections
            .get(&conn_id)
            .map(|c| c.groups.clone())
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.state.read().connections.len()
    }

    /// Handle one text frame from a client.
    pub fn handle_text(&self, conn_id: ConnectionId, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle_message(conn_id, message),
            Err(err) => {
                tracing::debug!(connection_id = %conn_id, error = %err, "Ignoring malformed client frame");
                self.send(conn_id, OutboundEvent::error("err_invalid_message"));
            }
        }
    }

    pub fn handle_message(&self, conn_id: ConnectionId, message: ClientMessage) {
        let Some(user_id) = self.identity_of(conn_id) else {
            self.send(conn_id, OutboundEvent::error("Unauthorized"));
            return;
        };

        match message {
            ClientMessage::JoinRoom { room } => {
                if room.starts_with(IDENTITY_GROUP_PREFIX) && room != identity_group(user_id) {
                    // Identity groups carry private pushes; only the owner is ever a member.
                    tracing::warn!(user_id = %user_id, room = %room, "Refused join of foreign identity room");
                    self.send(conn_id, OutboundEvent::error("err_cannot_join_identity_room"));
                    return;
                }
                self.state.write().join(conn_id, &room);
                tracing::info!(user_id = %user_id, room = %room, "Joined room");
                self.send(
                    conn_id,
                    OutboundEvent::new(
                        "joined_room",
                        json!({ "room": room, "message": format!("Joined room {room}") }),
                    ),
                );
            }
            ClientMessage::LeaveRoom { room } => {
                if room == identity_group(user_id) {
                    // The identity group is tied to the session, not to client requests.
                    self.send(conn_id, OutboundEvent::error("err_cannot_leave_identity_room"));
                    return;
                }
                self.state.write().leave(conn_id, &room);
                tracing::info!(user_id = %user_id, room = %room, "Left room");
                self.send(
                    conn_id,
                    OutboundEvent::new(
                        "left_room",
                        json!({ "room": room, "message": format!("Left room {room}") }),
                    ),
                );
            }
            ClientMessage::Ping => {
                self.send(
                    conn_id,
                    OutboundEvent::new(
                        "pong",
                        json!({ "message": "pong", "timestamp": timestamp(), "userId": user_id }),
                    ),
                );
            }
        }
    }

    /// Drop the connection and every membership it held. Safe to call twice.
    pub fn disconnect(&self, conn_id: ConnectionId) {
        let mut state = self.state.write();
        let Some(conn) = state.connections.remove(&conn_id) else {
            return;
        };
        for group in &conn.groups {
            if let Some(members) = state.members.get_mut(group) {
                members.remove(&conn_id);
                if members.is_empty() {
                    state.members.remove(group);
                }
            }
        }
        tracing::info!(connection_id = %conn_id, user_id = ?conn.identity, "WebSocket session closed");
    }

    fn send(&self, conn_id: ConnectionId, event: OutboundEvent) -> bool {
        let state = self.state.read();
        match state.connections.get(&conn_id) {
            Some(conn) => conn.push(conn_id, event),
            None => false,
        }
    }

    /// Deliver to every member of `group`; returns how many outboxes accepted it.
    pub fn send_to_group(&self, group: &str, event: OutboundEvent) -> usize {
        let state = self.state.read();
        let Some(members) = state.members.get(group) else {
            return 0;
        };
        members
            .iter()
            .filter_map(|id| state.connections.get(id).map(|conn| (*id, conn)))
            .filter(|(id, conn)| conn.push(*id, event.clone()))
            .count()
    }

    /// Deliver to every connection; unauthenticated ones never stay long
    /// enough to matter, but are skipped anyway.
    pub fn send_to_all(&self, event: OutboundEvent) -> usize {
        let state = self.state.read();
        state
            .connections
            .iter()
            .filter(|(_, conn)| conn.identity.is_some())
            .filter(|(id, conn)| conn.push(**id, event.clone()))
            .count()
    }
}

impl Notifier for SessionHub {
    fn push_to_identity(&self, user_id: Uuid, event: &str, payload: Value) {
        let delivered = self.send_to_group(&identity_group(user_id), OutboundEvent::new(event, payload));
        tracing::debug!(user_id = %user_id, event, delivered, "Pushed to identity");
    }

    fn push_to_group(&self, group: &str, event: &str, payload: Value) {
        let delivered = self.send_to_group(group, OutboundEvent::new(event, payload));
        tracing::debug!(group, event, delivered, "Pushed to group");
    }

    fn broadcast(&self, event: &str, payload: Value) {
        let delivered = self.send_to_all(OutboundEvent::new(event, payload));
        tracing::debug!(event, delivered, "Broadcast");
    }
}
