use std::sync::Arc;

use dashmap::DashMap;
use trellis_core::notify::TaskNotifier;
use trellis_model::{TaskEvent, User};
use uuid::Uuid;

use super::{Connection, ServerMessage};

/// Registry of live connections and their channel subscriptions.
///
/// Channels are keyed by the watched user's id. The manager is also the
/// production [`TaskNotifier`]: the task service publishes committed
/// mutations through it, and delivery excludes the originating connection.
#[derive(Clone)]
pub struct ConnectionManager {
    /// Active WebSocket connections mapped by connection ID
    connections: Arc<DashMap<Uuid, Arc<Connection>>>,
    /// Channel subscriptions - maps a user id to subscribed connection IDs
    channels: Arc<DashMap<Uuid, Vec<Uuid>>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connection_count", &self.connections.len())
            .field("channel_count", &self.channels.len())
            .finish()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            channels: Arc::new(DashMap::new()),
        }
    }

    /// Whether `user` may watch `channel`: own channel, or any channel for
    /// admins.
    pub fn may_subscribe(user: &User, channel: Uuid) -> bool {
        user.id == channel || user.is_admin
    }

    /// Register a new connection
    pub fn add_connection(&self, connection: Arc<Connection>) {
        self.connections.insert(connection.id, connection);
    }

    /// Remove a connection and clean up its subscriptions
    pub fn remove_connection(&self, conn_id: Uuid) {
        self.connections.remove(&conn_id);

        for mut channel in self.channels.iter_mut() {
            channel.value_mut().retain(|id| id != &conn_id);
        }
        self.channels.retain(|_, subscribers| !subscribers.is_empty());
    }

    /// Subscribe a connection to a user's channel
    pub fn subscribe(&self, channel: Uuid, conn_id: Uuid) {
        let mut subscribers = self.channels.entry(channel).or_default();
        if !subscribers.contains(&conn_id) {
            subscribers.push(conn_id);
        }
    }

    /// Remove a connection from a channel
    pub fn unsubscribe(&self, channel: Uuid, conn_id: Uuid) {
        if let Some(mut subscribers) = self.channels.get_mut(&channel) {
            subscribers.value_mut().retain(|id| id != &conn_id);
        }

        if let Some(subscribers) = self.channels.get(&channel)
            && subscribers.is_empty()
        {
            drop(subscribers);
            self.channels.remove(&channel);
        }
    }

    /// Get all connections subscribed to a channel
    pub fn channel_connections(&self, channel: Uuid) -> Vec<Arc<Connection>> {
        self.channels
            .get(&channel)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .filter_map(|conn_id| {
                        self.connections.get(conn_id).map(|c| c.clone())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_connection(&self, conn_id: &Uuid) -> Option<Arc<Connection>> {
        self.connections.get(conn_id).map(|c| c.clone())
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskNotifier for ConnectionManager {
    fn publish(&self, event: TaskEvent, origin: Option<Uuid>) {
        let channel = event.owner_id();
        let connections = self.channel_connections(channel);
        if connections.is_empty() {
            return;
        }

        let message = ServerMessage::Event { event };
        for conn in connections {
            if Some(conn.id) == origin {
                continue;
            }
            if !conn.send(message.clone()) {
                tracing::debug!(
                    connection_id = %conn.id,
                    "dropped event for slow or closed connection"
                );
            }
        }
    }
}
