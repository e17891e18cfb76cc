//! Per-user private channels over WebSocket.
//!
//! Every committed task mutation is fanned out to the owning user's
//! channel, excluding the connection that performed it. Subscription is
//! authorized per channel: a user may watch their own channel, admins may
//! watch anyone's.

mod connection;
mod manager;

pub use connection::Connection;
pub use manager::ConnectionManager;

use serde::{Deserialize, Serialize};
use trellis_model::TaskEvent;
use uuid::Uuid;

/// Messages a client may send on the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Watch the private channel of the given user id.
    Subscribe { channel: Uuid },
    Unsubscribe { channel: Uuid },
    Ping,
}

/// Messages the server pushes to a connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message after the upgrade. Clients echo `connection_id` in
    /// the `X-Connection-Id` header on REST calls so their own mutations
    /// are not fanned back to them.
    Connected { connection_id: Uuid },
    Subscribed { channel: Uuid },
    Unsubscribed { channel: Uuid },
    Pong,
    Event { event: TaskEvent },
    Error { message: String },
}
