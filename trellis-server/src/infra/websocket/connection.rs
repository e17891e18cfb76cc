use std::{fmt, sync::Arc};

use tokio::sync::mpsc;
use trellis_model::User;
use uuid::Uuid;

use super::ServerMessage;

/// One live WebSocket connection.
#[derive(Clone)]
pub struct Connection {
    /// Unique connection ID
    pub id: Uuid,
    /// User associated with this connection
    pub user: Arc<User>,
    /// Channel to send messages to this connection
    sender: mpsc::Sender<ServerMessage>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user.id)
            .field("username", &self.user.username)
            .field("channel_closed", &self.sender.is_closed())
            .finish()
    }
}

impl Connection {
    pub fn new(user: User, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user: Arc::new(user),
            sender,
        }
    }

    /// Queue a message for this connection without waiting. Returns false
    /// when the buffer is full or the socket task is gone; delivery is
    /// best-effort and the caller never blocks on it.
    pub fn send(&self, message: ServerMessage) -> bool {
        self.sender.try_send(message).is_ok()
    }
}
