use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChatEvent {
    /// Server confirms successful authentication
    Ready { user_id: String },

    /// A new message was appended to a channel
    MessageCreate {
        id: Uuid,
        channel_id: Uuid,
        sender_id: String,
        content: String,
        timestamp: DateTime<Utc>,
    },
}

impl ChatEvent {
    /// Returns the channel_id if this event is scoped to a specific channel.
    /// Events that return `None` are connection-level and bypass channel
    /// subscription filtering.
    pub fn channel_id(&self) -> Option<Uuid> {
        match self {
            Self::MessageCreate { channel_id, .. } => Some(*channel_id),
            Self::Ready { .. } => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Start receiving events for the given channels. The server only
    /// honors channels the authenticated user participates in.
    Subscribe { channel_ids: Vec<Uuid> },

    /// Stop receiving events for the given channels. Unknown ids are ignored.
    Unsubscribe { channel_ids: Vec<Uuid> },
}
