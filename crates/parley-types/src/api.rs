use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Channel;

// -- JWT Claims --

/// JWT claims shared across parley-api (REST middleware) and parley-gateway
/// (WebSocket authentication). Tokens are issued by the external identity
/// provider; `sub` is the opaque user id we trust for the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Profiles --

/// Ingests the caller's profile from the external identity/payment
/// collaborators. `is_paid` mirrors the hosted checkout's outcome; this
/// service never processes payments itself.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertProfileRequest {
    pub display_name: String,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveChannelRequest {
    pub recipient_id: String,
}

/// `created` is true exactly once per pair — the first resolution. Clients
/// use it to show the one-time ephemeral-conversation disclosure.
#[derive(Debug, Serialize)]
pub struct ChannelResponse {
    pub channel: Channel,
    pub created: bool,
}

/// One entry in the caller's conversation list: the channel plus the
/// *other* participant's public profile fields.
#[derive(Debug, Serialize)]
pub struct ChannelSummary {
    pub id: Uuid,
    pub other_user: ProfileSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProfileSummary {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}
