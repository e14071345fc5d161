use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local mirror of an externally-owned user. Profile authoring lives
/// elsewhere; this row exists so conversations can be listed with a name
/// and the premium gate can be checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

/// The canonical conversation record between exactly two users.
/// `participant_low` always sorts before `participant_high`, and the pair
/// is unique — at most one channel exists per unordered pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub participant_low: String,
    pub participant_high: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One chat line. Immutable once stored; ordered within a channel by
/// `created_at`, ties broken by insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
