/// Database row types — these map directly to SQLite rows.
/// Distinct from parley-types models to keep the DB layer independent.

pub struct ProfileRow {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_paid: bool,
    pub created_at: String,
}

pub struct ChannelRow {
    pub id: String,
    pub participant_low: String,
    pub participant_high: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub channel_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: String,
}

/// Channel list entry joined with the *other* participant's profile.
pub struct ChannelSummaryRow {
    pub id: String,
    pub other_id: String,
    pub other_display_name: String,
    pub other_avatar_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
