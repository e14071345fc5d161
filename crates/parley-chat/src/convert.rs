use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use parley_db::models::{ChannelRow, MessageRow, ProfileRow};
use parley_types::models::{Channel, Message, Profile};

/// SQLite stores timestamps as RFC 3339 with millisecond precision
/// (`strftime('%Y-%m-%dT%H:%M:%fZ')`). Older rows written by
/// `datetime('now')` lack the timezone suffix; parse those as naive UTC.
pub fn parse_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}

pub fn parse_uuid(raw: &str, context: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}' on {}: {}", raw, context, e);
        Uuid::default()
    })
}

pub fn channel_from_row(row: ChannelRow) -> Channel {
    Channel {
        id: parse_uuid(&row.id, "channel"),
        created_at: parse_timestamp(&row.created_at, "channel"),
        updated_at: parse_timestamp(&row.updated_at, "channel"),
        participant_low: row.participant_low,
        participant_high: row.participant_high,
    }
}

pub fn message_from_row(row: MessageRow) -> Message {
    Message {
        id: parse_uuid(&row.id, "message"),
        channel_id: parse_uuid(&row.channel_id, "message"),
        created_at: parse_timestamp(&row.created_at, "message"),
        sender_id: row.sender_id,
        content: row.content,
    }
}

pub fn profile_from_row(row: ProfileRow) -> Profile {
    Profile {
        created_at: parse_timestamp(&row.created_at, "profile"),
        id: row.id,
        display_name: row.display_name,
        avatar_url: row.avatar_url,
        is_paid: row.is_paid,
    }
}
