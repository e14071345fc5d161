use uuid::Uuid;

use parley_db::Database;
use parley_types::models::Message;

use crate::convert;
use crate::error::ChatError;

/// Append a message to a channel. Content is trimmed and must be non-empty;
/// the sender must be one of the channel's two participants. Returns the
/// stored message with its server-assigned timestamp. Either the row is
/// durably written and later visible, or this fails and nothing is recorded.
pub fn append(
    db: &Database,
    channel_id: Uuid,
    sender_id: &str,
    content: &str,
) -> Result<Message, ChatError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ChatError::EmptyMessage);
    }

    let channel = db
        .get_channel(&channel_id.to_string())
        .map_err(ChatError::store)?
        .ok_or_else(|| ChatError::NotFound(format!("channel {channel_id}")))?;

    if sender_id != channel.participant_low && sender_id != channel.participant_high {
        return Err(ChatError::InvalidInput(
            "sender is not a participant of this channel".into(),
        ));
    }

    let id = Uuid::new_v4();
    let row = db
        .insert_message(&id.to_string(), &channel_id.to_string(), sender_id, content)
        .map_err(ChatError::store)?;

    Ok(convert::message_from_row(row))
}

/// All messages in a channel, ascending by `created_at` with insertion-order
/// tie-break. A channel with no messages yet yields an empty vec, not an
/// error — the same holds after an external retention purge.
pub fn list_ordered(db: &Database, channel_id: Uuid) -> Result<Vec<Message>, ChatError> {
    let rows = db
        .list_messages(&channel_id.to_string())
        .map_err(ChatError::store)?;

    Ok(rows.into_iter().map(convert::message_from_row).collect())
}
