use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use parley_chat::messages as chat_messages;
use parley_types::api::{Claims, SendMessageRequest};
use parley_types::events::ChatEvent;

use crate::error::error_status;
use crate::state::AppState;

/// Full ordered history of a channel. Participants only; a channel the
/// caller is not part of reads as 404 so its existence never leaks.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub.clone();

    let messages = tokio::task::spawn_blocking(move || {
        let channel = db
            .get_channel(&channel_id.to_string())
            .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?
            .ok_or(StatusCode::NOT_FOUND)?;

        if user_id != channel.participant_low && user_id != channel.participant_high {
            return Err(StatusCode::NOT_FOUND);
        }

        chat_messages::list_ordered(&db, channel_id).map_err(|e| error_status(&e))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok(Json(messages))
}

/// Append a message. The core validates content and sender membership; on
/// success the insert is published to the feed so the other participant's
/// open view picks it up without polling.
pub async fn send_message(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let sender_id = claims.sub.clone();

    let message = tokio::task::spawn_blocking(move || {
        chat_messages::append(&db, channel_id, &sender_id, &req.content)
            .map_err(|e| error_status(&e))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    // Broadcast to WebSocket subscribers of this channel
    state.feed.publish(ChatEvent::MessageCreate {
        id: message.id,
        channel_id: message.channel_id,
        sender_id: message.sender_id.clone(),
        content: message.content.clone(),
        timestamp: message.created_at,
    });

    Ok((StatusCode::CREATED, Json(message)))
}
