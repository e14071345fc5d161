use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use parley_chat::{CanonicalPair, convert, resolver};
use parley_types::api::{
    ChannelResponse, ChannelSummary, Claims, ProfileSummary, ResolveChannelRequest,
};

use crate::error::error_status;
use crate::state::AppState;

/// Find-or-create the conversation with another user. The response carries
/// `created = true` exactly once per pair, which the client uses to show
/// the one-time ephemeral-conversation disclosure. Requires the caller to
/// be a paying member (402 otherwise).
pub async fn resolve_channel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ResolveChannelRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let pair =
        CanonicalPair::normalize(&claims.sub, &req.recipient_id).map_err(|e| error_status(&e))?;

    let db = state.db.clone();
    let caller = claims.sub.clone();
    let recipient = req.recipient_id.clone();

    // Run blocking DB work off the async runtime
    let resolution = tokio::task::spawn_blocking(move || {
        let me = db
            .get_profile(&caller)
            .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?
            .ok_or(StatusCode::NOT_FOUND)?;

        // Premium gate: conversations are reserved for paying members.
        if !me.is_paid {
            return Err(StatusCode::PAYMENT_REQUIRED);
        }

        if db
            .get_profile(&recipient)
            .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?
            .is_none()
        {
            return Err(StatusCode::NOT_FOUND);
        }

        resolver::resolve(&db, &pair).map_err(|e| error_status(&e))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    let status = if resolution.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(ChannelResponse {
            created: resolution.created,
            channel: resolution.channel,
        }),
    ))
}

/// The caller's conversations, most recently active first, each with the
/// other participant's public profile fields.
pub async fn list_channels(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub.clone();

    let rows = tokio::task::spawn_blocking(move || db.list_channels_for_user(&user_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    let channels: Vec<ChannelSummary> = rows
        .into_iter()
        .map(|row| ChannelSummary {
            id: convert::parse_uuid(&row.id, "channel"),
            other_user: ProfileSummary {
                id: row.other_id,
                display_name: row.other_display_name,
                avatar_url: row.other_avatar_url,
            },
            created_at: convert::parse_timestamp(&row.created_at, "channel"),
            updated_at: convert::parse_timestamp(&row.updated_at, "channel"),
        })
        .collect();

    Ok(Json(channels))
}
