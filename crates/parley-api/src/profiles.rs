use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use parley_chat::convert;
use parley_types::api::{Claims, UpsertProfileRequest};

use crate::state::AppState;

/// Create or refresh the caller's profile row. Channel resolution and the
/// chat list both require this row to exist, so clients sync it on login
/// and after checkout completes.
pub async fn upsert_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpsertProfileRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.display_name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let user_id = claims.sub.clone();

    let row = tokio::task::spawn_blocking(move || {
        db.upsert_profile(
            &user_id,
            req.display_name.trim(),
            req.avatar_url.as_deref(),
            req.is_paid,
        )?;
        db.get_profile(&user_id)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?
    .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(Json(convert::profile_from_row(row)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::response::IntoResponse;

    use parley_db::Database;
    use parley_gateway::feed::ChannelFeed;
    use parley_types::api::ResolveChannelRequest;

    use crate::channels;
    use crate::state::AppStateInner;

    fn test_state() -> AppState {
        Arc::new(AppStateInner {
            db: Arc::new(Database::open_in_memory().unwrap()),
            feed: ChannelFeed::new(),
        })
    }

    fn claims(sub: &str) -> Claims {
        Claims {
            sub: sub.into(),
            exp: usize::MAX,
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_and_updates() {
        let state = test_state();

        let resp = upsert_profile(
            State(state.clone()),
            Extension(claims("alice")),
            Json(UpsertProfileRequest {
                display_name: "  Alice  ".into(),
                avatar_url: None,
                is_paid: false,
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let stored = state.db.get_profile("alice").unwrap().unwrap();
        assert_eq!(stored.display_name, "Alice");
        assert!(!stored.is_paid);

        // Checkout completed: the sync flips the paid flag in place.
        upsert_profile(
            State(state.clone()),
            Extension(claims("alice")),
            Json(UpsertProfileRequest {
                display_name: "Alice".into(),
                avatar_url: Some("https://cdn.example/alice.png".into()),
                is_paid: true,
            }),
        )
        .await
        .unwrap();

        let stored = state.db.get_profile("alice").unwrap().unwrap();
        assert!(stored.is_paid);
        assert_eq!(stored.avatar_url.as_deref(), Some("https://cdn.example/alice.png"));
    }

    #[tokio::test]
    async fn test_blank_display_name_rejected() {
        let state = test_state();

        let result = upsert_profile(
            State(state.clone()),
            Extension(claims("alice")),
            Json(UpsertProfileRequest {
                display_name: "   ".into(),
                avatar_url: None,
                is_paid: false,
            }),
        )
        .await;

        assert_eq!(result.err(), Some(StatusCode::BAD_REQUEST));
        assert!(state.db.get_profile("alice").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_works_after_profile_ingestion() {
        let state = test_state();

        // A fresh database has no profiles; resolution must refuse.
        let early = channels::resolve_channel(
            State(state.clone()),
            Extension(claims("alice")),
            Json(ResolveChannelRequest {
                recipient_id: "bob".into(),
            }),
        )
        .await;
        assert_eq!(early.err(), Some(StatusCode::NOT_FOUND));

        for (user, paid) in [("alice", true), ("bob", false)] {
            upsert_profile(
                State(state.clone()),
                Extension(claims(user)),
                Json(UpsertProfileRequest {
                    display_name: user.into(),
                    avatar_url: None,
                    is_paid: paid,
                }),
            )
            .await
            .unwrap();
        }

        let resp = channels::resolve_channel(
            State(state.clone()),
            Extension(claims("alice")),
            Json(ResolveChannelRequest {
                recipient_id: "bob".into(),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);

        // Unpaid callers still hit the premium gate.
        let gated = channels::resolve_channel(
            State(state),
            Extension(claims("bob")),
            Json(ResolveChannelRequest {
                recipient_id: "alice".into(),
            }),
        )
        .await;
        assert_eq!(gated.err(), Some(StatusCode::PAYMENT_REQUIRED));
    }
}
