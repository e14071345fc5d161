use axum::http::StatusCode;
use tracing::warn;

use parley_chat::ChatError;

/// Map the core error taxonomy onto HTTP statuses. `StoreUnavailable` is
/// the only retryable case and gets 503; everything else blames the caller.
pub fn error_status(err: &ChatError) -> StatusCode {
    match err {
        ChatError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ChatError::EmptyMessage => StatusCode::UNPROCESSABLE_ENTITY,
        ChatError::NotFound(_) => StatusCode::NOT_FOUND,
        ChatError::StoreUnavailable(e) => {
            warn!("Store unavailable: {:#}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
