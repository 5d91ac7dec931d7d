use crate::handlers::{error_response, ApiError};
use crate::AppState;
use axum::{
    extract::{Extension, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Rejects requests while nobody is logged in.
///
/// Only checks that a session exists; the bearer token is not inspected.
pub async fn require_session(
    Extension(state): Extension<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match state.auth.current_user() {
        Some(user) => user,
        None => {
            tracing::warn!(path = %request.uri().path(), "request without an active session");
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Please log in to continue",
            ));
        }
    };

    // Handlers read the current user through `Extension<User>`
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
