// src/handlers/auth.rs
use crate::error::AuthError;
use crate::handlers::{error_response, ApiError};
use crate::models::auth::{AuthResponse, LoginRequest, RegisterRequest, SessionResponse};
use crate::token::peek_claims;
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(session))
}

fn auth_error(e: AuthError) -> ApiError {
    let status = match &e {
        AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::DuplicateEmail => StatusCode::CONFLICT,
        AuthError::Storage(err) => {
            tracing::error!("Storage error during authentication: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, e.to_string())
}

async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let session = state
        .auth
        .register(&payload.email, &payload.password, &payload.name)
        .await
        .map_err(auth_error)?;

    Ok(Json(AuthResponse {
        success: true,
        message: "User registered successfully".to_string(),
        user: session.user,
        token: session.token,
    }))
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let session = state
        .auth
        .login(&payload.email, &payload.password)
        .await
        .map_err(auth_error)?;

    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".to_string(),
        user: session.user,
        token: session.token,
    }))
}

async fn logout(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    state.auth.logout();
    Json(json!({ "success": true, "message": "Logged out" }))
}

async fn session(Extension(state): Extension<Arc<AppState>>) -> Json<SessionResponse> {
    let session = state.auth.session();
    Json(SessionResponse {
        authenticated: session.is_some(),
        is_loading: state.auth.is_loading(),
        claims: session.as_ref().and_then(|s| peek_claims(&s.token)),
        user: session.map(|s| s.user),
    })
}
