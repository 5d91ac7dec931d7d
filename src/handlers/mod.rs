// src/handlers/mod.rs
pub mod auth;
pub mod chat;
pub mod theme;

use crate::middleware::logging::request_logging_middleware;
use crate::models::auth::ErrorResponse;
use crate::AppState;
use axum::{http::StatusCode, Extension, Json, Router};
use std::sync::Arc;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            message: message.into(),
        }),
    )
}

/// All routes with shared state and request logging attached.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(auth::auth_routes())
        .merge(chat::chat_routes())
        .merge(theme::theme_routes())
        .layer(axum::middleware::from_fn(request_logging_middleware))
        .layer(Extension(state))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::{AppConfig, AuthConfig, ChatConfig};
    use crate::storage::Storage;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    pub fn test_state() -> Arc<AppState> {
        let mut config = AppConfig::from_lookup(|_| None).expect("default config");
        config.auth = AuthConfig::instant();
        config.chat = ChatConfig {
            reply_delay_min: Duration::from_millis(100),
            reply_delay_max: Duration::from_millis(100),
            rng_seed: Some(1),
        };
        config.export_dir = std::env::temp_dir().join(format!(
            "chatbot-demo-exports-{}",
            crate::utils::generate_id()
        ));
        Arc::new(AppState::with_storage(Storage::in_memory(), &config))
    }

    pub async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let (status, bytes) = call_raw(app, method, uri, body).await;
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    pub async fn call_raw(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }
}
