// src/handlers/theme.rs
use crate::handlers::{error_response, ApiError};
use crate::theme::ThemePreference;
use crate::AppState;
use axum::{extract::Extension, http::StatusCode, response::Json, routing::get, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Deserialize)]
struct ThemeRequest {
    theme: ThemePreference,
}

pub fn theme_routes() -> Router {
    Router::new().route("/api/theme", get(get_theme).put(set_theme))
}

async fn get_theme(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "theme": state.theme.get() }))
}

async fn set_theme(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<ThemeRequest>,
) -> Result<Json<Value>, ApiError> {
    state.theme.set(payload.theme).map_err(|e| {
        tracing::warn!("Failed to persist theme: {}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save theme")
    })?;
    Ok(Json(json!({ "theme": payload.theme })))
}

#[cfg(test)]
mod tests {
    use crate::handlers::app_router;
    use crate::handlers::test_support::{call, test_state};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_theme_round_trip() {
        let app = app_router(test_state());
        let (_, body) = call(&app, "GET", "/api/theme", None).await;
        assert_eq!(body["theme"], "system");

        let (status, _) = call(&app, "PUT", "/api/theme", Some(json!({ "theme": "dark" }))).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = call(&app, "GET", "/api/theme", None).await;
        assert_eq!(body["theme"], "dark");
    }
}
