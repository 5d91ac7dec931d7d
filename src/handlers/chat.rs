// src/handlers/chat.rs
use crate::handlers::{error_response, ApiError};
use crate::middleware::session::require_session;
use crate::models::auth::User;
use crate::models::chat::{
    ChatStatus, ExportRequest, HistoryDirection, Message, RateMessageRequest, SendMessageRequest,
};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn chat_routes() -> Router {
    Router::new()
        .route(
            "/api/chat/messages",
            get(list_messages).post(send_message).delete(clear_messages),
        )
        .route("/api/chat/messages/:id/rating", post(rate_message))
        .route("/api/chat/history/:direction", get(navigate_history))
        .route("/api/chat/status", get(chat_status))
        .route("/api/chat/export", post(export_chat))
        .route_layer(axum::middleware::from_fn(require_session))
}

async fn list_messages(Extension(state): Extension<Arc<AppState>>) -> Json<Vec<Message>> {
    Json(state.chat.messages())
}

/// Stores the user message and returns it right away; the reply arrives in
/// the log once its delay has passed.
async fn send_message(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    if payload.content.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Message content is required",
        ));
    }

    let message = state.chat.send_detached(&payload.content);
    tracing::info!(user_id = %user.id, message_id = %message.id, "message accepted");
    Ok((StatusCode::ACCEPTED, Json(message)))
}

async fn clear_messages(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    state.chat.clear();
    Json(json!({ "success": true }))
}

async fn rate_message(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<RateMessageRequest>,
) -> Result<Json<Value>, ApiError> {
    if !state.chat.rate(&id, payload.rating) {
        return Err(error_response(StatusCode::NOT_FOUND, "Message not found"));
    }
    Ok(Json(json!({ "success": true, "id": id, "rating": payload.rating })))
}

async fn navigate_history(
    Extension(state): Extension<Arc<AppState>>,
    Path(direction): Path<HistoryDirection>,
) -> Json<Value> {
    let value = state.chat.navigate_history(direction);
    Json(json!({ "value": value, "history_index": state.chat.history_index() }))
}

async fn chat_status(Extension(state): Extension<Arc<AppState>>) -> Json<ChatStatus> {
    Json(state.chat.status())
}

/// Writes the transcript to the export directory and also returns it as an
/// attachment. An empty log yields 204 and no file.
async fn export_chat(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<ExportRequest>,
) -> Result<Response, ApiError> {
    let artifact = match state.chat.export(payload.format) {
        Ok(Some(artifact)) => artifact,
        Ok(None) => return Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => {
            tracing::error!("Error rendering export: {}", e);
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to export chat",
            ));
        }
    };

    match artifact.save(&state.export_dir) {
        Ok(path) => tracing::info!(path = %path.display(), "chat exported"),
        Err(e) => tracing::warn!("Failed to write export file: {}", e),
    }

    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.filename),
            ),
        ],
        artifact.content,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use crate::handlers::app_router;
    use crate::handlers::test_support::{call, call_raw, test_state};
    use crate::models::chat::Message;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::time::Duration;

    async fn logged_in_app() -> axum::Router {
        let state = test_state();
        state
            .auth
            .register("ada@example.com", "Secret1", "Ada")
            .await
            .unwrap();
        app_router(state)
    }

    #[tokio::test]
    async fn test_chat_requires_session() {
        let app = app_router(test_state());
        let (status, body) = call(&app, "GET", "/api/chat/messages", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let app = logged_in_app().await;
        let (status, _) = call(
            &app,
            "POST",
            "/api/chat/messages",
            Some(json!({ "content": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = call(&app, "GET", "/api/chat/status", None).await;
        assert_eq!(body["message_count"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_rate_export_clear() {
        let app = logged_in_app().await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/chat/messages",
            Some(json!({ "content": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["sender"], "user");

        let (_, body) = call(&app, "GET", "/api/chat/status", None).await;
        assert_eq!(body["is_typing"], true);

        tokio::time::sleep(Duration::from_millis(150)).await;
        let (_, body) = call(&app, "GET", "/api/chat/messages", None).await;
        let messages: Vec<Message> = serde_json::from_value(body).unwrap();
        assert_eq!(messages.len(), 2);

        let uri = format!("/api/chat/messages/{}/rating", messages[1].id);
        let (status, _) = call(&app, "POST", &uri, Some(json!({ "rating": "positive" }))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(
            &app,
            "POST",
            "/api/chat/messages/missing/rating",
            Some(json!({ "rating": "negative" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, bytes) =
            call_raw(&app, "POST", "/api/chat/export", Some(json!({ "format": "json" }))).await;
        assert_eq!(status, StatusCode::OK);
        let exported: Vec<Message> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(exported.len(), 2);

        let (_, body) = call(&app, "GET", "/api/chat/history/up", None).await;
        assert_eq!(body["value"], "hello");
        assert_eq!(body["history_index"], 0);

        call(&app, "DELETE", "/api/chat/messages", None).await;
        let (status, bytes) =
            call_raw(&app, "POST", "/api/chat/export", Some(json!({ "format": "text" }))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(bytes.is_empty());

        let (_, body) = call(&app, "GET", "/api/chat/status", None).await;
        assert_eq!(body["input_history"], json!(["hello"]));
    }
}
