//! Route definitions for the CVGen gateway.
//!
//! Provides the JSON chat API plus the static front-end. The wire format
//! (camelCase `sessionId`, `{ error }` bodies) matches what the front-end
//! already speaks.

use crate::chat::ChatOrchestrator;
use crate::provider::OpenAiProvider;
use crate::session::SessionStore;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use cvgen_common::{Config, Error};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
}

impl AppState {
    /// Build state from configuration, wiring the real OpenAI provider.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config
            .api_key()
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let provider = OpenAiProvider::with_base_url(
            api_key,
            config.provider.base_url.clone(),
            Duration::from_secs(config.provider.request_timeout_secs),
        );
        let store = Arc::new(SessionStore::new(config.session.max_turns));

        Ok(Self {
            orchestrator: Arc::new(ChatOrchestrator::new(
                Arc::new(provider),
                store,
                config.provider.model.clone(),
            )),
        })
    }

    /// Build state around an existing orchestrator (used by tests to
    /// substitute a scripted provider).
    pub fn with_orchestrator(orchestrator: Arc<ChatOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// The session store behind the orchestrator.
    pub fn store(&self) -> &Arc<SessionStore> {
        self.orchestrator.store()
    }
}

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Chat response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponseBody {
    pub reply: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
    /// Current time in epoch milliseconds.
    pub time: i64,
}

/// Warm-up response.
#[derive(Debug, Serialize, Deserialize)]
pub struct WarmResponse {
    pub warmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Build the API router (no static assets; tests drive this directly).
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/ping", get(ping_handler))
        .route("/api/warm", get(warm_handler))
        .route("/api/chat", post(chat_handler))
        .with_state(state)
}

/// Build the full router: API routes plus the static front-end.
pub fn build_router(state: AppState, static_dir: &str) -> Router {
    // ServeDir resolves "/" to index.html, like the Express static handler
    api_routes(state).fallback_service(ServeDir::new(static_dir))
}

/// `GET /api/ping` - liveness probe, no side effects.
async fn ping_handler() -> Json<PingResponse> {
    Json(PingResponse {
        status: "online".into(),
        time: chrono::Utc::now().timestamp_millis(),
    })
}

/// `GET /api/warm` - priming call to mask first-request latency.
///
/// Always 200; the outcome is diagnostic only.
async fn warm_handler(State(state): State<AppState>) -> Json<WarmResponse> {
    match state.orchestrator.warm_up().await {
        Ok(_) => Json(WarmResponse {
            warmed: true,
            error: None,
        }),
        Err(e) => {
            let message = match e {
                Error::Provider(message) => message,
                other => other.to_string(),
            };
            Json(WarmResponse {
                warmed: false,
                error: Some(message),
            })
        }
    }
}

/// `POST /api/chat` - the main chat route.
async fn chat_handler(
    State(state): State<AppState>,
    Json(body): Json<ChatRequestBody>,
) -> impl IntoResponse {
    let message = body.message.as_deref().unwrap_or_default();

    match state
        .orchestrator
        .handle_chat(message, body.session_id.as_deref())
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!(ChatResponseBody {
                reply: outcome.reply,
                session_id: outcome.session_id,
            })),
        ),
        Err(e) => error_response(&e),
    }
}

/// Translate an error into its wire form. No stack traces escape; clients
/// see only the taxonomy message.
fn error_response(error: &Error) -> (StatusCode, Json<serde_json::Value>) {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = match error {
        Error::InvalidInput(msg) => msg.clone(),
        _ => "Internal server error".into(),
    };

    (
        status,
        Json(serde_json::json!(ErrorResponse { error: message })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_body_aliases() {
        let body: ChatRequestBody =
            serde_json::from_str(r#"{"message":"hi","sessionId":"abc"}"#).unwrap();
        assert_eq!(body.message.as_deref(), Some("hi"));
        assert_eq!(body.session_id.as_deref(), Some("abc"));

        // Both fields are optional on the wire
        let empty: ChatRequestBody = serde_json::from_str("{}").unwrap();
        assert!(empty.message.is_none());
        assert!(empty.session_id.is_none());
    }

    #[test]
    fn test_chat_response_uses_camel_case() {
        let body = ChatResponseBody {
            reply: "hello".into(),
            session_id: "abc".into(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"sessionId\":\"abc\""));
    }

    #[test]
    fn test_warm_response_omits_absent_error() {
        let ok = WarmResponse {
            warmed: true,
            error: None,
        };
        assert!(!serde_json::to_string(&ok).unwrap().contains("error"));

        let failed = WarmResponse {
            warmed: false,
            error: Some("unreachable".into()),
        };
        assert!(serde_json::to_string(&failed).unwrap().contains("unreachable"));
    }

    #[test]
    fn test_error_response_shapes() {
        let (status, Json(body)) =
            error_response(&Error::InvalidInput("No message provided".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No message provided");

        // Internal details never leak to the client
        let (status, Json(body)) = error_response(&Error::Internal("lock poisoned".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }
}
