//! Question-answering surface.
//!
//! The relay only validates requests and shapes responses here. The upstream
//! model call lives behind [`AskBackend`], which deployments plug in; with no
//! backend installed the endpoint reports that the LLM is not configured.

use crate::server::PairRelay;
use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One prior turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// `user` or `assistant`.
    pub role: String,
    /// Turn text.
    pub content: String,
}

/// Request body, read leniently: anything unusable counts as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AskBody {
    /// Question text, when it is a non-empty string.
    pub question: Option<String>,
    /// Opaque client context (selection, snippet, ...).
    pub context: serde_json::Value,
    /// Well-formed turns of the conversation so far.
    pub history: Vec<ChatTurn>,
}

impl AskBody {
    /// Pull the fields out of an arbitrary JSON body.
    ///
    /// A non-object body yields an empty request. Malformed history turns
    /// are skipped.
    pub fn from_value(body: &serde_json::Value) -> Self {
        let question = body
            .get("question")
            .and_then(|q| q.as_str())
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        let context = body.get("context").cloned().unwrap_or_default();
        let history = body
            .get("history")
            .and_then(|h| h.as_array())
            .map(|turns| {
                turns
                    .iter()
                    .filter_map(|turn| ChatTurn::deserialize(turn).ok())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            question,
            context,
            history,
        }
    }
}

/// Validated request handed to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct AskRequest {
    /// Non-empty question text.
    pub question: String,
    /// Opaque client context.
    pub context: serde_json::Value,
    /// Conversation so far.
    pub history: Vec<ChatTurn>,
}

/// Failure reported by a backend.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct AskError {
    /// Upstream HTTP status, if the upstream supplied one.
    pub status: Option<u16>,
    /// Message returned to the client.
    pub message: String,
}

/// Upstream model call.
#[async_trait]
pub trait AskBackend: Send + Sync {
    /// Answer a question, returning the reply text.
    async fn ask(&self, request: AskRequest) -> Result<String, AskError>;
}

/// The installed backend, if any.
#[derive(Clone, Default)]
pub struct AskService(Option<Arc<dyn AskBackend>>);

impl AskService {
    /// No backend: every valid question gets 503.
    pub fn unconfigured() -> Self {
        Self(None)
    }

    /// Serve questions with `backend`.
    pub fn new(backend: Arc<dyn AskBackend>) -> Self {
        Self(Some(backend))
    }

    /// Whether a backend is installed.
    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }
}

impl std::fmt::Debug for AskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AskService")
            .field("configured", &self.is_configured())
            .finish()
    }
}

#[derive(Serialize)]
struct ReplyBody {
    reply: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// `POST /api/ask` handler.
///
/// Every outcome is a `{reply}` or `{error}` JSON body; an unreadable
/// request body is treated as empty.
pub async fn ask_handler(
    Extension(service): Extension<AskService>,
    Extension(relay): Extension<Arc<PairRelay>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(value)) => AskBody::from_value(&value),
        Err(rejection) => {
            tracing::debug!("Unreadable ask body: {}", rejection);
            AskBody::default()
        }
    };

    let Some(question) = body.question else {
        return error(StatusCode::BAD_REQUEST, "Missing or invalid question");
    };

    let Some(backend) = service.0 else {
        return error(
            StatusCode::SERVICE_UNAVAILABLE,
            format!(
                "LLM not configured. Set {} in .env and restart the server.",
                relay.config().llm.api_key_env
            ),
        );
    };

    let request = AskRequest {
        question,
        context: body.context,
        history: body.history,
    };

    match backend.ask(request).await {
        Ok(reply) => Json(ReplyBody {
            reply: reply.trim().to_string(),
        })
        .into_response(),
        Err(e) => {
            tracing::warn!("Ask backend error: {}", e);
            let status = e
                .status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let message = if e.message.is_empty() {
                "Request to AI failed.".to_string()
            } else {
                e.message
            };
            error(status, message)
        }
    }
}
