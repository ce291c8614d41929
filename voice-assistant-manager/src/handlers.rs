use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::actor::AgentHandle;
use crate::state::AppState;

/// Request bodies larger than this are rejected
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const CONVERSATION_FAILED: &str = "Failed to process conversation";
const INITIALIZE_FAILED: &str = "Failed to initialize assistant";
const STATUS_FAILED: &str = "Failed to read session status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Text,
    Status,
    NotFound,
}

impl Route {
    pub fn resolve(method: &Method, path: &str) -> Self {
        match (method, path) {
            (&Method::POST, "/text") => Route::Text,
            (&Method::GET, "/status") => Route::Status,
            _ => Route::NotFound,
        }
    }
}

#[derive(Deserialize)]
pub struct TextRequest {
    pub text: String,
}

fn json_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}

/// Every request lands here: resolve the session, then dispatch on the route
pub async fn entry_handler(State(state): State<AppState>, request: Request) -> Response {
    let handle = match state.namespace.get_agent_by_name(&state.agent_id).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Failed to initialize assistant {}: {:#}", state.agent_id, e);
            return json_error(INITIALIZE_FAILED);
        }
    };

    match Route::resolve(request.method(), request.uri().path()) {
        Route::Text => text_handler(&handle, request.into_body()).await,
        Route::Status => status_handler(&handle).await,
        Route::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn text_handler(handle: &AgentHandle, body: Body) -> Response {
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to read request body: {}", e);
            return json_error(CONVERSATION_FAILED);
        }
    };

    let payload: TextRequest = match serde_json::from_slice(&bytes) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("Invalid conversation request: {}", e);
            return json_error(CONVERSATION_FAILED);
        }
    };

    match handle.converse(payload.text).await {
        Ok(response) => Json(json!({ "response": response })).into_response(),
        Err(e) => {
            tracing::error!("Conversation error: {:#}", e);
            json_error(CONVERSATION_FAILED)
        }
    }
}

async fn status_handler(handle: &AgentHandle) -> Response {
    match handle.status().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => {
            tracing::error!("Status error: {:#}", e);
            json_error(STATUS_FAILED)
        }
    }
}
