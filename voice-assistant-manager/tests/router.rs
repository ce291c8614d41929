use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use voice_assistant_agent::{AgentSettings, ConversationAgent, TextGenerator};
use voice_assistant_core::session::{ChatMessage, MemoryStateStore, Role, StateStore};
use voice_assistant_manager::{build_router, AgentFactory, AgentNamespace, AppState};
use voice_assistant_providers::{ProviderError, ProviderResult};
use voice_assistant_tools::{ToolError, ToolRegistry, ToolSource};

const AGENT_ID: &str = "siri-user-session";

/// Replies `echo: <text>`; `fail` errors and `silent` produces no text
struct EchoGenerator;

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(
        &self,
        transcript: &[ChatMessage],
        _tools: &ToolRegistry,
        _max_steps: usize,
    ) -> ProviderResult<Option<String>> {
        let last = transcript
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        match last.as_str() {
            "fail" => Err(ProviderError::ApiError("HTTP 503: unavailable".to_string())),
            "silent" => Ok(None),
            _ => Ok(Some(format!("echo: {}", last))),
        }
    }
}

struct NoTools;

#[async_trait]
impl ToolSource for NoTools {
    async fn add_server(&self, _name: &str, _url: &str) -> Result<usize, ToolError> {
        Err(ToolError::Connection("offline".to_string()))
    }

    async fn tools(&self) -> ToolRegistry {
        ToolRegistry::new()
    }

    async fn close_all_connections(&self) {}
}

struct Harness {
    router: Router,
    store: Arc<MemoryStateStore>,
    factory_calls: Arc<AtomicUsize>,
    namespace: Arc<AgentNamespace>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStateStore::new());
    let factory_calls = Arc::new(AtomicUsize::new(0));

    let factory: AgentFactory = {
        let store = store.clone();
        let factory_calls = factory_calls.clone();
        Arc::new(move |id: &str| {
            factory_calls.fetch_add(1, Ordering::SeqCst);
            let settings = AgentSettings {
                system_prompt: "be brief".to_string(),
                max_steps: 10,
                tool_servers: vec![("docs".to_string(), "http://127.0.0.1:9/mcp".to_string())],
                close_tools_after_turn: true,
                resume_persisted: false,
            };
            let store: Arc<dyn StateStore> = store.clone();
            Ok(ConversationAgent::new(
                id,
                settings,
                Arc::new(EchoGenerator),
                Arc::new(NoTools),
                store,
            ))
        })
    };

    let namespace = Arc::new(AgentNamespace::new(factory));
    let router = build_router(AppState::new(namespace.clone(), AGENT_ID));
    Harness {
        router,
        store,
        factory_calls,
        namespace,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn post_text(router: &Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/text")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get_status(router: &Router) -> Value {
    let request = Request::builder()
        .uri("/status")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router, request).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_conversation_round_trip() {
    let h = harness();

    let (status, body) = post_text(&h.router, r#"{"text":"hello"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": "echo: hello"}));

    let status = get_status(&h.router).await;
    assert_eq!(status["messageCount"], 2);
    assert_eq!(status["sessionActive"], true);
    assert!(status["startTime"].as_i64().unwrap() > 0);
    assert!(status["sessionDuration"].as_i64().unwrap() >= 0);

    let persisted = h.store.load(AGENT_ID).unwrap().unwrap();
    assert_eq!(
        persisted.messages,
        vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hello"),
            ChatMessage::assistant("echo: hello"),
        ]
    );
}

#[tokio::test]
async fn test_fresh_status_has_no_messages() {
    let h = harness();
    let status = get_status(&h.router).await;
    assert_eq!(status["messageCount"], 0);
    assert_eq!(status["sessionActive"], true);
}

#[tokio::test]
async fn test_message_count_tracks_transcript() {
    let h = harness();
    for text in ["one", "two", "three"] {
        let (status, _) = post_text(&h.router, &json!({ "text": text }).to_string()).await;
        assert_eq!(status, StatusCode::OK);
    }

    let status = get_status(&h.router).await;
    let persisted = h.store.load(AGENT_ID).unwrap().unwrap();
    assert_eq!(status["messageCount"], 6);
    assert_eq!(persisted.messages.len() - 1, 6);
}

#[tokio::test]
async fn test_unknown_routes_are_not_found() {
    let h = harness();
    for (method, uri) in [("GET", "/"), ("GET", "/text"), ("POST", "/status"), ("DELETE", "/text")] {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&h.router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(body, b"Not found");
    }
}

#[tokio::test]
async fn test_malformed_body_is_conversation_failure() {
    let h = harness();

    let (status, body) = post_text(&h.router, "not json").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to process conversation"}));

    let (status, _) = post_text(&h.router, r#"{"message":"hello"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(get_status(&h.router).await["messageCount"], 0);
}

#[tokio::test]
async fn test_model_failure_leaves_transcript_unchanged() {
    let h = harness();
    post_text(&h.router, r#"{"text":"hello"}"#).await;

    let (status, body) = post_text(&h.router, r#"{"text":"fail"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to process conversation"}));

    assert_eq!(get_status(&h.router).await["messageCount"], 2);
    assert_eq!(h.store.load(AGENT_ID).unwrap().unwrap().messages.len(), 3);
}

#[tokio::test]
async fn test_missing_model_text_uses_fallback() {
    let h = harness();
    let (status, body) = post_text(&h.router, r#"{"text":"silent"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": "No response generated"}));

    let persisted = h.store.load(AGENT_ID).unwrap().unwrap();
    assert_eq!(
        persisted.messages.last(),
        Some(&ChatMessage::assistant("No response generated"))
    );
}

#[tokio::test]
async fn test_session_actor_created_once() {
    let h = harness();
    post_text(&h.router, r#"{"text":"hello"}"#).await;
    get_status(&h.router).await;
    post_text(&h.router, r#"{"text":"again"}"#).await;

    assert_eq!(h.factory_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.namespace.len().await, 1);
}

#[tokio::test]
async fn test_factory_failure_is_initialize_error() {
    let factory: AgentFactory = Arc::new(|_id: &str| -> anyhow::Result<ConversationAgent> {
        Err(anyhow::anyhow!("no provider"))
    });
    let namespace = Arc::new(AgentNamespace::new(factory));
    let router = build_router(AppState::new(namespace, AGENT_ID));

    let (status, body) = post_text(&router, r#"{"text":"hello"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to initialize assistant"}));
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let h = harness();
    let text = "a".repeat(voice_assistant_manager::handlers::MAX_BODY_BYTES + 1);
    let (status, _) = post_text(&h.router, &json!({ "text": text }).to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(get_status(&h.router).await["messageCount"], 0);
}
