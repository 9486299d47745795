//! Integration tests for the generation HTTP API
//!
//! Each test binds the router on an ephemeral port and talks to it over
//! real HTTP.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::Path, routing::post, Json, Router};
use promptcode::core::{BackendError, GenerationBackend};
use promptcode::llm::{GeminiProvider, LlmError, LlmProvider};
use promptcode::transport::http::{router, HEALTH_TEXT};
use promptcode::transport::HttpBackend;
use promptcode::ui_backend::{
    ChatService, GenerationOutcome, GenerationTiming, GENERATION_ERROR_MESSAGE,
};
use serde_json::{json, Value};

/// Records calls and answers with a fixed reply
struct RecordingProvider {
    reply: Result<String, String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingProvider {
    fn ok(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(details: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(details.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.to_string()));
        self.reply.clone().map_err(LlmError::ServiceError)
    }
}

async fn spawn_app(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn post_json(addr: SocketAddr, body: &str) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/generate", addr))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn health_check_describes_the_api() {
    let addr = spawn_app(router(RecordingProvider::ok("x"), "gemini-2.5-flash")).await;
    let body = reqwest::get(format!("http://{}/", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, HEALTH_TEXT);
}

#[tokio::test]
async fn generate_uses_default_model() {
    let provider = RecordingProvider::ok("fn main() {}");
    let addr = spawn_app(router(provider.clone(), "gemini-2.5-flash")).await;

    let (status, body) = post_json(addr, r#"{"prompt":"write main"}"#).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"generated": "fn main() {}"}));
    assert_eq!(
        provider.calls(),
        vec![("gemini-2.5-flash".to_string(), "write main".to_string())]
    );
}

#[tokio::test]
async fn generate_honours_requested_model() {
    let provider = RecordingProvider::ok("ok");
    let addr = spawn_app(router(provider.clone(), "gemini-2.5-flash")).await;

    let (status, _) = post_json(addr, r#"{"prompt":"hi","model":"gemini-2.5-pro"}"#).await;
    assert_eq!(status, 200);
    assert_eq!(provider.calls()[0].0, "gemini-2.5-pro");
}

#[tokio::test]
async fn missing_or_blank_prompt_is_rejected() {
    let provider = RecordingProvider::ok("unused");
    let addr = spawn_app(router(provider.clone(), "gemini-2.5-flash")).await;

    for body in [r#"{}"#, r#"{"prompt":""}"#, r#"{"prompt":"   "}"#, "not json"] {
        let (status, value) = post_json(addr, body).await;
        assert_eq!(status, 400, "body: {}", body);
        assert_eq!(value, json!({"error": "Prompt is required"}));
    }
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn provider_failure_is_a_500_with_details() {
    let addr = spawn_app(router(RecordingProvider::failing("quota"), "m")).await;

    let (status, body) = post_json(addr, r#"{"prompt":"hi"}"#).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Generation failed");
    assert!(body["details"].as_str().unwrap().contains("quota"));
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let addr = spawn_app(router(RecordingProvider::ok("x"), "m")).await;
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/generate", addr))
        .header("origin", "http://localhost:5173")
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn http_backend_maps_server_responses() {
    let addr = spawn_app(router(RecordingProvider::ok("hello"), "m")).await;
    let backend = HttpBackend::new(&format!("http://{}", addr));
    assert_eq!(backend.generate("hi", None).await.unwrap(), "hello");
    assert!(matches!(
        backend.generate("   ", None).await,
        Err(BackendError::Status { status: 400, .. })
    ));

    let failing = spawn_app(router(RecordingProvider::failing("boom"), "m")).await;
    let backend = HttpBackend::new(&format!("http://{}", failing));
    assert!(matches!(
        backend.generate("hi", None).await,
        Err(BackendError::Status { status: 500, .. })
    ));
}

#[tokio::test]
async fn gemini_provider_calls_generate_content() {
    let seen = Arc::new(Mutex::new(Vec::<(String, Value)>::new()));
    let recorder = seen.clone();
    let upstream = Router::new().route(
        "/models/:call",
        post(move |Path(call): Path<String>, Json(body): Json<Value>| {
            let recorder = recorder.clone();
            async move {
                recorder.lock().unwrap().push((call, body));
                Json(json!({
                    "candidates": [{"content": {"parts": [{"text": "pong"}]}}]
                }))
            }
        }),
    );
    let addr = spawn_app(upstream).await;

    let provider = GeminiProvider::new("test-key").with_base_url(format!("http://{}/models", addr));
    let reply = provider.generate("gemini-2.5-flash", "ping").await.unwrap();
    assert_eq!(reply, "pong");

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].0, "gemini-2.5-flash:generateContent");
    assert_eq!(seen[0].1["contents"][0]["parts"][0]["text"], "ping");
}

#[tokio::test]
async fn chat_service_end_to_end_over_http() {
    let addr = spawn_app(router(RecordingProvider::ok("two words"), "m")).await;
    let backend = Arc::new(HttpBackend::new(&format!("http://{}", addr)));
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let timing = GenerationTiming {
        status_interval: Duration::from_millis(500),
        reveal_interval: Duration::from_millis(1),
    };
    let service = ChatService::with_options(backend, tx, timing, None);

    let outcome = service.send_prompt("say two words").unwrap().wait().await;
    assert_eq!(outcome, GenerationOutcome::Revealed);

    let chat = service.state().active_chat().unwrap();
    assert_eq!(chat.title, "say two words");
    assert_eq!(chat.messages[1].content, "two words");
    assert!(!chat.messages[1].is_typing);
}

/// A generation server stand-in that always answers 200 with `body`
async fn spawn_stub_server(content_type: &'static str, body: &'static str) -> SocketAddr {
    let app = Router::new().route(
        "/api/generate",
        post(move || async move { ([("content-type", content_type)], body) }),
    );
    spawn_app(app).await
}

fn fast_service(addr: SocketAddr) -> ChatService {
    let backend = Arc::new(HttpBackend::new(&format!("http://{}", addr)));
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let timing = GenerationTiming {
        status_interval: Duration::from_millis(500),
        reveal_interval: Duration::from_millis(1),
    };
    ChatService::with_options(backend, tx, timing, None)
}

#[tokio::test]
async fn non_json_success_body_settles_with_error_text() {
    let addr = spawn_stub_server("text/html", "<html>oops</html>").await;

    let backend = HttpBackend::new(&format!("http://{}", addr));
    assert!(matches!(
        backend.generate("hi", None).await,
        Err(BackendError::Malformed(_))
    ));

    let service = fast_service(addr);
    let outcome = service.send_prompt("hi").unwrap().wait().await;
    assert!(matches!(outcome, GenerationOutcome::Failed(_)));

    let chat = service.state().active_chat().unwrap();
    let trailing = chat.messages.last().unwrap();
    assert_eq!(trailing.content, GENERATION_ERROR_MESSAGE);
    assert!(!trailing.is_typing);
    assert!(!service.is_generating());
}

#[tokio::test]
async fn success_without_generated_text_settles_empty() {
    let addr = spawn_stub_server("application/json", "{}").await;
    let service = fast_service(addr);

    let outcome = service.send_prompt("hi").unwrap().wait().await;
    assert_eq!(outcome, GenerationOutcome::Empty);

    let chat = service.state().active_chat().unwrap();
    let trailing = chat.messages.last().unwrap();
    assert_eq!(trailing.content, "");
    assert!(!trailing.is_typing);
    assert!(!service.is_generating());
}
