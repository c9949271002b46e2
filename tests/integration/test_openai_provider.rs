//! Integration tests for the chat-completions answer provider.
//!
//! A small axum server stands in for the provider endpoint so the real
//! reqwest client, request payload and failure classification are exercised.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use quiz_engine::{
    AiError, AiErrorKind, AnswerProvider, OpenAiProvider, ProviderConfig, QuizError,
    QUOTA_EXHAUSTED_MESSAGE,
};
use serde_json::{json, Value};

/// Helper to find an available port for testing.
fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// What the fake endpoint replies with.
#[derive(Clone)]
enum Reply {
    Content(&'static str),
    Status(StatusCode, Value),
}

#[derive(Clone)]
struct FakeState {
    reply: Reply,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn chat_completions(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.seen.lock().expect("poisoned").push((auth, body));

    match state.reply {
        Reply::Content(content) => (
            StatusCode::OK,
            Json(json!({
                "choices": [{ "message": { "role": "assistant", "content": content } }]
            })),
        ),
        Reply::Status(status, body) => (status, Json(body)),
    }
}

/// Spawns the fake provider and returns a provider pointed at it.
async fn spawn_fake_provider(reply: Reply) -> (OpenAiProvider, FakeState) {
    let port = find_available_port();
    let addr = format!("127.0.0.1:{port}");

    let state = FakeState {
        reply,
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let router = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    let config = ProviderConfig {
        base_url: format!("http://{addr}/v1/"),
        ..ProviderConfig::default()
    };
    (OpenAiProvider::new(config), state)
}

fn options() -> Vec<String> {
    ["London", "Berlin", "Paris", "Madrid"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[tokio::test]
async fn test_letter_reply_maps_to_index() {
    let (provider, state) = spawn_fake_provider(Reply::Content("C")).await;

    let index = provider
        .choose_answer("sk-test", "What is the capital of France?", &options())
        .await
        .expect("provider call failed");
    assert_eq!(index, 2);

    let seen = state.seen.lock().expect("poisoned");
    assert_eq!(seen.len(), 1);
    let (auth, body) = &seen[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["max_tokens"], 10);
    assert_eq!(body["messages"][0]["role"], "system");
    let user = body["messages"][1]["content"].as_str().expect("user prompt");
    assert!(user.contains("What is the capital of France?"));
    assert!(user.contains("C: Paris"));
}

#[tokio::test]
async fn test_unparseable_reply_still_picks_an_option() {
    let (provider, _state) = spawn_fake_provider(Reply::Content("I am not sure")).await;

    let index = provider
        .choose_answer("sk-test", "What is the capital of France?", &options())
        .await
        .expect("provider call failed");
    assert!(index < 4);
}

#[tokio::test]
async fn test_quota_failure_is_classified() {
    let body = json!({
        "error": {
            "message": "You exceeded your current quota, please check your plan and billing details.",
            "type": "insufficient_quota",
            "code": "insufficient_quota"
        }
    });
    let (provider, _state) =
        spawn_fake_provider(Reply::Status(StatusCode::TOO_MANY_REQUESTS, body)).await;

    let err = provider
        .choose_answer("sk-test", "What is the capital of France?", &options())
        .await
        .expect_err("quota reply should fail");

    assert!(matches!(
        err,
        QuizError::ProviderError {
            kind: AiErrorKind::Quota,
            ..
        }
    ));
    let descriptor = AiError::from(&err);
    assert_eq!(descriptor.message, QUOTA_EXHAUSTED_MESSAGE);
}

#[tokio::test]
async fn test_server_error_is_generic() {
    let (provider, _state) = spawn_fake_provider(Reply::Status(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": { "message": "upstream exploded" } }),
    ))
    .await;

    let err = provider
        .choose_answer("sk-test", "What is the capital of France?", &options())
        .await
        .expect_err("server error should fail");

    let descriptor = AiError::from(&err);
    assert_eq!(descriptor.kind, AiErrorKind::Generic);
    assert!(descriptor.message.contains("500"));
}
