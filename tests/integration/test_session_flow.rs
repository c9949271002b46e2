//! Integration tests for the HTTP command API.
//!
//! These tests drive a real server over TCP with reqwest, covering question
//! loading, manual answering, completion, reset and credential management.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use quiz_engine::{
    create_router, AppState, CredentialStatus, EventBroadcaster, MemoryCredentialStore,
    QuizStore, SampleQuestionBank, Session, SessionSnapshot,
};
use reqwest::{Client, StatusCode};
use serde_json::json;

/// Helper to find an available port for testing.
fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Spawns a server with the sample bank and returns its base URL.
async fn spawn_test_server() -> (String, Arc<QuizStore>) {
    let port = find_available_port();
    let addr = format!("127.0.0.1:{port}");

    let store = Arc::new(QuizStore::new(Session::new(), EventBroadcaster::default()));
    let state = AppState::new(
        Arc::clone(&store),
        Arc::new(MemoryCredentialStore::new()),
        Arc::new(SampleQuestionBank::new(Duration::ZERO)),
    );
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://{addr}/api"), store)
}

async fn post(client: &Client, url: &str) -> SessionSnapshot {
    let response = client.post(url).send().await.expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.expect("invalid snapshot")
}

async fn select(client: &Client, base: &str, index: usize) -> SessionSnapshot {
    let response = client
        .post(format!("{base}/select"))
        .json(&json!({ "index": index }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.expect("invalid snapshot")
}

// ============================================================================
// Answering
// ============================================================================

#[tokio::test]
async fn test_load_select_reveal_advance() {
    let (base, _store) = spawn_test_server().await;
    let client = Client::new();

    let snapshot = post(&client, &format!("{base}/load")).await;
    assert_eq!(snapshot.total, 5);
    assert_eq!(snapshot.current_index, 0);
    assert!(!snapshot.loading);

    let snapshot = select(&client, &base, 2).await;
    assert_eq!(snapshot.selected_option_index, Some(2));

    let snapshot = post(&client, &format!("{base}/reveal")).await;
    assert!(snapshot.revealed);
    assert_eq!(snapshot.last_answer_correct, Some(true));
    assert_eq!(snapshot.score, 1);

    let snapshot = post(&client, &format!("{base}/advance")).await;
    assert_eq!(snapshot.current_index, 1);
    assert!(!snapshot.revealed);
    assert_eq!(snapshot.selected_option_index, None);
    assert_eq!(snapshot.score, 1);
}

#[tokio::test]
async fn test_wrong_answer_scores_nothing() {
    let (base, _store) = spawn_test_server().await;
    let client = Client::new();

    post(&client, &format!("{base}/load")).await;
    select(&client, &base, 0).await;
    let snapshot = post(&client, &format!("{base}/reveal")).await;

    assert_eq!(snapshot.last_answer_correct, Some(false));
    assert_eq!(snapshot.score, 0);

    // A second reveal changes nothing
    let again = post(&client, &format!("{base}/reveal")).await;
    assert_eq!(again.score, 0);
    assert_eq!(again.history.len(), 1);
}

#[tokio::test]
async fn test_full_quiz_completes_and_ignores_late_commands() {
    let (base, store) = spawn_test_server().await;
    let client = Client::new();

    let loaded = post(&client, &format!("{base}/load")).await;
    let answers: Vec<usize> = loaded
        .questions
        .iter()
        .map(|q| q.correct_option_index)
        .collect();

    for answer in answers {
        select(&client, &base, answer).await;
        post(&client, &format!("{base}/reveal")).await;
        post(&client, &format!("{base}/advance")).await;
    }

    let done: SessionSnapshot = client
        .get(format!("{base}/session"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid snapshot");
    assert!(done.complete);
    assert_eq!(done.score, 5);
    assert_eq!(done.current_index, 5);

    let after = select(&client, &base, 1).await;
    assert_eq!(after, done);
    assert_eq!(store.snapshot().await, done);
}

#[tokio::test]
async fn test_reset_keeps_questions() {
    let (base, _store) = spawn_test_server().await;
    let client = Client::new();

    post(&client, &format!("{base}/load")).await;
    post(&client, &format!("{base}/auto-answer/toggle")).await;
    select(&client, &base, 2).await;
    post(&client, &format!("{base}/reveal")).await;
    post(&client, &format!("{base}/advance")).await;

    let snapshot = post(&client, &format!("{base}/reset")).await;
    assert_eq!(snapshot.total, 5);
    assert_eq!(snapshot.current_index, 0);
    assert_eq!(snapshot.score, 0);
    assert!(snapshot.history.is_empty());
    assert!(snapshot.auto_answer_mode);
}

// ============================================================================
// Credential
// ============================================================================

#[tokio::test]
async fn test_credential_lifecycle() {
    let (base, _store) = spawn_test_server().await;
    let client = Client::new();
    let url = format!("{base}/credential");

    let status: CredentialStatus = client
        .get(&url)
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid status");
    assert!(!status.present);

    let response = client
        .put(&url)
        .json(&json!({ "key": "   " }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .put(&url)
        .json(&json!({ "key": "sk-test" }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let body = client
        .get(&url)
        .send()
        .await
        .expect("request failed")
        .text()
        .await
        .expect("invalid body");
    assert!(body.contains("true"));
    assert!(!body.contains("sk-test"));

    let status: CredentialStatus = client
        .delete(&url)
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid status");
    assert!(!status.present);
}
