//! Integration tests for WebSocket real-time event streaming.
//!
//! These tests validate the notification stream: the connected event,
//! event ordering for answer cycles and concurrent client support.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use futures::StreamExt;
use quiz_engine::{
    create_router, AppState, Command, EventBroadcaster, MemoryCredentialStore, QuizEvent,
    QuizStore, SampleQuestionBank, Session,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Helper to find an available port for testing.
fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Helper type for WebSocket client
type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spawns the test server and returns the WebSocket URL.
async fn spawn_test_server(store: Arc<QuizStore>) -> (String, tokio::task::JoinHandle<()>) {
    let port = find_available_port();
    let addr = format!("127.0.0.1:{port}");
    let ws_url = format!("ws://{addr}/ws");

    let state = AppState::new(
        store,
        Arc::new(MemoryCredentialStore::new()),
        Arc::new(SampleQuestionBank::new(Duration::ZERO)),
    );
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (ws_url, handle)
}

fn new_store() -> Arc<QuizStore> {
    Arc::new(QuizStore::new(Session::new(), EventBroadcaster::default()))
}

/// Connects a WebSocket client to the given URL.
async fn connect_client(url: &str) -> WsClient {
    let (ws_stream, _) = connect_async(url)
        .await
        .expect("Failed to connect to WebSocket");
    ws_stream
}

/// Receives the next text message from the WebSocket and parses it as `QuizEvent`.
/// Automatically handles ping frames by responding with pong.
async fn receive_event(client: &mut WsClient) -> QuizEvent {
    loop {
        let msg = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timeout waiting for message")
            .expect("Stream ended")
            .expect("WebSocket error");

        match msg {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("Failed to parse event");
            }
            Message::Ping(data) => {
                client
                    .send(Message::Pong(data))
                    .await
                    .expect("Failed to send pong");
            }
            Message::Pong(_) => {}
            other => panic!("Expected text message, got: {other:?}"),
        }
    }
}

/// Receives events until one matches, returning it.
async fn receive_until(client: &mut WsClient, name: &str) -> QuizEvent {
    loop {
        let event = receive_event(client).await;
        if event.event_name() == name {
            return event;
        }
    }
}

// ============================================================================
// Connection Tests
// ============================================================================

#[tokio::test]
async fn test_client_receives_connected_event_on_connect() {
    let (ws_url, _handle) = spawn_test_server(new_store()).await;

    let mut client = connect_client(&ws_url).await;
    let event = receive_event(&mut client).await;

    match event {
        QuizEvent::Connected(payload) => {
            assert_eq!(payload.session.total, 0);
            assert!(!payload.session.complete);
        }
        other => panic!("Expected Connected event, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_connected_event_contains_current_session() {
    let store = new_store();
    store
        .dispatch(Command::LoadQuestions(SampleQuestionBank::questions()))
        .await;
    store.dispatch(Command::SelectOption(3)).await;

    let (ws_url, _handle) = spawn_test_server(Arc::clone(&store)).await;
    let mut client = connect_client(&ws_url).await;

    match receive_event(&mut client).await {
        QuizEvent::Connected(payload) => {
            assert_eq!(payload.session.total, 5);
            assert_eq!(payload.session.selected_option_index, Some(3));
        }
        other => panic!("Expected Connected event, got: {other:?}"),
    }
}

// ============================================================================
// Broadcast Tests
// ============================================================================

#[tokio::test]
async fn test_answer_cycle_events() {
    let store = new_store();
    let (ws_url, _handle) = spawn_test_server(Arc::clone(&store)).await;
    let mut client = connect_client(&ws_url).await;
    receive_until(&mut client, "connected").await;

    store
        .dispatch(Command::LoadQuestions(SampleQuestionBank::questions()))
        .await;
    match receive_until(&mut client, "questions_loaded").await {
        QuizEvent::QuestionsLoaded(payload) => assert_eq!(payload.total, 5),
        other => panic!("unexpected event: {other:?}"),
    }

    store.dispatch(Command::SelectOption(2)).await;
    store.dispatch(Command::Reveal).await;
    match receive_until(&mut client, "answer_revealed").await {
        QuizEvent::AnswerRevealed(payload) => {
            assert_eq!(payload.question_index, 0);
            assert_eq!(payload.selected_option_index, 2);
            assert!(payload.correct);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    match receive_event(&mut client).await {
        QuizEvent::SessionUpdated(payload) => {
            assert!(payload.session.revealed);
            assert_eq!(payload.session.score, 1);
        }
        other => panic!("Expected SessionUpdated event, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_quiz_complete_event() {
    let store = new_store();
    let (ws_url, _handle) = spawn_test_server(Arc::clone(&store)).await;
    let mut client = connect_client(&ws_url).await;
    receive_until(&mut client, "connected").await;

    let questions = SampleQuestionBank::questions();
    let answers: Vec<usize> = questions.iter().map(|q| q.correct_option_index).collect();
    store.dispatch(Command::LoadQuestions(questions)).await;
    for (i, answer) in answers.into_iter().enumerate() {
        // Answer only the first two correctly
        store
            .dispatch(Command::SelectOption(if i < 2 { answer } else { (answer + 1) % 4 }))
            .await;
        store.dispatch(Command::Reveal).await;
        store.dispatch(Command::Advance).await;
    }

    match receive_until(&mut client, "quiz_complete").await {
        QuizEvent::QuizComplete(payload) => {
            assert_eq!(payload.score, 2);
            assert_eq!(payload.total, 5);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_multiple_clients_receive_same_events() {
    let store = new_store();
    let (ws_url, _handle) = spawn_test_server(Arc::clone(&store)).await;

    let mut first = connect_client(&ws_url).await;
    let mut second = connect_client(&ws_url).await;
    receive_until(&mut first, "connected").await;
    receive_until(&mut second, "connected").await;

    store.dispatch(Command::ToggleAutoAnswerMode).await;

    for client in [&mut first, &mut second] {
        match receive_until(client, "auto_answer_toggled").await {
            QuizEvent::AutoAnswerToggled(payload) => assert!(payload.enabled),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_server_answers_client_ping() {
    let (ws_url, _handle) = spawn_test_server(new_store()).await;
    let mut client = connect_client(&ws_url).await;
    receive_until(&mut client, "connected").await;

    client
        .send(Message::Ping(b"hello".to_vec()))
        .await
        .expect("Failed to send ping");

    let pong = timeout(Duration::from_secs(5), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Pong(data))) => return data,
                Some(Ok(_)) => {}
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    })
    .await
    .expect("Timeout waiting for pong");

    assert_eq!(pong, b"hello".to_vec());
}
