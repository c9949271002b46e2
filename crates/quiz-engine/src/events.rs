//! Quiz notifications and their WebSocket stream.
//!
//! Every session transition that the presentation layer should react to
//! produces a [`QuizEvent`]. Events fan out through an [`EventBroadcaster`] to
//! the terminal observer, tests and any WebSocket client connected to `/ws`.
//!
//! # Event Types
//!
//! - `connected` - Sent when a client connects, includes the session snapshot
//! - `session_updated` - Session changed, includes the new snapshot
//! - `questions_loaded` - A question list was loaded
//! - `load_failed` - The question bank failed
//! - `answer_revealed` - An answer was revealed and scored
//! - `auto_answer_toggled` - Auto-answer mode flipped
//! - `quiz_complete` - The last question was advanced past
//! - `ai_error` - An auto-answer attempt failed
//!
//! # Example
//!
//! ```no_run
//! use quiz_engine::events::{EventBroadcaster, QuizEvent};
//!
//! # async fn example() {
//! let broadcaster = EventBroadcaster::new(100);
//! let mut receiver = broadcaster.subscribe();
//!
//! broadcaster.send(QuizEvent::questions_loaded(5));
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {}", event.event_name());
//! }
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::error::AiError;
use crate::session::SessionSnapshot;
use crate::store::QuizStore;

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload carrying a full session snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    /// The session state.
    pub session: SessionSnapshot,
}

/// Payload for the `questions_loaded` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionsLoadedPayload {
    /// Number of questions now loaded.
    pub total: usize,
}

/// Payload for the `load_failed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFailedPayload {
    /// Why the load failed.
    pub message: String,
}

/// Payload for the `answer_revealed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRevealedPayload {
    /// Position of the revealed question.
    pub question_index: usize,
    /// The option that was revealed.
    pub selected_option_index: usize,
    /// The correct option.
    pub correct_option_index: usize,
    /// Whether the selection was correct.
    pub correct: bool,
}

/// Payload for the `auto_answer_toggled` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoAnswerToggledPayload {
    /// The new mode.
    pub enabled: bool,
}

/// Payload for the `quiz_complete` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizCompletePayload {
    /// Final score.
    pub score: usize,
    /// Number of questions.
    pub total: usize,
}

/// Payload for the `ai_error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiErrorPayload {
    /// The failure descriptor.
    pub error: AiError,
}

// ============================================================================
// QuizEvent
// ============================================================================

/// Notification emitted by the quiz engine.
///
/// Serialized as `{"event": "<name>", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum QuizEvent {
    /// Client connected.
    Connected(SessionPayload),
    /// Session changed.
    SessionUpdated(SessionPayload),
    /// Questions loaded.
    QuestionsLoaded(QuestionsLoadedPayload),
    /// Question bank failed.
    LoadFailed(LoadFailedPayload),
    /// Answer revealed.
    AnswerRevealed(AnswerRevealedPayload),
    /// Auto-answer mode flipped.
    AutoAnswerToggled(AutoAnswerToggledPayload),
    /// Quiz completed.
    QuizComplete(QuizCompletePayload),
    /// Auto-answer attempt failed.
    AiError(AiErrorPayload),
}

impl QuizEvent {
    /// Creates a `connected` event.
    #[must_use]
    pub const fn connected(session: SessionSnapshot) -> Self {
        Self::Connected(SessionPayload { session })
    }

    /// Creates a `session_updated` event.
    #[must_use]
    pub const fn session_updated(session: SessionSnapshot) -> Self {
        Self::SessionUpdated(SessionPayload { session })
    }

    /// Creates a `questions_loaded` event.
    #[must_use]
    pub const fn questions_loaded(total: usize) -> Self {
        Self::QuestionsLoaded(QuestionsLoadedPayload { total })
    }

    /// Creates a `load_failed` event.
    #[must_use]
    pub fn load_failed(message: impl Into<String>) -> Self {
        Self::LoadFailed(LoadFailedPayload {
            message: message.into(),
        })
    }

    /// Creates an `answer_revealed` event.
    #[must_use]
    pub const fn answer_revealed(
        question_index: usize,
        selected_option_index: usize,
        correct_option_index: usize,
        correct: bool,
    ) -> Self {
        Self::AnswerRevealed(AnswerRevealedPayload {
            question_index,
            selected_option_index,
            correct_option_index,
            correct,
        })
    }

    /// Creates an `auto_answer_toggled` event.
    #[must_use]
    pub const fn auto_answer_toggled(enabled: bool) -> Self {
        Self::AutoAnswerToggled(AutoAnswerToggledPayload { enabled })
    }

    /// Creates a `quiz_complete` event.
    #[must_use]
    pub const fn quiz_complete(score: usize, total: usize) -> Self {
        Self::QuizComplete(QuizCompletePayload { score, total })
    }

    /// Creates an `ai_error` event.
    #[must_use]
    pub const fn ai_error(error: AiError) -> Self {
        Self::AiError(AiErrorPayload { error })
    }

    /// Returns the wire name of this event.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::SessionUpdated(_) => "session_updated",
            Self::QuestionsLoaded(_) => "questions_loaded",
            Self::LoadFailed(_) => "load_failed",
            Self::AnswerRevealed(_) => "answer_revealed",
            Self::AutoAnswerToggled(_) => "auto_answer_toggled",
            Self::QuizComplete(_) => "quiz_complete",
            Self::AiError(_) => "ai_error",
        }
    }
}

// ============================================================================
// EventBroadcaster
// ============================================================================

/// Fan-out channel for [`QuizEvent`]s.
///
/// Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<QuizEvent>,
}

impl EventBroadcaster {
    /// Default channel capacity.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Creates a broadcaster with the given capacity.
    ///
    /// Slow receivers that fall more than `capacity` events behind observe a
    /// lag error and skip ahead.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<QuizEvent> {
        self.sender.subscribe()
    }

    /// Sends an event to all subscribers, returning how many received it.
    pub fn send(&self, event: QuizEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

// ============================================================================
// WebSocket Handler
// ============================================================================

/// Interval between heartbeat pings.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum number of missed pong responses before disconnecting.
const MAX_MISSED_PONGS: u8 = 3;

/// Upgrades `GET /ws` to a notification stream.
pub async fn ws_handler(ws: WebSocketUpgrade, State(store): State<Arc<QuizStore>>) -> Response {
    info!("New WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, store))
}

/// Serves one WebSocket client.
///
/// - Subscribes before reading the snapshot so no event is lost
/// - Sends `connected` with the current snapshot
/// - Forwards every broadcast event
/// - Pings every 30 seconds and closes after 3 missed pongs
async fn handle_socket(socket: WebSocket, store: Arc<QuizStore>) {
    let (mut sender, mut receiver) = socket.split();

    let mut event_receiver = store.subscribe();
    let connected = QuizEvent::connected(store.snapshot().await);
    let connected_json = match serde_json::to_string(&connected) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize connected event: {}", e);
            return;
        }
    };

    if sender.send(Message::Text(connected_json)).await.is_err() {
        debug!("Client disconnected before receiving connected event");
        return;
    }

    info!("WebSocket client connected, sent session snapshot");

    let mut heartbeat = interval(HEARTBEAT_INTERVAL);
    // The first tick completes immediately.
    heartbeat.tick().await;
    let mut missed_pongs = 0u8;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        missed_pongs = 0;
                        debug!("Received pong from client");
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client requested close");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            debug!("Failed to send pong, client disconnected");
                            break;
                        }
                    }
                    Some(Ok(Message::Text(_) | Message::Binary(_))) => {
                        debug!("Ignoring data message from client; commands go through the HTTP API");
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }

            event = event_receiver.recv() => {
                match event {
                    Ok(quiz_event) => {
                        let json = match serde_json::to_string(&quiz_event) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("Failed to serialize event: {}", e);
                                continue;
                            }
                        };
                        if sender.send(Message::Text(json)).await.is_err() {
                            debug!("Failed to send event, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client lagged, missed {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Broadcaster closed");
                        break;
                    }
                }
            }

            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    debug!("Failed to send ping, client disconnected");
                    break;
                }
                missed_pongs += 1;
                if missed_pongs >= MAX_MISSED_PONGS {
                    info!("Client missed {} pongs, closing connection", MAX_MISSED_PONGS);
                    break;
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}
