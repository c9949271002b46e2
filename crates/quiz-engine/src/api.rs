//! HTTP API endpoints for driving a quiz session.
//!
//! The presentation layer reads the session snapshot and issues commands
//! through these endpoints; notifications arrive over the `/ws` stream.
//!
//! # Endpoints
//!
//! - `GET /api/session` - Current session snapshot
//! - `POST /api/load` - Fetch questions from the question bank
//! - `POST /api/select` - Select an option on the current question
//! - `POST /api/reveal` - Reveal the selected answer
//! - `POST /api/advance` - Move to the next question
//! - `POST /api/reset` - Restart the quiz
//! - `POST /api/auto-answer/toggle` - Flip auto-answer mode
//! - `GET|PUT|DELETE /api/credential` - Inspect, save or remove the API key
//! - `GET /ws` - WebSocket notification stream
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use quiz_engine::{create_router, AppState, MemoryCredentialStore, QuizStore, SampleQuestionBank};
//!
//! # async fn example() {
//! let state = AppState::new(
//!     Arc::new(QuizStore::default()),
//!     Arc::new(MemoryCredentialStore::new()),
//!     Arc::new(SampleQuestionBank::default()),
//! );
//!
//! let router = create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::credential::CredentialStore;
use crate::error::QuizError;
use crate::events::ws_handler;
use crate::question::QuestionBank;
use crate::session::{Command, SessionSnapshot};
use crate::store::QuizStore;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for `POST /api/select`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectRequest {
    /// Option index to select.
    pub index: usize,
}

/// Request body for `PUT /api/credential`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveCredentialRequest {
    /// The API key to store.
    pub key: String,
}

/// Response body for the credential endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialStatus {
    /// Whether a credential is stored.
    pub present: bool,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// The quiz session.
    pub store: Arc<QuizStore>,
    /// Where the API key lives.
    pub credentials: Arc<dyn CredentialStore>,
    /// Source for `POST /api/load`.
    pub question_bank: Arc<dyn QuestionBank>,
}

impl AppState {
    /// Creates the state from its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<QuizStore>,
        credentials: Arc<dyn CredentialStore>,
        question_bank: Arc<dyn QuestionBank>,
    ) -> Self {
        Self {
            store,
            credentials,
            question_bank,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl FromRef<AppState> for Arc<QuizStore> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.store)
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Internal error type for API handlers.
#[derive(Debug)]
enum ApiError {
    /// The request body is unusable.
    BadRequest(String),
    /// The question bank failed.
    LoadFailed(String),
    /// The credential store failed.
    Internal(String),
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::QuestionLoadFailed { .. } => Self::LoadFailed(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::LoadFailed(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all API endpoints.
///
/// The router carries:
/// - All command routes under `/api`
/// - The `/ws` notification stream
/// - CORS middleware for local front-ends
/// - Tracing middleware for request logging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/session", get(handle_session))
        .route("/load", post(handle_load))
        .route("/select", post(handle_select))
        .route("/reveal", post(handle_reveal))
        .route("/advance", post(handle_advance))
        .route("/reset", post(handle_reset))
        .route("/auto-answer/toggle", post(handle_toggle_auto_answer))
        .route(
            "/credential",
            get(handle_get_credential)
                .put(handle_save_credential)
                .delete(handle_remove_credential),
        );

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `GET /api/session`.
async fn handle_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.store.snapshot().await)
}

/// Handler for `POST /api/load`.
///
/// Returns 503 when the question bank fails; the previous questions stay.
async fn handle_load(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, ApiError> {
    info!("Load questions requested");
    let snapshot = state
        .store
        .load_questions(state.question_bank.as_ref())
        .await?;
    Ok(Json(snapshot))
}

/// Handler for `POST /api/select`.
async fn handle_select(
    State(state): State<AppState>,
    Json(request): Json<SelectRequest>,
) -> Json<SessionSnapshot> {
    Json(state.store.dispatch(Command::SelectOption(request.index)).await)
}

/// Handler for `POST /api/reveal`.
async fn handle_reveal(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.store.dispatch(Command::Reveal).await)
}

/// Handler for `POST /api/advance`.
async fn handle_advance(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.store.dispatch(Command::Advance).await)
}

/// Handler for `POST /api/reset`.
async fn handle_reset(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.store.dispatch(Command::Reset).await)
}

/// Handler for `POST /api/auto-answer/toggle`.
async fn handle_toggle_auto_answer(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let snapshot = state.store.dispatch(Command::ToggleAutoAnswerMode).await;
    info!(enabled = snapshot.auto_answer_mode, "Auto-answer mode toggled");
    Json(snapshot)
}

/// Handler for `GET /api/credential`.
///
/// Never returns the key itself.
async fn handle_get_credential(
    State(state): State<AppState>,
) -> Result<Json<CredentialStatus>, ApiError> {
    let present = state.credentials.get().await?.is_some();
    Ok(Json(CredentialStatus { present }))
}

/// Handler for `PUT /api/credential`.
///
/// Saving a key after a failed auto-answer attempt retries the current question.
async fn handle_save_credential(
    State(state): State<AppState>,
    Json(request): Json<SaveCredentialRequest>,
) -> Result<Json<CredentialStatus>, ApiError> {
    let key = request.key.trim();
    if key.is_empty() {
        warn!("Rejected blank API key");
        return Err(ApiError::BadRequest("API key must not be blank".to_string()));
    }

    state.credentials.set(key).await?;
    state.store.rearm().await;

    Ok(Json(CredentialStatus { present: true }))
}

/// Handler for `DELETE /api/credential`.
async fn handle_remove_credential(
    State(state): State<AppState>,
) -> Result<Json<CredentialStatus>, ApiError> {
    state.credentials.remove().await?;
    Ok(Json(CredentialStatus { present: false }))
}

// ============================================================================
// Tests
// ============================================================================
