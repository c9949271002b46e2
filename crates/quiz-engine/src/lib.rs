//! Quiz Engine
//!
//! Owns the quiz session state machine, the auto-answer orchestrator, the
//! answer provider and credential store adapters, and the HTTP/WebSocket API.

pub mod api;
pub mod auto_answer;
pub mod config;
pub mod credential;
pub mod error;
pub mod events;
pub mod provider;
pub mod question;
pub mod session;
pub mod store;

pub use api::{
    create_router, AppState, CredentialStatus, ErrorResponse, SaveCredentialRequest,
    SelectRequest,
};
pub use auto_answer::Orchestrator;
pub use config::{AutoAnswerConfig, Config, ProviderConfig, QuestionBankConfig, QuestionSource};
pub use credential::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{
    AiError, AiErrorKind, QuizError, Result, CREDENTIAL_NOT_FOUND, QUOTA_EXHAUSTED_MESSAGE,
};
pub use events::{EventBroadcaster, QuizEvent};
pub use provider::{parse_answer_letter, AnswerProvider, OpenAiProvider};
pub use question::{
    bank_from_config, option_letter, validate_questions, FileQuestionBank, Question, QuestionBank,
    SampleQuestionBank, OPTION_COUNT,
};
pub use session::{AnswerRecord, ArmingKey, Command, CommandOrigin, Session, SessionSnapshot};
pub use store::QuizStore;
