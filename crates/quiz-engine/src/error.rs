//! Error types for the quiz engine.
//!
//! This module defines the error hierarchy for engine operations: configuration
//! loading, question-bank loading, credential storage and answer-provider calls.
//! Command misuse against the session is never an error; see [`crate::session`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A specialized `Result` type for quiz engine operations.
pub type Result<T> = std::result::Result<T, QuizError>;

/// Fixed descriptor used when no credential is stored.
pub const CREDENTIAL_NOT_FOUND: &str = "credential not found";

/// Descriptor shown for quota-class provider failures.
pub const QUOTA_EXHAUSTED_MESSAGE: &str = "You have reached your answer provider usage limit. \
     Please check your account billing details or use a different API key.";

/// Phrases that mark a provider failure as quota exhaustion.
const QUOTA_PHRASES: [&str; 3] = ["insufficient_quota", "usage limit", "quota"];

/// Errors that can occur while running a quiz.
///
/// Variants carry actionable suggestions where the user can fix the cause.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your quiz.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Question Bank Errors
    // ========================================================================
    /// The question bank could not produce any questions.
    #[error("Failed to load questions: {message}\n\nSuggestion: Retry the load or check the question source")]
    QuestionLoadFailed {
        /// Description of the failure.
        message: String,
    },

    /// A question record violates the question invariants.
    #[error("Invalid question '{id}': {message}")]
    InvalidQuestion {
        /// Identifier of the offending question.
        id: String,
        /// What is wrong with it.
        message: String,
    },

    // ========================================================================
    // Answer Provider Errors
    // ========================================================================
    /// The answer provider failed.
    #[error("Answer provider error ({kind}): {message}\n\nSuggestion: {suggestion}")]
    ProviderError {
        /// Classified kind of the failure.
        kind: AiErrorKind,
        /// Detailed error message.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Credential Errors
    // ========================================================================
    /// The credential store could not be read or written.
    #[error("Credential store error at '{path}': {message}\n\nSuggestion: Check file permissions for the credential file")]
    CredentialStoreError {
        /// Path of the credential file.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}

/// Categories of answer-provider failures.
///
/// The classification drives the descriptor stored in the session's
/// `ai_error` field and the guidance shown by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiErrorKind {
    /// Usage limit or quota exhausted; the user should replace the credential.
    Quota,
    /// No credential is stored.
    MissingCredential,
    /// The provider did not answer within the configured timeout.
    Timeout,
    /// Any other failure.
    Generic,
}

impl std::fmt::Display for AiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quota => write!(f, "quota"),
            Self::MissingCredential => write!(f, "missing_credential"),
            Self::Timeout => write!(f, "timeout"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

impl AiErrorKind {
    /// Classifies a raw provider failure message.
    ///
    /// Matching is case-insensitive and looks for known quota phrases.
    ///
    /// # Examples
    ///
    /// ```
    /// use quiz_engine::AiErrorKind;
    ///
    /// assert_eq!(AiErrorKind::classify("quota exceeded"), AiErrorKind::Quota);
    /// assert_eq!(AiErrorKind::classify("connection reset"), AiErrorKind::Generic);
    /// ```
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if QUOTA_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
            Self::Quota
        } else if lower.contains(CREDENTIAL_NOT_FOUND) {
            Self::MissingCredential
        } else {
            Self::Generic
        }
    }

    /// Returns a suggestion message for this error kind.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Quota => "Check your billing details or save a different API key",
            Self::MissingCredential => "Save an API key before enabling auto-answer mode",
            Self::Timeout => "Retry later; the answer provider may be overloaded",
            Self::Generic => "Answer manually or retry by leaving auto-answer mode on",
        }
    }
}

/// Error descriptor stored in the session after a failed auto-answer attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiError {
    /// Classified kind of the failure.
    pub kind: AiErrorKind,
    /// Human-readable descriptor.
    pub message: String,
}

impl AiError {
    /// Builds the descriptor for a raw provider failure message.
    ///
    /// Quota failures get the fixed quota descriptor; missing credentials get
    /// [`CREDENTIAL_NOT_FOUND`]; everything else keeps the original message.
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match AiErrorKind::classify(&message) {
            AiErrorKind::Quota => Self::quota(),
            AiErrorKind::MissingCredential => Self::missing_credential(),
            kind => Self { kind, message },
        }
    }

    /// The quota-exhaustion descriptor.
    #[must_use]
    pub fn quota() -> Self {
        Self {
            kind: AiErrorKind::Quota,
            message: QUOTA_EXHAUSTED_MESSAGE.to_string(),
        }
    }

    /// The missing-credential descriptor.
    #[must_use]
    pub fn missing_credential() -> Self {
        Self {
            kind: AiErrorKind::MissingCredential,
            message: CREDENTIAL_NOT_FOUND.to_string(),
        }
    }
}

impl From<&QuizError> for AiError {
    fn from(err: &QuizError) -> Self {
        match err {
            QuizError::ProviderError { kind, message, .. } => match kind {
                AiErrorKind::Quota => Self::quota(),
                AiErrorKind::MissingCredential => Self::missing_credential(),
                AiErrorKind::Timeout | AiErrorKind::Generic => Self {
                    kind: *kind,
                    message: message.clone(),
                },
            },
            other => Self::from_message(other.to_string()),
        }
    }
}

impl QuizError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `QuestionLoadFailed` error.
    #[must_use]
    pub fn question_load(message: impl Into<String>) -> Self {
        Self::QuestionLoadFailed {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidQuestion` error.
    #[must_use]
    pub fn invalid_question(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidQuestion {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ProviderError` with automatic suggestion based on error kind.
    #[must_use]
    pub fn provider(kind: AiErrorKind, message: impl Into<String>) -> Self {
        Self::ProviderError {
            kind,
            message: message.into(),
            suggestion: kind.suggestion().to_string(),
        }
    }

    /// Creates a `ProviderError`, classifying the kind from the message text.
    #[must_use]
    pub fn provider_from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::provider(AiErrorKind::classify(&message), message)
    }

    /// Creates the missing-credential provider error.
    #[must_use]
    pub fn credential_not_found() -> Self {
        Self::provider(AiErrorKind::MissingCredential, CREDENTIAL_NOT_FOUND)
    }

    /// Creates a new `CredentialStoreError`.
    #[must_use]
    pub fn credential_store(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CredentialStoreError {
            path: path.into(),
            message: message.into(),
        }
    }
}
