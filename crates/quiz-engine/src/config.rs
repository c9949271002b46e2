//! Configuration types for the quiz engine.
//!
//! This module provides the configuration structures controlling where
//! questions come from, how the auto-answer cycle is paced, which answer
//! provider endpoint is used and where the credential is stored.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{QuizError, Result};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "quiz.json";

/// Default delay before the provider is queried.
const fn default_thinking_delay_ms() -> u64 {
    1000
}

/// Default delay between selecting an answer and revealing it.
const fn default_reveal_delay_ms() -> u64 {
    1000
}

/// Default delay between revealing an answer and advancing.
const fn default_advance_delay_ms() -> u64 {
    2000
}

/// Default bound on a single provider call in seconds.
const fn default_provider_timeout_secs() -> u64 {
    30
}

/// Default simulated latency of the sample question bank.
const fn default_simulated_delay_ms() -> u64 {
    1500
}

/// Default chat-completions base URL.
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

/// Default model name.
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Default sampling temperature.
const fn default_temperature() -> f32 {
    0.3
}

/// Default completion token budget.
const fn default_max_tokens() -> u32 {
    10
}

/// Default credential file path.
fn default_credential_file() -> String {
    ".quiz/credential".to_string()
}

/// Default output directory for score cards.
fn default_output_dir() -> String {
    ".".to_string()
}

/// Main configuration for a quiz run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Where the questions come from.
    #[serde(default)]
    pub question_bank: QuestionBankConfig,

    /// Pacing of the auto-answer cycle.
    #[serde(default)]
    pub auto_answer: AutoAnswerConfig,

    /// Answer provider endpoint settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Path to the file holding the provider API key.
    #[serde(default = "default_credential_file")]
    pub credential_file: String,

    /// Output directory for generated score cards.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            question_bank: QuestionBankConfig::default(),
            auto_answer: AutoAnswerConfig::default(),
            provider: ProviderConfig::default(),
            credential_file: default_credential_file(),
            output_dir: default_output_dir(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `quiz.json` in the current directory and falls back to the
    /// default configuration when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            QuizError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `quiz.json` in a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::ConfigParseError` if the file cannot be read or
    /// parsed, and `QuizError::ConfigValidationError` if values are invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(QuizError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| QuizError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.question_bank.source == QuestionSource::File
            && self
                .question_bank
                .path
                .as_deref()
                .map_or(true, |p| p.trim().is_empty())
        {
            return Err(QuizError::config_validation(
                "questionBank.path is required when questionBank.source is 'file'",
                "Set questionBank.path in your quiz.json or pass --questions",
            ));
        }

        if self.auto_answer.provider_timeout_secs == 0 {
            return Err(QuizError::config_validation(
                "autoAnswer.providerTimeoutSecs must be greater than 0",
                "Set autoAnswer.providerTimeoutSecs to at least 1 second in your quiz.json",
            ));
        }

        if self.provider.base_url.trim().is_empty() {
            return Err(QuizError::config_validation(
                "provider.baseUrl must not be empty",
                "Provide the chat-completions base URL in your quiz.json",
            ));
        }

        if self.provider.model.trim().is_empty() {
            return Err(QuizError::config_validation(
                "provider.model must not be empty",
                "Provide a model name in your quiz.json",
            ));
        }

        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(QuizError::config_validation(
                "provider.temperature must be between 0 and 2",
                "Set provider.temperature to a value such as 0.3 in your quiz.json",
            ));
        }

        if self.provider.max_tokens == 0 {
            return Err(QuizError::config_validation(
                "provider.maxTokens must be greater than 0",
                "Set provider.maxTokens to at least 1 in your quiz.json",
            ));
        }

        if self.credential_file.trim().is_empty() {
            return Err(QuizError::config_validation(
                "credentialFile must not be empty",
                "Provide a credential file path in your quiz.json",
            ));
        }

        if self.output_dir.trim().is_empty() {
            return Err(QuizError::config_validation(
                "outputDir must not be empty",
                "Provide a valid output directory path in your quiz.json (use '.' for current directory)",
            ));
        }

        Ok(())
    }
}

/// Where questions are loaded from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuestionSource {
    /// The built-in sample set.
    #[default]
    Sample,
    /// A JSON file of question records.
    File,
}

impl QuestionSource {
    /// Parses a string into a `QuestionSource`, case-insensitively.
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sample" => Some(Self::Sample),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for QuestionSource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid question source '{s}': expected one of 'sample', 'file'"
            ))
        })
    }
}

impl Serialize for QuestionSource {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = match self {
            Self::Sample => "sample",
            Self::File => "file",
        };
        serializer.serialize_str(s)
    }
}

/// Question bank configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBankConfig {
    /// Which bank to use.
    #[serde(default)]
    pub source: QuestionSource,

    /// Path to the JSON question file (required for the `file` source).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Artificial latency of the sample bank in milliseconds.
    #[serde(default = "default_simulated_delay_ms")]
    pub simulated_delay_ms: u64,
}

impl Default for QuestionBankConfig {
    fn default() -> Self {
        Self {
            source: QuestionSource::default(),
            path: None,
            simulated_delay_ms: default_simulated_delay_ms(),
        }
    }
}

/// Pacing of the auto-answer cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoAnswerConfig {
    /// Delay before the provider is queried.
    #[serde(default = "default_thinking_delay_ms")]
    pub thinking_delay_ms: u64,

    /// Delay between selecting and revealing.
    #[serde(default = "default_reveal_delay_ms")]
    pub reveal_delay_ms: u64,

    /// Delay between revealing and advancing.
    #[serde(default = "default_advance_delay_ms")]
    pub advance_delay_ms: u64,

    /// Upper bound on one provider call in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Whether the session starts with auto-answer mode on.
    #[serde(default)]
    pub start_enabled: bool,
}

impl Default for AutoAnswerConfig {
    fn default() -> Self {
        Self {
            thinking_delay_ms: default_thinking_delay_ms(),
            reveal_delay_ms: default_reveal_delay_ms(),
            advance_delay_ms: default_advance_delay_ms(),
            provider_timeout_secs: default_provider_timeout_secs(),
            start_enabled: false,
        }
    }
}

impl AutoAnswerConfig {
    /// The thinking delay as a [`Duration`].
    #[must_use]
    pub const fn thinking_delay(&self) -> Duration {
        Duration::from_millis(self.thinking_delay_ms)
    }

    /// The reveal delay as a [`Duration`].
    #[must_use]
    pub const fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }

    /// The advance delay as a [`Duration`].
    #[must_use]
    pub const fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }

    /// The provider timeout as a [`Duration`].
    #[must_use]
    pub const fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

/// Chat-completions provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Base URL; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name sent with each request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion token budget.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}
