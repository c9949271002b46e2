//! Answer providers for auto-answer mode.
//!
//! An [`AnswerProvider`] receives a question prompt and its four options and
//! returns the index it believes is correct. The OpenAI-compatible provider
//! asks a chat-completions endpoint for a single letter.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{QuizError, Result};
use crate::question::{option_letter, OPTION_COUNT};

/// Instruction sent as the system message.
const SYSTEM_PROMPT: &str = "You are helping answer a multiple-choice quiz question. \
     Respond ONLY with the letter (A, B, C, or D) of the answer you think is correct. \
     Do not explain your reasoning.";

/// Matches a leading answer letter after trimming and upper-casing.
#[allow(clippy::unwrap_used)]
static ANSWER_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-D])").unwrap());

/// Chooses an answer for a multiple-choice question.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Returns the chosen option index.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::ProviderError` when the remote call fails. Quota
    /// failures are classified from the error text.
    async fn choose_answer(&self, api_key: &str, prompt: &str, options: &[String])
        -> Result<usize>;
}

/// Parses a model reply into an option index.
///
/// The reply is trimmed and upper-cased; its first character must be `A`-`D`.
#[must_use]
pub fn parse_answer_letter(content: &str) -> Option<usize> {
    let normalized = content.trim().to_uppercase();
    let captures = ANSWER_LETTER.captures(&normalized)?;
    match captures.get(1)?.as_str() {
        "A" => Some(0),
        "B" => Some(1),
        "C" => Some(2),
        "D" => Some(3),
        _ => None,
    }
}

/// Formats the user message listing the question and lettered options.
#[must_use]
pub fn build_user_prompt(prompt: &str, options: &[String]) -> String {
    let mut message = format!("Question: {prompt}\n\nOptions:");
    for (index, option) in options.iter().enumerate() {
        message.push('\n');
        message.push(option_letter(index));
        message.push_str(": ");
        message.push_str(option);
    }
    message
}

/// Chat-completions client for any OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiProvider {
    /// Creates a provider with the given endpoint settings.
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl AnswerProvider for OpenAiProvider {
    async fn choose_answer(
        &self,
        api_key: &str,
        prompt: &str,
        options: &[String],
    ) -> Result<usize> {
        let payload = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_user_prompt(prompt, options),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(model = %self.config.model, "Requesting answer from provider");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| QuizError::provider_from_message(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuizError::provider_from_message(format!(
                "HTTP {status}: {body}"
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| QuizError::provider_from_message(format!("invalid response: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        debug!(reply = %content.trim(), "Provider replied");

        Ok(parse_answer_letter(&content).unwrap_or_else(|| {
            warn!(reply = %content.trim(), "Could not parse provider reply, choosing at random");
            rand::thread_rng().gen_range(0..OPTION_COUNT)
        }))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
