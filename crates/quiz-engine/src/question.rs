//! Question records and the question-bank providers.
//!
//! A [`Question`] is immutable once loaded. Question banks produce an ordered,
//! validated list of questions; the store wraps each fetch with the loading
//! flag and turns failures into a `load_failed` notification.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{QuestionBankConfig, QuestionSource};
use crate::error::{QuizError, Result};

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique opaque identifier.
    pub id: String,

    /// The question text.
    #[serde(alias = "question")]
    pub prompt: String,

    /// Exactly four distinct option texts.
    pub options: Vec<String>,

    /// Index of the correct option in `[0, 3]`.
    #[serde(alias = "correctAnswerIndex")]
    pub correct_option_index: usize,

    /// Optional explanation shown after reveal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    /// Creates a question from its parts.
    ///
    /// No validation happens here; see [`Question::validate`].
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        prompt: impl Into<String>,
        options: [&str; OPTION_COUNT],
        correct_option_index: usize,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            options: options.iter().map(ToString::to_string).collect(),
            correct_option_index,
            explanation: None,
        }
    }

    /// Attaches an explanation.
    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Checks the per-question invariants.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidQuestion` when the prompt is blank, the
    /// option count is not four, options repeat, or the correct index is out
    /// of range.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(QuizError::invalid_question(&self.id, "id must not be empty"));
        }
        if self.prompt.trim().is_empty() {
            return Err(QuizError::invalid_question(
                &self.id,
                "prompt must not be empty",
            ));
        }
        if self.options.len() != OPTION_COUNT {
            return Err(QuizError::invalid_question(
                &self.id,
                format!(
                    "expected {OPTION_COUNT} options, found {}",
                    self.options.len()
                ),
            ));
        }
        let distinct: HashSet<&str> = self.options.iter().map(String::as_str).collect();
        if distinct.len() != OPTION_COUNT {
            return Err(QuizError::invalid_question(
                &self.id,
                "options must be distinct",
            ));
        }
        if self.correct_option_index >= OPTION_COUNT {
            return Err(QuizError::invalid_question(
                &self.id,
                format!(
                    "correct option index {} is out of range",
                    self.correct_option_index
                ),
            ));
        }
        Ok(())
    }

    /// Returns `true` when `index` is the correct option.
    #[must_use]
    pub const fn is_correct(&self, index: usize) -> bool {
        self.correct_option_index == index
    }
}

/// Returns the display letter for an option index (`0` is `A`).
#[must_use]
pub fn option_letter(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map_or('?', |i| char::from(b'A' + i))
}

/// Validates a whole question list: every question valid, ids unique.
///
/// # Errors
///
/// Returns the first `QuizError::InvalidQuestion` found.
pub fn validate_questions(questions: &[Question]) -> Result<()> {
    let mut seen = HashSet::new();
    for question in questions {
        question.validate()?;
        if !seen.insert(question.id.as_str()) {
            return Err(QuizError::invalid_question(&question.id, "duplicate id"));
        }
    }
    Ok(())
}

// ============================================================================
// Question banks
// ============================================================================

/// A source of quiz questions.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Fetches the ordered question list.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::QuestionLoadFailed` when no questions can be produced.
    async fn fetch_questions(&self) -> Result<Vec<Question>>;
}

/// The built-in general-knowledge question set.
#[derive(Debug, Clone)]
pub struct SampleQuestionBank {
    delay: Duration,
}

impl SampleQuestionBank {
    /// Creates the bank with a simulated fetch latency.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// The five sample questions.
    #[must_use]
    pub fn questions() -> Vec<Question> {
        vec![
            Question::new(
                "1",
                "What is the capital of France?",
                ["London", "Berlin", "Paris", "Madrid"],
                2,
            )
            .with_explanation("Paris is the capital city of France."),
            Question::new(
                "2",
                "Which planet is known as the Red Planet?",
                ["Jupiter", "Mars", "Venus", "Saturn"],
                1,
            )
            .with_explanation("Mars appears red due to iron oxide (rust) on its surface."),
            Question::new(
                "3",
                "What is the chemical symbol for gold?",
                ["Go", "Gd", "Gl", "Au"],
                3,
            )
            .with_explanation(
                "The chemical symbol Au comes from the Latin word for gold, 'aurum'.",
            ),
            Question::new(
                "4",
                "Which year did the Titanic sink?",
                ["1912", "1905", "1921", "1898"],
                0,
            )
            .with_explanation("The Titanic sank on April 15, 1912, during its maiden voyage."),
            Question::new(
                "5",
                "Who painted the Mona Lisa?",
                [
                    "Vincent van Gogh",
                    "Leonardo da Vinci",
                    "Pablo Picasso",
                    "Michelangelo",
                ],
                1,
            )
            .with_explanation("Leonardo da Vinci painted the Mona Lisa between 1503 and 1519."),
        ]
    }
}

impl Default for SampleQuestionBank {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

#[async_trait]
impl QuestionBank for SampleQuestionBank {
    async fn fetch_questions(&self) -> Result<Vec<Question>> {
        tokio::time::sleep(self.delay).await;
        Ok(Self::questions())
    }
}

/// Loads questions from a JSON array on disk.
#[derive(Debug, Clone)]
pub struct FileQuestionBank {
    path: PathBuf,
}

impl FileQuestionBank {
    /// Creates a bank reading from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QuestionBank for FileQuestionBank {
    async fn fetch_questions(&self) -> Result<Vec<Question>> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            QuizError::question_load(format!("cannot read {}: {e}", self.path.display()))
        })?;

        let questions: Vec<Question> = serde_json::from_str(&contents).map_err(|e| {
            QuizError::question_load(format!("invalid JSON in {}: {e}", self.path.display()))
        })?;

        if questions.is_empty() {
            return Err(QuizError::question_load(format!(
                "{} contains no questions",
                self.path.display()
            )));
        }

        validate_questions(&questions)
            .map_err(|e| QuizError::question_load(e.to_string()))?;

        tracing::debug!(path = %self.path.display(), count = questions.len(), "Loaded question file");
        Ok(questions)
    }
}

/// Builds the question bank described by the configuration.
#[must_use]
pub fn bank_from_config(config: &QuestionBankConfig) -> Arc<dyn QuestionBank> {
    match (config.source, config.path.as_deref()) {
        (QuestionSource::File, Some(path)) => Arc::new(FileQuestionBank::new(path)),
        _ => Arc::new(SampleQuestionBank::new(Duration::from_millis(
            config.simulated_delay_ms,
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_sample_questions_are_valid() {
        let questions = SampleQuestionBank::questions();
        assert_eq!(questions.len(), 5);
        assert!(validate_questions(&questions).is_ok());
        assert_eq!(questions[0].correct_option_index, 2);
        assert_eq!(questions[0].options[2], "Paris");
        assert_eq!(questions[2].options[3], "Au");
    }

    #[test]
    fn test_validate_rejects_wrong_option_count() {
        let mut question = Question::new("q", "Prompt?", ["a", "b", "c", "d"], 0);
        question.options.pop();
        let err = question.validate().unwrap_err();
        assert!(err.to_string().contains("expected 4 options"));
    }

    #[test]
    fn test_validate_rejects_duplicate_options() {
        let question = Question::new("q", "Prompt?", ["a", "a", "c", "d"], 0);
        assert!(question.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_index() {
        let question = Question::new("q", "Prompt?", ["a", "b", "c", "d"], 4);
        let err = question.validate().unwrap_err();
        assert!(matches!(err, QuizError::InvalidQuestion { .. }));
    }

    #[test]
    fn test_validate_rejects_blank_prompt() {
        let question = Question::new("q", "  ", ["a", "b", "c", "d"], 0);
        assert!(question.validate().is_err());
    }

    #[test]
    fn test_validate_questions_rejects_duplicate_ids() {
        let questions = vec![
            Question::new("same", "One?", ["a", "b", "c", "d"], 0),
            Question::new("same", "Two?", ["a", "b", "c", "d"], 1),
        ];
        let err = validate_questions(&questions).unwrap_err();
        assert!(err.to_string().contains("duplicate id"));
    }

    #[test]
    fn test_option_letter() {
        assert_eq!(option_letter(0), 'A');
        assert_eq!(option_letter(3), 'D');
        assert_eq!(option_letter(99), '?');
    }

    #[test]
    fn test_question_accepts_reference_field_names() {
        let json = r#"{
            "id": "1",
            "question": "What is 2 + 2?",
            "options": ["3", "4", "5", "6"],
            "correctAnswerIndex": 1
        }"#;
        let question: Question = serde_json::from_str(json).unwrap();
        assert_eq!(question.prompt, "What is 2 + 2?");
        assert_eq!(question.correct_option_index, 1);
        assert!(question.explanation.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_bank_waits_for_simulated_delay() {
        let bank = SampleQuestionBank::default();
        let start = tokio::time::Instant::now();
        let questions = bank.fetch_questions().await.unwrap();
        assert_eq!(questions.len(), 5);
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_file_bank_loads_valid_file() {
        let path = temp_file(
            "test_quiz_questions_valid.json",
            r#"[{"id": "a", "prompt": "Sky colour?", "options": ["Red", "Blue", "Green", "Pink"], "correctOptionIndex": 1}]"#,
        );
        let questions = tokio_test::assert_ok!(FileQuestionBank::new(&path).fetch_questions().await);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].options[1], "Blue");
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_file_bank_rejects_empty_list() {
        let path = temp_file("test_quiz_questions_empty.json", "[]");
        let err = FileQuestionBank::new(&path)
            .fetch_questions()
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::QuestionLoadFailed { .. }));
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_file_bank_rejects_invalid_question() {
        let path = temp_file(
            "test_quiz_questions_invalid.json",
            r#"[{"id": "a", "prompt": "Q?", "options": ["x", "y"], "correctOptionIndex": 0}]"#,
        );
        let err = FileQuestionBank::new(&path)
            .fetch_questions()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected 4 options"));
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_file_bank_missing_file() {
        let err = tokio_test::assert_err!(
            FileQuestionBank::new("/nonexistent/questions.json")
                .fetch_questions()
                .await
        );
        assert!(matches!(err, QuizError::QuestionLoadFailed { .. }));
    }
}
