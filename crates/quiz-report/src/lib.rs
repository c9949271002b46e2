//! Quiz Score Card Generation
//!
//! This crate provides types and utilities for generating end-of-quiz score
//! cards. Score cards can be serialized to JSON for programmatic access or
//! rendered to Markdown for human consumption.
//!
//! # Types
//!
//! - [`ScoreCard`] - Final score, percentage, grade and per-question rows
//! - [`AnswerRow`] - One revealed answer
//! - [`Grade`] - Grade band derived from the percentage
//!
//! # Generators
//!
//! - [`json::JsonGenerator`] - Generate JSON with compact or pretty formatting
//! - [`MarkdownGenerator`] - Generate a human-readable Markdown score card
//!
//! # Example
//!
//! ```rust
//! use quiz_report::{AnswerRow, ScoreCard};
//! use quiz_report::json::JsonGenerator;
//!
//! let card = ScoreCard::try_new(
//!     1,
//!     2,
//!     vec![AnswerRow {
//!         number: 1,
//!         prompt: "What is the capital of France?".to_string(),
//!         chosen_letter: 'C',
//!         chosen_text: "Paris".to_string(),
//!         correct_letter: 'C',
//!         correct_text: "Paris".to_string(),
//!         correct: true,
//!         auto_answered: false,
//!     }],
//! )
//! .unwrap();
//!
//! assert_eq!(card.percentage, 50.0);
//! let json = JsonGenerator::new(&card).generate_pretty().unwrap();
//! assert!(json.contains("\"score\": 1"));
//! ```

pub mod json;
mod markdown;

pub use markdown::MarkdownGenerator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during score card generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to serialize the score card to JSON.
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read or write report files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Inconsistent score card data.
    #[error("invalid report data: {0}")]
    InvalidData(String),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

// ============================================================================
// Grade
// ============================================================================

/// Grade band for a final percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    /// 80 % and above.
    QuizMaster,
    /// 60 % up to 80 %.
    GoodJob,
    /// 40 % up to 60 %.
    NotBad,
    /// Below 40 %.
    RoomForImprovement,
}

impl Grade {
    /// Picks the band for a percentage in `[0, 100]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use quiz_report::Grade;
    ///
    /// assert_eq!(Grade::from_percentage(80.0), Grade::QuizMaster);
    /// assert_eq!(Grade::from_percentage(59.9), Grade::NotBad);
    /// assert_eq!(Grade::from_percentage(0.0), Grade::RoomForImprovement);
    /// ```
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            Self::QuizMaster
        } else if percentage >= 60.0 {
            Self::GoodJob
        } else if percentage >= 40.0 {
            Self::NotBad
        } else {
            Self::RoomForImprovement
        }
    }

    /// The message shown with the final score.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::QuizMaster => "Excellent! You're a quiz master!",
            Self::GoodJob => "Good job! You know your stuff!",
            Self::NotBad => "Not bad! Keep learning!",
            Self::RoomForImprovement => "Room for improvement. Try again!",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

// ============================================================================
// Score Card
// ============================================================================

/// One revealed answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRow {
    /// 1-based question number.
    pub number: usize,
    /// The question text.
    pub prompt: String,
    /// Letter of the chosen option.
    pub chosen_letter: char,
    /// Text of the chosen option.
    pub chosen_text: String,
    /// Letter of the correct option.
    pub correct_letter: char,
    /// Text of the correct option.
    pub correct_text: String,
    /// Whether the answer was correct.
    pub correct: bool,
    /// Whether auto-answer mode chose it.
    pub auto_answered: bool,
}

/// End-of-quiz report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCard {
    /// Correct answers.
    pub score: usize,
    /// Number of questions.
    pub total: usize,
    /// `score / total * 100`, or 0 with no questions.
    pub percentage: f64,
    /// Grade band.
    pub grade: Grade,
    /// Revealed answers in order.
    pub answers: Vec<AnswerRow>,
    /// When the card was generated.
    pub generated_at: DateTime<Utc>,
}

impl Default for ScoreCard {
    fn default() -> Self {
        Self {
            score: 0,
            total: 0,
            percentage: 0.0,
            grade: Grade::RoomForImprovement,
            answers: Vec::new(),
            generated_at: Utc::now(),
        }
    }
}

impl ScoreCard {
    /// Builds a score card, deriving percentage and grade.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidData` if the score exceeds the total, more
    /// rows than questions are given, or the score disagrees with the rows.
    pub fn try_new(score: usize, total: usize, answers: Vec<AnswerRow>) -> Result<Self> {
        if score > total {
            return Err(ReportError::InvalidData(format!(
                "score {score} exceeds total {total}"
            )));
        }
        if answers.len() > total {
            return Err(ReportError::InvalidData(format!(
                "{} answers recorded for {total} questions",
                answers.len()
            )));
        }
        let correct_rows = answers.iter().filter(|a| a.correct).count();
        if correct_rows != score {
            return Err(ReportError::InvalidData(format!(
                "score {score} does not match {correct_rows} correct answers"
            )));
        }

        let percentage = percentage(score, total);
        Ok(Self {
            score,
            total,
            percentage,
            grade: Grade::from_percentage(percentage),
            answers,
            generated_at: Utc::now(),
        })
    }

    /// Questions that were never revealed.
    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total.saturating_sub(self.answers.len())
    }

    /// Answers chosen by auto-answer mode.
    #[must_use]
    pub fn auto_answered(&self) -> usize {
        self.answers.iter().filter(|a| a.auto_answered).count()
    }
}

/// Percentage of correct answers; 0 when there are no questions.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(score: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    score as f64 / total as f64 * 100.0
}

// ============================================================================
// Tests
// ============================================================================
