//! Markdown score card generation.
//!
//! [`MarkdownGenerator`] renders a [`ScoreCard`] as a Markdown document with a
//! summary table, the grade message and one row per revealed answer.
//!
//! # Example
//!
//! ```rust
//! use quiz_report::{MarkdownGenerator, ScoreCard};
//!
//! let card = ScoreCard::try_new(0, 5, Vec::new()).unwrap();
//! let markdown = MarkdownGenerator::new(&card).generate();
//! assert!(markdown.contains("# Quiz Score Card"));
//! ```

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::{AnswerRow, ScoreCard};

/// Generates Markdown score cards.
pub struct MarkdownGenerator<'a> {
    card: &'a ScoreCard,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a new Markdown generator for the given score card.
    #[must_use]
    pub const fn new(card: &'a ScoreCard) -> Self {
        Self { card }
    }

    /// Generates the complete Markdown document.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        Self::write_title(&mut output);
        self.write_summary(&mut output);
        self.write_answers(&mut output);
        self.write_footer(&mut output);

        output
    }

    fn write_title(output: &mut String) {
        let _ = writeln!(output, "# Quiz Score Card\n");
    }

    /// Writes the summary table and grade message.
    fn write_summary(&self, output: &mut String) {
        let card = self.card;

        let _ = writeln!(output, "## Summary\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Score | {}/{} |", card.score, card.total);
        let _ = writeln!(output, "| Percentage | {:.0}% |", card.percentage);
        let _ = writeln!(output, "| Answered | {} |", card.answers.len());
        let _ = writeln!(output, "| Unanswered | {} |", card.unanswered());
        let _ = writeln!(output, "| Auto-answered | {} |", card.auto_answered());
        let _ = writeln!(output);
        let _ = writeln!(output, "**{}**\n", card.grade.message());
        let _ = writeln!(
            output,
            "You got {} out of {} questions correct.\n",
            card.score, card.total
        );
    }

    /// Writes the per-question table.
    fn write_answers(&self, output: &mut String) {
        let _ = writeln!(output, "## Answers\n");

        if self.card.answers.is_empty() {
            let _ = writeln!(output, "*No answers revealed.*\n");
            return;
        }

        let _ = writeln!(output, "| # | Question | Your Answer | Correct Answer | Result | Auto |");
        let _ = writeln!(output, "|---|----------|-------------|----------------|--------|------|");

        for row in &self.card.answers {
            Self::write_answer_row(output, row);
        }

        let _ = writeln!(output);
    }

    fn write_answer_row(output: &mut String, row: &AnswerRow) {
        let number = row.number;
        let prompt = escape_markdown(&row.prompt);
        let chosen = format!("{}: {}", row.chosen_letter, escape_markdown(&row.chosen_text));
        let correct = format!(
            "{}: {}",
            row.correct_letter,
            escape_markdown(&row.correct_text)
        );
        let result = if row.correct { "Correct" } else { "Incorrect" };
        let auto = if row.auto_answered { "yes" } else { "no" };
        let _ = writeln!(
            output,
            "| {number} | {prompt} | {chosen} | {correct} | {result} | {auto} |"
        );
    }

    fn write_footer(&self, output: &mut String) {
        let _ = writeln!(output, "---");
        let timestamp = format_timestamp(&self.card.generated_at);
        let _ = writeln!(output, "*Generated by quiz at {timestamp}*");
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Formats a timestamp as "YYYY-MM-DD HH:MM:SS UTC".
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Escapes special Markdown characters in text.
///
/// This prevents question content from being interpreted as Markdown.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '*' | '_' | '`' | '#' | '[' | ']' | '(' | ')' | '!' | '\\' | '<' | '>' | '|' => {
                result.push('\\');
                result.push(ch);
            }
            '\n' => result.push_str("<br>"),
            _ => result.push(ch),
        }
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
