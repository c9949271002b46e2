//! JSON score card generation.
//!
//! This module provides [`JsonGenerator`] for serializing score cards to JSON.
//! Output can be compact single-line JSON or pretty-printed for human reading.
//!
//! # Example
//!
//! ```rust
//! use quiz_report::{ScoreCard, json::JsonGenerator};
//!
//! let card = ScoreCard::default();
//! let generator = JsonGenerator::new(&card);
//!
//! let compact = generator.generate().unwrap();
//! let pretty = generator.generate_pretty().unwrap();
//!
//! // generator.write_to_file(std::path::Path::new("quiz-report.json"), true).unwrap();
//! ```

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::{ReportError, Result, ScoreCard};

/// JSON score card generator.
pub struct JsonGenerator<'a> {
    card: &'a ScoreCard,
}

impl<'a> JsonGenerator<'a> {
    /// Creates a new JSON generator for the given score card.
    #[must_use]
    pub const fn new(card: &'a ScoreCard) -> Self {
        Self { card }
    }

    /// Generates compact JSON output (single line, no extra whitespace).
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if JSON serialization fails.
    pub fn generate(&self) -> Result<String> {
        serde_json::to_string(self.card).map_err(ReportError::from)
    }

    /// Generates pretty-printed JSON output with indentation.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if JSON serialization fails.
    pub fn generate_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self.card).map_err(ReportError::from)
    }

    /// Writes the JSON score card to a file, creating or overwriting it.
    ///
    /// Parent directories must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if JSON serialization fails.
    /// Returns [`ReportError::Io`] if file creation or writing fails.
    pub fn write_to_file(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = if pretty {
            self.generate_pretty()?
        } else {
            self.generate()?
        };

        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}
