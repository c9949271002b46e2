//! Quiz session state machine.
//!
//! The [`Session`] is the single source of truth for quiz progress. It is
//! mutated only through [`Session::apply`], which takes a [`Command`] and
//! returns the notifications the transition produced. Commands whose
//! preconditions do not hold are silent no-ops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AiError;
use crate::events::QuizEvent;
use crate::question::Question;

// ============================================================================
// Command
// ============================================================================

/// A discrete transition request against the session.
///
/// Both the presentation layer and the auto-answer orchestrator issue
/// commands from this set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace the question list and restart progress.
    LoadQuestions(Vec<Question>),
    /// Select an option on the current question.
    SelectOption(usize),
    /// Freeze and score the current selection.
    Reveal,
    /// Move to the next question.
    Advance,
    /// Restart progress on the same questions.
    Reset,
    /// Flip auto-answer mode.
    ToggleAutoAnswerMode,
    /// Set the loading flag.
    SetLoading(bool),
    /// Set the AI thinking flag.
    SetAiThinking(bool),
    /// Set or clear the AI error descriptor.
    SetAiError(Option<AiError>),
}

/// Who issued a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommandOrigin {
    /// The presentation layer.
    #[default]
    User,
    /// The auto-answer orchestrator.
    AutoAnswer,
}

impl Command {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LoadQuestions(_) => "load_questions",
            Self::SelectOption(_) => "select_option",
            Self::Reveal => "reveal",
            Self::Advance => "advance",
            Self::Reset => "reset",
            Self::ToggleAutoAnswerMode => "toggle_auto_answer_mode",
            Self::SetLoading(_) => "set_loading",
            Self::SetAiThinking(_) => "set_ai_thinking",
            Self::SetAiError(_) => "set_ai_error",
        }
    }
}

// ============================================================================
// AnswerRecord
// ============================================================================

/// One revealed answer, kept for the end-of-quiz score card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    /// Identifier of the answered question.
    pub question_id: String,
    /// Position of the question in the list.
    pub question_index: usize,
    /// The option that was revealed.
    pub selected_option_index: usize,
    /// The correct option.
    pub correct_option_index: usize,
    /// Whether the selection was correct.
    pub correct: bool,
    /// Whether the revealed option was chosen by the auto-answer orchestrator.
    pub auto_answered: bool,
    /// When the answer was revealed.
    pub answered_at: DateTime<Utc>,
}

// ============================================================================
// ArmingKey
// ============================================================================

/// The parts of the session the auto-answer orchestrator reacts to.
///
/// A change in any field cancels the running cycle and may arm a new one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArmingKey {
    /// Current cycle epoch.
    pub epoch: u64,
    /// Whether auto-answer mode is on.
    pub auto_answer_mode: bool,
    /// Whether the quiz is complete.
    pub complete: bool,
    /// Whether a question list is loaded.
    pub loaded: bool,
}

// ============================================================================
// Session
// ============================================================================

/// Mutable quiz progress for one run.
#[derive(Debug, Clone, Default)]
pub struct Session {
    questions: Vec<Question>,
    current_index: usize,
    selected_option_index: Option<usize>,
    selection_origin: CommandOrigin,
    revealed: bool,
    last_answer_correct: Option<bool>,
    score: usize,
    complete: bool,
    auto_answer_mode: bool,
    ai_thinking: bool,
    ai_error: Option<AiError>,
    loading: bool,
    history: Vec<AnswerRecord>,
    cycle_epoch: u64,
    question_set: u64,
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty session with auto-answer mode preset.
    #[must_use]
    pub fn with_auto_answer_mode(enabled: bool) -> Self {
        Self {
            auto_answer_mode: enabled,
            ..Self::default()
        }
    }

    /// Applies a command and returns the notifications it produced.
    ///
    /// Commands whose preconditions fail leave the session untouched and
    /// return no notifications.
    pub fn apply(&mut self, command: Command) -> Vec<QuizEvent> {
        self.apply_from(CommandOrigin::User, command)
    }

    /// Applies a command on behalf of `origin`.
    ///
    /// The origin only affects bookkeeping: a revealed answer counts as
    /// auto-answered when the orchestrator selected it.
    pub fn apply_from(&mut self, origin: CommandOrigin, command: Command) -> Vec<QuizEvent> {
        match command {
            Command::LoadQuestions(questions) => self.load_questions(questions),
            Command::SelectOption(index) => {
                self.select_option(index, origin);
                Vec::new()
            }
            Command::Reveal => self.reveal(),
            Command::Advance => self.advance(),
            Command::Reset => {
                self.reset();
                Vec::new()
            }
            Command::ToggleAutoAnswerMode => self.toggle_auto_answer_mode(),
            Command::SetLoading(loading) => {
                self.loading = loading;
                Vec::new()
            }
            Command::SetAiThinking(thinking) => {
                self.ai_thinking = thinking;
                Vec::new()
            }
            Command::SetAiError(error) => {
                self.ai_error.clone_from(&error);
                error.map(QuizEvent::ai_error).into_iter().collect()
            }
        }
    }

    fn load_questions(&mut self, questions: Vec<Question>) -> Vec<QuizEvent> {
        if questions.is_empty() {
            return Vec::new();
        }
        let total = questions.len();
        self.questions = questions;
        self.restart();
        self.question_set += 1;
        vec![QuizEvent::questions_loaded(total)]
    }

    fn select_option(&mut self, index: usize, origin: CommandOrigin) {
        let Some(question) = self.current_question() else {
            return;
        };
        if self.revealed || index >= question.options.len() {
            return;
        }
        self.selected_option_index = Some(index);
        self.selection_origin = origin;
    }

    fn reveal(&mut self) -> Vec<QuizEvent> {
        if self.revealed {
            return Vec::new();
        }
        let Some(selected) = self.selected_option_index else {
            return Vec::new();
        };
        let Some(question) = self.current_question() else {
            return Vec::new();
        };

        let correct = question.is_correct(selected);
        let record = AnswerRecord {
            question_id: question.id.clone(),
            question_index: self.current_index,
            selected_option_index: selected,
            correct_option_index: question.correct_option_index,
            correct,
            auto_answered: self.selection_origin == CommandOrigin::AutoAnswer,
            answered_at: Utc::now(),
        };
        let event = QuizEvent::answer_revealed(
            self.current_index,
            selected,
            question.correct_option_index,
            correct,
        );

        self.revealed = true;
        self.last_answer_correct = Some(correct);
        if correct {
            self.score += 1;
        }
        self.history.push(record);
        vec![event]
    }

    fn advance(&mut self) -> Vec<QuizEvent> {
        if self.questions.is_empty() || self.complete {
            return Vec::new();
        }

        self.current_index += 1;
        self.selected_option_index = None;
        self.revealed = false;
        self.last_answer_correct = None;
        self.ai_error = None;
        self.cancel_cycle();

        if self.current_index >= self.questions.len() {
            self.complete = true;
            return vec![QuizEvent::quiz_complete(self.score, self.questions.len())];
        }
        Vec::new()
    }

    fn reset(&mut self) {
        self.restart();
    }

    fn toggle_auto_answer_mode(&mut self) -> Vec<QuizEvent> {
        self.auto_answer_mode = !self.auto_answer_mode;
        self.ai_error = None;
        self.cancel_cycle();
        vec![QuizEvent::auto_answer_toggled(self.auto_answer_mode)]
    }

    /// Reinitializes progress, keeping questions and mode.
    fn restart(&mut self) {
        self.current_index = 0;
        self.selected_option_index = None;
        self.revealed = false;
        self.last_answer_correct = None;
        self.score = 0;
        self.complete = false;
        self.ai_error = None;
        self.history.clear();
        self.cancel_cycle();
    }

    /// Abandons any in-flight auto-answer cycle.
    fn cancel_cycle(&mut self) {
        self.cycle_epoch += 1;
        self.ai_thinking = false;
    }

    /// Starts a fresh auto-answer attempt after a failed one.
    ///
    /// Used after a new credential is saved. Returns `false` and changes
    /// nothing unless mode is on and an AI error is recorded.
    pub(crate) fn rearm(&mut self) -> bool {
        if self.ai_error().is_none() {
            return false;
        }
        self.ai_error = None;
        self.cancel_cycle();
        true
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// The question at the cursor, if any.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.complete {
            return None;
        }
        self.questions.get(self.current_index)
    }

    /// All loaded questions.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Cursor position.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current_index
    }

    /// Selected option on the current question.
    #[must_use]
    pub const fn selected_option_index(&self) -> Option<usize> {
        self.selected_option_index
    }

    /// Whether the current answer is revealed.
    #[must_use]
    pub const fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Correctness of the revealed answer.
    #[must_use]
    pub const fn last_answer_correct(&self) -> Option<bool> {
        self.last_answer_correct
    }

    /// Number of correct reveals.
    #[must_use]
    pub const fn score(&self) -> usize {
        self.score
    }

    /// Number of loaded questions.
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Whether every question has been advanced past.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether auto-answer mode is on.
    #[must_use]
    pub const fn auto_answer_mode(&self) -> bool {
        self.auto_answer_mode
    }

    /// Whether an answer-provider call is outstanding.
    #[must_use]
    pub const fn ai_thinking(&self) -> bool {
        self.auto_answer_mode && self.ai_thinking
    }

    /// The last auto-answer failure, when mode is on.
    #[must_use]
    pub fn ai_error(&self) -> Option<&AiError> {
        self.ai_error.as_ref().filter(|_| self.auto_answer_mode)
    }

    /// Whether the question bank is being awaited.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Revealed answers in order.
    #[must_use]
    pub fn history(&self) -> &[AnswerRecord] {
        &self.history
    }

    /// The current cycle epoch.
    #[must_use]
    pub const fn cycle_epoch(&self) -> u64 {
        self.cycle_epoch
    }

    /// How many question lists have been loaded.
    #[must_use]
    pub const fn question_set(&self) -> u64 {
        self.question_set
    }

    /// Number of questions answered so far, counting a revealed current one.
    #[must_use]
    pub const fn answered_count(&self) -> usize {
        if self.revealed {
            self.current_index + 1
        } else {
            self.current_index
        }
    }

    /// The fields the orchestrator watches.
    #[must_use]
    pub fn arming_key(&self) -> ArmingKey {
        ArmingKey {
            epoch: self.cycle_epoch,
            auto_answer_mode: self.auto_answer_mode,
            complete: self.complete,
            loaded: !self.questions.is_empty(),
        }
    }

    /// Whether an auto-answer cycle should run right now.
    #[must_use]
    pub fn wants_auto_answer(&self) -> bool {
        self.auto_answer_mode && !self.revealed && self.current_question().is_some()
    }

    /// A read-only copy for the presentation layer.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            questions: self.questions.clone(),
            current_index: self.current_index,
            selected_option_index: self.selected_option_index,
            revealed: self.revealed,
            last_answer_correct: self.last_answer_correct,
            score: self.score,
            total: self.total(),
            complete: self.complete,
            auto_answer_mode: self.auto_answer_mode,
            ai_thinking: self.ai_thinking(),
            ai_error: self.ai_error().cloned(),
            loading: self.loading,
            history: self.history.clone(),
            question_set: self.question_set,
        }
    }
}

// ============================================================================
// SessionSnapshot
// ============================================================================

/// Serializable view of a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Loaded questions.
    pub questions: Vec<Question>,
    /// Cursor position.
    pub current_index: usize,
    /// Selected option on the current question.
    pub selected_option_index: Option<usize>,
    /// Whether the current answer is revealed.
    pub revealed: bool,
    /// Correctness of the revealed answer.
    pub last_answer_correct: Option<bool>,
    /// Number of correct reveals.
    pub score: usize,
    /// Number of loaded questions.
    pub total: usize,
    /// Whether the quiz is complete.
    pub complete: bool,
    /// Whether auto-answer mode is on.
    pub auto_answer_mode: bool,
    /// Whether an answer-provider call is outstanding.
    pub ai_thinking: bool,
    /// Last auto-answer failure.
    pub ai_error: Option<AiError>,
    /// Whether the question bank is being awaited.
    pub loading: bool,
    /// Revealed answers in order.
    pub history: Vec<AnswerRecord>,
    /// How many question lists have been loaded.
    pub question_set: u64,
}

impl SessionSnapshot {
    /// The question at the cursor, if the quiz is still running.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.complete {
            return None;
        }
        self.questions.get(self.current_index)
    }
}
