//! Auto-answer orchestration.
//!
//! The [`Orchestrator`] watches the session's [`ArmingKey`]. Whenever the key
//! changes it aborts the running cycle and, if auto-answer mode is on and an
//! unrevealed question is current, spawns a new one. A cycle waits, asks the
//! answer provider, then selects, reveals and advances with delays between.
//!
//! Every command a cycle issues is stamped with the epoch it was armed on, so
//! a cycle that loses the abort race still cannot touch the session.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::AutoAnswerConfig;
use crate::credential::CredentialStore;
use crate::error::{AiError, AiErrorKind, QuizError, Result};
use crate::provider::AnswerProvider;
use crate::question::Question;
use crate::session::{ArmingKey, Command};
use crate::store::QuizStore;

/// Drives auto-answer cycles against a [`QuizStore`].
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<QuizStore>,
    provider: Arc<dyn AnswerProvider>,
    credentials: Arc<dyn CredentialStore>,
    timings: AutoAnswerConfig,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        store: Arc<QuizStore>,
        provider: Arc<dyn AnswerProvider>,
        credentials: Arc<dyn CredentialStore>,
        timings: AutoAnswerConfig,
    ) -> Self {
        Self {
            store,
            provider,
            credentials,
            timings,
        }
    }

    /// Runs the orchestrator on a background task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Watches the arming key until the store goes away.
    pub async fn run(self) {
        let mut keys = self.store.watch_arming();
        let mut cycle: Option<JoinHandle<()>> = None;

        loop {
            let key = *keys.borrow_and_update();
            if let Some(handle) = cycle.take() {
                handle.abort();
            }
            cycle = self.arm(key).await;

            if keys.changed().await.is_err() {
                break;
            }
        }

        if let Some(handle) = cycle {
            handle.abort();
        }
        debug!("Auto-answer orchestrator stopped");
    }

    async fn arm(&self, key: ArmingKey) -> Option<JoinHandle<()>> {
        if !key.auto_answer_mode || key.complete || !key.loaded {
            return None;
        }

        let question = self
            .store
            .read(|session| {
                if session.cycle_epoch() == key.epoch && session.wants_auto_answer() {
                    session.current_question().cloned()
                } else {
                    None
                }
            })
            .await?;

        debug!(epoch = key.epoch, question = %question.id, "Auto-answer cycle armed");

        let cycle = Cycle {
            store: Arc::clone(&self.store),
            provider: Arc::clone(&self.provider),
            credentials: Arc::clone(&self.credentials),
            timings: self.timings.clone(),
            epoch: key.epoch,
            question,
        };
        Some(tokio::spawn(cycle.run()))
    }
}

/// One answer attempt on one question.
struct Cycle {
    store: Arc<QuizStore>,
    provider: Arc<dyn AnswerProvider>,
    credentials: Arc<dyn CredentialStore>,
    timings: AutoAnswerConfig,
    epoch: u64,
    question: Question,
}

impl Cycle {
    async fn run(self) {
        sleep(self.timings.thinking_delay()).await;

        if !self.issue(Command::SetAiThinking(true)).await {
            return;
        }
        debug!(epoch = self.epoch, question = %self.question.id, "Asking answer provider");

        let answer = match self.fetch_answer().await {
            Ok(answer) => answer,
            Err(err) => {
                let descriptor = AiError::from(&err);
                warn!(
                    epoch = self.epoch,
                    kind = %descriptor.kind,
                    error = %err,
                    "Auto-answer failed"
                );
                if self.issue(Command::SetAiThinking(false)).await {
                    self.issue(Command::SetAiError(Some(descriptor))).await;
                }
                return;
            }
        };

        if !self.issue(Command::SetAiThinking(false)).await {
            return;
        }
        info!(question = %self.question.id, answer, "Auto-answer selected option");
        if !self.issue(Command::SelectOption(answer)).await {
            return;
        }

        sleep(self.timings.reveal_delay()).await;
        if !self.issue(Command::Reveal).await {
            return;
        }

        sleep(self.timings.advance_delay()).await;
        self.issue(Command::Advance).await;
    }

    /// Issues an epoch-guarded command, returning `false` once superseded.
    async fn issue(&self, command: Command) -> bool {
        self.store
            .dispatch_if_epoch(self.epoch, command)
            .await
            .is_some()
    }

    async fn fetch_answer(&self) -> Result<usize> {
        let api_key = self
            .credentials
            .get()
            .await?
            .ok_or_else(QuizError::credential_not_found)?;

        let limit = self.timings.provider_timeout();
        let answer = timeout(
            limit,
            self.provider
                .choose_answer(&api_key, &self.question.prompt, &self.question.options),
        )
        .await
        .map_err(|_| {
            QuizError::provider(
                AiErrorKind::Timeout,
                format!("answer provider timed out after {}s", limit.as_secs()),
            )
        })??;

        if answer >= self.question.options.len() {
            return Err(QuizError::provider(
                AiErrorKind::Generic,
                format!("answer provider returned out-of-range option {answer}"),
            ));
        }
        Ok(answer)
    }
}
