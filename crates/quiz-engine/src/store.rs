//! Shared owner of the quiz session.
//!
//! [`QuizStore`] serializes every command behind one async mutex, fans the
//! resulting notifications out through the [`EventBroadcaster`] and publishes
//! the session's [`ArmingKey`] for the auto-answer orchestrator.

use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::{QuizError, Result};
use crate::events::{EventBroadcaster, QuizEvent};
use crate::question::{validate_questions, QuestionBank};
use crate::session::{ArmingKey, Command, CommandOrigin, Session, SessionSnapshot};

/// The single quiz session of this process, shared by `Arc`.
#[derive(Debug)]
pub struct QuizStore {
    session: Mutex<Session>,
    broadcaster: EventBroadcaster,
    arming: watch::Sender<ArmingKey>,
}

impl QuizStore {
    /// Wraps `session`, broadcasting through `broadcaster`.
    #[must_use]
    pub fn new(session: Session, broadcaster: EventBroadcaster) -> Self {
        let (arming, _) = watch::channel(session.arming_key());
        Self {
            session: Mutex::new(session),
            broadcaster,
            arming,
        }
    }

    /// Applies a command and returns the resulting snapshot.
    ///
    /// Notifications are broadcast while the session lock is held, so
    /// subscribers observe them in apply order.
    pub async fn dispatch(&self, command: Command) -> SessionSnapshot {
        let mut session = self.session.lock().await;
        self.apply_locked(&mut session, CommandOrigin::User, command)
    }

    /// Applies an auto-answer command only if the session is still on `epoch`.
    ///
    /// Returns `None` when the command was discarded as stale.
    pub async fn dispatch_if_epoch(&self, epoch: u64, command: Command) -> Option<SessionSnapshot> {
        let mut session = self.session.lock().await;
        if session.cycle_epoch() != epoch {
            debug!(
                command = command.name(),
                epoch,
                current = session.cycle_epoch(),
                "Discarding stale auto-answer command"
            );
            return None;
        }
        Some(self.apply_locked(&mut session, CommandOrigin::AutoAnswer, command))
    }

    fn apply_locked(
        &self,
        session: &mut Session,
        origin: CommandOrigin,
        command: Command,
    ) -> SessionSnapshot {
        let name = command.name();
        let before = session.snapshot();
        let events = session.apply_from(origin, command);
        let after = session.snapshot();

        if before == after {
            debug!(command = name, "Command had no effect");
        } else {
            debug!(
                command = name,
                index = after.current_index,
                score = after.score,
                "Command applied"
            );
            for event in events {
                self.broadcaster.send(event);
            }
            self.broadcaster.send(QuizEvent::session_updated(after.clone()));
        }

        self.publish_arming_key(session);
        after
    }

    fn publish_arming_key(&self, session: &Session) {
        let key = session.arming_key();
        self.arming.send_if_modified(|current| {
            if *current == key {
                false
            } else {
                *current = key;
                true
            }
        });
    }

    /// Fetches questions from `bank` and loads them.
    ///
    /// The loading flag is set for the duration of the fetch regardless of
    /// outcome. On failure the current questions are kept and a `load_failed`
    /// notification is broadcast.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::QuestionLoadFailed` if the bank fails or returns an
    /// empty or invalid list.
    pub async fn load_questions(&self, bank: &dyn QuestionBank) -> Result<SessionSnapshot> {
        self.dispatch(Command::SetLoading(true)).await;

        let fetched = bank.fetch_questions().await.and_then(|questions| {
            if questions.is_empty() {
                return Err(QuizError::question_load("question bank returned no questions"));
            }
            validate_questions(&questions).map_err(|e| QuizError::question_load(e.to_string()))?;
            Ok(questions)
        });

        let result = match fetched {
            Ok(questions) => {
                info!(count = questions.len(), "Questions loaded");
                self.dispatch(Command::LoadQuestions(questions)).await;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Failed to load questions");
                self.broadcaster.send(QuizEvent::load_failed(err.to_string()));
                Err(err)
            }
        };

        let snapshot = self.dispatch(Command::SetLoading(false)).await;
        result.map(|()| snapshot)
    }

    /// Retries auto-answering after a failed attempt.
    ///
    /// Clears the recorded failure and re-arms the orchestrator, for example
    /// after a new credential is saved. Without a recorded failure the
    /// running cycle keeps its pending steps.
    pub async fn rearm(&self) -> SessionSnapshot {
        let mut session = self.session.lock().await;
        if !session.rearm() {
            debug!("No failed auto-answer attempt to retry");
            return session.snapshot();
        }

        debug!(epoch = session.cycle_epoch(), "Auto-answer re-armed");
        let snapshot = session.snapshot();
        self.broadcaster
            .send(QuizEvent::session_updated(snapshot.clone()));
        self.publish_arming_key(&session);
        snapshot
    }

    /// Reads the session under the lock.
    pub async fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        let session = self.session.lock().await;
        f(&session)
    }

    /// A snapshot of the current session.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Subscribes to notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<QuizEvent> {
        self.broadcaster.subscribe()
    }

    /// Watches the fields that arm and disarm auto-answer cycles.
    #[must_use]
    pub fn watch_arming(&self) -> watch::Receiver<ArmingKey> {
        self.arming.subscribe()
    }
}

impl Default for QuizStore {
    fn default() -> Self {
        Self::new(Session::new(), EventBroadcaster::default())
    }
}
