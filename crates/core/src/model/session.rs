use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::SessionId;
use crate::model::question::{Question, QuestionSet};
use crate::model::settings::{ExitTimerPolicy, SessionSettings, SettingsError};
use crate::time::Clock;

//
// ─── STATUS & REASONS ──────────────────────────────────────────────────────────
//

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    ConfirmingExit,
    Completed,
    Aborted,
}

impl SessionStatus {
    /// `Completed` and `Aborted` have no outgoing transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Aborted)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Active => "active",
            SessionStatus::ConfirmingExit => "confirming exit",
            SessionStatus::Completed => "completed",
            SessionStatus::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Why a session reached its terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndReason {
    TimeExpired,
    UserSubmitted,
    UserAborted,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EndReason::TimeExpired => "time expired",
            EndReason::UserSubmitted => "submitted",
            EndReason::UserAborted => "aborted by user",
        };
        f.write_str(label)
    }
}

/// Operations a caller can attempt against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionAction {
    SelectAnswer,
    GoNext,
    GoPrevious,
    ToggleFlag,
    Tick,
    RequestExit,
    CancelExit,
    ConfirmExit,
    Submit,
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionAction::SelectAnswer => "select answer",
            SessionAction::GoNext => "next question",
            SessionAction::GoPrevious => "previous question",
            SessionAction::ToggleFlag => "toggle flag",
            SessionAction::Tick => "tick",
            SessionAction::RequestExit => "request exit",
            SessionAction::CancelExit => "cancel exit",
            SessionAction::ConfirmExit => "confirm exit",
            SessionAction::Submit => "submit",
        };
        f.write_str(label)
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Why an operation was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Status(SessionStatus),
    FirstQuestion,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Status(status) => write!(f, "session is {status}"),
            Rejection::FirstQuestion => f.write_str("already at the first question"),
        }
    }
}

/// Errors reported by session operations.
///
/// Every error leaves the session exactly as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("invalid session configuration: {0}")]
    InvalidConfiguration(#[from] SettingsError),

    #[error("{action} rejected: {reason}")]
    InvalidOperation {
        action: SessionAction,
        reason: Rejection,
    },

    #[error("option {index} is out of range ({available} options)")]
    InvalidOption { index: usize, available: usize },
}

//
// ─── TERMINAL EVENT ────────────────────────────────────────────────────────────
//

/// Emitted exactly once, when the session reaches a terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalEvent {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub reason: EndReason,
    pub ended_at: DateTime<Utc>,
    pub remaining_secs: u32,
}

/// Result of an operation that may end the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Continued,
    Ended(TerminalEvent),
}

impl Transition {
    #[must_use]
    pub fn is_ended(&self) -> bool {
        matches!(self, Transition::Ended(_))
    }

    #[must_use]
    pub fn terminal_event(&self) -> Option<&TerminalEvent> {
        match self {
            Transition::Ended(event) => Some(event),
            Transition::Continued => None,
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state machine for one timed test attempt.
///
/// The session never reads the wall clock for its countdown; `tick` is called
/// by whoever hosts it. The `Clock` is only used to stamp start and end times.
pub struct Session {
    id: SessionId,
    questions: QuestionSet,
    settings: SessionSettings,
    clock: Clock,
    started_at: DateTime<Utc>,
    current: usize,
    answers: BTreeMap<usize, usize>,
    flags: BTreeSet<usize>,
    visit_selection: Option<usize>,
    remaining_secs: u32,
    status: SessionStatus,
    outcome: Option<TerminalEvent>,
}

impl Session {
    /// Start a fresh session at the first question with the full duration.
    #[must_use]
    pub fn start(questions: QuestionSet, settings: SessionSettings, clock: Clock) -> Self {
        Self {
            id: SessionId::generate(),
            remaining_secs: settings.duration_secs(),
            questions,
            settings,
            clock,
            started_at: clock.now(),
            current: 0,
            answers: BTreeMap::new(),
            flags: BTreeSet::new(),
            visit_selection: None,
            status: SessionStatus::Active,
            outcome: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.settings.question_count() as usize
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        self.questions.at(self.current)
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current + 1 >= self.question_count()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Recorded answers keyed by question index.
    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    #[must_use]
    pub fn answer_for(&self, index: usize) -> Option<usize> {
        self.answers.get(&index).copied()
    }

    /// Option chosen for the current question during this visit.
    ///
    /// Cleared whenever the position changes, even if an earlier answer for
    /// the new position is still recorded in `answers`.
    #[must_use]
    pub fn visit_selection(&self) -> Option<usize> {
        self.visit_selection
    }

    #[must_use]
    pub fn flags(&self) -> &BTreeSet<usize> {
        &self.flags
    }

    #[must_use]
    pub fn is_flagged(&self, index: usize) -> bool {
        self.flags.contains(&index)
    }

    /// The terminal event, once the session has ended.
    #[must_use]
    pub fn outcome(&self) -> Option<&TerminalEvent> {
        self.outcome.as_ref()
    }

    /// Record `option` as the answer to the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOperation` unless the session is active and
    /// `SessionError::InvalidOption` if the current question has no such option.
    pub fn select_answer(&mut self, option: usize) -> Result<(), SessionError> {
        self.ensure(SessionAction::SelectAnswer, SessionStatus::Active)?;
        let available = self.current_question().option_count();
        if option >= available {
            return Err(SessionError::InvalidOption {
                index: option,
                available,
            });
        }

        self.answers.insert(self.current, option);
        self.visit_selection = Some(option);
        Ok(())
    }

    /// Move to the next question; on the last question this submits.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOperation` unless the session is active.
    pub fn go_next(&mut self) -> Result<Transition, SessionError> {
        self.ensure(SessionAction::GoNext, SessionStatus::Active)?;
        if self.is_last_question() {
            return Ok(self.finish(SessionStatus::Completed, EndReason::UserSubmitted));
        }

        self.current += 1;
        self.visit_selection = None;
        Ok(Transition::Continued)
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidOperation` unless the session is active,
    /// or when already at the first question.
    pub fn go_previous(&mut self) -> Result<(), SessionError> {
        self.ensure(SessionAction::GoPrevious, SessionStatus::Active)?;
        if self.current == 0 {
            return Err(SessionError::InvalidOperation {
                action: SessionAction::GoPrevious,
                reason: Rejection::FirstQuestion,
            });
        }

        self.current -= 1;
        self.visit_selection = None;
        Ok(())
    }

    /// Flip the review flag on the current question. Returns the new state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOperation` unless the session is active.
    pub fn toggle_flag(&mut self) -> Result<bool, SessionError> {
        self.ensure(SessionAction::ToggleFlag, SessionStatus::Active)?;
        if self.flags.remove(&self.current) {
            return Ok(false);
        }
        self.flags.insert(self.current);
        Ok(true)
    }

    /// Advance the countdown by one second.
    ///
    /// While confirming exit, the countdown follows the configured
    /// `ExitTimerPolicy` but never ends the session; expiry is applied when
    /// the user cancels the exit.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOperation` once the session is terminal.
    pub fn tick(&mut self) -> Result<Transition, SessionError> {
        match self.status {
            SessionStatus::Active => {
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                if self.remaining_secs == 0 {
                    return Ok(self.finish(SessionStatus::Completed, EndReason::TimeExpired));
                }
                Ok(Transition::Continued)
            }
            SessionStatus::ConfirmingExit => {
                if self.settings.exit_timer_policy() == ExitTimerPolicy::KeepRunning {
                    self.remaining_secs = self.remaining_secs.saturating_sub(1);
                }
                Ok(Transition::Continued)
            }
            status @ (SessionStatus::Completed | SessionStatus::Aborted) => {
                Err(SessionError::InvalidOperation {
                    action: SessionAction::Tick,
                    reason: Rejection::Status(status),
                })
            }
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidOperation` unless the session is active.
    pub fn request_exit(&mut self) -> Result<(), SessionError> {
        self.ensure(SessionAction::RequestExit, SessionStatus::Active)?;
        self.status = SessionStatus::ConfirmingExit;
        Ok(())
    }

    /// Dismiss the exit confirmation.
    ///
    /// If the countdown ran out while the confirmation was showing, the
    /// session completes immediately with `EndReason::TimeExpired`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOperation` unless an exit is being confirmed.
    pub fn cancel_exit(&mut self) -> Result<Transition, SessionError> {
        self.ensure(SessionAction::CancelExit, SessionStatus::ConfirmingExit)?;
        if self.remaining_secs == 0 {
            return Ok(self.finish(SessionStatus::Completed, EndReason::TimeExpired));
        }
        self.status = SessionStatus::Active;
        Ok(Transition::Continued)
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidOperation` unless an exit is being confirmed.
    pub fn confirm_exit(&mut self) -> Result<TerminalEvent, SessionError> {
        self.ensure(SessionAction::ConfirmExit, SessionStatus::ConfirmingExit)?;
        Ok(self.end(SessionStatus::Aborted, EndReason::UserAborted))
    }

    /// Submit at any position, answered or not.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOperation` unless the session is active.
    pub fn submit(&mut self) -> Result<TerminalEvent, SessionError> {
        self.ensure(SessionAction::Submit, SessionStatus::Active)?;
        Ok(self.end(SessionStatus::Completed, EndReason::UserSubmitted))
    }

    fn ensure(&self, action: SessionAction, required: SessionStatus) -> Result<(), SessionError> {
        if self.status == required {
            return Ok(());
        }
        Err(SessionError::InvalidOperation {
            action,
            reason: Rejection::Status(self.status),
        })
    }

    fn finish(&mut self, status: SessionStatus, reason: EndReason) -> Transition {
        Transition::Ended(self.end(status, reason))
    }

    fn end(&mut self, status: SessionStatus, reason: EndReason) -> TerminalEvent {
        debug_assert!(status.is_terminal());
        debug_assert!(self.outcome.is_none());
        self.status = status;
        let event = TerminalEvent {
            session_id: self.id,
            status,
            reason,
            ended_at: self.clock.now(),
            remaining_secs: self.remaining_secs,
        };
        self.outcome = Some(event.clone());
        event
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("question_count", &self.question_count())
            .field("current", &self.current)
            .field("answers_len", &self.answers.len())
            .field("flags_len", &self.flags.len())
            .field("remaining_secs", &self.remaining_secs)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
