use std::fmt;

use exam_core::model::{
    ExitTimerPolicy, QuestionSet, Session, SessionAction, SessionError, SessionSettings,
    SessionStatus, TerminalEvent, Transition,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace, warn};

use super::command::SessionCommand;
use super::view::SessionView;
use crate::Clock;

/// Notifications published by a `SessionController`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Any accepted operation, including ticks.
    Changed(SessionView),
    /// Sent exactly once, after the final `Changed`.
    Ended(TerminalEvent),
}

/// Sole owner and mutator of a `Session`.
///
/// Wraps the core state machine with logging and event publishing. Rejected
/// operations publish nothing and leave the session untouched.
pub struct SessionController {
    session: Session,
    events: Option<UnboundedSender<SessionEvent>>,
}

impl SessionController {
    /// Start a session with `question_count` positions and `duration_secs`
    /// on the clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidConfiguration` if either value is zero.
    pub fn start(
        questions: QuestionSet,
        question_count: u32,
        duration_secs: u32,
    ) -> Result<Self, SessionError> {
        let settings =
            SessionSettings::new(question_count, duration_secs, ExitTimerPolicy::default())?;
        Ok(Self::with_settings(questions, settings, Clock::default_clock()))
    }

    #[must_use]
    pub fn with_settings(questions: QuestionSet, settings: SessionSettings, clock: Clock) -> Self {
        let session = Session::start(questions, settings, clock);
        info!(
            session_id = %session.id(),
            questions = session.question_count(),
            duration_secs = session.remaining_secs(),
            "session started"
        );
        Self {
            session,
            events: None,
        }
    }

    /// Publish events on `tx`. The current view is sent right away.
    #[must_use]
    pub fn with_events(mut self, tx: UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(tx);
        self.publish(SessionEvent::Changed(self.view()));
        self
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView::from_session(&self.session)
    }

    /// # Errors
    ///
    /// See `Session::select_answer`.
    pub fn select_answer(&mut self, option: usize) -> Result<(), SessionError> {
        let result = self.session.select_answer(option);
        self.settle(SessionAction::SelectAnswer, result.map(|()| None))
    }

    /// # Errors
    ///
    /// See `Session::go_next`.
    pub fn go_next(&mut self) -> Result<Transition, SessionError> {
        let result = self.session.go_next();
        self.settle_transition(SessionAction::GoNext, result)
    }

    /// # Errors
    ///
    /// See `Session::go_previous`.
    pub fn go_previous(&mut self) -> Result<(), SessionError> {
        let result = self.session.go_previous();
        self.settle(SessionAction::GoPrevious, result.map(|()| None))
    }

    /// # Errors
    ///
    /// See `Session::toggle_flag`.
    pub fn toggle_flag(&mut self) -> Result<bool, SessionError> {
        let flagged = self.session.toggle_flag();
        let result = flagged.clone().map(|_| None);
        self.settle(SessionAction::ToggleFlag, result)?;
        flagged
    }

    /// # Errors
    ///
    /// See `Session::tick`.
    pub fn tick(&mut self) -> Result<Transition, SessionError> {
        let result = self.session.tick();
        if result.is_ok() {
            trace!(remaining_secs = self.session.remaining_secs(), "tick");
        }
        self.settle_transition(SessionAction::Tick, result)
    }

    /// # Errors
    ///
    /// See `Session::request_exit`.
    pub fn request_exit(&mut self) -> Result<(), SessionError> {
        let result = self.session.request_exit();
        self.settle(SessionAction::RequestExit, result.map(|()| None))
    }

    /// # Errors
    ///
    /// See `Session::cancel_exit`.
    pub fn cancel_exit(&mut self) -> Result<Transition, SessionError> {
        let result = self.session.cancel_exit();
        self.settle_transition(SessionAction::CancelExit, result)
    }

    /// # Errors
    ///
    /// See `Session::confirm_exit`.
    pub fn confirm_exit(&mut self) -> Result<TerminalEvent, SessionError> {
        let result = self.session.confirm_exit();
        self.settle_terminal(SessionAction::ConfirmExit, result)
    }

    /// # Errors
    ///
    /// See `Session::submit`.
    pub fn submit(&mut self) -> Result<TerminalEvent, SessionError> {
        let result = self.session.submit();
        self.settle_terminal(SessionAction::Submit, result)
    }

    /// Apply a user intent.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying operation.
    pub fn apply(&mut self, command: SessionCommand) -> Result<(), SessionError> {
        match command {
            SessionCommand::Select(option) => self.select_answer(option),
            SessionCommand::Next => self.go_next().map(drop),
            SessionCommand::Previous => self.go_previous(),
            SessionCommand::ToggleFlag => self.toggle_flag().map(drop),
            SessionCommand::Submit => self.submit().map(drop),
            SessionCommand::RequestExit => self.request_exit(),
            SessionCommand::CancelExit => self.cancel_exit().map(drop),
            SessionCommand::ConfirmExit => self.confirm_exit().map(drop),
        }
    }

    fn settle_transition(
        &self,
        action: SessionAction,
        result: Result<Transition, SessionError>,
    ) -> Result<Transition, SessionError> {
        let ended = result
            .as_ref()
            .map(|transition| transition.terminal_event().cloned())
            .map_err(|err| err.clone());
        self.settle(action, ended)?;
        result
    }

    fn settle_terminal(
        &self,
        action: SessionAction,
        result: Result<TerminalEvent, SessionError>,
    ) -> Result<TerminalEvent, SessionError> {
        let ended = result
            .as_ref()
            .map(|event| Some(event.clone()))
            .map_err(|err| err.clone());
        self.settle(action, ended)?;
        result
    }

    fn settle(
        &self,
        action: SessionAction,
        result: Result<Option<TerminalEvent>, SessionError>,
    ) -> Result<(), SessionError> {
        let ended = match result {
            Ok(ended) => ended,
            Err(err) => {
                warn!(session_id = %self.session.id(), %action, error = %err, "operation rejected");
                return Err(err);
            }
        };

        if action != SessionAction::Tick {
            debug!(
                session_id = %self.session.id(),
                %action,
                index = self.session.current_index(),
                status = %self.session.status(),
                "operation applied"
            );
        }
        self.publish(SessionEvent::Changed(self.view()));

        if let Some(event) = ended {
            info!(
                session_id = %event.session_id,
                status = %event.status,
                reason = %event.reason,
                remaining_secs = event.remaining_secs,
                answered = self.session.answers().len(),
                "session ended"
            );
            self.publish(SessionEvent::Ended(event));
        }
        Ok(())
    }

    fn publish(&self, event: SessionEvent) {
        let Some(tx) = &self.events else {
            return;
        };
        if tx.send(event).is_err() {
            debug!(session_id = %self.session.id(), "event receiver dropped");
        }
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &self.session)
            .field("has_events", &self.events.is_some())
            .finish()
    }
}
