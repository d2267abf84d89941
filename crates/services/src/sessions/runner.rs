use std::sync::{Arc, Mutex};

use exam_core::model::{SessionError, SessionStatus, TerminalEvent, Transition};
use tracing::warn;

use super::command::SessionCommand;
use super::controller::SessionController;
use super::countdown::{Countdown, CountdownConfig, CountdownHandle, SharedController};
use super::view::SessionView;
use crate::error::RunnerError;

/// Host for one running test attempt.
///
/// Owns the controller lock and the countdown task. Every operation runs
/// under the lock; as soon as the session is terminal the countdown is
/// cancelled. Dropping the runner cancels it too.
#[derive(Debug)]
pub struct SessionRunner {
    controller: SharedController,
    countdown: CountdownHandle,
}

impl SessionRunner {
    /// Start ticking `controller` on the current tokio runtime.
    #[must_use]
    pub fn launch(controller: SessionController, config: CountdownConfig) -> Self {
        let controller = Arc::new(Mutex::new(controller));
        let countdown = Countdown::spawn(Arc::clone(&controller), config);
        Self {
            controller,
            countdown,
        }
    }

    #[must_use]
    pub fn controller(&self) -> SharedController {
        Arc::clone(&self.controller)
    }

    #[must_use]
    pub fn countdown(&self) -> &CountdownHandle {
        &self.countdown
    }

    /// # Errors
    ///
    /// Returns `RunnerError::LockPoisoned` if the controller lock is poisoned.
    pub fn view(&self) -> Result<SessionView, RunnerError> {
        self.with_controller(|controller| Ok(controller.view()))
    }

    /// # Errors
    ///
    /// Returns `RunnerError::LockPoisoned` if the controller lock is poisoned.
    pub fn status(&self) -> Result<SessionStatus, RunnerError> {
        self.with_controller(|controller| Ok(controller.status()))
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` when the session rejects the selection.
    pub fn select_answer(&self, option: usize) -> Result<(), RunnerError> {
        self.with_controller(|controller| controller.select_answer(option))
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` when the session rejects navigation.
    pub fn go_next(&self) -> Result<Transition, RunnerError> {
        self.with_controller(SessionController::go_next)
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` when the session rejects navigation.
    pub fn go_previous(&self) -> Result<(), RunnerError> {
        self.with_controller(SessionController::go_previous)
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` unless the session is active.
    pub fn toggle_flag(&self) -> Result<bool, RunnerError> {
        self.with_controller(SessionController::toggle_flag)
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` unless the session is active.
    pub fn request_exit(&self) -> Result<(), RunnerError> {
        self.with_controller(SessionController::request_exit)
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` unless an exit is being confirmed.
    pub fn cancel_exit(&self) -> Result<Transition, RunnerError> {
        self.with_controller(SessionController::cancel_exit)
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` unless an exit is being confirmed.
    pub fn confirm_exit(&self) -> Result<TerminalEvent, RunnerError> {
        self.with_controller(SessionController::confirm_exit)
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` unless the session is active.
    pub fn submit(&self) -> Result<TerminalEvent, RunnerError> {
        self.with_controller(SessionController::submit)
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` when the session rejects the command.
    pub fn dispatch(&self, command: SessionCommand) -> Result<(), RunnerError> {
        self.with_controller(|controller| controller.apply(command))
    }

    fn with_controller<T>(
        &self,
        op: impl FnOnce(&mut SessionController) -> Result<T, SessionError>,
    ) -> Result<T, RunnerError> {
        let mut controller = self.controller.lock().map_err(|_| {
            warn!("session lock poisoned");
            RunnerError::LockPoisoned
        })?;
        let result = op(&mut *controller);
        let terminal = controller.status().is_terminal();
        drop(controller);

        if terminal {
            self.countdown.cancel();
        }
        Ok(result?)
    }
}
