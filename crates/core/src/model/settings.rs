use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("question count must be > 0")]
    InvalidQuestionCount,

    #[error("session duration must be > 0 seconds")]
    InvalidDuration,
}

/// What the countdown does while the exit confirmation is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitTimerPolicy {
    /// Time keeps elapsing; expiry is deferred until the user returns.
    #[default]
    KeepRunning,
    /// Ticks are ignored until the confirmation is dismissed.
    Pause,
}

/// Configuration for a single timed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    question_count: u32,
    duration_secs: u32,
    exit_timer_policy: ExitTimerPolicy,
}

/// Unvalidated settings, e.g. straight from CLI flags or env vars.
#[derive(Debug, Clone, Default)]
pub struct SessionSettingsDraft {
    pub question_count: Option<u32>,
    pub duration_secs: Option<u32>,
    pub exit_timer_policy: Option<ExitTimerPolicy>,
}

impl SessionSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the draft, filling unset fields from the defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the question count or duration is zero.
    pub fn validate(self) -> Result<SessionSettings, SettingsError> {
        let defaults = SessionSettings::default();
        SessionSettings::new(
            self.question_count.unwrap_or(defaults.question_count),
            self.duration_secs.unwrap_or(defaults.duration_secs),
            self.exit_timer_policy.unwrap_or(defaults.exit_timer_policy),
        )
    }
}

impl SessionSettings {
    /// Default number of questions in a test.
    pub const DEFAULT_QUESTION_COUNT: u32 = 30;
    /// Default duration: one hour.
    pub const DEFAULT_DURATION_SECS: u32 = 3600;

    /// # Errors
    ///
    /// Returns `SettingsError::InvalidQuestionCount` or
    /// `SettingsError::InvalidDuration` when either value is zero.
    pub fn new(
        question_count: u32,
        duration_secs: u32,
        exit_timer_policy: ExitTimerPolicy,
    ) -> Result<Self, SettingsError> {
        if question_count == 0 {
            return Err(SettingsError::InvalidQuestionCount);
        }
        if duration_secs == 0 {
            return Err(SettingsError::InvalidDuration);
        }

        Ok(Self {
            question_count,
            duration_secs,
            exit_timer_policy,
        })
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn exit_timer_policy(&self) -> ExitTimerPolicy {
        self.exit_timer_policy
    }

    #[must_use]
    pub fn with_exit_timer_policy(mut self, policy: ExitTimerPolicy) -> Self {
        self.exit_timer_policy = policy;
        self
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            question_count: Self::DEFAULT_QUESTION_COUNT,
            duration_secs: Self::DEFAULT_DURATION_SECS,
            exit_timer_policy: ExitTimerPolicy::KeepRunning,
        }
    }
}
