//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::SessionError;

/// Errors emitted by `SessionRunner`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("session state lock was poisoned")]
    LockPoisoned,
}
