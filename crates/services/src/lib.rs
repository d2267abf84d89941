#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use exam_core::Clock;
pub use sessions as session;

pub use error::RunnerError;

pub use sessions::{
    Countdown, CountdownConfig, CountdownHandle, CountdownStop, NextLabel, SessionCommand,
    SessionController, SessionEvent, SessionProgress, SessionRunner, SessionView,
    SharedController,
};
