mod command;
mod controller;
mod countdown;
mod progress;
mod runner;
mod view;

// Public API of the session subsystem.
pub use command::SessionCommand;
pub use controller::{SessionController, SessionEvent};
pub use countdown::{Countdown, CountdownConfig, CountdownHandle, CountdownStop, SharedController};
pub use progress::SessionProgress;
pub use runner::SessionRunner;
pub use view::{NextLabel, SessionView};
