mod ids;
mod question;
mod session;
mod settings;

pub use ids::{ParseIdError, QuestionId, SessionId};
pub use question::{Question, QuestionError, QuestionSet};
pub use session::{
    EndReason, Rejection, Session, SessionAction, SessionError, SessionStatus, TerminalEvent,
    Transition,
};
pub use settings::{ExitTimerPolicy, SessionSettings, SessionSettingsDraft, SettingsError};
