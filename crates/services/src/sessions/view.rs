use serde::Serialize;

use exam_core::model::{QuestionId, Session, SessionId, SessionStatus};
use exam_core::time::format_countdown;

use super::progress::SessionProgress;

/// Label for the forward navigation control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NextLabel {
    Next,
    Submit,
}

/// Immutable snapshot of everything a renderer needs after a transition.
///
/// Presentation-agnostic: the only pre-formatted value is the `MM:SS`
/// countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub current_index: usize,
    pub question_id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub has_media: bool,
    /// Option chosen during the current visit of this question.
    pub selected: Option<usize>,
    pub flagged: bool,
    pub remaining_secs: u32,
    pub remaining: String,
    pub can_go_previous: bool,
    pub next_label: NextLabel,
    pub progress: SessionProgress,
}

impl SessionView {
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        let question = session.current_question();
        let index = session.current_index();
        let active = session.status() == SessionStatus::Active;
        Self {
            session_id: session.id(),
            status: session.status(),
            current_index: index,
            question_id: question.id(),
            prompt: question.prompt().to_string(),
            options: question.options().to_vec(),
            has_media: question.has_media(),
            selected: session.visit_selection(),
            flagged: session.is_flagged(index),
            remaining_secs: session.remaining_secs(),
            remaining: format_countdown(session.remaining_secs()),
            can_go_previous: active && index > 0,
            next_label: if session.is_last_question() {
                NextLabel::Submit
            } else {
                NextLabel::Next
            },
            progress: SessionProgress::from_session(session),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
