use serde::Serialize;

use exam_core::model::Session;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    /// 1-based position of the current question.
    pub position: usize,
    pub total: usize,
    pub answered: usize,
    pub flagged: usize,
    /// Share of the test reached so far, rounded down.
    pub percent: u8,
}

impl SessionProgress {
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        let position = session.current_index() + 1;
        let total = session.question_count();
        let percent = u8::try_from(position * 100 / total.max(1)).unwrap_or(100);
        Self {
            position,
            total,
            answered: session.answers().len(),
            flagged: session.flags().len(),
            percent,
        }
    }

    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }
}
