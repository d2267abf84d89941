use std::fmt::{self, Write as _};

use exam_core::model::{EndReason, SessionStatus, TerminalEvent};
use services::{NextLabel, SessionCommand, SessionView};

/// A line of user input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Command(SessionCommand),
    Show,
    Help,
}

#[derive(Debug, PartialEq, Eq)]
pub enum InputError {
    Unknown(String),
    OptionZero,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Unknown(raw) => write!(f, "unknown command: {raw} (type ? for help)"),
            InputError::OptionZero => write!(f, "options are numbered from 1"),
        }
    }
}

impl std::error::Error for InputError {}

pub fn parse_input(line: &str) -> Result<Input, InputError> {
    let trimmed = line.trim();
    let command = match trimmed.to_ascii_lowercase().as_str() {
        "" | "v" | "view" => return Ok(Input::Show),
        "?" | "h" | "help" => return Ok(Input::Help),
        "n" | "next" => SessionCommand::Next,
        "p" | "prev" | "previous" => SessionCommand::Previous,
        "f" | "flag" => SessionCommand::ToggleFlag,
        "s" | "submit" => SessionCommand::Submit,
        "x" | "exit" => SessionCommand::RequestExit,
        "y" | "yes" => SessionCommand::ConfirmExit,
        "c" | "cancel" => SessionCommand::CancelExit,
        other => {
            let number: usize = other
                .parse()
                .map_err(|_| InputError::Unknown(trimmed.to_string()))?;
            let index = number.checked_sub(1).ok_or(InputError::OptionZero)?;
            SessionCommand::Select(index)
        }
    };
    Ok(Input::Command(command))
}

pub const HELP: &str = "\
commands:
  1..9      select an option
  n         next question (submits on the last one)
  p         previous question
  f         flag / unflag for review
  s         submit now
  x         exit the test (asks for confirmation)
  y / c     confirm / cancel exit
  v         show the current question
  ?         this help";

/// Render a full question screen.
#[must_use]
pub fn render_view(view: &SessionView) -> String {
    let mut out = String::new();
    if view.status == SessionStatus::ConfirmingExit {
        let _ = writeln!(out, "[{}] Exit test?", view.remaining);
        let _ = write!(
            out,
            "Your progress will be lost if you exit now. [y] exit  [c] cancel"
        );
        return out;
    }

    let flag = if view.flagged { "  [flagged]" } else { "" };
    let _ = writeln!(
        out,
        "[{}] Question {} of {} ({}%){flag}",
        view.remaining, view.progress.position, view.progress.total, view.progress.percent
    );
    let _ = writeln!(out, "{}", view.prompt);
    if view.has_media {
        let _ = writeln!(out, "  [diagram]");
    }
    for (index, label) in view.options.iter().enumerate() {
        let mark = if view.selected == Some(index) { "x" } else { " " };
        let _ = writeln!(out, "  {}) ({mark}) {label}", index + 1);
    }

    let previous = if view.can_go_previous { "[p] previous  " } else { "" };
    let next = match view.next_label {
        NextLabel::Next => "[n] next",
        NextLabel::Submit => "[n] submit",
    };
    let _ = write!(out, "{previous}{next}");
    out
}

/// Short countdown line for ticks that change nothing else.
#[must_use]
pub fn render_clock(view: &SessionView) -> Option<String> {
    let secs = view.remaining_secs;
    (secs % 60 == 0 || secs <= 10).then(|| format!("time left: {}", view.remaining))
}

/// Where the caller should go after the session ends.
#[must_use]
pub fn render_terminal(event: &TerminalEvent) -> String {
    let next = match event.status {
        SessionStatus::Aborted => "home",
        _ => "results",
    };
    let reason = match event.reason {
        EndReason::TimeExpired => "Time is up.",
        EndReason::UserSubmitted => "Test submitted.",
        EndReason::UserAborted => "Test abandoned.",
    };
    format!("{reason} Continue to {next}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{ExitTimerPolicy, Session, SessionSettings};
    use exam_core::time::fixed_clock;

    fn view(count: u32, duration: u32) -> (Session, SessionView) {
        let settings = SessionSettings::new(count, duration, ExitTimerPolicy::KeepRunning).unwrap();
        let session = Session::start(crate::bank::sample_questions().unwrap(), settings, fixed_clock());
        let view = SessionView::from_session(&session);
        (session, view)
    }

    #[test]
    fn parses_letters_and_numbers() {
        assert_eq!(parse_input("n").unwrap(), Input::Command(SessionCommand::Next));
        assert_eq!(parse_input(" P ").unwrap(), Input::Command(SessionCommand::Previous));
        assert_eq!(parse_input("2").unwrap(), Input::Command(SessionCommand::Select(1)));
        assert_eq!(parse_input("").unwrap(), Input::Show);
        assert_eq!(parse_input("?").unwrap(), Input::Help);
    }

    #[test]
    fn rejects_option_zero_and_garbage() {
        assert_eq!(parse_input("0").unwrap_err(), InputError::OptionZero);
        assert_eq!(
            parse_input("jump").unwrap_err(),
            InputError::Unknown("jump".to_string())
        );
    }

    #[test]
    fn renders_question_screen() {
        let (mut session, _) = view(30, 3600);
        session.select_answer(1).unwrap();
        session.toggle_flag().unwrap();
        let text = render_view(&SessionView::from_session(&session));

        assert!(text.starts_with("[60:00] Question 1 of 30 (3%)  [flagged]"));
        assert!(text.contains("  2) (x) The particle moves along a curved path"));
        assert!(text.contains("  1) ( ) The particle must be at rest"));
        assert!(text.ends_with("[n] next"));
    }

    #[test]
    fn renders_exit_confirmation() {
        let (mut session, _) = view(3, 90);
        session.request_exit().unwrap();
        let text = render_view(&SessionView::from_session(&session));
        assert!(text.starts_with("[01:30] Exit test?"));
    }

    #[test]
    fn clock_line_only_on_round_minutes_and_last_seconds() {
        let (_, mut view) = view(3, 90);
        view.remaining_secs = 61;
        assert_eq!(render_clock(&view), None);
        view.remaining_secs = 60;
        view.remaining = "01:00".to_string();
        assert_eq!(render_clock(&view).as_deref(), Some("time left: 01:00"));
    }

    #[test]
    fn abort_points_home() {
        let (mut session, _) = view(3, 90);
        session.request_exit().unwrap();
        let event = session.confirm_exit().unwrap();
        assert_eq!(render_terminal(&event), "Test abandoned. Continue to home.");
    }
}
