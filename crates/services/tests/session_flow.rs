use std::collections::{BTreeMap, BTreeSet};

use exam_core::model::{
    EndReason, ExitTimerPolicy, Question, QuestionId, QuestionSet, SessionError, SessionSettings,
    SessionStatus, TerminalEvent,
};
use exam_core::time::{fixed_clock, fixed_now};
use services::{NextLabel, SessionCommand, SessionController, SessionEvent};
use tokio::sync::mpsc;

fn bank() -> QuestionSet {
    let questions = [
        ("Which statement about uniform velocity is correct?", 4, false),
        ("What is the SI unit of electric charge?", 4, false),
        ("What happens in a double displacement reaction?", 4, true),
    ]
    .into_iter()
    .zip(1..)
    .map(|((prompt, options, media), id)| {
        let labels = (1..=options).map(|n| format!("choice {n}")).collect();
        Question::new(QuestionId::new(id), prompt, labels, media).unwrap()
    })
    .collect();
    QuestionSet::new(questions).unwrap()
}

fn start(count: u32, duration: u32) -> (SessionController, mpsc::UnboundedReceiver<SessionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let settings = SessionSettings::new(count, duration, ExitTimerPolicy::KeepRunning).unwrap();
    let controller = SessionController::with_settings(bank(), settings, fixed_clock()).with_events(tx);
    (controller, rx)
}

fn terminal_events(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<TerminalEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let SessionEvent::Ended(terminal) = event {
            out.push(terminal);
        }
    }
    out
}

#[test]
fn answering_flagging_and_finishing_with_next() {
    let (mut controller, mut rx) = start(3, 5);

    controller.select_answer(2).unwrap();
    controller.go_next().unwrap();
    controller.toggle_flag().unwrap();
    controller.go_next().unwrap();
    assert_eq!(controller.view().next_label, NextLabel::Submit);
    controller.go_next().unwrap();

    let session = controller.session();
    assert_eq!(session.answers(), &BTreeMap::from([(0, 2)]));
    assert_eq!(session.flags(), &BTreeSet::from([1]));
    assert_eq!(session.status(), SessionStatus::Completed);

    let ended = terminal_events(&mut rx);
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].status, SessionStatus::Completed);
    assert_eq!(ended[0].reason, EndReason::UserSubmitted);
    assert_eq!(ended[0].session_id, session.id());
    assert_eq!(ended[0].ended_at, fixed_now());
}

#[test]
fn two_ticks_expire_a_two_second_session() {
    let (mut controller, mut rx) = start(3, 2);
    controller.tick().unwrap();
    assert_eq!(controller.view().remaining, "00:01");
    controller.tick().unwrap();

    assert_eq!(controller.status(), SessionStatus::Completed);
    assert_eq!(controller.session().remaining_secs(), 0);

    assert!(controller.tick().is_err());
    assert_eq!(controller.session().remaining_secs(), 0);

    let ended = terminal_events(&mut rx);
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].reason, EndReason::TimeExpired);
}

#[test]
fn exit_confirmation_aborts_without_inspecting_answers() {
    let (mut controller, mut rx) = start(3, 60);
    controller.select_answer(0).unwrap();
    controller.toggle_flag().unwrap();
    controller.request_exit().unwrap();
    let event = controller.confirm_exit().unwrap();

    assert_eq!(event.status, SessionStatus::Aborted);
    assert_eq!(event.reason, EndReason::UserAborted);
    assert_eq!(controller.session().answer_for(0), Some(0));
    assert!(controller.session().is_flagged(0));
    assert_eq!(terminal_events(&mut rx), vec![event]);
}

#[test]
fn selections_after_the_end_are_rejected() {
    let (mut controller, _rx) = start(3, 60);
    controller.submit().unwrap();

    let err = controller.select_answer(1).unwrap_err();
    assert!(matches!(err, SessionError::InvalidOperation { .. }));
    assert!(controller.session().answers().is_empty());
}

#[test]
fn answers_never_leave_the_question_range() {
    let (mut controller, _rx) = start(5, 600);
    let script = [
        SessionCommand::Select(3),
        SessionCommand::Next,
        SessionCommand::Select(9),
        SessionCommand::Select(1),
        SessionCommand::Previous,
        SessionCommand::Previous,
        SessionCommand::Next,
        SessionCommand::Next,
        SessionCommand::ToggleFlag,
        SessionCommand::Next,
        SessionCommand::Select(0),
        SessionCommand::RequestExit,
        SessionCommand::Select(2),
        SessionCommand::CancelExit,
        SessionCommand::Next,
        SessionCommand::Select(2),
    ];
    for command in script {
        let _ = controller.apply(command);
        let session = controller.session();
        assert!(session.current_index() < session.question_count());
        assert!(session.answers().keys().all(|index| *index < session.question_count()));
    }

    let session = controller.session();
    assert_eq!(session.current_index(), 4);
    assert_eq!(
        session.answers(),
        &BTreeMap::from([(0, 3), (1, 1), (3, 0), (4, 2)])
    );
    assert_eq!(session.flags(), &BTreeSet::from([2]));
}

#[test]
fn partial_submission_is_not_an_error() {
    let (mut controller, _rx) = start(30, 3600);
    controller.go_next().unwrap();
    let event = controller.submit().unwrap();
    assert_eq!(event.reason, EndReason::UserSubmitted);
    assert_eq!(event.remaining_secs, 3600);
    assert_eq!(controller.view().progress.answered, 0);
}

#[test]
fn every_accepted_operation_publishes_a_view() {
    let (mut controller, mut rx) = start(3, 60);
    controller.select_answer(1).unwrap();
    controller.go_next().unwrap();
    controller.tick().unwrap();

    let mut views = Vec::new();
    while let Ok(SessionEvent::Changed(view)) = rx.try_recv() {
        views.push(view);
    }
    assert_eq!(views.len(), 4);
    assert_eq!(views[1].selected, Some(1));
    assert_eq!(views[2].current_index, 1);
    assert_eq!(views[2].selected, None);
    assert_eq!(views[3].remaining, "00:59");
}
