use std::sync::{Arc, Mutex};
use std::time::Duration;

use exam_core::model::{
    EndReason, ExitTimerPolicy, Question, QuestionId, QuestionSet, SessionSettings, SessionStatus,
};
use exam_core::time::fixed_clock;
use services::{
    Countdown, CountdownConfig, CountdownStop, SessionController, SessionEvent, SessionRunner,
};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

fn bank() -> QuestionSet {
    let options = vec!["a".to_string(), "b".to_string()];
    QuestionSet::new(vec![
        Question::new(QuestionId::new(1), "Q1", options, false).unwrap(),
    ])
    .unwrap()
}

fn controller(duration: u32, policy: ExitTimerPolicy) -> SessionController {
    let settings = SessionSettings::new(3, duration, policy).unwrap();
    SessionController::with_settings(bank(), settings, fixed_clock())
}

fn remaining(runner: &SessionRunner) -> u32 {
    runner.view().unwrap().remaining_secs
}

#[tokio::test(start_paused = true)]
async fn countdown_expires_session_after_duration() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Mutex::new(
        controller(3, ExitTimerPolicy::KeepRunning).with_events(tx),
    ));
    let started = Instant::now();

    let handle = Countdown::spawn(Arc::clone(&shared), CountdownConfig::default());
    assert_eq!(handle.join().await, Some(CountdownStop::Expired));
    assert_eq!(started.elapsed(), Duration::from_secs(3));

    let controller = shared.lock().unwrap();
    assert_eq!(controller.status(), SessionStatus::Completed);
    assert_eq!(controller.session().remaining_secs(), 0);
    drop(controller);

    let mut ended = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let SessionEvent::Ended(terminal) = event {
            ended.push(terminal);
        }
    }
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].reason, EndReason::TimeExpired);
}

#[tokio::test(start_paused = true)]
async fn cancelled_countdown_delivers_no_more_ticks() {
    let shared = Arc::new(Mutex::new(controller(10, ExitTimerPolicy::KeepRunning)));
    let handle = Countdown::spawn(Arc::clone(&shared), CountdownConfig::default());

    sleep(Duration::from_millis(2_500)).await;
    handle.cancel();
    sleep(Duration::from_secs(20)).await;

    let controller = shared.lock().unwrap();
    assert_eq!(controller.session().remaining_secs(), 8);
    assert_eq!(controller.status(), SessionStatus::Active);
    drop(controller);
    assert_eq!(handle.join().await, None);
}

#[tokio::test(start_paused = true)]
async fn countdown_stops_when_session_ended_elsewhere() {
    let shared = Arc::new(Mutex::new(controller(10, ExitTimerPolicy::KeepRunning)));
    let handle = Countdown::spawn(Arc::clone(&shared), CountdownConfig::default());

    shared.lock().unwrap().submit().unwrap();
    assert_eq!(handle.join().await, Some(CountdownStop::SessionEnded));
    assert_eq!(shared.lock().unwrap().session().remaining_secs(), 10);
}

#[tokio::test(start_paused = true)]
async fn custom_period_controls_cadence() {
    let shared = Arc::new(Mutex::new(controller(4, ExitTimerPolicy::KeepRunning)));
    let started = Instant::now();
    let handle = Countdown::spawn(
        Arc::clone(&shared),
        CountdownConfig::new(Duration::from_millis(250)),
    );
    assert_eq!(handle.join().await, Some(CountdownStop::Expired));
    assert_eq!(started.elapsed(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn runner_cancels_countdown_on_submit() {
    let runner = SessionRunner::launch(
        controller(30, ExitTimerPolicy::KeepRunning),
        CountdownConfig::default(),
    );
    sleep(Duration::from_millis(1_500)).await;
    let event = runner.submit().unwrap();
    assert_eq!(event.reason, EndReason::UserSubmitted);
    assert_eq!(event.remaining_secs, 29);

    sleep(Duration::from_secs(5)).await;
    assert!(runner.countdown().is_finished());
    assert_eq!(remaining(&runner), 29);
}

#[tokio::test(start_paused = true)]
async fn dropping_runner_releases_the_countdown() {
    let runner = SessionRunner::launch(
        controller(30, ExitTimerPolicy::KeepRunning),
        CountdownConfig::default(),
    );
    let shared = runner.controller();
    sleep(Duration::from_millis(1_500)).await;
    drop(runner);

    sleep(Duration::from_secs(10)).await;
    let controller = shared.lock().unwrap();
    assert_eq!(controller.session().remaining_secs(), 29);
    assert_eq!(controller.status(), SessionStatus::Active);
}

#[tokio::test(start_paused = true)]
async fn time_keeps_running_during_exit_confirmation() {
    let runner = SessionRunner::launch(
        controller(2, ExitTimerPolicy::KeepRunning),
        CountdownConfig::default(),
    );
    runner.request_exit().unwrap();
    sleep(Duration::from_millis(3_500)).await;

    assert_eq!(runner.status().unwrap(), SessionStatus::ConfirmingExit);
    assert_eq!(remaining(&runner), 0);

    let transition = runner.cancel_exit().unwrap();
    let event = transition.terminal_event().unwrap();
    assert_eq!(event.reason, EndReason::TimeExpired);
    assert_eq!(runner.status().unwrap(), SessionStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn pause_policy_freezes_time_during_exit_confirmation() {
    let runner = SessionRunner::launch(
        controller(10, ExitTimerPolicy::Pause),
        CountdownConfig::default(),
    );
    sleep(Duration::from_millis(1_500)).await;
    runner.request_exit().unwrap();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(remaining(&runner), 9);

    runner.cancel_exit().unwrap();
    sleep(Duration::from_secs(2)).await;
    assert_eq!(remaining(&runner), 7);
}

#[tokio::test(start_paused = true)]
async fn confirm_exit_aborts_and_stops_ticking() {
    let runner = SessionRunner::launch(
        controller(10, ExitTimerPolicy::KeepRunning),
        CountdownConfig::default(),
    );
    runner.select_answer(1).unwrap();
    runner.request_exit().unwrap();
    let event = runner.confirm_exit().unwrap();
    assert_eq!(event.status, SessionStatus::Aborted);
    assert_eq!(event.reason, EndReason::UserAborted);

    sleep(Duration::from_secs(3)).await;
    assert!(runner.countdown().is_finished());
    assert_eq!(remaining(&runner), 10);
    assert!(runner.select_answer(0).is_err());
}
