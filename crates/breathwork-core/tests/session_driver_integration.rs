//! Integration tests for the async session driver.
//!
//! All tests run on a paused tokio clock, so timer deadlines are reached
//! instantly and elapsed times are exact.

use std::time::Duration;

use breathwork_core::{
    BreathingSpeed, Database, Round, Routine, SessionDriver, SessionError, SessionEvent,
    SessionOutcome, SessionPhase, SessionRunner,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

fn example_routine() -> Routine {
    Routine::custom(
        "example",
        "Example",
        vec![Round::new(2, BreathingSpeed::Fast, 1, 1)],
    )
}

fn kind(event: &SessionEvent) -> String {
    match event {
        SessionEvent::SessionStarted { .. } => "started".into(),
        SessionEvent::BreathAdvanced { breath_number, .. } => format!("breath:{breath_number}"),
        SessionEvent::PhaseEntered { phase, .. } => format!("enter:{phase:?}"),
        SessionEvent::HoldTick {
            time_remaining_secs,
            ..
        } => format!("tick:{time_remaining_secs}"),
        SessionEvent::CountdownAlert { tier, .. } => format!("alert:{tier:?}"),
        SessionEvent::SessionPaused { .. } => "paused".into(),
        SessionEvent::SessionResumed { .. } => "resumed".into(),
        SessionEvent::PhaseSkipped { from, to, .. } => format!("skip:{from:?}->{to:?}"),
        SessionEvent::SessionCompleted { .. } => "completed".into(),
        SessionEvent::SessionExited { .. } => "exited".into(),
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<String> {
    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(kind(&event));
    }
    kinds
}

#[tokio::test(start_paused = true)]
async fn test_example_routine_completes_after_ten_seconds() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (driver, _handle) = SessionDriver::new(SessionRunner::new());
    let started = Instant::now();

    let outcome = driver.with_event_sink(tx).run(example_routine()).await.unwrap();

    // 2 breaths x 4s + 1s exhale hold + 1s inhale hold
    assert_eq!(started.elapsed(), Duration::from_secs(10));
    match outcome {
        SessionOutcome::Completed(summary) => {
            assert_eq!(summary.routine_id, "example");
            assert_eq!(summary.duration_minutes, 0);
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(
        drain(&mut rx),
        vec![
            "started",
            "enter:Breathing",
            "breath:2",
            "enter:ExhaleHold",
            "tick:0",
            "enter:InhaleHold",
            "tick:0",
            "completed",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_pause_freezes_progress() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (driver, handle) = SessionDriver::new(SessionRunner::new());
    let started = Instant::now();
    let task = tokio::spawn(driver.with_event_sink(tx).run(example_routine()));

    tokio::time::sleep(Duration::from_secs(5)).await;
    handle.pause().await.unwrap();
    // Pausing again is harmless.
    handle.pause().await.unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;
    handle.resume().await.unwrap();

    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(outcome, SessionOutcome::Completed(_)));

    // Resumed at 65s: one more 4s breath interval, then two 1s holds.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(71), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(72), "elapsed {elapsed:?}");

    assert_eq!(
        drain(&mut rx),
        vec![
            "started",
            "enter:Breathing",
            "breath:2",
            "paused",
            "resumed",
            "enter:ExhaleHold",
            "tick:0",
            "enter:InhaleHold",
            "tick:0",
            "completed",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_resume_when_running_is_rejected() {
    let (driver, handle) = SessionDriver::new(SessionRunner::new());
    let task = tokio::spawn(driver.run(example_routine()));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.resume().await, Err(SessionError::NotPaused));

    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(outcome, SessionOutcome::Completed(_)));
}

#[tokio::test(start_paused = true)]
async fn test_skip_through_holds() {
    let (driver, handle) = SessionDriver::new(SessionRunner::new());
    let routine = Routine::custom(
        "long-holds",
        "Long holds",
        vec![Round::new(40, BreathingSpeed::Slow, 120, 30)],
    );
    let started = Instant::now();
    let task = tokio::spawn(driver.run(routine));

    tokio::task::yield_now().await;
    handle.skip().await.unwrap();
    handle.skip().await.unwrap();
    handle.skip().await.unwrap();

    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(outcome, SessionOutcome::Completed(_)));
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_exit_discards_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("breathwork.db");
    let runner = SessionRunner::new().with_recorder(Box::new(Database::open_at(&path).unwrap()));
    let (driver, handle) = SessionDriver::new(runner);
    let task = tokio::spawn(driver.run(example_routine()));

    tokio::time::sleep(Duration::from_secs(9)).await;
    handle.exit().await.unwrap();

    assert_eq!(task.await.unwrap().unwrap(), SessionOutcome::Exited);
    assert_eq!(handle.pause().await, Err(SessionError::DriverClosed));

    let db = Database::open_at(&path).unwrap();
    assert!(db.list_sessions(None).unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handles_exits_session() {
    let (driver, handle) = SessionDriver::new(SessionRunner::new());
    let task = tokio::spawn(driver.run(example_routine()));
    drop(handle);

    assert_eq!(task.await.unwrap().unwrap(), SessionOutcome::Exited);
}

#[tokio::test(start_paused = true)]
async fn test_completed_session_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("breathwork.db");
    let runner = SessionRunner::new().with_recorder(Box::new(Database::open_at(&path).unwrap()));
    let (driver, _handle) = SessionDriver::new(runner);

    let routine = Routine::custom(
        "two-rounds",
        "Two Rounds",
        vec![
            Round::new(15, BreathingSpeed::Fast, 20, 10),
            Round::new(15, BreathingSpeed::Fast, 20, 10),
        ],
    );
    let started = Instant::now();
    let outcome = driver.run(routine).await.unwrap();

    // (15 x 4 + 20 + 10) x 2 = 180s
    assert_eq!(started.elapsed(), Duration::from_secs(180));
    let SessionOutcome::Completed(summary) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(summary.duration_minutes, 3);

    let db = Database::open_at(&path).unwrap();
    let sessions = db.list_sessions(None).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].routine_id, "two-rounds");
    assert_eq!(sessions[0].duration_min, 3);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_routine_never_starts() {
    let (driver, _handle) = SessionDriver::new(SessionRunner::new());
    let empty = Routine::custom("empty", "Empty", vec![]);
    assert!(matches!(
        driver.run(empty).await,
        Err(SessionError::InvalidRoutine(_))
    ));
}

#[test]
fn test_phase_labels_for_display() {
    assert_eq!(SessionPhase::ExhaleHold.to_string(), "Hold (Empty Lungs)");
    assert_eq!(SessionPhase::Completed.to_string(), "Complete!");
}
