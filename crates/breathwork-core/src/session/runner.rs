//! Session runner.
//!
//! The runner is a timer-driven state machine over one [`Routine`]. It does
//! not sleep or spawn anything. It arms its [`PhaseTimer`] and expects the
//! caller (normally [`super::SessionDriver`]) to call
//! [`SessionRunner::on_timer_fired`] with the armed token when the period
//! elapses.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Breathing -> ExhaleHold -> InhaleHold -> (Breathing of next round | Completed)
//! ```
//!
//! `pause()`/`resume()` keep the phase and only disarm/re-arm the timer.
//! `skip()` runs the same transition a natural fire would. `exit()` returns
//! to Idle from anywhere without recording anything.
//!
//! ## Usage
//!
//! ```ignore
//! let mut runner = SessionRunner::new().with_recorder(Box::new(db));
//! runner.start(routine)?;
//! // when the armed period elapses:
//! let token = runner.armed_timer().unwrap().token;
//! runner.on_timer_fired(token);
//! ```

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, trace, warn};

use super::hooks::{AlertTier, CountdownNotifier, SessionObserver, SessionRecorder};
use super::state::{SessionPhase, SessionSnapshot, SessionState, SessionSummary};
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::routine::{Round, Routine};
use crate::timer::{ArmedTimer, PhaseTimer, TimerToken};

#[derive(Debug)]
struct ActiveSession {
    routine: Routine,
    state: SessionState,
}

impl ActiveSession {
    fn current_round(&self) -> Round {
        self.routine.rounds[self.state.round_index]
    }
}

#[derive(Default)]
pub struct SessionRunner {
    active: Option<ActiveSession>,
    timer: PhaseTimer,
    notifier: Option<Box<dyn CountdownNotifier>>,
    recorder: Option<Box<dyn SessionRecorder>>,
    observer: Option<Box<dyn SessionObserver>>,
}

impl std::fmt::Debug for SessionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRunner")
            .field("active", &self.active)
            .field("timer", &self.timer)
            .field("has_notifier", &self.notifier.is_some())
            .field("has_recorder", &self.recorder.is_some())
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

impl SessionRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notifier(mut self, notifier: Box<dyn CountdownNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_recorder(mut self, recorder: Box<dyn SessionRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.active
            .as_ref()
            .map(|a| a.state.phase)
            .unwrap_or(SessionPhase::Idle)
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.active.as_ref().map(|a| &a.state)
    }

    pub fn routine(&self) -> Option<&Routine> {
        self.active.as_ref().map(|a| &a.routine)
    }

    /// True between `start()` and completion/exit.
    pub fn is_running(&self) -> bool {
        !matches!(self.phase(), SessionPhase::Idle | SessionPhase::Completed)
    }

    pub fn armed_timer(&self) -> Option<ArmedTimer> {
        self.timer.armed()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        match &self.active {
            None => SessionSnapshot::idle(),
            Some(active) => SessionSnapshot {
                phase: active.state.phase,
                round_index: active.state.round_index,
                round_count: active.routine.rounds.len(),
                breath_number: active.state.breath_number,
                breath_count: active.current_round().breath_count,
                time_remaining_secs: active.state.time_remaining_secs,
                is_paused: active.state.is_paused,
            },
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session. Rejects invalid routines and double starts.
    ///
    /// A completed session may be replaced by a new one.
    pub fn start(&mut self, routine: Routine) -> Result<Vec<SessionEvent>, SessionError> {
        if self.is_running() {
            return Err(SessionError::AlreadyActive);
        }
        routine.validate()?;

        let first = routine.rounds[0];
        let at = Utc::now();
        let events = vec![
            SessionEvent::SessionStarted {
                routine_id: routine.id.clone(),
                round_count: routine.rounds.len(),
                at,
            },
            SessionEvent::PhaseEntered {
                round_index: 0,
                phase: SessionPhase::Breathing,
                time_remaining_secs: first.breath_speed.breath_duration_secs(),
                at,
            },
        ];
        info!(
            "Starting session '{}' ({} rounds)",
            routine.id,
            routine.rounds.len()
        );

        self.active = Some(ActiveSession {
            routine,
            state: SessionState {
                round_index: 0,
                phase: SessionPhase::Breathing,
                breath_number: 1,
                time_remaining_secs: first.breath_speed.breath_duration_secs(),
                is_paused: false,
            },
        });
        self.arm_for_current_phase();
        self.publish();
        Ok(events)
    }

    /// Timer fire handler. Stale or unexpected fires are ignored.
    pub fn on_timer_fired(&mut self, token: TimerToken) -> Vec<SessionEvent> {
        if !self.timer.accepts(token) {
            trace!("Ignoring stale timer fire (generation {})", token.generation());
            return Vec::new();
        }
        let Some(active) = self.active.as_mut() else {
            self.timer.cancel();
            return Vec::new();
        };
        if active.state.is_paused {
            trace!("Ignoring timer fire while paused");
            return Vec::new();
        }

        let mut events = Vec::new();
        let at = Utc::now();
        let round_index = active.state.round_index;
        match active.state.phase {
            SessionPhase::Breathing => {
                let round = active.current_round();
                if active.state.breath_number < round.breath_count {
                    active.state.breath_number += 1;
                    active.state.time_remaining_secs = round.breath_speed.breath_duration_secs();
                    events.push(SessionEvent::BreathAdvanced {
                        round_index,
                        breath_number: active.state.breath_number,
                        at,
                    });
                } else {
                    self.advance(&mut events);
                }
            }
            phase @ (SessionPhase::ExhaleHold | SessionPhase::InhaleHold) => {
                let remaining = active.state.time_remaining_secs.saturating_sub(1);
                active.state.time_remaining_secs = remaining;
                events.push(SessionEvent::HoldTick {
                    round_index,
                    phase,
                    time_remaining_secs: remaining,
                    at,
                });
                if let Some(tier) = AlertTier::for_remaining(remaining) {
                    if let Some(notifier) = self.notifier.as_mut() {
                        notifier.notify(tier);
                    }
                    events.push(SessionEvent::CountdownAlert {
                        tier,
                        time_remaining_secs: remaining,
                        at,
                    });
                }
                if remaining == 0 {
                    self.advance(&mut events);
                }
            }
            SessionPhase::Idle | SessionPhase::Completed => {
                self.timer.cancel();
                return Vec::new();
            }
        }

        self.publish();
        events
    }

    /// Force the transition the running timer would eventually cause.
    ///
    /// While paused the new phase starts paused as well.
    pub fn skip(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        let active = self.running_mut()?;
        let from = active.state.phase;
        let round_index = active.state.round_index;

        self.timer.cancel();
        let mut events = Vec::new();
        self.advance(&mut events);
        events.insert(
            0,
            SessionEvent::PhaseSkipped {
                round_index,
                from,
                to: self.phase(),
                at: Utc::now(),
            },
        );
        debug!("Skipped {:?} in round {}", from, round_index);

        self.publish();
        Ok(events)
    }

    /// Pausing twice is a no-op.
    pub fn pause(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        let active = self.running_mut()?;
        if active.state.is_paused {
            return Ok(Vec::new());
        }
        active.state.is_paused = true;
        let event = SessionEvent::SessionPaused {
            round_index: active.state.round_index,
            phase: active.state.phase,
            at: Utc::now(),
        };

        self.timer.cancel();
        self.publish();
        Ok(vec![event])
    }

    /// Re-arm the current phase. Breathing restarts at the current breath;
    /// holds continue from the seconds left.
    pub fn resume(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        let active = self.running_mut()?;
        if !active.state.is_paused {
            return Err(SessionError::NotPaused);
        }
        active.state.is_paused = false;
        if active.state.phase == SessionPhase::Breathing {
            active.state.time_remaining_secs =
                active.current_round().breath_speed.breath_duration_secs();
        }
        let event = SessionEvent::SessionResumed {
            round_index: active.state.round_index,
            phase: active.state.phase,
            at: Utc::now(),
        };

        self.arm_for_current_phase();
        self.publish();
        Ok(vec![event])
    }

    /// Abandon the session. Never fails; exiting while idle does nothing.
    pub fn exit(&mut self) -> Vec<SessionEvent> {
        self.timer.cancel();
        let Some(active) = self.active.take() else {
            return Vec::new();
        };

        let mut events = Vec::new();
        if active.state.phase != SessionPhase::Completed {
            info!(
                "Exited session '{}' in round {}",
                active.routine.id, active.state.round_index
            );
            events.push(SessionEvent::SessionExited {
                round_index: active.state.round_index,
                phase: active.state.phase,
                at: Utc::now(),
            });
        }
        self.publish();
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn running_mut(&mut self) -> Result<&mut ActiveSession, SessionError> {
        match self.active.as_mut() {
            None => Err(SessionError::NoActiveSession),
            Some(active) if active.state.phase == SessionPhase::Completed => {
                Err(SessionError::SessionFinished)
            }
            Some(active) => Ok(active),
        }
    }

    /// Move to the phase that follows the current one.
    fn advance(&mut self, events: &mut Vec<SessionEvent>) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let round = active.current_round();
        match active.state.phase {
            SessionPhase::Breathing => {
                active.state.phase = SessionPhase::ExhaleHold;
                active.state.time_remaining_secs = round.exhale_hold_secs;
            }
            SessionPhase::ExhaleHold => {
                active.state.phase = SessionPhase::InhaleHold;
                active.state.time_remaining_secs = round.inhale_hold_secs;
            }
            SessionPhase::InhaleHold => {
                let next_index = active.state.round_index + 1;
                match active.routine.rounds.get(next_index).copied() {
                    Some(next) => {
                        active.state.round_index = next_index;
                        active.state.phase = SessionPhase::Breathing;
                        active.state.breath_number = 1;
                        active.state.time_remaining_secs = next.breath_speed.breath_duration_secs();
                    }
                    None => {
                        self.complete(events);
                        return;
                    }
                }
            }
            SessionPhase::Idle | SessionPhase::Completed => return,
        }

        debug!(
            "Entered {:?} (round {}, {}s)",
            active.state.phase, active.state.round_index, active.state.time_remaining_secs
        );
        events.push(SessionEvent::PhaseEntered {
            round_index: active.state.round_index,
            phase: active.state.phase,
            time_remaining_secs: active.state.time_remaining_secs,
            at: Utc::now(),
        });
        self.arm_for_current_phase();
    }

    fn complete(&mut self, events: &mut Vec<SessionEvent>) {
        self.timer.cancel();
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.state.phase = SessionPhase::Completed;
        active.state.time_remaining_secs = 0;
        active.state.is_paused = false;

        let summary = SessionSummary::for_routine(&active.routine, Utc::now());
        let recorded = match self.recorder.as_mut() {
            Some(recorder) => match recorder.record_session(&summary) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to record session '{}': {}", summary.routine_id, e);
                    false
                }
            },
            None => false,
        };
        info!(
            "Completed session '{}' (~{} min)",
            summary.routine_id, summary.duration_minutes
        );
        events.push(SessionEvent::SessionCompleted { summary, recorded });
    }

    /// Arm the timer matching the current phase, or disarm when none applies.
    fn arm_for_current_phase(&mut self) {
        let Some(active) = self.active.as_ref() else {
            self.timer.cancel();
            return;
        };
        if active.state.is_paused {
            self.timer.cancel();
            return;
        }
        match active.state.phase {
            SessionPhase::Breathing => {
                let cadence = active.current_round().breath_speed.breath_duration_ms();
                self.timer.arm_breath_cadence(Duration::from_millis(cadence));
            }
            SessionPhase::ExhaleHold | SessionPhase::InhaleHold => {
                self.timer.arm_countdown();
            }
            SessionPhase::Idle | SessionPhase::Completed => {
                self.timer.cancel();
            }
        }
    }

    fn publish(&mut self) {
        if self.observer.is_none() {
            return;
        }
        let snapshot = self.snapshot();
        if let Some(observer) = self.observer.as_mut() {
            observer.on_state_change(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::routine::BreathingSpeed;
    use crate::timer::TimerMode;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorded(Arc<Mutex<Vec<SessionSummary>>>);

    impl SessionRecorder for Recorded {
        fn record_session(&mut self, summary: &SessionSummary) -> Result<(), StorageError> {
            self.0.lock().unwrap().push(summary.clone());
            Ok(())
        }
    }

    struct FailingRecorder;

    impl SessionRecorder for FailingRecorder {
        fn record_session(&mut self, _summary: &SessionSummary) -> Result<(), StorageError> {
            Err(StorageError::NotFound("disk".into()))
        }
    }

    #[derive(Clone, Default)]
    struct Alerts(Arc<Mutex<Vec<AlertTier>>>);

    impl CountdownNotifier for Alerts {
        fn notify(&mut self, tier: AlertTier) {
            self.0.lock().unwrap().push(tier);
        }
    }

    #[derive(Clone, Default)]
    struct Snapshots(Arc<Mutex<Vec<SessionSnapshot>>>);

    impl SessionObserver for Snapshots {
        fn on_state_change(&mut self, snapshot: &SessionSnapshot) {
            self.0.lock().unwrap().push(snapshot.clone());
        }
    }

    fn routine(rounds: Vec<Round>) -> Routine {
        Routine::custom("test", "Test Routine", rounds)
    }

    fn example_routine() -> Routine {
        routine(vec![Round::new(2, BreathingSpeed::Fast, 1, 1)])
    }

    fn fire(runner: &mut SessionRunner) -> Vec<SessionEvent> {
        let token = runner.armed_timer().expect("a timer should be armed").token;
        runner.on_timer_fired(token)
    }

    fn view(runner: &SessionRunner) -> (SessionPhase, usize, u32, u32) {
        let s = runner.snapshot();
        (s.phase, s.round_index, s.breath_number, s.time_remaining_secs)
    }

    #[test]
    fn start_enters_first_breath() {
        let mut runner = SessionRunner::new();
        assert_eq!(runner.phase(), SessionPhase::Idle);
        assert!(runner.armed_timer().is_none());

        let events = runner.start(example_routine()).unwrap();
        assert!(matches!(events[0], SessionEvent::SessionStarted { round_count: 1, .. }));
        assert_eq!(view(&runner), (SessionPhase::Breathing, 0, 1, 4));

        let armed = runner.armed_timer().unwrap();
        assert_eq!(armed.mode, TimerMode::BreathCadence);
        assert_eq!(armed.period, Duration::from_millis(4000));
    }

    #[test]
    fn start_rejects_empty_routine() {
        let mut runner = SessionRunner::new();
        let err = runner.start(routine(vec![])).unwrap_err();
        assert!(matches!(err, SessionError::InvalidRoutine(_)));
        assert_eq!(runner.phase(), SessionPhase::Idle);
        assert!(runner.armed_timer().is_none());
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut runner = SessionRunner::new();
        runner.start(example_routine()).unwrap();
        assert_eq!(
            runner.start(example_routine()).unwrap_err(),
            SessionError::AlreadyActive
        );
    }

    #[test]
    fn example_scenario_sequence() {
        let recorded = Recorded::default();
        let mut runner = SessionRunner::new().with_recorder(Box::new(recorded.clone()));
        runner.start(example_routine()).unwrap();

        let mut seen = vec![view(&runner)];
        while runner.armed_timer().is_some() {
            fire(&mut runner);
            seen.push(view(&runner));
        }

        assert_eq!(
            seen,
            vec![
                (SessionPhase::Breathing, 0, 1, 4),
                (SessionPhase::Breathing, 0, 2, 4),
                (SessionPhase::ExhaleHold, 0, 2, 1),
                (SessionPhase::InhaleHold, 0, 2, 1),
                (SessionPhase::Completed, 0, 2, 0),
            ]
        );

        let summaries = recorded.0.lock().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].duration_minutes, 0);
        assert_eq!(summaries[0].routine_id, "test");
    }

    #[test]
    fn hold_countdown_reaches_zero_before_transition() {
        let mut runner = SessionRunner::new();
        runner.start(example_routine()).unwrap();
        fire(&mut runner);
        fire(&mut runner);
        assert_eq!(runner.phase(), SessionPhase::ExhaleHold);

        let events = fire(&mut runner);
        assert!(matches!(
            events[0],
            SessionEvent::HoldTick {
                phase: SessionPhase::ExhaleHold,
                time_remaining_secs: 0,
                ..
            }
        ));
        assert!(matches!(
            events[1],
            SessionEvent::PhaseEntered {
                phase: SessionPhase::InhaleHold,
                time_remaining_secs: 1,
                ..
            }
        ));
    }

    #[test]
    fn zero_second_hold_takes_exactly_one_tick() {
        let mut runner = SessionRunner::new();
        runner
            .start(routine(vec![Round::new(1, BreathingSpeed::Fast, 0, 3)]))
            .unwrap();
        fire(&mut runner);
        assert_eq!(view(&runner), (SessionPhase::ExhaleHold, 0, 1, 0));
        assert_eq!(runner.armed_timer().unwrap().mode, TimerMode::Countdown);

        fire(&mut runner);
        assert_eq!(view(&runner), (SessionPhase::InhaleHold, 0, 1, 3));
    }

    #[test]
    fn multi_round_routine_advances_rounds() {
        let mut runner = SessionRunner::new();
        runner
            .start(routine(vec![
                Round::new(1, BreathingSpeed::Fast, 0, 0),
                Round::new(3, BreathingSpeed::Slow, 0, 0),
            ]))
            .unwrap();
        fire(&mut runner); // -> exhale hold
        fire(&mut runner); // -> inhale hold
        fire(&mut runner); // -> round 2
        assert_eq!(view(&runner), (SessionPhase::Breathing, 1, 1, 8));
        assert_eq!(
            runner.armed_timer().unwrap().period,
            Duration::from_millis(8000)
        );
    }

    #[test]
    fn skip_during_breathing_goes_to_exhale_hold_of_same_round() {
        let mut runner = SessionRunner::new();
        runner
            .start(routine(vec![
                Round::new(30, BreathingSpeed::Fast, 45, 15),
                Round::new(30, BreathingSpeed::Fast, 60, 15),
            ]))
            .unwrap();
        let events = runner.skip().unwrap();
        assert!(matches!(
            events[0],
            SessionEvent::PhaseSkipped {
                from: SessionPhase::Breathing,
                to: SessionPhase::ExhaleHold,
                ..
            }
        ));
        assert_eq!(view(&runner), (SessionPhase::ExhaleHold, 0, 1, 45));
    }

    #[test]
    fn skip_exhale_hold_matches_natural_expiry() {
        let rounds = vec![Round::new(1, BreathingSpeed::Medium, 2, 7)];

        let mut natural = SessionRunner::new();
        natural.start(routine(rounds.clone())).unwrap();
        fire(&mut natural);
        fire(&mut natural);
        fire(&mut natural);

        let mut skipped = SessionRunner::new();
        skipped.start(routine(rounds)).unwrap();
        fire(&mut skipped);
        skipped.skip().unwrap();

        assert_eq!(natural.snapshot(), skipped.snapshot());
        assert_eq!(skipped.phase(), SessionPhase::InhaleHold);
        assert_eq!(
            natural.armed_timer().map(|t| (t.mode, t.period)),
            skipped.armed_timer().map(|t| (t.mode, t.period))
        );
    }

    #[test]
    fn skip_does_not_fire_alerts() {
        let alerts = Alerts::default();
        let mut runner = SessionRunner::new().with_notifier(Box::new(alerts.clone()));
        runner
            .start(routine(vec![Round::new(1, BreathingSpeed::Fast, 3, 3)]))
            .unwrap();
        runner.skip().unwrap();
        runner.skip().unwrap();
        assert!(alerts.0.lock().unwrap().is_empty());
    }

    #[test]
    fn skip_final_inhale_hold_completes() {
        let recorded = Recorded::default();
        let mut runner = SessionRunner::new().with_recorder(Box::new(recorded.clone()));
        runner.start(example_routine()).unwrap();
        runner.skip().unwrap();
        runner.skip().unwrap();
        let events = runner.skip().unwrap();

        assert_eq!(runner.phase(), SessionPhase::Completed);
        assert!(runner.armed_timer().is_none());
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::SessionCompleted { recorded: true, .. })));
        assert_eq!(recorded.0.lock().unwrap().len(), 1);
        assert_eq!(runner.skip().unwrap_err(), SessionError::SessionFinished);
    }

    #[test]
    fn commands_while_idle_fail_fast() {
        let mut runner = SessionRunner::new();
        assert_eq!(runner.skip().unwrap_err(), SessionError::NoActiveSession);
        assert_eq!(runner.pause().unwrap_err(), SessionError::NoActiveSession);
        assert_eq!(runner.resume().unwrap_err(), SessionError::NoActiveSession);
        assert!(runner.exit().is_empty());
    }

    #[test]
    fn pause_twice_is_idempotent() {
        let mut runner = SessionRunner::new();
        runner.start(example_routine()).unwrap();
        assert_eq!(runner.pause().unwrap().len(), 1);
        assert!(runner.pause().unwrap().is_empty());
        assert!(runner.state().unwrap().is_paused);
        assert!(runner.armed_timer().is_none());
    }

    #[test]
    fn resume_without_pause_is_rejected() {
        let mut runner = SessionRunner::new();
        runner.start(example_routine()).unwrap();
        assert_eq!(runner.resume().unwrap_err(), SessionError::NotPaused);
        assert!(!runner.state().unwrap().is_paused);
        assert!(runner.armed_timer().is_some());
    }

    #[test]
    fn stale_fire_after_pause_is_ignored() {
        let mut runner = SessionRunner::new();
        runner.start(example_routine()).unwrap();
        let stale = runner.armed_timer().unwrap().token;
        runner.pause().unwrap();

        assert!(runner.on_timer_fired(stale).is_empty());
        assert_eq!(view(&runner), (SessionPhase::Breathing, 0, 1, 4));

        runner.resume().unwrap();
        assert!(runner.on_timer_fired(stale).is_empty());
        assert_eq!(runner.state().unwrap().breath_number, 1);
    }

    #[test]
    fn resume_continues_hold_from_remaining_seconds() {
        let mut runner = SessionRunner::new();
        runner
            .start(routine(vec![Round::new(1, BreathingSpeed::Fast, 10, 5)]))
            .unwrap();
        fire(&mut runner);
        fire(&mut runner);
        fire(&mut runner);
        assert_eq!(view(&runner), (SessionPhase::ExhaleHold, 0, 1, 8));

        runner.pause().unwrap();
        runner.resume().unwrap();
        assert_eq!(view(&runner), (SessionPhase::ExhaleHold, 0, 1, 8));
        assert_eq!(runner.armed_timer().unwrap().mode, TimerMode::Countdown);
    }

    #[test]
    fn resume_breathing_restarts_from_current_breath() {
        let mut runner = SessionRunner::new();
        runner
            .start(routine(vec![Round::new(5, BreathingSpeed::Medium, 10, 5)]))
            .unwrap();
        fire(&mut runner);
        fire(&mut runner);
        runner.pause().unwrap();
        runner.resume().unwrap();
        assert_eq!(view(&runner), (SessionPhase::Breathing, 0, 3, 6));

        fire(&mut runner);
        assert_eq!(runner.state().unwrap().breath_number, 4);
    }

    #[test]
    fn skip_while_paused_stays_paused() {
        let mut runner = SessionRunner::new();
        runner.start(example_routine()).unwrap();
        runner.pause().unwrap();
        runner.skip().unwrap();

        assert_eq!(runner.phase(), SessionPhase::ExhaleHold);
        assert!(runner.state().unwrap().is_paused);
        assert!(runner.armed_timer().is_none());

        runner.resume().unwrap();
        assert_eq!(runner.armed_timer().unwrap().mode, TimerMode::Countdown);
    }

    #[test]
    fn exit_discards_session_without_recording() {
        let recorded = Recorded::default();
        let mut runner = SessionRunner::new().with_recorder(Box::new(recorded.clone()));
        runner.start(example_routine()).unwrap();
        fire(&mut runner);
        let stale = runner.armed_timer().unwrap().token;

        let events = runner.exit();
        assert!(matches!(events[0], SessionEvent::SessionExited { .. }));
        assert_eq!(runner.phase(), SessionPhase::Idle);
        assert!(runner.armed_timer().is_none());
        assert!(runner.on_timer_fired(stale).is_empty());
        assert!(recorded.0.lock().unwrap().is_empty());

        // A fresh session can start afterwards.
        runner.start(example_routine()).unwrap();
        assert_eq!(view(&runner), (SessionPhase::Breathing, 0, 1, 4));
    }

    #[test]
    fn recorder_failure_still_completes() {
        let mut runner = SessionRunner::new().with_recorder(Box::new(FailingRecorder));
        runner.start(example_routine()).unwrap();
        let mut events = Vec::new();
        while runner.armed_timer().is_some() {
            events.extend(fire(&mut runner));
        }
        assert_eq!(runner.phase(), SessionPhase::Completed);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::SessionCompleted { recorded: false, .. })));
    }

    #[test]
    fn countdown_alert_thresholds() {
        let alerts = Alerts::default();
        let mut runner = SessionRunner::new().with_notifier(Box::new(alerts.clone()));
        runner
            .start(routine(vec![Round::new(1, BreathingSpeed::Fast, 32, 0)]))
            .unwrap();
        fire(&mut runner);
        while runner.phase() == SessionPhase::ExhaleHold {
            fire(&mut runner);
        }

        let tiers = alerts.0.lock().unwrap().clone();
        use AlertTier::{Early, Final};
        assert_eq!(tiers, vec![Early, Early, Final, Final, Final, Final, Final]);
    }

    #[test]
    fn observer_sees_every_state_change() {
        let snapshots = Snapshots::default();
        let mut runner = SessionRunner::new().with_observer(Box::new(snapshots.clone()));
        runner.start(example_routine()).unwrap();
        runner.pause().unwrap();
        runner.resume().unwrap();
        runner.exit();

        let seen = snapshots.0.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert!(seen[1].is_paused);
        assert!(!seen[2].is_paused);
        assert_eq!(seen[3].phase, SessionPhase::Idle);
    }

    #[test]
    fn final_hold_flag_has_no_runtime_effect() {
        let mut runner = SessionRunner::new();
        runner
            .start(routine(vec![Round::new(1, BreathingSpeed::Fast, 2, 1).with_final_hold()]))
            .unwrap();
        fire(&mut runner);
        assert_eq!(view(&runner), (SessionPhase::ExhaleHold, 0, 1, 2));
    }

    proptest! {
        #[test]
        fn breathing_fires_exactly_breath_count_times(breaths in 1u32..120) {
            let mut runner = SessionRunner::new();
            runner.start(routine(vec![Round::new(breaths, BreathingSpeed::Fast, 5, 5)])).unwrap();

            let mut fires = 0;
            let mut max_breath = 1;
            while runner.phase() == SessionPhase::Breathing {
                fire(&mut runner);
                fires += 1;
                max_breath = max_breath.max(runner.state().unwrap().breath_number);
            }
            prop_assert_eq!(fires, breaths);
            prop_assert_eq!(max_breath, breaths);
            prop_assert_eq!(runner.phase(), SessionPhase::ExhaleHold);
        }

        #[test]
        fn every_round_enters_both_holds(round_count in 1usize..6, hold in 0u32..4) {
            let rounds = vec![Round::new(2, BreathingSpeed::Slow, hold, hold); round_count];
            let mut runner = SessionRunner::new();
            runner.start(routine(rounds)).unwrap();

            let mut holds_entered = 0;
            let mut completed_events = 0;
            while runner.armed_timer().is_some() {
                prop_assert_ne!(runner.phase(), SessionPhase::Completed);
                for event in fire(&mut runner) {
                    match event {
                        SessionEvent::PhaseEntered { phase, .. } if phase.is_hold() => {
                            holds_entered += 1
                        }
                        SessionEvent::SessionCompleted { .. } => {
                            prop_assert_eq!(holds_entered, 2 * round_count);
                            completed_events += 1;
                        }
                        _ => {}
                    }
                }
            }
            prop_assert_eq!(holds_entered, 2 * round_count);
            prop_assert_eq!(completed_events, 1);
            prop_assert_eq!(runner.phase(), SessionPhase::Completed);
        }
    }
}
