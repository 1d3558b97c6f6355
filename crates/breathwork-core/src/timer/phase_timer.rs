//! Single-slot phase timer.
//!
//! The timer does not own a thread or a runtime handle. It records which
//! timer is armed (mode, period, generation) and hands out a [`TimerToken`]
//! per arming. Whoever schedules the real deadline (see
//! [`crate::session::SessionDriver`]) reports fires back with that token, and
//! the fire handler checks [`PhaseTimer::accepts`] before touching state.
//!
//! ## Invariants
//!
//! - At most one timer is armed. [`PhaseTimer::arm`] cancels the previous one.
//! - Cancelling is idempotent.
//! - A token from a cancelled or replaced arming is never accepted again.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Period of the hold countdown.
pub const COUNTDOWN_PERIOD: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// Fires once per breath during the breathing phase.
    BreathCadence,
    /// Fires once per second during a hold.
    Countdown,
}

/// Generation token identifying one arming of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn generation(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    pub token: TimerToken,
    pub mode: TimerMode,
    /// Repeat interval; the timer keeps firing until cancelled or re-armed.
    pub period: Duration,
}

#[derive(Debug, Default)]
pub struct PhaseTimer {
    generation: u64,
    armed: Option<ArmedTimer>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a repeating timer, replacing whatever was armed before.
    pub fn arm(&mut self, mode: TimerMode, period: Duration) -> TimerToken {
        self.cancel();
        self.generation = self.generation.wrapping_add(1);
        let token = TimerToken(self.generation);
        self.armed = Some(ArmedTimer {
            token,
            mode,
            period,
        });
        token
    }

    pub fn arm_breath_cadence(&mut self, period: Duration) -> TimerToken {
        self.arm(TimerMode::BreathCadence, period)
    }

    pub fn arm_countdown(&mut self) -> TimerToken {
        self.arm(TimerMode::Countdown, COUNTDOWN_PERIOD)
    }

    /// Cancel the armed timer. Returns whether anything was armed.
    pub fn cancel(&mut self) -> bool {
        self.armed.take().is_some()
    }

    /// Generation guard: true only for the currently armed token.
    pub fn accepts(&self, token: TimerToken) -> bool {
        self.armed.map(|t| t.token == token).unwrap_or(false)
    }

    pub fn armed(&self) -> Option<ArmedTimer> {
        self.armed
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}
