use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{AlertTier, SessionPhase, SessionSummary};

/// Every session state change produces an event.
/// Front ends render them; the driver forwards them to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    SessionStarted {
        routine_id: String,
        round_count: usize,
        at: DateTime<Utc>,
    },
    /// A breath-cadence fire moved to the next breath.
    BreathAdvanced {
        round_index: usize,
        breath_number: u32,
        at: DateTime<Utc>,
    },
    /// A new phase began (also emitted for the first breathing phase of each round).
    PhaseEntered {
        round_index: usize,
        phase: SessionPhase,
        time_remaining_secs: u32,
        at: DateTime<Utc>,
    },
    /// One countdown second elapsed during a hold.
    HoldTick {
        round_index: usize,
        phase: SessionPhase,
        time_remaining_secs: u32,
        at: DateTime<Utc>,
    },
    CountdownAlert {
        tier: AlertTier,
        time_remaining_secs: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        round_index: usize,
        phase: SessionPhase,
        at: DateTime<Utc>,
    },
    SessionResumed {
        round_index: usize,
        phase: SessionPhase,
        at: DateTime<Utc>,
    },
    PhaseSkipped {
        round_index: usize,
        from: SessionPhase,
        to: SessionPhase,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        summary: SessionSummary,
        /// False when the recorder failed; the session still counts as completed.
        recorded: bool,
    },
    /// The user left before completion. Nothing is recorded.
    SessionExited {
        round_index: usize,
        phase: SessionPhase,
        at: DateTime<Utc>,
    },
}
