use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::routine::Routine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No session. Only ever reported in snapshots.
    Idle,
    Breathing,
    ExhaleHold,
    InhaleHold,
    Completed,
}

impl SessionPhase {
    pub fn is_hold(self) -> bool {
        matches!(self, SessionPhase::ExhaleHold | SessionPhase::InhaleHold)
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionPhase::Idle => "Ready",
            SessionPhase::Breathing => "Breathe",
            SessionPhase::ExhaleHold => "Hold (Empty Lungs)",
            SessionPhase::InhaleHold => "Hold (Full Lungs)",
            SessionPhase::Completed => "Complete!",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Mutable progress of a running session. Owned by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub round_index: usize,
    pub phase: SessionPhase,
    /// 1-based breath within the current round.
    pub breath_number: u32,
    /// Cadence seconds while breathing, countdown seconds during holds.
    pub time_remaining_secs: u32,
    pub is_paused: bool,
}

/// Read-only view handed to renderers on every state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub round_index: usize,
    pub round_count: usize,
    pub breath_number: u32,
    /// Target breaths for the current round.
    pub breath_count: u32,
    pub time_remaining_secs: u32,
    pub is_paused: bool,
}

impl SessionSnapshot {
    pub fn idle() -> Self {
        Self {
            phase: SessionPhase::Idle,
            round_index: 0,
            round_count: 0,
            breath_number: 0,
            breath_count: 0,
            time_remaining_secs: 0,
            is_paused: false,
        }
    }
}

/// Record of a completed session. Built once, never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub routine_id: String,
    pub routine_name: String,
    pub duration_minutes: u32,
    pub completed_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn for_routine(routine: &Routine, completed_at: DateTime<Utc>) -> Self {
        Self {
            routine_id: routine.id.clone(),
            routine_name: routine.name.clone(),
            duration_minutes: routine.estimated_duration_min(),
            completed_at,
        }
    }
}
