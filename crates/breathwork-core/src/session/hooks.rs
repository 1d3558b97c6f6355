//! Collaborator seams for the session runner.
//!
//! All hooks are optional. A runner without a notifier counts down silently,
//! and one without a recorder completes without persisting anything.

use serde::{Deserialize, Serialize};

use super::state::{SessionSnapshot, SessionSummary};
use crate::error::StorageError;

/// Alert pattern requested from the haptics/sound layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertTier {
    /// 30 and 15 seconds left.
    Early,
    /// Each of the last five seconds.
    Final,
}

impl AlertTier {
    /// Tier for a countdown value, if any.
    pub fn for_remaining(secs: u32) -> Option<Self> {
        match secs {
            30 | 15 => Some(AlertTier::Early),
            1..=5 => Some(AlertTier::Final),
            _ => None,
        }
    }
}

pub trait CountdownNotifier: Send {
    fn notify(&mut self, tier: AlertTier);
}

pub trait SessionRecorder: Send {
    fn record_session(&mut self, summary: &SessionSummary) -> Result<(), StorageError>;
}

pub trait SessionObserver: Send {
    fn on_state_change(&mut self, snapshot: &SessionSnapshot);
}
