//! Practice statistics over recorded sessions.
//!
//! Streaks count calendar days (UTC) with at least one completed session.
//! The current streak survives until the end of the day after the last
//! session, so a streak is not broken just because today's session has not
//! happened yet.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::SessionRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PracticeStats {
    pub total_sessions: u64,
    pub total_minutes: u64,
    pub average_session_minutes: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_session_at: Option<DateTime<Utc>>,
}

impl PracticeStats {
    pub fn from_sessions(sessions: &[SessionRecord], today: NaiveDate) -> Self {
        let total_sessions = sessions.len() as u64;
        let total_minutes: u64 = sessions.iter().map(|s| u64::from(s.duration_min)).sum();
        let average_session_minutes = if total_sessions > 0 {
            total_minutes as f64 / total_sessions as f64
        } else {
            0.0
        };

        let days: BTreeSet<NaiveDate> = sessions
            .iter()
            .map(|s| s.completed_at.date_naive())
            .collect();

        Self {
            total_sessions,
            total_minutes,
            average_session_minutes,
            current_streak: current_streak(&days, today),
            longest_streak: longest_streak(&days),
            last_session_at: sessions.iter().map(|s| s.completed_at).max(),
        }
    }
}

/// Day boundaries are UTC midnight, not local midnight, and several sessions
/// on one day count as a single streak day.
fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(&latest) = days.range(..=today).next_back() else {
        return 0;
    };
    if today - latest > Duration::days(1) {
        return 0;
    }

    let mut streak = 0;
    let mut expected = latest;
    for &day in days.range(..=latest).rev() {
        if day != expected {
            break;
        }
        streak += 1;
        expected = day - Duration::days(1);
    }
    streak
}

fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for &day in days {
        run = match previous {
            Some(prev) if day - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}
