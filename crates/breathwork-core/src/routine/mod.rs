//! Breathing routine model.
//!
//! A [`Routine`] is an ordered list of [`Round`]s. Each round is a block of
//! paced breaths followed by an exhale hold and a recovery inhale hold.

mod presets;

pub use presets::{is_preset_id, preset_routines};

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, ValidationError};
use crate::storage::RoutineRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreathingSpeed {
    Fast,
    Medium,
    Slow,
}

impl BreathingSpeed {
    /// One full inhale + exhale cycle, in milliseconds.
    pub fn breath_duration_ms(self) -> u64 {
        match self {
            BreathingSpeed::Fast => 4_000,
            BreathingSpeed::Medium => 6_000,
            BreathingSpeed::Slow => 8_000,
        }
    }

    pub fn breath_duration_secs(self) -> u32 {
        (self.breath_duration_ms() / 1000) as u32
    }
}

impl std::fmt::Display for BreathingSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BreathingSpeed::Fast => "Fast",
            BreathingSpeed::Medium => "Medium",
            BreathingSpeed::Slow => "Slow",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for BreathingSpeed {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(BreathingSpeed::Fast),
            "medium" => Ok(BreathingSpeed::Medium),
            "slow" => Ok(BreathingSpeed::Slow),
            other => Err(ValidationError::InvalidValue {
                field: "breath_speed".into(),
                message: format!("expected fast, medium or slow, got '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Round {
    pub breath_count: u32,
    pub breath_speed: BreathingSpeed,
    pub exhale_hold_secs: u32,
    pub inhale_hold_secs: u32,
    /// Display hint only. The hold still lasts `exhale_hold_secs`.
    #[serde(default)]
    pub is_final_hold: bool,
}

impl Round {
    pub fn new(
        breath_count: u32,
        breath_speed: BreathingSpeed,
        exhale_hold_secs: u32,
        inhale_hold_secs: u32,
    ) -> Self {
        Self {
            breath_count,
            breath_speed,
            exhale_hold_secs,
            inhale_hold_secs,
            is_final_hold: false,
        }
    }

    pub fn with_final_hold(mut self) -> Self {
        self.is_final_hold = true;
        self
    }

    /// Breathing time plus both holds, in seconds.
    ///
    /// Uses saturating arithmetic so absurd breath counts cannot overflow.
    pub fn duration_secs(&self) -> u64 {
        u64::from(self.breath_count)
            .saturating_mul(u64::from(self.breath_speed.breath_duration_secs()))
            .saturating_add(u64::from(self.exhale_hold_secs))
            .saturating_add(u64::from(self.inhale_hold_secs))
    }

    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        if self.breath_count == 0 {
            return Err(ValidationError::InvalidValue {
                field: format!("rounds[{index}].breath_count"),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Routine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub rounds: Vec<Round>,
    #[serde(default)]
    pub is_preset: bool,
}

impl Routine {
    /// Build a custom (non-preset) routine.
    pub fn custom(id: impl Into<String>, name: impl Into<String>, rounds: Vec<Round>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            rounds,
            is_preset: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Reject routines a session cannot run.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "id".into(),
                message: "must not be empty".into(),
            });
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "name".into(),
                message: "must not be empty".into(),
            });
        }
        if self.rounds.is_empty() {
            return Err(ValidationError::EmptyCollection(format!(
                "routine '{}' has no rounds",
                self.id
            )));
        }
        for (index, round) in self.rounds.iter().enumerate() {
            round.validate(index)?;
        }
        Ok(())
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    pub fn estimated_duration_secs(&self) -> u64 {
        self.rounds
            .iter()
            .fold(0u64, |total, round| total.saturating_add(round.duration_secs()))
    }

    /// Estimated duration rounded to the nearest whole minute, halves up.
    pub fn estimated_duration_min(&self) -> u32 {
        let secs = self.estimated_duration_secs();
        u32::try_from(secs.saturating_add(30) / 60).unwrap_or(u32::MAX)
    }
}

/// Preset routines followed by the repository's custom routines.
pub fn catalog<R: RoutineRepository + ?Sized>(repo: &R) -> Result<Vec<Routine>, StorageError> {
    let mut routines = preset_routines();
    routines.extend(repo.list_routines()?);
    Ok(routines)
}

/// Look up a routine by id across presets and the repository.
pub fn find_routine<R: RoutineRepository + ?Sized>(
    repo: &R,
    id: &str,
) -> Result<Routine, StorageError> {
    catalog(repo)?
        .into_iter()
        .find(|r| r.id == id)
        .ok_or_else(|| StorageError::NotFound(format!("routine '{id}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(breaths: u32, speed: BreathingSpeed, exhale: u32, inhale: u32) -> Round {
        Round::new(breaths, speed, exhale, inhale)
    }

    #[test]
    fn cadence_per_speed() {
        assert_eq!(BreathingSpeed::Fast.breath_duration_ms(), 4000);
        assert_eq!(BreathingSpeed::Medium.breath_duration_ms(), 6000);
        assert_eq!(BreathingSpeed::Slow.breath_duration_ms(), 8000);
        assert_eq!(BreathingSpeed::Slow.breath_duration_secs(), 8);
    }

    #[test]
    fn speed_parses_case_insensitively() {
        assert_eq!("FAST".parse::<BreathingSpeed>().unwrap(), BreathingSpeed::Fast);
        assert_eq!("medium".parse::<BreathingSpeed>().unwrap(), BreathingSpeed::Medium);
        assert!("brisk".parse::<BreathingSpeed>().is_err());
    }

    #[test]
    fn empty_routine_is_rejected() {
        let routine = Routine::custom("r1", "Empty", vec![]);
        assert!(matches!(
            routine.validate(),
            Err(ValidationError::EmptyCollection(_))
        ));
    }

    #[test]
    fn zero_breath_round_is_rejected() {
        let routine = Routine::custom(
            "r1",
            "Broken",
            vec![round(30, BreathingSpeed::Fast, 30, 15), round(0, BreathingSpeed::Fast, 30, 15)],
        );
        match routine.validate() {
            Err(ValidationError::InvalidValue { field, .. }) => {
                assert_eq!(field, "rounds[1].breath_count")
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn blank_name_is_rejected() {
        let routine = Routine::custom("r1", "   ", vec![round(30, BreathingSpeed::Fast, 30, 15)]);
        assert!(routine.validate().is_err());
    }

    #[test]
    fn zero_second_holds_are_valid() {
        let routine = Routine::custom(
            "r1",
            "No holds",
            vec![round(10, BreathingSpeed::Slow, 0, 0)],
        );
        assert!(routine.validate().is_ok());
    }

    #[test]
    fn estimated_duration_rounds_to_nearest_minute() {
        // 2 x 4s + 1 + 1 = 10s -> 0 min
        let short = Routine::custom("a", "A", vec![round(2, BreathingSpeed::Fast, 1, 1)]);
        assert_eq!(short.estimated_duration_secs(), 10);
        assert_eq!(short.estimated_duration_min(), 0);

        // 30 x 6s + 60 + 15 = 255s -> 4.25 min -> 4
        let beginner = Routine::custom("b", "B", vec![round(30, BreathingSpeed::Medium, 60, 15)]);
        assert_eq!(beginner.estimated_duration_min(), 4);

        // 15 x 4s + 20 + 10 = 90s -> 1.5 min -> 2
        let half = Routine::custom("c", "C", vec![round(15, BreathingSpeed::Fast, 20, 10)]);
        assert_eq!(half.estimated_duration_min(), 2);
    }

    #[test]
    fn final_hold_does_not_change_duration() {
        let plain = round(20, BreathingSpeed::Fast, 60, 15);
        assert_eq!(plain.duration_secs(), plain.with_final_hold().duration_secs());
    }

    #[test]
    fn decode_rejects_unknown_fields() {
        let json = r#"{"breath_count":3,"breath_speed":"Fast","exhale_hold_secs":1,"inhale_hold_secs":1,"hold_forever":true}"#;
        assert!(serde_json::from_str::<Round>(json).is_err());
    }
}
