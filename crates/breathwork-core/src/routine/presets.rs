use super::{BreathingSpeed, Round, Routine};

use BreathingSpeed::{Fast, Medium, Slow};

fn preset(id: &str, name: &str, description: &str, rounds: Vec<Round>) -> Routine {
    Routine {
        id: id.into(),
        name: name.into(),
        description: Some(description.into()),
        rounds,
        is_preset: true,
    }
}

/// Built-in routines, shortest first.
pub fn preset_routines() -> Vec<Routine> {
    vec![
        preset(
            "quick-5min",
            "5-Minute Quick Start",
            "Perfect for a quick energy boost and focus",
            vec![Round::new(20, Fast, 30, 10), Round::new(20, Fast, 45, 10)],
        ),
        preset(
            "beginner",
            "Beginner Flow",
            "Perfect for starting your Wim Hof journey",
            vec![
                Round::new(30, Medium, 60, 15),
                Round::new(30, Medium, 90, 15),
                Round::new(30, Medium, 120, 15),
            ],
        ),
        preset(
            "energizer",
            "Morning Energizer",
            "Boost your energy for the day ahead",
            vec![
                Round::new(40, Fast, 45, 15),
                Round::new(40, Fast, 60, 15),
                Round::new(40, Fast, 75, 15),
                Round::new(40, Fast, 90, 15),
            ],
        ),
        preset(
            "calm",
            "Evening Calm",
            "Relax and unwind with slower breathing",
            vec![
                Round::new(25, Slow, 90, 20),
                Round::new(25, Slow, 105, 20),
                Round::new(25, Slow, 120, 20),
            ],
        ),
        preset(
            "advanced",
            "Advanced Challenge",
            "For experienced practitioners seeking intensity",
            vec![
                Round::new(50, Fast, 60, 15),
                Round::new(50, Fast, 90, 15),
                Round::new(50, Fast, 120, 15),
                Round::new(50, Fast, 150, 15).with_final_hold(),
            ],
        ),
    ]
}

pub fn is_preset_id(id: &str) -> bool {
    preset_routines().iter().any(|r| r.id == id)
}
