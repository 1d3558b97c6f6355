mod phase_timer;

pub use phase_timer::{ArmedTimer, PhaseTimer, TimerMode, TimerToken, COUNTDOWN_PERIOD};
