//! # Breathwork Core Library
//!
//! This library provides the core logic for guided Wim Hof style breathing
//! sessions. The CLI binary is a thin layer over the same library, and any
//! other front end is expected to be one too.
//!
//! ## Architecture
//!
//! - **Routines**: Preset and custom routines made of breathing rounds
//! - **Session Runner**: A timer-driven state machine that walks a routine
//!   phase by phase (breathing, exhale hold, inhale hold)
//! - **Session Driver**: Runs the state machine on tokio timers and accepts
//!   pause/resume/skip/exit commands from handles
//! - **Storage**: SQLite-based routine and session storage, TOML configuration
//!
//! ## Key Components
//!
//! - [`SessionRunner`]: Core session state machine
//! - [`SessionDriver`]: Async timer loop around the runner
//! - [`Database`]: Routine and session persistence
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod routine;
pub mod session;
pub mod stats;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, SessionError, StorageError, ValidationError};
pub use events::SessionEvent;
pub use routine::{catalog, find_routine, preset_routines, BreathingSpeed, Round, Routine};
pub use session::{
    AlertTier, CountdownNotifier, SessionCommand, SessionDriver, SessionHandle, SessionObserver,
    SessionOutcome, SessionPhase, SessionRecorder, SessionRunner, SessionSnapshot, SessionSummary,
};
pub use stats::PracticeStats;
pub use storage::{Config, Database, RoutineRepository, SessionRecord};
pub use timer::{PhaseTimer, TimerMode, TimerToken};
