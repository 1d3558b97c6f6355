mod driver;
mod hooks;
mod runner;
mod state;

pub use driver::{SessionCommand, SessionDriver, SessionHandle, SessionOutcome};
pub use hooks::{AlertTier, CountdownNotifier, SessionObserver, SessionRecorder};
pub use runner::SessionRunner;
pub use state::{SessionPhase, SessionSnapshot, SessionState, SessionSummary};
