mod config;
pub mod database;
mod record;

pub use config::{Config, NotificationsConfig, QuickStartConfig, SessionConfig};
pub use database::{Database, SessionRecord};
pub use record::{decode_routine, encode_routine, ROUTINE_RECORD_VERSION};

use std::path::PathBuf;

use crate::error::StorageError;
use crate::routine::Routine;

/// Keyed routine storage. No transactions; last write wins.
pub trait RoutineRepository {
    /// Stored custom routines in insertion order.
    fn list_routines(&self) -> Result<Vec<Routine>, StorageError>;
    fn save_routine(&self, routine: &Routine) -> Result<(), StorageError>;
    fn delete_routine(&self, id: &str) -> Result<(), StorageError>;
}

/// Returns the data directory, creating it if needed.
///
/// `BREATHWORK_DATA_DIR` overrides everything. Otherwise
/// `~/.config/breathwork[-dev]/` based on `BREATHWORK_ENV`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("BREATHWORK_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("BREATHWORK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("breathwork-dev")
            } else {
                base_dir.join("breathwork")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
