//! Versioned encoding for persisted routines.
//!
//! Routines are stored as `{"version": N, "routine": {...}}`. Decoding fails
//! closed: unknown versions, unknown fields and invalid routines are errors,
//! never coerced into something runnable.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::routine::Routine;

pub const ROUTINE_RECORD_VERSION: u32 = 1;

#[derive(Serialize)]
struct RoutineRecordRef<'a> {
    version: u32,
    routine: &'a Routine,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RoutineRecord {
    version: u32,
    routine: serde_json::Value,
}

pub fn encode_routine(routine: &Routine) -> Result<String, StorageError> {
    serde_json::to_string(&RoutineRecordRef {
        version: ROUTINE_RECORD_VERSION,
        routine,
    })
    .map_err(|e| StorageError::Decode {
        key: routine.id.clone(),
        message: e.to_string(),
    })
}

pub fn decode_routine(key: &str, body: &str) -> Result<Routine, StorageError> {
    let decode_err = |message: String| StorageError::Decode {
        key: key.to_string(),
        message,
    };

    let record: RoutineRecord = serde_json::from_str(body).map_err(|e| decode_err(e.to_string()))?;
    if record.version != ROUTINE_RECORD_VERSION {
        return Err(StorageError::UnsupportedVersion {
            key: key.to_string(),
            version: record.version,
        });
    }
    let routine: Routine =
        serde_json::from_value(record.routine).map_err(|e| decode_err(e.to_string()))?;
    routine.validate().map_err(|e| decode_err(e.to_string()))?;
    if routine.id != key {
        return Err(decode_err(format!(
            "record id '{}' does not match its key",
            routine.id
        )));
    }
    Ok(routine)
}
