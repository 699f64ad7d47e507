//! Durable transition log -- append-only CSV segments and state replay.

pub mod csv_log;
pub mod record;
pub mod segment;

pub use self::csv_log::CsvTransitionLog;
pub use self::record::{format_elapsed, ConnectorState, TransitionRecord, NO_PRIOR, TIMESTAMP_FORMAT};
pub use self::segment::{SegmentLayout, Segmenting};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("transition log I/O failed on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transition log encoding failed on {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl StorageError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Latest known state per connector id.
pub type StateMap = HashMap<String, ConnectorState>;

/// Append-only store of transitions.
pub trait TransitionStore: Send + Sync {
    /// Durably append one record. Returns only after the bytes are on disk.
    fn append(&self, record: &TransitionRecord) -> Result<(), StorageError>;

    /// Replay the whole log and keep the latest record per connector.
    /// An empty or missing log yields an empty map.
    fn reconstruct_latest(&self) -> Result<StateMap, StorageError>;
}
