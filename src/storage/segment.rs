//! Log segment naming and discovery.
//!
//! With monthly segmenting, records for December 2025 land in
//! `2025-12_<file name>` next to the configured log path.

use super::StorageError;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segmenting {
    /// One file per calendar month, prefixed `YYYY-MM_`.
    #[default]
    Monthly,
    /// Everything in the configured file.
    Single,
}

#[derive(Debug, Clone)]
pub struct SegmentLayout {
    base: PathBuf,
    segmenting: Segmenting,
}

impl SegmentLayout {
    pub fn new(base: impl Into<PathBuf>, segmenting: Segmenting) -> Self {
        Self {
            base: base.into(),
            segmenting,
        }
    }

    /// Segment a record stamped `ts` belongs in.
    pub fn path_for(&self, ts: &DateTime<FixedOffset>) -> PathBuf {
        match self.segmenting {
            Segmenting::Single => self.base.clone(),
            Segmenting::Monthly => self
                .dir()
                .join(format!("{}_{}", ts.format("%Y-%m"), self.file_name())),
        }
    }

    /// Every existing segment, oldest month first.
    pub fn list(&self) -> Result<Vec<PathBuf>, StorageError> {
        match self.segmenting {
            Segmenting::Single => Ok(if self.base.is_file() {
                vec![self.base.clone()]
            } else {
                Vec::new()
            }),
            Segmenting::Monthly => self.list_monthly(),
        }
    }

    fn list_monthly(&self) -> Result<Vec<PathBuf>, StorageError> {
        let dir = self.dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&dir, e)),
        };

        let suffix = format!("_{}", self.file_name());
        let mut segments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(prefix) = name.strip_suffix(&suffix) else { continue };
            if is_month_prefix(prefix) && entry.path().is_file() {
                segments.push((name.to_string(), entry.path()));
            }
        }

        // YYYY-MM prefixes sort chronologically.
        segments.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(segments.into_iter().map(|(_, p)| p).collect())
    }

    fn dir(&self) -> PathBuf {
        match self.base.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn file_name(&self) -> String {
        self.base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "charger_log.csv".to_string())
    }
}

fn is_month_prefix(prefix: &str) -> bool {
    prefix.len() == 7 && NaiveDate::parse_from_str(&format!("{prefix}-01"), "%Y-%m-%d").is_ok()
}
