//! CSV implementation of the transition log.
//!
//! Each segment starts with a UTF-8 BOM (so spreadsheet tools pick the right
//! encoding) followed by the header row. Records are only ever appended, and
//! every append is fsynced before it is reported as committed.

use super::record::{ConnectorState, TransitionRecord, NO_PRIOR, TIMESTAMP_FORMAT};
use super::segment::{SegmentLayout, Segmenting};
use super::{StateMap, StorageError, TransitionStore};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const HEADER: [&str; 5] = ["Timestamp", "ChargerID", "OldStatus", "NewStatus", "Duration"];

#[derive(Debug, Serialize, Deserialize)]
struct LogRow {
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "ChargerID")]
    charger_id: String,
    #[serde(rename = "OldStatus", default)]
    old_status: String,
    #[serde(rename = "NewStatus")]
    new_status: String,
    #[serde(rename = "Duration", default)]
    duration: String,
}

impl From<&TransitionRecord> for LogRow {
    fn from(r: &TransitionRecord) -> Self {
        Self {
            timestamp: r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            charger_id: r.connector_id.clone(),
            old_status: r.old_status_label().to_string(),
            new_status: r.new_status.clone(),
            duration: r.duration_label().to_string(),
        }
    }
}

pub struct CsvTransitionLog {
    layout: SegmentLayout,
    offset: FixedOffset,
}

impl CsvTransitionLog {
    pub fn new(base: impl Into<PathBuf>, segmenting: Segmenting, offset: FixedOffset) -> Self {
        Self {
            layout: SegmentLayout::new(base, segmenting),
            offset,
        }
    }

    /// Every readable record across all segments, in timestamp order.
    /// Ties keep their physical order (segment order, then row order).
    pub fn records(&self) -> Result<Vec<TransitionRecord>, StorageError> {
        let mut records = Vec::new();
        for path in self.layout.list()? {
            records.extend(self.read_segment(&path)?);
        }
        // Stable, so equal timestamps stay in write order.
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    fn read_segment(&self, path: &Path) -> Result<Vec<TransitionRecord>, StorageError> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(path, e)),
        };
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes[..]);

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(body);

        let mut records = Vec::new();
        for (idx, row) in reader.deserialize::<LogRow>().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(segment = %path.display(), row = idx + 1, error = %e, "Skipping unreadable log row");
                    continue;
                }
            };
            match self.decode(row) {
                Some(rec) => records.push(rec),
                None => warn!(segment = %path.display(), row = idx + 1, "Skipping incomplete log row"),
            }
        }
        debug!(segment = %path.display(), rows = records.len(), "Read log segment");
        Ok(records)
    }

    fn decode(&self, row: LogRow) -> Option<TransitionRecord> {
        let naive = NaiveDateTime::parse_from_str(&row.timestamp, TIMESTAMP_FORMAT).ok()?;
        let timestamp: DateTime<FixedOffset> = naive.and_local_timezone(self.offset).single()?;
        // Every committed row carries all five columns.
        if row.charger_id.is_empty() || row.new_status.is_empty() || row.duration.is_empty() {
            return None;
        }
        Some(TransitionRecord {
            timestamp,
            connector_id: row.charger_id,
            old_status: sentinel_to_none(row.old_status),
            new_status: row.new_status,
            duration: sentinel_to_none(row.duration),
        })
    }
}

fn sentinel_to_none(v: String) -> Option<String> {
    if v.is_empty() || v == NO_PRIOR {
        None
    } else {
        Some(v)
    }
}

/// Length of the segment up to and including its last complete row.
///
/// A row is complete once its terminating newline lies outside any quoted
/// field. Everything after that point is a row cut short by a crash.
fn committed_len(bytes: &[u8]) -> usize {
    let mut quoted = false;
    let mut end = 0;
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'"' => quoted = !quoted,
            b'\n' if !quoted => end = i + 1,
            _ => {}
        }
    }
    end
}

/// Cut a torn trailing row off the segment. Returns the length left behind.
fn drop_torn_tail(file: &mut File, path: &Path) -> Result<u64, StorageError> {
    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_end(&mut bytes))
        .map_err(|e| StorageError::io(path, e))?;

    let keep = committed_len(&bytes);
    if keep < bytes.len() {
        warn!(
            segment = %path.display(),
            dropped_bytes = bytes.len() - keep,
            "Dropping torn trailing log row"
        );
        file.set_len(keep as u64).map_err(|e| StorageError::io(path, e))?;
    }
    Ok(keep as u64)
}

impl TransitionStore for CsvTransitionLog {
    fn append(&self, record: &TransitionRecord) -> Result<(), StorageError> {
        let path = self.layout.path_for(&record.timestamp);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;

        // A segment torn before its header row was finished starts over.
        let fresh = drop_torn_tail(&mut file, &path)? == 0;
        if fresh {
            file.write_all(UTF8_BOM).map_err(|e| StorageError::io(&path, e))?;
            info!(segment = %path.display(), "Started new log segment");
        }

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(&file);
            if fresh {
                writer
                    .write_record(HEADER)
                    .map_err(|e| StorageError::csv(&path, e))?;
            }
            writer
                .serialize(LogRow::from(record))
                .map_err(|e| StorageError::csv(&path, e))?;
            writer.flush().map_err(|e| StorageError::io(&path, e))?;
        }

        file.sync_data().map_err(|e| StorageError::io(&path, e))?;
        Ok(())
    }

    fn reconstruct_latest(&self) -> Result<StateMap, StorageError> {
        let mut latest = StateMap::new();
        for rec in self.records()? {
            let state: ConnectorState = rec.to_state();
            latest.insert(state.id.clone(), state);
        }
        Ok(latest)
    }
}
