//! ---
//! rc_section: "03-persistence-logging"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Append-only history of sizing calculations."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    metrics::HistoryMetrics,
    record::{newest_first, CalculationRecord, HistoryEntry},
    HistoryError, HistoryRecorder, Result,
};

/// On-disk format version written into the header line.
pub const HISTORY_FORMAT_VERSION: u16 = 1;

/// First line of every history file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryHeader {
    kind: String,
    version: u16,
    created_at: DateTime<Utc>,
}

const HEADER_KIND: &str = "r-cable-history";

impl HistoryHeader {
    fn new() -> Self {
        Self {
            kind: HEADER_KIND.to_string(),
            version: HISTORY_FORMAT_VERSION,
            created_at: Utc::now(),
        }
    }
}

struct WriterState {
    file: File,
    next_id: u64,
    /// Set when a write failed part-way; the tail is repaired before the next append.
    dirty: bool,
}

/// JSON-lines history file shared by all request handlers.
pub struct JsonlHistory {
    path: PathBuf,
    state: Mutex<WriterState>,
    metrics: Option<HistoryMetrics>,
}

impl JsonlHistory {
    /// Open a history file for appending, writing a header if the file is new.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if path.exists() && fs::metadata(path)?.len() > 0 {
            HistoryReader::open(path)?;
            truncate_partial_tail(path)?;
        }
        let fresh = !path.exists() || fs::metadata(path)?.len() == 0;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        let next_id = if fresh {
            let mut line = serde_json::to_vec(&HistoryHeader::new())?;
            line.push(b'\n');
            file.write_all(&line)?;
            file.flush()?;
            info!(path = %path.display(), "created calculation history");
            1
        } else {
            let last = last_id(path)?;
            info!(path = %path.display(), last_id = last, "resumed calculation history");
            last + 1
        };

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(WriterState {
                file,
                next_id,
                dirty: false,
            }),
            metrics: None,
        })
    }

    /// Attach Prometheus counters for appends and bytes written.
    pub fn with_metrics(mut self, metrics: HistoryMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Location of the history file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_entry(&self, record: CalculationRecord) -> Result<(HistoryEntry, usize)> {
        let mut state = self.state.lock();
        if state.dirty {
            truncate_partial_tail(&self.path)?;
            state.dirty = false;
        }
        let entry = HistoryEntry {
            id: state.next_id,
            recorded_at: Utc::now(),
            record,
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        let file = &mut state.file;
        if let Err(err) = file.write_all(&line).and_then(|()| file.flush()) {
            state.dirty = true;
            return Err(err.into());
        }
        state.next_id += 1;
        Ok((entry, line.len()))
    }
}

impl HistoryRecorder for JsonlHistory {
    fn append(&self, record: CalculationRecord) -> Result<HistoryEntry> {
        match self.write_entry(record) {
            Ok((entry, bytes)) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_append(bytes);
                }
                debug!(id = entry.id, bytes, "history entry appended");
                Ok(entry)
            }
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure();
                }
                warn!(error = %err, path = %self.path.display(), "history append failed");
                Err(err)
            }
        }
    }

    fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        // Hold the writer lock so readers never observe a half-written line.
        let _state = self.state.lock();
        let mut entries = readable_entries(&self.path)?;
        newest_first(&mut entries);
        entries.truncate(limit);
        Ok(entries)
    }
}

impl std::fmt::Debug for JsonlHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlHistory")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn read_header(reader: &mut BufReader<File>, path: &Path) -> Result<HistoryHeader> {
    let mut first_line = String::new();
    reader.read_line(&mut first_line)?;
    match serde_json::from_str::<HistoryHeader>(&first_line) {
        Ok(header) if header.kind == HEADER_KIND => Ok(header),
        _ => Err(HistoryError::NotAHistoryLog(path.display().to_string())),
    }
}

/// Cut an unterminated last line left behind by an interrupted append, so the
/// next record starts on a line of its own.
fn truncate_partial_tail(path: &Path) -> Result<()> {
    let data = fs::read(path)?;
    if data.is_empty() || data.ends_with(b"\n") {
        return Ok(());
    }
    let keep = data
        .iter()
        .rposition(|byte| *byte == b'\n')
        .map_or(0, |pos| pos + 1);
    OpenOptions::new().write(true).open(path)?.set_len(keep as u64)?;
    warn!(
        path = %path.display(),
        dropped_bytes = data.len() - keep,
        "truncated partial history line"
    );
    Ok(())
}

/// All entries that parse, skipping unreadable lines.
fn readable_entries(path: &Path) -> Result<Vec<HistoryEntry>> {
    let mut entries = Vec::new();
    for entry in HistoryReader::open(path)? {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(HistoryError::Json(err)) => {
                warn!(error = %err, path = %path.display(), "skipping unreadable history line");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(entries)
}

fn last_id(path: &Path) -> Result<u64> {
    Ok(readable_entries(path)?
        .iter()
        .map(|entry| entry.id)
        .max()
        .unwrap_or(0))
}

/// Replay the history in append order, invoking the callback for each entry.
pub fn replay<F>(path: &Path, mut handler: F) -> Result<usize>
where
    F: FnMut(HistoryEntry) -> Result<()>,
{
    let mut count = 0usize;
    for entry in HistoryReader::open(path)? {
        handler(entry?)?;
        count += 1;
    }
    Ok(count)
}

/// Streaming iterator over history entries in append order.
pub struct HistoryReader {
    lines: std::io::Lines<BufReader<File>>,
}

impl HistoryReader {
    /// Open the history for sequential reading, checking the header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        read_header(&mut reader, path)?;
        Ok(Self {
            lines: reader.lines(),
        })
    }
}

impl Iterator for HistoryReader {
    type Item = Result<HistoryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => return Some(serde_json::from_str(&line).map_err(HistoryError::from)),
                Err(err) => return Some(Err(err.into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::record;
    use tempfile::tempdir;

    #[test]
    fn append_and_replay_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let history = JsonlHistory::open(&path).unwrap();

        history.append(record(4)).unwrap();
        history.append(record(6)).unwrap();

        let mut conductors = Vec::new();
        let count = replay(&path, |entry| {
            conductors.push(entry.record.conductor_id);
            Ok(())
        })
        .unwrap();

        assert_eq!(count, 2);
        assert_eq!(conductors, vec![4, 6]);
    }

    #[test]
    fn reader_iterates_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/history.jsonl");
        let history = JsonlHistory::open(&path).unwrap();
        history.append(record(1)).unwrap();
        history.append(record(2)).unwrap();

        let ids: Vec<_> = HistoryReader::open(&path)
            .unwrap()
            .map(|entry| entry.unwrap().id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn ids_resume_after_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        {
            let history = JsonlHistory::open(&path).unwrap();
            history.append(record(4)).unwrap();
            history.append(record(4)).unwrap();
        }
        let history = JsonlHistory::open(&path).unwrap();
        let entry = history.append(record(5)).unwrap();
        assert_eq!(entry.id, 3);
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let dir = tempdir().unwrap();
        let history = JsonlHistory::open(dir.path().join("history.jsonl")).unwrap();
        for conductor in 1..=5 {
            history.append(record(conductor)).unwrap();
        }
        let recent = history.recent(3).unwrap();
        let ids: Vec<_> = recent.iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
        assert!(history.recent(0).unwrap().is_empty());
    }

    #[test]
    fn interrupted_append_does_not_corrupt_later_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        {
            let history = JsonlHistory::open(&path).unwrap();
            history.append(record(4)).unwrap();
        }
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"id":2,"recorded_at":"20"#).unwrap();
        drop(file);

        {
            let history = JsonlHistory::open(&path).unwrap();
            let entry = history.append(record(6)).unwrap();
            assert_eq!(entry.id, 2);
            let ids: Vec<_> = history.recent(10).unwrap().iter().map(|e| e.id).collect();
            assert_eq!(ids, vec![2, 1]);
        }

        let history = JsonlHistory::open(&path).unwrap();
        assert_eq!(history.append(record(8)).unwrap().id, 3);
        let conductors: Vec<_> = history
            .recent(10)
            .unwrap()
            .iter()
            .map(|e| e.record.conductor_id)
            .collect();
        assert_eq!(conductors, vec![8, 6, 4]);
    }

    #[test]
    fn recent_skips_unreadable_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let history = JsonlHistory::open(&path).unwrap();
        history.append(record(1)).unwrap();
        OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"not json\n")
            .unwrap();
        history.append(record(2)).unwrap();

        let ids: Vec<_> = history.recent(10).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn foreign_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "just some notes\n").unwrap();
        assert!(matches!(
            JsonlHistory::open(&path),
            Err(HistoryError::NotAHistoryLog(_))
        ));

        let unterminated = dir.path().join("draft.txt");
        fs::write(&unterminated, "no newline here").unwrap();
        assert!(JsonlHistory::open(&unterminated).is_err());
        assert_eq!(fs::read_to_string(&unterminated).unwrap(), "no newline here");
    }
}
