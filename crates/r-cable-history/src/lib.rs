//! ---
//! rc_section: "03-persistence-logging"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Append-only history of sizing calculations."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Calculation history: every successful sizing is appended once and never
//! modified. Readers get the newest records first.

/// Result alias used throughout the history crate.
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Error type for the history subsystem.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// Wrapper for IO errors encountered while reading/writing the log file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// The file exists but does not start with a history header.
    #[error("{0} is not a calculation history log")]
    NotAHistoryLog(String),
    /// Wrapper for Prometheus metrics registration failures.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub mod history_log;
pub mod memory;
pub mod metrics;
pub mod record;

pub use history_log::{replay as replay_history, HistoryReader, JsonlHistory};
pub use memory::InMemoryHistory;
pub use metrics::HistoryMetrics;
pub use record::{join_conductors, CalculationRecord, HistoryEntry, HistoryView};

/// Default number of records returned by [`HistoryRecorder::recent`] callers.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Append-only store of completed calculations.
pub trait HistoryRecorder: Send + Sync {
    /// Persist a record, assigning its identifier and timestamp.
    fn append(&self, record: CalculationRecord) -> Result<HistoryEntry>;

    /// The `limit` most recent entries, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = HistoryError::NotAHistoryLog("notes.txt".into());
        assert_eq!(
            format!("{err}"),
            "notes.txt is not a calculation history log"
        );
    }
}
