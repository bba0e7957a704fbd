//! ---
//! rc_section: "03-persistence-logging"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Append-only history of sizing calculations."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use chrono::Utc;
use parking_lot::RwLock;

use crate::{
    record::{newest_first, CalculationRecord, HistoryEntry},
    HistoryRecorder, Result,
};

/// Process-local history, used when no history file is configured.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    entries: RwLock<Vec<HistoryEntry>>,
}

impl InMemoryHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl HistoryRecorder for InMemoryHistory {
    fn append(&self, record: CalculationRecord) -> Result<HistoryEntry> {
        let mut entries = self.entries.write();
        let entry = HistoryEntry {
            id: entries.last().map_or(1, |last| last.id + 1),
            recorded_at: Utc::now(),
            record,
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.entries.read().clone();
        newest_first(&mut entries);
        entries.truncate(limit);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::record;

    #[test]
    fn assigns_sequential_ids() {
        let history = InMemoryHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.append(record(1)).unwrap().id, 1);
        assert_eq!(history.append(record(2)).unwrap().id, 2);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn recent_returns_newest_first() {
        let history = InMemoryHistory::new();
        for conductor in 1..=4 {
            history.append(record(conductor)).unwrap();
        }
        let recent = history.recent(2).unwrap();
        assert_eq!(recent[0].record.conductor_id, 4);
        assert_eq!(recent[1].record.conductor_id, 3);
        assert_eq!(history.recent(10).unwrap().len(), 4);
    }
}
