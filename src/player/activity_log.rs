//! Bounded activity log shown next to the playlist.
//!
//! Every user-visible event (loads, play/pause transitions, rejected playback)
//! lands here as one line. Only the newest entries are kept; older ones are
//! discarded, not archived. Each entry is mirrored to the log file as well.

use crate::constants::{ACTIVITY_LOG_CAPACITY, ACTIVITY_LOG_MARKER};
use chrono::{DateTime, Local};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Position in the full sequence of emitted entries, starting at 0
    pub seq: u64,
    pub at: DateTime<Local>,
    pub text: String,
}

pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_seq: u64,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::with_capacity(ACTIVITY_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
            next_seq: 0,
        }
    }

    pub fn log(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        log::info!("{message}");

        self.entries.push_back(LogEntry {
            seq: self.next_seq,
            at: Local::now(),
            text: format!("{ACTIVITY_LOG_MARKER} {message}"),
        });
        self.next_seq += 1;

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Visible entries, oldest first
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_prefixes_marker() {
        let mut log = ActivityLog::new();
        log.log("Loaded: intro.wav");

        let entry = log.latest().unwrap();
        assert_eq!(entry.seq, 0);
        assert_eq!(entry.text, format!("{ACTIVITY_LOG_MARKER} Loaded: intro.wav"));
    }

    #[test]
    fn test_31st_entry_evicts_first() {
        let mut log = ActivityLog::new();
        for i in 0..30 {
            log.log(format!("event {i}"));
        }
        assert_eq!(log.len(), 30);
        assert_eq!(log.entries().next().unwrap().seq, 0);

        log.log("event 30");
        assert_eq!(log.len(), 30);
        assert_eq!(log.entries().next().unwrap().seq, 1);
    }

    #[test]
    fn test_keeps_most_recent_30_of_45() {
        let mut log = ActivityLog::new();
        for i in 0..45 {
            log.log(format!("event {i}"));
        }

        let seqs: Vec<u64> = log.entries().map(|e| e.seq).collect();
        assert_eq!(seqs, (15..45).collect::<Vec<u64>>());
        assert!(log.entries().next().unwrap().text.ends_with("event 15"));
        assert!(log.latest().unwrap().text.ends_with("event 44"));
    }
}
