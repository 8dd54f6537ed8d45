//! Bounded recent-activity log
//!
//! Keeps the most recent [`LOG_CAPACITY`] non-empty entries, evicting the
//! oldest first. This is the user-facing activity trail shown next to the
//! task list; diagnostics go through `tracing`.

use std::collections::VecDeque;

/// Maximum number of entries retained
pub const LOG_CAPACITY: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogBuffer {
    entries: VecDeque<String>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(LOG_CAPACITY + 1),
        }
    }

    /// Append an entry. Empty entries are ignored.
    ///
    /// Returns true if the entry was stored.
    pub fn append(&mut self, entry: impl Into<String>) -> bool {
        let entry = entry.into();
        if entry.is_empty() {
            return false;
        }
        self.entries.push_back(entry);
        while self.entries.len() > LOG_CAPACITY {
            self.entries.pop_front();
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest-first copy of the retained entries
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_entry_is_not_stored() {
        let mut log = LogBuffer::new();
        assert!(!log.append(""));
        assert!(log.is_empty());
    }

    #[test]
    fn test_entries_keep_order() {
        let mut log = LogBuffer::new();
        log.append("one");
        log.append("two");
        assert_eq!(log.snapshot(), vec!["one", "two"]);
    }

    #[test]
    fn test_oldest_entry_is_evicted_at_capacity() {
        let mut log = LogBuffer::new();
        for i in 0..LOG_CAPACITY + 3 {
            log.append(format!("entry {}", i));
        }
        assert_eq!(log.len(), LOG_CAPACITY);
        let snapshot = log.snapshot();
        assert_eq!(snapshot.first().map(String::as_str), Some("entry 3"));
        assert_eq!(snapshot.last().map(String::as_str), Some("entry 12"));
    }
}
