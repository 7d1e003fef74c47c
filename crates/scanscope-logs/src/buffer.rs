use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use scanscope_types::{LogEvent, LogSource};

/// Default number of events kept by the client
pub const DEFAULT_CAPACITY: usize = 1000;

/// Thread-safe rolling buffer of the most recent log events
#[derive(Clone)]
pub struct LogBuffer {
    /// Internal storage, oldest first
    entries: Arc<RwLock<VecDeque<LogEvent>>>,

    /// Maximum capacity
    capacity: usize,
}

impl LogBuffer {
    /// Create a new log buffer with the given capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Push a new event, evicting the oldest if at capacity.
    ///
    /// Returns the evicted event, if any.
    pub fn push(&self, event: LogEvent) -> Option<LogEvent> {
        let mut entries = self.entries.write();
        let evicted = if entries.len() >= self.capacity {
            entries.pop_front()
        } else {
            None
        };
        entries.push_back(event);
        evicted
    }

    /// Get all entries (cloned for rendering)
    pub fn all(&self) -> Vec<LogEvent> {
        self.entries.read().iter().cloned().collect()
    }

    /// Get entries filtered by a predicate
    pub fn filtered<F>(&self, predicate: F) -> Vec<LogEvent>
    where
        F: Fn(&LogEvent) -> bool,
    {
        self.entries
            .read()
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    /// Entry count per source
    pub fn source_counts(&self) -> SourceCounts {
        let entries = self.entries.read();
        let mut counts = SourceCounts::default();

        for entry in entries.iter() {
            match entry.source {
                LogSource::System => counts.system += 1,
                LogSource::MobsfDocker => counts.docker += 1,
                LogSource::ScanScript => counts.scan += 1,
            }
        }

        counts
    }

    /// Total entry count
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Counts per source
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceCounts {
    pub system: usize,
    pub docker: usize,
    pub scan: usize,
}
