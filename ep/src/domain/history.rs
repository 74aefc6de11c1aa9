//! Bounded request history
//!
//! Most-recent-first list of raw request strings so the user can recall a
//! previous query. Only successful initial generations are recorded.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::debug;

/// Most requests ever kept; also the default
pub const MAX_HISTORY_CAPACITY: usize = 5;

/// Most-recent-first request history with a fixed capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl RequestHistory {
    /// Create an empty history holding between 1 and `MAX_HISTORY_CAPACITY` entries
    pub fn new(capacity: usize) -> Self {
        debug!(%capacity, "RequestHistory::new: called");
        let capacity = capacity.clamp(1, MAX_HISTORY_CAPACITY);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend a request, evicting the oldest beyond capacity
    pub fn record(&mut self, request: impl Into<String>) {
        let request = request.into();
        debug!(request_len = request.len(), len = self.entries.len(), "RequestHistory::record: called");
        self.entries.push_front(request);
        self.entries.truncate(self.capacity);
    }

    /// Entry at `index`, 0 being the most recent
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RequestHistory {
    fn default() -> Self {
        Self::new(MAX_HISTORY_CAPACITY)
    }
}
