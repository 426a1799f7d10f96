#![forbid(unsafe_code)]

//! Bounded FIFO ledger for structured per-call records.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Bounded FIFO buffer of structured records (transform traces, test logs).
///
/// Capacity is enforced via `capacity.max(1)`. When full, the oldest entry
/// (front of the `VecDeque`) is evicted before a new entry is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceLedger<T> {
    capacity: usize,
    entries: VecDeque<T>,
    evicted: u64,
}

impl<T> TraceLedger<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
            evicted: 0,
        }
    }

    /// Append an entry, evicting the oldest if at capacity.
    pub fn record(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            let _ = self.entries.pop_front();
            self.evicted += 1;
        }
        self.entries.push_back(entry);
    }

    /// Remove and return every entry, oldest first.
    pub fn drain(&mut self) -> Vec<T> {
        self.entries.drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recently recorded entry.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries dropped because the ledger was full.
    #[must_use]
    pub const fn evicted(&self) -> u64 {
        self.evicted
    }
}

impl<T: Serialize> TraceLedger<T> {
    /// Serialize every entry as one JSON object per line.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            if let Ok(line) = serde_json::to_string(entry) {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::TraceLedger;

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut ledger = TraceLedger::new(0);
        ledger.record(1_u32);
        ledger.record(2_u32);
        assert_eq!(ledger.capacity(), 1);
        assert_eq!(ledger.latest(), Some(&2));
        assert_eq!(ledger.evicted(), 1);
    }

    #[test]
    fn drain_returns_oldest_first_and_empties() {
        let mut ledger = TraceLedger::new(3);
        for value in 0..5_u32 {
            ledger.record(value);
        }
        assert_eq!(ledger.drain(), vec![2, 3, 4]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn jsonl_emits_one_line_per_entry() {
        let mut ledger = TraceLedger::new(4);
        ledger.record(serde_json::json!({"op": "fftn"}));
        ledger.record(serde_json::json!({"op": "ifftn"}));
        let text = ledger.to_jsonl();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("{\"op\":\"fftn\"}"));
    }
}
