// Bounded, append-only history of accepted values per stream

use std::collections::VecDeque;

/// Longest lookback any test needs (Test 7: 14 points, including the current one).
pub const LONGEST_TEST_WINDOW: usize = 14;
/// Smallest capacity a history may be configured with.
pub const MIN_HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Clone)]
pub struct History {
    values: VecDeque<f64>,
    capacity: usize,
}

impl History {
    /// Capacity is raised to MIN_HISTORY_CAPACITY if smaller.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_HISTORY_CAPACITY);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The newest `n` values (fewer if not yet collected), oldest first.
    pub fn tail(&self, n: usize) -> Vec<f64> {
        let skip = self.values.len().saturating_sub(n);
        self.values.iter().skip(skip).copied().collect()
    }

    /// All retained values, oldest first.
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}
