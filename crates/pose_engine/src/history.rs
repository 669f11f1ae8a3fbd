//! Time-ordered history buffer.
//!
//! Holds sample history (sender clock) and head-pose history (render clock).
//! Entries stay sorted by time: in-order arrivals append, late arrivals are
//! inserted at their sorted position.

use std::collections::VecDeque;
use std::fmt;

use contracts::{Pose, TimedPose};

/// Default size at or below which `find_closest` scans linearly
pub const DEFAULT_LINEAR_SCAN_THRESHOLD: usize = 64;

/// Anything stored in a `TimedHistory`
pub trait Timestamped {
    fn time(&self) -> f64;
}

impl Timestamped for TimedPose {
    #[inline]
    fn time(&self) -> f64 {
        self.time
    }
}

/// One accepted sample after reconstruction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleEntry {
    /// Sender-clock time (seconds)
    pub time: f64,
    pub sequence_id: u64,
    /// Raw reconstructed world pose (no alignment offset)
    pub pose: Pose,
    pub confidence: Option<f64>,
}

impl Timestamped for SampleEntry {
    #[inline]
    fn time(&self) -> f64 {
        self.time
    }
}

/// Sorted history with age/count pruning
pub struct TimedHistory<T> {
    entries: VecDeque<T>,
    linear_scan_threshold: usize,
    out_of_order_count: u64,
}

impl<T> fmt::Debug for TimedHistory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedHistory")
            .field("len", &self.entries.len())
            .field("linear_scan_threshold", &self.linear_scan_threshold)
            .field("out_of_order", &self.out_of_order_count)
            .finish()
    }
}

impl<T: Timestamped> Default for TimedHistory<T> {
    fn default() -> Self {
        Self::new(DEFAULT_LINEAR_SCAN_THRESHOLD)
    }
}

impl<T: Timestamped> TimedHistory<T> {
    pub fn new(linear_scan_threshold: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            linear_scan_threshold,
            out_of_order_count: 0,
        }
    }

    /// Insert preserving time order. Returns the index the entry landed at.
    ///
    /// Equal times keep arrival order.
    pub fn insert(&mut self, entry: T) -> usize {
        let t = entry.time();
        match self.entries.back() {
            None => {
                self.entries.push_back(entry);
                0
            }
            Some(last) if t >= last.time() => {
                self.entries.push_back(entry);
                self.entries.len() - 1
            }
            Some(_) => {
                self.out_of_order_count += 1;
                let idx = self.entries.partition_point(|e| e.time() <= t);
                self.entries.insert(idx, entry);
                idx
            }
        }
    }

    /// Drop entries strictly older than `min_time`. Returns how many were removed.
    pub fn prune_older_than(&mut self, min_time: f64) -> usize {
        let count = self.entries.partition_point(|e| e.time() < min_time);
        self.entries.drain(..count);
        count
    }

    /// Keep only the newest `max_count` entries
    pub fn prune_to_max_count(&mut self, max_count: usize) -> usize {
        let excess = self.entries.len().saturating_sub(max_count);
        self.entries.drain(..excess);
        excess
    }

    /// Entry nearest to `query`, clamped to the boundary entries.
    ///
    /// Ties go to the earlier entry.
    pub fn find_closest(&self, query: f64) -> Option<&T> {
        let first = self.entries.front()?;
        let last = self.entries.back()?;
        if query <= first.time() {
            return Some(first);
        }
        if query >= last.time() {
            return Some(last);
        }

        if self.entries.len() > self.linear_scan_threshold {
            self.closest_binary(query)
        } else {
            self.closest_linear(query)
        }
    }

    fn closest_linear(&self, query: f64) -> Option<&T> {
        let mut best: Option<&T> = None;
        let mut best_gap = f64::INFINITY;
        for entry in &self.entries {
            let gap = (entry.time() - query).abs();
            if gap < best_gap {
                best_gap = gap;
                best = Some(entry);
            }
        }
        best
    }

    fn closest_binary(&self, query: f64) -> Option<&T> {
        // first entry with time >= query; boundaries were handled by the caller
        let idx = self.entries.partition_point(|e| e.time() < query);
        let after = self.entries.get(idx)?;
        let before = self.entries.get(idx.checked_sub(1)?)?;
        if query - before.time() <= after.time() - query {
            Some(before)
        } else {
            Some(after)
        }
    }

    /// Pair `(a, b)` with `a.time <= query <= b.time`
    ///
    /// `None` when fewer than two entries exist or `query` lies outside the
    /// buffered range.
    pub fn bracket(&self, query: f64) -> Option<(&T, &T)> {
        let len = self.entries.len();
        if len < 2 {
            return None;
        }
        let first = self.entries.front()?;
        let last = self.entries.back()?;
        if query < first.time() || query > last.time() {
            return None;
        }

        let idx = self.entries.partition_point(|e| e.time() <= query);
        let (a, b) = if idx >= len {
            (len - 2, len - 1)
        } else {
            (idx - 1, idx)
        };
        Some((self.entries.get(a)?, self.entries.get(b)?))
    }

    /// The two newest entries, older first
    pub fn last_two(&self) -> Option<(&T, &T)> {
        let len = self.entries.len();
        if len < 2 {
            return None;
        }
        Some((self.entries.get(len - 2)?, self.entries.get(len - 1)?))
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Late arrivals inserted out of order so far
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }
}

/// Sender-clock sample history
pub type SampleHistory = TimedHistory<SampleEntry>;
