// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Half-open slice bounds and their translation to inclusive store ranges

use std::ops::{Bound, RangeBounds};

/// A `[start, stop)` slice with negative indices counting from the tail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
}

impl Slice {
    pub fn new(start: Option<i64>, stop: Option<i64>) -> Self {
        Self { start, stop }
    }

    /// Convert Rust range syntax; `..=-1` means "through the last element"
    pub fn from_range(range: impl RangeBounds<i64>) -> Self {
        let start = match range.start_bound() {
            Bound::Included(&s) => Some(s),
            Bound::Excluded(&s) => Some(s.saturating_add(1)),
            Bound::Unbounded => None,
        };
        let stop = match range.end_bound() {
            Bound::Included(&-1) => None,
            Bound::Included(&e) => Some(e.saturating_add(1)),
            Bound::Excluded(&e) => Some(e),
            Bound::Unbounded => None,
        };
        Self { start, stop }
    }

    /// Inclusive `(start, end)` arguments for an LRANGE-style read, or
    /// `None` when the slice is empty whatever the list length
    pub fn to_inclusive(self) -> Option<(i64, i64)> {
        let start = self.start.unwrap_or(0);
        match self.stop {
            None => Some((start, -1)),
            Some(0) => None,
            Some(stop) if Some(stop) == self.start => None,
            Some(stop) => Some((start, stop.saturating_sub(1))),
        }
    }
}

#[cfg(test)]
#[path = "slice_tests.rs"]
mod tests;
