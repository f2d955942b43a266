//! In/out points with undo.

use lazycut_core::RationalTime;
use serde::{Deserialize, Serialize};

/// Optional in and out points on the timeline.
///
/// Whenever both are set, `in_point <= out_point`. Marking one past the
/// other clears the other rather than producing an inverted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrimState {
    in_point: Option<RationalTime>,
    out_point: Option<RationalTime>,
}

impl TrimState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_point(&self) -> Option<RationalTime> {
        self.in_point
    }

    pub fn out_point(&self) -> Option<RationalTime> {
        self.out_point
    }

    /// Mark the in point; clears an out point that lies before it.
    pub fn set_in(&mut self, position: RationalTime) {
        if self.out_point.is_some_and(|out| position > out) {
            self.out_point = None;
        }
        self.in_point = Some(position);
    }

    /// Mark the out point; clears an in point that lies after it.
    pub fn set_out(&mut self, position: RationalTime) {
        if self.in_point.is_some_and(|inp| position < inp) {
            self.in_point = None;
        }
        self.out_point = Some(position);
    }

    pub fn clear(&mut self) {
        self.in_point = None;
        self.out_point = None;
    }

    /// Both points are set.
    pub fn is_complete(&self) -> bool {
        self.in_point.is_some() && self.out_point.is_some()
    }

    /// Selected length, or zero unless complete.
    pub fn duration(&self) -> RationalTime {
        match (self.in_point, self.out_point) {
            (Some(inp), Some(out)) => out - inp,
            _ => RationalTime::ZERO,
        }
    }

    /// `(in, out)` when complete.
    pub fn range(&self) -> Option<(RationalTime, RationalTime)> {
        Some((self.in_point?, self.out_point?))
    }
}

/// Bounded stack of trim snapshots taken before each mutation.
#[derive(Debug, Clone)]
pub struct TrimHistory {
    snapshots: Vec<TrimState>,
    max_depth: usize,
}

impl TrimHistory {
    /// Create a history keeping at most `max_depth` snapshots.
    pub fn new(max_depth: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Remember `trim` as it is before a mutation.
    pub fn record(&mut self, trim: &TrimState) {
        self.snapshots.push(*trim);
        if self.snapshots.len() > self.max_depth {
            self.snapshots.remove(0);
        }
    }

    /// Restore the most recent snapshot into `trim`. Returns false if empty.
    pub fn undo(&mut self, trim: &mut TrimState) -> bool {
        match self.snapshots.pop() {
            Some(previous) => {
                *trim = previous;
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.snapshots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl Default for TrimHistory {
    fn default() -> Self {
        Self::new(100)
    }
}
