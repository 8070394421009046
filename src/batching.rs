//! Row-range planning shared by the reader and the split/merge writer.

use std::{fmt, num::NonZeroUsize};

use crate::error::BatchError;

/// Half-open interval `[start, end)` over a table's row indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowRange {
    /// First row in the range.
    pub start: usize,
    /// One past the last row in the range.
    pub end: usize,
}

impl RowRange {
    /// Build a range; `start` must not exceed `end`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "row range start {start} exceeds end {end}");
        Self { start, end }
    }

    /// Number of rows covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True when the range covers no rows.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.start, self.end)
    }
}

/// Reject a zero batch size before any I/O happens.
pub fn validate_batch_size(batch_size: usize) -> Result<NonZeroUsize, BatchError> {
    NonZeroUsize::new(batch_size).ok_or_else(|| {
        BatchError::InvalidArgument("batch size must be a positive number of rows".to_string())
    })
}

/// `ceil(total_rows / batch_size)`; zero rows yield zero batches.
pub fn batch_count(total_rows: usize, batch_size: NonZeroUsize) -> usize {
    total_rows.div_ceil(batch_size.get())
}

/// Carve `[0, total_rows)` into contiguous ranges of `batch_size` rows.
///
/// Every range but the last holds exactly `batch_size` rows; the last one may
/// be shorter. Ranges never overlap and their union is exactly `[0, total_rows)`.
pub fn plan_row_ranges(total_rows: usize, batch_size: NonZeroUsize) -> RowRanges {
    RowRanges {
        next: 0,
        total_rows,
        batch_size: batch_size.get(),
    }
}

/// Iterator returned by [`plan_row_ranges`].
#[derive(Clone, Debug)]
pub struct RowRanges {
    next: usize,
    total_rows: usize,
    batch_size: usize,
}

impl Iterator for RowRanges {
    type Item = RowRange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total_rows {
            return None;
        }
        let start = self.next;
        let end = start.saturating_add(self.batch_size).min(self.total_rows);
        self.next = end;
        Some(RowRange::new(start, end))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .total_rows
            .saturating_sub(self.next)
            .div_ceil(self.batch_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RowRanges {}
