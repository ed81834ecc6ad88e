// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Simple data types

use crate::conv::{to_u32, to_usize};

/// Range type
///
/// Essentially this is just a `std::ops::Range<u32>`, but with convenient
/// implementations. Character ranges in boxes, segments and lines all use
/// this type.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub start: u32,
    pub end: u32,
}

impl Range {
    /// Construct an empty range at `index`
    #[inline]
    pub fn empty(index: usize) -> Self {
        let i = to_u32(index);
        Range { start: i, end: i }
    }

    /// The start, as `usize`
    #[inline]
    pub fn start(self) -> usize {
        to_usize(self.start)
    }

    /// The end, as `usize`
    #[inline]
    pub fn end(self) -> usize {
        to_usize(self.end)
    }

    /// Number of indices covered
    #[inline]
    pub fn len(self) -> usize {
        to_usize(self.end - self.start)
    }

    /// True if the range is empty
    #[inline]
    pub fn is_empty(self) -> bool {
        self.start >= self.end
    }

    /// True if `start <= index < end`
    #[inline]
    pub fn includes(self, index: usize) -> bool {
        self.start() <= index && index < self.end()
    }

    /// Shift both ends by `delta`
    ///
    /// Panics (debug builds) if the result would be negative.
    pub fn shifted(self, delta: isize) -> Self {
        let shift = |x: u32| to_u32(to_usize(x).checked_add_signed(delta).unwrap_or(0));
        Range {
            start: shift(self.start),
            end: shift(self.end),
        }
    }

    /// Convert to a standard range
    #[inline]
    pub fn to_std(self) -> std::ops::Range<usize> {
        self.start()..self.end()
    }
}

impl From<std::ops::Range<usize>> for Range {
    #[inline]
    fn from(range: std::ops::Range<usize>) -> Range {
        Range {
            start: to_u32(range.start),
            end: to_u32(range.end),
        }
    }
}

impl From<Range> for std::ops::Range<usize> {
    #[inline]
    fn from(range: Range) -> std::ops::Range<usize> {
        range.to_std()
    }
}
