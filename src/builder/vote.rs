// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Ascent vote for exact line spacing

use crate::conv::mul_div;
use easy_cast::Conv;
use smallvec::SmallVec;

/// Ascent used with exact line spacing before any segment is seen, in percent
pub const DEFAULT_ASCENT_PERCENT: u8 = 80;

/// Plurality vote over ascent-to-height ratios
///
/// With [`LineSpacing::Exact`](crate::LineSpacing::Exact) every line has the
/// same height; the ascent share of that height is the ratio seen most often
/// across all segments laid out so far. Ties go to the ratio seen first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AscentVote {
    tallies: SmallVec<[(u8, u32); 4]>,
}

impl AscentVote {
    /// Construct an empty vote
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a segment; zero-height segments are ignored
    pub fn add(&mut self, ascent: i32, descent: i32) {
        let height = ascent + descent;
        if height <= 0 {
            return;
        }
        let pct = u8::conv(mul_div(ascent, 100, height).clamp(0, 100));
        match self.tallies.iter_mut().find(|(p, _)| *p == pct) {
            Some((_, count)) => *count += 1,
            None => self.tallies.push((pct, 1)),
        }
    }

    /// The winning percentage, if any vote was cast
    pub fn winner(&self) -> Option<u8> {
        let mut best: Option<(u8, u32)> = None;
        for &(pct, count) in &self.tallies {
            if best.map(|(_, c)| count > c).unwrap_or(true) {
                best = Some((pct, count));
            }
        }
        best.map(|(pct, _)| pct)
    }

    /// The winning percentage or [`DEFAULT_ASCENT_PERCENT`]
    pub fn percent(&self) -> u8 {
        self.winner().unwrap_or(DEFAULT_ASCENT_PERCENT)
    }

    pub fn clear(&mut self) {
        self.tallies.clear();
    }
}
