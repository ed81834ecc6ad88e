// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Segments: measured, breakable units of text

use crate::conv::to_u32;
use crate::renderer::{EndSeg, WsHandling};
use crate::Range;
use bitflags::bitflags;
use unicode_bidi::Level;

bitflags! {
    /// Mutable state of a [`Segment`]
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SegFlags: u8 {
        /// The segment is physically first on its line
        const START_LINE = 1 << 0;
        /// The segment is physically last on its line
        ///
        /// Trailing whitespace is excluded from the width while this is set.
        const END_LINE = 1 << 1;
        /// A line may end after this segment
        const CAN_END_LINE = 1 << 2;
        /// The segment contains only whitespace
        const WS_ONLY = 1 << 3;
        /// The segment was added by the layout engine to absorb whitespace
        /// following a line
        const SYNTHETIC = 1 << 4;
    }
}

/// A renderer-produced segment of text
///
/// A segment covers part or all of one run. It knows its own display width,
/// ascent and descent, and why it ended ([`EndSeg`]).
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    range: Range,
    advance: i32,
    trailing_ws: i32,
    ascent: i32,
    descent: i32,
    level: Level,
    end: EndSeg,
    ws: WsHandling,
    flags: SegFlags,
    /// Whitespace chars before the last visible char
    interior_gaps: u32,
    /// Whitespace chars after the last visible char
    trailing_gaps: u32,
    stretch: i32,
}

impl Segment {
    /// Construct
    ///
    /// `advance` includes trailing whitespace, of width `trailing_ws`.
    pub fn new(
        range: Range,
        advance: i32,
        trailing_ws: i32,
        (ascent, descent): (i32, i32),
        level: Level,
        end: EndSeg,
    ) -> Self {
        Segment {
            range,
            advance,
            trailing_ws,
            ascent,
            descent,
            level,
            end,
            ws: WsHandling::Mixed,
            flags: SegFlags::CAN_END_LINE,
            interior_gaps: 0,
            trailing_gaps: 0,
            stretch: 0,
        }
    }

    /// Construct a zero-width segment at `ich`
    pub fn empty(ich: usize, (ascent, descent): (i32, i32), level: Level, end: EndSeg) -> Self {
        Segment::new(Range::empty(ich), 0, 0, (ascent, descent), level, end)
    }

    /// Set whether a line may end after this segment
    pub fn with_can_end_line(mut self, can_end: bool) -> Self {
        self.flags.set(SegFlags::CAN_END_LINE, can_end);
        self
    }

    /// Set the whitespace handling used to produce this segment
    pub fn with_ws(mut self, ws: WsHandling) -> Self {
        self.ws = ws;
        self.flags.set(SegFlags::WS_ONLY, ws == WsHandling::OnlyWs);
        self
    }

    /// Set justification opportunities: `(interior, trailing)` whitespace counts
    pub fn with_gaps(mut self, interior: u32, trailing: u32) -> Self {
        self.interior_gaps = interior;
        self.trailing_gaps = trailing;
        self
    }

    /// Rendered char range
    #[inline]
    pub fn range(&self) -> Range {
        self.range
    }

    /// First rendered char
    #[inline]
    pub fn ich_min(&self) -> usize {
        self.range.start()
    }

    /// End of the rendered range
    #[inline]
    pub fn ich_lim(&self) -> usize {
        self.range.end()
    }

    /// Number of rendered chars consumed
    #[inline]
    pub fn cch(&self) -> usize {
        self.range.len()
    }

    /// Display width
    ///
    /// Trailing whitespace is excluded only while [`SegFlags::END_LINE`] is
    /// set. Justification stretch is included.
    pub fn width(&self) -> i32 {
        let width = match self.flags.contains(SegFlags::END_LINE) {
            true => self.advance - self.trailing_ws,
            false => self.advance,
        };
        width + self.stretch
    }

    /// Width of the segment when at the end of a line, excluding stretch
    pub fn visible_width(&self) -> i32 {
        self.advance - self.trailing_ws
    }

    /// Ascent above the baseline
    #[inline]
    pub fn ascent(&self) -> i32 {
        self.ascent
    }

    /// Descent below the baseline
    #[inline]
    pub fn descent(&self) -> i32 {
        self.descent
    }

    /// Total height
    #[inline]
    pub fn height(&self) -> i32 {
        self.ascent + self.descent
    }

    /// Bidi embedding level
    #[inline]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Why the renderer ended this segment
    #[inline]
    pub fn end(&self) -> EndSeg {
        self.end
    }

    /// Whitespace handling used to produce this segment
    #[inline]
    pub fn ws(&self) -> WsHandling {
        self.ws
    }

    #[inline]
    pub fn flags(&self) -> SegFlags {
        self.flags
    }

    /// True if a line may end after this segment
    #[inline]
    pub fn can_end_line(&self) -> bool {
        self.flags.contains(SegFlags::CAN_END_LINE)
    }

    #[inline]
    pub fn is_ws_only(&self) -> bool {
        self.flags.contains(SegFlags::WS_ONLY)
    }

    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.flags.contains(SegFlags::SYNTHETIC)
    }

    #[inline]
    pub fn is_end_line(&self) -> bool {
        self.flags.contains(SegFlags::END_LINE)
    }

    #[inline]
    pub fn is_start_line(&self) -> bool {
        self.flags.contains(SegFlags::START_LINE)
    }

    pub fn set_end_line(&mut self, end: bool) {
        self.flags.set(SegFlags::END_LINE, end);
    }

    pub fn set_start_line(&mut self, start: bool) {
        self.flags.set(SegFlags::START_LINE, start);
    }

    pub(crate) fn set_synthetic(&mut self) {
        self.flags.insert(SegFlags::SYNTHETIC);
    }

    /// Number of justification opportunities given the current flags
    pub fn gaps(&self) -> u32 {
        match self.is_end_line() {
            true => self.interior_gaps,
            false => self.interior_gaps + self.trailing_gaps,
        }
    }

    /// Set extra width added by justification
    pub fn set_stretch(&mut self, stretch: i32) {
        self.stretch = stretch;
    }

    #[inline]
    pub fn stretch(&self) -> i32 {
        self.stretch
    }

    /// Take the hard-break char following this segment into its range
    ///
    /// The char has no width. Afterwards the segment can end a line.
    pub fn absorb_break_char(&mut self) {
        self.range.end += 1;
        self.flags.insert(SegFlags::CAN_END_LINE);
    }

    /// Shift the character range by `delta`
    pub(crate) fn shift(&mut self, delta: isize) {
        self.range = self.range.shifted(delta);
    }

    /// Override the level (used for trailing whitespace, UAX #9 rule L1)
    pub(crate) fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    /// Override the end classification
    pub(crate) fn set_end(&mut self, end: EndSeg) {
        self.end = end;
    }
}

impl Default for Segment {
    fn default() -> Self {
        Segment::empty(0, (0, 0), Level::ltr(), EndSeg::NoMore)
    }
}

/// Count `(interior, trailing)` whitespace in `chars`
pub fn count_gaps(chars: impl DoubleEndedIterator<Item = char> + Clone) -> (u32, u32) {
    let trailing = chars.clone().rev().take_while(|c| c.is_whitespace()).count();
    let total = chars.filter(|c| c.is_whitespace()).count();
    (to_u32(total - trailing), to_u32(trailing))
}
