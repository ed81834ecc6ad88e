// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Boxes and lines
//!
//! Boxes live in a [`BoxArena`] and are addressed by [`BoxId`]. A paragraph's
//! chain is a list of box identifiers in logical order; a [`Line`] is a range
//! over that list.

use crate::conv::{to_u32, to_usize};
use crate::renderer::ObjectMetrics;
use crate::source::ObjectId;
use crate::{Range, Segment};
use std::ops::Index;
use unicode_bidi::Level;

/// Handle to a box in a [`BoxArena`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoxId(u32);

impl BoxId {
    /// Index in the arena
    #[inline]
    pub fn get(self) -> usize {
        to_usize(self.0)
    }
}

/// Content of a box
#[derive(Clone, Debug, PartialEq)]
pub enum BoxKind {
    /// A string box: owns exactly one segment
    Text(Segment),
    /// An embedded picture
    Picture(ObjectId),
    /// An embedded object laid out by the host
    Pile(ObjectId),
    /// A trailing ellipsis indicating truncated content
    Ellipsis,
}

impl BoxKind {
    fn freelist(&self) -> usize {
        match self {
            BoxKind::Text(_) | BoxKind::Ellipsis => 0,
            BoxKind::Picture(_) => 1,
            BoxKind::Pile(_) => 2,
        }
    }
}

/// A positioned layout unit
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutBox {
    kind: BoxKind,
    range: Range,
    left: i32,
    top: i32,
    width: i32,
    ascent: i32,
    descent: i32,
    level: Level,
}

impl LayoutBox {
    /// Construct a string box
    pub fn text(seg: Segment) -> Self {
        let mut b = LayoutBox {
            kind: BoxKind::Text(seg),
            range: Range::empty(0),
            left: 0,
            top: 0,
            width: 0,
            ascent: 0,
            descent: 0,
            level: Level::ltr(),
        };
        b.refresh();
        b
    }

    /// Construct a box for an embedded object at rendered char `ich`
    pub fn object(kind: BoxKind, ich: usize, metrics: ObjectMetrics, level: Level) -> Self {
        debug_assert!(matches!(kind, BoxKind::Picture(_) | BoxKind::Pile(_)));
        LayoutBox {
            kind,
            range: Range::from(ich..ich + 1),
            left: 0,
            top: 0,
            width: metrics.width,
            ascent: metrics.ascent,
            descent: metrics.descent,
            level,
        }
    }

    /// Construct an ellipsis box at rendered char `ich`
    pub fn ellipsis(ich: usize, width: i32, (ascent, descent): (i32, i32), level: Level) -> Self {
        LayoutBox {
            kind: BoxKind::Ellipsis,
            range: Range::empty(ich),
            left: 0,
            top: 0,
            width,
            ascent,
            descent,
            level,
        }
    }

    #[inline]
    pub fn kind(&self) -> &BoxKind {
        &self.kind
    }

    /// The segment of a string box
    #[inline]
    pub fn segment(&self) -> Option<&Segment> {
        match &self.kind {
            BoxKind::Text(seg) => Some(seg),
            _ => None,
        }
    }

    /// Mutable access to the segment; call [`Self::refresh`] afterwards
    #[inline]
    pub(crate) fn segment_mut(&mut self) -> Option<&mut Segment> {
        match &mut self.kind {
            BoxKind::Text(seg) => Some(seg),
            _ => None,
        }
    }

    /// Re-read range and metrics from the segment (string boxes only)
    pub(crate) fn refresh(&mut self) {
        if let BoxKind::Text(seg) = &self.kind {
            self.range = seg.range();
            self.width = seg.width();
            self.ascent = seg.ascent();
            self.descent = seg.descent();
            self.level = seg.level();
        }
    }

    /// Rendered char range
    #[inline]
    pub fn range(&self) -> Range {
        self.range
    }

    /// Left edge, relative to the paragraph
    #[inline]
    pub fn left(&self) -> i32 {
        self.left
    }

    /// Top edge, relative to the paragraph
    #[inline]
    pub fn top(&self) -> i32 {
        self.top
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    #[inline]
    pub fn ascent(&self) -> i32 {
        self.ascent
    }

    #[inline]
    pub fn descent(&self) -> i32 {
        self.descent
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.ascent + self.descent
    }

    /// Vertical position of the baseline
    #[inline]
    pub fn baseline(&self) -> i32 {
        self.top + self.ascent
    }

    /// Bidi embedding level
    #[inline]
    pub fn level(&self) -> Level {
        self.level
    }

    pub(crate) fn set_level(&mut self, level: Level) {
        self.level = level;
        if let BoxKind::Text(seg) = &mut self.kind {
            seg.set_level(level);
        }
    }

    pub(crate) fn set_position(&mut self, left: i32, top: i32) {
        self.left = left;
        self.top = top;
    }

    /// Move down by `dy` and shift the char range by `delta`
    pub(crate) fn shift(&mut self, dy: i32, delta: isize) {
        self.top += dy;
        self.range = self.range.shifted(delta);
        if let BoxKind::Text(seg) = &mut self.kind {
            seg.shift(delta);
        }
    }
}

/// Storage for boxes, with per-kind freelists
///
/// Released boxes are recycled by later allocations of the same kind (string
/// and ellipsis boxes share a list).
#[derive(Clone, Debug, Default)]
pub struct BoxArena {
    boxes: Vec<LayoutBox>,
    free: [Vec<BoxId>; 3],
}

impl BoxArena {
    /// Construct an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a box, recycling a released one of the same kind if possible
    pub fn alloc(&mut self, b: LayoutBox) -> BoxId {
        if let Some(id) = self.free[b.kind.freelist()].pop() {
            self.boxes[id.get()] = b;
            id
        } else {
            let id = BoxId(to_u32(self.boxes.len()));
            self.boxes.push(b);
            id
        }
    }

    /// Return a box to its freelist
    ///
    /// The identifier must not be used again until returned by [`Self::alloc`].
    pub fn release(&mut self, id: BoxId) {
        let list = &mut self.free[self.boxes[id.get()].kind.freelist()];
        debug_assert!(!list.contains(&id));
        list.push(id);
    }

    /// Access a box
    pub fn get(&self, id: BoxId) -> Option<&LayoutBox> {
        self.boxes.get(id.get())
    }

    pub(crate) fn get_mut(&mut self, id: BoxId) -> &mut LayoutBox {
        &mut self.boxes[id.get()]
    }

    /// Number of allocated boxes, including released ones
    pub fn capacity(&self) -> usize {
        self.boxes.len()
    }

    /// Number of boxes currently on freelists
    pub fn num_free(&self) -> usize {
        self.free.iter().map(|list| list.len()).sum()
    }

    /// Number of boxes in use
    pub fn num_live(&self) -> usize {
        self.capacity() - self.num_free()
    }
}

impl Index<BoxId> for BoxArena {
    type Output = LayoutBox;

    fn index(&self, id: BoxId) -> &LayoutBox {
        &self.boxes[id.get()]
    }
}

/// A line of boxes sharing one baseline
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Line {
    pub(crate) boxes: Range,
    pub(crate) text: Range,
    pub(crate) top: i32,
    pub(crate) baseline: i32,
    pub(crate) bottom: i32,
    pub(crate) left: i32,
    pub(crate) right: i32,
    pub(crate) hard_break: bool,
    pub(crate) ellipsis: bool,
    pub(crate) rtl: bool,
}

impl Line {
    /// Range of the paragraph's chain covered by this line
    #[inline]
    pub fn boxes(&self) -> Range {
        self.boxes
    }

    /// Rendered char range (including any absorbed hard-break char)
    #[inline]
    pub fn text(&self) -> Range {
        self.text
    }

    #[inline]
    pub fn top(&self) -> i32 {
        self.top
    }

    #[inline]
    pub fn baseline(&self) -> i32 {
        self.baseline
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.bottom
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Left edge of content
    #[inline]
    pub fn left(&self) -> i32 {
        self.left
    }

    /// Right edge of content
    #[inline]
    pub fn right(&self) -> i32 {
        self.right
    }

    /// True if the line ended at a hard break
    #[inline]
    pub fn hard_break(&self) -> bool {
        self.hard_break
    }

    /// True if the line ends with an ellipsis box
    #[inline]
    pub fn ellipsis(&self) -> bool {
        self.ellipsis
    }

    /// True if the paragraph direction is right-to-left
    #[inline]
    pub fn is_rtl(&self) -> bool {
        self.rtl
    }

    /// Move down by `dy`, shift text by `delta` and boxes by `dbox`
    pub(crate) fn shift(&mut self, dy: i32, delta: isize, dbox: isize) {
        self.top += dy;
        self.baseline += dy;
        self.bottom += dy;
        self.text = self.text.shifted(delta);
        self.boxes = self.boxes.shifted(dbox);
    }
}
