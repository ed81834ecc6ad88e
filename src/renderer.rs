// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! The rendering engine contract
//!
//! The layout engine does not measure text itself. Instead it asks a
//! [`Renderer`] for the longest [`Segment`] of a range which fits some width,
//! and an [`ObjectHost`] to lay out embedded objects.

use crate::source::{CharProps, ObjectId, TextSource};
use crate::Segment;
use std::collections::HashMap;
use thiserror::Error;

mod simple;
pub use simple::{CharMetrics, FixedMetrics, Metrics, SimpleRenderer};

#[cfg(feature = "ttf")]
mod face;
#[cfg(feature = "ttf")]
pub use face::{FaceError, FaceMetrics};

/// Quality of a line break
///
/// Values are ordered from best to worst.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BreakWeight {
    /// Break after whitespace
    Ws,
    /// Break at a word boundary (e.g. after a hyphen)
    Word,
    /// Break within a word (hyphenation)
    Intra,
    /// Break between any two characters
    Letter,
    /// Break anywhere; at line start at least one character is taken even if
    /// it does not fit
    Clip,
}

/// How whitespace is segmented
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WsHandling {
    /// Whitespace and visible text in one segment
    #[default]
    Mixed,
    /// Stop before whitespace
    NoWs,
    /// Only whitespace
    OnlyWs,
}

/// Why a segment ended
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EndSeg {
    /// All text in the requested range fit
    NoMore,
    /// Ended before the range end at an acceptable break (e.g. font change)
    OkayBreak,
    /// Ended before the range end at a position where breaking is bad
    BadBreak,
    /// Ended at a change between whitespace and visible text
    WsBreak,
    /// Ended at a hard break or embedded object
    HardBreak,
    /// The line is full; more text remains for following lines
    MoreLines,
    /// Visible text fit; more whitespace follows
    MoreWhtsp,
}

/// Parameters of [`Renderer::find_break_point`]
#[derive(Clone, Debug)]
pub struct SegmentRequest<'a> {
    /// First rendered char
    pub ich_min: usize,
    /// Limit of the range which may be consumed
    pub ich_lim: usize,
    /// When backtracking, the segment must not extend beyond this
    pub ich_lim_backtrack: usize,
    /// The segment must end at a valid break of weight at most `lb_max`
    pub need_final_break: bool,
    /// The segment will start a line
    pub start_line: bool,
    /// Maximum width (excluding trailing whitespace)
    pub max_width: i32,
    /// Preferred break weight
    pub lb_pref: BreakWeight,
    /// Worst acceptable break weight
    pub lb_max: BreakWeight,
    pub ws: WsHandling,
    /// Paragraph direction is right-to-left
    pub para_rtl: bool,
    /// Preceding segment on the line, for context
    pub prev: Option<&'a Segment>,
}

/// Measurement failure
///
/// Failures are recorded in [`Diagnostics`]; layout continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeasureError {
    #[error("range {0}..{1} is out of bounds")]
    OutOfRange(usize, usize),
    #[error("no layout for object {0:?}")]
    UnknownObject(ObjectId),
    #[error("rendering failed: {0}")]
    Failed(String),
}

/// A text measurement and segmentation engine
pub trait Renderer {
    /// Called once before a layout pass over `source`
    ///
    /// Implementations may build caches here; these live until
    /// [`Self::end_layout`].
    fn begin_layout(&mut self, source: &dyn TextSource) {
        let _ = source;
    }

    /// Called once after a layout pass
    fn end_layout(&mut self) {}

    /// Produce the longest segment of `req.ich_min..req.ich_lim` which fits
    ///
    /// Returns `Ok(None)` when nothing fits at an acceptable break.
    fn find_break_point(
        &mut self,
        source: &dyn TextSource,
        req: &SegmentRequest<'_>,
    ) -> Result<Option<Segment>, MeasureError>;

    /// Width of an ellipsis rendered with `props`
    fn ellipsis_width(&mut self, props: &CharProps) -> i32;
}

/// Whether an embedded object is being laid out for the first time
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChildMode {
    /// Full layout: measure from scratch
    Fresh,
    /// Partial relayout: a previous measurement may be reused
    Relayout,
}

/// Size of a laid-out embedded object
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObjectMetrics {
    pub width: i32,
    pub ascent: i32,
    pub descent: i32,
}

/// Lays out embedded objects of kind [`Pile`](crate::ObjectKind::Pile)
pub trait ObjectHost {
    fn layout_child(
        &mut self,
        object: ObjectId,
        max_width: i32,
        mode: ChildMode,
    ) -> Result<ObjectMetrics, MeasureError>;
}

/// An [`ObjectHost`] for text without piles
#[derive(Clone, Copy, Debug, Default)]
pub struct NoObjects;

impl ObjectHost for NoObjects {
    fn layout_child(
        &mut self,
        object: ObjectId,
        _: i32,
        _: ChildMode,
    ) -> Result<ObjectMetrics, MeasureError> {
        Err(MeasureError::UnknownObject(object))
    }
}

/// An [`ObjectHost`] with fixed object sizes
///
/// Objects wider than the available width are narrowed to it.
#[derive(Clone, Debug, Default)]
pub struct FixedObjects {
    objects: HashMap<ObjectId, ObjectMetrics>,
    fresh_layouts: usize,
}

impl FixedObjects {
    /// Construct an empty host
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object
    pub fn insert(&mut self, id: ObjectId, metrics: ObjectMetrics) {
        self.objects.insert(id, metrics);
    }

    /// Number of [`ChildMode::Fresh`] layouts performed
    pub fn fresh_layouts(&self) -> usize {
        self.fresh_layouts
    }
}

impl ObjectHost for FixedObjects {
    fn layout_child(
        &mut self,
        object: ObjectId,
        max_width: i32,
        mode: ChildMode,
    ) -> Result<ObjectMetrics, MeasureError> {
        if mode == ChildMode::Fresh {
            self.fresh_layouts += 1;
        }
        let mut metrics = *self
            .objects
            .get(&object)
            .ok_or(MeasureError::UnknownObject(object))?;
        metrics.width = metrics.width.min(max_width);
        Ok(metrics)
    }
}

/// Failures recorded during layout
///
/// This belongs to the root layout context; errors are recorded rather than
/// interrupting layout.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    errors: Vec<(usize, MeasureError)>,
}

impl Diagnostics {
    /// Construct an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error at rendered char `ich`
    pub fn record(&mut self, ich: usize, error: MeasureError) {
        log::warn!("layout: measurement failed at {ich}: {error}");
        self.errors.push((ich, error));
    }

    /// Recorded errors, with the rendered char at which each occurred
    pub fn errors(&self) -> &[(usize, MeasureError)] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }
}
