// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Paragraph line-breaking and layout
//!
//! This library arranges a paragraph of styled text and embedded objects into
//! lines:
//!
//! -   A [`TextSource`] presents the paragraph as styled runs (see
//!     [`StyledText`] for a ready-made source).
//! -   A [`Renderer`] measures text, producing [`Segment`]s which fit a width
//!     ([`SimpleRenderer`] is a simple implementation).
//! -   A [`ParagraphBox`] owns the resulting boxes and lines. Layout follows
//!     Unicode line breaking (UAX #14) with backtracking and orders each line
//!     per the bidirectional algorithm (UAX #9).
//!
//! After an edit, [`ParagraphBox::relayout`] rebuilds only the lines around
//! the change when the remaining layout can be reused.
//!
//! ```
//! use para_layout::*;
//!
//! let text = StyledTextBuilder::new()
//!     .text("Hello world", CharProps::default())
//!     .build(Direction::Ltr)
//!     .unwrap();
//! let mut renderer = SimpleRenderer::new(FixedMetrics::new(CharMetrics::new(10, 8, 2)));
//! let mut diagnostics = Diagnostics::new();
//! let mut para = ParagraphBox::new(ParagraphStyle::default());
//! let cx = LayoutContext {
//!     source: &text,
//!     renderer: &mut renderer,
//!     objects: &mut NoObjects,
//!     diagnostics: &mut diagnostics,
//! };
//! para.layout(cx, 80).unwrap();
//! assert_eq!(para.num_lines(), 2);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod conv;

mod data;
pub use data::Range;

mod style;
pub use style::{Align, LineSpacing, ParagraphStyle, UpdateStyle};

mod source;
pub use source::{
    CharProps, Colors, Direction, EmbeddedObject, FamilyId, ObjectId, ObjectKind, PropFlags,
    RunMap, SourceError, StyledText, StyledTextBuilder, TextSource, Underline, VerticalOffset, WsId,
    HARD_LINE_BREAK, OBJECT_CHAR,
};

pub mod linebreak;

mod segment;
pub use segment::{count_gaps, SegFlags, Segment};

mod renderer;
#[cfg(feature = "ttf")]
pub use renderer::{FaceError, FaceMetrics};
pub use renderer::{
    BreakWeight, CharMetrics, ChildMode, Diagnostics, EndSeg, FixedMetrics, FixedObjects,
    MeasureError, Metrics, NoObjects, ObjectHost, ObjectMetrics, Renderer, SegmentRequest,
    SimpleRenderer, WsHandling,
};

mod boxes;
pub use boxes::{BoxArena, BoxId, BoxKind, LayoutBox, Line};

mod policy;
pub use policy::{policy_for, Inverted, LayoutPolicy, LinePlacement, Normal};

pub mod builder;

mod paragraph;
pub use paragraph::{
    LayoutContext, LayoutError, LayoutOutcome, ParagraphBox, Selection, SelectionId, TextDiff,
};
