// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Text run sources
//!
//! A [`TextSource`] presents a paragraph as a sequence of styled runs. Two
//! index spaces are used:
//!
//! -   *logical* indices, as stored (including hidden text and multi-char
//!     object data), and
//! -   *rendered* indices, as seen by a [`Renderer`](crate::Renderer).
//!
//! All layout arithmetic uses rendered indices. Conversion happens only at
//! box and selection boundaries.

use crate::Range;
use bitflags::bitflags;
use unicode_bidi::Level;

mod styled;
pub use styled::{Direction, SourceError, StyledText, StyledTextBuilder};

/// The object replacement character, used to render embedded objects
pub const OBJECT_CHAR: char = '\u{FFFC}';

/// A literal hard line break (Unicode LINE SEPARATOR)
pub const HARD_LINE_BREAK: char = '\u{2028}';

/// Abstraction over a paragraph's styled runs
///
/// This is a pure query interface. Callers must never query beyond
/// [`Self::cch_ren`], except that `char_props(0)` is valid on empty text.
pub trait TextSource {
    /// Number of rendered characters
    fn cch_ren(&self) -> usize;

    /// Number of logical characters
    fn cch_log(&self) -> usize;

    /// Number of runs
    fn num_runs(&self) -> usize;

    /// Properties of the rendered char at `ich` and the bounds of its run
    fn char_props(&self, ich: usize) -> (CharProps, Range);

    /// The rendered char at `ich`
    fn char_at(&self, ich: usize) -> char;

    /// The embedded object rendered at `ich`, if any
    fn object_at(&self, ich: usize) -> Option<EmbeddedObject> {
        let _ = ich;
        None
    }

    /// Convert a logical index to a rendered index
    ///
    /// A logical index within hidden text maps to the next rendered char.
    fn log_to_ren(&self, ich: usize) -> usize;

    /// Convert a rendered index to a logical index
    fn ren_to_log(&self, ich: usize) -> usize;

    /// The paragraph's base embedding level
    fn base_level(&self) -> Level;
}

/// Writing system identifier
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WsId(pub u32);

/// Font family identifier
///
/// Fonts are resolved by the renderer; the layout engine treats this as an
/// opaque handle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FamilyId(pub u32);

/// Embedded object identifier
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

bitflags! {
    /// Font selection flags
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PropFlags: u8 {
        /// Bold weight
        const BOLD = 1 << 0;
        /// Italic style
        const ITALIC = 1 << 1;
    }
}

/// Vertical offset of text
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum VerticalOffset {
    #[default]
    None,
    Superscript,
    Subscript,
}

/// Underline style
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
    Dotted,
    Dashed,
    Squiggle,
    Strikethrough,
}

/// Colours, as `0xRRGGBBAA`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Colors {
    pub fore: u32,
    pub back: u32,
    pub underline: u32,
}

impl Default for Colors {
    fn default() -> Self {
        Colors {
            fore: 0x000000FF,
            back: 0,
            underline: 0x000000FF,
        }
    }
}

/// Rendering properties of a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharProps {
    pub family: FamilyId,
    /// Font size in milli-points
    pub size: i32,
    pub flags: PropFlags,
    pub offset: VerticalOffset,
    pub colors: Colors,
    pub underline: Underline,
    pub ws: WsId,
    /// Bidi embedding level
    ///
    /// This is assigned by the source from bidi analysis; any value given on
    /// construction is replaced.
    pub level: Level,
}

impl Default for CharProps {
    fn default() -> Self {
        CharProps {
            family: FamilyId::default(),
            size: 10_000,
            flags: PropFlags::empty(),
            offset: VerticalOffset::None,
            colors: Colors::default(),
            underline: Underline::None,
            ws: WsId::default(),
            level: Level::ltr(),
        }
    }
}

impl CharProps {
    /// Construct with the given writing system and size
    pub fn new(ws: WsId, size: i32) -> Self {
        CharProps {
            ws,
            size,
            ..Default::default()
        }
    }
}

/// An object embedded in the text
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EmbeddedObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
}

/// How an embedded object is laid out
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A picture of intrinsic size, scaled down to fit the line
    Picture { width: i32, ascent: i32, descent: i32 },
    /// A nested box laid out by the host (see [`crate::ObjectHost`])
    Pile,
}

/// Run bounds and properties of a source, in rendered chars
///
/// A layout records this for its text. A later layout of edited text may only
/// reuse boxes over spans where both agree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunMap(Vec<(Range, CharProps)>);

impl RunMap {
    /// Read the runs of `source`
    pub fn new(source: &dyn TextSource) -> Self {
        let len = source.cch_ren();
        let mut runs = Vec::with_capacity(source.num_runs());
        let mut ich = 0;
        while ich < len {
            let (props, run) = source.char_props(ich);
            let end = run.end().clamp(ich + 1, len);
            runs.push((Range::from(ich..end), props));
            ich = end;
        }
        RunMap(runs)
    }

    /// True if any run has a right-to-left level
    pub fn has_rtl(&self) -> bool {
        self.0.iter().any(|(_, props)| props.level.is_rtl())
    }

    fn before(&self, end: usize) -> impl Iterator<Item = (usize, usize, &CharProps)> + '_ {
        self.0
            .iter()
            .filter(move |(run, _)| run.start() < end)
            .map(move |(run, props)| (run.start(), run.end().min(end), props))
    }

    fn after(&self, start: usize) -> impl Iterator<Item = (usize, usize, &CharProps)> + '_ {
        self.0
            .iter()
            .filter(move |(run, _)| run.end() > start)
            .map(move |(run, props)| (run.start().max(start) - start, run.end() - start, props))
    }

    /// True if both agree on chars `0..end`
    pub fn same_before(&self, other: &RunMap, end: usize) -> bool {
        self.before(end).eq(other.before(end))
    }

    /// True if chars from `start` agree with chars of `other` from `other_start`
    pub fn same_after(&self, start: usize, other: &RunMap, other_start: usize) -> bool {
        self.after(start).eq(other.after(other_start))
    }
}
