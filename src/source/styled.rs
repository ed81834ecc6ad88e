// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! A styled text source: breaking text into runs by format and bidi level

use super::{CharProps, EmbeddedObject, ObjectId, TextSource, OBJECT_CHAR};
use crate::conv::{to_u32, to_usize};
use crate::Range;
use thiserror::Error;
use unicode_bidi::{BidiInfo, Level, LTR_LEVEL, RTL_LEVEL};

/// Invalid input to [`StyledTextBuilder`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SourceError {
    #[error("object {0:?} is embedded more than once")]
    DuplicateObject(ObjectId),
    #[error("object {0:?} has no logical representation")]
    EmptyObject(ObjectId),
}

/// Directionality of a paragraph
///
/// This determines the base embedding level used in bidi analysis.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Auto-detect from the first strong character, defaulting to left-to-right
    #[default]
    Auto,
    /// Auto-detect from the first strong character, defaulting to right-to-left
    AutoRtl,
    /// Left-to-right
    Ltr,
    /// Right-to-left
    Rtl,
}

#[derive(Clone, Debug)]
enum Piece {
    Text {
        text: String,
        props: CharProps,
        hidden: bool,
    },
    Object {
        object: EmbeddedObject,
        props: CharProps,
        log_len: u32,
    },
}

impl Piece {
    fn props(&self) -> &CharProps {
        match self {
            Piece::Text { props, .. } | Piece::Object { props, .. } => props,
        }
    }
}

/// Builder for [`StyledText`]
///
/// Pieces are appended in logical order.
/// ```
/// # use para_layout::{CharProps, StyledTextBuilder, Direction};
/// let text = StyledTextBuilder::new()
///     .text("Hello ", CharProps::default())
///     .text("world", CharProps::default())
///     .build(Direction::Ltr)
///     .unwrap();
/// ```
#[derive(Clone, Debug, Default)]
pub struct StyledTextBuilder {
    pieces: Vec<Piece>,
}

impl StyledTextBuilder {
    /// Construct an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append visible text
    pub fn text(mut self, text: &str, props: CharProps) -> Self {
        self.pieces.push(Piece::Text {
            text: text.to_string(),
            props,
            hidden: false,
        });
        self
    }

    /// Append hidden text
    ///
    /// Hidden text occupies logical indices but is not rendered.
    pub fn hidden(mut self, text: &str, props: CharProps) -> Self {
        self.pieces.push(Piece::Text {
            text: text.to_string(),
            props,
            hidden: true,
        });
        self
    }

    /// Append an embedded object
    ///
    /// The object occupies `log_len` logical characters (its stored data) and
    /// a single rendered [`OBJECT_CHAR`].
    pub fn object(mut self, object: EmbeddedObject, props: CharProps, log_len: u32) -> Self {
        self.pieces.push(Piece::Object {
            object,
            props,
            log_len,
        });
        self
    }

    /// Resolve runs and bidi levels
    pub fn build(self, direction: Direction) -> Result<StyledText, SourceError> {
        let mut ren = Vec::new();
        let mut ren_to_log = Vec::new();
        let mut objects: Vec<(u32, EmbeddedObject)> = Vec::new();
        let mut spans = Vec::with_capacity(self.pieces.len());
        let mut log = 0u32;

        for piece in &self.pieces {
            let start = ren.len();
            match piece {
                Piece::Text { text, hidden, .. } => {
                    for c in text.chars() {
                        if !hidden {
                            ren_to_log.push(log);
                            ren.push(c);
                        }
                        log += 1;
                    }
                }
                Piece::Object {
                    object, log_len, ..
                } => {
                    if *log_len == 0 {
                        return Err(SourceError::EmptyObject(object.id));
                    }
                    if objects.iter().any(|(_, o)| o.id == object.id) {
                        return Err(SourceError::DuplicateObject(object.id));
                    }
                    objects.push((to_u32(start), *object));
                    ren_to_log.push(log);
                    ren.push(OBJECT_CHAR);
                    log += log_len;
                }
            }
            if ren.len() > start {
                spans.push((Range::from(start..ren.len()), piece.props()));
            }
        }
        ren_to_log.push(log);

        let text: String = ren.iter().collect();
        let base_level = base_level(&text, direction);
        let info = BidiInfo::new(&text, Some(base_level));
        let levels: Vec<Level> = text.char_indices().map(|(i, _)| info.levels[i]).collect();

        let mut runs = Vec::with_capacity(spans.len());
        for (range, props) in spans {
            let mut start = range.start();
            for i in range.start() + 1..range.end() {
                if levels[i] != levels[start] {
                    runs.push(Run::new(start..i, props, levels[start]));
                    start = i;
                }
            }
            runs.push(Run::new(start..range.end(), props, levels[start]));
        }

        // Empty text still needs a run to supply metrics.
        if runs.is_empty() {
            if let Some(piece) = self.pieces.first() {
                runs.push(Run::new(0..0, piece.props(), base_level));
            }
        }

        Ok(StyledText {
            ren,
            runs,
            ren_to_log,
            cch_log: to_usize(log),
            objects,
            base_level,
        })
    }
}

fn base_level(text: &str, direction: Direction) -> Level {
    let (is_auto, is_rtl) = match direction {
        Direction::Ltr => (false, false),
        Direction::Rtl => (false, true),
        Direction::Auto => (true, false),
        Direction::AutoRtl => (true, true),
    };

    let is_rtl = match is_auto {
        false => is_rtl,
        true => match unicode_bidi::get_base_direction(text) {
            unicode_bidi::Direction::Ltr => false,
            unicode_bidi::Direction::Rtl => true,
            unicode_bidi::Direction::Mixed => is_rtl,
        },
    };

    match is_rtl {
        false => LTR_LEVEL,
        true => RTL_LEVEL,
    }
}

#[derive(Clone, Debug)]
struct Run {
    range: Range,
    props: CharProps,
}

impl Run {
    fn new(range: std::ops::Range<usize>, props: &CharProps, level: Level) -> Self {
        let mut props = props.clone();
        props.level = level;
        Run {
            range: range.into(),
            props,
        }
    }
}

/// A paragraph of styled text
///
/// Construct with [`StyledTextBuilder`].
#[derive(Clone, Debug)]
pub struct StyledText {
    ren: Vec<char>,
    runs: Vec<Run>,
    /// Logical index of each rendered char, plus the logical length
    ren_to_log: Vec<u32>,
    cch_log: usize,
    objects: Vec<(u32, EmbeddedObject)>,
    base_level: Level,
}

impl StyledText {
    /// The rendered text
    pub fn rendered(&self) -> String {
        self.ren.iter().collect()
    }

    /// The rendered text in `range`
    pub fn rendered_slice(&self, range: Range) -> String {
        self.ren[range.to_std()].iter().collect()
    }

    fn run_index(&self, ich: usize) -> usize {
        let index = self.runs.partition_point(|run| run.range.end() <= ich);
        index.min(self.runs.len().saturating_sub(1))
    }
}

impl TextSource for StyledText {
    fn cch_ren(&self) -> usize {
        self.ren.len()
    }

    fn cch_log(&self) -> usize {
        self.cch_log
    }

    fn num_runs(&self) -> usize {
        self.runs.len()
    }

    fn char_props(&self, ich: usize) -> (CharProps, Range) {
        debug_assert!(ich <= self.ren.len());
        match self.runs.get(self.run_index(ich)) {
            Some(run) => (run.props.clone(), run.range),
            None => (CharProps::default(), Range::empty(0)),
        }
    }

    fn char_at(&self, ich: usize) -> char {
        self.ren[ich]
    }

    fn object_at(&self, ich: usize) -> Option<EmbeddedObject> {
        let ich = to_u32(ich);
        self.objects
            .binary_search_by_key(&ich, |(i, _)| *i)
            .ok()
            .map(|i| self.objects[i].1)
    }

    fn log_to_ren(&self, ich: usize) -> usize {
        let len = self.ren.len();
        self.ren_to_log[..len].partition_point(|&log| to_usize(log) < ich)
    }

    fn ren_to_log(&self, ich: usize) -> usize {
        to_usize(self.ren_to_log[ich.min(self.ren.len())])
    }

    fn base_level(&self) -> Level {
        self.base_level
    }
}
