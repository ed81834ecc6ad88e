// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Paragraph style: the configuration of one layout call

/// Style in which a paragraph is laid out
///
/// A `ParagraphStyle` can be default-constructed (leading alignment, natural
/// line spacing, no indents and no line limit).
///
/// All lengths are in the internal layout unit (see [`crate::conv`]).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParagraphStyle {
    /// Horizontal alignment of lines
    pub align: Align,
    /// Line spacing
    pub line_spacing: LineSpacing,
    /// Indent on the leading side (left for left-to-right paragraphs)
    pub leading_indent: i32,
    /// Indent on the trailing side
    pub trailing_indent: i32,
    /// Additional indent of the first line
    ///
    /// This is added to [`Self::leading_indent`] on the first line only and
    /// may be negative (a hanging indent).
    pub first_indent: i32,
    /// Space before the first line
    pub space_before: i32,
    /// Space after the last line
    pub space_after: i32,
    /// Maximum number of lines
    ///
    /// Content beyond the last permitted line is not laid out. On that line,
    /// letter breaks are allowed.
    pub max_lines: Option<u32>,
    /// Draw an ellipsis at the end of the last permitted line when content
    /// remains
    pub ellipsis: bool,
    /// Grow lines upwards: the first line is at the bottom
    pub inverted: bool,
}

impl Default for ParagraphStyle {
    fn default() -> Self {
        ParagraphStyle {
            align: Align::default(),
            line_spacing: LineSpacing::default(),
            leading_indent: 0,
            trailing_indent: 0,
            first_indent: 0,
            space_before: 0,
            space_after: 0,
            max_lines: None,
            ellipsis: false,
            inverted: false,
        }
    }
}

impl ParagraphStyle {
    /// Alternative default constructor
    pub fn new() -> Self {
        Self::default()
    }

    /// Available width of line `line` given the paragraph's inner width
    ///
    /// The result is never less than 1, guaranteeing that layout can always
    /// attempt at least one character.
    pub fn line_width(&self, width: i32, line: usize) -> i32 {
        let mut indent = self.leading_indent + self.trailing_indent;
        if line == 0 {
            indent += self.first_indent;
        }
        (width - indent).max(1)
    }

    /// Offset of line `line` from the paragraph's left edge, before alignment
    pub fn line_origin(&self, line: usize, rtl: bool) -> i32 {
        if rtl {
            self.trailing_indent
        } else if line == 0 {
            self.leading_indent + self.first_indent
        } else {
            self.leading_indent
        }
    }

    /// True if line index `line` is the last one permitted
    pub fn is_last_permitted(&self, line: usize) -> bool {
        self.max_lines.is_some_and(|n| line + 1 >= crate::conv::to_usize(n))
    }
}

/// Helper to modify a style
///
/// This tracks whether modifications invalidate an existing layout.
#[derive(Debug)]
pub struct UpdateStyle<'a> {
    style: &'a mut ParagraphStyle,
    relayout: bool,
}

impl<'a> UpdateStyle<'a> {
    pub(crate) fn new(style: &'a mut ParagraphStyle) -> Self {
        UpdateStyle {
            style,
            relayout: false,
        }
    }

    pub(crate) fn finish(self) -> bool {
        self.relayout
    }

    /// Read access to the style
    pub fn style(&self) -> &ParagraphStyle {
        self.style
    }

    /// Set the alignment
    pub fn set_align(&mut self, align: Align) {
        if align != self.style.align {
            self.style.align = align;
            self.relayout = true;
        }
    }

    /// Set line spacing
    pub fn set_line_spacing(&mut self, spacing: LineSpacing) {
        if spacing != self.style.line_spacing {
            self.style.line_spacing = spacing;
            self.relayout = true;
        }
    }

    /// Set indents: `(leading, trailing, first)`
    pub fn set_indents(&mut self, (leading, trailing, first): (i32, i32, i32)) {
        let s = &mut *self.style;
        if (leading, trailing, first) != (s.leading_indent, s.trailing_indent, s.first_indent) {
            s.leading_indent = leading;
            s.trailing_indent = trailing;
            s.first_indent = first;
            self.relayout = true;
        }
    }

    /// Set space before and after the paragraph
    pub fn set_spacing(&mut self, before: i32, after: i32) {
        if (before, after) != (self.style.space_before, self.style.space_after) {
            self.style.space_before = before;
            self.style.space_after = after;
            self.relayout = true;
        }
    }

    /// Limit the number of lines, optionally with an ellipsis
    pub fn set_max_lines(&mut self, max_lines: Option<u32>, ellipsis: bool) {
        if (max_lines, ellipsis) != (self.style.max_lines, self.style.ellipsis) {
            self.style.max_lines = max_lines;
            self.style.ellipsis = ellipsis;
            self.relayout = true;
        }
    }

    /// Enable or disable inverted (upward) line growth
    pub fn set_inverted(&mut self, inverted: bool) {
        if inverted != self.style.inverted {
            self.style.inverted = inverted;
            self.relayout = true;
        }
    }
}

/// Horizontal alignment of lines
///
/// `Leading`, `Trailing` and `Justify` are relative to the paragraph
/// direction; `Left` and `Right` are absolute.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Align {
    /// Align to the start of the paragraph direction
    #[default]
    Leading,
    /// Align to the left edge
    Left,
    /// Align to centre
    Center,
    /// Align to the right edge
    Right,
    /// Align to the end of the paragraph direction
    Trailing,
    /// Stretch lines to fill the width
    ///
    /// The final line and lines ending in a hard break use leading alignment.
    Justify,
}

impl Align {
    /// Offset of line content given `spare` width and paragraph direction
    pub fn offset(self, spare: i32, rtl: bool) -> i32 {
        let spare = spare.max(0);
        match self {
            Align::Left => 0,
            Align::Right => spare,
            Align::Center => spare / 2,
            Align::Leading | Align::Justify => match rtl {
                false => 0,
                true => spare,
            },
            Align::Trailing => match rtl {
                false => spare,
                true => 0,
            },
        }
    }
}

/// Line spacing
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineSpacing {
    /// Line height is the maximum ascent plus maximum descent of the line
    #[default]
    Natural,
    /// Fixed line height
    ///
    /// Ascent is a fixed percentage of the height, decided by a plurality
    /// vote over the ascent ratios of all segments seen so far.
    Exact(i32),
    /// Natural line height, but at least this
    ///
    /// Extra height is added above the content.
    AtLeast(i32),
}
