// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! The paragraph box: owner of a paragraph's layout

use crate::boxes::{BoxArena, BoxId, LayoutBox, Line};
use crate::builder::{
    AscentVote, BuildContext, BuildParams, ParaBuilder, ParaState, RenderedDiff,
};
use crate::conv::{to_u32, to_usize};
use crate::policy::policy_for;
use crate::renderer::{Diagnostics, ObjectHost, Renderer};
use crate::source::{RunMap, TextSource};
use crate::style::{ParagraphStyle, UpdateStyle};
use easy_cast::Conv;
use std::mem::take;
use thiserror::Error;
use unicode_bidi::Level;

/// Layout failure
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    /// The text source has no runs at all
    ///
    /// Even empty text must supply one (empty) run.
    #[error("text source has no runs")]
    NoRuns,
    #[error("invalid text diff {0:?}")]
    InvalidDiff(TextDiff),
}

/// Services for one layout call
pub struct LayoutContext<'a> {
    pub source: &'a dyn TextSource,
    pub renderer: &'a mut dyn Renderer,
    pub objects: &'a mut dyn ObjectHost,
    /// Renderer failures are recorded here
    pub diagnostics: &'a mut Diagnostics,
}

/// A change to the text since the last layout, in logical chars
///
/// `ich_min..ich_lim` is the replaced range in the *new* text; text after it
/// moved by `delta` (new length minus old length).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextDiff {
    pub ich_min: usize,
    pub ich_lim: usize,
    pub delta: isize,
}

impl TextDiff {
    /// End of the replaced range in the old text
    pub fn old_lim(&self) -> Option<usize> {
        self.ich_lim
            .checked_add_signed(-self.delta)
            .filter(|lim| *lim >= self.ich_min)
    }
}

/// Summary of a layout call
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LayoutOutcome {
    /// True if only part of the paragraph was rebuilt
    pub partial: bool,
    /// Number of lines built
    pub lines_built: usize,
    /// Index of the first line reused from the previous layout
    pub resynced_at: Option<usize>,
    /// True if layout stopped early because no content fit
    pub aborted: bool,
}

/// A selection: an insertion point or a range, in logical chars
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Selection {
    pub anchor: usize,
    pub active: usize,
}

impl Selection {
    /// Construct an insertion point
    pub fn caret(index: usize) -> Self {
        Selection {
            anchor: index,
            active: index,
        }
    }

    /// True if this is an insertion point
    pub fn is_caret(&self) -> bool {
        self.anchor == self.active
    }

    /// The selected range
    pub fn range(&self) -> std::ops::Range<usize> {
        self.anchor.min(self.active)..self.anchor.max(self.active)
    }

    /// Adjust for an edit; `None` if the selection was invalidated
    ///
    /// Positions before the edit are unchanged and positions after it move by
    /// `delta`. An insertion point inside the replaced text moves to the end
    /// of the new text; a range touching the replaced text is invalidated.
    pub fn adjust(self, diff: &TextDiff) -> Option<Self> {
        let old_lim = diff.old_lim()?;
        let map = |p: usize| {
            if p < diff.ich_min || (p == diff.ich_min && old_lim > diff.ich_min) {
                Some(p)
            } else if p >= old_lim {
                p.checked_add_signed(diff.delta)
            } else {
                None
            }
        };

        match (map(self.anchor), map(self.active)) {
            (Some(anchor), Some(active)) => Some(Selection { anchor, active }),
            _ if self.is_caret() => Some(Selection::caret(diff.ich_lim)),
            _ => None,
        }
    }
}

/// Handle to a tracked [`Selection`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SelectionId(u32);

#[derive(Clone, Debug)]
struct Memo {
    width: i32,
    cch_ren: usize,
    cch_log: usize,
    base_level: Level,
    runs: RunMap,
}

/// A laid-out paragraph
///
/// This owns the paragraph's boxes (in a [`BoxArena`]), the chain of boxes in
/// logical order, and the lines. Layout is performed by [`Self::layout`] and,
/// after an edit, by [`Self::relayout`] which rebuilds only the lines around
/// the edit when possible.
///
/// Selections may be tracked; these are adjusted on [`Self::relayout`].
#[derive(Clone, Debug, Default)]
pub struct ParagraphBox {
    arena: BoxArena,
    chain: Vec<BoxId>,
    lines: Vec<Line>,
    width: i32,
    height: i32,
    vote: AscentVote,
    style: ParagraphStyle,
    memo: Option<Memo>,
    stale: bool,
    selections: Vec<Option<Selection>>,
}

impl ParagraphBox {
    /// Construct with the given style
    pub fn new(style: ParagraphStyle) -> Self {
        ParagraphBox {
            style,
            ..Default::default()
        }
    }

    /// Read the style
    pub fn style(&self) -> &ParagraphStyle {
        &self.style
    }

    /// Modify the style
    ///
    /// Returns true when the change invalidates the layout. In this case the
    /// next [`Self::relayout`] performs a full layout.
    pub fn update_style(&mut self, f: impl FnOnce(&mut UpdateStyle)) -> bool {
        let mut update = UpdateStyle::new(&mut self.style);
        f(&mut update);
        let relayout = update.finish();
        self.stale |= relayout;
        relayout
    }

    /// True if the paragraph needs a full layout
    pub fn is_stale(&self) -> bool {
        self.stale || self.memo.is_none()
    }

    /// Lay out the whole paragraph at `width`
    pub fn layout(
        &mut self,
        cx: LayoutContext<'_>,
        width: i32,
    ) -> Result<LayoutOutcome, LayoutError> {
        if cx.source.num_runs() == 0 {
            log::error!("ParagraphBox::layout: text source has no runs");
            return Err(LayoutError::NoRuns);
        }
        let params = BuildParams {
            available_width: width,
            full_relayout: true,
            ..Default::default()
        };
        Ok(self.build(cx, params, width))
    }

    /// Lay out the paragraph after the edit `diff`
    ///
    /// The source must present the new text. Layout restarts at the line
    /// containing the edit, or the line before unless the line starts with
    /// unedited whitespace after a hard break. It restarts earlier while the
    /// line before may depend on the first word of the restarted line. Layout
    /// stops once the rest of the old layout can be reused.
    ///
    /// A full layout is performed instead if there is no previous layout, the
    /// width or style changed, the paragraph direction changed, right-to-left
    /// text was added to or removed from a left-to-right paragraph, or bidi
    /// levels of kept lines changed.
    pub fn relayout(
        &mut self,
        cx: LayoutContext<'_>,
        width: i32,
        diff: TextDiff,
    ) -> Result<LayoutOutcome, LayoutError> {
        let source = cx.source;
        if source.num_runs() == 0 {
            log::error!("ParagraphBox::relayout: text source has no runs");
            return Err(LayoutError::NoRuns);
        }
        let cch_log = source.cch_log();
        let consistent = self
            .memo
            .as_ref()
            .map(|m| m.cch_log.checked_add_signed(diff.delta) == Some(cch_log))
            .unwrap_or(true);
        if diff.ich_lim > cch_log || diff.old_lim().is_none() || !consistent {
            return Err(LayoutError::InvalidDiff(diff));
        }

        for sel in self.selections.iter_mut() {
            *sel = sel.and_then(|s| s.adjust(&diff));
        }

        let base_level = source.base_level();
        let runs = RunMap::new(source);
        let memo = match self.memo.take() {
            Some(memo)
                if !self.stale
                    && memo.width == width
                    && !self.lines.is_empty()
                    && memo.base_level == base_level
                    && memo.runs.has_rtl() == runs.has_rtl() =>
            {
                memo
            }
            _ => {
                log::debug!("ParagraphBox::relayout: performing full layout");
                return self.layout(cx, width);
            }
        };

        let ich_min = source.log_to_ren(diff.ich_min);
        let ich_lim = source.log_to_ren(diff.ich_lim);
        let delta = isize::conv(source.cch_ren()) - isize::conv(memo.cch_ren);
        let rdiff = RenderedDiff {
            ich_min,
            ich_lim,
            delta,
        };
        if isize::conv(ich_lim) - delta < isize::conv(ich_min) {
            return self.layout(cx, width);
        }

        let Some(mut k) = self.find_line(ich_min) else {
            return self.layout(cx, width);
        };
        if k > 0 {
            let start = self.lines[k].text.start();
            let leading_ws = start < ich_min && source.char_at(start).is_whitespace();
            if !leading_ws || !self.lines[k - 1].hard_break {
                k -= 1;
            }
        }
        // A kept line depends on the first word of the next line
        while k > 0 && !self.lines[k - 1].hard_break && !ends_after_word(source, &self.lines[k]) {
            k -= 1;
        }
        if k > 0 && !memo.runs.same_before(&runs, self.lines[k].text.end().min(ich_min)) {
            log::debug!("ParagraphBox::relayout: runs before line {k} changed");
            return self.layout(cx, width);
        }

        let (top_y, prev_descent) = match k {
            0 => (0, 0),
            _ => {
                let prev = &self.lines[k - 1];
                let edge = policy_for(self.style.inverted).setup_next_line(prev);
                (prev.baseline, (edge - prev.baseline).abs())
            }
        };
        let line = &self.lines[k];
        log::debug!("ParagraphBox::relayout: restarting at line {k}");
        let params = BuildParams {
            available_width: width,
            full_relayout: false,
            start_box: line.boxes.start(),
            lines_to_skip: k,
            top_y,
            prev_descent,
            diff: Some(rdiff),
            start_ich: Some(line.text.start()),
            old_runs: Some(memo.runs),
        };
        Ok(self.build(cx, params, width))
    }

    fn build(&mut self, cx: LayoutContext<'_>, params: BuildParams, width: i32) -> LayoutOutcome {
        let LayoutContext {
            source,
            renderer,
            objects,
            diagnostics,
        } = cx;
        let partial = !params.full_relayout;
        let build = BuildContext {
            source,
            renderer,
            objects,
            diagnostics,
            style: &self.style,
            policy: policy_for(self.style.inverted),
        };
        // The chain is moved out for the duration of layout.
        let para = ParaState {
            arena: &mut self.arena,
            vote: &mut self.vote,
            chain: take(&mut self.chain),
            lines: take(&mut self.lines),
        };
        let output = ParaBuilder::new(build, para, params).main_loop();

        self.chain = output.chain;
        self.lines = output.lines;
        self.width = output.width;
        self.height = output.height;
        self.memo = Some(Memo {
            width,
            cch_ren: source.cch_ren(),
            cch_log: source.cch_log(),
            base_level: source.base_level(),
            runs: output.runs,
        });
        self.stale = false;

        LayoutOutcome {
            partial,
            lines_built: output.lines_built,
            resynced_at: output.resynced_at,
            aborted: output.aborted,
        }
    }

    /// The chain of boxes, in logical order
    pub fn chain(&self) -> &[BoxId] {
        &self.chain
    }

    /// Iterate over boxes, in logical order
    pub fn boxes(&self) -> impl Iterator<Item = &LayoutBox> + '_ {
        self.chain.iter().map(|id| &self.arena[*id])
    }

    /// Access a box
    pub fn get(&self, id: BoxId) -> Option<&LayoutBox> {
        self.arena.get(id)
    }

    /// Access the arena
    pub fn arena(&self) -> &BoxArena {
        &self.arena
    }

    /// The lines, top to bottom for normal paragraphs
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    #[inline]
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    /// Iterate over the boxes of `line`, in logical order
    pub fn line_boxes(&self, line: usize) -> impl Iterator<Item = &LayoutBox> + '_ {
        let range = self
            .lines
            .get(line)
            .map(|line| line.boxes.to_std())
            .unwrap_or(0..0);
        self.chain[range].iter().map(|id| &self.arena[*id])
    }

    /// Find the line containing rendered char `index`
    ///
    /// An index at the end of one line and the start of the next matches the
    /// latter.
    pub fn find_line(&self, index: usize) -> Option<usize> {
        let mut first = None;
        for (n, line) in self.lines.iter().enumerate() {
            if line.text.end() == index {
                first = Some(n);
            } else if line.text.includes(index) {
                return Some(n);
            }
        }
        first
    }

    /// Logical char range of a box
    pub fn log_range(&self, source: &dyn TextSource, id: BoxId) -> Option<std::ops::Range<usize>> {
        let range = self.arena.get(id)?.range();
        Some(source.ren_to_log(range.start())..source.ren_to_log(range.end()))
    }

    /// Maximum width of line content
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Total height, including space before and after
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Track a selection, adjusting it on edits
    pub fn track_selection(&mut self, selection: Selection) -> SelectionId {
        let id = SelectionId(to_u32(self.selections.len()));
        self.selections.push(Some(selection));
        id
    }

    /// Get a tracked selection; `None` if invalidated or dropped
    pub fn selection(&self, id: SelectionId) -> Option<Selection> {
        self.selections.get(to_usize(id.0)).copied().flatten()
    }

    /// Stop tracking a selection
    pub fn drop_selection(&mut self, id: SelectionId) {
        if let Some(sel) = self.selections.get_mut(to_usize(id.0)) {
            *sel = None;
        }
    }
}

/// True if `line` ends with whitespace following some other char
fn ends_after_word(source: &dyn TextSource, line: &Line) -> bool {
    let (start, end) = (line.text.start(), line.text.end());
    end > start
        && source.char_at(end - 1).is_whitespace()
        && (start..end).any(|i| !source.char_at(i).is_whitespace())
}
