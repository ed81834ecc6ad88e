// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! The paragraph builder
//!
//! [`ParaBuilder`] is a state machine which fills lines with boxes:
//!
//! ```none
//! AddUnknownBox → {AddNonStringBox | AddWsRun} → FinalizeLine / FinalizeNoBack
//!     → {BackTrack → FinalizeLine | OutputLine} → AddUnknownBox | Quit | Abort
//! ```
//!
//! A builder is constructed for one layout pass and consumed by
//! [`ParaBuilder::main_loop`].

mod finalize;
mod output;
mod vote;

pub use vote::{AscentVote, DEFAULT_ASCENT_PERCENT};

use crate::boxes::{BoxArena, BoxId, BoxKind, LayoutBox, Line};
use crate::conv::mul_div;
use crate::linebreak::is_hard_break_char;
use crate::policy::LayoutPolicy;
use crate::renderer::{
    BreakWeight, ChildMode, Diagnostics, EndSeg, ObjectHost, ObjectMetrics, Renderer,
    SegmentRequest, WsHandling,
};
use crate::source::{ObjectKind, RunMap, TextSource, HARD_LINE_BREAK};
use crate::style::ParagraphStyle;
use crate::{Range, Segment};
use smallvec::SmallVec;

/// Builder state
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// Determine the kind of the next unplaced content
    AddUnknownBox,
    /// Place an embedded object
    AddNonStringBox,
    /// Place a segment of text
    AddWsRun,
    /// Validate and order the current line, backtracking if necessary
    FinalizeLine,
    /// Order the current line without further validation
    FinalizeNoBack,
    /// Shorten the current line
    BackTrack,
    /// Position the current line
    OutputLine,
    /// Layout is complete
    Quit,
    /// No progress is possible
    Abort,
}

/// Services used by the builder
pub struct BuildContext<'a> {
    pub source: &'a dyn TextSource,
    pub renderer: &'a mut dyn Renderer,
    pub objects: &'a mut dyn ObjectHost,
    pub diagnostics: &'a mut Diagnostics,
    pub style: &'a ParagraphStyle,
    pub policy: &'a dyn LayoutPolicy,
}

/// An edit, in rendered chars
///
/// `ich_min..ich_lim` is the replaced range in the new text; the text after
/// it moved by `delta`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RenderedDiff {
    pub ich_min: usize,
    pub ich_lim: usize,
    pub delta: isize,
}

impl RenderedDiff {
    /// End of the replaced range in the old text
    pub fn old_lim(&self) -> usize {
        self.ich_lim.saturating_add_signed(-self.delta)
    }
}

/// Parameters of one layout pass
#[derive(Clone, Debug, Default)]
pub struct BuildParams {
    /// Width available to the paragraph
    pub available_width: i32,
    /// Lay out everything from scratch (no resynchronization)
    pub full_relayout: bool,
    /// Index in the old chain of the first box to rebuild
    pub start_box: usize,
    /// Number of old lines kept before `start_box`
    pub lines_to_skip: usize,
    /// Baseline of the last kept line (ignored without kept lines)
    pub top_y: i32,
    /// Distance from `top_y` to the edge of the last kept line
    pub prev_descent: i32,
    /// The edit causing a partial relayout
    pub diff: Option<RenderedDiff>,
    /// First rendered char to lay out, if not the start of `start_box`
    pub start_ich: Option<usize>,
    /// Runs of the previous text; without these there is no resynchronization
    pub old_runs: Option<RunMap>,
}

/// Paragraph state borrowed or taken by the builder
pub struct ParaState<'a> {
    pub arena: &'a mut BoxArena,
    pub vote: &'a mut AscentVote,
    /// The previous chain (moved out of the paragraph)
    pub chain: Vec<BoxId>,
    /// The previous lines
    pub lines: Vec<Line>,
}

/// Result of [`ParaBuilder::main_loop`]
#[derive(Clone, Debug, Default)]
pub struct BuildOutput {
    pub chain: Vec<BoxId>,
    pub lines: Vec<Line>,
    /// Maximum line content width
    pub width: i32,
    /// Total height, including space before and after
    pub height: i32,
    /// Number of lines built (excluding kept and resynchronized lines)
    pub lines_built: usize,
    /// Index of the first line reused from the previous layout
    pub resynced_at: Option<usize>,
    /// True if layout ended early because no content fit
    pub aborted: bool,
    /// Runs of the text laid out
    pub runs: RunMap,
}

struct OldLayout {
    chain: Vec<BoxId>,
    lines: Vec<Line>,
    /// Next old line which is neither kept nor discarded
    next: usize,
    winner: Option<u8>,
}

/// The paragraph builder
pub struct ParaBuilder<'a> {
    cx: BuildContext<'a>,
    arena: &'a mut BoxArena,
    vote: &'a mut AscentVote,
    params: BuildParams,
    state: State,
    ich: usize,
    cch_ren: usize,
    base_rtl: bool,
    bidi: bool,
    runs: RunMap,
    edge: i32,
    width: i32,
    chain: Vec<BoxId>,
    lines: Vec<Line>,
    first_new_line: usize,
    old: OldLayout,
    resynced_at: Option<usize>,

    // The current line: boxes chain[line_start..]
    line_start: usize,
    vest: SmallVec<[EndSeg; 16]>,
    dx_line: i32,
    line_hard: bool,
    synthetic_discarded: bool,
    ellipsis: Option<i32>,
    visual: SmallVec<[usize; 16]>,

    // Evicted embedded objects, by rendered char
    unplaced: SmallVec<[(usize, BoxId); 2]>,
    deferred: Option<(usize, BoxId)>,
}

impl<'a> ParaBuilder<'a> {
    /// Initialize a layout pass
    ///
    /// Old lines before `params.lines_to_skip` and old boxes before
    /// `params.start_box` are kept. On a full relayout all other old boxes are
    /// released immediately; otherwise they are released as the builder
    /// passes them, or spliced back on resynchronization.
    pub fn new(cx: BuildContext<'a>, para: ParaState<'a>, params: BuildParams) -> Self {
        let ParaState {
            arena,
            vote,
            chain: old_chain,
            lines: old_lines,
        } = para;
        cx.renderer.begin_layout(cx.source);

        let cch_ren = cx.source.cch_ren();
        let base_rtl = cx.source.base_level().is_rtl();
        let runs = RunMap::new(cx.source);
        let bidi = base_rtl || runs.has_rtl();

        let lines_to_skip = params.lines_to_skip.min(old_lines.len());
        let start_box = params.start_box.min(old_chain.len());
        let chain = old_chain[..start_box].to_vec();
        let lines = old_lines[..lines_to_skip].to_vec();
        let width = lines.iter().map(|l| l.right - l.left).max().unwrap_or(0);

        let ich = params
            .start_ich
            .or_else(|| old_lines.get(lines_to_skip).map(|l| l.text.start()))
            .unwrap_or(0)
            .min(cch_ren);

        let edge = if lines_to_skip == 0 {
            cx.policy
                .adjust_edge_for_initial_gap(params.top_y, cx.style.space_before)
        } else if cx.policy.forward() {
            params.top_y + params.prev_descent
        } else {
            params.top_y - params.prev_descent
        };

        if params.full_relayout {
            vote.clear();
        }
        let winner = vote.winner();

        let mut builder = ParaBuilder {
            cx,
            arena,
            vote,
            params,
            state: State::AddUnknownBox,
            ich,
            cch_ren,
            base_rtl,
            bidi,
            runs,
            edge,
            width,
            chain,
            lines,
            first_new_line: lines_to_skip,
            old: OldLayout {
                chain: old_chain,
                lines: old_lines,
                next: lines_to_skip,
                winner,
            },
            resynced_at: None,
            line_start: 0,
            vest: SmallVec::new(),
            dx_line: 1,
            line_hard: false,
            synthetic_discarded: false,
            ellipsis: None,
            visual: SmallVec::new(),
            unplaced: SmallVec::new(),
            deferred: None,
        };

        if builder.params.full_relayout || builder.params.diff.is_none() {
            for &id in &builder.old.chain[start_box..] {
                builder.arena.release(id);
            }
            builder.old.next = builder.old.lines.len();
        }

        builder.start_line();
        builder
    }

    /// Run the state machine to completion
    pub fn main_loop(mut self) -> BuildOutput {
        loop {
            log::trace!("ParaBuilder: {:?} at {}", self.state, self.ich);
            self.state = match self.state {
                State::AddUnknownBox => self.add_unknown_box(),
                State::AddNonStringBox => self.add_non_string_box(),
                State::AddWsRun => self.add_ws_run(),
                State::FinalizeLine => self.finalize_line(true),
                State::FinalizeNoBack => self.finalize_line(false),
                State::BackTrack => self.back_track(),
                State::OutputLine => self.output_line(),
                State::Quit | State::Abort => break,
            };
        }
        self.finish()
    }

    fn start_line(&mut self) {
        self.line_start = self.chain.len();
        self.vest.clear();
        let line = self.lines.len();
        self.dx_line = self
            .cx
            .style
            .line_width(self.params.available_width, line);
        self.line_hard = false;
        self.synthetic_discarded = false;
        self.ellipsis = None;
        self.visual.clear();
    }

    #[inline]
    fn line_len(&self) -> usize {
        self.chain.len() - self.line_start
    }

    /// Sum of box widths on the current line
    fn line_width_used(&self) -> i32 {
        self.chain[self.line_start..]
            .iter()
            .map(|id| self.arena[*id].width())
            .sum()
    }

    #[inline]
    fn is_last_permitted(&self) -> bool {
        self.cx.style.is_last_permitted(self.lines.len())
    }

    /// Worst break accepted before retrying at line start
    fn lb_max(&self) -> BreakWeight {
        match self.is_last_permitted() {
            false => BreakWeight::Word,
            true => BreakWeight::Letter,
        }
    }

    fn request(
        &self,
        ich_min: usize,
        ich_lim: usize,
        ws: WsHandling,
        lb_max: BreakWeight,
        max_width: i32,
    ) -> SegmentRequest<'static> {
        SegmentRequest {
            ich_min,
            ich_lim,
            ich_lim_backtrack: ich_lim,
            need_final_break: false,
            start_line: self.line_len() == 0,
            max_width,
            lb_pref: BreakWeight::Ws,
            lb_max,
            ws,
            para_rtl: self.base_rtl,
            prev: None,
        }
    }

    fn push_box(&mut self, b: LayoutBox, end: EndSeg) -> BoxId {
        let id = self.arena.alloc(b);
        self.chain.push(id);
        self.vest.push(end);
        debug_assert_eq!(self.vest.len(), self.line_len());
        id
    }

    /// Take the hard-break char at `ich` into the last box on the line
    fn absorb_hard_break(&mut self) {
        let Some(&id) = self.chain[self.line_start..].last() else {
            return;
        };
        let b = self.arena.get_mut(id);
        if let Some(seg) = b.segment_mut() {
            seg.absorb_break_char();
            b.refresh();
            self.ich += 1;
            self.line_hard = true;
        }
    }

    fn add_unknown_box(&mut self) -> State {
        if self.ich >= self.cch_ren {
            if self.line_len() == 0 {
                self.add_empty_segment();
            }
            return State::FinalizeLine;
        }

        match self.cx.source.object_at(self.ich) {
            Some(_) => State::AddNonStringBox,
            None => State::AddWsRun,
        }
    }

    /// Add a zero-width segment at `ich` (empty text or a trailing empty line)
    fn add_empty_segment(&mut self) {
        let ich = self.ich;
        let req = self.request(ich, ich, WsHandling::Mixed, BreakWeight::Clip, i32::MAX);
        let seg = match self.cx.renderer.find_break_point(self.cx.source, &req) {
            Ok(Some(seg)) if seg.cch() == 0 => Some(seg),
            Ok(_) => None,
            Err(err) => {
                self.cx.diagnostics.record(ich, err);
                None
            }
        };
        let seg = seg.unwrap_or_else(|| {
            let level = self.cx.source.base_level();
            Segment::empty(ich, (0, 0), level, EndSeg::NoMore)
        });
        let end = seg.end();
        self.push_box(LayoutBox::text(seg), end);
    }

    fn add_non_string_box(&mut self) -> State {
        let ich = self.ich;
        let Some(object) = self.cx.source.object_at(ich) else {
            return State::AddWsRun;
        };
        let level = self.cx.source.char_props(ich).0.level;
        let first = self.line_len() == 0;
        let remaining = self.dx_line - self.line_width_used();

        let id = match object.kind {
            ObjectKind::Picture {
                width,
                ascent,
                descent,
            } => {
                let metrics = scale_picture(width, ascent, descent, self.dx_line);
                let b = LayoutBox::object(BoxKind::Picture(object.id), ich, metrics, level);
                match self.deferred.take() {
                    Some((i, id)) if i == ich => {
                        *self.arena.get_mut(id) = b;
                        id
                    }
                    other => {
                        if let Some((_, id)) = other {
                            self.arena.release(id);
                        }
                        self.arena.alloc(b)
                    }
                }
            }
            ObjectKind::Pile => {
                if let Some(pos) = self.unplaced.iter().position(|(i, _)| *i == ich) {
                    self.unplaced.swap_remove(pos).1
                } else {
                    let mode = match self.params.full_relayout {
                        true => ChildMode::Fresh,
                        false => ChildMode::Relayout,
                    };
                    let metrics = match self.cx.objects.layout_child(object.id, self.dx_line, mode) {
                        Ok(metrics) => metrics,
                        Err(err) => {
                            self.cx.diagnostics.record(ich, err);
                            ObjectMetrics::default()
                        }
                    };
                    let b = LayoutBox::object(BoxKind::Pile(object.id), ich, metrics, level);
                    self.arena.alloc(b)
                }
            }
        };

        let width = self.arena[id].width();
        self.chain.push(id);
        self.vest.push(EndSeg::OkayBreak);
        self.ich += 1;

        if !first && width > remaining {
            State::FinalizeLine
        } else if self.ich >= self.cch_ren {
            State::FinalizeLine
        } else {
            State::AddUnknownBox
        }
    }

    fn add_ws_run(&mut self) -> State {
        let ich = self.ich;
        let c = self.cx.source.char_at(ich);
        let ws = match self.bidi {
            false => WsHandling::Mixed,
            true if c.is_whitespace() && !is_hard_break_char(c) => WsHandling::OnlyWs,
            true => WsHandling::NoWs,
        };
        let start_line = self.line_len() == 0;
        let max_width = (self.dx_line - self.line_width_used()).max(0);

        let mut lb_max = self.lb_max();
        let result = loop {
            let mut req = self.request(ich, self.cch_ren, ws, lb_max, max_width);
            req.prev = self.chain[self.line_start..]
                .iter()
                .rev()
                .find_map(|id| self.arena[*id].segment());
            let result = self
                .cx
                .renderer
                .find_break_point(self.cx.source, &req)
                .map(|seg| seg.filter(|seg| seg.cch() > 0 || seg.end() == EndSeg::HardBreak));

            match result {
                Ok(None) if start_line && lb_max < BreakWeight::Clip => {
                    lb_max = match lb_max < BreakWeight::Letter {
                        true => BreakWeight::Letter,
                        false => BreakWeight::Clip,
                    };
                    log::debug!("ParaBuilder: nothing fits at {ich}; retrying with {lb_max:?}");
                }
                result => break result,
            }
        };

        let seg = match result {
            Ok(Some(seg)) => seg,
            Ok(None) if start_line => {
                log::warn!("ParaBuilder: no content fits at {ich}; aborting");
                return State::Abort;
            }
            Ok(None) => return State::FinalizeLine,
            Err(err) => {
                self.cx.diagnostics.record(ich, err);
                if !start_line {
                    return State::FinalizeLine;
                }
                self.forced_segment(ich)
            }
        };

        self.ich = seg.ich_lim();
        let end = seg.end();
        self.push_box(LayoutBox::text(seg), end);

        match end {
            EndSeg::MoreLines => State::FinalizeLine,
            EndSeg::HardBreak => {
                if self.ich < self.cch_ren && self.cx.source.object_at(self.ich).is_some() {
                    return State::AddUnknownBox;
                }
                if self.ich < self.cch_ren && is_hard_break_char(self.cx.source.char_at(self.ich))
                {
                    self.absorb_hard_break();
                }
                State::FinalizeLine
            }
            EndSeg::NoMore if self.ich >= self.cch_ren => State::FinalizeLine,
            EndSeg::NoMore => State::AddUnknownBox,
            EndSeg::OkayBreak | EndSeg::BadBreak | EndSeg::WsBreak | EndSeg::MoreWhtsp => {
                if self.ich < self.cch_ren && self.cx.source.char_at(self.ich) == HARD_LINE_BREAK {
                    // A line separator ends the line acceptably whatever the
                    // renderer said.
                    self.set_last_end(EndSeg::OkayBreak);
                    self.absorb_hard_break();
                    State::FinalizeLine
                } else {
                    State::AddUnknownBox
                }
            }
        }
    }

    /// Substitute for a failed measurement at line start
    ///
    /// Covers the rest of the run up to the next embedded object, with zero
    /// width.
    fn forced_segment(&self, ich: usize) -> Segment {
        let source = self.cx.source;
        let (props, run) = source.char_props(ich);
        let mut lim = run.end().min(self.cch_ren).max(ich + 1);
        if let Some(i) = (ich + 1..lim).find(|i| source.object_at(*i).is_some()) {
            lim = i;
        }
        let end = match lim >= self.cch_ren {
            true => EndSeg::NoMore,
            false => EndSeg::OkayBreak,
        };
        Segment::new(Range::from(ich..lim), 0, 0, (0, 0), props.level, end)
    }

    fn set_last_end(&mut self, end: EndSeg) {
        if let Some(v) = self.vest.last_mut() {
            *v = end;
        }
        if let Some(&id) = self.chain.last() {
            if let Some(seg) = self.arena.get_mut(id).segment_mut() {
                seg.set_end(end);
            }
        }
    }
}

/// Scale a picture down to `max_width`, preserving aspect ratio
fn scale_picture(width: i32, ascent: i32, descent: i32, max_width: i32) -> ObjectMetrics {
    if width <= max_width || width <= 0 {
        ObjectMetrics {
            width: width.max(0),
            ascent,
            descent,
        }
    } else {
        ObjectMetrics {
            width: max_width,
            ascent: mul_div(ascent, max_width, width),
            descent: mul_div(descent, max_width, width),
        }
    }
}
