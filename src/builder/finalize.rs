// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Line validation, bidi ordering and backtracking

use super::{ParaBuilder, State};
use crate::boxes::{BoxKind, LayoutBox};
use crate::linebreak::{is_break_after, is_hard_break_char};
use crate::renderer::{BreakWeight, EndSeg, WsHandling};
use smallvec::SmallVec;
use unicode_bidi::Level;

impl<'a> ParaBuilder<'a> {
    /// Validate and order the current line
    ///
    /// With `can_backtrack == false` (state `FinalizeNoBack`) the line is
    /// accepted as is.
    pub(super) fn finalize_line(&mut self, can_backtrack: bool) -> State {
        debug_assert_eq!(self.vest.len(), self.line_len());
        if self.line_len() == 0 {
            return match self.ich >= self.cch_ren {
                true => State::Quit,
                false => State::Abort,
            };
        }

        if can_backtrack {
            self.add_synthetic_ws();
            if self.rejects_line_end() {
                return State::BackTrack;
            }
        }

        self.reserve_ellipsis();
        self.finalize_line_order();

        let limit = self.dx_line - self.ellipsis.unwrap_or(0);
        let used = self.line_width_used();
        if can_backtrack && used > limit && (self.line_len() > 1 || self.ellipsis.is_some()) {
            log::debug!(
                "ParaBuilder: line {} overflows ({used} > {limit})",
                self.lines.len()
            );
            return State::BackTrack;
        }
        State::OutputLine
    }

    /// Absorb whitespace following the line into a synthetic box
    fn add_synthetic_ws(&mut self) {
        if self.synthetic_discarded || self.line_hard || self.ich >= self.cch_ren {
            return;
        }
        let source = self.cx.source;
        let c = source.char_at(self.ich);
        if !c.is_whitespace() || is_hard_break_char(c) {
            return;
        }

        let req = self.request(
            self.ich,
            self.cch_ren,
            WsHandling::OnlyWs,
            BreakWeight::Clip,
            i32::MAX,
        );
        let mut seg = match self.cx.renderer.find_break_point(source, &req) {
            Ok(Some(seg)) if seg.cch() > 0 => seg.with_ws(WsHandling::OnlyWs),
            Ok(_) => return,
            Err(err) => {
                self.cx.diagnostics.record(self.ich, err);
                return;
            }
        };
        seg.set_synthetic();
        self.ich = seg.ich_lim();
        let end = seg.end();
        self.push_box(LayoutBox::text(seg), end);

        if self.ich < self.cch_ren
            && is_hard_break_char(source.char_at(self.ich))
            && source.object_at(self.ich).is_none()
        {
            self.absorb_hard_break();
        }
    }

    /// True if the line may not end after its logically last box
    ///
    /// A `WsBreak` is accepted only if the last char is breakable-after under
    /// UAX #14. This re-derives the break class instead of trusting the
    /// renderer's classification; the check is suspect but retained for
    /// compatibility with renderers which report `WsBreak` inconsistently.
    fn rejects_line_end(&self) -> bool {
        let Some(&id) = self.chain[self.line_start..].last() else {
            return false;
        };
        let Some(seg) = self.arena[id].segment() else {
            return false;
        };
        let end = self.vest.last().copied().unwrap_or(EndSeg::NoMore);

        let reject = !seg.can_end_line()
            || match end {
                EndSeg::BadBreak => true,
                EndSeg::WsBreak => {
                    seg.cch() == 0 || !is_break_after(self.cx.source.char_at(seg.ich_lim() - 1))
                }
                _ => false,
            };
        if reject {
            log::debug!(
                "ParaBuilder: line {} may not end at {} ({end:?})",
                self.lines.len(),
                seg.ich_lim()
            );
        }
        reject
    }

    /// Reserve space for an ellipsis on the last permitted line
    fn reserve_ellipsis(&mut self) {
        self.ellipsis = None;
        if !self.cx.style.ellipsis || !self.is_last_permitted() || self.ich >= self.cch_ren {
            return;
        }
        let props = self.cx.source.char_props(self.ich.saturating_sub(1)).0;
        let width = self.cx.renderer.ellipsis_width(&props);
        if self.dx_line <= width {
            log::debug!("ParaBuilder: line too narrow for ellipsis");
            return;
        }
        self.ellipsis = Some(width);
    }

    /// Order boxes visually and fix physical start/end flags
    ///
    /// Trailing whitespace takes the paragraph level (UAX #9 rule L1), then
    /// boxes are reversed per level (rule L2). The visual order is stored in
    /// `self.visual` as indices relative to `line_start`.
    pub(super) fn finalize_line_order(&mut self) {
        let start = self.line_start;
        let source = self.cx.source;
        let base = source.base_level();

        for i in (start..self.chain.len()).rev() {
            let id = self.chain[i];
            let trailing_ws = match self.arena[id].segment() {
                Some(seg) => seg
                    .range()
                    .to_std()
                    .all(|ich| source.char_at(ich).is_whitespace()),
                None => false,
            };
            if !trailing_ws {
                break;
            }
            self.arena.get_mut(id).set_level(base);
        }

        let n = self.line_len();
        let levels: SmallVec<[Level; 16]> = self.chain[start..]
            .iter()
            .map(|id| self.arena[*id].level())
            .collect();
        let mut order: SmallVec<[usize; 16]> = (0..n).collect();

        // Unicode TR#9 L2: reverse items on the line
        let mut level = levels.iter().copied().max().unwrap_or(base);
        while level > Level::ltr() {
            let mut run_start = None;
            for i in 0..n {
                let part_level = levels[order[i]];
                if let Some(s) = run_start {
                    if part_level < level {
                        order[s..i].reverse();
                        run_start = None;
                    }
                } else if part_level >= level {
                    run_start = Some(i);
                }
            }
            if let Some(s) = run_start {
                order[s..].reverse();
            }
            if level.lower(1).is_err() {
                break;
            }
        }

        // The line starts on the right in a right-to-left paragraph.
        let (first, last) = (order[0], order[n - 1]);
        let (phys_start, phys_end) = match self.base_rtl {
            false => (first, last),
            true => (last, first),
        };
        for i in 0..n {
            let b = self.arena.get_mut(self.chain[start + i]);
            if let Some(seg) = b.segment_mut() {
                seg.set_start_line(i == phys_start);
                seg.set_end_line(i == phys_end);
            }
            b.refresh();
        }

        self.visual = order;
    }

    /// Clear physical flags set by a previous [`Self::finalize_line_order`]
    fn clear_line_flags(&mut self) {
        for i in self.line_start..self.chain.len() {
            let b = self.arena.get_mut(self.chain[i]);
            if let Some(seg) = b.segment_mut() {
                seg.set_start_line(false);
                seg.set_end_line(false);
                seg.set_stretch(0);
            }
            b.refresh();
        }
        self.visual.clear();
    }

    /// Shorten the current line
    ///
    /// Each step strictly reduces either the chars or the boxes on the line.
    pub(super) fn back_track(&mut self) -> State {
        debug_assert_eq!(self.vest.len(), self.line_len());
        let line = self.lines.len();
        let Some(&id) = self.chain[self.line_start..].last() else {
            return State::Abort;
        };
        self.clear_line_flags();

        // 1: drop synthetic whitespace
        if self.arena[id].segment().is_some_and(|seg| seg.is_synthetic()) {
            log::debug!("ParaBuilder: line {line}: dropping synthetic whitespace");
            self.evict_last();
            self.synthetic_discarded = true;
            return State::FinalizeLine;
        }

        // 2: end the last segment earlier
        let n = self.line_len();
        let shorten = self.arena[id]
            .segment()
            .map(|seg| (seg.ich_min(), seg.ich_lim(), seg.ws()));
        if let Some((ich_min, ich_lim, ws)) = shorten.filter(|(min, lim, _)| *lim > *min + 1) {
            let others = self.line_width_used() - self.arena[id].width();
            let max_width = (self.dx_line - others - self.ellipsis.unwrap_or(0)).max(0);
            let mut req = self.request(ich_min, ich_lim, ws, self.lb_max(), max_width);
            req.ich_lim_backtrack = ich_lim - 1;
            req.need_final_break = true;
            req.start_line = n == 1;

            match self.cx.renderer.find_break_point(self.cx.source, &req) {
                Ok(Some(seg)) if seg.cch() > 0 && seg.ich_lim() < ich_lim => {
                    log::debug!(
                        "ParaBuilder: line {line}: shortened {ich_min}..{ich_lim} to ..{}",
                        seg.ich_lim()
                    );
                    self.ich = seg.ich_lim();
                    let end = seg.end();
                    *self.arena.get_mut(id) = LayoutBox::text(seg);
                    if let Some(v) = self.vest.last_mut() {
                        *v = end;
                    }
                    self.line_hard = false;
                    return State::FinalizeLine;
                }
                Ok(_) => (),
                Err(err) => self.cx.diagnostics.record(ich_min, err),
            }
        }

        // 3: a lone box is accepted as is
        if n == 1 {
            log::debug!("ParaBuilder: line {line}: accepting lone box");
            return State::FinalizeNoBack;
        }

        // 4: evict the last box
        log::debug!("ParaBuilder: line {line}: evicting last box");
        self.evict_last();
        State::FinalizeLine
    }

    /// Remove the last box from the line and rewind to its start
    fn evict_last(&mut self) {
        if self.line_len() == 0 {
            return;
        }
        let Some(id) = self.chain.pop() else {
            return;
        };
        self.vest.pop();
        let b = &self.arena[id];
        let ich = b.range().start();
        let (is_pile, is_picture) = match b.kind() {
            BoxKind::Pile(_) => (true, false),
            BoxKind::Picture(_) => (false, true),
            BoxKind::Text(_) | BoxKind::Ellipsis => (false, false),
        };

        if is_pile {
            self.unplaced.push((ich, id));
        } else if is_picture {
            if let Some((_, old)) = self.deferred.replace((ich, id)) {
                self.arena.release(old);
            }
        } else {
            self.arena.release(id);
        }
        self.ich = ich;
        self.line_hard = false;
    }
}
