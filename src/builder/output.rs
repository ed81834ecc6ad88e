// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Line output and resynchronization

use super::{BuildOutput, ParaBuilder, State};
use crate::boxes::{LayoutBox, Line};
use crate::conv::mul_div;
use crate::style::{Align, LineSpacing};
use crate::Range;
use easy_cast::Conv;

impl<'a> ParaBuilder<'a> {
    /// Position the current line and decide how to continue
    pub(super) fn output_line(&mut self) -> State {
        debug_assert_eq!(self.vest.len(), self.line_len());
        let style = self.cx.style;
        let line_no = self.lines.len();
        let start = self.line_start;
        let rtl = self.base_rtl;
        let text_start = self.arena[self.chain[start]].range().start();

        let (mut ascent, mut descent) = (0, 0);
        for &id in &self.chain[start..] {
            let b = &self.arena[id];
            ascent = ascent.max(b.ascent());
            descent = descent.max(b.descent());
            if let Some(seg) = b.segment() {
                self.vote.add(seg.ascent(), seg.descent());
            }
        }
        let natural = (ascent, descent);
        let (ascent, descent) = match style.line_spacing {
            LineSpacing::Natural => natural,
            LineSpacing::Exact(height) => {
                let ascent = mul_div(height, i32::from(self.vote.percent()), 100);
                (ascent, height - ascent)
            }
            LineSpacing::AtLeast(height) => (ascent + (height - ascent - descent).max(0), descent),
        };
        let placement = self.cx.policy.base_line(self.edge, ascent, descent);

        let ellipsis = self.ellipsis.filter(|_| self.ich < self.cch_ren);
        let content = self.line_width_used() + ellipsis.unwrap_or(0);
        let mut spare = self.dx_line - content;
        let is_last = self.ich >= self.cch_ren;
        if style.align == Align::Justify
            && !is_last
            && !self.line_hard
            && ellipsis.is_none()
            && spare > 0
            && self.justify(spare)
        {
            spare = 0;
        }

        let left = style.line_origin(line_no, rtl) + style.align.offset(spare, rtl);
        let mut x = left;
        let mut ellipsis_box =
            ellipsis.map(|w| LayoutBox::ellipsis(self.ich, w, natural, self.cx.source.base_level()));
        if rtl {
            if let Some(b) = ellipsis_box.as_mut() {
                b.set_position(x, placement.baseline - b.ascent());
                x += b.width();
            }
        }
        for k in 0..self.visual.len() {
            let b = self.arena.get_mut(self.chain[start + self.visual[k]]);
            b.set_position(x, placement.baseline - b.ascent());
            x += b.width();
        }
        if let Some(mut b) = ellipsis_box {
            if !rtl {
                b.set_position(x, placement.baseline - b.ascent());
                x += b.width();
            }
            let id = self.arena.alloc(b);
            self.chain.push(id);
        }

        let line = Line {
            boxes: Range::from(start..self.chain.len()),
            text: Range::from(text_start..self.ich),
            top: placement.top,
            baseline: placement.baseline,
            bottom: placement.bottom,
            left,
            right: x,
            hard_break: self.line_hard,
            ellipsis: ellipsis.is_some(),
            rtl,
        };
        log::trace!(
            "ParaBuilder: line {line_no}: text {:?}, x {left}..{x}, y {}..{}",
            line.text,
            line.top,
            line.bottom
        );
        self.width = self.width.max(x - left);
        self.edge = self.cx.policy.setup_next_line(&line);
        self.lines.push(line);

        if style.is_last_permitted(line_no) {
            if self.ich < self.cch_ren {
                log::debug!("ParaBuilder: truncated after {} lines", line_no + 1);
            }
            return State::Quit;
        }
        if self.try_resync() {
            return State::Quit;
        }
        if self.ich >= self.cch_ren && !self.line_hard {
            return State::Quit;
        }
        self.start_line();
        State::AddUnknownBox
    }

    /// Distribute `spare` width over whitespace gaps; false if there are none
    fn justify(&mut self, spare: i32) -> bool {
        let start = self.line_start;
        let total: u32 = self.chain[start..]
            .iter()
            .filter_map(|id| self.arena[*id].segment())
            .map(|seg| seg.gaps())
            .sum();
        if total == 0 {
            return false;
        }

        let (mut done, mut given) = (0, 0);
        for k in 0..self.visual.len() {
            let b = self.arena.get_mut(self.chain[start + self.visual[k]]);
            if let Some(seg) = b.segment_mut() {
                let gaps = seg.gaps();
                if gaps > 0 {
                    done += gaps;
                    let target = mul_div(spare, i32::conv(done), i32::conv(total));
                    seg.set_stretch(target - given);
                    given = target;
                }
            }
            b.refresh();
        }
        true
    }

    /// Splice in the rest of the old layout if the new layout has rejoined it
    ///
    /// Old lines the builder has passed are discarded (their boxes released).
    /// Resynchronization happens when the next old line starts, after mapping
    /// through the edit, exactly at the current char position, and the old
    /// boxes would be measured the same way from there: the previous char is a
    /// hard break or whitespace outside the edit, and the runs which follow
    /// have the same bounds and properties. The trailing empty line is always
    /// rebuilt.
    fn try_resync(&mut self) -> bool {
        let Some(diff) = self.params.diff else {
            return false;
        };
        if self.params.full_relayout || self.ich >= self.cch_ren {
            return false;
        }
        let old_lim = diff.old_lim();

        loop {
            let Some(line) = self.old.lines.get(self.old.next) else {
                return false;
            };
            let start = line.text.start();
            let mapped = match start >= old_lim {
                true => start.checked_add_signed(diff.delta),
                false => None,
            };
            match mapped {
                Some(m) if m == self.ich => break,
                Some(m) if m > self.ich => return false,
                _ => self.discard_old_line(),
            }
        }

        let next = self.old.next;
        if !self.unplaced.is_empty() || self.deferred.is_some() {
            return false;
        }
        if self.cx.style.max_lines.is_some() && next != self.lines.len() {
            return false;
        }
        if matches!(self.cx.style.line_spacing, LineSpacing::Exact(_))
            && self.vote.winner() != self.old.winner
        {
            return false;
        }
        if next > 0 && self.old.lines[next - 1].hard_break != self.line_hard {
            return false;
        }
        let source = self.cx.source;
        if !self.line_hard
            && (self.ich <= diff.ich_lim || !source.char_at(self.ich - 1).is_whitespace())
        {
            return false;
        }
        let old_start = self.old.lines[next].text.start();
        match &self.params.old_runs {
            Some(runs) if runs.same_after(old_start, &self.runs, self.ich) => (),
            _ => {
                log::debug!("ParaBuilder: runs changed after {}; no resync", self.ich);
                return false;
            }
        }

        let first = &self.old.lines[next];
        let dy = self.edge - self.cx.policy.leading_edge(first);
        let dbox = isize::conv(self.chain.len()) - isize::conv(first.boxes.start());
        let resync_line = self.lines.len();
        log::debug!(
            "ParaBuilder: resynchronized at line {resync_line} (old line {next}), dy = {dy}"
        );

        for i in next..self.old.lines.len() {
            let mut line = self.old.lines[i].clone();
            for &id in &self.old.chain[line.boxes.to_std()] {
                self.arena.get_mut(id).shift(dy, diff.delta);
                self.chain.push(id);
            }
            line.shift(dy, diff.delta, dbox);
            self.width = self.width.max(line.right - line.left);
            self.lines.push(line);
        }
        self.old.next = self.old.lines.len();
        self.resynced_at = Some(resync_line);
        true
    }

    fn discard_old_line(&mut self) {
        let i = self.old.next;
        self.old.next += 1;
        for &id in &self.old.chain[self.old.lines[i].boxes.to_std()] {
            self.arena.release(id);
        }
    }

    /// Release unused boxes, normalize positions and compute totals
    pub(super) fn finish(mut self) -> BuildOutput {
        let aborted = self.state == State::Abort;
        if aborted {
            log::warn!(
                "ParaBuilder: layout aborted at char {} of {}",
                self.ich,
                self.cch_ren
            );
            while self.chain.len() > self.line_start {
                if let Some(id) = self.chain.pop() {
                    self.arena.release(id);
                }
            }
        }

        while self.old.next < self.old.lines.len() {
            self.discard_old_line();
        }
        for (_, id) in self.unplaced.drain(..) {
            self.arena.release(id);
        }
        if let Some((_, id)) = self.deferred.take() {
            self.arena.release(id);
        }

        let style = self.cx.style;
        let forward = self.cx.policy.forward();
        if !forward {
            if let Some(min_top) = self.lines.iter().map(|l| l.top).min() {
                let dy = style.space_after - min_top;
                if dy != 0 {
                    for line in &mut self.lines {
                        line.shift(dy, 0, 0);
                    }
                    for &id in &self.chain {
                        self.arena.get_mut(id).shift(dy, 0);
                    }
                }
            }
        }

        let (gap_start, gap_end) = match forward {
            true => (style.space_before, style.space_after),
            false => (style.space_after, style.space_before),
        };
        let height = match self.lines.iter().map(|l| l.bottom).max() {
            Some(bottom) => bottom + gap_end,
            None => gap_start + gap_end,
        };

        self.cx.renderer.end_layout();

        let lines_built = self.resynced_at.unwrap_or(self.lines.len()) - self.first_new_line;
        BuildOutput {
            chain: self.chain,
            lines: self.lines,
            width: self.width,
            height,
            lines_built,
            resynced_at: self.resynced_at,
            aborted,
            runs: self.runs,
        }
    }
}
