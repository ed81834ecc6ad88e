// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! A simple renderer: per-char advances, no shaping
//!
//! This renderer measures text as a sum of per-char advances supplied by a
//! [`Metrics`] implementation and breaks lines at UAX #14 opportunities.
//! It does not perform shaping, kerning or glyph substitution.

use super::{BreakWeight, EndSeg, MeasureError, Renderer, SegmentRequest, WsHandling};
use crate::conv::mul_div;
use crate::linebreak::{is_hard_break_char, BreakTable};
use crate::segment::count_gaps;
use crate::source::{CharProps, TextSource, VerticalOffset, WsId, OBJECT_CHAR};
use crate::Segment;
use std::collections::HashMap;

/// Provider of character metrics
pub trait Metrics {
    /// Horizontal advance of `c`
    fn advance(&self, c: char, props: &CharProps) -> i32;

    /// Ascent of the font selected by `props`
    fn ascent(&self, props: &CharProps) -> i32;

    /// Descent of the font selected by `props` (positive downwards)
    fn descent(&self, props: &CharProps) -> i32;
}

/// Metrics of a fixed-pitch font at [`FixedMetrics::REFERENCE_SIZE`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CharMetrics {
    /// Advance of visible chars
    pub advance: i32,
    /// Advance of whitespace
    pub space: i32,
    pub ascent: i32,
    pub descent: i32,
}

impl CharMetrics {
    /// Construct with whitespace as wide as visible chars
    pub const fn new(advance: i32, ascent: i32, descent: i32) -> Self {
        CharMetrics {
            advance,
            space: advance,
            ascent,
            descent,
        }
    }
}

/// Fixed-pitch metrics, optionally per writing system
///
/// Values scale linearly with [`CharProps::size`].
#[derive(Clone, Debug)]
pub struct FixedMetrics {
    default: CharMetrics,
    by_ws: HashMap<WsId, CharMetrics>,
}

impl FixedMetrics {
    /// Font size at which [`CharMetrics`] apply (10pt in milli-points)
    pub const REFERENCE_SIZE: i32 = 10_000;

    /// Construct with metrics for all writing systems
    pub fn new(default: CharMetrics) -> Self {
        FixedMetrics {
            default,
            by_ws: HashMap::new(),
        }
    }

    /// Use different metrics for writing system `ws`
    pub fn with_ws(mut self, ws: WsId, metrics: CharMetrics) -> Self {
        self.by_ws.insert(ws, metrics);
        self
    }

    fn get(&self, props: &CharProps) -> &CharMetrics {
        self.by_ws.get(&props.ws).unwrap_or(&self.default)
    }

    fn scale(&self, value: i32, props: &CharProps) -> i32 {
        mul_div(value, props.size, Self::REFERENCE_SIZE)
    }
}

impl Metrics for FixedMetrics {
    fn advance(&self, c: char, props: &CharProps) -> i32 {
        let m = self.get(props);
        let advance = if is_hard_break_char(c) || is_zero_width(c) {
            0
        } else if c.is_whitespace() {
            m.space
        } else {
            m.advance
        };
        self.scale(advance, props)
    }

    fn ascent(&self, props: &CharProps) -> i32 {
        self.scale(self.get(props).ascent, props)
    }

    fn descent(&self, props: &CharProps) -> i32 {
        self.scale(self.get(props).descent, props)
    }
}

fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2069}')
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Stop {
    /// Reached the end of the searched range
    Limit,
    /// Next char is a hard break
    Hard,
    /// Next char is an embedded object
    Object,
    /// Next char is whitespace (with [`WsHandling::NoWs`])
    Ws,
    /// Next char is visible (with [`WsHandling::OnlyWs`])
    Visible,
}

#[derive(Copy, Clone, Debug)]
struct Candidate {
    lim: usize,
    advance: i32,
    visible: i32,
}

/// A renderer over a [`Metrics`] provider
#[derive(Clone, Debug)]
pub struct SimpleRenderer<M> {
    metrics: M,
    table: BreakTable,
    in_layout: bool,
}

impl<M: Metrics> SimpleRenderer<M> {
    /// Construct
    pub fn new(metrics: M) -> Self {
        SimpleRenderer {
            metrics,
            table: BreakTable::default(),
            in_layout: false,
        }
    }

    /// Access metrics
    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Ascent and descent, adjusted for vertical offset
    fn vertical(&self, props: &CharProps) -> (i32, i32) {
        let ascent = self.metrics.ascent(props);
        let descent = self.metrics.descent(props);
        let rise = mul_div(ascent, 1, 3);
        match props.offset {
            VerticalOffset::None => (ascent, descent),
            VerticalOffset::Superscript => (ascent + rise, (descent - rise).max(0)),
            VerticalOffset::Subscript => ((ascent - rise).max(0), descent + rise),
        }
    }
}

impl<M: Metrics> Renderer for SimpleRenderer<M> {
    fn begin_layout(&mut self, source: &dyn TextSource) {
        if !self.table.matches(source) {
            self.table = BreakTable::new(source);
        }
        self.in_layout = true;
    }

    fn end_layout(&mut self) {
        self.in_layout = false;
    }

    fn find_break_point(
        &mut self,
        source: &dyn TextSource,
        req: &SegmentRequest<'_>,
    ) -> Result<Option<Segment>, MeasureError> {
        let cch = source.cch_ren();
        if req.ich_min > req.ich_lim || req.ich_lim > cch {
            return Err(MeasureError::OutOfRange(req.ich_min, req.ich_lim));
        }
        if !self.in_layout && !self.table.matches(source) {
            self.table = BreakTable::new(source);
        }
        let table = &self.table;

        let (props, run) = source.char_props(req.ich_min);
        let lim = req.ich_lim.min(run.end()).max(req.ich_min);
        let search_lim = match req.need_final_break {
            true => lim.min(req.ich_lim_backtrack),
            false => lim,
        };

        let mut best_pref: Option<Candidate> = None;
        let mut best_max: Option<Candidate> = None;
        let mut index = req.ich_min;
        let mut advance = 0;
        let mut visible = 0;
        let mut stop = Stop::Limit;
        let mut overflow = None;

        while index < search_lim {
            let c = source.char_at(index);
            if is_hard_break_char(c) {
                stop = Stop::Hard;
                break;
            }
            if c == OBJECT_CHAR && source.object_at(index).is_some() {
                stop = Stop::Object;
                break;
            }
            let is_ws = c.is_whitespace();
            match req.ws {
                WsHandling::NoWs if is_ws => {
                    stop = Stop::Ws;
                    break;
                }
                WsHandling::OnlyWs if !is_ws => {
                    stop = Stop::Visible;
                    break;
                }
                _ => (),
            }

            let w = self.metrics.advance(c, &props);
            let new_visible = if is_ws { visible } else { advance + w };
            if new_visible > req.max_width {
                overflow = Some(w);
                break;
            }
            advance += w;
            visible = new_visible;
            index += 1;

            let weight = table.weight(index);
            let cand = Candidate {
                lim: index,
                advance,
                visible,
            };
            if weight <= req.lb_pref {
                best_pref = Some(cand);
            }
            if weight <= req.lb_max {
                best_max = Some(cand);
            }
        }

        let (ascent, descent) = self.vertical(&props);
        let make = |cand: Candidate, end: EndSeg, can_end: bool| {
            let range = crate::Range::from(req.ich_min..cand.lim);
            let (interior, trailing) = count_gaps(range.to_std().map(|i| source.char_at(i)));
            Segment::new(
                range,
                cand.advance,
                cand.advance - cand.visible,
                (ascent, descent),
                props.level,
                end,
            )
            .with_can_end_line(can_end)
            .with_ws(req.ws)
            .with_gaps(interior, trailing)
        };

        if overflow.is_some() || req.need_final_break {
            // Break at the best candidate, preferring weight <= lb_pref
            if let Some(cand) = best_pref.or(best_max) {
                return Ok(Some(make(cand, EndSeg::MoreLines, true)));
            }
            if let Some(w) = overflow {
                if req.lb_max == BreakWeight::Clip && req.start_line && index == req.ich_min {
                    let cand = Candidate {
                        lim: index + 1,
                        advance: w,
                        visible: w,
                    };
                    return Ok(Some(make(cand, EndSeg::MoreLines, true)));
                }
            }
            return Ok(None);
        }

        let end = match stop {
            Stop::Hard | Stop::Object => EndSeg::HardBreak,
            Stop::Ws => EndSeg::WsBreak,
            Stop::Visible => EndSeg::OkayBreak,
            Stop::Limit if index == req.ich_lim || index == cch => EndSeg::NoMore,
            Stop::Limit if table.allows_break(index) => EndSeg::OkayBreak,
            Stop::Limit => EndSeg::BadBreak,
        };
        if index == req.ich_min && !matches!(end, EndSeg::HardBreak | EndSeg::NoMore) {
            return Ok(None);
        }

        let can_end = index == cch || end == EndSeg::HardBreak || table.allows_break(index);
        let cand = Candidate {
            lim: index,
            advance,
            visible,
        };
        Ok(Some(make(cand, end, can_end)))
    }

    fn ellipsis_width(&mut self, props: &CharProps) -> i32 {
        self.metrics.advance('\u{2026}', props)
    }
}
