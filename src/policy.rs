// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Direction of paragraph growth
//!
//! A [`LayoutPolicy`] tells the line builder where each line goes. Lines of a
//! [`Normal`] paragraph grow downwards from the top; lines of an
//! [`Inverted`] paragraph grow upwards from the bottom.

use crate::Line;

/// Vertical placement of one line
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LinePlacement {
    pub top: i32,
    pub baseline: i32,
    pub bottom: i32,
}

/// Direction-of-growth strategy used by the line builder
///
/// An *edge* is the vertical position from which the next line grows.
pub trait LayoutPolicy {
    /// True if lines grow downwards
    fn forward(&self) -> bool;

    /// Apply the gap before the first line to `edge`
    fn adjust_edge_for_initial_gap(&self, edge: i32, gap: i32) -> i32;

    /// Place a line of the given ascent and descent against `edge`
    fn base_line(&self, edge: i32, ascent: i32, descent: i32) -> LinePlacement;

    /// Edge from which the line after `line` grows
    fn setup_next_line(&self, line: &Line) -> i32;

    /// Edge from which `line` grew
    fn leading_edge(&self, line: &Line) -> i32;
}

/// Lines grow downwards
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Normal;

impl LayoutPolicy for Normal {
    fn forward(&self) -> bool {
        true
    }

    fn adjust_edge_for_initial_gap(&self, edge: i32, gap: i32) -> i32 {
        edge + gap
    }

    fn base_line(&self, edge: i32, ascent: i32, descent: i32) -> LinePlacement {
        LinePlacement {
            top: edge,
            baseline: edge + ascent,
            bottom: edge + ascent + descent,
        }
    }

    fn setup_next_line(&self, line: &Line) -> i32 {
        line.bottom
    }

    fn leading_edge(&self, line: &Line) -> i32 {
        line.top
    }
}

/// Lines grow upwards
///
/// The builder normalizes positions after layout so that the topmost line
/// starts at the paragraph's `space_after`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Inverted;

impl LayoutPolicy for Inverted {
    fn forward(&self) -> bool {
        false
    }

    fn adjust_edge_for_initial_gap(&self, edge: i32, gap: i32) -> i32 {
        edge - gap
    }

    fn base_line(&self, edge: i32, ascent: i32, descent: i32) -> LinePlacement {
        LinePlacement {
            top: edge - descent - ascent,
            baseline: edge - descent,
            bottom: edge,
        }
    }

    fn setup_next_line(&self, line: &Line) -> i32 {
        line.top
    }

    fn leading_edge(&self, line: &Line) -> i32 {
        line.bottom
    }
}

/// Select the policy for a paragraph
pub fn policy_for(inverted: bool) -> &'static dyn LayoutPolicy {
    match inverted {
        false => &Normal,
        true => &Inverted,
    }
}
