// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Line-break opportunities (Unicode Standard Annex #14)

use crate::renderer::BreakWeight;
use crate::source::{TextSource, HARD_LINE_BREAK, OBJECT_CHAR};
use std::str;
use xi_unicode::LineBreakIterator;

/// Indicator of a break opportunity at a char boundary
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Boundary {
    /// Breaking is not allowed
    #[default]
    None,
    /// Soft line break opportunity
    Soft,
    /// Mandatory line break
    Hard,
}

/// True for chars which force a line break after themselves
pub fn is_hard_break_char(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2029}' | HARD_LINE_BREAK
    )
}

/// True if a line may end after `c`
///
/// Line breakers can't easily tell the difference between the end of a slice
/// being a hard break and the last char being itself a hard or soft break.
/// To test whether `c` is breakable-after we construct the str "c " and "ca"
/// and check whether the line break logic flags a break at index 1.
pub fn is_break_after(c: char) -> bool {
    let mut bytes: [u8; 5] = [b' '; 5];
    c.encode_utf8(&mut bytes);
    let len = c.len_utf8();
    if let Ok(padded) = str::from_utf8(&bytes[0..=len]) {
        if LineBreakIterator::new(padded).next().map(|b| b.0) == Some(len) {
            return true;
        }
    }

    bytes[len] = b'a';
    if let Ok(padded) = str::from_utf8(&bytes[0..=len]) {
        if LineBreakIterator::new(padded).next().map(|b| b.0) == Some(len) {
            return true;
        }
    }

    false
}

/// Break opportunities over a paragraph's rendered text
///
/// Entry `i` describes the boundary before rendered char `i`; there are
/// `cch_ren + 1` entries. The boundary at the end of text is always `Hard`.
#[derive(Clone, Debug, Default)]
pub struct BreakTable {
    chars: Vec<char>,
    bounds: Vec<Boundary>,
}

impl BreakTable {
    /// Compute for the rendered text of `source`
    pub fn new(source: &dyn TextSource) -> Self {
        let len = source.cch_ren();
        let chars: Vec<char> = (0..len).map(|i| source.char_at(i)).collect();
        let text: String = chars.iter().collect();

        let mut byte_to_char = vec![0; text.len() + 1];
        for (n, (i, _)) in text.char_indices().enumerate() {
            byte_to_char[i] = n;
        }
        byte_to_char[text.len()] = len;

        let mut bounds = vec![Boundary::None; len + 1];
        for (pos, hard) in LineBreakIterator::new(&text) {
            bounds[byte_to_char[pos]] = match hard {
                true => Boundary::Hard,
                false => Boundary::Soft,
            };
        }
        // Embedded objects may always be broken around.
        for (i, c) in chars.iter().enumerate() {
            if *c == OBJECT_CHAR && source.object_at(i).is_some() {
                if bounds[i] == Boundary::None {
                    bounds[i] = Boundary::Soft;
                }
                if bounds[i + 1] == Boundary::None {
                    bounds[i + 1] = Boundary::Soft;
                }
            }
        }
        bounds[len] = Boundary::Hard;
        if len == 0 {
            bounds[0] = Boundary::Hard;
        }

        BreakTable { chars, bounds }
    }

    /// True if this table was computed for the given text
    pub fn matches(&self, source: &dyn TextSource) -> bool {
        self.chars.len() == source.cch_ren()
            && self
                .chars
                .iter()
                .enumerate()
                .all(|(i, c)| *c == source.char_at(i))
    }

    /// Number of rendered chars covered
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// The boundary before char `ich`
    pub fn boundary(&self, ich: usize) -> Boundary {
        self.bounds.get(ich).copied().unwrap_or(Boundary::Hard)
    }

    /// True if a line may end at boundary `ich`
    pub fn allows_break(&self, ich: usize) -> bool {
        self.boundary(ich) != Boundary::None
    }

    /// Quality of a break at boundary `ich` (which must be greater than zero)
    pub fn weight(&self, ich: usize) -> BreakWeight {
        debug_assert!(ich > 0);
        match self.boundary(ich) {
            Boundary::None => BreakWeight::Letter,
            Boundary::Soft | Boundary::Hard => match self.chars[ich - 1].is_whitespace() {
                true => BreakWeight::Ws,
                false => BreakWeight::Word,
            },
        }
    }
}
