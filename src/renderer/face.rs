// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Font-file backed metrics

use super::Metrics;
use crate::conv::mul_div;
use crate::linebreak::is_hard_break_char;
use crate::source::CharProps;
use thiserror::Error;
use ttf_parser::Face;

/// Font loading errors
#[derive(Error, Debug)]
pub enum FaceError {
    #[error("font load error")]
    TtfParser(#[from] ttf_parser::FaceParsingError),
    #[error("font has zero units per em")]
    BadScale,
}

/// [`Metrics`] read from a single font face
///
/// All writing systems use the same face. Font units are scaled by
/// [`CharProps::size`] (milli-points per em).
#[derive(Clone, Debug)]
pub struct FaceMetrics<'a> {
    face: Face<'a>,
    units_per_em: i32,
}

impl<'a> FaceMetrics<'a> {
    /// Parse face `index` of font `data`
    pub fn parse(data: &'a [u8], index: u32) -> Result<Self, FaceError> {
        let face = Face::parse(data, index)?;
        let units_per_em = i32::from(face.units_per_em());
        if units_per_em == 0 {
            return Err(FaceError::BadScale);
        }
        Ok(FaceMetrics { face, units_per_em })
    }

    /// Access the parsed face
    pub fn face(&self) -> &Face<'a> {
        &self.face
    }

    #[inline]
    fn scale(&self, units: i32, props: &CharProps) -> i32 {
        mul_div(units, props.size, self.units_per_em)
    }
}

impl<'a> Metrics for FaceMetrics<'a> {
    fn advance(&self, c: char, props: &CharProps) -> i32 {
        if is_hard_break_char(c) {
            return 0;
        }
        // GlyphId 0 is the 'missing glyph' representation.
        let id = self.face.glyph_index(c).unwrap_or(ttf_parser::GlyphId(0));
        let units = self.face.glyph_hor_advance(id).unwrap_or(0);
        self.scale(i32::from(units), props)
    }

    fn ascent(&self, props: &CharProps) -> i32 {
        self.scale(i32::from(self.face.ascender()), props)
    }

    fn descent(&self, props: &CharProps) -> i32 {
        self.scale(-i32::from(self.face.descender()), props)
    }
}
