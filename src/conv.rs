// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Type conversion utilities
//!
//! Character indices are represented as `u32` inside boxes and ranges in
//! order to save space (paragraphs are not expected to approach `u32::MAX`
//! characters, so `u32` is always an appropriate index type).
//!
//! Widths and offsets are `i32` values in a fixed internal unit (typically
//! milli-points). Scaling between units uses [`mul_div`].

use easy_cast::{Cast, Conv};

/// Convert `usize` → `u32`
///
/// This is a "safer" wrapper around `as` ensuring (on debug builds) that the
/// input value may be represented correctly by `u32`.
#[inline]
pub fn to_u32(x: usize) -> u32 {
    x.cast()
}

/// Convert `u32` → `usize`
///
/// This is a "safer" wrapper around `as` ensuring that the operation is
/// zero-extension.
#[inline]
pub fn to_usize(x: u32) -> usize {
    x.cast()
}

/// Compute `value * num / den`, rounding to nearest
///
/// Ties round away from zero. The intermediate product is computed in 64 bits
/// and the result saturates to the `i32` range. A zero `den` yields zero.
pub fn mul_div(value: i32, num: i32, den: i32) -> i32 {
    if den == 0 {
        return 0;
    }
    let prod = i64::from(value) * i64::from(num);
    let den = i64::from(den);
    let half = den.abs() / 2;
    let (prod, den) = if den < 0 { (-prod, -den) } else { (prod, den) };
    let q = if prod >= 0 {
        (prod + half) / den
    } else {
        -((-prod + half) / den)
    };
    i32::conv(q.clamp(i64::from(i32::MIN), i64::from(i32::MAX)))
}
