pub type Real = f32;

#[doc(inline)]
pub use std::f32::consts::*;

/// Wrapper around `Real::sin`.
///
/// This allows the sine function to be imported and written as `sin(PI)`
/// instead of `Real::sin(PI)` or `PI.sin()`, which is the syntax I prefer.
pub fn sin(x: Real) -> Real {
    x.sin()
}

/// Wrapper around `Real::cos`.
///
/// This allows the cosine function to be imported and written as `cos(PI)`
/// instead of `Real::cos(PI)` or `PI.cos()`, which is the syntax I prefer.
pub fn cos(x: Real) -> Real {
    x.cos()
}

/// Integer division rounding half away from zero. `den` must be positive.
pub fn round_div(num: i64, den: i64) -> i64 {
    debug_assert!(den > 0);
    if num >= 0 {
        (num + den / 2) / den
    } else {
        (num - den / 2) / den
    }
}

/// Clamp `x` into `[min, max]` and narrow it to `i32`.
pub fn saturate(x: i64, min: i32, max: i32) -> i32 {
    x.clamp(min as i64, max as i64) as i32
}

/// Clamp `x` into the `i16` range.
pub fn saturate_i16(x: i32) -> i16 {
    x.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
