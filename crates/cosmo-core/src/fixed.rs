use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// Research costs and meter values use this type so that effect passes are
/// bit-for-bit reproducible across platforms.
pub type Fixed64 = I32F32;

/// Game turns. Turn 0 is the first turn of a game.
pub type Turn = u32;

/// Convert an f64 to Fixed64. Use only when loading content, never in an effect pass.
/// Panics on NaN; callers check finiteness first.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::saturating_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Checked division for Fixed64 that returns None on zero divisor.
#[inline]
pub fn checked_div_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_div(b)
}
