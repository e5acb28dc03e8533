//! Numeric helpers shared by the comparators.
//! Rounding, display formatting and fractional-digit counting for f64 values.

/// Highest rounding precision honored: the fractional digits of the smallest
/// subnormal f64. Larger requests are clamped.
pub const MAX_DECIMALS: u32 = 324;

/// Round `value` to `decimals` fractional digits (half-to-even on the exact
/// binary value). Non-finite values are returned unchanged.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let decimals = decimals.min(MAX_DECIMALS) as usize;
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

/// Render a double for display: shortest round-trip text, with `Infinity`,
/// `-Infinity` and `NaN` spelled out and negative zero shown as `0`.
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == f64::INFINITY {
        return "Infinity".to_string();
    }
    if value == f64::NEG_INFINITY {
        return "-Infinity".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{value}")
}

/// Round (when a precision is given) and render for display.
pub fn format_rounded(value: f64, decimals: Option<u32>) -> String {
    match decimals {
        Some(d) => format_double(round_to(value, d)),
        None => format_double(value),
    }
}

/// Number of fractional digits written in a numeric literal.
///
/// `"12.05"` → 2, `"12"` → 0, `"1.5e-3"` → 4 (exponent shifts the point).
/// Accepts `,` as the decimal separator.
pub fn fraction_digits(text: &str) -> u32 {
    let trimmed = text.trim();
    let (mantissa, exponent) = match trimmed.find(['e', 'E']) {
        Some(pos) => (&trimmed[..pos], trimmed[pos + 1..].parse::<i64>().unwrap_or(0)),
        None => (trimmed, 0),
    };
    let written = match mantissa.find(['.', ',']) {
        Some(pos) => mantissa[pos + 1..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .count() as i64,
        None => 0,
    };
    (written - exponent).clamp(0, MAX_DECIMALS as i64) as u32
}

/// Epsilon-inclusive `delta <= tolerance`: keeps human-decimal boundaries
/// (1.3 - 1.2 vs 0.1) passing under IEEE-754 representation error.
///
/// `magnitude` is the larger absolute operand the delta was taken from; the
/// epsilon band scales with it and with the tolerance, never with the delta.
/// An infinite delta only passes an infinite tolerance.
pub fn delta_within(delta: f64, tolerance: f64, magnitude: f64) -> bool {
    if delta.is_nan() || tolerance.is_nan() {
        return false;
    }
    if tolerance == f64::INFINITY {
        return true;
    }
    if !delta.is_finite() {
        return false;
    }
    let scale = magnitude.abs().max(tolerance.abs());
    let eps = f64::EPSILON * 16.0 * scale;
    delta <= tolerance + eps
}
