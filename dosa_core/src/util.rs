//! Common time and unit helpers for dosa_core.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u32 = 1_000;
/// Number of milliseconds in one minute.
pub const MILLIS_PER_MIN: f64 = 60_000.0;

/// Whole seconds to milliseconds, saturating at `u32::MAX`.
#[inline]
pub fn secs_to_ms(secs: u32) -> u32 {
    secs.saturating_mul(MILLIS_PER_SEC)
}

/// Round a non-negative millisecond quantity to `u32`.
/// Non-finite and negative values map to 0; large values saturate.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn ms_from_f64(ms: f64) -> u32 {
    if !ms.is_finite() || ms <= 0.0 {
        return 0;
    }
    let rounded = ms.round();
    if rounded >= f64::from(u32::MAX) {
        return u32::MAX;
    }
    // in (0, u32::MAX) here
    rounded as u32
}
