//! Master fade envelope: raised-cosine fade in and fade out.

use std::f64::consts::PI;

/// Length of each fade, in seconds.
pub const FADE_DURATION: f64 = 30.0;

/// Master fade multiplier in [0, 1] at `elapsed` seconds into a piece of
/// `total` seconds, using the standard 30 s fades.
pub fn fade_envelope(elapsed: f64, total: f64) -> f64 {
    fade_envelope_with(elapsed, total, FADE_DURATION)
}

/// Master fade multiplier with an explicit fade length.
///
/// The in and out curves are evaluated independently and the lower one
/// wins, so pieces shorter than two fades get a smooth tent instead of two
/// overlapping ramps. A non-positive `total` (or `fade`) yields 1.
pub fn fade_envelope_with(elapsed: f64, total: f64, fade: f64) -> f64 {
    if total <= 0.0 || fade <= 0.0 {
        return 1.0;
    }

    let mut level = 1.0;
    if elapsed < fade {
        level = fade_in(elapsed, fade);
    }

    let remaining = total - elapsed;
    if remaining < fade {
        level = f64::min(level, fade_out(remaining, fade));
    }

    level
}

/// Rising half-cosine: 0 at `elapsed = 0`, 1 at `elapsed = fade`.
pub fn fade_in(elapsed: f64, fade: f64) -> f64 {
    0.5 * (1.0 - (PI * elapsed / fade).cos())
}

/// Falling half-cosine: 1 with `fade` seconds remaining, 0 at the end.
pub fn fade_out(remaining: f64, fade: f64) -> f64 {
    0.5 * (1.0 + (PI * (1.0 - remaining / fade)).cos())
}
