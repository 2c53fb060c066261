//! Single-pole exponential smoothing for per-tick level measurements.
//!
//! The recurrence has no notion of time: it advances once per engine tick
//! regardless of tick spacing. Live and offline drivers must use the same
//! alphas for their automation curves to agree.

/// Track RMS level. Fast.
pub const TRACK_LEVEL_ALPHA: f64 = 0.85;
/// Each biometric channel.
pub const BIOMETRIC_ALPHA: f64 = 0.9;
/// Climate level. Slowest, the series is coarse.
pub const CLIMATE_ALPHA: f64 = 0.95;

/// `next = prev * alpha + measurement * (1 - alpha)`, starting from 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoother {
    alpha: f64,
    value: f64,
}

impl Smoother {
    pub const fn new(alpha: f64) -> Self {
        Smoother { alpha, value: 0.0 }
    }

    pub const fn track_level() -> Self {
        Self::new(TRACK_LEVEL_ALPHA)
    }

    pub const fn biometric() -> Self {
        Self::new(BIOMETRIC_ALPHA)
    }

    pub const fn climate() -> Self {
        Self::new(CLIMATE_ALPHA)
    }

    /// Fold one measurement in and return the new smoothed value.
    #[inline]
    pub fn next(&mut self, measurement: f64) -> f64 {
        self.value = self.value * self.alpha + measurement * (1.0 - self.alpha);
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}
