//! Sparse input series and the lookups the mix engine runs against them.
//!
//! Biometric samples carry a relative time and named channel values; climate
//! samples are addressed by ordinal position only. Both are built once at
//! load time and never mutated afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Channel driving overtone A.
pub const MEDITATION: &str = "meditation";
/// Channel driving overtone B.
pub const CALMNESS: &str = "calmness";
/// The two biometric channels, in overtone order.
pub const BIOMETRIC_CHANNELS: [&str; 2] = [MEDITATION, CALMNESS];

/// Full scale of the headband's 0–100 instrument values.
const BIOMETRIC_SCALE: f64 = 100.0;

/// One biometric reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSample {
    /// Seconds since the first recorded sample.
    pub time: f64,
    pub values: BTreeMap<String, f64>,
}

impl TimedSample {
    pub fn new(time: f64, values: impl IntoIterator<Item = (String, f64)>) -> Self {
        TimedSample {
            time,
            values: values.into_iter().collect(),
        }
    }

    /// Convenience constructor for the two headband channels.
    pub fn biometric(time: f64, meditation: f64, calmness: f64) -> Self {
        Self::new(
            time,
            [
                (MEDITATION.to_string(), meditation),
                (CALMNESS.to_string(), calmness),
            ],
        )
    }

    pub fn get(&self, channel: &str) -> Option<f64> {
        self.values.get(channel).copied()
    }
}

/// One year of the climate series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateSample {
    /// Ordinal position in the series. Not a time.
    pub index: usize,
    pub year: i32,
    /// Raw anomaly as read from the source.
    pub anomaly: f64,
    /// Anomaly normalized over the whole series' min/max, in [0, 1].
    pub normalized: f64,
}

/// Linearly interpolate every channel of `series` at `query`.
///
/// Returns `None` only for an empty series. Queries before the first sample
/// or at/after the last clamp to that sample; there is no extrapolation.
/// The bracket is inclusive on the left, so a query landing exactly on a
/// sample time returns that sample's values.
pub fn interpolate(series: &[TimedSample], query: f64) -> Option<BTreeMap<String, f64>> {
    let first = series.first()?;
    let last = series.last()?;

    if query.is_nan() || query <= first.time {
        return Some(first.values.clone());
    }
    if query >= last.time {
        return Some(last.values.clone());
    }

    // First index whose time is past the query; `first.time < query` keeps it >= 1.
    let next_idx = series.partition_point(|s| s.time <= query).max(1);
    let prev = &series[next_idx - 1];
    let next = &series[next_idx.min(series.len() - 1)];

    let span = next.time - prev.time;
    let t = if span != 0.0 {
        (query - prev.time) / span
    } else {
        0.0
    };

    Some(
        prev.values
            .iter()
            .map(|(name, &a)| {
                let b = next.values.get(name).copied().unwrap_or(a);
                (name.clone(), a + t * (b - a))
            })
            .collect(),
    )
}

/// Normalized climate level at a fraction of the way through the track.
///
/// Maps playback progress straight onto ordinal position in the series:
/// `series[floor(progress * (len - 1))]`, index clamped to the series.
/// An empty series reads as 0.
pub fn climate_level_at(series: &[ClimateSample], progress: f64) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let last = (series.len() - 1) as f64;
    let idx = (progress * last).floor().clamp(0.0, last);
    // NaN casts to 0.
    series[idx as usize].normalized
}

/// Map a raw 0–100 headband value into [0, 1].
pub fn normalize_biometric(raw: f64) -> f64 {
    (raw / BIOMETRIC_SCALE).clamp(0.0, 1.0)
}
