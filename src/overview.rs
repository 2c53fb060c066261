//! Downsampled lanes for drawing the three tracks.

use serde::Serialize;

use crate::series::{self, CALMNESS, MEDITATION};
use crate::session::Session;

/// Min/max of one column of the base waveform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveformOverview {
    pub base: Vec<Peak>,
    /// Mean biometric level per column in [0, 1], across the recording's
    /// own time span.
    pub biometric: Vec<f64>,
    /// Normalized climate level per column, by ordinal position.
    pub climate: Vec<f64>,
}

impl WaveformOverview {
    /// Build `width` columns per lane. Missing series give empty lanes.
    pub fn build(session: &Session, width: usize) -> Self {
        WaveformOverview {
            base: peaks(session.track.channel(0), width),
            biometric: biometric_lane(session, width),
            climate: climate_lane(session, width),
        }
    }
}

fn peaks(data: &[f32], width: usize) -> Vec<Peak> {
    if width == 0 {
        return Vec::new();
    }
    let step = data.len().div_ceil(width);
    (0..width)
        .map(|i| {
            let start = (i * step).min(data.len());
            let end = (start + step).min(data.len());
            let Some((&first, rest)) = data[start..end].split_first() else {
                return Peak { min: 0.0, max: 0.0 };
            };
            rest.iter().fold(Peak { min: first, max: first }, |p, &s| Peak {
                min: p.min.min(s),
                max: p.max.max(s),
            })
        })
        .collect()
}

fn biometric_lane(session: &Session, width: usize) -> Vec<f64> {
    let Some(last) = session.biometric.last() else {
        return Vec::new();
    };
    (0..width)
        .map(|i| {
            let t = i as f64 / width as f64 * last.time;
            series::interpolate(&session.biometric, t)
                .map(|v| {
                    let med = v.get(MEDITATION).copied().unwrap_or(0.0);
                    let calm = v.get(CALMNESS).copied().unwrap_or(0.0);
                    (med + calm) / 200.0
                })
                .unwrap_or(0.0)
        })
        .collect()
}

fn climate_lane(session: &Session, width: usize) -> Vec<f64> {
    if session.climate.is_empty() {
        return Vec::new();
    }
    (0..width)
        .map(|i| series::climate_level_at(&session.climate, i as f64 / width as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize_climate;
    use crate::dsp::buffer::AudioBuffer;
    use crate::series::TimedSample;

    #[test]
    fn base_peaks_per_column() {
        let track = AudioBuffer::new(vec![vec![0.1, -0.5, 0.9, 0.2, -0.3, 0.0]], 6).unwrap();
        let overview = WaveformOverview::build(&Session::new(track), 3);
        assert_eq!(
            overview.base,
            vec![
                Peak { min: -0.5, max: 0.1 },
                Peak { min: 0.2, max: 0.9 },
                Peak { min: -0.3, max: 0.0 },
            ]
        );
        assert!(overview.biometric.is_empty());
        assert!(overview.climate.is_empty());
    }

    #[test]
    fn short_track_pads_with_flat_columns() {
        let track = AudioBuffer::new(vec![vec![0.4, -0.4]], 2).unwrap();
        let overview = WaveformOverview::build(&Session::new(track), 4);
        assert_eq!(overview.base.len(), 4);
        assert_eq!(overview.base[3], Peak { min: 0.0, max: 0.0 });
    }

    #[test]
    fn data_lanes_span_their_series() {
        let track = AudioBuffer::new(vec![vec![0.0; 100]], 10).unwrap();
        let session = Session::new(track)
            .with_biometric(vec![
                TimedSample::biometric(0.0, 0.0, 0.0),
                TimedSample::biometric(4.0, 100.0, 100.0),
            ])
            .with_climate(normalize_climate(&[(1, 0.0), (2, 1.0), (3, 2.0)]));
        let overview = WaveformOverview::build(&session, 4);
        assert_eq!(overview.biometric, vec![0.0, 0.25, 0.5, 0.75]);
        assert_eq!(overview.climate, vec![0.0, 0.0, 0.5, 0.5]);
    }
}
