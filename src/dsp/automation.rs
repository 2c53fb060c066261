//! Mix automation engine: per-tick layer gains from the input series.
//!
//! One engine serves both drivers: the live player ticks it from an
//! animation loop with irregular spacing, the offline renderer ticks it on a
//! fixed grid. Given the same elapsed times, track windows and config, the
//! two produce identical frames.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::series::{self, BIOMETRIC_CHANNELS, ClimateSample, TimedSample};

use super::envelope::fade_envelope;
use super::meter;
use super::smoother::Smoother;

/// UI level at which a layer plays at its reference gain.
pub const NOMINAL_LEVEL: f64 = 0.2;
/// Default `overtoneLevel` / `rippleLevel`.
pub const DEFAULT_LAYER_LEVEL: f64 = 0.15;
/// Overtones never drop below this share of their gain, even over silence.
pub const TRACK_LEVEL_FLOOR: f64 = 0.2;
/// Reference gain of each overtone.
pub const OVERTONE_HEADROOM: f64 = 0.2;
/// Reference gain of the water loop.
pub const WATER_HEADROOM: f64 = 0.1;

/// Listener-facing mix settings, read on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MixConfig {
    pub base_enabled: bool,
    pub overtones_enabled: bool,
    pub ripple_enabled: bool,
    /// Overtone level, nominally 0.15 on a 0–0.3 slider.
    pub overtone_level: f64,
    /// Water level, same range as `overtone_level`.
    pub ripple_level: f64,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            base_enabled: true,
            overtones_enabled: true,
            ripple_enabled: true,
            overtone_level: DEFAULT_LAYER_LEVEL,
            ripple_level: DEFAULT_LAYER_LEVEL,
        }
    }
}

impl MixConfig {
    /// Parse a JSON config. Missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, ParseError> {
        serde_json::from_str(text).map_err(|e| ParseError::Config(e.to_string()))
    }
}

/// Read-only inputs of one playback session.
#[derive(Debug, Clone, Copy)]
pub struct MixSources<'a> {
    pub biometric: &'a [TimedSample],
    pub climate: &'a [ClimateSample],
    /// Total track duration in seconds.
    pub duration: f64,
}

/// Smoothed biometric levels: `a` drives overtone A, `b` overtone B.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BiometricLevels {
    pub a: f64,
    pub b: f64,
}

/// Every gain the mix needs at one timeline position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixFrame {
    /// Shared bus fade. Not folded into the per-layer gains below.
    pub master_envelope: f64,
    pub base_gain: f64,
    pub overtone_gains: [f64; 2],
    pub water_gain: f64,
    pub smoothed_biometric: BiometricLevels,
    pub smoothed_climate_level: f64,
    pub smoothed_track_level: f64,
}

/// Smoothing state of one in-progress playback.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    biometric: [Smoother; 2],
    climate: Smoother,
    track_level: Smoother,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineState {
    pub fn new() -> Self {
        EngineState {
            biometric: [Smoother::biometric(), Smoother::biometric()],
            climate: Smoother::climate(),
            track_level: Smoother::track_level(),
        }
    }

    pub fn smoothed_biometric(&self) -> BiometricLevels {
        BiometricLevels {
            a: self.biometric[0].value(),
            b: self.biometric[1].value(),
        }
    }

    pub fn smoothed_climate_level(&self) -> f64 {
        self.climate.value()
    }

    pub fn smoothed_track_level(&self) -> f64 {
        self.track_level.value()
    }

    /// Advance the smoothers by one tick and compute the frame at `elapsed`.
    ///
    /// `track_window` is the most recent channel-0 audio at the playhead;
    /// without it the track level holds its last value. Disabled layers
    /// report zero gain but their smoothers keep advancing, so re-enabling
    /// picks up where the data is rather than ramping from zero.
    pub fn tick(
        &mut self,
        sources: &MixSources<'_>,
        elapsed: f64,
        track_window: Option<&[f32]>,
        config: &MixConfig,
    ) -> MixFrame {
        let master_envelope = fade_envelope(elapsed, sources.duration);
        let base_gain = if config.base_enabled { 1.0 } else { 0.0 };

        if let Some(window) = track_window {
            self.track_level.next(meter::track_level(window));
        }

        let mut overtone_gains = [0.0; 2];
        if let Some(sample) = series::interpolate(sources.biometric, elapsed) {
            let presence = self.track_level.value().max(TRACK_LEVEL_FLOOR);
            for (i, channel) in BIOMETRIC_CHANNELS.iter().enumerate() {
                if let Some(&raw) = sample.get(*channel) {
                    self.biometric[i].next(series::normalize_biometric(raw));
                }
                if config.overtones_enabled {
                    overtone_gains[i] = self.biometric[i].value()
                        * (config.overtone_level / NOMINAL_LEVEL)
                        * presence
                        * OVERTONE_HEADROOM;
                }
            }
        }

        let mut water_gain = 0.0;
        if !sources.climate.is_empty() {
            let progress = if sources.duration > 0.0 {
                elapsed / sources.duration
            } else {
                0.0
            };
            let level = self
                .climate
                .next(series::climate_level_at(sources.climate, progress));
            if config.ripple_enabled {
                water_gain =
                    (config.ripple_level / NOMINAL_LEVEL) * (0.5 + level * 0.5) * WATER_HEADROOM;
            }
        }

        MixFrame {
            master_envelope,
            base_gain,
            overtone_gains,
            water_gain,
            smoothed_biometric: self.smoothed_biometric(),
            smoothed_climate_level: self.climate.value(),
            smoothed_track_level: self.track_level.value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    Running {
        start_offset: f64,
        state: EngineState,
    },
}

/// Idle/Running wrapper owning the state of at most one playback.
#[derive(Debug, Clone, PartialEq)]
pub struct MixEngine {
    phase: Phase,
}

impl Default for MixEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MixEngine {
    pub fn new() -> Self {
        MixEngine { phase: Phase::Idle }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    /// Timeline position the running session started from.
    pub fn start_offset(&self) -> Option<f64> {
        match &self.phase {
            Phase::Running { start_offset, .. } => Some(*start_offset),
            Phase::Idle => None,
        }
    }

    /// Begin a session with fresh smoothing state. Returns `false` and
    /// leaves the running session untouched if one is already active.
    pub fn start(&mut self, start_offset: f64) -> bool {
        if self.is_running() {
            return false;
        }
        self.phase = Phase::Running {
            start_offset,
            state: EngineState::new(),
        };
        true
    }

    /// Discard the session's state. Returns `false` if already idle.
    pub fn stop(&mut self) -> bool {
        let was_running = self.is_running();
        self.phase = Phase::Idle;
        was_running
    }

    pub fn state(&self) -> Option<&EngineState> {
        match &self.phase {
            Phase::Running { state, .. } => Some(state),
            Phase::Idle => None,
        }
    }

    /// Tick the running session. Idle engines produce no frame.
    pub fn tick(
        &mut self,
        sources: &MixSources<'_>,
        elapsed: f64,
        track_window: Option<&[f32]>,
        config: &MixConfig,
    ) -> Option<MixFrame> {
        match &mut self.phase {
            Phase::Running { state, .. } => Some(state.tick(sources, elapsed, track_window, config)),
            Phase::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn biometric() -> Vec<TimedSample> {
        vec![
            TimedSample::biometric(0.0, 50.0, 50.0),
            TimedSample::biometric(10.0, 100.0, 0.0),
        ]
    }

    fn climate(values: &[f64]) -> Vec<ClimateSample> {
        values
            .iter()
            .enumerate()
            .map(|(index, &normalized)| ClimateSample {
                index,
                year: 2000 + index as i32,
                anomaly: normalized,
                normalized,
            })
            .collect()
    }

    #[test]
    fn overtone_gain_follows_smoothed_biometrics() {
        let bio = biometric();
        let sources = MixSources {
            biometric: &bio,
            climate: &[],
            duration: 120.0,
        };
        let mut state = EngineState::new();
        let frame = state.tick(&sources, 5.0, None, &MixConfig::default());

        // One tick from zero: 0.1 of the normalized {0.75, 0.25}.
        assert!((frame.smoothed_biometric.a - 0.075).abs() < 1e-12);
        assert!((frame.smoothed_biometric.b - 0.025).abs() < 1e-12);

        // Track level unknown, so presence sits on the 0.2 floor.
        let expected_a = 0.075 * (0.15 / 0.2) * 0.2 * 0.2;
        assert!((frame.overtone_gains[0] - expected_a).abs() < 1e-12);
        assert!(frame.overtone_gains[1] < frame.overtone_gains[0]);
    }

    #[test]
    fn base_gain_ignores_envelope() {
        let sources = MixSources {
            biometric: &[],
            climate: &[],
            duration: 300.0,
        };
        let mut state = EngineState::new();
        let frame = state.tick(&sources, 0.0, None, &MixConfig::default());
        assert_eq!(frame.master_envelope, 0.0);
        assert_eq!(frame.base_gain, 1.0);

        let muted = MixConfig {
            base_enabled: false,
            ..MixConfig::default()
        };
        let frame = state.tick(&sources, 100.0, None, &muted);
        assert_eq!(frame.master_envelope, 1.0);
        assert_eq!(frame.base_gain, 0.0);
    }

    #[test]
    fn empty_series_contribute_nothing() {
        let sources = MixSources {
            biometric: &[],
            climate: &[],
            duration: 60.0,
        };
        let mut state = EngineState::new();
        for i in 0..50 {
            let frame = state.tick(&sources, i as f64, Some(&[0.5; 64][..]), &MixConfig::default());
            assert_eq!(frame.overtone_gains, [0.0, 0.0]);
            assert_eq!(frame.water_gain, 0.0);
        }
        assert!(state.smoothed_track_level() > 0.0);
    }

    #[test]
    fn disabled_overtones_are_silent_but_keep_smoothing() {
        let bio = biometric();
        let sources = MixSources {
            biometric: &bio,
            climate: &[],
            duration: 100.0,
        };
        let off = MixConfig {
            overtones_enabled: false,
            ..MixConfig::default()
        };

        let mut state = EngineState::new();
        for i in 0..40 {
            let frame = state.tick(&sources, i as f64 * 0.1, None, &off);
            assert_eq!(frame.overtone_gains, [0.0, 0.0]);
        }
        let held = state.smoothed_biometric();
        assert!(held.a > 0.3, "smoothing should have advanced, got {}", held.a);

        let frame = state.tick(&sources, 4.0, None, &MixConfig::default());
        // Resumes from the held value, not from zero.
        assert!(frame.smoothed_biometric.a > held.a);
        let from_zero = EngineState::new().tick(&sources, 4.0, None, &MixConfig::default());
        assert!(frame.overtone_gains[0] > from_zero.overtone_gains[0] * 3.0);
    }

    #[test]
    fn loud_track_lifts_overtones_above_floor() {
        let bio = biometric();
        let sources = MixSources {
            biometric: &bio,
            climate: &[],
            duration: 100.0,
        };
        let config = MixConfig::default();
        let silence = [0.0f32; 256];
        let blast = [0.8f32; 256];
        let mut quiet = EngineState::new();
        let mut loud = EngineState::new();
        let (mut q, mut l) = (None, None);
        for i in 0..30 {
            let t = i as f64 * 0.1;
            q = Some(quiet.tick(&sources, t, Some(&silence[..]), &config));
            l = Some(loud.tick(&sources, t, Some(&blast[..]), &config));
        }
        let (q, l) = (q.unwrap(), l.unwrap());
        assert_eq!(q.smoothed_track_level, 0.0);
        assert!(l.smoothed_track_level > 0.95);
        assert!(l.overtone_gains[0] > q.overtone_gains[0] * 4.0);
    }

    #[test]
    fn water_gain_tracks_climate() {
        let clim = climate(&[1.0, 1.0, 1.0]);
        let sources = MixSources {
            biometric: &[],
            climate: &clim,
            duration: 10.0,
        };
        let mut state = EngineState::new();
        let mut frame = state.tick(&sources, 0.0, None, &MixConfig::default());
        assert!((frame.smoothed_climate_level - 0.05).abs() < 1e-12);
        for i in 0..2000 {
            frame = state.tick(&sources, (i % 100) as f64 * 0.1, None, &MixConfig::default());
        }
        let expected = (0.15 / 0.2) * (0.5 + 1.0 * 0.5) * 0.1;
        assert!((frame.water_gain - expected).abs() < 1e-9);

        let off = MixConfig {
            ripple_enabled: false,
            ..MixConfig::default()
        };
        let frame = state.tick(&sources, 5.0, None, &off);
        assert_eq!(frame.water_gain, 0.0);
        assert!(frame.smoothed_climate_level > 0.99);
    }

    #[test]
    fn zero_duration_does_not_poison_frames() {
        let bio = biometric();
        let clim = climate(&[0.0, 0.5, 1.0]);
        let sources = MixSources {
            biometric: &bio,
            climate: &clim,
            duration: 0.0,
        };
        let frame = EngineState::new().tick(&sources, 3.0, None, &MixConfig::default());
        assert_eq!(frame.master_envelope, 1.0);
        assert!(frame.water_gain.is_finite());
        assert!(frame.overtone_gains.iter().all(|g| g.is_finite()));
    }

    #[test]
    fn engine_runs_one_session_at_a_time() {
        let sources = MixSources {
            biometric: &[],
            climate: &[],
            duration: 60.0,
        };
        let mut engine = MixEngine::new();
        assert!(engine.tick(&sources, 0.0, None, &MixConfig::default()).is_none());

        assert!(engine.start(12.0));
        assert!(!engine.start(30.0));
        assert_eq!(engine.start_offset(), Some(12.0));

        engine.tick(&sources, 12.0, Some(&[0.5; 32][..]), &MixConfig::default());
        assert!(engine.state().unwrap().smoothed_track_level() > 0.0);

        assert!(engine.stop());
        assert!(!engine.stop());
        assert!(engine.state().is_none());

        engine.start(0.0);
        assert_eq!(engine.state().unwrap().smoothed_track_level(), 0.0);
    }

    #[test]
    fn config_json_uses_camel_case_and_defaults() {
        let config = MixConfig::from_json(r#"{"overtonesEnabled": false, "rippleLevel": 0.3}"#).unwrap();
        assert!(!config.overtones_enabled);
        assert!(config.base_enabled);
        assert_eq!(config.ripple_level, 0.3);
        assert_eq!(config.overtone_level, DEFAULT_LAYER_LEVEL);

        assert!(matches!(
            MixConfig::from_json("{\"baseEnabled\": 3}"),
            Err(ParseError::Config(_))
        ));
    }

    #[test]
    fn frame_serializes_camel_case() {
        let frame = EngineState::new().tick(
            &MixSources {
                biometric: &[],
                climate: &[],
                duration: 60.0,
            },
            30.0,
            None,
            &MixConfig::default(),
        );
        let json = serde_json::to_value(frame).unwrap();
        assert_eq!(json["masterEnvelope"], 1.0);
        assert_eq!(json["overtoneGains"][1], 0.0);
    }
}
