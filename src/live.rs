//! Live playback driver.
//!
//! Ticks the shared mix engine once per animation frame from an injected
//! clock and eases each frame onto the layer gains the audio graph plays
//! with. The clock is whatever the host's audio context reports; this
//! module never reads real time itself.

use tracing::debug;

use crate::dsp::automation::{MixConfig, MixEngine, MixFrame, MixSources};
use crate::dsp::param::TargetParam;

/// Time constant for easing the master fade onto the bus, in seconds.
pub const MASTER_TIME_CONSTANT: f64 = 0.5;
/// Time constant for the overtone and water gains.
pub const LAYER_TIME_CONSTANT: f64 = 0.3;
/// Time constant for the base track toggle.
pub const BASE_TIME_CONSTANT: f64 = 0.1;

/// Gains as applied to the live graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveGains {
    pub master: TargetParam,
    pub base: TargetParam,
    pub overtones: [TargetParam; 2],
    pub water: TargetParam,
}

impl LiveGains {
    fn new(base: f64) -> Self {
        LiveGains {
            master: TargetParam::new(1.0),
            base: TargetParam::new(base),
            overtones: [TargetParam::new(0.0), TargetParam::new(0.0)],
            water: TargetParam::new(0.0),
        }
    }

    fn apply(&mut self, frame: &MixFrame, now: f64) {
        self.master
            .set_target_at_time(frame.master_envelope, now, MASTER_TIME_CONSTANT);
        self.base
            .set_target_at_time(frame.base_gain, now, BASE_TIME_CONSTANT);
        for (param, &gain) in self.overtones.iter_mut().zip(&frame.overtone_gains) {
            param.set_target_at_time(gain, now, LAYER_TIME_CONSTANT);
        }
        self.water
            .set_target_at_time(frame.water_gain, now, LAYER_TIME_CONSTANT);
    }
}

/// Play/stop/seek state of the interactive player.
#[derive(Debug, Clone)]
pub struct LivePlayback {
    engine: MixEngine,
    /// Clock time at which elapsed playback time was zero.
    anchor: f64,
    /// Where the next `play` starts from.
    seek_time: f64,
    gains: Option<LiveGains>,
    last_frame: Option<MixFrame>,
}

impl Default for LivePlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl LivePlayback {
    pub fn new() -> Self {
        LivePlayback {
            engine: MixEngine::new(),
            anchor: 0.0,
            seek_time: 0.0,
            gains: None,
            last_frame: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_running()
    }

    pub fn seek_time(&self) -> f64 {
        self.seek_time
    }

    /// Start from the remembered seek position.
    pub fn play(&mut self, now: f64, config: &MixConfig) -> bool {
        self.play_from(self.seek_time, now, config)
    }

    /// Start playback at `offset` seconds into the track. Does nothing and
    /// returns `false` while already playing.
    pub fn play_from(&mut self, offset: f64, now: f64, config: &MixConfig) -> bool {
        let offset = offset.max(0.0);
        if !self.engine.start(offset) {
            return false;
        }
        self.anchor = now - offset;
        self.seek_time = offset;
        self.gains = Some(LiveGains::new(if config.base_enabled { 1.0 } else { 0.0 }));
        self.last_frame = None;
        debug!(offset, "playback started");
        true
    }

    /// Stop playback and discard the session's smoothing state.
    pub fn stop(&mut self) {
        if self.engine.stop() {
            self.gains = None;
            self.last_frame = None;
            debug!("playback stopped");
        }
    }

    /// Move the playhead. While playing, playback restarts at `position`
    /// with fresh smoothing state; otherwise the position is remembered for
    /// the next `play`.
    pub fn seek(&mut self, position: f64, now: f64, config: &MixConfig) {
        let position = position.max(0.0);
        debug!(position, playing = self.is_playing(), "seek");
        if self.is_playing() {
            self.stop();
            self.play_from(position, now, config);
        } else {
            self.seek_time = position;
        }
    }

    /// Seconds into the track at clock time `now`, while playing.
    pub fn elapsed(&self, now: f64) -> Option<f64> {
        self.is_playing().then(|| now - self.anchor)
    }

    /// Tick the engine for the animation frame at clock time `now`.
    ///
    /// `track_window` is the analyser's latest channel-0 audio. Once the
    /// playhead passes the end of the track, playback stops and no frame is
    /// produced.
    pub fn tick(
        &mut self,
        now: f64,
        sources: &MixSources<'_>,
        track_window: Option<&[f32]>,
        config: &MixConfig,
    ) -> Option<MixFrame> {
        let elapsed = self.elapsed(now)?;
        if elapsed > sources.duration {
            self.stop();
            return None;
        }
        let frame = self.engine.tick(sources, elapsed, track_window, config)?;
        if let Some(gains) = self.gains.as_mut() {
            gains.apply(&frame, now);
        }
        self.last_frame = Some(frame);
        Some(frame)
    }

    pub fn last_frame(&self) -> Option<&MixFrame> {
        self.last_frame.as_ref()
    }

    /// The graph-side gains, while playing.
    pub fn gains(&self) -> Option<&LiveGains> {
        self.gains.as_ref()
    }

    /// Playhead position as a fraction of `duration`, for drawing.
    pub fn progress(&self, now: f64, duration: f64) -> f64 {
        if duration <= 0.0 {
            return 0.0;
        }
        let position = self.elapsed(now).unwrap_or(self.seek_time);
        (position / duration).clamp(0.0, 1.0)
    }
}

/// Format seconds as `MM:SS`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() { seconds.max(0.0) as u64 } else { 0 };
    format!("{:02}:{:02}", total / 60, total % 60)
}
