//! Track level metering over a short analysis window.

use super::buffer::AudioBuffer;

/// Samples per analysis window, matching the live analyser.
pub const ANALYSIS_WINDOW: usize = 2048;

/// Make-up gain applied to raw RMS before clamping to [0, 1].
pub const TRACK_LEVEL_GAIN: f64 = 6.0;

/// Root-mean-square of a window. An empty window reads as silence.
pub fn rms(window: &[f32]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let sum: f64 = window.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / window.len() as f64).sqrt()
}

/// How audible the track is right now, in [0, 1].
pub fn track_level(window: &[f32]) -> f64 {
    (rms(window) * TRACK_LEVEL_GAIN).min(1.0)
}

/// The `len` samples of `channel` that end at frame `end` (exclusive).
///
/// Near the start of the channel the window is shorter; past the end it
/// is cut at the channel's length.
pub fn window_ending_at(channel: &[f32], end: usize, len: usize) -> &[f32] {
    let end = end.min(channel.len());
    let start = end.saturating_sub(len);
    &channel[start..end]
}

/// The analysis window of channel 0 ending at the playhead, as both the
/// live and offline drivers feed it to the engine.
pub fn playhead_window(track: &AudioBuffer, elapsed: f64) -> &[f32] {
    let end = (elapsed.max(0.0) * track.sample_rate() as f64) as usize;
    window_ending_at(track.channel(0), end, ANALYSIS_WINDOW)
}
