//! Offline renderer: ticks the mix engine on a fixed grid, renders the
//! layered mix through the master bus, and encodes it as WAV.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RenderError, ResonanceError};
use crate::session::Session;

use super::automation::{MixConfig, MixEngine, MixFrame, MixSources};
use super::buffer::AudioBuffer;
use super::filter::{Lowpass, OVERTONE_CUTOFF, OVERTONE_Q};
use super::meter;
use super::oscillator::{OVERTONE_FUNDAMENTAL, OVERTONE_HARMONICS, Oscillator};
use super::param::AutomationLane;
use super::reverb::{DRY_GAIN, MasterReverb, WET_GAIN};

/// Spacing of the offline automation grid, in seconds.
pub const AUTOMATION_STEP: f64 = 0.1;

/// Largest render, in samples over all channels, whose 16-bit data chunk
/// still fits a WAV header.
const MAX_RENDER_SAMPLES: usize = (u32::MAX as usize - 44) / 2;

/// Offline render settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Automation grid spacing in seconds.
    pub step: f64,
    pub dry_gain: f64,
    pub wet_gain: f64,
    /// Reverb room size in [0, 1].
    pub room_size: f64,
    /// Reverb damping in [0, 1].
    pub damping: f64,
    /// Overtone fundamental in Hz.
    pub fundamental: f64,
    /// Multiples of `fundamental` for overtone A and overtone B.
    pub harmonics: [f64; 2],
    /// Cutoff of the lowpass each overtone runs through, in Hz.
    pub lowpass_cutoff: f64,
    pub lowpass_q: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            step: AUTOMATION_STEP,
            dry_gain: DRY_GAIN,
            wet_gain: WET_GAIN,
            room_size: 0.85,
            damping: 0.5,
            fundamental: OVERTONE_FUNDAMENTAL,
            harmonics: OVERTONE_HARMONICS,
            lowpass_cutoff: OVERTONE_CUTOFF,
            lowpass_q: OVERTONE_Q,
        }
    }
}

impl RenderOptions {
    /// Frequencies of overtone A and overtone B, in Hz.
    pub fn overtone_frequencies(&self) -> [f64; 2] {
        self.harmonics.map(|h| self.fundamental * h)
    }

    /// Reject automation steps that cannot schedule the whole track.
    fn check_step(&self, duration: f64) -> Result<(), RenderError> {
        if self.step.is_finite() && self.step > 0.0 && self.step < duration {
            Ok(())
        } else {
            Err(RenderError::InvalidStep { step: self.step })
        }
    }
}

/// Tick a fresh engine at `t = k * step` for every `t` before the end of
/// the track. Each tick sees the same analysis window the live player
/// would read at that position.
pub fn grid_frames(
    sources: &MixSources<'_>,
    track: Option<&AudioBuffer>,
    config: &MixConfig,
    step: f64,
) -> Vec<(f64, MixFrame)> {
    let mut frames = Vec::new();
    if !(step > 0.0) || !(sources.duration > 0.0) {
        return frames;
    }

    let mut engine = MixEngine::new();
    engine.start(0.0);
    for k in 0u64.. {
        // Multiplied, not accumulated, so grid points don't drift.
        let t = k as f64 * step;
        if t >= sources.duration {
            break;
        }
        let window = track.map(|b| meter::playhead_window(b, t));
        if let Some(frame) = engine.tick(sources, t, window, config) {
            frames.push((t, frame));
        }
    }
    engine.stop();
    frames
}

/// Step automation lanes for every gain in the mix.
#[derive(Debug, Clone, PartialEq)]
pub struct MixAutomation {
    pub master: AutomationLane,
    pub base: AutomationLane,
    pub overtones: [AutomationLane; 2],
    pub water: AutomationLane,
}

impl MixAutomation {
    pub fn from_frames(frames: &[(f64, MixFrame)]) -> Self {
        let mut automation = MixAutomation {
            master: AutomationLane::new(0.0),
            base: AutomationLane::new(0.0),
            overtones: [AutomationLane::new(0.0), AutomationLane::new(0.0)],
            water: AutomationLane::new(0.0),
        };
        for &(t, frame) in frames {
            automation.master.set_value_at_time(frame.master_envelope, t);
            automation.base.set_value_at_time(frame.base_gain, t);
            for (lane, &gain) in automation.overtones.iter_mut().zip(&frame.overtone_gains) {
                lane.set_value_at_time(gain, t);
            }
            automation.water.set_value_at_time(frame.water_gain, t);
        }
        automation
    }
}

/// Size of the f32 render target, saturating on 32-bit targets.
fn target_bytes(frames: usize, channels: usize) -> usize {
    frames
        .saturating_mul(channels)
        .saturating_mul(std::mem::size_of::<f32>())
}

/// Render the full mix of `session` to a buffer with the track's sample
/// rate and channel count.
pub fn render(
    session: &Session,
    config: &MixConfig,
    options: &RenderOptions,
) -> Result<AudioBuffer, ResonanceError> {
    let track = &session.track;
    if track.is_empty() {
        return Err(RenderError::EmptyTrack.into());
    }

    let frames = track.len();
    let channels = track.num_channels();
    frames
        .checked_mul(channels)
        .filter(|&n| n <= MAX_RENDER_SAMPLES)
        .ok_or(RenderError::TooLarge { frames, channels })?;
    options.check_step(track.duration())?;

    let mut out: Vec<Vec<f32>> = Vec::with_capacity(channels);
    for _ in 0..channels {
        let mut data = Vec::new();
        data.try_reserve_exact(frames)
            .map_err(|_| RenderError::Allocation {
                bytes: target_bytes(frames, channels),
            })?;
        out.push(data);
    }

    info!(
        frames,
        channels,
        sample_rate = track.sample_rate(),
        "offline render started"
    );

    let sources = session.sources();
    let grid = grid_frames(&sources, Some(track), config, options.step);
    let automation = MixAutomation::from_frames(&grid);
    debug!(points = grid.len(), "automation scheduled");

    let sample_rate = track.sample_rate() as f64;
    let mut overtones = options.overtone_frequencies().map(|frequency| {
        (
            Oscillator::new(frequency, sample_rate),
            Lowpass::new(options.lowpass_cutoff, options.lowpass_q, sample_rate),
        )
    });
    let mut reverb = MasterReverb::new(sample_rate, options.room_size, options.damping);
    reverb.dry = options.dry_gain as f32;
    reverb.wet = options.wet_gain as f32;

    let water = session.water.as_ref().filter(|w| !w.is_empty());
    let water_step = water.map_or(1.0, |w| w.sample_rate() as f64 / sample_rate);

    let mut master_lane = automation.master.reader();
    let mut base_lane = automation.base.reader();
    let mut water_lane = automation.water.reader();
    let mut overtone_lanes = automation.overtones.each_ref().map(AutomationLane::reader);

    let mut bus = vec![0.0f32; channels];
    for n in 0..frames {
        let t = n as f64 / sample_rate;
        let master = master_lane.value_at(t);
        let base = base_lane.value_at(t);
        let water_gain = water_lane.value_at(t);

        let mut shared = 0.0;
        for ((osc, lowpass), lane) in overtones.iter_mut().zip(&mut overtone_lanes) {
            shared += lowpass.process(osc.next_sample()) * lane.value_at(t);
        }

        for (ch, slot) in bus.iter_mut().enumerate() {
            let mut x = track.channel(ch)[n] as f64 * base + shared;
            if let Some(w) = water {
                x += w.read_looped(ch, n as f64 * water_step) as f64 * water_gain;
            }
            *slot = (x * master) as f32;
        }

        let right = if channels > 1 { bus[1] } else { bus[0] };
        let (wet_l, wet_r) = reverb.tail(bus[0], right);
        for (ch, data) in out.iter_mut().enumerate() {
            let wet = if ch % 2 == 0 { wet_l } else { wet_r };
            data.push(bus[ch] * reverb.dry + wet * reverb.wet);
        }
    }

    info!(frames, "offline render finished");
    Ok(AudioBuffer::new(out, track.sample_rate())?)
}

/// Render `session` and encode it as a 16-bit PCM WAV file.
pub fn render_wav(
    session: &Session,
    config: &MixConfig,
    options: &RenderOptions,
) -> Result<Vec<u8>, ResonanceError> {
    let rendered = render(session, config, options)?;
    Ok(encode_wav(&rendered))
}

/// Quantize one sample to 16-bit PCM, clamping to [-1, 1].
pub fn to_pcm16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode a buffer as interleaved 16-bit PCM WAV with a 44-byte header.
pub fn encode_wav(buffer: &AudioBuffer) -> Vec<u8> {
    let channels = buffer.num_channels() as u16;
    let sample_rate = buffer.sample_rate();
    let bits_per_sample: u16 = 16;
    let block_align = channels * (bits_per_sample / 8);
    let byte_rate = sample_rate * block_align as u32;
    let data_len = buffer.len() * block_align as usize;
    let data_size = u32::try_from(data_len).unwrap_or(u32::MAX);

    let mut buf = Vec::with_capacity(44 + data_len);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&data_size.saturating_add(36).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for n in 0..buffer.len() {
        for channel in buffer.channels() {
            buf.extend_from_slice(&to_pcm16(channel[n]).to_le_bytes());
        }
    }

    buf
}
