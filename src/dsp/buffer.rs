//! Decoded audio held in memory as planar f32 channels.

use crate::error::BufferError;

#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Build from per-channel sample vectors of equal length.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, BufferError> {
        if sample_rate == 0 {
            return Err(BufferError::ZeroSampleRate);
        }
        let expected = channels.first().ok_or(BufferError::NoChannels)?.len();
        if let Some((channel, c)) = channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != expected)
        {
            return Err(BufferError::ChannelLength {
                channel,
                len: c.len(),
                expected,
            });
        }
        Ok(AudioBuffer {
            channels,
            sample_rate,
        })
    }

    /// Build from interleaved frames. A trailing partial frame is dropped.
    pub fn from_interleaved(
        samples: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self, BufferError> {
        if num_channels == 0 {
            return Err(BufferError::NoChannels);
        }
        let frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (ch, &s) in frame.iter().enumerate() {
                channels[ch].push(s);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// Build from 16-bit signed PCM, interleaved.
    pub fn from_i16_interleaved(
        pcm: &[i16],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self, BufferError> {
        let samples: Vec<f32> = pcm.iter().map(|&s| s as f32 / 32768.0).collect();
        Self::from_interleaved(&samples, num_channels, sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Samples of channel `ch`. Out-of-range channels wrap, so a mono
    /// buffer reads the same data on every output channel.
    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.channels[ch % self.channels.len()]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Read channel `ch` at a fractional frame position with linear
    /// interpolation, looping the buffer end to start.
    pub fn read_looped(&self, ch: usize, position: f64) -> f32 {
        let data = self.channel(ch);
        let len = data.len();
        if len == 0 || !position.is_finite() {
            return 0.0;
        }
        let pos = position.rem_euclid(len as f64);
        let idx = (pos as usize).min(len - 1);
        let frac = (pos - idx as f64) as f32;
        let next = if idx + 1 < len { idx + 1 } else { 0 };
        data[idx] * (1.0 - frac) + data[next] * frac
    }
}
