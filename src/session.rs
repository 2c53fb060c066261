//! Everything loaded for one listening session.

use crate::dsp::automation::MixSources;
use crate::dsp::buffer::AudioBuffer;
use crate::series::{ClimateSample, TimedSample};

/// The backing track plus the optional layers mixed over it. Read-only
/// once playback or rendering begins.
#[derive(Debug, Clone)]
pub struct Session {
    pub track: AudioBuffer,
    /// Looped water ambience. Without it the water layer is silent.
    pub water: Option<AudioBuffer>,
    pub biometric: Vec<TimedSample>,
    pub climate: Vec<ClimateSample>,
}

impl Session {
    pub fn new(track: AudioBuffer) -> Self {
        Session {
            track,
            water: None,
            biometric: Vec::new(),
            climate: Vec::new(),
        }
    }

    pub fn with_biometric(mut self, biometric: Vec<TimedSample>) -> Self {
        self.biometric = biometric;
        self
    }

    pub fn with_climate(mut self, climate: Vec<ClimateSample>) -> Self {
        self.climate = climate;
        self
    }

    pub fn with_water(mut self, water: AudioBuffer) -> Self {
        self.water = Some(water);
        self
    }

    /// Track length in seconds.
    pub fn duration(&self) -> f64 {
        self.track.duration()
    }

    pub fn sources(&self) -> MixSources<'_> {
        MixSources {
            biometric: &self.biometric,
            climate: &self.climate,
            duration: self.duration(),
        }
    }
}
