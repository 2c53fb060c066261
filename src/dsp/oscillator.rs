//! Sine oscillator for the overtone layers.

use std::f64::consts::TAU;

/// Fundamental the overtones are built on, in Hz.
pub const OVERTONE_FUNDAMENTAL: f64 = 136.1;
/// Harmonic of the fundamental for overtone A and overtone B.
pub const OVERTONE_HARMONICS: [f64; 2] = [2.0, 3.0];

/// A phase-accumulating sine oscillator.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub frequency: f64,
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(frequency: f64, sample_rate: f64) -> Self {
        Oscillator {
            frequency,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Generate the next sample.
    pub fn next_sample(&mut self) -> f64 {
        let sample = (TAU * self.phase).sin();
        self.phase += self.frequency / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        sample
    }
}
