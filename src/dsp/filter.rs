//! Biquad lowpass for the overtone layers.

use std::f64::consts::PI;

/// Cutoff of the overtone lowpass, in Hz.
pub const OVERTONE_CUTOFF: f64 = 1000.0;
/// Resonance of the overtone lowpass.
pub const OVERTONE_Q: f64 = 0.7;

/// A 2nd order lowpass in Direct Form II Transposed.
///
/// Coefficients from the Audio EQ Cookbook (Robert Bristow-Johnson).
#[derive(Debug, Clone)]
pub struct Lowpass {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Lowpass {
    pub fn new(cutoff: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let a0 = 1.0 + alpha;
        let b1 = (1.0 - cos_w0) / a0;
        Lowpass {
            b0: b1 / 2.0,
            b1,
            b2: b1 / 2.0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }
}
