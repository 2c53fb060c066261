//! Master bus reverb: Schroeder/Freeverb comb + allpass network.
//!
//! The bus is split into a dry path and a fully wet reverb path, each with
//! its own gain, and summed back together.

/// Gain of the dry master path.
pub const DRY_GAIN: f64 = 0.75;
/// Gain of the reverb return.
pub const WET_GAIN: f64 = 0.35;

// Delay lengths in samples at 44.1 kHz.
const COMB_TUNING: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNING: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;
const INPUT_GAIN: f32 = 0.015;
const ALLPASS_FEEDBACK: f32 = 0.5;

#[derive(Debug, Clone)]
struct Comb {
    line: Vec<f32>,
    pos: usize,
    feedback: f32,
    damp: f32,
    store: f32,
}

impl Comb {
    fn new(len: usize, feedback: f32, damp: f32) -> Self {
        Comb {
            line: vec![0.0; len.max(1)],
            pos: 0,
            feedback,
            damp,
            store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let out = self.line[self.pos];
        // One-pole lowpass in the feedback path.
        self.store = out * (1.0 - self.damp) + self.store * self.damp;
        self.line[self.pos] = input + self.store * self.feedback;
        self.pos = (self.pos + 1) % self.line.len();
        out
    }
}

#[derive(Debug, Clone)]
struct Allpass {
    line: Vec<f32>,
    pos: usize,
}

impl Allpass {
    fn new(len: usize) -> Self {
        Allpass {
            line: vec![0.0; len.max(1)],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.line[self.pos];
        self.line[self.pos] = input + delayed * ALLPASS_FEEDBACK;
        self.pos = (self.pos + 1) % self.line.len();
        delayed - input
    }
}

/// One channel's comb bank and allpass chain.
#[derive(Debug, Clone)]
struct Tank {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
}

impl Tank {
    fn new(scale: f64, spread: usize, feedback: f32, damp: f32) -> Self {
        let len = |tuning: usize| ((tuning + spread) as f64 * scale) as usize;
        Tank {
            combs: COMB_TUNING
                .iter()
                .map(|&t| Comb::new(len(t), feedback, damp))
                .collect(),
            allpasses: ALLPASS_TUNING.iter().map(|&t| Allpass::new(len(t))).collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let mut out: f32 = self.combs.iter_mut().map(|c| c.process(input)).sum();
        for ap in &mut self.allpasses {
            out = ap.process(out);
        }
        out
    }
}

/// Stereo reverb applied to the master bus.
#[derive(Debug, Clone)]
pub struct MasterReverb {
    left: Tank,
    right: Tank,
    pub dry: f32,
    pub wet: f32,
}

impl MasterReverb {
    /// `room_size` and `damping` are in [0, 1]; larger rooms ring longer.
    pub fn new(sample_rate: f64, room_size: f64, damping: f64) -> Self {
        let scale = sample_rate / 44100.0;
        let feedback = (room_size.clamp(0.0, 1.0) * 0.28 + 0.7) as f32;
        let damp = damping.clamp(0.0, 1.0) as f32;
        MasterReverb {
            left: Tank::new(scale, 0, feedback, damp),
            right: Tank::new(scale, STEREO_SPREAD, feedback, damp),
            dry: DRY_GAIN as f32,
            wet: WET_GAIN as f32,
        }
    }

    /// Fully wet reverb of one stereo frame.
    #[inline]
    pub fn tail(&mut self, left: f32, right: f32) -> (f32, f32) {
        let input = (left + right) * INPUT_GAIN;
        (self.left.process(input), self.right.process(input))
    }
}
