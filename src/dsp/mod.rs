//! DSP engine: mix automation and the offline audio graph.
//!
//! The mix engine in [`automation`] is the single source of every layer
//! gain. The live player ticks it once per animation frame; the offline
//! renderer ticks it on a fixed grid and plays the result back through the
//! same layer graph before encoding WAV.

pub mod automation;
pub mod buffer;
pub mod envelope;
pub mod filter;
pub mod meter;
pub mod oscillator;
pub mod param;
pub mod renderer;
pub mod reverb;
pub mod smoother;
