pub mod data;
pub mod dsp;
pub mod error;
pub mod live;
#[cfg(feature = "native")]
pub mod loader;
pub mod overview;
pub mod series;
pub mod session;

use crate::dsp::automation::MixConfig;
use crate::dsp::buffer::AudioBuffer;
use crate::dsp::renderer::RenderOptions;
use crate::live::LivePlayback;
use crate::overview::WaveformOverview;
use crate::session::Session;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the resonance-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-exposed: format seconds as `MM:SS`.
#[wasm_bindgen]
pub fn format_time(seconds: f64) -> String {
    live::format_time(seconds)
}

/// WASM-exposed player. Owns the session and drives the mix engine from
/// the audio context clock passed into each call.
#[wasm_bindgen]
pub struct Player {
    session: Session,
    playback: LivePlayback,
    config: MixConfig,
}

#[wasm_bindgen]
impl Player {
    /// Create a player for an interleaved backing track.
    #[wasm_bindgen(constructor)]
    pub fn new(samples: &[f32], channels: usize, sample_rate: u32) -> Result<Player, JsValue> {
        let track = AudioBuffer::from_interleaved(samples, channels, sample_rate).map_err(js_error)?;
        Ok(Player {
            session: Session::new(track),
            playback: LivePlayback::new(),
            config: MixConfig::default(),
        })
    }

    pub fn load_biometric_csv(&mut self, text: &str) -> Result<usize, JsValue> {
        self.session.biometric = data::parse_biometric_csv(text).map_err(js_error)?;
        Ok(self.session.biometric.len())
    }

    pub fn load_climate_csv(&mut self, text: &str) -> Result<usize, JsValue> {
        self.session.climate = data::parse_climate_csv(text).map_err(js_error)?;
        Ok(self.session.climate.len())
    }

    /// Attach the interleaved water loop.
    pub fn set_water(
        &mut self,
        samples: &[f32],
        channels: usize,
        sample_rate: u32,
    ) -> Result<(), JsValue> {
        let water = AudioBuffer::from_interleaved(samples, channels, sample_rate).map_err(js_error)?;
        self.session.water = Some(water);
        Ok(())
    }

    /// Replace the mix config from a JS object with camelCase fields.
    pub fn set_config(&mut self, config: JsValue) -> Result<(), JsValue> {
        self.config = serde_wasm_bindgen::from_value(config).map_err(js_error)?;
        Ok(())
    }

    pub fn duration(&self) -> f64 {
        self.session.duration()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn play(&mut self, now: f64) -> bool {
        self.playback.play(now, &self.config)
    }

    pub fn stop(&mut self) {
        self.playback.stop();
    }

    pub fn seek(&mut self, position: f64, now: f64) {
        self.playback.seek(position, now, &self.config);
    }

    pub fn progress(&self, now: f64) -> f64 {
        self.playback.progress(now, self.session.duration())
    }

    /// Tick for the animation frame at `now`. `window` is the analyser's
    /// latest channel-0 time-domain data. Returns the mix frame, or `null`
    /// when not playing.
    pub fn tick(&mut self, now: f64, window: Option<Vec<f32>>) -> Result<JsValue, JsValue> {
        let sources = self.session.sources();
        match self
            .playback
            .tick(now, &sources, window.as_deref(), &self.config)
        {
            Some(frame) => serde_wasm_bindgen::to_value(&frame).map_err(js_error),
            None => Ok(JsValue::NULL),
        }
    }

    /// Downsampled lanes for drawing, `width` columns each.
    pub fn overview(&self, width: usize) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&WaveformOverview::build(&self.session, width))
            .map_err(js_error)
    }

    /// Render the whole session offline to WAV bytes.
    pub fn render_wav(&self) -> Result<Vec<u8>, JsValue> {
        dsp::renderer::render_wav(&self.session, &self.config, &RenderOptions::default())
            .map_err(js_error)
    }
}
