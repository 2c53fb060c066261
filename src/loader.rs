//! Native file loading and background rendering.
//!
//! Reads the backing track, the water loop and the two data series from
//! disk with `tokio::fs`. Only the backing track is required; the other
//! inputs degrade to absent or empty with a warning.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::data::{parse_biometric_csv, parse_climate_csv};
use crate::dsp::automation::MixConfig;
use crate::dsp::buffer::AudioBuffer;
use crate::dsp::renderer::{self, RenderOptions};
use crate::error::{DecodeError, RenderError, ResonanceError};
use crate::session::Session;

/// Decode a WAV file held in memory. Integer PCM of 8 to 32 bits and
/// 32-bit float are supported.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer, ResonanceError> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| DecodeError::Wav(e.to_string()))?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
        }
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>(),
    }
    .map_err(|e| DecodeError::Wav(e.to_string()))?;

    if samples.is_empty() {
        return Err(DecodeError::Empty("WAV data chunk".to_string()).into());
    }
    Ok(AudioBuffer::from_interleaved(
        &samples,
        spec.channels as usize,
        spec.sample_rate,
    )?)
}

/// Decode an MP3 file held in memory. Channel layout and sample rate come
/// from the first frame.
pub fn decode_mp3(bytes: &[u8]) -> Result<AudioBuffer, ResonanceError> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
    let mut pcm = Vec::new();
    let mut layout: Option<(usize, u32)> = None;
    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                let (channels, _) =
                    *layout.get_or_insert((frame.channels, frame.sample_rate as u32));
                if frame.channels != channels {
                    warn!(
                        got = frame.channels,
                        expected = channels,
                        "skipping MP3 frame with a different channel count"
                    );
                    continue;
                }
                pcm.extend_from_slice(&frame.data);
            }
            Err(minimp3::Error::Eof) => break,
            Err(minimp3::Error::SkippedData) => continue,
            Err(e) => return Err(DecodeError::Mp3(e.to_string()).into()),
        }
    }
    let Some((channels, sample_rate)) = layout.filter(|_| !pcm.is_empty()) else {
        return Err(DecodeError::Empty("MP3 stream".to_string()).into());
    };
    Ok(AudioBuffer::from_i16_interleaved(&pcm, channels, sample_rate)?)
}

/// Decode by file extension: `.mp3` goes through the MP3 decoder, anything
/// else is read as WAV.
pub fn decode_audio(path: &Path, bytes: &[u8]) -> Result<AudioBuffer, ResonanceError> {
    let is_mp3 = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"));
    if is_mp3 {
        decode_mp3(bytes)
    } else {
        decode_wav(bytes)
    }
}

/// Where a session's inputs live on disk.
#[derive(Debug, Clone, Default)]
pub struct SessionPaths {
    /// Backing track candidates, tried in order.
    pub tracks: Vec<PathBuf>,
    pub water: Option<PathBuf>,
    pub biometric: Option<PathBuf>,
    pub climate: Option<PathBuf>,
}

async fn load_audio(path: &Path) -> Result<AudioBuffer, ResonanceError> {
    let bytes = tokio::fs::read(path).await?;
    decode_audio(path, &bytes)
}

/// Load everything named in `paths` into a [`Session`].
pub async fn load_session(paths: &SessionPaths) -> Result<Session, ResonanceError> {
    let mut track = None;
    for candidate in &paths.tracks {
        match load_audio(candidate).await {
            Ok(buffer) => {
                info!(
                    path = %candidate.display(),
                    duration = buffer.duration(),
                    channels = buffer.num_channels(),
                    sample_rate = buffer.sample_rate(),
                    "loaded backing track"
                );
                track = Some(buffer);
                break;
            }
            Err(e) => warn!(path = %candidate.display(), error = %e, "backing track candidate failed"),
        }
    }
    let track = track.ok_or(DecodeError::NoTrack {
        tried: paths.tracks.len(),
    })?;
    let mut session = Session::new(track);

    if let Some(path) = &paths.water {
        match load_audio(path).await {
            Ok(water) => {
                info!(path = %path.display(), frames = water.len(), "loaded water loop");
                session = session.with_water(water);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "water loop unavailable"),
        }
    }

    if let Some(path) = &paths.biometric {
        match read_text(path).await.and_then(|t| Ok(parse_biometric_csv(&t)?)) {
            Ok(series) => session = session.with_biometric(series),
            Err(e) => warn!(path = %path.display(), error = %e, "biometric data unavailable"),
        }
    }

    if let Some(path) = &paths.climate {
        match read_text(path).await.and_then(|t| Ok(parse_climate_csv(&t)?)) {
            Ok(series) => session = session.with_climate(series),
            Err(e) => warn!(path = %path.display(), error = %e, "climate data unavailable"),
        }
    }

    Ok(session)
}

async fn read_text(path: &Path) -> Result<String, ResonanceError> {
    Ok(tokio::fs::read_to_string(path).await?)
}

/// Render and encode on the blocking pool so the caller's runtime stays
/// responsive.
pub async fn render_wav_async(
    session: Arc<Session>,
    config: MixConfig,
    options: RenderOptions,
) -> Result<Vec<u8>, ResonanceError> {
    tokio::task::spawn_blocking(move || renderer::render_wav(&session, &config, &options))
        .await
        .map_err(|e| RenderError::Aborted(e.to_string()))?
}
