use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResonanceError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reading the biometric/climate series or a JSON mix config.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("{what} input is empty")]
    EmptyInput { what: &'static str },
    #[error("{what} header is missing column '{column}'")]
    MissingColumn { what: &'static str, column: String },
    #[error("invalid mix config: {0}")]
    Config(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum BufferError {
    #[error("audio buffer has no channels")]
    NoChannels,
    #[error("channel {channel} has {len} frames, expected {expected}")]
    ChannelLength {
        channel: usize,
        len: usize,
        expected: usize,
    },
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("WAV: {0}")]
    Wav(String),
    #[error("MP3: {0}")]
    Mp3(String),
    #[error("no audio frames decoded from {0}")]
    Empty(String),
    #[error("none of the {tried} backing track candidates could be loaded")]
    NoTrack { tried: usize },
}

/// Terminal offline render failures. The caller restarts the whole render.
#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("backing track is empty")]
    EmptyTrack,
    #[error("render of {frames} frames x {channels} channels is too large")]
    TooLarge { frames: usize, channels: usize },
    #[error("could not allocate render target of {bytes} bytes")]
    Allocation { bytes: usize },
    #[error("automation step {step} must be positive and shorter than the track")]
    InvalidStep { step: f64 },
    #[error("render task aborted: {0}")]
    Aborted(String),
}
