/// Result alias that carries the custom [`SpatialAudioError`] type.
pub type Result<T> = std::result::Result<T, SpatialAudioError>;

/// Common error type for the core crate.
///
/// Parameter setters on the engine never surface errors; only operations that
/// acquire resources or cross a data boundary do.
#[derive(Debug, thiserror::Error)]
pub enum SpatialAudioError {
    /// The audio processing context could not be created (no device, blocked
    /// stream, unsupported sample format).
    #[error("audio subsystem unavailable: {0}")]
    Unavailable(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A track record coming from an external source failed validation.
    #[error("invalid track record: {0}")]
    InvalidTrack(String),
    /// The render surface has no drawable area.
    #[error("canvas has zero size")]
    EmptyCanvas,
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Wav(#[from] hound::Error),
    #[error(transparent)]
    Fft(#[from] realfft::FftError),
}

impl SpatialAudioError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Convenience constructor for [`SpatialAudioError::InvalidConfig`].
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<&str> for SpatialAudioError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SpatialAudioError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
