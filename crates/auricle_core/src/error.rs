//! Engine Error Types

use thiserror::Error;

/// Errors reported by a [`crate::provider::StreamProvider`].
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("No suitable audio device found")]
    NoDevice,

    #[error("Failed to open stream: {0}")]
    OpenFailed(String),

    #[error("Failed to start stream: {0}")]
    StartFailed(String),

    #[error("Unknown stream handle")]
    UnknownStream,

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Operation not supported by this provider")]
    Unsupported,
}

/// Errors that can occur in the audio engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Stream provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Engine configuration error: {0}")]
    ConfigError(String),

    #[error("Channel send error - receiver dropped")]
    ChannelSendError,

    #[error("Engine thread error: {0}")]
    Thread(String),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::OpenFailed("no microphone".into());
        assert!(err.to_string().contains("no microphone"));

        let err = EngineError::ConfigError("bad sample rate".into());
        assert!(err.to_string().contains("bad sample rate"));
    }

    #[test]
    fn test_error_from_provider() {
        let provider_err = ProviderError::NoDevice;
        let engine_err: EngineError = provider_err.into();
        assert!(matches!(engine_err, EngineError::Provider(_)));
    }
}
