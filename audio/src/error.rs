use thiserror::Error;

/// Errors returned by audio assembly and encoding.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio: wav encoding failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("audio: {waveforms} waveforms but {durations} durations")]
    LengthMismatch { waveforms: usize, durations: usize },
}
