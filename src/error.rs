use thiserror::Error;

/// Failure modes shared by the audio and video lanes.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No media path was given on the command line.
    #[error("Missing {lane} file path")]
    InputMissing { lane: &'static str },

    /// The media could not be opened, probed or decoded.
    #[error("{0}")]
    Decode(String),

    /// Every analysis frame has zero energy, so nothing can be normalized.
    #[error("signal has no energy")]
    DegenerateSignal,

    /// No pose source is configured, or the configured one cannot run.
    #[error("{0}")]
    PoseUnavailable(String),
}
