use crate::Domain;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReCycleError {
    #[error("no input was given, at least one domain has to be filled")]
    NoInput,

    #[error("domain {domain} needs {expected} previous frames, got {got}")]
    IncompleteInput {
        domain: Domain,
        expected: usize,
        got: usize,
    },

    #[error("invalid clip: {0}")]
    InvalidClip(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("replay buffer size has to be positive")]
    EmptyBuffer,

    #[error("video with {frames} frames is too short for clips of {clip_len} frames")]
    EmptySource { frames: usize, clip_len: usize },
}
