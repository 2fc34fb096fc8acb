use thiserror::Error;

/**
    Errors surfaced by the AES mode layer and its block-cipher collaborators.
*/
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AesError {
    /// A parameter was rejected before any cipher operation ran.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The output slice cannot hold the maximum possible result.
    #[error("output buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall { needed: usize, got: usize },

    /// The caller broke a streaming contract: alignment, padding, or a
    /// declared byte budget.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// Failure reported by the block-cipher backend, passed through
    /// verbatim and never retried.
    #[error("block cipher backend: {0}")]
    Backend(String),
}

pub type AesResult<T> = Result<T, AesError>;
