use thiserror::Error;

/// Unified error type for the token selector library.
#[derive(Debug, Error)]
pub enum Error {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid balance for {coin_type}: {reason}")]
    Balance { coin_type: String, reason: String },
}

/// Errors raised by external collaborators (wallet, token lists, logo APIs).
///
/// These never escape the pipeline: callers inside the crate log them and
/// fall through to the next source.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(String),

    #[error("{provider} responded with status {status}")]
    Status { provider: String, status: u16 },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}
