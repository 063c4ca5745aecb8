//! Error types for the HTTP rating provider.

use augur_traits::ProviderError;
use thiserror::Error;

/// Errors raised while setting up the HTTP rating provider.
///
/// Per-request failures are reported as [`ProviderError`] instead.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service URL is not configured.
    #[error("AUGUR_RATING_URL environment variable not set")]
    MissingUrl,

    /// The service URL cannot be used.
    #[error("invalid rating service URL '{0}'")]
    InvalidUrl(String),

    /// The HTTP client could not be built.
    #[error("HTTP client setup failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Maps a transport failure onto the provider error the generator understands.
pub(crate) fn transport_error(err: &reqwest::Error, ticker: &str, as_of_date: chrono::NaiveDate) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout {
            ticker: ticker.to_string(),
            as_of_date,
        }
    } else if err.is_decode() {
        ProviderError::Malformed(err.to_string())
    } else {
        ProviderError::Transport(err.to_string())
    }
}
