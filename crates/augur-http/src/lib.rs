//! HTTP rating provider for Augur.
//!
//! This crate implements [`RatingProvider`](augur_traits::RatingProvider)
//! against a rating service reachable over HTTP. The service receives the
//! ticker, the decision date and the news published up to that date, and
//! answers with either a structured rating or a free-text analyst report.
//!
//! # Usage
//!
//! ```rust,ignore
//! use augur_http::HttpRatingProvider;
//! use augur_traits::RatingProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = HttpRatingProvider::from_env()?;
//!     let rating = provider.rate("AAPL", "2020-03-02".parse()?).await?;
//!     println!("{} ({})", rating.rating, rating.signal());
//!     Ok(())
//! }
//! ```
//!
//! # Environment Variables
//!
//! Set `AUGUR_RATING_URL` (and optionally `AUGUR_RATING_API_KEY`) in your
//! environment or `.env` file:
//!
//! ```bash
//! AUGUR_RATING_URL=http://localhost:8000
//! AUGUR_RATING_API_KEY=your_token_here
//! ```

mod client;
mod error;
mod types;

pub use client::{API_KEY_ENV, HttpRatingProvider, URL_ENV};
pub use error::ClientError;
pub use types::{ConfidenceValue, NewsPayload, RateRequest, RateResponseBody, parse_report};

/// Result type for provider setup.
pub type Result<T> = std::result::Result<T, ClientError>;
