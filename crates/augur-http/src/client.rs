//! HTTP rating provider implementation.

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use augur_traits::{Dataset, Date, NewsItem, ProviderError, RatingProvider, RatingResponse, normalize_ticker};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::Result;
use crate::error::{ClientError, transport_error};
use crate::types::{NewsPayload, RateRequest, RateResponseBody};

/// Environment variable holding the service base URL.
pub const URL_ENV: &str = "AUGUR_RATING_URL";
/// Environment variable holding the optional bearer token.
pub const API_KEY_ENV: &str = "AUGUR_RATING_API_KEY";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default news look-back in calendar days.
const DEFAULT_NEWS_WINDOW_DAYS: u64 = 30;

/// Rating provider backed by an HTTP rating service.
///
/// Sends `POST {base}/rate` with the ticker, the decision date and, when a
/// news dataset is attached, the headlines published in the window ending on
/// the decision date.
#[derive(Clone)]
pub struct HttpRatingProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    news: Option<Arc<dyn Dataset>>,
    news_window_days: u64,
}

impl fmt::Debug for HttpRatingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRatingProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("news", &self.news.is_some())
            .field("news_window_days", &self.news_window_days)
            .finish()
    }
}

impl HttpRatingProvider {
    /// Create a provider for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s) or the client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(base_url));
        }

        Ok(Self {
            client: Client::builder().timeout(DEFAULT_TIMEOUT).build()?,
            base_url,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            news: None,
            news_window_days: DEFAULT_NEWS_WINDOW_DAYS,
        })
    }

    /// Create a provider from `AUGUR_RATING_URL` and `AUGUR_RATING_API_KEY`.
    ///
    /// This will also load from a `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL variable is not set or invalid.
    pub fn from_env() -> Result<Self> {
        // Try to load .env file (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let url = env::var(URL_ENV).map_err(|_| ClientError::MissingUrl)?;
        let provider = Self::new(url)?;

        Ok(match env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => provider.with_api_key(key),
            _ => provider,
        })
    }

    /// Sends `key` as a bearer token.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be rebuilt.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        self.timeout = timeout;
        Ok(self)
    }

    /// Attaches a news dataset; requests carry headlines from the
    /// `window_days` calendar days ending on the decision date.
    #[must_use]
    pub fn with_news(mut self, dataset: Arc<dyn Dataset>, window_days: u64) -> Self {
        self.news = Some(dataset);
        self.news_window_days = window_days;
        self
    }

    /// Service base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Rating endpoint URL.
    fn url(&self) -> String {
        format!("{}/rate", self.base_url)
    }

    fn news_for(&self, ticker: &str, as_of_date: Date) -> Vec<NewsItem> {
        let Some(dataset) = &self.news else {
            return Vec::new();
        };
        match dataset.news_before(ticker, as_of_date, self.news_window_days) {
            // Never send anything dated after the decision.
            Ok(items) => items.into_iter().filter(|n| n.date <= as_of_date).collect(),
            Err(err) => {
                warn!(%ticker, %as_of_date, error = %err, "news lookup failed, rating without news");
                Vec::new()
            }
        }
    }

    async fn request(&self, ticker: &str, as_of_date: Date) -> std::result::Result<RatingResponse, ProviderError> {
        let news = self.news_for(ticker, as_of_date);
        let body = RateRequest {
            ticker,
            as_of_date,
            news: news.iter().map(NewsPayload::from).collect(),
        };

        let mut request = self.client.post(self.url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(&e, ticker, as_of_date))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected(format!("HTTP {status}: {text}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| transport_error(&e, ticker, as_of_date))?;
        let parsed: RateResponseBody = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Malformed(format!("{e}. Response: {text}")))?;

        let rating = parsed.into_response()?;
        debug!(%ticker, %as_of_date, news = news.len(), rating = %rating.rating, "rated");
        Ok(rating)
    }
}

impl RatingProvider for HttpRatingProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn rate(&self, ticker: &str, as_of_date: Date) -> std::result::Result<RatingResponse, ProviderError> {
        let ticker = normalize_ticker(ticker);
        self.request(&ticker, as_of_date).await
    }
}
