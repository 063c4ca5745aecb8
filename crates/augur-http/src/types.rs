//! Wire types for the rating service.

use augur_traits::{Confidence, Date, NewsItem, ProviderError, RatingLabel, RatingResponse};
use serde::{Deserialize, Serialize};

/// Body of a `POST /rate` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateRequest<'a> {
    /// Ticker to rate.
    pub ticker: &'a str,
    /// Decision date.
    pub as_of_date: Date,
    /// Headlines published up to and including `as_of_date`.
    pub news: Vec<NewsPayload<'a>>,
}

/// One headline sent along with a rating request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsPayload<'a> {
    /// Publication date.
    pub date: Date,
    /// Headline text.
    pub headline: &'a str,
}

impl<'a> From<&'a NewsItem> for NewsPayload<'a> {
    fn from(item: &'a NewsItem) -> Self {
        Self {
            date: item.date,
            headline: &item.headline,
        }
    }
}

/// Confidence as the service sends it: a label or a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConfidenceValue {
    /// Continuous confidence.
    Number(f64),
    /// "High", "Medium" or "Low".
    Label(String),
}

/// Body of a `POST /rate` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RateResponseBody {
    /// Structured rating.
    Structured {
        /// Rating label.
        rating: String,
        /// Confidence label or score.
        confidence: ConfidenceValue,
    },
    /// Free-text analyst report.
    Report {
        /// Report text.
        report: String,
    },
}

impl RateResponseBody {
    /// Converts the body into a rating, failing on anything unrecognized.
    pub fn into_response(self) -> Result<RatingResponse, ProviderError> {
        match self {
            Self::Structured { rating, confidence } => {
                let rating = rating
                    .parse::<RatingLabel>()
                    .map_err(|e| ProviderError::Malformed(e.to_string()))?;
                let confidence = match confidence {
                    ConfidenceValue::Number(v) => Confidence::score(v),
                    ConfidenceValue::Label(s) => Confidence::parse(&s),
                }
                .map_err(|e| ProviderError::Malformed(e.to_string()))?;
                Ok(RatingResponse::new(rating, confidence))
            }
            Self::Report { report } => parse_report(&report).ok_or_else(|| {
                ProviderError::Malformed("report has no rating or confidence line".to_string())
            }),
        }
    }
}

const RATING_KEYS: [&str; 3] = ["model rating", "final rating", "rating"];
const CONFIDENCE_KEYS: [&str; 2] = ["overall confidence", "confidence"];

/// Extracts the rating and confidence from a markdown analyst report.
///
/// Recognizes lines such as `**Model Rating**: StrongBuy`, `Final Rating: Buy`
/// and `- **Overall Confidence**: High`. Keys are tried from most to least
/// specific. Both a rating and a confidence are required.
pub fn parse_report(text: &str) -> Option<RatingResponse> {
    let rating = RATING_KEYS
        .iter()
        .find_map(|key| find_value(text, key, parse_rating_word))?;
    let confidence = CONFIDENCE_KEYS
        .iter()
        .find_map(|key| find_value(text, key, parse_confidence_word))?;
    Some(RatingResponse::new(rating, confidence))
}

fn find_value<T>(text: &str, key: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    text.lines().find_map(|line| {
        let lower = line.to_ascii_lowercase();
        let at = lower.find(key)?;
        let rest = &line[at + key.len()..];
        let rest = rest.trim_start_matches(|c: char| c == '*' || c == ':' || c.is_whitespace());
        let word: String = rest.chars().take_while(char::is_ascii_alphabetic).collect();
        parse(&word)
    })
}

fn parse_rating_word(word: &str) -> Option<RatingLabel> {
    RatingLabel::ALL
        .into_iter()
        .find(|r| r.as_str().eq_ignore_ascii_case(word))
}

fn parse_confidence_word(word: &str) -> Option<Confidence> {
    match word.to_ascii_lowercase().as_str() {
        "high" => Some(Confidence::High),
        "medium" => Some(Confidence::Medium),
        "low" => Some(Confidence::Low),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markdown_report() {
        let report = "\
## Recommendation

- **Model Rating**: StrongBuy
- **Overall Confidence**: Low

Rationale follows.";
        let parsed = parse_report(report).unwrap();
        assert_eq!(parsed.rating, RatingLabel::StrongBuy);
        assert_eq!(parsed.confidence, Confidence::Low);
    }

    #[test]
    fn test_parse_report_key_priority() {
        let report = "Human rating: Sell\nFinal Rating: underperform\nConfidence: medium";
        let parsed = parse_report(report).unwrap();
        assert_eq!(parsed.rating, RatingLabel::UnderPerform);
        assert_eq!(parsed.confidence, Confidence::Medium);
    }

    #[test]
    fn test_parse_report_requires_both() {
        assert!(parse_report("Model Rating: Buy").is_none());
        assert!(parse_report("Overall Confidence: High").is_none());
        assert!(parse_report("Model Rating: Outstanding\nConfidence: High").is_none());
    }

    #[test]
    fn test_structured_body() {
        let body: RateResponseBody = serde_json::from_str(r#"{"rating":"Buy","confidence":0.8}"#).unwrap();
        let response = body.into_response().unwrap();
        assert_eq!(response.rating, RatingLabel::Buy);
        assert_eq!(response.confidence, Confidence::Score(0.8));

        let body: RateResponseBody = serde_json::from_str(r#"{"rating":"Sell","confidence":"High"}"#).unwrap();
        assert_eq!(body.into_response().unwrap().signal(), -2.0);
    }

    #[test]
    fn test_malformed_bodies() {
        let body: RateResponseBody = serde_json::from_str(r#"{"rating":"Buy","confidence":1.5}"#).unwrap();
        assert!(matches!(body.into_response(), Err(ProviderError::Malformed(_))));

        let body: RateResponseBody = serde_json::from_str(r#"{"report":"no verdict"}"#).unwrap();
        assert!(matches!(body.into_response(), Err(ProviderError::Malformed(_))));
    }

    #[test]
    fn test_request_serialization() {
        let item = NewsItem {
            ticker: "AAPL".to_string(),
            date: Date::from_ymd_opt(2020, 3, 2).unwrap(),
            headline: "Earnings beat".to_string(),
        };
        let request = RateRequest {
            ticker: "AAPL",
            as_of_date: Date::from_ymd_opt(2020, 3, 3).unwrap(),
            news: vec![NewsPayload::from(&item)],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"ticker":"AAPL","as_of_date":"2020-03-03","news":[{"date":"2020-03-02","headline":"Earnings beat"}]}"#
        );
    }
}
