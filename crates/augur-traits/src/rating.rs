//! Rating labels, confidence levels and the numeric signal encoding.
//!
//! A rating maps to a fixed ordinal base score (`StrongBuy=+2` through
//! `Sell=-2`) and the final signal is that score scaled by confidence. The
//! confidence values are chosen so that a low-confidence `StrongBuy` always
//! ranks strictly below a high-confidence `Buy`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AugurError, Result};

/// An analyst-style rating on a five-point scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RatingLabel {
    /// Strong buy (+2).
    StrongBuy,
    /// Buy (+1).
    Buy,
    /// Hold (0).
    Hold,
    /// Underperform (-1).
    UnderPerform,
    /// Sell (-2).
    Sell,
}

impl RatingLabel {
    /// All labels from most bullish to most bearish.
    pub const ALL: [Self; 5] = [
        Self::StrongBuy,
        Self::Buy,
        Self::Hold,
        Self::UnderPerform,
        Self::Sell,
    ];

    /// Ordinal base score of the label.
    pub const fn base_score(self) -> f64 {
        match self {
            Self::StrongBuy => 2.0,
            Self::Buy => 1.0,
            Self::Hold => 0.0,
            Self::UnderPerform => -1.0,
            Self::Sell => -2.0,
        }
    }

    /// Canonical label text.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StrongBuy => "StrongBuy",
            Self::Buy => "Buy",
            Self::Hold => "Hold",
            Self::UnderPerform => "UnderPerform",
            Self::Sell => "Sell",
        }
    }

    /// Parses free-form rating text as found in analyst recommendation feeds.
    ///
    /// Accepts the canonical labels plus spacing and case variants
    /// ("STRONG BUY", "under perform") and falls back to keyword matching.
    /// Returns `None` when nothing matches.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();

        match compact.as_str() {
            "STRONGBUY" => return Some(Self::StrongBuy),
            "BUY" | "OUTPERFORM" => return Some(Self::Buy),
            "HOLD" | "NEUTRAL" => return Some(Self::Hold),
            "UNDERPERFORM" => return Some(Self::UnderPerform),
            "SELL" | "STRONGSELL" => return Some(Self::Sell),
            _ => {}
        }

        if compact.contains("STRONG") && compact.contains("BUY") {
            Some(Self::StrongBuy)
        } else if compact.contains("BUY") {
            Some(Self::Buy)
        } else if compact.contains("HOLD") {
            Some(Self::Hold)
        } else if compact.contains("UNDER") {
            Some(Self::UnderPerform)
        } else if compact.contains("SELL") {
            Some(Self::Sell)
        } else {
            None
        }
    }
}

impl fmt::Display for RatingLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RatingLabel {
    type Err = AugurError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_lenient(s)
            .ok_or_else(|| AugurError::InvalidData(format!("unrecognized rating label '{s}'")))
    }
}

/// Confidence attached to a rating.
///
/// Providers either emit one of three levels or a continuous score in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Confidence {
    /// High confidence (1.0).
    High,
    /// Medium confidence (0.6).
    Medium,
    /// Low confidence (0.3).
    Low,
    /// Continuous confidence in [0, 1].
    Score(f64),
}

impl Confidence {
    /// Creates a continuous confidence, rejecting values outside [0, 1].
    pub fn score(value: f64) -> Result<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self::Score(value))
        } else {
            Err(AugurError::InvalidData(format!(
                "confidence {value} is outside [0, 1]"
            )))
        }
    }

    /// Numeric confidence in [0, 1].
    pub const fn value(self) -> f64 {
        match self {
            Self::High => 1.0,
            Self::Medium => 0.6,
            Self::Low => 0.3,
            Self::Score(v) => v,
        }
    }

    /// Parses "High"/"Medium"/"Low" (any case) or a number in [0, 1].
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Self::High),
            "MEDIUM" | "MED" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            _ => trimmed
                .parse::<f64>()
                .map_err(|_| AugurError::InvalidData(format!("unrecognized confidence '{raw}'")))
                .and_then(Self::score),
        }
    }
}

/// Encodes a rating and confidence as a signed numeric signal in [-2, 2].
pub const fn encode_signal(rating: RatingLabel, confidence: Confidence) -> f64 {
    rating.base_score() * confidence.value()
}
