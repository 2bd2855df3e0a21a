//! Training model
//!
//! This module provides:
//! - `Training` entity for the training catalogue
//! - `Price`, a two-decimal amount stored and serialized as a string
//! - `TrainingInput` for admin create/replace

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Training entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Training {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    /// Free-form duration label, e.g. "2 jours"
    pub duration: Option<String>,
    pub price: Option<Price>,
    /// Whether the price is displayed on the site
    pub show_price: bool,
    pub image: String,
    pub video_url: Option<String>,
    pub is_active: bool,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or replacing a training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingInput {
    pub title: String,
    /// Generated from the title when empty
    #[serde(default)]
    pub slug: Option<String>,
    pub short_description: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default = "default_true")]
    pub show_price: bool,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub position: i64,
}

/// Admin list filter for trainings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainingFilter {
    /// Matches title or short description
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub show_price: Option<bool>,
}

impl TrainingFilter {
    /// Trainings visible on the public site
    pub fn active() -> Self {
        Self {
            is_active: Some(true),
            ..Default::default()
        }
    }
}

pub(crate) fn default_true() -> bool {
    true
}

/// Maximum number of digits before the decimal point (10 digits, 2 decimals)
const MAX_INTEGER_DIGITS: usize = 8;

/// Non-negative amount with exactly two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("A valid number is required.")]
    Invalid,
    #[error("Ensure that there are no more than 2 decimal places.")]
    TooManyDecimals,
    #[error("Ensure that there are no more than 8 digits before the decimal point.")]
    TooManyDigits,
}

impl Price {
    pub fn from_cents(cents: i64) -> Self {
        Self { cents: cents.max(0) }
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (s, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(PriceError::Invalid);
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(PriceError::Invalid);
        }

        let whole = whole.trim_start_matches('0');
        if whole.len() > MAX_INTEGER_DIGITS {
            return Err(PriceError::TooManyDigits);
        }
        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > 2 {
            return Err(PriceError::TooManyDecimals);
        }

        let units: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| PriceError::Invalid)?
        };
        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| PriceError::Invalid)? * 10,
            _ => fraction.parse().map_err(|_| PriceError::Invalid)?,
        };

        Ok(Self::from_cents(units * 100 + cents))
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Integer(u64),
            Float(f64),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s,
            Raw::Integer(n) => n.to_string(),
            Raw::Float(f) => f.to_string(),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_parse_and_display() {
        assert_eq!("199".parse::<Price>().unwrap().to_string(), "199.00");
        assert_eq!("199.5".parse::<Price>().unwrap().to_string(), "199.50");
        assert_eq!("0.99".parse::<Price>().unwrap().to_string(), "0.99");
        assert_eq!("1490.00".parse::<Price>().unwrap().cents(), 149_000);
        assert_eq!(".5".parse::<Price>().unwrap().cents(), 50);
    }

    #[test]
    fn test_price_rejects_invalid_values() {
        assert_eq!("".parse::<Price>(), Err(PriceError::Invalid));
        assert_eq!("abc".parse::<Price>(), Err(PriceError::Invalid));
        assert_eq!("-10".parse::<Price>(), Err(PriceError::Invalid));
        assert_eq!("10.123".parse::<Price>(), Err(PriceError::TooManyDecimals));
        assert_eq!("123456789".parse::<Price>(), Err(PriceError::TooManyDigits));
    }

    #[test]
    fn test_price_serde() {
        let price: Price = serde_json::from_str("\"250.00\"").unwrap();
        assert_eq!(price.cents(), 25_000);
        let price: Price = serde_json::from_str("99.9").unwrap();
        assert_eq!(price.cents(), 9_990);
        let price: Price = serde_json::from_str("120").unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"120.00\"");
    }

    #[test]
    fn test_training_input_defaults() {
        let input: TrainingInput = serde_json::from_str(
            r#"{"title": "Formation", "short_description": "Courte"}"#,
        )
        .unwrap();
        assert!(input.show_price);
        assert!(input.is_active);
        assert_eq!(input.position, 0);
        assert!(input.price.is_none());
    }
}
