//! Normalizing deserializers for backend payloads.
//!
//! The backend is a Django service whose serializers changed shape across
//! runs: numbers arrive as strings, lists as comma-joined text, and any field
//! may be `null`. These helpers absorb that drift at the boundary so the rest
//! of the crate only sees well-formed values.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{UNKNOWN_AUTHOR, UNLABELED_TOPIC};

/// A JSON scalar of unknown type.
#[derive(Debug, Clone, PartialEq)]
pub enum RawScalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl RawScalar {
    /// `None` for `null`, arrays and objects.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::Bool(b) => Some(Self::Bool(b)),
            Value::String(s) => Some(Self::Text(s)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Text(s) => s,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(_) => None,
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value.filter(|f| f.is_finite())
    }
}

/// Any scalar; a value of the wrong shape reads as absent instead of
/// failing the enclosing record.
pub fn loose_scalar<'de, D>(deserializer: D) -> Result<Option<RawScalar>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(RawScalar::from_value(Value::deserialize(deserializer)?))
}

/// Scalar rendered as text, so `3` reads as `"3"`.
pub fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_scalar(deserializer)?.map(RawScalar::into_text))
}

/// `null` decodes as `T::default()`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Free text; numbers and booleans are rendered, anything else is empty.
pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(loose_text(deserializer)?.unwrap_or_default())
}

/// Optional nested value; one that doesn't fit `T` reads as `None`.
pub fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        value => serde_json::from_value(value).ok(),
    })
}

/// Optional float; strings holding numbers are accepted, garbage is `None`.
pub fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(loose_scalar(deserializer)?.as_ref().and_then(RawScalar::as_f64))
}

/// Like [`lenient_f64`] but falls back to `0.0`.
pub fn lenient_f64_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(lenient_f64(deserializer)?.unwrap_or(0.0))
}

/// Non-negative count; negatives and garbage collapse to 0.
pub fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = lenient_f64(deserializer)?.unwrap_or(0.0);
    Ok(if value > 0.0 { value as u64 } else { 0 })
}

/// Resolution score restricted to the ordinal range 1..=5.
pub fn lenient_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
    let value = lenient_f64(deserializer)?;
    Ok(value
        .filter(|v| v.fract() == 0.0 && (1.0..=5.0).contains(v))
        .map(|v| v as u8))
}

/// Keyword list; a comma-joined string is split, blanks are dropped.
pub fn keywords<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let keywords = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(RawScalar::from_value)
            .map(|k| k.into_text().trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
        Value::String(text) => text
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
        _ => Vec::new(),
    };
    Ok(keywords)
}

/// Topic label, defaulting to "Unlabeled" when null or blank.
pub fn topic_label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    non_blank_or(deserializer, UNLABELED_TOPIC)
}

/// Author name, defaulting to "Unknown" when null or blank.
pub fn author_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    non_blank_or(deserializer, UNKNOWN_AUTHOR)
}

fn non_blank_or<'de, D: Deserializer<'de>>(
    deserializer: D,
    fallback: &str,
) -> Result<String, D::Error> {
    Ok(loose_text(deserializer)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string()))
}
