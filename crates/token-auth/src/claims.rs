//! Token claims.
//!
//! Claims are a mapping from claim name to a loosely-typed [`ClaimValue`].
//! Registered time claims are read through total conversion functions so a
//! token encoding `exp` as `1700000000` or `1700000000.0` yields the same
//! timestamp.
//!
//! The `sub` claim value is redacted in Debug output.

use crate::error::ClaimsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Issuer claim name.
pub const ISSUER: &str = "iss";
/// Audience claim name.
pub const AUDIENCE: &str = "aud";
/// Authentication time claim name.
pub const AUTH_TIME: &str = "auth_time";
/// Issued-at claim name.
pub const ISSUED_AT: &str = "iat";
/// Expiration claim name.
pub const EXPIRES_AT: &str = "exp";
/// Not-before claim name.
pub const NOT_BEFORE: &str = "nbf";
/// Subject claim name.
pub const SUBJECT: &str = "sub";

/// A single claim value.
///
/// Scalars get their own variant; anything else (arrays, objects, null)
/// passes through unchanged as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Json(serde_json::Value),
}

impl ClaimValue {
    /// Returns the string value, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ClaimValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Normalizes a numeric value into whole Unix seconds.
    ///
    /// Integers are returned as-is. Floats are truncated toward zero; NaN,
    /// infinities and values outside the `i64` range yield `None`, as does
    /// every non-numeric variant.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            ClaimValue::Integer(v) => Some(*v),
            ClaimValue::Float(v) if v.is_finite() => {
                let secs = v.trunc();
                if secs >= i64::MIN as f64 && secs < i64::MAX as f64 {
                    Some(secs as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Short rendering used in validation errors.
    pub(crate) fn describe(&self) -> String {
        match self {
            ClaimValue::String(s) => s.clone(),
            other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        ClaimValue::String(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        ClaimValue::String(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        ClaimValue::Integer(value)
    }
}

impl From<i32> for ClaimValue {
    fn from(value: i32) -> Self {
        ClaimValue::Integer(i64::from(value))
    }
}

impl From<u32> for ClaimValue {
    fn from(value: u32) -> Self {
        ClaimValue::Integer(i64::from(value))
    }
}

impl From<f64> for ClaimValue {
    fn from(value: f64) -> Self {
        ClaimValue::Float(value)
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        ClaimValue::Bool(value)
    }
}

impl From<serde_json::Value> for ClaimValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => ClaimValue::Bool(b),
            serde_json::Value::String(s) => ClaimValue::String(s),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => ClaimValue::Integer(i),
                (None, Some(f)) => ClaimValue::Float(f),
                (None, None) => ClaimValue::Json(serde_json::Value::Number(n)),
            },
            other => ClaimValue::Json(other),
        }
    }
}

/// Claim set of a token.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(BTreeMap<String, ClaimValue>);

impl Claims {
    /// Creates an empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a claim, returning the previous value for that name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Option<ClaimValue> {
        self.0.insert(name.into(), value.into())
    }

    /// Builder-style [`Claims::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.insert(name, value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.0.get(name)
    }

    /// Returns the claim as a string, if present and a string.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ClaimValue::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<ClaimValue> {
        self.0.remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClaimValue)> {
        self.0.iter()
    }

    /// `iss` claim, if it is a string.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.get_str(ISSUER)
    }

    /// `aud` claim, if it is a string.
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        self.get_str(AUDIENCE)
    }

    /// Reads a time claim as Unix seconds.
    ///
    /// # Errors
    ///
    /// Returns `ClaimsError::InvalidTimestamp` if the claim is present but
    /// not numeric. An absent claim is `Ok(None)`.
    pub fn timestamp(&self, name: &'static str) -> Result<Option<i64>, ClaimsError> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_timestamp()
                .map(Some)
                .ok_or(ClaimsError::InvalidTimestamp { claim: name }),
        }
    }

    /// Reads `exp` as an absolute UTC timestamp.
    ///
    /// # Errors
    ///
    /// - `ClaimsError::MissingExpiry` if `exp` is absent
    /// - `ClaimsError::InvalidTimestamp` if `exp` is not a representable number
    pub fn expires_at(&self) -> Result<DateTime<Utc>, ClaimsError> {
        let exp = self
            .timestamp(EXPIRES_AT)?
            .ok_or(ClaimsError::MissingExpiry)?;
        DateTime::from_timestamp(exp, 0).ok_or(ClaimsError::InvalidTimestamp { claim: EXPIRES_AT })
    }

    /// Converts a JSON object into claims.
    ///
    /// # Errors
    ///
    /// Returns the original value if it is not a JSON object.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Value> {
        match value {
            serde_json::Value::Object(map) => Ok(map
                .into_iter()
                .map(|(name, value)| (name, ClaimValue::from(value)))
                .collect()),
            other => Err(other),
        }
    }
}

impl<K: Into<String>, V: Into<ClaimValue>> FromIterator<(K, V)> for Claims {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Claims {
    type Item = (String, ClaimValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ClaimValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Custom Debug implementation that redacts the `sub` claim value.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.0 {
            if name == SUBJECT {
                map.entry(name, &"[REDACTED]");
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}
