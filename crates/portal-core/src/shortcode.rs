use crate::base62;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A validated short code identifier for a shortened URL.
///
/// Codes contain only `[a-zA-Z0-9_-]`. User-chosen codes are 3-20
/// characters long; any code that can be looked up is 1-32 characters, which
/// also covers the short base62 codes produced by a counter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortCode(String);

pub const MIN_CUSTOM_LENGTH: usize = 3;
pub const MAX_CUSTOM_LENGTH: usize = 20;
const MAX_LENGTH: usize = 32;

impl ShortCode {
    /// Validates a user-chosen code.
    pub fn custom(code: impl Into<String>) -> Result<Self, CoreError> {
        let code = code.into();
        if code.len() < MIN_CUSTOM_LENGTH || code.len() > MAX_CUSTOM_LENGTH {
            return Err(CoreError::InvalidCustomCode(format!(
                "length must be between {} and {}, got {}",
                MIN_CUSTOM_LENGTH,
                MAX_CUSTOM_LENGTH,
                code.len()
            )));
        }
        if !has_valid_charset(&code) {
            return Err(CoreError::InvalidCustomCode(format!(
                "must contain only alphanumeric characters, hyphens, or underscores: '{}'",
                code
            )));
        }
        Ok(Self(code))
    }

    /// Validates a code received for lookup.
    pub fn parse(code: impl Into<String>) -> Result<Self, CoreError> {
        let code = code.into();
        if code.is_empty() || code.len() > MAX_LENGTH {
            return Err(CoreError::InvalidShortCode(format!(
                "length must be between 1 and {}, got {}",
                MAX_LENGTH,
                code.len()
            )));
        }
        if !has_valid_charset(&code) {
            return Err(CoreError::InvalidShortCode(format!(
                "must contain only alphanumeric characters, hyphens, or underscores: '{}'",
                code
            )));
        }
        Ok(Self(code))
    }

    /// Encodes a generated id with the base62 codec.
    pub fn from_id(id: u64) -> Self {
        Self(base62::encode(id))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources.
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn has_valid_charset(code: &str) -> bool {
    code.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ShortCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShortCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ShortCode> for String {
    fn from(code: ShortCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_custom_codes() {
        assert!(ShortCode::custom("abc").is_ok());
        assert!(ShortCode::custom("Abc-123_xyz").is_ok());
        assert!(ShortCode::custom("a".repeat(20)).is_ok());
    }

    #[test]
    fn custom_too_short() {
        assert!(matches!(
            ShortCode::custom("ab"),
            Err(CoreError::InvalidCustomCode(_))
        ));
        assert!(ShortCode::custom("").is_err());
    }

    #[test]
    fn custom_too_long() {
        assert!(ShortCode::custom("a".repeat(21)).is_err());
    }

    #[test]
    fn custom_invalid_characters() {
        assert!(ShortCode::custom("abc def").is_err());
        assert!(ShortCode::custom("abc/def").is_err());
        assert!(ShortCode::custom("abc!def").is_err());
    }

    #[test]
    fn parse_accepts_short_generated_codes() {
        assert_eq!(ShortCode::parse("1").unwrap().as_str(), "1");
        assert!(ShortCode::parse("a".repeat(32)).is_ok());
        assert!(matches!(
            ShortCode::parse("a".repeat(33)),
            Err(CoreError::InvalidShortCode(_))
        ));
        assert!(ShortCode::parse("").is_err());
        assert!(ShortCode::parse("favicon.ico").is_err());
    }

    #[test]
    fn from_id_uses_base62() {
        assert_eq!(ShortCode::from_id(0).as_str(), "0");
        assert_eq!(ShortCode::from_id(62).as_str(), "10");
    }

    #[test]
    fn to_url_joins_base() {
        let code = ShortCode::custom("abc123").unwrap();
        assert_eq!(code.to_url("https://por.tl"), "https://por.tl/abc123");
        assert_eq!(code.to_url("https://por.tl/"), "https://por.tl/abc123");
    }

    #[test]
    fn try_from_string_validates() {
        assert!(ShortCode::try_from("abc".to_string()).is_ok());
        assert!(ShortCode::try_from("a b".to_string()).is_err());
        assert!("xyz".parse::<ShortCode>().is_ok());
    }
}
