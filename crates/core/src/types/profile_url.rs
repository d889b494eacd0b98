//! Profile link type (picture, `LinkedIn`, `GitHub`).

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

/// Errors that can occur when parsing a [`ProfileUrl`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileUrlError {
    /// The input is not an absolute URL.
    #[error("invalid URL: {0}")]
    Invalid(String),
    /// The URL uses a scheme other than `http` or `https`.
    #[error("URL scheme must be http or https, got '{0}'")]
    Scheme(String),
    /// The URL has no host.
    #[error("URL must have a host")]
    MissingHost,
    /// The URL exceeds the stored column width.
    #[error("URL must be at most {max} characters")]
    TooLong { max: usize },
}

/// An absolute `http`/`https` URL attached to a user profile.
///
/// The original input string is preserved so that responses echo exactly
/// what the client sent.
///
/// ```
/// use accounts_core::ProfileUrl;
///
/// assert!(ProfileUrl::parse("https://github.com/johndoe").is_ok());
/// assert!(ProfileUrl::parse("ftp://example.com/file").is_err());
/// assert!(ProfileUrl::parse("javascript:alert(1)").is_err());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ProfileUrl(String);

impl ProfileUrl {
    /// Maximum URL length in characters.
    pub const MAX_LENGTH: usize = 255;

    /// Parse a `ProfileUrl` from a string.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileUrlError`] if the input is not an absolute URL with
    /// an `http`/`https` scheme and a host.
    pub fn parse(s: &str) -> Result<Self, ProfileUrlError> {
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(ProfileUrlError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let url = Url::parse(s).map_err(|e| ProfileUrlError::Invalid(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ProfileUrlError::Scheme(other.to_owned())),
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(ProfileUrlError::MissingHost);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProfileUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ProfileUrl {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ProfileUrl {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ProfileUrl {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_http_and_https() {
        assert!(ProfileUrl::parse("http://www.github.com/kaw393939").is_ok());
        assert!(ProfileUrl::parse("https://linkedin.com/in/johndoe").is_ok());
    }

    #[test]
    fn test_preserves_input() {
        let url = ProfileUrl::parse("http://www.linkedin.com/kaw393939").unwrap_or_else(|e| {
            panic!("expected valid url: {e}");
        });
        assert_eq!(url.as_str(), "http://www.linkedin.com/kaw393939");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert_eq!(
            ProfileUrl::parse("ftp://example.com/file"),
            Err(ProfileUrlError::Scheme("ftp".to_owned()))
        );
        assert!(matches!(
            ProfileUrl::parse("javascript:alert(1)"),
            Err(ProfileUrlError::Scheme(_))
        ));
    }

    #[test]
    fn test_rejects_relative() {
        assert!(matches!(
            ProfileUrl::parse("/profile.jpg"),
            Err(ProfileUrlError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_overlong() {
        let at_limit = format!("https://github.com/{}", "a".repeat(255 - 19));
        assert_eq!(at_limit.len(), ProfileUrl::MAX_LENGTH);
        assert!(ProfileUrl::parse(&at_limit).is_ok());

        let over = format!("{at_limit}b");
        assert_eq!(
            ProfileUrl::parse(&over),
            Err(ProfileUrlError::TooLong { max: 255 })
        );
    }
}
