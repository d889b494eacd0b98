//! Public nickname type.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when parsing a [`Nickname`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NicknameError {
    /// The input is shorter than the minimum.
    #[error("nickname must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The input is longer than the maximum.
    #[error("nickname must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[A-Za-z0-9_-]`.
    #[error("nickname may only contain letters, digits, '_' and '-'")]
    InvalidCharacter,
}

/// A user's public nickname.
///
/// ## Constraints
///
/// - Length: 3-32 characters
/// - ASCII letters, digits, `_` and `-` only
///
/// ```
/// use accounts_core::Nickname;
///
/// assert!(Nickname::parse("john_doe").is_ok());
/// assert!(Nickname::parse("jd").is_err());
/// assert!(Nickname::parse("john doe").is_err());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Nickname(String);

impl Nickname {
    /// Minimum nickname length.
    pub const MIN_LENGTH: usize = 3;

    /// Maximum nickname length.
    pub const MAX_LENGTH: usize = 32;

    /// Parse a `Nickname` from a string.
    ///
    /// # Errors
    ///
    /// Returns a [`NicknameError`] if the length or character set is invalid.
    pub fn parse(s: &str) -> Result<Self, NicknameError> {
        if s.len() < Self::MIN_LENGTH {
            return Err(NicknameError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(NicknameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(NicknameError::InvalidCharacter);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the nickname as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nickname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Nickname {
    type Err = NicknameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Nickname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Nickname {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Nickname {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Nickname {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Nickname {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
