//! validated email address type
//!
//! uses the `email_address` crate for rfc-compliant validation. addresses are
//! lowercased on construction so signup and otp lookups are case-insensitive

use std::fmt;
use std::str::FromStr;

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};

/// a validated, lowercased email address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// create a new Email, validating the format
    pub fn new(s: &str) -> Result<Self, EmailError> {
        let normalised = s.trim().to_lowercase();
        EmailAddress::from_str(&normalised).map_err(|_| EmailError::Invalid)?;
        Ok(Self(normalised))
    }

    /// get the email as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// consume the Email and return the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Email::new(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Email {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// error type for email validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmailError {
    /// email format is invalid
    #[error("invalid email format")]
    Invalid,
}
