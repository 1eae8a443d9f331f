//! validated wallet address type.
//!
//! wallet addresses must:
//! - Start with "0x"
//! - Have exactly 40 hex characters after the prefix
//!
//! addresses are normalised to lowercase so that checksummed and
//! plain forms of the same address compare equal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// length of the hex portion (20 bytes = 40 hex chars).
pub const WALLET_HEX_LEN: usize = 40;

/// a validated, lowercase evm wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// create a new wallet address, validating the format.
    pub fn new(s: &str) -> Result<Self, WalletAddressError> {
        let s = s.trim();
        let hex_part = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(WalletAddressError::MissingPrefix)?;

        if hex_part.len() != WALLET_HEX_LEN {
            return Err(WalletAddressError::InvalidLength {
                expected: WALLET_HEX_LEN,
                got: hex_part.len(),
            });
        }

        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(WalletAddressError::InvalidHex);
        }

        Ok(Self(format!("0x{}", hex_part.to_ascii_lowercase())))
    }

    /// get the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// consume the address and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// short form for logs: `0x1234…abcd`.
    pub fn short(&self) -> String {
        format!("{}…{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = WalletAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for WalletAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        WalletAddress::new(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for WalletAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// error type for invalid wallet addresses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletAddressError {
    /// address does not start with "0x".
    #[error("wallet address must start with '0x'")]
    MissingPrefix,

    /// hex portion has wrong length.
    #[error("wallet address must have {expected} hex characters, got {got}")]
    InvalidLength {
        /// expected number of hex characters.
        expected: usize,
        /// actual number of hex characters.
        got: usize,
    },

    /// hex portion contains non-hex characters.
    #[error("wallet address contains non-hex characters")]
    InvalidHex,
}
