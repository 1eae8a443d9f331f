//! one-time passcodes for email verification.
//!
//! codes are six decimal digits. only the sha-256 hash of a code is
//! persisted; verification compares hashes in constant time.

use std::fmt;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// number of digits in a passcode.
pub const OTP_LEN: usize = 6;

/// a six-digit one-time passcode.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// generate a new random passcode.
    pub fn generate() -> Self {
        use rand::Rng;
        let n: u32 = rand::rng().random_range(0..1_000_000);
        Self(format!("{n:06}"))
    }

    /// parse a user-supplied passcode. returns none unless it is exactly six digits.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        (s.len() == OTP_LEN && s.chars().all(|c| c.is_ascii_digit())).then(|| Self(s.to_string()))
    }

    /// the passcode digits, for delivery to the user.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// compute the sha-256 hash of the code, hex encoded.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// verify this code against a stored hash using constant-time comparison.
    pub fn verify_hash(&self, stored_hash: &str) -> bool {
        self.hash().as_bytes().ct_eq(stored_hash.as_bytes()).into()
    }
}

// never print the digits in logs
impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}
