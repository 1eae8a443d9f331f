//! user accounts.
//!
//! a user is identified by their wallet address and email. accounts start
//! unverified and become verified once the emailed passcode is confirmed.
//! the `admin` role is what authorises milestone decisions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Email, Error, WalletAddress};

/// unique identifier for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// platform role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// regular donor or campaign creator
    #[default]
    User,
    /// may approve or reject milestone requests
    Admin,
}

impl UserRole {
    /// the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(Error::UnknownRole(other.to_string())),
        }
    }
}

/// a chainfund user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// unique identifier (0 before the record is persisted)
    pub id: UserId,

    /// display name chosen at signup
    pub name: String,

    /// verified contact address, unique
    pub email: Email,

    /// wallet address, unique
    pub wallet_address: WalletAddress,

    /// platform role
    pub role: UserRole,

    /// whether the signup passcode has been confirmed
    pub is_verified: bool,

    /// sha-256 hash of the outstanding passcode
    #[serde(skip)]
    pub otp_hash: Option<String>,

    /// when the outstanding passcode expires
    #[serde(skip)]
    pub otp_expires_at: Option<DateTime<Utc>>,

    /// failed guesses against the outstanding passcode
    #[serde(skip)]
    pub otp_attempts: u32,

    /// when the user was created
    pub created_at: DateTime<Utc>,

    /// when the user was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// create a new unverified user with the `user` role
    pub fn new(name: String, email: Email, wallet_address: WalletAddress) -> Self {
        let now = Utc::now();
        Self {
            id: UserId(0),
            name,
            email,
            wallet_address,
            role: UserRole::User,
            is_verified: false,
            otp_hash: None,
            otp_expires_at: None,
            otp_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// whether this user may decide on milestone approvals
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// whether an unexpired passcode is outstanding at `now`
    pub fn has_live_otp(&self, now: DateTime<Utc>) -> bool {
        self.otp_hash.is_some() && self.otp_expires_at.is_some_and(|exp| exp > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user() -> User {
        User::new(
            "ada".to_string(),
            Email::new("ada@example.com").unwrap(),
            WalletAddress::new("0x00000000000000000000000000000000000000aa").unwrap(),
        )
    }

    #[test]
    fn test_new_user_defaults() {
        let user = user();
        assert_eq!(user.role, UserRole::User);
        assert!(!user.is_verified);
        assert!(!user.is_admin());
    }

    #[test]
    fn test_role_roundtrip_strings() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!(UserRole::User.as_str(), "user");
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_live_otp() {
        let now = Utc::now();
        let mut user = user();
        assert!(!user.has_live_otp(now));

        user.otp_hash = Some("abc".to_string());
        user.otp_expires_at = Some(now + Duration::minutes(5));
        assert!(user.has_live_otp(now));
        assert!(!user.has_live_otp(now + Duration::minutes(6)));
    }

    #[test]
    fn test_serialization_skips_otp_fields() {
        let mut user = user();
        user.otp_hash = Some("secret-hash".to_string());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"wallet_address\""));
    }
}
