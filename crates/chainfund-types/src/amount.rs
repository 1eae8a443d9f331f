//! exact money amounts.
//!
//! amounts are held as a count of base units (1 gwei = 10^-9 ETH) in an
//! `i64`, so sums and comparisons are exact. decimal text such as `"0.1"` is
//! parsed digit by digit; more than [`AMOUNT_DECIMALS`] fractional digits is
//! an error rather than a rounding.
//!
//! amounts serialize as decimal strings (`"0.3"`) and deserialize from
//! strings or json numbers. a json number is read through its shortest
//! decimal form, so `0.1` means exactly one tenth.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// fractional digits carried by an [`Amount`].
pub const AMOUNT_DECIMALS: usize = 9;

/// base units in one whole ETH.
const UNITS_PER_ETH: i64 = 1_000_000_000;

/// an exact amount of ETH, stored as gwei.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Amount(i64);

impl Amount {
    /// zero.
    pub const ZERO: Amount = Amount(0);

    /// wrap a raw count of base units.
    pub const fn from_base_units(units: i64) -> Self {
        Self(units)
    }

    /// raw count of base units, as stored.
    pub const fn base_units(self) -> i64 {
        self.0
    }

    /// whether the amount is strictly greater than zero.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// `self + rhs`, or `None` on overflow.
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    /// `self - rhs`, or `None` on overflow.
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// sum of all amounts, or `None` on overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Amount>) -> Option<Amount> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |acc, a| acc.checked_add(a))
    }

    /// parse decimal ETH text such as `"12"`, `"0.25"` or `"-1.5"`.
    pub fn parse(s: &str) -> Result<Self, AmountError> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::Invalid(s.to_string()));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(AmountError::Invalid(s.to_string()));
        }

        let frac = frac.trim_end_matches('0');
        if frac.len() > AMOUNT_DECIMALS {
            return Err(AmountError::TooPrecise(s.to_string()));
        }

        let whole_units = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<i64>()
                .map_err(|_| AmountError::Overflow(s.to_string()))?
        };
        let frac_units = if frac.is_empty() {
            0
        } else {
            format!("{:0<width$}", frac, width = AMOUNT_DECIMALS)
                .parse::<i64>()
                .map_err(|_| AmountError::Invalid(s.to_string()))?
        };

        let units = whole_units
            .checked_mul(UNITS_PER_ETH)
            .and_then(|w| w.checked_add(frac_units))
            .ok_or_else(|| AmountError::Overflow(s.to_string()))?;

        Ok(Self(if negative { -units } else { units }))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let units = self.0.unsigned_abs();
        let per_eth = UNITS_PER_ETH as u64;
        let (whole, frac) = (units / per_eth, units % per_eth);

        let text = if frac == 0 {
            format!("{sign}{whole}")
        } else {
            let frac = format!("{:0width$}", frac, width = AMOUNT_DECIMALS);
            format!("{sign}{whole}.{}", frac.trim_end_matches('0'))
        };
        f.pad(&text)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<f64> for Amount {
    type Error = AmountError;

    /// read a float through its shortest decimal form.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(AmountError::Invalid(value.to_string()));
        }
        Self::parse(&value.to_string())
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl serde::de::Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal ETH amount as a string or number")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::parse(v).map_err(E::custom)
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Amount, E> {
        v.checked_mul(UNITS_PER_ETH)
            .map(Amount)
            .ok_or_else(|| E::custom(AmountError::Overflow(v.to_string())))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Amount, E> {
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_mul(UNITS_PER_ETH))
            .map(Amount)
            .ok_or_else(|| E::custom(AmountError::Overflow(v.to_string())))
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Amount, E> {
        Amount::try_from(v).map_err(E::custom)
    }
}

/// error type for unparseable amounts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// not a plain decimal number.
    #[error("invalid amount: {0:?}")]
    Invalid(String),

    /// more fractional digits than an amount can carry.
    #[error("amount {0} has more than 9 decimal places")]
    TooPrecise(String),

    /// outside the representable range.
    #[error("amount {0} is out of range")]
    Overflow(String),
}
