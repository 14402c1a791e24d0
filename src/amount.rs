//! CCD amounts
//!
//! Amounts are carried as integer micro-CCD everywhere. Formatting and parsing
//! of the human-facing decimal form live here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of decimal places between CCD and micro-CCD
pub const CCD_DECIMALS: usize = 6;

/// Micro-CCD in one CCD
pub const MICRO_CCD_PER_CCD: u64 = 1_000_000;

/// Non-negative amount in micro-CCD
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CcdAmount(u64);

impl CcdAmount {
    pub const ZERO: Self = Self(0);

    pub const fn from_micro_ccd(micro_ccd: u64) -> Self {
        Self(micro_ccd)
    }

    pub const fn micro_ccd(&self) -> u64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CcdAmount {
    /// Fixed 6-decimal rendering, e.g. `1.500000`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / MICRO_CCD_PER_CCD,
            self.0 % MICRO_CCD_PER_CCD,
            width = CCD_DECIMALS
        )
    }
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum AmountParseError {
    #[error("amount is empty")]
    Empty,

    #[error("invalid input \"{0}\"")]
    InvalidInput(String),

    #[error("at most 6 decimal places are allowed")]
    TooPrecise,

    #[error("amount is too large")]
    Overflow,
}

impl FromStr for CcdAmount {
    type Err = AmountParseError;

    /// Parse a decimal CCD string such as `"12"`, `"0.5"` or `".25"`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AmountParseError::Empty);
        }

        let (whole, fraction) = match input.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (input, ""),
        };
        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction)
        {
            return Err(AmountParseError::InvalidInput(input.to_string()));
        }
        if fraction.len() > CCD_DECIMALS {
            return Err(AmountParseError::TooPrecise);
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| AmountParseError::Overflow)?
        };
        let fraction: u64 = if fraction.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", fraction, width = CCD_DECIMALS);
            padded
                .parse()
                .map_err(|_| AmountParseError::InvalidInput(input.to_string()))?
        };

        whole
            .checked_mul(MICRO_CCD_PER_CCD)
            .and_then(|micro| micro.checked_add(fraction))
            .map(Self)
            .ok_or(AmountParseError::Overflow)
    }
}
