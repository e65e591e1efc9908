use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Sub},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::op;

pub const EURO_CURRENCY_CODE: &str = "EUR";

//--------------------------------------     EuroCents       ---------------------------------------------------------
/// An amount of money in euro cents. All prices are computed and stored in cents; floating point euro values only
/// appear at the edges (client requests and rail payloads).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EuroCents(i64);

op!(binary EuroCents, Add, add);
op!(binary EuroCents, Sub, sub);
op!(inplace EuroCents, AddAssign, add_assign);

impl Mul<i64> for EuroCents {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for EuroCents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in euro cents: {0}")]
pub struct EuroCentsConversionError(String);

impl From<i64> for EuroCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for EuroCents {
    type Error = EuroCentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(EuroCentsConversionError(format!("Value {value} is too large to convert to EuroCents")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for EuroCents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}€{}.{:02}", abs / 100, abs % 100)
    }
}

impl EuroCents {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Converts a euro amount to cents, rounding to the nearest cent.
    pub fn try_from_euros(euros: f64) -> Result<Self, EuroCentsConversionError> {
        if !euros.is_finite() {
            return Err(EuroCentsConversionError(format!("{euros} is not a finite amount")));
        }
        let cents = (euros * 100.0).round();
        if cents.abs() > i64::MAX as f64 {
            return Err(EuroCentsConversionError(format!("{euros} is out of range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(cents as i64))
    }

    pub fn as_euros(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// The amount formatted as a plain decimal string with two places, e.g. `"6.00"`, as most payment APIs expect.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}
