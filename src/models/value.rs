//! Fixed-point value types matching the ledger's 18-decimal convention.
//!
//! The ledger stores every price, fee and rate as an unsigned 256-bit integer
//! scaled by 10^18, with any sign carried out-of-band as an `isPositive` flag.
//! Internally this crate folds both fields into a single signed value
//! ([`BaseValue`]) and converts back to (magnitude, sign) at the boundary, so
//! arithmetic never has to thread a separate sign convention around.
//!
//! Multiplication and division between scaled values require an explicit
//! [`Rounding`] mode. Nothing in this module rounds silently.

use std::fmt;
use std::str::FromStr;

use ethers::types::{I256, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// Number of decimal places in the ledger's fixed-point representation.
pub const BASE_DECIMALS: u32 = 18;

fn one_scaled() -> I256 {
    I256::exp10(BASE_DECIMALS as usize)
}

fn one_scaled_u256() -> U256 {
    U256::exp10(BASE_DECIMALS as usize)
}

/// Rounding mode, always chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round toward negative infinity.
    Floor,
    /// Round toward positive infinity.
    Ceil,
    /// Round toward zero (truncate).
    Down,
}

/// Integer division with an explicit rounding mode.
pub(crate) fn div_round(numerator: I256, denominator: I256, rounding: Rounding) -> I256 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.is_zero() {
        return quotient;
    }
    let negative_result = numerator.is_negative() != denominator.is_negative();
    match rounding {
        Rounding::Down => quotient,
        Rounding::Floor => {
            if negative_result {
                quotient - I256::one()
            } else {
                quotient
            }
        }
        Rounding::Ceil => {
            if negative_result {
                quotient
            } else {
                quotient + I256::one()
            }
        }
    }
}

/// A signed decimal with an implicit scale of 10^18.
///
/// The inner representation is the ledger's own encoding (a 256-bit integer
/// counting units of 10^-18), so values survive the encode/decode boundary
/// bit-for-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BaseValue {
    scaled: I256,
}

impl BaseValue {
    pub fn zero() -> Self {
        BaseValue {
            scaled: I256::zero(),
        }
    }

    /// Wraps a raw 10^18-scaled integer.
    pub fn from_scaled(scaled: I256) -> Self {
        BaseValue { scaled }
    }

    /// The raw 10^18-scaled integer.
    pub fn scaled(&self) -> I256 {
        self.scaled
    }

    pub fn from_integer(value: i128) -> Self {
        BaseValue {
            scaled: I256::from(value) * one_scaled(),
        }
    }

    /// Converts a whole number of integer units (e.g. a position size) into a
    /// scaled value. Inputs are bounded by the ledger's storage width, which
    /// cannot overflow here.
    pub fn from_units(units: I256) -> Self {
        BaseValue {
            scaled: units * one_scaled(),
        }
    }

    /// Converts a caller-supplied unsigned integer amount into a scaled value.
    pub fn from_u256_units(units: U256) -> Result<Self, FormatError> {
        let signed =
            I256::try_from(units).map_err(|_| FormatError::ValueOutOfRange(units.to_string()))?;
        let scaled = signed
            .checked_mul(one_scaled())
            .ok_or_else(|| FormatError::ValueOutOfRange(units.to_string()))?;
        Ok(BaseValue { scaled })
    }

    /// Decodes a ledger value: unsigned 10^18-scaled magnitude plus sign flag.
    pub fn from_solidity(value: U256, is_positive: bool) -> Result<Self, FormatError> {
        let magnitude =
            I256::try_from(value).map_err(|_| FormatError::ValueOutOfRange(value.to_string()))?;
        Ok(BaseValue {
            scaled: if is_positive { magnitude } else { -magnitude },
        })
    }

    /// Decodes a ledger value from its decimal string form.
    pub fn from_solidity_dec_str(value: &str, is_positive: bool) -> Result<Self, FormatError> {
        let magnitude = U256::from_dec_str(value)
            .map_err(|_| FormatError::InvalidDecimal(value.to_string()))?;
        Self::from_solidity(magnitude, is_positive)
    }

    /// Encodes for the ledger: unsigned 10^18-scaled magnitude plus sign flag.
    /// Zero encodes as positive.
    pub fn to_solidity(&self) -> (U256, bool) {
        (self.scaled.unsigned_abs(), !self.scaled.is_negative())
    }

    pub fn is_zero(&self) -> bool {
        self.scaled.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.scaled.is_negative()
    }

    pub fn negated(&self) -> Self {
        BaseValue {
            scaled: -self.scaled,
        }
    }

    pub fn abs(&self) -> Self {
        if self.scaled.is_negative() {
            self.negated()
        } else {
            *self
        }
    }

    /// Full-precision product of two scaled values, reduced back to 18
    /// decimals with the given rounding.
    pub fn base_mul(&self, rhs: BaseValue, rounding: Rounding) -> BaseValue {
        BaseValue {
            scaled: div_round(self.scaled * rhs.scaled, one_scaled(), rounding),
        }
    }

    /// Quotient of two scaled values to 18 decimals with the given rounding.
    /// `None` when dividing by zero.
    pub fn checked_base_div(&self, rhs: BaseValue, rounding: Rounding) -> Option<BaseValue> {
        if rhs.scaled.is_zero() {
            return None;
        }
        Some(BaseValue {
            scaled: div_round(self.scaled * one_scaled(), rhs.scaled, rounding),
        })
    }

    pub fn mul_int(&self, n: i64) -> BaseValue {
        BaseValue {
            scaled: self.scaled * I256::from(n),
        }
    }

    /// `None` when dividing by zero.
    pub fn checked_div_int(&self, n: i64, rounding: Rounding) -> Option<BaseValue> {
        if n == 0 {
            return None;
        }
        Some(BaseValue {
            scaled: div_round(self.scaled, I256::from(n), rounding),
        })
    }

    /// Rounds to a whole number of integer units with the given rounding.
    pub fn round_to_units(&self, rounding: Rounding) -> I256 {
        div_round(self.scaled, one_scaled(), rounding)
    }

    /// Conversion for human-facing interop. Fails only for magnitudes beyond
    /// `rust_decimal`'s 28-digit range.
    pub fn to_decimal(&self) -> Result<Decimal, FormatError> {
        Decimal::from_str(&self.to_string())
            .map_err(|_| FormatError::ValueOutOfRange(self.to_string()))
    }

    pub fn from_decimal(value: Decimal) -> Result<Self, FormatError> {
        value.normalize().to_string().parse()
    }
}

impl std::ops::Add for BaseValue {
    type Output = BaseValue;
    fn add(self, rhs: BaseValue) -> BaseValue {
        BaseValue {
            scaled: self.scaled + rhs.scaled,
        }
    }
}

impl std::ops::Sub for BaseValue {
    type Output = BaseValue;
    fn sub(self, rhs: BaseValue) -> BaseValue {
        BaseValue {
            scaled: self.scaled - rhs.scaled,
        }
    }
}

impl std::ops::Neg for BaseValue {
    type Output = BaseValue;
    fn neg(self) -> BaseValue {
        self.negated()
    }
}

impl FromStr for BaseValue {
    type Err = FormatError;

    /// Parses an exact decimal string: optional leading `-`, integer digits,
    /// optional fraction of at most 18 digits. Parsing never rounds; inputs
    /// finer than the 18-decimal grid are rejected.
    fn from_str(s: &str) -> Result<Self, FormatError> {
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(FormatError::InvalidDecimal(s.to_string()));
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(FormatError::InvalidDecimal(s.to_string()));
        }
        if frac_part.len() > BASE_DECIMALS as usize {
            return Err(FormatError::TooManyDecimals(s.to_string()));
        }

        let int_value = if int_part.is_empty() {
            U256::zero()
        } else {
            U256::from_dec_str(int_part).map_err(|_| FormatError::InvalidDecimal(s.to_string()))?
        };
        let frac_value = if frac_part.is_empty() {
            U256::zero()
        } else {
            let raw = U256::from_dec_str(frac_part)
                .map_err(|_| FormatError::InvalidDecimal(s.to_string()))?;
            raw * U256::exp10(BASE_DECIMALS as usize - frac_part.len())
        };

        let magnitude = int_value
            .checked_mul(one_scaled_u256())
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(|| FormatError::ValueOutOfRange(s.to_string()))?;
        BaseValue::from_solidity(magnitude, !negative)
    }
}

impl fmt::Display for BaseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (magnitude, is_positive) = self.to_solidity();
        let int_part = magnitude / one_scaled_u256();
        let frac_part = magnitude % one_scaled_u256();
        if !is_positive && !magnitude.is_zero() {
            write!(f, "-")?;
        }
        if frac_part.is_zero() {
            write!(f, "{int_part}")
        } else {
            let frac = format!("{frac_part:0>18}");
            write!(f, "{}.{}", int_part, frac.trim_end_matches('0'))
        }
    }
}

/// A non-negative oracle or limit price, 10^18-scaled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(BaseValue);

impl Price {
    pub fn zero() -> Self {
        Price(BaseValue::zero())
    }

    pub fn new(value: BaseValue) -> Result<Self, FormatError> {
        if value.is_negative() {
            return Err(FormatError::NegativeValue(value.to_string()));
        }
        Ok(Price(value))
    }

    pub fn from_solidity(value: U256) -> Result<Self, FormatError> {
        Ok(Price(BaseValue::from_solidity(value, true)?))
    }

    pub fn to_solidity(&self) -> U256 {
        // Non-negative by construction, so the raw two's complement word is
        // the magnitude.
        self.0.scaled().into_raw()
    }

    pub fn value(&self) -> BaseValue {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for Price {
    type Err = FormatError;
    fn from_str(s: &str) -> Result<Self, FormatError> {
        Price::new(s.parse()?)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A fee rate. Negative fees are maker rebates; the sign travels out-of-band
/// (in the order's flag byte) on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fee(BaseValue);

impl Fee {
    pub fn zero() -> Self {
        Fee(BaseValue::zero())
    }

    pub fn new(value: BaseValue) -> Self {
        Fee(value)
    }

    /// Parses a rate expressed in basis points, e.g. `"-2.5"` => -0.00025.
    /// Rejects bips values finer than the 18-decimal grid.
    pub fn from_bips(s: &str) -> Result<Self, FormatError> {
        let bips: BaseValue = s.parse()?;
        if !(bips.scaled() % I256::from(10_000)).is_zero() {
            return Err(FormatError::TooManyDecimals(s.to_string()));
        }
        Ok(Fee(BaseValue::from_scaled(bips.scaled() / I256::from(10_000))))
    }

    pub fn value(&self) -> BaseValue {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Unsigned 10^18-scaled magnitude, as hashed and ABI-encoded.
    pub fn abs_solidity(&self) -> U256 {
        self.0.to_solidity().0
    }

    pub fn to_solidity(&self) -> (U256, bool) {
        self.0.to_solidity()
    }

    pub fn negated(&self) -> Self {
        Fee(self.0.negated())
    }
}

impl FromStr for Fee {
    type Err = FormatError;
    fn from_str(s: &str) -> Result<Self, FormatError> {
        Ok(Fee(s.parse()?))
    }
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A signed per-second funding rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FundingRate(BaseValue);

impl FundingRate {
    pub fn new(value: BaseValue) -> Self {
        FundingRate(value)
    }

    /// Converts a rate quoted per eight hours into the per-second rate the
    /// ledger accrues, rounded down to the 18-decimal grid.
    pub fn from_eight_hour_rate(s: &str) -> Result<Self, FormatError> {
        let per_eight_hours: BaseValue = s.parse()?;
        let per_second = BaseValue::from_scaled(div_round(
            per_eight_hours.scaled(),
            I256::from(8 * 60 * 60),
            Rounding::Down,
        ));
        Ok(FundingRate(per_second))
    }

    pub fn value(&self) -> BaseValue {
        self.0
    }
}

impl fmt::Display for FundingRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> BaseValue {
        s.parse().unwrap()
    }

    #[test]
    fn parses_and_displays_exact_decimals() {
        assert_eq!(v("987.65432").to_string(), "987.65432");
        assert_eq!(v("-0.00025").to_string(), "-0.00025");
        assert_eq!(v("1200").to_string(), "1200");
        assert_eq!(v("0.000000000000000001").scaled(), I256::one());
        assert_eq!(v(".5").to_string(), "0.5");
    }

    #[test]
    fn rejects_malformed_decimals() {
        for bad in ["", "-", "1e18", "12.34.56", "abc", "1,5", "0.0000000000000000001"] {
            assert!(bad.parse::<BaseValue>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn solidity_round_trip() {
        for s in ["987.65432", "-12.5", "0", "0.000000000000000001"] {
            let value = v(s);
            let (magnitude, is_positive) = value.to_solidity();
            assert_eq!(BaseValue::from_solidity(magnitude, is_positive).unwrap(), value);
        }
    }

    #[test]
    fn dec_str_decoding() {
        let value = BaseValue::from_solidity_dec_str("250000000000000000", true).unwrap();
        assert_eq!(value.to_string(), "0.25");
        assert!(BaseValue::from_solidity_dec_str("12x4", true).is_err());
    }

    #[test]
    fn rounding_modes_on_negative_values() {
        let minus_one_point_five = v("-1.5");
        assert_eq!(minus_one_point_five.round_to_units(Rounding::Floor), I256::from(-2));
        assert_eq!(minus_one_point_five.round_to_units(Rounding::Down), I256::from(-1));
        assert_eq!(minus_one_point_five.round_to_units(Rounding::Ceil), I256::from(-1));

        let one_point_five = v("1.5");
        assert_eq!(one_point_five.round_to_units(Rounding::Floor), I256::from(1));
        assert_eq!(one_point_five.round_to_units(Rounding::Ceil), I256::from(2));
    }

    #[test]
    fn base_mul_truncates_toward_zero() {
        // 0.002 * 987.65432 = 1.97530864 exactly; no rounding needed.
        let fee = v("0.002").base_mul(v("987.65432"), Rounding::Down);
        assert_eq!(fee.to_string(), "1.97530864");

        // A product below the grid truncates toward zero for both signs.
        let tiny = v("0.000000000000000001");
        assert_eq!(tiny.base_mul(v("0.5"), Rounding::Down), BaseValue::zero());
        assert_eq!(tiny.negated().base_mul(v("0.5"), Rounding::Down), BaseValue::zero());
        assert_eq!(
            tiny.negated().base_mul(v("0.5"), Rounding::Floor).scaled(),
            I256::from(-1)
        );
    }

    #[test]
    fn division_by_zero_is_none() {
        assert!(v("1").checked_base_div(BaseValue::zero(), Rounding::Down).is_none());
        assert!(v("1").checked_div_int(0, Rounding::Down).is_none());
    }

    #[test]
    fn price_rejects_negative() {
        assert!("-1".parse::<Price>().is_err());
        let price: Price = "987.65432".parse().unwrap();
        assert_eq!(
            price.to_solidity(),
            U256::from_dec_str("987654320000000000000").unwrap()
        );
    }

    #[test]
    fn fee_from_bips() {
        let rebate = Fee::from_bips("-2.5").unwrap();
        assert!(rebate.is_negative());
        assert_eq!(rebate.to_string(), "-0.00025");
        assert_eq!(Fee::from_bips("50.0").unwrap().to_string(), "0.005");
        assert!(Fee::from_bips("0.00000000000000001").is_err());
    }

    #[test]
    fn funding_rate_from_eight_hour_rate() {
        let rate = FundingRate::from_eight_hour_rate("0.0075").unwrap();
        // 0.0075e18 / 28800 = 260416666666.66.. rounded down.
        assert_eq!(rate.value().scaled(), I256::from(260_416_666_666i64));
    }

    #[test]
    fn decimal_interop_round_trip() {
        let value = v("987.65432");
        let decimal = value.to_decimal().unwrap();
        assert_eq!(BaseValue::from_decimal(decimal).unwrap(), value);
    }
}
