//! Kubernetes resource quantities
//!
//! Quantities arrive as the strings the API server hands out (`20Gi`,
//! `1.5Ti`, `500M`, `10e9`, `1073741824`) and are only interpreted when a value
//! is needed, so a malformed one surfaces as an error of the computation
//! that reads it.

use crate::error::QuantityParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fractional digits kept when scaling a decimal mantissa
const MAX_FRACTION_DIGITS: usize = 18;

/// Largest power of ten a u128 holds
const MAX_EXPONENT: u32 = 38;

/// A resource quantity in Kubernetes notation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(String);

impl Quantity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the quantity in whole bytes, truncating any fraction
    pub fn to_bytes(&self) -> Result<u64, QuantityParseError> {
        parse_bytes(&self.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Quantity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Quantity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Scale of a unit suffix as numerator / denominator
fn suffix_scale(suffix: &str) -> Option<(u128, u128)> {
    let scale = match suffix {
        "" => (1, 1),
        "m" => (1, 1_000),
        "Ki" => (1 << 10, 1),
        "Mi" => (1 << 20, 1),
        "Gi" => (1 << 30, 1),
        "Ti" => (1 << 40, 1),
        "Pi" => (1 << 50, 1),
        "Ei" => (1 << 60, 1),
        "k" => (1_000, 1),
        "M" => (1_000_000, 1),
        "G" => (1_000_000_000, 1),
        "T" => (1_000_000_000_000, 1),
        "P" => (1_000_000_000_000_000, 1),
        "E" => (1_000_000_000_000_000_000, 1),
        _ => return exponent_scale(suffix),
    };
    Some(scale)
}

/// Scale of a decimal exponent such as `e9` or `E-3`. A bare `E` is exa.
/// Exponents past what a u128 holds saturate, so the caller reports overflow
/// for large values and truncates tiny ones to zero.
fn exponent_scale(suffix: &str) -> Option<(u128, u128)> {
    let exponent: i32 = suffix
        .strip_prefix(['e', 'E'])
        .filter(|rest| !rest.is_empty())?
        .parse()
        .ok()?;
    let power = |n: u32| 10u128.checked_pow(n.min(MAX_EXPONENT + 1)).unwrap_or(u128::MAX);
    if exponent >= 0 {
        Some((power(exponent.unsigned_abs()), 1))
    } else {
        Some((1, power(exponent.unsigned_abs())))
    }
}

fn parse_bytes(raw: &str) -> Result<u64, QuantityParseError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(QuantityParseError::Empty);
    }

    let unsigned = value.strip_prefix('+').unwrap_or(value);
    let split = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(split);

    let invalid = || QuantityParseError::InvalidNumber {
        quantity: raw.to_string(),
    };
    let overflow = || QuantityParseError::Overflow {
        quantity: raw.to_string(),
    };

    let (int_digits, frac_digits) = match number.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (number, ""),
    };
    if (int_digits.is_empty() && frac_digits.is_empty()) || frac_digits.contains('.') {
        return Err(invalid());
    }

    let (numerator, denominator) =
        suffix_scale(suffix).ok_or_else(|| QuantityParseError::UnknownSuffix {
            quantity: raw.to_string(),
            suffix: suffix.to_string(),
        })?;

    let int_part: u128 = if int_digits.is_empty() {
        0
    } else {
        int_digits.parse().map_err(|_| overflow())?
    };

    let frac_digits = &frac_digits[..frac_digits.len().min(MAX_FRACTION_DIGITS)];
    let frac_part: u128 = if frac_digits.is_empty() {
        0
    } else {
        frac_digits.parse().map_err(|_| invalid())?
    };
    let frac_scale = 10u128.pow(frac_digits.len() as u32);

    let whole = int_part.checked_mul(numerator).ok_or_else(overflow)?;
    let fraction = frac_part.checked_mul(numerator).ok_or_else(overflow)? / frac_scale;
    let bytes = whole.checked_add(fraction).ok_or_else(overflow)? / denominator;

    u64::try_from(bytes).map_err(|_| overflow())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(value: &str) -> Result<u64, QuantityParseError> {
        Quantity::from(value).to_bytes()
    }

    #[test]
    fn test_binary_suffixes() {
        assert_eq!(bytes("1Ki"), Ok(1024));
        assert_eq!(bytes("20Gi"), Ok(20 * (1 << 30)));
        assert_eq!(bytes("10Ti"), Ok(10 * (1 << 40)));
    }

    #[test]
    fn test_decimal_suffixes_and_plain_bytes() {
        assert_eq!(bytes("500M"), Ok(500_000_000));
        assert_eq!(bytes("1k"), Ok(1000));
        assert_eq!(bytes("1073741824"), Ok(1 << 30));
        assert_eq!(bytes("+2G"), Ok(2_000_000_000));
    }

    #[test]
    fn test_decimal_exponents() {
        assert_eq!(bytes("10e9"), Ok(10_000_000_000));
        assert_eq!(bytes("1E3"), Ok(1000));
        assert_eq!(bytes("1.5e3"), Ok(1500));
        assert_eq!(bytes("12e+2"), Ok(1200));
        assert_eq!(bytes("1500e-3"), Ok(1));
        assert_eq!(bytes("5e-50"), Ok(0));
        assert_eq!(bytes("2E"), Ok(2_000_000_000_000_000_000));
        assert!(matches!(bytes("1e100"), Err(QuantityParseError::Overflow { .. })));
        assert!(matches!(bytes("1.5e100"), Err(QuantityParseError::Overflow { .. })));
        assert!(matches!(bytes("1e"), Err(QuantityParseError::UnknownSuffix { .. })));
        assert!(matches!(bytes("1e3.5"), Err(QuantityParseError::UnknownSuffix { .. })));
    }

    #[test]
    fn test_fractional_values_truncate() {
        assert_eq!(bytes("1.5Gi"), Ok(3 * (1 << 29)));
        assert_eq!(bytes(".5Ki"), Ok(512));
        assert_eq!(bytes("1500m"), Ok(1));
    }

    #[test]
    fn test_malformed_quantities() {
        assert_eq!(bytes(""), Err(QuantityParseError::Empty));
        assert_eq!(bytes("   "), Err(QuantityParseError::Empty));
        assert!(matches!(bytes("Gi"), Err(QuantityParseError::InvalidNumber { .. })));
        assert!(matches!(bytes("1.2.3Gi"), Err(QuantityParseError::InvalidNumber { .. })));
        assert!(matches!(bytes("-5Gi"), Err(QuantityParseError::InvalidNumber { .. })));
        assert!(matches!(bytes("10Xi"), Err(QuantityParseError::UnknownSuffix { .. })));
        assert!(matches!(bytes("10 Gi"), Err(QuantityParseError::UnknownSuffix { .. })));
    }

    #[test]
    fn test_overflow_is_reported() {
        assert!(matches!(bytes("100Ei"), Err(QuantityParseError::Overflow { .. })));
        assert!(matches!(
            bytes("999999999999999999999999999999999999999999"),
            Err(QuantityParseError::Overflow { .. })
        ));
    }

    #[test]
    fn test_serde_is_transparent() {
        let quantity: Quantity = serde_json::from_str("\"20Gi\"").unwrap();
        assert_eq!(quantity.as_str(), "20Gi");
        assert_eq!(serde_json::to_string(&quantity).unwrap(), "\"20Gi\"");
    }
}
