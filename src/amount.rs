//! Decimal amount to minor-unit conversion
//!
//! Amounts enter the SDK as human-readable decimal strings ("1.5", "0.25")
//! and leave as `U256` minor units, matching the on-chain `uint256` width.
//! Conversion is done on the decimal digits directly; no value ever passes
//! through a binary floating point type.
//!
//! Rounding rule: when an amount carries more fractional digits than the
//! target precision, it is rounded half away from zero on the first dropped
//! digit. `to_minor_units("0.125", 2)` is `13`, `to_minor_units("0.124", 2)`
//! is `12`.

use alloy::primitives::U256;
use thiserror::Error;

use crate::error::ValidationError;

/// Decimal precision of the native coin (wei per ether).
pub const NATIVE_DECIMALS: u8 = 18;

/// Reasons a decimal amount cannot be converted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount is negative")]
    Negative,

    #[error("amount is not a decimal number")]
    NotNumeric,

    #[error("amount must be greater than zero")]
    Zero,

    #[error("amount exceeds the uint256 range")]
    Overflow,
}

/// Split a decimal string into its integer and fractional digit runs.
fn split_decimal(input: &str) -> Result<(&str, &str), AmountError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(AmountError::Empty);
    }
    if s.starts_with('-') {
        return Err(AmountError::Negative);
    }

    let (int, frac) = s.split_once('.').unwrap_or((s, ""));
    if int.is_empty() && frac.is_empty() {
        return Err(AmountError::NotNumeric);
    }
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int) || !all_digits(frac) {
        return Err(AmountError::NotNumeric);
    }

    Ok((int, frac))
}

/// Check that `input` is a well-formed, strictly positive decimal number.
///
/// This does not need the token precision, so it can run before any
/// network lookup.
pub fn parse_decimal(input: &str) -> Result<(), AmountError> {
    let (int, frac) = split_decimal(input)?;
    if int.bytes().chain(frac.bytes()).all(|b| b == b'0') {
        return Err(AmountError::Zero);
    }
    Ok(())
}

/// Scale a decimal amount by `10^decimals`.
///
/// # Example
/// ```
/// use alloy::primitives::U256;
/// use flow_batcher_sdk::amount::to_minor_units;
///
/// assert_eq!(to_minor_units("1.5", 6).unwrap(), U256::from(1_500_000u64));
/// assert_eq!(to_minor_units("0.125", 2).unwrap(), U256::from(13u64));
/// ```
pub fn to_minor_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let (int, frac) = split_decimal(amount)?;
    let precision = decimals as usize;

    let (kept, dropped) = if frac.len() > precision {
        frac.split_at(precision)
    } else {
        (frac, "")
    };

    let mut digits = String::with_capacity(int.len() + precision);
    digits.push_str(int);
    digits.push_str(kept);
    digits.extend(std::iter::repeat('0').take(precision - kept.len()));

    let digits = digits.trim_start_matches('0');
    let mut value = if digits.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(digits, 10).map_err(|_| AmountError::Overflow)?
    };

    if dropped.as_bytes().first().is_some_and(|d| *d >= b'5') {
        value = value
            .checked_add(U256::from(1u8))
            .ok_or(AmountError::Overflow)?;
    }

    Ok(value)
}

/// Render minor units back into a normalized decimal string.
///
/// Trailing fractional zeros are dropped, so `from_minor_units(1500, 3)`
/// is `"1.5"` and `from_minor_units(2000, 3)` is `"2"`.
pub fn from_minor_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let precision = decimals as usize;
    if precision == 0 {
        return digits;
    }

    let padded = if digits.len() <= precision {
        format!("{}{}", "0".repeat(precision - digits.len() + 1), digits)
    } else {
        digits
    };

    let (int, frac) = padded.split_at(padded.len() - precision);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int.to_string()
    } else {
        format!("{int}.{frac}")
    }
}

/// Sum minor-unit amounts, failing instead of wrapping on overflow.
pub fn sum(amounts: &[U256]) -> Result<U256, AmountError> {
    amounts.iter().try_fold(U256::ZERO, |acc, amount| {
        acc.checked_add(*amount).ok_or(AmountError::Overflow)
    })
}

/// Scale every amount of a transfer, reporting the index of the first bad one.
pub fn scale_amounts<S: AsRef<str>>(
    amounts: &[S],
    decimals: u8,
) -> Result<Vec<U256>, ValidationError> {
    amounts
        .iter()
        .enumerate()
        .map(|(index, amount)| {
            let amount = amount.as_ref();
            let invalid = |reason: AmountError| ValidationError::InvalidAmount {
                index,
                amount: amount.to_string(),
                reason: reason.to_string(),
            };
            match to_minor_units(amount, decimals) {
                Ok(value) if value.is_zero() => Err(invalid(AmountError::Zero)),
                Ok(value) => Ok(value),
                Err(e) => Err(invalid(e)),
            }
        })
        .collect()
}

/// Sum scaled amounts, naming the entry at which the running total overflows.
pub fn checked_total<S: AsRef<str>>(
    scaled: &[U256],
    raw: &[S],
) -> Result<U256, ValidationError> {
    let mut total = U256::ZERO;
    for (index, value) in scaled.iter().enumerate() {
        total = total
            .checked_add(*value)
            .ok_or_else(|| ValidationError::InvalidAmount {
                index,
                amount: raw
                    .get(index)
                    .map(|a| a.as_ref().to_string())
                    .unwrap_or_default(),
                reason: "batch total exceeds the uint256 range".to_string(),
            })?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wei(s: &str) -> U256 {
        U256::from_str_radix(s, 10).unwrap()
    }

    #[test]
    fn test_to_minor_units_whole_and_fractional() {
        assert_eq!(to_minor_units("1", 18).unwrap(), wei("1000000000000000000"));
        assert_eq!(to_minor_units("1.5", 18).unwrap(), wei("1500000000000000000"));
        assert_eq!(to_minor_units("0.1", 18).unwrap(), wei("100000000000000000"));
        assert_eq!(to_minor_units(".5", 1).unwrap(), U256::from(5u8));
        assert_eq!(to_minor_units("7.", 0).unwrap(), U256::from(7u8));
        assert_eq!(to_minor_units(" 42 ", 0).unwrap(), U256::from(42u8));
    }

    #[test]
    fn test_to_minor_units_rounds_half_away_from_zero() {
        assert_eq!(to_minor_units("0.125", 2).unwrap(), U256::from(13u8));
        assert_eq!(to_minor_units("0.124", 2).unwrap(), U256::from(12u8));
        assert_eq!(to_minor_units("0.999", 2).unwrap(), U256::from(100u8));
        assert_eq!(to_minor_units("2.5", 0).unwrap(), U256::from(3u8));
        assert_eq!(to_minor_units("0.004", 2).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_to_minor_units_rejects_bad_input() {
        assert_eq!(to_minor_units("", 18), Err(AmountError::Empty));
        assert_eq!(to_minor_units("-1", 18), Err(AmountError::Negative));
        assert_eq!(to_minor_units("abc", 18), Err(AmountError::NotNumeric));
        assert_eq!(to_minor_units("1.2.3", 18), Err(AmountError::NotNumeric));
        assert_eq!(to_minor_units("1e18", 18), Err(AmountError::NotNumeric));
        assert_eq!(to_minor_units(".", 18), Err(AmountError::NotNumeric));
    }

    #[test]
    fn test_to_minor_units_overflow() {
        // 2^256 is roughly 1.16e77
        let huge = format!("1{}", "0".repeat(60));
        assert_eq!(to_minor_units(&huge, 18), Err(AmountError::Overflow));
        assert!(to_minor_units("1", 77).is_ok());
        assert_eq!(to_minor_units("1", 78), Err(AmountError::Overflow));
    }

    #[test]
    fn test_from_minor_units() {
        assert_eq!(from_minor_units(wei("1500000000000000000"), 18), "1.5");
        assert_eq!(from_minor_units(U256::from(2000u64), 3), "2");
        assert_eq!(from_minor_units(U256::from(5u64), 3), "0.005");
        assert_eq!(from_minor_units(U256::ZERO, 18), "0");
        assert_eq!(from_minor_units(U256::from(123u64), 0), "123");
    }

    #[test]
    fn test_round_trip_within_precision() {
        for (amount, decimals) in [
            ("0.3", 18),
            ("15", 18),
            ("1234.5678", 6),
            ("0.000001", 6),
            ("99999999999", 0),
        ] {
            let scaled = to_minor_units(amount, decimals).unwrap();
            assert_eq!(from_minor_units(scaled, decimals), amount);
        }
    }

    #[test]
    fn test_sum() {
        let amounts = [wei("100000000000000000"), wei("200000000000000000")];
        assert_eq!(sum(&amounts).unwrap(), wei("300000000000000000"));
        assert_eq!(sum(&[]).unwrap(), U256::ZERO);
        assert_eq!(sum(&[U256::MAX, U256::from(1u8)]), Err(AmountError::Overflow));
    }

    #[test]
    fn test_parse_decimal_requires_positive() {
        assert!(parse_decimal("0.01").is_ok());
        assert_eq!(parse_decimal("0"), Err(AmountError::Zero));
        assert_eq!(parse_decimal("0.000"), Err(AmountError::Zero));
        assert_eq!(parse_decimal("-3"), Err(AmountError::Negative));
    }

    #[test]
    fn test_scale_amounts_reports_index() {
        let err = scale_amounts(&["1", "0.001"], 2).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAmount { index: 1, .. }));

        let scaled = scale_amounts(&["10", "5"], 18).unwrap();
        assert_eq!(sum(&scaled).unwrap(), wei("15000000000000000000"));
    }

    #[test]
    fn test_checked_total_names_overflowing_entry() {
        let raw = ["a", "b", "c"];
        let err = checked_total(&[U256::from(1u8), U256::MAX, U256::from(1u8)], &raw).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAmount { index: 1, .. }));
    }
}
