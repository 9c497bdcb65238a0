//! Address parsing and transfer input validation

use std::str::FromStr;

use alloy::primitives::Address;

use crate::amount::parse_decimal;
use crate::error::{Error, Result, ValidationError};

/// Parse and validate an EVM address
///
/// Accepts `0x`-prefixed, 40 hex digit addresses. All-lowercase and
/// all-uppercase forms are accepted as is; mixed-case input must carry a
/// valid EIP-55 checksum.
pub fn parse_address(address: &str) -> Result<Address> {
    let trimmed = address.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .ok_or_else(|| Error::InvalidParameter(format!("Address {trimmed} is missing 0x prefix")))?;
    if digits.len() != 40 {
        return Err(Error::InvalidParameter(format!(
            "Address {trimmed} must have 40 hex digits, found {}",
            digits.len()
        )));
    }

    let parsed = Address::from_str(trimmed)
        .map_err(|e| Error::InvalidParameter(format!("Failed to parse address: {e}")))?;

    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper && parsed.to_checksum(None) != trimmed {
        return Err(Error::InvalidParameter(format!(
            "Address {trimmed} has an invalid checksum"
        )));
    }

    Ok(parsed)
}

/// Validate an address format without keeping the parsed value
pub fn is_valid_address(address: &str) -> bool {
    parse_address(address).is_ok()
}

/// Check a batch before anything touches the network.
///
/// Fails with `EmptyInput` when either list is empty, `LengthMismatch`
/// when they differ in length, `InvalidAddress` / `InvalidAmount` with the
/// index of the first offending entry otherwise.
pub fn validate<R, A>(recipients: &[R], amounts: &[A]) -> std::result::Result<(), ValidationError>
where
    R: AsRef<str>,
    A: AsRef<str>,
{
    parse_recipients(recipients, amounts).map(|_| ())
}

/// Same checks as [`validate`], returning the parsed recipient addresses.
pub fn parse_recipients<R, A>(
    recipients: &[R],
    amounts: &[A],
) -> std::result::Result<Vec<Address>, ValidationError>
where
    R: AsRef<str>,
    A: AsRef<str>,
{
    if recipients.is_empty() || amounts.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    if recipients.len() != amounts.len() {
        return Err(ValidationError::LengthMismatch {
            recipients: recipients.len(),
            amounts: amounts.len(),
        });
    }

    let addresses = recipients
        .iter()
        .enumerate()
        .map(|(index, recipient)| {
            parse_address(recipient.as_ref()).map_err(|_| ValidationError::InvalidAddress {
                index,
                address: recipient.as_ref().to_string(),
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (index, amount) in amounts.iter().enumerate() {
        parse_decimal(amount.as_ref()).map_err(|reason| ValidationError::InvalidAmount {
            index,
            amount: amount.as_ref().to_string(),
            reason: reason.to_string(),
        })?;
    }

    Ok(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0x93297d48A40446dc84a388BB94F3A1247CB74870";
    const BOB: &str = "0x50da5C365a08169A9101C1969492540dA937071F";

    #[test]
    fn test_parse_address_checksum() {
        assert!(parse_address(ALICE).is_ok());
        assert!(parse_address(&ALICE.to_lowercase()).is_ok());

        // flip the case of one letter to break the checksum
        let broken = ALICE.replacen('A', "a", 1);
        assert!(parse_address(&broken).is_err());
    }

    #[test]
    fn test_parse_address_format() {
        assert!(parse_address("93297d48a40446dc84a388bb94f3a1247cb74870").is_err());
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("0xzz297d48a40446dc84a388bb94f3a1247cb74870").is_err());
        assert!(!is_valid_address(""));
    }

    #[test]
    fn test_validate_ok() {
        assert_eq!(validate(&[ALICE, BOB], &["10", "5"]), Ok(()));
        let parsed = parse_recipients(&[ALICE, BOB], &["0.1", "0.2"]).unwrap();
        assert_eq!(parsed[0], parse_address(ALICE).unwrap());
        assert_eq!(parsed[1], parse_address(BOB).unwrap());
    }

    #[test]
    fn test_validate_empty() {
        let none: [&str; 0] = [];
        assert_eq!(validate(&none, &["1"]), Err(ValidationError::EmptyInput));
        assert_eq!(validate(&[ALICE], &none), Err(ValidationError::EmptyInput));
    }

    #[test]
    fn test_validate_length_mismatch() {
        assert_eq!(
            validate(&[ALICE, BOB], &["100"]),
            Err(ValidationError::LengthMismatch {
                recipients: 2,
                amounts: 1
            })
        );
    }

    #[test]
    fn test_validate_reports_failing_index() {
        assert_eq!(
            validate(&[ALICE, "0xBBB"], &["1", "2"]),
            Err(ValidationError::InvalidAddress {
                index: 1,
                address: "0xBBB".to_string()
            })
        );
        assert!(matches!(
            validate(&[ALICE, BOB], &["1", "-2"]),
            Err(ValidationError::InvalidAmount { index: 1, .. })
        ));
        assert!(matches!(
            validate(&[ALICE, BOB], &["0", "2"]),
            Err(ValidationError::InvalidAmount { index: 0, .. })
        ));
    }
}
