//! Input validation and sanitization
//!
//! Every validator here runs before any network call and reports a
//! `ValidationError` suitable for inline display next to the field.

use alloy_primitives::{Address, B256, U256};
use chrono::{TimeZone, Utc};

use crate::error::ValidationError;
use crate::units::parse_ether;

/// Maximum length of a saved draft name.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum length of free text after sanitization.
pub const MAX_INPUT_LENGTH: usize = 1000;

/// Deposit bounds in wei, with their display form for error messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositLimits {
    pub min: U256,
    pub max: U256,
    pub min_display: String,
    pub max_display: String,
}

impl DepositLimits {
    /// Build limits from ether strings such as `"0.001"` and `"100"`.
    pub fn from_ether(min: &str, max: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            min: parse_ether(min)?,
            max: parse_ether(max)?,
            min_display: min.trim().to_string(),
            max_display: max.trim().to_string(),
        })
    }
}

impl Default for DepositLimits {
    fn default() -> Self {
        // 0.001 ETH .. 100 ETH
        Self {
            min: U256::from(1_000_000_000_000_000u128),
            max: U256::from(100_000_000_000_000_000_000u128),
            min_display: "0.001".to_string(),
            max_display: "100".to_string(),
        }
    }
}

/// Validate a deposit amount and scale it to wei.
pub fn validate_deposit_amount(
    input: &str,
    limits: &DepositLimits,
) -> Result<U256, ValidationError> {
    let wei = parse_ether(input)?;
    if wei.is_zero() {
        return Err(ValidationError::NonPositiveAmount);
    }
    if wei < limits.min {
        return Err(ValidationError::BelowMinimum(limits.min_display.clone()));
    }
    if wei > limits.max {
        return Err(ValidationError::AboveMaximum(limits.max_display.clone()));
    }
    Ok(wei)
}

/// Validate a `0x`-prefixed 20-byte hex address (any letter case).
pub fn validate_address(input: &str) -> Result<Address, ValidationError> {
    let s = input.trim();
    if !is_prefixed_hex(s, 40) {
        return Err(ValidationError::InvalidAddress);
    }
    s.parse::<Address>()
        .map_err(|_| ValidationError::InvalidAddress)
}

/// Validate a `0x`-prefixed 32-byte transaction hash.
pub fn validate_transaction_hash(input: &str) -> Result<B256, ValidationError> {
    let s = input.trim();
    if !is_prefixed_hex(s, 64) {
        return Err(ValidationError::InvalidTransactionHash);
    }
    s.parse::<B256>()
        .map_err(|_| ValidationError::InvalidTransactionHash)
}

/// Sanitize and validate a label.
pub fn validate_name(input: &str) -> Result<String, ValidationError> {
    let sanitized = sanitize_string(input);
    if sanitized.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if sanitized.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong(MAX_NAME_LENGTH));
    }
    Ok(sanitized)
}

/// Validate a Unix timestamp lies between 2020-01-01 and 2100-01-01 UTC.
pub fn validate_time(unix: i64) -> Result<i64, ValidationError> {
    let min = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single();
    let max = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).single();
    match (min, max) {
        (Some(min), Some(max)) if unix >= min.timestamp() && unix <= max.timestamp() => Ok(unix),
        _ => Err(ValidationError::TimeOutOfRange),
    }
}

/// Trim, strip markup-significant characters and cap the length.
pub fn sanitize_string(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '\'' | '"' | '&'))
        .take(MAX_INPUT_LENGTH)
        .collect()
}

fn is_prefixed_hex(s: &str, hex_len: usize) -> bool {
    match s.strip_prefix("0x") {
        Some(rest) => rest.len() == hex_len && rest.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_accepts_one_and_a_half() {
        let wei = validate_deposit_amount("1.5", &DepositLimits::default()).unwrap();
        assert_eq!(wei, U256::from(1_500_000_000_000_000_000u128));
    }

    #[test]
    fn test_deposit_rejections() {
        let limits = DepositLimits::default();
        assert_eq!(
            validate_deposit_amount("0", &limits),
            Err(ValidationError::NonPositiveAmount)
        );
        assert_eq!(
            validate_deposit_amount("-2", &limits),
            Err(ValidationError::NonPositiveAmount)
        );
        assert_eq!(
            validate_deposit_amount("1.0000000000000000001", &limits),
            Err(ValidationError::TooManyDecimals)
        );
        assert_eq!(
            validate_deposit_amount("0.0009", &limits),
            Err(ValidationError::BelowMinimum("0.001".to_string()))
        );
        assert_eq!(
            validate_deposit_amount("100.000000000000000001", &limits),
            Err(ValidationError::AboveMaximum("100".to_string()))
        );
        assert_eq!(
            validate_deposit_amount("ten", &limits),
            Err(ValidationError::InvalidAmount)
        );
    }

    #[test]
    fn test_deposit_bounds_inclusive() {
        let limits = DepositLimits::default();
        assert!(validate_deposit_amount("0.001", &limits).is_ok());
        assert!(validate_deposit_amount("100", &limits).is_ok());
    }

    #[test]
    fn test_limits_from_ether_match_default() {
        assert_eq!(
            DepositLimits::from_ether("0.001", "100").unwrap(),
            DepositLimits::default()
        );
    }

    #[test]
    fn test_address_validation() {
        let lower = "0x1234567890abcdef1234567890abcdef12345678";
        let upper = "0x1234567890ABCDEF1234567890ABCDEF12345678";
        assert_eq!(
            validate_address(lower).unwrap(),
            validate_address(upper).unwrap()
        );
        assert_eq!(
            validate_address("1234567890abcdef1234567890abcdef12345678"),
            Err(ValidationError::InvalidAddress)
        );
        assert_eq!(
            validate_address("0x1234"),
            Err(ValidationError::InvalidAddress)
        );
    }

    #[test]
    fn test_transaction_hash_validation() {
        let hash = format!("0x{}", "ab".repeat(32));
        assert!(validate_transaction_hash(&hash).is_ok());
        assert_eq!(
            validate_transaction_hash("0xzz"),
            Err(ValidationError::InvalidTransactionHash)
        );
    }

    #[test]
    fn test_name_validation() {
        assert_eq!(validate_name("  <b>Rent</b> ").unwrap(), "bRent/b");
        assert_eq!(validate_name("   "), Err(ValidationError::EmptyName));
        assert_eq!(
            validate_name(&"x".repeat(101)),
            Err(ValidationError::NameTooLong(100))
        );
    }

    #[test]
    fn test_time_validation() {
        assert!(validate_time(1_700_000_000).is_ok());
        assert_eq!(validate_time(0), Err(ValidationError::TimeOutOfRange));
        assert_eq!(
            validate_time(5_000_000_000),
            Err(ValidationError::TimeOutOfRange)
        );
    }
}
