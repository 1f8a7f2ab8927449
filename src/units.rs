//! Exact conversion between ether display units and wei
//!
//! Raw amounts are always `U256`; no floating point is involved.

use alloy_primitives::U256;

use crate::error::ValidationError;

/// Fractional digits of the native currency.
pub const DECIMALS: usize = 18;

/// `10^18`
pub fn wei_per_ether() -> U256 {
    U256::from(10u64).pow(U256::from(DECIMALS))
}

/// Format a wei amount as an ether string.
///
/// Trailing fractional zeros are dropped and a whole amount has no decimal
/// point: `2_500_000_000_000_000_000` becomes `"2.5"`, `10^18` becomes `"1"`.
pub fn format_ether(wei: U256) -> String {
    let unit = wei_per_ether();
    let whole = wei / unit;
    let fraction = wei % unit;

    if fraction.is_zero() {
        return whole.to_string();
    }

    let padded = format!("{:0>width$}", fraction.to_string(), width = DECIMALS);
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}

/// Parse a decimal ether string into wei.
///
/// Accepts `digits`, `digits.digits`, `.digits` and `digits.`. At most 18
/// fractional digits are allowed. The result may be zero; callers decide
/// whether zero is acceptable.
pub fn parse_ether(input: &str) -> Result<U256, ValidationError> {
    let s = input.trim();
    if s.starts_with('-') {
        return Err(ValidationError::NonPositiveAmount);
    }

    let (whole, fraction) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(ValidationError::InvalidAmount);
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ValidationError::InvalidAmount);
    }
    if fraction.len() > DECIMALS {
        return Err(ValidationError::TooManyDecimals);
    }

    let digits = format!("{}{:0<width$}", whole, fraction, width = DECIMALS);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(digits, 10).map_err(|_| ValidationError::InvalidAmount)
}
