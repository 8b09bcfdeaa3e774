//! Conversion between human decimal amounts and raw token units
//!
//! All scaling is done on the decimal string or in `U256`, never through
//! floating point, so tokens with 18+ decimals convert exactly.

use alloy::primitives::U256;

use crate::error::BridgeError;

/// Split a user-entered decimal into integer and fractional digit strings.
fn split_decimal(amount: &str) -> Result<(&str, &str), BridgeError> {
    let s = amount.trim();
    if s.is_empty() {
        return Err(BridgeError::InvalidAmount("empty amount".to_string()));
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(BridgeError::InvalidAmount(amount.to_string()));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(BridgeError::InvalidAmount(amount.to_string()));
    }

    Ok((int_part, frac_part))
}

/// Returns true if `amount` parses and is strictly greater than zero.
pub fn is_positive(amount: &str) -> bool {
    match split_decimal(amount) {
        Ok((i, f)) => i.bytes().chain(f.bytes()).any(|b| b != b'0'),
        Err(_) => false,
    }
}

/// Scale a decimal amount by 10^decimals and truncate to an integer string.
///
/// `"1.5"` with 6 decimals gives `"1500000"`. Extra fractional digits beyond
/// `decimals` are dropped, never rounded.
pub fn to_raw_amount(amount: &str, decimals: u8) -> Result<String, BridgeError> {
    let (int_part, frac_part) = split_decimal(amount)?;
    let decimals = decimals as usize;

    let mut digits = String::with_capacity(int_part.len() + decimals);
    digits.push_str(int_part);
    if frac_part.len() >= decimals {
        digits.push_str(&frac_part[..decimals]);
    } else {
        digits.push_str(frac_part);
        digits.extend(std::iter::repeat('0').take(decimals - frac_part.len()));
    }

    let trimmed = digits.trim_start_matches('0');
    Ok(if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    })
}

/// Parse a raw integer amount as returned by the aggregator.
pub fn parse_raw(raw: &str) -> Result<U256, BridgeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(BridgeError::InvalidAmount("empty raw amount".to_string()));
    }
    U256::from_str_radix(raw, 10)
        .map_err(|e| BridgeError::InvalidAmount(format!("{}: {}", raw, e)))
}

fn pow10(exp: usize) -> U256 {
    U256::from(10u64).pow(U256::from(exp as u64))
}

/// Render raw units as a decimal string with at most `max_fraction` digits.
///
/// Rounds half-up at the cut and trims trailing zeros, so
/// `("1499999", 6, 2)` gives `"1.5"`.
pub fn from_raw_amount(raw: U256, decimals: u8, max_fraction: u8) -> String {
    let decimals = decimals as usize;
    let keep = (max_fraction as usize).min(decimals);

    let scaled = if decimals > keep {
        let cut = pow10(decimals - keep);
        (raw + cut / U256::from(2u64)) / cut
    } else {
        raw
    };

    let unit = pow10(keep);
    let int_part = scaled / unit;
    let frac_part = scaled % unit;

    if keep == 0 || frac_part.is_zero() {
        return int_part.to_string();
    }

    let frac = format!("{:0>width$}", frac_part.to_string(), width = keep);
    format!("{}.{}", int_part, frac.trim_end_matches('0'))
}

/// Amount corresponding to `percent`% of a raw balance, at full precision.
pub fn percent_of_balance(raw_balance: U256, decimals: u8, percent: u8) -> String {
    let portion = raw_balance * U256::from(percent.min(100) as u64) / U256::from(100u64);
    from_raw_amount(portion, decimals, decimals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_raw_amount_basic() {
        assert_eq!(to_raw_amount("1.5", 6).unwrap(), "1500000");
        assert_eq!(to_raw_amount("100", 6).unwrap(), "100000000");
        assert_eq!(to_raw_amount("0.000001", 6).unwrap(), "1");
        assert_eq!(to_raw_amount(".5", 2).unwrap(), "50");
        assert_eq!(to_raw_amount("7.", 3).unwrap(), "7000");
    }

    #[test]
    fn test_to_raw_amount_truncates_excess_fraction() {
        assert_eq!(to_raw_amount("1.23456789", 6).unwrap(), "1234567");
        assert_eq!(to_raw_amount("0.0000009", 6).unwrap(), "0");
        assert_eq!(to_raw_amount("5.99", 0).unwrap(), "5");
    }

    #[test]
    fn test_to_raw_amount_high_decimals_is_exact() {
        assert_eq!(
            to_raw_amount("123456789.123456789123456789", 18).unwrap(),
            "123456789123456789123456789"
        );
        assert_eq!(
            to_raw_amount("0.1", 18).unwrap(),
            "100000000000000000"
        );
    }

    #[test]
    fn test_to_raw_amount_has_no_grouping_or_leading_zeros() {
        let raw = to_raw_amount("0001000.5", 6).unwrap();
        assert_eq!(raw, "1000500000");
        assert!(raw.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn test_to_raw_amount_rejects_garbage() {
        assert!(to_raw_amount("", 6).is_err());
        assert!(to_raw_amount(".", 6).is_err());
        assert!(to_raw_amount("-1", 6).is_err());
        assert!(to_raw_amount("1,5", 6).is_err());
        assert!(to_raw_amount("abc", 6).is_err());
        assert!(to_raw_amount("1.2.3", 6).is_err());
    }

    #[test]
    fn test_is_positive() {
        assert!(is_positive("1"));
        assert!(is_positive("0.0001"));
        assert!(!is_positive("0"));
        assert!(!is_positive("0.000"));
        assert!(!is_positive(""));
        assert!(!is_positive("-3"));
        assert!(!is_positive("x"));
    }

    #[test]
    fn test_from_raw_amount_rounding() {
        assert_eq!(from_raw_amount(U256::from(1_500_000u64), 6, 6), "1.5");
        assert_eq!(from_raw_amount(U256::from(1_499_999u64), 6, 2), "1.5");
        assert_eq!(from_raw_amount(U256::from(2_000_000u64), 6, 6), "2");
        assert_eq!(from_raw_amount(U256::ZERO, 18, 6), "0");
        // 0.1234565 ETH rounds half-up at six digits
        assert_eq!(
            from_raw_amount(U256::from(123_456_500_000_000_000u64), 18, 6),
            "0.123457"
        );
    }

    #[test]
    fn test_from_raw_amount_zero_decimals() {
        assert_eq!(from_raw_amount(U256::from(42u64), 0, 6), "42");
    }

    #[test]
    fn test_parse_raw() {
        assert_eq!(parse_raw("1000").unwrap(), U256::from(1000u64));
        assert!(parse_raw("0x10").is_err());
        assert!(parse_raw("").is_err());
    }

    #[test]
    fn test_percent_of_balance() {
        let balance = U256::from(2_000_000u64); // 2 USDC
        assert_eq!(percent_of_balance(balance, 6, 25), "0.5");
        assert_eq!(percent_of_balance(balance, 6, 50), "1");
        assert_eq!(percent_of_balance(balance, 6, 100), "2");
        assert_eq!(percent_of_balance(U256::from(3u64), 0, 50), "1");
        assert_eq!(percent_of_balance(U256::ZERO, 18, 75), "0");
    }
}
