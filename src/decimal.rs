//! Conversion between the external decimal-string form and the exact
//! rational amounts used internally.
//!
//! Amounts cross the crate boundary as arbitrary-precision decimal strings
//! (`"100"`, `"25.5"`). Inside the curve algebra they are `BigRational`s so
//! that interpolation and segment intersections stay exact.

use crate::error::RoutingError;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};

/// Fractional digits emitted before a non-terminating expansion is cut off.
const MAX_SCALE: usize = 24;

/// Parse a decimal string (optionally signed, optionally with a fractional
/// part) into an exact rational.
pub fn parse(input: &str) -> Result<BigRational, RoutingError> {
    let invalid = || RoutingError::InvalidAmount(input.to_string());

    let trimmed = input.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let (int_part, frac_part) = match digits.find('.') {
        Some(dot) => (&digits[..dot], &digits[dot + 1..]),
        None => (digits, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let mut numer: BigInt = if int_part.is_empty() {
        BigInt::zero()
    } else {
        int_part.parse().map_err(|_| invalid())?
    };
    let ten = BigInt::from(10u8);
    let mut denom = BigInt::from(1u8);
    if !frac_part.is_empty() {
        let frac: BigInt = frac_part.parse().map_err(|_| invalid())?;
        for _ in 0..frac_part.len() {
            denom *= &ten;
        }
        numer = numer * &denom + frac;
    }
    if negative {
        numer = -numer;
    }
    Ok(BigRational::new(numer, denom))
}

/// Format a rational as a decimal string.
///
/// Terminating expansions are rendered exactly; anything else is truncated
/// at [`MAX_SCALE`] fractional digits so output stays deterministic.
pub fn format(amount: &BigRational) -> String {
    let negative = amount.is_negative();
    let numer = amount.numer().abs();
    let denom = amount.denom().clone();

    let int_part = &numer / &denom;
    let mut remainder = &numer % &denom;

    let mut out = String::new();
    if negative && !amount.is_zero() {
        out.push('-');
    }
    out.push_str(&int_part.to_string());

    if !remainder.is_zero() {
        out.push('.');
        let ten = BigInt::from(10u8);
        for _ in 0..MAX_SCALE {
            remainder *= &ten;
            let digit = &remainder / &denom;
            remainder %= &denom;
            out.push(
                std::char::from_digit(digit.to_u32().unwrap_or(0), 10)
                    .unwrap_or('0'),
            );
            if remainder.is_zero() {
                break;
            }
        }
        while out.ends_with('0') {
            out.pop();
        }
        if out.ends_with('.') {
            out.pop();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(s: &str) -> String {
        format(&parse(s).unwrap())
    }

    #[test]
    fn parses_integers_and_fractions() {
        assert_eq!(parse("100").unwrap(), BigRational::from(BigInt::from(100)));
        assert_eq!(
            parse("12.5").unwrap(),
            BigRational::new(BigInt::from(25), BigInt::from(2))
        );
        assert_eq!(
            parse(".5").unwrap(),
            BigRational::new(BigInt::from(1), BigInt::from(2))
        );
        assert_eq!(
            parse("-0.25").unwrap(),
            BigRational::new(BigInt::from(-1), BigInt::from(4))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("").is_err());
        assert!(parse(".").is_err());
        assert!(parse("12a").is_err());
        assert!(parse("1.2.3").is_err());
        assert!(parse("1e5").is_err());
    }

    #[test]
    fn formats_exactly() {
        assert_eq!(roundtrip("100"), "100");
        assert_eq!(roundtrip("25.5"), "25.5");
        assert_eq!(roundtrip("0.125"), "0.125");
        assert_eq!(roundtrip("000.500"), "0.5");
    }

    #[test]
    fn truncates_non_terminating_expansions() {
        let third = BigRational::new(BigInt::from(1), BigInt::from(3));
        assert_eq!(format(&third), format!("0.{}", "3".repeat(24)));
    }
}
