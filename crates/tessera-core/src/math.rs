//! Fixed-point helpers
//!
//! All amounts are unsigned integers in the smallest unit. Products are taken
//! in 256 bits so `a * b` never overflows before the division.

use primitive_types::U256;

fn to_u128(value: U256) -> Option<u128> {
    if value > U256::from(u128::MAX) {
        None
    } else {
        Some(value.as_u128())
    }
}

/// `floor(a * b / c)`, or `None` on a zero divisor or a quotient above u128
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    let product = U256::from(a).checked_mul(U256::from(b))?;
    to_u128(product / U256::from(c))
}

/// `ceil(a * b / c)`, or `None` on a zero divisor or a quotient above u128
pub fn mul_div_ceil(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    let product = U256::from(a).checked_mul(U256::from(b))?;
    let divisor = U256::from(c);
    let (quotient, remainder) = product.div_mod(divisor);
    let quotient = if remainder.is_zero() {
        quotient
    } else {
        quotient.checked_add(U256::one())?
    };
    to_u128(quotient)
}

/// `floor(a * b * c / d)` with a single 256-bit intermediate
pub fn mul3_div_floor(a: u128, b: u128, c: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))?
        .checked_mul(U256::from(c))?;
    to_u128(product / U256::from(d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_floor_and_ceil() {
        assert_eq!(mul_div_floor(10, 3, 4), Some(7));
        assert_eq!(mul_div_ceil(10, 3, 4), Some(8));
        assert_eq!(mul_div_ceil(10, 4, 4), Some(10));
    }

    #[test]
    fn test_zero_divisor() {
        assert_eq!(mul_div_floor(1, 1, 0), None);
        assert_eq!(mul_div_ceil(1, 1, 0), None);
        assert_eq!(mul3_div_floor(1, 1, 1, 0), None);
    }

    #[test]
    fn test_no_intermediate_overflow() {
        // u128::MAX * 10_000 overflows u128 but the quotient fits
        assert_eq!(mul_div_floor(u128::MAX, 10_000, 10_000), Some(u128::MAX));
    }

    #[test]
    fn test_quotient_overflow() {
        assert_eq!(mul_div_floor(u128::MAX, 2, 1), None);
    }

    proptest! {
        #[test]
        fn floor_matches_native_when_small(a in 0u64..u64::MAX, b in 0u64..u64::MAX, c in 1u64..u64::MAX) {
            let expected = (a as u128) * (b as u128) / (c as u128);
            prop_assert_eq!(mul_div_floor(a as u128, b as u128, c as u128), Some(expected));
        }

        #[test]
        fn ceil_is_floor_or_one_more(a in 0u64..u64::MAX, b in 0u64..u64::MAX, c in 1u64..u64::MAX) {
            let floor = mul_div_floor(a as u128, b as u128, c as u128).unwrap();
            let ceil = mul_div_ceil(a as u128, b as u128, c as u128).unwrap();
            prop_assert!(ceil == floor || ceil == floor + 1);
        }
    }
}
