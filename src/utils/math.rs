use alloy::primitives::U256;
use rust_decimal::Decimal;

use crate::error::EncodingError;

/// 사람이 읽는 소수 수량을 정수 base unit 으로 변환.
///
/// 정확한 십진 연산 사용: 자산이 지원하는 것보다 소수 자릿수가 많으면
/// 반올림하지 않고 거부한다.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<U256, EncodingError> {
    if amount.is_zero() {
        return Err(EncodingError::ZeroAmount);
    }
    if amount.is_sign_negative() {
        return Err(EncodingError::InvalidAmount {
            amount: amount.to_string(),
            reason: "amount must be positive".to_string(),
        });
    }

    let normalized = amount.normalize();
    let scale = normalized.scale();
    if scale > decimals {
        return Err(EncodingError::InvalidAmount {
            amount: amount.to_string(),
            reason: format!("more than {} decimal places", decimals),
        });
    }

    // 여기서 mantissa 는 양수
    let mantissa = U256::from(normalized.mantissa().unsigned_abs());
    let factor = U256::from(10u64).pow(U256::from(decimals - scale));
    Ok(mantissa * factor)
}

/// 정수 base unit 을 소수 문자열로 ("1.5", "0.000001", "3")
pub fn format_units(value: U256, decimals: u32) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac)
    }
}

/// wei -> ether 소수 문자열. 관리형 지갑 API 의 `amount` 형식
pub fn wei_to_ether_string(wei: U256) -> String {
    format_units(wei, 18)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_usdc_amount_to_base_units() {
        let amount = Decimal::from_str("1.5").unwrap();
        assert_eq!(to_base_units(amount, 6).unwrap(), U256::from(1_500_000u64));

        let smallest = Decimal::from_str("0.000001").unwrap();
        assert_eq!(to_base_units(smallest, 6).unwrap(), U256::from(1u64));
    }

    #[test]
    fn test_eth_amount_does_not_overflow() {
        let amount = Decimal::from_str("1000000000").unwrap();
        let expected = U256::from(10u64).pow(U256::from(27u64));
        assert_eq!(to_base_units(amount, 18).unwrap(), expected);
    }

    #[test]
    fn test_trailing_zeros_do_not_count_as_precision() {
        let amount = Decimal::from_str("2.5000000").unwrap();
        assert_eq!(to_base_units(amount, 6).unwrap(), U256::from(2_500_000u64));
    }

    #[test]
    fn test_rejects_zero_negative_and_excess_precision() {
        assert_eq!(to_base_units(Decimal::ZERO, 6), Err(EncodingError::ZeroAmount));
        assert!(matches!(
            to_base_units(Decimal::from_str("-1").unwrap(), 6),
            Err(EncodingError::InvalidAmount { .. })
        ));
        assert!(matches!(
            to_base_units(Decimal::from_str("0.0000001").unwrap(), 6),
            Err(EncodingError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(1u64), 6), "0.000001");
        assert_eq!(format_units(U256::from(3_000_000u64), 6), "3");
        assert_eq!(format_units(U256::ZERO, 6), "0");
        assert_eq!(
            wei_to_ether_string(U256::from(10_000_000_000_000_000u64)),
            "0.01"
        );
    }
}
