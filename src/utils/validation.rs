use alloy::primitives::{Address, B256};

use crate::error::EncodingError;

/// 0x 접두사가 있거나 없는 20바이트 hex 주소 파싱.
///
/// 홀수 길이, hex 가 아닌 문자, 40자리가 아닌 길이는
/// 모두 거부.
pub fn parse_address(input: &str) -> Result<Address, EncodingError> {
    let trimmed = input.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex_part.len() % 2 != 0 {
        return Err(EncodingError::InvalidAddress(format!(
            "{} (odd-length hex)",
            input
        )));
    }
    if hex_part.len() != 40 {
        return Err(EncodingError::InvalidAddress(format!(
            "{} (expected 20 bytes, got {})",
            input,
            hex_part.len() / 2
        )));
    }

    let raw = hex::decode(hex_part)
        .map_err(|_| EncodingError::InvalidAddress(format!("{} (not hex)", input)))?;
    Ok(Address::from_slice(&raw))
}

/// 32바이트 워드로 왼쪽 0 패딩한 20바이트 주소 (CCTP mintRecipient 형식)
pub fn address_to_bytes32(address: Address) -> B256 {
    address.into_word()
}

/// 파싱과 패딩을 한 번에
pub fn recipient_to_bytes32(input: &str) -> Result<B256, EncodingError> {
    parse_address(input).map(address_to_bytes32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_is_left_padded() {
        let word = recipient_to_bytes32("0x1111111111111111111111111111111111111111").unwrap();
        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], &[0x11u8; 20]);
    }

    #[test]
    fn test_prefix_is_optional() {
        let with = parse_address("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd").unwrap();
        let without = parse_address("ABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD").unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        // 홀수 길이
        assert!(matches!(
            parse_address("0x123"),
            Err(EncodingError::InvalidAddress(_))
        ));
        // hex 아님
        assert!(matches!(
            parse_address("0xzz11111111111111111111111111111111111111"),
            Err(EncodingError::InvalidAddress(_))
        ));
        // 32바이트 값은 주소가 아님
        assert!(parse_address(&format!("0x{}", "11".repeat(32))).is_err());
        assert!(parse_address("").is_err());
    }
}
