//! Utility functions for the bledom-rust-ble crate.

use crate::error::{Error, Result};

/// Format bytes as spaced upper-case hex.
///
/// # Example
///
/// ```
/// use bledom_rust_ble::to_hex;
///
/// assert_eq!(to_hex(&[0x7E, 0x04, 0xEF]), "7E 04 EF");
/// ```
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a user-supplied hex string into bytes.
///
/// Whitespace is ignored anywhere in the input and digits are
/// case-insensitive. Any other separator, a non-hex character, an odd
/// number of nibbles or an empty input fails with
/// [`Error::InvalidEncoding`].
///
/// # Example
///
/// ```
/// use bledom_rust_ble::parse_hex;
///
/// let bytes = parse_hex("7e 04 01 ff").unwrap();
/// assert_eq!(bytes, vec![0x7E, 0x04, 0x01, 0xFF]);
/// assert!(parse_hex("7E,04").is_err());
/// ```
pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let mut nibbles = Vec::with_capacity(input.len());

    for (position, c) in input.chars().enumerate() {
        if c.is_whitespace() {
            continue;
        }
        let value = c.to_digit(16).ok_or_else(|| Error::InvalidEncoding {
            context: format!("non-hex character {:?} at position {}", c, position),
        })?;
        nibbles.push(value as u8);
    }

    if nibbles.is_empty() {
        return Err(Error::InvalidEncoding {
            context: "no hex digits".to_string(),
        });
    }

    if nibbles.len() % 2 != 0 {
        return Err(Error::InvalidEncoding {
            context: format!("odd nibble count ({})", nibbles.len()),
        });
    }

    Ok(nibbles
        .chunks_exact(2)
        .map(|pair| (pair[0] << 4) | pair[1])
        .collect())
}

/// Clamp a signed value into `0..=max` and narrow it to a byte.
#[inline]
pub fn clamp_to_u8(value: i32, max: u8) -> u8 {
    value.clamp(0, max as i32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[]), "");
        assert_eq!(to_hex(&[0x00, 0xAB, 0x0F]), "00 AB 0F");
    }

    #[test]
    fn test_parse_canonical_packet() {
        let bytes = parse_hex("7E 04 01 FF 00 00 00 00 EF").unwrap();
        assert_eq!(
            bytes,
            vec![0x7E, 0x04, 0x01, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xEF]
        );
    }

    #[test]
    fn test_parse_ignores_whitespace_and_case() {
        let a = parse_hex("7e04\t01ff\n00").unwrap();
        let b = parse_hex("7E 04 01 FF 00").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_rejects_separators() {
        assert!(matches!(
            parse_hex("7E,04"),
            Err(Error::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_odd_nibbles() {
        assert!(matches!(
            parse_hex("7E0"),
            Err(Error::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(parse_hex("   ").is_err());
        assert!(parse_hex("").is_err());
    }

    #[test]
    fn test_clamp_to_u8() {
        assert_eq!(clamp_to_u8(-5, 255), 0);
        assert_eq!(clamp_to_u8(500, 255), 255);
        assert_eq!(clamp_to_u8(150, 100), 100);
        assert_eq!(clamp_to_u8(42, 100), 42);
    }
}
