//! Utility functions and helpers
//!
//! Endianness conversions, display-order hex handling and human-readable
//! formatting used throughout the mining client.

use crate::{Error, Result};

/// Pack big-endian bytes into u32 words. `bytes.len()` must be a multiple of 4.
pub fn bytes_to_words_be(bytes: &[u8], words: &mut [u32]) {
    debug_assert_eq!(bytes.len(), words.len() * 4);
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}

/// Unpack u32 words into big-endian bytes. `bytes.len()` must be a multiple of 4.
pub fn words_to_bytes_be(words: &[u32], bytes: &mut [u8]) {
    debug_assert_eq!(bytes.len(), words.len() * 4);
    for (word, chunk) in words.iter().zip(bytes.chunks_exact_mut(4)) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
}

/// Pack little-endian bytes into u32 words. `bytes.len()` must be a multiple of 4.
pub fn bytes_to_words_le(bytes: &[u8], words: &mut [u32]) {
    debug_assert_eq!(bytes.len(), words.len() * 4);
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}

/// Unpack u32 words into little-endian bytes. `bytes.len()` must be a multiple of 4.
pub fn words_to_bytes_le(words: &[u32], bytes: &mut [u8]) {
    debug_assert_eq!(bytes.len(), words.len() * 4);
    for (word, chunk) in words.iter().zip(bytes.chunks_exact_mut(4)) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}

/// Validate hex string format
pub fn validate_hex_string(s: &str, expected_len: Option<usize>) -> Result<()> {
    if let Some(len) = expected_len {
        if s.len() != len {
            return Err(Error::header(format!(
                "Expected hex length {}, got {}",
                len,
                s.len()
            )));
        }
    }

    if !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::header("String contains non-hexadecimal characters"));
    }

    Ok(())
}

/// Parse a 32-byte hash given in conventional reversed display order.
///
/// Block explorers print hashes with the byte order reversed relative to the
/// order the bytes occupy in the serialized header. This un-reverses them.
pub fn hash_from_display_hex(hex_str: &str) -> Result<[u8; 32]> {
    validate_hex_string(hex_str, Some(64))?;
    let mut bytes: Vec<u8> =
        hex::decode(hex_str).map_err(|e| Error::header(format!("Invalid hex: {}", e)))?;
    bytes.reverse();
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Format a 32-byte hash in conventional reversed display order.
pub fn hash_to_display_hex(hash: &[u8; 32]) -> String {
    let mut reversed = *hash;
    reversed.reverse();
    hex::encode(reversed)
}

/// Format hash rate as a human-readable string
pub fn format_hash_rate(hashes_per_sec: f64) -> String {
    const UNITS: &[&str] = &["H/s", "KH/s", "MH/s", "GH/s", "TH/s", "PH/s"];
    let mut rate = hashes_per_sec;
    let mut unit_index = 0;

    while rate >= 1000.0 && unit_index < UNITS.len() - 1 {
        rate /= 1000.0;
        unit_index += 1;
    }

    format!("{:.2} {}", rate, UNITS[unit_index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_packing_round_trip() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0xaa, 0xbb, 0xcc, 0xdd];
        let mut words = [0u32; 2];

        bytes_to_words_be(&bytes, &mut words);
        assert_eq!(words, [0x01020304, 0xaabbccdd]);

        let mut out = [0u8; 8];
        words_to_bytes_be(&words, &mut out);
        assert_eq!(out, bytes);

        bytes_to_words_le(&bytes, &mut words);
        assert_eq!(words, [0x04030201, 0xddccbbaa]);

        words_to_bytes_le(&words, &mut out);
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_validate_hex_string() {
        assert!(validate_hex_string("deadbeef", Some(8)).is_ok());
        assert!(validate_hex_string("DEADBEEF", Some(8)).is_ok());
        assert!(validate_hex_string("123456789abcdef0", None).is_ok());

        assert!(validate_hex_string("deadbeef", Some(10)).is_err());
        assert!(validate_hex_string("deadbzzf", None).is_err());
        assert!(validate_hex_string("", Some(1)).is_err());
    }

    #[test]
    fn test_display_hex_round_trip() {
        let display = "000000006a625f06636b8bb6ac7b960a8d03705d1ace08b1a19da3fdcc99ddbd";
        let bytes = hash_from_display_hex(display).unwrap();
        // Wire order is the reverse of display order
        assert_eq!(bytes[0], 0xbd);
        assert_eq!(bytes[31], 0x00);
        assert_eq!(hash_to_display_hex(&bytes), display);
    }

    #[test]
    fn test_display_hex_rejects_bad_input() {
        assert!(hash_from_display_hex("abcd").is_err());
        assert!(hash_from_display_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_format_hash_rate() {
        assert_eq!(format_hash_rate(100.0), "100.00 H/s");
        assert_eq!(format_hash_rate(1500.0), "1.50 KH/s");
        assert_eq!(format_hash_rate(1000000.0), "1.00 MH/s");
        assert_eq!(format_hash_rate(1500000000.0), "1.50 GH/s");
    }
}
