//! Core types for proof-of-work mining
//!
//! Fundamental types used throughout the mining client: the searched-over
//! nonce and time fields, the compact difficulty encoding and the expanded
//! 256-bit target it denotes.

use crate::{utils, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Proof-of-work nonce (4 bytes)
///
/// The nonce occupies the last 4 bytes of the serialized header and is the
/// primary variable incremented between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Nonce(pub u32);

impl Nonce {
    /// Create a new nonce
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the nonce value
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Increment, reporting wraparound so the caller can roll the time field
    #[must_use = "wraparound signals nonce space exhaustion"]
    pub fn increment(&mut self) -> bool {
        let (next, wrapped) = self.0.overflowing_add(1);
        self.0 = next;
        wrapped
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Block timestamp (4 bytes, seconds since Unix epoch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockTime(pub u32);

impl BlockTime {
    /// Create a new block time
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the time value
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Advance by one second, used when the nonce space for this time value
    /// is exhausted
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

impl fmt::Display for BlockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compact difficulty encoding ("bits")
///
/// A floating-point-like encoding: the high byte is a base-256 exponent, the
/// low three bytes are the mantissa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompactBits(pub u32);

impl CompactBits {
    /// Create a new compact difficulty value
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the raw value
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Base-256 exponent (high byte)
    pub fn exponent(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// 24-bit mantissa (low three bytes)
    pub fn mantissa(&self) -> u32 {
        self.0 & 0x00ff_ffff
    }
}

impl fmt::Display for CompactBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl FromStr for CompactBits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim_start_matches("0x");
        let value = u32::from_str_radix(s, 16)
            .map_err(|e| Error::target(format!("Invalid compact bits: {}", e)))?;
        Ok(Self(value))
    }
}

/// Mining target representing the difficulty threshold
///
/// 256-bit value stored as 8 u32 words with word 0 least significant. A
/// digest satisfies the target when, read as a big-endian 256-bit integer, it
/// is numerically less than or equal to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    words: [u32; 8],
}

impl Target {
    /// Create a target from words, word 0 least significant
    pub fn new(words: [u32; 8]) -> Self {
        Self { words }
    }

    /// Expand a compact difficulty encoding into a full target.
    ///
    /// `target = mantissa << 8*(exponent-3)`; for exponents below 3 the
    /// mantissa is shifted right instead. Fails if the shifted mantissa does
    /// not fit in 256 bits.
    pub fn from_compact(bits: CompactBits) -> Result<Self> {
        let exponent = bits.exponent() as i32;
        let mut mantissa = bits.mantissa();

        let shift_bits = 8 * (exponent - 3);
        if shift_bits < 0 {
            mantissa >>= (-shift_bits).min(31);
            return Ok(Self::from_low_word(mantissa));
        }

        let word_index = (shift_bits / 32) as usize;
        let bit_offset = (shift_bits % 32) as u32;
        let spread = (mantissa as u64) << bit_offset;

        let low = spread as u32;
        let high = (spread >> 32) as u32;
        if word_index >= 8 || (high != 0 && word_index + 1 >= 8) {
            return Err(Error::target(format!(
                "Compact bits {} overflow 256 bits",
                bits
            )));
        }

        let mut words = [0u32; 8];
        words[word_index] = low;
        if high != 0 {
            words[word_index + 1] = high;
        }
        Ok(Self { words })
    }

    fn from_low_word(value: u32) -> Self {
        let mut words = [0u32; 8];
        words[0] = value;
        Self { words }
    }

    /// Maximum possible target (easiest difficulty)
    pub fn max() -> Self {
        Self::new([u32::MAX; 8])
    }

    /// Minimum possible target (hardest difficulty)
    pub fn min() -> Self {
        Self::new([0; 8])
    }

    /// Check a digest given as hash-state words (word 0 most significant).
    ///
    /// Scans from the most significant word down with early exit on the first
    /// differing word; every zero word in the target forces the corresponding
    /// digest word to be zero.
    pub fn is_met_words(&self, state: &[u32; 8]) -> bool {
        for i in 0..8 {
            let digest_word = state[i];
            let target_word = self.words[7 - i];
            if digest_word < target_word {
                return true;
            } else if digest_word > target_word {
                return false;
            }
        }
        true
    }

    /// Check a digest given as 32 big-endian bytes
    pub fn is_met(&self, digest: &[u8; 32]) -> bool {
        let mut state = [0u32; 8];
        utils::bytes_to_words_be(digest, &mut state);
        self.is_met_words(&state)
    }

    /// Check a wire-order digest interpreted as a little-endian 256-bit
    /// integer, the proof-of-work convention. Byte 31 of the digest is the
    /// most significant, so a conforming digest ends in zero bytes.
    pub fn is_met_hash_le(&self, digest: &[u8; 32]) -> bool {
        for i in (0..8).rev() {
            let digest_word =
                u32::from_le_bytes(digest[i * 4..(i + 1) * 4].try_into().expect("4-byte slice"));
            if digest_word < self.words[i] {
                return true;
            } else if digest_word > self.words[i] {
                return false;
            }
        }
        true
    }

    /// Little-endian check directly on hash-state words, skipping digest
    /// serialization. State word `k` covers wire bytes `4k..4k+4` big-endian,
    /// so each word is byte-swapped to recover the little-endian integer word.
    pub fn is_met_state_le(&self, state: &[u32; 8]) -> bool {
        for i in (0..8).rev() {
            let digest_word = state[i].swap_bytes();
            if digest_word < self.words[i] {
                return true;
            } else if digest_word > self.words[i] {
                return false;
            }
        }
        true
    }

    /// Target as 32 big-endian bytes, most significant first
    pub fn to_bytes_be(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for i in 0..8 {
            bytes[i * 4..(i + 1) * 4].copy_from_slice(&self.words[7 - i].to_be_bytes());
        }
        bytes
    }

    /// Hexadecimal representation, most significant byte first
    pub fn to_hex_be(&self) -> String {
        hex::encode(self.to_bytes_be())
    }

    /// Number of leading zero bits required by this target
    pub fn difficulty_level(&self) -> u32 {
        for i in (0..8).rev() {
            if self.words[i] != 0 {
                let significant = i as u32 * 32 + (32 - self.words[i].leading_zeros());
                return 256 - significant;
            }
        }
        256
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_be())
    }
}

/// Hash rate in hashes per second
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct HashRate(pub f64);

impl HashRate {
    /// Create a new hash rate
    pub fn new(rate: f64) -> Self {
        Self(rate)
    }

    /// Get the rate value
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for HashRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", utils::format_hash_rate(self.0))
    }
}
