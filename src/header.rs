//! Block header encoding
//!
//! The 80-byte serialized header that is hashed during the search:
//! version(4) ‖ previous-hash(32) ‖ merkle-root(32) ‖ time(4) ‖ bits(4) ‖
//! nonce(4). Integer fields are little-endian on the wire; hash-valued fields
//! are stored in wire order but conventionally displayed with the byte order
//! reversed, so parsing accepts the display form and un-reverses it.

use crate::{utils, BlockTime, CompactBits, Error, Nonce, Result};
use std::fmt;

/// An 80-byte proof-of-work block header.
///
/// Only the nonce and, secondarily, the time field change during a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block format version
    pub version: u32,
    /// Hash of the previous block, wire order
    pub prev_hash: [u8; 32],
    /// Merkle root of the block's transactions, wire order
    pub merkle_root: [u8; 32],
    /// Block timestamp
    pub time: BlockTime,
    /// Compact difficulty encoding
    pub bits: CompactBits,
    /// Searched-over nonce
    pub nonce: Nonce,
}

impl BlockHeader {
    /// Serialized size in bytes
    pub const SIZE: usize = 80;

    /// Create a header from wire-order fields
    pub fn new(
        version: u32,
        prev_hash: [u8; 32],
        merkle_root: [u8; 32],
        time: BlockTime,
        bits: CompactBits,
        nonce: Nonce,
    ) -> Self {
        Self {
            version,
            prev_hash,
            merkle_root,
            time,
            bits,
            nonce,
        }
    }

    /// Create a header taking the hash-valued fields in reversed display form
    pub fn from_display_hex(
        version: u32,
        prev_hash_hex: &str,
        merkle_root_hex: &str,
        time: BlockTime,
        bits: CompactBits,
        nonce: Nonce,
    ) -> Result<Self> {
        let prev_hash = utils::hash_from_display_hex(prev_hash_hex)?;
        let merkle_root = utils::hash_from_display_hex(merkle_root_hex)?;
        Ok(Self::new(version, prev_hash, merkle_root, time, bits, nonce))
    }

    /// Serialize to the 80-byte wire format
    pub fn serialize(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.version.to_le_bytes());
        bytes[4..36].copy_from_slice(&self.prev_hash);
        bytes[36..68].copy_from_slice(&self.merkle_root);
        bytes[68..72].copy_from_slice(&self.time.value().to_le_bytes());
        bytes[72..76].copy_from_slice(&self.bits.value().to_le_bytes());
        bytes[76..80].copy_from_slice(&self.nonce.value().to_le_bytes());
        bytes
    }

    /// Parse from the 80-byte wire format
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(Error::header(format!(
                "Invalid header size: expected {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }

        let mut prev_hash = [0u8; 32];
        prev_hash.copy_from_slice(&bytes[4..36]);
        let mut merkle_root = [0u8; 32];
        merkle_root.copy_from_slice(&bytes[36..68]);

        Ok(Self {
            version: u32::from_le_bytes(bytes[0..4].try_into().expect("4-byte slice")),
            prev_hash,
            merkle_root,
            time: BlockTime::new(u32::from_le_bytes(
                bytes[68..72].try_into().expect("4-byte slice"),
            )),
            bits: CompactBits::new(u32::from_le_bytes(
                bytes[72..76].try_into().expect("4-byte slice"),
            )),
            nonce: Nonce::new(u32::from_le_bytes(
                bytes[76..80].try_into().expect("4-byte slice"),
            )),
        })
    }

    /// Replace the nonce
    pub fn set_nonce(&mut self, nonce: Nonce) {
        self.nonce = nonce;
    }

    /// Replace the time
    pub fn set_time(&mut self, time: BlockTime) {
        self.time = time;
    }

    /// Previous-block hash in reversed display order
    pub fn prev_hash_display(&self) -> String {
        utils::hash_to_display_hex(&self.prev_hash)
    }

    /// Merkle root in reversed display order
    pub fn merkle_root_display(&self) -> String {
        utils::hash_to_display_hex(&self.merkle_root)
    }
}

impl fmt::Display for BlockHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version={} prev={} merkle={} time={} bits={} nonce={}",
            self.version,
            self.prev_hash_display(),
            self.merkle_root_display(),
            self.time,
            self.bits,
            self.nonce
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> BlockHeader {
        BlockHeader::from_display_hex(
            1,
            "000000006a625f06636b8bb6ac7b960a8d03705d1ace08b1a19da3fdcc99ddbd",
            "999e1c837c76a1b7fbb7e57baf87b309960f5ffefbf2a9b95dd890602272f644",
            BlockTime::new(0x4966_5dbe),
            CompactBits::new(0x1d00_ffff),
            Nonce::new(0x6ded_e005),
        )
        .unwrap()
    }

    #[test]
    fn test_serialize_layout() {
        let header = sample_header();
        let bytes = header.serialize();

        assert_eq!(bytes.len(), BlockHeader::SIZE);
        assert_eq!(&bytes[0..4], &[1, 0, 0, 0]);
        // Display order reverses the wire order, so the display string's last
        // byte appears first on the wire.
        assert_eq!(bytes[4], 0xbd);
        assert_eq!(bytes[35], 0x00);
        assert_eq!(&bytes[68..72], &0x4966_5dbeu32.to_le_bytes());
        assert_eq!(&bytes[72..76], &[0xff, 0xff, 0x00, 0x1d]);
        assert_eq!(&bytes[76..80], &[0x05, 0xe0, 0xed, 0x6d]);
    }

    #[test]
    fn test_genesis_wire_bytes() {
        let header = BlockHeader::from_display_hex(
            1,
            "0000000000000000000000000000000000000000000000000000000000000000",
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b",
            BlockTime::new(1_231_006_505),
            CompactBits::new(0x1d00_ffff),
            Nonce::new(2_083_236_893),
        )
        .unwrap();
        let bytes = header.serialize();

        assert_eq!(&bytes[36..40], &[0x3b, 0xa3, 0xed, 0xfd]);
        assert_eq!(&bytes[68..72], &[0x29, 0xab, 0x5f, 0x49]);
        assert_eq!(&bytes[76..80], &[0x1d, 0xac, 0x2b, 0x7c]);
    }

    #[test]
    fn test_round_trip() {
        let header = sample_header();
        let parsed = BlockHeader::deserialize(&header.serialize()).unwrap();
        assert_eq!(header, parsed);
    }

    #[test]
    fn test_deserialize_rejects_wrong_size() {
        assert!(BlockHeader::deserialize(&[0u8; 79]).is_err());
        assert!(BlockHeader::deserialize(&[0u8; 81]).is_err());
    }

    #[test]
    fn test_only_cursor_fields_change() {
        let mut header = sample_header();
        let before = header.serialize();

        header.set_nonce(Nonce::new(0xdeadbeef));
        header.set_time(BlockTime::new(0x5dbe664a));
        let after = header.serialize();

        assert_eq!(&before[..68], &after[..68]);
        assert_ne!(&before[68..72], &after[68..72]);
        assert_ne!(&before[76..80], &after[76..80]);
    }

    #[test]
    fn test_display_hex_round_trip() {
        let header = sample_header();
        assert_eq!(
            header.prev_hash_display(),
            "000000006a625f06636b8bb6ac7b960a8d03705d1ace08b1a19da3fdcc99ddbd"
        );
    }
}
