//! From-scratch cryptographic primitives
//!
//! The primitive chain the mining pipelines are built on: SHA-256, a generic
//! HMAC construction over any [`HashFunction`], single-iteration PBKDF2 and
//! the memory-hard scrypt KDF. Implemented against RFC 6234, RFC 2104,
//! RFC 8018 and RFC 7914 respectively and pinned by the published test
//! vectors.

pub mod hmac;
pub mod pbkdf2;
pub mod scrypt;
pub mod sha256;

pub use hmac::Hmac;
pub use pbkdf2::Pbkdf2;
pub use scrypt::{Scrypt, ScryptParams};
pub use sha256::{Midstate, Sha256};

/// A block-based hash function usable underneath HMAC and the KDFs.
///
/// SHA-256 is the only implementation shipped here, but HMAC and PBKDF2 are
/// written against this seam so the hash can be substituted.
pub trait HashFunction: Send {
    /// Size in bytes of the internal compression block
    fn block_size(&self) -> usize;

    /// Size in bytes of the produced digest
    fn output_size(&self) -> usize;

    /// Compute the digest of a message. Zero-length messages are valid.
    fn digest(&mut self, message: &[u8]) -> Vec<u8>;
}
