//! Single-iteration PBKDF2 (RFC 8018)
//!
//! With an iteration count of one, each output block collapses to
//! `HMAC(password, salt ++ be32(block_index))` with block indices starting at
//! one. The final block is truncated when the requested length is not a
//! multiple of the MAC size. The HMAC context is keyed once per derivation and
//! reused across every block.

use crate::crypto::{HashFunction, Hmac};
use crate::{Error, Result};
use zeroize::Zeroize;

/// PBKDF2 key-derivation context over any [`HashFunction`]
pub struct Pbkdf2<H: HashFunction> {
    hmac: Hmac<H>,
}

impl<H: HashFunction> Pbkdf2<H> {
    pub fn new(hash: H) -> Self {
        Self {
            hmac: Hmac::new(hash),
        }
    }

    /// Derive `dk_len` bytes of key material from a password and salt
    pub fn derive(&mut self, password: &[u8], salt: &[u8], dk_len: usize) -> Result<Vec<u8>> {
        self.hmac.set_key(password);
        self.derive_with_current_key(salt, dk_len)
    }

    /// Derive using the key already installed in the HMAC context.
    ///
    /// Lets a caller that has precomputed the password key skip the rekey;
    /// scrypt's second extraction pass uses this.
    pub fn derive_with_current_key(&mut self, salt: &[u8], dk_len: usize) -> Result<Vec<u8>> {
        if dk_len == 0 {
            return Err(Error::crypto("Derived key length must be non-zero"));
        }

        let mac_len = self.hmac.output_size();
        let block_count = dk_len.div_ceil(mac_len);

        let mut derived = Vec::with_capacity(block_count * mac_len);
        let mut block_input = Vec::with_capacity(salt.len() + 4);
        for index in 1..=block_count as u32 {
            block_input.clear();
            block_input.extend_from_slice(salt);
            block_input.extend_from_slice(&index.to_be_bytes());
            let mut block = self.hmac.mac(&block_input)?;
            derived.extend_from_slice(&block);
            block.zeroize();
        }

        derived.truncate(dk_len);
        Ok(derived)
    }

    /// Access the underlying HMAC context for key precomputation
    pub fn hmac_mut(&mut self) -> &mut Hmac<H> {
        &mut self.hmac
    }
}
