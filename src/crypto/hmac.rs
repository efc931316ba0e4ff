//! HMAC construction (RFC 2104) generic over the underlying hash function
//!
//! `mac = H(opad ++ H(ipad ++ message))` where the pads are the zero-extended
//! key XORed with 0x5c and 0x36. A key longer than the hash's block size is
//! replaced by its digest before padding.

use crate::crypto::HashFunction;
use crate::{Error, Result};
use zeroize::Zeroize;

/// Rekeyable HMAC context.
///
/// The pad buffers are derived eagerly on every key change, so a rekeyed
/// context can never operate on pads from a previous key.
pub struct Hmac<H: HashFunction> {
    hash: H,
    key: Vec<u8>,
    ipad: Vec<u8>,
    opad: Vec<u8>,
}

impl<H: HashFunction> Hmac<H> {
    /// Create an unkeyed context; a key must be set before computing a MAC
    pub fn new(hash: H) -> Self {
        Self {
            hash,
            key: Vec::new(),
            ipad: Vec::new(),
            opad: Vec::new(),
        }
    }

    /// Create a context with a key already set
    pub fn with_key(hash: H, key: &[u8]) -> Self {
        let mut hmac = Self::new(hash);
        hmac.set_key(key);
        hmac
    }

    /// Size in bytes of the produced MAC
    pub fn output_size(&self) -> usize {
        self.hash.output_size()
    }

    /// Size in bytes of the underlying hash block
    pub fn block_size(&self) -> usize {
        self.hash.block_size()
    }

    /// Install a key, hashing it down first if it exceeds the block size.
    ///
    /// Both pad buffers are recomputed here; any state derived from a
    /// previous key is overwritten before this returns.
    pub fn set_key(&mut self, key: &[u8]) {
        let block_size = self.hash.block_size();

        self.key.zeroize();
        self.key = if key.len() > block_size {
            self.hash.digest(key)
        } else {
            key.to_vec()
        };

        self.ipad.zeroize();
        self.opad.zeroize();
        self.ipad = vec![0x36; block_size];
        self.opad = vec![0x5c; block_size];
        for (i, byte) in self.key.iter().enumerate() {
            self.ipad[i] ^= byte;
            self.opad[i] ^= byte;
        }
    }

    /// Compute the MAC of a message with the previously set key
    pub fn mac(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        if self.ipad.is_empty() {
            return Err(Error::invalid_state(
                "HMAC key must be set before computing a MAC",
            ));
        }

        let mut inner = Vec::with_capacity(self.ipad.len() + message.len());
        inner.extend_from_slice(&self.ipad);
        inner.extend_from_slice(message);
        let inner_digest = self.hash.digest(&inner);
        inner.zeroize();

        let mut outer = Vec::with_capacity(self.opad.len() + inner_digest.len());
        outer.extend_from_slice(&self.opad);
        outer.extend_from_slice(&inner_digest);
        let result = self.hash.digest(&outer);
        outer.zeroize();

        Ok(result)
    }

    /// Set the key and compute a MAC in one call
    pub fn mac_with_key(&mut self, message: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        self.set_key(key);
        self.mac(message)
    }
}

impl<H: HashFunction> Drop for Hmac<H> {
    fn drop(&mut self) {
        self.key.zeroize();
        self.ipad.zeroize();
        self.opad.zeroize();
    }
}
