//! SHA-256 hash engine (RFC 6234 / FIPS 180-4)
//!
//! Implemented from first principles: 16-word blocks, 64-word message
//! schedule, 64 compression rounds over an 8-word state. The engine exposes a
//! [`Midstate`] API so the mining loops can compress an invariant prefix once
//! and resume from its state on every attempt, and an optional double-hash
//! mode computing `SHA256(SHA256(x))`.

use crate::crypto::HashFunction;
use crate::{utils, Error, Result};
use zeroize::Zeroize;

/// Size of a compression block in bytes
pub const BLOCK_SIZE: usize = 64;

/// Size of the digest in bytes
pub const OUTPUT_SIZE: usize = 32;

/// Initial hash state (FIPS 180-4 §5.3.3)
pub(crate) const H0: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// Round constants (FIPS 180-4 §4.2.2)
pub(crate) static K: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

#[inline(always)]
fn ch(x: u32, y: u32, z: u32) -> u32 {
    z ^ (x & (y ^ z))
}

#[inline(always)]
fn maj(x: u32, y: u32, z: u32) -> u32 {
    (x & y) | (z & (x | y))
}

#[inline(always)]
fn bsig0(x: u32) -> u32 {
    x.rotate_right(2) ^ x.rotate_right(13) ^ x.rotate_right(22)
}

#[inline(always)]
fn bsig1(x: u32) -> u32 {
    x.rotate_right(6) ^ x.rotate_right(11) ^ x.rotate_right(25)
}

#[inline(always)]
fn ssig0(x: u32) -> u32 {
    x.rotate_right(7) ^ x.rotate_right(18) ^ (x >> 3)
}

#[inline(always)]
fn ssig1(x: u32) -> u32 {
    x.rotate_right(17) ^ x.rotate_right(19) ^ (x >> 10)
}

/// Compress one 16-word block into the running state.
///
/// `w` is caller-provided scratch for the 64-word message schedule so tight
/// loops can reuse it across calls.
pub(crate) fn compress_block(state: &mut [u32; 8], block: &[u32; 16], w: &mut [u32; 64]) {
    w[..16].copy_from_slice(block);
    for i in 16..64 {
        w[i] = ssig1(w[i - 2])
            .wrapping_add(w[i - 7])
            .wrapping_add(ssig0(w[i - 15]))
            .wrapping_add(w[i - 16]);
    }

    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;

    for i in 0..64 {
        let t1 = h
            .wrapping_add(bsig1(e))
            .wrapping_add(ch(e, f, g))
            .wrapping_add(K[i])
            .wrapping_add(w[i]);
        let t2 = bsig0(a).wrapping_add(maj(a, b, c));
        h = g;
        g = f;
        f = e;
        e = d.wrapping_add(t1);
        d = c;
        c = b;
        b = a;
        a = t1.wrapping_add(t2);
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
    state[4] = state[4].wrapping_add(e);
    state[5] = state[5].wrapping_add(f);
    state[6] = state[6].wrapping_add(g);
    state[7] = state[7].wrapping_add(h);
}

/// Consume the final (partial) block: append the 0x80 marker, zero padding
/// and the 64-bit big-endian bit length, spilling into a second block when
/// fewer than 9 bytes remain.
fn finalize(state: &mut [u32; 8], tail: &[u8], total_len: usize, w: &mut [u32; 64]) {
    debug_assert!(tail.len() < BLOCK_SIZE);

    let bit_len = (total_len as u64) << 3;
    let mut buf = [0u8; BLOCK_SIZE];
    buf[..tail.len()].copy_from_slice(tail);
    buf[tail.len()] = 0x80;

    let mut block = [0u32; 16];
    if tail.len() < 56 {
        buf[56..64].copy_from_slice(&bit_len.to_be_bytes());
        utils::bytes_to_words_be(&buf, &mut block);
        compress_block(state, &block, w);
    } else {
        utils::bytes_to_words_be(&buf, &mut block);
        compress_block(state, &block, w);

        let mut last = [0u8; BLOCK_SIZE];
        last[56..64].copy_from_slice(&bit_len.to_be_bytes());
        utils::bytes_to_words_be(&last, &mut block);
        compress_block(state, &block, w);
    }
    buf.zeroize();
    block.zeroize();
}

/// Chain the 32-byte state of a completed digest through a second digest
/// pass, all in word form. The second message is exactly one padded block.
pub(crate) fn second_pass(state: &mut [u32; 8], w: &mut [u32; 64]) {
    let mut block = [0u32; 16];
    block[..8].copy_from_slice(state);
    block[8] = 0x8000_0000;
    // words 9..14 stay zero; 32-byte message means a 256-bit length field
    block[15] = 256;

    *state = H0;
    compress_block(state, &block, w);
    block.zeroize();
}

/// Running hash state captured after some whole number of 64-byte blocks.
///
/// Lets callers compress an invariant message prefix once and finish many
/// different tails against it without redoing the prefix work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Midstate {
    state: [u32; 8],
    blocks: u64,
}

impl Midstate {
    /// Compress a prefix that is a whole number of 64-byte blocks.
    pub fn compute(prefix: &[u8]) -> Result<Self> {
        if prefix.len() % BLOCK_SIZE != 0 {
            return Err(Error::crypto(format!(
                "Midstate prefix must be a multiple of {} bytes, got {}",
                BLOCK_SIZE,
                prefix.len()
            )));
        }

        let mut state = H0;
        let mut block = [0u32; 16];
        let mut w = [0u32; 64];
        for chunk in prefix.chunks_exact(BLOCK_SIZE) {
            utils::bytes_to_words_be(chunk, &mut block);
            compress_block(&mut state, &block, &mut w);
        }
        w.zeroize();
        Ok(Self {
            state,
            blocks: (prefix.len() / BLOCK_SIZE) as u64,
        })
    }

    /// The captured 8-word state
    pub fn state(&self) -> &[u32; 8] {
        &self.state
    }

    /// Finish a digest whose message is the captured prefix followed by
    /// `tail` (fewer than 64 bytes).
    pub fn finish(&self, tail: &[u8]) -> Result<[u8; 32]> {
        if tail.len() >= BLOCK_SIZE {
            return Err(Error::crypto(format!(
                "Midstate tail must be shorter than {} bytes, got {}",
                BLOCK_SIZE,
                tail.len()
            )));
        }

        let mut state = self.state;
        let mut w = [0u32; 64];
        let total_len = self.blocks as usize * BLOCK_SIZE + tail.len();
        finalize(&mut state, tail, total_len, &mut w);

        let mut digest = [0u8; 32];
        utils::words_to_bytes_be(&state, &mut digest);
        state.zeroize();
        w.zeroize();
        Ok(digest)
    }
}

/// SHA-256 hash engine, optionally applied twice (`SHA256(SHA256(x))`).
///
/// The engine owns its block and schedule scratch so repeated digests do not
/// allocate; all of it is scrubbed on drop since the engine sits underneath
/// HMAC and may have absorbed key material.
#[derive(Clone)]
pub struct Sha256 {
    state: [u32; 8],
    block: [u32; 16],
    w: [u32; 64],
    double: bool,
}

impl Sha256 {
    /// Create a single-pass engine
    pub fn new() -> Self {
        Self {
            state: H0,
            block: [0; 16],
            w: [0; 64],
            double: false,
        }
    }

    /// Create a double-hash engine (`SHA256(SHA256(x))`)
    pub fn new_double() -> Self {
        Self {
            double: true,
            ..Self::new()
        }
    }

    /// Whether this engine hashes twice
    pub fn is_double(&self) -> bool {
        self.double
    }

    /// Compute the digest of a message
    pub fn digest32(&mut self, message: &[u8]) -> [u8; 32] {
        self.state = H0;

        let full_blocks = message.len() / BLOCK_SIZE * BLOCK_SIZE;
        for chunk in message[..full_blocks].chunks_exact(BLOCK_SIZE) {
            utils::bytes_to_words_be(chunk, &mut self.block);
            compress_block(&mut self.state, &self.block, &mut self.w);
        }
        finalize(
            &mut self.state,
            &message[full_blocks..],
            message.len(),
            &mut self.w,
        );

        if self.double {
            second_pass(&mut self.state, &mut self.w);
        }

        let mut digest = [0u8; 32];
        utils::words_to_bytes_be(&self.state, &mut digest);
        digest
    }

    /// One-shot single-pass digest
    pub fn hash(message: &[u8]) -> [u8; 32] {
        Sha256::new().digest32(message)
    }

    /// One-shot double digest
    pub fn hash_double(message: &[u8]) -> [u8; 32] {
        Sha256::new_double().digest32(message)
    }
}

impl Default for Sha256 {
    fn default() -> Self {
        Self::new()
    }
}

impl HashFunction for Sha256 {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn output_size(&self) -> usize {
        OUTPUT_SIZE
    }

    fn digest(&mut self, message: &[u8]) -> Vec<u8> {
        self.digest32(message).to_vec()
    }
}

impl Drop for Sha256 {
    fn drop(&mut self) {
        self.state.zeroize();
        self.block.zeroize();
        self.w.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_hex(message: &[u8]) -> String {
        hex::encode(Sha256::hash(message))
    }

    #[test]
    fn test_empty_message() {
        assert_eq!(
            digest_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_abc() {
        assert_eq!(
            digest_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_two_block_message() {
        // 56 bytes: data plus the 0x80 marker no longer leave room for the
        // length field, forcing the padding to spill into a second block.
        assert_eq!(
            digest_hex(b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq"),
            "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1"
        );
    }

    #[test]
    fn test_multi_block_message() {
        // RFC 6234 test 2 repeated to cross the one-block boundary
        let message = vec![b'a'; 1_000_000];
        assert_eq!(
            hex::encode(Sha256::hash(&message)),
            "cdc76e5c9914fb9281a1c7e284d73e67f1809a48a497200e046d39ccc7112cd0"
        );
    }

    #[test]
    fn test_double_hash_mode() {
        // Double mode must equal two explicit passes
        let message = b"hello world";
        let once = Sha256::hash(message);
        let twice = Sha256::hash(&once);
        assert_eq!(Sha256::hash_double(message), twice);

        // Known double-SHA256 of the empty message
        assert_eq!(
            hex::encode(Sha256::hash_double(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn test_engine_reuse_is_stateless() {
        let mut engine = Sha256::new();
        let first = engine.digest32(b"abc");
        let _ = engine.digest32(b"some other message");
        assert_eq!(engine.digest32(b"abc"), first);
    }

    #[test]
    fn test_midstate_matches_full_digest() {
        // 100 bytes: one full block plus a 36-byte tail
        let message: Vec<u8> = (0..100u8).collect();
        let midstate = Midstate::compute(&message[..64]).unwrap();
        assert_eq!(midstate.finish(&message[64..]).unwrap(), Sha256::hash(&message));
    }

    #[test]
    fn test_midstate_empty_tail() {
        let message = [0x42u8; 128];
        let midstate = Midstate::compute(&message).unwrap();
        assert_eq!(midstate.finish(&[]).unwrap(), Sha256::hash(&message));
    }

    #[test]
    fn test_midstate_spilling_tail() {
        // 60-byte tail forces the spilled two-block padding path
        let message = [0x17u8; 124];
        let midstate = Midstate::compute(&message[..64]).unwrap();
        assert_eq!(midstate.finish(&message[64..]).unwrap(), Sha256::hash(&message));
    }

    #[test]
    fn test_midstate_rejects_bad_lengths() {
        assert!(Midstate::compute(&[0u8; 63]).is_err());
        let midstate = Midstate::compute(&[0u8; 64]).unwrap();
        assert!(midstate.finish(&[0u8; 64]).is_err());
    }

    #[test]
    fn test_trait_surface() {
        let mut engine = Sha256::new();
        assert_eq!(engine.block_size(), 64);
        assert_eq!(engine.output_size(), 32);
        assert_eq!(engine.digest(b"abc"), Sha256::hash(b"abc").to_vec());
    }
}
