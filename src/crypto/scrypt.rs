//! Memory-hard scrypt KDF (RFC 7914)
//!
//! `scrypt(P, S, N, r, p, dkLen)`:
//!   1. expand: `B = PBKDF2(P, S, p * 128 * r)` with one iteration
//!   2. mix: run ROMIX independently over each of the `p` 128·r-byte chunks
//!   3. extract: `DK = PBKDF2(P, B, dkLen)` with one iteration
//!
//! ROMIX fills a table of N chunk-sized rows by iterating BlockMix forward,
//! then performs N data-dependent lookups into that table. The table is what
//! makes the function memory-hard: a chunk costs 128·r·N bytes to mix.
//!
//! Chunk words are little-endian on the byte boundary to PBKDF2; everything
//! in between operates on `u32` words directly.

use crate::crypto::{Pbkdf2, Sha256};
use crate::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use zeroize::Zeroize;

/// Words per 64-byte Salsa block
const SALSA_WORDS: usize = 16;

/// Cost parameters for a scrypt derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptParams {
    /// CPU/memory cost; a power of two greater than one
    pub n: usize,
    /// Block size multiplier; each mixing chunk is 128 * r bytes
    pub r: usize,
    /// Parallelization: number of independently mixed chunks
    pub p: usize,
}

impl ScryptParams {
    /// The cost parameters used for scrypt proof-of-work (N=1024, r=1, p=1)
    pub fn proof_of_work() -> Self {
        Self { n: 1024, r: 1, p: 1 }
    }

    pub fn new(n: usize, r: usize, p: usize) -> Result<Self> {
        if n <= 1 || !n.is_power_of_two() {
            return Err(Error::crypto(format!(
                "Scrypt N must be a power of two greater than 1, got {n}"
            )));
        }
        if r == 0 {
            return Err(Error::crypto("Scrypt r must be at least 1"));
        }
        if p == 0 {
            return Err(Error::crypto("Scrypt p must be at least 1"));
        }
        Ok(Self { n, r, p })
    }

    /// Words in one mixing chunk (128 * r bytes)
    fn chunk_words(&self) -> usize {
        32 * self.r
    }

    /// Bytes of ROMIX working memory per chunk
    pub fn memory_per_chunk(&self) -> usize {
        128 * self.r * self.n
    }
}

/// scrypt derivation context.
///
/// Owns the PBKDF2 context used for the expand and extract passes, so the
/// password key is installed once and shared by both.
pub struct Scrypt {
    params: ScryptParams,
    kdf: Pbkdf2<Sha256>,
}

impl Scrypt {
    pub fn new(params: ScryptParams) -> Self {
        Self {
            params,
            kdf: Pbkdf2::new(Sha256::new()),
        }
    }

    pub fn params(&self) -> ScryptParams {
        self.params
    }

    /// Derive `dk_len` bytes from a password and salt
    pub fn derive(&mut self, password: &[u8], salt: &[u8], dk_len: usize) -> Result<Vec<u8>> {
        self.kdf.hmac_mut().set_key(password);
        self.derive_with_current_key(salt, dk_len)
    }

    /// Install the password key directly.
    ///
    /// Equivalent to passing the password to [`derive`](Self::derive) when the
    /// caller already holds the hashed-down form of a long password.
    pub fn install_key(&mut self, key: &[u8]) {
        self.kdf.hmac_mut().set_key(key);
    }

    /// Derive using the password key already installed in the PBKDF2 context.
    ///
    /// Both PBKDF2 passes key HMAC with the password, so a caller that can
    /// precompute the (hashed-down) key avoids rekeying per derivation.
    pub fn derive_with_current_key(&mut self, salt: &[u8], dk_len: usize) -> Result<Vec<u8>> {
        let chunk_words = self.params.chunk_words();
        let expanded_len = self.params.p * 128 * self.params.r;

        let mut expanded = self.kdf.derive_with_current_key(salt, expanded_len)?;
        let mut words = vec![0u32; self.params.p * chunk_words];
        LittleEndian::read_u32_into(&expanded, &mut words);

        let n = self.params.n;
        if self.params.p == 1 {
            romix(&mut words, n);
        } else {
            // Chunks are mixed independently, one scoped thread each
            std::thread::scope(|scope| {
                for chunk in words.chunks_mut(chunk_words) {
                    scope.spawn(move || romix(chunk, n));
                }
            });
        }

        LittleEndian::write_u32_into(&words, &mut expanded);
        words.zeroize();

        let derived = self.kdf.derive_with_current_key(&expanded, dk_len);
        expanded.zeroize();
        derived
    }
}

/// Sequentially memory-hard mix of one 128·r-byte chunk, in place
fn romix(chunk: &mut [u32], n: usize) {
    let chunk_words = chunk.len();
    let mut table = vec![0u32; n * chunk_words];
    let mut shuffle = vec![0u32; chunk_words];

    for row in table.chunks_mut(chunk_words) {
        row.copy_from_slice(chunk);
        block_mix(chunk, &mut shuffle);
    }

    for _ in 0..n {
        // Data-dependent lookup: the first word of the chunk's last Salsa
        // block, reduced mod N (N is a power of two)
        let j = chunk[chunk_words - SALSA_WORDS] as usize & (n - 1);
        let row = &table[j * chunk_words..(j + 1) * chunk_words];
        for (word, table_word) in chunk.iter_mut().zip(row) {
            *word ^= table_word;
        }
        block_mix(chunk, &mut shuffle);
    }

    table.zeroize();
    shuffle.zeroize();
}

/// One BlockMix round over a chunk of 2r Salsa blocks, in place.
///
/// Each block is XORed into a running accumulator, passed through Salsa20/8,
/// and written out de-interleaved: even-indexed results to the first half of
/// the chunk, odd-indexed to the second half.
fn block_mix(chunk: &mut [u32], shuffle: &mut [u32]) {
    let blocks = chunk.len() / SALSA_WORDS;
    let half = blocks / 2;

    let mut acc = [0u32; SALSA_WORDS];
    acc.copy_from_slice(&chunk[(blocks - 1) * SALSA_WORDS..]);

    for i in 0..blocks {
        for (a, b) in acc.iter_mut().zip(&chunk[i * SALSA_WORDS..(i + 1) * SALSA_WORDS]) {
            *a ^= b;
        }
        salsa20_8(&mut acc);

        let dst = if i % 2 == 0 { i / 2 } else { half + i / 2 } * SALSA_WORDS;
        shuffle[dst..dst + SALSA_WORDS].copy_from_slice(&acc);
    }

    chunk.copy_from_slice(shuffle);
    acc.zeroize();
}

/// Salsa20/8 core: four double-rounds plus the feed-forward addition
fn salsa20_8(block: &mut [u32; SALSA_WORDS]) {
    let input = *block;
    let x = block;

    for _ in 0..4 {
        // Column round
        x[4] ^= x[0].wrapping_add(x[12]).rotate_left(7);
        x[8] ^= x[4].wrapping_add(x[0]).rotate_left(9);
        x[12] ^= x[8].wrapping_add(x[4]).rotate_left(13);
        x[0] ^= x[12].wrapping_add(x[8]).rotate_left(18);
        x[9] ^= x[5].wrapping_add(x[1]).rotate_left(7);
        x[13] ^= x[9].wrapping_add(x[5]).rotate_left(9);
        x[1] ^= x[13].wrapping_add(x[9]).rotate_left(13);
        x[5] ^= x[1].wrapping_add(x[13]).rotate_left(18);
        x[14] ^= x[10].wrapping_add(x[6]).rotate_left(7);
        x[2] ^= x[14].wrapping_add(x[10]).rotate_left(9);
        x[6] ^= x[2].wrapping_add(x[14]).rotate_left(13);
        x[10] ^= x[6].wrapping_add(x[2]).rotate_left(18);
        x[3] ^= x[15].wrapping_add(x[11]).rotate_left(7);
        x[7] ^= x[3].wrapping_add(x[15]).rotate_left(9);
        x[11] ^= x[7].wrapping_add(x[3]).rotate_left(13);
        x[15] ^= x[11].wrapping_add(x[7]).rotate_left(18);
        // Row round
        x[1] ^= x[0].wrapping_add(x[3]).rotate_left(7);
        x[2] ^= x[1].wrapping_add(x[0]).rotate_left(9);
        x[3] ^= x[2].wrapping_add(x[1]).rotate_left(13);
        x[0] ^= x[3].wrapping_add(x[2]).rotate_left(18);
        x[6] ^= x[5].wrapping_add(x[4]).rotate_left(7);
        x[7] ^= x[6].wrapping_add(x[5]).rotate_left(9);
        x[4] ^= x[7].wrapping_add(x[6]).rotate_left(13);
        x[5] ^= x[4].wrapping_add(x[7]).rotate_left(18);
        x[11] ^= x[10].wrapping_add(x[9]).rotate_left(7);
        x[8] ^= x[11].wrapping_add(x[10]).rotate_left(9);
        x[9] ^= x[8].wrapping_add(x[11]).rotate_left(13);
        x[10] ^= x[9].wrapping_add(x[8]).rotate_left(18);
        x[12] ^= x[15].wrapping_add(x[14]).rotate_left(7);
        x[13] ^= x[12].wrapping_add(x[15]).rotate_left(9);
        x[14] ^= x[13].wrapping_add(x[12]).rotate_left(13);
        x[15] ^= x[14].wrapping_add(x[13]).rotate_left(18);
    }

    for (word, start) in x.iter_mut().zip(&input) {
        *word = word.wrapping_add(*start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7914 section 8: Salsa20/8 core
    #[test]
    fn test_salsa20_8_vector() {
        let input = hex::decode(
            "7e879a214f3ec9867ca940e641718f26baee555b8c61c1c50df908b0f9513fba\
             7e42ba7f0203b44ab82e233b8fa32e27cedf07feb8b837aacd561a835976d6d6",
        )
        .unwrap();
        let expected = hex::decode(
            "a41f859c6608cc993b81cacb020cef05044b2181a2fd337dfd7b1c6396682f29\
             b4393168e3c9e6bcfe6bc5b7a06d96bae424cc102c91745c24ad673dc7618f81",
        )
        .unwrap();

        let mut block = [0u32; SALSA_WORDS];
        LittleEndian::read_u32_into(&input, &mut block);
        salsa20_8(&mut block);
        let mut output = [0u8; 64];
        LittleEndian::write_u32_into(&block, &mut output);

        assert_eq!(&output[..], &expected[..]);
    }

    // RFC 7914 section 12, first vector
    #[test]
    fn test_scrypt_minimal_vector() {
        let mut scrypt = Scrypt::new(ScryptParams::new(16, 1, 1).unwrap());
        let dk = scrypt.derive(b"", b"", 64).unwrap();
        assert_eq!(
            hex::encode(dk),
            "77d6576238657b203b19ca42c18a0497f16b4844e3074ae8dfdffa3fede21442\
             fcd0069ded0948f8326a753a0fc81f17e8d3e0fb2e0d3628cf35e20c38d18906"
        );
    }

    // RFC 7914 section 12, second vector: exercises r > 1 and the parallel
    // p > 1 path
    #[test]
    fn test_scrypt_parallel_vector() {
        let mut scrypt = Scrypt::new(ScryptParams::new(1024, 8, 16).unwrap());
        let dk = scrypt.derive(b"password", b"NaCl", 64).unwrap();
        assert_eq!(
            hex::encode(dk),
            "fdbabe1c9d3472007856e7190d01e9fe7c6ad7cbc8237830e77376634b373162\
             2eaf30d92e22a3886ff109279d9830dac727afb94a83ee6d8360cbdfa2cc0640"
        );
    }

    #[test]
    fn test_derive_with_current_key_matches_derive() {
        // Installing SHA-256(password) directly must give the same result as
        // passing a password longer than the HMAC block size, since HMAC
        // hashes long keys down before padding.
        let password = [0x5au8; 80];
        let salt = b"salted";

        let mut direct = Scrypt::new(ScryptParams::new(16, 1, 1).unwrap());
        let expected = direct.derive(&password, salt, 32).unwrap();

        let key32 = Sha256::hash(&password);
        let mut prekeyed = Scrypt::new(ScryptParams::new(16, 1, 1).unwrap());
        prekeyed.kdf.hmac_mut().set_key(&key32);
        let actual = prekeyed.derive_with_current_key(salt, 32).unwrap();

        assert_eq!(expected, actual);
    }

    #[test]
    fn test_param_validation() {
        assert!(ScryptParams::new(1024, 1, 1).is_ok());
        assert!(ScryptParams::new(0, 1, 1).is_err());
        assert!(ScryptParams::new(1, 1, 1).is_err());
        assert!(ScryptParams::new(1000, 1, 1).is_err());
        assert!(ScryptParams::new(16, 0, 1).is_err());
        assert!(ScryptParams::new(16, 1, 0).is_err());
    }

    #[test]
    fn test_memory_per_chunk() {
        let params = ScryptParams::new(1024, 1, 1).unwrap();
        assert_eq!(params.memory_per_chunk(), 128 * 1024);
    }
}
