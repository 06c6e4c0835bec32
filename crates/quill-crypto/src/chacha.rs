//! ChaCha stream cipher (RFC 8439 block function, selectable rounds)
//!
//! The 4x4 state is four constant words, eight key words and a 16-byte
//! counter block. The counter block holds a little-endian block counter in
//! its leading bytes and the nonce in its tail; see [`CounterBlock`].
//!
//! # Limits
//!
//! The block counter wraps silently once its bytes are exhausted (after
//! `2^32` blocks, 256 GiB, for a 12-byte nonce). Callers must never encrypt
//! more than that under one (key, nonce) pair, and must never reuse a
//! (key, nonce) pair at all.

use zeroize::Zeroize;

use crate::error::CryptoError;

/// ChaCha key size (32 bytes)
pub const KEY_SIZE: usize = 32;

/// Keystream block size (64 bytes)
pub const BLOCK_SIZE: usize = 64;

/// Counter block size; also the largest accepted nonce (16 bytes)
pub const MAX_NONCE_SIZE: usize = 16;

/// Counter width used when the caller supplies a full 16-byte block
const FULL_BLOCK_COUNTER_LEN: usize = 4;

/// "expand 32-byte k" as little-endian words
const SIGMA: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

/// Number of rounds applied by the block function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rounds {
    /// ChaCha8
    Eight,
    /// ChaCha12
    Twelve,
    /// ChaCha20, the RFC 8439 cipher
    #[default]
    Twenty,
}

impl Rounds {
    /// Total rounds (each double round counts as two).
    pub const fn count(self) -> usize {
        match self {
            Self::Eight => 8,
            Self::Twelve => 12,
            Self::Twenty => 20,
        }
    }

    const fn double_rounds(self) -> usize {
        self.count() / 2
    }
}

/// 16-byte block counter and nonce input to the block function.
///
/// Layout: `counter (LE) || nonce`. The counter occupies the bytes the nonce
/// leaves free, so an 8-byte nonce gets a 64-bit counter and a 12-byte nonce
/// a 32-bit counter. A 16-byte input is treated as a complete counter block
/// whose first word is the counter.
pub struct CounterBlock {
    bytes: [u8; MAX_NONCE_SIZE],
    counter_len: usize,
}

impl CounterBlock {
    /// Build a counter block from a nonce, with the counter at zero.
    ///
    /// # Errors
    ///
    /// - `InvalidNonceLength`: the nonce is longer than 16 bytes
    pub fn new(nonce: &[u8]) -> Result<Self, CryptoError> {
        let counter_len = match MAX_NONCE_SIZE.checked_sub(nonce.len()) {
            Some(0) => FULL_BLOCK_COUNTER_LEN,
            Some(free) => free,
            None => return Err(nonce_too_long(nonce.len())),
        };
        Self::with_counter_len(nonce, counter_len)
    }

    /// Place `nonce` in the tail and count in the first `counter_len` bytes.
    ///
    /// Nonce bytes that overlap the counter seed its initial value.
    pub(crate) fn with_counter_len(nonce: &[u8], counter_len: usize) -> Result<Self, CryptoError> {
        if nonce.len() > MAX_NONCE_SIZE {
            return Err(nonce_too_long(nonce.len()));
        }
        debug_assert!((1..=MAX_NONCE_SIZE).contains(&counter_len));

        let mut bytes = [0u8; MAX_NONCE_SIZE];
        bytes[MAX_NONCE_SIZE - nonce.len()..].copy_from_slice(nonce);
        Ok(Self { bytes, counter_len })
    }

    /// Current block counter (the low 64 bits for counters wider than that).
    pub fn counter(&self) -> u64 {
        let width = self.counter_len.min(8);
        let mut le = [0u8; 8];
        le[..width].copy_from_slice(&self.bytes[..width]);
        u64::from_le_bytes(le)
    }

    /// Set the block counter, truncating `value` to the counter width.
    pub fn set_counter(&mut self, value: u64) {
        let le = value.to_le_bytes();
        for (i, byte) in self.bytes[..self.counter_len].iter_mut().enumerate() {
            *byte = le.get(i).copied().unwrap_or(0);
        }
    }

    /// Raw 16-byte block as fed to the block function.
    pub fn as_bytes(&self) -> &[u8; MAX_NONCE_SIZE] {
        &self.bytes
    }

    /// Advance the counter by one block, wrapping on overflow.
    fn increment(&mut self) {
        let mut carry = 1u16;
        for byte in &mut self.bytes[..self.counter_len] {
            carry += u16::from(*byte);
            *byte = carry as u8;
            carry >>= 8;
        }
    }
}

impl Drop for CounterBlock {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

fn nonce_too_long(actual: usize) -> CryptoError {
    CryptoError::InvalidNonceLength { expected: "at most 16 bytes", actual }
}

/// One 64-byte keystream block, wiped on drop.
pub struct KeystreamBlock([u8; BLOCK_SIZE]);

impl KeystreamBlock {
    /// Keystream bytes.
    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }
}

impl Drop for KeystreamBlock {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[inline]
fn quarter_round(x: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    x[a] = x[a].wrapping_add(x[b]);
    x[d] = (x[d] ^ x[a]).rotate_left(16);
    x[c] = x[c].wrapping_add(x[d]);
    x[b] = (x[b] ^ x[c]).rotate_left(12);
    x[a] = x[a].wrapping_add(x[b]);
    x[d] = (x[d] ^ x[a]).rotate_left(8);
    x[c] = x[c].wrapping_add(x[d]);
    x[b] = (x[b] ^ x[c]).rotate_left(7);
}

fn permute(x: &mut [u32; 16], rounds: Rounds) {
    for _ in 0..rounds.double_rounds() {
        // Columns
        quarter_round(x, 0, 4, 8, 12);
        quarter_round(x, 1, 5, 9, 13);
        quarter_round(x, 2, 6, 10, 14);
        quarter_round(x, 3, 7, 11, 15);

        // Diagonals
        quarter_round(x, 0, 5, 10, 15);
        quarter_round(x, 1, 6, 11, 12);
        quarter_round(x, 2, 7, 8, 13);
        quarter_round(x, 3, 4, 9, 14);
    }
}

fn read_words(out: &mut [u32], bytes: &[u8]) {
    for (word, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}

fn initial_state(key: &[u8; KEY_SIZE], input: &[u8; MAX_NONCE_SIZE]) -> [u32; 16] {
    let mut state = [0u32; 16];
    state[..4].copy_from_slice(&SIGMA);
    read_words(&mut state[4..12], key);
    read_words(&mut state[12..], input);
    state
}

fn block_function(
    out: &mut [u8; BLOCK_SIZE],
    key: &[u8; KEY_SIZE],
    input: &[u8; MAX_NONCE_SIZE],
    rounds: Rounds,
) {
    let mut original = initial_state(key, input);
    let mut x = original;

    permute(&mut x, rounds);

    for ((chunk, word), orig) in out.chunks_exact_mut(4).zip(&x).zip(&original) {
        chunk.copy_from_slice(&word.wrapping_add(*orig).to_le_bytes());
    }

    x.zeroize();
    original.zeroize();
}

/// Compute the keystream block at the counter block's current position.
///
/// Deterministic in (key, counter block, rounds); does not advance the
/// counter.
pub fn block(key: &[u8; KEY_SIZE], counter: &CounterBlock, rounds: Rounds) -> KeystreamBlock {
    let mut out = KeystreamBlock([0u8; BLOCK_SIZE]);
    block_function(&mut out.0, key, &counter.bytes, rounds);
    out
}

/// Fill `out` with keystream, advancing the counter once per block.
pub fn stream(key: &[u8; KEY_SIZE], counter: &mut CounterBlock, out: &mut [u8], rounds: Rounds) {
    let mut keystream = [0u8; BLOCK_SIZE];
    for chunk in out.chunks_mut(BLOCK_SIZE) {
        block_function(&mut keystream, key, &counter.bytes, rounds);
        chunk.copy_from_slice(&keystream[..chunk.len()]);
        counter.increment();
    }
    keystream.zeroize();
}

/// XOR `input` with keystream into `output`.
///
/// Encryption and decryption are the same operation. `input` and `output`
/// are disjoint by construction; use [`stream_xor_in_place`] to transform a
/// buffer without a copy.
///
/// # Errors
///
/// - `DestinationLengthMismatch`: `output` is not exactly `input.len()` long
pub fn stream_xor(
    key: &[u8; KEY_SIZE],
    counter: &mut CounterBlock,
    input: &[u8],
    output: &mut [u8],
    rounds: Rounds,
) -> Result<(), CryptoError> {
    if output.len() != input.len() {
        return Err(CryptoError::DestinationLengthMismatch {
            expected: input.len(),
            actual: output.len(),
        });
    }

    let mut keystream = [0u8; BLOCK_SIZE];
    for (src, dst) in input.chunks(BLOCK_SIZE).zip(output.chunks_mut(BLOCK_SIZE)) {
        block_function(&mut keystream, key, &counter.bytes, rounds);
        for ((d, s), k) in dst.iter_mut().zip(src).zip(&keystream) {
            *d = s ^ k;
        }
        counter.increment();
    }
    keystream.zeroize();

    Ok(())
}

/// XOR `buffer` with keystream in place.
pub fn stream_xor_in_place(
    key: &[u8; KEY_SIZE],
    counter: &mut CounterBlock,
    buffer: &mut [u8],
    rounds: Rounds,
) {
    let mut keystream = [0u8; BLOCK_SIZE];
    for chunk in buffer.chunks_mut(BLOCK_SIZE) {
        block_function(&mut keystream, key, &counter.bytes, rounds);
        for (b, k) in chunk.iter_mut().zip(&keystream) {
            *b ^= k;
        }
        counter.increment();
    }
    keystream.zeroize();
}

/// HChaCha20: derive a 32-byte subkey from a key and a 16-byte input.
///
/// Runs the ChaCha20 permutation without the feed-forward and returns state
/// words 0..4 and 12..16. Used by XChaCha20 to extend the nonce.
pub fn hchacha20(key: &[u8; KEY_SIZE], input: &[u8; MAX_NONCE_SIZE]) -> [u8; KEY_SIZE] {
    let mut x = initial_state(key, input);
    permute(&mut x, Rounds::Twenty);

    let mut out = [0u8; KEY_SIZE];
    for (chunk, word) in out.chunks_exact_mut(4).zip(x[..4].iter().chain(&x[12..])) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }

    x.zeroize();
    out
}
