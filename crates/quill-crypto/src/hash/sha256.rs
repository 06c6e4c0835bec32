//! SHA-256 with serializable state
//!
//! Buffering, padding and state management live here; the compression
//! function is `sha2::compress256`.

use std::slice;

use sha2::digest::generic_array::GenericArray;
use zeroize::Zeroize;

use super::{BlockBuffer, Hash, SavedHashState, SerializableHash};
use crate::error::CryptoError;

/// Block size (64 bytes)
pub const BLOCK_SIZE: usize = 64;

/// Digest size (32 bytes)
pub const DIGEST_LENGTH: usize = 32;

const ALGORITHM: &str = "sha256";

const IV: [u32; 8] = [
    0x6a09_e667, 0xbb67_ae85, 0x3c6e_f372, 0xa54f_f53a, 0x510e_527f, 0x9b05_688c, 0x1f83_d9ab,
    0x5be0_cd19,
];

/// Streaming SHA-256.
#[derive(Clone)]
pub struct Sha256 {
    state: [u32; 8],
    buffer: BlockBuffer<BLOCK_SIZE>,
    bytes_hashed: u64,
    finished: bool,
}

impl Default for Sha256 {
    fn default() -> Self {
        Self { state: IV, buffer: BlockBuffer::new(), bytes_hashed: 0, finished: false }
    }
}

impl Sha256 {
    /// Fresh hash.
    pub fn new() -> Self {
        Self::default()
    }
}

fn compress(state: &mut [u32; 8], block: &[u8]) {
    sha2::compress256(state, slice::from_ref(GenericArray::from_slice(block)));
}

impl Hash for Sha256 {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn digest_length(&self) -> usize {
        DIGEST_LENGTH
    }

    fn update(&mut self, data: &[u8]) {
        if self.finished {
            return;
        }
        self.bytes_hashed = self.bytes_hashed.wrapping_add(data.len() as u64);
        self.buffer.absorb(data, |block| compress(&mut self.state, block));
    }

    fn finish(&mut self, out: &mut [u8]) {
        if !self.finished {
            let bit_length = self.bytes_hashed.wrapping_mul(8).to_be_bytes();
            self.buffer.pad(&bit_length, |block| compress(&mut self.state, block));
            self.finished = true;
        }

        for (chunk, word) in out[..DIGEST_LENGTH].chunks_exact_mut(4).zip(&self.state) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
    }

    fn reset(&mut self) {
        self.state = IV;
        self.buffer.wipe();
        self.bytes_hashed = 0;
        self.finished = false;
    }

    fn clean(&mut self) {
        self.state.zeroize();
        self.reset();
    }

    fn as_serializable(&self) -> Option<&dyn SerializableHash> {
        Some(self)
    }

    fn as_serializable_mut(&mut self) -> Option<&mut dyn SerializableHash> {
        Some(self)
    }
}

impl SerializableHash for Sha256 {
    fn save_state(&self) -> Result<SavedHashState, CryptoError> {
        if self.finished {
            return Err(CryptoError::InvalidSavedState { reason: "hash already finished" });
        }
        let chaining = self.state.iter().flat_map(|w| w.to_be_bytes()).collect();
        Ok(SavedHashState::new(ALGORITHM, chaining, self.buffer.pending().to_vec(), self.bytes_hashed))
    }

    fn restore_state(&mut self, state: &SavedHashState) -> Result<(), CryptoError> {
        state.check(ALGORITHM, DIGEST_LENGTH, BLOCK_SIZE)?;

        for (word, chunk) in self.state.iter_mut().zip(state.chaining().chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        self.buffer.set_pending(state.buffer());
        self.bytes_hashed = state.bytes_hashed();
        self.finished = false;
        Ok(())
    }
}

impl Drop for Sha256 {
    fn drop(&mut self) {
        self.clean();
    }
}

#[cfg(test)]
mod tests {
    use sha2::Digest;

    use super::*;

    fn sha256(data: &[u8]) -> String {
        let mut h = Sha256::new();
        h.update(data);
        hex::encode(h.digest())
    }

    #[test]
    fn known_answers() {
        assert_eq!(
            sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn matches_reference_across_padding_boundaries() {
        for len in [1usize, 55, 56, 63, 64, 65, 119, 120, 128, 1000] {
            let data: Vec<u8> = (0..len).map(|i| (i * 31) as u8).collect();
            let expected = hex::encode(sha2::Sha256::digest(&data));
            assert_eq!(sha256(&data), expected, "length {len}");
        }
    }

    #[test]
    fn repeated_finish_returns_same_digest() {
        let mut h = Sha256::new();
        h.update(b"abc");
        let first = h.digest();
        h.update(b"ignored after finish");
        assert_eq!(h.digest(), first);
    }

    #[test]
    fn save_and_restore_resumes_midstream() {
        let mut h = Sha256::new();
        h.update(b"The quick brown fox jumps over ");
        let saved = h.save_state().unwrap();

        h.update(b"the lazy dog");
        let full = h.digest();

        h.reset();
        h.restore_state(&saved).unwrap();
        h.update(b"the lazy dog");
        assert_eq!(h.digest(), full);
    }

    #[test]
    fn save_state_after_finish_rejected() {
        let mut h = Sha256::new();
        h.digest();
        assert!(matches!(h.save_state(), Err(CryptoError::InvalidSavedState { .. })));
    }

    #[test]
    fn clean_resets_to_empty_hash() {
        let mut h = Sha256::new();
        h.update(b"secret");
        h.clean();
        assert_eq!(hex::encode(h.digest()), sha256(b""));
    }
}
