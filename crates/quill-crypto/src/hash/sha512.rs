//! SHA-512 with serializable state

use std::slice;

use sha2::digest::generic_array::GenericArray;
use zeroize::Zeroize;

use super::{BlockBuffer, Hash, SavedHashState, SerializableHash};
use crate::error::CryptoError;

/// Block size (128 bytes)
pub const BLOCK_SIZE: usize = 128;

/// Digest size (64 bytes)
pub const DIGEST_LENGTH: usize = 64;

const ALGORITHM: &str = "sha512";

const IV: [u64; 8] = [
    0x6a09_e667_f3bc_c908,
    0xbb67_ae85_84ca_a73b,
    0x3c6e_f372_fe94_f82b,
    0xa54f_f53a_5f1d_36f1,
    0x510e_527f_ade6_82d1,
    0x9b05_688c_2b3e_6c1f,
    0x1f83_d9ab_fb41_bd6b,
    0x5be0_cd19_137e_2179,
];

/// Streaming SHA-512.
#[derive(Clone)]
pub struct Sha512 {
    state: [u64; 8],
    buffer: BlockBuffer<BLOCK_SIZE>,
    bytes_hashed: u64,
    finished: bool,
}

impl Default for Sha512 {
    fn default() -> Self {
        Self { state: IV, buffer: BlockBuffer::new(), bytes_hashed: 0, finished: false }
    }
}

impl Sha512 {
    /// Fresh hash.
    pub fn new() -> Self {
        Self::default()
    }
}

fn compress(state: &mut [u64; 8], block: &[u8]) {
    sha2::compress512(state, slice::from_ref(GenericArray::from_slice(block)));
}

impl Hash for Sha512 {
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
            // 128-bit length field; byte counts never reach the high half
            let bit_length = (u128::from(self.bytes_hashed) * 8).to_be_bytes();
            self.buffer.pad(&bit_length, |block| compress(&mut self.state, block));
            self.finished = true;
        }

        for (chunk, word) in out[..DIGEST_LENGTH].chunks_exact_mut(8).zip(&self.state) {
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

impl SerializableHash for Sha512 {
    fn save_state(&self) -> Result<SavedHashState, CryptoError> {
        if self.finished {
            return Err(CryptoError::InvalidSavedState { reason: "hash already finished" });
        }
        let chaining = self.state.iter().flat_map(|w| w.to_be_bytes()).collect();
        Ok(SavedHashState::new(ALGORITHM, chaining, self.buffer.pending().to_vec(), self.bytes_hashed))
    }

    fn restore_state(&mut self, state: &SavedHashState) -> Result<(), CryptoError> {
        state.check(ALGORITHM, DIGEST_LENGTH, BLOCK_SIZE)?;

        for (word, chunk) in self.state.iter_mut().zip(state.chaining().chunks_exact(8)) {
            let mut be = [0u8; 8];
            be.copy_from_slice(chunk);
            *word = u64::from_be_bytes(be);
        }
        self.buffer.set_pending(state.buffer());
        self.bytes_hashed = state.bytes_hashed();
        self.finished = false;
        Ok(())
    }
}

impl Drop for Sha512 {
    fn drop(&mut self) {
        self.clean();
    }
}
