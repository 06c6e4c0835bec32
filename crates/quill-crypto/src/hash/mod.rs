//! Hash abstraction consumed by HMAC and HKDF
//!
//! [`Hash`] is the minimal streaming interface. [`SerializableHash`] is an
//! optional capability: a hash that can snapshot and restore its chaining
//! state lets [`Hmac`](crate::hmac::Hmac) rewind to its keyed state instead
//! of re-running the key schedule. Capability discovery is dynamic through
//! [`Hash::as_serializable`], so generic code can ask at runtime and report
//! `CapabilityUnsupported` rather than fail to compile.

pub mod digest;
pub mod sha256;
pub mod sha512;

pub use self::{digest::DigestHash, sha256::Sha256, sha512::Sha512};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Streaming hash function.
///
/// # Invariants
///
/// - `finish` may be called repeatedly and always yields the same digest
/// - `update` after `finish` is ignored until `reset`
/// - `clean` wipes all internal state and leaves the hash freshly reset
pub trait Hash: Default {
    /// Input block size in bytes.
    fn block_size(&self) -> usize;

    /// Digest size in bytes.
    fn digest_length(&self) -> usize;

    /// Absorb data.
    fn update(&mut self, data: &[u8]);

    /// Write the digest into `out[..digest_length]`.
    ///
    /// # Panics
    ///
    /// If `out` is shorter than [`digest_length`](Self::digest_length).
    fn finish(&mut self, out: &mut [u8]);

    /// Return to the initial state.
    fn reset(&mut self);

    /// Wipe internal buffers and reset.
    fn clean(&mut self);

    /// Finish and return the digest as a fresh vector.
    fn digest(&mut self) -> Vec<u8> {
        let mut out = vec![0u8; self.digest_length()];
        self.finish(&mut out);
        out
    }

    /// The serializable-state capability, if this hash has it.
    fn as_serializable(&self) -> Option<&dyn SerializableHash> {
        None
    }

    /// Mutable access to the serializable-state capability.
    fn as_serializable_mut(&mut self) -> Option<&mut dyn SerializableHash> {
        None
    }
}

/// Snapshot and restore of a hash's intermediate state.
pub trait SerializableHash {
    /// Snapshot the current state.
    ///
    /// # Errors
    ///
    /// - `InvalidSavedState`: the hash is already finished
    fn save_state(&self) -> Result<SavedHashState, CryptoError>;

    /// Resume from a snapshot taken by the same algorithm.
    ///
    /// # Errors
    ///
    /// - `InvalidSavedState`: the snapshot came from another algorithm or is
    ///   malformed
    fn restore_state(&mut self, state: &SavedHashState) -> Result<(), CryptoError>;

    /// Wipe a snapshot produced by this hash.
    fn clean_saved_state(&self, state: &mut SavedHashState) {
        state.clean();
    }
}

/// Intermediate hash state: chaining value, unprocessed tail and length.
///
/// Holds key-derived material when taken from a keyed HMAC; it is wiped on
/// drop and by [`clean`](Self::clean).
#[derive(Clone, PartialEq, Eq)]
pub struct SavedHashState {
    algorithm: &'static str,
    chaining: Vec<u8>,
    buffer: Vec<u8>,
    bytes_hashed: u64,
}

impl SavedHashState {
    /// Assemble a snapshot for `algorithm`.
    pub fn new(algorithm: &'static str, chaining: Vec<u8>, buffer: Vec<u8>, bytes_hashed: u64) -> Self {
        Self { algorithm, chaining, buffer, bytes_hashed }
    }

    /// Name of the algorithm that produced this snapshot.
    pub fn algorithm(&self) -> &'static str {
        self.algorithm
    }

    /// Serialized chaining value.
    pub fn chaining(&self) -> &[u8] {
        &self.chaining
    }

    /// Bytes absorbed but not yet compressed.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Total bytes absorbed.
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }

    /// Wipe the snapshot contents.
    pub fn clean(&mut self) {
        self.chaining.zeroize();
        self.buffer.zeroize();
        self.bytes_hashed = 0;
    }

    /// Reject snapshots from another algorithm or of the wrong shape.
    pub(crate) fn check(
        &self,
        algorithm: &'static str,
        chaining_len: usize,
        block_size: usize,
    ) -> Result<(), CryptoError> {
        if self.algorithm != algorithm {
            return Err(CryptoError::InvalidSavedState { reason: "state saved by another algorithm" });
        }
        if self.chaining.len() != chaining_len || self.buffer.len() >= block_size {
            return Err(CryptoError::InvalidSavedState { reason: "malformed state" });
        }
        Ok(())
    }
}

impl std::fmt::Debug for SavedHashState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SavedHashState")
            .field("algorithm", &self.algorithm)
            .field("bytes_hashed", &self.bytes_hashed)
            .finish_non_exhaustive()
    }
}

impl Drop for SavedHashState {
    fn drop(&mut self) {
        self.clean();
    }
}

/// Block accumulator shared by the Merkle-Damgard hashes.
#[derive(Clone)]
struct BlockBuffer<const N: usize> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> BlockBuffer<N> {
    const fn new() -> Self {
        Self { bytes: [0u8; N], len: 0 }
    }

    fn pending(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    fn set_pending(&mut self, data: &[u8]) {
        self.bytes[..data.len()].copy_from_slice(data);
        self.len = data.len();
    }

    /// Buffer `data`, handing each completed block to `compress`.
    fn absorb(&mut self, mut data: &[u8], mut compress: impl FnMut(&[u8])) {
        if self.len > 0 {
            let take = (N - self.len).min(data.len());
            self.bytes[self.len..self.len + take].copy_from_slice(&data[..take]);
            self.len += take;
            data = &data[take..];

            if self.len < N {
                return;
            }
            compress(&self.bytes);
            self.len = 0;
        }

        let mut blocks = data.chunks_exact(N);
        for block in &mut blocks {
            compress(block);
        }
        self.set_pending(blocks.remainder());
    }

    /// Append `0x80`, zero fill and the big-endian bit length, then compress.
    fn pad(&mut self, length_field: &[u8], mut compress: impl FnMut(&[u8])) {
        let length_at = N - length_field.len();

        self.bytes[self.len] = 0x80;
        let mut end = self.len + 1;
        if end > length_at {
            self.bytes[end..].fill(0);
            compress(&self.bytes);
            end = 0;
        }
        self.bytes[end..length_at].fill(0);
        self.bytes[length_at..].copy_from_slice(length_field);
        compress(&self.bytes);
        self.len = 0;
    }

    fn wipe(&mut self) {
        self.bytes.zeroize();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_state_clean_wipes_contents() {
        let mut state = SavedHashState::new("test", vec![1, 2, 3], vec![4, 5], 99);
        state.clean();
        assert!(state.chaining().iter().all(|&b| b == 0));
        assert!(state.buffer().iter().all(|&b| b == 0));
        assert_eq!(state.bytes_hashed(), 0);
    }

    #[test]
    fn saved_state_debug_hides_material() {
        let state = SavedHashState::new("test", vec![0xAB; 4], vec![], 7);
        let printed = format!("{state:?}");
        assert!(!printed.contains("171"), "chaining bytes must not be printed");
        assert!(printed.contains("test"));
    }

    #[test]
    fn saved_state_check_rejects_foreign_algorithm() {
        let state = SavedHashState::new("sha256", vec![0; 32], vec![], 0);
        assert!(state.check("sha256", 32, 64).is_ok());
        assert!(matches!(
            state.check("sha512", 64, 128),
            Err(CryptoError::InvalidSavedState { .. })
        ));
    }

    #[test]
    fn block_buffer_compresses_only_full_blocks() {
        let mut buffer = BlockBuffer::<4>::new();
        let mut blocks = Vec::new();

        buffer.absorb(b"ab", |b| blocks.push(b.to_vec()));
        assert!(blocks.is_empty());
        buffer.absorb(b"cdefghi", |b| blocks.push(b.to_vec()));
        assert_eq!(blocks, vec![b"abcd".to_vec(), b"efgh".to_vec()]);
        assert_eq!(buffer.pending(), b"i");
    }

    #[test]
    fn block_buffer_pad_spills_into_extra_block() {
        let mut buffer = BlockBuffer::<8>::new();
        let mut blocks = Vec::new();
        buffer.absorb(b"abcdef", |b| blocks.push(b.to_vec()));

        // 6 pending + 0x80 leaves no room for a 2-byte length field
        buffer.pad(&[0x01, 0x02], |b| blocks.push(b.to_vec()));
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], b"abcdef\x80\x00".to_vec());
        assert_eq!(blocks[1], vec![0, 0, 0, 0, 0, 0, 0x01, 0x02]);
    }
}
