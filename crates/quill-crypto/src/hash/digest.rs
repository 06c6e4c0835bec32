//! Adapter for RustCrypto `Digest` implementations.
//!
//! Any `Digest` with a known block size can back HMAC through
//! [`DigestHash`]. Its internal state is opaque, so the adapter does not
//! offer [`SerializableHash`](super::SerializableHash): `Hmac::reset` and
//! HKDF refuse it with `CapabilityUnsupported`.

use sha2::digest::{Digest, core_api::BlockSizeUser};
use zeroize::Zeroizing;

use super::Hash;

/// [`Hash`] over a RustCrypto digest.
pub struct DigestHash<D> {
    inner: D,
    output: Option<Zeroizing<Vec<u8>>>,
}

impl<D: Digest + BlockSizeUser + Default> Default for DigestHash<D> {
    fn default() -> Self {
        Self { inner: D::default(), output: None }
    }
}

impl<D: Digest + BlockSizeUser + Default> Hash for DigestHash<D> {
    fn block_size(&self) -> usize {
        <D as BlockSizeUser>::block_size()
    }

    fn digest_length(&self) -> usize {
        <D as Digest>::output_size()
    }

    fn update(&mut self, data: &[u8]) {
        if self.output.is_none() {
            Digest::update(&mut self.inner, data);
        }
    }

    fn finish(&mut self, out: &mut [u8]) {
        let inner = &mut self.inner;
        let digest = self
            .output
            .get_or_insert_with(|| Zeroizing::new(std::mem::take(inner).finalize().to_vec()));
        out[..digest.len()].copy_from_slice(digest.as_slice());
    }

    fn reset(&mut self) {
        self.inner = D::default();
        self.output = None;
    }

    fn clean(&mut self) {
        self.reset();
    }
}
