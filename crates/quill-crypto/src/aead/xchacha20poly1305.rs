//! XChaCha20-Poly1305 (draft-irtf-cfrg-xchacha)
//!
//! Extends the nonce to 24 bytes, large enough to pick at random without
//! tracking collisions. HChaCha20 over the key and the first 16 nonce bytes
//! yields a subkey; the remaining 8 bytes behind four zero bytes form the
//! ChaCha20-Poly1305 nonce.

use zeroize::{Zeroize, Zeroizing};

use super::{TAG_SIZE, chacha20poly1305::ChaCha20Poly1305};
use crate::{
    chacha::{self, MAX_NONCE_SIZE},
    error::CryptoError,
};

/// XChaCha20-Poly1305 keyed for sealing and opening messages.
pub struct XChaCha20Poly1305 {
    key: [u8; chacha::KEY_SIZE],
}

impl XChaCha20Poly1305 {
    /// Key size (32 bytes)
    pub const KEY_SIZE: usize = chacha::KEY_SIZE;

    /// Nonce size (24 bytes)
    pub const NONCE_SIZE: usize = 24;

    /// Authentication tag size (16 bytes)
    pub const TAG_SIZE: usize = TAG_SIZE;

    /// Create a cipher from a 32-byte key.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength`: `key` is not 32 bytes
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; chacha::KEY_SIZE] = key.try_into().map_err(|_| {
            CryptoError::InvalidKeyLength { expected: chacha::KEY_SIZE, actual: key.len() }
        })?;
        Ok(Self { key })
    }

    /// Encrypt and authenticate `plaintext`, returning `ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// - `InvalidNonceLength`: `nonce` is not 24 bytes
    pub fn seal(
        &self,
        nonce: &[u8],
        plaintext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        let (inner, inner_nonce) = self.derive(nonce)?;
        inner.seal(inner_nonce.as_slice(), plaintext, associated_data)
    }

    /// Encrypt and authenticate into a buffer of `plaintext.len() + 16` bytes.
    ///
    /// # Errors
    ///
    /// - `InvalidNonceLength`: `nonce` is not 24 bytes
    /// - `DestinationLengthMismatch`: `dst` has the wrong length
    pub fn seal_into(
        &self,
        nonce: &[u8],
        plaintext: &[u8],
        associated_data: Option<&[u8]>,
        dst: &mut [u8],
    ) -> Result<(), CryptoError> {
        let (inner, inner_nonce) = self.derive(nonce)?;
        inner.seal_into(inner_nonce.as_slice(), plaintext, associated_data, dst)
    }

    /// Verify and decrypt `ciphertext || tag`; `Ok(None)` on failure.
    ///
    /// # Errors
    ///
    /// - `InvalidNonceLength`: `nonce` is not 24 bytes
    pub fn open(
        &self,
        nonce: &[u8],
        sealed: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Option<Vec<u8>>, CryptoError> {
        let (inner, inner_nonce) = self.derive(nonce)?;
        inner.open(inner_nonce.as_slice(), sealed, associated_data)
    }

    /// Verify and decrypt into a buffer of `sealed.len() - 16` bytes.
    ///
    /// # Errors
    ///
    /// - `InvalidNonceLength`: `nonce` is not 24 bytes
    /// - `DestinationLengthMismatch`: `dst` has the wrong length
    pub fn open_into<'a>(
        &self,
        nonce: &[u8],
        sealed: &[u8],
        associated_data: Option<&[u8]>,
        dst: &'a mut [u8],
    ) -> Result<Option<&'a mut [u8]>, CryptoError> {
        let (inner, inner_nonce) = self.derive(nonce)?;
        inner.open_into(inner_nonce.as_slice(), sealed, associated_data, dst)
    }

    /// Wipe the key.
    pub fn clean(&mut self) {
        self.key.zeroize();
    }

    /// Subkey cipher and 12-byte inner nonce for a 24-byte nonce.
    fn derive(
        &self,
        nonce: &[u8],
    ) -> Result<(ChaCha20Poly1305, Zeroizing<[u8; ChaCha20Poly1305::NONCE_SIZE]>), CryptoError>
    {
        if nonce.len() != Self::NONCE_SIZE {
            return Err(CryptoError::InvalidNonceLength {
                expected: "24 bytes",
                actual: nonce.len(),
            });
        }
        let (head, tail) = nonce.split_at(MAX_NONCE_SIZE);

        let mut hchacha_input = [0u8; MAX_NONCE_SIZE];
        hchacha_input.copy_from_slice(head);
        let mut subkey = chacha::hchacha20(&self.key, &hchacha_input);
        hchacha_input.zeroize();
        let inner = ChaCha20Poly1305::from_key(subkey);
        subkey.zeroize();

        let mut inner_nonce = Zeroizing::new([0u8; ChaCha20Poly1305::NONCE_SIZE]);
        inner_nonce[4..].copy_from_slice(tail);

        Ok((inner, inner_nonce))
    }
}

impl Drop for XChaCha20Poly1305 {
    fn drop(&mut self) {
        self.clean();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUNSCREEN: &[u8] = b"Ladies and Gentlemen of the class of '99: If I could offer you \
only one tip for the future, sunscreen would be it.";

    #[test]
    fn xchacha_draft_test_vector_tag() {
        // draft-irtf-cfrg-xchacha appendix A.3.1
        let key: Vec<u8> = (0x80..=0x9Fu8).collect();
        let nonce: Vec<u8> = (0x40..=0x57u8).collect();
        let aad = hex::decode("50515253c0c1c2c3c4c5c6c7").unwrap();

        let aead = XChaCha20Poly1305::new(&key).unwrap();
        let sealed = aead.seal(&nonce, SUNSCREEN, Some(aad.as_slice())).unwrap();

        assert_eq!(hex::encode(&sealed[SUNSCREEN.len()..]), "c0875924c1c7987947deafd8780acf49");
        assert_eq!(
            aead.open(&nonce, &sealed, Some(aad.as_slice())).unwrap().as_deref(),
            Some(SUNSCREEN)
        );
    }

    #[test]
    fn nonce_must_be_exactly_24_bytes() {
        let aead = XChaCha20Poly1305::new(&[1u8; 32]).unwrap();
        for len in [0usize, 12, 16, 23, 25] {
            let result = aead.seal(&vec![0u8; len], b"payload", None);
            assert_eq!(
                result,
                Err(CryptoError::InvalidNonceLength { expected: "24 bytes", actual: len })
            );
        }
    }

    #[test]
    fn differs_from_plain_chacha20poly1305() {
        let key = [7u8; 32];
        let nonce = [3u8; 24];
        let extended = XChaCha20Poly1305::new(&key).unwrap().seal(&nonce, b"payload", None).unwrap();
        let plain = ChaCha20Poly1305::new(&key).unwrap().seal(&nonce[12..], b"payload", None).unwrap();
        assert_ne!(extended, plain);
    }

    #[test]
    fn tampered_tag_rejected() {
        let aead = XChaCha20Poly1305::new(&[9u8; 32]).unwrap();
        let nonce = [0x55u8; 24];
        let mut sealed = aead.seal(&nonce, b"payload", None).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x80;
        assert_eq!(aead.open(&nonce, &sealed, None).unwrap(), None);
    }
}
