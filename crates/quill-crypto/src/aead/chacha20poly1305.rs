//! ChaCha20-Poly1305 (RFC 8439)

use zeroize::{Zeroize, Zeroizing};

use super::{TAG_SIZE, authenticate};
use crate::{
    chacha::{self, CounterBlock, Rounds},
    constant_time,
    error::CryptoError,
    poly1305,
};

/// Bytes of the counter block reserved for the block counter
const COUNTER_LEN: usize = 4;

/// ChaCha20-Poly1305 keyed for sealing and opening messages.
///
/// The key is copied in at construction and wiped on drop or by
/// [`clean`](Self::clean).
///
/// # Nonces
///
/// A 12-byte nonce is canonical. Shorter nonces are right-aligned in the
/// 12-byte slot behind zero bytes. Nonces of 13 to 16 bytes overlap the
/// 32-bit counter word; their leading bytes seed the initial block counter.
/// A (key, nonce) pair must never seal two different messages.
pub struct ChaCha20Poly1305 {
    key: [u8; chacha::KEY_SIZE],
}

impl ChaCha20Poly1305 {
    /// Key size (32 bytes)
    pub const KEY_SIZE: usize = chacha::KEY_SIZE;

    /// Canonical nonce size (12 bytes)
    pub const NONCE_SIZE: usize = 12;

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

    pub(super) fn from_key(key: [u8; chacha::KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Encrypt and authenticate `plaintext`, returning `ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// - `InvalidNonceLength`: `nonce` is longer than 16 bytes
    pub fn seal(
        &self,
        nonce: &[u8],
        plaintext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        let mut sealed = vec![0u8; plaintext.len() + TAG_SIZE];
        self.seal_into(nonce, plaintext, associated_data, &mut sealed)?;
        Ok(sealed)
    }

    /// Encrypt and authenticate `plaintext` into a caller-supplied buffer.
    ///
    /// `dst` must be exactly `plaintext.len() + 16` bytes and cannot alias
    /// `plaintext`.
    ///
    /// # Errors
    ///
    /// - `InvalidNonceLength`: `nonce` is longer than 16 bytes
    /// - `DestinationLengthMismatch`: `dst` has the wrong length
    pub fn seal_into(
        &self,
        nonce: &[u8],
        plaintext: &[u8],
        associated_data: Option<&[u8]>,
        dst: &mut [u8],
    ) -> Result<(), CryptoError> {
        let mut counter = counter_block(nonce)?;
        let expected = plaintext.len() + TAG_SIZE;
        if dst.len() != expected {
            return Err(CryptoError::DestinationLengthMismatch { expected, actual: dst.len() });
        }

        let auth_key = one_time_key(&self.key, &mut counter);
        let (ciphertext, tag) = dst.split_at_mut(plaintext.len());
        chacha::stream_xor(&self.key, &mut counter, plaintext, ciphertext, Rounds::Twenty)?;
        tag.copy_from_slice(&authenticate(&auth_key, ciphertext, associated_data));

        Ok(())
    }

    /// Verify and decrypt `ciphertext || tag`.
    ///
    /// Returns `Ok(None)` when the message is shorter than a tag or fails
    /// authentication; nothing is decrypted in that case.
    ///
    /// # Errors
    ///
    /// - `InvalidNonceLength`: `nonce` is longer than 16 bytes
    pub fn open(
        &self,
        nonce: &[u8],
        sealed: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Option<Vec<u8>>, CryptoError> {
        let mut plaintext = vec![0u8; sealed.len().saturating_sub(TAG_SIZE)];
        let authentic = self.open_into(nonce, sealed, associated_data, &mut plaintext)?.is_some();
        Ok(authentic.then_some(plaintext))
    }

    /// Verify and decrypt into a caller-supplied buffer.
    ///
    /// `dst` must be exactly `sealed.len() - 16` bytes. On success the
    /// decrypted plaintext is returned as a borrow of `dst`.
    ///
    /// # Errors
    ///
    /// - `InvalidNonceLength`: `nonce` is longer than 16 bytes
    /// - `DestinationLengthMismatch`: `dst` has the wrong length
    pub fn open_into<'a>(
        &self,
        nonce: &[u8],
        sealed: &[u8],
        associated_data: Option<&[u8]>,
        dst: &'a mut [u8],
    ) -> Result<Option<&'a mut [u8]>, CryptoError> {
        let mut counter = counter_block(nonce)?;
        let Some(ciphertext_len) = sealed.len().checked_sub(TAG_SIZE) else {
            tracing::trace!(sealed_len = sealed.len(), "sealed message shorter than tag");
            return Ok(None);
        };
        if dst.len() != ciphertext_len {
            return Err(CryptoError::DestinationLengthMismatch {
                expected: ciphertext_len,
                actual: dst.len(),
            });
        }

        let (ciphertext, tag) = sealed.split_at(ciphertext_len);
        let auth_key = one_time_key(&self.key, &mut counter);
        let expected_tag = Zeroizing::new(authenticate(&auth_key, ciphertext, associated_data));

        if !constant_time::equal(expected_tag.as_slice(), tag) {
            tracing::trace!(
                ciphertext_len,
                associated_data_len = associated_data.map_or(0, <[u8]>::len),
                "authentication failed"
            );
            return Ok(None);
        }

        chacha::stream_xor(&self.key, &mut counter, ciphertext, dst, Rounds::Twenty)?;
        Ok(Some(dst))
    }

    /// Wipe the key. The cipher is unusable for real traffic afterwards.
    pub fn clean(&mut self) {
        self.key.zeroize();
    }
}

impl Drop for ChaCha20Poly1305 {
    fn drop(&mut self) {
        self.clean();
    }
}

fn counter_block(nonce: &[u8]) -> Result<CounterBlock, CryptoError> {
    CounterBlock::with_counter_len(nonce, COUNTER_LEN)
}

/// Derive the Poly1305 key from the keystream block at the current counter,
/// advancing the counter past it.
fn one_time_key(
    key: &[u8; chacha::KEY_SIZE],
    counter: &mut CounterBlock,
) -> Zeroizing<[u8; poly1305::KEY_SIZE]> {
    let mut auth_key = Zeroizing::new([0u8; poly1305::KEY_SIZE]);
    chacha::stream(key, counter, auth_key.as_mut_slice(), Rounds::Twenty);
    auth_key
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUNSCREEN: &[u8] = b"Ladies and Gentlemen of the class of '99: If I could offer you \
only one tip for the future, sunscreen would be it.";

    fn rfc_key() -> Vec<u8> {
        (0x80..=0x9Fu8).collect()
    }

    fn cipher() -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(&[0x42u8; 32]).unwrap()
    }

    #[test]
    fn rfc8439_aead_test_vector() {
        // RFC 8439 section 2.8.2
        let aead = ChaCha20Poly1305::new(&rfc_key()).unwrap();
        let nonce = hex::decode("070000004041424344454647").unwrap();
        let aad = hex::decode("50515253c0c1c2c3c4c5c6c7").unwrap();

        let sealed = aead.seal(&nonce, SUNSCREEN, Some(aad.as_slice())).unwrap();

        let expected_ciphertext = hex::decode(
            "d31a8d34648e60db7b86afbc53ef7ec2a4aded51296e08fea9e2b5a736ee62d6\
             3dbea45e8ca9671282fafb69da92728b1a71de0a9e060b2905d6a5b67ecd3b36\
             92ddbd7f2d778b8c9803aee328091b58fab324e4fad675945585808b4831d7bc\
             3ff4def08e4b7a9de576d26586cec64b6116",
        )
        .unwrap();
        let (ciphertext, tag) = sealed.split_at(SUNSCREEN.len());
        assert_eq!(ciphertext, expected_ciphertext.as_slice());
        assert_eq!(hex::encode(tag), "1ae10b594f09e26a7e902ecbd0600691");

        let opened = aead.open(&nonce, &sealed, Some(aad.as_slice())).unwrap();
        assert_eq!(opened.as_deref(), Some(SUNSCREEN));
    }

    #[test]
    fn wrong_key_length_rejected() {
        let result = ChaCha20Poly1305::new(&[0u8; 31]);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidKeyLength { expected: 32, actual: 31 })
        ));
    }

    #[test]
    fn sealed_length_is_plaintext_plus_tag() {
        let aead = cipher();
        for len in [0usize, 1, 15, 16, 17, 64, 65, 300] {
            let sealed = aead.seal(&[1u8; 12], &vec![0xAA; len], None).unwrap();
            assert_eq!(sealed.len(), len + TAG_SIZE);
        }
    }

    #[test]
    fn oversized_nonce_rejected_before_any_work() {
        let aead = cipher();
        let mut dst = [0xEEu8; 20];

        let result = aead.seal_into(&[0u8; 17], b"four", None, &mut dst);
        assert!(matches!(result, Err(CryptoError::InvalidNonceLength { actual: 17, .. })));
        assert_eq!(dst, [0xEEu8; 20], "destination must be untouched");

        let result = aead.open(&[0u8; 17], &[0u8; 32], None);
        assert!(matches!(result, Err(CryptoError::InvalidNonceLength { actual: 17, .. })));
    }

    #[test]
    fn seal_into_rejects_wrong_destination() {
        let aead = cipher();
        let mut dst = [0u8; 19];
        let result = aead.seal_into(&[0u8; 12], b"four", None, &mut dst);
        assert_eq!(result, Err(CryptoError::DestinationLengthMismatch { expected: 20, actual: 19 }));
    }

    #[test]
    fn open_into_rejects_wrong_destination() {
        let aead = cipher();
        let sealed = aead.seal(&[0u8; 12], b"four", None).unwrap();
        let mut dst = [0u8; 5];
        let result = aead.open_into(&[0u8; 12], &sealed, None, &mut dst);
        assert_eq!(result, Err(CryptoError::DestinationLengthMismatch { expected: 4, actual: 5 }));
    }

    #[test]
    fn short_sealed_message_is_not_authentic() {
        let aead = cipher();
        for len in 0..TAG_SIZE {
            assert_eq!(aead.open(&[0u8; 12], &vec![0u8; len], None).unwrap(), None);
        }
    }

    #[test]
    fn empty_plaintext_round_trips_as_some() {
        let aead = cipher();
        let sealed = aead.seal(&[3u8; 12], &[], Some(b"header".as_slice())).unwrap();
        assert_eq!(sealed.len(), TAG_SIZE);

        let opened = aead.open(&[3u8; 12], &sealed, Some(b"header".as_slice())).unwrap();
        assert_eq!(opened, Some(Vec::new()), "empty plaintext is distinct from failure");
    }

    #[test]
    fn associated_data_is_authenticated() {
        let aead = cipher();
        let nonce = [9u8; 12];
        let sealed = aead.seal(&nonce, b"payload", Some(b"header".as_slice())).unwrap();

        assert_eq!(aead.open(&nonce, &sealed, Some(b"headers".as_slice())).unwrap(), None);
        assert_eq!(aead.open(&nonce, &sealed, None).unwrap(), None);
    }

    #[test]
    fn absent_and_empty_associated_data_are_equivalent() {
        let aead = cipher();
        let nonce = [4u8; 12];
        let sealed = aead.seal(&nonce, b"payload", None).unwrap();
        assert_eq!(aead.seal(&nonce, b"payload", Some(&[][..])).unwrap(), sealed);
        assert!(aead.open(&nonce, &sealed, Some(&[][..])).unwrap().is_some());
    }

    #[test]
    fn failed_open_leaves_destination_untouched() {
        let aead = cipher();
        let nonce = [5u8; 12];
        let mut sealed = aead.seal(&nonce, b"secret payload", None).unwrap();
        sealed[0] ^= 1;

        let mut dst = [0u8; 14];
        assert!(aead.open_into(&nonce, &sealed, None, &mut dst).unwrap().is_none());
        assert_eq!(dst, [0u8; 14]);
    }

    #[test]
    fn short_nonce_matches_zero_padded_nonce() {
        let aead = cipher();
        let mut padded = [0u8; 12];
        padded[4..].copy_from_slice(&[7u8; 8]);

        let short = aead.seal(&[7u8; 8], b"payload", None).unwrap();
        let full = aead.seal(&padded, b"payload", None).unwrap();
        assert_eq!(short, full);
    }

    #[test]
    fn sixteen_byte_nonce_seeds_counter() {
        let aead = cipher();
        let mut nonce = [0u8; 16];
        nonce[0] = 1;
        nonce[4..].copy_from_slice(&[6u8; 12]);

        let sealed = aead.seal(&nonce, b"payload", None).unwrap();
        assert_ne!(sealed, aead.seal(&nonce[4..], b"payload", None).unwrap());
        assert_eq!(aead.open(&nonce, &sealed, None).unwrap().as_deref(), Some(&b"payload"[..]));
    }

    #[test]
    fn cleaned_cipher_no_longer_opens() {
        let mut aead = cipher();
        let sealed = aead.seal(&[0u8; 12], b"payload", None).unwrap();
        aead.clean();
        assert_eq!(aead.open(&[0u8; 12], &sealed, None).unwrap(), None);
    }
}
