//! HMAC (RFC 2104) over any [`Hash`]
//!
//! ```text
//! K' = H(K) if len(K) > block_size, else K; zero-padded to block_size
//! HMAC(K, m) = H((K' ^ opad) || H((K' ^ ipad) || m))
//! ```
//!
//! With a [`SerializableHash`] the keyed inner and outer states are
//! snapshotted at construction, making [`Hmac::reset`] a state restore
//! instead of a second key schedule.

use zeroize::Zeroizing;

pub use crate::constant_time::equal;
use crate::{
    error::CryptoError,
    hash::{Hash, SavedHashState, SerializableHash},
};

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// Keyed snapshots are gone after `clean`
const CLEANED: CryptoError = CryptoError::InvalidSavedState { reason: "hmac cleaned" };

/// Keyed HMAC instance.
pub struct Hmac<H: Hash> {
    inner: H,
    outer: H,
    inner_keyed: Option<SavedHashState>,
    outer_keyed: Option<SavedHashState>,
    finished: bool,
}

impl<H: Hash> Hmac<H> {
    /// Run the key schedule for `key`.
    pub fn new(key: &[u8]) -> Self {
        let mut inner = H::default();
        let mut outer = H::default();
        let block_size = inner.block_size();

        let mut pad = Zeroizing::new(vec![0u8; block_size]);
        if key.len() > block_size {
            let mut key_hash = H::default();
            key_hash.update(key);
            key_hash.finish(&mut pad);
            key_hash.clean();
        } else {
            pad[..key.len()].copy_from_slice(key);
        }

        for byte in pad.iter_mut() {
            *byte ^= IPAD;
        }
        inner.update(&pad);

        // Undo ipad, apply opad
        for byte in pad.iter_mut() {
            *byte ^= IPAD ^ OPAD;
        }
        outer.update(&pad);

        let inner_keyed = inner.as_serializable().and_then(|s| s.save_state().ok());
        let outer_keyed = outer.as_serializable().and_then(|s| s.save_state().ok());

        Self { inner, outer, inner_keyed, outer_keyed, finished: false }
    }

    /// Digest size of the underlying hash.
    pub fn digest_length(&self) -> usize {
        self.inner.digest_length()
    }

    /// Block size of the underlying hash.
    pub fn block_size(&self) -> usize {
        self.inner.block_size()
    }

    /// Absorb message data. Ignored once finished, until [`reset`](Self::reset).
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Write the MAC into `out[..digest_length]`.
    ///
    /// Repeated calls return the same MAC.
    ///
    /// # Panics
    ///
    /// If `out` is shorter than [`digest_length`](Self::digest_length).
    pub fn finish(&mut self, out: &mut [u8]) {
        if !self.finished {
            let mut inner_digest = Zeroizing::new(vec![0u8; self.inner.digest_length()]);
            self.inner.finish(&mut inner_digest);
            self.outer.update(&inner_digest);
            self.finished = true;
        }
        self.outer.finish(out);
    }

    /// Finish and return the MAC as a fresh vector.
    pub fn digest(&mut self) -> Vec<u8> {
        let mut out = vec![0u8; self.digest_length()];
        self.finish(&mut out);
        out
    }

    /// Return to the keyed state for a new message under the same key.
    ///
    /// # Errors
    ///
    /// - `CapabilityUnsupported`: the hash has no serializable state
    /// - `InvalidSavedState`: the instance was cleaned
    pub fn reset(&mut self) -> Result<(), CryptoError> {
        let inner = serializable_mut(&mut self.inner, "hmac reset")?;
        let (Some(inner_keyed), Some(outer_keyed)) = (&self.inner_keyed, &self.outer_keyed) else {
            return Err(CLEANED);
        };
        inner.restore_state(inner_keyed)?;
        serializable_mut(&mut self.outer, "hmac reset")?.restore_state(outer_keyed)?;
        self.finished = false;
        Ok(())
    }

    /// Snapshot the inner hash, e.g. after absorbing a common prefix.
    ///
    /// # Errors
    ///
    /// - `CapabilityUnsupported`: the hash has no serializable state
    /// - `InvalidSavedState`: the MAC is already finished
    pub fn save_state(&self) -> Result<SavedHashState, CryptoError> {
        let Some(inner) = self.inner.as_serializable() else {
            return Err(refuse("hmac save_state"));
        };
        inner.save_state()
    }

    /// Resume from a [`save_state`](Self::save_state) snapshot. The outer
    /// hash returns to its keyed state.
    ///
    /// # Errors
    ///
    /// - `CapabilityUnsupported`: the hash has no serializable state
    /// - `InvalidSavedState`: the snapshot does not belong to this hash, or
    ///   the instance was cleaned
    pub fn restore_state(&mut self, state: &SavedHashState) -> Result<(), CryptoError> {
        let inner = serializable_mut(&mut self.inner, "hmac restore_state")?;
        let Some(outer_keyed) = &self.outer_keyed else {
            return Err(CLEANED);
        };
        inner.restore_state(state)?;
        serializable_mut(&mut self.outer, "hmac restore_state")?.restore_state(outer_keyed)?;
        self.finished = false;
        Ok(())
    }

    /// Wipe a snapshot taken by [`save_state`](Self::save_state).
    pub fn clean_saved_state(&self, state: &mut SavedHashState) {
        match self.inner.as_serializable() {
            Some(inner) => inner.clean_saved_state(state),
            None => state.clean(),
        }
    }

    /// Wipe both hash states and the keyed snapshots.
    ///
    /// The instance no longer carries its key afterwards: `reset` and
    /// `restore_state` fail, and any further MAC is computed without the key
    /// and must not be used.
    pub fn clean(&mut self) {
        self.inner.clean();
        self.outer.clean();
        // Dropped snapshots wipe themselves
        self.inner_keyed = None;
        self.outer_keyed = None;
        self.finished = false;
    }
}

impl<H: Hash> Drop for Hmac<H> {
    fn drop(&mut self) {
        self.clean();
    }
}

fn refuse(operation: &'static str) -> CryptoError {
    tracing::debug!(operation, "hash lacks serializable state");
    CryptoError::CapabilityUnsupported { operation }
}

fn serializable_mut<'a, H: Hash>(
    hash: &'a mut H,
    operation: &'static str,
) -> Result<&'a mut dyn SerializableHash, CryptoError> {
    hash.as_serializable_mut().ok_or_else(|| refuse(operation))
}

/// HMAC of `data` under `key` in one call.
pub fn hmac<H: Hash>(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<H>::new(key);
    mac.update(data);
    mac.digest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{DigestHash, Sha256, Sha512};

    #[test]
    fn rfc4231_case_1() {
        let key = [0x0bu8; 20];
        assert_eq!(
            hex::encode(hmac::<Sha256>(&key, b"Hi There")),
            "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7"
        );
    }

    #[test]
    fn rfc4231_case_2_short_key() {
        let mac = hmac::<Sha512>(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            hex::encode(mac),
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea250554\
             9758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }

    #[test]
    fn long_key_is_hashed_first() {
        // RFC 4231 case 6: 131-byte key
        let key = [0xaau8; 131];
        let mac = hmac::<Sha256>(&key, b"Test Using Larger Than Block-Size Key - Hash Key First");
        assert_eq!(
            hex::encode(mac),
            "60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54"
        );
    }

    #[test]
    fn repeated_finish_returns_cached_mac() {
        let mut mac = Hmac::<Sha256>::new(b"key");
        mac.update(b"message");
        let first = mac.digest();
        mac.update(b"more");
        assert_eq!(mac.digest(), first);
    }

    #[test]
    fn reset_reuses_key_schedule() {
        let mut mac = Hmac::<Sha256>::new(b"key");
        mac.update(b"first message");
        let _ = mac.digest();

        mac.reset().unwrap();
        mac.update(b"second message");
        assert_eq!(mac.digest(), hmac::<Sha256>(b"key", b"second message"));
    }

    #[test]
    fn saved_prefix_state_resumes() {
        let mut mac = Hmac::<Sha256>::new(b"key");
        mac.update(b"shared prefix ");
        let mut prefix = mac.save_state().unwrap();

        mac.update(b"suffix one");
        let one = mac.digest();

        mac.restore_state(&prefix).unwrap();
        mac.update(b"suffix one");
        assert_eq!(mac.digest(), one);
        assert_eq!(one, hmac::<Sha256>(b"key", b"shared prefix suffix one"));

        mac.clean_saved_state(&mut prefix);
        assert!(prefix.chaining().iter().all(|&b| b == 0));
    }

    #[test]
    fn opaque_hash_refuses_state_operations() {
        let mut mac = Hmac::<DigestHash<sha2::Sha256>>::new(b"key");
        mac.update(b"message");

        assert_eq!(mac.reset(), Err(CryptoError::CapabilityUnsupported { operation: "hmac reset" }));
        assert!(matches!(mac.save_state(), Err(CryptoError::CapabilityUnsupported { .. })));

        // The MAC itself is unaffected by the capability gap
        assert_eq!(mac.digest(), hmac::<Sha256>(b"key", b"message"));
    }

    #[test]
    fn cleaned_instance_refuses_rewind() {
        let mut mac = Hmac::<Sha256>::new(b"key");
        mac.update(b"message");
        let saved = mac.save_state().unwrap();
        mac.clean();

        let cleaned = CryptoError::InvalidSavedState { reason: "hmac cleaned" };
        assert_eq!(mac.reset(), Err(cleaned.clone()));
        assert_eq!(mac.restore_state(&saved), Err(cleaned));
    }

    #[test]
    fn opaque_hash_reports_capability_after_clean() {
        let mut mac = Hmac::<DigestHash<sha2::Sha256>>::new(b"key");
        mac.clean();
        assert_eq!(mac.reset(), Err(CryptoError::CapabilityUnsupported { operation: "hmac reset" }));
    }

    #[test]
    fn equal_compares_macs() {
        let a = hmac::<Sha256>(b"key", b"message");
        let b = hmac::<Sha256>(b"key", b"message");
        let c = hmac::<Sha256>(b"key", b"messagf");
        assert!(equal(&a, &b));
        assert!(!equal(&a, &c));
    }
}
