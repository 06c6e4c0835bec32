//! HKDF (RFC 5869) over [`Hmac`]
//!
//! ```text
//! PRK  = HMAC(salt or zeros(digest_length), IKM)
//! T(0) = empty
//! T(i) = HMAC(PRK, T(i-1) || info || i)     for i in 1..=255
//! OKM  = T(1) || T(2) || ...
//! ```
//!
//! An [`Hkdf`] instance is a stream over OKM: successive [`Hkdf::expand`]
//! calls continue where the previous one stopped, so any sequence of
//! requests yields the same bytes as one request of the summed length.

use zeroize::Zeroizing;

use crate::{error::CryptoError, hash::Hash, hmac::Hmac};

/// Largest block counter; OKM is at most `255 * digest_length` bytes
const MAX_BLOCKS: usize = 255;

/// Incremental HKDF output stream.
///
/// Requires a hash with serializable state: every output block restarts the
/// keyed HMAC via [`Hmac::reset`].
pub struct Hkdf<H: Hash> {
    hmac: Hmac<H>,
    info: Option<Zeroizing<Vec<u8>>>,
    /// Most recent block `T(i)`
    buffer: Zeroizing<Vec<u8>>,
    /// Bytes of `buffer` already handed out
    position: usize,
    /// Counter byte for the next block; 256 once exhausted
    next_block: usize,
}

impl<H: Hash> Hkdf<H> {
    /// Extract a PRK from `key` and prepare to expand it.
    ///
    /// # Errors
    ///
    /// - `CapabilityUnsupported`: `H` has no serializable state
    pub fn new(key: &[u8], salt: Option<&[u8]>, info: Option<&[u8]>) -> Result<Self, CryptoError> {
        if H::default().as_serializable().is_none() {
            tracing::debug!("hkdf refused: hash lacks serializable state");
            return Err(CryptoError::CapabilityUnsupported { operation: "hkdf" });
        }

        let prk = extract::<H>(salt, key);
        let hmac = Hmac::<H>::new(&prk);
        let digest_length = hmac.digest_length();

        Ok(Self {
            hmac,
            info: info.map(|i| Zeroizing::new(i.to_vec())),
            buffer: Zeroizing::new(vec![0u8; digest_length]),
            position: digest_length,
            next_block: 1,
        })
    }

    /// Output bytes still available from this instance.
    pub fn remaining(&self) -> usize {
        let digest_length = self.buffer.len();
        let unread = digest_length - self.position;
        (MAX_BLOCKS + 1 - self.next_block) * digest_length + unread
    }

    /// Next `length` bytes of output.
    ///
    /// # Errors
    ///
    /// - `ExpansionLimitExceeded`: fewer than `length` bytes remain
    pub fn expand(&mut self, length: usize) -> Result<Vec<u8>, CryptoError> {
        let mut out = vec![0u8; length];
        self.expand_into(&mut out)?;
        Ok(out)
    }

    /// Fill `out` with the next output bytes.
    ///
    /// Fails without producing anything, and without advancing the stream,
    /// when `out` is longer than [`remaining`](Self::remaining).
    ///
    /// # Errors
    ///
    /// - `ExpansionLimitExceeded`: fewer than `out.len()` bytes remain
    pub fn expand_into(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        let available = self.remaining();
        if out.len() > available {
            tracing::warn!(requested = out.len(), available, "hkdf: cannot expand more");
            return Err(CryptoError::ExpansionLimitExceeded { requested: out.len(), available });
        }

        let mut written = 0;
        while written < out.len() {
            if self.position == self.buffer.len() {
                self.fill_buffer()?;
            }
            let take = (out.len() - written).min(self.buffer.len() - self.position);
            out[written..written + take]
                .copy_from_slice(&self.buffer[self.position..self.position + take]);
            self.position += take;
            written += take;
        }

        Ok(())
    }

    /// Compute `T(next_block)` into the buffer.
    fn fill_buffer(&mut self) -> Result<(), CryptoError> {
        self.hmac.reset()?;
        if self.next_block > 1 {
            self.hmac.update(&self.buffer);
        }
        if let Some(info) = &self.info {
            self.hmac.update(info);
        }
        self.hmac.update(&[self.next_block as u8]);
        self.hmac.finish(&mut self.buffer);

        self.next_block += 1;
        self.position = 0;
        Ok(())
    }

    /// Wipe the keyed HMAC, info and buffered output.
    ///
    /// The instance reports no remaining output afterwards.
    pub fn clean(&mut self) {
        self.hmac.clean();
        self.info = None;
        self.buffer.fill(0);
        self.position = self.buffer.len();
        self.next_block = MAX_BLOCKS + 1;
    }
}

impl<H: Hash> Drop for Hkdf<H> {
    fn drop(&mut self) {
        self.clean();
    }
}

/// HKDF-Extract: the pseudorandom key for `key` under `salt`.
///
/// A missing salt is a string of `digest_length` zero bytes.
pub fn extract<H: Hash>(salt: Option<&[u8]>, key: &[u8]) -> Zeroizing<Vec<u8>> {
    let zeros;
    let salt = match salt {
        Some(salt) => salt,
        None => {
            zeros = vec![0u8; H::default().digest_length()];
            zeros.as_slice()
        },
    };

    let mut hmac = Hmac::<H>::new(salt);
    hmac.update(key);
    Zeroizing::new(hmac.digest())
}

/// Derive `length` bytes from `key`, `salt` and `info` in one call.
///
/// # Errors
///
/// - `CapabilityUnsupported`: `H` has no serializable state
/// - `ExpansionLimitExceeded`: `length` exceeds `255 * digest_length`
pub fn hkdf<H: Hash>(
    key: &[u8],
    salt: Option<&[u8]>,
    info: Option<&[u8]>,
    length: usize,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let mut kdf = Hkdf::<H>::new(key, salt, info)?;
    kdf.expand(length).map(Zeroizing::new)
}
