//! Injected sources of cryptographically secure randomness.
//!
//! Nothing in this crate reaches for a process-wide generator. Code that needs
//! random bytes takes a [`RandomSource`]: [`SystemRandom`] in production, an
//! [`RngSource`] over a seeded CSPRNG for deterministic tests.

use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;

/// Default charset for [`RandomSource::random_string`].
pub const ALPHANUMERIC: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Smallest charset accepted by the random-string helpers
const MIN_CHARSET_LEN: usize = 2;

/// Largest charset accepted: one random byte must be able to index it
const MAX_CHARSET_LEN: usize = 256;

/// A source of cryptographically secure random bytes.
///
/// # Invariants
///
/// - `fill_bytes` either fills the whole buffer or returns an error
/// - Production implementations draw from a CSPRNG
pub trait RandomSource {
    /// Fills `buffer` with random bytes.
    fn fill_bytes(&mut self, buffer: &mut [u8]) -> Result<(), CryptoError>;

    /// Returns exactly `length` random bytes.
    fn random_bytes(&mut self, length: usize) -> Result<Vec<u8>, CryptoError> {
        let mut out = vec![0u8; length];
        self.fill_bytes(&mut out)?;
        Ok(out)
    }

    /// Returns a random `u32` read little-endian from 4 random bytes.
    fn random_u32(&mut self) -> Result<u32, CryptoError> {
        let mut bytes = Zeroizing::new([0u8; 4]);
        self.fill_bytes(bytes.as_mut_slice())?;
        Ok(u32::from_le_bytes(*bytes))
    }

    /// Returns a string of `length` characters drawn uniformly from `charset`.
    ///
    /// Uses rejection sampling: random bytes at or above the largest multiple
    /// of the charset size are discarded, so every character is equally
    /// likely. The charset is validated before any byte is drawn.
    fn random_string(&mut self, length: usize, charset: &str) -> Result<String, CryptoError> {
        let chars = validate_charset(charset)?;
        let charset_len = chars.len();
        let max_byte = MAX_CHARSET_LEN - (MAX_CHARSET_LEN % charset_len);

        let mut out = String::with_capacity(length);
        let mut remaining = length;
        while remaining > 0 {
            // Expected number of bytes needed, accounting for rejections
            let draw = (remaining * MAX_CHARSET_LEN).div_ceil(max_byte);
            let mut buffer = Zeroizing::new(vec![0u8; draw]);
            self.fill_bytes(&mut buffer)?;

            for &byte in buffer.iter() {
                if remaining == 0 {
                    break;
                }
                let byte = usize::from(byte);
                if byte < max_byte {
                    out.push(chars[byte % charset_len]);
                    remaining -= 1;
                }
            }
        }

        Ok(out)
    }

    /// Returns the shortest random string over `charset` carrying at least
    /// `bits` bits of entropy.
    fn random_string_for_entropy(
        &mut self,
        bits: usize,
        charset: &str,
    ) -> Result<String, CryptoError> {
        let chars = validate_charset(charset)?;
        let bits_per_char = (chars.len() as f64).log2();
        let length = (bits as f64 / bits_per_char).ceil() as usize;
        self.random_string(length, charset)
    }
}

fn validate_charset(charset: &str) -> Result<Vec<char>, CryptoError> {
    let chars: Vec<char> = charset.chars().collect();
    if !(MIN_CHARSET_LEN..=MAX_CHARSET_LEN).contains(&chars.len()) {
        return Err(CryptoError::InvalidCharset { length: chars.len() });
    }
    Ok(chars)
}

/// Random source backed by the operating system CSPRNG (getrandom).
///
/// The OS generator is probed once at construction, so an environment
/// without usable entropy is reported up front instead of on first use.
#[derive(Debug, Clone, Copy)]
pub struct SystemRandom {
    _probed: (),
}

impl SystemRandom {
    /// Probe the OS random source.
    ///
    /// # Errors
    ///
    /// - `RandomSourceUnavailable`: the platform offers no working CSPRNG
    pub fn new() -> Result<Self, CryptoError> {
        let mut probe = [0u8; 16];
        let result = getrandom::fill(&mut probe);
        probe.zeroize();

        match result {
            Ok(()) => {
                tracing::debug!("OS random source ready");
                Ok(Self { _probed: () })
            },
            Err(e) => {
                tracing::error!(error = %e, "OS random source unavailable");
                Err(CryptoError::RandomSourceUnavailable { reason: e.to_string() })
            },
        }
    }
}

impl RandomSource for SystemRandom {
    fn fill_bytes(&mut self, buffer: &mut [u8]) -> Result<(), CryptoError> {
        getrandom::fill(buffer)
            .map_err(|e| CryptoError::RandomSourceUnavailable { reason: e.to_string() })
    }
}

/// Adapter exposing any `rand` CSPRNG as a [`RandomSource`].
///
/// Intended for seeded generators (e.g. `ChaCha20Rng`) in deterministic
/// tests and simulations.
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: RngCore + CryptoRng> RngSource<R> {
    /// Wrap a CSPRNG.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Unwrap the generator.
    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl<R: RngCore + CryptoRng> RandomSource for RngSource<R> {
    fn fill_bytes(&mut self, buffer: &mut [u8]) -> Result<(), CryptoError> {
        self.rng
            .try_fill_bytes(buffer)
            .map_err(|e| CryptoError::RandomSourceUnavailable { reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed byte sequence, cycling when exhausted.
    struct ScriptedSource {
        bytes: Vec<u8>,
        position: usize,
        draws: usize,
    }

    impl ScriptedSource {
        fn new(bytes: &[u8]) -> Self {
            Self { bytes: bytes.to_vec(), position: 0, draws: 0 }
        }
    }

    impl RandomSource for ScriptedSource {
        fn fill_bytes(&mut self, buffer: &mut [u8]) -> Result<(), CryptoError> {
            self.draws += 1;
            for byte in buffer.iter_mut() {
                *byte = self.bytes[self.position % self.bytes.len()];
                self.position += 1;
            }
            Ok(())
        }
    }

    #[test]
    fn random_bytes_has_requested_length() {
        let mut source = ScriptedSource::new(&[7]);
        assert_eq!(source.random_bytes(0).unwrap().len(), 0);
        assert_eq!(source.random_bytes(33).unwrap(), vec![7u8; 33]);
    }

    #[test]
    fn random_u32_is_little_endian() {
        let mut source = ScriptedSource::new(&[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(source.random_u32().unwrap(), 0x0403_0201);
    }

    #[test]
    fn random_string_rejects_biased_bytes() {
        // Charset of 10: bytes >= 250 must be skipped
        let mut source = ScriptedSource::new(&[250, 255, 3, 251, 12]);
        let s = source.random_string(2, "0123456789").unwrap();
        assert_eq!(s, "32");
    }

    #[test]
    fn random_string_uses_every_byte_when_charset_divides_256() {
        let mut source = ScriptedSource::new(&[0, 1, 2, 255]);
        let s = source.random_string(4, "ab").unwrap();
        assert_eq!(s, "abab");
    }

    #[test]
    fn random_string_zero_length_draws_nothing() {
        let mut source = ScriptedSource::new(&[0]);
        assert_eq!(source.random_string(0, ALPHANUMERIC).unwrap(), "");
        assert_eq!(source.draws, 0);
    }

    #[test]
    fn invalid_charset_fails_before_drawing() {
        let mut source = ScriptedSource::new(&[0]);

        let result = source.random_string(8, "a");
        assert_eq!(result, Err(CryptoError::InvalidCharset { length: 1 }));

        let huge: String = (0..257u32).filter_map(|i| char::from_u32(0x100 + i)).collect();
        let result = source.random_string(8, &huge);
        assert_eq!(result, Err(CryptoError::InvalidCharset { length: 257 }));

        let result = source.random_string_for_entropy(128, "");
        assert_eq!(result, Err(CryptoError::InvalidCharset { length: 0 }));

        assert_eq!(source.draws, 0, "validation must precede any draw");
    }

    #[test]
    fn full_byte_charset_is_accepted() {
        let charset: String = (0..256u32).filter_map(|i| char::from_u32(0x100 + i)).collect();
        let mut source = ScriptedSource::new(&[0, 255]);
        let s = source.random_string(2, &charset).unwrap();
        assert_eq!(s.chars().count(), 2);
    }

    #[test]
    fn entropy_length_is_minimal() {
        let mut source = ScriptedSource::new(&[1]);

        // log2(62) ~ 5.954, so 128 bits need 22 characters
        let s = source.random_string_for_entropy(128, ALPHANUMERIC).unwrap();
        assert_eq!(s.chars().count(), 22);

        // Binary charset: one bit per character
        let s = source.random_string_for_entropy(10, "01").unwrap();
        assert_eq!(s.len(), 10);

        let s = source.random_string_for_entropy(0, ALPHANUMERIC).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn multibyte_charset_characters_are_preserved() {
        let mut source = ScriptedSource::new(&[0, 1, 2]);
        let s = source.random_string(3, "αβγδ").unwrap();
        assert_eq!(s, "αβγ");
    }

    #[test]
    fn system_random_fills_buffer() {
        let mut source = SystemRandom::new().unwrap();

        let mut bytes1 = [0u8; 32];
        let mut bytes2 = [0u8; 32];
        source.fill_bytes(&mut bytes1).unwrap();
        source.fill_bytes(&mut bytes2).unwrap();

        // Extremely unlikely to be equal if random
        assert_ne!(bytes1, bytes2, "random bytes should differ");
    }
}
