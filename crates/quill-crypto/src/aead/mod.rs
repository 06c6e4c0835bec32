//! Authenticated encryption with associated data
//!
//! ChaCha20-Poly1305 as specified in RFC 8439, plus the extended-nonce
//! XChaCha20-Poly1305 variant.
//!
//! # Framing
//!
//! ```text
//! ChaCha20(key, nonce, counter = 0)  → first 32 bytes: one-time Poly1305 key
//! ChaCha20(key, nonce, counter >= 1) → XOR with plaintext: ciphertext
//!
//! Poly1305 over:
//!   aad        || zero pad to 16
//!   ciphertext || zero pad to 16
//!   len(aad) as u64 LE || len(ciphertext) as u64 LE
//!
//! sealed = ciphertext || tag (16 bytes)
//! ```
//!
//! `open` reports a forged or corrupted message as `Ok(None)` rather than an
//! error: a `None` is an authentication failure, never an empty plaintext.

pub mod chacha20poly1305;
pub mod xchacha20poly1305;

pub use self::{chacha20poly1305::ChaCha20Poly1305, xchacha20poly1305::XChaCha20Poly1305};
use crate::poly1305::{self, Poly1305};

/// Authentication tag size (16 bytes)
pub const TAG_SIZE: usize = poly1305::TAG_SIZE;

const ZERO_PAD: [u8; 16] = [0u8; 16];

fn update_padded(mac: &mut Poly1305, data: &[u8]) {
    mac.update(data);
    let partial = data.len() % 16;
    if partial > 0 {
        mac.update(&ZERO_PAD[partial..]);
    }
}

/// Compute the RFC 8439 tag over associated data and ciphertext.
fn authenticate(
    one_time_key: &[u8; poly1305::KEY_SIZE],
    ciphertext: &[u8],
    associated_data: Option<&[u8]>,
) -> [u8; TAG_SIZE] {
    let associated_data = associated_data.unwrap_or_default();
    let mut mac = Poly1305::new(one_time_key);

    update_padded(&mut mac, associated_data);
    update_padded(&mut mac, ciphertext);

    let mut lengths = [0u8; 16];
    lengths[..8].copy_from_slice(&(associated_data.len() as u64).to_le_bytes());
    lengths[8..].copy_from_slice(&(ciphertext.len() as u64).to_le_bytes());
    mac.update(&lengths);

    mac.finish()
}
