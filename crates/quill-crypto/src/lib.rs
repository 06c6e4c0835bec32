//! Quill Symmetric Cryptography
//!
//! Symmetric primitives for Quill: the ChaCha20 stream cipher, the Poly1305
//! one-time authenticator, their ChaCha20-Poly1305 AEAD composition, HMAC
//! over a pluggable hash and HKDF on top of it. Everything is synchronous
//! and in-memory; randomness is always injected by the caller.
//!
//! # Layering
//!
//! ```text
//! constant_time ─────────────┐
//!                            ▼
//! chacha ──► poly1305 ──► aead (ChaCha20-Poly1305, XChaCha20-Poly1305)
//!
//! hash (Sha256, Sha512, DigestHash) ──► hmac ──► hkdf
//!
//! random (SystemRandom, RngSource) ──► callers (keys, nonces)
//! ```
//!
//! # Security
//!
//! Nonces:
//! - A (key, nonce) pair must never seal two messages; nothing here can
//!   detect reuse
//! - `XChaCha20Poly1305` nonces are large enough to draw at random
//!
//! Verification:
//! - Tags and digests are compared only through [`constant_time::equal`]
//! - `open` returns `Ok(None)` on a forged message and never decrypts it
//!
//! Secret hygiene:
//! - Keys, one-time MAC keys, keystream blocks and hash states are wiped on
//!   drop; long-lived objects also expose `clean()`
//! - Parameter errors are raised before any secret material is produced

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aead;
pub mod chacha;
pub mod constant_time;
pub mod error;
pub mod hash;
pub mod hkdf;
pub mod hmac;
pub mod poly1305;
pub mod random;

pub use aead::{ChaCha20Poly1305, XChaCha20Poly1305};
pub use error::CryptoError;
pub use hash::{DigestHash, Hash, SavedHashState, SerializableHash, Sha256, Sha512};
pub use hkdf::Hkdf;
pub use hmac::Hmac;
pub use random::{RandomSource, RngSource, SystemRandom};
