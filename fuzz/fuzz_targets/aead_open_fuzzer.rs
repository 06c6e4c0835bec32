//! Fuzz target for AEAD open on hostile input
//!
//! Feeds attacker-controlled sealed messages, nonces and associated data to
//! both AEAD constructions.
//!
//! # Strategy
//!
//! - Arbitrary sealed bytes (shorter than a tag, exact tag, long)
//! - Nonces of every length, valid and invalid
//! - Genuine messages with a single mutation applied
//!
//! # Invariants
//!
//! - `open` never panics
//! - Oversized nonces are rejected, never silently accepted
//! - Messages shorter than a tag are never authentic
//! - A genuine message round-trips; any mutation of it is rejected

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use quill_crypto::{ChaCha20Poly1305, CryptoError, XChaCha20Poly1305};

#[derive(Debug, Clone, Arbitrary)]
struct AeadScenario {
    key: [u8; 32],
    nonce: Vec<u8>,
    sealed: Vec<u8>,
    associated_data: Option<Vec<u8>>,
    plaintext: Vec<u8>,
    mutation: Mutation,
}

#[derive(Debug, Clone, Arbitrary)]
enum Mutation {
    /// Flip one bit at a position (taken modulo the length)
    FlipBit { position: u16, bit: u8 },
    /// Drop the last byte
    Truncate,
    /// Append a byte
    Extend(u8),
    /// Open under different associated data
    ChangeAssociatedData(Vec<u8>),
}

fuzz_target!(|scenario: AeadScenario| {
    let aad = scenario.associated_data.as_deref();

    let aead = match ChaCha20Poly1305::new(&scenario.key) {
        Ok(aead) => aead,
        Err(_) => unreachable!("32-byte key is always valid"),
    };

    // INVARIANT 1: hostile input never panics, and nonce validation is exact
    match aead.open(&scenario.nonce, &scenario.sealed, aad) {
        Ok(opened) => {
            assert!(scenario.nonce.len() <= 16, "oversized nonce must be rejected");
            if scenario.sealed.len() < ChaCha20Poly1305::TAG_SIZE {
                assert!(opened.is_none(), "message shorter than a tag cannot be authentic");
            }
        },
        Err(CryptoError::InvalidNonceLength { actual, .. }) => {
            assert!(actual > 16, "valid nonce length rejected");
        },
        Err(e) => panic!("unexpected error from open: {e}"),
    }

    let xaead = match XChaCha20Poly1305::new(&scenario.key) {
        Ok(xaead) => xaead,
        Err(_) => unreachable!("32-byte key is always valid"),
    };
    match xaead.open(&scenario.nonce, &scenario.sealed, aad) {
        Ok(_) => assert_eq!(scenario.nonce.len(), 24, "only 24-byte nonces are accepted"),
        Err(CryptoError::InvalidNonceLength { actual, .. }) => assert_ne!(actual, 24),
        Err(e) => panic!("unexpected error from open: {e}"),
    }

    // INVARIANT 2: genuine messages round-trip
    let nonce = [0x5Au8; 12];
    let Ok(sealed) = aead.seal(&nonce, &scenario.plaintext, aad) else {
        unreachable!("12-byte nonce is always valid");
    };
    assert_eq!(sealed.len(), scenario.plaintext.len() + ChaCha20Poly1305::TAG_SIZE);
    let opened = aead.open(&nonce, &sealed, aad);
    assert_eq!(opened, Ok(Some(scenario.plaintext.clone())), "round trip must succeed");

    // INVARIANT 3: any mutation is rejected
    let mut forged = sealed;
    let mut forged_aad = scenario.associated_data.clone();
    match scenario.mutation {
        Mutation::FlipBit { position, bit } => {
            let index = usize::from(position) % forged.len();
            forged[index] ^= 1 << (bit % 8);
        },
        Mutation::Truncate => {
            forged.pop();
        },
        Mutation::Extend(byte) => forged.push(byte),
        Mutation::ChangeAssociatedData(other) => {
            if other.as_slice() == aad.unwrap_or_default() {
                return;
            }
            forged_aad = Some(other);
        },
    }
    let result = aead.open(&nonce, &forged, forged_aad.as_deref());
    assert_eq!(result, Ok(None), "mutated message must not authenticate");
});
