//! Fuzz target for HKDF chunked expansion
//!
//! Drives an HKDF stream with arbitrary request sizes, including requests
//! past the 255-block ceiling.
//!
//! # Invariants
//!
//! - Expansion never panics
//! - Chunked output equals one batch request of the same total
//! - A request larger than `remaining()` fails and leaves the stream intact
//! - `remaining()` decreases by exactly the bytes produced

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use quill_crypto::{CryptoError, Hkdf, Sha256};

/// Largest HKDF-SHA-256 output
const CEILING: usize = 255 * 32;

#[derive(Debug, Clone, Arbitrary)]
struct ExpandScenario {
    key: Vec<u8>,
    salt: Option<Vec<u8>>,
    info: Option<Vec<u8>>,
    requests: Vec<u16>,
}

fuzz_target!(|scenario: ExpandScenario| {
    let salt = scenario.salt.as_deref();
    let info = scenario.info.as_deref();
    let Ok(mut stream) = Hkdf::<Sha256>::new(&scenario.key, salt, info) else {
        unreachable!("SHA-256 is serializable");
    };

    let mut produced = Vec::new();
    for request in &scenario.requests {
        let request = usize::from(*request);
        let before = stream.remaining();

        match stream.expand(request) {
            Ok(bytes) => {
                assert!(request <= before, "over-request must fail");
                assert_eq!(bytes.len(), request);
                assert_eq!(stream.remaining(), before - request);
                produced.extend(bytes);
            },
            Err(CryptoError::ExpansionLimitExceeded { requested, available }) => {
                assert_eq!(requested, request);
                assert_eq!(available, before);
                assert!(request > before, "in-range request must succeed");
                assert_eq!(stream.remaining(), before, "failed request must not consume");
            },
            Err(e) => panic!("unexpected error from expand: {e}"),
        }
    }

    assert!(produced.len() <= CEILING);
    let Ok(mut batch) = Hkdf::<Sha256>::new(&scenario.key, salt, info) else {
        unreachable!("SHA-256 is serializable");
    };
    let Ok(whole) = batch.expand(produced.len()) else {
        unreachable!("total never exceeds the ceiling");
    };
    assert_eq!(produced, whole, "chunked output must equal batch output");
});
