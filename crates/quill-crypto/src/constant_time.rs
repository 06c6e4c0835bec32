//! Constant-time selection and comparison
//!
//! Every secret comparison in this crate (tags, digests) goes through
//! [`equal`]. None of these functions branch on their inputs' values.

use std::hint::black_box;

/// Select `if_one` when `subject` is 1 and `if_zero` when it is 0.
///
/// `subject` must be exactly 0 or 1; any other value produces a mix of both
/// operands.
pub fn select(subject: u32, if_one: u32, if_zero: u32) -> u32 {
    let mask = subject.wrapping_sub(1);
    (!mask & if_one) | (mask & if_zero)
}

/// Returns 1 if `a <= b`, otherwise 0.
///
/// Both inputs must be below `2^31`.
pub fn less_or_equal(a: u32, b: u32) -> u32 {
    (a.wrapping_sub(b).wrapping_sub(1) >> 31) & 1
}

/// Returns 1 if the slices hold the same bytes, otherwise 0.
///
/// Slices of different length compare unequal immediately; lengths are not
/// secret. Two empty slices compare equal.
pub fn compare(a: &[u8], b: &[u8]) -> u8 {
    if a.len() != b.len() {
        return 0;
    }

    let mut accumulator = 0u8;
    for (x, y) in a.iter().zip(b) {
        accumulator = black_box(accumulator | (x ^ y));
    }

    (1 & (u32::from(accumulator).wrapping_sub(1) >> 8)) as u8
}

/// Returns true if the slices are non-empty and hold the same bytes.
///
/// Unlike [`compare`], two empty slices are NOT equal: comparing an empty
/// tag or digest is never a meaningful verification.
pub fn equal(a: &[u8], b: &[u8]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    compare(a, b) != 0
}
