//! Poly1305 one-time authenticator (RFC 8439 section 2.5)
//!
//! Arithmetic modulo `2^130 - 5` in five 26-bit limbs. A key must
//! authenticate exactly one message; ChaCha20-Poly1305 derives a fresh one
//! per (key, nonce).

use zeroize::Zeroize;

/// One-time key size (32 bytes: clamped `r` followed by `s`)
pub const KEY_SIZE: usize = 32;

/// Tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

const BLOCK: usize = 16;
const LIMB_MASK: u32 = 0x03ff_ffff;

/// Incremental Poly1305 state.
///
/// Feed the message with [`update`](Self::update) in any chunking, then
/// consume the state with [`finish`](Self::finish). The key, accumulator and
/// pending bytes are wiped on drop.
pub struct Poly1305 {
    r: [u32; 5],
    h: [u32; 5],
    pad: [u32; 4],
    buffer: [u8; BLOCK],
    leftover: usize,
}

fn le32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

impl Poly1305 {
    /// Start authenticating under a one-time key.
    ///
    /// `r` is clamped as the algorithm requires: the top four bits of bytes
    /// 3, 7, 11, 15 and the bottom two bits of bytes 4, 8, 12 are cleared.
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        // Clamping folded into the limb masks
        let r = [
            le32(&key[0..4]) & 0x03ff_ffff,
            (le32(&key[3..7]) >> 2) & 0x03ff_ff03,
            (le32(&key[6..10]) >> 4) & 0x03ff_c0ff,
            (le32(&key[9..13]) >> 6) & 0x03f0_3fff,
            (le32(&key[12..16]) >> 8) & 0x000f_ffff,
        ];
        let pad = [le32(&key[16..20]), le32(&key[20..24]), le32(&key[24..28]), le32(&key[28..32])];

        Self { r, h: [0; 5], pad, buffer: [0; BLOCK], leftover: 0 }
    }

    /// Absorb message bytes.
    pub fn update(&mut self, mut data: &[u8]) {
        if self.leftover > 0 {
            let take = (BLOCK - self.leftover).min(data.len());
            self.buffer[self.leftover..self.leftover + take].copy_from_slice(&data[..take]);
            self.leftover += take;
            data = &data[take..];

            if self.leftover < BLOCK {
                return;
            }
            process_block(&mut self.h, &self.r, &self.buffer, 1 << 24);
            self.leftover = 0;
        }

        let mut blocks = data.chunks_exact(BLOCK);
        for block in &mut blocks {
            process_block(&mut self.h, &self.r, block, 1 << 24);
        }

        let rest = blocks.remainder();
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.leftover = rest.len();
    }

    /// Finish and return the 16-byte tag.
    pub fn finish(mut self) -> [u8; TAG_SIZE] {
        if self.leftover > 0 {
            // Final partial block: append 0x01, zero-fill, no high bit
            self.buffer[self.leftover] = 1;
            self.buffer[self.leftover + 1..].fill(0);
            process_block(&mut self.h, &self.r, &self.buffer, 0);
        }

        let [mut h0, mut h1, mut h2, mut h3, mut h4] = self.h;

        // Fully carry h
        let mut c = h1 >> 26;
        h1 &= LIMB_MASK;
        h2 += c;
        c = h2 >> 26;
        h2 &= LIMB_MASK;
        h3 += c;
        c = h3 >> 26;
        h3 &= LIMB_MASK;
        h4 += c;
        c = h4 >> 26;
        h4 &= LIMB_MASK;
        h0 += c * 5;
        c = h0 >> 26;
        h0 &= LIMB_MASK;
        h1 += c;

        // g = h + 5 - 2^130
        let mut g0 = h0 + 5;
        c = g0 >> 26;
        g0 &= LIMB_MASK;
        let mut g1 = h1 + c;
        c = g1 >> 26;
        g1 &= LIMB_MASK;
        let mut g2 = h2 + c;
        c = g2 >> 26;
        g2 &= LIMB_MASK;
        let mut g3 = h3 + c;
        c = g3 >> 26;
        g3 &= LIMB_MASK;
        let mut g4 = (h4 + c).wrapping_sub(1 << 26);

        // Select h if h < p, else g; without branching
        let mut mask = (g4 >> 31).wrapping_sub(1);
        g0 &= mask;
        g1 &= mask;
        g2 &= mask;
        g3 &= mask;
        g4 &= mask;
        mask = !mask;
        h0 = (h0 & mask) | g0;
        h1 = (h1 & mask) | g1;
        h2 = (h2 & mask) | g2;
        h3 = (h3 & mask) | g3;
        h4 = (h4 & mask) | g4;

        // h mod 2^128
        let w0 = h0 | (h1 << 26);
        let w1 = (h1 >> 6) | (h2 << 20);
        let w2 = (h2 >> 12) | (h3 << 14);
        let w3 = (h3 >> 18) | (h4 << 8);

        // tag = (h + s) mod 2^128
        let mut tag = [0u8; TAG_SIZE];
        let mut carry = 0u64;
        for ((chunk, word), pad) in tag.chunks_exact_mut(4).zip([w0, w1, w2, w3]).zip(self.pad) {
            let f = u64::from(word) + u64::from(pad) + carry;
            chunk.copy_from_slice(&(f as u32).to_le_bytes());
            carry = f >> 32;
        }

        tag
    }
}

/// Multiply the accumulator by `r` after adding one 16-byte block.
///
/// `hibit` is `1 << 24` for full blocks (the appended 2^128 bit) and 0 for
/// an already-padded final block.
fn process_block(h: &mut [u32; 5], r: &[u32; 5], block: &[u8], hibit: u32) {
    let [r0, r1, r2, r3, r4] = (*r).map(u64::from);
    let (s1, s2, s3, s4) = (r1 * 5, r2 * 5, r3 * 5, r4 * 5);

    h[0] += le32(&block[0..4]) & LIMB_MASK;
    h[1] += (le32(&block[3..7]) >> 2) & LIMB_MASK;
    h[2] += (le32(&block[6..10]) >> 4) & LIMB_MASK;
    h[3] += (le32(&block[9..13]) >> 6) & LIMB_MASK;
    h[4] += (le32(&block[12..16]) >> 8) | hibit;

    let [h0, h1, h2, h3, h4] = (*h).map(u64::from);

    let d0 = h0 * r0 + h1 * s4 + h2 * s3 + h3 * s2 + h4 * s1;
    let mut d1 = h0 * r1 + h1 * r0 + h2 * s4 + h3 * s3 + h4 * s2;
    let mut d2 = h0 * r2 + h1 * r1 + h2 * r0 + h3 * s4 + h4 * s3;
    let mut d3 = h0 * r3 + h1 * r2 + h2 * r1 + h3 * r0 + h4 * s4;
    let mut d4 = h0 * r4 + h1 * r3 + h2 * r2 + h3 * r1 + h4 * r0;

    // Partial carry back into 26-bit limbs
    let mut c = d0 >> 26;
    h[0] = (d0 as u32) & LIMB_MASK;
    d1 += c;
    c = d1 >> 26;
    h[1] = (d1 as u32) & LIMB_MASK;
    d2 += c;
    c = d2 >> 26;
    h[2] = (d2 as u32) & LIMB_MASK;
    d3 += c;
    c = d3 >> 26;
    h[3] = (d3 as u32) & LIMB_MASK;
    d4 += c;
    c = d4 >> 26;
    h[4] = (d4 as u32) & LIMB_MASK;
    h[0] += (c as u32) * 5;
    let carry = h[0] >> 26;
    h[0] &= LIMB_MASK;
    h[1] += carry;
}

impl Drop for Poly1305 {
    fn drop(&mut self) {
        self.r.zeroize();
        self.h.zeroize();
        self.pad.zeroize();
        self.buffer.zeroize();
        self.leftover = 0;
    }
}

/// Authenticate `message` under a one-time key in one call.
pub fn one_time_auth(key: &[u8; KEY_SIZE], message: &[u8]) -> [u8; TAG_SIZE] {
    let mut mac = Poly1305::new(key);
    mac.update(message);
    mac.finish()
}
