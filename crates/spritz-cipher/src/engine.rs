//! The sponge engine
//!
//! State is a permutation `s` of the 256 byte values plus the registers
//! `i, j, k, z, a, w`. Input is absorbed a nibble at a time into the low
//! half of the permutation; once 128 nibbles have gone in, or the first
//! output is requested, the whole state is re-mixed (`shuffle`) before any
//! keystream byte is produced.
//!
//! Invariants:
//! - `s` is always a permutation of 0..=255 (only swaps touch it)
//! - `w` is always odd, so `i` steps through all 256 positions
//! - `a` stays in 0..=128 and is reset to 0 by every shuffle

use std::io::Read;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Half the state; nibbles are swapped against `s[128..144]`.
const NIBBLE_REGION: u8 = 128;

/// `update` steps per whip.
const WHIP_ROUNDS: usize = 512;

const READ_CHUNK: usize = 4096;

/// A sponge-construction stream cipher instance.
///
/// Every container owns its own engines; nothing is shared between
/// instances, so separate engines can be driven from separate threads.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Spritz {
    s: [u8; 256],
    i: u8,
    j: u8,
    k: u8,
    z: u8,
    a: u8,
    w: u8,
}

impl Spritz {
    pub fn new() -> Self {
        let mut engine = Self {
            s: [0u8; 256],
            i: 0,
            j: 0,
            k: 0,
            z: 0,
            a: 0,
            w: 1,
        };
        engine.reset();
        engine
    }

    /// Return to the freshly constructed state so one allocation can serve
    /// many independent derivations.
    pub fn reset(&mut self) {
        for (n, slot) in self.s.iter_mut().enumerate() {
            *slot = n as u8;
        }
        self.i = 0;
        self.j = 0;
        self.k = 0;
        self.z = 0;
        self.a = 0;
        self.w = 1;
    }

    /// Absorb one byte, low nibble first.
    pub fn absorb(&mut self, b: u8) {
        self.absorb_nibble(b & 0x0f);
        self.absorb_nibble(b >> 4);
    }

    pub fn absorb_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.absorb(b);
        }
    }

    /// Absorb everything `reader` yields until end of stream.
    ///
    /// Equivalent to `absorb_bytes` over the concatenated contents; how the
    /// reader splits its output does not matter.
    pub fn absorb_reader<R: Read>(&mut self, mut reader: R) -> std::io::Result<u64> {
        let mut buf = [0u8; READ_CHUNK];
        let mut total = 0u64;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            self.absorb_bytes(&buf[..n]);
            total += n as u64;
        }
        buf.zeroize();
        Ok(total)
    }

    /// Separator between absorbed sources: consumes one nibble slot
    /// without swapping anything.
    pub fn absorb_stop(&mut self) {
        if self.a == NIBBLE_REGION {
            self.shuffle();
        }
        self.a += 1;
    }

    /// One keystream byte.
    pub fn drip(&mut self) -> u8 {
        self.finish_absorb();
        self.drip_one()
    }

    /// `n` keystream bytes.
    pub fn squeeze(&mut self, n: usize) -> Vec<u8> {
        let mut out = vec![0u8; n];
        self.squeeze_into(&mut out);
        out
    }

    /// Overwrite `out` with keystream.
    pub fn squeeze_into(&mut self, out: &mut [u8]) {
        self.finish_absorb();
        for slot in out.iter_mut() {
            *slot = self.drip_one();
        }
    }

    /// XOR keystream into `buf` in place. Encryption and decryption are the
    /// same call at the same keystream position.
    pub fn squeeze_xor(&mut self, buf: &mut [u8]) {
        self.finish_absorb();
        for slot in buf.iter_mut() {
            *slot ^= self.drip_one();
        }
    }

    /// Advance the keystream by `n` bytes, discarding them.
    pub fn skip(&mut self, n: u64) {
        self.finish_absorb();
        for _ in 0..n {
            self.drip_one();
        }
    }

    fn finish_absorb(&mut self) {
        if self.a > 0 {
            self.shuffle();
        }
    }

    fn absorb_nibble(&mut self, x: u8) {
        if self.a == NIBBLE_REGION {
            self.shuffle();
        }
        self.s.swap(self.a as usize, (NIBBLE_REGION + x) as usize);
        self.a += 1;
    }

    fn shuffle(&mut self) {
        self.whip(WHIP_ROUNDS);
        self.crush();
        self.whip(WHIP_ROUNDS);
        self.crush();
        self.whip(WHIP_ROUNDS);
        self.a = 0;
    }

    fn whip(&mut self, rounds: usize) {
        self.update(rounds);
        // odd strides are exactly the ones coprime with 256
        loop {
            self.w = self.w.wrapping_add(1);
            if self.w & 1 == 1 {
                break;
            }
        }
    }

    fn crush(&mut self) {
        for v in 0..128usize {
            if self.s[v] > self.s[255 - v] {
                self.s.swap(v, 255 - v);
            }
        }
    }

    fn update(&mut self, times: usize) {
        let (mut i, mut j, mut k) = (self.i, self.j, self.k);
        let w = self.w;

        for _ in 0..times {
            i = i.wrapping_add(w);
            let si = self.s[i as usize];
            j = k.wrapping_add(self.s[j.wrapping_add(si) as usize]);
            let sj = self.s[j as usize];
            k = i.wrapping_add(k).wrapping_add(sj);
            self.s[i as usize] = sj;
            self.s[j as usize] = si;
        }

        self.i = i;
        self.j = j;
        self.k = k;
    }

    fn drip_one(&mut self) -> u8 {
        self.update(1);
        let step1 = self.s[self.z.wrapping_add(self.k) as usize];
        let step2 = self.s[self.i.wrapping_add(step1) as usize];
        self.z = self.s[self.j.wrapping_add(step2) as usize];
        self.z
    }
}

impl Default for Spritz {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Spritz {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spritz")
            .field("state", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn is_permutation(s: &[u8; 256]) -> bool {
        let mut seen = [false; 256];
        for &v in s.iter() {
            if seen[v as usize] {
                return false;
            }
            seen[v as usize] = true;
        }
        true
    }

    #[test]
    fn test_fresh_state() {
        let engine = Spritz::new();
        assert!(engine.s.iter().enumerate().all(|(n, &v)| v == n as u8));
        assert_eq!((engine.i, engine.j, engine.k, engine.z, engine.a), (0, 0, 0, 0, 0));
        assert_eq!(engine.w, 1);
    }

    #[test]
    fn test_reset_matches_fresh_engine() {
        let mut reused = Spritz::new();
        reused.absorb_bytes(b"some earlier key material");
        reused.absorb_stop();
        let _ = reused.squeeze(300);
        reused.reset();

        let mut fresh = Spritz::new();
        for engine in [&mut reused, &mut fresh] {
            engine.absorb_bytes(b"key");
            engine.absorb_stop();
            engine.absorb_bytes(b"iv");
        }
        assert_eq!(reused.squeeze(64), fresh.squeeze(64));
    }

    #[test]
    fn test_skip_then_drip_matches_squeeze() {
        for n in [0u64, 1, 17, 255, 2048] {
            let mut skipped = Spritz::new();
            skipped.absorb_bytes(b"payload key");
            skipped.skip(n);
            let byte = skipped.drip();

            let mut squeezed = Spritz::new();
            squeezed.absorb_bytes(b"payload key");
            let out = squeezed.squeeze(n as usize + 1);

            assert_eq!(byte, out[n as usize], "skip({n}) must not alter the keystream");
        }
    }

    #[test]
    fn test_squeeze_xor_is_its_own_inverse() {
        let plaintext = b"attack at dawn".to_vec();

        let mut enc = Spritz::new();
        enc.absorb_bytes(b"k");
        let mut buf = plaintext.clone();
        enc.squeeze_xor(&mut buf);
        assert_ne!(buf, plaintext);

        let mut dec = Spritz::new();
        dec.absorb_bytes(b"k");
        dec.squeeze_xor(&mut buf);
        assert_eq!(buf, plaintext);
    }

    #[test]
    fn test_squeeze_xor_on_subrange() {
        let mut whole = Spritz::new();
        whole.absorb(7);
        let stream = whole.squeeze(4);

        let mut ranged = Spritz::new();
        ranged.absorb(7);
        let mut buf = [0u8; 10];
        ranged.squeeze_xor(&mut buf[3..7]);
        assert_eq!(&buf[3..7], stream.as_slice());
        assert!(buf[..3].iter().chain(&buf[7..]).all(|&b| b == 0));
    }

    #[test]
    fn test_absorb_stop_separates_sources() {
        let mut split_a = Spritz::new();
        split_a.absorb_bytes(b"key");
        split_a.absorb_stop();
        split_a.absorb_bytes(b"iv");

        let mut split_b = Spritz::new();
        split_b.absorb_bytes(b"ke");
        split_b.absorb_stop();
        split_b.absorb_bytes(b"yiv");

        assert_ne!(split_a.squeeze(32), split_b.squeeze(32));
    }

    #[test]
    fn test_long_absorb_keeps_counter_bounded() {
        let mut engine = Spritz::new();
        for n in 0..1000u32 {
            engine.absorb(n as u8);
            assert!(engine.a <= NIBBLE_REGION);
            assert_eq!(engine.w & 1, 1);
        }
        assert!(is_permutation(&engine.s));
    }

    #[test]
    fn test_absorb_reader_matches_absorb_bytes() {
        let data: Vec<u8> = (0u8..=255).cycle().take(10_000).collect();

        let mut from_reader = Spritz::new();
        let n = from_reader.absorb_reader(data.as_slice()).unwrap();
        assert_eq!(n, data.len() as u64);

        let mut from_slice = Spritz::new();
        from_slice.absorb_bytes(&data);

        assert_eq!(from_reader.squeeze(32), from_slice.squeeze(32));
    }

    #[test]
    fn test_debug_is_redacted() {
        let rendered = format!("{:?}", Spritz::new());
        assert!(rendered.contains("REDACTED"));
    }

    proptest! {
        #[test]
        fn permutation_survives_any_input(
            input in proptest::collection::vec(any::<u8>(), 0..=600),
            out_len in 0usize..=300,
        ) {
            let mut engine = Spritz::new();
            engine.absorb_bytes(&input);
            engine.absorb_stop();
            let _ = engine.squeeze(out_len);
            prop_assert!(is_permutation(&engine.s));
            prop_assert_eq!(engine.w & 1, 1);
            prop_assert!(engine.a <= NIBBLE_REGION);
        }
    }
}
