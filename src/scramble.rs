//! Password keyed scrambling.
//!
//! Everything an embedding pass needs to be reproducible from a password
//! alone lives here: the seed derivation, the keystream used to mask payload
//! bytes, and the unit permutation that decides in which order the
//! addressable units of a host (bytes, samples, video tags) are consumed.
//!
//! None of this is a cipher. The keystream is a plain pseudo random sequence
//! and only guarantees that insertion and extraction, given the same
//! password, draw identical values.

use fastrand::Rng;

/// Length of a password generated on behalf of the caller.
pub const GENERATED_PASSWORD_LEN: usize = 64;

/// Fold password bytes into a numeric seed.
///
/// FNV-1a. Collisions between different passwords are acceptable; the single
/// requirement is that the same password always yields the same seed.
pub fn derive_seed(password: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    password.iter().fold(FNV_OFFSET, |hash, &byte| {
        (hash ^ (byte as u64)).wrapping_mul(FNV_PRIME)
    })
}

/// Per-byte whitening stream derived from the password.
///
/// Every embedding or extraction pass creates its own `Keystream`, so both
/// directions see the same sequence from the first byte on.
pub struct Keystream {
    rng: Rng,
}

impl Keystream {
    pub fn new(password: &[u8]) -> Self {
        Self {
            rng: Rng::with_seed(derive_seed(password)),
        }
    }

    /// XOR the next stream byte onto `byte`. Symmetric by construction.
    #[inline]
    pub fn mask(&mut self, byte: u8) -> u8 {
        byte ^ (self.rng.u32(..) % 255) as u8
    }

    pub fn mask_in_place(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.mask(*b);
        }
    }
}

/// Draws the units of a host in password-determined order.
///
/// Each draw selects the `rank`-th not-yet-consumed unit, where `rank` comes
/// from the keyed generator, and marks it consumed. Over a full pass of `n`
/// draws every unit in `0..n` is visited exactly once, so the draw sequence
/// is a bijection over the unit index space.
pub struct UnitDraw {
    done: Vec<bool>,
    remaining: u32,
    rng: Rng,
}

impl UnitDraw {
    pub fn new(password: &[u8], units: u32) -> Self {
        Self {
            done: vec![false; units as usize],
            remaining: units,
            rng: Rng::with_seed(derive_seed(password)),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Index of the next unit to consume. Must not be called more than
    /// `units` times.
    pub fn next_unit(&mut self) -> u32 {
        debug_assert!(self.remaining > 0, "all units already consumed");
        let draw = self.rng.u32(..);
        // Forced selection once a single unit is left.
        let rank = if self.remaining > 1 {
            draw % self.remaining
        } else {
            0
        };

        // Linear scan for the rank-th unit that is still unconsumed.
        let mut passed = 0;
        let mut cursor = 0usize;
        while passed < rank {
            if !self.done[cursor] {
                passed += 1;
            }
            cursor += 1;
        }
        while self.done[cursor] {
            cursor += 1;
        }

        self.done[cursor] = true;
        self.remaining -= 1;
        cursor as u32
    }
}

/// A full password-determined permutation over `0..len`.
///
/// `slots[i]` is the physical slot that carries logical element `i`. The
/// same table serves both directions: insertion scatters with [`shuffle`],
/// extraction gathers with [`unshuffle`].
///
/// [`shuffle`]: Permutation::shuffle
/// [`unshuffle`]: Permutation::unshuffle
pub struct Permutation {
    slots: Vec<u32>,
}

impl Permutation {
    pub fn from_password(password: &[u8], len: u32) -> Self {
        let mut draw = UnitDraw::new(password, len);
        let slots = (0..len).map(|_| draw.next_unit()).collect();
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn shuffle<T: Copy + Default>(&self, data: &[T]) -> Vec<T> {
        assert_eq!(data.len(), self.slots.len());
        let mut out = vec![T::default(); data.len()];
        for (i, &s) in self.slots.iter().enumerate() {
            out[s as usize] = data[i];
        }
        out
    }

    pub fn unshuffle<T: Copy + Default>(&self, data: &[T]) -> Vec<T> {
        assert_eq!(data.len(), self.slots.len());
        let mut out = vec![T::default(); data.len()];
        for (i, &s) in self.slots.iter().enumerate() {
            out[i] = data[s as usize];
        }
        out
    }
}

/// Mask and shuffle a payload buffer for embedding.
///
/// The keystream and the permutation are independently reseeded from the
/// password, matching what [`descramble_payload`] undoes.
pub fn scramble_payload(data: &[u8], password: &[u8]) -> Vec<u8> {
    let mut buf = data.to_vec();
    Keystream::new(password).mask_in_place(&mut buf);
    Permutation::from_password(password, buf.len() as u32).shuffle(&buf)
}

/// Reorder and unmask a buffer produced by [`scramble_payload`].
pub fn descramble_payload(data: &[u8], password: &[u8]) -> Vec<u8> {
    let mut buf = Permutation::from_password(password, data.len() as u32).unshuffle(data);
    Keystream::new(password).mask_in_place(&mut buf);
    buf
}

/// Generate a printable password for sessions opened without one.
///
/// The only place where wall-clock entropy enters the library; everything
/// else derives from the password.
pub fn generate_password() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mut rng = Rng::with_seed(nanos);
    (0..GENERATED_PASSWORD_LEN)
        .map(|_| (32 + (rng.u32(..) % 95)) as u8 as char)
        .collect()
}
