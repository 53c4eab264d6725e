//! Large twiddle tables for table-based angle evaluation.
//!
//! Evaluating `exp(-i*pi*tx^2/N)` directly loses angle precision once `tx^2`
//! grows large. The chirp generator instead reduces `tx^2 mod 2N` and looks
//! the residue up in a radix-256 table: level `l` of the table holds
//! `exp(-2*pi*i * j * 256^l / total)` for `j in 0..256`, and a lookup
//! recombines one entry per base-256 digit with complex multiplication. The
//! number of levels (the "step") bounds the index range the table can cover
//! and is an accuracy/size trade-off chosen by the caller.

use num_complex::Complex;
use num_traits::Float;

/// Entries per table level.
pub const TWIDDLE_RADIX: usize = 256;
/// Bits consumed per level when decomposing a lookup index.
pub const TWIDDLE_RADIX_BITS: u32 = 8;

/// Angle-decomposition depth: how many radix-256 digits a lookup consumes.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TwiddleStep {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

impl TwiddleStep {
    /// Number of table levels (and of complex multiplies per lookup).
    pub fn levels(self) -> usize {
        self as usize
    }

    /// Largest index value representable at this step, plus one.
    pub fn index_span(self) -> u64 {
        1u64 << (TWIDDLE_RADIX_BITS * self as u32)
    }

    /// Smallest step whose index span covers `total` lookup indices.
    /// `total` beyond four levels (2^32) is not representable.
    pub fn for_length(total: u64) -> TwiddleStep {
        for step in [
            TwiddleStep::One,
            TwiddleStep::Two,
            TwiddleStep::Three,
            TwiddleStep::Four,
        ] {
            if total <= step.index_span() {
                return step;
            }
        }
        TwiddleStep::Four
    }
}

/// Read-only radix-256 angle table for a fixed modulus `total`.
///
/// For the chirp of a length-N transform, `total` is `2N` and lookups are
/// addressed by `tx^2 mod 2N`.
#[derive(Clone, Debug)]
pub struct TwiddleTable<T> {
    total: u64,
    step: TwiddleStep,
    data: Vec<Complex<T>>,
}

impl<T: Float> TwiddleTable<T> {
    /// Precompute the table for modulus `total` at the given step.
    ///
    /// Angles are reduced modulo `total` before evaluation so every entry is
    /// computed from an argument in `[0, 2*pi)` regardless of level.
    pub fn new(total: u64, step: TwiddleStep) -> Self {
        assert!(total > 0, "twiddle table modulus must be non-zero");
        let levels = step.levels();
        let mut data = Vec::with_capacity(levels * TWIDDLE_RADIX);
        for level in 0..levels {
            for j in 0..TWIDDLE_RADIX as u64 {
                // j * 256^level mod total, without overflowing u64.
                let weight = (0..level).fold(j % total, |acc, _| {
                    (acc * TWIDDLE_RADIX as u64) % total
                });
                let theta = 2.0 * std::f64::consts::PI * (weight as f64) / (total as f64);
                data.push(Complex::new(cast::<T>(theta.cos()), cast::<T>(-theta.sin())));
            }
        }
        TwiddleTable { total, step, data }
    }

    /// Table for the chirp of a length-`n` transform (modulus `2n`).
    pub fn for_chirp(n: usize, step: TwiddleStep) -> Self {
        Self::new(2 * n as u64, step)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn step(&self) -> TwiddleStep {
        self.step
    }

    /// Raw entries, level-major, for device upload.
    pub fn entries(&self) -> &[Complex<T>] {
        &self.data
    }

    /// Evaluate `exp(-2*pi*i * index / total)` by digit recombination.
    ///
    /// `index` must be below the modulus; the table covers the full residue
    /// range by construction of `TwiddleStep::for_length`.
    pub fn lookup(&self, index: u64) -> Complex<T> {
        let mut u = index;
        let mut val = self.data[(u & 0xff) as usize];
        for level in 1..self.step.levels() {
            u >>= TWIDDLE_RADIX_BITS;
            val = val * self.data[level * TWIDDLE_RADIX + (u & 0xff) as usize];
        }
        val
    }
}

pub(crate) fn cast<T: Float>(x: f64) -> T {
    T::from(x).expect("f64 does not fit the scalar type")
}
