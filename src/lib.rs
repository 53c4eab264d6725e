//! chirpz: Bluestein (chirp-z) convolution kernels for arbitrary-length FFTs.
//!
//! Bluestein's algorithm computes a length-N DFT as a length-M circular
//! convolution (M >= 2N-1, M chosen by the caller's planner). This crate
//! implements the three building blocks that make that work:
//! - chirp-sequence generation with table-based angle evaluation
//!   ([`chirp::generate_chirp`]),
//! - the pad/spectral/result multiply kernels over interleaved and split
//!   complex layouts ([`multiply::multiply`]),
//! - fixed-width shape/stride metadata packing ([`kargs::StrideTable`]).
//!
//! The host kernels at the crate root are the reference semantics. With the
//! `wgpu` feature (default), `backend::wgpu` runs the same kernels as WGSL
//! compute shaders; host and device paths compute identical arithmetic.
//!
//! Sequencing the pipeline (pad-multiply, forward length-M transform,
//! spectral multiply, inverse length-M transform, result-multiply) and
//! executing the length-M transforms themselves belong to the caller.

pub mod callback;
pub mod chirp;
pub mod kargs;
pub mod multiply;
pub mod twiddles;

#[cfg(feature = "wgpu")]
pub mod backend;

pub use callback::Callbacks;
pub use chirp::generate_chirp;
pub use kargs::{StrideTable, STRIDE_TABLE_WIDTH};
pub use multiply::{
    multiply, ComplexDst, ComplexSrc, Interleaved, InterleavedMut, MultiplyGrid, Split, SplitMut,
};
pub use twiddles::{TwiddleStep, TwiddleTable};

/// Transform direction. Controls the sign of the chirp's imaginary part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Inverse,
}

impl Direction {
    /// Sign convention inherited from the device ABI: -1 forward, +1 inverse.
    pub fn sign(self) -> i32 {
        match self {
            Direction::Forward => -1,
            Direction::Inverse => 1,
        }
    }
}

/// Which of the three convolution pipeline stages a multiply invocation
/// performs. Discriminants are part of the device ABI.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme {
    /// Pointwise spectral multiply between the two length-M transforms.
    /// Never touches boundary callbacks.
    SpectralMultiply = 0,
    /// Chirp pre-multiply plus zero-padding from N to M. The only stage that
    /// may invoke a load callback.
    PadMultiply = 1,
    /// De-chirp of the convolution result plus the 1/M scale. The only stage
    /// that may invoke a store callback.
    ResultMultiply = 2,
}

impl Scheme {
    pub fn tag(self) -> u32 {
        self as u32
    }
}
