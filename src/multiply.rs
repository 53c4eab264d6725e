//! The scheme-dispatched convolution multiply kernel.
//!
//! One kernel body serves all three pipeline stages (pad, spectral, result)
//! and, through the [`ComplexSrc`]/[`ComplexDst`] adapters, all four
//! combinations of interleaved and split complex storage. The adapters only
//! change how a complex value is addressed; the arithmetic and the offset
//! computation are identical across layouts, so bit-identical inputs produce
//! bit-identical outputs in every combination.

use num_complex::Complex;
use num_traits::Float;

use crate::callback::Callbacks;
use crate::kargs::StrideTable;
use crate::{Direction, Scheme};

/// Read access to a logically complex buffer.
pub trait ComplexSrc<T> {
    fn load(&self, idx: usize) -> Complex<T>;
}

/// Read/write access to a logically complex buffer. Reads are needed even on
/// the output side: the spectral stage multiplies in place and the pad stage
/// takes its chirp factors from the head of the output buffer.
pub trait ComplexDst<T>: ComplexSrc<T> {
    fn store(&mut self, idx: usize, value: Complex<T>);
}

/// Interleaved storage: one array of complex values.
pub struct Interleaved<'a, T>(pub &'a [Complex<T>]);

/// Mutable interleaved storage.
pub struct InterleavedMut<'a, T>(pub &'a mut [Complex<T>]);

/// Split storage: separate real and imaginary arrays of equal length.
pub struct Split<'a, T> {
    pub re: &'a [T],
    pub im: &'a [T],
}

/// Mutable split storage.
pub struct SplitMut<'a, T> {
    pub re: &'a mut [T],
    pub im: &'a mut [T],
}

impl<'a, T: Float> ComplexSrc<T> for Interleaved<'a, T> {
    fn load(&self, idx: usize) -> Complex<T> {
        self.0[idx]
    }
}

impl<'a, T: Float> ComplexSrc<T> for InterleavedMut<'a, T> {
    fn load(&self, idx: usize) -> Complex<T> {
        self.0[idx]
    }
}

impl<'a, T: Float> ComplexDst<T> for InterleavedMut<'a, T> {
    fn store(&mut self, idx: usize, value: Complex<T>) {
        self.0[idx] = value;
    }
}

impl<'a, T: Float> ComplexSrc<T> for Split<'a, T> {
    fn load(&self, idx: usize) -> Complex<T> {
        Complex::new(self.re[idx], self.im[idx])
    }
}

impl<'a, T: Float> ComplexSrc<T> for SplitMut<'a, T> {
    fn load(&self, idx: usize) -> Complex<T> {
        Complex::new(self.re[idx], self.im[idx])
    }
}

impl<'a, T: Float> ComplexDst<T> for SplitMut<'a, T> {
    fn store(&mut self, idx: usize, value: Complex<T>) {
        self.re[idx] = value.re;
        self.im[idx] = value.im;
    }
}

/// Launch geometry and plan metadata for one multiply invocation.
///
/// `numof` is the element count along the transform axis covered by this
/// launch (M for pad and spectral, N for result); `total_work_items` is
/// `numof` times the batch extent product. `direction` is carried for ABI
/// parity with the device kernels; the conjugate orientation is baked into
/// the chirp buffer at generation time.
#[derive(Clone, Copy)]
pub struct MultiplyGrid<'a> {
    pub numof: usize,
    pub total_work_items: usize,
    pub n: usize,
    pub m: usize,
    pub table: &'a StrideTable,
    pub direction: Direction,
}

/// Run the multiply kernel over the whole work-item grid.
///
/// Every work item owns a disjoint output location (the index decomposition
/// is a bijection onto (batch, element) coordinates), so a plain loop is the
/// host-side equivalent of the unordered device grid.
pub fn multiply<T, S, D>(
    scheme: Scheme,
    grid: &MultiplyGrid<'_>,
    input: &S,
    output: &mut D,
    callbacks: &Callbacks<'_, T>,
) where
    T: Float,
    S: ComplexSrc<T>,
    D: ComplexDst<T>,
{
    for tx in 0..grid.total_work_items {
        multiply_work_item(scheme, grid, tx, input, output, callbacks);
    }
}

/// One work item of the multiply kernel; mirrors the device shader exactly.
pub fn multiply_work_item<T, S, D>(
    scheme: Scheme,
    grid: &MultiplyGrid<'_>,
    tx: usize,
    input: &S,
    output: &mut D,
    callbacks: &Callbacks<'_, T>,
) where
    T: Float,
    S: ComplexSrc<T>,
    D: ComplexDst<T>,
{
    if tx >= grid.total_work_items {
        return;
    }

    let (i_off, o_off) = grid.table.batch_offsets(tx / grid.numof);
    let element = tx % grid.numof;
    let i_idx = element * grid.table.stride_in(0);
    let o_idx = element * grid.table.stride_out(0);

    match scheme {
        Scheme::SpectralMultiply => {
            // The spectral factor is one shared length-M sequence, so the
            // batch offset applies to the output side only.
            let a = input.load(i_idx);
            let out = output.load(o_idx + o_off);
            output.store(
                o_idx + o_off,
                Complex::new(
                    a.re * out.re - a.im * out.im,
                    a.re * out.im + a.im * out.re,
                ),
            );
        }
        Scheme::PadMultiply => {
            // Chirp factors sit in the first M entries of the output buffer;
            // the padded signal lands in the second M entries.
            let chirp = output.load(element);
            let dst = o_idx + grid.m + o_off;
            if element < grid.n {
                let mut v = input.load(i_idx + i_off);
                if let Some(load) = callbacks.load {
                    v = load(v, i_idx + i_off);
                }
                output.store(
                    dst,
                    Complex::new(
                        v.re * chirp.re + v.im * chirp.im,
                        -v.re * chirp.im + v.im * chirp.re,
                    ),
                );
            } else {
                output.store(dst, Complex::new(T::zero(), T::zero()));
            }
        }
        Scheme::ResultMultiply => {
            // Chirp factors sit at the head of the input buffer; the
            // convolution result starts past both chirp copies.
            let chirp = input.load(element);
            let v = input.load(i_idx + 2 * grid.m + i_off);
            let mi = T::one() / crate::twiddles::cast::<T>(grid.m as f64);
            let mut out = Complex::new(
                mi * (v.re * chirp.re + v.im * chirp.im),
                mi * (-v.re * chirp.im + v.im * chirp.re),
            );
            if let Some(store) = callbacks.store {
                out = store(out, o_idx + o_off);
            }
            output.store(o_idx + o_off, out);
        }
    }
}
