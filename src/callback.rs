//! Boundary load/store callbacks.
//!
//! A callback is a caller-supplied pointwise transform applied at the true
//! boundaries of the whole Bluestein pipeline: the first read of user input
//! (pad-multiply) and the last write of user output (result-multiply). The
//! spectral stage sits between the two length-M transforms and must never
//! see either callback.
//!
//! Each callback receives the value as loaded (or as about to be stored)
//! together with its flat buffer index, and returns the value to use.

use num_complex::Complex;

pub type LoadFn<'a, T> = &'a (dyn Fn(Complex<T>, usize) -> Complex<T> + Sync);
pub type StoreFn<'a, T> = &'a (dyn Fn(Complex<T>, usize) -> Complex<T> + Sync);

/// Optional boundary callbacks for one multiply invocation.
#[derive(Clone, Copy)]
pub struct Callbacks<'a, T> {
    pub load: Option<LoadFn<'a, T>>,
    pub store: Option<StoreFn<'a, T>>,
}

impl<'a, T> Callbacks<'a, T> {
    /// No callbacks configured; the common case.
    pub fn none() -> Self {
        Callbacks {
            load: None,
            store: None,
        }
    }
}

impl<'a, T> Default for Callbacks<'a, T> {
    fn default() -> Self {
        Self::none()
    }
}
