//! Chirp-sequence generation.

use num_complex::Complex;
use num_traits::Float;

use crate::twiddles::TwiddleTable;
use crate::Direction;

/// Build the doubled chirp buffer for a length-`n` transform embedded in a
/// length-`m` convolution.
///
/// The result has length `2m`: two back-to-back copies of the same length-`m`
/// sequence. Index 0 holds the chirp at offset 0, indices `1..n` and their
/// mirrors `m-1..=m-n+1` hold `exp(sign * i*pi*tx^2/n)`, and the band
/// `n..=m-n` is exactly zero. The duplication lets the result-multiply stage
/// read an aligned chirp slice without re-deriving the mirror symmetry.
///
/// `table` must be the radix-256 table for modulus `2n`
/// ([`TwiddleTable::for_chirp`]). Results are undefined for `m < 2n - 1`.
pub fn generate_chirp<T: Float>(
    n: usize,
    m: usize,
    table: &TwiddleTable<T>,
    direction: Direction,
) -> Vec<Complex<T>> {
    assert_eq!(
        table.total(),
        2 * n as u64,
        "twiddle table modulus does not match 2N"
    );
    debug_assert!(m >= 2 * n - 1, "convolution length must satisfy M >= 2N-1");

    let zero = Complex::new(T::zero(), T::zero());
    let mut output = vec![zero; 2 * m];
    for tx in 0..m {
        chirp_work_item(tx, n, m, table, direction, &mut output);
    }
    output
}

/// One work item of the chirp kernel: the exact write pattern of the device
/// shader, exposed for parity testing.
pub fn chirp_work_item<T: Float>(
    tx: usize,
    n: usize,
    m: usize,
    table: &TwiddleTable<T>,
    direction: Direction,
    output: &mut [Complex<T>],
) {
    let index = ((tx as u64) * (tx as u64)) % (2 * n as u64);
    let mut val = table.lookup(index);
    if direction.sign() < 0 {
        val.im = -val.im;
    }

    let zero = Complex::new(T::zero(), T::zero());
    if tx == 0 {
        output[0] = val;
        output[m] = val;
    } else if tx < n {
        output[tx] = val;
        output[tx + m] = val;
        // chirp(m - tx) == chirp(tx): fill the mirrored arm of both copies.
        output[m - tx] = val;
        output[2 * m - tx] = val;
    } else if tx <= m - n {
        output[tx] = zero;
        output[tx + m] = zero;
    }
    // tx in (m-n, m) with tx >= n: already written by the mirror of m - tx.
}
