//! Host/device parity for the chirp and multiply kernels. Tests skip when no
//! adapter is available so CI without a GPU stays green.

#![cfg(feature = "wgpu")]

use num_complex::Complex;

use chirpz::backend::wgpu::{DeviceMultiplyIo, WgpuExecutor, WgpuExecutorOptions};
use chirpz::{
    generate_chirp, multiply, Callbacks, Direction, Interleaved, InterleavedMut, MultiplyGrid,
    Scheme, StrideTable, TwiddleStep, TwiddleTable,
};

fn executor() -> Option<WgpuExecutor> {
    let _ = env_logger::builder().is_test(true).try_init();
    match WgpuExecutor::new(WgpuExecutorOptions::default()) {
        Ok(exec) => Some(exec),
        Err(err) => {
            eprintln!("skipping wgpu parity test; no usable adapter: {err}");
            None
        }
    }
}

fn chirp_table(n: usize) -> TwiddleTable<f64> {
    TwiddleTable::for_chirp(n, TwiddleStep::for_length(2 * n as u64))
}

fn sample(idx: usize) -> Complex<f64> {
    Complex::new((idx as f64 * 0.7).sin() + 0.3, (idx as f64 * 1.3).cos())
}

// The default device precision is f32; compare accordingly.
const TOL: f64 = 1e-4;

fn assert_close(got: &[Complex<f64>], want: &[Complex<f64>], what: &str) {
    assert_eq!(got.len(), want.len(), "{what}: length");
    for (k, (g, w)) in got.iter().zip(want).enumerate() {
        assert!((g - w).norm() < TOL, "{what} at {k}: {g} vs {w}");
    }
}

#[test]
fn device_chirp_matches_host() {
    let Some(exec) = executor() else { return };
    for direction in [Direction::Forward, Direction::Inverse] {
        let n = 11;
        let m = 32;
        let table = chirp_table(n);
        let want = generate_chirp(n, m, &table, direction);
        let twiddles = exec.upload_twiddles(&table);
        let chirp = exec
            .generate_chirp(n, m, &twiddles, direction)
            .expect("chirp dispatch");
        let got = exec.download_complex(&chirp).expect("chirp readback");
        assert_close(&got, &want, "chirp");
    }
}

#[test]
fn device_pad_multiply_matches_host() {
    let Some(exec) = executor() else { return };
    let n = 5;
    let m = 16;
    let batch = 2;
    let table = chirp_table(n);
    let chirp = generate_chirp(n, m, &table, Direction::Forward);
    let input: Vec<Complex<f64>> = (0..n * batch).map(sample).collect();
    let mut want = vec![Complex::new(0.0, 0.0); m + m * batch];
    want[..m].copy_from_slice(&chirp[..m]);
    let strides = StrideTable::pack(&[m], &[1], &[1], n, m);
    let grid = MultiplyGrid {
        numof: m,
        total_work_items: m * batch,
        n,
        m,
        table: &strides,
        direction: Direction::Forward,
    };
    multiply(
        Scheme::PadMultiply,
        &grid,
        &Interleaved(&input),
        &mut InterleavedMut(&mut want),
        &Callbacks::none(),
    );

    let d_in = exec.upload_complex(&input, "test-pad-in");
    let mut seed = vec![Complex::new(0.0, 0.0); m + m * batch];
    seed[..m].copy_from_slice(&chirp[..m]);
    let d_out = exec.upload_complex(&seed, "test-pad-out");
    let d_strides = exec.upload_stride_table(&strides).expect("strides");
    exec.multiply(
        Scheme::PadMultiply,
        m,
        m * batch,
        n,
        m,
        Direction::Forward,
        &d_strides,
        &DeviceMultiplyIo::InterleavedInterleaved {
            input: &d_in,
            output: &d_out,
        },
    )
    .expect("pad dispatch");
    let got = exec.download_complex(&d_out).expect("pad readback");
    assert_close(&got, &want, "pad");
}

#[test]
fn device_spectral_and_result_match_host() {
    let Some(exec) = executor() else { return };
    let n = 5;
    let m = 16;
    let table = chirp_table(n);
    let chirp = generate_chirp(n, m, &table, Direction::Forward);

    // Spectral.
    let factor: Vec<Complex<f64>> = (0..m).map(sample).collect();
    let data: Vec<Complex<f64>> = (0..m).map(|i| sample(i + 3)).collect();
    let strides = StrideTable::pack(&[m], &[1], &[1], m, m);
    let grid = MultiplyGrid {
        numof: m,
        total_work_items: m,
        n,
        m,
        table: &strides,
        direction: Direction::Forward,
    };
    let mut want = data.clone();
    multiply(
        Scheme::SpectralMultiply,
        &grid,
        &Interleaved(&factor),
        &mut InterleavedMut(&mut want),
        &Callbacks::none(),
    );
    let d_factor = exec.upload_complex(&factor, "test-spectral-factor");
    let d_data = exec.upload_complex(&data, "test-spectral-data");
    let d_strides = exec.upload_stride_table(&strides).expect("strides");
    exec.multiply(
        Scheme::SpectralMultiply,
        m,
        m,
        n,
        m,
        Direction::Forward,
        &d_strides,
        &DeviceMultiplyIo::InterleavedInterleaved {
            input: &d_factor,
            output: &d_data,
        },
    )
    .expect("spectral dispatch");
    let got = exec.download_complex(&d_data).expect("spectral readback");
    assert_close(&got, &want, "spectral");

    // Result.
    let mut staged = chirp.clone();
    staged.extend((0..n).map(|i| sample(i + 9)));
    let result_strides = StrideTable::pack(&[n], &[1], &[1], n, n);
    let result_grid = MultiplyGrid {
        numof: n,
        total_work_items: n,
        n,
        m,
        table: &result_strides,
        direction: Direction::Forward,
    };
    let mut want = vec![Complex::new(0.0, 0.0); n];
    multiply(
        Scheme::ResultMultiply,
        &result_grid,
        &Interleaved(&staged),
        &mut InterleavedMut(&mut want),
        &Callbacks::none(),
    );
    let d_staged = exec.upload_complex(&staged, "test-result-in");
    let d_out = exec.alloc_complex(n, "test-result-out");
    let d_result_strides = exec.upload_stride_table(&result_strides).expect("strides");
    exec.multiply(
        Scheme::ResultMultiply,
        n,
        n,
        n,
        m,
        Direction::Forward,
        &d_result_strides,
        &DeviceMultiplyIo::InterleavedInterleaved {
            input: &d_staged,
            output: &d_out,
        },
    )
    .expect("result dispatch");
    let got = exec.download_complex(&d_out).expect("result readback");
    assert_close(&got, &want, "result");
}

#[test]
fn device_split_layouts_match_interleaved() {
    let Some(exec) = executor() else { return };
    let n = 5;
    let m = 16;
    let table = chirp_table(n);
    let chirp = generate_chirp(n, m, &table, Direction::Forward);
    let input: Vec<Complex<f64>> = (0..n).map(sample).collect();
    let in_re: Vec<f64> = input.iter().map(|v| v.re).collect();
    let in_im: Vec<f64> = input.iter().map(|v| v.im).collect();
    let seed: Vec<Complex<f64>> = chirp.clone();
    let seed_re: Vec<f64> = seed.iter().map(|v| v.re).collect();
    let seed_im: Vec<f64> = seed.iter().map(|v| v.im).collect();
    let strides = StrideTable::pack(&[m], &[1], &[1], n, m);
    let d_strides = exec.upload_stride_table(&strides).expect("strides");

    let run = |io: &DeviceMultiplyIo<'_>| {
        exec.multiply(Scheme::PadMultiply, m, m, n, m, Direction::Forward, &d_strides, io)
            .expect("pad dispatch");
    };

    let d_in_i = exec.upload_complex(&input, "test-lay-in-i");
    let d_in_s = exec.upload_split(&in_re, &in_im, "test-lay-in-s").expect("split in");
    let d_out_ii = exec.upload_complex(&seed, "test-lay-out-ii");
    let d_out_is = exec.upload_split(&seed_re, &seed_im, "test-lay-out-is").expect("split out");
    let d_out_si = exec.upload_complex(&seed, "test-lay-out-si");
    let d_out_ss = exec.upload_split(&seed_re, &seed_im, "test-lay-out-ss").expect("split out");

    run(&DeviceMultiplyIo::InterleavedInterleaved {
        input: &d_in_i,
        output: &d_out_ii,
    });
    run(&DeviceMultiplyIo::InterleavedSplit {
        input: &d_in_i,
        output: &d_out_is,
    });
    run(&DeviceMultiplyIo::SplitInterleaved {
        input: &d_in_s,
        output: &d_out_si,
    });
    run(&DeviceMultiplyIo::SplitSplit {
        input: &d_in_s,
        output: &d_out_ss,
    });

    let base = exec.download_complex(&d_out_ii).expect("readback ii");
    let si = exec.download_complex(&d_out_si).expect("readback si");
    assert_close(&si, &base, "split-in");
    let (is_re, is_im) = exec.download_split(&d_out_is).expect("readback is");
    let (ss_re, ss_im) = exec.download_split(&d_out_ss).expect("readback ss");
    for k in 0..base.len() {
        // Same shader arithmetic either side, so parity here is exact.
        assert_eq!(base[k].re, is_re[k], "is re at {k}");
        assert_eq!(base[k].im, is_im[k], "is im at {k}");
        assert_eq!(base[k].re, ss_re[k], "ss re at {k}");
        assert_eq!(base[k].im, ss_im[k], "ss im at {k}");
    }
}

#[test]
fn stride_table_upload_surfaces_failure_as_error() {
    let Some(exec) = executor() else { return };
    // A word past the 32-bit device ABI must come back as Err, not a panic,
    // and leave no device table behind.
    let table = StrideTable::pack(&[4], &[usize::MAX], &[1], 4, 4);
    assert!(exec.upload_stride_table(&table).is_err());
    // A well-formed table on the same device still uploads.
    let ok = StrideTable::pack(&[4], &[1], &[1], 4, 4);
    assert!(exec.upload_stride_table(&ok).is_ok());
}

#[test]
fn device_chirp_rejects_mismatched_twiddle_modulus() {
    let Some(exec) = executor() else { return };
    // Table built for N=7 (modulus 14) cannot serve an N=11 chirp.
    let twiddles = exec.upload_twiddles(&chirp_table(7));
    assert!(exec
        .generate_chirp(11, 32, &twiddles, Direction::Forward)
        .is_err());
    let matched = exec.upload_twiddles(&chirp_table(11));
    assert!(exec
        .generate_chirp(11, 32, &matched, Direction::Forward)
        .is_ok());
}
