//! GPU-versus-CPU agreement. Requires the `gpu` feature; each test returns
//! early when no adapter is available.
#![cfg(feature = "gpu")]

use std::sync::Arc;

use clarity_core::compute::cpu::CpuBackend;
use clarity_core::compute::{create_backend, ComputeBackend, DevicePreference};
use clarity_core::synthetic::gaussian_kernel;
use clarity_core::{ClarityError, Dim3, ExecutionContext};

mod common;
use common::{max_abs_diff, noise_volume};

fn gpu() -> Option<Arc<dyn ComputeBackend>> {
    let backend = create_backend(&DevicePreference::Gpu, 0).ok()?;
    backend.is_gpu().then_some(backend)
}

fn read(backend: &dyn ComputeBackend, buf: &clarity_core::buffer::RealBuffer) -> Vec<f32> {
    let mut host = vec![0.0; buf.len()];
    backend.read_back(buf, &mut host).unwrap();
    host
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

#[test]
fn gpu_backend_reports_at_least_one_thread() {
    let Some(gpu) = gpu() else { return };
    assert!(gpu.threads() >= 1);
}

#[test]
fn gpu_primitives_match_cpu() {
    let Some(gpu) = gpu() else { return };
    let cpu = CpuBackend::new(2).unwrap();
    let dim = Dim3::new(33, 17, 5);
    let a = noise_volume(dim, 31);
    let mut b = noise_volume(dim, 32);
    b[0] = 0.0;
    b[1] = 1e-7;

    for backend in [&cpu as &dyn ComputeBackend, gpu.as_ref()] {
        let x = backend.alloc_real_and_copy(dim, &a).unwrap();
        let y = backend.alloc_real_and_copy(dim, &b).unwrap();
        let mut out = backend.alloc_real(dim).unwrap();

        backend.divide(&x, &y, 3.0, &mut out).unwrap();
        let host = read(backend, &out);
        assert_eq!(host[0], 3.0);
        assert_eq!(host[1], 3.0);

        backend.multiply(&x, &y, &mut out).unwrap();
        let product = read(backend, &out);
        let expected: Vec<f32> = a.iter().zip(&b).map(|(p, q)| p * q).collect();
        assert!(max_abs_diff(&product, &expected) < 1e-6);

        let total = backend.reduce_sum(&x).unwrap();
        let reference: f64 = a.iter().map(|&v| v as f64).sum();
        assert!((total as f64 - reference).abs() / reference < 1e-4, "{} sum {total} vs {reference}", backend.name());
    }
}

#[test]
fn gpu_device_copies_round_trip() {
    let Some(gpu) = gpu() else { return };
    let dim = Dim3::new(4, 3, 2);
    let data = noise_volume(dim, 33);
    let mut buf = gpu.alloc_real(dim).unwrap();
    assert!(buf.is_device());
    gpu.copy_to_device(&mut buf, &data).unwrap();
    let mut back = vec![0.0; dim.voxel_count()];
    gpu.copy_from_device(&buf, &mut back).unwrap();
    assert_eq!(back, data);
    assert!(matches!(buf.host(), Err(ClarityError::InvalidOperation(_))));
}

// ---------------------------------------------------------------------------
// Transforms and algorithms
// ---------------------------------------------------------------------------

#[test]
fn gpu_fft_matches_cpu_on_odd_extents() {
    let Some(gpu) = gpu() else { return };
    let cpu = CpuBackend::new(2).unwrap();
    let dim = Dim3::new(9, 6, 5);
    let data = noise_volume(dim, 34);

    let mut results = Vec::new();
    for backend in [&cpu as &dyn ComputeBackend, gpu.as_ref()] {
        let x = backend.alloc_real_and_copy(dim, &data).unwrap();
        let mut spectrum = backend.alloc_spectrum(dim).unwrap();
        backend.forward_r2c(&x, &mut spectrum).unwrap();
        let mut back = backend.alloc_real(dim).unwrap();
        backend.inverse_c2r(&spectrum, &mut back).unwrap();
        results.push(read(backend, &back));
    }
    let diff = max_abs_diff(&results[0], &results[1]);
    assert!(diff < 1e-2, "unnormalized round trips differ: max_diff={diff}");
}

#[test]
fn gpu_deconvolution_matches_cpu() {
    let Some(gpu) = gpu() else { return };
    let cpu = ExecutionContext::cpu_only(2).unwrap();
    let gpu = ExecutionContext::with_backend(gpu);
    let dim = Dim3::new(16, 12, 6);
    let kernel_dim = Dim3::new(5, 5, 3);
    let image: Vec<f32> = noise_volume(dim, 35).iter().map(|v| v + 0.1).collect();
    let kernel = gaussian_kernel(kernel_dim, 1.0);

    let mut a = vec![0.0; dim.voxel_count()];
    let mut b = vec![0.0; dim.voxel_count()];

    cpu.jansen_van_cittert_deconvolve(&image, dim, &kernel, kernel_dim, &mut a, 3).unwrap();
    gpu.jansen_van_cittert_deconvolve(&image, dim, &kernel, kernel_dim, &mut b, 3).unwrap();
    assert!(max_abs_diff(&a, &b) < 1e-3, "JvC max_diff={}", max_abs_diff(&a, &b));

    cpu.maximum_likelihood_deconvolve(&image, dim, &kernel, kernel_dim, &mut a, 3).unwrap();
    gpu.maximum_likelihood_deconvolve(&image, dim, &kernel, kernel_dim, &mut b, 3).unwrap();
    assert!(max_abs_diff(&a, &b) < 1e-3, "ML max_diff={}", max_abs_diff(&a, &b));

    cpu.wiener_deconvolve(&image, dim, &kernel, kernel_dim, &mut a, 0.01).unwrap();
    gpu.wiener_deconvolve(&image, dim, &kernel, kernel_dim, &mut b, 0.01).unwrap();
    assert!(max_abs_diff(&a, &b) < 1e-2, "Wiener max_diff={}", max_abs_diff(&a, &b));
}
