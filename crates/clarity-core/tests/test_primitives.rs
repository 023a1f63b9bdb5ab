use clarity_core::compute::cpu::CpuBackend;
use clarity_core::compute::ComputeBackend;
use clarity_core::consts::DIVISION_EPSILON;
use clarity_core::{ClarityError, Dim3};

fn backend() -> CpuBackend {
    CpuBackend::new(2).unwrap()
}

// ---------------------------------------------------------------------------
// Elementwise primitives
// ---------------------------------------------------------------------------

#[test]
fn reduce_sum_small_and_parallel() {
    let b = backend();
    let small = b.alloc_real_and_copy(Dim3::new(3, 1, 1), &[1.0, 2.5, -0.5]).unwrap();
    assert_eq!(b.reduce_sum(&small).unwrap(), 3.0);

    let dim = Dim3::new(128, 64, 16);
    let ones = vec![1.0; dim.voxel_count()];
    let big = b.alloc_real_and_copy(dim, &ones).unwrap();
    assert_eq!(b.reduce_sum(&big).unwrap(), dim.voxel_count() as f32);
}

#[test]
fn multiply_and_scale() {
    let b = backend();
    let dim = Dim3::new(4, 1, 1);
    let x = b.alloc_real_and_copy(dim, &[1.0, 2.0, 3.0, 4.0]).unwrap();
    let y = b.alloc_real_and_copy(dim, &[2.0, 0.5, -1.0, 0.0]).unwrap();
    let mut out = b.alloc_real(dim).unwrap();
    b.multiply(&x, &y, &mut out).unwrap();
    assert_eq!(out.host().unwrap(), &[2.0, 1.0, -3.0, 0.0]);

    b.scale(&x, 0.5, &mut out).unwrap();
    assert_eq!(out.host().unwrap(), &[0.5, 1.0, 1.5, 2.0]);
}

#[test]
fn divide_substitutes_fallback_below_epsilon() {
    let b = backend();
    let dim = Dim3::new(5, 1, 1);
    let num = b.alloc_real_and_copy(dim, &[1.0, 1.0, 1.0, 1.0, 6.0]).unwrap();
    let den = b
        .alloc_real_and_copy(dim, &[0.0, DIVISION_EPSILON * 0.5, -DIVISION_EPSILON * 0.5, DIVISION_EPSILON * 2.0, 3.0])
        .unwrap();
    let mut out = b.alloc_real(dim).unwrap();
    b.divide(&num, &den, 7.0, &mut out).unwrap();
    let out = out.host().unwrap();
    assert_eq!(&out[..3], &[7.0, 7.0, 7.0]);
    assert!((out[3] - 1.0 / (DIVISION_EPSILON * 2.0)).abs() / out[3] < 1e-6);
    assert_eq!(out[4], 2.0);
    assert!(out.iter().all(|v| v.is_finite()));
}

#[test]
fn operand_dimension_mismatch_is_invalid_argument() {
    let b = backend();
    let x = b.alloc_real(Dim3::new(4, 1, 1)).unwrap();
    let y = b.alloc_real(Dim3::new(2, 2, 1)).unwrap();
    let mut out = b.alloc_real(Dim3::new(4, 1, 1)).unwrap();
    assert!(matches!(
        b.multiply(&x, &y, &mut out),
        Err(ClarityError::InvalidArgument(_))
    ));
}

// ---------------------------------------------------------------------------
// Memory manager
// ---------------------------------------------------------------------------

#[test]
fn host_backend_rejects_device_copies() {
    let b = backend();
    let dim = Dim3::new(2, 2, 2);
    let mut buf = b.alloc_real(dim).unwrap();
    let mut host = vec![0.0; 8];
    assert!(matches!(
        b.copy_to_device(&mut buf, &host),
        Err(ClarityError::InvalidOperation(_))
    ));
    assert!(matches!(
        b.copy_from_device(&buf, &mut host),
        Err(ClarityError::InvalidOperation(_))
    ));
    assert!(!b.is_gpu());
}

#[test]
fn allocation_sizes() {
    let b = backend();
    let dim = Dim3::new(7, 3, 2);
    let real = b.alloc_real(dim).unwrap();
    assert_eq!(real.len(), 42);
    assert!(real.host().unwrap().iter().all(|&v| v == 0.0));
    let spectrum = b.alloc_spectrum(dim).unwrap();
    assert_eq!(spectrum.len(), 2 * 2 * 3 * 4);
    assert!(b.alloc_real_and_copy(dim, &[0.0; 41]).is_err());
}
