//! C ABI tests. Registration is process-wide, so everything touching it
//! runs inside a single test.

use std::ptr;

use clarity_core::ffi::*;
use clarity_core::synthetic::gaussian_kernel;
use clarity_core::Dim3;

mod common;
use common::{cpu_context, max_abs_diff, noise_volume};

fn cdim(x: i32, y: i32, z: i32) -> ClarityDim3 {
    ClarityDim3 { x, y, z }
}

#[test]
fn registration_lifecycle_and_entry_points() {
    assert_eq!(clarity_set_number_of_threads(2), ClarityResult::Success);
    assert_eq!(clarity_register(), ClarityResult::Success);
    assert_eq!(clarity_register(), ClarityResult::Success);

    let dim = Dim3::new(6, 5, 4);
    let image = noise_volume(dim, 21);
    let kernel = gaussian_kernel(Dim3::new(3, 3, 3), 1.0);
    let mut out = vec![0.0f32; dim.voxel_count()];

    let status = unsafe {
        clarity_convolve(image.as_ptr(), cdim(6, 5, 4), kernel.as_ptr(), cdim(3, 3, 3), out.as_mut_ptr())
    };
    assert_eq!(status, ClarityResult::Success);
    let mut expected = vec![0.0; dim.voxel_count()];
    cpu_context()
        .convolve(&image, dim, &kernel, Dim3::new(3, 3, 3), &mut expected)
        .unwrap();
    assert!(max_abs_diff(&out, &expected) < 1e-4);

    let status = unsafe {
        clarity_maximum_likelihood_deconvolve(
            image.as_ptr(),
            cdim(6, 5, 4),
            kernel.as_ptr(),
            cdim(3, 3, 3),
            out.as_mut_ptr(),
            2,
        )
    };
    assert_eq!(status, ClarityResult::Success);

    assert_eq!(clarity_unregister(), ClarityResult::Success);
    assert_eq!(clarity_unregister(), ClarityResult::Success);
    // Extra unregistration is harmless.
    assert_eq!(clarity_unregister(), ClarityResult::Success);
}

#[test]
fn in_place_call_reads_input_before_writing() {
    let dim = Dim3::new(5, 4, 3);
    let mut data = noise_volume(dim, 22);
    let original = data.clone();
    let identity = [1.0f32];
    let ptr = data.as_mut_ptr();
    let status = unsafe { clarity_convolve(ptr, cdim(5, 4, 3), identity.as_ptr(), cdim(1, 1, 1), ptr) };
    assert_eq!(status, ClarityResult::Success);
    assert!(max_abs_diff(&data, &original) < 1e-5);
}

#[test]
fn null_and_invalid_arguments() {
    let kernel = [1.0f32];
    let mut out = vec![0.0f32; 8];
    let status = unsafe {
        clarity_wiener_deconvolve(ptr::null(), cdim(2, 2, 2), kernel.as_ptr(), cdim(1, 1, 1), out.as_mut_ptr(), 0.1)
    };
    assert_eq!(status, ClarityResult::InvalidArgument);

    let image = [1.0f32; 8];
    let status = unsafe {
        clarity_jansen_van_cittert_deconvolve(image.as_ptr(), cdim(2, 2, 2), kernel.as_ptr(), cdim(1, 1, 1), ptr::null_mut(), 1)
    };
    assert_eq!(status, ClarityResult::InvalidArgument);

    let status = unsafe {
        clarity_jansen_van_cittert_deconvolve(image.as_ptr(), cdim(2, -2, 2), kernel.as_ptr(), cdim(1, 1, 1), out.as_mut_ptr(), 1)
    };
    assert_eq!(status, ClarityResult::InvalidArgument);

    let status = unsafe {
        clarity_maximum_likelihood_deconvolve(image.as_ptr(), cdim(2, 2, 2), kernel.as_ptr(), cdim(1, 1, 1), out.as_mut_ptr(), -1)
    };
    assert_eq!(status, ClarityResult::InvalidArgument);
}

#[test]
fn unaddressable_extents_are_invalid_arguments() {
    let image = [1.0f32; 8];
    let kernel = [1.0f32];
    let mut out = vec![0.0f32; 8];
    for dim in [cdim(i32::MAX, i32::MAX, i32::MAX), cdim(i32::MAX, i32::MAX, 1)] {
        let status = unsafe { clarity_convolve(image.as_ptr(), dim, kernel.as_ptr(), cdim(1, 1, 1), out.as_mut_ptr()) };
        assert_eq!(status, ClarityResult::InvalidArgument);
        let status = unsafe { clarity_convolve(image.as_ptr(), cdim(2, 2, 2), kernel.as_ptr(), dim, out.as_mut_ptr()) };
        assert_eq!(status, ClarityResult::InvalidArgument);
    }
    assert_eq!(out, vec![0.0; 8]);
}

#[test]
fn blind_entry_point_propagates_errors() {
    let image = [1.0f32; 8];
    let mut out = vec![0.0f32; 8];
    let status = unsafe {
        clarity_blind_maximum_likelihood_deconvolve(out.as_mut_ptr(), image.as_ptr(), ptr::null(), cdim(2, 2, 2), 3)
    };
    assert_eq!(status, ClarityResult::InvalidArgument);

    let psf = [0.125f32; 8];
    let status = unsafe {
        clarity_blind_maximum_likelihood_deconvolve(out.as_mut_ptr(), image.as_ptr(), psf.as_ptr(), cdim(2, 2, 2), 3)
    };
    assert_eq!(status, ClarityResult::Success);
}

#[test]
fn unimplemented_methods_zero_output() {
    let image = [1.0f32; 8];
    let kernel = [1.0f32];
    let sigma = [1.0f32; 3];
    let mut out = vec![5.0f32; 8];
    let status = unsafe {
        clarity_smoothed_jansen_van_cittert_deconvolve(
            image.as_ptr(),
            cdim(2, 2, 2),
            kernel.as_ptr(),
            cdim(1, 1, 1),
            out.as_mut_ptr(),
            4,
            2,
            sigma.as_ptr(),
        )
    };
    assert_eq!(status, ClarityResult::InvalidOperation);
    assert!(out.iter().all(|&v| v == 0.0));

    out.fill(5.0);
    let status = unsafe {
        clarity_i_divergence_deconvolve(image.as_ptr(), cdim(2, 2, 2), kernel.as_ptr(), cdim(1, 1, 1), out.as_mut_ptr())
    };
    assert_eq!(status, ClarityResult::InvalidOperation);
    assert!(out.iter().all(|&v| v == 0.0));
}

#[test]
fn pad_and_clip_utilities() {
    let src = [1.0f32, 2.0, 3.0, 4.0];
    let mut padded = vec![0.0f32; 16];
    let shift = [1, 1, 0];
    let status = unsafe {
        clarity_image_pad_spatial_shift(padded.as_mut_ptr(), cdim(4, 4, 1), src.as_ptr(), cdim(2, 2, 1), shift.as_ptr(), -1.0)
    };
    assert_eq!(status, ClarityResult::Success);
    assert_eq!(padded[5], 1.0);
    assert_eq!(padded[6], 2.0);
    assert_eq!(padded[9], 3.0);
    assert_eq!(padded[10], 4.0);
    assert_eq!(padded[0], -1.0);

    let mut clipped = vec![0.0f32; 4];
    let status = unsafe {
        clarity_image_clip(clipped.as_mut_ptr(), cdim(2, 2, 1), padded.as_ptr(), cdim(4, 4, 1))
    };
    assert_eq!(status, ClarityResult::Success);
    assert_eq!(clipped, vec![-1.0, -1.0, -1.0, 1.0]);

    let dims = [7, 8, 9];
    assert_eq!(unsafe { clarity_dim3_from_array(dims.as_ptr()) }, cdim(7, 8, 9));
}
