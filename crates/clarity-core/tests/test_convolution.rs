use clarity_core::compute::cpu::CpuBackend;
use clarity_core::compute::ComputeBackend;
use clarity_core::convolution::{Convolver, WorkingVolume};
use clarity_core::image;
use clarity_core::synthetic::gaussian_kernel;
use clarity_core::Dim3;

mod common;
use common::{brute_force_convolve, cpu_context, max_abs_diff, noise_volume, sum};

// ---------------------------------------------------------------------------
// Against direct spatial convolution
// ---------------------------------------------------------------------------

#[test]
fn convolve_matches_brute_force_8_cubed_with_3_cubed_kernel() {
    let ctx = cpu_context();
    let image_dim = Dim3::new(8, 8, 8);
    let kernel_dim = Dim3::new(3, 3, 3);
    let image = noise_volume(image_dim, 1);
    let kernel = noise_volume(kernel_dim, 2);

    let mut out = vec![0.0; image_dim.voxel_count()];
    ctx.convolve(&image, image_dim, &kernel, kernel_dim, &mut out).unwrap();
    let expected = brute_force_convolve(&image, image_dim, &kernel, kernel_dim);

    let diff = max_abs_diff(&out, &expected);
    assert!(diff < 1e-4, "FFT convolution vs brute force: max_diff={diff}");
}

#[test]
fn convolve_internal_on_working_volume_matches_brute_force() {
    let backend = CpuBackend::new(1).unwrap();
    let image_dim = Dim3::new(6, 5, 4);
    let kernel_dim = Dim3::new(3, 3, 3);
    let image = noise_volume(image_dim, 3);
    let kernel = noise_volume(kernel_dim, 4);

    let work = WorkingVolume::new(image_dim, kernel_dim).unwrap();
    let input = work.upload_image(&backend, &image).unwrap();
    let padded_kernel = work.upload_kernel(&backend, &kernel).unwrap();
    let mut result = backend.alloc_real(work.dim()).unwrap();
    Convolver::new(&backend, work.dim())
        .unwrap()
        .convolve_internal(&input, &padded_kernel, &mut result)
        .unwrap();

    let mut out = vec![0.0; image_dim.voxel_count()];
    work.finish(&backend, &result, &mut out).unwrap();
    let expected = brute_force_convolve(&image, image_dim, &kernel, kernel_dim);
    let diff = max_abs_diff(&out, &expected);
    assert!(diff < 1e-4, "max_diff={diff}");
}

#[test]
fn even_and_anisotropic_kernels_are_centred() {
    let ctx = cpu_context();
    let image_dim = Dim3::new(7, 6, 5);
    let kernel_dim = Dim3::new(4, 2, 3);
    let image = noise_volume(image_dim, 5);
    let kernel = noise_volume(kernel_dim, 6);

    let mut out = vec![0.0; image_dim.voxel_count()];
    ctx.convolve(&image, image_dim, &kernel, kernel_dim, &mut out).unwrap();
    let expected = brute_force_convolve(&image, image_dim, &kernel, kernel_dim);
    let diff = max_abs_diff(&out, &expected);
    assert!(diff < 1e-4, "max_diff={diff}");
}

// ---------------------------------------------------------------------------
// Working dimension
// ---------------------------------------------------------------------------

#[test]
fn kernel_larger_than_image_does_not_wrap() {
    // Reference: embed the image in a volume far larger than image + kernel,
    // convolve there, and clip. Any wrap-around in the small computation
    // would show up as a difference.
    let ctx = cpu_context();
    let image_dim = Dim3::new(4, 4, 3);
    let kernel_dim = Dim3::new(9, 7, 7);
    let image = noise_volume(image_dim, 8);
    let kernel = noise_volume(kernel_dim, 9);

    let mut out = vec![0.0; image_dim.voxel_count()];
    ctx.convolve(&image, image_dim, &kernel, kernel_dim, &mut out).unwrap();

    let big_dim = Dim3::new(24, 24, 20);
    let mut big = vec![0.0; big_dim.voxel_count()];
    image::pad_spatial_shift(&mut big, big_dim, &image, image_dim, [0; 3], 0.0).unwrap();
    let mut big_out = vec![0.0; big_dim.voxel_count()];
    ctx.convolve(&big, big_dim, &kernel, kernel_dim, &mut big_out).unwrap();
    let mut reference = vec![0.0; image_dim.voxel_count()];
    image::clip(&mut reference, image_dim, &big_out, big_dim).unwrap();

    let diff = max_abs_diff(&out, &reference);
    assert!(diff < 1e-4, "wrap-around detected: max_diff={diff}");
}

#[test]
fn working_dimension_is_image_plus_kernel() {
    let work = WorkingVolume::new(Dim3::new(128, 128, 32), Dim3::new(32, 32, 32)).unwrap();
    assert_eq!(work.dim(), Dim3::new(160, 160, 64));
    assert!(WorkingVolume::new(Dim3::new(0, 1, 1), Dim3::new(1, 1, 1)).is_err());
}

// ---------------------------------------------------------------------------
// Identity and normalization
// ---------------------------------------------------------------------------

#[test]
fn single_voxel_kernel_is_identity() {
    let ctx = cpu_context();
    let image_dim = Dim3::new(9, 7, 5);
    let image = noise_volume(image_dim, 10);
    let mut out = vec![0.0; image_dim.voxel_count()];
    ctx.convolve(&image, image_dim, &[1.0], Dim3::new(1, 1, 1), &mut out).unwrap();
    let diff = max_abs_diff(&image, &out);
    assert!(diff < 1e-5, "identity kernel changed the image: max_diff={diff}");
}

#[test]
fn normalized_kernel_preserves_interior_energy() {
    let ctx = cpu_context();
    let image_dim = Dim3::new(24, 24, 16);
    let kernel_dim = Dim3::new(7, 7, 7);
    let mut image = vec![0.0; image_dim.voxel_count()];
    image[image_dim.index(12, 12, 8)] = 5.0;
    let kernel = gaussian_kernel(kernel_dim, 1.0);

    let mut out = vec![0.0; image_dim.voxel_count()];
    ctx.convolve(&image, image_dim, &kernel, kernel_dim, &mut out).unwrap();
    assert!((sum(&out) - 5.0).abs() < 1e-3, "sum = {}", sum(&out));
    let peak = out.iter().copied().fold(f32::MIN, f32::max);
    assert_eq!(peak, out[image_dim.index(12, 12, 8)]);
}

#[test]
fn wrong_output_length_is_rejected() {
    let ctx = cpu_context();
    let dim = Dim3::new(4, 4, 4);
    let image = vec![0.0; 64];
    let mut out = vec![0.0; 63];
    assert!(ctx.convolve(&image, dim, &[1.0], Dim3::new(1, 1, 1), &mut out).is_err());
}
