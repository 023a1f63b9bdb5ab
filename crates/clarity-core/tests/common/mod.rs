#![allow(dead_code)]

use clarity_core::{Dim3, ExecutionContext};

pub fn cpu_context() -> ExecutionContext {
    ExecutionContext::cpu_only(2).unwrap()
}

/// Deterministic pseudo-random volume in `[0, 1)`.
pub fn noise_volume(dim: Dim3, seed: u32) -> Vec<f32> {
    let mut state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    (0..dim.voxel_count())
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 8) as f32 / (1u32 << 24) as f32
        })
        .collect()
}

/// Direct spatial convolution with the kernel centred at `kernel / 2` and
/// zeros outside the image.
pub fn brute_force_convolve(image: &[f32], image_dim: Dim3, kernel: &[f32], kernel_dim: Dim3) -> Vec<f32> {
    let (cx, cy, cz) = (
        (kernel_dim.x / 2) as isize,
        (kernel_dim.y / 2) as isize,
        (kernel_dim.z / 2) as isize,
    );
    let inside = |v: isize, n: usize| v >= 0 && (v as usize) < n;
    let mut out = vec![0.0f32; image_dim.voxel_count()];
    for z in 0..image_dim.z {
        for y in 0..image_dim.y {
            for x in 0..image_dim.x {
                let mut acc = 0.0f64;
                for kz in 0..kernel_dim.z {
                    let sz = z as isize + cz - kz as isize;
                    if !inside(sz, image_dim.z) {
                        continue;
                    }
                    for ky in 0..kernel_dim.y {
                        let sy = y as isize + cy - ky as isize;
                        if !inside(sy, image_dim.y) {
                            continue;
                        }
                        for kx in 0..kernel_dim.x {
                            let sx = x as isize + cx - kx as isize;
                            if !inside(sx, image_dim.x) {
                                continue;
                            }
                            let k = kernel[kernel_dim.index(kx, ky, kz)] as f64;
                            let v = image[image_dim.index(sx as usize, sy as usize, sz as usize)] as f64;
                            acc += k * v;
                        }
                    }
                }
                out[image_dim.index(x, y, z)] = acc as f32;
            }
        }
    }
    out
}

pub fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(&x, &y)| (x - y).abs())
        .fold(0.0f32, f32::max)
}

pub fn sum(data: &[f32]) -> f64 {
    data.iter().map(|&v| v as f64).sum()
}
