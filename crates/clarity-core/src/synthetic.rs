//! Synthetic volumes for tests and demos.

use crate::dim::Dim3;

/// Normalized 3D Gaussian kernel of standard deviation `sigma`, centred at
/// voxel `dim / 2`.
///
/// Values follow `(2 pi sigma^2)^-1.5 * exp(-r^2 / (2 sigma^2))` before the
/// whole kernel is scaled to unit sum.
pub fn gaussian_kernel(dim: Dim3, sigma: f32) -> Vec<f32> {
    let sigma = sigma as f64;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let peak = (std::f64::consts::TAU * sigma * sigma).powf(-1.5);
    let (cx, cy, cz) = ((dim.x / 2) as f64, (dim.y / 2) as f64, (dim.z / 2) as f64);

    let mut values = Vec::with_capacity(dim.voxel_count());
    for z in 0..dim.z {
        let fz = z as f64 - cz;
        for y in 0..dim.y {
            let fy = y as f64 - cy;
            for x in 0..dim.x {
                let fx = x as f64 - cx;
                values.push(peak * (-(fx * fx + fy * fy + fz * fz) / two_sigma_sq).exp());
            }
        }
    }

    let sum: f64 = values.iter().sum();
    let inv = if sum > 0.0 { 1.0 / sum } else { 0.0 };
    values.into_iter().map(|v| (v * inv) as f32).collect()
}

/// Binary block: 1.0 inside the central region spanning half of each axis,
/// 0.0 elsewhere.
pub fn binary_block(dim: Dim3) -> Vec<f32> {
    let inside = |i: usize, n: usize| i >= n / 4 && i < n / 4 + n / 2;
    let mut values = Vec::with_capacity(dim.voxel_count());
    for z in 0..dim.z {
        for y in 0..dim.y {
            for x in 0..dim.x {
                let v = inside(x, dim.x) && inside(y, dim.y) && inside(z, dim.z);
                values.push(if v { 1.0 } else { 0.0 });
            }
        }
    }
    values
}
