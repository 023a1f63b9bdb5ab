//! Host-side volume utilities: cyclic pad/shift, clipping and simple statistics.

use ndarray::{s, ArrayView3, ArrayViewMut3};

use crate::dim::Dim3;
use crate::error::{ClarityError, Result};

fn view<'a>(data: &'a [f32], dim: Dim3, what: &str) -> Result<ArrayView3<'a, f32>> {
    dim.check_len(data, what)?;
    ArrayView3::from_shape(dim.shape(), data)
        .map_err(|e| ClarityError::InvalidArgument(format!("{what}: {e}")))
}

fn view_mut<'a>(data: &'a mut [f32], dim: Dim3, what: &str) -> Result<ArrayViewMut3<'a, f32>> {
    dim.check_len(data, what)?;
    ArrayViewMut3::from_shape(dim.shape(), data)
        .map_err(|e| ClarityError::InvalidArgument(format!("{what}: {e}")))
}

/// Fills `dst` with `fill`, then writes every voxel of `src` at its position
/// shifted by `shift` (x, y, z), wrapping cyclically across `dst`'s extents.
///
/// `src` must fit inside `dst` on every axis.
pub fn pad_spatial_shift(
    dst: &mut [f32],
    dst_dim: Dim3,
    src: &[f32],
    src_dim: Dim3,
    shift: [isize; 3],
    fill: f32,
) -> Result<()> {
    if !src_dim.fits_within(dst_dim) {
        return Err(ClarityError::InvalidArgument(format!(
            "source {src_dim} does not fit in destination {dst_dim}"
        )));
    }
    let src = view(src, src_dim, "source")?;
    let mut dst = view_mut(dst, dst_dim, "destination")?;
    dst.fill(fill);

    let wrap = |i: usize, shift: isize, n: usize| (i as isize + shift).rem_euclid(n as isize) as usize;
    for ((z, y, x), &v) in src.indexed_iter() {
        let dx = wrap(x, shift[0], dst_dim.x);
        let dy = wrap(y, shift[1], dst_dim.y);
        let dz = wrap(z, shift[2], dst_dim.z);
        dst[[dz, dy, dx]] = v;
    }
    Ok(())
}

/// Copies the `dst_dim` corner of `src` starting at the origin into `dst`.
pub fn clip(dst: &mut [f32], dst_dim: Dim3, src: &[f32], src_dim: Dim3) -> Result<()> {
    if !dst_dim.fits_within(src_dim) {
        return Err(ClarityError::InvalidArgument(format!(
            "cannot clip {dst_dim} out of {src_dim}"
        )));
    }
    let src = view(src, src_dim, "source")?;
    let mut dst = view_mut(dst, dst_dim, "destination")?;
    dst.assign(&src.slice(s![..dst_dim.z, ..dst_dim.y, ..dst_dim.x]));
    Ok(())
}

/// Largest voxel value, or `f32::NEG_INFINITY` for an empty slice.
pub fn max_value(data: &[f32]) -> f32 {
    data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

/// Root-mean-square difference between two equally sized volumes.
pub fn rms_difference(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() || a.is_empty() {
        return Err(ClarityError::InvalidArgument(format!(
            "rms difference of {} and {} values",
            a.len(),
            b.len()
        )));
    }
    let sum_sq: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = (x - y) as f64;
            d * d
        })
        .sum();
    Ok((sum_sq / a.len() as f64).sqrt() as f32)
}
