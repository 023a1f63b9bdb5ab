//! Host 3D real/complex transforms on `rustfft`.
//!
//! Volumes are held as `ndarray::Array3` in `(z, y, x)` order, slowest axis
//! first, so the x fastest-varying flat buffers of the engine map onto the
//! arrays without a copy and each 1-D pass runs along one ndarray axis.
//! Both directions are unnormalized; a forward/inverse pair scales by `nx*ny*nz`.

use std::sync::{Arc, Mutex};

use ndarray::{aview1, Array3, ArrayView3, ArrayViewMut1, Axis, Zip};
use num_complex::Complex32;
use num_traits::Zero;
use rustfft::{Fft, FftPlanner};

use crate::dim::Dim3;
use crate::error::{ClarityError, Result};

/// Plan cache shared by every transform of a backend.
pub struct Fft3dPlanner {
    planner: Mutex<FftPlanner<f32>>,
}

impl Default for Fft3dPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Fft3dPlanner {
    pub fn new() -> Self {
        Self {
            planner: Mutex::new(FftPlanner::new()),
        }
    }

    fn forward(&self, n: usize) -> Result<Arc<dyn Fft<f32>>> {
        let mut planner = self
            .planner
            .lock()
            .map_err(|_| ClarityError::FftFailed("FFT planner lock poisoned".into()))?;
        Ok(planner.plan_fft_forward(n))
    }

    fn inverse(&self, n: usize) -> Result<Arc<dyn Fft<f32>>> {
        let mut planner = self
            .planner
            .lock()
            .map_err(|_| ClarityError::FftFailed("FFT planner lock poisoned".into()))?;
        Ok(planner.plan_fft_inverse(n))
    }
}

fn check_dim(dim: Dim3) -> Result<()> {
    if dim.voxel_count() == 0 {
        return Err(ClarityError::FftFailed(format!(
            "cannot plan a transform of {dim}"
        )));
    }
    Ok(())
}

/// Forward real-to-complex transform of a `(z, y, x)` volume into its
/// `(z, y, x/2 + 1)` half-spectrum.
pub fn r2c_forward(
    planner: &Fft3dPlanner,
    input: ArrayView3<f32>,
    parallel: bool,
) -> Result<Array3<Complex32>> {
    let (nz, ny, nx) = input.dim();
    let dim = Dim3::new(nx, ny, nz);
    check_dim(dim)?;
    let hx = dim.half_x();
    let fft_x = planner.forward(nx)?;

    let mut spectrum = Array3::<Complex32>::zeros(dim.spectrum_shape());
    let row_pass = |mut out: ArrayViewMut1<Complex32>, row: ndarray::ArrayView1<f32>| {
        let mut line: Vec<Complex32> = row.iter().map(|&v| Complex32::new(v, 0.0)).collect();
        fft_x.process(&mut line);
        out.assign(&aview1(&line[..hx]));
    };
    let rows = Zip::from(spectrum.lanes_mut(Axis(2))).and(input.lanes(Axis(2)));
    if parallel {
        rows.par_for_each(row_pass);
    } else {
        rows.for_each(row_pass);
    }

    transform_axis(&mut spectrum, Axis(1), planner.forward(ny)?.as_ref(), parallel);
    transform_axis(&mut spectrum, Axis(0), planner.forward(nz)?.as_ref(), parallel);
    Ok(spectrum)
}

/// Inverse complex-to-real transform of a `(z, y, x/2 + 1)` half-spectrum
/// into a real volume of `dim`.
///
/// Imaginary parts of the self-conjugate bins (`u = 0`, and `u = nx/2` for
/// even `nx`) do not contribute to the result.
pub fn c2r_inverse(
    planner: &Fft3dPlanner,
    spectrum: ArrayView3<Complex32>,
    dim: Dim3,
    parallel: bool,
) -> Result<Array3<f32>> {
    check_dim(dim)?;
    if spectrum.dim() != dim.spectrum_shape() {
        return Err(ClarityError::FftFailed(format!(
            "half-spectrum shape {:?} does not match volume {dim}",
            spectrum.dim()
        )));
    }
    let (nx, hx) = (dim.x, dim.half_x());

    let mut work = spectrum.to_owned();
    transform_axis(&mut work, Axis(0), planner.inverse(dim.z)?.as_ref(), parallel);
    transform_axis(&mut work, Axis(1), planner.inverse(dim.y)?.as_ref(), parallel);

    let ifft_x = planner.inverse(nx)?;
    let mut output = Array3::<f32>::zeros(dim.shape());
    let row_pass = |mut out: ArrayViewMut1<f32>, half: ndarray::ArrayView1<Complex32>| {
        let mut line = vec![Complex32::zero(); nx];
        for (u, bin) in line.iter_mut().enumerate() {
            *bin = if u < hx { half[u] } else { half[nx - u].conj() };
        }
        ifft_x.process(&mut line);
        for (o, v) in out.iter_mut().zip(&line) {
            *o = v.re;
        }
    };
    let rows = Zip::from(output.lanes_mut(Axis(2))).and(work.lanes(Axis(2)));
    if parallel {
        rows.par_for_each(row_pass);
    } else {
        rows.for_each(row_pass);
    }
    Ok(output)
}

/// Applies `fft` in place to every 1-D lane of `data` along `axis`.
fn transform_axis(data: &mut Array3<Complex32>, axis: Axis, fft: &dyn Fft<f32>, parallel: bool) {
    let lane_pass = |mut lane: ArrayViewMut1<Complex32>| {
        let mut line = lane.to_vec();
        fft.process(&mut line);
        lane.assign(&aview1(&line));
    };
    let lanes = Zip::from(data.lanes_mut(axis));
    if parallel {
        lanes.par_for_each(lane_pass);
    } else {
        lanes.for_each(lane_pass);
    }
}
