use tracing::debug;

use crate::compute::ComputeBackend;
use crate::consts::JVC_MIDPOINT_FRACTION;
use crate::convolution::{Convolver, WorkingVolume};
use crate::dim::Dim3;
use crate::error::Result;
use crate::image;

/// Jansen-van Cittert constrained iterative deconvolution.
///
/// With `A = 0.5 * max(image)` each iteration blurs the current guess `i`
/// into `o` and applies
/// `i = max(0, i + (1 - ((o - A) / A)^2) * (image - o))`.
/// The damping term vanishes at `o = 0` and `o = 2A`, so corrections are
/// strongest around mid intensity; the floor at zero keeps every voxel
/// non-negative.
///
/// An image whose maximum is not positive leaves the damping undefined and
/// is returned unchanged.
pub fn jansen_van_cittert(
    backend: &dyn ComputeBackend,
    image: &[f32],
    image_dim: Dim3,
    kernel: &[f32],
    kernel_dim: Dim3,
    out: &mut [f32],
    iterations: usize,
) -> Result<()> {
    let work = WorkingVolume::new(image_dim, kernel_dim)?;
    image_dim.check_len(image, "image")?;
    kernel_dim.check_len(kernel, "kernel")?;
    image_dim.check_len(out, "output")?;

    let a = JVC_MIDPOINT_FRACTION * image::max_value(image);
    if a.is_nan() || a <= 0.0 {
        debug!("Jansen-van Cittert: image maximum is not positive, returning input");
        out.copy_from_slice(image);
        return Ok(());
    }
    debug!(
        "Jansen-van Cittert: {image_dim} image, working volume {}, A={a}, {iterations} iterations",
        work.dim()
    );

    let input = work.upload_image(backend, image)?;
    let mut guess = work.upload_image(backend, image)?;
    let padded_kernel = work.upload_kernel(backend, kernel)?;
    let mut convolver = Convolver::new(backend, work.dim())?;
    let otf = convolver.transform(&padded_kernel)?;
    drop(padded_kernel);

    let mut blurred = backend.alloc_real(work.dim())?;
    for k in 0..iterations {
        debug!("Jansen-van Cittert iteration {}/{iterations}", k + 1);
        convolver.convolve_otf(&guess, &otf, &mut blurred)?;
        backend.jansen_van_cittert_update(&input, &blurred, &mut guess, a)?;
    }

    work.finish(backend, &guess, out)
}
