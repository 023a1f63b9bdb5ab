use tracing::debug;

use crate::compute::ComputeBackend;
use crate::convolution::{Convolver, WorkingVolume};
use crate::dim::Dim3;
use crate::error::Result;

/// Iterative maximum-likelihood (Richardson-Lucy style) deconvolution.
///
/// Each iteration computes
/// `i = i * ((image / (i * k)) * k)`
/// with `*` between volumes meaning convolution by the kernel `k`, guarding
/// the division with a fallback of zero, then rescales `i` so its total
/// intensity equals the input's.
pub fn maximum_likelihood(
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
    debug!(
        "maximum likelihood: {image_dim} image, working volume {}, {iterations} iterations",
        work.dim()
    );
    run(backend, &work, image, kernel, out, iterations)
}

/// Maximum-likelihood deconvolution with a PSF of the image's extent.
///
/// The PSF is held fixed; only the image estimate is refined, with the
/// same update as [`maximum_likelihood`].
pub fn blind_maximum_likelihood(
    backend: &dyn ComputeBackend,
    out: &mut [f32],
    image: &[f32],
    psf: &[f32],
    dim: Dim3,
    iterations: usize,
) -> Result<()> {
    let work = WorkingVolume::new(dim, dim)?;
    dim.check_len(image, "image")?;
    dim.check_len(psf, "psf")?;
    dim.check_len(out, "output")?;
    debug!(
        "blind maximum likelihood (fixed PSF): {dim} image, working volume {}, {iterations} iterations",
        work.dim()
    );
    run(backend, &work, image, psf, out, iterations)
}

fn run(
    backend: &dyn ComputeBackend,
    work: &WorkingVolume,
    image: &[f32],
    kernel: &[f32],
    out: &mut [f32],
    iterations: usize,
) -> Result<()> {
    let energy = image.iter().map(|&v| v as f64).sum::<f64>();

    let input = work.upload_image(backend, image)?;
    let mut guess = work.upload_image(backend, image)?;
    let padded_kernel = work.upload_kernel(backend, kernel)?;
    let mut convolver = Convolver::new(backend, work.dim())?;
    let otf = convolver.transform(&padded_kernel)?;
    drop(padded_kernel);

    let mut blurred = backend.alloc_real(work.dim())?;
    let mut ratio = backend.alloc_real(work.dim())?;
    let mut next = backend.alloc_real(work.dim())?;
    for k in 0..iterations {
        convolver.convolve_otf(&guess, &otf, &mut blurred)?;
        backend.divide(&input, &blurred, 0.0, &mut ratio)?;
        convolver.convolve_otf(&ratio, &otf, &mut blurred)?;
        backend.multiply(&guess, &blurred, &mut next)?;

        let sum = backend.reduce_sum(&next)? as f64;
        let factor = if sum == 0.0 { 1.0 } else { (energy / sum) as f32 };
        backend.scale(&next, factor, &mut guess)?;
        debug!("maximum likelihood iteration {}/{iterations}: energy rescale {factor}", k + 1);
    }

    work.finish(backend, &guess, out)
}
