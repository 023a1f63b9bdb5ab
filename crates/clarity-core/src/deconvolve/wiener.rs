use tracing::debug;

use crate::compute::ComputeBackend;
use crate::convolution::WorkingVolume;
use crate::dim::Dim3;
use crate::error::{ClarityError, Result};

/// Single-pass Wiener filter:
/// `conj(H) / (|H|^2 + epsilon) * S`, with `H` the kernel's OTF and `S`
/// the image spectrum.
///
/// `epsilon` stands in for the unknown noise-to-signal power ratio. Small
/// values approach a plain inverse filter, larger ones smooth more.
pub fn wiener(
    backend: &dyn ComputeBackend,
    image: &[f32],
    image_dim: Dim3,
    kernel: &[f32],
    kernel_dim: Dim3,
    out: &mut [f32],
    epsilon: f32,
) -> Result<()> {
    if !epsilon.is_finite() || epsilon < 0.0 {
        return Err(ClarityError::InvalidArgument(format!(
            "Wiener epsilon must be finite and non-negative, got {epsilon}"
        )));
    }
    let work = WorkingVolume::new(image_dim, kernel_dim)?;
    image_dim.check_len(image, "image")?;
    kernel_dim.check_len(kernel, "kernel")?;
    image_dim.check_len(out, "output")?;
    debug!("Wiener filter: {image_dim} image, working volume {}, epsilon={epsilon}", work.dim());

    let input = work.upload_image(backend, image)?;
    let padded_kernel = work.upload_kernel(backend, kernel)?;
    let mut otf = backend.alloc_spectrum(work.dim())?;
    backend.forward_r2c(&padded_kernel, &mut otf)?;
    drop(padded_kernel);

    let mut spectrum = backend.alloc_spectrum(work.dim())?;
    backend.forward_r2c(&input, &mut spectrum)?;
    backend.wiener_filter(&mut spectrum, &otf, epsilon, work.normalization())?;

    let mut result = backend.alloc_real(work.dim())?;
    backend.inverse_c2r(&spectrum, &mut result)?;
    work.finish(backend, &result, out)
}
