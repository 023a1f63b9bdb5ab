//! Deconvolution algorithms, all written against [`ComputeBackend`] so one
//! orchestration serves every backend.

mod jansen_van_cittert;
mod maximum_likelihood;
mod wiener;

pub use jansen_van_cittert::jansen_van_cittert;
pub use maximum_likelihood::{blind_maximum_likelihood, maximum_likelihood};
pub use wiener::wiener;

use crate::compute::ComputeBackend;
use crate::config::DeconvolutionMethod;
use crate::dim::Dim3;
use crate::error::{ClarityError, Result};

/// Runs the algorithm selected by `method`.
///
/// The blind variant takes a PSF of the image's own extent, so
/// `kernel_dim` must equal `image_dim` for it.
pub fn deconvolve(
    backend: &dyn ComputeBackend,
    method: &DeconvolutionMethod,
    image: &[f32],
    image_dim: Dim3,
    kernel: &[f32],
    kernel_dim: Dim3,
    out: &mut [f32],
) -> Result<()> {
    method.validate()?;
    match *method {
        DeconvolutionMethod::Wiener { epsilon } => {
            wiener(backend, image, image_dim, kernel, kernel_dim, out, epsilon)
        }
        DeconvolutionMethod::JansenVanCittert { iterations } => {
            jansen_van_cittert(backend, image, image_dim, kernel, kernel_dim, out, iterations)
        }
        DeconvolutionMethod::MaximumLikelihood { iterations } => {
            maximum_likelihood(backend, image, image_dim, kernel, kernel_dim, out, iterations)
        }
        DeconvolutionMethod::BlindMaximumLikelihood { iterations } => {
            if kernel_dim != image_dim {
                return Err(ClarityError::InvalidArgument(format!(
                    "blind maximum likelihood needs a PSF of the image extent {image_dim}, got {kernel_dim}"
                )));
            }
            blind_maximum_likelihood(backend, out, image, kernel, image_dim, iterations)
        }
    }
}
