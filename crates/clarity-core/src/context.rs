//! The execution context: one backend, chosen once, shared by every call.

use std::sync::Arc;

use tracing::info;

use crate::compute::{create_backend, ComputeBackend};
use crate::config::{ContextConfig, DeconvolutionMethod};
use crate::convolution;
use crate::deconvolve;
use crate::dim::Dim3;
use crate::error::Result;

/// Entry point to the engine.
///
/// The backend is selected at construction and never changes, so a single
/// call never mixes CPU and GPU primitives. Cloning is cheap and clones
/// share the backend. Calls on one context may run concurrently from
/// several threads as long as each owns its input and output slices.
#[derive(Clone)]
pub struct ExecutionContext {
    backend: Arc<dyn ComputeBackend>,
}

impl ExecutionContext {
    pub fn new(config: &ContextConfig) -> Result<Self> {
        let backend = create_backend(&config.device, config.threads.unwrap_or(0))?;
        info!(
            "Execution context on {} ({} threads)",
            backend.name(),
            backend.threads()
        );
        Ok(Self { backend })
    }

    /// CPU-only context with `threads` workers (0 for one per core).
    pub fn cpu_only(threads: usize) -> Result<Self> {
        Self::new(&ContextConfig::cpu(Some(threads)))
    }

    pub fn with_backend(backend: Arc<dyn ComputeBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn ComputeBackend {
        self.backend.as_ref()
    }

    pub fn is_gpu(&self) -> bool {
        self.backend.is_gpu()
    }

    pub fn threads(&self) -> usize {
        self.backend.threads()
    }

    /// Convolves `image` with `kernel`; `out` holds `image_dim` voxels.
    pub fn convolve(
        &self,
        image: &[f32],
        image_dim: Dim3,
        kernel: &[f32],
        kernel_dim: Dim3,
        out: &mut [f32],
    ) -> Result<()> {
        convolution::convolve(self.backend(), image, image_dim, kernel, kernel_dim, out)
    }

    pub fn wiener_deconvolve(
        &self,
        image: &[f32],
        image_dim: Dim3,
        kernel: &[f32],
        kernel_dim: Dim3,
        out: &mut [f32],
        epsilon: f32,
    ) -> Result<()> {
        deconvolve::wiener(self.backend(), image, image_dim, kernel, kernel_dim, out, epsilon)
    }

    pub fn jansen_van_cittert_deconvolve(
        &self,
        image: &[f32],
        image_dim: Dim3,
        kernel: &[f32],
        kernel_dim: Dim3,
        out: &mut [f32],
        iterations: usize,
    ) -> Result<()> {
        deconvolve::jansen_van_cittert(
            self.backend(),
            image,
            image_dim,
            kernel,
            kernel_dim,
            out,
            iterations,
        )
    }

    pub fn maximum_likelihood_deconvolve(
        &self,
        image: &[f32],
        image_dim: Dim3,
        kernel: &[f32],
        kernel_dim: Dim3,
        out: &mut [f32],
        iterations: usize,
    ) -> Result<()> {
        deconvolve::maximum_likelihood(
            self.backend(),
            image,
            image_dim,
            kernel,
            kernel_dim,
            out,
            iterations,
        )
    }

    /// Maximum likelihood with a fixed PSF; `out`, `image` and `psf` all
    /// hold `dim` voxels.
    pub fn blind_maximum_likelihood_deconvolve(
        &self,
        out: &mut [f32],
        image: &[f32],
        psf: &[f32],
        dim: Dim3,
        iterations: usize,
    ) -> Result<()> {
        deconvolve::blind_maximum_likelihood(self.backend(), out, image, psf, dim, iterations)
    }

    /// Runs whichever algorithm `method` names.
    pub fn deconvolve(
        &self,
        method: &DeconvolutionMethod,
        image: &[f32],
        image_dim: Dim3,
        kernel: &[f32],
        kernel_dim: Dim3,
        out: &mut [f32],
    ) -> Result<()> {
        deconvolve::deconvolve(self.backend(), method, image, image_dim, kernel, kernel_dim, out)
    }
}
