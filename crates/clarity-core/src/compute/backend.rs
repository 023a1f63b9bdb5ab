use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::buffer::{RealBuffer, SpectrumBuffer};
use crate::dim::Dim3;
use crate::error::Result;

use super::cpu::CpuBackend;

/// Where the engine should run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DevicePreference {
    /// Use a GPU when one is available, otherwise the CPU.
    #[default]
    Auto,
    Cpu,
    Gpu,
}

/// Compute primitives every deconvolution algorithm is written against.
///
/// One implementation is chosen per execution context; a single call never
/// mixes backends. Buffers handed to a backend must have been allocated by it.
pub trait ComputeBackend: Send + Sync {
    fn name(&self) -> &str;

    fn is_gpu(&self) -> bool {
        false
    }

    /// Worker threads used for host-side loops.
    fn threads(&self) -> usize;

    // --- Memory ---

    fn alloc_real(&self, dim: Dim3) -> Result<RealBuffer>;

    /// Allocates a packed half-spectrum sized for a real volume of `dim`.
    fn alloc_spectrum(&self, dim: Dim3) -> Result<SpectrumBuffer>;

    fn alloc_real_and_copy(&self, dim: Dim3, src: &[f32]) -> Result<RealBuffer>;

    /// Host to device copy. Fails with `InvalidOperation` on a host-only backend.
    fn copy_to_device(&self, dst: &mut RealBuffer, src: &[f32]) -> Result<()>;

    /// Device to host copy. Fails with `InvalidOperation` on a host-only backend.
    fn copy_from_device(&self, src: &RealBuffer, dst: &mut [f32]) -> Result<()>;

    /// Copies a buffer's voxels to the host regardless of where it lives.
    fn read_back(&self, src: &RealBuffer, dst: &mut [f32]) -> Result<()> {
        if src.is_device() {
            self.copy_from_device(src, dst)
        } else {
            dst.copy_from_slice(src.host()?);
            Ok(())
        }
    }

    // --- Elementwise primitives ---

    fn reduce_sum(&self, input: &RealBuffer) -> Result<f32>;

    fn multiply(&self, a: &RealBuffer, b: &RealBuffer, out: &mut RealBuffer) -> Result<()>;

    /// `out = a / b`, with `fallback` wherever `|b| < DIVISION_EPSILON`.
    fn divide(
        &self,
        a: &RealBuffer,
        b: &RealBuffer,
        fallback: f32,
        out: &mut RealBuffer,
    ) -> Result<()>;

    fn scale(&self, input: &RealBuffer, factor: f32, out: &mut RealBuffer) -> Result<()>;

    // --- Fourier domain ---

    /// Unnormalized 3D real-to-complex forward transform.
    fn forward_r2c(&self, input: &RealBuffer, out: &mut SpectrumBuffer) -> Result<()>;

    /// Unnormalized 3D complex-to-real inverse transform.
    fn inverse_c2r(&self, input: &SpectrumBuffer, out: &mut RealBuffer) -> Result<()>;

    /// `a = a * b * scale`, bin by bin.
    fn modulate(&self, a: &mut SpectrumBuffer, b: &SpectrumBuffer, scale: f32) -> Result<()>;

    /// `spectrum = conj(otf) / (|otf|^2 + epsilon) * spectrum * scale`, bin by bin.
    fn wiener_filter(
        &self,
        spectrum: &mut SpectrumBuffer,
        otf: &SpectrumBuffer,
        epsilon: f32,
        scale: f32,
    ) -> Result<()>;

    /// One Jansen-van Cittert correction step applied to `guess` in place:
    /// `guess = max(0, guess + (1 - ((blurred - a) / a)^2) * (input - blurred))`.
    fn jansen_van_cittert_update(
        &self,
        input: &RealBuffer,
        blurred: &RealBuffer,
        guess: &mut RealBuffer,
        a: f32,
    ) -> Result<()>;
}

/// Builds the backend for `preference`, falling back to the CPU when no GPU
/// can be initialized.
pub fn create_backend(
    preference: &DevicePreference,
    threads: usize,
) -> Result<Arc<dyn ComputeBackend>> {
    match preference {
        DevicePreference::Cpu => Ok(Arc::new(CpuBackend::new(threads)?)),
        DevicePreference::Auto | DevicePreference::Gpu => {
            #[cfg(feature = "gpu")]
            {
                match super::wgpu_backend::WgpuBackend::new(threads) {
                    Ok(gpu) => return Ok(Arc::new(gpu)),
                    Err(e) => tracing::warn!("GPU unavailable, using CPU: {e}"),
                }
            }
            #[cfg(not(feature = "gpu"))]
            if *preference == DevicePreference::Gpu {
                tracing::warn!("built without the `gpu` feature, using CPU");
            }
            Ok(Arc::new(CpuBackend::new(threads)?))
        }
    }
}
