//! Owned real and half-spectrum volumes resident on the host or a device.
//!
//! Dropping a buffer releases its storage, so an early `?` return never
//! leaks scratch memory. Buffers are created through a
//! [`ComputeBackend`](crate::compute::ComputeBackend), which decides where
//! they live.

use crate::complex::{self, Complex32};
use crate::dim::Dim3;
use crate::error::{ClarityError, Result};

pub(crate) enum BufferInner {
    Host(Vec<f32>),
    #[cfg(feature = "gpu")]
    Wgpu { buffer: wgpu::Buffer, len: usize },
}

impl BufferInner {
    fn len(&self) -> usize {
        match self {
            BufferInner::Host(data) => data.len(),
            #[cfg(feature = "gpu")]
            BufferInner::Wgpu { len, .. } => *len,
        }
    }

    fn is_device(&self) -> bool {
        !matches!(self, BufferInner::Host(_))
    }

    fn host(&self) -> Result<&[f32]> {
        match self {
            BufferInner::Host(data) => Ok(data),
            #[cfg(feature = "gpu")]
            _ => Err(ClarityError::InvalidOperation(
                "host access to a device-resident buffer".into(),
            )),
        }
    }

    fn host_mut(&mut self) -> Result<&mut [f32]> {
        match self {
            BufferInner::Host(data) => Ok(data),
            #[cfg(feature = "gpu")]
            _ => Err(ClarityError::InvalidOperation(
                "host access to a device-resident buffer".into(),
            )),
        }
    }
}

/// Allocates a zero-filled host vector, reporting failure instead of aborting.
pub(crate) fn host_zeroed(len: usize) -> Result<Vec<f32>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| ClarityError::OutOfMemory {
            bytes: len * std::mem::size_of::<f32>(),
        })?;
    data.resize(len, 0.0);
    Ok(data)
}

/// Allocates a host vector holding a copy of `src`.
pub(crate) fn host_copy(src: &[f32]) -> Result<Vec<f32>> {
    let mut data = Vec::new();
    data.try_reserve_exact(src.len())
        .map_err(|_| ClarityError::OutOfMemory {
            bytes: std::mem::size_of_val(src),
        })?;
    data.extend_from_slice(src);
    Ok(data)
}

/// A real volume of `dim.voxel_count()` floats, x fastest-varying.
pub struct RealBuffer {
    pub(crate) inner: BufferInner,
    dim: Dim3,
}

impl RealBuffer {
    pub(crate) fn from_inner(inner: BufferInner, dim: Dim3) -> Self {
        debug_assert_eq!(inner.len(), dim.voxel_count());
        Self { inner, dim }
    }

    pub fn dim(&self) -> Dim3 {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_device(&self) -> bool {
        self.inner.is_device()
    }

    /// Host view of the voxels; fails for device-resident buffers.
    pub fn host(&self) -> Result<&[f32]> {
        self.inner.host()
    }

    pub fn host_mut(&mut self) -> Result<&mut [f32]> {
        self.inner.host_mut()
    }
}

/// Packed half-spectrum of a real-to-complex 3D transform.
///
/// Holds `dim.z * dim.y * (dim.x / 2 + 1)` complex bins as interleaved
/// `(re, im)` floats, bin `(u, v, w)` at `(w * dim.y + v) * (dim.x / 2 + 1) + u`.
/// `dim` is the extent of the real volume the spectrum belongs to; bins
/// above `dim.x / 2` along x are implied by Hermitian symmetry and never stored.
pub struct SpectrumBuffer {
    pub(crate) inner: BufferInner,
    dim: Dim3,
}

impl SpectrumBuffer {
    pub(crate) fn from_inner(inner: BufferInner, dim: Dim3) -> Self {
        debug_assert_eq!(inner.len(), dim.spectrum_len());
        Self { inner, dim }
    }

    /// Extent of the real volume this spectrum transforms.
    pub fn dim(&self) -> Dim3 {
        self.dim
    }

    pub fn half_x(&self) -> usize {
        self.dim.half_x()
    }

    /// Number of complex bins.
    pub fn bins(&self) -> usize {
        self.dim.spectrum_bins()
    }

    /// Number of floats, twice the bin count.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_device(&self) -> bool {
        self.inner.is_device()
    }

    /// Flat bin index of frequency `(u, v, w)`, `u <= dim.x / 2`.
    pub fn bin_index(&self, u: usize, v: usize, w: usize) -> Option<usize> {
        let hx = self.half_x();
        if u >= hx || v >= self.dim.y || w >= self.dim.z {
            return None;
        }
        Some((w * self.dim.y + v) * hx + u)
    }

    /// Reads bin `(u, v, w)` from a host spectrum.
    pub fn get(&self, u: usize, v: usize, w: usize) -> Result<Complex32> {
        let i = self.bin_index(u, v, w).ok_or_else(|| {
            ClarityError::InvalidArgument(format!(
                "bin ({u}, {v}, {w}) outside half-spectrum of {}",
                self.dim
            ))
        })?;
        Ok(complex::load(self.inner.host()?, i))
    }

    /// Interleaved host view; fails for device-resident buffers.
    pub fn host(&self) -> Result<&[f32]> {
        self.inner.host()
    }

    pub fn host_mut(&mut self) -> Result<&mut [f32]> {
        self.inner.host_mut()
    }
}
