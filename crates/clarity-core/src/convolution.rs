//! Fourier-domain convolution on a backend, plus the pad/convolve/clip
//! routine shared by every deconvolution algorithm.

use crate::buffer::{host_zeroed, RealBuffer, SpectrumBuffer};
use crate::compute::ComputeBackend;
use crate::dim::Dim3;
use crate::error::Result;
use crate::image;

fn normalization(dim: Dim3) -> f32 {
    (1.0 / dim.voxel_count() as f64) as f32
}

/// Convolves volumes of one fixed working dimension, reusing a single
/// spectrum scratch buffer across calls.
pub struct Convolver<'a> {
    backend: &'a dyn ComputeBackend,
    dim: Dim3,
    scratch: SpectrumBuffer,
}

impl<'a> Convolver<'a> {
    pub fn new(backend: &'a dyn ComputeBackend, dim: Dim3) -> Result<Self> {
        dim.validate("working volume")?;
        let scratch = backend.alloc_spectrum(dim)?;
        Ok(Self {
            backend,
            dim,
            scratch,
        })
    }

    pub fn dim(&self) -> Dim3 {
        self.dim
    }

    /// Normalization applied during modulation so that the unnormalized
    /// inverse transform returns to the input's scale.
    pub fn normalization(&self) -> f32 {
        normalization(self.dim)
    }

    /// Forward-transforms a spatial kernel into its OTF.
    pub fn transform(&self, kernel: &RealBuffer) -> Result<SpectrumBuffer> {
        let mut otf = self.backend.alloc_spectrum(self.dim)?;
        self.backend.forward_r2c(kernel, &mut otf)?;
        Ok(otf)
    }

    /// `out = input * kernel` for a kernel already transformed by [`Self::transform`].
    pub fn convolve_otf(
        &mut self,
        input: &RealBuffer,
        otf: &SpectrumBuffer,
        out: &mut RealBuffer,
    ) -> Result<()> {
        let scale = self.normalization();
        self.backend.forward_r2c(input, &mut self.scratch)?;
        self.backend.modulate(&mut self.scratch, otf, scale)?;
        self.backend.inverse_c2r(&self.scratch, out)
    }

    /// `out = input * kernel` with a spatial kernel, transformed on the fly.
    pub fn convolve_internal(
        &mut self,
        input: &RealBuffer,
        kernel: &RealBuffer,
        out: &mut RealBuffer,
    ) -> Result<()> {
        let otf = self.transform(kernel)?;
        self.convolve_otf(input, &otf, out)
    }
}

/// Geometry of one padded computation: an image and a kernel embedded in a
/// working volume of `image + kernel` extent on every axis.
///
/// The image sits unshifted at the origin. The kernel is shifted by
/// `-kernel / 2` per axis so its centre lands on the Fourier origin;
/// without that shift results come back displaced, not wrong-valued.
#[derive(Clone, Copy, Debug)]
pub struct WorkingVolume {
    image: Dim3,
    kernel: Dim3,
    dim: Dim3,
}

impl WorkingVolume {
    pub fn new(image: Dim3, kernel: Dim3) -> Result<Self> {
        image.validate("image")?;
        kernel.validate("kernel")?;
        let dim = image.working(kernel);
        dim.validate("working volume")?;
        Ok(Self { image, kernel, dim })
    }

    pub fn dim(&self) -> Dim3 {
        self.dim
    }

    pub fn image_dim(&self) -> Dim3 {
        self.image
    }

    pub fn kernel_dim(&self) -> Dim3 {
        self.kernel
    }

    /// Scale that returns an unnormalized forward/inverse pair to the input's magnitude.
    pub fn normalization(&self) -> f32 {
        normalization(self.dim)
    }

    pub fn kernel_shift(&self) -> [isize; 3] {
        [
            -((self.kernel.x / 2) as isize),
            -((self.kernel.y / 2) as isize),
            -((self.kernel.z / 2) as isize),
        ]
    }

    /// Zero-pads `image` into the working volume.
    pub fn pad_image(&self, image: &[f32]) -> Result<Vec<f32>> {
        let mut padded = host_zeroed(self.dim.voxel_count())?;
        image::pad_spatial_shift(&mut padded, self.dim, image, self.image, [0; 3], 0.0)?;
        Ok(padded)
    }

    /// Zero-pads `kernel` into the working volume and centres it on the origin.
    pub fn pad_kernel(&self, kernel: &[f32]) -> Result<Vec<f32>> {
        let mut padded = host_zeroed(self.dim.voxel_count())?;
        image::pad_spatial_shift(
            &mut padded,
            self.dim,
            kernel,
            self.kernel,
            self.kernel_shift(),
            0.0,
        )?;
        Ok(padded)
    }

    pub fn upload_image(&self, backend: &dyn ComputeBackend, image: &[f32]) -> Result<RealBuffer> {
        backend.alloc_real_and_copy(self.dim, &self.pad_image(image)?)
    }

    pub fn upload_kernel(&self, backend: &dyn ComputeBackend, kernel: &[f32]) -> Result<RealBuffer> {
        backend.alloc_real_and_copy(self.dim, &self.pad_kernel(kernel)?)
    }

    /// Reads a working-volume result back and clips it to the image extent.
    pub fn finish(&self, backend: &dyn ComputeBackend, result: &RealBuffer, out: &mut [f32]) -> Result<()> {
        self.image.check_len(out, "output")?;
        let mut host = host_zeroed(self.dim.voxel_count())?;
        backend.read_back(result, &mut host)?;
        image::clip(out, self.image, &host, self.dim)
    }
}

/// Convolves `image` with `kernel` without wrap-around, writing an
/// `image_dim` result into `out`.
pub fn convolve(
    backend: &dyn ComputeBackend,
    image: &[f32],
    image_dim: Dim3,
    kernel: &[f32],
    kernel_dim: Dim3,
    out: &mut [f32],
) -> Result<()> {
    let work = WorkingVolume::new(image_dim, kernel_dim)?;
    image_dim.check_len(image, "image")?;
    kernel_dim.check_len(kernel, "kernel")?;
    image_dim.check_len(out, "output")?;
    tracing::debug!(
        "convolve {image_dim} with {kernel_dim} in working volume {}",
        work.dim()
    );

    let input = work.upload_image(backend, image)?;
    let padded_kernel = work.upload_kernel(backend, kernel)?;
    let mut result = backend.alloc_real(work.dim())?;
    Convolver::new(backend, work.dim())?.convolve_internal(&input, &padded_kernel, &mut result)?;
    work.finish(backend, &result, out)
}
