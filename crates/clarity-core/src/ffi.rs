//! Flat C ABI.
//!
//! `clarity_register` / `clarity_unregister` reference-count one process-wide
//! [`ExecutionContext`]; entry points called while nothing is registered run
//! on a temporary CPU context. Every function returns a [`ClarityResult`] and
//! never unwinds across the boundary. Input volumes are copied before the
//! output is written, so callers may pass the same buffer for both.

use std::os::raw::{c_int, c_uint};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use crate::buffer::host_copy;
use crate::config::ContextConfig;
use crate::context::ExecutionContext;
use crate::dim::Dim3;
use crate::error::{ClarityError, Result};
use crate::image;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClarityResult {
    FftFailed = 0,
    OutOfMemory,
    DeviceOutOfMemory,
    InvalidOperation,
    InvalidArgument,
    Success,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClarityDim3 {
    pub x: c_int,
    pub y: c_int,
    pub z: c_int,
}

impl TryFrom<ClarityDim3> for Dim3 {
    type Error = ClarityError;

    fn try_from(d: ClarityDim3) -> Result<Dim3> {
        let axis = |v: c_int| {
            usize::try_from(v)
                .map_err(|_| ClarityError::InvalidArgument(format!("negative extent {v}")))
        };
        let dim = Dim3::new(axis(d.x)?, axis(d.y)?, axis(d.z)?);
        dim.validate("volume")?;
        Ok(dim)
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

struct Registry {
    clients: usize,
    threads: usize,
    context: Option<ExecutionContext>,
}

static REGISTRY: Mutex<Registry> = Mutex::new(Registry {
    clients: 0,
    threads: 0,
    context: None,
});

fn with_registry<T>(f: impl FnOnce(&mut Registry) -> Result<T>) -> Result<T> {
    let mut registry = REGISTRY
        .lock()
        .map_err(|_| ClarityError::InvalidOperation("registry lock poisoned".into()))?;
    f(&mut registry)
}

fn build_context(threads: usize) -> Result<ExecutionContext> {
    ExecutionContext::new(&ContextConfig {
        threads: Some(threads),
        ..ContextConfig::default()
    })
}

/// The registered context, or a CPU context for unregistered callers.
fn current_context() -> Result<ExecutionContext> {
    let (context, threads) = with_registry(|r| Ok((r.context.clone(), r.threads)))?;
    match context {
        Some(context) => Ok(context),
        None => ExecutionContext::cpu_only(threads),
    }
}

fn guard(f: impl FnOnce() -> Result<()>) -> ClarityResult {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => ClarityResult::Success,
        Ok(Err(e)) => {
            tracing::warn!("{e}");
            e.code()
        }
        Err(_) => ClarityResult::InvalidOperation,
    }
}

/// Reads `dim` voxels from `ptr` into an owned buffer.
///
/// # Safety
/// `ptr` must be null or valid for reads of `dim.voxel_count()` floats.
unsafe fn read_volume(ptr: *const f32, dim: Dim3, what: &str) -> Result<Vec<f32>> {
    if ptr.is_null() {
        return Err(ClarityError::InvalidArgument(format!("{what} is null")));
    }
    host_copy(std::slice::from_raw_parts(ptr, dim.voxel_count()))
}

/// # Safety
/// `ptr` must be null or valid for writes of `dim.voxel_count()` floats and
/// not aliased by any live reference.
unsafe fn output<'a>(ptr: *mut f32, dim: Dim3) -> Result<&'a mut [f32]> {
    if ptr.is_null() {
        return Err(ClarityError::InvalidArgument("output is null".into()));
    }
    Ok(std::slice::from_raw_parts_mut(ptr, dim.voxel_count()))
}

fn iteration_count(iterations: c_int) -> Result<usize> {
    usize::try_from(iterations)
        .map_err(|_| ClarityError::InvalidArgument(format!("negative iteration count {iterations}")))
}

/// Builds a dimension from an `[x, y, z]` array; null yields all zeros.
///
/// # Safety
/// `dims` must be null or point to three ints.
#[no_mangle]
pub unsafe extern "C" fn clarity_dim3_from_array(dims: *const c_int) -> ClarityDim3 {
    if dims.is_null() {
        return ClarityDim3::default();
    }
    let d = std::slice::from_raw_parts(dims, 3);
    ClarityDim3 {
        x: d[0],
        y: d[1],
        z: d[2],
    }
}

/// Adds a client, creating the shared context on the first call.
#[no_mangle]
pub extern "C" fn clarity_register() -> ClarityResult {
    guard(|| {
        with_registry(|r| {
            if r.context.is_none() {
                r.context = Some(build_context(r.threads)?);
            }
            r.clients += 1;
            Ok(())
        })
    })
}

/// Drops a client; the context is destroyed with the last one.
#[no_mangle]
pub extern "C" fn clarity_unregister() -> ClarityResult {
    guard(|| {
        with_registry(|r| {
            r.clients = r.clients.saturating_sub(1);
            if r.clients == 0 {
                r.context = None;
            }
            Ok(())
        })
    })
}

/// Sets the worker count (0 for one per core), rebuilding a live context.
#[no_mangle]
pub extern "C" fn clarity_set_number_of_threads(n: c_uint) -> ClarityResult {
    guard(|| {
        with_registry(|r| {
            r.threads = n as usize;
            if r.context.is_some() {
                r.context = Some(build_context(r.threads)?);
            }
            Ok(())
        })
    })
}

// ---------------------------------------------------------------------------
// Utilities
// ---------------------------------------------------------------------------

/// # Safety
/// `dst` and `src` must hold `dst_dim` and `src_dim` voxels; `shift` must
/// point to three ints.
#[no_mangle]
pub unsafe extern "C" fn clarity_image_pad_spatial_shift(
    dst: *mut f32,
    dst_dim: ClarityDim3,
    src: *const f32,
    src_dim: ClarityDim3,
    shift: *const c_int,
    fill_value: f32,
) -> ClarityResult {
    guard(|| {
        let (dst_dim, src_dim) = (Dim3::try_from(dst_dim)?, Dim3::try_from(src_dim)?);
        if shift.is_null() {
            return Err(ClarityError::InvalidArgument("shift is null".into()));
        }
        let s = std::slice::from_raw_parts(shift, 3);
        let shift = [s[0] as isize, s[1] as isize, s[2] as isize];
        let src = read_volume(src, src_dim, "source")?;
        image::pad_spatial_shift(output(dst, dst_dim)?, dst_dim, &src, src_dim, shift, fill_value)
    })
}

/// # Safety
/// `dst` and `src` must hold `dst_dim` and `src_dim` voxels.
#[no_mangle]
pub unsafe extern "C" fn clarity_image_clip(
    dst: *mut f32,
    dst_dim: ClarityDim3,
    src: *const f32,
    src_dim: ClarityDim3,
) -> ClarityResult {
    guard(|| {
        let (dst_dim, src_dim) = (Dim3::try_from(dst_dim)?, Dim3::try_from(src_dim)?);
        let src = read_volume(src, src_dim, "source")?;
        image::clip(output(dst, dst_dim)?, dst_dim, &src, src_dim)
    })
}

// ---------------------------------------------------------------------------
// Deconvolution and convolution
// ---------------------------------------------------------------------------

/// # Safety
/// `in_image` and `out_image` must hold `image_dim` voxels, `kernel_image`
/// `kernel_dim` voxels.
#[no_mangle]
pub unsafe extern "C" fn clarity_wiener_deconvolve(
    in_image: *const f32,
    image_dim: ClarityDim3,
    kernel_image: *const f32,
    kernel_dim: ClarityDim3,
    out_image: *mut f32,
    epsilon: f32,
) -> ClarityResult {
    guard(|| {
        let (image_dim, kernel_dim) = (Dim3::try_from(image_dim)?, Dim3::try_from(kernel_dim)?);
        let image = read_volume(in_image, image_dim, "input image")?;
        let kernel = read_volume(kernel_image, kernel_dim, "kernel")?;
        current_context()?.wiener_deconvolve(
            &image,
            image_dim,
            &kernel,
            kernel_dim,
            output(out_image, image_dim)?,
            epsilon,
        )
    })
}

/// # Safety
/// As [`clarity_wiener_deconvolve`].
#[no_mangle]
pub unsafe extern "C" fn clarity_jansen_van_cittert_deconvolve(
    in_image: *const f32,
    image_dim: ClarityDim3,
    kernel_image: *const f32,
    kernel_dim: ClarityDim3,
    out_image: *mut f32,
    iterations: c_int,
) -> ClarityResult {
    guard(|| {
        let (image_dim, kernel_dim) = (Dim3::try_from(image_dim)?, Dim3::try_from(kernel_dim)?);
        let iterations = iteration_count(iterations)?;
        let image = read_volume(in_image, image_dim, "input image")?;
        let kernel = read_volume(kernel_image, kernel_dim, "kernel")?;
        current_context()?.jansen_van_cittert_deconvolve(
            &image,
            image_dim,
            &kernel,
            kernel_dim,
            output(out_image, image_dim)?,
            iterations,
        )
    })
}

/// Not implemented numerically: zeroes the output and reports
/// `InvalidOperation`.
///
/// # Safety
/// `out_image` must be null or hold `image_dim` voxels.
#[no_mangle]
pub unsafe extern "C" fn clarity_smoothed_jansen_van_cittert_deconvolve(
    _in_image: *const f32,
    image_dim: ClarityDim3,
    _kernel_image: *const f32,
    _kernel_dim: ClarityDim3,
    out_image: *mut f32,
    _iterations: c_uint,
    _smooth_interval: c_uint,
    _smooth_sigma: *const f32,
) -> ClarityResult {
    guard(|| unimplemented_method(out_image, image_dim, "smoothed Jansen-van Cittert"))
}

/// Not implemented numerically: zeroes the output and reports
/// `InvalidOperation`.
///
/// # Safety
/// `out_image` must be null or hold `image_dim` voxels.
#[no_mangle]
pub unsafe extern "C" fn clarity_i_divergence_deconvolve(
    _in_image: *const f32,
    image_dim: ClarityDim3,
    _kernel_image: *const f32,
    _kernel_dim: ClarityDim3,
    out_image: *mut f32,
) -> ClarityResult {
    guard(|| unimplemented_method(out_image, image_dim, "I-divergence"))
}

unsafe fn unimplemented_method(out_image: *mut f32, image_dim: ClarityDim3, name: &str) -> Result<()> {
    output(out_image, Dim3::try_from(image_dim)?)?.fill(0.0);
    Err(ClarityError::InvalidOperation(format!(
        "{name} deconvolution is not implemented"
    )))
}

/// # Safety
/// As [`clarity_wiener_deconvolve`].
#[no_mangle]
pub unsafe extern "C" fn clarity_maximum_likelihood_deconvolve(
    in_image: *const f32,
    image_dim: ClarityDim3,
    kernel_image: *const f32,
    kernel_dim: ClarityDim3,
    out_image: *mut f32,
    iterations: c_int,
) -> ClarityResult {
    guard(|| {
        let (image_dim, kernel_dim) = (Dim3::try_from(image_dim)?, Dim3::try_from(kernel_dim)?);
        let iterations = iteration_count(iterations)?;
        let image = read_volume(in_image, image_dim, "input image")?;
        let kernel = read_volume(kernel_image, kernel_dim, "kernel")?;
        current_context()?.maximum_likelihood_deconvolve(
            &image,
            image_dim,
            &kernel,
            kernel_dim,
            output(out_image, image_dim)?,
            iterations,
        )
    })
}

/// Maximum likelihood with a fixed PSF. Errors are reported like every
/// other entry point.
///
/// # Safety
/// `out_image`, `in_image` and `psf_image` must each hold `dim` voxels.
#[no_mangle]
pub unsafe extern "C" fn clarity_blind_maximum_likelihood_deconvolve(
    out_image: *mut f32,
    in_image: *const f32,
    psf_image: *const f32,
    dim: ClarityDim3,
    iterations: c_uint,
) -> ClarityResult {
    guard(|| {
        let dim = Dim3::try_from(dim)?;
        let image = read_volume(in_image, dim, "input image")?;
        let psf = read_volume(psf_image, dim, "psf")?;
        current_context()?.blind_maximum_likelihood_deconvolve(
            output(out_image, dim)?,
            &image,
            &psf,
            dim,
            iterations as usize,
        )
    })
}

/// # Safety
/// As [`clarity_wiener_deconvolve`].
#[no_mangle]
pub unsafe extern "C" fn clarity_convolve(
    in_image: *const f32,
    image_dim: ClarityDim3,
    kernel: *const f32,
    kernel_dim: ClarityDim3,
    out_image: *mut f32,
) -> ClarityResult {
    guard(|| {
        let (image_dim, kernel_dim) = (Dim3::try_from(image_dim)?, Dim3::try_from(kernel_dim)?);
        let image = read_volume(in_image, image_dim, "input image")?;
        let kernel = read_volume(kernel, kernel_dim, "kernel")?;
        current_context()?.convolve(
            &image,
            image_dim,
            &kernel,
            kernel_dim,
            output(out_image, image_dim)?,
        )
    })
}
