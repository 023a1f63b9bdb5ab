use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;

use crate::buffer::{host_copy, host_zeroed, BufferInner, RealBuffer, SpectrumBuffer};
use crate::complex::{self, Complex32};
use crate::consts::{DIVISION_EPSILON, PARALLEL_VOXEL_THRESHOLD};
use crate::dim::Dim3;
use crate::error::{ClarityError, Result};

use super::fft3d::{self, Fft3dPlanner};
use super::ComputeBackend;

/// CPU backend: a fixed Rayon pool for elementwise loops and `rustfft` for transforms.
pub struct CpuBackend {
    pool: rayon::ThreadPool,
    threads: usize,
    planner: Fft3dPlanner,
}

impl CpuBackend {
    /// Builds a backend with `threads` workers (0 selects one per core).
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("clarity-worker-{i}"))
            .build()
            .map_err(|e| ClarityError::InvalidOperation(format!("thread pool: {e}")))?;
        let threads = pool.current_num_threads();
        tracing::debug!("CPU backend with {threads} worker threads");
        Ok(Self {
            pool,
            threads,
            planner: Fft3dPlanner::new(),
        })
    }

    fn zip_with(
        &self,
        a: &[f32],
        b: &[f32],
        out: &mut [f32],
        op: impl Fn(f32, f32) -> f32 + Send + Sync,
    ) {
        if out.len() >= PARALLEL_VOXEL_THRESHOLD {
            self.pool.install(|| {
                out.par_iter_mut()
                    .zip(a.par_iter().zip(b.par_iter()))
                    .for_each(|(o, (&x, &y))| *o = op(x, y));
            });
        } else {
            for (o, (&x, &y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
                *o = op(x, y);
            }
        }
    }

    fn zip_bins(
        &self,
        a: &mut [f32],
        b: &[f32],
        op: impl Fn(Complex32, Complex32) -> Complex32 + Send + Sync,
    ) {
        let apply = |pa: &mut [f32], pb: &[f32]| {
            let v = op(complex::load(pa, 0), complex::load(pb, 0));
            complex::store(pa, 0, v);
        };
        if a.len() / 2 >= PARALLEL_VOXEL_THRESHOLD {
            self.pool.install(|| {
                a.par_chunks_exact_mut(2)
                    .zip(b.par_chunks_exact(2))
                    .for_each(|(pa, pb)| apply(pa, pb));
            });
        } else {
            for (pa, pb) in a.chunks_exact_mut(2).zip(b.chunks_exact(2)) {
                apply(pa, pb);
            }
        }
    }
}

fn same_dim(a: Dim3, b: Dim3, op: &str) -> Result<()> {
    if a != b {
        return Err(ClarityError::InvalidArgument(format!(
            "{op}: operand dimensions differ ({a} vs {b})"
        )));
    }
    Ok(())
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "CPU/Rayon"
    }

    fn threads(&self) -> usize {
        self.threads
    }

    fn alloc_real(&self, dim: Dim3) -> Result<RealBuffer> {
        Ok(RealBuffer::from_inner(
            BufferInner::Host(host_zeroed(dim.voxel_count())?),
            dim,
        ))
    }

    fn alloc_spectrum(&self, dim: Dim3) -> Result<SpectrumBuffer> {
        Ok(SpectrumBuffer::from_inner(
            BufferInner::Host(host_zeroed(dim.spectrum_len())?),
            dim,
        ))
    }

    fn alloc_real_and_copy(&self, dim: Dim3, src: &[f32]) -> Result<RealBuffer> {
        dim.check_len(src, "source")?;
        Ok(RealBuffer::from_inner(BufferInner::Host(host_copy(src)?), dim))
    }

    fn copy_to_device(&self, _dst: &mut RealBuffer, _src: &[f32]) -> Result<()> {
        Err(ClarityError::InvalidOperation(
            "copy to device on a host-only backend".into(),
        ))
    }

    fn copy_from_device(&self, _src: &RealBuffer, _dst: &mut [f32]) -> Result<()> {
        Err(ClarityError::InvalidOperation(
            "copy from device on a host-only backend".into(),
        ))
    }

    fn reduce_sum(&self, input: &RealBuffer) -> Result<f32> {
        let data = input.host()?;
        let sum = if data.len() >= PARALLEL_VOXEL_THRESHOLD {
            self.pool
                .install(|| data.par_iter().map(|&v| v as f64).sum::<f64>())
        } else {
            data.iter().map(|&v| v as f64).sum::<f64>()
        };
        Ok(sum as f32)
    }

    fn multiply(&self, a: &RealBuffer, b: &RealBuffer, out: &mut RealBuffer) -> Result<()> {
        same_dim(a.dim(), b.dim(), "multiply")?;
        same_dim(a.dim(), out.dim(), "multiply")?;
        self.zip_with(a.host()?, b.host()?, out.host_mut()?, |x, y| x * y);
        Ok(())
    }

    fn divide(
        &self,
        a: &RealBuffer,
        b: &RealBuffer,
        fallback: f32,
        out: &mut RealBuffer,
    ) -> Result<()> {
        same_dim(a.dim(), b.dim(), "divide")?;
        same_dim(a.dim(), out.dim(), "divide")?;
        self.zip_with(a.host()?, b.host()?, out.host_mut()?, |x, y| {
            if y.abs() < DIVISION_EPSILON {
                fallback
            } else {
                x / y
            }
        });
        Ok(())
    }

    fn scale(&self, input: &RealBuffer, factor: f32, out: &mut RealBuffer) -> Result<()> {
        same_dim(input.dim(), out.dim(), "scale")?;
        let src = input.host()?;
        let dst = out.host_mut()?;
        if dst.len() >= PARALLEL_VOXEL_THRESHOLD {
            self.pool.install(|| {
                dst.par_iter_mut()
                    .zip(src.par_iter())
                    .for_each(|(o, &v)| *o = v * factor);
            });
        } else {
            for (o, &v) in dst.iter_mut().zip(src) {
                *o = v * factor;
            }
        }
        Ok(())
    }

    fn forward_r2c(&self, input: &RealBuffer, out: &mut SpectrumBuffer) -> Result<()> {
        let dim = input.dim();
        same_dim(dim, out.dim(), "forward transform")?;
        let view = ArrayView3::from_shape(dim.shape(), input.host()?)
            .map_err(|e| ClarityError::FftFailed(e.to_string()))?;
        let parallel = dim.voxel_count() >= PARALLEL_VOXEL_THRESHOLD;
        let spectrum = self
            .pool
            .install(|| fft3d::r2c_forward(&self.planner, view, parallel))?;

        let dst = out.host_mut()?;
        for (i, bin) in spectrum.iter().enumerate() {
            complex::store(dst, i, *bin);
        }
        Ok(())
    }

    fn inverse_c2r(&self, input: &SpectrumBuffer, out: &mut RealBuffer) -> Result<()> {
        let dim = out.dim();
        same_dim(input.dim(), dim, "inverse transform")?;
        let bins: Vec<Complex32> = input
            .host()?
            .chunks_exact(2)
            .map(|p| Complex32::new(p[0], p[1]))
            .collect();
        let spectrum = Array3::from_shape_vec(dim.spectrum_shape(), bins)
            .map_err(|e| ClarityError::FftFailed(e.to_string()))?;
        let parallel = dim.voxel_count() >= PARALLEL_VOXEL_THRESHOLD;
        let result = self
            .pool
            .install(|| fft3d::c2r_inverse(&self.planner, spectrum.view(), dim, parallel))?;

        for (o, v) in out.host_mut()?.iter_mut().zip(result.iter()) {
            *o = *v;
        }
        Ok(())
    }

    fn modulate(&self, a: &mut SpectrumBuffer, b: &SpectrumBuffer, scale: f32) -> Result<()> {
        same_dim(a.dim(), b.dim(), "modulate")?;
        self.zip_bins(a.host_mut()?, b.host()?, |x, y| {
            complex::scale(complex::multiply(x, y), scale)
        });
        Ok(())
    }

    fn wiener_filter(
        &self,
        spectrum: &mut SpectrumBuffer,
        otf: &SpectrumBuffer,
        epsilon: f32,
        scale: f32,
    ) -> Result<()> {
        same_dim(spectrum.dim(), otf.dim(), "wiener filter")?;
        self.zip_bins(spectrum.host_mut()?, otf.host()?, |s, h| {
            let gain = 1.0 / (complex::magnitude_sq(h) + epsilon);
            let filtered = complex::multiply(complex::conjugate(h), s);
            complex::scale(filtered, gain * scale)
        });
        Ok(())
    }

    fn jansen_van_cittert_update(
        &self,
        input: &RealBuffer,
        blurred: &RealBuffer,
        guess: &mut RealBuffer,
        a: f32,
    ) -> Result<()> {
        same_dim(input.dim(), blurred.dim(), "jansen-van cittert")?;
        same_dim(input.dim(), guess.dim(), "jansen-van cittert")?;
        let inv_a = 1.0 / a;
        let update = |g: &mut f32, i: f32, o: f32| {
            let t = (o - a) * inv_a;
            let gamma = 1.0 - t * t;
            *g = (*g + gamma * (i - o)).max(0.0);
        };

        let (src, obs) = (input.host()?, blurred.host()?);
        let dst = guess.host_mut()?;
        if dst.len() >= PARALLEL_VOXEL_THRESHOLD {
            self.pool.install(|| {
                dst.par_iter_mut()
                    .zip(src.par_iter().zip(obs.par_iter()))
                    .for_each(|(g, (&i, &o))| update(g, i, o));
            });
        } else {
            for (g, (&i, &o)) in dst.iter_mut().zip(src.iter().zip(obs)) {
                update(g, i, o);
            }
        }
        Ok(())
    }
}
