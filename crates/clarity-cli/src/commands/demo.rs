use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use clarity_core::image::rms_difference;
use clarity_core::synthetic::{binary_block, gaussian_kernel};
use clarity_core::{Dim3, ExecutionContext};
use indicatif::{ProgressBar, ProgressStyle};

use super::ContextArgs;
use crate::volume::{parse_dim, write_volume};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DemoMethod {
    Jvc,
    Ml,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Synthetic volume extents
    #[arg(long, value_parser = parse_dim, default_value = "128x128x32")]
    pub size: Dim3,

    /// Gaussian kernel extents
    #[arg(long, value_parser = parse_dim, default_value = "32x32x32")]
    pub kernel_dim: Dim3,

    /// Gaussian kernel sigma in voxels
    #[arg(long, default_value = "3.0")]
    pub sigma: f32,

    /// Highest iteration count to evaluate
    #[arg(long, default_value = "10")]
    pub iterations: usize,

    /// Iterative algorithm to evaluate
    #[arg(long, value_enum, default_value = "jvc")]
    pub method: DemoMethod,

    /// Directory to save truth, blurred and restored volumes
    #[arg(long)]
    pub save: Option<PathBuf>,

    #[command(flatten)]
    pub context: ContextArgs,
}

/// Blurs a binary block with a Gaussian, deconvolves it with 1..=N
/// iterations and reports the RMS error against the block for each count.
pub fn run(args: &DemoArgs) -> Result<()> {
    let ctx = ExecutionContext::new(&args.context.config())?;
    let dim = args.size;
    let truth = binary_block(dim);
    let kernel = gaussian_kernel(args.kernel_dim, args.sigma);

    let mut blurred = vec![0.0f32; dim.voxel_count()];
    ctx.convolve(&truth, dim, &kernel, args.kernel_dim, &mut blurred)
        .context("Convolution failed")?;
    let baseline = rms_difference(&blurred, &truth)?;

    let pb = ProgressBar::new(args.iterations as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("Iterating [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );

    let mut restored = vec![0.0f32; dim.voxel_count()];
    let mut errors = Vec::with_capacity(args.iterations);
    for k in 1..=args.iterations {
        match args.method {
            DemoMethod::Jvc => ctx.jansen_van_cittert_deconvolve(
                &blurred,
                dim,
                &kernel,
                args.kernel_dim,
                &mut restored,
                k,
            ),
            DemoMethod::Ml => ctx.maximum_likelihood_deconvolve(
                &blurred,
                dim,
                &kernel,
                args.kernel_dim,
                &mut restored,
                k,
            ),
        }
        .with_context(|| format!("Deconvolution with {k} iterations failed"))?;
        errors.push(rms_difference(&restored, &truth)?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    crate::summary::print_rms_table(ctx.backend().name(), baseline, &errors);

    if let Some(ref dir) = args.save {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        write_volume(&dir.join("truth.raw"), &truth)?;
        write_volume(&dir.join("blurred.raw"), &blurred)?;
        write_volume(&dir.join("restored.raw"), &restored)?;
        write_volume(&dir.join("kernel.raw"), &kernel)?;
        println!("Volumes saved to {}", dir.display());
    }
    Ok(())
}
