use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use clarity_core::config::{DeconvolutionConfig, DeconvolutionMethod};
use clarity_core::{Dim3, ExecutionContext};
use indicatif::{ProgressBar, ProgressStyle};

use super::{ContextArgs, KernelArgs};
use crate::job::{JobConfig, VolumeFile};
use crate::volume::{parse_dim, read_volume, write_volume};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MethodArg {
    Wiener,
    Jvc,
    Ml,
    BlindMl,
}

#[derive(Args)]
pub struct DeconvolveArgs {
    /// Input raw f32 volume (ignored with --config)
    pub file: Option<PathBuf>,

    /// Job config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Input extents, e.g. 128x128x32
    #[arg(long, value_parser = parse_dim)]
    pub dim: Option<Dim3>,

    /// Deconvolution algorithm
    #[arg(long, value_enum, default_value = "jvc")]
    pub method: MethodArg,

    /// Iteration count for the iterative algorithms
    #[arg(long, default_value = "10")]
    pub iterations: usize,

    /// Wiener regularization constant
    #[arg(long, default_value = "0.01")]
    pub epsilon: f32,

    #[command(flatten)]
    pub kernel: KernelArgs,

    #[command(flatten)]
    pub context: ContextArgs,

    /// Output file path
    #[arg(short, long, default_value = "deconvolved.raw")]
    pub output: PathBuf,
}

pub fn run(args: &DeconvolveArgs) -> Result<()> {
    let job = match args.config {
        Some(ref path) => JobConfig::load(path)?,
        None => build_job_from_args(args)?,
    };

    let ctx = ExecutionContext::new(&job.engine.context)?;
    crate::summary::print_job_summary(&job, ctx.backend().name());

    let image = read_volume(&job.input.path, job.input.dim)?;
    let kernel = job.kernel.load()?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner} {msg} [{elapsed}]")?);
    pb.set_message(format!("Running {}", job.engine.method.name()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let start = Instant::now();
    let mut out = vec![0.0f32; job.input.dim.voxel_count()];
    ctx.deconvolve(
        &job.engine.method,
        &image,
        job.input.dim,
        &kernel,
        job.kernel.dim(),
        &mut out,
    )
    .with_context(|| format!("{} deconvolution failed", job.engine.method.name()))?;
    let elapsed = start.elapsed();
    tracing::info!("{} finished in {elapsed:?}", job.engine.method.name());
    pb.finish_with_message(format!("Done in {:.2}s", elapsed.as_secs_f32()));

    write_volume(&job.output, &out)?;
    println!("\nOutput saved to {}", job.output.display());
    Ok(())
}

fn build_job_from_args(args: &DeconvolveArgs) -> Result<JobConfig> {
    let (Some(file), Some(dim)) = (args.file.clone(), args.dim) else {
        bail!("an input file and --dim are required unless --config is given");
    };

    let method = match args.method {
        MethodArg::Wiener => DeconvolutionMethod::Wiener {
            epsilon: args.epsilon,
        },
        MethodArg::Jvc => DeconvolutionMethod::JansenVanCittert {
            iterations: args.iterations,
        },
        MethodArg::Ml => DeconvolutionMethod::MaximumLikelihood {
            iterations: args.iterations,
        },
        MethodArg::BlindMl => DeconvolutionMethod::BlindMaximumLikelihood {
            iterations: args.iterations,
        },
    };

    Ok(JobConfig {
        output: args.output.clone(),
        input: VolumeFile { path: file, dim },
        kernel: args.kernel.source(),
        engine: DeconvolutionConfig {
            context: args.context.config(),
            method,
        },
    })
}
