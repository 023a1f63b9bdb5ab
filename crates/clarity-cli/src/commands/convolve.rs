use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use clarity_core::{Dim3, ExecutionContext};

use super::{ContextArgs, KernelArgs};
use crate::volume::{parse_dim, read_volume, write_volume};

#[derive(Args)]
pub struct ConvolveArgs {
    /// Input raw f32 volume
    pub file: PathBuf,

    /// Input extents, e.g. 128x128x32
    #[arg(long, value_parser = parse_dim)]
    pub dim: Dim3,

    #[command(flatten)]
    pub kernel: KernelArgs,

    #[command(flatten)]
    pub context: ContextArgs,

    /// Output file path
    #[arg(short, long, default_value = "convolved.raw")]
    pub output: PathBuf,
}

pub fn run(args: &ConvolveArgs) -> Result<()> {
    let ctx = ExecutionContext::new(&args.context.config())?;
    let image = read_volume(&args.file, args.dim)?;
    let source = args.kernel.source();
    let kernel = source.load()?;

    println!("Convolving {} volume with {}", args.dim, source.describe());
    let mut out = vec![0.0f32; args.dim.voxel_count()];
    ctx.convolve(&image, args.dim, &kernel, source.dim(), &mut out)
        .context("Convolution failed")?;

    write_volume(&args.output, &out)?;
    println!("Saved to {}", args.output.display());
    Ok(())
}
