use anyhow::Result;
use clap::Args;
use clarity_core::ExecutionContext;

use super::ContextArgs;

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub context: ContextArgs,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let ctx = ExecutionContext::new(&args.context.config())?;

    println!("Version:     {}", env!("CARGO_PKG_VERSION"));
    println!("GPU support: {}", if cfg!(feature = "gpu") { "compiled in" } else { "not compiled in" });
    println!("Backend:     {}", ctx.backend().name());
    println!("On GPU:      {}", if ctx.is_gpu() { "yes" } else { "no" });
    println!("Threads:     {}", ctx.threads());

    Ok(())
}
