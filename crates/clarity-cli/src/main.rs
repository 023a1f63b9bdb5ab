mod commands;
mod job;
mod summary;
mod volume;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clarity", about = "3D deconvolution of fluorescence microscopy volumes")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the selected compute backend
    Info(commands::info::InfoArgs),
    /// Convolve a raw volume with a kernel
    Convolve(commands::convolve::ConvolveArgs),
    /// Deconvolve a raw volume
    Deconvolve(commands::deconvolve::DeconvolveArgs),
    /// Run the synthetic blurred-block scenario and report RMS per iteration
    Demo(commands::demo::DemoArgs),
    /// Print a default job config as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Convolve(args) => commands::convolve::run(args),
        Commands::Deconvolve(args) => commands::deconvolve::run(args),
        Commands::Demo(args) => commands::demo::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
