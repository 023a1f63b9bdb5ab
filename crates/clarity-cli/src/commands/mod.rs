pub mod config;
pub mod convolve;
pub mod deconvolve;
pub mod demo;
pub mod info;

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use clarity_core::compute::DevicePreference;
use clarity_core::config::ContextConfig;
use clarity_core::Dim3;

use crate::job::{KernelSource, VolumeFile};
use crate::volume::parse_dim;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DeviceArg {
    Auto,
    Cpu,
    Gpu,
}

impl From<DeviceArg> for DevicePreference {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Auto => DevicePreference::Auto,
            DeviceArg::Cpu => DevicePreference::Cpu,
            DeviceArg::Gpu => DevicePreference::Gpu,
        }
    }
}

#[derive(Args)]
pub struct ContextArgs {
    /// Compute device
    #[arg(long, value_enum, default_value = "auto")]
    pub device: DeviceArg,

    /// Worker threads (0 = one per core)
    #[arg(long, default_value = "0")]
    pub threads: usize,
}

impl ContextArgs {
    pub fn config(&self) -> ContextConfig {
        ContextConfig {
            device: self.device.into(),
            threads: (self.threads > 0).then_some(self.threads),
        }
    }
}

#[derive(Args)]
pub struct KernelArgs {
    /// Raw f32 kernel volume; a Gaussian is generated when omitted
    #[arg(long)]
    pub kernel: Option<PathBuf>,

    /// Kernel extents, e.g. 32x32x32
    #[arg(long, value_parser = parse_dim, default_value = "32x32x32")]
    pub kernel_dim: Dim3,

    /// Gaussian kernel sigma in voxels
    #[arg(long, default_value = "3.0")]
    pub sigma: f32,
}

impl KernelArgs {
    pub fn source(&self) -> KernelSource {
        match self.kernel {
            Some(ref path) => KernelSource::File(VolumeFile {
                path: path.clone(),
                dim: self.kernel_dim,
            }),
            None => KernelSource::Gaussian {
                dim: self.kernel_dim,
                sigma: self.sigma,
            },
        }
    }
}
