//! TOML job files for `clarity deconvolve --config`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clarity_core::config::DeconvolutionConfig;
use clarity_core::synthetic::gaussian_kernel;
use clarity_core::Dim3;
use serde::{Deserialize, Serialize};

use crate::volume::read_volume;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeFile {
    pub path: PathBuf,
    pub dim: Dim3,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum KernelSource {
    /// Raw volume on disk.
    File(VolumeFile),
    /// Normalized Gaussian generated on the fly.
    Gaussian { dim: Dim3, sigma: f32 },
}

impl Default for KernelSource {
    fn default() -> Self {
        KernelSource::Gaussian {
            dim: Dim3::new(32, 32, 32),
            sigma: 3.0,
        }
    }
}

impl KernelSource {
    pub fn dim(&self) -> Dim3 {
        match self {
            KernelSource::File(file) => file.dim,
            KernelSource::Gaussian { dim, .. } => *dim,
        }
    }

    pub fn load(&self) -> Result<Vec<f32>> {
        match self {
            KernelSource::File(file) => read_volume(&file.path, file.dim),
            KernelSource::Gaussian { dim, sigma } => Ok(gaussian_kernel(*dim, *sigma)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            KernelSource::File(file) => format!("{} ({})", file.path.display(), file.dim),
            KernelSource::Gaussian { dim, sigma } => format!("Gaussian sigma={sigma} ({dim})"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub output: PathBuf,
    pub input: VolumeFile,
    #[serde(default)]
    pub kernel: KernelSource,
    /// Backend and algorithm, as top-level `[context]` and `[method]` tables.
    #[serde(flatten)]
    pub engine: DeconvolutionConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("deconvolved.raw"),
            input: VolumeFile {
                path: PathBuf::from("input.raw"),
                dim: Dim3::new(128, 128, 32),
            },
            kernel: KernelSource::default(),
            engine: DeconvolutionConfig::default(),
        }
    }
}

impl JobConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).context("Invalid job config")
    }
}
