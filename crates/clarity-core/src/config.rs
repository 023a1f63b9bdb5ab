use serde::{Deserialize, Serialize};

use crate::compute::DevicePreference;
use crate::consts::{DEFAULT_ITERATIONS, DEFAULT_WIENER_EPSILON};
use crate::error::{ClarityError, Result};

/// How an [`ExecutionContext`](crate::ExecutionContext) picks its backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub device: DevicePreference,
    /// Worker threads for host loops; `None` uses one per core.
    #[serde(default)]
    pub threads: Option<usize>,
}

impl ContextConfig {
    pub fn cpu(threads: Option<usize>) -> Self {
        Self {
            device: DevicePreference::Cpu,
            threads,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum DeconvolutionMethod {
    Wiener { epsilon: f32 },
    JansenVanCittert { iterations: usize },
    MaximumLikelihood { iterations: usize },
    /// Maximum likelihood with a fixed PSF of the image's own extent.
    BlindMaximumLikelihood { iterations: usize },
}

impl Default for DeconvolutionMethod {
    fn default() -> Self {
        DeconvolutionMethod::JansenVanCittert {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl DeconvolutionMethod {
    pub fn wiener() -> Self {
        DeconvolutionMethod::Wiener {
            epsilon: DEFAULT_WIENER_EPSILON,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeconvolutionMethod::Wiener { .. } => "Wiener",
            DeconvolutionMethod::JansenVanCittert { .. } => "Jansen-van Cittert",
            DeconvolutionMethod::MaximumLikelihood { .. } => "maximum likelihood",
            DeconvolutionMethod::BlindMaximumLikelihood { .. } => "blind maximum likelihood",
        }
    }

    pub fn iterations(&self) -> Option<usize> {
        match *self {
            DeconvolutionMethod::Wiener { .. } => None,
            DeconvolutionMethod::JansenVanCittert { iterations }
            | DeconvolutionMethod::MaximumLikelihood { iterations }
            | DeconvolutionMethod::BlindMaximumLikelihood { iterations } => Some(iterations),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let DeconvolutionMethod::Wiener { epsilon } = *self {
            if !epsilon.is_finite() || epsilon < 0.0 {
                return Err(ClarityError::InvalidArgument(format!(
                    "Wiener epsilon must be finite and non-negative, got {epsilon}"
                )));
            }
        }
        Ok(())
    }
}

/// A backend choice together with the algorithm to run on it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeconvolutionConfig {
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub method: DeconvolutionMethod,
}
