use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClarityError {
    #[error("FFT failed: {0}")]
    FftFailed(String),

    #[error("Host out of memory allocating {bytes} bytes")]
    OutOfMemory { bytes: usize },

    #[error("Device out of memory allocating {bytes} bytes")]
    DeviceOutOfMemory { bytes: usize },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ClarityError {
    /// Result code reported across the C ABI.
    pub fn code(&self) -> crate::ffi::ClarityResult {
        use crate::ffi::ClarityResult;
        match self {
            ClarityError::FftFailed(_) => ClarityResult::FftFailed,
            ClarityError::OutOfMemory { .. } => ClarityResult::OutOfMemory,
            ClarityError::DeviceOutOfMemory { .. } => ClarityResult::DeviceOutOfMemory,
            ClarityError::InvalidOperation(_) => ClarityResult::InvalidOperation,
            ClarityError::InvalidArgument(_) => ClarityResult::InvalidArgument,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClarityError>;
