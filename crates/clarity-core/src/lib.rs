pub mod buffer;
pub mod complex;
pub mod compute;
pub mod config;
pub mod consts;
pub mod context;
pub mod convolution;
pub mod deconvolve;
pub mod dim;
pub mod error;
pub mod ffi;
pub mod image;
pub mod synthetic;

pub use context::ExecutionContext;
pub use dim::Dim3;
pub use error::{ClarityError, Result};
