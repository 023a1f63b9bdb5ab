mod backend;
pub mod cpu;
pub mod fft3d;
#[cfg(feature = "gpu")]
pub mod wgpu_backend;

pub use backend::{create_backend, ComputeBackend, DevicePreference};
