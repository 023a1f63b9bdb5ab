/// Minimum voxel count to fan elementwise loops out over the thread pool.
pub const PARALLEL_VOXEL_THRESHOLD: usize = 65_536;

/// Denominator magnitude below which component-wise division substitutes
/// the caller's fallback value. Fixed numerical policy shared by every backend.
pub const DIVISION_EPSILON: f32 = 1e-5;

/// Default Wiener regularization constant.
pub const DEFAULT_WIENER_EPSILON: f32 = 0.01;

/// Default iteration count for the iterative algorithms.
pub const DEFAULT_ITERATIONS: usize = 10;

/// Fraction of the input maximum used as the Jansen-van Cittert midpoint `A`.
pub const JVC_MIDPOINT_FRACTION: f32 = 0.5;

/// Workgroup width of the 1-D GPU kernels.
pub const GPU_WORKGROUP_SIZE: u32 = 256;
