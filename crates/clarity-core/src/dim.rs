use serde::{Deserialize, Serialize};

use crate::error::{ClarityError, Result};

/// Extents of a 3D volume. Buffers are addressed with x fastest-varying.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dim3 {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Dim3 {
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    pub const fn from_array(dims: [usize; 3]) -> Self {
        Self::new(dims[0], dims[1], dims[2])
    }

    /// Total number of voxels, `x * y * z`.
    pub const fn voxel_count(self) -> usize {
        self.x * self.y * self.z
    }

    /// Number of complex bins kept along x by a real-to-complex transform.
    pub const fn half_x(self) -> usize {
        self.x / 2 + 1
    }

    /// Number of complex bins in the packed half-spectrum.
    pub const fn spectrum_bins(self) -> usize {
        self.z * self.y * self.half_x()
    }

    /// Float count of the packed half-spectrum: `2 * nz * ny * (nx/2 + 1)`.
    pub const fn spectrum_len(self) -> usize {
        2 * self.spectrum_bins()
    }

    /// `ndarray` shape with the slowest axis first: `(z, y, x)`.
    pub const fn shape(self) -> (usize, usize, usize) {
        (self.z, self.y, self.x)
    }

    /// Shape of the packed half-spectrum in complex bins: `(z, y, x/2 + 1)`.
    pub const fn spectrum_shape(self) -> (usize, usize, usize) {
        (self.z, self.y, self.half_x())
    }

    /// Flat index of voxel `(x, y, z)`.
    pub const fn index(self, x: usize, y: usize, z: usize) -> usize {
        (z * self.y + y) * self.x + x
    }

    /// Padded extent large enough that cyclic convolution of an image of
    /// this size with a kernel of `kernel` size does not wrap around.
    pub const fn working(self, kernel: Dim3) -> Dim3 {
        Dim3::new(
            self.x.saturating_add(kernel.x),
            self.y.saturating_add(kernel.y),
            self.z.saturating_add(kernel.z),
        )
    }

    /// True when every axis of `self` fits inside `other`.
    pub const fn fits_within(self, other: Dim3) -> bool {
        self.x <= other.x && self.y <= other.y && self.z <= other.z
    }

    /// Voxel count, or `None` if the product overflows.
    pub fn checked_voxel_count(self) -> Option<usize> {
        self.x.checked_mul(self.y)?.checked_mul(self.z)
    }

    /// Bytes of the larger of the real volume and its half-spectrum, or
    /// `None` when that exceeds what a single allocation can address.
    pub fn checked_byte_len(self) -> Option<usize> {
        let spectrum = self
            .z
            .checked_mul(self.y)?
            .checked_mul(self.half_x())?
            .checked_mul(2)?;
        let bytes = self
            .checked_voxel_count()?
            .max(spectrum)
            .checked_mul(std::mem::size_of::<f32>())?;
        (bytes <= isize::MAX as usize).then_some(bytes)
    }

    /// Rejects empty extents and extents too large to allocate.
    pub fn validate(self, what: &str) -> Result<()> {
        if self.x == 0 || self.y == 0 || self.z == 0 {
            return Err(ClarityError::InvalidArgument(format!(
                "{what} has an empty dimension: {self}"
            )));
        }
        if self.checked_byte_len().is_none() {
            return Err(ClarityError::InvalidArgument(format!(
                "{what} of {self} is too large to address"
            )));
        }
        Ok(())
    }

    /// Checks that `data` holds exactly one float per voxel.
    pub fn check_len(self, data: &[f32], what: &str) -> Result<()> {
        self.validate(what)?;
        if data.len() != self.voxel_count() {
            return Err(ClarityError::InvalidArgument(format!(
                "{what} holds {} values, expected {} for {self}",
                data.len(),
                self.voxel_count()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Dim3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}

impl From<[usize; 3]> for Dim3 {
    fn from(dims: [usize; 3]) -> Self {
        Self::from_array(dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spectrum_len_uses_half_width() {
        let dim = Dim3::new(9, 4, 3);
        assert_eq!(dim.half_x(), 5);
        assert_eq!(dim.spectrum_len(), 2 * 3 * 4 * 5);
    }

    #[test]
    fn working_dimension_adds_kernel_extent() {
        let work = Dim3::new(128, 128, 32).working(Dim3::new(32, 32, 32));
        assert_eq!(work, Dim3::new(160, 160, 64));
    }

    #[test]
    fn index_is_x_fastest() {
        let dim = Dim3::new(4, 3, 2);
        assert_eq!(dim.index(1, 0, 0), 1);
        assert_eq!(dim.index(0, 1, 0), 4);
        assert_eq!(dim.index(0, 0, 1), 12);
    }

    #[test]
    fn check_len_rejects_mismatch() {
        let dim = Dim3::new(2, 2, 2);
        assert!(dim.check_len(&[0.0; 8], "image").is_ok());
        assert!(dim.check_len(&[0.0; 7], "image").is_err());
        assert!(Dim3::new(0, 2, 2).validate("image").is_err());
    }

    #[test]
    fn oversized_extents_fail_validation() {
        let huge = Dim3::new(i32::MAX as usize, i32::MAX as usize, i32::MAX as usize);
        assert_eq!(huge.checked_voxel_count(), None);
        assert!(matches!(huge.validate("image"), Err(ClarityError::InvalidArgument(_))));

        let wide = Dim3::new(usize::MAX / 2, 2, 1);
        assert!(wide.checked_voxel_count().is_some());
        assert_eq!(wide.checked_byte_len(), None);

        assert_eq!(Dim3::new(4, 3, 2).checked_byte_len(), Some(2 * 3 * 3 * 2 * 4));
        let saturated = Dim3::new(usize::MAX, 1, 1).working(Dim3::new(1, 1, 1));
        assert_eq!(saturated.x, usize::MAX);
    }
}
