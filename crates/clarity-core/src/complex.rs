//! Scalar complex arithmetic on interleaved `(re, im)` float pairs.
//!
//! Host code works on [`Complex32`]; the GPU kernels carry their own WGSL
//! copies of `cmul`, `conj` and `magnitude_sq`.

pub use num_complex::Complex32;

#[inline]
pub fn add(a: Complex32, b: Complex32) -> Complex32 {
    a + b
}

#[inline]
pub fn multiply(a: Complex32, b: Complex32) -> Complex32 {
    Complex32::new(a.re * b.re - a.im * b.im, a.re * b.im + a.im * b.re)
}

#[inline]
pub fn conjugate(a: Complex32) -> Complex32 {
    Complex32::new(a.re, -a.im)
}

/// Multiplicative inverse `1 / a`. Zero maps to zero.
#[inline]
pub fn inverse(a: Complex32) -> Complex32 {
    let mag_sq = magnitude_sq(a);
    if mag_sq == 0.0 {
        return Complex32::new(0.0, 0.0);
    }
    Complex32::new(a.re / mag_sq, -a.im / mag_sq)
}

#[inline]
pub fn magnitude_sq(a: Complex32) -> f32 {
    a.re * a.re + a.im * a.im
}

#[inline]
pub fn magnitude(a: Complex32) -> f32 {
    magnitude_sq(a).sqrt()
}

#[inline]
pub fn scale(a: Complex32, s: f32) -> Complex32 {
    Complex32::new(a.re * s, a.im * s)
}

/// Reads bin `i` from an interleaved buffer.
#[inline]
pub fn load(packed: &[f32], i: usize) -> Complex32 {
    Complex32::new(packed[2 * i], packed[2 * i + 1])
}

/// Writes bin `i` into an interleaved buffer.
#[inline]
pub fn store(packed: &mut [f32], i: usize, value: Complex32) {
    packed[2 * i] = value.re;
    packed[2 * i + 1] = value.im;
}
