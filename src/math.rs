// Copyright (c) 2022-2024, Richard Lincoln. All rights reserved.

use num_complex::Complex64;

#[macro_export]
macro_rules! cmplx {
    () => {
        num_complex::Complex64::new(0.0, 0.0)
    };
    ($arg1:expr) => {
        num_complex::Complex64::new($arg1, 0.0)
    };
    ($arg1:expr, $arg2:expr) => {
        num_complex::Complex64::new($arg1, $arg2)
    };
}

/// Computes the infinity norm: `max(abs(a))`. Zero for an empty slice.
pub fn norm_inf(a: &[f64]) -> f64 {
    a.iter().fold(0.0, |max, v| f64::max(max, v.abs()))
}

/// Returns `(magnitude, angle in degrees)` of `z`.
pub fn to_polar_deg(z: Complex64) -> (f64, f64) {
    (z.norm(), z.arg().to_degrees())
}

/// Complex number from a magnitude and an angle in degrees.
pub fn from_polar_deg(mag: f64, ang: f64) -> Complex64 {
    Complex64::from_polar(mag, ang.to_radians())
}
