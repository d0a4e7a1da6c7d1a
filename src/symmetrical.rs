use num_complex::Complex64;
use std::f64::consts::PI;

/// The `a` operator, 1 at 120 degrees.
pub fn a() -> Complex64 {
    Complex64::from_polar(1.0, 2.0 * PI / 3.0)
}

/// Converts sequence quantities `[x0, x1, x2]` to phase quantities
/// `[xa, xb, xc]`:
///
/// ```txt
///     | xa |   | 1  1   1  |   | x0 |
///     | xb | = | 1  a^2 a  | * | x1 |
///     | xc |   | 1  a   a^2|   | x2 |
/// ```
pub fn to_phase(seq: [Complex64; 3]) -> [Complex64; 3] {
    let a = a();
    let a2 = a * a;
    let [x0, x1, x2] = seq;
    [x0 + x1 + x2, x0 + a2 * x1 + a * x2, x0 + a * x1 + a2 * x2]
}

/// Inverse of [`to_phase`].
pub fn to_sequence(phase: [Complex64; 3]) -> [Complex64; 3] {
    let a = a();
    let a2 = a * a;
    let [xa, xb, xc] = phase;
    [
        (xa + xb + xc) / 3.0,
        (xa + a * xb + a2 * xc) / 3.0,
        (xa + a2 * xb + a * xc) / 3.0,
    ]
}
