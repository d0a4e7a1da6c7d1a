use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::bus_types::Unknowns;

/// Calculates the real and reactive power injected at every bus.
///
///   P_k = V_k * sum_j V_j |Y_kj| cos(d_k - d_j - th_kj)
///   Q_k = V_k * sum_j V_j |Y_kj| sin(d_k - d_j - th_kj)
///
/// Angles in radians, everything else per unit.
pub fn calc_injections(y_bus: &DMatrix<Complex64>, vm: &[f64], va: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = vm.len();
    let mut p = vec![0.0; n];
    let mut q = vec![0.0; n];
    for k in 0..n {
        for j in 0..n {
            let y = y_bus[(k, j)];
            if y.norm() == 0.0 {
                continue;
            }
            let ang = va[k] - va[j] - y.arg();
            let vvy = vm[k] * vm[j] * y.norm();
            p[k] += vvy * ang.cos();
            q[k] += vvy * ang.sin();
        }
    }
    (p, q)
}

/// Forms the trimmed mismatch vector, specified minus calculated.
///
/// P mismatches for every non-slack bus followed by Q mismatches for the
/// PQ buses.
pub fn make_mismatch(
    unknowns: &Unknowns,
    p_spec: &[f64],
    q_spec: &[f64],
    p_calc: &[f64],
    q_calc: &[f64],
) -> Vec<f64> {
    let mut f = Vec::with_capacity(unknowns.len());
    f.extend(unknowns.angle.iter().map(|&i| p_spec[i] - p_calc[i]));
    f.extend(unknowns.mag.iter().map(|&i| q_spec[i] - q_calc[i]));
    f
}
