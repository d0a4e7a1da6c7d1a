use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::bus_types::Unknowns;
use crate::debug::format_f64_mat;

/// Forms the full power flow Jacobian.
///
/// Returns the 2n x 2n matrix
///
/// ```txt
///     | dP/dd  dP/dV |   | J1  J2 |
///     |              | = |        |
///     | dQ/dd  dQ/dV |   | J3  J4 |
/// ```
///
/// of the sensitivities of all bus injections w.r.t. all voltage angles
/// and magnitudes. Angles in radians.
pub fn full_jac(y_bus: &DMatrix<Complex64>, vm: &[f64], va: &[f64]) -> DMatrix<f64> {
    let n = vm.len();
    let mut jac = DMatrix::<f64>::zeros(2 * n, 2 * n);

    for k in 0..n {
        let mut sum_sin = 0.0; // sum_m V_m |Y_km| sin(d_k - d_m - th_km), m != k
        let mut sum_cos = 0.0;
        let (mut all_sin, mut all_cos) = (0.0, 0.0); // same sums including m == k

        for j in 0..n {
            let y = y_bus[(k, j)];
            let (y_abs, th) = (y.norm(), y.arg());
            let ang = va[k] - va[j] - th;
            let (s, c) = ang.sin_cos();

            all_sin += vm[j] * y_abs * s;
            all_cos += vm[j] * y_abs * c;
            if j == k {
                continue;
            }
            sum_sin += vm[j] * y_abs * s;
            sum_cos += vm[j] * y_abs * c;

            jac[(k, j)] = vm[k] * vm[j] * y_abs * s;
            jac[(k, n + j)] = vm[k] * y_abs * c;
            jac[(n + k, j)] = -vm[k] * vm[j] * y_abs * c;
            jac[(n + k, n + j)] = vm[k] * y_abs * s;
        }

        let y_kk = y_bus[(k, k)];
        let (y_abs, th) = (y_kk.norm(), y_kk.arg());

        jac[(k, k)] = -vm[k] * sum_sin;
        jac[(k, n + k)] = vm[k] * y_abs * th.cos() + all_cos;
        jac[(n + k, k)] = vm[k] * sum_cos;
        jac[(n + k, n + k)] = -vm[k] * y_abs * th.sin() + all_sin;
    }

    jac
}

/// Forms the reduced Jacobian used in the Newton power flow updates.
///
/// Rows and columns of the slack bus are removed entirely and PV buses lose
/// their Q row and V column, leaving rows `[P(angle..), Q(mag..)]` and
/// columns `[d(angle..), V(mag..)]` in the order given by `unknowns`.
pub fn make_jac(
    y_bus: &DMatrix<Complex64>,
    vm: &[f64],
    va: &[f64],
    unknowns: &Unknowns,
) -> DMatrix<f64> {
    let n = vm.len();
    let full = full_jac(y_bus, vm, va);

    let keep: Vec<usize> = unknowns
        .angle
        .iter()
        .copied()
        .chain(unknowns.mag.iter().map(|&i| n + i))
        .collect();

    let jac = full.select_rows(&keep).select_columns(&keep);
    log::trace!("J:\n{}", format_f64_mat(&jac));
    jac
}
