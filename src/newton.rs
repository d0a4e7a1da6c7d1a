use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::bus_types::Unknowns;
use crate::debug::format_f64_vec;
use crate::error::{Error, Result};
use crate::jac::make_jac;
use crate::math::norm_inf;
use crate::mpopt::PfOptions;
use crate::network::BusType;
use crate::sbus::{calc_injections, make_mismatch};

pub trait ProgressMonitor {
    fn update(&self, i: usize, norm_f: f64);
}

/// Logs the mismatch norm of every iteration at debug level.
pub struct LogProgress;

impl ProgressMonitor for LogProgress {
    fn update(&self, i: usize, norm_f: f64) {
        log::debug!("iteration {}: max mismatch = {:.6e}", i, norm_f);
    }
}

/// Final state of a Newton solve.
#[derive(Debug, Clone)]
pub struct NewtonState {
    pub vm: Vec<f64>,
    /// Voltage angles (radians).
    pub va: Vec<f64>,
    pub converged: bool,
    pub iterations: usize,
}

/// Solves power flow using full Newton's method (power/polar).
///
/// `vm0`/`va0` give the initial state; slack and PV magnitudes and the slack
/// angle are held at their initial values. The mismatch vector and the
/// trimmed Jacobian are rebuilt from scratch every iteration. Running out
/// of iterations is not an error: the last state is returned with
/// `converged == false`. A singular Jacobian aborts the solve.
#[allow(clippy::too_many_arguments)]
pub fn newtonpf(
    y_bus: &DMatrix<Complex64>,
    p_spec: &[f64],
    q_spec: &[f64],
    types: &[BusType],
    vm0: &[f64],
    va0: &[f64],
    opts: &PfOptions,
    progress: Option<&dyn ProgressMonitor>,
) -> Result<NewtonState> {
    let n = types.len();
    for (what, len) in [
        ("Ybus rows", y_bus.nrows()),
        ("specified P", p_spec.len()),
        ("specified Q", q_spec.len()),
        ("initial |V|", vm0.len()),
        ("initial angle", va0.len()),
    ] {
        if len != n {
            return Err(Error::DimensionMismatch {
                what,
                expected: n,
                actual: len,
            });
        }
    }

    let unknowns = Unknowns::new(types);
    let n_angle = unknowns.angle.len();

    let tol = opts.tolerance;
    let max_it = opts.max_it;

    let mut converged = false;
    let mut i = 0;
    let mut vm = vm0.to_vec();
    let mut va = va0.to_vec();

    // evaluate F(x0)
    let mismatch = |vm: &[f64], va: &[f64]| -> Vec<f64> {
        let (p_calc, q_calc) = calc_injections(y_bus, vm, va);
        make_mismatch(&unknowns, p_spec, q_spec, &p_calc, &q_calc)
    };
    let mut f = mismatch(&vm, &va);

    // check tolerance
    let norm_f = norm_inf(&f);
    if let Some(pm) = progress {
        pm.update(i, norm_f);
    }
    if norm_f < tol {
        converged = true;
    }

    // do Newton iterations
    while !converged && i < max_it {
        // update iteration counter
        i += 1;

        // evaluate Jacobian
        let jac = make_jac(y_bus, &vm, &va, &unknowns);
        if jac.nrows() != f.len() || jac.ncols() != f.len() {
            return Err(Error::DimensionMismatch {
                what: "trimmed Jacobian",
                expected: f.len(),
                actual: jac.nrows(),
            });
        }

        // compute update step
        let dx = jac
            .lu()
            .solve(&DVector::from_column_slice(&f))
            .filter(|dx| dx.iter().all(|v| v.is_finite()))
            .ok_or(Error::SingularMatrix("Jacobian"))?;

        // update voltage
        unknowns
            .angle
            .iter()
            .enumerate()
            .for_each(|(j, &b)| va[b] += dx[j]);
        unknowns
            .mag
            .iter()
            .enumerate()
            .for_each(|(j, &b)| vm[b] += dx[n_angle + j]);

        // evaluate F(x)
        f = mismatch(&vm, &va);

        // check for convergence
        let norm_f = norm_inf(&f);
        if let Some(pm) = progress {
            pm.update(i, norm_f);
        }
        log::trace!("F: {}", format_f64_vec(&f));
        if norm_f < tol {
            converged = true;
        }
    }

    if converged {
        log::info!(
            "Newton's method power flow (power balance, polar) converged in {} iterations.",
            i
        );
    } else {
        log::warn!(
            "Newton's method power flow (power balance, polar) did not converge in {} iterations.",
            i
        );
    }

    Ok(NewtonState {
        vm,
        va,
        converged,
        iterations: i,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmplx;
    use anyhow::Result;
    use std::cell::RefCell;

    struct Record(RefCell<Vec<(usize, f64)>>);

    impl ProgressMonitor for Record {
        fn update(&self, i: usize, norm_f: f64) {
            self.0.borrow_mut().push((i, norm_f));
        }
    }

    /// Slack + PQ joined by a lossless j0.1 line.
    fn two_bus() -> DMatrix<Complex64> {
        let y = cmplx!(1.0) / cmplx!(0.0, 0.1);
        DMatrix::from_row_slice(2, 2, &[y, -y, -y, y])
    }

    #[test]
    fn flat_start_with_zero_mismatch_takes_no_iterations() -> Result<()> {
        let types = [BusType::Slack, BusType::PQ];
        let rec = Record(RefCell::new(vec![]));
        let st = newtonpf(
            &two_bus(),
            &[0.0, 0.0],
            &[0.0, 0.0],
            &types,
            &[1.0, 1.0],
            &[0.0, 0.0],
            &PfOptions::default(),
            Some(&rec),
        )?;
        assert!(st.converged);
        assert_eq!(st.iterations, 0);
        assert_eq!(rec.0.borrow().len(), 1);
        Ok(())
    }

    #[test]
    fn two_bus_closed_form() -> Result<()> {
        // With Q2 = 0:  10 V2^2 - 10 V2 cos(d2) = 0  =>  V2 = cos(d2)
        //               P2 = 10 V2 sin(d2) = 5 sin(2 d2) = -0.5
        let d2 = -0.5 * 0.1f64.asin();
        let v2 = d2.cos();

        let opts = PfOptions {
            tolerance: 1e-10,
            ..Default::default()
        };
        let st = newtonpf(
            &two_bus(),
            &[0.0, -0.5],
            &[0.0, 0.0],
            &[BusType::Slack, BusType::PQ],
            &[1.0, 1.0],
            &[0.0, 0.0],
            &opts,
            None,
        )?;
        assert!(st.converged);
        assert!(st.iterations > 0 && st.iterations < 10);
        assert!((st.vm[1] - v2).abs() < 1e-4);
        assert!((st.va[1] - d2).abs() < 1e-4);
        assert_eq!((st.vm[0], st.va[0]), (1.0, 0.0));
        Ok(())
    }

    #[test]
    fn pv_bus_holds_magnitude() -> Result<()> {
        let st = newtonpf(
            &two_bus(),
            &[0.0, 0.3],
            &[0.0, 0.0],
            &[BusType::Slack, BusType::PV],
            &[1.0, 1.04],
            &[0.0, 0.0],
            &PfOptions::default(),
            None,
        )?;
        assert!(st.converged);
        assert_eq!(st.vm[1], 1.04);
        // 10 * 1.04 * sin(d2) = 0.3
        assert!((st.va[1] - (0.3f64 / 10.4).asin()).abs() < 1e-3);
        Ok(())
    }

    #[test]
    fn iteration_limit_is_reported_not_raised() -> Result<()> {
        let opts = PfOptions {
            tolerance: 1e-12,
            max_it: 1,
            ..Default::default()
        };
        let st = newtonpf(
            &two_bus(),
            &[0.0, -0.5],
            &[0.0, -0.2],
            &[BusType::Slack, BusType::PQ],
            &[1.0, 1.0],
            &[0.0, 0.0],
            &opts,
            None,
        )?;
        assert!(!st.converged);
        assert_eq!(st.iterations, 1);
        assert!(st.vm[1] < 1.0);
        Ok(())
    }

    #[test]
    fn singular_jacobian_is_fatal() {
        // PQ bus with no connection at all
        let y = DMatrix::from_row_slice(2, 2, &[cmplx!(0.0, -10.0), cmplx!(), cmplx!(), cmplx!()]);
        let err = newtonpf(
            &y,
            &[0.0, -0.5],
            &[0.0, 0.0],
            &[BusType::Slack, BusType::PQ],
            &[1.0, 1.0],
            &[0.0, 0.0],
            &PfOptions::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::SingularMatrix("Jacobian")));
        assert!(!err.is_configuration());
    }
}
