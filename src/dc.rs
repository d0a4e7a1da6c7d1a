use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::math::norm_inf;
use crate::network::Network;
use crate::primitive::Sequence;
use crate::ybus::make_ybus;

/// Arbitrary threshold on |Va| (radians) beyond which the solve is treated
/// as having hit a numerically singular B matrix.
const VA_THRESHOLD: f64 = 1e5;

/// Result of a DC power flow.
#[derive(Debug, Clone)]
pub struct DcSolution {
    pub bus_names: Vec<String>,
    /// Bus voltage angles (radians), zero at the slack bus.
    pub va: Vec<f64>,
    /// Specified real power injections the angles were solved for (p.u.).
    pub p: Vec<f64>,
}

impl DcSolution {
    pub fn va_deg(&self) -> Vec<f64> {
        self.va.iter().map(|a| a.to_degrees()).collect()
    }
}

/// Solves a DC power flow.
///
/// Takes B as the imaginary part of the power flow Ybus and solves
///
/// ```txt
///     Va(nonref) = -B(nonref, nonref) \ P(nonref)
/// ```
///
/// with the slack angle fixed at zero. All magnitudes are assumed 1.0 p.u.
pub fn dc_pf(net: &Network) -> Result<DcSolution> {
    let y_bus = make_ybus(net, Sequence::PowerFlow)?;
    let p_bus = net.p_spec();
    let slack = net.slack();

    let nonref: Vec<usize> = (0..net.len()).filter(|&i| i != slack).collect();

    let b_mat = DMatrix::from_fn(net.len(), net.len(), |r, c| y_bus[(r, c)].im);
    let b_nonref = b_mat.select_rows(&nonref).select_columns(&nonref);
    let p_nonref = DVector::from_iterator(nonref.len(), nonref.iter().map(|&i| -p_bus[i]));

    let mut va = vec![0.0; net.len()];
    if !nonref.is_empty() {
        let x = b_nonref
            .lu()
            .solve(&p_nonref)
            .filter(|x| x.iter().all(|v| v.is_finite()))
            .ok_or(Error::SingularMatrix("DC B"))?;
        nonref.iter().enumerate().for_each(|(j, &i)| va[i] = x[j]);
    }

    if norm_inf(&va) > VA_THRESHOLD {
        return Err(Error::SingularMatrix("DC B"));
    }
    log::info!("DC power flow solved for {} bus angles.", nonref.len());

    Ok(DcSolution {
        bus_names: net.buses().iter().map(|b| b.name.clone()).collect(),
        va,
        p: p_bus,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmplx;
    use crate::network::{Bus, BusType, LineBuilder, Load};
    use anyhow::Result;

    #[test]
    fn lossless_two_bus() -> Result<()> {
        let buses = vec![
            Bus::new("A", 230.0, BusType::PQ),
            Bus::new("B", 230.0, BusType::Slack),
        ];
        let line = LineBuilder::default()
            .name("L")
            .from_bus("A")
            .to_bus("B")
            .z(cmplx!(0.0, 0.1))
            .build()?;
        let net = Network::new(
            "n",
            100.0,
            buses,
            vec![line],
            vec![],
            vec![],
            vec![Load::new("D", "A", 50.0, 10.0)],
        )?;

        let soln = dc_pf(&net)?;
        assert_eq!(soln.va[1], 0.0);
        // P = (Va - Vb) / x
        assert!((soln.va[0] + 0.05).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn angles_split_with_parallel_reactance() -> Result<()> {
        let buses = vec![
            Bus::new("S", 230.0, BusType::Slack),
            Bus::new("M", 230.0, BusType::PQ),
            Bus::new("E", 230.0, BusType::PQ),
        ];
        let line = |name: &str, f: &str, t: &str, x: f64| {
            LineBuilder::default()
                .name(name)
                .from_bus(f)
                .to_bus(t)
                .z(cmplx!(0.0, x))
                .build()
        };
        let net = Network::new(
            "n",
            100.0,
            buses,
            vec![line("SM", "S", "M", 0.1)?, line("ME", "M", "E", 0.2)?],
            vec![],
            vec![],
            vec![Load::new("D", "E", 100.0, 0.0)],
        )?;

        let soln = dc_pf(&net)?;
        // the full 1 p.u. flows through both reactances in series
        assert!((soln.va[1] + 0.1).abs() < 1e-12);
        assert!((soln.va[2] + 0.3).abs() < 1e-12);
        Ok(())
    }
}
