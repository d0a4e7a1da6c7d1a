use std::time::Instant;

use crate::error::Result;
use crate::mpopt::{GenQLimits, PfOptions};
use crate::network::{BusType, Network};
use crate::newton::{newtonpf, LogProgress};
use crate::primitive::Sequence;
use crate::qlim::{find_violations, q_limits};
use crate::sbus::calc_injections;
use crate::ybus::make_ybus;

/// Result of a power flow study.
#[derive(Debug, Clone)]
pub struct PowerFlowSolution {
    pub bus_names: Vec<String>,
    /// Final bus voltage magnitudes (p.u.).
    pub vm: Vec<f64>,
    /// Final bus voltage angles (radians).
    pub va: Vec<f64>,
    /// Calculated real and reactive injections at the final state (p.u.).
    pub p: Vec<f64>,
    pub q: Vec<f64>,
    /// Bus types the final solve ran with (after any PV to PQ switching).
    pub bus_types: Vec<BusType>,
    pub converged: bool,
    /// Total Newton iterations over all solves.
    pub iterations: usize,
}

impl PowerFlowSolution {
    /// Voltage angles in degrees.
    pub fn va_deg(&self) -> Vec<f64> {
        self.va.iter().map(|a| a.to_degrees()).collect()
    }
}

/// Runs a Newton-Raphson power flow from a flat start.
///
/// Slack and PV magnitudes start at their setpoints, every other magnitude
/// at 1.0 p.u. and all angles at zero. Non-convergence is reported through
/// `PowerFlowSolution::converged`.
pub fn runpf(net: &Network, opts: &PfOptions) -> Result<PowerFlowSolution> {
    let t0 = Instant::now();
    let qlim = opts.enforce_q_limits != GenQLimits::IgnoreLimits;

    let y_bus = make_ybus(net, Sequence::PowerFlow)?;

    let mut types = net.bus_types();
    let p_spec = net.p_spec();
    let mut q_spec = net.q_spec();
    let q_load = net.q_load();
    let limits = q_limits(net);

    // initial state
    let v_set = net.v_set();
    let mut vm: Vec<f64> = types
        .iter()
        .zip(&v_set)
        .map(|(t, &v)| if *t == BusType::PQ { 1.0 } else { v })
        .collect();
    let mut va = vec![0.0; net.len()];

    let mut its = 0;
    let progress = LogProgress;
    let (converged, p, q) = loop {
        let st = newtonpf(
            &y_bus,
            &p_spec,
            &q_spec,
            &types,
            &vm,
            &va,
            opts,
            Some(&progress),
        )?;
        its += st.iterations;
        vm = st.vm;
        va = st.va;

        let (p, q) = calc_injections(&y_bus, &vm, &va);
        if !(st.converged && qlim) {
            break (st.converged, p, q);
        }

        // enforce generator Q limits
        let q_gen: Vec<f64> = q.iter().zip(&q_load).map(|(q, ql)| q + ql).collect();
        let violations = find_violations(&types, &q_gen, &limits);
        if violations.is_empty() {
            break (true, p, q);
        }
        for v in violations {
            log::warn!(
                "bus '{}' switched from PV to PQ: Q = {:.4} p.u. outside limit {:.4} p.u.",
                net.buses()[v.bus].name,
                v.q_gen,
                v.limit
            );
            types[v.bus] = BusType::PQ;
            q_spec[v.bus] = v.limit - q_load[v.bus];
        }
    };
    log::debug!("power flow finished in {:?}", t0.elapsed());

    Ok(PowerFlowSolution {
        bus_names: net.buses().iter().map(|b| b.name.clone()).collect(),
        vm,
        va,
        p,
        q,
        bus_types: types,
        converged,
        iterations: its,
    })
}
