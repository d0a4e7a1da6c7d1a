use crate::network::{BusType, Network};

/// Fraction of a generator's real power used as its reactive power limit.
pub const Q_LIMIT_FRACTION: f64 = 0.4;

/// A PV bus whose generator reactive output left its limits.
#[derive(Debug, Clone, PartialEq)]
pub struct QLimitViolation {
    pub bus: usize,
    /// Calculated generator reactive output (p.u.).
    pub q_gen: f64,
    /// The violated limit (p.u.), the value Q is clamped to.
    pub limit: f64,
}

/// Reactive power limits `(q_min, q_max)` in p.u. for every bus, derived
/// as +/-40% of the real output of the generators attached to it.
pub fn q_limits(net: &Network) -> Vec<(f64, f64)> {
    let mut p_gen = vec![0.0; net.len()];
    for g in net.generators() {
        if let Some(i) = net.bus_index(&g.bus) {
            p_gen[i] += g.p / net.base_mva();
        }
    }
    p_gen
        .into_iter()
        .map(|p| {
            let q = Q_LIMIT_FRACTION * p.abs();
            (-q, q)
        })
        .collect()
}

/// Finds the PV buses whose generator reactive output violates its limits.
///
/// `q_gen` is the calculated injection plus the reactive load at each bus.
pub fn find_violations(
    types: &[BusType],
    q_gen: &[f64],
    limits: &[(f64, f64)],
) -> Vec<QLimitViolation> {
    types
        .iter()
        .enumerate()
        .filter(|&(_, &t)| t == BusType::PV)
        .filter_map(|(i, _)| {
            let (q_min, q_max) = limits[i];
            let limit = if q_gen[i] > q_max {
                q_max
            } else if q_gen[i] < q_min {
                q_min
            } else {
                return None;
            };
            Some(QLimitViolation {
                bus: i,
                q_gen: q_gen[i],
                limit,
            })
        })
        .collect()
}
