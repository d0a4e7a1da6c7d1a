use num_complex::Complex64;
use num_traits::One;
use std::collections::VecDeque;

use crate::network::Network;

/// Per-bus multipliers `[k0, k1, k2]` that carry sequence voltages computed
/// in the shift-free sequence networks over to the actual bus frames.
///
/// The network is walked outward from `origin`. Crossing a transformer
/// whose windings differ (delta/wye or wye/delta) from its `from_bus` to its
/// `to_bus` multiplies the positive sequence by `ratio * e^(j*shift)`, the
/// negative sequence by `ratio * e^(-j*shift)` and the zero sequence by
/// `ratio`; crossing the other way applies the inverse. Each bus is
/// adjusted exactly once, by the first path that reaches it. Buses that
/// cannot be reached keep a unit multiplier.
pub fn shift_factors(net: &Network, origin: usize) -> Vec<[Complex64; 3]> {
    let one = Complex64::one();
    let n = net.len();

    // adjacency: (neighbour, multipliers applied when moving to it)
    let mut adj: Vec<Vec<(usize, [Complex64; 3])>> = vec![vec![]; n];
    let mut connect = |f: Option<usize>, t: Option<usize>, k: [Complex64; 3]| {
        if let (Some(f), Some(t)) = (f, t) {
            adj[f].push((t, k));
            adj[t].push((f, k.map(|k| one / k)));
        }
    };
    for ln in net.lines() {
        connect(net.bus_index(&ln.from_bus), net.bus_index(&ln.to_bus), [one; 3]);
    }
    for tx in net.transformers() {
        let shift = tx.phase_shift();
        let k = if shift == 0.0 {
            [one; 3]
        } else {
            let r = tx.ratio;
            [
                Complex64::new(r, 0.0),
                Complex64::from_polar(r, shift.to_radians()),
                Complex64::from_polar(r, -shift.to_radians()),
            ]
        };
        connect(net.bus_index(&tx.from_bus), net.bus_index(&tx.to_bus), k);
    }

    let mut factors = vec![[one; 3]; n];
    let mut adjusted = vec![false; n];
    let mut queue = VecDeque::from([origin]);
    adjusted[origin] = true;

    while let Some(b) = queue.pop_front() {
        for &(nb, k) in &adj[b] {
            if adjusted[nb] {
                continue;
            }
            adjusted[nb] = true;
            factors[nb] = [0, 1, 2].map(|s| factors[b][s] * k[s]);
            queue.push_back(nb);
        }
    }

    factors
}
