use nalgebra::DMatrix;
use num_complex::Complex64;
use num_traits::Zero;

use crate::debug::format_ybus;
use crate::error::{Error, Result};
use crate::network::Network;
use crate::primitive::{Primitive, Sequence};

/// Builds the bus admittance matrix of the requested sequence network.
///
/// Every component's primitive contribution is added into the rows and
/// columns of its terminal buses. Nothing is ever overwritten, so the
/// self-admittance of a bus is the sum over all attached branches and
/// shunts and each mutual term is the negated series admittance of the
/// connecting branch. A bus left with a zero self-admittance is
/// disconnected and rejected.
pub fn make_ybus(net: &Network, seq: Sequence) -> Result<DMatrix<Complex64>> {
    let nb = net.len();
    let mut y_bus = DMatrix::<Complex64>::zeros(nb, nb);

    let index = |bus: &str, component_bus: &str| -> Result<usize> {
        net.bus_index(bus).ok_or_else(|| Error::UnknownBus {
            bus: bus.to_string(),
            component: component_bus.to_string(),
        })
    };

    for prim in net.primitives(seq) {
        match prim {
            Primitive::Branch { from, to, y } => {
                let (f, t) = (index(from, to)?, index(to, from)?);

                y_bus[(f, f)] += y[0][0];
                y_bus[(f, t)] += y[0][1];
                y_bus[(t, f)] += y[1][0];
                y_bus[(t, t)] += y[1][1];
            }
            Primitive::Shunt { bus, y } => {
                let i = index(bus, bus)?;
                y_bus[(i, i)] += y;
            }
        }
    }

    if let Some(i) = (0..nb).find(|&i| y_bus[(i, i)].is_zero()) {
        return Err(Error::DisconnectedBus {
            bus: net.buses()[i].name.clone(),
            sequence: seq,
        });
    }
    log::trace!("{} Ybus:\n{}", seq, format_ybus(&net.bus_names(), &y_bus));

    Ok(y_bus)
}
