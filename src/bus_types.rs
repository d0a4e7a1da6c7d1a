use crate::network::BusType;

/// Builds index lists for each type of bus (Slack, PV, PQ).
///
/// Indices are returned in bus order.
pub fn bus_types(types: &[BusType]) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
    let find = |bt: BusType| -> Vec<usize> {
        types
            .iter()
            .enumerate()
            .filter(|&(_, &t)| t == bt)
            .map(|(i, _)| i)
            .collect()
    };
    (find(BusType::Slack), find(BusType::PV), find(BusType::PQ))
}

/// Ordering of the unknowns of the power flow problem.
///
/// `angle` lists every non-slack bus and `mag` every PQ bus, both in bus
/// order. The mismatch vector, the trimmed Jacobian rows and columns and the
/// state correction all follow `[angle.., mag..]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Unknowns {
    pub angle: Vec<usize>,
    pub mag: Vec<usize>,
}

impl Unknowns {
    pub fn new(types: &[BusType]) -> Self {
        let angle = types
            .iter()
            .enumerate()
            .filter(|&(_, &t)| t != BusType::Slack)
            .map(|(i, _)| i)
            .collect();
        let (_, _, mag) = bus_types(types);
        Self { angle, mag }
    }

    pub fn len(&self) -> usize {
        self.angle.len() + self.mag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
