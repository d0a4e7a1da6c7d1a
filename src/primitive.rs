use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Selects which admittance network is assembled.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum Sequence {
    /// Branches only, as used by the power flow.
    PowerFlow,
    /// Positive-sequence network including generator internal admittances.
    Positive,
    /// Negative-sequence network including generator internal admittances.
    Negative,
    /// Zero-sequence network with winding/grounding masking applied.
    Zero,
}

impl Sequence {
    /// True for the fault-study networks that include generator shunts.
    pub fn includes_sources(&self) -> bool {
        !matches!(self, Sequence::PowerFlow)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sequence::PowerFlow => "power-flow",
            Sequence::Positive => "positive-sequence",
            Sequence::Negative => "negative-sequence",
            Sequence::Zero => "zero-sequence",
        };
        f.write_str(s)
    }
}

/// Admittance contribution of a single component to one sequence network.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive<'a> {
    /// 2x2 primitive admittance matrix between two terminal buses:
    ///
    /// ```txt
    ///      | If |   | Yff  Yft |   | Vf |
    ///      |    | = |          | * |    |
    ///      | It |   | Ytf  Ytt |   | Vt |
    /// ```
    Branch {
        from: &'a str,
        to: &'a str,
        y: [[Complex64; 2]; 2],
    },
    /// Admittance from a bus to ground.
    Shunt { bus: &'a str, y: Complex64 },
}

impl<'a> Primitive<'a> {
    /// Pi-model branch with series admittance `y_s` and a shunt of `y_sh`
    /// at each terminal.
    pub fn pi(from: &'a str, to: &'a str, y_s: Complex64, y_sh: Complex64) -> Self {
        Primitive::Branch {
            from,
            to,
            y: [[y_s + y_sh, -y_s], [-y_s, y_s + y_sh]],
        }
    }

    /// Pure series branch.
    pub fn series(from: &'a str, to: &'a str, y_s: Complex64) -> Self {
        Self::pi(from, to, y_s, Complex64::default())
    }
}
