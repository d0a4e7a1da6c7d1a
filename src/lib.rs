mod bus_types;
mod case;
mod dc;
mod error;
mod fault;
mod math;
mod mpopt;
mod network;
mod newton;
mod pf;
mod phase_shift;
mod primitive;
mod qlim;
mod sbus;
mod ybus;

pub mod debug;
mod jac;
pub mod symmetrical;

#[cfg(test)]
mod tests;

pub use bus_types::*;
pub use case::*;
pub use dc::*;
pub use error::{Error, Result};
pub use fault::*;
pub use jac::*;
pub use math::*;
pub use mpopt::*;
pub use network::*;
pub use newton::*;
pub use pf::*;
pub use phase_shift::*;
pub use primitive::*;
pub use qlim::*;
pub use sbus::*;
pub use ybus::*;
