use derive_builder::Builder;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::primitive::{Primitive, Sequence};
use crate::PowerFlowSolution;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum BusType {
    /// Reference voltage angle and magnitude. Slack active and reactive power.
    Slack,
    /// Fixed voltage magnitude and active power.
    PV,
    /// Fixed active and reactive power.
    PQ,
}

/// Bus is a node of the network graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub name: String,

    /// Base voltage (kV).
    pub base_kv: f64,

    pub bus_type: BusType,

    /// Voltage magnitude (p.u.).
    #[serde(default = "unity")]
    pub vm: f64,

    /// Voltage angle (degrees).
    #[serde(default)]
    pub va: f64,
}

fn unity() -> f64 {
    1.0
}

impl Bus {
    pub fn new(name: impl Into<String>, base_kv: f64, bus_type: BusType) -> Self {
        Self {
            name: name.into(),
            base_kv,
            bus_type,
            vm: 1.0,
            va: 0.0,
        }
    }

    pub fn is_slack(&self) -> bool {
        self.bus_type == BusType::Slack
    }
    pub fn is_pv(&self) -> bool {
        self.bus_type == BusType::PV
    }
}

/// Three-phase winding connection of a transformer side or a machine.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum Winding {
    Delta,
    /// Wye with an isolated neutral.
    Wye,
    /// Wye with the neutral grounded through the given impedance (p.u.).
    /// Zero impedance is a solid ground.
    GroundedWye(Complex64),
}

impl Default for Winding {
    fn default() -> Self {
        Winding::GroundedWye(Complex64::default())
    }
}

impl Winding {
    pub fn is_delta(&self) -> bool {
        matches!(self, Winding::Delta)
    }

    /// Neutral impedance when the winding provides a zero-sequence path.
    pub fn neutral(&self) -> Option<Complex64> {
        match self {
            Winding::GroundedWye(z_n) => Some(*z_n),
            _ => None,
        }
    }
}

/// Transmission line or cable (pi model, per unit on the system base).
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct Line {
    pub name: String,
    pub from_bus: String,
    pub to_bus: String,

    /// Positive and negative sequence series impedance.
    pub z: Complex64,
    /// Total line charging susceptance.
    #[builder(default)]
    #[serde(default)]
    pub b: f64,

    /// Zero-sequence series impedance. No zero-sequence path if absent.
    #[builder(default)]
    #[serde(default)]
    pub z0: Option<Complex64>,
    /// Zero-sequence charging susceptance (defaults to `b`).
    #[builder(default)]
    #[serde(default)]
    pub b0: Option<f64>,
}

impl Line {
    fn primitive(&self, seq: Sequence) -> Option<Primitive<'_>> {
        let (z, b) = match seq {
            Sequence::PowerFlow | Sequence::Positive | Sequence::Negative => (self.z, self.b),
            Sequence::Zero => (self.z0?, self.b0.unwrap_or(self.b)),
        };
        Some(Primitive::pi(
            &self.from_bus,
            &self.to_bus,
            Complex64::new(1.0, 0.0) / z,
            Complex64::new(0.0, b / 2.0),
        ))
    }
}

/// Two-winding transformer (series leakage impedance, nominal ratio).
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct Transformer {
    pub name: String,
    pub from_bus: String,
    pub to_bus: String,

    /// Leakage impedance (p.u.).
    pub z: Complex64,

    #[builder(default)]
    #[serde(default)]
    pub from_winding: Winding,
    #[builder(default)]
    #[serde(default)]
    pub to_winding: Winding,

    /// Voltage-base ratio applied to voltages carried across to the
    /// `to_bus` side in fault studies.
    #[builder(default = "1.0")]
    #[serde(default = "unity")]
    pub ratio: f64,
}

impl Transformer {
    /// Positive-sequence phase shift in degrees from `from_bus` to `to_bus`.
    ///
    /// Delta/wye leads by 30 degrees, wye/delta lags by 30 degrees and
    /// matching connections do not shift.
    pub fn phase_shift(&self) -> f64 {
        match (self.from_winding.is_delta(), self.to_winding.is_delta()) {
            (true, false) => 30.0,
            (false, true) => -30.0,
            _ => 0.0,
        }
    }

    fn primitive(&self, seq: Sequence) -> Option<Primitive<'_>> {
        let one = Complex64::new(1.0, 0.0);
        match seq {
            Sequence::PowerFlow | Sequence::Positive | Sequence::Negative => Some(
                Primitive::series(&self.from_bus, &self.to_bus, one / self.z),
            ),
            Sequence::Zero => match (self.from_winding.neutral(), self.to_winding.neutral()) {
                (Some(z_nf), Some(z_nt)) => Some(Primitive::series(
                    &self.from_bus,
                    &self.to_bus,
                    one / (self.z + 3.0 * z_nf + 3.0 * z_nt),
                )),
                (Some(z_n), None) if self.to_winding.is_delta() => Some(Primitive::Shunt {
                    bus: &self.from_bus,
                    y: one / (self.z + 3.0 * z_n),
                }),
                (None, Some(z_n)) if self.from_winding.is_delta() => Some(Primitive::Shunt {
                    bus: &self.to_bus,
                    y: one / (self.z + 3.0 * z_n),
                }),
                _ => None,
            },
        }
    }
}

/// Synchronous machine.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct Generator {
    pub name: String,
    pub bus: String,

    /// Real power output (MW).
    #[builder(default)]
    #[serde(default)]
    pub p: f64,
    /// Reactive power output (MVAr), only used at PQ buses.
    #[builder(default)]
    #[serde(default)]
    pub q: f64,
    /// Voltage magnitude setpoint (p.u.).
    #[builder(default = "1.0")]
    #[serde(default = "unity")]
    pub v_set: f64,

    /// Positive, negative and zero sequence internal impedances (p.u.).
    pub z1: Complex64,
    pub z2: Complex64,
    pub z0: Complex64,

    #[builder(default)]
    #[serde(default)]
    pub winding: Winding,
}

impl Generator {
    fn primitive(&self, seq: Sequence) -> Option<Primitive<'_>> {
        let one = Complex64::new(1.0, 0.0);
        let y = match seq {
            Sequence::PowerFlow => return None,
            Sequence::Positive => one / self.z1,
            Sequence::Negative => one / self.z2,
            Sequence::Zero => one / (self.z0 + 3.0 * self.winding.neutral()?),
        };
        Some(Primitive::Shunt { bus: &self.bus, y })
    }
}

/// Constant power load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub name: String,
    pub bus: String,
    /// Real power demand (MW).
    pub p: f64,
    /// Reactive power demand (MVAr).
    pub q: f64,
}

impl Load {
    pub fn new(name: impl Into<String>, bus: impl Into<String>, p: f64, q: f64) -> Self {
        Self {
            name: name.into(),
            bus: bus.into(),
            p,
            q,
        }
    }
}

/// Validated network description.
///
/// The bus order fixes the row/column order of every matrix built from the
/// network.
#[derive(Debug, Clone, Serialize)]
pub struct Network {
    name: String,
    /// System MVA base used for converting power into per-unit quantities.
    base_mva: f64,
    buses: Vec<Bus>,
    lines: Vec<Line>,
    transformers: Vec<Transformer>,
    generators: Vec<Generator>,
    loads: Vec<Load>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Network {
    /// Validates the complete component collection and builds the
    /// bus-name index.
    pub fn new(
        name: impl Into<String>,
        base_mva: f64,
        buses: Vec<Bus>,
        lines: Vec<Line>,
        transformers: Vec<Transformer>,
        generators: Vec<Generator>,
        loads: Vec<Load>,
    ) -> Result<Self> {
        let mut index = HashMap::with_capacity(buses.len());
        for (i, b) in buses.iter().enumerate() {
            if index.insert(b.name.clone(), i).is_some() {
                return Err(Error::DuplicateBus(b.name.clone()));
            }
        }

        let slack: Vec<String> = buses
            .iter()
            .filter(|b| b.is_slack())
            .map(|b| b.name.clone())
            .collect();
        match slack.len() {
            0 => return Err(Error::NoSlackBus),
            1 => {}
            _ => return Err(Error::DuplicateSlackBus(slack)),
        }

        let check = |bus: &str, component: &str| -> Result<()> {
            if index.contains_key(bus) {
                Ok(())
            } else {
                Err(Error::UnknownBus {
                    bus: bus.to_string(),
                    component: component.to_string(),
                })
            }
        };
        for ln in &lines {
            check(&ln.from_bus, &ln.name)?;
            check(&ln.to_bus, &ln.name)?;
        }
        for tx in &transformers {
            check(&tx.from_bus, &tx.name)?;
            check(&tx.to_bus, &tx.name)?;
        }
        for g in &generators {
            check(&g.bus, &g.name)?;
        }
        for ld in &loads {
            check(&ld.bus, &ld.name)?;
        }

        if let Some(b) = buses
            .iter()
            .filter(|b| b.is_pv())
            .find(|b| !generators.iter().any(|g| g.bus == b.name))
        {
            return Err(Error::PvBusWithoutGenerator(b.name.clone()));
        }

        Ok(Self {
            name: name.into(),
            base_mva,
            buses,
            lines,
            transformers,
            generators,
            loads,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn base_mva(&self) -> f64 {
        self.base_mva
    }
    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }
    pub fn transformers(&self) -> &[Transformer] {
        &self.transformers
    }
    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }
    pub fn loads(&self) -> &[Load] {
        &self.loads
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }
    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }

    pub fn bus_names(&self) -> Vec<&str> {
        self.buses.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn bus_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn bus_types(&self) -> Vec<BusType> {
        self.buses.iter().map(|b| b.bus_type).collect()
    }

    /// Index of the slack bus (validated to exist).
    pub fn slack(&self) -> usize {
        self.buses.iter().position(|b| b.is_slack()).unwrap_or(0)
    }

    /// Net specified real power injection per bus (p.u.), generation minus load.
    pub fn p_spec(&self) -> Vec<f64> {
        let mut p = vec![0.0; self.len()];
        for g in &self.generators {
            p[self.index[&g.bus]] += g.p;
        }
        for ld in &self.loads {
            p[self.index[&ld.bus]] -= ld.p;
        }
        p.iter().map(|p| p / self.base_mva).collect()
    }

    /// Net specified reactive power injection per bus (p.u.).
    pub fn q_spec(&self) -> Vec<f64> {
        let mut q = vec![0.0; self.len()];
        for g in &self.generators {
            q[self.index[&g.bus]] += g.q;
        }
        for ld in &self.loads {
            q[self.index[&ld.bus]] -= ld.q;
        }
        q.iter().map(|q| q / self.base_mva).collect()
    }

    /// Reactive power demand per bus (p.u.).
    pub fn q_load(&self) -> Vec<f64> {
        let mut q = vec![0.0; self.len()];
        for ld in &self.loads {
            q[self.index[&ld.bus]] += ld.q / self.base_mva;
        }
        q
    }

    /// Voltage magnitude setpoint per bus: the first attached generator's
    /// setpoint, 1.0 p.u. where there is none.
    pub fn v_set(&self) -> Vec<f64> {
        let mut v = vec![None; self.len()];
        for g in &self.generators {
            let i = self.index[&g.bus];
            if v[i].is_none() {
                v[i] = Some(g.v_set);
            }
        }
        v.into_iter().map(|v| v.unwrap_or(1.0)).collect()
    }

    /// Primitive admittance contributions of every component to the
    /// requested sequence network.
    pub fn primitives(&self, seq: Sequence) -> Vec<Primitive<'_>> {
        let mut prims = Vec::with_capacity(
            self.lines.len() + self.transformers.len() + self.generators.len(),
        );
        prims.extend(self.lines.iter().filter_map(|ln| ln.primitive(seq)));
        prims.extend(self.transformers.iter().filter_map(|tx| tx.primitive(seq)));
        if seq.includes_sources() {
            prims.extend(self.generators.iter().filter_map(|g| g.primitive(seq)));
        }
        prims
    }

    /// Writes a power flow solution back into the bus states.
    pub fn apply_solution(&mut self, soln: &PowerFlowSolution) -> Result<()> {
        if soln.vm.len() != self.len() {
            return Err(Error::DimensionMismatch {
                what: "power flow solution",
                expected: self.len(),
                actual: soln.vm.len(),
            });
        }
        for (i, b) in self.buses.iter_mut().enumerate() {
            b.vm = soln.vm[i];
            b.va = soln.va[i].to_degrees();
        }
        Ok(())
    }
}
