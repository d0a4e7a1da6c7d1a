use nalgebra::DMatrix;
use num_complex::Complex64;
use num_traits::Zero;
use std::fmt;
use std::str::FromStr;

use crate::debug::format_polar_vec;
use crate::error::{Error, Result};
use crate::math::to_polar_deg;
use crate::mpopt::FaultOptions;
use crate::network::Network;
use crate::phase_shift::shift_factors;
use crate::primitive::Sequence;
use crate::symmetrical::to_phase;
use crate::ybus::make_ybus;

/// Magnitude below which a voltage is treated as zero when picking the
/// angle reference.
const ZERO_VOLTAGE: f64 = 1e-9;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum FaultKind {
    ThreePhase,
    SingleLineToGround,
    LineToLine,
    DoubleLineToGround,
}

impl FaultKind {
    /// Sequence networks carrying fault current for this fault type.
    fn networks(&self) -> [bool; 3] {
        match self {
            FaultKind::ThreePhase => [false, true, false],
            FaultKind::LineToLine => [false, true, true],
            FaultKind::SingleLineToGround | FaultKind::DoubleLineToGround => [true; 3],
        }
    }
}

impl FromStr for FaultKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "3ph" | "three-phase" => Ok(FaultKind::ThreePhase),
            "slg" | "single-line-to-ground" => Ok(FaultKind::SingleLineToGround),
            "ll" | "line-to-line" => Ok(FaultKind::LineToLine),
            "dlg" | "double-line-to-ground" => Ok(FaultKind::DoubleLineToGround),
            _ => Err(Error::UnknownFaultType(s.to_string())),
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaultKind::ThreePhase => "3ph",
            FaultKind::SingleLineToGround => "slg",
            FaultKind::LineToLine => "ll",
            FaultKind::DoubleLineToGround => "dlg",
        };
        f.write_str(s)
    }
}

/// Result of a fault study. All quantities per unit, sequence triples
/// ordered `[0, 1, 2]` and phase triples `[a, b, c]`.
#[derive(Debug, Clone)]
pub struct FaultSolution {
    pub bus_names: Vec<String>,
    pub faulted_bus: usize,
    pub kind: FaultKind,
    /// Equivalent driving-point impedance seen at the fault.
    pub z_eq: Complex64,
    pub i_seq: [Complex64; 3],
    pub i_phase: [Complex64; 3],
    pub v_seq: Vec<[Complex64; 3]>,
    pub v_phase: Vec<[Complex64; 3]>,
}

impl FaultSolution {
    /// Magnitude and angle (degrees) of the fault current: phase b for a
    /// line-to-line fault, phase a otherwise.
    ///
    /// With equal sequence currents a double-line-to-ground fault carries all
    /// of its phase current in phase a.
    pub fn fault_current(&self) -> (f64, f64) {
        let i = match self.kind {
            FaultKind::LineToLine => self.i_phase[1],
            _ => self.i_phase[0],
        };
        to_polar_deg(i)
    }

    /// Phase voltages of bus `i` as `(magnitude, angle in degrees)`.
    pub fn phase_voltage_polar(&self, i: usize) -> [(f64, f64); 3] {
        self.v_phase[i].map(to_polar_deg)
    }

    /// Sequence voltages of bus `i` as `(magnitude, angle in degrees)`.
    pub fn sequence_voltage_polar(&self, i: usize) -> [(f64, f64); 3] {
        self.v_seq[i].map(to_polar_deg)
    }
}

/// Builds the zero, positive and negative sequence bus impedance matrices
/// by inverting the corresponding Ybus. Networks not selected by `which`
/// are skipped and returned as `None`.
pub fn sequence_zbus(net: &Network, which: [bool; 3]) -> Result<[Option<DMatrix<Complex64>>; 3]> {
    let seqs = [
        (Sequence::Zero, "zero-sequence Ybus"),
        (Sequence::Positive, "positive-sequence Ybus"),
        (Sequence::Negative, "negative-sequence Ybus"),
    ];
    let mut z: [Option<DMatrix<Complex64>>; 3] = [None, None, None];
    for (s, &(seq, what)) in seqs.iter().enumerate() {
        if !which[s] {
            continue;
        }
        let y_bus = make_ybus(net, seq)?;
        z[s] = Some(y_bus.try_inverse().ok_or(Error::SingularMatrix(what))?);
    }
    Ok(z)
}

/// Runs a symmetrical-component fault study at bus `faulted_bus`.
///
/// Pre-fault conditions are a flat `prefault_voltage` everywhere and no
/// load current. Sequence voltages on the far side of delta/wye
/// transformers are shifted into their own frame and all voltage angles are
/// finally referred to phase a of the slack bus.
pub fn run_fault(
    net: &Network,
    faulted_bus: &str,
    kind: FaultKind,
    opts: &FaultOptions,
) -> Result<FaultSolution> {
    let n = net
        .bus_index(faulted_bus)
        .ok_or_else(|| Error::UnknownBus {
            bus: faulted_bus.to_string(),
            component: "fault".to_string(),
        })?;
    let slack = net
        .buses()
        .iter()
        .position(|b| b.is_slack())
        .ok_or(Error::NoSlackBus)?;

    let [z0, z1, z2] = sequence_zbus(net, kind.networks())?;
    let zero = Complex64::zero();
    let at = |z: &Option<DMatrix<Complex64>>, k: usize| z.as_ref().map_or(zero, |z| z[(k, n)]);

    let v_f = opts.prefault_voltage;
    let z_f = opts.fault_impedance;
    let (z0_nn, z1_nn, z2_nn) = (at(&z0, n), at(&z1, n), at(&z2, n));

    // equivalent driving-point impedance and sequence fault currents
    let (z_eq, i_seq) = match kind {
        FaultKind::ThreePhase => {
            let z_eq = z1_nn + z_f;
            (z_eq, [zero, v_f / z_eq, zero])
        }
        FaultKind::SingleLineToGround => {
            let z_eq = z0_nn + z1_nn + z2_nn + 3.0 * z_f;
            let i = v_f / z_eq;
            (z_eq, [i; 3])
        }
        FaultKind::LineToLine => {
            let z_eq = z1_nn + z2_nn + z_f;
            let i1 = v_f / z_eq;
            (z_eq, [zero, i1, -i1])
        }
        FaultKind::DoubleLineToGround => {
            let z_eq = z0_nn + z1_nn + z2_nn + 3.0 * z_f;
            let i = 3.0 * v_f / z_eq;
            (z_eq, [i; 3])
        }
    };
    log::debug!("{} fault at '{}': Zeq = {}, I012 = {}", kind, faulted_bus, z_eq, format_polar_vec(&i_seq));

    // sequence voltages at every bus
    let [i0, i1, i2] = i_seq;
    let mut v_seq: Vec<[Complex64; 3]> = (0..net.len())
        .map(|k| [-at(&z0, k) * i0, v_f - at(&z1, k) * i1, -at(&z2, k) * i2])
        .collect();

    // fault boundary conditions at the faulted bus
    let v = &mut v_seq[n];
    match kind {
        FaultKind::ThreePhase => {
            *v = [zero, z_f * i1, zero];
        }
        FaultKind::SingleLineToGround => {
            // Va = V0 + V1 + V2 = 3 Zf I0
            v[0] = 3.0 * z_f * i0 - v[1] - v[2];
        }
        FaultKind::LineToLine => {
            // Vb - Vc = Zf Ib  <=>  V1 - V2 = Zf I1
            v[2] = v[1] - z_f * i1;
        }
        FaultKind::DoubleLineToGround => {}
    }

    // transformer phase shifts
    for (v, k) in v_seq.iter_mut().zip(shift_factors(net, n)) {
        for s in 0..3 {
            v[s] *= k[s];
        }
    }

    let mut v_phase: Vec<[Complex64; 3]> = v_seq.iter().map(|&v| to_phase(v)).collect();

    // refer angles to phase a of the slack bus
    let v_ref = v_phase[slack][0];
    if v_ref.norm() > ZERO_VOLTAGE {
        let rot = v_ref.conj() / v_ref.norm();
        v_seq.iter_mut().chain(v_phase.iter_mut()).for_each(|v| {
            for x in v.iter_mut() {
                *x *= rot;
            }
        });
    }

    let i_phase = to_phase(i_seq);
    log::info!(
        "{} fault at '{}': Ia, Ib, Ic = {}",
        kind,
        faulted_bus,
        format_polar_vec(&i_phase)
    );

    Ok(FaultSolution {
        bus_names: net.buses().iter().map(|b| b.name.clone()).collect(),
        faulted_bus: n,
        kind,
        z_eq,
        i_seq,
        i_phase,
        v_seq,
        v_phase,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmplx;
    use crate::network::{Bus, BusType, GeneratorBuilder, LineBuilder, TransformerBuilder, Winding};
    use anyhow::Result;

    /// Generator bus G (slack) feeding bus F over a single line.
    fn feeder(winding: Winding, line_z0: Option<Complex64>) -> Result<Network> {
        let buses = vec![
            Bus::new("G", 20.0, BusType::Slack),
            Bus::new("F", 20.0, BusType::PQ),
        ];
        let line = LineBuilder::default()
            .name("L")
            .from_bus("G")
            .to_bus("F")
            .z(cmplx!(0.0, 0.1))
            .z0(line_z0)
            .build()?;
        let gen = GeneratorBuilder::default()
            .name("G1")
            .bus("G")
            .z1(cmplx!(0.0, 0.2))
            .z2(cmplx!(0.0, 0.15))
            .z0(cmplx!(0.0, 0.05))
            .winding(winding)
            .build()?;
        Ok(Network::new("feeder", 100.0, buses, vec![line], vec![], vec![gen], vec![])?)
    }

    #[test]
    fn parses_fault_kinds() {
        assert_eq!("3ph".parse::<FaultKind>().unwrap(), FaultKind::ThreePhase);
        assert_eq!("SLG".parse::<FaultKind>().unwrap(), FaultKind::SingleLineToGround);
        assert_eq!("ll".parse::<FaultKind>().unwrap(), FaultKind::LineToLine);
        assert_eq!("dlg".parse::<FaultKind>().unwrap(), FaultKind::DoubleLineToGround);
        let err = "open-conductor".parse::<FaultKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownFaultType(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn unknown_faulted_bus_is_rejected() -> Result<()> {
        let net = feeder(Winding::default(), Some(cmplx!(0.0, 0.3)))?;
        let err = run_fault(&net, "X", FaultKind::ThreePhase, &FaultOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownBus { ref bus, .. } if bus == "X"));
        Ok(())
    }

    #[test]
    fn three_phase_radial_feeder() -> Result<()> {
        let net = feeder(Winding::default(), Some(cmplx!(0.0, 0.3)))?;
        let soln = run_fault(&net, "F", FaultKind::ThreePhase, &FaultOptions::default())?;

        // Z1 seen at F is the machine plus the line
        assert!((soln.z_eq - cmplx!(0.0, 0.3)).norm() < 1e-12);
        let (mag, _) = soln.fault_current();
        assert!((mag - 1.0 / 0.3).abs() < 1e-9);

        // balanced: only positive sequence, zero at the fault, divider at G
        assert!(soln.v_phase[1].iter().all(|v| v.norm() < 1e-12));
        let [(va, _), (vb, _), (vc, _)] = soln.phase_voltage_polar(0);
        for v in [va, vb, vc] {
            assert!((v - 1.0 / 3.0).abs() < 1e-9);
        }
        // slack phase a is the angle reference
        assert!(soln.v_phase[0][0].arg().abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn single_line_to_ground_boundary() -> Result<()> {
        let net = feeder(Winding::default(), Some(cmplx!(0.0, 0.3)))?;
        let opts = FaultOptions {
            fault_impedance: cmplx!(0.05, 0.0),
            ..Default::default()
        };
        let soln = run_fault(&net, "F", FaultKind::SingleLineToGround, &opts)?;

        // Z0 + Z1 + Z2 + 3Zf at F
        let expect = cmplx!(0.0, 0.35) + cmplx!(0.0, 0.3) + cmplx!(0.0, 0.25) + cmplx!(0.15, 0.0);
        assert!((soln.z_eq - expect).norm() < 1e-12);

        let [i0, i1, i2] = soln.i_seq;
        assert_eq!(i0, i1);
        assert_eq!(i1, i2);
        // Ia = 3 I0, Ib = Ic = 0
        assert!((soln.i_phase[0] - 3.0 * i0).norm() < 1e-12);
        assert!(soln.i_phase[1].norm() < 1e-12 && soln.i_phase[2].norm() < 1e-12);

        // Va at the fault equals Zf * Ia
        let va = soln.v_phase[1][0];
        assert!((va.norm() - 0.05 * soln.i_phase[0].norm()).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn line_to_line_has_no_zero_sequence() -> Result<()> {
        // no zero-sequence path at all, which LL does not need
        let net = feeder(Winding::Wye, None)?;
        let soln = run_fault(&net, "F", FaultKind::LineToLine, &FaultOptions::default())?;

        let [i0, i1, i2] = soln.i_seq;
        assert_eq!(i0, cmplx!());
        assert_eq!(i2, -i1);
        assert!((soln.z_eq - cmplx!(0.0, 0.55)).norm() < 1e-12);

        // Ib = -Ic, and Vb = Vc at a bolted fault
        assert!((soln.i_phase[1] + soln.i_phase[2]).norm() < 1e-12);
        let v = soln.v_phase[1];
        assert!((v[1] - v[2]).norm() < 1e-12);
        let (mag, _) = soln.fault_current();
        assert!((mag - 3f64.sqrt() / 0.55).abs() < 1e-9);

        // SLG needs the zero-sequence network and fails on the same machine
        let err = run_fault(&net, "F", FaultKind::SingleLineToGround, &FaultOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::DisconnectedBus { sequence: Sequence::Zero, .. }));
        Ok(())
    }

    #[test]
    fn far_side_voltages_follow_transformer_ratio() -> Result<()> {
        let step_up = |ratio: f64| -> Result<Network> {
            let buses = vec![
                Bus::new("LV", 20.0, BusType::Slack),
                Bus::new("HV", 230.0, BusType::PQ),
            ];
            let tx = TransformerBuilder::default()
                .name("T")
                .from_bus("LV")
                .to_bus("HV")
                .z(cmplx!(0.0, 0.1))
                .from_winding(Winding::Delta)
                .to_winding(Winding::GroundedWye(cmplx!()))
                .ratio(ratio)
                .build()?;
            let gen = GeneratorBuilder::default()
                .name("G1")
                .bus("LV")
                .z1(cmplx!(0.0, 0.2))
                .z2(cmplx!(0.0, 0.15))
                .z0(cmplx!(0.0, 0.05))
                .build()?;
            Ok(Network::new("gsu", 100.0, buses, vec![], vec![tx], vec![gen], vec![])?)
        };
        let opts = FaultOptions::default();
        let unity = run_fault(&step_up(1.0)?, "HV", FaultKind::SingleLineToGround, &opts)?;
        let halved = run_fault(&step_up(2.0)?, "HV", FaultKind::SingleLineToGround, &opts)?;

        // the faulted side is untouched
        assert!((unity.i_seq[1] - halved.i_seq[1]).norm() < 1e-12);
        for s in 0..3 {
            assert!((unity.v_seq[1][s].norm() - halved.v_seq[1][s].norm()).abs() < 1e-12);
        }
        // crossing back to the from_bus side divides by the ratio
        for s in 1..3 {
            let (m1, _) = unity.sequence_voltage_polar(0)[s];
            let (m2, _) = halved.sequence_voltage_polar(0)[s];
            assert!(m1 > 0.0);
            assert!((m2 - m1 / 2.0).abs() < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn double_line_to_ground_triples_sequence_currents() -> Result<()> {
        let net = feeder(Winding::default(), Some(cmplx!(0.0, 0.3)))?;
        let slg = run_fault(&net, "F", FaultKind::SingleLineToGround, &FaultOptions::default())?;
        let dlg = run_fault(&net, "F", FaultKind::DoubleLineToGround, &FaultOptions::default())?;

        assert_eq!(slg.z_eq, dlg.z_eq);
        for s in 0..3 {
            assert!((dlg.i_seq[s] - 3.0 * slg.i_seq[s]).norm() < 1e-12);
        }
        Ok(())
    }
}
