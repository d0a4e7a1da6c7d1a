
use anyhow::Result;

use crate::*;
use case7::case7;

#[test]
fn case7_power_flow_converges() -> Result<()> {
    let net = case7()?;
    let soln = runpf(&net, &PfOptions::default())?;

    assert!(soln.converged);
    assert!(soln.iterations <= 50);
    assert_eq!(soln.vm[0], 1.0);
    assert_eq!(soln.va[0], 0.0);
    assert_eq!(soln.vm[6], 1.0);
    assert!((soln.p[6] - 2.0).abs() < 1e-3);
    // slack covers the remaining 110 MW of load plus losses
    assert!(soln.p[0] > 1.1);
    for k in 1..6 {
        assert!(soln.vm[k] > 0.9 && soln.vm[k] < 1.1, "bus {}", k);
    }
    Ok(())
}

#[test]
fn case7_dc_angles_balance_injections() -> Result<()> {
    let net = case7()?;
    let dc = dc_pf(&net)?;
    let y_bus = make_ybus(&net, Sequence::PowerFlow)?;

    assert_eq!(dc.va[0], 0.0);
    // P = -B * Va everywhere but the slack
    for k in 1..net.len() {
        let p: f64 = (0..net.len()).map(|j| -y_bus[(k, j)].im * dc.va[j]).sum();
        assert!((p - dc.p[k]).abs() < 1e-9, "bus {}", k);
    }
    // generator 2 exports, so its bus leads the load buses
    assert!(dc.va[6] > dc.va[3]);
    Ok(())
}

#[test]
fn case7_slg_at_every_pq_bus() -> Result<()> {
    let net = case7()?;
    let opts = FaultOptions::default();

    for bus in ["2", "3", "4", "5", "6"] {
        let soln = run_fault(&net, bus, FaultKind::SingleLineToGround, &opts)?;
        let n = soln.faulted_bus;

        let (i_mag, _) = soln.fault_current();
        assert!(i_mag > 0.0, "bus {}", bus);

        // bolted: faulted phase collapses and the sequence voltages cancel
        let [(va, _), _, _] = soln.phase_voltage_polar(n);
        assert!(va < 1e-9, "bus {}", bus);
        let [v0, v1, v2] = soln.v_seq[n];
        assert!((v0 + v1 + v2).norm() < 1e-9, "bus {}", bus);

        // the delta side of T1 sees no zero-sequence voltage
        assert!(soln.v_seq[0][0].norm() < 1e-12, "bus {}", bus);
        // phase a at the slack is the angle reference
        assert!(soln.v_phase[0][0].arg().abs() < 1e-9, "bus {}", bus);
    }
    Ok(())
}

#[test]
fn case7_three_phase_at_slack() -> Result<()> {
    let net = case7()?;
    let soln = run_fault(&net, "1", FaultKind::ThreePhase, &FaultOptions::default())?;

    let [_, z1, _] = sequence_zbus(&net, [false, true, false])?;
    let z1 = z1.ok_or_else(|| anyhow::anyhow!("positive-sequence Zbus missing"))?;

    let (i_mag, _) = soln.fault_current();
    assert!((i_mag - 1.0 / z1[(0, 0)].norm()).abs() < 1e-9);
    assert!(soln.v_phase[0].iter().all(|v| v.norm() < 1e-12));

    // balanced fault: no zero or negative sequence anywhere
    for v in &soln.v_seq {
        assert!(v[0].norm() < 1e-12 && v[2].norm() < 1e-12);
    }
    Ok(())
}

#[test]
fn case7_fault_impedance_limits_current() -> Result<()> {
    let net = case7()?;
    let bolted = run_fault(&net, "4", FaultKind::DoubleLineToGround, &FaultOptions::default())?;
    let opts = FaultOptions {
        fault_impedance: num_complex::Complex64::new(0.1, 0.0),
        ..Default::default()
    };
    let limited = run_fault(&net, "4", FaultKind::DoubleLineToGround, &opts)?;

    assert!(limited.fault_current().0 < bolted.fault_current().0);
    Ok(())
}
