use num_complex::Complex64;

#[derive(Debug, PartialEq, Copy, Clone, Default)]
pub enum GenQLimits {
    #[default]
    IgnoreLimits,
    /// After convergence, switch PV buses whose generator Q falls outside
    /// +/-40% of their real power to PQ at the violated limit and re-solve.
    Percent40,
}

#[derive(Debug, Clone)]
pub struct PfOptions {
    /// Termination tolerance on per unit P & Q mismatch. Default value is 1e-3.
    pub tolerance: f64,

    /// Maximum number of Newton iterations. Default value is 50.
    pub max_it: usize,

    /// PV to PQ switching on generator reactive power limits.
    pub enforce_q_limits: GenQLimits,
}

impl Default for PfOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_it: 50,
            enforce_q_limits: GenQLimits::IgnoreLimits,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FaultOptions {
    /// Pre-fault voltage at the faulted bus (p.u.). Default value is 1.0.
    pub prefault_voltage: Complex64,

    /// Fault impedance (p.u.). Default value is 0 (bolted fault).
    pub fault_impedance: Complex64,
}

impl Default for FaultOptions {
    fn default() -> Self {
        Self {
            prefault_voltage: Complex64::new(1.0, 0.0),
            fault_impedance: Complex64::default(),
        }
    }
}
