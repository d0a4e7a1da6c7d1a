use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use faultflow::{
    dc_pf, load_case_file, run_fault, runpf, FaultKind, FaultOptions, FaultSolution, GenQLimits,
    Network, PfOptions, PowerFlowSolution,
};
use num_complex::Complex64;
use pretty_dtoa::{dtoa, FmtFloatConfig};
use std::path::PathBuf;

const FLOAT_CONFIG: FmtFloatConfig = FmtFloatConfig::default()
    .add_point_zero(true)
    .max_significant_digits(6);

/// Power flow and symmetrical-component fault analysis.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Newton-Raphson Power Flow
    #[clap(name = "pf")]
    PowerFlow(PfArgs),

    /// DC Power Flow
    #[clap(name = "dc")]
    DcPowerFlow(CaseArgs),

    /// Fault Study
    Fault(FaultArgs),
}

#[derive(Args)]
struct CaseArgs {
    /// The input case file (JSON)
    #[arg(required = true)]
    input: PathBuf,
}

#[derive(Args)]
struct PfArgs {
    /// The input case file (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Termination tolerance on per unit P & Q mismatch.
    #[arg(long)]
    pub tol: Option<f64>,

    /// Maximum number of iterations.
    #[arg(long)]
    pub max_it: Option<usize>,

    /// Switch PV buses to PQ when generator Q exceeds +/-40% of P.
    #[arg(long, default_value_t = false)]
    pub qlim: bool,
}

#[derive(Args)]
struct FaultArgs {
    /// The input case file (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Name of the faulted bus.
    #[arg(short, long)]
    bus: String,

    /// Fault type: 3ph, slg, ll or dlg.
    #[arg(short = 't', long = "type", default_value = "3ph")]
    kind: String,

    /// Fault resistance (p.u.).
    #[arg(long, default_value_t = 0.0)]
    rf: f64,

    /// Fault reactance (p.u.).
    #[arg(long, default_value_t = 0.0)]
    xf: f64,

    /// Pre-fault voltage magnitude (p.u.).
    #[arg(long, default_value_t = 1.0)]
    vf: f64,
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_level(false)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match execute(&cli) {
        Ok(_) => {
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(2);
        }
    }
}

fn fmt(v: f64) -> String {
    dtoa(v, FLOAT_CONFIG)
}

/// Solves the power flow, writes the final state back into `net` and
/// tabulates it. The state is kept and reported whether or not the
/// iteration converged.
fn power_flow_report(net: &mut Network, opts: &PfOptions) -> Result<(PowerFlowSolution, String)> {
    let soln = runpf(net, opts)?;
    net.apply_solution(&soln)?;

    let mut out = format!(
        "{:<12} {:>10} {:>10} {:>10} {:>10}\n",
        "bus", "|V|", "ang(deg)", "P", "Q"
    );
    for (i, b) in net.buses().iter().enumerate() {
        out.push_str(&format!(
            "{:<12} {:>10} {:>10} {:>10} {:>10}\n",
            b.name,
            fmt(b.vm),
            fmt(b.va),
            fmt(soln.p[i]),
            fmt(soln.q[i])
        ));
    }
    Ok((soln, out))
}

fn polar_table(names: &[String], header: [&str; 3], rows: impl Fn(usize) -> [(f64, f64); 3]) -> String {
    let mut out = format!(
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
        "bus",
        format!("|{}|", header[0]),
        format!("ang({})", header[0]),
        format!("|{}|", header[1]),
        format!("ang({})", header[1]),
        format!("|{}|", header[2]),
        format!("ang({})", header[2]),
    );
    for (i, name) in names.iter().enumerate() {
        let [(m0, a0), (m1, a1), (m2, a2)] = rows(i);
        out.push_str(&format!(
            "{:<12} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
            name,
            fmt(m0),
            fmt(a0),
            fmt(m1),
            fmt(a1),
            fmt(m2),
            fmt(a2)
        ));
    }
    out
}

fn fault_report(soln: &FaultSolution) -> String {
    let (i_mag, i_ang) = soln.fault_current();
    let mut out = format!(
        "{} fault at bus {}\nfault current: {} p.u. at {} deg\n\n",
        soln.kind,
        soln.bus_names[soln.faulted_bus],
        fmt(i_mag),
        fmt(i_ang)
    );
    out.push_str(&polar_table(&soln.bus_names, ["V0", "V1", "V2"], |i| {
        soln.sequence_voltage_polar(i)
    }));
    out.push('\n');
    out.push_str(&polar_table(&soln.bus_names, ["Va", "Vb", "Vc"], |i| {
        soln.phase_voltage_polar(i)
    }));
    out
}

fn execute(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::PowerFlow(args) => {
            let mut net = load_case_file(&args.input)?;

            let mut opts = PfOptions::default();
            if let Some(tol) = args.tol {
                opts.tolerance = tol;
            }
            if let Some(max_it) = args.max_it {
                opts.max_it = max_it;
            }
            if args.qlim {
                opts.enforce_q_limits = GenQLimits::Percent40;
            }

            let (soln, report) = power_flow_report(&mut net, &opts)?;
            if !soln.converged {
                log::warn!("reporting the last state of a non-converged power flow");
            }
            print!("{}", report);
            if !soln.converged {
                return Err(anyhow::anyhow!(
                    "power flow did not converge in {} iterations",
                    soln.iterations
                ));
            }
        }
        Commands::DcPowerFlow(args) => {
            let net = load_case_file(&args.input)?;
            let soln = dc_pf(&net)?;

            println!("{:<12} {:>10}", "bus", "ang(deg)");
            for (name, va) in soln.bus_names.iter().zip(soln.va_deg()) {
                println!("{:<12} {:>10}", name, fmt(va));
            }
        }
        Commands::Fault(args) => {
            let net = load_case_file(&args.input)?;
            let kind: FaultKind = args.kind.parse()?;
            let opts = FaultOptions {
                prefault_voltage: Complex64::new(args.vf, 0.0),
                fault_impedance: Complex64::new(args.rf, args.xf),
            };

            let soln = run_fault(&net, &args.bus, kind, &opts)?;
            print!("{}", fault_report(&soln));
        }
    }

    Ok(())
}
