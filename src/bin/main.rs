use std::path::PathBuf;
use std::process::ExitCode;

use cau_monitor::{Driver, MonitorError};
use clap::Parser;

/// Streams a CSV trace through an STL formula and prints a causation-
/// optimized `(upper, lower)` robustness bound after every row.
#[derive(Debug, Parser)]
#[command(name = "cau-monitor", version, about)]
struct Cli {
    /// STL formula, e.g. "ev_[0.0,2.0] (x > 0.0) and y < 1.5"
    formula: String,

    /// CSV trace file; first column is time, remaining columns are signals
    /// named by the header row.
    trace: PathBuf,

    /// Horizon start `T0`, in time units. Required: the monitor has no
    /// sound default for where a causation bound starts.
    #[arg(long)]
    horizon: Option<f64>,

    /// Horizon span added to `horizon` to get `T1`, in time units. Required
    /// for the same reason as `--horizon`.
    #[arg(long)]
    duration: Option<f64>,
}

fn run(cli: Cli) -> Result<(), MonitorError> {
    let t0 = cli.horizon.ok_or(MonitorError::InsufficientInputs)?;
    let span = cli.duration.ok_or(MonitorError::InsufficientInputs)?;
    let t1 = t0 + span;

    let mut reader = csv::Reader::from_path(&cli.trace).map_err(|e| MonitorError::MalformedSource { reason: e.to_string() })?;

    let headers = reader.headers().map_err(|e| MonitorError::MalformedSource { reason: e.to_string() })?.clone();
    let signal_names: Vec<String> = headers.iter().skip(1).map(|s| s.to_string()).collect();

    let mut driver = Driver::new(&cli.formula, signal_names, t0, t1)?;
    log::info!("parsed formula over {} signals, horizon=[{t0}, {t1}]", driver.trace().signal_names().len());

    println!("time,upper,lower");
    for record in reader.records() {
        let record = record.map_err(|e| MonitorError::MalformedSource { reason: e.to_string() })?;
        let mut fields = record.iter();
        let time: f64 = fields
            .next()
            .ok_or_else(|| MonitorError::MalformedSource { reason: "empty row".to_string() })?
            .parse()
            .map_err(|_| MonitorError::MalformedSource { reason: "non-numeric time column".to_string() })?;
        let values: Vec<f64> = fields
            .map(|f| f.parse::<f64>().map_err(|_| MonitorError::MalformedSource { reason: format!("non-numeric value '{f}'") }))
            .collect::<Result<_, _>>()?;

        let (upper, lower) = driver.step(time, &values)?;
        log::debug!("t={time}: upper={upper}, lower={lower}");
        println!("{time},{upper},{lower}");
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
