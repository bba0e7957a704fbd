//! ---
//! rc_section: "05-networking-external-interfaces"
//! rc_subsection: "binary"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Offline command-line access to the sizing engine."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use r_cable_calc::{
    api::{CalculationRequest, CurrentResult, VoltageDropRequest},
    model::{MotorType, PhaseType},
    CalcEngineError, Calculator,
};
use r_cable_history::{CalculationRecord, HistoryRecorder, JsonlHistory};
use r_cable_logging::{rc_info, LogContext};

use crate::print_json;

/// Dispatch entry point for calculation subcommands.
pub fn run(command: &CalcCommand, calculator: &Calculator) -> Result<()> {
    match command {
        CalcCommand::Current(cmd) => {
            let request = cmd.load.to_request(None);
            let result = calculator
                .compute_current(&request)
                .map_err(explain)?;
            record(&cmd.record, "current", &result)?;
            print_json(&result)
        }
        CalcCommand::Drop(cmd) => {
            let prior = match &cmd.prior {
                Some(path) => read_prior(path)?,
                None => calculator
                    .compute_current(&cmd.load.to_request(None))
                    .map_err(explain)?,
            };
            let request = VoltageDropRequest {
                voltage: cmd.load.voltage,
                length_m: cmd.run.length,
                max_drop_percent: cmd.run.max_drop,
                phase_angle_deg: cmd.run.phase_angle,
                prior: Some(prior),
            };
            let result = calculator
                .compute_voltage_drop(&request)
                .map_err(explain)?;
            record(&cmd.record, "voltage_drop", &result)?;
            print_json(&result)
        }
        CalcCommand::Size(cmd) => {
            let request = cmd.load.to_request(Some(&cmd.run));
            let result = calculator.size_conductor(&request).map_err(explain)?;
            record(&cmd.record, "size", &result)?;
            print_json(&result)
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CalcCommand {
    /// Required ampacity and the smallest conductor that carries it.
    Current(CurrentCommand),
    /// Voltage-drop selection over a prior current result.
    Drop(DropCommand),
    /// Both passes; the voltage-drop pass runs when --length and --max-drop are set.
    Size(SizeCommand),
}

#[derive(Debug, Args)]
pub struct CurrentCommand {
    #[command(flatten)]
    load: LoadArgs,
    #[command(flatten)]
    record: RecordArgs,
}

#[derive(Debug, Args)]
pub struct DropCommand {
    /// JSON output of `calc current`; the load flags are used when omitted.
    #[arg(long, value_name = "FILE")]
    prior: Option<PathBuf>,
    #[command(flatten)]
    load: LoadArgs,
    #[command(flatten)]
    run: RunArgs,
    #[command(flatten)]
    record: RecordArgs,
}

#[derive(Debug, Args)]
pub struct SizeCommand {
    #[command(flatten)]
    load: LoadArgs,
    #[command(flatten)]
    run: RunArgs,
    #[command(flatten)]
    record: RecordArgs,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Nominal system voltage (V).
    #[arg(long, value_name = "VOLTS")]
    voltage: Option<f64>,

    /// Load power: kW for general loads, hp for motors.
    #[arg(long, value_name = "POWER")]
    power: Option<f64>,

    /// Power factor of a general load.
    #[arg(long = "power-factor", value_name = "PF")]
    power_factor: Option<f64>,

    #[arg(long, value_enum)]
    phases: Option<PhaseArg>,

    /// Treat the load as a motor of this type.
    #[arg(long, value_enum, value_name = "TYPE")]
    motor: Option<MotorArg>,

    /// Conductors per phase.
    #[arg(long = "parallel", value_name = "COUNT")]
    parallel_conductors: Option<u32>,
}

impl LoadArgs {
    fn to_request(&self, run: Option<&RunArgs>) -> CalculationRequest {
        CalculationRequest {
            voltage: self.voltage,
            power: self.power,
            power_factor: self.power_factor,
            phases: self.phases.map(Into::into),
            is_motor: self.motor.is_some(),
            motor_type: self.motor.map(Into::into),
            parallel_conductors: self.parallel_conductors,
            length_m: run.and_then(|run| run.length),
            max_drop_percent: run.and_then(|run| run.max_drop),
            phase_angle_deg: run.and_then(|run| run.phase_angle),
        }
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// One-way run length (m).
    #[arg(long, value_name = "METRES")]
    length: Option<f64>,

    /// Allowed voltage drop (% of nominal).
    #[arg(long = "max-drop", value_name = "PERCENT")]
    max_drop: Option<f64>,

    /// Phase angle in degrees; derived from the power factor when omitted.
    #[arg(long = "phase-angle", value_name = "DEGREES")]
    phase_angle: Option<f64>,
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Append the result to this history file.
    #[arg(long = "record", value_name = "FILE")]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PhaseArg {
    Single,
    Three,
}

impl From<PhaseArg> for PhaseType {
    fn from(value: PhaseArg) -> Self {
        match value {
            PhaseArg::Single => PhaseType::Single,
            PhaseArg::Three => PhaseType::Three,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MotorArg {
    Induction,
    Synchronous,
    Other,
}

impl From<MotorArg> for MotorType {
    fn from(value: MotorArg) -> Self {
        match value {
            MotorArg::Induction => MotorType::Induction,
            MotorArg::Synchronous => MotorType::Synchronous,
            MotorArg::Other => MotorType::Other,
        }
    }
}

/// Attach the remediation hint, if any, to a calculator error.
fn explain(err: CalcEngineError) -> anyhow::Error {
    match err.hint() {
        Some(hint) => anyhow!("{err}\nhint: {hint}"),
        None => anyhow!(err),
    }
}

fn read_prior(path: &Path) -> Result<CurrentResult> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("unable to read prior result {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("{} is not a current calculation result", path.display()))
}

fn record<T>(args: &RecordArgs, operation: &str, result: &T) -> Result<()>
where
    for<'a> CalculationRecord: From<&'a T>,
{
    let Some(path) = &args.path else {
        return Ok(());
    };
    let history = JsonlHistory::open(path)
        .with_context(|| format!("failed to open history {}", path.display()))?;
    let entry = history.append(CalculationRecord::from(result))?;
    rc_info!(
        context = LogContext::new()
            .with_request_id("cli")
            .with_operation(operation),
        "recorded history entry {} in {}",
        entry.id,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(subcommand)]
        command: CalcCommand,
    }

    #[test]
    fn size_flags_build_full_request() {
        let harness = Harness::parse_from([
            "calc", "size", "--voltage", "220", "--power", "10", "--power-factor", "0.9",
            "--phases", "three", "--length", "100", "--max-drop", "3",
        ]);
        let CalcCommand::Size(cmd) = harness.command else {
            panic!("expected size command");
        };
        let request = cmd.load.to_request(Some(&cmd.run));
        assert_eq!(request.phases, Some(PhaseType::Three));
        assert!(!request.is_motor);
        assert!(request.wants_voltage_drop());
    }

    #[test]
    fn motor_flag_marks_motor_load() {
        let harness = Harness::parse_from([
            "calc", "current", "--voltage", "220", "--power", "10", "--phases", "three",
            "--motor", "induction",
        ]);
        let CalcCommand::Current(cmd) = harness.command else {
            panic!("expected current command");
        };
        let request = cmd.load.to_request(None);
        assert!(request.is_motor);
        assert_eq!(request.motor_type, Some(MotorType::Induction));
    }

    #[test]
    fn hints_are_appended_to_errors() {
        let err = explain(CalcEngineError::VoltageDropUnsatisfiable {
            max_percent: 0.5,
            evaluated: 7,
        });
        assert!(err.to_string().contains("hint:"));
    }
}
