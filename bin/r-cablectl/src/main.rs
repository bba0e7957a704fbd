//! ---
//! rc_section: "05-networking-external-interfaces"
//! rc_subsection: "binary"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Offline command-line access to the sizing engine."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use r_cable_calc::{io::load_reference_data, reference::ReferenceData, CalcSettings, Calculator};
use r_cable_common::version::VersionInfo;
use r_cable_logging as logging;
use serde::Serialize;

mod calc;
mod history;
mod tables;

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "R-CABLE conductor sizing utility",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,

    /// Reference tables (TOML, JSON or YAML); built-in tables when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    reference: Option<PathBuf>,

    /// Ambient temperature derating applied to corrected currents.
    #[arg(long, global = true, value_name = "FACTOR", default_value_t = 1.0)]
    temperature_derating: f64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(subcommand, about = "Run sizing calculations")]
    Calc(calc::CalcCommand),
    #[command(about = "List motors in the reference tables")]
    Motors(tables::MotorsCommand),
    #[command(about = "List conductors in the reference tables")]
    Conductors,
    #[command(about = "Show recent entries of a history file")]
    History(history::HistoryCommand),
    #[command(about = "Write the built-in reference tables to a file")]
    Seed(tables::SeedCommand),
}

impl Cli {
    fn reference(&self) -> Result<ReferenceData> {
        match &self.reference {
            Some(path) => load_reference_data(path)
                .with_context(|| format!("failed to load reference data {}", path.display())),
            None => Ok(ReferenceData::seeded()),
        }
    }

    fn calculator(&self) -> Result<Calculator> {
        let settings = CalcSettings {
            temperature_derating: self.temperature_derating,
            ..CalcSettings::default()
        };
        Calculator::new(Arc::new(self.reference()?), settings).context("invalid calculator settings")
    }
}

/// Pretty JSON on stdout; everything the tools print goes through here.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    if cli.version {
        println!("{}", VersionInfo::current("r-cablectl"));
        return Ok(());
    }
    let Some(command) = cli.command.as_ref() else {
        println!("{}", VersionInfo::current("r-cablectl"));
        println!("run with --help to list commands");
        return Ok(());
    };
    match command {
        Commands::Calc(cmd) => calc::run(cmd, &cli.calculator()?)?,
        Commands::Motors(cmd) => tables::motors(cmd, &cli.reference()?)?,
        Commands::Conductors => print_json(&cli.reference()?.conductors())?,
        Commands::History(cmd) => history::run(cmd, &cli.reference()?)?,
        Commands::Seed(cmd) => tables::seed(cmd)?,
    }
    Ok(())
}
