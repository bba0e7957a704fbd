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

use anyhow::{anyhow, Result};
use clap::Args;
use r_cable_calc::{
    io::write_reference_data,
    reference::{MotorQuery, ReferenceData},
};
use r_cable_logging::{log_system_event, SystemEventOutcome};

use crate::print_json;

#[derive(Debug, Args)]
pub struct MotorsCommand {
    /// Case-insensitive text matched against type, description, voltage and hp.
    #[arg(long, value_name = "TEXT")]
    filter: Option<String>,

    /// 1-based page number.
    #[arg(long, value_name = "N")]
    page: Option<usize>,

    #[arg(long = "page-size", value_name = "N")]
    page_size: Option<usize>,
}

pub fn motors(command: &MotorsCommand, reference: &ReferenceData) -> Result<()> {
    let page = reference.list_motors(&MotorQuery {
        page: command.page,
        page_size: command.page_size,
        filter: command.filter.clone(),
    });
    print_json(&page)
}

#[derive(Debug, Args)]
pub struct SeedCommand {
    /// Destination; the extension selects TOML, JSON or YAML.
    #[arg(long, value_name = "FILE")]
    out: PathBuf,

    /// Replace an existing file.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    force: bool,
}

pub fn seed(command: &SeedCommand) -> Result<()> {
    if command.out.exists() && !command.force {
        return Err(anyhow!(
            "{} already exists; pass --force to overwrite",
            command.out.display()
        ));
    }
    match write_reference_data(&command.out, &ReferenceData::seeded()) {
        Ok(()) => {
            log_system_event(
                None,
                "reference.seed",
                &format!("built-in tables written to {}", command.out.display()),
                SystemEventOutcome::Success,
            );
            println!("Reference tables written to {}", command.out.display());
            Ok(())
        }
        Err(err) => {
            log_system_event(
                None,
                "reference.seed",
                &format!("failed to write {}: {}", command.out.display(), err),
                SystemEventOutcome::Fault,
            );
            Err(err.into())
        }
    }
}
