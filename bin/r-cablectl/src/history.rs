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

use anyhow::{anyhow, Context, Result};
use clap::Args;
use r_cable_calc::reference::ReferenceData;
use r_cable_common::MAX_RECENT_LIMIT;
use r_cable_history::{join_conductors, HistoryRecorder, JsonlHistory, DEFAULT_RECENT_LIMIT};

use crate::print_json;

#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// History file written by the daemon or by `calc --record`.
    #[arg(long, value_name = "FILE", default_value = "target/history/calculations.jsonl")]
    path: PathBuf,

    /// Number of entries, newest first.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_RECENT_LIMIT)]
    limit: usize,
}

pub fn run(command: &HistoryCommand, reference: &ReferenceData) -> Result<()> {
    if command.limit == 0 || command.limit > MAX_RECENT_LIMIT {
        return Err(anyhow!("--limit must be within 1..={MAX_RECENT_LIMIT}"));
    }
    if !command.path.is_file() {
        return Err(anyhow!("no history file at {}", command.path.display()));
    }
    let history = JsonlHistory::open(&command.path)
        .with_context(|| format!("failed to open history {}", command.path.display()))?;
    let entries = history.recent(command.limit)?;
    print_json(&join_conductors(entries, reference))
}
