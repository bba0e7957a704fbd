//! ---
//! rc_section: "08-conductor-sizing"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Conductor sizing calculations over reference tables."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use std::{fs, path::Path};

use tracing::info;

use crate::{
    errors::{CalcEngineError, Result},
    reference::{ReferenceData, ReferenceTables},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataFormat {
    Json,
    Yaml,
    Toml,
}

fn format_for(path: &Path, contents: Option<&str>) -> DataFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => DataFormat::Json,
        Some("yaml") | Some("yml") => DataFormat::Yaml,
        Some("toml") => DataFormat::Toml,
        _ => match contents {
            Some(data) if data.trim_start().starts_with('{') => DataFormat::Json,
            _ => DataFormat::Yaml,
        },
    }
}

/// Load and validate reference tables from a TOML, JSON or YAML file.
pub fn load_reference_data(path: impl AsRef<Path>) -> Result<ReferenceData> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    let tables: ReferenceTables = match format_for(path, Some(&data)) {
        DataFormat::Json => serde_json::from_str(&data)?,
        DataFormat::Yaml => {
            serde_yaml::from_str(&data).map_err(CalcEngineError::YamlSerializationFailed)?
        }
        DataFormat::Toml => toml::from_str(&data)?,
    };
    let reference = ReferenceData::new(tables)?;
    info!(
        path = %path.display(),
        motors = reference.motors().len(),
        conductors = reference.conductors().len(),
        grouping_factors = reference.grouping_factors().len(),
        "reference data loaded"
    );
    Ok(reference)
}

/// Write the tables in the format implied by the file extension.
pub fn write_reference_data(path: impl AsRef<Path>, reference: &ReferenceData) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tables = reference.to_tables();
    let serialized = match format_for(path, None) {
        DataFormat::Json => serde_json::to_string_pretty(&tables)?,
        DataFormat::Yaml => serde_yaml::to_string(&tables)?,
        DataFormat::Toml => toml::to_string_pretty(&tables)?,
    };
    fs::write(path, serialized)?;
    info!(path = %path.display(), "reference data written");
    Ok(())
}
