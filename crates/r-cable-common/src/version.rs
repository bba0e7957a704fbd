//! ---
//! rc_section: "01-core-functionality"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Shared configuration, tracing and version utilities."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use serde::Serialize;

/// Workspace release version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Build metadata reported by `--version` and `/api/status`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub target_os: &'static str,
    pub target_arch: &'static str,
}

impl VersionInfo {
    pub fn current(name: &'static str) -> Self {
        Self {
            name,
            version: version(),
            target_os: std::env::consts::OS,
            target_arch: std::env::consts::ARCH,
        }
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({}-{})",
            self.name, self.version, self.target_os, self.target_arch
        )
    }
}
