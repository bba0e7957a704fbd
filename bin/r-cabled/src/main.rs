//! ---
//! rc_section: "01-core-functionality"
//! rc_subsection: "binary"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Binary entrypoint for the R-CABLE daemon."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use r_cable_api::{spawn_api_server, ApiServer, ApiState};
use r_cable_calc::{io::load_reference_data, reference::ReferenceData, CalcSettings, Calculator};
use r_cable_common::config::{AppConfig, HistoryConfig};
use r_cable_common::logging::init_tracing;
use r_cable_common::version::VersionInfo;
use r_cable_history::{HistoryMetrics, HistoryRecorder, InMemoryHistory, JsonlHistory};
use r_cable_metrics::{new_registry, spawn_http_server, CalcMetrics, DaemonMetrics, SharedRegistry};
use tokio::signal;
use tracing::{info, warn};

const SERVICE_NAME: &str = "r-cabled";

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "R-CABLE conductor sizing daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", env = "R_CABLE_CONFIG", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Serve the sizing API")]
    Run,
    #[command(about = "Validate configuration and reference data, then exit")]
    CheckConfig,
}

/// Everything the server needs, built from configuration.
struct Runtime {
    calculator: Calculator,
    history: Arc<dyn HistoryRecorder>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let version = VersionInfo::current(SERVICE_NAME);
    if cli.version {
        println!("{version}");
        return Ok(());
    }

    let load_started = Instant::now();
    let loaded = match &cli.config {
        Some(path) => r_cable_common::LoadedAppConfig {
            config: AppConfig::from_path(path)?,
            source: Some(path.clone()),
        },
        None => AppConfig::load_or_default(&[
            PathBuf::from("configs/r-cable.toml"),
            PathBuf::from("/etc/r-cable/r-cable.toml"),
        ])?,
    };
    let config = loaded.config;

    let registry = new_registry();
    let daemon_metrics = DaemonMetrics::new(registry.clone())?;
    daemon_metrics.inc_start();
    daemon_metrics.set_build_info(version.version, build_profile());

    init_tracing(SERVICE_NAME, &config.logging)?;
    match &loaded.source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => warn!("no configuration file found; using built-in defaults"),
    }

    let runtime = build_runtime(&config, &registry)?;
    daemon_metrics.observe_config_load(load_started.elapsed().as_secs_f64());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_daemon(config, runtime, registry, version).await?,
        Commands::CheckConfig => {
            let reference = runtime.calculator.reference();
            println!(
                "configuration ok: {} motors, {} conductors, {} grouping factors",
                reference.motors().len(),
                reference.conductors().len(),
                reference.grouping_factors().len()
            );
        }
    }
    Ok(())
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

fn build_runtime(config: &AppConfig, registry: &SharedRegistry) -> Result<Runtime> {
    let reference = match &config.reference.path {
        Some(path) => load_reference_data(path)
            .with_context(|| format!("failed to load reference data {}", path.display()))?,
        None => {
            info!("using built-in reference tables");
            ReferenceData::seeded()
        }
    };
    let settings = CalcSettings {
        temperature_derating: config.calc.temperature_derating,
        max_candidates: config.calc.max_candidates,
    };
    let calculator = Calculator::new(Arc::new(reference), settings)
        .context("invalid calculator settings")?;
    let history = open_history(&config.history, registry)?;
    Ok(Runtime {
        calculator,
        history,
    })
}

fn open_history(
    settings: &HistoryConfig,
    registry: &SharedRegistry,
) -> Result<Arc<dyn HistoryRecorder>> {
    if !settings.enabled {
        info!("history persistence disabled; keeping calculations in memory");
        return Ok(Arc::new(InMemoryHistory::new()));
    }
    let metrics = HistoryMetrics::new(registry.clone())?;
    let history = JsonlHistory::open(&settings.path)
        .with_context(|| format!("failed to open history {}", settings.path.display()))?
        .with_metrics(metrics);
    Ok(Arc::new(history))
}

async fn run_daemon(
    config: AppConfig,
    runtime: Runtime,
    registry: SharedRegistry,
    version: VersionInfo,
) -> Result<()> {
    let metrics_server = if config.metrics.enabled {
        info!(address = %config.metrics.listen, "metrics exporter enabled");
        Some(spawn_http_server(registry.clone(), config.metrics.listen)?)
    } else {
        info!("metrics exporter disabled by configuration");
        None
    };

    let mut api_server: Option<ApiServer> = None;
    if config.api.enabled {
        let state = ApiState::new(runtime.calculator, runtime.history, version)
            .with_metrics(CalcMetrics::new(&registry)?)
            .with_recent_limit(config.history.recent_limit);
        let server = spawn_api_server(Arc::new(state), config.api.listen)?;
        info!(address = %server.addr(), "api server listening");
        api_server = Some(server);
    } else {
        warn!("api server disabled by configuration; nothing to serve");
    }

    info!("daemon running; waiting for termination signal");
    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");

    if let Some(server) = api_server {
        server.shutdown().await?;
    }
    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }
    Ok(())
}
