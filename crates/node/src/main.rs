use std::{env, time::Duration};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use plant_node::config::{self, Backend, Config};
use plant_node::memory::MemoryStore;
use plant_node::remote::{wait_until_reachable, RemoteStore};
use plant_node::rest::RestStore;
use plant_node::sim::{Scenario, SimulatedSensors};
use plant_node::{Node, SystemClock};

/// Light/climate reads per simulated day (ten minutes at 2 s).
const SIM_DAY_TICKS: u64 = 300;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ── Config file ─────────────────────────────────────────────────
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = config::load(&config_path)?;

    // ── Logging ─────────────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.logging.level))
        .context("invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    for w in cfg.warnings() {
        warn!("config: {w}");
    }

    // ── Sensors ─────────────────────────────────────────────────────
    let scenario_name = env::var("SIM_SCENARIO").unwrap_or_else(|_| cfg.simulation.scenario.clone());
    let scenario = Scenario::from_str_lossy(&scenario_name);
    let sensors = SimulatedSensors::new(scenario, &cfg.calibration()?, SIM_DAY_TICKS);
    info!(%scenario, config = %config_path, "plant node starting");

    // ── Remote store ────────────────────────────────────────────────
    match cfg.remote.backend {
        Backend::Memory => {
            info!("using in-memory store");
            run(&cfg, sensors, MemoryStore::new()).await
        }
        Backend::Rest => {
            let store = RestStore::new(
                &cfg.remote.endpoint,
                cfg.auth_secret(),
                Duration::from_millis(cfg.remote.request_timeout_ms),
            )
            .context("failed to create REST client")?;
            info!(endpoint = %cfg.remote.endpoint, "using REST store");
            run(&cfg, sensors, store).await
        }
    }
}

async fn run<R: RemoteStore>(cfg: &Config, sensors: SimulatedSensors, store: R) -> Result<()> {
    let settings = cfg.node_settings()?;

    // Nothing is scheduled until the store answers.
    wait_until_reachable(
        &store,
        &settings.record,
        Duration::from_millis(cfg.remote.startup_retry_ms),
    )
    .await;

    let mut node = Node::new(settings, sensors, store, SystemClock::new());
    let report = node.bootstrap().await;
    if !report.is_complete() {
        warn!(failed = ?report.failed, "schema repair incomplete; continuing");
    }

    node.run_forever().await;
    Ok(())
}
