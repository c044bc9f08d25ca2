//! Demo binary for the Hearth simulation.
//!
//! Loads `hearth.yaml` (or defaults), builds the standard town, and
//! runs the tick loop until the configured tick bound is reached or the
//! town empties. With `HEARTH_OFFLINE` set the provider is a scripted
//! outage, so every decision exercises the rule fallback -- useful for
//! watching the town run without any endpoint at all.

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use hearth_core::{ConfigError, SimConfig};
use hearth_engine::Simulation;
use hearth_runner::{HttpProvider, ReasoningProvider, ScriptedProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    info!(
        town = config.world.name,
        seed = config.world.seed,
        minutes_per_tick = config.world.minutes_per_tick,
        residents = config.population.initial_agents,
        "hearth-engine starting"
    );

    let provider = build_provider(&config);
    info!(provider = provider.name(), "reasoning provider ready");

    let max_ticks = config.bounds.max_ticks;
    let mut sim = Simulation::new(config, provider)?;

    let mut ticks: u64 = 0;
    loop {
        if max_ticks > 0 && ticks >= max_ticks {
            info!(ticks, "tick bound reached");
            break;
        }
        let report = sim.run_tick().await?;
        ticks = ticks.saturating_add(1);
        info!(
            tick = ticks,
            minutes = report.minutes,
            dispatched = report.dispatched,
            applied = report.applied,
            failed = report.failed,
            deaths = report.deaths,
            living = sim.living_population(),
            "tick complete"
        );
        if sim.living_population() == 0 {
            info!(ticks, "the town has emptied");
            break;
        }
    }

    info!(ticks, minutes = sim.clock_minutes(), "hearth-engine shutdown");
    Ok(())
}

/// Pick the provider backend from environment and config.
fn build_provider(config: &SimConfig) -> ReasoningProvider {
    if std::env::var("HEARTH_OFFLINE").is_ok() {
        return ReasoningProvider::Scripted(ScriptedProvider::failing());
    }
    ReasoningProvider::Http(HttpProvider::new(
        config.provider.base_url.clone(),
        config.provider.api_key.clone(),
        config.provider.model.clone(),
    ))
}

/// Load `hearth.yaml` from the working directory, or defaults when absent.
fn load_config() -> Result<SimConfig, ConfigError> {
    let path = Path::new("hearth.yaml");
    if path.exists() {
        SimConfig::from_file(path)
    } else {
        Ok(SimConfig::default())
    }
}
