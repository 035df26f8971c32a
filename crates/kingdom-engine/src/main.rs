//! Campaign binary for the kingdom turn engine.
//!
//! Loads configuration, builds the starting kingdom (or resumes a stored
//! one), and plays automated turns until the configured limit.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `kingdom-config.yaml` (or the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Load the catalog
//! 4. Open the kingdom store (memory or Dragonfly)
//! 5. Run the campaign
//! 6. Log the result

mod error;
mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use kingdom_commands::{CommandRegistry, FirstChoiceSelector};
use kingdom_core::{
    FixedOutcome, KingdomConfig, LogFormat, OutcomeSource, RolledOutcome, TurnController,
    run_campaign,
};
use kingdom_db::{DragonflyPool, DragonflyStore, KingdomStore, MemoryStore};
use kingdom_types::Kingdom;
use kingdom_world::{Catalog, create_starting_kingdom};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::report::LogCallback;

const DEFAULT_CONFIG_PATH: &str = "kingdom-config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration. Logging is not up yet, so remember whether
    //    the defaults were used and report it afterwards.
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, from_file) = load_config(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    // 2. Initialize structured logging.
    init_tracing(&config);
    info!("kingdom-engine starting");
    if from_file {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        kingdom = config.kingdom.name,
        seed = config.kingdom.seed,
        level = config.kingdom.level,
        max_turns = config.simulation.max_turns,
        "Campaign settings"
    );

    // 3. Load the catalog.
    let catalog = match &config.kingdom.catalog {
        Some(path) => Catalog::from_file(path)
            .map_err(EngineError::from)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => Catalog::standard(),
    };
    info!(
        structures = catalog.structures.len(),
        incidents = catalog.incidents.len(),
        events = catalog.events.len(),
        "Catalog ready"
    );

    // 4 and 5. Open the store and run.
    match &config.infrastructure.dragonfly_url {
        Some(url) => {
            info!(url = %url, "Connecting to Dragonfly");
            let pool = DragonflyPool::connect(url).await.map_err(EngineError::from)?;
            let store = match config.infrastructure.kingdom_id {
                Some(id) => {
                    info!(kingdom_id = %id, "Resuming stored kingdom");
                    DragonflyStore::open(pool, id).await
                }
                None => DragonflyStore::create(pool, &starting_kingdom(&config)).await,
            }
            .map_err(EngineError::from)?;
            info!(key = store.key(), "Dragonfly store ready");
            play(store, catalog, &config).await?;
        }
        None => {
            info!("No Dragonfly URL configured, keeping the kingdom in memory");
            play(MemoryStore::new(starting_kingdom(&config)), catalog, &config).await?;
        }
    }

    info!("kingdom-engine shutdown complete");
    Ok(())
}

/// Read the config file, falling back to defaults when it does not exist.
fn load_config(path: &Path) -> Result<(KingdomConfig, bool), EngineError> {
    if path.exists() {
        Ok((KingdomConfig::from_file(path)?, true))
    } else {
        let mut config = KingdomConfig::default();
        config.infrastructure.apply_env_overrides();
        Ok((config, false))
    }
}

fn init_tracing(config: &KingdomConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match config.logging.format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// The configured starting kingdom with any stockpile overrides applied.
fn starting_kingdom(config: &KingdomConfig) -> Kingdom {
    let mut kingdom = create_starting_kingdom(&config.kingdom.name, config.kingdom.level);
    for (resource, value) in &config.kingdom.starting_resources {
        kingdom.set_resource(*resource, *value);
    }
    kingdom
}

fn outcome_source(config: &KingdomConfig) -> Box<dyn OutcomeSource> {
    match config.simulation.fixed_grade {
        Some(grade) => {
            info!(grade = grade.label(), "Every check resolves with a fixed grade");
            Box::new(FixedOutcome(grade))
        }
        None => Box::new(RolledOutcome {
            modifier: config.simulation.check_modifier,
            dc: config.simulation.check_dc,
        }),
    }
}

/// Play the campaign against `store` and log how it ended.
async fn play<S: KingdomStore>(
    store: S,
    catalog: Catalog,
    config: &KingdomConfig,
) -> Result<(), EngineError> {
    let registry = CommandRegistry::new(
        Arc::new(catalog),
        config.rules.economy_rules(),
        FirstChoiceSelector,
    );
    let controller = TurnController::new(store, registry, config.rules.clone());
    let kingdom = controller.kingdom().await?;
    info!(
        kingdom_id = %kingdom.id,
        turn = kingdom.turn,
        phase = ?kingdom.current_phase,
        settlements = kingdom.settlements.len(),
        "Entering turn loop"
    );

    let mut source = outcome_source(config);
    let mut rng = SmallRng::seed_from_u64(config.kingdom.seed);
    let mut callback = LogCallback::default();

    let result = run_campaign(
        &controller,
        &mut source,
        &mut rng,
        config.simulation.max_turns,
        &mut callback,
    )
    .await?;

    info!(
        turns_played = result.turns_played,
        next_turn = result.kingdom.turn,
        resources = ?result.kingdom.resources,
        settlements = result.kingdom.settlements.len(),
        armies = result.kingdom.armies.len(),
        "Campaign finished"
    );
    Ok(())
}
