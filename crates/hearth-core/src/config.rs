//! Typed configuration for a simulation run.
//!
//! The config is YAML, mirrored by these structs, loaded once at startup
//! and validated before anything is constructed from it. Every field has
//! a default, so an empty file is a valid (if dull) town.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use hearth_types::ItemKind;

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The parsed values do not describe a runnable simulation.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimConfig {
    /// World identity and timing.
    #[serde(default)]
    pub world: WorldSection,

    /// Population parameters.
    #[serde(default)]
    pub population: PopulationSection,

    /// Vital attribute rates.
    #[serde(default)]
    pub vitals: VitalsSection,

    /// Relationship dynamics.
    #[serde(default)]
    pub relationships: RelationshipsSection,

    /// Decision scheduling.
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// Reasoning provider settings.
    #[serde(default)]
    pub provider: ProviderSection,

    /// Run bounds.
    #[serde(default)]
    pub bounds: BoundsSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl SimConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// `HEARTH_PROVIDER_URL` and `HEARTH_PROVIDER_API_KEY` environment
    /// variables override the corresponding provider fields, so deployment
    /// never requires editing the file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`], [`ConfigError::Yaml`], or
    /// [`ConfigError::Invalid`] from validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Yaml`] or [`ConfigError::Invalid`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.provider.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on values that would only blow up mid-run.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.minutes_per_tick == 0 {
            return Err(invalid("world.minutes_per_tick must be at least 1"));
        }
        if self.world.minutes_per_year == 0 {
            return Err(invalid("world.minutes_per_year must be at least 1"));
        }
        if self.vitals.hunger_decay_per_minute < Decimal::ZERO {
            return Err(invalid("vitals.hunger_decay_per_minute cannot be negative"));
        }
        if self.relationships.decay_step < Decimal::ZERO
            || self.relationships.decay_step > Decimal::ONE
        {
            return Err(invalid("relationships.decay_step must be within [0, 1]"));
        }
        if self.provider.concurrency == 0 {
            return Err(invalid("provider.concurrency must be at least 1"));
        }
        if self.provider.request_timeout_ms == 0 {
            return Err(invalid("provider.request_timeout_ms must be at least 1"));
        }
        for (kind, count) in &self.population.starting_inventory {
            if *count == 0 {
                return Err(invalid(&format!(
                    "population.starting_inventory: {kind:?} has a zero count"
                )));
            }
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// World identity and timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldSection {
    /// Human-readable town name.
    #[serde(default = "default_town_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Game-minutes advanced per tick.
    #[serde(default = "default_minutes_per_tick")]
    pub minutes_per_tick: u64,

    /// Game-minutes in one year (for age accounting).
    #[serde(default = "default_minutes_per_year")]
    pub minutes_per_year: u64,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            name: default_town_name(),
            seed: default_seed(),
            minutes_per_tick: default_minutes_per_tick(),
            minutes_per_year: default_minutes_per_year(),
        }
    }
}

/// Population parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PopulationSection {
    /// Number of residents to spawn at start.
    #[serde(default = "default_initial_agents")]
    pub initial_agents: u32,

    /// Money given to each resident at spawn.
    #[serde(default = "default_starting_money")]
    pub starting_money: u32,

    /// Items given to each resident at spawn.
    #[serde(default = "default_starting_inventory")]
    pub starting_inventory: BTreeMap<ItemKind, u32>,
}

impl Default for PopulationSection {
    fn default() -> Self {
        Self {
            initial_agents: default_initial_agents(),
            starting_money: default_starting_money(),
            starting_inventory: default_starting_inventory(),
        }
    }
}

/// Vital attribute rates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VitalsSection {
    /// Hunger lost per game-minute.
    #[serde(default = "default_hunger_decay")]
    pub hunger_decay_per_minute: Decimal,
}

impl Default for VitalsSection {
    fn default() -> Self {
        Self {
            hunger_decay_per_minute: default_hunger_decay(),
        }
    }
}

/// Relationship dynamics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelationshipsSection {
    /// Game-minutes without interaction before a relationship starts to
    /// drift back toward neutral.
    #[serde(default = "default_decay_idle_minutes")]
    pub decay_idle_minutes: u64,

    /// Per-update drift applied to each axis of a stale relationship.
    #[serde(default = "default_decay_step")]
    pub decay_step: Decimal,
}

impl Default for RelationshipsSection {
    fn default() -> Self {
        Self {
            decay_idle_minutes: default_decay_idle_minutes(),
            decay_step: default_decay_step(),
        }
    }
}

/// Decision scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerSection {
    /// Game-minutes between decision dispatches per agent.
    #[serde(default = "default_cooldown_minutes")]
    pub decision_cooldown_minutes: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            decision_cooldown_minutes: default_cooldown_minutes(),
        }
    }
}

/// Reasoning provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderSection {
    /// Base URL of the OpenAI-style chat completion endpoint.
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    /// Model name passed through to the provider.
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token (empty = unauthenticated local provider).
    #[serde(default)]
    pub api_key: String,

    /// Per-call timeout in wall-clock milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Retries after a failed or timed-out call, before falling back.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff between retries, in wall-clock milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Maximum provider calls in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Response cache time-to-live in wall-clock milliseconds (0 = off).
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
}

impl ProviderSection {
    /// Override provider endpoint fields from the environment when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HEARTH_PROVIDER_URL") {
            self.base_url = val;
        }
        if let Ok(val) = std::env::var("HEARTH_PROVIDER_API_KEY") {
            self.api_key = val;
        }
    }
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            model: default_model(),
            api_key: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            concurrency: default_concurrency(),
            cache_ttl_ms: default_cache_ttl_ms(),
        }
    }
}

/// Run bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BoundsSection {
    /// Maximum ticks before the run ends (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingSection {
    /// Log level filter (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_town_name() -> String {
    "Hearth".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_minutes_per_tick() -> u64 {
    15
}

const fn default_minutes_per_year() -> u64 {
    525_600
}

const fn default_initial_agents() -> u32 {
    4
}

const fn default_starting_money() -> u32 {
    100
}

fn default_starting_inventory() -> BTreeMap<ItemKind, u32> {
    let mut items = BTreeMap::new();
    items.insert(ItemKind::Bread, 2);
    items.insert(ItemKind::Berry, 3);
    items
}

fn default_hunger_decay() -> Decimal {
    Decimal::new(25, 2) // 0.25 per minute
}

const fn default_decay_idle_minutes() -> u64 {
    1_440
}

fn default_decay_step() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

const fn default_cooldown_minutes() -> u64 {
    30
}

fn default_provider_url() -> String {
    "http://localhost:11434/v1".to_owned()
}

fn default_model() -> String {
    "llama3".to_owned()
}

const fn default_request_timeout_ms() -> u64 {
    7_000
}

const fn default_max_retries() -> u32 {
    1
}

const fn default_retry_backoff_ms() -> u64 {
    250
}

const fn default_concurrency() -> usize {
    4
}

const fn default_cache_ttl_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_owned()
}
