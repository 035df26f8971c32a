//! Configuration loading from `kingdom-config.yaml`.
//!
//! Every section and every field has a default, so an empty file (or no
//! file at all) yields a playable campaign. The Dragonfly URL can be
//! supplied through the `DRAGONFLY_URL` environment variable, which takes
//! precedence over the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use kingdom_economy::{EconomyRules, FeedingPolicy};
use kingdom_types::{KingdomId, OutcomeGrade, Resource};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse the YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The values parsed but contradict each other.
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

// ---------------------------------------------------------------------------
// Top-level configuration
// ---------------------------------------------------------------------------

/// Root configuration structure for the turn engine.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KingdomConfig {
    /// The campaign's starting kingdom.
    #[serde(default)]
    pub kingdom: KingdomSettings,

    /// Tunable turn rules.
    #[serde(default)]
    pub rules: RulesConfig,

    /// External services.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Automated campaign bounds.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl KingdomConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if the rules contradict each other.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if the rules contradict each other.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.infrastructure.apply_env_overrides();
        config.rules.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Kingdom
// ---------------------------------------------------------------------------

/// The kingdom a new campaign starts with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KingdomSettings {
    /// Display name.
    #[serde(default = "default_kingdom_name")]
    pub name: String,

    /// Seed for every random choice the engine makes.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Party level. Caps army level and selects the income band.
    #[serde(default = "default_level")]
    pub level: u32,

    /// Stockpiles that replace the starting kingdom's defaults.
    #[serde(default)]
    pub starting_resources: BTreeMap<Resource, i32>,

    /// Optional catalog file replacing the built-in tables.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

impl Default for KingdomSettings {
    fn default() -> Self {
        Self {
            name: default_kingdom_name(),
            seed: default_seed(),
            level: default_level(),
            starting_resources: BTreeMap::new(),
            catalog: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Tunable turn rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RulesConfig {
    /// Unrest points per tier step (default: 3).
    #[serde(default = "default_unrest_per_tier")]
    pub unrest_per_tier: u32,

    /// Highest unrest tier (default: 3).
    #[serde(default = "default_max_unrest_tier")]
    pub max_unrest_tier: u32,

    /// Incident chance per tier, indexed by tier (default: 0, 0.80, 0.85,
    /// 0.90).
    #[serde(default = "default_incident_chances")]
    pub incident_chances: Vec<f64>,

    /// Fame gained in each Status phase (default: 1).
    #[serde(default = "default_fame_per_turn")]
    pub fame_per_turn: i32,

    /// Fame granted on a critical success (default: 1).
    #[serde(default = "default_critical_fame_bonus")]
    pub critical_fame_bonus: i32,

    /// Fame cap (default: 3).
    #[serde(default = "default_max_fame")]
    pub max_fame: i32,

    /// Food per supported army (default: 1).
    #[serde(default = "default_army_upkeep")]
    pub army_food_upkeep: u32,

    /// Gold per supported army (default: 1).
    #[serde(default = "default_army_upkeep")]
    pub army_gold_upkeep: u32,

    /// Unsupported upkeeps an army tolerates before disbanding
    /// (default: 3, 0 disables).
    #[serde(default = "default_unsupported_turn_limit")]
    pub unsupported_turn_limit: u32,

    /// Event check difficulty after an event fires (default: 16).
    #[serde(default = "default_event_dc_base")]
    pub event_dc_base: u32,

    /// Drop in event difficulty after a quiet check (default: 5).
    #[serde(default = "default_event_dc_step")]
    pub event_dc_step: u32,

    /// Lowest event difficulty (default: 6).
    #[serde(default = "default_event_dc_min")]
    pub event_dc_min: u32,

    /// What happens to the remaining settlements on a food shortfall.
    #[serde(default)]
    pub feeding_policy: FeedingPolicy,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            unrest_per_tier: default_unrest_per_tier(),
            max_unrest_tier: default_max_unrest_tier(),
            incident_chances: default_incident_chances(),
            fame_per_turn: default_fame_per_turn(),
            critical_fame_bonus: default_critical_fame_bonus(),
            max_fame: default_max_fame(),
            army_food_upkeep: default_army_upkeep(),
            army_gold_upkeep: default_army_upkeep(),
            unsupported_turn_limit: default_unsupported_turn_limit(),
            event_dc_base: default_event_dc_base(),
            event_dc_step: default_event_dc_step(),
            event_dc_min: default_event_dc_min(),
            feeding_policy: FeedingPolicy::default(),
        }
    }
}

impl RulesConfig {
    /// The subset of rules the economy passes and command effects read.
    pub const fn economy_rules(&self) -> EconomyRules {
        EconomyRules {
            critical_fame_bonus: self.critical_fame_bonus,
            max_fame: self.max_fame,
            army_food_upkeep: self.army_food_upkeep,
            army_gold_upkeep: self.army_gold_upkeep,
            unsupported_turn_limit: self.unsupported_turn_limit,
            feeding_policy: self.feeding_policy,
        }
    }

    /// Check that the rules are internally consistent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::Invalid { reason });

        if self.unrest_per_tier == 0 {
            return invalid("rules.unrest_per_tier must be at least 1".to_owned());
        }
        let expected = usize::try_from(self.max_unrest_tier)
            .ok()
            .and_then(|tier| tier.checked_add(1));
        if expected != Some(self.incident_chances.len()) {
            return invalid(format!(
                "rules.incident_chances needs {} entries (tiers 0..={}), found {}",
                self.max_unrest_tier.saturating_add(1),
                self.max_unrest_tier,
                self.incident_chances.len()
            ));
        }
        if let Some(chance) = self
            .incident_chances
            .iter()
            .find(|c| !(0.0..=1.0).contains(*c))
        {
            return invalid(format!("rules.incident_chances entry {chance} is outside 0..=1"));
        }
        if self.event_dc_min > self.event_dc_base {
            return invalid(format!(
                "rules.event_dc_min ({}) exceeds rules.event_dc_base ({})",
                self.event_dc_min, self.event_dc_base
            ));
        }
        if self.max_fame < 0 {
            return invalid("rules.max_fame cannot be negative".to_owned());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Infrastructure
// ---------------------------------------------------------------------------

/// External service connections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// Dragonfly connection URL. Without one the engine keeps the kingdom
    /// in memory.
    #[serde(default)]
    pub dragonfly_url: Option<String>,

    /// Stored kingdom to resume instead of creating a new one.
    #[serde(default)]
    pub kingdom_id: Option<KingdomId>,
}

impl InfrastructureConfig {
    /// Replace the Dragonfly URL with `DRAGONFLY_URL` when it is set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DRAGONFLY_URL")
            && !url.trim().is_empty()
        {
            self.dragonfly_url = Some(url);
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (`RUST_LOG` overrides it).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Bounds and check settings for an automated campaign.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Turns to play before stopping (0 = unlimited).
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Bonus added to every automated d20 check.
    #[serde(default)]
    pub check_modifier: i32,

    /// Difficulty of automated incident and event checks.
    #[serde(default = "default_check_dc")]
    pub check_dc: i32,

    /// Resolve every check with this grade instead of rolling.
    #[serde(default)]
    pub fixed_grade: Option<OutcomeGrade>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            check_modifier: 0,
            check_dc: default_check_dc(),
            fixed_grade: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_kingdom_name() -> String {
    "Stolen Lands".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_level() -> u32 {
    1
}

const fn default_unrest_per_tier() -> u32 {
    3
}

const fn default_max_unrest_tier() -> u32 {
    3
}

fn default_incident_chances() -> Vec<f64> {
    vec![0.0, 0.80, 0.85, 0.90]
}

const fn default_fame_per_turn() -> i32 {
    1
}

const fn default_critical_fame_bonus() -> i32 {
    1
}

const fn default_max_fame() -> i32 {
    3
}

const fn default_army_upkeep() -> u32 {
    1
}

const fn default_unsupported_turn_limit() -> u32 {
    3
}

const fn default_event_dc_base() -> u32 {
    16
}

const fn default_event_dc_step() -> u32 {
    5
}

const fn default_event_dc_min() -> u32 {
    6
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_max_turns() -> u32 {
    12
}

const fn default_check_dc() -> i32 {
    15
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = KingdomConfig::default();
        assert_eq!(config.kingdom.seed, 42);
        assert_eq!(config.rules.unrest_per_tier, 3);
        assert_eq!(config.rules.incident_chances.len(), 4);
        assert_eq!(config.rules.event_dc_base, 16);
        assert_eq!(config.simulation.max_turns, 12);
        assert!(config.rules.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
kingdom:
  name: "Brevoy March"
  seed: 7
  level: 3
  starting_resources:
    gold: 20
    food: 9

rules:
  unrest_per_tier: 4
  max_unrest_tier: 2
  incident_chances: [0.0, 0.5, 0.75]
  max_fame: 5
  unsupported_turn_limit: 0
  feeding_policy: exhaust_on_shortfall

infrastructure:
  kingdom_id: "01890a5d-ac96-774b-bcce-b302099a8057"

logging:
  level: "debug"
  format: json

simulation:
  max_turns: 3
  check_modifier: 4
  fixed_grade: critical_success
"#;
        let config = KingdomConfig::parse(yaml).unwrap();
        assert_eq!(config.kingdom.name, "Brevoy March");
        assert_eq!(config.kingdom.level, 3);
        assert_eq!(config.kingdom.starting_resources.get(&Resource::Gold), Some(&20));
        assert_eq!(config.rules.max_unrest_tier, 2);
        assert_eq!(config.rules.feeding_policy, FeedingPolicy::ExhaustOnShortfall);
        assert!(config.infrastructure.kingdom_id.is_some());
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.simulation.fixed_grade, Some(OutcomeGrade::CriticalSuccess));

        let economy = config.rules.economy_rules();
        assert_eq!(economy.max_fame, 5);
        assert_eq!(economy.unsupported_turn_limit, 0);
    }

    #[test]
    fn parse_minimal_and_empty_yaml() {
        let config = KingdomConfig::parse("kingdom:\n  seed: 9\n").unwrap();
        assert_eq!(config.kingdom.seed, 9);
        assert_eq!(config.kingdom.name, "Stolen Lands");
        assert_eq!(config.rules, RulesConfig::default());

        assert!(KingdomConfig::parse("").is_ok());
    }

    #[test]
    fn mismatched_incident_table_is_rejected() {
        let yaml = "rules:\n  max_unrest_tier: 4\n";
        match KingdomConfig::parse(yaml) {
            Err(ConfigError::Invalid { reason }) => assert!(reason.contains("incident_chances")),
            other => panic!("Expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn chances_outside_unit_interval_are_rejected() {
        let yaml = "rules:\n  incident_chances: [0.0, 0.8, 1.5, 0.9]\n";
        assert!(matches!(
            KingdomConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        match KingdomConfig::parse("kingdom: [unterminated") {
            Err(ConfigError::Yaml { .. }) => {}
            other => panic!("Expected Yaml, got {other:?}"),
        }
    }
}
