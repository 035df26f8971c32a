//! Tunable parameters for outcome application and upkeep.
//!
//! The turn controller builds an [`EconomyRules`] from the `rules` section
//! of `kingdom-config.yaml` and passes it to every allocation pass.

use serde::{Deserialize, Serialize};

/// How feeding proceeds once a settlement cannot be fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedingPolicy {
    /// An unfed settlement eats nothing; later settlements are still fed
    /// from whatever remains.
    #[default]
    SkipUnfed,
    /// An unfed settlement eats whatever food remains, so every later
    /// settlement with a food requirement also goes unfed.
    ExhaustOnShortfall,
}

/// Configuration for the economy passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EconomyRules {
    /// Fame granted on a critical success (default: 1).
    pub critical_fame_bonus: i32,

    /// Fame cannot rise above this (default: 3).
    pub max_fame: i32,

    /// Food each supported army eats per upkeep (default: 1).
    pub army_food_upkeep: u32,

    /// Gold each supported army is paid per upkeep (default: 1).
    pub army_gold_upkeep: u32,

    /// Consecutive unsupported upkeeps an army tolerates before it
    /// disbands (default: 3). Zero disables disbanding.
    pub unsupported_turn_limit: u32,

    /// Feeding behavior on shortfall (default: skip unfed).
    pub feeding_policy: FeedingPolicy,
}

impl Default for EconomyRules {
    fn default() -> Self {
        Self {
            critical_fame_bonus: 1,
            max_fame: 3,
            army_food_upkeep: 1,
            army_gold_upkeep: 1,
            unsupported_turn_limit: 3,
            feeding_policy: FeedingPolicy::SkipUnfed,
        }
    }
}
