//! The event check.
//!
//! A d20 at or above the kingdom's running difficulty triggers a random
//! event and resets the difficulty to its base. A quiet check lowers it
//! by the configured step, never below the minimum, so events grow more
//! likely the longer the kingdom goes without one.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::info;

use kingdom_types::Kingdom;
use kingdom_world::Catalog;

use crate::config::RulesConfig;

/// Result of one event check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCheck {
    /// Natural d20.
    pub roll: u32,
    /// Difficulty the roll was made against.
    pub dc: u32,
    /// Whether an event fires.
    pub triggered: bool,
    /// Key of the event, if one fired and the catalog has any.
    pub event: Option<String>,
    /// Difficulty for the next check.
    pub next_dc: u32,
}

/// Difficulty after a check.
pub fn next_event_dc(current: u32, triggered: bool, rules: &RulesConfig) -> u32 {
    if triggered {
        rules.event_dc_base
    } else {
        current
            .saturating_sub(rules.event_dc_step)
            .max(rules.event_dc_min)
    }
}

/// Roll the event check. Does not modify the kingdom.
pub fn check_for_event(
    kingdom: &Kingdom,
    catalog: &Catalog,
    rules: &RulesConfig,
    rng: &mut impl Rng,
) -> EventCheck {
    let dc = kingdom.event_dc;
    let roll = rng.random_range(1..=20u32);
    let triggered = roll >= dc;
    let event = if triggered {
        catalog.events.choose(rng).map(|e| e.key.clone())
    } else {
        None
    };
    let next_dc = next_event_dc(dc, triggered, rules);

    info!(
        turn = kingdom.turn,
        roll,
        dc,
        next_dc,
        event = event.as_deref().unwrap_or("none"),
        "event check"
    );
    EventCheck {
        roll,
        dc,
        triggered,
        event,
        next_dc,
    }
}
