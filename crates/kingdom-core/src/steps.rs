//! Per-phase step lists with completion pre-computed from kingdom state.
//!
//! A step whose work is vacuous (nothing to feed, no queue, no possible
//! incident) is authored as already complete, so the list always mirrors
//! what still needs doing.

use kingdom_economy::needs_support;
use kingdom_types::{Kingdom, PhaseStep, Resource, TurnPhase};
use kingdom_world::Catalog;

use crate::config::RulesConfig;
use crate::unrest::unrest_tier;

/// Status: gain the per-turn fame.
pub const GAIN_FAME: &str = "Gain fame";
/// Status: apply ongoing modifiers.
pub const APPLY_MODIFIERS: &str = "Apply ongoing modifiers";
/// Status: collect settlement gold and worksite yields.
pub const COLLECT_RESOURCES: &str = "Collect resources";
/// Upkeep: feed settlements.
pub const FEED_SETTLEMENTS: &str = "Feed settlements";
/// Upkeep: support armies and maintain fortifications.
pub const SUPPORT_MILITARY: &str = "Support military";
/// Upkeep: pay into the build queue.
pub const PROCESS_BUILD_QUEUE: &str = "Process build queue";
/// Unrest: roll for an incident.
pub const CHECK_INCIDENT: &str = "Check for incident";
/// Unrest: resolve the incident.
pub const RESOLVE_INCIDENT: &str = "Resolve incident";
/// Actions: the player's turn.
pub const TAKE_ACTIONS: &str = "Take kingdom actions";
/// Events: roll for an event.
pub const CHECK_EVENT: &str = "Check for event";
/// Events: resolve the event.
pub const RESOLVE_EVENT: &str = "Resolve event";

/// The step list for `phase` given the kingdom's current state.
pub fn phase_steps(phase: TurnPhase, kingdom: &Kingdom, catalog: &Catalog, rules: &RulesConfig) -> Vec<PhaseStep> {
    match phase {
        TurnPhase::Status => vec![
            PhaseStep::pending(GAIN_FAME),
            PhaseStep::with_state(APPLY_MODIFIERS, kingdom.modifiers.is_empty()),
            PhaseStep::pending(COLLECT_RESOURCES),
        ],
        TurnPhase::Upkeep => vec![
            PhaseStep::with_state(FEED_SETTLEMENTS, kingdom.settlements.is_empty()),
            PhaseStep::with_state(SUPPORT_MILITARY, !needs_support(kingdom, catalog)),
            PhaseStep::with_state(PROCESS_BUILD_QUEUE, kingdom.build_queue.is_empty()),
        ],
        TurnPhase::Unrest => {
            let calm = unrest_tier(kingdom.resource(Resource::Unrest), rules) == 0;
            vec![
                PhaseStep::with_state(CHECK_INCIDENT, calm),
                PhaseStep::with_state(RESOLVE_INCIDENT, calm),
            ]
        }
        TurnPhase::Actions => vec![PhaseStep::pending(TAKE_ACTIONS)],
        TurnPhase::Events => vec![PhaseStep::pending(CHECK_EVENT), PhaseStep::pending(RESOLVE_EVENT)],
    }
}
