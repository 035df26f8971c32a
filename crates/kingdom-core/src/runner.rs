//! Automated turns.
//!
//! [`run_turn`] walks the kingdom from its current phase to the start of
//! the next turn, running whichever step is still open in each phase.
//! Incident and event grades come from an [`OutcomeSource`], and the
//! targets of their commands from [`pick_targets`]. [`run_campaign`]
//! repeats turns until the configured limit.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::info;

use kingdom_commands::TargetSelector;
use kingdom_db::KingdomStore;
use kingdom_economy::{BuildReport, FeedingReport, IncomeReport, MilitaryReport, ModifierReport};
use kingdom_ledger::LedgerEntry;
use kingdom_types::{FactionId, Kingdom, OutcomeGrade, PendingState, Resource, TurnPhase};

use crate::controller::{Resolution, TurnController, TurnError};
use crate::events::EventCheck;
use crate::outcome::{CheckKind, OutcomeSource};
use crate::phase::PhaseError;
use crate::steps::{
    APPLY_MODIFIERS, CHECK_EVENT, CHECK_INCIDENT, COLLECT_RESOURCES, FEED_SETTLEMENTS, GAIN_FAME,
    PROCESS_BUILD_QUEUE, RESOLVE_EVENT, RESOLVE_INCIDENT, SUPPORT_MILITARY, TAKE_ACTIONS,
};
use crate::unrest::IncidentCheck;

/// Everything that happened in one automated turn.
///
/// Reports are `None` for steps that were authored complete (nothing to
/// do) or had already run before the turn was picked up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnSummary {
    /// Turn number.
    pub turn: u32,
    /// When the runner picked the turn up.
    pub started_at: DateTime<Utc>,
    /// When the turn wrapped to the next Status phase.
    pub finished_at: DateTime<Utc>,
    /// Fame gained in the Status phase.
    pub fame_gained: i32,
    /// Ongoing modifiers.
    pub modifiers: Option<ModifierReport>,
    /// Income.
    pub income: Option<IncomeReport>,
    /// Feeding.
    pub feeding: Option<FeedingReport>,
    /// Military support.
    pub military: Option<MilitaryReport>,
    /// Build queue.
    pub build: Option<BuildReport>,
    /// Incident check.
    pub incident_check: Option<IncidentCheck>,
    /// Incident resolution.
    pub incident: Option<Resolution>,
    /// Event check.
    pub event_check: Option<EventCheck>,
    /// Event resolution.
    pub event: Option<Resolution>,
    /// Resources at the end of the turn.
    pub resources: BTreeMap<Resource, i32>,
}

impl TurnSummary {
    /// An empty summary for `turn`, stamped now.
    pub fn new(turn: u32) -> Self {
        let now = Utc::now();
        Self {
            turn,
            started_at: now,
            finished_at: now,
            fame_gained: 0,
            modifiers: None,
            income: None,
            feeding: None,
            military: None,
            build: None,
            incident_check: None,
            incident: None,
            event_check: None,
            event: None,
            resources: BTreeMap::new(),
        }
    }

    /// Every ledger entry recorded by the turn's economy passes, in pass
    /// order.
    pub fn ledger(&self) -> Vec<&LedgerEntry> {
        let income = self.income.iter().flat_map(|r| &r.ledger);
        let feeding = self.feeding.iter().flat_map(|r| &r.ledger);
        let military = self.military.iter().flat_map(|r| &r.ledger);
        let build = self.build.iter().flat_map(|r| &r.ledger);
        income.chain(feeding).chain(military).chain(build).collect()
    }

    /// Net treasury change per resource across the turn's ledger.
    pub fn net_flow(&self) -> BTreeMap<Resource, i64> {
        let mut flow = BTreeMap::new();
        for entry in self.ledger() {
            let total: &mut i64 = flow.entry(entry.resource).or_insert(0);
            *total = total.saturating_add(entry.signed_quantity());
        }
        flow
    }
}

/// Result of a campaign.
#[derive(Debug)]
pub struct CampaignResult {
    /// Turns completed.
    pub turns_played: u32,
    /// Summary of the last completed turn.
    pub final_summary: Option<TurnSummary>,
    /// The kingdom after the last turn.
    pub kingdom: Kingdom,
}

/// Callback invoked after each turn completes.
pub trait TurnCallback: Send {
    /// Called with the turn's summary and the kingdom as it now stands.
    fn on_turn(&mut self, summary: &TurnSummary, kingdom: &Kingdom);
}

/// A callback that does nothing.
pub struct NoOpCallback;

impl TurnCallback for NoOpCallback {
    fn on_turn(&mut self, _summary: &TurnSummary, _kingdom: &Kingdom) {}
}

/// Targets for an automatically resolved incident or event: a random
/// non-capital settlement, a random kingdom-led army, and a fresh hostile
/// faction.
pub fn pick_targets(kingdom: &Kingdom, rng: &mut impl Rng) -> PendingState {
    let settlements: Vec<_> = kingdom
        .settlements
        .iter()
        .filter(|s| !s.is_capital)
        .map(|s| s.id)
        .collect();
    let armies: Vec<_> = kingdom
        .armies
        .iter()
        .filter(|a| a.is_player_led())
        .map(|a| a.id)
        .collect();

    PendingState {
        army_id: armies.choose(rng).copied(),
        settlement_id: settlements.choose(rng).copied(),
        faction_id: Some(FactionId::new()),
        structure: None,
        hex: None,
    }
}

/// Play from the current phase to the start of the next turn.
///
/// # Errors
///
/// Returns [`TurnError`] if any operation fails. Table commands that fail
/// validation are recorded in the resolution instead.
pub async fn run_turn<S, T, O, R>(
    controller: &TurnController<S, T>,
    source: &mut O,
    rng: &mut R,
) -> Result<TurnSummary, TurnError>
where
    S: KingdomStore,
    T: TargetSelector,
    O: OutcomeSource,
    R: Rng + Send,
{
    let mut summary = TurnSummary::new(controller.kingdom().await?.turn);

    loop {
        controller.start_phase().await?;
        while let Some(step) = next_open_step(&controller.kingdom().await?) {
            run_step(controller, &step, source, rng, &mut summary).await?;
        }
        if controller.advance_phase().await? == TurnPhase::Status {
            break;
        }
    }

    let kingdom = controller.kingdom().await?;
    summary.resources = kingdom.resources;
    summary.finished_at = Utc::now();
    info!(
        turn = summary.turn,
        ledger_entries = summary.ledger().len(),
        incident = summary.incident.as_ref().map_or("none", |r| r.key.as_str()),
        event = summary.event.as_ref().map_or("none", |r| r.key.as_str()),
        "turn complete"
    );
    Ok(summary)
}

fn next_open_step(kingdom: &Kingdom) -> Option<String> {
    kingdom
        .phase_steps
        .iter()
        .find(|s| !s.completed)
        .map(|s| s.name.clone())
}

async fn run_step<S, T, O, R>(
    controller: &TurnController<S, T>,
    step: &str,
    source: &mut O,
    rng: &mut R,
    summary: &mut TurnSummary,
) -> Result<(), TurnError>
where
    S: KingdomStore,
    T: TargetSelector,
    O: OutcomeSource,
    R: Rng + Send,
{
    match step {
        GAIN_FAME => summary.fame_gained = controller.gain_fame().await?.report,
        APPLY_MODIFIERS => summary.modifiers = Some(controller.apply_ongoing_modifiers().await?.report),
        COLLECT_RESOURCES => summary.income = Some(controller.collect_resources().await?.report),
        FEED_SETTLEMENTS => summary.feeding = Some(controller.feed_settlements().await?.report),
        SUPPORT_MILITARY => summary.military = Some(controller.support_military().await?.report),
        PROCESS_BUILD_QUEUE => summary.build = Some(controller.process_build_queue().await?.report),
        CHECK_INCIDENT => summary.incident_check = Some(controller.check_for_incident(rng).await?.report),
        RESOLVE_INCIDENT => {
            let (grade, pending) = grade_and_targets(controller, CheckKind::Incident, source, rng).await?;
            summary.incident = Some(controller.resolve_incident(grade, pending, rng).await?.report);
        }
        TAKE_ACTIONS => controller.take_actions().await?.report,
        CHECK_EVENT => summary.event_check = Some(controller.check_for_event(rng).await?.report),
        RESOLVE_EVENT => {
            let (grade, pending) = grade_and_targets(controller, CheckKind::Event, source, rng).await?;
            summary.event = Some(controller.resolve_event(grade, pending, rng).await?.report);
        }
        other => {
            let phase = controller.kingdom().await?.current_phase;
            return Err(PhaseError::StepMissing {
                step: other.to_owned(),
                phase,
            }
            .into());
        }
    }
    Ok(())
}

async fn grade_and_targets<S, T, O, R>(
    controller: &TurnController<S, T>,
    check: CheckKind,
    source: &mut O,
    rng: &mut R,
) -> Result<(OutcomeGrade, PendingState), TurnError>
where
    S: KingdomStore,
    T: TargetSelector,
    O: OutcomeSource,
    R: Rng + Send,
{
    let kingdom = controller.kingdom().await?;
    let key = check
        .pending_key(&kingdom)
        .ok_or(TurnError::NothingPending(check))?;
    let grade = source.grade(check, key, rng);
    Ok((grade, pick_targets(&kingdom, rng)))
}

/// Run turns until `max_turns` have completed (0 = unlimited).
///
/// # Errors
///
/// Returns [`TurnError`] if a turn fails.
pub async fn run_campaign<S, T, O, R>(
    controller: &TurnController<S, T>,
    source: &mut O,
    rng: &mut R,
    max_turns: u32,
    callback: &mut dyn TurnCallback,
) -> Result<CampaignResult, TurnError>
where
    S: KingdomStore,
    T: TargetSelector,
    O: OutcomeSource,
    R: Rng + Send,
{
    info!(max_turns, "campaign starting");
    let mut turns_played: u32 = 0;
    let mut final_summary = None;

    while max_turns == 0 || turns_played < max_turns {
        let summary = run_turn(controller, source, rng).await?;
        turns_played = turns_played.saturating_add(1);
        let kingdom = controller.kingdom().await?;
        callback.on_turn(&summary, &kingdom);
        final_summary = Some(summary);
    }

    let kingdom = controller.kingdom().await?;
    info!(turns_played, turn = kingdom.turn, "campaign finished");
    Ok(CampaignResult {
        turns_played,
        final_summary,
        kingdom,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kingdom_types::{Army, ArmyType, Controller, HexCoord, Settlement, SettlementTier};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn targets_skip_the_capital_and_foreign_armies() {
        let mut k = Kingdom::new("Test");
        let mut capital = Settlement::new("Capital", SettlementTier::Town, HexCoord::new(0, 0));
        capital.is_capital = true;
        let village = Settlement::new("Village", SettlementTier::Village, HexCoord::new(1, 0));
        let village_id = village.id;
        k.settlements.push(capital);
        k.settlements.push(village);

        let mut rebels = Army::new("Rebels", ArmyType::Infantry, 1);
        rebels.leader = Controller::Faction(FactionId::new());
        let guard = Army::new("Guard", ArmyType::Infantry, 1);
        let guard_id = guard.id;
        k.armies.push(rebels);
        k.armies.push(guard);

        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..10 {
            let pending = pick_targets(&k, &mut rng);
            assert_eq!(pending.settlement_id, Some(village_id));
            assert_eq!(pending.army_id, Some(guard_id));
            assert!(pending.faction_id.is_some());
        }
    }

    #[test]
    fn targets_are_absent_when_nothing_qualifies() {
        let pending = pick_targets(&Kingdom::new("Empty"), &mut SmallRng::seed_from_u64(1));
        assert!(pending.settlement_id.is_none());
        assert!(pending.army_id.is_none());
    }

    #[test]
    fn net_flow_sums_the_ledger() {
        let mut summary = TurnSummary::new(1);
        assert!(summary.ledger().is_empty());
        summary.feeding = Some(FeedingReport::default());
        assert!(summary.net_flow().is_empty());
    }
}
