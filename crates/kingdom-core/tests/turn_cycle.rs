//! Whole-turn tests: the runner drives a kingdom through every phase
//! against an in-memory store.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use kingdom_commands::{CommandRegistry, FirstChoiceSelector};
use kingdom_core::{
    FixedOutcome, RulesConfig, TurnCallback, TurnController, TurnSummary, run_campaign, run_turn,
};
use kingdom_db::MemoryStore;
use kingdom_types::{
    Army, ArmyType, Kingdom, OutcomeGrade, PhaseLifecycle, Resource, TurnPhase,
};
use kingdom_world::{Catalog, create_starting_kingdom};
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn controller(kingdom: Kingdom, rules: RulesConfig) -> TurnController<MemoryStore, FirstChoiceSelector> {
    let registry = CommandRegistry::new(Arc::new(Catalog::standard()), rules.economy_rules(), FirstChoiceSelector);
    TurnController::new(MemoryStore::new(kingdom), registry, rules)
}

#[derive(Default)]
struct Recorder {
    turns: Vec<u32>,
}

impl TurnCallback for Recorder {
    fn on_turn(&mut self, summary: &TurnSummary, kingdom: &Kingdom) {
        assert_eq!(kingdom.turn, summary.turn.saturating_add(1));
        self.turns.push(summary.turn);
    }
}

#[tokio::test]
async fn a_turn_wraps_back_to_status() {
    let ctl = controller(create_starting_kingdom("Stolen Lands", 1), RulesConfig::default());
    let mut source = FixedOutcome(OutcomeGrade::Success);
    let mut rng = SmallRng::seed_from_u64(42);

    let summary = run_turn(&ctl, &mut source, &mut rng).await.expect("turn should complete");
    assert_eq!(summary.turn, 1);
    assert_eq!(summary.fame_gained, 1);
    assert!(summary.feeding.is_some());
    assert!(summary.income.is_some());
    assert!(summary.event_check.is_some());
    assert!(summary.finished_at >= summary.started_at);

    let kingdom = ctl.kingdom().await.unwrap();
    assert_eq!(kingdom.turn, 2);
    assert_eq!(kingdom.current_phase, TurnPhase::Status);
    assert_eq!(kingdom.phase_lifecycle, PhaseLifecycle::NotStarted);
    assert!(kingdom.phase_steps.is_empty());
    assert!(kingdom.pending_incident.is_none());
    assert!(kingdom.pending_event.is_none());
    assert_eq!(summary.resources, kingdom.resources);
}

#[tokio::test]
async fn campaign_stops_at_the_turn_limit() {
    let ctl = controller(create_starting_kingdom("Stolen Lands", 2), RulesConfig::default());
    let mut source = FixedOutcome(OutcomeGrade::Failure);
    let mut rng = SmallRng::seed_from_u64(7);
    let mut recorder = Recorder::default();

    let result = run_campaign(&ctl, &mut source, &mut rng, 3, &mut recorder)
        .await
        .expect("campaign should complete");
    assert_eq!(result.turns_played, 3);
    assert_eq!(recorder.turns, vec![1, 2, 3]);
    assert_eq!(result.kingdom.turn, 4);
    assert_eq!(result.final_summary.map(|s| s.turn), Some(3));
}

#[tokio::test]
async fn restless_kingdoms_resolve_incidents() {
    let rules = RulesConfig {
        incident_chances: vec![0.0, 1.0, 1.0, 1.0],
        ..RulesConfig::default()
    };
    let mut kingdom = create_starting_kingdom("Stolen Lands", 1);
    kingdom.set_resource(Resource::Unrest, 7);
    let ctl = controller(kingdom, rules);
    let mut source = FixedOutcome(OutcomeGrade::CriticalSuccess);
    let mut rng = SmallRng::seed_from_u64(3);

    let summary = run_turn(&ctl, &mut source, &mut rng).await.unwrap();
    let check = summary.incident_check.expect("tier 2 must roll");
    assert!(check.tier >= 2);
    let incident = summary.incident.expect("a certain incident must resolve");
    assert_eq!(incident.grade, OutcomeGrade::CriticalSuccess);
    assert!(Catalog::standard().incident(&incident.key).is_some());
}

#[tokio::test]
async fn unsupported_armies_eventually_disband() {
    let rules = RulesConfig {
        unsupported_turn_limit: 1,
        ..RulesConfig::default()
    };
    let mut kingdom = Kingdom::new("Bankrupt");
    kingdom.armies.push(Army::new("Militia", ArmyType::Infantry, 1));
    let ctl = controller(kingdom, rules);
    let mut source = FixedOutcome(OutcomeGrade::Failure);
    let mut rng = SmallRng::seed_from_u64(5);

    let first = run_turn(&ctl, &mut source, &mut rng).await.unwrap();
    let military = first.military.expect("an army needs support");
    assert!(military.disbanded.is_empty());
    assert!(military.unrest > 0);

    let second = run_turn(&ctl, &mut source, &mut rng).await.unwrap();
    assert_eq!(second.military.map(|m| m.disbanded.len()), Some(1));
    assert!(ctl.kingdom().await.unwrap().armies.is_empty());
}

#[tokio::test]
async fn a_turn_picked_up_mid_phase_finishes_it() {
    let ctl = controller(create_starting_kingdom("Stolen Lands", 1), RulesConfig::default());
    ctl.start_phase().await.unwrap();
    ctl.gain_fame().await.unwrap();

    let mut source = FixedOutcome(OutcomeGrade::Success);
    let summary = run_turn(&ctl, &mut source, &mut SmallRng::seed_from_u64(1))
        .await
        .unwrap();
    assert_eq!(summary.fame_gained, 0);
    assert!(summary.income.is_some());
    assert_eq!(ctl.kingdom().await.unwrap().turn, 2);
}
