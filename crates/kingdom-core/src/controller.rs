//! The turn controller: phase-specific operations against the store.
//!
//! Every operation runs inside one transactional update that first checks
//! the phase and claims its step, then does the work, then marks the step
//! complete. A manual operation whose step is already complete fails with
//! [`PhaseError::StepAlreadyCompleted`] instead of running twice.
//!
//! Resolving an incident or event is the exception: its commands go
//! through the [`CommandRegistry`], which may wait on interactive
//! selection, so resolution spans several updates (direct deltas, one
//! commit per command, then the step). A [`ResolutionMark`] on the kingdom
//! records how far it got, so retrying after a store failure neither
//! reapplies the deltas nor reruns the commands that already ran.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kingdom_commands::{
    CommandContext, CommandError, CommandRegistry, CommitOutcome, PreparedCommand, TargetSelector,
};
use kingdom_db::{KingdomStore, StoreError};
use kingdom_economy::{
    BuildReport, EconomyError, FeedingReport, IncomeReport, MilitaryReport, ModifierReport,
    OutcomeReport, apply_modifiers, apply_outcome, cancel_project, collect_income, grant_fame,
    queue_project,
};
use kingdom_types::{
    Command, Kingdom, OutcomeGrade, PendingState, PhaseStep, ProjectId, ResolutionMark, Resource,
    SettlementId, StructureKey, TurnPhase,
};

use crate::config::RulesConfig;
use crate::events::{self, EventCheck};
use crate::outcome::CheckKind;
use crate::phase::{
    PhaseError, advance_phase, complete_phase_step_by_index, initialize_phase_steps,
    is_step_completed_by_index, require_phase, step_index,
};
use crate::steps::{
    APPLY_MODIFIERS, CHECK_EVENT, CHECK_INCIDENT, COLLECT_RESOURCES, FEED_SETTLEMENTS, GAIN_FAME,
    PROCESS_BUILD_QUEUE, RESOLVE_EVENT, RESOLVE_INCIDENT, SUPPORT_MILITARY, TAKE_ACTIONS, phase_steps,
};
use crate::unrest::{self, IncidentCheck};

/// Errors from turn operations.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// A phase or step guard failed.
    #[error("{0}")]
    Phase(#[from] PhaseError),

    /// The store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An economy pass failed.
    #[error("economy error: {0}")]
    Economy(#[from] EconomyError),

    /// A command failed to prepare or commit.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Resolution was requested with nothing rolled.
    #[error("no {0} is awaiting resolution")]
    NothingPending(CheckKind),

    /// The pending key is not in the catalog.
    #[error("unknown {check} {key:?}")]
    UnknownTemplate {
        /// Incident or event.
        check: CheckKind,
        /// The missing key.
        key: String,
    },
}

/// What a step operation produced, and whether its phase is now complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult<T> {
    /// The operation's report.
    pub report: T,
    /// Every step of the phase is complete; the phase may advance.
    pub phase_complete: bool,
}

/// A table command that was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCommand {
    /// The command's `type` tag.
    pub command: String,
    /// Why it was skipped.
    pub reason: String,
}

/// The result of resolving an incident or event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Incident or event.
    pub check: CheckKind,
    /// Catalog key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Grade the outcome was resolved at.
    pub grade: OutcomeGrade,
    /// Narrative line from the table.
    pub message: String,
    /// Direct deltas and fame bonus that landed.
    pub outcome: OutcomeReport,
    /// Commands that committed.
    pub committed: Vec<CommitOutcome>,
    /// Commands that were cancelled or failed validation.
    pub skipped: Vec<SkippedCommand>,
}

/// Fail if the step is complete; otherwise return its index.
fn claim_step(kingdom: &Kingdom, step: &str) -> Result<usize, PhaseError> {
    let index = step_index(kingdom, step)?;
    if is_step_completed_by_index(kingdom, index) {
        return Err(PhaseError::StepAlreadyCompleted { step: step.to_owned() });
    }
    Ok(index)
}

/// Drives a kingdom through its phases against a store.
pub struct TurnController<S, T> {
    store: S,
    registry: CommandRegistry<T>,
    rules: RulesConfig,
}

impl<S: KingdomStore, T: TargetSelector> TurnController<S, T> {
    /// Create a controller. `registry` carries the catalog and the economy
    /// rules; `rules` the turn rules.
    pub const fn new(store: S, registry: CommandRegistry<T>, rules: RulesConfig) -> Self {
        Self { store, registry, rules }
    }

    /// The backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The command registry.
    pub const fn registry(&self) -> &CommandRegistry<T> {
        &self.registry
    }

    /// The turn rules.
    pub const fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// Snapshot of the stored kingdom.
    pub async fn kingdom(&self) -> Result<Kingdom, TurnError> {
        Ok(self.store.current().await?)
    }

    // -----------------------------------------------------------------------
    // Phase lifecycle
    // -----------------------------------------------------------------------

    /// Author and install the current phase's steps. Does nothing to a
    /// phase that has already started. Returns the phase's steps.
    pub async fn start_phase(&self) -> Result<Vec<PhaseStep>, TurnError> {
        let catalog = self.registry.catalog();
        let rules = &self.rules;
        self.store
            .update(|kingdom| {
                let phase = kingdom.current_phase;
                let steps = phase_steps(phase, kingdom, catalog, rules);
                initialize_phase_steps(kingdom, phase, steps);
                Ok::<_, TurnError>(kingdom.phase_steps.clone())
            })
            .await
    }

    /// Advance to the next phase. Returns the new phase.
    pub async fn advance_phase(&self) -> Result<TurnPhase, TurnError> {
        self.store
            .update(|kingdom| Ok::<_, TurnError>(advance_phase(kingdom)?))
            .await
    }

    /// Run `work` as step `step` of `phase` inside one update.
    async fn run_step<R, F>(&self, phase: TurnPhase, step: &'static str, work: F) -> Result<StepResult<R>, TurnError>
    where
        F: FnOnce(&mut Kingdom) -> Result<R, TurnError> + Send,
        R: Send,
    {
        self.store
            .update(move |kingdom| {
                require_phase(kingdom, phase)?;
                let index = claim_step(kingdom, step)?;
                let report = work(kingdom)?;
                let phase_complete = complete_phase_step_by_index(kingdom, index)?;
                Ok(StepResult { report, phase_complete })
            })
            .await
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Gain the per-turn fame, up to the cap. Reports the fame gained.
    pub async fn gain_fame(&self) -> Result<StepResult<i32>, TurnError> {
        let economy = self.registry.rules();
        let amount = self.rules.fame_per_turn;
        self.run_step(TurnPhase::Status, GAIN_FAME, move |kingdom| {
            Ok(grant_fame(kingdom, amount, economy))
        })
        .await
    }

    /// Apply, count down, and expire ongoing modifiers.
    pub async fn apply_ongoing_modifiers(&self) -> Result<StepResult<ModifierReport>, TurnError> {
        self.run_step(TurnPhase::Status, APPLY_MODIFIERS, |kingdom| {
            Ok(apply_modifiers(kingdom))
        })
        .await
    }

    /// Collect settlement gold and worksite yields.
    pub async fn collect_resources(&self) -> Result<StepResult<IncomeReport>, TurnError> {
        let catalog = self.registry.catalog();
        self.run_step(TurnPhase::Status, COLLECT_RESOURCES, move |kingdom| {
            Ok(collect_income(kingdom, catalog)?)
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Upkeep
    // -----------------------------------------------------------------------

    /// Feed settlements in priority order.
    pub async fn feed_settlements(&self) -> Result<StepResult<FeedingReport>, TurnError> {
        let catalog = self.registry.catalog();
        let economy = self.registry.rules();
        self.run_step(TurnPhase::Upkeep, FEED_SETTLEMENTS, move |kingdom| {
            Ok(kingdom_economy::feed_settlements(kingdom, catalog, economy)?)
        })
        .await
    }

    /// Support armies and maintain fortifications.
    pub async fn support_military(&self) -> Result<StepResult<MilitaryReport>, TurnError> {
        let catalog = self.registry.catalog();
        let economy = self.registry.rules();
        self.run_step(TurnPhase::Upkeep, SUPPORT_MILITARY, move |kingdom| {
            Ok(kingdom_economy::support_military(kingdom, catalog, economy)?)
        })
        .await
    }

    /// Pay into the build queue and grant completed structures.
    pub async fn process_build_queue(&self) -> Result<StepResult<BuildReport>, TurnError> {
        self.run_step(TurnPhase::Upkeep, PROCESS_BUILD_QUEUE, |kingdom| {
            Ok(kingdom_economy::process_build_queue(kingdom)?)
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Unrest
    // -----------------------------------------------------------------------

    /// Roll for an incident. When none strikes the resolve step completes
    /// too.
    pub async fn check_for_incident<R: Rng + Send>(&self, rng: &mut R) -> Result<StepResult<IncidentCheck>, TurnError> {
        let catalog = self.registry.catalog();
        let rules = &self.rules;
        self.run_step(TurnPhase::Unrest, CHECK_INCIDENT, move |kingdom| {
            let check = unrest::check_for_incident(kingdom, catalog, rules, rng);
            kingdom.pending_incident.clone_from(&check.incident);
            if check.incident.is_none() {
                let index = step_index(kingdom, RESOLVE_INCIDENT)?;
                complete_phase_step_by_index(kingdom, index)?;
            }
            Ok(check)
        })
        .await
    }

    /// Resolve the pending incident at `grade`, with `pending` as the
    /// targets of its commands.
    pub async fn resolve_incident<R: Rng + Send>(
        &self,
        grade: OutcomeGrade,
        pending: PendingState,
        rng: &mut R,
    ) -> Result<StepResult<Resolution>, TurnError> {
        self.resolve(CheckKind::Incident, grade, pending, rng).await
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Finish the player's actions for the turn.
    pub async fn take_actions(&self) -> Result<StepResult<()>, TurnError> {
        self.run_step(TurnPhase::Actions, TAKE_ACTIONS, |_| Ok(())).await
    }

    /// Queue a structure for construction.
    pub async fn queue_build(&self, structure: StructureKey, settlement_id: SettlementId) -> Result<ProjectId, TurnError> {
        let catalog = self.registry.catalog();
        let id = self
            .store
            .update(move |kingdom| {
                require_phase(kingdom, TurnPhase::Actions)?;
                Ok::<_, TurnError>(queue_project(kingdom, catalog, &structure, settlement_id)?)
            })
            .await?;
        info!(project = %id, "build queued");
        Ok(id)
    }

    /// Cancel a queued project and refund what it had been paid.
    pub async fn cancel_build(&self, project_id: ProjectId) -> Result<BTreeMap<Resource, u32>, TurnError> {
        self.store
            .update(move |kingdom| {
                require_phase(kingdom, TurnPhase::Actions)?;
                Ok::<_, TurnError>(cancel_project(kingdom, project_id)?)
            })
            .await
    }

    /// Prepare `command` against the current kingdom without committing.
    /// `None` when interactive selection was cancelled.
    pub async fn prepare<R: Rng + Send>(
        &self,
        command: &Command,
        grade: OutcomeGrade,
        pending: PendingState,
        rng: &mut R,
    ) -> Result<Option<PreparedCommand>, TurnError> {
        let ctx = CommandContext::new(grade, self.kingdom().await?).with_pending(pending);
        Ok(self.registry.process(command, &ctx, rng).await?)
    }

    /// Commit a command prepared by [`TurnController::prepare`].
    pub async fn commit<R: Rng + Send>(&self, prepared: PreparedCommand, rng: &mut R) -> Result<CommitOutcome, TurnError> {
        Ok(self.registry.commit(prepared, &self.store, rng).await?)
    }

    /// Prepare and immediately commit `command`.
    pub async fn execute<R: Rng + Send>(
        &self,
        command: &Command,
        grade: OutcomeGrade,
        pending: PendingState,
        rng: &mut R,
    ) -> Result<Option<CommitOutcome>, TurnError> {
        let ctx = CommandContext::new(grade, self.kingdom().await?).with_pending(pending);
        Ok(self.registry.execute_command(command, &ctx, &self.store, rng).await?)
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Roll the event check and move the event DC. When nothing fires the
    /// resolve step completes too.
    pub async fn check_for_event<R: Rng + Send>(&self, rng: &mut R) -> Result<StepResult<EventCheck>, TurnError> {
        let catalog = self.registry.catalog();
        let rules = &self.rules;
        self.run_step(TurnPhase::Events, CHECK_EVENT, move |kingdom| {
            let check = events::check_for_event(kingdom, catalog, rules, rng);
            kingdom.event_dc = check.next_dc;
            kingdom.pending_event.clone_from(&check.event);
            if check.event.is_none() {
                let index = step_index(kingdom, RESOLVE_EVENT)?;
                complete_phase_step_by_index(kingdom, index)?;
            }
            Ok(check)
        })
        .await
    }

    /// Resolve the pending event at `grade`.
    pub async fn resolve_event<R: Rng + Send>(
        &self,
        grade: OutcomeGrade,
        pending: PendingState,
        rng: &mut R,
    ) -> Result<StepResult<Resolution>, TurnError> {
        self.resolve(CheckKind::Event, grade, pending, rng).await
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    async fn resolve<R: Rng + Send>(
        &self,
        check: CheckKind,
        grade: OutcomeGrade,
        pending: PendingState,
        rng: &mut R,
    ) -> Result<StepResult<Resolution>, TurnError> {
        let (phase, step) = check.resolve_step();
        let catalog = self.registry.catalog();
        let economy = self.registry.rules();

        let (mut resolution, done) = self
            .store
            .update(|kingdom| {
                require_phase(kingdom, phase)?;
                claim_step(kingdom, step)?;
                let key = check
                    .pending_key(kingdom)
                    .ok_or(TurnError::NothingPending(check))?
                    .to_owned();
                let (name, table) = check
                    .lookup(catalog, &key)
                    .ok_or_else(|| TurnError::UnknownTemplate { check, key: key.clone() })?;
                let mark = match kingdom.resolving.take() {
                    Some(mark) if mark.key == key => {
                        if mark.grade != grade {
                            warn!(check = %check, key = %key, recorded = mark.grade.label(), requested = grade.label(), "resuming at the recorded grade");
                        }
                        mark
                    }
                    _ => {
                        let outcome = apply_outcome(kingdom, grade, &table.for_grade(grade).deltas, economy);
                        ResolutionMark {
                            key: key.clone(),
                            grade,
                            applied: outcome.applied,
                            fame_bonus: outcome.fame_bonus,
                            commands_done: 0,
                        }
                    }
                };
                let resolution = Resolution {
                    check,
                    key,
                    name,
                    grade: mark.grade,
                    message: table.for_grade(mark.grade).message.clone(),
                    outcome: OutcomeReport {
                        applied: mark.applied.clone(),
                        fame_bonus: mark.fame_bonus,
                    },
                    committed: Vec::new(),
                    skipped: Vec::new(),
                };
                let done = usize::try_from(mark.commands_done).unwrap_or(usize::MAX);
                kingdom.resolving = Some(mark);
                Ok::<_, TurnError>((resolution, done))
            })
            .await?;
        let grade = resolution.grade;

        let commands = check
            .lookup(catalog, &resolution.key)
            .map(|(_, table)| table.for_grade(grade).commands.clone())
            .unwrap_or_default();
        for command in commands.iter().skip(done) {
            let ctx = CommandContext::new(grade, self.kingdom().await?)
                .with_pending(pending.clone())
                .with_metadata(check.label(), resolution.key.as_str());
            match self.registry.execute_command(command, &ctx, &self.store, rng).await {
                Ok(Some(outcome)) => resolution.committed.push(outcome),
                Ok(None) => resolution.skipped.push(SkippedCommand {
                    command: command.kind().to_owned(),
                    reason: "selection cancelled".to_owned(),
                }),
                Err(CommandError::Store(err)) => return Err(err.into()),
                Err(err) => {
                    warn!(check = %check, key = %resolution.key, command = command.kind(), error = %err, "command skipped");
                    resolution.skipped.push(SkippedCommand {
                        command: command.kind().to_owned(),
                        reason: err.to_string(),
                    });
                }
            }
            self.store
                .update(|kingdom| {
                    if let Some(mark) = kingdom.resolving.as_mut() {
                        mark.commands_done = mark.commands_done.saturating_add(1);
                    }
                    Ok::<_, StoreError>(())
                })
                .await?;
        }

        let phase_complete = self
            .store
            .update(|kingdom| {
                require_phase(kingdom, phase)?;
                let index = claim_step(kingdom, step)?;
                check.clear_pending(kingdom);
                kingdom.resolving = None;
                Ok::<_, TurnError>(complete_phase_step_by_index(kingdom, index)?)
            })
            .await?;

        info!(
            check = %check,
            key = %resolution.key,
            grade = grade.label(),
            committed = resolution.committed.len(),
            skipped = resolution.skipped.len(),
            "{}",
            resolution.message
        );
        Ok(StepResult {
            report: resolution,
            phase_complete,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use kingdom_commands::FirstChoiceSelector;
    use kingdom_db::MemoryStore;
    use kingdom_types::{Amount, HexCoord, Settlement, SettlementTier};
    use kingdom_world::{Catalog, create_starting_kingdom};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn controller(kingdom: Kingdom) -> TurnController<MemoryStore, FirstChoiceSelector> {
        let rules = RulesConfig::default();
        let registry = CommandRegistry::new(Arc::new(Catalog::standard()), rules.economy_rules(), FirstChoiceSelector);
        TurnController::new(MemoryStore::new(kingdom), registry, rules)
    }

    #[tokio::test]
    async fn status_operations_complete_their_steps() {
        let ctl = controller(create_starting_kingdom("Test", 1));
        let steps = ctl.start_phase().await.unwrap();
        assert_eq!(steps.len(), 3);

        let fame = ctl.gain_fame().await.unwrap();
        assert_eq!(fame.report, 1);
        assert!(!fame.phase_complete);

        let income = ctl.collect_resources().await.unwrap();
        assert!(income.phase_complete);
        assert_eq!(ctl.advance_phase().await.unwrap(), TurnPhase::Upkeep);
    }

    #[tokio::test]
    async fn manual_operations_reject_a_second_completion() {
        let ctl = controller(create_starting_kingdom("Test", 1));
        ctl.start_phase().await.unwrap();
        ctl.gain_fame().await.unwrap();
        let before = ctl.kingdom().await.unwrap();
        match ctl.gain_fame().await {
            Err(TurnError::Phase(PhaseError::StepAlreadyCompleted { step })) => assert_eq!(step, GAIN_FAME),
            other => panic!("Expected StepAlreadyCompleted, got {other:?}"),
        }
        assert_eq!(ctl.kingdom().await.unwrap(), before);
    }

    #[tokio::test]
    async fn operations_outside_their_phase_are_rejected() {
        let ctl = controller(create_starting_kingdom("Test", 1));
        ctl.start_phase().await.unwrap();
        assert!(matches!(
            ctl.feed_settlements().await,
            Err(TurnError::Phase(PhaseError::WrongPhase { expected: TurnPhase::Upkeep, .. }))
        ));
        assert!(matches!(
            ctl.queue_build(StructureKey::from("jail"), SettlementId::new()).await,
            Err(TurnError::Phase(PhaseError::WrongPhase { .. }))
        ));
    }

    #[tokio::test]
    async fn starting_a_phase_twice_keeps_progress() {
        let ctl = controller(create_starting_kingdom("Test", 1));
        ctl.start_phase().await.unwrap();
        ctl.gain_fame().await.unwrap();
        let steps = ctl.start_phase().await.unwrap();
        assert!(steps.first().is_some_and(|s| s.completed));
    }

    #[tokio::test]
    async fn upkeep_feeds_in_priority_order() {
        let mut k = Kingdom::new("Test");
        k.current_phase = TurnPhase::Upkeep;
        let mut capital = Settlement::new("Capital", SettlementTier::Village, HexCoord::new(0, 0));
        capital.is_capital = true;
        k.settlements.push(Settlement::new("Metro", SettlementTier::Metropolis, HexCoord::new(1, 0)));
        k.settlements.push(Settlement::new("City", SettlementTier::City, HexCoord::new(2, 0)));
        k.settlements.push(capital);
        k.set_resource(Resource::Food, 5);
        let ctl = controller(k);
        ctl.start_phase().await.unwrap();

        let fed = ctl.feed_settlements().await.unwrap().report;
        assert_eq!(fed.fed.len(), 2);
        assert_eq!(fed.unfed.len(), 1);
        assert_eq!(fed.unrest, 3);
        let after = ctl.kingdom().await.unwrap();
        assert_eq!(after.resource(Resource::Unrest), 3);
        assert_eq!(after.resource(Resource::Food), 0);
    }

    #[tokio::test]
    async fn quiet_incident_check_completes_resolution() {
        let mut k = Kingdom::new("Test");
        k.current_phase = TurnPhase::Unrest;
        k.set_resource(Resource::Unrest, 1);
        let ctl = controller(k);
        let steps = ctl.start_phase().await.unwrap();
        assert!(steps.iter().all(|s| s.completed));
        assert!(matches!(
            ctl.check_for_incident(&mut SmallRng::seed_from_u64(1)).await,
            Err(TurnError::Phase(PhaseError::StepAlreadyCompleted { .. }))
        ));
        assert_eq!(ctl.advance_phase().await.unwrap(), TurnPhase::Actions);
    }

    #[tokio::test]
    async fn event_resolution_applies_deltas_and_commands() {
        let mut k = create_starting_kingdom("Test", 1);
        k.current_phase = TurnPhase::Events;
        k.event_dc = 1;
        let ctl = controller(k);
        let mut rng = SmallRng::seed_from_u64(11);
        ctl.start_phase().await.unwrap();

        let check = ctl.check_for_event(&mut rng).await.unwrap();
        assert!(check.report.triggered);
        assert!(!check.phase_complete);
        assert_eq!(ctl.kingdom().await.unwrap().event_dc, 16);

        // Force a known event so the assertions do not depend on the pick.
        ctl.store()
            .update(|k| {
                k.pending_event = Some("festival".to_owned());
                Ok::<_, TurnError>(())
            })
            .await
            .unwrap();
        let fame_before = ctl.kingdom().await.unwrap().resource(Resource::Fame);

        let resolved = ctl
            .resolve_event(OutcomeGrade::CriticalSuccess, PendingState::default(), &mut rng)
            .await
            .unwrap();
        assert!(resolved.phase_complete);
        assert_eq!(resolved.report.name, "Festival");
        assert_eq!(resolved.report.committed.len(), 1);

        let after = ctl.kingdom().await.unwrap();
        assert!(after.pending_event.is_none());
        assert_eq!(after.modifiers.len(), 1);
        assert!(after.resource(Resource::Fame) > fame_before);
    }

    /// Delegates to a [`MemoryStore`] but fails one chosen update.
    struct FlakyStore {
        inner: MemoryStore,
        fail_after: AtomicUsize,
    }

    impl FlakyStore {
        fn new(kingdom: Kingdom) -> Self {
            Self {
                inner: MemoryStore::new(kingdom),
                fail_after: AtomicUsize::new(usize::MAX),
            }
        }

        /// Let `updates` more updates through, then fail the next one.
        fn fail_after(&self, updates: usize) {
            self.fail_after.store(updates, Ordering::SeqCst);
        }
    }

    impl KingdomStore for FlakyStore {
        async fn current(&self) -> Result<Kingdom, StoreError> {
            self.inner.current().await
        }

        async fn update<T, E, F>(&self, f: F) -> Result<T, E>
        where
            F: FnOnce(&mut Kingdom) -> Result<T, E> + Send,
            T: Send,
            E: From<StoreError> + Send,
        {
            match self.fail_after.load(Ordering::SeqCst) {
                usize::MAX => {}
                0 => {
                    self.fail_after.store(usize::MAX, Ordering::SeqCst);
                    return Err(StoreError::Config("connection dropped".to_owned()).into());
                }
                left => self.fail_after.store(left.saturating_sub(1), Ordering::SeqCst),
            }
            self.inner.update(f).await
        }
    }

    async fn festival_ready(fail_after: usize) -> TurnController<FlakyStore, FirstChoiceSelector> {
        let mut k = create_starting_kingdom("Test", 1);
        k.current_phase = TurnPhase::Events;
        k.set_resource(Resource::Fame, 0);
        let rules = RulesConfig::default();
        let registry = CommandRegistry::new(Arc::new(Catalog::standard()), rules.economy_rules(), FirstChoiceSelector);
        let ctl = TurnController::new(FlakyStore::new(k), registry, rules);
        ctl.start_phase().await.unwrap();
        ctl.store()
            .update(|k| {
                k.pending_event = Some("festival".to_owned());
                Ok::<_, TurnError>(())
            })
            .await
            .unwrap();
        ctl.store().fail_after(fail_after);
        ctl
    }

    #[tokio::test]
    async fn retried_resolution_applies_deltas_once() {
        // Updates: deltas, command commit, progress, step. Fail the step.
        let ctl = festival_ready(3).await;
        let mut rng = SmallRng::seed_from_u64(6);
        let first = ctl
            .resolve_event(OutcomeGrade::CriticalSuccess, PendingState::default(), &mut rng)
            .await;
        assert!(matches!(first, Err(TurnError::Store(_))));
        let interrupted = ctl.kingdom().await.unwrap();
        assert_eq!(interrupted.resource(Resource::Fame), 2);
        assert_eq!(interrupted.resolving.as_ref().unwrap().commands_done, 1);

        let retried = ctl
            .resolve_event(OutcomeGrade::CriticalSuccess, PendingState::default(), &mut rng)
            .await
            .unwrap();
        assert!(retried.report.committed.is_empty());
        assert_eq!(retried.report.outcome.fame_bonus, 1);
        assert_eq!(retried.report.outcome.net(Resource::Fame), 1);

        let after = ctl.kingdom().await.unwrap();
        assert_eq!(after.resource(Resource::Fame), 2);
        assert_eq!(after.modifiers.len(), 1);
        assert!(after.resolving.is_none());
        assert!(after.pending_event.is_none());
    }

    #[tokio::test]
    async fn retry_reruns_only_the_unfinished_command() {
        // Fail the command commit itself.
        let ctl = festival_ready(1).await;
        let mut rng = SmallRng::seed_from_u64(6);
        assert!(
            ctl.resolve_event(OutcomeGrade::CriticalSuccess, PendingState::default(), &mut rng)
                .await
                .is_err()
        );
        let interrupted = ctl.kingdom().await.unwrap();
        assert_eq!(interrupted.resource(Resource::Fame), 2);
        assert!(interrupted.modifiers.is_empty());

        let retried = ctl
            .resolve_event(OutcomeGrade::CriticalSuccess, PendingState::default(), &mut rng)
            .await
            .unwrap();
        assert_eq!(retried.report.committed.len(), 1);
        let after = ctl.kingdom().await.unwrap();
        assert_eq!(after.resource(Resource::Fame), 2);
        assert_eq!(after.modifiers.len(), 1);
    }

    #[tokio::test]
    async fn resolving_with_nothing_pending_fails() {
        let mut k = Kingdom::new("Test");
        k.current_phase = TurnPhase::Events;
        let ctl = controller(k);
        ctl.start_phase().await.unwrap();
        assert!(matches!(
            ctl.resolve_event(OutcomeGrade::Success, PendingState::default(), &mut SmallRng::seed_from_u64(2))
                .await,
            Err(TurnError::NothingPending(CheckKind::Event))
        ));
    }

    #[tokio::test]
    async fn failed_table_commands_are_skipped() {
        let mut k = create_starting_kingdom("Test", 1);
        k.current_phase = TurnPhase::Unrest;
        k.set_resource(Resource::Unrest, 9);
        let ctl = controller(k);
        ctl.start_phase().await.unwrap();
        ctl.store()
            .update(|k| {
                k.pending_incident = Some("secession_crisis".to_owned());
                let index = k.step_index(CHECK_INCIDENT).unwrap();
                complete_phase_step_by_index(k, index)?;
                Ok::<_, TurnError>(())
            })
            .await
            .unwrap();

        // No pending faction or settlement: the transfer cannot prepare.
        let resolved = ctl
            .resolve_incident(OutcomeGrade::Failure, PendingState::default(), &mut SmallRng::seed_from_u64(4))
            .await
            .unwrap();
        assert!(resolved.report.committed.is_empty());
        assert_eq!(resolved.report.skipped.len(), 1);
        assert!(resolved.phase_complete);
    }

    #[tokio::test]
    async fn builds_are_queued_and_cancelled_during_actions() {
        let mut k = create_starting_kingdom("Test", 1);
        k.current_phase = TurnPhase::Actions;
        let capital = k.settlements.iter().find(|s| s.is_capital).map(|s| s.id).unwrap();
        let ctl = controller(k);
        ctl.start_phase().await.unwrap();

        let id = ctl.queue_build(StructureKey::from("jail"), capital).await.unwrap();
        assert_eq!(ctl.kingdom().await.unwrap().build_queue.len(), 1);
        let refund = ctl.cancel_build(id).await.unwrap();
        assert!(refund.is_empty());
        assert!(ctl.kingdom().await.unwrap().build_queue.is_empty());

        let done = ctl.take_actions().await.unwrap();
        assert!(done.phase_complete);
    }

    #[tokio::test]
    async fn ad_hoc_commands_commit_through_the_registry() {
        let ctl = controller(create_starting_kingdom("Test", 1));
        let gold = ctl.kingdom().await.unwrap().resource(Resource::Gold);
        let command = Command::AdjustResource {
            resource: Resource::Gold,
            amount: Amount::Fixed(3),
        };
        let mut rng = SmallRng::seed_from_u64(8);
        let prepared = ctl
            .prepare(&command, OutcomeGrade::Success, PendingState::default(), &mut rng)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctl.kingdom().await.unwrap().resource(Resource::Gold), gold);
        ctl.commit(prepared, &mut rng).await.unwrap();
        assert_eq!(ctl.kingdom().await.unwrap().resource(Resource::Gold), gold.saturating_add(3));
    }
}
