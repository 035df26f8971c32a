//! Command dispatch.
//!
//! [`CommandRegistry::process`] maps each [`Command`] variant to its
//! prepare function with one exhaustive match, so adding a variant without
//! a handler is a compile error.

use std::sync::Arc;

use tracing::debug;

use kingdom_db::KingdomStore;
use kingdom_economy::EconomyRules;
use kingdom_types::Command;
use kingdom_world::Catalog;

use crate::context::CommandContext;
use crate::error::CommandError;
use crate::handlers;
use crate::prepared::{CommitOutcome, PreparedCommand};
use crate::selection::TargetSelector;

/// Dispatches commands to handlers and commits their effects.
pub struct CommandRegistry<S> {
    catalog: Arc<Catalog>,
    rules: EconomyRules,
    selector: S,
}

impl<S: TargetSelector> CommandRegistry<S> {
    /// Create a registry over `catalog` and `rules`, asking `selector` for
    /// interactive choices.
    pub const fn new(catalog: Arc<Catalog>, rules: EconomyRules, selector: S) -> Self {
        Self {
            catalog,
            rules,
            selector,
        }
    }

    /// The static tables handlers read.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The economy rules effects are applied under.
    pub const fn rules(&self) -> &EconomyRules {
        &self.rules
    }

    /// Prepare `command` against `ctx`. Returns `None` only when an
    /// interactive selection was cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when the context lacks a required target or
    /// names one the kingdom does not control.
    pub async fn process(
        &self,
        command: &Command,
        ctx: &CommandContext,
        rng: &mut (impl rand::Rng + Send),
    ) -> Result<Option<PreparedCommand>, CommandError> {
        let catalog = self.catalog.as_ref();
        let mut prepared = match command {
            Command::AdjustResource { resource, amount } => {
                handlers::prepare_adjust_resource(*resource, amount)
            }
            Command::ImprisonUnrest { amount, mode } => {
                handlers::prepare_imprison(ctx, catalog, amount, *mode, rng)?
            }
            Command::ReleaseImprisoned { percent, to_unrest } => {
                handlers::prepare_release(ctx, *percent, *to_unrest)
            }
            Command::TransferSettlement => handlers::prepare_transfer_settlement(ctx)?,
            Command::TransferArmy => handlers::prepare_transfer_army(ctx)?,
            Command::SeizeTerritory { count } => handlers::prepare_seize(ctx, *count, rng)?,
            Command::AbandonHexes { count } => {
                match handlers::prepare_abandon(ctx, *count, &self.selector).await? {
                    Some(prepared) => prepared,
                    None => return Ok(None),
                }
            }
            Command::RecruitArmy {
                name,
                army_type,
                level,
            } => handlers::prepare_recruit(ctx, name, *army_type, *level),
            Command::DisbandArmy => handlers::prepare_disband(ctx)?,
            Command::TrainArmy { levels } => handlers::prepare_train(ctx, *levels)?,
            Command::OutfitArmy { slot } => {
                match handlers::prepare_outfit(ctx, *slot, &self.selector).await? {
                    Some(prepared) => prepared,
                    None => return Ok(None),
                }
            }
            Command::DamageStructure { count } => handlers::prepare_damage(ctx, *count, rng),
            Command::RemoveStructure => handlers::prepare_remove_structure(ctx)?,
            Command::GrantStructure { structure } => {
                handlers::prepare_grant_structure(ctx, catalog, structure)?
            }
            Command::AddModifier {
                name,
                resource,
                value,
                duration,
            } => handlers::prepare_add_modifier(name, *resource, *value, *duration),
        };

        if prepared.is_no_op() {
            debug!(command = command.kind(), grade = ctx.grade.label(), "command prepared as no-op");
        }
        prepared.metadata.clone_from(&ctx.metadata);
        Ok(Some(prepared))
    }

    /// Commit a prepared command against `store`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if apply rejects the effect or the store
    /// fails; the stored kingdom is then unchanged.
    pub async fn commit(
        &self,
        prepared: PreparedCommand,
        store: &impl KingdomStore,
        rng: &mut (impl rand::Rng + Send),
    ) -> Result<CommitOutcome, CommandError> {
        prepared.commit(store, &self.catalog, rng).await
    }

    /// Prepare and immediately commit. `Ok(None)` when selection was
    /// cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] from either step.
    pub async fn execute_command(
        &self,
        command: &Command,
        ctx: &CommandContext,
        store: &impl KingdomStore,
        rng: &mut (impl rand::Rng + Send),
    ) -> Result<Option<CommitOutcome>, CommandError> {
        let Some(prepared) = self.process(command, ctx, rng).await? else {
            return Ok(None);
        };
        self.commit(prepared, store, rng).await.map(Some)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kingdom_db::MemoryStore;
    use kingdom_types::{Amount, Kingdom, OutcomeGrade, Resource};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::selection::{FirstChoiceSelector, ScriptedSelector};

    fn registry() -> CommandRegistry<FirstChoiceSelector> {
        CommandRegistry::new(Arc::new(Catalog::standard()), EconomyRules::default(), FirstChoiceSelector)
    }

    #[tokio::test]
    async fn prepare_does_not_touch_the_store() {
        let mut kingdom = Kingdom::new("Test");
        kingdom.set_resource(Resource::Gold, 4);
        let store = MemoryStore::new(kingdom.clone());
        let mut rng = SmallRng::seed_from_u64(5);
        let cmd = Command::AdjustResource {
            resource: Resource::Gold,
            amount: Amount::Fixed(-2),
        };

        let prepared = registry()
            .process(&cmd, &CommandContext::new(OutcomeGrade::Failure, kingdom), &mut rng)
            .await
            .unwrap();

        assert!(prepared.is_some());
        assert_eq!(store.current().await.unwrap().resource(Resource::Gold), 4);
        assert_eq!(store.revision(), 0);
    }

    #[tokio::test]
    async fn execute_commits_once() {
        let mut kingdom = Kingdom::new("Test");
        kingdom.set_resource(Resource::Gold, 4);
        let store = MemoryStore::new(kingdom.clone());
        let mut rng = SmallRng::seed_from_u64(5);
        let cmd = Command::AdjustResource {
            resource: Resource::Gold,
            amount: Amount::from("-(1d1+1)"),
        };

        let outcome = registry()
            .execute_command(&cmd, &CommandContext::new(OutcomeGrade::Failure, kingdom), &store, &mut rng)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.rolled, Some(-2));
        assert!(outcome.log.is_some());
        assert_eq!(store.current().await.unwrap().resource(Resource::Gold), 2);
        assert_eq!(store.revision(), 1);
    }

    #[tokio::test]
    async fn cancelled_selection_yields_none() {
        let mut kingdom = Kingdom::new("Test");
        kingdom
            .armies
            .push(kingdom_types::Army::new("Guard", kingdom_types::ArmyType::Cavalry, 1));
        let store = MemoryStore::new(kingdom.clone());
        let registry = CommandRegistry::new(
            Arc::new(Catalog::standard()),
            EconomyRules::default(),
            ScriptedSelector::new([None]),
        );
        let mut rng = SmallRng::seed_from_u64(5);

        let outcome = registry
            .execute_command(
                &Command::OutfitArmy { slot: None },
                &CommandContext::new(OutcomeGrade::Success, kingdom),
                &store,
                &mut rng,
            )
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert_eq!(store.revision(), 0);
    }

    #[tokio::test]
    async fn failed_guard_leaves_state_untouched() {
        let kingdom = Kingdom::new("Test");
        let army = kingdom_types::Army::new("Guard", kingdom_types::ArmyType::Infantry, 1);
        let id = army.id;
        let mut with_army = kingdom.clone();
        with_army.armies.push(army);
        // The store no longer has the army the context was prepared from.
        let store = MemoryStore::new(kingdom);
        let ctx = CommandContext::new(OutcomeGrade::CriticalFailure, with_army)
            .with_pending(kingdom_types::PendingState::default().with_army(id));
        let mut rng = SmallRng::seed_from_u64(5);

        let result = registry()
            .execute_command(&Command::DisbandArmy, &ctx, &store, &mut rng)
            .await;

        assert!(matches!(result, Err(CommandError::ArmyNotFound(_))));
        assert_eq!(store.revision(), 0);
    }

    #[tokio::test]
    async fn metadata_is_carried_through() {
        let kingdom = Kingdom::new("Test");
        let ctx = CommandContext::new(OutcomeGrade::Success, kingdom).with_metadata("source", "festival");
        let mut rng = SmallRng::seed_from_u64(5);
        let prepared = registry()
            .process(
                &Command::AddModifier {
                    name: "Festival".to_owned(),
                    resource: Resource::Unrest,
                    value: -1,
                    duration: Some(2),
                },
                &ctx,
                &mut rng,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(prepared.metadata.get("source"), Some(&serde_json::json!("festival")));
    }
}
