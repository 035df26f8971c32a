//! End-to-end command pipeline tests against the starting kingdom.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use kingdom_commands::{CommandContext, CommandRegistry, Effect, FirstChoiceSelector};
use kingdom_db::{KingdomStore, MemoryStore};
use kingdom_economy::EconomyRules;
use kingdom_types::{
    Amount, Command, Controller, FactionId, ImprisonMode, OutcomeGrade, PendingState, Resource,
};
use kingdom_world::{Catalog, create_starting_kingdom};
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn registry() -> CommandRegistry<FirstChoiceSelector> {
    CommandRegistry::new(Arc::new(Catalog::standard()), EconomyRules::default(), FirstChoiceSelector)
}

#[tokio::test]
async fn seized_hexes_are_contiguous_and_spare_settlements() {
    let kingdom = create_starting_kingdom("Stolen Lands", 1);
    let store = MemoryStore::new(kingdom.clone());
    let faction = FactionId::new();
    let ctx = CommandContext::new(OutcomeGrade::CriticalFailure, kingdom)
        .with_pending(PendingState::default().with_faction(faction));
    let mut rng = SmallRng::seed_from_u64(11);

    let prepared = registry()
        .process(&Command::SeizeTerritory { count: 3 }, &ctx, &mut rng)
        .await
        .unwrap()
        .unwrap();
    let Effect::SeizeHexes { hexes, .. } = &prepared.effect else {
        panic!("Expected SeizeHexes, got {:?}", prepared.effect);
    };
    let hexes = hexes.clone();
    assert!(!hexes.is_empty());
    for coord in &hexes {
        assert!(!ctx.kingdom.has_settlement_at(*coord));
    }
    for (i, coord) in hexes.iter().enumerate().skip(1) {
        assert!(hexes.iter().take(i).any(|prev| prev.is_adjacent(*coord)));
    }

    registry().commit(prepared, &store, &mut rng).await.unwrap();
    let after = store.current().await.unwrap();
    for coord in &hexes {
        assert_eq!(after.hex(*coord).unwrap().controller, Controller::Faction(faction));
    }
}

#[tokio::test]
async fn transferred_settlement_takes_its_prisoners_away() {
    let mut kingdom = create_starting_kingdom("Stolen Lands", 1);
    let village = kingdom.settlements.iter().find(|s| !s.is_capital).unwrap().id;
    kingdom.settlement_mut(village).unwrap().imprisoned_unrest = 1;
    let store = MemoryStore::new(kingdom.clone());
    let ctx = CommandContext::new(OutcomeGrade::CriticalFailure, kingdom).with_pending(
        PendingState::default()
            .with_settlement(village)
            .with_faction(FactionId::new()),
    );
    let mut rng = SmallRng::seed_from_u64(2);

    registry()
        .execute_command(&Command::TransferSettlement, &ctx, &store, &mut rng)
        .await
        .unwrap()
        .unwrap();

    let after = store.current().await.unwrap();
    assert!(after.settlement(village).is_none());
    assert_eq!(after.total_imprisoned(), 0);
    assert_eq!(after.resource(Resource::Unrest), 0);
}

#[tokio::test]
async fn imprisonment_spills_across_prisons() {
    let kingdom = create_starting_kingdom("Stolen Lands", 1);
    let store = MemoryStore::new(kingdom.clone());
    let ctx = CommandContext::new(OutcomeGrade::Success, kingdom);
    let mut rng = SmallRng::seed_from_u64(3);

    // Both starting settlements have stocks (capacity 1 each).
    registry()
        .execute_command(
            &Command::ImprisonUnrest {
                amount: Amount::Fixed(3),
                mode: ImprisonMode::NewUnrest,
            },
            &ctx,
            &store,
            &mut rng,
        )
        .await
        .unwrap();

    let after = store.current().await.unwrap();
    assert_eq!(after.total_imprisoned(), 2);
    assert!(after.settlements.iter().all(|s| s.imprisoned_unrest == 1));
    assert_eq!(after.resource(Resource::Unrest), 1);
}
