//! Prepare functions, one per command variant.
//!
//! Each function reads the context's kingdom snapshot and pending targets,
//! chooses targets, fixes quantities, and builds the preview. None of them
//! mutate anything. Validation failures are errors; situations where the
//! command simply has nothing to act on return a no-op prepared command
//! with an informational badge.

use rand::seq::SliceRandom;
use tracing::debug;

use kingdom_economy::resolve_amount;
use kingdom_types::{
    ActiveModifier, Amount, Army, ArmyType, EquipmentSlot, FactionId, ImprisonMode, Resource,
    Settlement, StructureKey,
};
use kingdom_world::{
    Catalog, allocate_imprisonment, seizable_hexes, select_contiguous, total_allocated,
};

use crate::context::CommandContext;
use crate::effect::{Effect, StructureTarget, Withdrawal, settlement_controlled};
use crate::error::CommandError;
use crate::prepared::{PreparedCommand, PreviewBadge};
use crate::selection::{SelectionRequest, TargetSelector};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn pending_settlement<'a>(ctx: &'a CommandContext) -> Result<&'a Settlement, CommandError> {
    let id = ctx
        .pending
        .settlement_id
        .ok_or(CommandError::MissingTarget("settlement"))?;
    ctx.kingdom
        .settlement(id)
        .ok_or(CommandError::SettlementNotFound(id))
}

fn pending_army<'a>(ctx: &'a CommandContext) -> Result<&'a Army, CommandError> {
    let id = ctx.pending.army_id.ok_or(CommandError::MissingTarget("army"))?;
    ctx.kingdom.army(id).ok_or(CommandError::ArmyNotFound(id))
}

fn pending_faction(ctx: &CommandContext) -> Result<FactionId, CommandError> {
    ctx.pending.faction_id.ok_or(CommandError::MissingTarget("faction"))
}

fn signed(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Prepare a resource change. Formulas are shown now and rolled at commit.
pub fn prepare_adjust_resource(resource: Resource, amount: &Amount) -> PreparedCommand {
    let kind = "adjust_resource";
    let badge = match amount {
        Amount::Fixed(0) => return PreparedCommand::no_op(kind, format!("No change to {}", resource.label())),
        Amount::Fixed(value) => {
            PreviewBadge::effect(format!("{value:+} {}", resource.label())).with_value(*value)
        }
        Amount::Formula(formula) => {
            PreviewBadge::effect(format!("{formula} {}", resource.label())).with_formula(formula.as_str())
        }
    };
    PreparedCommand::new(
        kind,
        Effect::AdjustResource {
            resource,
            amount: amount.clone(),
        },
        badge,
    )
}

// ---------------------------------------------------------------------------
// Prisons
// ---------------------------------------------------------------------------

/// Prepare imprisonment. The unrest goes to the pending settlement when
/// one is named; otherwise it fills the prison with the most free room and
/// spills into the next until it is all placed or every prison is full.
/// The quantity is rolled now so the preview can show the overflow.
///
/// # Errors
///
/// Returns [`CommandError::SettlementNotFound`] if a pending settlement is
/// named but missing.
pub fn prepare_imprison(
    ctx: &CommandContext,
    catalog: &Catalog,
    amount: &Amount,
    mode: ImprisonMode,
    rng: &mut impl rand::Rng,
) -> Result<PreparedCommand, CommandError> {
    let kind = "imprison_unrest";
    let rolled = u32::try_from(resolve_amount(amount, rng)).unwrap_or(0);
    let requested = match mode {
        ImprisonMode::NewUnrest => rolled,
        ImprisonMode::ExistingUnrest => {
            rolled.min(u32::try_from(ctx.kingdom.resource(Resource::Unrest)).unwrap_or(0))
        }
    };
    if requested == 0 {
        return Ok(PreparedCommand::no_op(kind, "No unrest to imprison"));
    }

    let allocations = if ctx.pending.settlement_id.is_some() {
        allocate_imprisonment([pending_settlement(ctx)?], catalog, requested)
    } else {
        allocate_imprisonment(&ctx.kingdom.settlements, catalog, requested)
    };
    let imprisoned = total_allocated(&allocations);
    let overflow = requested.saturating_sub(imprisoned);

    if imprisoned == 0 && mode == ImprisonMode::ExistingUnrest {
        return Ok(PreparedCommand::no_op(kind, "No prison has room"));
    }

    let placed: Vec<String> = allocations
        .iter()
        .filter_map(|a| ctx.kingdom.settlement(a.settlement_id).map(|s| format!("{} {}", s.name, a.amount)))
        .collect();
    let first = if imprisoned > 0 {
        PreviewBadge::effect(format!("Imprison {imprisoned} unrest ({})", placed.join(", "))).with_value(signed(imprisoned))
    } else {
        PreviewBadge::effect(format!("+{overflow} Unrest")).with_value(signed(overflow))
    };
    let effect = Effect::Imprison {
        allocations,
        amount: requested,
        mode,
    };
    let mut prepared = PreparedCommand::new(kind, effect, first);
    if overflow > 0 && imprisoned > 0 {
        let text = match mode {
            ImprisonMode::NewUnrest => format!("+{overflow} Unrest (no prison room)"),
            ImprisonMode::ExistingUnrest => format!("{overflow} unrest stays free (no prison room)"),
        };
        prepared = prepared.with_badge(PreviewBadge::overflow(text).with_value(signed(overflow)));
    }
    if let Amount::Formula(formula) = amount
        && let Some(badge) = prepared.badges.first_mut()
    {
        badge.formula = Some(formula.clone());
    }
    Ok(prepared)
}

/// Split a release of `percent` of all imprisoned unrest across
/// settlements. The total is `floor(total * percent / 100)`; each
/// settlement gives `ceil` of its proportional share, stopping once the
/// total is reached.
pub fn release_withdrawals(settlements: &[Settlement], percent: u32) -> Vec<Withdrawal> {
    let total: u64 = settlements.iter().map(|s| u64::from(s.imprisoned_unrest)).sum();
    if total == 0 {
        return Vec::new();
    }
    let target = total
        .saturating_mul(u64::from(percent.min(100)))
        .checked_div(100)
        .unwrap_or(0);

    let mut remaining = target;
    let mut withdrawals = Vec::new();
    for settlement in settlements {
        if remaining == 0 {
            break;
        }
        let held = u64::from(settlement.imprisoned_unrest);
        let share = held
            .saturating_mul(target)
            .div_ceil(total)
            .min(remaining)
            .min(held);
        if share > 0 {
            remaining = remaining.saturating_sub(share);
            withdrawals.push(Withdrawal {
                settlement_id: settlement.id,
                amount: u32::try_from(share).unwrap_or(u32::MAX),
            });
        }
    }
    withdrawals
}

/// Prepare a proportional release.
pub fn prepare_release(ctx: &CommandContext, percent: u32, to_unrest: bool) -> PreparedCommand {
    let kind = "release_imprisoned";
    let withdrawals = release_withdrawals(&ctx.kingdom.settlements, percent);
    let total: u32 = withdrawals.iter().map(|w| w.amount).sum();
    if total == 0 {
        return PreparedCommand::no_op(kind, "No imprisoned unrest to release");
    }
    let badge = if to_unrest {
        PreviewBadge::effect(format!("Release {total} imprisoned unrest (+{total} Unrest)"))
    } else {
        PreviewBadge::effect(format!("Release {total} imprisoned unrest"))
    };
    PreparedCommand::new(
        kind,
        Effect::Release {
            withdrawals,
            to_unrest,
        },
        badge.with_value(signed(total)),
    )
}

// ---------------------------------------------------------------------------
// Transfers and territory
// ---------------------------------------------------------------------------

/// Prepare handing the pending settlement to the pending faction.
///
/// # Errors
///
/// Returns [`CommandError`] if either target is missing or the settlement
/// is not under the kingdom's control.
pub fn prepare_transfer_settlement(ctx: &CommandContext) -> Result<PreparedCommand, CommandError> {
    let settlement = pending_settlement(ctx)?;
    let faction_id = pending_faction(ctx)?;
    if !settlement_controlled(&ctx.kingdom, settlement) {
        return Err(CommandError::NotControlled(settlement.name.clone()));
    }
    let mut prepared = PreparedCommand::new(
        "transfer_settlement",
        Effect::TransferSettlement {
            settlement_id: settlement.id,
            faction_id,
        },
        PreviewBadge::effect(format!("{} defects to a rival faction", settlement.name)),
    );
    if settlement.imprisoned_unrest > 0 {
        prepared = prepared.with_badge(PreviewBadge::info(format!(
            "{} imprisoned unrest is lost with it",
            settlement.imprisoned_unrest
        )));
    }
    Ok(prepared)
}

/// Prepare handing the pending army to the pending faction.
///
/// # Errors
///
/// Returns [`CommandError`] if either target is missing or the army is not
/// led by the kingdom.
pub fn prepare_transfer_army(ctx: &CommandContext) -> Result<PreparedCommand, CommandError> {
    let army = pending_army(ctx)?;
    let faction_id = pending_faction(ctx)?;
    if !army.is_player_led() {
        return Err(CommandError::NotControlled(army.name.clone()));
    }
    Ok(PreparedCommand::new(
        "transfer_army",
        Effect::TransferArmy {
            army_id: army.id,
            faction_id,
        },
        PreviewBadge::effect(format!("{} defects to a rival faction", army.name)),
    ))
}

/// Prepare a contiguous seizure by the pending faction.
///
/// # Errors
///
/// Returns [`CommandError::MissingTarget`] without a pending faction.
pub fn prepare_seize(
    ctx: &CommandContext,
    count: u32,
    rng: &mut impl rand::Rng,
) -> Result<PreparedCommand, CommandError> {
    let kind = "seize_territory";
    let faction_id = pending_faction(ctx)?;
    let hexes = select_contiguous(&ctx.kingdom, count, rng);
    if hexes.is_empty() {
        return Ok(PreparedCommand::no_op(kind, "No territory can be seized"));
    }
    let lost = u32::try_from(hexes.len()).unwrap_or(u32::MAX);
    Ok(PreparedCommand::new(
        kind,
        Effect::SeizeHexes { hexes, faction_id },
        PreviewBadge::effect(format!("Lose {lost} hexes to a rival faction")).with_value(signed(lost).saturating_neg()),
    ))
}

/// Prepare abandoning hexes the player picks. `Ok(None)` on cancellation.
///
/// # Errors
///
/// Returns [`CommandError::InvalidSelection`] for a malformed answer.
pub async fn prepare_abandon(
    ctx: &CommandContext,
    count: u32,
    selector: &impl TargetSelector,
) -> Result<Option<PreparedCommand>, CommandError> {
    let kind = "abandon_hexes";
    let eligible = seizable_hexes(&ctx.kingdom);
    if eligible.is_empty() || count == 0 {
        return Ok(Some(PreparedCommand::no_op(kind, "No hexes can be abandoned")));
    }
    let request = SelectionRequest {
        prompt: format!("Choose up to {count} hexes to abandon"),
        options: eligible.iter().map(ToString::to_string).collect(),
        count: usize::try_from(count).unwrap_or(usize::MAX).min(eligible.len()),
    };
    let Some(answer) = selector.choose(&request).await else {
        debug!(command = kind, "selection cancelled");
        return Ok(None);
    };
    let hexes: Vec<_> = request
        .validate(answer)?
        .into_iter()
        .filter_map(|i| eligible.get(i).copied())
        .collect();
    let released = u32::try_from(hexes.len()).unwrap_or(u32::MAX);
    Ok(Some(PreparedCommand::new(
        kind,
        Effect::AbandonHexes { hexes },
        PreviewBadge::effect(format!("Abandon {released} hexes")).with_value(signed(released).saturating_neg()),
    )))
}

// ---------------------------------------------------------------------------
// Armies
// ---------------------------------------------------------------------------

/// Prepare recruiting an army supported by the capital. The level defaults
/// to, and is capped at, the kingdom level.
pub fn prepare_recruit(ctx: &CommandContext, name: &str, army_type: ArmyType, level: Option<u32>) -> PreparedCommand {
    let kingdom_level = ctx.kingdom.level.max(1);
    let level = level.unwrap_or(kingdom_level).clamp(1, kingdom_level);
    let mut army = Army::new(name, army_type, level);
    army.supported_by = ctx.kingdom.settlements.iter().find(|s| s.is_capital).map(|s| s.id);
    let badge = PreviewBadge::effect(format!("Recruit {name} (level {level})"));
    PreparedCommand::new("recruit_army", Effect::RecruitArmy { army }, badge)
}

/// Prepare disbanding the pending army.
///
/// # Errors
///
/// Returns [`CommandError`] if no army is pending or it does not exist.
pub fn prepare_disband(ctx: &CommandContext) -> Result<PreparedCommand, CommandError> {
    let army = pending_army(ctx)?;
    Ok(PreparedCommand::new(
        "disband_army",
        Effect::DisbandArmy { army_id: army.id },
        PreviewBadge::effect(format!("Disband {}", army.name)),
    ))
}

/// Prepare training the pending army, capped at the kingdom level.
///
/// # Errors
///
/// Returns [`CommandError`] if no army is pending or it does not exist.
pub fn prepare_train(ctx: &CommandContext, levels: u32) -> Result<PreparedCommand, CommandError> {
    let kind = "train_army";
    let army = pending_army(ctx)?;
    let level = army.level.saturating_add(levels).min(ctx.kingdom.level);
    if level <= army.level {
        return Ok(PreparedCommand::no_op(
            kind,
            format!("{} cannot train past the kingdom level", army.name),
        ));
    }
    let gained = level.saturating_sub(army.level);
    Ok(PreparedCommand::new(
        kind,
        Effect::TrainArmy {
            army_id: army.id,
            level,
        },
        PreviewBadge::effect(format!("{} trains to level {level}", army.name)).with_value(signed(gained)),
    ))
}

/// Prepare outfitting an army. Without a pending army the player picks one
/// of the kingdom's armies that still lacks equipment; without a slot the
/// player picks one of the army's empty slots. `Ok(None)` on cancellation.
///
/// # Errors
///
/// Returns [`CommandError`] for a pending army that does not exist or a
/// malformed selection.
pub async fn prepare_outfit(
    ctx: &CommandContext,
    slot: Option<EquipmentSlot>,
    selector: &impl TargetSelector,
) -> Result<Option<PreparedCommand>, CommandError> {
    let kind = "outfit_army";

    let army = if ctx.pending.army_id.is_some() {
        pending_army(ctx)?
    } else {
        let candidates: Vec<&Army> = ctx
            .kingdom
            .armies
            .iter()
            .filter(|a| a.is_player_led())
            .filter(|a| slot.map_or(!a.equipment.missing().is_empty(), |s| !a.equipment.has(s)))
            .collect();
        match candidates.as_slice() {
            [] => return Ok(Some(PreparedCommand::no_op(kind, "No army can be outfitted"))),
            [only] => *only,
            _ => {
                let request = SelectionRequest {
                    prompt: "Choose an army to outfit".to_owned(),
                    options: candidates.iter().map(|a| a.name.clone()).collect(),
                    count: 1,
                };
                let Some(answer) = selector.choose(&request).await else {
                    debug!(command = kind, "selection cancelled");
                    return Ok(None);
                };
                let index = request.validate(answer)?.first().copied().unwrap_or_default();
                candidates
                    .get(index)
                    .copied()
                    .ok_or_else(|| CommandError::InvalidSelection(format!("index {index} out of range")))?
            }
        }
    };

    let missing = army.equipment.missing();
    let slot = match slot {
        Some(s) if army.equipment.has(s) => {
            return Ok(Some(PreparedCommand::no_op(
                kind,
                format!("{} already has {}", army.name, s.label()),
            )));
        }
        Some(s) => s,
        None => match missing.as_slice() {
            [] => {
                return Ok(Some(PreparedCommand::no_op(
                    kind,
                    format!("{} is fully equipped", army.name),
                )));
            }
            [only] => *only,
            _ => {
                let request = SelectionRequest {
                    prompt: format!("Choose equipment for {}", army.name),
                    options: missing.iter().map(|s| s.label().to_owned()).collect(),
                    count: 1,
                };
                let Some(answer) = selector.choose(&request).await else {
                    debug!(command = kind, "selection cancelled");
                    return Ok(None);
                };
                let index = request.validate(answer)?.first().copied().unwrap_or_default();
                missing
                    .get(index)
                    .copied()
                    .ok_or_else(|| CommandError::InvalidSelection(format!("index {index} out of range")))?
            }
        },
    };

    Ok(Some(PreparedCommand::new(
        kind,
        Effect::OutfitArmy {
            army_id: army.id,
            slot,
        },
        PreviewBadge::effect(format!("{} gains {}", army.name, slot.label())),
    )))
}

// ---------------------------------------------------------------------------
// Structures
// ---------------------------------------------------------------------------

/// Prepare damaging up to `count` random undamaged structures.
pub fn prepare_damage(ctx: &CommandContext, count: u32, rng: &mut impl rand::Rng) -> PreparedCommand {
    let kind = "damage_structure";
    let mut candidates: Vec<(&Settlement, StructureTarget)> = ctx
        .kingdom
        .settlements
        .iter()
        .flat_map(|s| {
            s.structures.iter().filter(|b| !b.damaged).map(move |b| {
                (
                    s,
                    StructureTarget {
                        settlement_id: s.id,
                        structure: b.key.clone(),
                    },
                )
            })
        })
        .collect();
    if candidates.is_empty() || count == 0 {
        return PreparedCommand::no_op(kind, "No structures to damage");
    }
    candidates.shuffle(rng);
    candidates.truncate(usize::try_from(count).unwrap_or(usize::MAX));

    let names: Vec<String> = candidates
        .iter()
        .map(|(s, t)| format!("{} in {}", t.structure, s.name))
        .collect();
    let hit = u32::try_from(candidates.len()).unwrap_or(u32::MAX);
    let targets = candidates.into_iter().map(|(_, t)| t).collect();
    PreparedCommand::new(
        kind,
        Effect::DamageStructures { targets },
        PreviewBadge::effect(format!("Damage {}", names.join(", "))).with_value(signed(hit)),
    )
}

/// Prepare removing the pending structure from the pending settlement.
///
/// # Errors
///
/// Returns [`CommandError`] if a target is missing or the settlement does
/// not have the structure.
pub fn prepare_remove_structure(ctx: &CommandContext) -> Result<PreparedCommand, CommandError> {
    let settlement = pending_settlement(ctx)?;
    let structure = ctx
        .pending
        .structure
        .clone()
        .ok_or(CommandError::MissingTarget("structure"))?;
    if !settlement.has_structure(&structure) {
        return Err(CommandError::StructureMissing {
            structure,
            settlement: settlement.id,
        });
    }
    let badge = PreviewBadge::effect(format!("Remove {structure} from {}", settlement.name));
    Ok(PreparedCommand::new(
        "remove_structure",
        Effect::RemoveStructure {
            target: StructureTarget {
                settlement_id: settlement.id,
                structure,
            },
        },
        badge,
    ))
}

/// Prepare granting `structure` to the pending settlement, or to the
/// capital when none is pending.
///
/// # Errors
///
/// Returns [`CommandError`] for an unknown structure, a missing pending
/// settlement, or a kingdom without a capital.
pub fn prepare_grant_structure(
    ctx: &CommandContext,
    catalog: &Catalog,
    structure: &StructureKey,
) -> Result<PreparedCommand, CommandError> {
    let kind = "grant_structure";
    let blueprint = catalog.structure(structure)?;
    let settlement = if ctx.pending.settlement_id.is_some() {
        pending_settlement(ctx)?
    } else {
        ctx.kingdom
            .settlements
            .iter()
            .find(|s| s.is_capital)
            .ok_or(CommandError::MissingTarget("settlement"))?
    };
    if settlement
        .structures
        .iter()
        .any(|b| &b.key == structure && !b.damaged)
    {
        return Ok(PreparedCommand::no_op(
            kind,
            format!("{} already has a {}", settlement.name, blueprint.name),
        ));
    }
    Ok(PreparedCommand::new(
        kind,
        Effect::GrantStructure {
            target: StructureTarget {
                settlement_id: settlement.id,
                structure: structure.clone(),
            },
        },
        PreviewBadge::effect(format!("Gain {} in {}", blueprint.name, settlement.name)),
    ))
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// Prepare attaching an ongoing modifier.
pub fn prepare_add_modifier(name: &str, resource: Resource, value: i32, duration: Option<u32>) -> PreparedCommand {
    let kind = "add_modifier";
    if value == 0 || duration == Some(0) {
        return PreparedCommand::no_op(kind, format!("{name} has no effect"));
    }
    let span = duration.map_or_else(|| "permanently".to_owned(), |turns| format!("for {turns} turns"));
    PreparedCommand::new(
        kind,
        Effect::AddModifier {
            modifier: ActiveModifier::new(name, resource, value, duration),
        },
        PreviewBadge::effect(format!("{name}: {value:+} {} per turn {span}", resource.label())).with_value(value),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kingdom_types::{
        BuiltStructure, Controller, Hex, HexCoord, Kingdom, OutcomeGrade, PendingState, SettlementTier,
    };
    use kingdom_world::PrisonAllocation;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::prepared::BadgeKind;
    use crate::selection::{FirstChoiceSelector, ScriptedSelector};

    fn settlement_with(name: &str, prisons: &[&str], imprisoned: u32) -> Settlement {
        let mut s = Settlement::new(name, SettlementTier::Town, HexCoord::default());
        for key in prisons {
            s.structures.push(BuiltStructure {
                key: StructureKey::from(*key),
                damaged: false,
            });
        }
        s.imprisoned_unrest = imprisoned;
        s
    }

    fn ctx(kingdom: Kingdom) -> CommandContext {
        CommandContext::new(OutcomeGrade::Failure, kingdom)
    }

    #[test]
    fn imprison_fills_the_roomiest_prison_and_reports_overflow() {
        let mut k = Kingdom::new("Test");
        k.settlements = vec![
            settlement_with("Hamlet", &["stocks"], 0),
            settlement_with("Town", &["jail"], 0),
        ];
        let hamlet = k.settlements.first().unwrap().id;
        let town = k.settlements.get(1).unwrap().id;
        let mut rng = SmallRng::seed_from_u64(1);

        let prepared = prepare_imprison(&ctx(k), &Catalog::standard(), &Amount::Fixed(5), ImprisonMode::NewUnrest, &mut rng)
            .unwrap();

        assert_eq!(
            prepared.effect,
            Effect::Imprison {
                allocations: vec![
                    PrisonAllocation { settlement_id: town, amount: 2 },
                    PrisonAllocation { settlement_id: hamlet, amount: 1 },
                ],
                amount: 5,
                mode: ImprisonMode::NewUnrest
            }
        );
        assert_eq!(prepared.badges.first().unwrap().value, Some(3));
        assert_eq!(prepared.badges.len(), 2);
        let overflow = prepared.badges.get(1).unwrap();
        assert_eq!(overflow.kind, BadgeKind::Overflow);
        assert_eq!(overflow.value, Some(2));
    }

    #[test]
    fn a_named_settlement_takes_the_whole_batch() {
        let mut k = Kingdom::new("Test");
        k.settlements = vec![
            settlement_with("Hamlet", &["stocks"], 0),
            settlement_with("Town", &["jail"], 0),
        ];
        let hamlet = k.settlements.first().unwrap().id;
        let ctx = ctx(k).with_pending(PendingState {
            settlement_id: Some(hamlet),
            ..PendingState::default()
        });
        let prepared = prepare_imprison(&ctx, &Catalog::standard(), &Amount::Fixed(3), ImprisonMode::NewUnrest, &mut SmallRng::seed_from_u64(1))
            .unwrap();
        match prepared.effect {
            Effect::Imprison { allocations, .. } => {
                assert_eq!(allocations, vec![PrisonAllocation { settlement_id: hamlet, amount: 1 }]);
            }
            other => panic!("Expected Imprison, got {other:?}"),
        }
    }

    #[test]
    fn imprison_without_room_becomes_plain_unrest() {
        let k = Kingdom::new("Test");
        let mut rng = SmallRng::seed_from_u64(1);
        let prepared = prepare_imprison(&ctx(k), &Catalog::standard(), &Amount::Fixed(2), ImprisonMode::NewUnrest, &mut rng)
            .unwrap();
        assert_eq!(prepared.badges.len(), 1);
        assert_eq!(prepared.badges.first().unwrap().value, Some(2));
    }

    #[test]
    fn release_floors_total_and_ceils_shares() {
        let settlements = vec![
            settlement_with("A", &[], 3),
            settlement_with("B", &[], 1),
        ];
        let withdrawals = release_withdrawals(&settlements, 50);
        let amounts: Vec<u32> = withdrawals.iter().map(|w| w.amount).collect();
        assert_eq!(amounts, vec![2]);

        let settlements = vec![
            settlement_with("A", &[], 1),
            settlement_with("B", &[], 1),
            settlement_with("C", &[], 1),
        ];
        let total: u32 = release_withdrawals(&settlements, 50).iter().map(|w| w.amount).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn release_never_exceeds_holdings() {
        let settlements = vec![settlement_with("A", &[], 2), settlement_with("B", &[], 5)];
        let withdrawals = release_withdrawals(&settlements, 100);
        let amounts: Vec<u32> = withdrawals.iter().map(|w| w.amount).collect();
        assert_eq!(amounts, vec![2, 5]);
    }

    #[test]
    fn transfer_requires_targets_and_control() {
        let mut k = Kingdom::new("Test");
        let s = settlement_with("Town", &[], 2);
        let id = s.id;
        k.settlements.push(s);
        k.hexes.push(Hex::new(HexCoord::default(), Controller::Kingdom));

        let no_faction = ctx(k.clone()).with_pending(PendingState::default().with_settlement(id));
        assert!(matches!(
            prepare_transfer_settlement(&no_faction),
            Err(CommandError::MissingTarget("faction"))
        ));

        let pending = PendingState::default()
            .with_settlement(id)
            .with_faction(FactionId::new());
        let prepared = prepare_transfer_settlement(&ctx(k.clone()).with_pending(pending.clone())).unwrap();
        assert_eq!(prepared.badges.len(), 2);

        if let Some(hex) = k.hex_mut(HexCoord::default()) {
            hex.controller = Controller::Wilderness;
        }
        assert!(matches!(
            prepare_transfer_settlement(&ctx(k).with_pending(pending)),
            Err(CommandError::NotControlled(_))
        ));
    }

    #[test]
    fn train_caps_at_kingdom_level() {
        let mut k = Kingdom::new("Test");
        k.level = 3;
        let army = Army::new("Guard", ArmyType::Infantry, 2);
        let id = army.id;
        k.armies.push(army);
        let c = ctx(k).with_pending(PendingState::default().with_army(id));

        let prepared = prepare_train(&c, 5).unwrap();
        assert_eq!(prepared.effect, Effect::TrainArmy { army_id: id, level: 3 });

        let mut maxed = c.clone();
        if let Some(a) = maxed.kingdom.army_mut(id) {
            a.level = 3;
        }
        assert!(prepare_train(&maxed, 1).unwrap().is_no_op());
    }

    #[tokio::test]
    async fn outfit_asks_for_a_slot_and_honors_cancel() {
        let mut k = Kingdom::new("Test");
        let army = Army::new("Guard", ArmyType::Infantry, 1);
        let id = army.id;
        k.armies.push(army);
        let c = ctx(k);

        let prepared = prepare_outfit(&c, None, &ScriptedSelector::new([Some(vec![2])])).await.unwrap().unwrap();
        assert_eq!(
            prepared.effect,
            Effect::OutfitArmy {
                army_id: id,
                slot: EquipmentSlot::Runes
            }
        );

        let cancelled = prepare_outfit(&c, None, &ScriptedSelector::new([None])).await.unwrap();
        assert!(cancelled.is_none());
    }

    #[tokio::test]
    async fn abandon_uses_the_selection() {
        let mut k = Kingdom::new("Test");
        for q in 0..3 {
            k.hexes.push(Hex::new(HexCoord::new(q, 0), Controller::Kingdom));
        }
        let prepared = prepare_abandon(&ctx(k), 2, &FirstChoiceSelector).await.unwrap().unwrap();
        assert_eq!(
            prepared.effect,
            Effect::AbandonHexes {
                hexes: vec![HexCoord::new(0, 0), HexCoord::new(1, 0)]
            }
        );
    }

    #[test]
    fn damage_with_nothing_built_is_a_no_op() {
        let mut rng = SmallRng::seed_from_u64(9);
        let prepared = prepare_damage(&ctx(Kingdom::new("Test")), 2, &mut rng);
        assert!(prepared.is_no_op());
        assert_eq!(prepared.badges.first().unwrap().kind, BadgeKind::Info);
    }

    #[test]
    fn grant_defaults_to_the_capital() {
        let mut k = Kingdom::new("Test");
        let mut capital = settlement_with("Capital", &[], 0);
        capital.is_capital = true;
        let id = capital.id;
        k.settlements.push(capital);
        let prepared = prepare_grant_structure(&ctx(k), &Catalog::standard(), &StructureKey::from("jail")).unwrap();
        match prepared.effect {
            Effect::GrantStructure { target } => assert_eq!(target.settlement_id, id),
            other => panic!("Expected GrantStructure, got {other:?}"),
        }
    }
}
