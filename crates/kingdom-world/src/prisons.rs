//! Imprisonment capacity derived from a settlement's structures, and how
//! a batch of unrest is spread across the kingdom's prisons.

use serde::{Deserialize, Serialize};

use kingdom_types::{Settlement, SettlementId};

use crate::catalog::Catalog;

/// Total unrest `settlement` can hold. Damaged structures and structures
/// missing from the catalog contribute nothing.
pub fn imprisonment_capacity(settlement: &Settlement, catalog: &Catalog) -> u32 {
    settlement
        .structures
        .iter()
        .filter(|built| !built.damaged)
        .filter_map(|built| catalog.structure(&built.key).ok())
        .fold(0u32, |acc, blueprint| acc.saturating_add(blueprint.imprison_capacity))
}

/// Capacity not yet used by imprisoned unrest.
pub fn remaining_capacity(settlement: &Settlement, catalog: &Catalog) -> u32 {
    imprisonment_capacity(settlement, catalog).saturating_sub(settlement.imprisoned_unrest)
}

/// Unrest placed in one settlement's prison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrisonAllocation {
    /// The settlement.
    pub settlement_id: SettlementId,
    /// Unrest imprisoned there.
    pub amount: u32,
}

/// Spread `requested` unrest over `settlements`, filling the one with the
/// most free room first and spilling into the next. Ties keep settlement
/// order. The total allocated is `min(requested, total free room)`.
pub fn allocate_imprisonment<'a>(
    settlements: impl IntoIterator<Item = &'a Settlement>,
    catalog: &Catalog,
    requested: u32,
) -> Vec<PrisonAllocation> {
    let mut rooms: Vec<(SettlementId, u32)> = settlements
        .into_iter()
        .map(|s| (s.id, remaining_capacity(s, catalog)))
        .filter(|(_, room)| *room > 0)
        .collect();
    rooms.sort_by(|a, b| b.1.cmp(&a.1));

    let mut left = requested;
    let mut allocations = Vec::new();
    for (settlement_id, room) in rooms {
        if left == 0 {
            break;
        }
        let amount = left.min(room);
        left = left.saturating_sub(amount);
        allocations.push(PrisonAllocation { settlement_id, amount });
    }
    allocations
}

/// Sum of the amounts in `allocations`.
pub fn total_allocated(allocations: &[PrisonAllocation]) -> u32 {
    allocations.iter().fold(0u32, |acc, a| acc.saturating_add(a.amount))
}

#[cfg(test)]
mod tests {
    use kingdom_types::{BuiltStructure, HexCoord, SettlementTier, StructureKey};

    use super::*;

    fn built(key: &str, damaged: bool) -> BuiltStructure {
        BuiltStructure {
            key: StructureKey::from(key),
            damaged,
        }
    }

    #[test]
    fn capacity_sums_undamaged_prisons() {
        let catalog = Catalog::standard();
        let mut town = Settlement::new("Town", SettlementTier::Town, HexCoord::default());
        town.structures = vec![built("jail", false), built("stocks", false), built("market", false)];
        assert_eq!(imprisonment_capacity(&town, &catalog), 3);

        town.imprisoned_unrest = 2;
        assert_eq!(remaining_capacity(&town, &catalog), 1);
    }

    #[test]
    fn damaged_prisons_hold_nothing() {
        let catalog = Catalog::standard();
        let mut city = Settlement::new("City", SettlementTier::City, HexCoord::default());
        city.structures = vec![built("prison", true)];
        city.imprisoned_unrest = 3;
        assert_eq!(imprisonment_capacity(&city, &catalog), 0);
        assert_eq!(remaining_capacity(&city, &catalog), 0);
    }

    #[test]
    fn allocation_fills_the_roomiest_prison_then_spills() {
        let catalog = Catalog::standard();
        let mut village = Settlement::new("Village", SettlementTier::Village, HexCoord::new(1, 0));
        village.structures = vec![built("stocks", false)];
        let mut town = Settlement::new("Town", SettlementTier::Town, HexCoord::default());
        town.structures = vec![built("jail", false)];
        let settlements = [village.clone(), town.clone()];

        let allocations = allocate_imprisonment(&settlements, &catalog, 10);
        assert_eq!(
            allocations,
            vec![
                PrisonAllocation { settlement_id: town.id, amount: 2 },
                PrisonAllocation { settlement_id: village.id, amount: 1 },
            ]
        );
        assert_eq!(total_allocated(&allocations), 3);

        let small = allocate_imprisonment(&settlements, &catalog, 1);
        assert_eq!(small, vec![PrisonAllocation { settlement_id: town.id, amount: 1 }]);
    }

    #[test]
    fn full_prisons_get_nothing() {
        let catalog = Catalog::standard();
        let mut town = Settlement::new("Town", SettlementTier::Town, HexCoord::default());
        town.structures = vec![built("jail", false)];
        town.imprisoned_unrest = 2;
        assert!(allocate_imprisonment([&town], &catalog, 4).is_empty());
    }
}
