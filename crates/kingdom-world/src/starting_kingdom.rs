//! Default starting kingdom: a capital town, one village, a single army,
//! and a claimed core of seven hexes inside a radius-2 map.

use kingdom_types::{
    Army, ArmyType, BuiltStructure, Controller, Fortification, Hex, HexCoord, Kingdom, Resource,
    Settlement, SettlementTier, StructureKey, Worksite,
};

/// Radius of the generated map around the capital.
const MAP_RADIUS: i32 = 2;

/// Opening stockpiles.
const STARTING_RESOURCES: [(Resource, i32); 7] = [
    (Resource::Gold, 10),
    (Resource::Food, 6),
    (Resource::Lumber, 4),
    (Resource::Stone, 2),
    (Resource::Ore, 0),
    (Resource::Unrest, 0),
    (Resource::Fame, 1),
];

fn built(key: &str) -> BuiltStructure {
    BuiltStructure {
        key: StructureKey::from(key),
        damaged: false,
    }
}

/// Hex distance from the origin in axial coordinates.
fn distance_from_origin(coord: HexCoord) -> i32 {
    let s = coord.q.saturating_add(coord.r).saturating_neg();
    coord.q.abs().max(coord.r.abs()).max(s.abs())
}

/// Build the default kingdom at `level`.
///
/// Hexes within distance 1 of the capital are claimed; the outer ring is
/// wilderness.
pub fn create_starting_kingdom(name: &str, level: u32) -> Kingdom {
    let mut kingdom = Kingdom::new(name);
    kingdom.level = level.max(1);
    for (resource, value) in STARTING_RESOURCES {
        kingdom.set_resource(resource, value);
    }

    for q in -MAP_RADIUS..=MAP_RADIUS {
        for r in -MAP_RADIUS..=MAP_RADIUS {
            let coord = HexCoord::new(q, r);
            if distance_from_origin(coord) > MAP_RADIUS {
                continue;
            }
            let controller = if distance_from_origin(coord) <= 1 {
                Controller::Kingdom
            } else {
                Controller::Wilderness
            };
            kingdom.hexes.push(Hex::new(coord, controller));
        }
    }

    let improvements = [
        (HexCoord::new(0, 1), Worksite::Farmland),
        (HexCoord::new(-1, 1), Worksite::Farmland),
        (HexCoord::new(1, 0), Worksite::LumberCamp),
        (HexCoord::new(-1, 0), Worksite::Quarry),
    ];
    for (coord, worksite) in improvements {
        if let Some(hex) = kingdom.hex_mut(coord) {
            hex.worksite = Some(worksite);
        }
    }
    if let Some(hex) = kingdom.hex_mut(HexCoord::new(0, -1)) {
        hex.fortification = Some(Fortification {
            tier: 1,
            built_turn: 0,
            maintenance_unpaid: false,
        });
    }

    let mut capital = Settlement::new("Capital", SettlementTier::Town, HexCoord::new(0, 0));
    capital.is_capital = true;
    capital.fed_last_turn = true;
    capital.structures = vec![built("stocks"), built("market"), built("granary")];

    let mut village = Settlement::new("Riverside", SettlementTier::Village, HexCoord::new(1, -1));
    village.fed_last_turn = true;
    village.structures = vec![built("stocks")];

    let mut guard = Army::new("Capital Guard", ArmyType::Infantry, kingdom.level);
    guard.supported_by = Some(capital.id);

    kingdom.settlements = vec![capital, village];
    kingdom.armies = vec![guard];
    kingdom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_map_has_radius_two() {
        let kingdom = create_starting_kingdom("Test", 1);
        assert_eq!(kingdom.hexes.len(), 19);
        let claimed = kingdom.hexes.iter().filter(|h| h.controller.is_kingdom()).count();
        assert_eq!(claimed, 7);
    }

    #[test]
    fn settlements_sit_on_claimed_hexes() {
        let kingdom = create_starting_kingdom("Test", 1);
        for settlement in &kingdom.settlements {
            let hex = kingdom.hex(settlement.hex);
            assert!(hex.is_some_and(|h| h.controller.is_kingdom()));
        }
        assert_eq!(kingdom.settlements.iter().filter(|s| s.is_capital).count(), 1);
    }

    #[test]
    fn starting_army_is_kingdom_led() {
        let kingdom = create_starting_kingdom("Test", 3);
        assert_eq!(kingdom.armies.len(), 1);
        assert!(kingdom.armies.iter().all(Army::needs_support));
        assert!(kingdom.armies.iter().all(|a| a.level == 3));
        assert_eq!(kingdom.resource(Resource::Gold), 10);
    }
}
