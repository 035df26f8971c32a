//! Unrest tiers and the incident check.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kingdom_types::{Kingdom, Resource};
use kingdom_world::Catalog;

use crate::config::RulesConfig;

/// Result of one incident check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentCheck {
    /// Unrest at the time of the check.
    pub unrest: i32,
    /// Tier derived from `unrest`.
    pub tier: u32,
    /// Chance of an incident at `tier`.
    pub chance: f64,
    /// Roll in `[0, 1)`.
    pub roll: f64,
    /// Key of the incident that struck, if any.
    pub incident: Option<String>,
}

/// `min(max_tier, floor(unrest / unrest_per_tier))`. Negative unrest is
/// tier 0.
pub fn unrest_tier(unrest: i32, rules: &RulesConfig) -> u32 {
    let unrest = u32::try_from(unrest).unwrap_or(0);
    unrest
        .checked_div(rules.unrest_per_tier)
        .unwrap_or(0)
        .min(rules.max_unrest_tier)
}

/// The configured incident chance for `tier` (0 beyond the table).
pub fn incident_chance(tier: u32, rules: &RulesConfig) -> f64 {
    usize::try_from(tier)
        .ok()
        .and_then(|index| rules.incident_chances.get(index))
        .copied()
        .unwrap_or(0.0)
}

/// An incident triggers when the roll is strictly below the chance.
pub fn incident_triggers(roll: f64, chance: f64) -> bool {
    roll < chance
}

/// Roll for an incident against the kingdom's current unrest and pick one
/// from the tier's table when it triggers. Does not modify the kingdom.
pub fn check_for_incident(
    kingdom: &Kingdom,
    catalog: &Catalog,
    rules: &RulesConfig,
    rng: &mut impl Rng,
) -> IncidentCheck {
    let unrest = kingdom.resource(Resource::Unrest);
    let tier = unrest_tier(unrest, rules);
    let chance = incident_chance(tier, rules);
    let roll: f64 = rng.random();

    let incident = if tier > 0 && incident_triggers(roll, chance) {
        let candidates = catalog.incidents_for_tier(tier);
        let picked = candidates.choose(rng).map(|i| i.key.clone());
        if picked.is_none() {
            warn!(tier, "incident triggered but the catalog has none for this tier");
        }
        picked
    } else {
        None
    };

    info!(
        turn = kingdom.turn,
        unrest,
        tier,
        chance,
        roll,
        incident = incident.as_deref().unwrap_or("none"),
        "incident check"
    );
    IncidentCheck {
        unrest,
        tier,
        chance,
        roll,
        incident,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn tiers_follow_unrest_in_steps_of_three() {
        let rules = RulesConfig::default();
        assert_eq!(unrest_tier(0, &rules), 0);
        assert_eq!(unrest_tier(2, &rules), 0);
        assert_eq!(unrest_tier(3, &rules), 1);
        assert_eq!(unrest_tier(7, &rules), 2);
        assert_eq!(unrest_tier(9, &rules), 3);
        assert_eq!(unrest_tier(40, &rules), 3);
        assert_eq!(unrest_tier(-4, &rules), 0);
    }

    #[test]
    fn unrest_seven_uses_the_tier_two_chance() {
        let rules = RulesConfig::default();
        let chance = incident_chance(unrest_tier(7, &rules), &rules);
        assert!((chance - 0.85).abs() < f64::EPSILON);
        assert!(incident_triggers(0.80, chance));
        assert!(!incident_triggers(0.90, chance));
    }

    #[test]
    fn tier_zero_never_triggers() {
        let rules = RulesConfig::default();
        assert!(!incident_triggers(0.0, incident_chance(0, &rules)));

        let k = Kingdom::new("Calm");
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..50 {
            let check = check_for_incident(&k, &Catalog::standard(), &rules, &mut rng);
            assert_eq!(check.tier, 0);
            assert!(check.incident.is_none());
        }
    }

    #[test]
    fn certain_incidents_come_from_the_tier_table() {
        let rules = RulesConfig {
            incident_chances: vec![0.0, 1.0, 1.0, 1.0],
            ..RulesConfig::default()
        };
        let catalog = Catalog::standard();
        let mut k = Kingdom::new("Restless");
        k.set_resource(Resource::Unrest, 10);
        let mut rng = SmallRng::seed_from_u64(7);

        let check = check_for_incident(&k, &catalog, &rules, &mut rng);
        assert_eq!(check.tier, 3);
        let key = check.incident.unwrap();
        assert_eq!(catalog.incident(&key).unwrap().tier, 3);
    }
}
