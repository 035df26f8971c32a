//! Applying resolved outcome deltas to the kingdom.
//!
//! Deltas land as given: the resource map is signed, so a loss can take a
//! resource below zero or deepen an existing deficit. Flooring belongs to
//! the allocation passes, which open negative stockpiles as empty. The
//! fame cap applies only to the per-turn fame gain.

use serde::{Deserialize, Serialize};
use tracing::debug;

use kingdom_types::{Kingdom, OutcomeGrade, Resource, ResourceDelta};

use crate::config::EconomyRules;

/// What an outcome changed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeReport {
    /// Change per delta, in table order.
    pub applied: Vec<ResourceDelta>,
    /// Fame granted by a critical success.
    pub fame_bonus: i32,
}

impl OutcomeReport {
    /// Net change to `resource`.
    pub fn net(&self, resource: Resource) -> i32 {
        self.applied
            .iter()
            .filter(|d| d.resource == resource)
            .fold(0i32, |acc, d| acc.saturating_add(d.value))
    }
}

/// Apply one signed change. Returns the change that landed, which differs
/// from `value` only when the stockpile saturates.
pub fn apply_delta(kingdom: &mut Kingdom, resource: Resource, value: i32) -> i32 {
    let before = kingdom.resource(resource);
    kingdom.adjust_resource(resource, value);
    kingdom.resource(resource).saturating_sub(before)
}

/// The per-turn fame gain: raises fame by `amount` but not past
/// `max_fame`. Fame already above the cap is left alone. Returns the
/// amount gained.
pub fn grant_fame(kingdom: &mut Kingdom, amount: i32, rules: &EconomyRules) -> i32 {
    let current = kingdom.resource(Resource::Fame);
    let room = rules.max_fame.saturating_sub(current).max(0);
    let gained = amount.clamp(0, room);
    apply_delta(kingdom, Resource::Fame, gained)
}

/// Apply every delta in order, then grant the critical-success fame bonus.
pub fn apply_outcome(
    kingdom: &mut Kingdom,
    grade: OutcomeGrade,
    deltas: &[ResourceDelta],
    rules: &EconomyRules,
) -> OutcomeReport {
    let mut report = OutcomeReport::default();
    for delta in deltas {
        let landed = apply_delta(kingdom, delta.resource, delta.value);
        report.applied.push(ResourceDelta::new(delta.resource, landed));
    }
    if grade == OutcomeGrade::CriticalSuccess && rules.critical_fame_bonus > 0 {
        report.fame_bonus = apply_delta(kingdom, Resource::Fame, rules.critical_fame_bonus);
    }
    debug!(
        grade = grade.label(),
        deltas = deltas.len(),
        fame_bonus = report.fame_bonus,
        "outcome applied"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kingdom() -> Kingdom {
        let mut k = Kingdom::new("Test");
        k.set_resource(Resource::Gold, 3);
        k.set_resource(Resource::Fame, 2);
        k
    }

    #[test]
    fn losses_can_run_a_deficit() {
        let mut k = kingdom();
        let report = apply_outcome(
            &mut k,
            OutcomeGrade::Failure,
            &[ResourceDelta::new(Resource::Gold, -5)],
            &EconomyRules::default(),
        );
        assert_eq!(report.net(Resource::Gold), -5);
        assert_eq!(k.resource(Resource::Gold), -2);
    }

    #[test]
    fn existing_deficit_deepens() {
        let mut k = kingdom();
        k.set_resource(Resource::Gold, -2);
        assert_eq!(apply_delta(&mut k, Resource::Gold, -1), -1);
        assert_eq!(k.resource(Resource::Gold), -3);
    }

    #[test]
    fn critical_success_always_grants_the_bonus() {
        let mut k = kingdom();
        let rules = EconomyRules::default();
        let report = apply_outcome(
            &mut k,
            OutcomeGrade::CriticalSuccess,
            &[ResourceDelta::new(Resource::Gold, 2)],
            &rules,
        );
        assert_eq!(report.fame_bonus, 1);
        assert_eq!(k.resource(Resource::Fame), 3);
        assert_eq!(report.net(Resource::Gold), 2);

        // At the cap the bonus still lands.
        let again = apply_outcome(&mut k, OutcomeGrade::CriticalSuccess, &[], &rules);
        assert_eq!(again.fame_bonus, 1);
        assert_eq!(k.resource(Resource::Fame), 4);
    }

    #[test]
    fn per_turn_fame_stops_at_the_cap() {
        let mut k = kingdom();
        let rules = EconomyRules::default();
        assert_eq!(grant_fame(&mut k, 1, &rules), 1);
        assert_eq!(grant_fame(&mut k, 1, &rules), 0);
        assert_eq!(k.resource(Resource::Fame), 3);

        k.set_resource(Resource::Fame, 5);
        assert_eq!(grant_fame(&mut k, 1, &rules), 0);
        assert_eq!(k.resource(Resource::Fame), 5);
    }

    #[test]
    fn ordinary_success_grants_no_fame() {
        let mut k = kingdom();
        let report = apply_outcome(&mut k, OutcomeGrade::Success, &[], &EconomyRules::default());
        assert_eq!(report.fame_bonus, 0);
        assert_eq!(k.resource(Resource::Fame), 2);
    }
}
