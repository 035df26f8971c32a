//! Ongoing modifiers.
//!
//! Each Status phase applies every active modifier once (as a raw delta,
//! like an outcome), then counts down the timed
//! ones. A modifier whose count reaches zero is removed after it has
//! applied for the last time.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use kingdom_types::{Kingdom, ModifierId, ResourceDelta};

use crate::outcome::apply_delta;

/// Result of applying modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModifierReport {
    /// Effective change per modifier, in order.
    pub applied: Vec<(ModifierId, ResourceDelta)>,
    /// Modifiers that expired this turn.
    pub expired: Vec<ModifierId>,
}

/// Apply, decrement, and expire the kingdom's modifiers.
pub fn apply_modifiers(kingdom: &mut Kingdom) -> ModifierReport {
    let mut report = ModifierReport::default();
    let mut modifiers = std::mem::take(&mut kingdom.modifiers);

    for modifier in &modifiers {
        let landed = apply_delta(kingdom, modifier.resource, modifier.value);
        report
            .applied
            .push((modifier.id, ResourceDelta::new(modifier.resource, landed)));
    }

    modifiers.retain_mut(|modifier| match modifier.remaining_turns.as_mut() {
        None => true,
        Some(turns) => {
            *turns = turns.saturating_sub(1);
            if *turns == 0 {
                debug!(modifier = %modifier.name, "modifier expired");
                report.expired.push(modifier.id);
                false
            } else {
                true
            }
        }
    });
    kingdom.modifiers = modifiers;

    info!(
        turn = kingdom.turn,
        applied = report.applied.len(),
        expired = report.expired.len(),
        "modifiers applied"
    );
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kingdom_types::{ActiveModifier, Resource};

    use super::*;

    #[test]
    fn timed_modifiers_expire_after_their_last_application() {
        let mut k = Kingdom::new("Test");
        k.modifiers.push(ActiveModifier::new("Festival", Resource::Unrest, -1, Some(2)));
        k.set_resource(Resource::Unrest, 5);

        let first = apply_modifiers(&mut k);
        assert!(first.expired.is_empty());
        let second = apply_modifiers(&mut k);
        assert_eq!(second.expired.len(), 1);
        assert!(k.modifiers.is_empty());
        assert_eq!(k.resource(Resource::Unrest), 3);
    }

    #[test]
    fn permanent_modifiers_never_expire() {
        let mut k = Kingdom::new("Test");
        k.modifiers.push(ActiveModifier::new("Trade route", Resource::Gold, 1, None));
        for _ in 0..5 {
            let report = apply_modifiers(&mut k);
            assert!(report.expired.is_empty());
        }
        assert_eq!(k.modifiers.len(), 1);
        assert_eq!(k.resource(Resource::Gold), 5);
    }

    #[test]
    fn penalties_can_run_a_deficit() {
        let mut k = Kingdom::new("Test");
        k.modifiers.push(ActiveModifier::new("Blight", Resource::Food, -3, Some(1)));
        k.set_resource(Resource::Food, 1);
        let report = apply_modifiers(&mut k);
        let (_, delta) = report.applied.first().copied().unwrap();
        assert_eq!(delta.value, -3);
        assert_eq!(k.resource(Resource::Food), -2);
    }
}
