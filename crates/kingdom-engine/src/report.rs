//! Turn callback that writes each finished turn to the log.

use kingdom_core::{TurnCallback, TurnSummary};
use kingdom_types::{Kingdom, Resource};
use tracing::{debug, info};

/// Logs one line per turn plus detail for anything that happened.
#[derive(Debug, Default)]
pub struct LogCallback {
    turns_logged: u32,
}

impl LogCallback {
    /// Turns seen so far.
    pub const fn turns_logged(&self) -> u32 {
        self.turns_logged
    }
}

impl TurnCallback for LogCallback {
    fn on_turn(&mut self, summary: &TurnSummary, kingdom: &Kingdom) {
        self.turns_logged = self.turns_logged.saturating_add(1);

        if let Some(feeding) = &summary.feeding
            && !feeding.unfed.is_empty()
        {
            info!(turn = summary.turn, unfed = feeding.unfed.len(), unrest = feeding.unrest, "Settlements went hungry");
        }
        if let Some(military) = &summary.military {
            for army in &military.disbanded {
                info!(turn = summary.turn, army = %army.name, "Army disbanded");
            }
        }
        if let Some(build) = &summary.build {
            for project in &build.completed {
                info!(turn = summary.turn, structure = %project.structure, "Structure completed");
            }
        }
        for resolution in summary.incident.iter().chain(&summary.event) {
            info!(
                turn = summary.turn,
                check = %resolution.check,
                name = %resolution.name,
                grade = resolution.grade.label(),
                skipped = resolution.skipped.len(),
                "{}",
                resolution.message
            );
        }
        for (resource, flow) in summary.net_flow() {
            debug!(turn = summary.turn, resource = ?resource, flow, "Net resource flow");
        }

        info!(
            turn = summary.turn,
            fame = kingdom.resource(Resource::Fame),
            unrest = kingdom.resource(Resource::Unrest),
            gold = kingdom.resource(Resource::Gold),
            food = kingdom.resource(Resource::Food),
            settlements = kingdom.settlements.len(),
            armies = kingdom.armies.len(),
            "Turn complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_turns() {
        let mut callback = LogCallback::default();
        let kingdom = Kingdom::new("Test");
        let summary = TurnSummary::new(1);
        callback.on_turn(&summary, &kingdom);
        callback.on_turn(&summary, &kingdom);
        assert_eq!(callback.turns_logged(), 2);
    }
}
