//! Prepared commands: the preview a player sees and the effect that
//! commit applies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use kingdom_db::KingdomStore;
use kingdom_types::LogEntry;
use kingdom_world::Catalog;

use crate::effect::Effect;
use crate::error::CommandError;

/// How a badge should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeKind {
    /// The main effect of the command.
    Effect,
    /// Excess that could not be absorbed and becomes a penalty.
    Overflow,
    /// Nothing will happen, and why.
    Info,
}

/// One line of preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewBadge {
    /// Presentation category.
    pub kind: BadgeKind,
    /// Human-readable description.
    pub text: String,
    /// Dice formula rolled on commit, if any.
    pub formula: Option<String>,
    /// Resolved quantity, if known.
    pub value: Option<i32>,
}

impl PreviewBadge {
    /// An effect badge.
    pub fn effect(text: impl Into<String>) -> Self {
        Self::new(BadgeKind::Effect, text)
    }

    /// An overflow badge.
    pub fn overflow(text: impl Into<String>) -> Self {
        Self::new(BadgeKind::Overflow, text)
    }

    /// An informational badge.
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(BadgeKind::Info, text)
    }

    fn new(kind: BadgeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            formula: None,
            value: None,
        }
    }

    /// Attach the formula rolled on commit.
    #[must_use]
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    /// Attach a resolved quantity.
    #[must_use]
    pub const fn with_value(mut self, value: i32) -> Self {
        self.value = Some(value);
        self
    }
}

/// The result of preparing a command.
///
/// Holding one has no side effects. [`PreparedCommand::commit`] consumes
/// it, so an effect can be applied at most once; dropping it abandons the
/// effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedCommand {
    /// The command's `type` tag.
    pub command: String,
    /// Preview lines, main effect first.
    pub badges: Vec<PreviewBadge>,
    /// What commit will do.
    pub effect: Effect,
    /// Metadata copied from the context.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl PreparedCommand {
    /// A prepared command with one effect badge.
    pub fn new(command: &str, effect: Effect, badge: PreviewBadge) -> Self {
        Self {
            command: command.to_owned(),
            badges: vec![badge],
            effect,
            metadata: BTreeMap::new(),
        }
    }

    /// A prepared command that does nothing, with an explanation.
    pub fn no_op(command: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            command,
            Effect::Nothing {
                reason: reason.clone(),
            },
            PreviewBadge::info(reason),
        )
    }

    /// Append a badge.
    #[must_use]
    pub fn with_badge(mut self, badge: PreviewBadge) -> Self {
        self.badges.push(badge);
        self
    }

    /// Whether committing would change anything.
    pub const fn is_no_op(&self) -> bool {
        matches!(self.effect, Effect::Nothing { .. })
    }

    /// Roll any deferred dice, then apply the effect inside one store
    /// update.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if a guard fails during apply or the store
    /// fails. Either way the stored kingdom is unchanged.
    pub async fn commit(
        self,
        store: &impl KingdomStore,
        catalog: &Catalog,
        rng: &mut (impl rand::Rng + Send),
    ) -> Result<CommitOutcome, CommandError> {
        let mut effect = self.effect;
        let rolled = effect.roll(rng);

        let log = store
            .update(|kingdom| {
                let message = effect.apply(kingdom, catalog)?;
                Ok::<_, CommandError>(message.map(|text| LogEntry::now(kingdom, text)))
            })
            .await?;

        if let Some(entry) = &log {
            info!(command = %self.command, turn = entry.turn, "{}", entry.message);
        }
        Ok(CommitOutcome {
            command: self.command,
            rolled,
            log,
        })
    }
}

/// What a commit produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    /// The command's `type` tag.
    pub command: String,
    /// Value rolled on commit, for dice-driven effects.
    pub rolled: Option<i32>,
    /// User-facing log line, if the effect produced one.
    pub log: Option<LogEntry>,
}
