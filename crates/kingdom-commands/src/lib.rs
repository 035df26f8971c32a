//! Prepare/commit command pipeline for the kingdom turn engine.
//!
//! A [`Command`](kingdom_types::Command) is first *prepared* against a
//! [`CommandContext`]: targets are chosen, quantities fixed, and a preview
//! built, all without touching the store. The resulting
//! [`PreparedCommand`] can be shown and discarded freely. Committing it
//! applies its [`Effect`] exactly once inside the store's transactional
//! update.
//!
//! # Modules
//!
//! - [`context`] -- The [`CommandContext`] every handler reads.
//! - [`effect`] -- Serializable [`Effect`] values and their pure `apply`.
//! - [`error`] -- Error types.
//! - [`handlers`] -- One prepare function per command variant.
//! - [`prepared`] -- [`PreparedCommand`], preview badges, and commit.
//! - [`registry`] -- [`CommandRegistry`]: dispatch, commit, execute.
//! - [`selection`] -- The [`TargetSelector`] seam for interactive choices.

pub mod context;
pub mod effect;
pub mod error;
pub mod handlers;
pub mod prepared;
pub mod registry;
pub mod selection;

// Re-export primary types at crate root.
pub use context::CommandContext;
pub use effect::{Effect, StructureTarget, Withdrawal};
pub use error::CommandError;
pub use prepared::{BadgeKind, CommitOutcome, PreparedCommand, PreviewBadge};
pub use registry::CommandRegistry;
pub use selection::{FirstChoiceSelector, ScriptedSelector, SelectionRequest, TargetSelector};
