//! Error types for the campaign binary.

/// Top-level error for the campaign binary.
///
/// Each variant wraps one subsystem so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: kingdom_core::ConfigError,
    },

    /// Catalog loading failed.
    #[error("world error: {source}")]
    World {
        /// The underlying catalog error.
        #[from]
        source: kingdom_world::WorldError,
    },

    /// The kingdom store could not be reached or opened.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: kingdom_db::StoreError,
    },

    /// A turn failed part-way.
    #[error("turn error: {source}")]
    Turn {
        /// The underlying turn error.
        #[from]
        source: kingdom_core::TurnError,
    },
}
