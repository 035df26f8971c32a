//! Error types for the `kingdom-world` crate.

use kingdom_types::{HexCoord, StructureKey};

/// Errors that can occur while loading or querying the static catalog.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The structure key is not in the catalog.
    #[error("unknown structure: {0}")]
    UnknownStructure(StructureKey),

    /// The fortification tier is not in the catalog.
    #[error("unknown fortification tier: {0}")]
    UnknownFortification(u8),

    /// A catalog table lists the same key twice.
    #[error("duplicate catalog entry: {0}")]
    DuplicateEntry(String),

    /// The hex is not part of the known map.
    #[error("hex not found: {0}")]
    HexNotFound(HexCoord),

    /// Failed to read a catalog file.
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse catalog YAML.
    #[error("failed to parse catalog YAML: {0}")]
    Yaml(#[from] serde_yml::Error),
}
