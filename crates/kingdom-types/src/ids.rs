//! Type-safe identifier wrappers.
//!
//! Every mutable entity owned by the kingdom aggregate carries a strongly
//! typed UUID v7 identifier so that army, settlement, and project ids cannot
//! be mixed up at compile time. Structures are the exception: they are keyed
//! by their catalog id ([`StructureKey`]) because a settlement holds at most
//! one copy of each structure.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a kingdom aggregate (one per campaign).
    KingdomId
}

define_id! {
    /// Unique identifier for a settlement.
    SettlementId
}

define_id! {
    /// Unique identifier for an army.
    ArmyId
}

define_id! {
    /// Unique identifier for a queued build project.
    ProjectId
}

define_id! {
    /// Unique identifier for an active modifier.
    ModifierId
}

define_id! {
    /// Unique identifier for a non-player faction.
    FactionId
}

/// Catalog key of a structure blueprint (e.g. `"jail"`).
///
/// Settlements store built structures by key; the static catalog maps keys
/// to costs and benefits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StructureKey(pub String);

impl StructureKey {
    /// Create a key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for StructureKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StructureKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let army = ArmyId::new();
        let settlement = SettlementId::new();
        assert_ne!(army.into_inner(), Uuid::nil());
        assert_ne!(settlement.into_inner(), Uuid::nil());
    }

    #[test]
    fn ids_serialize_as_plain_uuid() {
        let id = ProjectId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{}\"", id.0));
    }

    #[test]
    fn structure_key_displays_raw_key() {
        let key = StructureKey::from("jail");
        assert_eq!(key.to_string(), "jail");
        assert_eq!(key.as_str(), "jail");
    }
}
