//! Static rule tables: structures, fortifications, settlement tiers,
//! income, worksites, incidents, and events.
//!
//! The tables are read-only for the lifetime of a campaign. The built-in
//! [`Catalog::standard`] set covers every lookup the turn engine performs;
//! a campaign may replace it with a YAML file of the same shape.
//!
//! | Tier | Food | Gold at level 1 | Unfed unrest |
//! |------|------|-----------------|--------------|
//! | Village | 1 | 1 | 1 |
//! | Town | 2 | 2 | 2 |
//! | City | 3 | 3 | 3 |
//! | Metropolis | 4 | 4 | 4 |

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use kingdom_types::{
    Amount, ArmyType, Command, EquipmentSlot, ImprisonMode, OutcomeGrade, Resource, ResourceDelta,
    SettlementTier, StructureKey, Worksite,
};

use crate::error::WorldError;

// ---------------------------------------------------------------------------
// Table rows
// ---------------------------------------------------------------------------

/// A structure that can be built in a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureBlueprint {
    /// Catalog key.
    pub key: StructureKey,
    /// Display name.
    pub name: String,
    /// Structure tier (1-4).
    pub tier: u8,
    /// Build cost.
    pub cost: BTreeMap<Resource, u32>,
    /// Unrest this structure can hold while undamaged.
    #[serde(default)]
    pub imprison_capacity: u32,
}

/// A fortification tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FortificationTier {
    /// Tier number (1 = earthworks).
    pub tier: u8,
    /// Display name.
    pub name: String,
    /// Gold owed each upkeep after the turn it was built.
    pub maintenance: u32,
}

/// Per-tier settlement requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementTierRules {
    /// The tier this row describes.
    pub tier: SettlementTier,
    /// Food consumed each upkeep.
    pub food: u32,
}

/// Settlement gold income for kingdoms at or above `min_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeBand {
    /// Lowest kingdom level this band applies to.
    pub min_level: u32,
    /// Gold from a fed village.
    pub village: u32,
    /// Gold from a fed town.
    pub town: u32,
    /// Gold from a fed city.
    pub city: u32,
    /// Gold from a fed metropolis.
    pub metropolis: u32,
}

impl IncomeBand {
    /// Gold for a settlement of `tier`.
    pub const fn gold(&self, tier: SettlementTier) -> u32 {
        match tier {
            SettlementTier::Village => self.village,
            SettlementTier::Town => self.town,
            SettlementTier::City => self.city,
            SettlementTier::Metropolis => self.metropolis,
        }
    }
}

/// What a worksite produces each Status phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksiteYield {
    /// The improvement.
    pub worksite: Worksite,
    /// Resource produced.
    pub resource: Resource,
    /// Quantity produced.
    pub amount: u32,
}

/// The effects attached to one outcome grade.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeEffect {
    /// Narrative line for the log.
    #[serde(default)]
    pub message: String,
    /// Numeric deltas applied directly.
    #[serde(default)]
    pub deltas: Vec<ResourceDelta>,
    /// Commands routed through the command pipeline.
    #[serde(default)]
    pub commands: Vec<Command>,
}

/// Effects for each of the four outcome grades.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeTable {
    /// Critical success.
    #[serde(default)]
    pub critical_success: OutcomeEffect,
    /// Success.
    #[serde(default)]
    pub success: OutcomeEffect,
    /// Failure.
    #[serde(default)]
    pub failure: OutcomeEffect,
    /// Critical failure.
    #[serde(default)]
    pub critical_failure: OutcomeEffect,
}

impl OutcomeTable {
    /// The effect for `grade`.
    pub const fn for_grade(&self, grade: OutcomeGrade) -> &OutcomeEffect {
        match grade {
            OutcomeGrade::CriticalSuccess => &self.critical_success,
            OutcomeGrade::Success => &self.success,
            OutcomeGrade::Failure => &self.failure,
            OutcomeGrade::CriticalFailure => &self.critical_failure,
        }
    }
}

/// An incident that can strike at a given unrest tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentTemplate {
    /// Catalog key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Unrest tier the incident belongs to (1 minor, 2 moderate, 3 major).
    pub tier: u32,
    /// Effects per outcome.
    pub outcomes: OutcomeTable,
}

/// A random kingdom event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTemplate {
    /// Catalog key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Effects per outcome.
    pub outcomes: OutcomeTable,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Every static table the turn engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Buildable structures.
    pub structures: Vec<StructureBlueprint>,
    /// Fortification tiers.
    pub fortifications: Vec<FortificationTier>,
    /// Per-tier settlement requirements.
    pub settlement_tiers: Vec<SettlementTierRules>,
    /// Income bands, lowest level first.
    pub income: Vec<IncomeBand>,
    /// Worksite yields.
    pub worksites: Vec<WorksiteYield>,
    /// Incidents by unrest tier.
    pub incidents: Vec<IncidentTemplate>,
    /// Random events.
    pub events: Vec<EventTemplate>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// Load a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the file cannot be read, parsed, or
    /// contains duplicate keys.
    pub fn from_file(path: &Path) -> Result<Self, WorldError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a catalog from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the YAML is invalid or contains duplicate
    /// keys.
    pub fn parse(yaml: &str) -> Result<Self, WorldError> {
        let catalog: Self = serde_yml::from_str(yaml)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Reject tables that list the same key twice.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateEntry`] naming the first duplicate.
    pub fn validate(&self) -> Result<(), WorldError> {
        let mut seen = BTreeSet::new();
        for key in self
            .structures
            .iter()
            .map(|s| format!("structure:{}", s.key))
            .chain(self.incidents.iter().map(|i| format!("incident:{}", i.key)))
            .chain(self.events.iter().map(|e| format!("event:{}", e.key)))
            .chain(self.fortifications.iter().map(|f| format!("fortification:{}", f.tier)))
        {
            if !seen.insert(key.clone()) {
                return Err(WorldError::DuplicateEntry(key));
            }
        }
        Ok(())
    }

    /// Look up a structure blueprint.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownStructure`] if the key is not listed.
    pub fn structure(&self, key: &StructureKey) -> Result<&StructureBlueprint, WorldError> {
        self.structures
            .iter()
            .find(|s| &s.key == key)
            .ok_or_else(|| WorldError::UnknownStructure(key.clone()))
    }

    /// Look up a fortification tier.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownFortification`] if the tier is not listed.
    pub fn fortification(&self, tier: u8) -> Result<&FortificationTier, WorldError> {
        self.fortifications
            .iter()
            .find(|f| f.tier == tier)
            .ok_or(WorldError::UnknownFortification(tier))
    }

    /// Food a settlement of `tier` eats each upkeep.
    ///
    /// Falls back to the tier ordinal when the table has no row.
    pub fn food_requirement(&self, tier: SettlementTier) -> u32 {
        self.settlement_tiers
            .iter()
            .find(|row| row.tier == tier)
            .map_or_else(|| tier.ordinal(), |row| row.food)
    }

    /// Gold a fed settlement of `tier` yields at kingdom `level`.
    pub fn settlement_gold(&self, level: u32, tier: SettlementTier) -> u32 {
        self.income
            .iter()
            .filter(|band| band.min_level <= level)
            .max_by_key(|band| band.min_level)
            .map_or(0, |band| band.gold(tier))
    }

    /// What a worksite produces, if the table lists it.
    pub fn worksite_yield(&self, worksite: Worksite) -> Option<&WorksiteYield> {
        self.worksites.iter().find(|w| w.worksite == worksite)
    }

    /// Incidents that can strike at unrest `tier`.
    pub fn incidents_for_tier(&self, tier: u32) -> Vec<&IncidentTemplate> {
        self.incidents.iter().filter(|i| i.tier == tier).collect()
    }

    /// Look up an incident by key.
    pub fn incident(&self, key: &str) -> Option<&IncidentTemplate> {
        self.incidents.iter().find(|i| i.key == key)
    }

    /// Look up an event by key.
    pub fn event(&self, key: &str) -> Option<&EventTemplate> {
        self.events.iter().find(|e| e.key == key)
    }

    /// The built-in tables.
    #[allow(clippy::too_many_lines)] // One literal table per section; splitting would obscure the data.
    pub fn standard() -> Self {
        Self {
            structures: vec![
                blueprint("stocks", "Stocks", 1, &[(Resource::Lumber, 2)], 1),
                blueprint("jail", "Jail", 2, &[(Resource::Lumber, 2), (Resource::Stone, 2), (Resource::Gold, 2)], 2),
                blueprint("prison", "Prison", 3, &[(Resource::Stone, 6), (Resource::Ore, 2), (Resource::Gold, 4)], 4),
                blueprint("donjon", "Donjon", 4, &[(Resource::Stone, 12), (Resource::Ore, 6), (Resource::Gold, 8)], 8),
                blueprint("granary", "Granary", 1, &[(Resource::Lumber, 3)], 0),
                blueprint("market", "Market", 1, &[(Resource::Gold, 2), (Resource::Lumber, 2)], 0),
                blueprint("barracks", "Barracks", 1, &[(Resource::Lumber, 3), (Resource::Stone, 1)], 0),
                blueprint("smithy", "Smithy", 1, &[(Resource::Lumber, 2), (Resource::Ore, 1)], 0),
                blueprint("temple", "Temple", 2, &[(Resource::Stone, 4), (Resource::Gold, 2)], 0),
                blueprint("library", "Library", 2, &[(Resource::Lumber, 2), (Resource::Stone, 2), (Resource::Gold, 1)], 0),
            ],
            fortifications: vec![
                fortification(1, "Earthworks", 1),
                fortification(2, "Wooden Tower", 1),
                fortification(3, "Stone Tower", 2),
                fortification(4, "Fortress", 3),
            ],
            settlement_tiers: SettlementTier::ALL
                .into_iter()
                .map(|tier| SettlementTierRules {
                    tier,
                    food: tier.ordinal(),
                })
                .collect(),
            income: vec![
                IncomeBand { min_level: 1, village: 1, town: 2, city: 3, metropolis: 4 },
                IncomeBand { min_level: 5, village: 2, town: 3, city: 4, metropolis: 6 },
                IncomeBand { min_level: 10, village: 3, town: 4, city: 6, metropolis: 8 },
                IncomeBand { min_level: 15, village: 4, town: 6, city: 8, metropolis: 10 },
            ],
            worksites: vec![
                WorksiteYield { worksite: Worksite::Farmland, resource: Resource::Food, amount: 2 },
                WorksiteYield { worksite: Worksite::LumberCamp, resource: Resource::Lumber, amount: 2 },
                WorksiteYield { worksite: Worksite::Quarry, resource: Resource::Stone, amount: 1 },
                WorksiteYield { worksite: Worksite::Mine, resource: Resource::Ore, amount: 1 },
            ],
            incidents: standard_incidents(),
            events: standard_events(),
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in table helpers
// ---------------------------------------------------------------------------

fn blueprint(
    key: &str,
    name: &str,
    tier: u8,
    cost: &[(Resource, u32)],
    imprison_capacity: u32,
) -> StructureBlueprint {
    StructureBlueprint {
        key: StructureKey::from(key),
        name: name.to_owned(),
        tier,
        cost: cost.iter().copied().collect(),
        imprison_capacity,
    }
}

fn fortification(tier: u8, name: &str, maintenance: u32) -> FortificationTier {
    FortificationTier {
        tier,
        name: name.to_owned(),
        maintenance,
    }
}

fn effect(message: &str, deltas: &[(Resource, i32)], commands: Vec<Command>) -> OutcomeEffect {
    OutcomeEffect {
        message: message.to_owned(),
        deltas: deltas
            .iter()
            .map(|(resource, value)| ResourceDelta::new(*resource, *value))
            .collect(),
        commands,
    }
}

fn quiet(message: &str) -> OutcomeEffect {
    effect(message, &[], Vec::new())
}

fn adjust(resource: Resource, formula: &str) -> Command {
    Command::AdjustResource {
        resource,
        amount: Amount::from(formula),
    }
}

fn incident(key: &str, name: &str, tier: u32, outcomes: OutcomeTable) -> IncidentTemplate {
    IncidentTemplate {
        key: key.to_owned(),
        name: name.to_owned(),
        tier,
        outcomes,
    }
}

fn event(key: &str, name: &str, outcomes: OutcomeTable) -> EventTemplate {
    EventTemplate {
        key: key.to_owned(),
        name: name.to_owned(),
        outcomes,
    }
}

#[allow(clippy::too_many_lines)] // Literal table.
fn standard_incidents() -> Vec<IncidentTemplate> {
    vec![
        // ---- Minor ----
        incident("crime_wave", "Crime Wave", 1, OutcomeTable {
            critical_success: quiet("The watch rounds up the culprits."),
            success: quiet("Order is restored."),
            failure: effect("Thieves empty the coffers.", &[], vec![adjust(Resource::Gold, "-1d4")]),
            critical_failure: effect(
                "Crime runs rampant.",
                &[(Resource::Unrest, 1)],
                vec![adjust(Resource::Gold, "-2d4")],
            ),
        }),
        incident("work_stoppage", "Work Stoppage", 1, OutcomeTable {
            critical_success: quiet("Workers return eagerly."),
            success: quiet("The dispute is settled."),
            failure: effect("Timber rots in the yards.", &[], vec![adjust(Resource::Lumber, "-1d4")]),
            critical_failure: effect(
                "The strike spreads.",
                &[(Resource::Unrest, 1)],
                vec![adjust(Resource::Lumber, "-2d4")],
            ),
        }),
        // ---- Moderate ----
        incident("riot", "Riot", 2, OutcomeTable {
            critical_success: quiet("The mob disperses peacefully."),
            success: quiet("The riot is contained."),
            failure: effect("Rioters wreck a building.", &[], vec![Command::DamageStructure { count: 1 }]),
            critical_failure: effect(
                "The riot burns through the streets.",
                &[(Resource::Unrest, 1)],
                vec![Command::DamageStructure { count: 2 }],
            ),
        }),
        incident("prison_break", "Prison Break", 2, OutcomeTable {
            critical_success: quiet("The escape is foiled."),
            success: effect(
                "A few prisoners slip away.",
                &[],
                vec![Command::ReleaseImprisoned { percent: 25, to_unrest: true }],
            ),
            failure: effect(
                "Half the prisoners escape.",
                &[],
                vec![Command::ReleaseImprisoned { percent: 50, to_unrest: true }],
            ),
            critical_failure: effect(
                "The prisons stand empty.",
                &[],
                vec![Command::ReleaseImprisoned { percent: 100, to_unrest: true }],
            ),
        }),
        incident("mass_desertion", "Mass Desertion", 2, OutcomeTable {
            critical_success: quiet("The troops rally to the banner."),
            success: quiet("Morale holds."),
            failure: effect("An army melts away.", &[], vec![Command::DisbandArmy]),
            critical_failure: effect(
                "An army turns its coat.",
                &[(Resource::Unrest, 1)],
                vec![Command::TransferArmy],
            ),
        }),
        // ---- Major ----
        incident("guerrilla_movement", "Guerrilla Movement", 3, OutcomeTable {
            critical_success: quiet("The rebels lay down their arms."),
            success: quiet("The rebels are driven off."),
            failure: effect("Rebels seize the borderlands.", &[], vec![Command::SeizeTerritory { count: 2 }]),
            critical_failure: effect(
                "A rebel state is proclaimed.",
                &[(Resource::Unrest, 1)],
                vec![
                    Command::SeizeTerritory { count: 4 },
                    Command::RecruitArmy {
                        name: "Loyalist Militia".to_owned(),
                        army_type: ArmyType::Infantry,
                        level: None,
                    },
                ],
            ),
        }),
        incident("secession_crisis", "Secession Crisis", 3, OutcomeTable {
            critical_success: quiet("The separatists are reconciled."),
            success: effect("Concessions are made.", &[(Resource::Gold, -2)], Vec::new()),
            failure: effect("A settlement declares independence.", &[], vec![Command::TransferSettlement]),
            critical_failure: effect(
                "A settlement and its garrison secede.",
                &[(Resource::Unrest, 2)],
                vec![Command::TransferSettlement, Command::TransferArmy],
            ),
        }),
    ]
}

fn standard_events() -> Vec<EventTemplate> {
    vec![
        event("bandit_raids", "Bandit Raids", OutcomeTable {
            critical_success: effect("The bandits' hoard is recovered.", &[(Resource::Gold, 2)], Vec::new()),
            success: quiet("The raiders are repelled."),
            failure: effect("Caravans are plundered.", &[], vec![adjust(Resource::Gold, "-1d4")]),
            critical_failure: effect(
                "Villages burn.",
                &[(Resource::Unrest, 1)],
                vec![adjust(Resource::Gold, "-2d4"), adjust(Resource::Food, "-1d4")],
            ),
        }),
        event("good_weather", "Good Weather", OutcomeTable {
            critical_success: effect("A bumper harvest.", &[], vec![adjust(Resource::Food, "2d4")]),
            success: effect("Fields flourish.", &[], vec![adjust(Resource::Food, "1d4")]),
            failure: quiet("The fine weather passes unremarked."),
            critical_failure: quiet("Drought follows the sun."),
        }),
        event("demand_for_justice", "Demand for Justice", OutcomeTable {
            critical_success: effect(
                "Agitators are rounded up.",
                &[],
                vec![Command::ImprisonUnrest { amount: Amount::Fixed(2), mode: ImprisonMode::ExistingUnrest }],
            ),
            success: effect(
                "Troublemakers are jailed.",
                &[],
                vec![Command::ImprisonUnrest { amount: Amount::Fixed(1), mode: ImprisonMode::ExistingUnrest }],
            ),
            failure: effect("The people feel ignored.", &[(Resource::Unrest, 1)], Vec::new()),
            critical_failure: effect(
                "Vigilantes fill the jails.",
                &[],
                vec![Command::ImprisonUnrest { amount: Amount::from("1d4"), mode: ImprisonMode::NewUnrest }],
            ),
        }),
        event("visiting_armorer", "Visiting Armorer", OutcomeTable {
            critical_success: effect(
                "The armorer outfits a company.",
                &[],
                vec![Command::OutfitArmy { slot: Some(EquipmentSlot::Armor) }],
            ),
            success: effect("The armorer offers a choice of wares.", &[], vec![Command::OutfitArmy { slot: None }]),
            failure: quiet("The armorer moves on."),
            critical_failure: effect("The armorer swindles the quartermaster.", &[(Resource::Gold, -1)], Vec::new()),
        }),
        event("festival", "Festival", OutcomeTable {
            critical_success: effect(
                "A grand festival lifts every spirit.",
                &[(Resource::Fame, 1)],
                vec![Command::AddModifier {
                    name: "Festival Cheer".to_owned(),
                    resource: Resource::Unrest,
                    value: -1,
                    duration: Some(2),
                }],
            ),
            success: effect("A merry festival.", &[(Resource::Unrest, -1)], Vec::new()),
            failure: effect("The festival costs more than planned.", &[(Resource::Gold, -1)], Vec::new()),
            critical_failure: effect(
                "Drunken brawls mar the festival.",
                &[(Resource::Gold, -1), (Resource::Unrest, 1)],
                Vec::new(),
            ),
        }),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_valid() {
        let catalog = Catalog::standard();
        assert!(catalog.validate().is_ok());
        assert!(!catalog.incidents_for_tier(1).is_empty());
        assert!(!catalog.incidents_for_tier(2).is_empty());
        assert!(!catalog.incidents_for_tier(3).is_empty());
        assert!(catalog.incidents_for_tier(0).is_empty());
    }

    #[test]
    fn food_requirement_matches_tier_ordinal() {
        let catalog = Catalog::standard();
        for tier in SettlementTier::ALL {
            assert_eq!(catalog.food_requirement(tier), tier.ordinal());
        }
    }

    #[test]
    fn settlement_gold_uses_highest_band_reached() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.settlement_gold(1, SettlementTier::Town), 2);
        assert_eq!(catalog.settlement_gold(4, SettlementTier::Town), 2);
        assert_eq!(catalog.settlement_gold(5, SettlementTier::Town), 3);
        assert_eq!(catalog.settlement_gold(20, SettlementTier::Metropolis), 10);
        assert_eq!(catalog.settlement_gold(0, SettlementTier::Village), 0);
    }

    #[test]
    fn unknown_structure_is_an_error() {
        let catalog = Catalog::standard();
        let result = catalog.structure(&StructureKey::from("castle"));
        assert!(matches!(result, Err(WorldError::UnknownStructure(_))));
        assert_eq!(catalog.structure(&StructureKey::from("prison")).unwrap().imprison_capacity, 4);
    }

    #[test]
    fn catalog_round_trips_through_yaml() {
        let catalog = Catalog::standard();
        let yaml = serde_yml::to_string(&catalog).unwrap();
        let parsed = Catalog::parse(&yaml).unwrap();
        assert_eq!(parsed, catalog);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut catalog = Catalog::standard();
        let first = catalog.structures.first().cloned().unwrap();
        catalog.structures.push(first);
        assert!(matches!(catalog.validate(), Err(WorldError::DuplicateEntry(_))));
    }

    #[test]
    fn outcome_table_selects_by_grade() {
        let catalog = Catalog::standard();
        let riot = catalog.incident("riot").unwrap();
        assert_eq!(
            riot.outcomes.for_grade(OutcomeGrade::Failure).commands,
            vec![Command::DamageStructure { count: 1 }]
        );
        assert!(riot.outcomes.for_grade(OutcomeGrade::Success).commands.is_empty());
    }
}
