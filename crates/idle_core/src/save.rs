//! JSON save format.
//!
//! One object per save slot. Loading is tolerant: a missing or malformed
//! section falls back to its default, and a malformed entry in a list
//! (a building, a pet) is dropped on its own, so one bad value never
//! rejects a whole save.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{GameError, Result};
use crate::pet::{FormationGroup, Pet, PetId, PetSystem};
use crate::player::PlayerStats;
use crate::resources::{ResourceLedger, Resources};
use crate::territory::{Building, BuildingId, TerritorySystem};

/// Format version written by this build.
pub const SAVE_VERSION: u32 = 1;

/// Columns of the territory grid, used for saved building positions.
pub const GRID_COLUMNS: usize = 4;

/// A complete save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SaveData {
    /// Format version.
    pub version: u32,
    /// Wall-clock time of the save in milliseconds.
    pub timestamp: u64,
    /// Player progression.
    pub player: PlayerStats,
    /// Base grid.
    pub territory: TerritorySave,
    /// Wallet.
    pub resources: ResourcesSave,
    /// Combat tunables.
    pub combat: CombatSave,
    /// Pet roster and formation.
    pub pets: PetsSave,
    /// Opaque equipment blob, carried through unchanged.
    pub equipment: Value,
}

/// Grid cell of a saved building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPosition {
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
}

impl GridPosition {
    /// Cell of `slot` in a [`GRID_COLUMNS`] wide grid.
    #[must_use]
    pub const fn of_slot(slot: usize) -> Self {
        Self {
            x: slot % GRID_COLUMNS,
            y: slot / GRID_COLUMNS,
        }
    }
}

/// One saved building.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildingSave {
    /// Building id.
    pub id: BuildingId,
    /// Catalog key.
    #[serde(rename = "type")]
    pub kind: String,
    /// Grid slot.
    pub slot_index: usize,
    /// Level.
    pub level: u32,
    /// Timestamp production is measured from.
    pub last_production: u64,
    /// Grid cell; informational, the slot index is authoritative.
    pub position: GridPosition,
}

impl From<&Building> for BuildingSave {
    fn from(building: &Building) -> Self {
        Self {
            id: building.id,
            kind: building.kind.clone(),
            slot_index: building.slot_index,
            level: building.level,
            last_production: building.last_production,
            position: GridPosition::of_slot(building.slot_index),
        }
    }
}

impl From<BuildingSave> for Building {
    fn from(save: BuildingSave) -> Self {
        Self {
            id: save.id,
            kind: save.kind,
            slot_index: save.slot_index,
            level: save.level,
            last_production: save.last_production,
        }
    }
}

/// Saved territory section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TerritorySave {
    /// Buildings on the grid.
    #[serde(deserialize_with = "lenient_list")]
    pub buildings: Vec<BuildingSave>,
    /// Unlocked slots; recomputed from `expansion_count` on load.
    pub unlocked_slots: usize,
    /// Expansions bought.
    pub expansion_count: usize,
    /// Last production collection.
    pub last_production_time: u64,
}

impl TerritorySave {
    /// Capture the grid.
    #[must_use]
    pub fn capture(territory: &TerritorySystem) -> Self {
        Self {
            buildings: territory.buildings().iter().map(BuildingSave::from).collect(),
            unlocked_slots: territory.unlocked_slot_count(),
            expansion_count: territory.expansion_count(),
            last_production_time: territory.last_production_time(),
        }
    }

    /// Load into `territory`, replacing its grid.
    pub fn apply(self, territory: &mut TerritorySystem) {
        let buildings = self.buildings.into_iter().map(Building::from).collect();
        territory.restore(buildings, self.expansion_count, self.last_production_time);
        if territory.unlocked_slot_count() != self.unlocked_slots {
            tracing::warn!(
                saved = self.unlocked_slots,
                derived = territory.unlocked_slot_count(),
                "Saved unlocked slot count disagrees with expansions"
            );
        }
    }
}

/// Saved wallet. Numbers are sanitized on load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesSave {
    /// Coins.
    pub coins: f64,
    /// Rubies.
    pub rubies: f64,
    /// Crystals.
    pub crystals: f64,
}

impl ResourcesSave {
    /// Capture a wallet.
    #[must_use]
    pub fn capture(ledger: &dyn ResourceLedger) -> Self {
        Self {
            coins: ledger.coins() as f64,
            rubies: ledger.rubies() as f64,
            crystals: ledger.crystals() as f64,
        }
    }

    /// Wallet with negative and non-finite amounts zeroed.
    #[must_use]
    pub fn to_resources(self) -> Resources {
        Resources::from_raw(self.coins, self.crystals, self.rubies)
    }
}

/// Saved combat tunables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CombatSave {
    /// Enemy spawn interval in milliseconds.
    pub monster_spawn_interval: f64,
    /// Player shot interval at save time; derived from stats, not restored.
    pub attack_interval: f64,
    /// Auto-attack reach.
    pub attack_range: f64,
}

/// Saved formation rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationSave {
    /// Front row by column.
    pub front: Vec<Option<PetId>>,
    /// Back row by column.
    pub back: Vec<Option<PetId>>,
}

/// Saved pet section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PetsSave {
    /// Every owned pet.
    #[serde(deserialize_with = "lenient_list")]
    pub owned_pets: Vec<Pet>,
    /// Formation.
    pub slots: FormationSave,
}

impl PetsSave {
    /// Capture the roster and formation.
    #[must_use]
    pub fn capture(pets: &PetSystem) -> Self {
        Self {
            owned_pets: pets.pets().to_vec(),
            slots: FormationSave {
                front: pets.formation_row(FormationGroup::Front).to_vec(),
                back: pets.formation_row(FormationGroup::Back).to_vec(),
            },
        }
    }

    /// Load into `pets`, replacing the roster.
    pub fn apply(self, pets: &mut PetSystem) {
        pets.restore(self.owned_pets, &self.slots.front, &self.slots.back);
    }
}

impl SaveData {
    /// Encode as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented in JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| GameError::SaveEncode(e.to_string()))
    }

    /// Decode a save, tolerating missing and malformed sections.
    ///
    /// # Errors
    ///
    /// Returns an error only if the text is not a JSON object.
    pub fn from_json(source: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(source).map_err(|e| GameError::SaveParse(e.to_string()))?;
        let Value::Object(root) = value else {
            return Err(GameError::SaveParse("save root is not an object".into()));
        };

        Ok(Self {
            version: section(&root, "version"),
            timestamp: section(&root, "timestamp"),
            player: section(&root, "player"),
            territory: section(&root, "territory"),
            resources: section(&root, "resources"),
            combat: section(&root, "combat"),
            pets: section(&root, "pets"),
            equipment: root.get("equipment").cloned().unwrap_or(Value::Null),
        })
    }
}

fn section<T: DeserializeOwned + Default>(root: &Map<String, Value>, key: &str) -> T {
    match root.get(key) {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            tracing::warn!(section = key, error = %e, "Ignoring malformed save section");
            T::default()
        }),
    }
}

fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed save entry");
                None
            }
        })
        .collect())
}
