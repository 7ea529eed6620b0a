//! Base building: the slot grid, building catalog, production and
//! expansions.

pub mod catalog;
pub mod config;
pub mod system;

pub use catalog::{BuildingCatalog, BuildingDef, BuildingEffect, MAIN_BASE};
pub use config::{ExpansionStep, TerritoryConfig, HOUR_MS};
pub use system::{
    Building, BuildingId, SlotState, TerritoryBonuses, TerritoryError, TerritorySystem,
};
