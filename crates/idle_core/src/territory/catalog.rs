//! Building catalog: costs, level caps, effects and production timing.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::resources::{Cost, ResourceKind};

/// Catalog key of the unique headquarters building.
pub const MAIN_BASE: &str = "main_base";

/// What a building does, scaled by its level when read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingEffect {
    /// Headquarters marker; its level gates expansions.
    SlotUnlock {
        /// Magnitude per level.
        value: u64,
    },
    /// Flat player attack per level.
    AttackBonus {
        /// Magnitude per level.
        value: u64,
    },
    /// Flat player defense per level.
    DefenseBonus {
        /// Magnitude per level.
        value: u64,
    },
    /// Both attack and defense per level.
    CombatBonus {
        /// Attack per level.
        attack: u64,
        /// Defense per level.
        defense: u64,
    },
    /// Periodic resource output per level.
    Production {
        /// Produced currency.
        resource: ResourceKind,
        /// Output per cycle per level.
        value: u64,
    },
    /// Percent bonus to kill experience per level.
    ExpBonus {
        /// Percent per level.
        value: u64,
    },
}

/// Data-driven building definition.
///
/// # Example RON
///
/// ```ron
/// BuildingDef(
///     id: "gold_mine",
///     name: "Gold Mine",
///     base_cost: (coins: 200, crystals: 0),
///     cost_multiplier: 1.5,
///     max_level: 20,
///     effect: Production(resource: coins, value: 50),
///     production_interval_ms: 60000,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingDef {
    /// Unique catalog key.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Flavour text.
    #[serde(default)]
    pub description: String,

    /// Price of level 1; also the basis of upgrade and refund amounts.
    pub base_cost: Cost,

    /// Geometric growth of the upgrade price per level.
    pub cost_multiplier: f64,

    /// Highest reachable level.
    pub max_level: u32,

    /// Effect per level.
    pub effect: BuildingEffect,

    /// Production cycle length; zero means the building never produces.
    #[serde(default)]
    pub production_interval_ms: u64,
}

impl BuildingDef {
    /// Whether this is the unique headquarters type.
    #[must_use]
    pub fn is_main_base(&self) -> bool {
        self.id == MAIN_BASE
    }

    /// Price of upgrading from `current_level`:
    /// `floor(base_cost * cost_multiplier ^ current_level)` per currency.
    #[must_use]
    pub fn upgrade_cost(&self, current_level: u32) -> Cost {
        let factor = self
            .cost_multiplier
            .powi(i32::try_from(current_level).unwrap_or(i32::MAX));
        let scale = |amount: u64| {
            let scaled = (amount as f64 * factor).floor();
            if scaled.is_finite() && scaled < u64::MAX as f64 {
                scaled as u64
            } else {
                u64::MAX
            }
        };
        Cost::new(scale(self.base_cost.coins), scale(self.base_cost.crystals))
    }

    /// Half the base cost, floored per currency.
    #[must_use]
    pub const fn demolish_refund(&self) -> Cost {
        self.base_cost.half()
    }

    /// Produced currency and per-level output, if this building produces.
    #[must_use]
    pub const fn production(&self) -> Option<(ResourceKind, u64)> {
        match self.effect {
            BuildingEffect::Production { resource, value } if self.production_interval_ms > 0 => {
                Some((resource, value))
            }
            _ => None,
        }
    }
}

/// Every building type the territory can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingCatalog {
    buildings: Vec<BuildingDef>,
}

impl BuildingCatalog {
    /// Build a catalog from definitions.
    #[must_use]
    pub fn new(buildings: Vec<BuildingDef>) -> Self {
        Self { buildings }
    }

    /// Parse a RON list of [`BuildingDef`] and validate it.
    pub fn from_ron(name: &str, source: &str) -> Result<Self> {
        let buildings: Vec<BuildingDef> =
            ron::from_str(source).map_err(|e| GameError::CatalogParse {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        let catalog = Self::new(buildings);
        let problems = catalog.validate();
        if problems.is_empty() {
            Ok(catalog)
        } else {
            Err(GameError::CatalogInvalid {
                name: name.to_string(),
                problems,
            })
        }
    }

    /// Look up a definition by key.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&BuildingDef> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// All definitions in catalog order.
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, BuildingDef> {
        self.buildings.iter()
    }

    /// Invariant violations, empty when the catalog is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for (index, def) in self.buildings.iter().enumerate() {
            if self.buildings[..index].iter().any(|b| b.id == def.id) {
                problems.push(format!("duplicate building id '{}'", def.id));
            }
            if def.max_level == 0 {
                problems.push(format!("'{}' has max_level 0", def.id));
            }
            if !def.cost_multiplier.is_finite() || def.cost_multiplier < 1.0 {
                problems.push(format!(
                    "'{}' has cost_multiplier {} below 1",
                    def.id, def.cost_multiplier
                ));
            }
            if matches!(def.effect, BuildingEffect::Production { .. })
                && def.production_interval_ms == 0
            {
                problems.push(format!("'{}' produces with a zero interval", def.id));
            }
        }

        if self.get(MAIN_BASE).is_none() {
            problems.push(format!("catalog has no '{MAIN_BASE}'"));
        }

        problems
    }

    /// The shipped catalog.
    #[must_use]
    pub fn builtin() -> Self {
        fn def(
            id: &str,
            name: &str,
            description: &str,
            base_cost: Cost,
            cost_multiplier: f64,
            max_level: u32,
            effect: BuildingEffect,
            production_interval_ms: u64,
        ) -> BuildingDef {
            BuildingDef {
                id: id.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                base_cost,
                cost_multiplier,
                max_level,
                effect,
                production_interval_ms,
            }
        }

        Self::new(vec![
            def(
                MAIN_BASE,
                "Main Base",
                "Headquarters. Its level unlocks territory expansions.",
                Cost::new(500, 0),
                2.0,
                10,
                BuildingEffect::SlotUnlock { value: 1 },
                0,
            ),
            def(
                "gold_mine",
                "Gold Mine",
                "Digs up coins every minute.",
                Cost::new(200, 0),
                1.5,
                20,
                BuildingEffect::Production {
                    resource: ResourceKind::Coins,
                    value: 50,
                },
                60_000,
            ),
            def(
                "crystal_mine",
                "Crystal Mine",
                "Grows crystals every five minutes.",
                Cost::new(500, 20),
                1.6,
                15,
                BuildingEffect::Production {
                    resource: ResourceKind::Crystals,
                    value: 5,
                },
                300_000,
            ),
            def(
                "ruby_mine",
                "Ruby Mine",
                "Unearths a ruby every hour.",
                Cost::new(5000, 200),
                2.0,
                10,
                BuildingEffect::Production {
                    resource: ResourceKind::Rubies,
                    value: 1,
                },
                3_600_000,
            ),
            def(
                "barracks",
                "Barracks",
                "Raises attack.",
                Cost::new(800, 50),
                1.7,
                10,
                BuildingEffect::AttackBonus { value: 5 },
                0,
            ),
            def(
                "wall",
                "Wall",
                "Raises defense.",
                Cost::new(600, 30),
                1.6,
                10,
                BuildingEffect::DefenseBonus { value: 3 },
                0,
            ),
            def(
                "training_ground",
                "Training Ground",
                "Raises attack and defense.",
                Cost::new(1500, 150),
                1.8,
                10,
                BuildingEffect::CombatBonus {
                    attack: 3,
                    defense: 2,
                },
                0,
            ),
            def(
                "workshop",
                "Workshop",
                "Increases experience from kills.",
                Cost::new(1000, 100),
                1.8,
                10,
                BuildingEffect::ExpBonus { value: 5 },
                0,
            ),
        ])
    }
}

impl Default for BuildingCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        assert!(BuildingCatalog::builtin().validate().is_empty());
    }

    #[test]
    fn test_upgrade_cost_grows_geometrically() {
        let catalog = BuildingCatalog::builtin();
        let base = catalog.get(MAIN_BASE).unwrap();
        assert_eq!(base.upgrade_cost(1), Cost::new(1000, 0));
        assert_eq!(base.upgrade_cost(3), Cost::new(4000, 0));

        let mine = catalog.get("gold_mine").unwrap();
        // 200 * 1.5^3 = 675
        assert_eq!(mine.upgrade_cost(3), Cost::new(675, 0));
    }

    #[test]
    fn test_workshop_refund_is_half() {
        let catalog = BuildingCatalog::builtin();
        let workshop = catalog.get("workshop").unwrap();
        assert_eq!(workshop.base_cost, Cost::new(1000, 100));
        assert_eq!(workshop.demolish_refund(), Cost::new(500, 50));
    }

    #[test]
    fn test_production_only_with_interval() {
        let catalog = BuildingCatalog::builtin();
        assert_eq!(
            catalog.get("gold_mine").unwrap().production(),
            Some((ResourceKind::Coins, 50))
        );
        assert_eq!(catalog.get("barracks").unwrap().production(), None);
    }

    #[test]
    fn test_from_ron_parses_and_validates() {
        let source = r#"[
            (
                id: "main_base",
                name: "HQ",
                base_cost: (coins: 100, crystals: 0),
                cost_multiplier: 2.0,
                max_level: 5,
                effect: SlotUnlock(value: 1),
            ),
            (
                id: "farm",
                name: "Farm",
                base_cost: (coins: 10),
                cost_multiplier: 1.2,
                max_level: 3,
                effect: Production(resource: coins, value: 4),
                production_interval_ms: 1000,
            ),
        ]"#;
        let catalog = BuildingCatalog::from_ron("test", source).unwrap();
        assert_eq!(catalog.iter().count(), 2);
        assert_eq!(catalog.get("farm").unwrap().production(), Some((ResourceKind::Coins, 4)));
    }

    #[test]
    fn test_from_ron_rejects_invalid() {
        let source = r#"[
            (
                id: "farm",
                name: "Farm",
                base_cost: (coins: 10),
                cost_multiplier: 0.5,
                max_level: 0,
                effect: Production(resource: coins, value: 4),
            ),
        ]"#;
        let err = BuildingCatalog::from_ron("bad", source).unwrap_err();
        match err {
            GameError::CatalogInvalid { problems, .. } => assert_eq!(problems.len(), 4),
            other => panic!("unexpected error: {other}"),
        }
    }
}
