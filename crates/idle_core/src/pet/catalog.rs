//! Static pet templates.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, Fixed};

/// Collection tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// Starter tier.
    Common,
    /// Second tier.
    Rare,
    /// Third tier.
    Epic,
    /// Top tier.
    Legendary,
}

/// Elemental affinity. Flavour only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// Fire.
    Fire,
    /// Ice.
    Ice,
    /// Lightning.
    Lightning,
    /// Holy.
    Holy,
    /// Earth.
    Earth,
}

/// Payload of a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillKind {
    /// Area damage.
    Damage,
    /// Area damage plus a speed multiplier for a while.
    Slow {
        /// Speed scalar while slowed.
        #[serde(with = "fixed_decimal")]
        multiplier: Fixed,
        /// Slow duration in milliseconds.
        duration_ms: u32,
    },
    /// Area damage plus a movement stop.
    Stun {
        /// Stun duration in milliseconds.
        duration_ms: u32,
    },
    /// Heals every deployed pet once.
    Heal,
}

impl SkillKind {
    /// Whether the skill targets allies instead of enemies.
    #[must_use]
    pub const fn is_support(&self) -> bool {
        matches!(self, Self::Heal)
    }
}

/// The single skill a template carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkillDef {
    /// Skill key.
    pub id: String,
    /// Damage or heal as a percentage of the pet's attack.
    pub power_percent: u32,
    /// Time between casts in milliseconds.
    pub cooldown_ms: u32,
    /// Payload.
    pub kind: SkillKind,
}

impl SkillDef {
    /// Damage or heal amount for a pet with `attack`.
    #[must_use]
    pub fn amount(&self, attack: i32) -> u32 {
        let attack = u64::try_from(attack.max(0)).unwrap_or(0);
        u32::try_from(attack * u64::from(self.power_percent) / 100).unwrap_or(u32::MAX)
    }
}

/// Attack, hit points and defense.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatBlock {
    /// Attack.
    pub attack: i32,
    /// Hit points.
    pub hp: i32,
    /// Defense.
    pub defense: i32,
}

/// Catalog entry a pet is created from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PetTemplate {
    /// Template key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Tier.
    pub rarity: Rarity,
    /// Affinity.
    pub element: Element,
    /// Level 1 stats.
    pub base: StatBlock,
    /// Stats gained per level.
    pub growth: StatBlock,
    /// Basic attacks per second.
    #[serde(with = "fixed_decimal")]
    pub attack_speed: Fixed,
    /// Skill.
    pub skill: SkillDef,
    /// Player level needed to unlock.
    pub unlock_level: u32,
    /// Coins needed to unlock.
    pub unlock_cost: u64,
}

/// Every pet that can be unlocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PetCatalog {
    templates: Vec<PetTemplate>,
}

impl PetCatalog {
    /// Build a catalog from templates.
    #[must_use]
    pub fn new(templates: Vec<PetTemplate>) -> Self {
        Self { templates }
    }

    /// Parse a RON list of [`PetTemplate`] and validate it.
    pub fn from_ron(name: &str, source: &str) -> Result<Self> {
        let templates: Vec<PetTemplate> =
            ron::from_str(source).map_err(|e| GameError::CatalogParse {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        let catalog = Self::new(templates);
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

    /// Look up a template.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PetTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// All templates in catalog order.
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, PetTemplate> {
        self.templates.iter()
    }

    /// Invariant violations, empty when usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (index, template) in self.templates.iter().enumerate() {
            if self.templates[..index].iter().any(|t| t.id == template.id) {
                problems.push(format!("duplicate pet id '{}'", template.id));
            }
            if template.attack_speed <= Fixed::ZERO {
                problems.push(format!("'{}' has non-positive attack_speed", template.id));
            }
            if template.skill.cooldown_ms == 0 {
                problems.push(format!("'{}' skill has zero cooldown", template.id));
            }
            if template.base.hp <= 0 {
                problems.push(format!("'{}' has non-positive hp", template.id));
            }
        }
        problems
    }

    /// The shipped pets.
    #[must_use]
    pub fn builtin() -> Self {
        let stats = |attack, hp, defense| StatBlock { attack, hp, defense };
        let skill = |id: &str, power_percent, cooldown_ms, kind| SkillDef {
            id: id.to_string(),
            power_percent,
            cooldown_ms,
            kind,
        };

        Self::new(vec![
            PetTemplate {
                id: "ember_cub".into(),
                name: "Ember Cub".into(),
                rarity: Rarity::Common,
                element: Element::Fire,
                base: stats(8, 60, 2),
                growth: stats(2, 10, 1),
                attack_speed: Fixed::from_num(1),
                skill: skill("fireball", 200, 5000, SkillKind::Damage),
                unlock_level: 1,
                unlock_cost: 500,
            },
            PetTemplate {
                id: "frost_fox".into(),
                name: "Frost Fox".into(),
                rarity: Rarity::Rare,
                element: Element::Ice,
                base: stats(6, 70, 3),
                growth: stats(2, 12, 1),
                attack_speed: Fixed::from_num(1.2),
                skill: skill(
                    "frost_nova",
                    100,
                    6000,
                    SkillKind::Slow {
                        multiplier: Fixed::from_num(0.5),
                        duration_ms: 2000,
                    },
                ),
                unlock_level: 3,
                unlock_cost: 2000,
            },
            PetTemplate {
                id: "storm_hawk".into(),
                name: "Storm Hawk".into(),
                rarity: Rarity::Epic,
                element: Element::Lightning,
                base: stats(10, 50, 2),
                growth: stats(3, 8, 1),
                attack_speed: Fixed::from_num(1.5),
                skill: skill("thunder_strike", 150, 8000, SkillKind::Stun { duration_ms: 1000 }),
                unlock_level: 5,
                unlock_cost: 8000,
            },
            PetTemplate {
                id: "dawn_sprite".into(),
                name: "Dawn Sprite".into(),
                rarity: Rarity::Rare,
                element: Element::Holy,
                base: stats(5, 80, 4),
                growth: stats(1, 15, 1),
                attack_speed: Fixed::from_num(0.8),
                skill: skill("holy_light", 200, 7000, SkillKind::Heal),
                unlock_level: 4,
                unlock_cost: 3000,
            },
            PetTemplate {
                id: "stone_tortoise".into(),
                name: "Stone Tortoise".into(),
                rarity: Rarity::Legendary,
                element: Element::Earth,
                base: stats(7, 150, 8),
                growth: stats(2, 25, 2),
                attack_speed: Fixed::from_num(0.6),
                skill: skill("earthquake", 120, 10_000, SkillKind::Stun { duration_ms: 500 }),
                unlock_level: 8,
                unlock_cost: 20_000,
            },
        ])
    }
}

impl Default for PetCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let catalog = PetCatalog::builtin();
        assert!(catalog.validate().is_empty());
        assert_eq!(catalog.iter().count(), 5);
    }

    #[test]
    fn test_skill_amount_is_percent_of_attack() {
        let catalog = PetCatalog::builtin();
        let tortoise = catalog.get("stone_tortoise").unwrap();
        // 10 * 120% = 12 exactly, no float drift
        assert_eq!(tortoise.skill.amount(10), 12);
        assert_eq!(catalog.get("ember_cub").unwrap().skill.amount(8), 16);
        assert!(catalog.get("dawn_sprite").unwrap().skill.kind.is_support());
    }

    #[test]
    fn test_from_ron_round_trips_builtin() {
        let source = ron::to_string(&PetCatalog::builtin()).unwrap();
        let parsed = PetCatalog::from_ron("builtin", &source).unwrap();
        assert_eq!(parsed.get("frost_fox"), PetCatalog::builtin().get("frost_fox"));
    }

    #[test]
    fn test_validate_flags_duplicates() {
        let mut templates: Vec<PetTemplate> = PetCatalog::builtin().iter().cloned().collect();
        templates.push(templates[0].clone());
        let problems = PetCatalog::new(templates).validate();
        assert_eq!(problems, vec!["duplicate pet id 'ember_cub'".to_string()]);
    }
}
