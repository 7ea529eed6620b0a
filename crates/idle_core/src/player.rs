//! Player stat model.
//!
//! Stored state is small: level, experience, three base attributes and
//! one level per purchasable upgrade. Everything combat reads is derived
//! on demand, with territory bonuses folded in, and exposed through
//! [`StatProvider`] so the combat controller never sees the territory.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::damage::AttackerStats;
use crate::math::Fixed;
use crate::resources::ResourceLedger;
use crate::territory::TerritoryBonuses;

/// Attribute points granted per level gained.
pub const POINTS_PER_LEVEL: u32 = 3;

/// Starting value of every base attribute.
pub const STARTING_ATTRIBUTE: u32 = 5;

/// Crit rate cap in percent.
pub const MAX_CRIT_RATE: i32 = 100;

/// Dodge cap in percent.
pub const MAX_DODGE: i32 = 75;

/// Highest value a base attribute can reach.
pub const MAX_ATTRIBUTE: u32 = 1_000_000;

/// Highest level any single upgrade can reach.
pub const MAX_UPGRADE_LEVEL: u32 = 100_000;

/// Growth of every upgrade price per level bought.
pub const UPGRADE_COST_GROWTH: f64 = 1.15;

/// Derived combat values consumed by the combat controller.
pub trait StatProvider {
    /// Damage per shot before defense.
    fn attack(&self) -> Fixed;
    /// Crit chance in percent.
    fn crit_rate(&self) -> Fixed;
    /// Crit damage multiplier in percent.
    fn crit_damage(&self) -> Fixed;
    /// Shots per second.
    fn attack_speed(&self) -> Fixed;
    /// Dodge chance in percent.
    fn dodge(&self) -> Fixed;

    /// Snapshot carried by a fired projectile.
    fn attacker_stats(&self) -> AttackerStats {
        AttackerStats {
            damage: self.attack(),
            crit: self.crit_rate(),
            crit_damage: self.crit_damage(),
        }
    }
}

/// A base attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Attack, defense and hit points.
    Strength,
    /// Attack speed, crit rate and dodge.
    Agility,
    /// Crit damage and regeneration.
    Intelligence,
}

/// Base attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    /// Strength.
    pub strength: u32,
    /// Agility.
    pub agility: u32,
    /// Intelligence.
    pub intelligence: u32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: STARTING_ATTRIBUTE,
            agility: STARTING_ATTRIBUTE,
            intelligence: STARTING_ATTRIBUTE,
        }
    }
}

impl Attributes {
    fn clamp(&mut self) {
        for attribute in [Attribute::Strength, Attribute::Agility, Attribute::Intelligence] {
            let value = self.get_mut(attribute);
            *value = (*value).min(MAX_ATTRIBUTE);
        }
    }

    fn get_mut(&mut self, attribute: Attribute) -> &mut u32 {
        match attribute {
            Attribute::Strength => &mut self.strength,
            Attribute::Agility => &mut self.agility,
            Attribute::Intelligence => &mut self.intelligence,
        }
    }
}

/// Purchasable flat upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    /// +2 attack per level.
    Attack,
    /// +1% crit rate per level.
    CritRate,
    /// +10% crit damage per level.
    CritDamage,
    /// +0.1 attacks per second per level.
    AttackSpeed,
    /// +1% dodge per level.
    Dodge,
    /// +20 max hit points per level.
    MaxHp,
}

impl UpgradeKind {
    /// Every upgrade.
    pub const ALL: [Self; 6] = [
        Self::Attack,
        Self::CritRate,
        Self::CritDamage,
        Self::AttackSpeed,
        Self::Dodge,
        Self::MaxHp,
    ];

    /// Price of the first level.
    #[must_use]
    pub const fn base_cost(self) -> u64 {
        match self {
            Self::Attack => 50,
            Self::CritRate => 100,
            Self::CritDamage => 100,
            Self::AttackSpeed => 150,
            Self::Dodge => 120,
            Self::MaxHp => 60,
        }
    }

    /// Lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::CritRate => "crit_rate",
            Self::CritDamage => "crit_damage",
            Self::AttackSpeed => "attack_speed",
            Self::Dodge => "dodge",
            Self::MaxHp => "max_hp",
        }
    }

    /// `floor(base_cost * 1.15 ^ level)` coins.
    #[must_use]
    pub fn cost_at(self, level: u32) -> u64 {
        let factor = UPGRADE_COST_GROWTH.powi(i32::try_from(level).unwrap_or(i32::MAX));
        let cost = (self.base_cost() as f64 * factor).floor();
        if cost.is_finite() && cost < u64::MAX as f64 {
            cost as u64
        } else {
            u64::MAX
        }
    }
}

/// Levels bought per upgrade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeLevels {
    /// Attack upgrade level.
    pub attack: u32,
    /// Crit rate upgrade level.
    pub crit_rate: u32,
    /// Crit damage upgrade level.
    pub crit_damage: u32,
    /// Attack speed upgrade level.
    pub attack_speed: u32,
    /// Dodge upgrade level.
    pub dodge: u32,
    /// Max hp upgrade level.
    pub max_hp: u32,
}

impl UpgradeLevels {
    /// Level of one upgrade.
    #[must_use]
    pub const fn get(&self, kind: UpgradeKind) -> u32 {
        match kind {
            UpgradeKind::Attack => self.attack,
            UpgradeKind::CritRate => self.crit_rate,
            UpgradeKind::CritDamage => self.crit_damage,
            UpgradeKind::AttackSpeed => self.attack_speed,
            UpgradeKind::Dodge => self.dodge,
            UpgradeKind::MaxHp => self.max_hp,
        }
    }

    fn clamp(&mut self) {
        for kind in UpgradeKind::ALL {
            let level = self.get_mut(kind);
            *level = (*level).min(MAX_UPGRADE_LEVEL);
        }
    }

    fn get_mut(&mut self, kind: UpgradeKind) -> &mut u32 {
        match kind {
            UpgradeKind::Attack => &mut self.attack,
            UpgradeKind::CritRate => &mut self.crit_rate,
            UpgradeKind::CritDamage => &mut self.crit_damage,
            UpgradeKind::AttackSpeed => &mut self.attack_speed,
            UpgradeKind::Dodge => &mut self.dodge,
            UpgradeKind::MaxHp => &mut self.max_hp,
        }
    }
}

/// Why a player action was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpgradeError {
    /// Wallet short of coins.
    #[error("not enough coins: need {0}")]
    InsufficientCoins(u64),
    /// Stat or upgrade already at its cap.
    #[error("{} is already at its cap", .0.as_str())]
    Capped(UpgradeKind),
    /// No attribute points to spend.
    #[error("no attribute points available")]
    NoPoints,
    /// Attribute already at [`MAX_ATTRIBUTE`].
    #[error("attribute is already at its cap")]
    AttributeCapped(Attribute),
}

/// Every derived value at once, for display and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedStats {
    /// Attack.
    pub attack: Fixed,
    /// Defense.
    pub defense: Fixed,
    /// Max hit points.
    pub max_hp: i32,
    /// Crit rate percent.
    pub crit_rate: Fixed,
    /// Crit damage percent.
    pub crit_damage: Fixed,
    /// Attacks per second.
    pub attack_speed: Fixed,
    /// Dodge percent.
    pub dodge: Fixed,
    /// Hit points regenerated per second.
    pub hp_regen: Fixed,
}

/// The player's persistent progression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    /// Level, starting at 1.
    pub level: u32,
    /// Experience toward the next level.
    pub exp: u64,
    /// Base attributes.
    pub attributes: Attributes,
    /// Points not yet spent on attributes.
    pub unallocated_points: u32,
    /// Bought upgrade levels.
    pub upgrades: UpgradeLevels,
    /// Territory bonuses folded into derived stats.
    #[serde(skip)]
    pub bonuses: TerritoryBonuses,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            level: 1,
            exp: 0,
            attributes: Attributes::default(),
            unallocated_points: 0,
            upgrades: UpgradeLevels::default(),
            bonuses: TerritoryBonuses::default(),
        }
    }
}

impl PlayerStats {
    /// Fresh level 1 player.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Experience needed to leave the current level.
    #[must_use]
    pub fn exp_to_next(&self) -> u64 {
        100 * u64::from(self.level.max(1))
    }

    /// Clamp persisted values into their valid ranges.
    pub fn sanitize(&mut self) {
        self.level = self.level.max(1);
        self.attributes.clamp();
        self.upgrades.clamp();
    }

    /// Replace the folded territory bonuses.
    pub fn set_territory_bonuses(&mut self, bonuses: TerritoryBonuses) {
        self.bonuses = bonuses;
    }

    /// Experience a kill worth `base` grants after the territory bonus.
    #[must_use]
    pub fn kill_exp(&self, base: u64) -> u64 {
        base.saturating_mul(100 + self.bonuses.exp_percent) / 100
    }

    /// Add experience and resolve level-ups. Returns levels gained.
    pub fn gain_exp(&mut self, amount: u64) -> u32 {
        self.exp = self.exp.saturating_add(amount);
        let mut gained = 0;
        while self.exp >= self.exp_to_next() {
            self.exp -= self.exp_to_next();
            self.level = self.level.saturating_add(1);
            self.unallocated_points = self.unallocated_points.saturating_add(POINTS_PER_LEVEL);
            gained += 1;
        }
        if gained > 0 {
            tracing::info!(level = self.level, points = self.unallocated_points, "Player leveled up");
        }
        gained
    }

    /// Spend one attribute point.
    pub fn allocate_point(&mut self, attribute: Attribute) -> Result<u32, UpgradeError> {
        if self.unallocated_points == 0 {
            return Err(UpgradeError::NoPoints);
        }
        let value = self.attributes.get_mut(attribute);
        if *value >= MAX_ATTRIBUTE {
            return Err(UpgradeError::AttributeCapped(attribute));
        }
        *value += 1;
        let value = *value;
        self.unallocated_points -= 1;
        Ok(value)
    }

    /// Price of the next level of `kind`.
    #[must_use]
    pub fn upgrade_cost(&self, kind: UpgradeKind) -> u64 {
        kind.cost_at(self.upgrades.get(kind))
    }

    /// Buy one level of `kind`. Returns the new upgrade level.
    pub fn purchase_upgrade(
        &mut self,
        kind: UpgradeKind,
        ledger: &mut dyn ResourceLedger,
    ) -> Result<u32, UpgradeError> {
        let capped = match kind {
            UpgradeKind::CritRate => self.crit_rate() >= Fixed::from_num(MAX_CRIT_RATE),
            UpgradeKind::Dodge => self.dodge() >= Fixed::from_num(MAX_DODGE),
            _ => self.upgrades.get(kind) >= MAX_UPGRADE_LEVEL,
        };
        if capped {
            return Err(UpgradeError::Capped(kind));
        }
        let cost = self.upgrade_cost(kind);
        if !ledger.spend_coins(cost) {
            return Err(UpgradeError::InsufficientCoins(cost));
        }

        let level = self.upgrades.get_mut(kind);
        *level += 1;
        let level = *level;
        tracing::info!(upgrade = kind.as_str(), level, cost, "Upgrade purchased");
        Ok(level)
    }

    /// Flat damage reduction.
    #[must_use]
    pub fn defense(&self) -> Fixed {
        let half_strength = Fixed::saturating_from_num(self.attributes.strength) / 2;
        Fixed::from_num(5)
            .saturating_add(half_strength)
            .saturating_add(Fixed::saturating_from_num(self.bonuses.defense))
    }

    /// Hit point cap.
    #[must_use]
    pub fn max_hp(&self) -> i32 {
        let hp = 100 + 10 * i64::from(self.attributes.strength) + 20 * i64::from(self.upgrades.max_hp);
        i32::try_from(hp).unwrap_or(i32::MAX)
    }

    /// Hit points regenerated per second.
    #[must_use]
    pub fn hp_regen(&self) -> Fixed {
        Fixed::saturating_from_num(self.attributes.intelligence) / 2
    }

    /// Every derived value.
    #[must_use]
    pub fn derived(&self) -> DerivedStats {
        DerivedStats {
            attack: self.attack(),
            defense: self.defense(),
            max_hp: self.max_hp(),
            crit_rate: self.crit_rate(),
            crit_damage: self.crit_damage(),
            attack_speed: self.attack_speed(),
            dodge: self.dodge(),
            hp_regen: self.hp_regen(),
        }
    }
}

impl StatProvider for PlayerStats {
    fn attack(&self) -> Fixed {
        let flat = 10
            + 2 * i64::from(self.upgrades.attack)
            + 2 * i64::from(self.attributes.strength);
        Fixed::saturating_from_num(flat)
            .saturating_add(Fixed::saturating_from_num(self.bonuses.attack))
    }

    fn crit_rate(&self) -> Fixed {
        let rate = Fixed::saturating_from_num(5 + i64::from(self.upgrades.crit_rate))
            .saturating_add(Fixed::saturating_from_num(self.attributes.agility) / 5);
        rate.min(Fixed::from_num(MAX_CRIT_RATE))
    }

    fn crit_damage(&self) -> Fixed {
        let percent = 150
            + 10 * i64::from(self.upgrades.crit_damage)
            + i64::from(self.attributes.intelligence);
        Fixed::saturating_from_num(percent)
    }

    fn attack_speed(&self) -> Fixed {
        Fixed::from_num(1)
            .saturating_add(Fixed::saturating_from_num(self.upgrades.attack_speed) / 10)
            .saturating_add(Fixed::saturating_from_num(self.attributes.agility) / 100)
    }

    fn dodge(&self) -> Fixed {
        let dodge = (Fixed::saturating_from_num(self.attributes.agility) / 10)
            .saturating_add(Fixed::saturating_from_num(self.upgrades.dodge));
        dodge.min(Fixed::from_num(MAX_DODGE))
    }
}
