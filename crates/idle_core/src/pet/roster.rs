//! Owned pets: progression, care needs and formation placement.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::PetTemplate;
use crate::math::{fixed_serde, Fixed};

/// Identifier of an owned pet.
pub type PetId = u32;

/// Slots per formation row.
pub const FORMATION_SIZE: usize = 3;

/// Upper bound of every care stat.
pub const CARE_MAX: u32 = 100;

/// Hunger lost per elapsed hunger step.
pub const HUNGER_DECAY: u32 = 10;

/// Length of one hunger step in milliseconds.
pub const HUNGER_STEP_MS: u64 = 600_000;

/// Energy regained per elapsed energy step.
pub const ENERGY_REGEN: u32 = 20;

/// Length of one energy step in milliseconds.
pub const ENERGY_STEP_MS: u64 = 3_600_000;

/// Energy one training session costs.
pub const TRAIN_ENERGY_COST: u32 = 20;

/// Experience needed for level 2.
pub const BASE_EXP_TO_NEXT: u64 = 100;

/// Formation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationGroup {
    /// Row closer to the enemies.
    Front,
    /// Row behind it.
    Back,
}

impl FormationGroup {
    /// Lowercase name used in logs and saves.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
        }
    }
}

/// One formation position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormationSlot {
    /// Row.
    pub group: FormationGroup,
    /// Column, `0..FORMATION_SIZE`.
    pub index: usize,
}

impl FormationSlot {
    /// Create a slot reference.
    #[must_use]
    pub const fn new(group: FormationGroup, index: usize) -> Self {
        Self { group, index }
    }
}

/// Where a pet is and the combat timers that only exist while deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Deployment {
    /// Not in the formation.
    #[default]
    Benched,
    /// Fighting from `slot`.
    Deployed {
        /// Occupied position.
        slot: FormationSlot,
        /// Time since the last basic attack, in milliseconds.
        #[serde(with = "fixed_serde")]
        attack_timer: Fixed,
        /// Time since the last skill cast, in milliseconds.
        #[serde(with = "fixed_serde")]
        skill_timer: Fixed,
    },
}

/// Why a pet action was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PetError {
    /// Template not in the catalog.
    #[error("unknown pet '{0}'")]
    UnknownTemplate(String),
    /// Template already unlocked.
    #[error("'{0}' is already unlocked")]
    AlreadyOwned(String),
    /// Player level below the unlock gate.
    #[error("requires player level {required} (current {current})")]
    LevelTooLow {
        /// Needed level.
        required: u32,
        /// Current level.
        current: u32,
    },
    /// Wallet short of coins.
    #[error("not enough coins: need {0}")]
    InsufficientCoins(u64),
    /// No owned pet with that id.
    #[error("pet {0} not found")]
    UnknownPet(PetId),
    /// Formation position does not exist.
    #[error("formation slot {0} does not exist")]
    InvalidSlot(usize),
    /// Feeding a full pet.
    #[error("pet is not hungry")]
    NotHungry,
    /// Training without energy.
    #[error("pet is too tired to train (energy {0})")]
    TooTired(u32),
    /// Leveling without enough experience.
    #[error("not enough experience: {have}/{need}")]
    NotEnoughExp {
        /// Current experience.
        have: u64,
        /// Required experience.
        need: u64,
    },
}

/// An owned pet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pet {
    /// Unique instance id.
    pub id: PetId,
    /// Catalog key.
    pub template_id: String,
    /// Level, starting at 1.
    pub level: u32,
    /// Experience toward the next level.
    pub exp: u64,
    /// Experience the next level needs.
    pub exp_to_next: u64,
    /// Attack.
    pub attack: i32,
    /// Hit point cap.
    pub max_hp: i32,
    /// Current hit points.
    pub current_hp: i32,
    /// Defense.
    pub defense: i32,
    /// Basic attacks per second.
    #[serde(with = "fixed_serde")]
    pub attack_speed: Fixed,
    /// Bond, `0..=100`.
    pub friendship: u32,
    /// Fullness, `0..=100`; decays from `last_feed_time`.
    pub hunger: u32,
    /// Stamina, `0..=100`; regenerates from `last_train_time`.
    pub energy: u32,
    /// Energy right after the last training session.
    pub energy_at_train: u32,
    /// Timestamp of the last feeding.
    pub last_feed_time: u64,
    /// Timestamp of the last training session.
    pub last_train_time: u64,
    /// Formation state.
    pub deployment: Deployment,
}

impl Pet {
    /// Fresh level 1 pet from a template.
    #[must_use]
    pub fn from_template(id: PetId, template: &PetTemplate, now_ms: u64) -> Self {
        Self {
            id,
            template_id: template.id.clone(),
            level: 1,
            exp: 0,
            exp_to_next: BASE_EXP_TO_NEXT,
            attack: template.base.attack,
            max_hp: template.base.hp,
            current_hp: template.base.hp,
            defense: template.base.defense,
            attack_speed: template.attack_speed,
            friendship: 50,
            hunger: CARE_MAX,
            energy: CARE_MAX,
            energy_at_train: CARE_MAX,
            last_feed_time: now_ms,
            last_train_time: now_ms,
            deployment: Deployment::Benched,
        }
    }

    /// Formation position, `None` while benched.
    #[must_use]
    pub const fn position(&self) -> Option<FormationSlot> {
        match self.deployment {
            Deployment::Benched => None,
            Deployment::Deployed { slot, .. } => Some(slot),
        }
    }

    /// Whether the pet is in the formation.
    #[must_use]
    pub const fn is_deployed(&self) -> bool {
        matches!(self.deployment, Deployment::Deployed { .. })
    }

    /// Coins one feeding costs.
    #[must_use]
    pub fn feed_cost(&self) -> u64 {
        20 * u64::from(self.level)
    }

    /// Coins the next level costs.
    #[must_use]
    pub fn level_up_cost(&self) -> u64 {
        100 * u64::from(self.level)
    }

    /// Recompute hunger and energy from elapsed wall-clock time.
    ///
    /// Both are pure functions of the stored timestamps, so calling this
    /// any number of times with the same `now_ms` gives the same result.
    pub fn refresh_needs(&mut self, now_ms: u64) {
        let hunger_steps = now_ms.saturating_sub(self.last_feed_time) / HUNGER_STEP_MS;
        let hunger_loss = hunger_steps.saturating_mul(u64::from(HUNGER_DECAY));
        self.hunger = u64::from(CARE_MAX).saturating_sub(hunger_loss) as u32;

        let energy_steps = now_ms.saturating_sub(self.last_train_time) / ENERGY_STEP_MS;
        let energy_gain = energy_steps.saturating_mul(u64::from(ENERGY_REGEN));
        self.energy = u64::from(self.energy_at_train)
            .saturating_add(energy_gain)
            .min(u64::from(CARE_MAX)) as u32;
    }

    /// Fill hunger. Costs [`Pet::feed_cost`], charged by the caller.
    pub(crate) fn feed(&mut self, now_ms: u64) {
        self.hunger = CARE_MAX;
        self.last_feed_time = now_ms;
        self.friendship = (self.friendship + 5).min(CARE_MAX);
        self.exp = self.exp.saturating_add(10);
    }

    /// Spend energy for experience.
    pub(crate) fn train(&mut self, now_ms: u64) -> Result<(), PetError> {
        if self.energy < TRAIN_ENERGY_COST {
            return Err(PetError::TooTired(self.energy));
        }
        self.energy -= TRAIN_ENERGY_COST;
        self.energy_at_train = self.energy;
        self.last_train_time = now_ms;
        self.exp = self.exp.saturating_add(25);
        self.friendship = (self.friendship + 2).min(CARE_MAX);
        Ok(())
    }

    /// Consume experience and grow stats by the template's growth.
    pub(crate) fn level_up(&mut self, template: &PetTemplate) {
        self.exp = self.exp.saturating_sub(self.exp_to_next);
        self.level = self.level.saturating_add(1);
        self.exp_to_next = self.exp_to_next.saturating_mul(3) / 2;
        self.attack = self.attack.saturating_add(template.growth.attack);
        self.max_hp = self.max_hp.saturating_add(template.growth.hp);
        self.defense = self.defense.saturating_add(template.growth.defense);
        self.current_hp = self.max_hp;
    }

    /// Clamp persisted values into their valid ranges.
    pub(crate) fn sanitize(&mut self) {
        self.level = self.level.max(1);
        self.exp_to_next = self.exp_to_next.max(1);
        self.friendship = self.friendship.min(CARE_MAX);
        self.hunger = self.hunger.min(CARE_MAX);
        self.energy = self.energy.min(CARE_MAX);
        self.energy_at_train = self.energy_at_train.min(CARE_MAX);
        self.attack = self.attack.max(0);
        self.defense = self.defense.max(0);
        self.max_hp = self.max_hp.max(1);
        self.current_hp = self.current_hp.clamp(0, self.max_hp);
        if self.attack_speed <= Fixed::ZERO {
            self.attack_speed = Fixed::from_num(1);
        }
    }
}
