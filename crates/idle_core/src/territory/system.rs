//! The building grid and its production.
//!
//! Slots move `Locked -> Empty -> Built`. The first
//! [`TerritoryConfig::initial_slots`] slots open with player level; the
//! rest open only through expansions. Every action validates completely
//! before touching the wallet or the grid, so an `Err` never leaves a
//! partial change behind.
//!
//! Production is pull-based: nothing accrues until
//! [`TerritorySystem::collect_resources`] is called with the current time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::{BuildingCatalog, BuildingDef, BuildingEffect, MAIN_BASE};
use super::config::{ExpansionStep, TerritoryConfig};
use crate::math::{Fixed, Vec2Fixed};
use crate::render::{Canvas, Color};
use crate::resources::{Cost, ResourceBundle, ResourceLedger};

/// Identifier assigned to each constructed building.
pub type BuildingId = u32;

/// Why a territory action was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerritoryError {
    /// Slot index beyond the grid.
    #[error("slot {0} does not exist")]
    InvalidSlot(usize),
    /// Slot not yet unlocked.
    #[error("slot {0} is locked")]
    SlotLocked(usize),
    /// Slot already holds a building.
    #[error("slot {0} is already occupied")]
    SlotOccupied(usize),
    /// Slot has no building to act on.
    #[error("slot {0} is empty")]
    SlotEmpty(usize),
    /// Type not in the catalog.
    #[error("unknown building type '{0}'")]
    UnknownBuilding(String),
    /// A main base already stands somewhere on the grid.
    #[error("only one main base can exist")]
    MainBaseExists,
    /// The main base cannot be torn down.
    #[error("the main base cannot be demolished")]
    MainBaseIndestructible,
    /// Building already at its cap.
    #[error("building is already at max level {0}")]
    MaxLevel(u32),
    /// Wallet does not cover the price.
    #[error("not enough resources: need {} coins and {} crystals", .0.coins, .0.crystals)]
    InsufficientResources(Cost),
    /// Every expansion has been bought.
    #[error("territory is fully expanded")]
    FullyExpanded,
    /// The next expansion needs a stronger main base.
    #[error("main base level {required} required (current {current})")]
    MainBaseTooLow {
        /// Level the step needs.
        required: u32,
        /// Current main base level (0 without one).
        current: u32,
    },
}

/// A constructed building.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Building {
    /// Unique id.
    pub id: BuildingId,
    /// Catalog key.
    pub kind: String,
    /// Slot it occupies.
    pub slot_index: usize,
    /// Current level, `1..=max_level`.
    pub level: u32,
    /// Timestamp up to which production has been paid out.
    pub last_production: u64,
}

/// Observable state of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Not usable yet.
    Locked,
    /// Usable and free.
    Empty,
    /// Holds the given building.
    Built(BuildingId),
}

/// Bonuses folded from every building's effect times its level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerritoryBonuses {
    /// Flat attack.
    pub attack: u64,
    /// Flat defense.
    pub defense: u64,
    /// Percent added to kill experience.
    pub exp_percent: u64,
}

/// Owns the grid, its buildings and the expansion state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritorySystem {
    config: TerritoryConfig,
    catalog: BuildingCatalog,
    buildings: Vec<Building>,
    slots: Vec<Option<BuildingId>>,
    unlocked_slot_count: usize,
    expansion_count: usize,
    last_production_time: u64,
    next_id: BuildingId,
}

impl Default for TerritorySystem {
    fn default() -> Self {
        Self::new(TerritoryConfig::default(), BuildingCatalog::builtin())
    }
}

impl TerritorySystem {
    /// Empty territory with the given rules and catalog.
    #[must_use]
    pub fn new(config: TerritoryConfig, catalog: BuildingCatalog) -> Self {
        let unlocked_slot_count = config.unlocked_after(0);
        Self {
            slots: vec![None; config.max_slots],
            config,
            catalog,
            buildings: Vec::new(),
            unlocked_slot_count,
            expansion_count: 0,
            last_production_time: 0,
            next_id: 1,
        }
    }

    /// Grid rules.
    #[must_use]
    pub const fn config(&self) -> &TerritoryConfig {
        &self.config
    }

    /// Building catalog.
    #[must_use]
    pub const fn catalog(&self) -> &BuildingCatalog {
        &self.catalog
    }

    /// Every building in construction order.
    #[must_use]
    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    /// Building in `slot`, if any.
    #[must_use]
    pub fn building_at(&self, slot: usize) -> Option<&Building> {
        let id = (*self.slots.get(slot)?)?;
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Slots opened so far, counting expansions.
    #[must_use]
    pub const fn unlocked_slot_count(&self) -> usize {
        self.unlocked_slot_count
    }

    /// Expansions bought so far.
    #[must_use]
    pub const fn expansion_count(&self) -> usize {
        self.expansion_count
    }

    /// Time of the last collection.
    #[must_use]
    pub const fn last_production_time(&self) -> u64 {
        self.last_production_time
    }

    /// Whether `slot` is usable at `player_level`.
    #[must_use]
    pub fn is_slot_unlocked(&self, slot: usize, player_level: u32) -> bool {
        if slot >= self.slots.len() {
            return false;
        }
        match self.config.unlock_level(slot) {
            Some(level) => player_level >= level,
            None => slot < self.unlocked_slot_count,
        }
    }

    /// State of `slot` at `player_level`.
    #[must_use]
    pub fn slot_state(&self, slot: usize, player_level: u32) -> SlotState {
        match self.slots.get(slot).copied().flatten() {
            Some(id) => SlotState::Built(id),
            None if self.is_slot_unlocked(slot, player_level) => SlotState::Empty,
            None => SlotState::Locked,
        }
    }

    /// Level of the main base, zero when none is built.
    #[must_use]
    pub fn main_base_level(&self) -> u32 {
        self.buildings
            .iter()
            .find(|b| b.kind == MAIN_BASE)
            .map_or(0, |b| b.level)
    }

    /// Check every build precondition and return the definition.
    pub fn can_build(
        &self,
        kind: &str,
        slot: usize,
        player_level: u32,
        ledger: &dyn ResourceLedger,
    ) -> Result<&BuildingDef, TerritoryError> {
        if slot >= self.slots.len() {
            return Err(TerritoryError::InvalidSlot(slot));
        }
        match self.slot_state(slot, player_level) {
            SlotState::Locked => return Err(TerritoryError::SlotLocked(slot)),
            SlotState::Built(_) => return Err(TerritoryError::SlotOccupied(slot)),
            SlotState::Empty => {}
        }

        let def = self
            .catalog
            .get(kind)
            .ok_or_else(|| TerritoryError::UnknownBuilding(kind.to_string()))?;

        if def.is_main_base() && self.buildings.iter().any(|b| b.kind == MAIN_BASE) {
            return Err(TerritoryError::MainBaseExists);
        }
        if !ledger.can_afford(&def.base_cost) {
            return Err(TerritoryError::InsufficientResources(def.base_cost));
        }

        Ok(def)
    }

    /// Construct a level 1 building in an empty slot.
    pub fn build_building(
        &mut self,
        kind: &str,
        slot: usize,
        player_level: u32,
        now_ms: u64,
        ledger: &mut dyn ResourceLedger,
    ) -> Result<BuildingId, TerritoryError> {
        let cost = self.can_build(kind, slot, player_level, ledger)?.base_cost;
        if !ledger.spend_cost(&cost) {
            return Err(TerritoryError::InsufficientResources(cost));
        }

        let id = self.next_id;
        self.next_id += 1;
        self.buildings.push(Building {
            id,
            kind: kind.to_string(),
            slot_index: slot,
            level: 1,
            last_production: now_ms,
        });
        self.slots[slot] = Some(id);

        tracing::info!(building = id, kind, slot, "Building constructed");
        Ok(id)
    }

    /// Check upgrade preconditions and return the price.
    pub fn can_upgrade(
        &self,
        slot: usize,
        ledger: &dyn ResourceLedger,
    ) -> Result<Cost, TerritoryError> {
        let (building, def) = self.resolve(slot)?;
        if building.level >= def.max_level {
            return Err(TerritoryError::MaxLevel(def.max_level));
        }
        let cost = def.upgrade_cost(building.level);
        if !ledger.can_afford(&cost) {
            return Err(TerritoryError::InsufficientResources(cost));
        }
        Ok(cost)
    }

    /// Raise the building in `slot` by one level. Returns the new level.
    pub fn upgrade_building(
        &mut self,
        slot: usize,
        ledger: &mut dyn ResourceLedger,
    ) -> Result<u32, TerritoryError> {
        let cost = self.can_upgrade(slot, ledger)?;
        if !ledger.spend_cost(&cost) {
            return Err(TerritoryError::InsufficientResources(cost));
        }

        let building = self.building_at_mut(slot).ok_or(TerritoryError::SlotEmpty(slot))?;
        building.level += 1;
        let level = building.level;

        tracing::info!(slot, level, coins = cost.coins, crystals = cost.crystals, "Building upgraded");
        Ok(level)
    }

    /// Tear down the building in `slot` and refund half its base cost.
    pub fn demolish_building(
        &mut self,
        slot: usize,
        ledger: &mut dyn ResourceLedger,
    ) -> Result<Cost, TerritoryError> {
        let (building, def) = self.resolve(slot)?;
        if def.is_main_base() {
            return Err(TerritoryError::MainBaseIndestructible);
        }
        let refund = def.demolish_refund();
        let id = building.id;

        self.buildings.retain(|b| b.id != id);
        self.slots[slot] = None;
        ledger.refund(&refund);

        tracing::info!(slot, coins = refund.coins, crystals = refund.crystals, "Building demolished");
        Ok(refund)
    }

    /// Pay out every whole production cycle elapsed up to `now_ms`.
    ///
    /// Each building's timestamp advances by exactly the cycles paid, so a
    /// partial cycle keeps counting toward the next collection.
    pub fn collect_resources(
        &mut self,
        now_ms: u64,
        ledger: &mut dyn ResourceLedger,
    ) -> ResourceBundle {
        let mut gains = ResourceBundle::default();

        for building in &mut self.buildings {
            let Some(def) = self.catalog.get(&building.kind) else {
                continue;
            };
            let Some((resource, value)) = def.production() else {
                continue;
            };
            let interval = def.production_interval_ms;
            let cycles = now_ms.saturating_sub(building.last_production) / interval;
            if cycles == 0 {
                continue;
            }

            let amount = value
                .saturating_mul(u64::from(building.level))
                .saturating_mul(cycles);
            gains.add(resource, amount);
            building.last_production += cycles * interval;
        }

        self.last_production_time = now_ms;
        gains.credit_to(ledger);

        if !gains.is_empty() {
            tracing::debug!(
                coins = gains.coins,
                crystals = gains.crystals,
                rubies = gains.rubies,
                "Production collected"
            );
        }
        gains
    }

    /// Project what `elapsed_ms` away from the game produces.
    ///
    /// The duration is capped and output is scaled by the offline
    /// efficiency. Nothing is mutated.
    #[must_use]
    pub fn calculate_offline_gains(&self, elapsed_ms: u64) -> ResourceBundle {
        let capped = elapsed_ms.min(self.config.offline_cap_ms);
        let mut gains = ResourceBundle::default();

        for building in &self.buildings {
            let Some(def) = self.catalog.get(&building.kind) else {
                continue;
            };
            let Some((resource, value)) = def.production() else {
                continue;
            };
            let cycles = capped / def.production_interval_ms;
            let full = value
                .saturating_mul(u64::from(building.level))
                .saturating_mul(cycles);
            gains.add(
                resource,
                full.saturating_mul(self.config.offline_efficiency_percent) / 100,
            );
        }

        gains
    }

    /// Advance production timestamps by every whole elapsed cycle
    /// without paying anything out.
    pub fn fast_forward_production(&mut self, now_ms: u64) {
        for building in &mut self.buildings {
            let Some(def) = self.catalog.get(&building.kind) else {
                continue;
            };
            if def.production().is_none() {
                continue;
            }
            let interval = def.production_interval_ms;
            let cycles = now_ms.saturating_sub(building.last_production) / interval;
            building.last_production += cycles * interval;
        }
        self.last_production_time = now_ms;
    }

    /// The next expansion step, if any remain.
    #[must_use]
    pub fn next_expansion(&self) -> Option<&ExpansionStep> {
        self.config.expansions.get(self.expansion_count)
    }

    /// Check expansion preconditions and return the step.
    pub fn can_expand(&self, ledger: &dyn ResourceLedger) -> Result<ExpansionStep, TerritoryError> {
        let step = *self.next_expansion().ok_or(TerritoryError::FullyExpanded)?;
        let current = self.main_base_level();
        if current < step.required_main_base_level {
            return Err(TerritoryError::MainBaseTooLow {
                required: step.required_main_base_level,
                current,
            });
        }
        if !ledger.can_afford(&step.cost) {
            return Err(TerritoryError::InsufficientResources(step.cost));
        }
        Ok(step)
    }

    /// Buy the next expansion. Returns the new unlocked slot count.
    pub fn expand_territory(
        &mut self,
        ledger: &mut dyn ResourceLedger,
    ) -> Result<usize, TerritoryError> {
        let step = self.can_expand(ledger)?;
        if !ledger.spend_cost(&step.cost) {
            return Err(TerritoryError::InsufficientResources(step.cost));
        }

        self.expansion_count += 1;
        self.unlocked_slot_count = self.config.unlocked_after(self.expansion_count);

        tracing::info!(
            expansion = self.expansion_count,
            unlocked_slots = self.unlocked_slot_count,
            "Territory expanded"
        );
        Ok(self.unlocked_slot_count)
    }

    /// Sum of every building's bonus effect times its level.
    #[must_use]
    pub fn bonuses(&self) -> TerritoryBonuses {
        let mut bonuses = TerritoryBonuses::default();
        for building in &self.buildings {
            let Some(def) = self.catalog.get(&building.kind) else {
                continue;
            };
            let level = u64::from(building.level);
            let add = |total: &mut u64, value: u64| {
                *total = total.saturating_add(value.saturating_mul(level));
            };
            match def.effect {
                BuildingEffect::AttackBonus { value } => add(&mut bonuses.attack, value),
                BuildingEffect::DefenseBonus { value } => add(&mut bonuses.defense, value),
                BuildingEffect::CombatBonus { attack, defense } => {
                    add(&mut bonuses.attack, attack);
                    add(&mut bonuses.defense, defense);
                }
                BuildingEffect::ExpBonus { value } => add(&mut bonuses.exp_percent, value),
                BuildingEffect::SlotUnlock { .. } | BuildingEffect::Production { .. } => {}
            }
        }
        bonuses
    }

    /// Replace the grid with persisted state.
    ///
    /// Entries that would break a grid invariant (unknown type, bad slot,
    /// second occupant, second main base) are dropped with a warning and
    /// levels are clamped to the type's range.
    pub fn restore(
        &mut self,
        buildings: Vec<Building>,
        expansion_count: usize,
        last_production_time: u64,
    ) {
        self.buildings.clear();
        self.slots = vec![None; self.config.max_slots];
        self.expansion_count = expansion_count.min(self.config.expansions.len());
        self.unlocked_slot_count = self.config.unlocked_after(self.expansion_count);
        self.last_production_time = last_production_time;

        for mut building in buildings {
            let Some(def) = self.catalog.get(&building.kind) else {
                tracing::warn!(kind = %building.kind, "Dropping saved building of unknown type");
                continue;
            };
            let max_level = def.max_level;
            let is_main_base = def.is_main_base();

            let slot_free = matches!(self.slots.get(building.slot_index), Some(None));
            if !slot_free {
                tracing::warn!(slot = building.slot_index, "Dropping saved building in unusable slot");
                continue;
            }
            if is_main_base && self.buildings.iter().any(|b| b.kind == MAIN_BASE) {
                tracing::warn!("Dropping duplicate saved main base");
                continue;
            }
            if building.id == 0 || self.buildings.iter().any(|b| b.id == building.id) {
                building.id = self.next_free_id();
            }

            building.level = building.level.clamp(1, max_level);
            self.slots[building.slot_index] = Some(building.id);
            self.buildings.push(building);
        }

        self.next_id = self.next_free_id();
    }

    /// Draw the slot grid.
    pub fn render(&self, canvas: &mut dyn Canvas) {
        let cell = Fixed::from_num(80);
        let stride = 90;
        for slot in 0..self.slots.len() {
            let column = (slot % 4) as i32;
            let row = (slot / 4) as i32;
            let origin = Vec2Fixed::from_ints(20 + column * stride, 20 + row * stride);

            match self.building_at(slot) {
                Some(building) => {
                    canvas.fill_rect(origin, cell, cell, Color::ORANGE);
                    let label = format!("{} L{}", building.kind, building.level);
                    canvas.text(origin, &label, Color::WHITE);
                }
                None if slot < self.unlocked_slot_count => {
                    canvas.fill_rect(origin, cell, cell, Color::GREY);
                }
                None => {
                    canvas.fill_rect(origin, cell, cell, Color::GREY.faded(Fixed::from_num(0.3)));
                }
            }
        }
    }

    fn resolve(&self, slot: usize) -> Result<(&Building, &BuildingDef), TerritoryError> {
        if slot >= self.slots.len() {
            return Err(TerritoryError::InvalidSlot(slot));
        }
        let building = self.building_at(slot).ok_or(TerritoryError::SlotEmpty(slot))?;
        let def = self
            .catalog
            .get(&building.kind)
            .ok_or_else(|| TerritoryError::UnknownBuilding(building.kind.clone()))?;
        Ok((building, def))
    }

    fn building_at_mut(&mut self, slot: usize) -> Option<&mut Building> {
        let id = (*self.slots.get(slot)?)?;
        self.buildings.iter_mut().find(|b| b.id == id)
    }

    fn next_free_id(&self) -> BuildingId {
        let highest = self.buildings.iter().map(|b| b.id).max().unwrap_or(0);
        highest.max(self.next_id.saturating_sub(1)) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Resources;

    const RICH: Resources = Resources::new(10_000_000, 1_000_000, 0);

    #[test]
    fn test_initial_slots_follow_player_level() {
        let territory = TerritorySystem::default();
        assert_eq!(territory.slot_state(0, 1), SlotState::Empty);
        assert_eq!(territory.slot_state(2, 1), SlotState::Locked);
        assert_eq!(territory.slot_state(2, 2), SlotState::Empty);
        assert_eq!(territory.slot_state(5, 7), SlotState::Locked);
        // expansion slots ignore level
        assert_eq!(territory.slot_state(6, 99), SlotState::Locked);
    }

    #[test]
    fn test_build_debits_and_occupies() {
        let mut territory = TerritorySystem::default();
        let mut wallet = Resources::new(1000, 0, 0);
        let id = territory
            .build_building("gold_mine", 0, 1, 5000, &mut wallet)
            .unwrap();
        assert_eq!(wallet.coins(), 800);
        assert_eq!(territory.slot_state(0, 1), SlotState::Built(id));
        assert_eq!(territory.building_at(0).unwrap().last_production, 5000);
    }

    #[test]
    fn test_build_failures_leave_state_untouched() {
        let mut territory = TerritorySystem::default();
        let mut wallet = Resources::new(100, 0, 0);

        assert_eq!(
            territory.build_building("gold_mine", 0, 1, 0, &mut wallet),
            Err(TerritoryError::InsufficientResources(Cost::new(200, 0)))
        );
        assert_eq!(
            territory.build_building("castle", 0, 1, 0, &mut wallet),
            Err(TerritoryError::UnknownBuilding("castle".to_string()))
        );
        assert_eq!(
            territory.build_building("gold_mine", 99, 1, 0, &mut wallet),
            Err(TerritoryError::InvalidSlot(99))
        );
        assert_eq!(
            territory.build_building("gold_mine", 3, 1, 0, &mut wallet),
            Err(TerritoryError::SlotLocked(3))
        );
        assert_eq!(wallet.coins(), 100);
        assert!(territory.buildings().is_empty());
    }

    #[test]
    fn test_second_main_base_rejected() {
        let mut territory = TerritorySystem::default();
        let mut wallet = RICH;
        territory.build_building(MAIN_BASE, 0, 10, 0, &mut wallet).unwrap();
        let before = wallet;
        assert_eq!(
            territory.build_building(MAIN_BASE, 1, 10, 0, &mut wallet),
            Err(TerritoryError::MainBaseExists)
        );
        assert_eq!(territory.buildings().len(), 1);
        assert_eq!(wallet, before);
    }

    #[test]
    fn test_upgrade_until_max_level() {
        let mut territory = TerritorySystem::default();
        let mut wallet = RICH;
        territory.build_building("wall", 0, 1, 0, &mut wallet).unwrap();
        for expected in 2..=10 {
            assert_eq!(territory.upgrade_building(0, &mut wallet), Ok(expected));
        }
        assert_eq!(
            territory.upgrade_building(0, &mut wallet),
            Err(TerritoryError::MaxLevel(10))
        );
    }

    #[test]
    fn test_upgrade_charges_geometric_price() {
        let mut territory = TerritorySystem::default();
        let mut wallet = Resources::new(1700, 0, 0);
        territory.build_building(MAIN_BASE, 0, 1, 0, &mut wallet).unwrap();
        // level 1 -> 2 costs 500 * 2^1
        assert_eq!(territory.upgrade_building(0, &mut wallet), Ok(2));
        assert_eq!(wallet.coins(), 200);
    }

    #[test]
    fn test_demolish_refunds_half_and_frees_slot() {
        let mut territory = TerritorySystem::default();
        let mut wallet = Resources::new(1000, 100, 0);
        territory.build_building("workshop", 1, 1, 0, &mut wallet).unwrap();
        assert_eq!(wallet, Resources::new(0, 0, 0));

        let refund = territory.demolish_building(1, &mut wallet).unwrap();
        assert_eq!(refund, Cost::new(500, 50));
        assert_eq!(wallet, Resources::new(500, 50, 0));
        assert_eq!(territory.slot_state(1, 1), SlotState::Empty);
        assert!(territory.buildings().is_empty());
    }

    #[test]
    fn test_main_base_cannot_be_demolished() {
        let mut territory = TerritorySystem::default();
        let mut wallet = RICH;
        territory.build_building(MAIN_BASE, 0, 1, 0, &mut wallet).unwrap();
        assert_eq!(
            territory.demolish_building(0, &mut wallet),
            Err(TerritoryError::MainBaseIndestructible)
        );
        assert_eq!(territory.buildings().len(), 1);
    }

    #[test]
    fn test_collect_keeps_partial_cycle() {
        let mut territory = TerritorySystem::default();
        let mut wallet = RICH;
        territory.build_building("gold_mine", 0, 1, 0, &mut wallet).unwrap();
        territory.upgrade_building(0, &mut wallet).unwrap();
        let start = wallet.coins();

        let gains = territory.collect_resources(150_000, &mut wallet);
        assert_eq!(gains.coins, 200);
        assert_eq!(wallet.coins(), start + 200);
        assert_eq!(territory.building_at(0).unwrap().last_production, 120_000);

        // the banked 30s completes a cycle after another 30s
        let gains = territory.collect_resources(180_000, &mut wallet);
        assert_eq!(gains.coins, 100);
    }

    #[test]
    fn test_offline_gains_are_halved_and_capped() {
        let mut territory = TerritorySystem::default();
        let mut wallet = RICH;
        territory.build_building("gold_mine", 0, 1, 0, &mut wallet).unwrap();

        // 10 cycles * 50 * 50%
        assert_eq!(territory.calculate_offline_gains(600_000).coins, 250);
        let day = territory.calculate_offline_gains(24 * 3_600_000);
        assert_eq!(territory.calculate_offline_gains(48 * 3_600_000), day);
        assert_eq!(day.coins, 1440 * 25);
        // projection only
        assert_eq!(territory.building_at(0).unwrap().last_production, 0);
    }

    #[test]
    fn test_fast_forward_skips_whole_cycles() {
        let mut territory = TerritorySystem::default();
        let mut wallet = RICH;
        territory.build_building("gold_mine", 0, 1, 0, &mut wallet).unwrap();
        territory.fast_forward_production(90_000);
        assert_eq!(territory.building_at(0).unwrap().last_production, 60_000);
        let before = wallet.coins();
        territory.collect_resources(90_000, &mut wallet);
        assert_eq!(wallet.coins(), before);
    }

    #[test]
    fn test_expansion_requires_main_base_level() {
        let mut territory = TerritorySystem::default();
        let mut wallet = RICH;
        assert_eq!(
            territory.expand_territory(&mut wallet),
            Err(TerritoryError::MainBaseTooLow { required: 3, current: 0 })
        );

        territory.build_building(MAIN_BASE, 0, 1, 0, &mut wallet).unwrap();
        territory.upgrade_building(0, &mut wallet).unwrap();
        territory.upgrade_building(0, &mut wallet).unwrap();
        assert_eq!(territory.expand_territory(&mut wallet), Ok(8));
        assert_eq!(territory.slot_state(7, 1), SlotState::Empty);
        assert_eq!(territory.slot_state(8, 1), SlotState::Locked);
    }

    #[test]
    fn test_fully_expanded() {
        let mut territory = TerritorySystem::default();
        let mut wallet = RICH;
        territory.build_building(MAIN_BASE, 0, 1, 0, &mut wallet).unwrap();
        for _ in 0..7 {
            territory.upgrade_building(0, &mut wallet).unwrap();
        }
        assert_eq!(territory.expand_territory(&mut wallet), Ok(8));
        assert_eq!(territory.expand_territory(&mut wallet), Ok(10));
        assert_eq!(territory.expand_territory(&mut wallet), Ok(12));
        assert_eq!(
            territory.expand_territory(&mut wallet),
            Err(TerritoryError::FullyExpanded)
        );
        assert_eq!(territory.unlocked_slot_count(), 12);
    }

    #[test]
    fn test_bonuses_scale_with_level() {
        let mut territory = TerritorySystem::default();
        let mut wallet = RICH;
        territory.build_building("barracks", 0, 10, 0, &mut wallet).unwrap();
        territory.upgrade_building(0, &mut wallet).unwrap();
        territory.build_building("training_ground", 1, 10, 0, &mut wallet).unwrap();
        territory.build_building("workshop", 2, 10, 0, &mut wallet).unwrap();

        let bonuses = territory.bonuses();
        assert_eq!(bonuses.attack, 10 + 3);
        assert_eq!(bonuses.defense, 2);
        assert_eq!(bonuses.exp_percent, 5);
    }

    #[test]
    fn test_oversized_bonus_saturates() {
        let defs = BuildingCatalog::builtin()
            .iter()
            .cloned()
            .map(|mut def| {
                if def.id == "barracks" {
                    def.effect = BuildingEffect::AttackBonus { value: u64::MAX / 2 };
                }
                def
            })
            .collect();
        let mut territory = TerritorySystem::new(TerritoryConfig::default(), BuildingCatalog::new(defs));
        territory.restore(
            vec![
                Building { id: 1, kind: "barracks".into(), slot_index: 0, level: 3, last_production: 0 },
                Building { id: 2, kind: "training_ground".into(), slot_index: 1, level: 1, last_production: 0 },
            ],
            0,
            0,
        );

        let bonuses = territory.bonuses();
        assert_eq!(bonuses.attack, u64::MAX);
        assert_eq!(bonuses.defense, 2);
    }

    #[test]
    fn test_restore_drops_invalid_entries() {
        let mut territory = TerritorySystem::default();
        let saved = vec![
            Building { id: 1, kind: MAIN_BASE.into(), slot_index: 0, level: 40, last_production: 0 },
            Building { id: 2, kind: MAIN_BASE.into(), slot_index: 1, level: 1, last_production: 0 },
            Building { id: 3, kind: "castle".into(), slot_index: 2, level: 1, last_production: 0 },
            Building { id: 4, kind: "wall".into(), slot_index: 0, level: 1, last_production: 0 },
            Building { id: 5, kind: "wall".into(), slot_index: 99, level: 1, last_production: 0 },
            Building { id: 6, kind: "gold_mine".into(), slot_index: 3, level: 0, last_production: 7 },
        ];
        territory.restore(saved, 1, 100);

        assert_eq!(territory.buildings().len(), 2);
        assert_eq!(territory.main_base_level(), 10);
        assert_eq!(territory.building_at(3).unwrap().level, 1);
        assert_eq!(territory.unlocked_slot_count(), 8);

        let mut wallet = RICH;
        let id = territory.build_building("wall", 1, 10, 0, &mut wallet).unwrap();
        assert_eq!(id, 7);
    }
}
