//! Territory tuning: grid size, slot gates, expansions, offline rules.

use serde::{Deserialize, Serialize};

use crate::resources::Cost;

/// Milliseconds in one hour.
pub const HOUR_MS: u64 = 3_600_000;

/// One purchasable grid expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpansionStep {
    /// Price of the step.
    pub cost: Cost,
    /// Main base level needed to buy it.
    pub required_main_base_level: u32,
}

impl ExpansionStep {
    /// Create a step.
    #[must_use]
    pub const fn new(coins: u64, crystals: u64, required_main_base_level: u32) -> Self {
        Self {
            cost: Cost::new(coins, crystals),
            required_main_base_level,
        }
    }
}

/// Grid and production rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TerritoryConfig {
    /// Slots governed by player level before any expansion.
    pub initial_slots: usize,
    /// Grid capacity.
    pub max_slots: usize,
    /// Slots granted per expansion.
    pub slots_per_expansion: usize,
    /// Player level each initial slot unlocks at.
    pub slot_unlock_levels: Vec<u32>,
    /// Ordered expansion steps.
    pub expansions: Vec<ExpansionStep>,
    /// Longest offline stretch that still produces.
    pub offline_cap_ms: u64,
    /// Share of normal output produced while offline, in percent.
    pub offline_efficiency_percent: u64,
}

impl Default for TerritoryConfig {
    fn default() -> Self {
        Self {
            initial_slots: 6,
            max_slots: 12,
            slots_per_expansion: 2,
            slot_unlock_levels: vec![1, 1, 2, 3, 5, 8],
            expansions: vec![
                ExpansionStep::new(5000, 200, 3),
                ExpansionStep::new(20_000, 800, 5),
                ExpansionStep::new(80_000, 3000, 8),
            ],
            offline_cap_ms: 24 * HOUR_MS,
            offline_efficiency_percent: 50,
        }
    }
}

impl TerritoryConfig {
    /// Slot count after `expansion_count` expansions.
    #[must_use]
    pub fn unlocked_after(&self, expansion_count: usize) -> usize {
        self.initial_slots
            .saturating_add(expansion_count.saturating_mul(self.slots_per_expansion))
            .min(self.max_slots)
    }

    /// Level gate of an initial slot, `None` for expansion slots.
    #[must_use]
    pub fn unlock_level(&self, slot: usize) -> Option<u32> {
        if slot < self.initial_slots {
            Some(self.slot_unlock_levels.get(slot).copied().unwrap_or(1))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlocked_after_caps_at_max() {
        let config = TerritoryConfig::default();
        assert_eq!(config.unlocked_after(0), 6);
        assert_eq!(config.unlocked_after(2), 10);
        assert_eq!(config.unlocked_after(3), 12);
        assert_eq!(config.unlocked_after(10), 12);
    }

    #[test]
    fn test_unlock_level_only_for_initial_slots() {
        let config = TerritoryConfig::default();
        assert_eq!(config.unlock_level(4), Some(5));
        assert_eq!(config.unlock_level(6), None);
    }
}
