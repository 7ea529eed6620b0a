//! Test fixtures and helpers.
//!
//! Recording collaborators, fixed stat providers and pre-built sessions
//! for consistent testing.

use fixed::types::I32F32;
use idle_core::achievements::{AchievementEvent, AchievementSink};
use idle_core::enemy::EnemyParams;
use idle_core::math::{Fixed, Vec2Fixed};
use idle_core::pet::{FormationGroup, FormationSlot, PetId};
use idle_core::player::StatProvider;
use idle_core::resources::{ResourceKind, ResourceLedger, Resources};
use idle_core::session::{GameSession, SessionConfig};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// One wallet mutation seen by a [`RecordingLedger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEntry {
    /// Currency added.
    Credit(ResourceKind, u64),
    /// Currency spent.
    Debit(ResourceKind, u64),
    /// A spend that was refused for lack of funds.
    Refused(ResourceKind, u64),
}

/// Wallet that records every call made to it.
#[derive(Debug, Clone, Default)]
pub struct RecordingLedger {
    /// Balances.
    pub wallet: Resources,
    /// Mutations in call order.
    pub entries: Vec<LedgerEntry>,
}

impl RecordingLedger {
    /// Ledger starting with the given balances.
    #[must_use]
    pub fn with_balance(coins: u64, crystals: u64) -> Self {
        Self {
            wallet: Resources::new(coins, crystals, 0),
            entries: Vec::new(),
        }
    }

    /// Total credited of `kind`.
    #[must_use]
    pub fn credited(&self, kind: ResourceKind) -> u64 {
        self.entries
            .iter()
            .filter_map(|e| match e {
                LedgerEntry::Credit(k, amount) if *k == kind => Some(*amount),
                _ => None,
            })
            .sum()
    }

    /// Number of credits of `kind`.
    #[must_use]
    pub fn credit_count(&self, kind: ResourceKind) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, LedgerEntry::Credit(k, _) if *k == kind))
            .count()
    }
}

impl ResourceLedger for RecordingLedger {
    fn coins(&self) -> u64 {
        self.wallet.coins()
    }

    fn crystals(&self) -> u64 {
        self.wallet.crystals()
    }

    fn rubies(&self) -> u64 {
        self.wallet.rubies()
    }

    fn add_coins(&mut self, amount: u64) {
        self.entries.push(LedgerEntry::Credit(ResourceKind::Coins, amount));
        self.wallet.add_coins(amount);
    }

    fn add_crystals(&mut self, amount: u64) {
        self.entries.push(LedgerEntry::Credit(ResourceKind::Crystals, amount));
        self.wallet.add_crystals(amount);
    }

    fn add_rubies(&mut self, amount: u64) {
        self.entries.push(LedgerEntry::Credit(ResourceKind::Rubies, amount));
        self.wallet.add_rubies(amount);
    }

    fn spend_coins(&mut self, amount: u64) -> bool {
        let ok = self.wallet.spend_coins(amount);
        let entry = if ok { LedgerEntry::Debit } else { LedgerEntry::Refused };
        self.entries.push(entry(ResourceKind::Coins, amount));
        ok
    }

    fn spend_crystals(&mut self, amount: u64) -> bool {
        let ok = self.wallet.spend_crystals(amount);
        let entry = if ok { LedgerEntry::Debit } else { LedgerEntry::Refused };
        self.entries.push(entry(ResourceKind::Crystals, amount));
        ok
    }
}

/// Achievement sink that keeps every event.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    /// Events in call order.
    pub events: Vec<(AchievementEvent, u64)>,
}

impl RecordingSink {
    /// Number of events of `kind`.
    #[must_use]
    pub fn count(&self, kind: AchievementEvent) -> usize {
        self.events.iter().filter(|(e, _)| *e == kind).count()
    }
}

impl AchievementSink for RecordingSink {
    fn on_event(&mut self, event: AchievementEvent, amount: u64) {
        self.events.push((event, amount));
    }
}

/// Player stats fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedStats {
    /// Attack.
    pub attack: Fixed,
    /// Crit chance percent.
    pub crit_rate: Fixed,
    /// Crit damage percent.
    pub crit_damage: Fixed,
    /// Attacks per second.
    pub attack_speed: Fixed,
    /// Dodge percent.
    pub dodge: Fixed,
}

impl Default for FixedStats {
    fn default() -> Self {
        Self {
            attack: fixed(50),
            crit_rate: Fixed::ZERO,
            crit_damage: fixed(150),
            attack_speed: fixed(1),
            dodge: Fixed::ZERO,
        }
    }
}

impl StatProvider for FixedStats {
    fn attack(&self) -> Fixed {
        self.attack
    }

    fn crit_rate(&self) -> Fixed {
        self.crit_rate
    }

    fn crit_damage(&self) -> Fixed {
        self.crit_damage
    }

    fn attack_speed(&self) -> Fixed {
        self.attack_speed
    }

    fn dodge(&self) -> Fixed {
        self.dodge
    }
}

/// A stationary enemy with no dodge.
#[must_use]
pub fn still_enemy(x: i32, y: i32, max_hp: i32, defense: i32) -> EnemyParams {
    EnemyParams {
        position: Vec2Fixed::from_ints(x, y),
        max_hp,
        defense: fixed(defense),
        dodge: Fixed::ZERO,
        speed: Fixed::ZERO,
        ..EnemyParams::default()
    }
}

/// Session with plenty of coins and crystals.
#[must_use]
pub fn rich_session(seed: u64) -> GameSession {
    GameSession::new(SessionConfig {
        seed,
        starting_resources: Resources::new(10_000_000, 1_000_000, 0),
        ..SessionConfig::default()
    })
}

/// Rich level 1 session with a main base and a level 2 gold mine in the
/// two slots open at that level.
#[must_use]
pub fn developed_session(seed: u64) -> GameSession {
    let mut session = rich_session(seed);
    for (kind, slot) in [("main_base", 0), ("gold_mine", 1)] {
        if let Err(e) = session.build(kind, slot, 0) {
            panic!("fixture build of {kind} failed: {e}");
        }
    }
    if let Err(e) = session.upgrade_building(1) {
        panic!("fixture upgrade failed: {e}");
    }
    session
}

/// Rich session with an Ember Cub deployed in the front centre.
#[must_use]
pub fn session_with_pet(seed: u64) -> (GameSession, PetId) {
    let mut session = rich_session(seed);
    let pet = match session.unlock_pet("ember_cub", 0) {
        Ok(pet) => pet,
        Err(e) => panic!("fixture unlock failed: {e}"),
    };
    if let Err(e) = session.equip_pet(pet, FormationSlot::new(FormationGroup::Front, 1)) {
        panic!("fixture equip failed: {e}");
    }
    (session, pet)
}

/// Advance `session` by `frames` frames of `dt_ms` each, continuing from
/// its last active timestamp.
pub fn run_frames(session: &mut GameSession, frames: u64, dt_ms: u32) {
    for _ in 0..frames {
        let now = session.last_active() + u64::from(dt_ms);
        session.update(Fixed::from_num(dt_ms), now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_ledger_logs_refusals() {
        let mut ledger = RecordingLedger::with_balance(10, 0);
        assert!(!ledger.spend_coins(20));
        assert!(ledger.spend_coins(4));
        ledger.add_coins(3);
        assert_eq!(
            ledger.entries,
            vec![
                LedgerEntry::Refused(ResourceKind::Coins, 20),
                LedgerEntry::Debit(ResourceKind::Coins, 4),
                LedgerEntry::Credit(ResourceKind::Coins, 3),
            ]
        );
        assert_eq!(ledger.coins(), 9);
    }

    #[test]
    fn test_developed_session_has_buildings() {
        let session = developed_session(1);
        assert_eq!(session.territory().buildings().len(), 2);
        assert_eq!(session.territory().building_at(1).unwrap().level, 2);
    }

    #[test]
    fn test_run_frames_advances_clock() {
        let mut session = rich_session(1);
        run_frames(&mut session, 10, 16);
        assert_eq!(session.last_active(), 160);
    }
}
