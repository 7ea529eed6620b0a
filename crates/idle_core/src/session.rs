//! The composition root.
//!
//! [`GameSession`] builds every component once and passes them to each
//! other explicitly: the wallet, the achievement log, player stats,
//! territory, the combat controller with its pet system, and the seeded
//! RNG. Front ends talk to the session; nothing in the engine is global.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::achievements::AchievementLog;
use crate::combat::{CombatConfig, CombatController, CombatEvent, FrameContext};
use crate::error::{GameError, Result};
use crate::math::Fixed;
use crate::pet::{FormationSlot, PetCatalog, PetError, PetId, PetSystem};
use crate::player::{Attribute, PlayerStats, StatProvider, UpgradeError, UpgradeKind};
use crate::render::Canvas;
use crate::resources::{Cost, ResourceBundle, Resources};
use crate::rng::SimRng;
use crate::save::{
    CombatSave, PetsSave, ResourcesSave, SaveData, TerritorySave, SAVE_VERSION,
};
use crate::territory::{BuildingCatalog, BuildingId, TerritoryConfig, TerritoryError, TerritorySystem};

/// Minimum absence that counts as offline progress.
pub const OFFLINE_THRESHOLD_MS: u64 = 60_000;

/// Everything needed to construct a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// RNG seed.
    pub seed: u64,
    /// Combat field tunables.
    pub combat: CombatConfig,
    /// Grid tunables.
    pub territory: TerritoryConfig,
    /// Building types.
    pub buildings: BuildingCatalog,
    /// Pet templates.
    pub pets: PetCatalog,
    /// Starting wallet.
    pub starting_resources: Resources,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            combat: CombatConfig::default(),
            territory: TerritoryConfig::default(),
            buildings: BuildingCatalog::builtin(),
            pets: PetCatalog::builtin(),
            starting_resources: Resources::default(),
        }
    }
}

/// What [`GameSession::apply_offline_progress`] granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineReport {
    /// Time since the save.
    pub elapsed_ms: u64,
    /// Time actually credited after the cap.
    pub capped_ms: u64,
    /// Production earned before going idle and paid out first.
    pub collected: ResourceBundle,
    /// Resources granted for the absence.
    pub gains: ResourceBundle,
}

/// A running game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    resources: Resources,
    achievements: AchievementLog,
    player: PlayerStats,
    territory: TerritorySystem,
    combat: CombatController,
    rng: SimRng,
    /// Timestamp offline progress is measured from.
    last_active: u64,
    /// Opaque equipment blob from the save, written back unchanged.
    #[serde(skip)]
    equipment: serde_json::Value,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl GameSession {
    /// Build a fresh session.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let mut combat = CombatController::new(config.combat);
        combat.attach_pets(PetSystem::new(config.pets));

        let mut session = Self {
            resources: config.starting_resources,
            achievements: AchievementLog::default(),
            player: PlayerStats::new(),
            territory: TerritorySystem::new(config.territory, config.buildings),
            combat,
            rng: SimRng::new(config.seed),
            last_active: 0,
            equipment: serde_json::Value::Null,
        };
        session.refresh_bonuses();
        session
    }

    /// Fresh session with default configuration and the given seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::new(SessionConfig {
            seed,
            ..SessionConfig::default()
        })
    }

    /// Wallet.
    #[must_use]
    pub const fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Wallet, mutable.
    pub fn resources_mut(&mut self) -> &mut Resources {
        &mut self.resources
    }

    /// Achievement counters.
    #[must_use]
    pub const fn achievements(&self) -> &AchievementLog {
        &self.achievements
    }

    /// Player progression.
    #[must_use]
    pub const fn player(&self) -> &PlayerStats {
        &self.player
    }

    /// Base grid.
    #[must_use]
    pub const fn territory(&self) -> &TerritorySystem {
        &self.territory
    }

    /// Combat field.
    #[must_use]
    pub const fn combat(&self) -> &CombatController {
        &self.combat
    }

    /// Combat field, mutable.
    pub fn combat_mut(&mut self) -> &mut CombatController {
        &mut self.combat
    }

    /// Pet roster.
    #[must_use]
    pub fn pets(&self) -> Option<&PetSystem> {
        self.combat.pets()
    }

    /// Timestamp offline progress is measured from.
    #[must_use]
    pub const fn last_active(&self) -> u64 {
        self.last_active
    }

    /// Run one frame at wall-clock `now_ms`.
    ///
    /// Kill experience goes to the player after the combat pass.
    pub fn update(&mut self, dt_ms: Fixed, now_ms: u64) -> Vec<CombatEvent> {
        let mut ctx = FrameContext {
            stats: &self.player,
            resources: &mut self.resources,
            achievements: &mut self.achievements,
            rng: &mut self.rng,
            player_level: self.player.level,
        };
        let events = self.combat.update(dt_ms, &mut ctx);

        for event in &events {
            if let CombatEvent::EnemyKilled { exp, .. } = event {
                let gained = self.player.kill_exp(*exp);
                self.player.gain_exp(gained);
            }
        }
        if let Some(pets) = self.combat.pets_mut() {
            pets.update_pet_states(now_ms);
        }
        self.last_active = self.last_active.max(now_ms);

        events
    }

    /// Pay out territory production.
    pub fn collect_resources(&mut self, now_ms: u64) -> ResourceBundle {
        self.territory.collect_resources(now_ms, &mut self.resources)
    }

    /// Construct a building.
    pub fn build(&mut self, kind: &str, slot: usize, now_ms: u64) -> std::result::Result<BuildingId, TerritoryError> {
        let id = self.territory.build_building(
            kind,
            slot,
            self.player.level,
            now_ms,
            &mut self.resources,
        )?;
        self.refresh_bonuses();
        Ok(id)
    }

    /// Upgrade the building in `slot`.
    pub fn upgrade_building(&mut self, slot: usize) -> std::result::Result<u32, TerritoryError> {
        let level = self.territory.upgrade_building(slot, &mut self.resources)?;
        self.refresh_bonuses();
        Ok(level)
    }

    /// Demolish the building in `slot`.
    pub fn demolish_building(&mut self, slot: usize) -> std::result::Result<Cost, TerritoryError> {
        let refund = self.territory.demolish_building(slot, &mut self.resources)?;
        self.refresh_bonuses();
        Ok(refund)
    }

    /// Buy the next territory expansion.
    pub fn expand_territory(&mut self) -> std::result::Result<usize, TerritoryError> {
        self.territory.expand_territory(&mut self.resources)
    }

    /// Adopt a pet.
    pub fn unlock_pet(&mut self, template_id: &str, now_ms: u64) -> std::result::Result<PetId, PetError> {
        let level = self.player.level;
        self.combat
            .pets_or_default()
            .unlock(template_id, level, now_ms, &mut self.resources)
    }

    /// Place a pet in the formation.
    pub fn equip_pet(&mut self, id: PetId, slot: FormationSlot) -> std::result::Result<Option<PetId>, PetError> {
        self.combat.pets_or_default().equip(id, slot)
    }

    /// Bench a pet.
    pub fn unequip_pet(&mut self, id: PetId) -> std::result::Result<(), PetError> {
        self.combat.pets_or_default().unequip(id)
    }

    /// Feed a pet.
    pub fn feed_pet(&mut self, id: PetId, now_ms: u64) -> std::result::Result<(), PetError> {
        self.combat.pets_or_default().feed(id, now_ms, &mut self.resources)
    }

    /// Train a pet.
    pub fn train_pet(&mut self, id: PetId, now_ms: u64) -> std::result::Result<(), PetError> {
        self.combat.pets_or_default().train(id, now_ms)
    }

    /// Level a pet up.
    pub fn level_up_pet(&mut self, id: PetId) -> std::result::Result<u32, PetError> {
        self.combat.pets_or_default().level_up(id, &mut self.resources)
    }

    /// Spend an attribute point.
    pub fn allocate_point(&mut self, attribute: Attribute) -> std::result::Result<u32, UpgradeError> {
        self.player.allocate_point(attribute)
    }

    /// Buy a player upgrade.
    pub fn purchase_upgrade(&mut self, kind: UpgradeKind) -> std::result::Result<u32, UpgradeError> {
        self.player.purchase_upgrade(kind, &mut self.resources)
    }

    /// Capture the persistent state at `now_ms`.
    #[must_use]
    pub fn to_save(&self, now_ms: u64) -> SaveData {
        let attack_interval = CombatController::attack_interval(&self.player)
            .map_or(0.0, |interval| interval.to_num::<f64>());
        let config = self.combat.config();

        SaveData {
            version: SAVE_VERSION,
            timestamp: now_ms,
            player: self.player.clone(),
            territory: TerritorySave::capture(&self.territory),
            resources: ResourcesSave::capture(&self.resources),
            combat: CombatSave {
                monster_spawn_interval: self.combat.enemies().spawn_interval().to_num::<f64>(),
                attack_interval,
                attack_range: f64::from(config.attack_range),
            },
            pets: self.pets().map(PetsSave::capture).unwrap_or_default(),
            equipment: self.equipment.clone(),
        }
    }

    /// Rebuild a session from a save. Every section restores on its own;
    /// absent sections keep the defaults from `config`.
    #[must_use]
    pub fn from_save(save: SaveData, config: SessionConfig) -> Self {
        let mut session = Self::new(config);

        if save.version > SAVE_VERSION {
            tracing::warn!(version = save.version, "Loading save from a newer version");
        }

        session.player = save.player;
        session.player.sanitize();
        session.resources = save.resources.to_resources();
        save.territory.apply(&mut session.territory);
        save.pets.apply(session.combat.pets_or_default());

        let spawn = save.combat.monster_spawn_interval;
        if spawn.is_finite() && spawn > 0.0 {
            session
                .combat
                .enemies_mut()
                .set_spawn_interval(Fixed::saturating_from_num(spawn));
        }
        let range = save.combat.attack_range;
        if range.is_finite() && range > 0.0 {
            session.combat.set_attack_range(range as i32);
        }

        session.last_active = save.timestamp;
        session.equipment = save.equipment;
        session.refresh_bonuses();
        session
    }

    /// Credit production for the time since the last activity.
    ///
    /// Absences under [`OFFLINE_THRESHOLD_MS`] are ignored. Otherwise any
    /// production still uncollected at the last activity is paid in full,
    /// then the capped, efficiency-reduced gains are credited and
    /// production timestamps skip the elapsed cycles so nothing is paid
    /// twice.
    pub fn apply_offline_progress(&mut self, now_ms: u64) -> Option<OfflineReport> {
        let elapsed_ms = now_ms.saturating_sub(self.last_active);
        if elapsed_ms < OFFLINE_THRESHOLD_MS {
            return None;
        }

        let collected = self.territory.collect_resources(self.last_active, &mut self.resources);
        let gains = self.territory.calculate_offline_gains(elapsed_ms);
        gains.credit_to(&mut self.resources);
        self.territory.fast_forward_production(now_ms);
        self.last_active = now_ms;

        let capped_ms = elapsed_ms.min(self.territory.config().offline_cap_ms);
        tracing::info!(
            elapsed_ms,
            capped_ms,
            collected_coins = collected.coins,
            coins = gains.coins,
            crystals = gains.crystals,
            rubies = gains.rubies,
            "Offline gains applied"
        );
        Some(OfflineReport {
            elapsed_ms,
            capped_ms,
            collected,
            gains,
        })
    }

    /// Hash of the simulation state, for determinism checks.
    ///
    /// Two sessions with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match bincode::serialize(self) {
            Ok(bytes) => bytes.hash(&mut hasher),
            Err(e) => tracing::warn!(error = %e, "Failed to encode session for hashing"),
        }
        hasher.finish()
    }

    /// Serialize the simulation state.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Snapshot(format!("Failed to serialize session: {}", e)))
    }

    /// Deserialize simulation state produced by [`GameSession::snapshot`].
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn restore(data: &[u8]) -> Result<Self> {
        let mut session: Self = bincode::deserialize(data)
            .map_err(|e| GameError::Snapshot(format!("Failed to deserialize session: {}", e)))?;
        session.refresh_bonuses();
        Ok(session)
    }

    /// Draw the combat field.
    pub fn render_combat(&self, canvas: &mut dyn Canvas) {
        self.combat.render(canvas);
    }

    /// Draw the territory grid.
    pub fn render_territory(&self, canvas: &mut dyn Canvas) {
        self.territory.render(canvas);
    }

    /// Current player attack, including territory bonuses.
    #[must_use]
    pub fn player_attack(&self) -> Fixed {
        self.player.attack()
    }

    fn refresh_bonuses(&mut self) {
        self.player.set_territory_bonuses(self.territory.bonuses());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemy::EnemyParams;
    use crate::math::Vec2Fixed;
    use crate::pet::FormationGroup;
    use crate::resources::ResourceLedger;

    fn rich() -> GameSession {
        GameSession::new(SessionConfig {
            starting_resources: Resources::new(1_000_000, 100_000, 0),
            ..SessionConfig::default()
        })
    }

    #[test]
    fn test_building_bonus_reaches_player() {
        let mut session = rich();
        let before = session.player_attack();
        session.build("barracks", 0, 0).unwrap();
        assert_eq!(session.player_attack(), before + Fixed::from_num(5));
        session.upgrade_building(0).unwrap();
        assert_eq!(session.player_attack(), before + Fixed::from_num(10));
        session.demolish_building(0).unwrap();
        assert_eq!(session.player_attack(), before);
    }

    #[test]
    fn test_kill_grants_player_exp() {
        let mut session = rich();
        session.build("workshop", 0, 0).unwrap();
        let enemy = session.combat_mut().enemies_mut().spawn(EnemyParams {
            position: Vec2Fixed::from_ints(300, 280),
            max_hp: 1,
            exp_reward: 20,
            speed: Fixed::ZERO,
            ..EnemyParams::default()
        });

        let mut killed = false;
        for frame in 0..200u64 {
            let events = session.update(Fixed::from_num(16), frame * 16);
            killed |= events
                .iter()
                .any(|e| matches!(e, CombatEvent::EnemyKilled { enemy: id, .. } if *id == enemy));
            if killed {
                break;
            }
        }
        assert!(killed);
        // workshop level 1 adds 5%
        assert_eq!(session.player().exp, 21);
        assert_eq!(session.achievements().kills, 1);
    }

    #[test]
    fn test_save_round_trip_restores_every_section() {
        let mut session = rich();
        session.build("main_base", 0, 0).unwrap();
        session.build("gold_mine", 1, 0).unwrap();
        let cub = session.unlock_pet("ember_cub", 0).unwrap();
        session
            .equip_pet(cub, FormationSlot::new(FormationGroup::Back, 2))
            .unwrap();
        session.combat_mut().set_attack_range(320);

        let json = session.to_save(5_000).to_json().unwrap();
        let loaded = GameSession::from_save(SaveData::from_json(&json).unwrap(), SessionConfig::default());

        assert_eq!(loaded.resources(), session.resources());
        assert_eq!(loaded.territory().buildings(), session.territory().buildings());
        assert_eq!(loaded.combat().config().attack_range, 320);
        assert_eq!(loaded.last_active(), 5_000);
        let pets = loaded.pets().unwrap();
        assert_eq!(pets.formation_row(FormationGroup::Back), [None, None, Some(cub)]);
    }

    #[test]
    fn test_offline_progress_threshold_and_credit() {
        let mut session = rich();
        session.build("gold_mine", 0, 0).unwrap();
        let coins = session.resources().coins();

        assert_eq!(session.apply_offline_progress(59_999), None);

        let report = session.apply_offline_progress(600_000).unwrap();
        // 10 cycles of 50 coins at 50% efficiency
        assert_eq!(report.gains.coins, 250);
        assert_eq!(session.resources().coins(), coins + 250);

        // production was fast-forwarded, nothing is paid twice
        assert!(session.collect_resources(600_000).is_empty());
    }

    #[test]
    fn test_snapshot_round_trip_preserves_hash() {
        let mut session = GameSession::with_seed(9);
        for frame in 0..300u64 {
            session.update(Fixed::from_num(16), frame * 16);
        }
        let bytes = session.snapshot().unwrap();
        let restored = GameSession::restore(&bytes).unwrap();
        assert_eq!(restored.state_hash(), session.state_hash());
    }

    #[test]
    fn test_failed_actions_do_not_mutate() {
        let mut session = GameSession::default();
        let hash = session.state_hash();
        assert!(session.build("gold_mine", 0, 0).is_err());
        assert!(session.unlock_pet("ember_cub", 0).is_err());
        assert!(session.purchase_upgrade(UpgradeKind::Attack).is_err());
        assert_eq!(session.state_hash(), hash);
    }
}
