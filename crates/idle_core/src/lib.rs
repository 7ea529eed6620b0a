//! # Idle Core
//!
//! Deterministic engine for an idle RPG: auto-battling against waves of
//! enemies, pets fighting in formation, and a territory of buildings
//! that keeps producing while the player is away.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering backend (systems draw through the [`render::Canvas`] trait)
//! - No IO
//! - No system clock (every timestamp is passed in as `now_ms`)
//! - No system randomness (every draw goes through [`rng::RandomSource`])
//!
//! This separation enables:
//! - Headless runs and offline projection
//! - Seeded replays
//! - Determinism testing through [`session::GameSession::state_hash`]
//!
//! ## Crate Structure
//!
//! - [`damage`], [`collision`] - Pure combat math
//! - [`enemy`], [`projectile`], [`vfx`] - Combat field systems
//! - [`combat`] - Per-frame controller tying them together
//! - [`pet`] - Pet roster, formation and pet combat
//! - [`territory`] - Building grid, production and expansions
//! - [`player`] - Player attributes, upgrades and derived stats
//! - [`resources`], [`achievements`] - Collaborator interfaces
//! - [`save`], [`session`] - Persistence and the composition root

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod achievements;
pub mod collision;
pub mod combat;
pub mod damage;
pub mod enemy;
pub mod error;
pub mod math;
pub mod pet;
pub mod player;
pub mod projectile;
pub mod render;
pub mod resources;
pub mod rng;
pub mod save;
pub mod session;
pub mod territory;
pub mod vfx;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::achievements::{AchievementEvent, AchievementLog, AchievementSink};
    pub use crate::combat::{CombatConfig, CombatController, CombatEvent, FrameContext};
    pub use crate::damage::{calculate_damage, AttackerStats, DamageOutcome, DefenderStats};
    pub use crate::enemy::{EnemyId, EnemyParams, EnemySystem};
    pub use crate::error::{GameError, Result};
    pub use crate::math::{Fixed, MapSize, Vec2Fixed};
    pub use crate::pet::{FormationGroup, FormationSlot, PetError, PetId, PetSystem};
    pub use crate::player::{Attribute, PlayerStats, StatProvider, UpgradeKind};
    pub use crate::render::{Canvas, DrawList};
    pub use crate::resources::{Cost, ResourceBundle, ResourceLedger, Resources};
    pub use crate::rng::{RandomSource, ScriptedRng, SimRng};
    pub use crate::save::SaveData;
    pub use crate::session::{GameSession, OfflineReport, SessionConfig};
    pub use crate::territory::{TerritoryConfig, TerritoryError, TerritorySystem};
}
