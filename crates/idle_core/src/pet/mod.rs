//! Pets: catalog, owned roster with care needs, formation and combat.

pub mod catalog;
pub mod roster;
pub mod system;

pub use catalog::{Element, PetCatalog, PetTemplate, Rarity, SkillDef, SkillKind, StatBlock};
pub use roster::{Deployment, FormationGroup, FormationSlot, Pet, PetError, PetId, FORMATION_SIZE};
pub use system::{
    formation_anchor, PetBullet, PetBulletId, PetCombatEvent, PetSystem, SkillEffect,
};
