//! Pet roster, formation and pet combat.
//!
//! Deployed pets fight on their own each frame: a basic attack on a
//! fixed cadence and a skill on its cooldown. Combat timers live inside
//! [`Deployment::Deployed`], so benching a pet drops them with it.
//!
//! Pet bullets and skill effects are owned here. The combat controller
//! resolves bullet hits; skill effects resolve themselves against the
//! enemy system and report what they did as [`PetCombatEvent`]s so kills
//! share the controller's reward path.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::catalog::{PetCatalog, SkillKind};
use super::roster::{
    Deployment, FormationGroup, FormationSlot, Pet, PetError, PetId, CARE_MAX, FORMATION_SIZE,
};
use crate::collision::{circle_circle, Circle};
use crate::enemy::{DamageReport, EnemyId, EnemySystem};
use crate::math::{fixed_serde, per_second, Fixed, MapSize, Vec2Fixed, MS_PER_SECOND};
use crate::projectile::BOUNDS_MARGIN;
use crate::render::{Canvas, Color};
use crate::resources::ResourceLedger;

/// Reach of area skills around their cast origin.
pub const SKILL_RADIUS: i32 = 150;

/// How long a skill effect stays active (and visible), in milliseconds.
pub const SKILL_EFFECT_LIFE_MS: i32 = 600;

/// Pet bullet speed in units per second.
pub const PET_BULLET_SPEED: i32 = 400;

/// Pet bullet size, also its hit tolerance.
pub const PET_BULLET_SIZE: i32 = 8;

/// Pet bullet lifetime in milliseconds.
pub const PET_BULLET_LIFE_MS: i32 = 3000;

/// X coordinate of the front row.
pub const FRONT_COLUMN_X: i32 = 160;

/// X coordinate of the back row.
pub const BACK_COLUMN_X: i32 = 100;

/// Vertical distance between formation columns.
pub const ROW_SPACING: i32 = 70;

/// Identifier of a pet bullet.
pub type PetBulletId = u32;

/// Where a formation slot stands on the map.
#[must_use]
pub fn formation_anchor(slot: FormationSlot, map: MapSize) -> Vec2Fixed {
    let x = match slot.group {
        FormationGroup::Front => FRONT_COLUMN_X,
        FormationGroup::Back => BACK_COLUMN_X,
    };
    debug_assert!(slot.index < FORMATION_SIZE, "formation index {} out of range", slot.index);
    let column = i32::try_from(slot.index).unwrap_or(i32::MAX);
    let offset = column.saturating_sub(1).saturating_mul(ROW_SPACING);
    Vec2Fixed::new(
        Fixed::from_num(x),
        map.height / Fixed::from_num(2) + Fixed::from_num(offset),
    )
}

/// A basic attack in flight. Hits for flat damage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PetBullet {
    /// Unique id.
    pub id: PetBulletId,
    /// Pet that fired it.
    pub owner: PetId,
    /// Current position.
    pub position: Vec2Fixed,
    /// Unit direction, fixed at fire time.
    pub direction: Vec2Fixed,
    /// Units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Size, used as hit tolerance.
    #[serde(with = "fixed_serde")]
    pub size: Fixed,
    /// Remaining life in milliseconds.
    #[serde(with = "fixed_serde")]
    pub life: Fixed,
    /// Damage on hit.
    pub damage: u32,
    /// Set once it hit something.
    pub spent: bool,
}

impl PetBullet {
    /// Whether the bullet can still hit.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.spent && self.life > Fixed::ZERO
    }
}

/// One skill cast, alive for [`SKILL_EFFECT_LIFE_MS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkillEffect {
    /// Casting pet.
    pub caster: PetId,
    /// Skill key.
    pub skill_id: String,
    /// Payload.
    pub kind: SkillKind,
    /// Centre of the area.
    pub origin: Vec2Fixed,
    /// Area radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Damage per enemy, or heal per pet.
    pub amount: u32,
    /// Remaining life in milliseconds.
    #[serde(with = "fixed_serde")]
    pub life: Fixed,
    /// Enemies already hit by this cast.
    pub applied_to: BTreeSet<EnemyId>,
    /// Whether a support effect already fired.
    pub has_triggered: bool,
}

/// Something a skill did this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetCombatEvent {
    /// A skill damaged an enemy.
    SkillHit {
        /// Casting pet.
        caster: PetId,
        /// Enemy hit.
        enemy: EnemyId,
        /// Damage dealt.
        damage: u32,
        /// Enemy state after the hit.
        report: DamageReport,
    },
    /// A support skill restored hit points.
    Healed {
        /// Pet healed.
        target: PetId,
        /// Hit points restored.
        amount: u32,
        /// Where the pet stands.
        position: Vec2Fixed,
    },
}

/// Owns every pet, the formation, pet bullets and active skill effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetSystem {
    catalog: PetCatalog,
    pets: Vec<Pet>,
    bullets: Vec<PetBullet>,
    effects: Vec<SkillEffect>,
    next_pet_id: PetId,
    next_bullet_id: PetBulletId,
}

impl Default for PetSystem {
    fn default() -> Self {
        Self::new(PetCatalog::builtin())
    }
}

impl PetSystem {
    /// Empty roster over a catalog.
    #[must_use]
    pub fn new(catalog: PetCatalog) -> Self {
        Self {
            catalog,
            pets: Vec::new(),
            bullets: Vec::new(),
            effects: Vec::new(),
            next_pet_id: 1,
            next_bullet_id: 1,
        }
    }

    /// Pet templates.
    #[must_use]
    pub const fn catalog(&self) -> &PetCatalog {
        &self.catalog
    }

    /// Owned pets in unlock order.
    #[must_use]
    pub fn pets(&self) -> &[Pet] {
        &self.pets
    }

    /// Look up an owned pet.
    #[must_use]
    pub fn get(&self, id: PetId) -> Option<&Pet> {
        self.pets.iter().find(|p| p.id == id)
    }

    /// Whether a pet of `template_id` is owned.
    #[must_use]
    pub fn owns(&self, template_id: &str) -> bool {
        self.pets.iter().any(|p| p.template_id == template_id)
    }

    /// Pets in the formation.
    pub fn deployed(&self) -> impl Iterator<Item = &Pet> {
        self.pets.iter().filter(|p| p.is_deployed())
    }

    /// Pet occupying `slot`.
    #[must_use]
    pub fn occupant(&self, slot: FormationSlot) -> Option<PetId> {
        self.pets
            .iter()
            .find(|p| p.position() == Some(slot))
            .map(|p| p.id)
    }

    /// Occupants of one formation row by column.
    #[must_use]
    pub fn formation_row(&self, group: FormationGroup) -> [Option<PetId>; FORMATION_SIZE] {
        let mut row = [None; FORMATION_SIZE];
        for (index, cell) in row.iter_mut().enumerate() {
            *cell = self.occupant(FormationSlot::new(group, index));
        }
        row
    }

    /// Pet bullets in flight.
    #[must_use]
    pub fn bullets(&self) -> &[PetBullet] {
        &self.bullets
    }

    /// Active skill effects.
    #[must_use]
    pub fn effects(&self) -> &[SkillEffect] {
        &self.effects
    }

    /// Adopt a pet from the catalog.
    pub fn unlock(
        &mut self,
        template_id: &str,
        player_level: u32,
        now_ms: u64,
        ledger: &mut dyn ResourceLedger,
    ) -> Result<PetId, PetError> {
        let template = self
            .catalog
            .get(template_id)
            .ok_or_else(|| PetError::UnknownTemplate(template_id.to_string()))?;
        if self.owns(template_id) {
            return Err(PetError::AlreadyOwned(template_id.to_string()));
        }
        if player_level < template.unlock_level {
            return Err(PetError::LevelTooLow {
                required: template.unlock_level,
                current: player_level,
            });
        }
        if !ledger.spend_coins(template.unlock_cost) {
            return Err(PetError::InsufficientCoins(template.unlock_cost));
        }

        let id = self.next_pet_id;
        self.next_pet_id += 1;
        self.pets.push(Pet::from_template(id, template, now_ms));

        tracing::info!(pet = id, template = template_id, "Pet unlocked");
        Ok(id)
    }

    /// Put a pet into `slot`, benching whoever was there.
    ///
    /// A pet already deployed elsewhere moves. The pet is healed to full
    /// and its combat timers start from zero. Returns the displaced pet.
    pub fn equip(&mut self, id: PetId, slot: FormationSlot) -> Result<Option<PetId>, PetError> {
        if slot.index >= FORMATION_SIZE {
            return Err(PetError::InvalidSlot(slot.index));
        }
        if self.get(id).is_none() {
            return Err(PetError::UnknownPet(id));
        }

        let displaced = self.occupant(slot).filter(|&occupant| occupant != id);
        if let Some(occupant) = displaced {
            if let Some(pet) = self.pet_mut(occupant) {
                pet.deployment = Deployment::Benched;
            }
        }

        let pet = self.pet_mut(id).ok_or(PetError::UnknownPet(id))?;
        pet.deployment = Deployment::Deployed {
            slot,
            attack_timer: Fixed::ZERO,
            skill_timer: Fixed::ZERO,
        };
        pet.current_hp = pet.max_hp;

        tracing::debug!(pet = id, group = slot.group.as_str(), index = slot.index, "Pet equipped");
        Ok(displaced)
    }

    /// Take a pet out of the formation.
    pub fn unequip(&mut self, id: PetId) -> Result<(), PetError> {
        let pet = self.pet_mut(id).ok_or(PetError::UnknownPet(id))?;
        pet.deployment = Deployment::Benched;
        Ok(())
    }

    /// Refill hunger for `20 * level` coins.
    pub fn feed(
        &mut self,
        id: PetId,
        now_ms: u64,
        ledger: &mut dyn ResourceLedger,
    ) -> Result<(), PetError> {
        let pet = self.pet_mut(id).ok_or(PetError::UnknownPet(id))?;
        pet.refresh_needs(now_ms);
        if pet.hunger >= CARE_MAX {
            return Err(PetError::NotHungry);
        }
        let cost = pet.feed_cost();
        if !ledger.spend_coins(cost) {
            return Err(PetError::InsufficientCoins(cost));
        }
        pet.feed(now_ms);
        Ok(())
    }

    /// Train for experience at the cost of energy.
    pub fn train(&mut self, id: PetId, now_ms: u64) -> Result<(), PetError> {
        let pet = self.pet_mut(id).ok_or(PetError::UnknownPet(id))?;
        pet.refresh_needs(now_ms);
        pet.train(now_ms)
    }

    /// Spend experience and `100 * level` coins on a level. Returns the new level.
    pub fn level_up(&mut self, id: PetId, ledger: &mut dyn ResourceLedger) -> Result<u32, PetError> {
        let pet = self
            .pets
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(PetError::UnknownPet(id))?;
        let template = self
            .catalog
            .get(&pet.template_id)
            .ok_or_else(|| PetError::UnknownTemplate(pet.template_id.clone()))?;
        if pet.exp < pet.exp_to_next {
            return Err(PetError::NotEnoughExp {
                have: pet.exp,
                need: pet.exp_to_next,
            });
        }
        let cost = pet.level_up_cost();
        if !ledger.spend_coins(cost) {
            return Err(PetError::InsufficientCoins(cost));
        }
        pet.level_up(template);

        tracing::info!(pet = id, level = pet.level, "Pet leveled up");
        Ok(pet.level)
    }

    /// Re-derive hunger and energy of every pet at `now_ms`.
    pub fn update_pet_states(&mut self, now_ms: u64) {
        for pet in &mut self.pets {
            pet.refresh_needs(now_ms);
        }
    }

    /// Advance bullets and effects, run attack and skill timers of
    /// deployed pets, then resolve active skill effects.
    pub fn update_pet_combat(
        &mut self,
        dt_ms: Fixed,
        enemies: &mut EnemySystem,
        map: MapSize,
    ) -> Vec<PetCombatEvent> {
        self.advance_bullets(dt_ms, map);
        for effect in &mut self.effects {
            effect.life -= dt_ms;
        }
        self.effects.retain(|e| e.life > Fixed::ZERO);

        let mut shots = Vec::new();
        for pet in &mut self.pets {
            let Deployment::Deployed {
                slot,
                attack_timer,
                skill_timer,
            } = &mut pet.deployment
            else {
                continue;
            };
            let Some(template) = self.catalog.get(&pet.template_id) else {
                continue;
            };
            let anchor = formation_anchor(*slot, map);
            let nearest = enemies.nearest_living(anchor, Fixed::MAX).map(|e| e.center());

            *attack_timer = attack_timer.saturating_add(dt_ms);
            if pet.attack_speed > Fixed::ZERO {
                let interval = Fixed::from_num(MS_PER_SECOND).saturating_div(pet.attack_speed);
                if *attack_timer >= interval {
                    if let Some(target) = nearest {
                        shots.push((pet.id, anchor, target, pet.attack));
                        *attack_timer = Fixed::ZERO;
                    }
                }
            }

            *skill_timer = skill_timer.saturating_add(dt_ms);
            if *skill_timer >= Fixed::from_num(template.skill.cooldown_ms) {
                *skill_timer = Fixed::ZERO;
                let origin = nearest.unwrap_or(anchor);
                tracing::debug!(pet = pet.id, skill = %template.skill.id, "Pet skill cast");
                self.effects.push(SkillEffect {
                    caster: pet.id,
                    skill_id: template.skill.id.clone(),
                    kind: template.skill.kind,
                    origin,
                    radius: Fixed::from_num(SKILL_RADIUS),
                    amount: template.skill.amount(pet.attack),
                    life: Fixed::from_num(SKILL_EFFECT_LIFE_MS),
                    applied_to: BTreeSet::new(),
                    has_triggered: false,
                });
            }
        }

        for (owner, origin, target, attack) in shots {
            self.fire(owner, origin, target, attack);
        }

        self.resolve_effects(enemies, map)
    }

    /// Mark a bullet as having hit.
    pub fn mark_bullet_spent(&mut self, id: PetBulletId) {
        if let Some(bullet) = self.bullets.iter_mut().find(|b| b.id == id) {
            bullet.spent = true;
        }
    }

    /// Remove every spent bullet.
    pub fn compact_bullets(&mut self) {
        self.bullets.retain(|b| !b.spent);
    }

    /// Replace the roster with persisted pets and formation rows.
    ///
    /// Pets of unknown templates are dropped, duplicate ids renumbered and
    /// care stats clamped. Formation entries that name a missing or
    /// already placed pet are ignored.
    pub fn restore(
        &mut self,
        pets: Vec<Pet>,
        front: &[Option<PetId>],
        back: &[Option<PetId>],
    ) {
        self.pets.clear();
        self.bullets.clear();
        self.effects.clear();

        for mut pet in pets {
            if self.catalog.get(&pet.template_id).is_none() {
                tracing::warn!(template = %pet.template_id, "Dropping saved pet of unknown template");
                continue;
            }
            if pet.id == 0 || self.get(pet.id).is_some() {
                pet.id = self.highest_pet_id() + 1;
            }
            pet.sanitize();
            pet.deployment = Deployment::Benched;
            self.pets.push(pet);
        }

        for (group, row) in [(FormationGroup::Front, front), (FormationGroup::Back, back)] {
            for (index, entry) in row.iter().take(FORMATION_SIZE).enumerate() {
                let Some(id) = *entry else { continue };
                match self.pet_mut(id) {
                    Some(pet) if !pet.is_deployed() => {
                        pet.deployment = Deployment::Deployed {
                            slot: FormationSlot::new(group, index),
                            attack_timer: Fixed::ZERO,
                            skill_timer: Fixed::ZERO,
                        };
                    }
                    _ => tracing::warn!(pet = id, group = group.as_str(), "Ignoring saved formation entry"),
                }
            }
        }

        self.next_pet_id = self.highest_pet_id() + 1;
    }

    /// Draw deployed pets, their bullets and skill areas.
    pub fn render(&self, canvas: &mut dyn Canvas, map: MapSize) {
        let body = Fixed::from_num(14);
        for pet in self.deployed() {
            let Some(slot) = pet.position() else { continue };
            let anchor = formation_anchor(slot, map);
            canvas.fill_circle(anchor, body, Color::GREEN);
            let fraction = Fixed::from_num(pet.current_hp) / Fixed::from_num(pet.max_hp.max(1));
            let bar = Vec2Fixed::new(anchor.x - body, anchor.y - body - Fixed::from_num(6));
            canvas.fill_rect(bar, body * Fixed::from_num(2) * fraction, Fixed::from_num(3), Color::GREEN);
        }

        let half = Fixed::from_num(2);
        for bullet in &self.bullets {
            canvas.fill_circle(bullet.position, bullet.size / half, Color::YELLOW);
        }

        let life = Fixed::from_num(SKILL_EFFECT_LIFE_MS);
        for effect in &self.effects {
            let color = if effect.kind.is_support() { Color::GREEN } else { Color::ORANGE };
            canvas.fill_circle(effect.origin, effect.radius, color.faded(effect.life / life));
        }
    }

    fn fire(&mut self, owner: PetId, origin: Vec2Fixed, target: Vec2Fixed, attack: i32) {
        let id = self.next_bullet_id;
        self.next_bullet_id += 1;
        self.bullets.push(PetBullet {
            id,
            owner,
            position: origin,
            direction: origin.direction_to(target),
            speed: Fixed::from_num(PET_BULLET_SPEED),
            size: Fixed::from_num(PET_BULLET_SIZE),
            life: Fixed::from_num(PET_BULLET_LIFE_MS),
            damage: u32::try_from(attack.max(0)).unwrap_or(0),
            spent: false,
        });
    }

    fn advance_bullets(&mut self, dt_ms: Fixed, map: MapSize) {
        for bullet in &mut self.bullets {
            bullet.position += bullet.direction.scale(per_second(bullet.speed, dt_ms));
            bullet.life -= dt_ms;
        }
        let margin = Fixed::from_num(BOUNDS_MARGIN);
        self.bullets
            .retain(|b| b.is_active() && !map.is_outside(b.position, margin));
    }

    fn resolve_effects(&mut self, enemies: &mut EnemySystem, map: MapSize) -> Vec<PetCombatEvent> {
        let mut events = Vec::new();

        for effect in &mut self.effects {
            if effect.kind.is_support() {
                if !effect.has_triggered {
                    effect.has_triggered = true;
                    let heal = i32::try_from(effect.amount).unwrap_or(i32::MAX);
                    for pet in self.pets.iter_mut() {
                        let Some(slot) = pet.position() else { continue };
                        let before = pet.current_hp;
                        pet.current_hp = pet.current_hp.saturating_add(heal).min(pet.max_hp);
                        let restored = pet.current_hp - before;
                        if restored > 0 {
                            events.push(PetCombatEvent::Healed {
                                target: pet.id,
                                amount: restored as u32,
                                position: formation_anchor(slot, map),
                            });
                        }
                    }
                }
            } else {
                let area = Circle::new(effect.origin, effect.radius);
                let targets: Vec<EnemyId> = enemies
                    .living()
                    .filter(|e| !effect.applied_to.contains(&e.id))
                    .filter(|e| circle_circle(&area, &Circle::point(e.center())))
                    .map(|e| e.id)
                    .collect();

                for enemy in targets {
                    effect.applied_to.insert(enemy);
                    let Some(report) = enemies.apply_damage(enemy, effect.amount) else {
                        continue;
                    };
                    match effect.kind {
                        SkillKind::Slow {
                            multiplier,
                            duration_ms,
                        } => enemies.apply_slow(enemy, multiplier, Fixed::from_num(duration_ms)),
                        SkillKind::Stun { duration_ms } => {
                            enemies.apply_stun(enemy, Fixed::from_num(duration_ms));
                        }
                        SkillKind::Damage | SkillKind::Heal => {}
                    }
                    events.push(PetCombatEvent::SkillHit {
                        caster: effect.caster,
                        enemy,
                        damage: effect.amount,
                        report,
                    });
                }
            }
        }

        events
    }

    fn pet_mut(&mut self, id: PetId) -> Option<&mut Pet> {
        self.pets.iter_mut().find(|p| p.id == id)
    }

    fn highest_pet_id(&self) -> PetId {
        self.pets.iter().map(|p| p.id).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemy::EnemyParams;
    use crate::resources::Resources;

    fn ms(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn front(index: usize) -> FormationSlot {
        FormationSlot::new(FormationGroup::Front, index)
    }

    fn roster_with(templates: &[&str]) -> (PetSystem, Vec<PetId>) {
        let mut pets = PetSystem::default();
        let mut wallet = Resources::new(1_000_000, 0, 0);
        let ids = templates
            .iter()
            .map(|t| pets.unlock(t, 99, 0, &mut wallet).unwrap())
            .collect();
        (pets, ids)
    }

    fn quiet_enemies() -> EnemySystem {
        EnemySystem::new(ms(1_000_000))
    }

    #[test]
    fn test_formation_anchors_are_centred_on_the_map() {
        let map = MapSize::new(800, 600);
        let ys: Vec<_> = (0..FORMATION_SIZE)
            .map(|i| formation_anchor(FormationSlot::new(FormationGroup::Back, i), map).y)
            .collect();
        assert_eq!(ys, [Fixed::from_num(230), Fixed::from_num(300), Fixed::from_num(370)]);

        let front = formation_anchor(FormationSlot::new(FormationGroup::Front, 1), map);
        assert_eq!(front, Vec2Fixed::from_ints(FRONT_COLUMN_X, 300));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "formation index 3 out of range")]
    fn test_formation_anchor_rejects_index_past_row() {
        let _ = formation_anchor(FormationSlot::new(FormationGroup::Front, 3), MapSize::new(800, 600));
    }

    #[test]
    fn test_unlock_gates() {
        let mut pets = PetSystem::default();
        let mut wallet = Resources::new(600, 0, 0);
        assert_eq!(
            pets.unlock("storm_hawk", 4, 0, &mut wallet),
            Err(PetError::LevelTooLow { required: 5, current: 4 })
        );
        assert_eq!(
            pets.unlock("griffin", 10, 0, &mut wallet),
            Err(PetError::UnknownTemplate("griffin".into()))
        );
        let id = pets.unlock("ember_cub", 1, 0, &mut wallet).unwrap();
        assert_eq!(wallet.coins(), 100);
        assert_eq!(
            pets.unlock("ember_cub", 1, 0, &mut wallet),
            Err(PetError::AlreadyOwned("ember_cub".into()))
        );
        assert_eq!(pets.get(id).unwrap().template_id, "ember_cub");
    }

    #[test]
    fn test_equip_displaces_occupant() {
        let (mut pets, ids) = roster_with(&["ember_cub", "frost_fox"]);
        let (a, b) = (ids[0], ids[1]);

        assert_eq!(pets.equip(a, front(0)), Ok(None));
        assert_eq!(pets.equip(b, front(0)), Ok(Some(a)));

        assert!(pets.get(a).unwrap().position().is_none());
        assert_eq!(pets.get(a).unwrap().deployment, Deployment::Benched);
        assert_eq!(pets.occupant(front(0)), Some(b));
        assert_eq!(pets.deployed().count(), 1);
    }

    #[test]
    fn test_equip_moves_pet_between_slots() {
        let (mut pets, ids) = roster_with(&["ember_cub"]);
        pets.equip(ids[0], front(0)).unwrap();
        pets.equip(ids[0], FormationSlot::new(FormationGroup::Back, 2)).unwrap();
        assert_eq!(pets.formation_row(FormationGroup::Front), [None, None, None]);
        assert_eq!(pets.formation_row(FormationGroup::Back), [None, None, Some(ids[0])]);
    }

    #[test]
    fn test_equip_rejects_bad_slot_and_heals() {
        let (mut pets, ids) = roster_with(&["ember_cub"]);
        assert_eq!(pets.equip(ids[0], front(3)), Err(PetError::InvalidSlot(3)));
        assert_eq!(pets.equip(99, front(0)), Err(PetError::UnknownPet(99)));

        pets.pet_mut(ids[0]).unwrap().current_hp = 1;
        pets.equip(ids[0], front(1)).unwrap();
        assert_eq!(pets.get(ids[0]).unwrap().current_hp, 60);
        pets.unequip(ids[0]).unwrap();
        assert!(!pets.get(ids[0]).unwrap().is_deployed());
    }

    #[test]
    fn test_feed_requires_hunger_and_coins() {
        let (mut pets, ids) = roster_with(&["ember_cub"]);
        let mut wallet = Resources::new(15, 0, 0);
        assert_eq!(pets.feed(ids[0], 0, &mut wallet), Err(PetError::NotHungry));
        assert_eq!(
            pets.feed(ids[0], 600_000, &mut wallet),
            Err(PetError::InsufficientCoins(20))
        );

        let mut wallet = Resources::new(20, 0, 0);
        pets.feed(ids[0], 600_000, &mut wallet).unwrap();
        let pet = pets.get(ids[0]).unwrap();
        assert_eq!(pet.hunger, 100);
        assert_eq!(pet.friendship, 55);
        assert_eq!(pet.exp, 10);
        assert_eq!(wallet.coins(), 0);
    }

    #[test]
    fn test_level_up_costs_coins() {
        let (mut pets, ids) = roster_with(&["ember_cub"]);
        let mut wallet = Resources::new(100, 0, 0);
        assert_eq!(
            pets.level_up(ids[0], &mut wallet),
            Err(PetError::NotEnoughExp { have: 0, need: 100 })
        );
        for _ in 0..4 {
            pets.train(ids[0], 0).unwrap();
        }
        assert_eq!(pets.level_up(ids[0], &mut wallet), Ok(2));
        assert_eq!(wallet.coins(), 0);
        assert_eq!(pets.get(ids[0]).unwrap().exp, 0);
    }

    #[test]
    fn test_pet_fires_at_nearest_enemy() {
        let (mut pets, ids) = roster_with(&["ember_cub"]);
        pets.equip(ids[0], front(1)).unwrap();
        let mut enemies = quiet_enemies();
        let map = MapSize::default();

        // no target: the timer banks and nothing fires
        pets.update_pet_combat(ms(1000), &mut enemies, map);
        assert!(pets.bullets().is_empty());

        enemies.spawn(EnemyParams {
            position: Vec2Fixed::from_ints(600, 280),
            ..EnemyParams::default()
        });
        pets.update_pet_combat(ms(16), &mut enemies, map);
        assert_eq!(pets.bullets().len(), 1);
        let bullet = &pets.bullets()[0];
        assert_eq!(bullet.damage, 8);
        assert_eq!(bullet.position, Vec2Fixed::from_ints(160, 300));
    }

    #[test]
    fn test_damage_skill_hits_each_enemy_once() {
        let (mut pets, ids) = roster_with(&["ember_cub"]);
        pets.equip(ids[0], front(1)).unwrap();
        let mut enemies = quiet_enemies();
        let map = MapSize::default();
        let id = enemies.spawn(EnemyParams {
            position: Vec2Fixed::from_ints(600, 280),
            max_hp: 1000,
            speed: Fixed::ZERO,
            ..EnemyParams::default()
        });

        let events = pets.update_pet_combat(ms(5000), &mut enemies, map);
        let hits: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, PetCombatEvent::SkillHit { .. }))
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(enemies.get(id).unwrap().hp, 1000 - 16);

        // the effect lingers but does not hit again
        let events = pets.update_pet_combat(ms(100), &mut enemies, map);
        assert!(events.is_empty());
        assert_eq!(pets.effects().len(), 1);
        assert_eq!(enemies.get(id).unwrap().hp, 1000 - 16);

        pets.update_pet_combat(ms(500), &mut enemies, map);
        assert!(pets.effects().is_empty());
    }

    #[test]
    fn test_stun_skill_applies_crowd_control() {
        let (mut pets, ids) = roster_with(&["storm_hawk"]);
        pets.equip(ids[0], front(1)).unwrap();
        let mut enemies = quiet_enemies();
        let id = enemies.spawn(EnemyParams {
            position: Vec2Fixed::from_ints(500, 280),
            max_hp: 1000,
            ..EnemyParams::default()
        });

        pets.update_pet_combat(ms(8000), &mut enemies, MapSize::default());
        let enemy = enemies.get(id).unwrap();
        assert!(enemy.is_stunned);
        assert_eq!(enemy.hp, 1000 - 15);
    }

    #[test]
    fn test_heal_skill_triggers_once() {
        let (mut pets, ids) = roster_with(&["dawn_sprite", "ember_cub"]);
        pets.equip(ids[0], front(0)).unwrap();
        pets.equip(ids[1], front(1)).unwrap();
        pets.pet_mut(ids[1]).unwrap().current_hp = 20;
        let mut enemies = quiet_enemies();

        let events = pets.update_pet_combat(ms(7000), &mut enemies, MapSize::default());
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], PetCombatEvent::Healed { target, amount: 10, .. } if target == ids[1]));

        pets.pet_mut(ids[1]).unwrap().current_hp = 20;
        let events = pets.update_pet_combat(ms(100), &mut enemies, MapSize::default());
        assert!(events.is_empty());
    }

    #[test]
    fn test_restore_rebuilds_formation() {
        let (source, ids) = roster_with(&["ember_cub", "frost_fox"]);
        let saved: Vec<Pet> = source.pets().to_vec();

        let mut pets = PetSystem::default();
        pets.restore(saved, &[Some(ids[1]), Some(ids[1]), Some(77)], &[None, None, Some(ids[0])]);

        assert_eq!(pets.formation_row(FormationGroup::Front), [Some(ids[1]), None, None]);
        assert_eq!(pets.formation_row(FormationGroup::Back), [None, None, Some(ids[0])]);

        let mut wallet = Resources::new(10_000, 0, 0);
        let next = pets.unlock("dawn_sprite", 10, 0, &mut wallet).unwrap();
        assert_eq!(next, 3);
    }
}
