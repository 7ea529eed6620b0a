//! Combat controller: the player's auto-attack and collision resolution.
//!
//! The controller owns the enemy, projectile and VFX systems plus an
//! optional pet system. Every frame runs the same fixed sequence so that
//! replays are reproducible:
//!
//! 1. **Movement** - enemies spawn and walk, projectiles and VFX advance
//! 2. **Auto-attack** - the player fires at the nearest enemy in range
//! 3. **Collision** - player projectiles hit enemies and kills pay out
//! 4. **Contact** - enemies touching the player are reported
//! 5. **Pets** - pet timers and skills, then pet bullets hit enemies
//!
//! A projectile fired in step 2 can only collide next frame, and an
//! enemy killed in step 3 stays in the enemy list (dead) until the next
//! enemy update removes it.

use serde::{Deserialize, Serialize};

use crate::achievements::{AchievementEvent, AchievementSink};
use crate::collision::{point_rect, rect_rect, Rect};
use crate::damage::calculate_damage;
use crate::enemy::{DamageReport, EnemyId, EnemySystem, DEFAULT_SPAWN_INTERVAL_MS};
use crate::math::{fixed_serde, Fixed, MapSize, Vec2Fixed, MS_PER_SECOND};
use crate::pet::{PetCombatEvent, PetId, PetSystem};
use crate::player::StatProvider;
use crate::projectile::{ProjectileId, ProjectileSpec, ProjectileSystem};
use crate::render::{Canvas, Color};
use crate::resources::ResourceLedger;
use crate::rng::RandomSource;
use crate::vfx::{CombatTextKind, VfxSystem};

/// Default auto-attack reach.
pub const DEFAULT_ATTACK_RANGE: i32 = 500;

/// Default horizontal position of the player's left edge.
pub const DEFAULT_PLAYER_X: i32 = 50;

/// Default player square size.
pub const DEFAULT_PLAYER_SIZE: i32 = 50;

/// Tunables of the combat field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Time between enemy spawns in milliseconds.
    pub spawn_interval_ms: u32,
    /// Auto-attack reach, measured from the player's centre.
    pub attack_range: i32,
    /// Field width.
    pub map_width: i32,
    /// Field height.
    pub map_height: i32,
    /// Player projectile flight parameters.
    pub projectile: ProjectileSpec,
    /// Player left edge.
    pub player_x: i32,
    /// Player square size; the player is centred vertically.
    pub player_size: i32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            spawn_interval_ms: DEFAULT_SPAWN_INTERVAL_MS as u32,
            attack_range: DEFAULT_ATTACK_RANGE,
            map_width: 800,
            map_height: 600,
            projectile: ProjectileSpec::default(),
            player_x: DEFAULT_PLAYER_X,
            player_size: DEFAULT_PLAYER_SIZE,
        }
    }
}

impl CombatConfig {
    /// Field dimensions.
    #[must_use]
    pub fn map(&self) -> MapSize {
        MapSize::new(self.map_width, self.map_height)
    }

    /// The player's screen rectangle.
    #[must_use]
    pub fn player_rect(&self) -> Rect {
        let y = (self.map_height - self.player_size) / 2;
        Rect::from_ints(self.player_x, y, self.player_size, self.player_size)
    }
}

/// Collaborators one frame needs.
pub struct FrameContext<'a> {
    /// Live player stats; snapshotted into each projectile at fire time.
    pub stats: &'a dyn StatProvider,
    /// Wallet credited with kill rewards.
    pub resources: &'a mut dyn ResourceLedger,
    /// Receiver of kill and coin events.
    pub achievements: &'a mut dyn AchievementSink,
    /// Damage rolls and spawn rolls.
    pub rng: &'a mut dyn RandomSource,
    /// Scales spawned enemies.
    pub player_level: u32,
}

/// Something that happened during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatEvent {
    /// An enemy entered the field.
    EnemySpawned(EnemyId),
    /// Living enemies walked off the left edge.
    EnemiesEscaped(usize),
    /// The player fired.
    ProjectileFired {
        /// New projectile.
        projectile: ProjectileId,
        /// Enemy aimed at.
        target: EnemyId,
    },
    /// A player projectile reached an enemy.
    EnemyHit {
        /// Enemy hit.
        enemy: EnemyId,
        /// Damage dealt, 0 when dodged.
        damage: u32,
        /// Critical hit.
        is_crit: bool,
        /// The enemy dodged.
        is_dodge: bool,
    },
    /// A pet bullet or skill damaged an enemy.
    PetHit {
        /// Attacking pet.
        pet: PetId,
        /// Enemy hit.
        enemy: EnemyId,
        /// Damage dealt.
        damage: u32,
    },
    /// An enemy died. Its coins were already credited.
    EnemyKilled {
        /// Enemy killed.
        enemy: EnemyId,
        /// Coins granted.
        coins: u64,
        /// Base experience for the player.
        exp: u64,
    },
    /// An enemy overlaps the player. No damage is applied.
    Contact {
        /// Touching enemy.
        enemy: EnemyId,
    },
    /// A support skill restored a pet's hit points.
    PetHealed {
        /// Pet healed.
        pet: PetId,
        /// Hit points restored.
        amount: u32,
    },
}

/// Owns the combat field and drives it frame by frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatController {
    config: CombatConfig,
    enemies: EnemySystem,
    projectiles: ProjectileSystem,
    vfx: VfxSystem,
    pets: Option<PetSystem>,
    #[serde(with = "fixed_serde")]
    attack_timer: Fixed,
}

impl Default for CombatController {
    fn default() -> Self {
        Self::new(CombatConfig::default())
    }
}

impl CombatController {
    /// Empty field with no pets attached.
    #[must_use]
    pub fn new(config: CombatConfig) -> Self {
        Self {
            config,
            enemies: EnemySystem::new(Fixed::saturating_from_num(config.spawn_interval_ms)),
            projectiles: ProjectileSystem::new(),
            vfx: VfxSystem::new(),
            pets: None,
            attack_timer: Fixed::ZERO,
        }
    }

    /// Attach a pet system; its deployed pets fight from the next frame.
    pub fn attach_pets(&mut self, pets: PetSystem) {
        self.pets = Some(pets);
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Change the auto-attack reach.
    pub fn set_attack_range(&mut self, range: i32) {
        self.config.attack_range = range.max(0);
    }

    /// Enemy population.
    #[must_use]
    pub const fn enemies(&self) -> &EnemySystem {
        &self.enemies
    }

    /// Mutable enemy population, for scripted scenarios.
    pub fn enemies_mut(&mut self) -> &mut EnemySystem {
        &mut self.enemies
    }

    /// Player projectiles.
    #[must_use]
    pub const fn projectiles(&self) -> &ProjectileSystem {
        &self.projectiles
    }

    /// Mutable projectiles, for scripted scenarios.
    pub fn projectiles_mut(&mut self) -> &mut ProjectileSystem {
        &mut self.projectiles
    }

    /// Transient effects.
    #[must_use]
    pub const fn vfx(&self) -> &VfxSystem {
        &self.vfx
    }

    /// Attached pet system.
    #[must_use]
    pub const fn pets(&self) -> Option<&PetSystem> {
        self.pets.as_ref()
    }

    /// Attached pet system, mutable.
    pub fn pets_mut(&mut self) -> Option<&mut PetSystem> {
        self.pets.as_mut()
    }

    /// Attached pet system, attaching an empty default one if needed.
    pub fn pets_or_default(&mut self) -> &mut PetSystem {
        self.pets.get_or_insert_with(PetSystem::default)
    }

    /// Milliseconds since the last player shot.
    #[must_use]
    pub const fn attack_timer(&self) -> Fixed {
        self.attack_timer
    }

    /// Player shot interval for `stats`, `None` when attack speed is zero.
    #[must_use]
    pub fn attack_interval(stats: &dyn StatProvider) -> Option<Fixed> {
        let speed = stats.attack_speed();
        (speed > Fixed::ZERO).then(|| Fixed::from_num(MS_PER_SECOND).saturating_div(speed))
    }

    /// Where player shots start.
    #[must_use]
    pub fn player_center(&self) -> Vec2Fixed {
        self.config.player_rect().center()
    }

    /// Run one frame. See the module docs for the phase order.
    pub fn update(&mut self, dt_ms: Fixed, ctx: &mut FrameContext<'_>) -> Vec<CombatEvent> {
        let mut events = Vec::new();
        let map = self.config.map();

        // 1. Movement
        let tick = self
            .enemies
            .update(dt_ms, ctx.player_level, map, &mut *ctx.rng);
        if let Some(id) = tick.spawned {
            events.push(CombatEvent::EnemySpawned(id));
        }
        if tick.escaped > 0 {
            events.push(CombatEvent::EnemiesEscaped(tick.escaped));
        }
        self.projectiles.update(dt_ms, map);
        self.vfx.update(dt_ms);

        // 2. Auto-attack
        self.run_auto_attack(dt_ms, ctx, &mut events);

        // 3. Projectile collision
        self.resolve_projectile_hits(ctx, &mut events);

        // 4. Contact
        let player = self.config.player_rect();
        for enemy in self.enemies.living() {
            if rect_rect(&player, &enemy.rect()) {
                events.push(CombatEvent::Contact { enemy: enemy.id });
            }
        }

        // 5. Pets
        self.run_pets(dt_ms, map, ctx, &mut events);

        events
    }

    /// Draw the field: enemies, projectiles, pets, the player and VFX on top.
    pub fn render(&self, canvas: &mut dyn Canvas) {
        self.enemies.render(canvas);
        self.projectiles.render(canvas);
        if let Some(pets) = &self.pets {
            pets.render(canvas, self.config.map());
        }
        let player = self.config.player_rect();
        canvas.fill_rect(
            Vec2Fixed::new(player.x, player.y),
            player.width,
            player.height,
            Color::rgb(80, 140, 255),
        );
        self.vfx.render(canvas);
    }

    fn run_auto_attack(
        &mut self,
        dt_ms: Fixed,
        ctx: &mut FrameContext<'_>,
        events: &mut Vec<CombatEvent>,
    ) {
        self.attack_timer = self.attack_timer.saturating_add(dt_ms);
        let Some(interval) = Self::attack_interval(ctx.stats) else {
            return;
        };
        if self.attack_timer < interval {
            return;
        }

        // The timer keeps running until a target shows up, then fires at once.
        let origin = self.player_center();
        let range = Fixed::from_num(self.config.attack_range);
        let Some((target, aim)) = self
            .enemies
            .nearest_living(origin, range)
            .map(|e| (e.id, e.center()))
        else {
            return;
        };

        let projectile = self.projectiles.fire(
            origin,
            aim,
            ctx.stats.attacker_stats(),
            self.config.projectile,
        );
        self.attack_timer = Fixed::ZERO;
        events.push(CombatEvent::ProjectileFired { projectile, target });
    }

    fn resolve_projectile_hits(&mut self, ctx: &mut FrameContext<'_>, events: &mut Vec<CombatEvent>) {
        let shots: Vec<_> = self
            .projectiles
            .projectiles()
            .iter()
            .filter(|p| p.is_active())
            .map(|p| (p.id, p.position, p.width, p.attacker))
            .collect();

        for (projectile, position, width, attacker) in shots {
            let Some((enemy, center, defender)) = self
                .enemies
                .living()
                .find(|e| point_rect(position, &e.rect(), width))
                .map(|e| (e.id, e.center(), e.defender_stats()))
            else {
                continue;
            };

            let outcome = calculate_damage(&attacker, &defender, &mut *ctx.rng);
            self.vfx.spawn_explosion(center);
            self.projectiles.mark_spent(projectile);
            events.push(CombatEvent::EnemyHit {
                enemy,
                damage: outcome.damage,
                is_crit: outcome.is_crit,
                is_dodge: outcome.is_dodge,
            });

            if outcome.is_dodge {
                self.vfx.spawn_text(center, CombatTextKind::Miss);
                continue;
            }
            let text = if outcome.is_crit {
                CombatTextKind::Crit(outcome.damage)
            } else {
                CombatTextKind::Damage(outcome.damage)
            };
            self.vfx.spawn_text(center, text);

            if let Some(report) = self.enemies.apply_damage(enemy, outcome.damage) {
                if report.killed {
                    reward_kill(enemy, &report, &mut self.vfx, ctx, events);
                }
            }
        }

        self.projectiles.compact();
    }

    fn run_pets(
        &mut self,
        dt_ms: Fixed,
        map: MapSize,
        ctx: &mut FrameContext<'_>,
        events: &mut Vec<CombatEvent>,
    ) {
        let Some(pets) = self.pets.as_mut() else {
            return;
        };

        for event in pets.update_pet_combat(dt_ms, &mut self.enemies, map) {
            match event {
                PetCombatEvent::SkillHit {
                    caster,
                    enemy,
                    damage,
                    report,
                } => {
                    self.vfx.spawn_text(report.center, CombatTextKind::Damage(damage));
                    events.push(CombatEvent::PetHit {
                        pet: caster,
                        enemy,
                        damage,
                    });
                    if report.killed {
                        reward_kill(enemy, &report, &mut self.vfx, ctx, events);
                    }
                }
                PetCombatEvent::Healed {
                    target,
                    amount,
                    position,
                } => {
                    self.vfx.spawn_text(position, CombatTextKind::Heal(amount));
                    events.push(CombatEvent::PetHealed {
                        pet: target,
                        amount,
                    });
                }
            }
        }

        let bullets: Vec<_> = pets
            .bullets()
            .iter()
            .filter(|b| b.is_active())
            .map(|b| (b.id, b.owner, b.position, b.size, b.damage))
            .collect();

        for (bullet, owner, position, size, damage) in bullets {
            let Some(enemy) = self
                .enemies
                .living()
                .find(|e| point_rect(position, &e.rect(), size))
                .map(|e| e.id)
            else {
                continue;
            };
            pets.mark_bullet_spent(bullet);
            let Some(report) = self.enemies.apply_damage(enemy, damage) else {
                continue;
            };
            self.vfx.spawn_explosion(report.center);
            self.vfx.spawn_text(report.center, CombatTextKind::Damage(damage));
            events.push(CombatEvent::PetHit {
                pet: owner,
                enemy,
                damage,
            });
            if report.killed {
                reward_kill(enemy, &report, &mut self.vfx, ctx, events);
            }
        }

        pets.compact_bullets();
    }
}

/// Shared death path for player, pet bullet and skill kills.
fn reward_kill(
    enemy: EnemyId,
    report: &DamageReport,
    vfx: &mut VfxSystem,
    ctx: &mut FrameContext<'_>,
    events: &mut Vec<CombatEvent>,
) {
    let coins = report.coin_reward;
    ctx.resources.add_coins(coins);
    ctx.achievements.on_event(AchievementEvent::Kill, 1);
    ctx.achievements.on_event(AchievementEvent::Coin, coins);

    let above = Vec2Fixed::new(report.center.x, report.center.y - Fixed::from_num(20));
    vfx.spawn_text(above, CombatTextKind::Reward(coins));

    tracing::debug!(enemy, coins, exp = report.exp_reward, "Enemy killed");
    events.push(CombatEvent::EnemyKilled {
        enemy,
        coins,
        exp: report.exp_reward,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::AchievementLog;
    use crate::damage::AttackerStats;
    use crate::enemy::EnemyParams;
    use crate::pet::{FormationGroup, FormationSlot};
    use crate::resources::Resources;
    use crate::rng::ScriptedRng;

    /// Fixed stats with a configurable attack speed.
    struct Stats {
        attack: i32,
        speed: Fixed,
    }

    impl StatProvider for Stats {
        fn attack(&self) -> Fixed {
            Fixed::from_num(self.attack)
        }
        fn crit_rate(&self) -> Fixed {
            Fixed::ZERO
        }
        fn crit_damage(&self) -> Fixed {
            Fixed::from_num(150)
        }
        fn attack_speed(&self) -> Fixed {
            self.speed
        }
        fn dodge(&self) -> Fixed {
            Fixed::ZERO
        }
    }

    struct Harness {
        stats: Stats,
        wallet: Resources,
        log: AchievementLog,
        rng: ScriptedRng,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                stats: Stats {
                    attack: 50,
                    speed: Fixed::ZERO,
                },
                wallet: Resources::new(0, 0, 0),
                log: AchievementLog::default(),
                // 0.99 never dodges and never crits
                rng: ScriptedRng::constant(0.99),
            }
        }

        fn frame(&mut self, controller: &mut CombatController, dt: i32) -> Vec<CombatEvent> {
            let mut ctx = FrameContext {
                stats: &self.stats,
                resources: &mut self.wallet,
                achievements: &mut self.log,
                rng: &mut self.rng,
                player_level: 1,
            };
            controller.update(Fixed::from_num(dt), &mut ctx)
        }
    }

    fn quiet_controller() -> CombatController {
        CombatController::new(CombatConfig {
            spawn_interval_ms: u32::MAX / 2,
            ..CombatConfig::default()
        })
    }

    fn still_enemy(x: i32, y: i32, hp: i32) -> EnemyParams {
        EnemyParams {
            position: Vec2Fixed::from_ints(x, y),
            max_hp: hp,
            defense: Fixed::from_num(10),
            dodge: Fixed::ZERO,
            speed: Fixed::ZERO,
            coin_reward: 7,
            exp_reward: 12,
            ..EnemyParams::default()
        }
    }

    /// Place a projectile one step in front of the enemy's centre.
    fn fire_at(controller: &mut CombatController, enemy: EnemyId, damage: i32) {
        let center = controller.enemies().get(enemy).unwrap().center();
        let origin = Vec2Fixed::new(center.x - Fixed::from_num(2), center.y);
        controller.projectiles_mut().fire(
            origin,
            center,
            AttackerStats::flat(Fixed::from_num(damage)),
            ProjectileSpec {
                speed: Fixed::ZERO,
                ..ProjectileSpec::default()
            },
        );
    }

    #[test]
    fn test_player_rect_is_centred() {
        let rect = CombatConfig::default().player_rect();
        assert_eq!(rect, Rect::from_ints(50, 275, 50, 50));
    }

    #[test]
    fn test_hit_applies_defense_and_spawns_vfx() {
        let mut controller = quiet_controller();
        let mut harness = Harness::new();
        let enemy = controller.enemies_mut().spawn(still_enemy(400, 280, 100));
        fire_at(&mut controller, enemy, 50);

        let events = harness.frame(&mut controller, 16);

        assert_eq!(controller.enemies().get(enemy).unwrap().hp, 60);
        assert!(controller.projectiles().is_empty());
        assert_eq!(controller.vfx().explosions().len(), 1);
        assert_eq!(controller.vfx().texts().len(), 1);
        assert_eq!(controller.vfx().texts()[0].kind, CombatTextKind::Damage(40));
        assert!(events.contains(&CombatEvent::EnemyHit {
            enemy,
            damage: 40,
            is_crit: false,
            is_dodge: false,
        }));
    }

    #[test]
    fn test_dodge_shows_miss() {
        let mut controller = quiet_controller();
        let mut harness = Harness::new();
        harness.rng = ScriptedRng::constant(0.0);
        let enemy = controller.enemies_mut().spawn(EnemyParams {
            dodge: Fixed::from_num(50),
            ..still_enemy(400, 280, 100)
        });
        fire_at(&mut controller, enemy, 50);

        harness.frame(&mut controller, 16);
        assert_eq!(controller.enemies().get(enemy).unwrap().hp, 100);
        assert_eq!(controller.vfx().texts()[0].kind, CombatTextKind::Miss);
        assert!(controller.projectiles().is_empty());
    }

    #[test]
    fn test_kill_rewards_exactly_once() {
        let mut controller = quiet_controller();
        let mut harness = Harness::new();
        let enemy = controller.enemies_mut().spawn(still_enemy(400, 280, 30));
        // two bullets in the same frame: only the first lands
        fire_at(&mut controller, enemy, 50);
        fire_at(&mut controller, enemy, 50);

        let events = harness.frame(&mut controller, 16);
        let kills = events
            .iter()
            .filter(|e| matches!(e, CombatEvent::EnemyKilled { .. }))
            .count();
        assert_eq!(kills, 1);
        assert_eq!(harness.wallet.coins(), 7);
        assert_eq!(harness.log.kills, 1);
        assert_eq!(harness.log.coins_earned, 7);
        // the second bullet found nothing and is still flying
        assert_eq!(controller.projectiles().len(), 1);

        // the corpse is removed by the next enemy update
        assert_eq!(controller.enemies().len(), 1);
        harness.frame(&mut controller, 16);
        assert!(controller.enemies().is_empty());
        assert_eq!(harness.log.kills, 1);
    }

    #[test]
    fn test_auto_attack_banks_until_target_in_range() {
        let mut controller = quiet_controller();
        let mut harness = Harness::new();
        harness.stats.speed = Fixed::from_num(2);

        harness.frame(&mut controller, 800);
        assert!(controller.projectiles().is_empty());
        assert_eq!(controller.attack_timer(), Fixed::from_num(800));

        // out of range: 700 units from the player centre
        controller.enemies_mut().spawn(still_enemy(755, 280, 100));
        harness.frame(&mut controller, 16);
        assert!(controller.projectiles().is_empty());

        let near = controller.enemies_mut().spawn(still_enemy(300, 280, 100));
        let events = harness.frame(&mut controller, 16);
        assert!(events
            .iter()
            .any(|e| matches!(e, CombatEvent::ProjectileFired { target, .. } if *target == near)));
        assert_eq!(controller.attack_timer(), Fixed::ZERO);
    }

    #[test]
    fn test_projectile_carries_fire_time_stats() {
        let mut controller = quiet_controller();
        let mut harness = Harness::new();
        harness.stats.speed = Fixed::from_num(1);
        controller.enemies_mut().spawn(still_enemy(500, 280, 1000));

        harness.frame(&mut controller, 1000);
        harness.stats.attack = 999;
        harness.frame(&mut controller, 16);
        let fired = &controller.projectiles().projectiles()[0];
        assert_eq!(fired.attacker.damage, Fixed::from_num(50));
    }

    #[test]
    fn test_contact_reported_without_damage() {
        let mut controller = quiet_controller();
        let mut harness = Harness::new();
        let enemy = controller.enemies_mut().spawn(still_enemy(60, 290, 100));

        let events = harness.frame(&mut controller, 16);
        assert!(events.contains(&CombatEvent::Contact { enemy }));
        assert_eq!(controller.enemies().get(enemy).unwrap().hp, 100);
    }

    #[test]
    fn test_pet_bullet_kill_uses_reward_path() {
        let mut controller = quiet_controller();
        let mut harness = Harness::new();
        let mut pets = PetSystem::default();
        let mut wallet = Resources::new(500, 0, 0);
        let cub = pets.unlock("ember_cub", 1, 0, &mut wallet).unwrap();
        pets.equip(cub, FormationSlot::new(FormationGroup::Front, 1))
            .unwrap();
        controller.attach_pets(pets);

        // right in front of the anchor at (160, 300)
        let enemy = controller.enemies_mut().spawn(EnemyParams {
            defense: Fixed::ZERO,
            ..still_enemy(170, 280, 8)
        });

        // first frame fires, bullets move next frame
        harness.frame(&mut controller, 1000);
        let events = harness.frame(&mut controller, 16);

        assert!(events.contains(&CombatEvent::PetHit {
            pet: cub,
            enemy,
            damage: 8,
        }));
        assert_eq!(harness.log.kills, 1);
        assert_eq!(harness.wallet.coins(), 7);
        assert!(controller.pets().unwrap().bullets().is_empty());
    }

    #[test]
    fn test_render_draws_player_and_enemies() {
        let mut controller = quiet_controller();
        controller.enemies_mut().spawn(still_enemy(400, 280, 100));
        let mut canvas = crate::render::DrawList::new();
        controller.render(&mut canvas);
        assert!(canvas.len() >= 2);
    }
}
