//! Enemy population: spawning, movement, status effects, despawn.
//!
//! Enemies enter at the right edge and walk left toward the player. The
//! system exclusively owns the enemy list; other systems request changes
//! through [`EnemySystem::apply_damage`], [`EnemySystem::apply_slow`] and
//! [`EnemySystem::apply_stun`].
//!
//! A kill only lowers hit points. The dead enemy stays in the list until
//! the next [`EnemySystem::update`] compacts it away, so collision passes
//! in the same frame can iterate without index shifts.

use serde::{Deserialize, Serialize};

use crate::collision::Rect;
use crate::damage::DefenderStats;
use crate::math::{fixed_serde, per_second, Fixed, MapSize, Vec2Fixed};
use crate::render::{Canvas, Color};
use crate::rng::RandomSource;

/// Identifier assigned to each spawned enemy.
pub type EnemyId = u32;

/// Default spawn interval in milliseconds.
pub const DEFAULT_SPAWN_INTERVAL_MS: i32 = 2000;

/// Enemy body size in world units.
pub const ENEMY_SIZE: i32 = 40;

/// Player level beyond which spawned enemies stop getting stronger.
pub const MAX_SCALING_LEVEL: u32 = 100_000;

/// Hidden attributes rolled on spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EnemyAttributes {
    /// Drives hit points, attack and defense.
    pub strength: i32,
    /// Drives speed and dodge.
    pub agility: i32,
    /// Only feeds the coin reward.
    pub intelligence: i32,
}

/// A live (or freshly killed) enemy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Enemy {
    /// Unique id.
    pub id: EnemyId,
    /// Top-left corner.
    pub position: Vec2Fixed,
    /// Body width.
    #[serde(with = "fixed_serde")]
    pub width: Fixed,
    /// Body height.
    #[serde(with = "fixed_serde")]
    pub height: Fixed,
    /// Current hit points; at or below zero means dead.
    pub hp: i32,
    /// Hit points at spawn.
    pub max_hp: i32,
    /// Attack power.
    #[serde(with = "fixed_serde")]
    pub attack: Fixed,
    /// Flat damage reduction.
    #[serde(with = "fixed_serde")]
    pub defense: Fixed,
    /// Dodge chance in percent.
    #[serde(with = "fixed_serde")]
    pub dodge: Fixed,
    /// Walking speed in units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Coins granted on death.
    pub coin_reward: u64,
    /// Experience granted on death.
    pub exp_reward: u64,
    /// Status-effect scalar on speed (1 = normal).
    #[serde(with = "fixed_serde")]
    pub speed_multiplier: Fixed,
    /// Whether movement is suspended.
    pub is_stunned: bool,
    /// Remaining stun in milliseconds.
    #[serde(with = "fixed_serde")]
    pub stun_timer: Fixed,
    /// Remaining slow in milliseconds.
    #[serde(with = "fixed_serde")]
    pub slow_timer: Fixed,
    /// Attributes the stats were derived from.
    pub attributes: EnemyAttributes,
}

impl Enemy {
    /// Body rectangle.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.width, self.height)
    }

    /// Centre of the body.
    #[must_use]
    pub fn center(&self) -> Vec2Fixed {
        self.rect().center()
    }

    /// Whether the enemy still has hit points.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Whether the enemy walked off the left edge.
    #[must_use]
    pub fn has_escaped(&self) -> bool {
        self.position.x + self.width < Fixed::ZERO
    }

    /// Stats used by the damage calculator.
    #[must_use]
    pub const fn defender_stats(&self) -> DefenderStats {
        DefenderStats {
            defense: self.defense,
            dodge: self.dodge,
        }
    }

    fn tick_status(&mut self, dt_ms: Fixed) {
        if self.stun_timer > Fixed::ZERO {
            self.stun_timer -= dt_ms;
            if self.stun_timer <= Fixed::ZERO {
                self.stun_timer = Fixed::ZERO;
                self.is_stunned = false;
            }
        }

        if self.slow_timer > Fixed::ZERO {
            self.slow_timer -= dt_ms;
            if self.slow_timer <= Fixed::ZERO {
                self.slow_timer = Fixed::ZERO;
                self.speed_multiplier = Fixed::from_num(1);
            }
        }
    }
}

/// Explicit stats for placing an enemy directly (scenarios and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyParams {
    /// Top-left corner.
    pub position: Vec2Fixed,
    /// Hit points.
    pub max_hp: i32,
    /// Attack.
    pub attack: Fixed,
    /// Defense.
    pub defense: Fixed,
    /// Dodge percent.
    pub dodge: Fixed,
    /// Speed in units per second.
    pub speed: Fixed,
    /// Coins on death.
    pub coin_reward: u64,
    /// Experience on death.
    pub exp_reward: u64,
}

impl Default for EnemyParams {
    fn default() -> Self {
        Self {
            position: Vec2Fixed::ZERO,
            max_hp: 50,
            attack: Fixed::from_num(10),
            defense: Fixed::ZERO,
            dodge: Fixed::ZERO,
            speed: Fixed::from_num(30),
            coin_reward: 5,
            exp_reward: 10,
        }
    }
}

/// What happened to an enemy that took damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageReport {
    /// Hit points after the hit.
    pub remaining_hp: i32,
    /// True only on the hit that crossed zero.
    pub killed: bool,
    /// Coins owed for the kill (zero unless `killed`).
    pub coin_reward: u64,
    /// Experience owed for the kill (zero unless `killed`).
    pub exp_reward: u64,
    /// Body centre at the time of the hit.
    pub center: Vec2Fixed,
}

/// Summary of one enemy update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnemyTick {
    /// Enemy spawned this tick, if any.
    pub spawned: Option<EnemyId>,
    /// Enemies removed after walking off the left edge.
    pub escaped: usize,
    /// Dead enemies compacted away.
    pub cleared: usize,
}

/// Owns every enemy and the spawn timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnemySystem {
    enemies: Vec<Enemy>,
    #[serde(with = "fixed_serde")]
    spawn_timer: Fixed,
    #[serde(with = "fixed_serde")]
    spawn_interval: Fixed,
    next_id: EnemyId,
}

impl Default for EnemySystem {
    fn default() -> Self {
        Self::new(Fixed::from_num(DEFAULT_SPAWN_INTERVAL_MS))
    }
}

impl EnemySystem {
    /// Create an empty system with the given spawn interval (ms).
    #[must_use]
    pub fn new(spawn_interval: Fixed) -> Self {
        Self {
            enemies: Vec::new(),
            spawn_timer: Fixed::ZERO,
            spawn_interval,
            next_id: 1,
        }
    }

    /// All enemies, including those killed this frame.
    #[must_use]
    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    /// Enemies with hit points left.
    pub fn living(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.iter().filter(|e| e.is_alive())
    }

    /// Look up an enemy.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    /// Number of enemies held (alive or awaiting removal).
    #[must_use]
    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    /// Whether no enemies are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }

    /// Current spawn interval in milliseconds.
    #[must_use]
    pub const fn spawn_interval(&self) -> Fixed {
        self.spawn_interval
    }

    /// Change the spawn interval.
    pub fn set_spawn_interval(&mut self, interval: Fixed) {
        self.spawn_interval = interval;
    }

    /// Nearest living enemy whose centre is within `range` of `origin`.
    #[must_use]
    pub fn nearest_living(&self, origin: Vec2Fixed, range: Fixed) -> Option<&Enemy> {
        let range_sq = range.saturating_mul(range);
        self.living()
            .map(|e| (e, e.center().distance_squared(origin)))
            .filter(|(_, dist_sq)| *dist_sq <= range_sq)
            .min_by(|a, b| a.1.cmp(&b.1).then(a.0.id.cmp(&b.0.id)))
            .map(|(e, _)| e)
    }

    /// Advance the spawn timer, status effects and movement, then drop
    /// enemies that are dead or have left the map on the left.
    pub fn update(
        &mut self,
        dt_ms: Fixed,
        player_level: u32,
        map: MapSize,
        rng: &mut dyn RandomSource,
    ) -> EnemyTick {
        let mut tick = EnemyTick::default();

        self.spawn_timer = self.spawn_timer.saturating_add(dt_ms);
        if self.spawn_timer >= self.spawn_interval {
            tick.spawned = Some(self.spawn_rolled(player_level, map, rng));
            self.spawn_timer = Fixed::ZERO;
        }

        for enemy in self.enemies.iter_mut().filter(|e| e.is_alive()) {
            enemy.tick_status(dt_ms);
            if enemy.is_stunned {
                continue;
            }
            enemy.position.x -= per_second(enemy.speed * enemy.speed_multiplier, dt_ms);
        }

        let before = self.enemies.len();
        let escaped = self
            .enemies
            .iter()
            .filter(|e| e.is_alive() && e.has_escaped())
            .count();
        self.enemies.retain(|e| e.is_alive() && !e.has_escaped());
        tick.escaped = escaped;
        tick.cleared = before - self.enemies.len() - escaped;

        tick
    }

    /// Spawn an enemy with rolled attributes at the right edge.
    ///
    /// Draw order: strength, agility, intelligence, speed jitter, y.
    pub fn spawn_rolled(
        &mut self,
        player_level: u32,
        map: MapSize,
        rng: &mut dyn RandomSource,
    ) -> EnemyId {
        let level = i32::try_from(player_level.min(MAX_SCALING_LEVEL)).unwrap_or(1);
        let upper = 5 + 2 * level;
        let attributes = EnemyAttributes {
            strength: rng.next_int(5, upper),
            agility: rng.next_int(5, upper),
            intelligence: rng.next_int(5, upper),
        };
        let speed_jitter = rng.next_range(Fixed::ZERO, Fixed::from_num(20));
        let size = Fixed::from_num(ENEMY_SIZE);
        let max_y = (map.height - Fixed::from_num(2 * ENEMY_SIZE)).max(Fixed::from_num(ENEMY_SIZE));
        let y = rng.next_range(Fixed::from_num(ENEMY_SIZE), max_y);

        let str_f = Fixed::from_num(attributes.strength);
        let agi_f = Fixed::from_num(attributes.agility);
        let attr_sum = attributes.strength + attributes.agility + attributes.intelligence;

        let params = EnemyParams {
            position: Vec2Fixed::new(map.width, y),
            max_hp: 30 + 10 * level + 8 * attributes.strength,
            attack: Fixed::from_num(8 + 2 * level) + Fixed::from_num(1.5) * str_f,
            defense: Fixed::from_num(3 + level) + Fixed::from_num(0.5) * str_f,
            dodge: Fixed::from_num(0.2) * agi_f,
            speed: Fixed::from_num(30) + speed_jitter + Fixed::from_num(0.3) * agi_f,
            coin_reward: u64::try_from(5 + level + attr_sum / 3).unwrap_or(0),
            exp_reward: u64::try_from(10 + 2 * level).unwrap_or(0),
        };

        let id = self.insert(params, size, attributes);
        tracing::debug!(
            enemy = id,
            hp = params.max_hp,
            strength = attributes.strength,
            agility = attributes.agility,
            intelligence = attributes.intelligence,
            "Enemy spawned"
        );
        id
    }

    /// Place an enemy with explicit stats.
    pub fn spawn(&mut self, params: EnemyParams) -> EnemyId {
        self.insert(params, Fixed::from_num(ENEMY_SIZE), EnemyAttributes::default())
    }

    fn insert(&mut self, params: EnemyParams, size: Fixed, attributes: EnemyAttributes) -> EnemyId {
        let id = self.next_id;
        self.next_id += 1;
        self.enemies.push(Enemy {
            id,
            position: params.position,
            width: size,
            height: size,
            hp: params.max_hp,
            max_hp: params.max_hp,
            attack: params.attack,
            defense: params.defense,
            dodge: params.dodge,
            speed: params.speed,
            coin_reward: params.coin_reward,
            exp_reward: params.exp_reward,
            speed_multiplier: Fixed::from_num(1),
            is_stunned: false,
            stun_timer: Fixed::ZERO,
            slow_timer: Fixed::ZERO,
            attributes,
        });
        id
    }

    /// Subtract hit points from a living enemy.
    ///
    /// Returns `None` for unknown or already-dead enemies, so a kill can
    /// only be reported once.
    pub fn apply_damage(&mut self, id: EnemyId, amount: u32) -> Option<DamageReport> {
        let enemy = self.enemies.iter_mut().find(|e| e.id == id && e.is_alive())?;
        let amount = i32::try_from(amount).unwrap_or(i32::MAX);
        enemy.hp = enemy.hp.saturating_sub(amount);
        let killed = !enemy.is_alive();

        Some(DamageReport {
            remaining_hp: enemy.hp,
            killed,
            coin_reward: if killed { enemy.coin_reward } else { 0 },
            exp_reward: if killed { enemy.exp_reward } else { 0 },
            center: enemy.center(),
        })
    }

    /// Scale speed by `multiplier` for `duration_ms`.
    pub fn apply_slow(&mut self, id: EnemyId, multiplier: Fixed, duration_ms: Fixed) {
        if let Some(enemy) = self.enemies.iter_mut().find(|e| e.id == id && e.is_alive()) {
            enemy.speed_multiplier = multiplier;
            enemy.slow_timer = enemy.slow_timer.max(duration_ms);
        }
    }

    /// Suspend movement for `duration_ms`.
    pub fn apply_stun(&mut self, id: EnemyId, duration_ms: Fixed) {
        if let Some(enemy) = self.enemies.iter_mut().find(|e| e.id == id && e.is_alive()) {
            enemy.is_stunned = true;
            enemy.stun_timer = enemy.stun_timer.max(duration_ms);
        }
    }

    /// Draw bodies and health bars.
    pub fn render(&self, canvas: &mut dyn Canvas) {
        let bar_height = Fixed::from_num(4);
        for enemy in self.living() {
            canvas.fill_rect(enemy.position, enemy.width, enemy.height, Color::RED);

            let bar_origin = Vec2Fixed::new(enemy.position.x, enemy.position.y - Fixed::from_num(8));
            canvas.fill_rect(bar_origin, enemy.width, bar_height, Color::GREY);
            let fraction = Fixed::from_num(enemy.hp) / Fixed::from_num(enemy.max_hp.max(1));
            canvas.fill_rect(bar_origin, enemy.width * fraction, bar_height, Color::GREEN);

            if enemy.is_stunned {
                canvas.text(bar_origin, "*", Color::YELLOW);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedRng;

    fn ms(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    #[test]
    fn test_spawn_waits_for_interval() {
        let mut system = EnemySystem::default();
        let mut rng = ScriptedRng::constant(0.5);
        let tick = system.update(ms(1999), 1, MapSize::default(), &mut rng);
        assert!(tick.spawned.is_none());
        let tick = system.update(ms(1), 1, MapSize::default(), &mut rng);
        assert!(tick.spawned.is_some());
        assert_eq!(system.len(), 1);
    }

    #[test]
    fn test_rolled_stats_follow_formulas() {
        let mut system = EnemySystem::default();
        // range [5,9) at level 2: strength 0.0 -> 5, agility 0.5 -> 7,
        // intelligence 0.99 -> 8, then jitter 0.0 and y 0.0
        let mut rng = ScriptedRng::new(&[0.0, 0.5, 0.99, 0.0, 0.0]);
        let id = system.spawn_rolled(2, MapSize::default(), &mut rng);
        let enemy = system.get(id).unwrap();

        assert_eq!(enemy.attributes.strength, 5);
        assert_eq!(enemy.attributes.agility, 7);
        assert_eq!(enemy.attributes.intelligence, 8);
        assert_eq!(enemy.max_hp, 30 + 20 + 40);
        assert_eq!(enemy.attack, Fixed::from_num(12) + Fixed::from_num(1.5) * ms(5));
        assert_eq!(enemy.defense, Fixed::from_num(5) + Fixed::from_num(0.5) * ms(5));
        assert_eq!(enemy.coin_reward, 5 + 2 + (5 + 7 + 8) / 3);
        assert_eq!(enemy.position.x, Fixed::from_num(800));
    }

    #[test]
    fn test_enemies_move_left() {
        let mut system = EnemySystem::new(ms(100_000));
        let id = system.spawn(EnemyParams {
            position: Vec2Fixed::from_ints(400, 100),
            speed: ms(50),
            ..EnemyParams::default()
        });
        let mut rng = ScriptedRng::constant(0.0);
        system.update(ms(1000), 1, MapSize::default(), &mut rng);
        assert_eq!(system.get(id).unwrap().position.x, ms(350));
    }

    #[test]
    fn test_stun_blocks_movement_then_expires() {
        let mut system = EnemySystem::new(ms(100_000));
        let id = system.spawn(EnemyParams {
            position: Vec2Fixed::from_ints(400, 100),
            speed: ms(100),
            ..EnemyParams::default()
        });
        system.apply_stun(id, ms(500));
        let mut rng = ScriptedRng::constant(0.0);

        system.update(ms(250), 1, MapSize::default(), &mut rng);
        assert_eq!(system.get(id).unwrap().position.x, ms(400));

        // stun expires at the start of this tick, so the enemy walks again
        system.update(ms(250), 1, MapSize::default(), &mut rng);
        let enemy = system.get(id).unwrap();
        assert!(!enemy.is_stunned);
        assert_eq!(enemy.position.x, ms(375));
    }

    #[test]
    fn test_slow_halves_speed_then_resets() {
        let mut system = EnemySystem::new(ms(100_000));
        let id = system.spawn(EnemyParams {
            position: Vec2Fixed::from_ints(400, 100),
            speed: ms(100),
            ..EnemyParams::default()
        });
        system.apply_slow(id, Fixed::from_num(0.5), ms(1000));
        let mut rng = ScriptedRng::constant(0.0);

        system.update(ms(1000), 1, MapSize::default(), &mut rng);
        let enemy = system.get(id).unwrap();
        // timer expires before movement is applied this tick
        assert_eq!(enemy.speed_multiplier, Fixed::from_num(1));
        assert_eq!(enemy.position.x, ms(300));

        system.apply_slow(id, Fixed::from_num(0.5), ms(2000));
        system.update(ms(1000), 1, MapSize::default(), &mut rng);
        assert_eq!(system.get(id).unwrap().position.x, ms(250));
    }

    #[test]
    fn test_kill_reported_once_and_removed_next_update() {
        let mut system = EnemySystem::new(ms(100_000));
        let id = system.spawn(EnemyParams {
            position: Vec2Fixed::from_ints(400, 100),
            max_hp: 10,
            coin_reward: 7,
            ..EnemyParams::default()
        });

        let report = system.apply_damage(id, 15).unwrap();
        assert!(report.killed);
        assert_eq!(report.coin_reward, 7);
        assert_eq!(report.remaining_hp, -5);
        assert!(system.apply_damage(id, 1).is_none());
        assert_eq!(system.len(), 1);

        let mut rng = ScriptedRng::constant(0.0);
        let tick = system.update(ms(16), 1, MapSize::default(), &mut rng);
        assert_eq!(tick.cleared, 1);
        assert!(system.is_empty());
    }

    #[test]
    fn test_escaped_enemies_are_removed() {
        let mut system = EnemySystem::new(ms(100_000));
        system.spawn(EnemyParams {
            position: Vec2Fixed::from_ints(-35, 100),
            speed: ms(10),
            ..EnemyParams::default()
        });
        let mut rng = ScriptedRng::constant(0.0);
        let tick = system.update(ms(1000), 1, MapSize::default(), &mut rng);
        assert_eq!(tick.escaped, 1);
        assert!(system.is_empty());
    }

    #[test]
    fn test_nearest_living_respects_range() {
        let mut system = EnemySystem::new(ms(100_000));
        let far = system.spawn(EnemyParams {
            position: Vec2Fixed::from_ints(700, 280),
            ..EnemyParams::default()
        });
        let near = system.spawn(EnemyParams {
            position: Vec2Fixed::from_ints(300, 280),
            ..EnemyParams::default()
        });
        let origin = Vec2Fixed::from_ints(75, 300);
        assert_eq!(system.nearest_living(origin, ms(500)).unwrap().id, near);
        system.apply_damage(near, 1000);
        assert!(system.nearest_living(origin, ms(500)).is_none());
        assert_eq!(system.nearest_living(origin, ms(1000)).unwrap().id, far);
    }
}
