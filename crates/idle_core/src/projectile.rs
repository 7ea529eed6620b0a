//! Player projectiles in flight.
//!
//! Each projectile carries the attacker stats captured when it was
//! fired; hits never re-read live player stats.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::damage::AttackerStats;
use crate::math::{fixed_serde, per_second, Fixed, MapSize, Vec2Fixed};
use crate::render::{Canvas, Color};

/// Identifier assigned to each fired projectile.
pub type ProjectileId = u32;

/// Trail length cap.
pub const MAX_TRAIL_POINTS: usize = 8;

/// Distance beyond the map edge at which a projectile is discarded.
pub const BOUNDS_MARGIN: i32 = 50;

/// Default flight speed in units per second.
pub const DEFAULT_PROJECTILE_SPEED: i32 = 600;

/// Default lifetime in milliseconds.
pub const DEFAULT_PROJECTILE_LIFE_MS: i32 = 2000;

/// Default projectile width (also its hit tolerance).
pub const DEFAULT_PROJECTILE_WIDTH: i32 = 10;

/// Lifetime of one trail point in milliseconds.
pub const TRAIL_POINT_LIFE_MS: i32 = 150;

/// A cosmetic afterimage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrailPoint {
    /// Where the projectile was.
    pub position: Vec2Fixed,
    /// Remaining life in milliseconds.
    #[serde(with = "fixed_serde")]
    pub life: Fixed,
}

/// Flight parameters for a new projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    /// Units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Lifetime in milliseconds.
    #[serde(with = "fixed_serde")]
    pub life: Fixed,
    /// Width, used as hit tolerance.
    #[serde(with = "fixed_serde")]
    pub width: Fixed,
}

impl Default for ProjectileSpec {
    fn default() -> Self {
        Self {
            speed: Fixed::from_num(DEFAULT_PROJECTILE_SPEED),
            life: Fixed::from_num(DEFAULT_PROJECTILE_LIFE_MS),
            width: Fixed::from_num(DEFAULT_PROJECTILE_WIDTH),
        }
    }
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projectile {
    /// Unique id.
    pub id: ProjectileId,
    /// Current position.
    pub position: Vec2Fixed,
    /// Unit direction of travel.
    pub direction: Vec2Fixed,
    /// Units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Width, used as hit tolerance.
    #[serde(with = "fixed_serde")]
    pub width: Fixed,
    /// Remaining life in milliseconds.
    #[serde(with = "fixed_serde")]
    pub life: Fixed,
    /// Stats captured at fire time.
    pub attacker: AttackerStats,
    /// Recent positions, oldest first.
    pub trail: VecDeque<TrailPoint>,
    /// Set when the projectile hit something this frame.
    pub spent: bool,
}

impl Projectile {
    /// Whether the projectile can still hit.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.spent && self.life > Fixed::ZERO
    }
}

/// Owns all player projectiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectileSystem {
    projectiles: Vec<Projectile>,
    next_id: ProjectileId,
}

impl Default for ProjectileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectileSystem {
    /// Empty system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            projectiles: Vec::new(),
            next_id: 1,
        }
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Look up a projectile.
    #[must_use]
    pub fn get(&self, id: ProjectileId) -> Option<&Projectile> {
        self.projectiles.iter().find(|p| p.id == id)
    }

    /// Number of projectiles in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    /// Whether nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    /// Fire from `origin` straight at `target`.
    pub fn fire(
        &mut self,
        origin: Vec2Fixed,
        target: Vec2Fixed,
        attacker: AttackerStats,
        spec: ProjectileSpec,
    ) -> ProjectileId {
        let id = self.next_id;
        self.next_id += 1;
        self.projectiles.push(Projectile {
            id,
            position: origin,
            direction: origin.direction_to(target),
            speed: spec.speed,
            width: spec.width,
            life: spec.life,
            attacker,
            trail: VecDeque::with_capacity(MAX_TRAIL_POINTS),
            spent: false,
        });
        id
    }

    /// Integrate motion, age trails and drop expired or out-of-bounds
    /// projectiles.
    pub fn update(&mut self, dt_ms: Fixed, map: MapSize) {
        let trail_life = Fixed::from_num(TRAIL_POINT_LIFE_MS);

        for projectile in &mut self.projectiles {
            for point in &mut projectile.trail {
                point.life -= dt_ms;
            }
            projectile.trail.retain(|p| p.life > Fixed::ZERO);

            if projectile.trail.len() == MAX_TRAIL_POINTS {
                projectile.trail.pop_front();
            }
            projectile.trail.push_back(TrailPoint {
                position: projectile.position,
                life: trail_life,
            });

            let step = per_second(projectile.speed, dt_ms);
            projectile.position += projectile.direction.scale(step);
            projectile.life -= dt_ms;
        }

        let margin = Fixed::from_num(BOUNDS_MARGIN);
        self.projectiles
            .retain(|p| p.is_active() && !map.is_outside(p.position, margin));
    }

    /// Mark a projectile as having hit something.
    pub fn mark_spent(&mut self, id: ProjectileId) {
        if let Some(projectile) = self.projectiles.iter_mut().find(|p| p.id == id) {
            projectile.spent = true;
        }
    }

    /// Remove every spent projectile.
    pub fn compact(&mut self) {
        self.projectiles.retain(|p| !p.spent);
    }

    /// Draw trails and heads.
    pub fn render(&self, canvas: &mut dyn Canvas) {
        let trail_life = Fixed::from_num(TRAIL_POINT_LIFE_MS);
        let half = Fixed::from_num(2);
        for projectile in &self.projectiles {
            for point in &projectile.trail {
                let color = Color::YELLOW.faded(point.life / trail_life);
                canvas.fill_circle(point.position, projectile.width / Fixed::from_num(4), color);
            }
            canvas.fill_circle(projectile.position, projectile.width / half, Color::WHITE);
        }
    }
}
