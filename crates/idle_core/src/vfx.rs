//! Explosions and floating combat text.
//!
//! Purely presentational: nothing in the simulation reads these back.
//! Timing is still deterministic so lifetimes can be tested.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, per_second, Fixed, Vec2Fixed};
use crate::render::{Canvas, Color};

/// Explosion lifetime in milliseconds.
pub const EXPLOSION_LIFE_MS: i32 = 500;

/// Radius an explosion grows to.
pub const EXPLOSION_MAX_RADIUS: i32 = 30;

/// Particles emitted per explosion.
pub const EXPLOSION_PARTICLES: usize = 8;

/// Particle speed in units per second.
pub const PARTICLE_SPEED: i32 = 80;

/// Particle lifetime in milliseconds.
pub const PARTICLE_LIFE_MS: i32 = 400;

/// Combat text lifetime in milliseconds.
pub const TEXT_LIFE_MS: i32 = 1000;

/// Upward drift of combat text in units per second.
pub const TEXT_DRIFT: i32 = 40;

const COMPASS: [(f64, f64); EXPLOSION_PARTICLES] = [
    (1.0, 0.0),
    (0.707_106_781, 0.707_106_781),
    (0.0, 1.0),
    (-0.707_106_781, 0.707_106_781),
    (-1.0, 0.0),
    (-0.707_106_781, -0.707_106_781),
    (0.0, -1.0),
    (0.707_106_781, -0.707_106_781),
];

/// One explosion particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Particle {
    /// Current position.
    pub position: Vec2Fixed,
    /// Velocity in units per second.
    pub velocity: Vec2Fixed,
    /// Remaining life in milliseconds.
    #[serde(with = "fixed_serde")]
    pub life: Fixed,
}

/// A growing ring with radial particles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Explosion {
    /// Origin.
    pub position: Vec2Fixed,
    /// Current radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Final radius.
    #[serde(with = "fixed_serde")]
    pub max_radius: Fixed,
    /// Remaining life in milliseconds.
    #[serde(with = "fixed_serde")]
    pub life: Fixed,
    /// Particles, each with its own life.
    pub particles: Vec<Particle>,
}

/// What a combat text announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatTextKind {
    /// Normal hit.
    Damage(u32),
    /// Critical hit.
    Crit(u32),
    /// Dodged attack.
    Miss,
    /// Coins from a kill.
    Reward(u64),
    /// Healing received.
    Heal(u32),
}

impl CombatTextKind {
    /// Label shown on screen.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Damage(n) => format!("-{n}"),
            Self::Crit(n) => format!("-{n}!"),
            Self::Miss => "MISS".to_string(),
            Self::Reward(n) => format!("+{n}"),
            Self::Heal(n) => format!("+{n}"),
        }
    }

    /// Colour the label is drawn in.
    #[must_use]
    pub const fn color(&self) -> Color {
        match self {
            Self::Damage(_) => Color::WHITE,
            Self::Crit(_) => Color::GOLD,
            Self::Miss => Color::GREY,
            Self::Reward(_) => Color::YELLOW,
            Self::Heal(_) => Color::GREEN,
        }
    }
}

/// Floating label that drifts up and fades out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatText {
    /// Current anchor.
    pub position: Vec2Fixed,
    /// What is announced.
    pub kind: CombatTextKind,
    /// Remaining life in milliseconds.
    #[serde(with = "fixed_serde")]
    pub life: Fixed,
}

impl CombatText {
    /// Opacity proportional to remaining life.
    #[must_use]
    pub fn alpha(&self) -> Fixed {
        self.life / Fixed::from_num(TEXT_LIFE_MS)
    }
}

/// Owns all transient effects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VfxSystem {
    explosions: Vec<Explosion>,
    texts: Vec<CombatText>,
}

impl VfxSystem {
    /// Empty system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Active explosions.
    #[must_use]
    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    /// Active combat texts.
    #[must_use]
    pub fn texts(&self) -> &[CombatText] {
        &self.texts
    }

    /// Start an explosion at `position`.
    pub fn spawn_explosion(&mut self, position: Vec2Fixed) {
        let speed = Fixed::from_num(PARTICLE_SPEED);
        let particles = COMPASS
            .iter()
            .map(|(dx, dy)| Particle {
                position,
                velocity: Vec2Fixed::new(Fixed::from_num(*dx), Fixed::from_num(*dy)).scale(speed),
                life: Fixed::from_num(PARTICLE_LIFE_MS),
            })
            .collect();

        self.explosions.push(Explosion {
            position,
            radius: Fixed::ZERO,
            max_radius: Fixed::from_num(EXPLOSION_MAX_RADIUS),
            life: Fixed::from_num(EXPLOSION_LIFE_MS),
            particles,
        });
    }

    /// Show a label at `position`.
    pub fn spawn_text(&mut self, position: Vec2Fixed, kind: CombatTextKind) {
        self.texts.push(CombatText {
            position,
            kind,
            life: Fixed::from_num(TEXT_LIFE_MS),
        });
    }

    /// Age every effect and drop the expired ones.
    pub fn update(&mut self, dt_ms: Fixed) {
        let explosion_life = Fixed::from_num(EXPLOSION_LIFE_MS);
        for explosion in &mut self.explosions {
            explosion.life -= dt_ms;
            let elapsed = (explosion_life - explosion.life).min(explosion_life);
            explosion.radius = explosion.max_radius * elapsed / explosion_life;

            for particle in &mut explosion.particles {
                particle.position += particle.velocity.scale(dt_ms / Fixed::from_num(1000));
                particle.life -= dt_ms;
            }
            explosion.particles.retain(|p| p.life > Fixed::ZERO);
        }
        self.explosions.retain(|e| e.life > Fixed::ZERO);

        let drift = Fixed::from_num(TEXT_DRIFT);
        for text in &mut self.texts {
            text.position.y -= per_second(drift, dt_ms);
            text.life -= dt_ms;
        }
        self.texts.retain(|t| t.life > Fixed::ZERO);
    }

    /// Draw rings, particles and labels.
    pub fn render(&self, canvas: &mut dyn Canvas) {
        let explosion_life = Fixed::from_num(EXPLOSION_LIFE_MS);
        let particle_radius = Fixed::from_num(2);
        for explosion in &self.explosions {
            let fade = explosion.life / explosion_life;
            canvas.fill_circle(explosion.position, explosion.radius, Color::ORANGE.faded(fade));
            for particle in &explosion.particles {
                canvas.fill_circle(particle.position, particle_radius, Color::ORANGE);
            }
        }

        for text in &self.texts {
            canvas.text(text.position, &text.kind.label(), text.kind.color().faded(text.alpha()));
        }
    }
}
