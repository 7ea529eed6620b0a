//! Damage resolution for player attacks.
//!
//! Dodge is rolled first and short-circuits everything else. Only when
//! the dodge roll fails is a second, independent draw spent on the crit
//! check, so a seeded sequence always lines up with the same rolls.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};
use crate::rng::RandomSource;

/// Minimum damage floor - defense can never fully negate a hit.
pub const MIN_DAMAGE: u32 = 1;

/// Crit multiplier used when none is supplied, in percent.
pub const DEFAULT_CRIT_DAMAGE_PERCENT: i32 = 150;

/// Offensive stats snapshot carried by a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackerStats {
    /// Raw damage before defense.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Crit chance in percent (0-100).
    #[serde(with = "fixed_serde")]
    pub crit: Fixed,
    /// Crit damage multiplier in percent (150 = 1.5x).
    #[serde(with = "fixed_serde")]
    pub crit_damage: Fixed,
}

impl AttackerStats {
    /// Attacker with no crit chance and the default crit multiplier.
    #[must_use]
    pub fn flat(damage: Fixed) -> Self {
        Self {
            damage,
            crit: Fixed::ZERO,
            crit_damage: Fixed::from_num(DEFAULT_CRIT_DAMAGE_PERCENT),
        }
    }
}

/// Defensive stats of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DefenderStats {
    /// Flat damage reduction.
    #[serde(with = "fixed_serde")]
    pub defense: Fixed,
    /// Dodge chance in percent (0-100).
    #[serde(with = "fixed_serde")]
    pub dodge: Fixed,
}

/// Result of a single damage roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageOutcome {
    /// Damage dealt (0 only when dodged).
    pub damage: u32,
    /// Whether the crit roll succeeded.
    pub is_crit: bool,
    /// Whether the defender dodged.
    pub is_dodge: bool,
}

impl DamageOutcome {
    /// The dodged outcome.
    pub const DODGED: Self = Self {
        damage: 0,
        is_crit: false,
        is_dodge: true,
    };
}

/// Resolve one attack.
///
/// 1. `roll * 100 < dodge` dodges with zero damage.
/// 2. Base damage is `max(1, damage - defense)`.
/// 3. `roll * 100 < crit` multiplies by `crit_damage / 100`.
/// 4. The result is floored to an integer, never below [`MIN_DAMAGE`].
#[must_use]
pub fn calculate_damage(
    attacker: &AttackerStats,
    defender: &DefenderStats,
    rng: &mut dyn RandomSource,
) -> DamageOutcome {
    let hundred = Fixed::from_num(100);

    if rng.next_unit() * hundred < defender.dodge {
        return DamageOutcome::DODGED;
    }

    let mut damage = attacker
        .damage
        .saturating_sub(defender.defense)
        .max(Fixed::from_num(MIN_DAMAGE));

    let is_crit = rng.next_unit() * hundred < attacker.crit;
    if is_crit {
        damage = (damage.saturating_mul(attacker.crit_damage) / hundred).floor();
    }

    let damage = damage.floor().to_num::<i64>().max(i64::from(MIN_DAMAGE));

    DamageOutcome {
        damage: u32::try_from(damage).unwrap_or(u32::MAX),
        is_crit,
        is_dodge: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedRng;

    fn attacker(damage: i32, crit: i32) -> AttackerStats {
        AttackerStats {
            damage: Fixed::from_num(damage),
            crit: Fixed::from_num(crit),
            crit_damage: Fixed::from_num(DEFAULT_CRIT_DAMAGE_PERCENT),
        }
    }

    fn defender(defense: i32, dodge: i32) -> DefenderStats {
        DefenderStats {
            defense: Fixed::from_num(defense),
            dodge: Fixed::from_num(dodge),
        }
    }

    #[test]
    fn test_defense_subtracts_flat() {
        let mut rng = ScriptedRng::constant(0.99);
        let outcome = calculate_damage(&attacker(50, 0), &defender(10, 0), &mut rng);
        assert_eq!(outcome.damage, 40);
        assert!(!outcome.is_crit);
        assert!(!outcome.is_dodge);
    }

    #[test]
    fn test_damage_floor_is_one() {
        let mut rng = ScriptedRng::constant(0.99);
        let outcome = calculate_damage(&attacker(5, 0), &defender(500, 0), &mut rng);
        assert_eq!(outcome.damage, MIN_DAMAGE);
    }

    #[test]
    fn test_crit_multiplies_and_floors() {
        // dodge roll 0.9 fails vs 10%, crit roll 0.0 succeeds vs 50%
        let mut rng = ScriptedRng::new(&[0.9, 0.0]);
        let outcome = calculate_damage(&attacker(25, 50), &defender(0, 10), &mut rng);
        assert!(outcome.is_crit);
        // 25 * 1.5 = 37.5 -> 37
        assert_eq!(outcome.damage, 37);
    }

    #[test]
    fn test_extreme_crit_saturates() {
        let attacker = AttackerStats {
            damage: Fixed::MAX,
            crit: Fixed::from_num(100),
            crit_damage: Fixed::from_num(300),
        };
        let outcome = calculate_damage(&attacker, &defender(0, 0), &mut ScriptedRng::constant(0.5));
        assert!(outcome.is_crit);
        assert_eq!(outcome.damage, 21_474_836);
    }

    #[test]
    fn test_dodge_consumes_single_draw() {
        let mut rng = ScriptedRng::new(&[0.0, 0.0]);
        let outcome = calculate_damage(&attacker(25, 100), &defender(0, 50), &mut rng);
        assert_eq!(outcome, DamageOutcome::DODGED);
        assert_eq!(rng.draws(), 1);
    }

    #[test]
    fn test_hit_consumes_two_draws() {
        let mut rng = ScriptedRng::constant(0.5);
        let _ = calculate_damage(&attacker(25, 0), &defender(0, 0), &mut rng);
        assert_eq!(rng.draws(), 2);
    }
}
