//! Combat frame benchmarks for idle_core.
//!
//! Run with: `cargo bench -p idle_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use idle_core::achievements::AchievementLog;
use idle_core::combat::{CombatConfig, CombatController, FrameContext};
use idle_core::enemy::EnemyParams;
use idle_core::math::{Fixed, Vec2Fixed};
use idle_core::pet::{FormationGroup, FormationSlot, PetSystem};
use idle_core::player::PlayerStats;
use idle_core::resources::Resources;
use idle_core::rng::SimRng;
use idle_core::session::GameSession;

/// A field with a full formation and fifty enemies marching in.
fn busy_field() -> CombatController {
    let mut controller = CombatController::new(CombatConfig {
        spawn_interval_ms: 250,
        ..CombatConfig::default()
    });

    let mut pets = PetSystem::default();
    let mut wallet = Resources::new(u64::MAX / 2, 0, 0);
    let templates = ["ember_cub", "frost_fox", "storm_hawk", "dawn_sprite", "stone_tortoise"];
    for (i, template) in templates.iter().enumerate() {
        if let Ok(id) = pets.unlock(template, 10, 0, &mut wallet) {
            let group = if i < 3 { FormationGroup::Front } else { FormationGroup::Back };
            let _ = pets.equip(id, FormationSlot::new(group, i % 3));
        }
    }
    controller.attach_pets(pets);

    for i in 0..50 {
        controller.enemies_mut().spawn(EnemyParams {
            position: Vec2Fixed::from_ints(300 + (i % 10) * 45, 60 + (i / 10) * 100),
            max_hp: 5_000,
            ..EnemyParams::default()
        });
    }
    controller
}

pub fn combat_benchmark(c: &mut Criterion) {
    c.bench_function("busy_combat_frame", |b| {
        let player = PlayerStats::new();
        let mut wallet = Resources::default();
        let mut log = AchievementLog::default();
        let mut rng = SimRng::new(1);
        let mut controller = busy_field();

        b.iter(|| {
            let mut ctx = FrameContext {
                stats: &player,
                resources: &mut wallet,
                achievements: &mut log,
                rng: &mut rng,
                player_level: 10,
            };
            black_box(controller.update(Fixed::from_num(16), &mut ctx))
        })
    });

    c.bench_function("session_minute", |b| {
        b.iter(|| {
            let mut session = GameSession::with_seed(black_box(3));
            for frame in 1..=3_750u64 {
                session.update(Fixed::from_num(16), frame * 16);
            }
            black_box(session.state_hash())
        })
    });
}

criterion_group!(benches, combat_benchmark);
criterion_main!(benches);
