//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the engine produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! A seeded run must replay exactly, both for reproducible bug reports
//! and for offline projection. Sources of non-determinism include:
//!
//! - **Floating-point math**: positions, speeds and timers use fixed-point
//!   arithmetic via [`idle_core::math::Fixed`].
//!
//! - **HashMap iteration order**: the engine keeps entities in `Vec`s and
//!   hit-once sets in `BTreeSet`s, so iteration order is insertion order.
//!
//! - **System randomness and clocks**: every draw goes through an injected
//!   [`idle_core::rng::RandomSource`] and every timestamp is passed in.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual systems are deterministic
//! 2. **Property tests**: random seeds and frame lengths still replay
//! 3. **Integration tests**: full sessions are reproducible
//! 4. **Parallel tests**: N sessions on N threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use idle_core::session::GameSession;

use crate::fixtures::run_frames;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of frames simulated.
    pub frames: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Session is non-deterministic!\n\
                 Runs: {}\n\
                 Frames: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.frames,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `frames` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one frame
/// * `hash` - Function to compute a state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    frames: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..frames {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        frames,
    }
}

/// Run a session twice with identical setup and frame length and compare
/// the final state hashes.
pub fn verify_session_determinism<F>(setup_fn: F, frames: u64, dt_ms: u32) -> bool
where
    F: Fn() -> GameSession,
{
    verify_determinism(
        2,
        frames,
        &setup_fn,
        |session| run_frames(session, 1, dt_ms),
        GameSession::state_hash,
    )
    .is_deterministic
}

/// Run N sessions on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows under thread scheduling or
/// memory layout differences.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_sessions<F>(
    setup_fn: F,
    num_sessions: usize,
    frames: u64,
    dt_ms: u32,
) -> DeterminismResult
where
    F: Fn() -> GameSession + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sessions)
            .map(|_| {
                s.spawn(|| {
                    let mut session = setup_fn();
                    run_frames(&mut session, frames, dt_ms);
                    session.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
        frames,
    }
}

/// Compare two runs frame by frame, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match throughout, `Some(frame)` at the first
/// frame whose hashes differ.
pub fn find_first_divergence<F>(setup_fn: F, frames: u64, dt_ms: u32) -> Option<u64>
where
    F: Fn() -> GameSession,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for frame in 1..=frames {
        run_frames(&mut a, 1, dt_ms);
        run_frames(&mut b, 1, dt_ms);

        if a.state_hash() != b.state_hash() {
            return Some(frame);
        }
    }

    None
}

/// Verify that a snapshot round-trip preserves state exactly, and that
/// the restored session keeps evolving identically.
pub fn verify_snapshot_determinism<F>(setup_fn: F, frames: u64, dt_ms: u32) -> bool
where
    F: Fn() -> GameSession,
{
    let mut session = setup_fn();
    run_frames(&mut session, frames, dt_ms);

    let Ok(bytes) = session.snapshot() else {
        return false;
    };
    let Ok(mut restored) = GameSession::restore(&bytes) else {
        return false;
    };
    if restored.state_hash() != session.state_hash() {
        return false;
    }

    run_frames(&mut session, frames, dt_ms);
    run_frames(&mut restored, frames, dt_ms);
    restored.state_hash() == session.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for engine inputs.
pub mod strategies {
    use idle_core::damage::{AttackerStats, DefenderStats};
    use idle_core::math::Fixed;
    use proptest::prelude::*;

    /// Damage, crit chance and crit multiplier of an attacker.
    pub fn arb_attacker() -> impl Strategy<Value = AttackerStats> {
        (0i32..10_000, 0i32..=100, 100i32..400).prop_map(|(damage, crit, crit_damage)| {
            AttackerStats {
                damage: Fixed::from_num(damage),
                crit: Fixed::from_num(crit),
                crit_damage: Fixed::from_num(crit_damage),
            }
        })
    }

    /// Defense and dodge of a defender.
    pub fn arb_defender() -> impl Strategy<Value = DefenderStats> {
        (0i32..10_000, 0i32..=100).prop_map(|(defense, dodge)| DefenderStats {
            defense: Fixed::from_num(defense),
            dodge: Fixed::from_num(dodge),
        })
    }

    /// A draw from a random source, in `[0, 1)`.
    pub fn arb_unit() -> impl Strategy<Value = f64> {
        0.0f64..1.0
    }

    /// Frame length in milliseconds, from a fast display to a stalled tab.
    pub fn arb_frame_ms() -> impl Strategy<Value = u32> {
        1u32..=250
    }

    /// A built-in building type that produces resources.
    pub fn arb_producer() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("gold_mine"), Just("crystal_mine"), Just("ruby_mine")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{developed_session, rich_session, session_with_pet};
    use proptest::prelude::*;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 10, || 0u64, |n| *n += 1, |n| *n);
        assert!(result.is_deterministic);
        assert_eq!(result.unique_hashes(), vec![10]);
    }

    #[test]
    fn test_fresh_session_determinism() {
        assert!(verify_session_determinism(|| GameSession::with_seed(7), 600, 16));
    }

    #[test]
    fn test_pet_session_determinism() {
        assert!(verify_session_determinism(|| session_with_pet(3).0, 900, 16));
    }

    #[test]
    fn test_no_divergence() {
        assert_eq!(find_first_divergence(|| developed_session(11), 300, 33), None);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = rich_session(1);
        let mut b = rich_session(2);
        run_frames(&mut a, 400, 16);
        run_frames(&mut b, 400, 16);
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_snapshot_determinism() {
        assert!(verify_snapshot_determinism(|| session_with_pet(5).0, 500, 16));
    }

    #[test]
    fn test_parallel_sessions() {
        run_parallel_sessions(|| developed_session(4), 4, 300, 16).assert_deterministic();
    }

    proptest! {
        /// Any seed and frame length replays exactly.
        #[test]
        fn prop_seeded_runs_replay(seed in any::<u64>(), dt in strategies::arb_frame_ms()) {
            prop_assert!(verify_session_determinism(move || rich_session(seed), 120, dt));
        }
    }
}
