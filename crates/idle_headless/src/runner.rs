//! Seeded simulation runs and offline projection.

use std::fs;
use std::path::Path;

use idle_core::math::Fixed;
use idle_core::resources::ResourceLedger;
use idle_core::save::SaveData;
use idle_core::session::{GameSession, OfflineReport, SessionConfig};
use serde::{Deserialize, Serialize};

use crate::error::{HeadlessError, Result};

/// Milliseconds per hour of offline time.
const MS_PER_HOUR: f64 = 3_600_000.0;

/// Parameters of a seeded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// RNG seed.
    pub seed: u64,
    /// Frames to simulate.
    pub frames: u64,
    /// Frame length in milliseconds.
    pub dt_ms: u32,
    /// Player level to start at.
    pub level: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            frames: 3600,
            dt_ms: 16,
            level: 1,
        }
    }
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// RNG seed.
    pub seed: u64,
    /// Frames simulated.
    pub frames: u64,
    /// Simulated time.
    pub elapsed_ms: u64,
    /// Enemies killed.
    pub kills: u64,
    /// Coins held at the end.
    pub coins: u64,
    /// Crystals held at the end.
    pub crystals: u64,
    /// Rubies held at the end.
    pub rubies: u64,
    /// Final player level.
    pub player_level: u32,
    /// Enemies still on the field.
    pub enemies_alive: usize,
    /// Final state hash.
    pub state_hash: u64,
}

/// Result of projecting offline progress onto a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineSummary {
    /// Timestamp stored in the save.
    pub saved_at: u64,
    /// Timestamp the progress was applied at.
    pub now_ms: u64,
    /// Gains, `None` when the absence was too short to count.
    pub report: Option<OfflineReport>,
    /// Coins after applying.
    pub coins: u64,
    /// Crystals after applying.
    pub crystals: u64,
    /// Rubies after applying.
    pub rubies: u64,
}

/// Outcome of repeated identical runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Final hash of each run.
    pub hashes: Vec<u64>,
    /// Whether every run ended in the same state.
    pub deterministic: bool,
}

/// Fresh session for `config`, starting at `config.level`.
#[must_use]
pub fn build_session(config: &RunConfig) -> GameSession {
    let session_config = SessionConfig {
        seed: config.seed,
        ..SessionConfig::default()
    };
    if config.level <= 1 {
        return GameSession::new(session_config);
    }

    let mut save = GameSession::new(session_config.clone()).to_save(0);
    save.player.level = config.level;
    GameSession::from_save(save, session_config)
}

/// Simulate `config.frames` frames and collect production at the end.
pub fn run(config: &RunConfig) -> (GameSession, RunSummary) {
    let mut session = build_session(config);
    let dt = Fixed::saturating_from_num(config.dt_ms);
    let mut now = 0u64;

    tracing::info!(
        seed = config.seed,
        frames = config.frames,
        dt_ms = config.dt_ms,
        level = config.level,
        "Starting run"
    );

    for _ in 0..config.frames {
        now += u64::from(config.dt_ms);
        session.update(dt, now);
    }
    session.collect_resources(now);

    let summary = RunSummary {
        seed: config.seed,
        frames: config.frames,
        elapsed_ms: now,
        kills: session.achievements().kills,
        coins: session.resources().coins(),
        crystals: session.resources().crystals(),
        rubies: session.resources().rubies(),
        player_level: session.player().level,
        enemies_alive: session.combat().enemies().living().count(),
        state_hash: session.state_hash(),
    };

    tracing::info!(
        kills = summary.kills,
        coins = summary.coins,
        level = summary.player_level,
        "Run finished"
    );
    (session, summary)
}

/// Run `config` `runs` times and compare final hashes.
pub fn verify(config: &RunConfig, runs: u32) -> VerifyReport {
    let hashes: Vec<u64> = (0..runs).map(|_| run(config).1.state_hash).collect();
    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !deterministic {
        tracing::warn!(?hashes, "Runs diverged");
    }
    VerifyReport {
        hashes,
        deterministic,
    }
}

/// Write `session` as a JSON save stamped `now_ms`.
pub fn write_save(session: &GameSession, path: &Path, now_ms: u64) -> Result<()> {
    let json = session.to_save(now_ms).to_json()?;
    fs::write(path, json).map_err(|e| HeadlessError::io(path, e))?;
    tracing::info!(path = %path.display(), "Save written");
    Ok(())
}

/// Read a JSON save.
pub fn load_save(path: &Path) -> Result<SaveData> {
    if !path.exists() {
        return Err(HeadlessError::FileNotFound(path.to_path_buf()));
    }
    let source = fs::read_to_string(path).map_err(|e| HeadlessError::io(path, e))?;
    Ok(SaveData::from_json(&source)?)
}

/// Load the save at `path` and apply `hours` of offline progress.
pub fn project_offline(path: &Path, hours: f64) -> Result<OfflineSummary> {
    let save = load_save(path)?;
    let saved_at = save.timestamp;
    let elapsed = if hours.is_finite() && hours > 0.0 {
        (hours * MS_PER_HOUR) as u64
    } else {
        0
    };
    let now_ms = saved_at.saturating_add(elapsed);

    let mut session = GameSession::from_save(save, SessionConfig::default());
    let report = session.apply_offline_progress(now_ms);
    if report.is_none() {
        tracing::info!(elapsed_ms = elapsed, "Absence too short for offline gains");
    }

    Ok(OfflineSummary {
        saved_at,
        now_ms,
        report,
        coins: session.resources().coins(),
        crystals: session.resources().crystals(),
        rubies: session.resources().rubies(),
    })
}
