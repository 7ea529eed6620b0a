//! Fire-and-forget progress events raised by the engine.

use serde::{Deserialize, Serialize};

/// Event types the engine reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AchievementEvent {
    /// An enemy died.
    Kill,
    /// Coins were earned from combat.
    Coin,
}

impl AchievementEvent {
    /// Wire name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kill => "kill",
            Self::Coin => "coin",
        }
    }
}

/// Receiver of progress events.
pub trait AchievementSink {
    /// Record `amount` occurrences of `event`.
    fn on_event(&mut self, event: AchievementEvent, amount: u64);
}

/// Running totals per event type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AchievementLog {
    /// Total kills.
    pub kills: u64,
    /// Total coins earned from kills.
    pub coins_earned: u64,
}

impl AchievementSink for AchievementLog {
    fn on_event(&mut self, event: AchievementEvent, amount: u64) {
        match event {
            AchievementEvent::Kill => self.kills = self.kills.saturating_add(amount),
            AchievementEvent::Coin => self.coins_earned = self.coins_earned.saturating_add(amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_accumulates() {
        let mut log = AchievementLog::default();
        log.on_event(AchievementEvent::Kill, 1);
        log.on_event(AchievementEvent::Kill, 1);
        log.on_event(AchievementEvent::Coin, 15);
        assert_eq!(log.kills, 2);
        assert_eq!(log.coins_earned, 15);
        assert_eq!(AchievementEvent::Kill.as_str(), "kill");
    }
}
