//! Currencies and the ledger interface the engine spends through.
//!
//! All balances are non-negative integers. Raw amounts coming from
//! outside (save files, UI input) pass through [`sanitize_amount`] first:
//! negative, NaN and infinite values become zero and fractions are
//! floored.

use serde::{Deserialize, Serialize};

/// The three currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Main currency: kills, mines, most costs.
    Coins,
    /// Premium build currency.
    Crystals,
    /// Rare currency.
    Rubies,
}

impl ResourceKind {
    /// Lowercase name used in logs and saves.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coins => "coins",
            Self::Crystals => "crystals",
            Self::Rubies => "rubies",
        }
    }
}

/// A price in coins and crystals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cost {
    /// Coins.
    #[serde(default)]
    pub coins: u64,
    /// Crystals.
    #[serde(default)]
    pub crystals: u64,
}

impl Cost {
    /// Create a cost.
    #[must_use]
    pub const fn new(coins: u64, crystals: u64) -> Self {
        Self { coins, crystals }
    }

    /// Coins-only cost.
    #[must_use]
    pub const fn coins(coins: u64) -> Self {
        Self { coins, crystals: 0 }
    }

    /// Half of each component, floored.
    #[must_use]
    pub const fn half(self) -> Self {
        Self {
            coins: self.coins / 2,
            crystals: self.crystals / 2,
        }
    }
}

/// Convert an untrusted amount to a balance delta.
#[must_use]
pub fn sanitize_amount(raw: f64) -> u64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    if raw >= u64::MAX as f64 {
        return u64::MAX;
    }
    raw.floor() as u64
}

/// Everything that holds and moves currency.
///
/// Combat, pets and territory only ever see this trait, never the
/// concrete wallet.
pub trait ResourceLedger {
    /// Coin balance.
    fn coins(&self) -> u64;
    /// Crystal balance.
    fn crystals(&self) -> u64;
    /// Ruby balance.
    fn rubies(&self) -> u64;

    /// Credit coins.
    fn add_coins(&mut self, amount: u64);
    /// Credit crystals.
    fn add_crystals(&mut self, amount: u64);
    /// Credit rubies.
    fn add_rubies(&mut self, amount: u64);

    /// Debit coins if the balance covers it.
    fn spend_coins(&mut self, amount: u64) -> bool;
    /// Debit crystals if the balance covers it.
    fn spend_crystals(&mut self, amount: u64) -> bool;

    /// Whether the coin balance covers `amount`.
    fn has_enough_coins(&self, amount: u64) -> bool {
        self.coins() >= amount
    }

    /// Whether the crystal balance covers `amount`.
    fn has_enough_crystals(&self, amount: u64) -> bool {
        self.crystals() >= amount
    }

    /// Credit any currency.
    fn add(&mut self, kind: ResourceKind, amount: u64) {
        match kind {
            ResourceKind::Coins => self.add_coins(amount),
            ResourceKind::Crystals => self.add_crystals(amount),
            ResourceKind::Rubies => self.add_rubies(amount),
        }
    }

    /// Whether both components of `cost` are covered.
    fn can_afford(&self, cost: &Cost) -> bool {
        self.has_enough_coins(cost.coins) && self.has_enough_crystals(cost.crystals)
    }

    /// Debit both components, or nothing if either is short.
    fn spend_cost(&mut self, cost: &Cost) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.spend_coins(cost.coins) && self.spend_crystals(cost.crystals)
    }

    /// Credit both components.
    fn refund(&mut self, cost: &Cost) {
        self.add_coins(cost.coins);
        self.add_crystals(cost.crystals);
    }
}

/// The player's wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Resources {
    coins: u64,
    crystals: u64,
    rubies: u64,
}

impl Resources {
    /// Wallet with explicit balances.
    #[must_use]
    pub const fn new(coins: u64, crystals: u64, rubies: u64) -> Self {
        Self {
            coins,
            crystals,
            rubies,
        }
    }

    /// Wallet built from untrusted raw values.
    #[must_use]
    pub fn from_raw(coins: f64, crystals: f64, rubies: f64) -> Self {
        Self::new(
            sanitize_amount(coins),
            sanitize_amount(crystals),
            sanitize_amount(rubies),
        )
    }

    /// Balance of one currency.
    #[must_use]
    pub const fn balance(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Coins => self.coins,
            ResourceKind::Crystals => self.crystals,
            ResourceKind::Rubies => self.rubies,
        }
    }
}

impl ResourceLedger for Resources {
    fn coins(&self) -> u64 {
        self.coins
    }

    fn crystals(&self) -> u64 {
        self.crystals
    }

    fn rubies(&self) -> u64 {
        self.rubies
    }

    fn add_coins(&mut self, amount: u64) {
        self.coins = self.coins.saturating_add(amount);
    }

    fn add_crystals(&mut self, amount: u64) {
        self.crystals = self.crystals.saturating_add(amount);
    }

    fn add_rubies(&mut self, amount: u64) {
        self.rubies = self.rubies.saturating_add(amount);
    }

    fn spend_coins(&mut self, amount: u64) -> bool {
        if self.coins >= amount {
            self.coins -= amount;
            true
        } else {
            false
        }
    }

    fn spend_crystals(&mut self, amount: u64) -> bool {
        if self.crystals >= amount {
            self.crystals -= amount;
            true
        } else {
            false
        }
    }
}

/// Amounts of each currency, used for production and offline reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResourceBundle {
    /// Coins.
    pub coins: u64,
    /// Crystals.
    pub crystals: u64,
    /// Rubies.
    pub rubies: u64,
}

impl ResourceBundle {
    /// Add to one currency.
    pub fn add(&mut self, kind: ResourceKind, amount: u64) {
        let slot = match kind {
            ResourceKind::Coins => &mut self.coins,
            ResourceKind::Crystals => &mut self.crystals,
            ResourceKind::Rubies => &mut self.rubies,
        };
        *slot = slot.saturating_add(amount);
    }

    /// Amount of one currency.
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Coins => self.coins,
            ResourceKind::Crystals => self.crystals,
            ResourceKind::Rubies => self.rubies,
        }
    }

    /// Whether every currency is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.coins == 0 && self.crystals == 0 && self.rubies == 0
    }

    /// Credit everything to a ledger.
    pub fn credit_to(&self, ledger: &mut dyn ResourceLedger) {
        ledger.add_coins(self.coins);
        ledger.add_crystals(self.crystals);
        ledger.add_rubies(self.rubies);
    }
}

/// Suffix for the `n`-th power of a thousand: 1 -> A, 26 -> Z, 27 -> AA.
fn magnitude_suffix(mut n: u32) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    letters.iter().rev().collect()
}

/// Compact display of large amounts.
///
/// Below a thousand the integer is printed as is. Above, each factor of
/// a thousand becomes one suffix step (A, B, ... Z, AA, AB, ...), with at
/// most two decimals, truncated rather than rounded.
#[must_use]
pub fn format_number(value: f64) -> String {
    if !value.is_finite() || value <= 0.0 {
        return "0".to_string();
    }
    if value < 1000.0 {
        return format!("{}", value.floor() as u64);
    }

    let mut scaled = value;
    let mut magnitude = 0u32;
    while scaled >= 1000.0 {
        scaled /= 1000.0;
        magnitude += 1;
    }

    // Nudge past representation error (2.34 * 100 = 233.99999...).
    let truncated = (scaled * 100.0 + 1e-6).floor() / 100.0;
    let mut digits = format!("{truncated:.2}");
    while digits.ends_with('0') {
        digits.pop();
    }
    if digits.ends_with('.') {
        digits.pop();
    }

    format!("{digits}{}", magnitude_suffix(magnitude))
}
