//! GameInfo — balance, bet, credits and round counters

use serde::{Deserialize, Serialize};

use crate::error::SlotResult;
use crate::mode::ModeKind;
use crate::services::Persistence;

/// Player ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameInfo {
    pub balance: i64,
    pub bet: u32,
    pub free_spins: u32,
    pub bonuses: u32,
    /// Hits paid this round
    pub round_hits: u32,
    /// Net balance change this round (cost included)
    pub round_balance: i64,
    /// Cost deducted at the start of this round
    pub round_cost: u64,
    pub rounds_completed: u64,
    pub total_hits: u64,
}

impl Default for GameInfo {
    fn default() -> Self {
        Self {
            balance: 0,
            bet: 1,
            free_spins: 0,
            bonuses: 0,
            round_hits: 0,
            round_balance: 0,
            round_cost: 0,
            rounds_completed: 0,
            total_hits: 0,
        }
    }
}

/// `cost_per_line × bet × active_lines`
pub fn round_cost(cost_per_line: u32, bet: u32, active_lines: usize) -> u64 {
    (cost_per_line as u64)
        .saturating_mul(bet as u64)
        .saturating_mul(active_lines as u64)
}

impl GameInfo {
    pub fn new(balance: i64, bet: u32) -> Self {
        Self {
            balance,
            bet,
            ..Default::default()
        }
    }

    /// Reset round counters (round start)
    pub fn start_round(&mut self) {
        self.round_hits = 0;
        self.round_balance = 0;
        self.round_cost = 0;
    }

    /// Deduct the spin cost, returning the balance delta
    pub fn start_spin(&mut self, cost: u64) -> i64 {
        self.round_cost = cost;
        let delta = -i64::try_from(cost).unwrap_or(i64::MAX);
        self.add_balance(delta);
        delta
    }

    /// Apply a balance delta to the running and round balance
    pub fn add_balance(&mut self, delta: i64) {
        self.balance = self.balance.saturating_add(delta);
        self.round_balance = self.round_balance.saturating_add(delta);
    }

    pub fn add_hit(&mut self) {
        self.round_hits += 1;
        self.total_hits += 1;
    }

    /// Add (or remove) free spins, clamped at zero
    pub fn add_free_spins(&mut self, count: i64) -> u32 {
        self.free_spins = (self.free_spins as i64).saturating_add(count).clamp(0, u32::MAX as i64) as u32;
        self.free_spins
    }

    /// Add (or remove) bonus credits, clamped at zero
    pub fn add_bonuses(&mut self, count: i64) -> u32 {
        self.bonuses = (self.bonuses as i64).saturating_add(count).clamp(0, u32::MAX as i64) as u32;
        self.bonuses
    }

    /// Round completion: count the round and consume the mode's credit
    pub fn complete_round(&mut self, mode: ModeKind) {
        self.rounds_completed += 1;
        match mode {
            ModeKind::Bonus => {
                self.add_bonuses(-1);
            }
            ModeKind::FreeSpin => {
                self.add_free_spins(-1);
            }
            ModeKind::Default => {}
        }
    }

    /// Store the persistent fields under `prefix`
    pub fn save(&self, persistence: &mut dyn Persistence, prefix: &str) -> SlotResult<()> {
        persistence.set_int(&key(prefix, "balance"), self.balance);
        persistence.set_int(&key(prefix, "bet"), self.bet as i64);
        persistence.set_int(&key(prefix, "free_spins"), self.free_spins as i64);
        persistence.set_int(&key(prefix, "bonuses"), self.bonuses as i64);
        persistence.set_int(&key(prefix, "rounds_completed"), self.rounds_completed as i64);
        persistence.set_int(&key(prefix, "total_hits"), self.total_hits as i64);
        persistence.flush()
    }

    /// Restore persistent fields, keeping current values for missing keys
    pub fn load(&mut self, persistence: &dyn Persistence, prefix: &str) {
        let read = |name: &str, current: i64| persistence.get_int(&key(prefix, name), current);
        let unsigned = |value: i64| value.clamp(0, u32::MAX as i64) as u32;

        self.balance = read("balance", self.balance);
        self.bet = unsigned(read("bet", self.bet as i64)).max(1);
        self.free_spins = unsigned(read("free_spins", self.free_spins as i64));
        self.bonuses = unsigned(read("bonuses", self.bonuses as i64));
        self.rounds_completed = read("rounds_completed", self.rounds_completed as i64).max(0) as u64;
        self.total_hits = read("total_hits", self.total_hits as i64).max(0) as u64;
    }
}

fn key(prefix: &str, name: &str) -> String {
    format!("{}.{}", prefix, name)
}
