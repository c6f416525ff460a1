//! Stage — The canonical moments of a slot round
//!
//! A Stage is NOT an animation and NOT a host callback.
//! A Stage is the SEMANTIC MEANING of a moment in the round flow, recorded
//! so hosts, tests and tooling can replay what the engine did.

use serde::{Deserialize, Serialize};

/// Round state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    /// No round in progress (before `start_round` or after completion)
    #[default]
    NotStarted,
    /// Round started, waiting for play
    Idle,
    /// Reels are being started / accelerated
    SpinStarting,
    /// All reels at full speed
    Spinning,
    /// Reels are being stopped
    SpinStopping,
    /// Reels stopped, hits are being processed
    Result,
}

impl RoundState {
    /// Line toggling and mode switching are only allowed while waiting
    pub fn accepts_configuration(&self) -> bool {
        matches!(self, RoundState::NotStarted | RoundState::Idle)
    }

    /// True while reels may be moving
    pub fn is_spinning(&self) -> bool {
        matches!(
            self,
            RoundState::SpinStarting | RoundState::Spinning | RoundState::SpinStopping
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            RoundState::NotStarted => "not_started",
            RoundState::Idle => "idle",
            RoundState::SpinStarting => "spin_starting",
            RoundState::Spinning => "spinning",
            RoundState::SpinStopping => "spin_stopping",
            RoundState::Result => "result",
        }
    }
}

/// Canonical round stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Stage {
    // ═══════════════════════════════════════════════════════════════════════
    // ROUND LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════
    /// Round armed, lines and hit records reset
    RoundStart {
        /// Lifetime round counter at round start
        round: u64,
    },

    /// State machine transition
    StateChanged { from: RoundState, to: RoundState },

    /// All reels settled, hit processing is about to begin
    RoundInterval,

    /// Round finished and counters advanced
    RoundComplete {
        /// Lifetime round counter after completion
        round: u64,
        /// Net balance change of this round (cost included)
        balance_delta: i64,
        /// Hits processed this round
        hits: u32,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // REELS
    // ═══════════════════════════════════════════════════════════════════════
    /// Reel started spinning
    ReelStart {
        /// Which reel (0-indexed)
        reel_index: u8,
    },

    /// Reel revealed its next strip symbol
    NewSymbol {
        reel_index: u8,
        /// Strip index that appeared
        strip_index: u32,
        /// Symbol id at that strip index
        symbol_id: u32,
    },

    /// Reel has settled
    ReelStop {
        reel_index: u8,
        /// Visible symbols (top to bottom)
        #[serde(default)]
        symbols: Vec<u32>,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // HITS & LEDGER
    // ═══════════════════════════════════════════════════════════════════════
    /// A hit was paid and queued for presentation
    HitProcessed {
        /// Line index for line hits, `None` for scatter hits
        #[serde(default)]
        line_index: Option<u32>,
        symbol_id: u32,
        chains: u8,
        payout: u64,
    },

    /// Balance moved
    BalanceChanged {
        delta: i64,
        balance: i64,
        /// True when the change comes from a paid hit
        #[serde(default)]
        from_hit: bool,
    },

    /// Free spin credits were awarded
    FreeSpinsAwarded { count: u32, total: u32 },

    /// Bonus credits were awarded
    BonusAwarded { count: u32, total: u32 },

    // ═══════════════════════════════════════════════════════════════════════
    // MODES & LINES
    // ═══════════════════════════════════════════════════════════════════════
    /// Current mode changed
    ModeChanged { from: String, to: String },

    /// A line was switched on or off
    LineToggled {
        line_index: u32,
        enabled: bool,
        active_lines: u32,
    },
}

impl Stage {
    /// Stable snake_case identifier for filtering
    pub fn type_name(&self) -> &'static str {
        match self {
            Stage::RoundStart { .. } => "round_start",
            Stage::StateChanged { .. } => "state_changed",
            Stage::RoundInterval => "round_interval",
            Stage::RoundComplete { .. } => "round_complete",
            Stage::ReelStart { .. } => "reel_start",
            Stage::NewSymbol { .. } => "new_symbol",
            Stage::ReelStop { .. } => "reel_stop",
            Stage::HitProcessed { .. } => "hit_processed",
            Stage::BalanceChanged { .. } => "balance_changed",
            Stage::FreeSpinsAwarded { .. } => "free_spins_awarded",
            Stage::BonusAwarded { .. } => "bonus_awarded",
            Stage::ModeChanged { .. } => "mode_changed",
            Stage::LineToggled { .. } => "line_toggled",
        }
    }

    pub fn category(&self) -> StageCategory {
        match self {
            Stage::RoundStart { .. }
            | Stage::StateChanged { .. }
            | Stage::RoundInterval
            | Stage::RoundComplete { .. } => StageCategory::RoundLifecycle,

            Stage::ReelStart { .. } | Stage::NewSymbol { .. } | Stage::ReelStop { .. } => {
                StageCategory::Reel
            }

            Stage::HitProcessed { .. }
            | Stage::BalanceChanged { .. }
            | Stage::FreeSpinsAwarded { .. }
            | Stage::BonusAwarded { .. } => StageCategory::Ledger,

            Stage::ModeChanged { .. } | Stage::LineToggled { .. } => StageCategory::Setup,
        }
    }

    /// High-frequency stages that recorders may skip
    pub fn is_verbose(&self) -> bool {
        matches!(self, Stage::NewSymbol { .. })
    }

    /// Reel index for reel stages
    pub fn reel_index(&self) -> Option<u8> {
        match self {
            Stage::ReelStart { reel_index }
            | Stage::NewSymbol { reel_index, .. }
            | Stage::ReelStop { reel_index, .. } => Some(*reel_index),
            _ => None,
        }
    }
}

/// Stage category for grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageCategory {
    RoundLifecycle,
    Reel,
    Ledger,
    Setup,
}

impl StageCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::RoundLifecycle => "Round Lifecycle",
            Self::Reel => "Reels",
            Self::Ledger => "Hits & Ledger",
            Self::Setup => "Modes & Lines",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serialization() {
        let stage = Stage::ReelStop {
            reel_index: 2,
            symbols: vec![1, 2, 3],
        };
        let json = serde_json::to_string(&stage).unwrap();
        assert!(json.contains("\"type\":\"reel_stop\""));

        let parsed: Stage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, stage);
    }

    #[test]
    fn test_type_names_are_tags() {
        let stages = [
            Stage::RoundInterval,
            Stage::LineToggled {
                line_index: 0,
                enabled: true,
                active_lines: 1,
            },
            Stage::StateChanged {
                from: RoundState::Idle,
                to: RoundState::SpinStarting,
            },
        ];
        for stage in stages {
            let value = serde_json::to_value(&stage).unwrap();
            assert_eq!(value["type"], stage.type_name());
        }
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            Stage::ReelStart { reel_index: 0 }.category(),
            StageCategory::Reel
        );
        assert_eq!(
            Stage::BonusAwarded { count: 1, total: 1 }.category(),
            StageCategory::Ledger
        );
        assert_eq!(Stage::RoundInterval.category(), StageCategory::RoundLifecycle);
    }

    #[test]
    fn test_round_state_gates() {
        assert!(RoundState::NotStarted.accepts_configuration());
        assert!(RoundState::Idle.accepts_configuration());
        assert!(!RoundState::Spinning.accepts_configuration());
        assert!(RoundState::SpinStopping.is_spinning());
        assert!(!RoundState::Result.is_spinning());
        assert_eq!(RoundState::default(), RoundState::NotStarted);
    }
}
