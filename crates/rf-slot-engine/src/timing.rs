//! Tick-based timing profiles for spin progression
//!
//! All durations are expressed in engine ticks. The host decides how long a
//! tick is; presets assume [`DEFAULT_TICK_RATE`] ticks per second.

use serde::{Deserialize, Serialize};

/// Ticks per second the presets are calibrated for
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Timing profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingProfile {
    /// Normal gameplay timing
    #[default]
    Normal,
    /// Fast/Turbo mode
    Turbo,
    /// Everything resolves as fast as the state machine allows (tests, tooling)
    Instant,
    /// Hand-tuned values
    Custom,
}

/// Per-mode spin timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinTiming {
    /// Profile type
    pub profile: TimingProfile,

    /// Delay between consecutive reel starts
    pub spin_start_delay_ticks: u32,

    /// Delay between consecutive reel stops
    pub spin_stop_delay_ticks: u32,

    /// Acceleration phase of each reel
    pub accelerate_ticks: u32,

    /// Settle phase after a reel is told to stop
    pub reel_stop_ticks: u32,

    /// Time from full speed until an auto-stop spin begins stopping
    pub auto_stop_ticks: u32,

    /// Symbols revealed per tick at full speed
    pub rows_per_tick: u32,
}

impl SpinTiming {
    /// Normal gameplay timing
    pub fn normal() -> Self {
        Self::from_seconds(TimingProfile::Normal, DEFAULT_TICK_RATE, 0.3, 0.6, 0.5, 0.5, 1.0, 2)
    }

    /// Turbo mode
    pub fn turbo() -> Self {
        Self::from_seconds(TimingProfile::Turbo, DEFAULT_TICK_RATE, 0.1, 0.2, 0.2, 0.2, 0.4, 4)
    }

    /// Zero-delay timing
    pub fn instant() -> Self {
        Self {
            profile: TimingProfile::Instant,
            spin_start_delay_ticks: 0,
            spin_stop_delay_ticks: 0,
            accelerate_ticks: 0,
            reel_stop_ticks: 0,
            auto_stop_ticks: 0,
            rows_per_tick: 1,
        }
    }

    /// Get timing for profile
    pub fn from_profile(profile: TimingProfile) -> Self {
        match profile {
            TimingProfile::Normal | TimingProfile::Custom => Self::normal(),
            TimingProfile::Turbo => Self::turbo(),
            TimingProfile::Instant => Self::instant(),
        }
    }

    /// Convert second-based durations at a given tick rate
    #[allow(clippy::too_many_arguments)]
    pub fn from_seconds(
        profile: TimingProfile,
        tick_rate: u32,
        spin_start_delay: f64,
        spin_stop_delay: f64,
        accelerate: f64,
        reel_stop: f64,
        auto_stop: f64,
        rows_per_tick: u32,
    ) -> Self {
        let ticks = |seconds: f64| (seconds * tick_rate as f64).round().max(0.0) as u32;
        Self {
            profile,
            spin_start_delay_ticks: ticks(spin_start_delay),
            spin_stop_delay_ticks: ticks(spin_stop_delay),
            accelerate_ticks: ticks(accelerate),
            reel_stop_ticks: ticks(reel_stop),
            auto_stop_ticks: ticks(auto_stop),
            rows_per_tick: rows_per_tick.max(1),
        }
    }

    /// Scale durations by factor (< 1.0 = faster)
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |ticks: u32| (ticks as f64 * factor).round().max(0.0) as u32;
        Self {
            profile: TimingProfile::Custom,
            spin_start_delay_ticks: scale(self.spin_start_delay_ticks),
            spin_stop_delay_ticks: scale(self.spin_stop_delay_ticks),
            accelerate_ticks: scale(self.accelerate_ticks),
            reel_stop_ticks: scale(self.reel_stop_ticks),
            auto_stop_ticks: scale(self.auto_stop_ticks),
            rows_per_tick: self.rows_per_tick,
        }
    }

    /// Start and stop delays zeroed, as used by the fast-spin debug option
    pub fn without_delays(&self) -> Self {
        Self {
            spin_start_delay_ticks: 0,
            spin_stop_delay_ticks: 0,
            ..self.clone()
        }
    }

    /// Ticks from spin start until every reel is at full speed
    pub fn intro_ticks(&self, reel_count: usize) -> u32 {
        self.spin_start_delay_ticks * reel_count as u32 + self.accelerate_ticks
    }
}

impl Default for SpinTiming {
    fn default() -> Self {
        Self::normal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_profile_ticks() {
        let timing = SpinTiming::normal();
        assert_eq!(timing.spin_start_delay_ticks, 18);
        assert_eq!(timing.spin_stop_delay_ticks, 36);
        assert_eq!(timing.accelerate_ticks, 30);
        assert_eq!(timing.auto_stop_ticks, 60);
    }

    #[test]
    fn test_turbo_faster_than_normal() {
        let normal = SpinTiming::normal();
        let turbo = SpinTiming::turbo();
        assert!(turbo.intro_ticks(5) < normal.intro_ticks(5));
        assert!(turbo.rows_per_tick > normal.rows_per_tick);
    }

    #[test]
    fn test_scaled_and_without_delays() {
        let half = SpinTiming::normal().scaled(0.5);
        assert_eq!(half.profile, TimingProfile::Custom);
        assert_eq!(half.spin_stop_delay_ticks, 18);

        let fast = SpinTiming::normal().without_delays();
        assert_eq!(fast.spin_start_delay_ticks, 0);
        assert_eq!(fast.spin_stop_delay_ticks, 0);
        assert_eq!(fast.accelerate_ticks, 30);
    }

    #[test]
    fn test_instant_profile() {
        let timing = SpinTiming::from_profile(TimingProfile::Instant);
        assert_eq!(timing.intro_ticks(5), 0);
        assert_eq!(timing.rows_per_tick, 1);
    }
}
