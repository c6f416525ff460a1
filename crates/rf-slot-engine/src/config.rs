//! Slot configuration document
//!
//! A [`SlotDefinition`] is the static configuration consumed at
//! initialization: layout, symbols with their pay tables, lines, the three
//! modes, optional fixed strips and simulation settings. It loads from JSON or
//! YAML and is validated before any slot is built from it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SlotError, SlotResult};
use crate::line::{Line, LineSet, LoopMode};
use crate::mode::{ModeKind, SymbolSwap};
use crate::reel::{ReelMotion, ReelOptions, RowLayout};
use crate::symbols::{MatchType, PayType, Symbol, SymbolId, SymbolSet};
use crate::timing::SpinTiming;

// ═══════════════════════════════════════════════════════════════════════════════
// SLOT CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Stage events a slot keeps unless configured otherwise
pub const DEFAULT_TRACE_CAPACITY: usize = 10_000;

/// Layout and round options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotConfig {
    pub reel_count: usize,
    /// Visible rows per reel
    pub rows: usize,
    pub hidden_top: usize,
    pub hidden_bottom: usize,
    /// Generated strip length
    pub symbols_per_reel: usize,
    /// Start the next round as soon as one completes
    pub auto_start_round: bool,
    /// Line 0 can never be switched off
    pub first_line_always_active: bool,
    /// Ways-style suppression of extendable and duplicate chains
    pub alternative_line_check: bool,
    /// Replace configured lines with every path through the grid
    pub ways: bool,
    pub initial_balance: i64,
    pub bet: u32,
    /// Persistence key prefix for the ledger; `None` disables save/restore
    pub persist_key: Option<String>,
    /// Record every revealed symbol in the stage trace
    pub trace_new_symbols: bool,
    /// Newest stage events kept; `None` keeps all, `Some(0)` disables the trace
    pub trace_capacity: Option<usize>,
    pub reel: ReelOptions,
    pub debug: DebugConfig,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            reel_count: 5,
            rows: 3,
            hidden_top: 2,
            hidden_bottom: 1,
            symbols_per_reel: 20,
            auto_start_round: true,
            first_line_always_active: true,
            alternative_line_check: false,
            ways: false,
            initial_balance: 1000,
            bet: 1,
            persist_key: None,
            trace_new_symbols: false,
            trace_capacity: Some(DEFAULT_TRACE_CAPACITY),
            reel: ReelOptions::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl SlotConfig {
    pub fn layout(&self) -> RowLayout {
        RowLayout::new(self.rows, self.hidden_top, self.hidden_bottom)
    }
}

/// Debug switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Zero start/stop delays
    pub fast_spin: bool,
    /// Force every line on at spin start
    pub always_max_lines: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODES
// ═══════════════════════════════════════════════════════════════════════════════

/// How a spin is stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinMode {
    /// A timer stops the spin
    #[default]
    AutoStop,
    /// One play stops every reel
    ManualStopAll,
    /// Each play stops the next reel
    ManualStopOne,
    /// Reels start one at a time; each play stops the oldest and starts the next
    ManualStartOne,
}

/// Symbol replacement by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapConfig {
    pub from: String,
    pub to: String,
}

/// One mode bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeConfig {
    pub name: String,
    pub spin_mode: SpinMode,
    /// Start spins in Idle without player input
    pub force_play: bool,
    pub cost_per_line: u32,
    pub timing: SpinTiming,
    /// Extra reveals after a stop request
    pub reel_stop_distance: u32,
    pub symbol_swaps: Vec<SwapConfig>,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self::named("Default")
    }
}

impl ModeConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spin_mode: SpinMode::AutoStop,
            force_play: false,
            cost_per_line: 5,
            timing: SpinTiming::default(),
            reel_stop_distance: 1,
            symbol_swaps: Vec::new(),
        }
    }

    pub fn with_spin_mode(mut self, spin_mode: SpinMode) -> Self {
        self.spin_mode = spin_mode;
        self
    }

    pub fn with_force_play(mut self, force_play: bool) -> Self {
        self.force_play = force_play;
        self
    }

    pub fn with_cost_per_line(mut self, cost_per_line: u32) -> Self {
        self.cost_per_line = cost_per_line;
        self
    }

    pub fn with_timing(mut self, timing: SpinTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_swap(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.symbol_swaps.push(SwapConfig {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Timing in effect, fast spin zeroing the start/stop delays
    pub fn effective_timing(&self, fast_spin: bool) -> SpinTiming {
        if fast_spin {
            self.timing.without_delays()
        } else {
            self.timing.clone()
        }
    }

    /// Per-reel movement for this mode
    pub fn motion(&self) -> ReelMotion {
        ReelMotion {
            accelerate_ticks: self.timing.accelerate_ticks,
            rows_per_tick: self.timing.rows_per_tick.max(1),
            stop_ticks: self.timing.reel_stop_ticks,
            stop_distance: self.reel_stop_distance,
        }
    }

    /// Resolve swap names against a symbol set
    pub fn resolve_swaps(&self, symbols: &SymbolSet) -> SlotResult<Vec<SymbolSwap>> {
        self.symbol_swaps
            .iter()
            .map(|swap| {
                Ok(SymbolSwap {
                    from: symbols.id_of(&swap.from)?,
                    to: symbols.id_of(&swap.to)?,
                })
            })
            .collect()
    }
}

/// Default, FreeSpin and Bonus bundles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeSet {
    pub default: ModeConfig,
    pub free_spin: ModeConfig,
    pub bonus: ModeConfig,
}

impl Default for ModeSet {
    fn default() -> Self {
        Self {
            default: ModeConfig::named("Default"),
            free_spin: ModeConfig::named("FreeSpin"),
            bonus: ModeConfig::named("Bonus"),
        }
    }
}

impl ModeSet {
    /// Same bundle (renamed) for every mode
    pub fn uniform(mode: ModeConfig) -> Self {
        Self {
            default: ModeConfig {
                name: "Default".into(),
                ..mode.clone()
            },
            free_spin: ModeConfig {
                name: "FreeSpin".into(),
                ..mode.clone()
            },
            bonus: ModeConfig {
                name: "Bonus".into(),
                ..mode
            },
        }
    }

    pub fn get(&self, kind: ModeKind) -> &ModeConfig {
        match kind {
            ModeKind::Default => &self.default,
            ModeKind::FreeSpin => &self.free_spin,
            ModeKind::Bonus => &self.bonus,
        }
    }

    pub fn get_mut(&mut self, kind: ModeKind) -> &mut ModeConfig {
        match kind {
            ModeKind::Default => &mut self.default,
            ModeKind::FreeSpin => &mut self.free_spin,
            ModeKind::Bonus => &mut self.bonus,
        }
    }

    /// Resolved swap tables indexed by [`ModeKind::index`]
    pub fn resolve_swaps(&self, symbols: &SymbolSet) -> SlotResult<[Vec<SymbolSwap>; 3]> {
        Ok([
            self.default.resolve_swaps(symbols)?,
            self.free_spin.resolve_swaps(symbols)?,
            self.bonus.resolve_swaps(symbols)?,
        ])
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SYMBOLS & LINES
// ═══════════════════════════════════════════════════════════════════════════════

fn default_frequency() -> u32 {
    50
}

fn default_row_size() -> u8 {
    1
}

fn default_true() -> bool {
    true
}

/// Symbol entry; pays use the comma-separated form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub name: String,
    pub pays: String,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub pay_type: PayType,
    #[serde(default = "default_frequency")]
    pub frequency: u32,
    #[serde(default)]
    pub min_count_per_reel: u32,
    #[serde(default = "default_row_size")]
    pub row_size: u8,
}

impl SymbolConfig {
    pub fn new(name: impl Into<String>, pays: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pays: pays.into(),
            match_type: MatchType::Normal,
            pay_type: PayType::Normal,
            frequency: default_frequency(),
            min_count_per_reel: 0,
            row_size: default_row_size(),
        }
    }

    pub fn to_symbol(&self, id: SymbolId) -> SlotResult<Symbol> {
        Ok(Symbol::parse(id, self.name.clone(), &self.pays)?
            .with_match_type(self.match_type)
            .with_pay_type(self.pay_type)
            .with_frequency(self.frequency)
            .with_min_count(self.min_count_per_reel)
            .with_row_size(self.row_size))
    }
}

/// Line entry; the path uses the comma-separated delta form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineConfig {
    /// Evaluation order, defaults to the declaration index
    #[serde(default)]
    pub order: Option<i32>,
    pub row: usize,
    pub path: String,
    #[serde(default)]
    pub loop_mode: LoopMode,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl LineConfig {
    pub fn new(row: usize, path: impl Into<String>) -> Self {
        Self {
            order: None,
            row,
            path: path.into(),
            loop_mode: LoopMode::Continue,
            enabled: true,
        }
    }

    pub fn to_line(&self, index: usize) -> SlotResult<Line> {
        let order = self.order.unwrap_or(index as i32);
        Ok(Line::parse(order, self.row, &self.path, self.loop_mode)?.with_enabled(self.enabled))
    }
}

/// Simulation defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub spins: u64,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            spins: 10_000,
            seed: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEFINITION
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete slot document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub name: String,
    #[serde(default)]
    pub config: SlotConfig,
    pub symbols: Vec<SymbolConfig>,
    #[serde(default)]
    pub lines: Vec<LineConfig>,
    #[serde(default)]
    pub modes: ModeSet,
    /// Fixed strips by symbol name; generated when absent
    #[serde(default)]
    pub strips: Option<Vec<Vec<String>>>,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl SlotDefinition {
    pub fn new(name: impl Into<String>, symbols: Vec<SymbolConfig>, lines: Vec<LineConfig>) -> Self {
        Self {
            name: name.into(),
            config: SlotConfig::default(),
            symbols,
            lines,
            modes: ModeSet::default(),
            strips: None,
            simulation: SimulationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SlotConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_modes(mut self, modes: ModeSet) -> Self {
        self.modes = modes;
        self
    }

    pub fn with_strips(mut self, strips: Vec<Vec<String>>) -> Self {
        self.strips = Some(strips);
        self
    }

    pub fn from_json_str(json: &str) -> SlotResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml_str(yaml: &str) -> SlotResult<Self> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Load by extension (`.json`, `.yaml`, `.yml`)
    pub fn from_path(path: impl AsRef<Path>) -> SlotResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            other => Err(SlotError::InvalidConfig(format!(
                "unsupported definition format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    pub fn to_json(&self) -> SlotResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> SlotResult<String> {
        Ok(serde_yml::to_string(self)?)
    }

    /// Build the symbol set
    pub fn symbol_set(&self) -> SlotResult<SymbolSet> {
        let symbols = self
            .symbols
            .iter()
            .enumerate()
            .map(|(id, s)| s.to_symbol(id as SymbolId))
            .collect::<SlotResult<Vec<_>>>()?;
        SymbolSet::new(symbols)
    }

    /// Build the line set, resolved for the configured layout
    pub fn line_set(&self) -> SlotResult<LineSet> {
        let lines = if self.config.ways {
            LineSet::ways(self.config.rows, self.config.reel_count)
        } else {
            self.lines
                .iter()
                .enumerate()
                .map(|(index, line)| line.to_line(index))
                .collect::<SlotResult<Vec<_>>>()?
        };

        let mut set = LineSet::new(lines, self.config.first_line_always_active);
        set.set_always_max_lines(self.config.debug.always_max_lines);
        set.resolve(self.config.reel_count, self.config.hidden_top);
        Ok(set)
    }

    /// Fixed strips as symbol ids, `None` when strips are generated
    pub fn strip_ids(&self, symbols: &SymbolSet) -> SlotResult<Option<Vec<Vec<SymbolId>>>> {
        let Some(strips) = &self.strips else {
            return Ok(None);
        };
        strips
            .iter()
            .map(|strip| strip.iter().map(|name| symbols.id_of(name)).collect())
            .collect::<SlotResult<Vec<_>>>()
            .map(Some)
    }

    /// Check everything a slot needs before building one
    pub fn validate(&self) -> SlotResult<()> {
        let result = self.check();
        if let Err(err) = &result {
            log::warn!("Definition '{}' rejected: {}", self.name, err);
        }
        result
    }

    fn check(&self) -> SlotResult<()> {
        let config = &self.config;
        if config.reel_count == 0 {
            return Err(SlotError::InvalidConfig("reel count must be at least 1".into()));
        }
        if config.rows == 0 {
            return Err(SlotError::InvalidConfig("visible rows must be at least 1".into()));
        }
        if config.bet == 0 {
            return Err(SlotError::InvalidConfig("bet must be at least 1".into()));
        }

        let required = config.layout().total();
        if self.strips.is_none() && config.symbols_per_reel < required {
            return Err(SlotError::StripTooShort {
                reel: 0,
                len: config.symbols_per_reel,
                required,
            });
        }

        let symbols = self.symbol_set()?;
        let lines = self.line_set()?;
        if lines.is_empty() && symbols.scatters().next().is_none() {
            return Err(SlotError::InvalidConfig("no lines and no scatter symbols".into()));
        }
        if let Some(line) = lines.iter().find(|l| l.row() >= config.rows) {
            return Err(SlotError::MalformedPath {
                input: format!("{:?}", line.path()),
                reason: format!("start row {} outside {} visible rows", line.row(), config.rows),
            });
        }

        if let Some(strips) = self.strip_ids(&symbols)? {
            if strips.len() != config.reel_count {
                return Err(SlotError::InvalidConfig(format!(
                    "{} strips for {} reels",
                    strips.len(),
                    config.reel_count
                )));
            }
            for (reel, strip) in strips.iter().enumerate() {
                if strip.len() < required {
                    return Err(SlotError::StripTooShort {
                        reel,
                        len: strip.len(),
                        required,
                    });
                }
            }
        }

        self.modes.resolve_swaps(&symbols)?;
        Ok(())
    }
}
