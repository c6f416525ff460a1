//! Mode manager — Default / FreeSpin / Bonus selection and symbol swaps

use serde::{Deserialize, Serialize};

use crate::symbols::SymbolId;

/// The three slot modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    #[default]
    Default,
    FreeSpin,
    Bonus,
}

impl ModeKind {
    pub const ALL: [ModeKind; 3] = [ModeKind::Default, ModeKind::FreeSpin, ModeKind::Bonus];

    pub fn name(&self) -> &'static str {
        match self {
            ModeKind::Default => "default",
            ModeKind::FreeSpin => "free_spin",
            ModeKind::Bonus => "bonus",
        }
    }

    /// Position in [`ModeKind::ALL`]
    pub fn index(&self) -> usize {
        match self {
            ModeKind::Default => 0,
            ModeKind::FreeSpin => 1,
            ModeKind::Bonus => 2,
        }
    }

    /// Mode a spin is paid from, given the available credits
    pub fn for_credits(free_spins: u32, bonuses: u32) -> Self {
        if bonuses > 0 {
            ModeKind::Bonus
        } else if free_spins > 0 {
            ModeKind::FreeSpin
        } else {
            ModeKind::Default
        }
    }
}

fn step(mode: ModeKind, free_spins: u32, bonuses: u32) -> ModeKind {
    match mode {
        ModeKind::Bonus if bonuses == 0 => ModeKind::FreeSpin,
        ModeKind::Bonus => ModeKind::Bonus,
        ModeKind::FreeSpin if bonuses > 0 => ModeKind::Bonus,
        ModeKind::FreeSpin if free_spins == 0 => ModeKind::Default,
        ModeKind::FreeSpin => ModeKind::FreeSpin,
        ModeKind::Default => ModeKind::for_credits(free_spins, bonuses),
    }
}

/// Round-start resolution: exhausted modes fall through until stable
pub fn resolve_mode(current: ModeKind, free_spins: u32, bonuses: u32) -> ModeKind {
    let mut mode = current;
    for _ in 0..ModeKind::ALL.len() {
        let next = step(mode, free_spins, bonuses);
        if next == mode {
            break;
        }
        mode = next;
    }
    mode
}

/// A resolved symbol replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSwap {
    pub from: SymbolId,
    pub to: SymbolId,
}

/// Run one symbol through the whole swap table in order
pub fn swap_symbol(id: SymbolId, swaps: &[SymbolSwap]) -> SymbolId {
    swaps
        .iter()
        .fold(id, |current, swap| if current == swap.from { swap.to } else { current })
}

/// Apply swaps over baseline strips
pub fn apply_swaps(clean: &[Vec<SymbolId>], swaps: &[SymbolSwap]) -> Vec<Vec<SymbolId>> {
    clean
        .iter()
        .map(|strip| strip.iter().map(|&id| swap_symbol(id, swaps)).collect())
        .collect()
}

/// A mode change that happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeChange {
    pub previous: ModeKind,
    pub current: ModeKind,
}

/// Tracks the current mode and the clean strips captured at initialization
#[derive(Debug, Clone)]
pub struct ModeManager {
    current: ModeKind,
    clean: Vec<Vec<SymbolId>>,
    /// Swap tables indexed by [`ModeKind::index`]
    swaps: [Vec<SymbolSwap>; 3],
}

impl ModeManager {
    pub fn new(clean: Vec<Vec<SymbolId>>, swaps: [Vec<SymbolSwap>; 3]) -> Self {
        Self {
            current: ModeKind::Default,
            clean,
            swaps,
        }
    }

    pub fn current(&self) -> ModeKind {
        self.current
    }

    pub fn clean_strips(&self) -> &[Vec<SymbolId>] {
        &self.clean
    }

    /// Strips of a mode, derived from the clean baseline
    pub fn strips_for(&self, mode: ModeKind) -> Vec<Vec<SymbolId>> {
        apply_swaps(&self.clean, &self.swaps[mode.index()])
    }

    /// Resolve against the credits and switch if needed
    pub fn switch(&mut self, free_spins: u32, bonuses: u32) -> Option<ModeChange> {
        let next = resolve_mode(self.current, free_spins, bonuses);
        self.set(next)
    }

    /// Force a mode
    pub fn set(&mut self, mode: ModeKind) -> Option<ModeChange> {
        if mode == self.current {
            return None;
        }
        let change = ModeChange {
            previous: self.current,
            current: mode,
        };
        log::info!("Mode {} -> {}", change.previous.name(), change.current.name());
        self.current = mode;
        Some(change)
    }
}
