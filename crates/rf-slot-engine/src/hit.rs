//! Hit evaluation — chain matching along lines and scatter counting
//!
//! The same [`RoundHits`] pass drives live rounds and the simulator, so both
//! pay exactly the same hits for the same grid.

use serde::{Deserialize, Serialize};

use crate::line::LineSet;
use crate::reel::Reel;
use crate::symbols::{PayType, SymbolId, SymbolSet};

/// A visible grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HolderRef {
    pub reel: usize,
    /// Visible row (0 = top visible row)
    pub row: usize,
}

impl HolderRef {
    pub fn new(reel: usize, row: usize) -> Self {
        Self { reel, row }
    }
}

/// Visible symbols of every reel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolGrid {
    /// One column per reel, top to bottom
    columns: Vec<Vec<SymbolId>>,
    /// Hidden rows above the visible band (offset of line paths)
    row_offset: usize,
}

impl SymbolGrid {
    pub fn new(columns: Vec<Vec<SymbolId>>, row_offset: usize) -> Self {
        Self { columns, row_offset }
    }

    /// Snapshot the visible window of live reels
    pub fn from_reels(reels: &[Reel]) -> Self {
        let row_offset = reels.first().map(|r| r.layout().hidden_top).unwrap_or(0);
        Self {
            columns: reels.iter().map(|r| r.visible_symbols()).collect(),
            row_offset,
        }
    }

    pub fn reel_count(&self) -> usize {
        self.columns.len()
    }

    pub fn rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    pub fn columns(&self) -> &[Vec<SymbolId>] {
        &self.columns
    }

    pub fn get(&self, reel: usize, row: usize) -> Option<SymbolId> {
        self.columns.get(reel).and_then(|c| c.get(row)).copied()
    }

    /// Every visible position, reel by reel
    pub fn visible(&self) -> impl Iterator<Item = (HolderRef, SymbolId)> + '_ {
        self.columns.iter().enumerate().flat_map(|(reel, column)| {
            column
                .iter()
                .enumerate()
                .map(move |(row, &symbol)| (HolderRef::new(reel, row), symbol))
        })
    }

    /// Follow absolute path rows, stopping at the first row outside the visible band
    pub fn trace(&self, paths: &[isize]) -> Vec<(HolderRef, SymbolId)> {
        let mut traced = Vec::with_capacity(paths.len());
        for (reel, &absolute) in paths.iter().enumerate() {
            let row = absolute - self.row_offset as isize;
            if row < 0 {
                break;
            }
            match self.get(reel, row as usize) {
                Some(symbol) => traced.push((HolderRef::new(reel, row as usize), symbol)),
                None => break,
            }
        }
        traced
    }
}

/// Outcome of a left-to-right chain walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chain {
    /// Resolved symbol (wilds replaced by the first concrete symbol)
    pub hit_symbol: Option<SymbolId>,
    pub length: usize,
    pub holders: Vec<HolderRef>,
}

/// Walk `traced` from the first reel while each symbol can match the running hit symbol
pub fn evaluate_chain(symbols: &SymbolSet, traced: &[(HolderRef, SymbolId)]) -> Chain {
    let mut chain = Chain::default();
    let Some(&(_, first)) = traced.first() else {
        return chain;
    };
    let Some(mut hit) = symbols.get(first) else {
        return chain;
    };

    for &(holder, id) in traced {
        let Some(symbol) = symbols.get(id) else {
            break;
        };
        if !symbol.can_match(hit) {
            break;
        }
        if hit.is_wild() && !symbol.is_wild() {
            hit = symbol;
        }
        chain.length += 1;
        chain.holders.push(holder);
    }

    chain.hit_symbol = Some(hit.id);
    chain
}

/// Where a hit record comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitSource {
    Line { index: usize, order: i32 },
    Scatter { symbol: SymbolId },
}

/// Per-round evaluation record of one line or one scatter symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitInfo {
    pub source: HitSource,
    /// Holders traced along the line (scatter: matching holders)
    pub traced: Vec<HolderRef>,
    /// Holders that form the chain
    pub hit_holders: Vec<HolderRef>,
    pub hit_symbol: Option<SymbolId>,
    pub hit_chains: usize,
    pub payout: u64,
    pub pay_type: PayType,
    matched: bool,
    line_enabled: bool,
    processed: bool,
}

impl HitInfo {
    fn new(source: HitSource) -> Self {
        Self {
            source,
            traced: Vec::new(),
            hit_holders: Vec::new(),
            hit_symbol: None,
            hit_chains: 0,
            payout: 0,
            pay_type: PayType::Normal,
            matched: false,
            line_enabled: false,
            processed: false,
        }
    }

    pub fn for_line(index: usize, order: i32) -> Self {
        Self::new(HitSource::Line { index, order })
    }

    pub fn for_scatter(symbol: SymbolId) -> Self {
        let mut info = Self::new(HitSource::Scatter { symbol });
        info.hit_symbol = Some(symbol);
        info
    }

    pub fn is_scatter(&self) -> bool {
        matches!(self.source, HitSource::Scatter { .. })
    }

    pub fn line_index(&self) -> Option<usize> {
        match self.source {
            HitSource::Line { index, .. } => Some(index),
            HitSource::Scatter { .. } => None,
        }
    }

    /// Matched, and either a scatter or on an enabled line
    pub fn is_hit(&self) -> bool {
        self.matched && (self.is_scatter() || self.line_enabled)
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }
}

/// Hit chains accepted so far this round (alternative line check)
#[derive(Debug, Clone, Default)]
pub struct HitRegistry {
    chains: Vec<Vec<HolderRef>>,
}

impl HitRegistry {
    /// False when a registered chain at least as long starts with the same holders
    pub fn accepts(&self, holders: &[HolderRef]) -> bool {
        !self
            .chains
            .iter()
            .any(|chain| chain.len() >= holders.len() && chain[..holders.len()] == *holders)
    }

    pub fn register(&mut self, holders: Vec<HolderRef>) {
        self.chains.push(holders);
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn clear(&mut self) {
        self.chains.clear();
    }
}

/// Everything one evaluation pass reads
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub symbols: &'a SymbolSet,
    pub lines: &'a LineSet,
    pub grid: &'a SymbolGrid,
    pub alternative_line_check: bool,
}

/// Hit records of one round, processed one at a time in evaluation order
#[derive(Debug, Clone, Default)]
pub struct RoundHits {
    infos: Vec<HitInfo>,
    registry: HitRegistry,
    next: usize,
}

impl RoundHits {
    /// Fresh records: every line by order, then every scatter symbol
    pub fn new(lines: &LineSet, symbols: &SymbolSet) -> Self {
        let mut infos: Vec<HitInfo> = lines
            .iter()
            .enumerate()
            .map(|(index, line)| HitInfo::for_line(index, line.order))
            .collect();
        infos.extend(symbols.scatters().map(|s| HitInfo::for_scatter(s.id)));

        Self {
            infos,
            registry: HitRegistry::default(),
            next: 0,
        }
    }

    pub fn infos(&self) -> &[HitInfo] {
        &self.infos
    }

    pub fn registry(&self) -> &HitRegistry {
        &self.registry
    }

    /// Index of the most recently processed record
    pub fn last_processed(&self) -> Option<usize> {
        self.next.checked_sub(1)
    }

    /// All records processed
    pub fn is_exhausted(&self) -> bool {
        self.next >= self.infos.len()
    }

    /// Processed records that are hits
    pub fn hits(&self) -> impl Iterator<Item = &HitInfo> {
        self.infos.iter().filter(|i| i.processed && i.is_hit())
    }

    /// Process records until the next hit, `None` once exhausted
    pub fn next_hit(&mut self, ctx: &EvalContext<'_>) -> Option<&HitInfo> {
        while self.next < self.infos.len() {
            let index = self.next;
            self.next += 1;

            let info = &mut self.infos[index];
            match info.source {
                HitSource::Line { index: line, .. } => check_line(info, line, &mut self.registry, ctx),
                HitSource::Scatter { symbol } => check_scatter(info, symbol, ctx),
            }
            info.processed = true;

            if info.is_hit() {
                return Some(&self.infos[index]);
            }
        }
        None
    }

    /// Drain every remaining hit
    pub fn evaluate_all(&mut self, ctx: &EvalContext<'_>) -> Vec<HitInfo> {
        let mut out = Vec::new();
        while let Some(hit) = self.next_hit(ctx) {
            out.push(hit.clone());
        }
        out
    }
}

fn check_line(info: &mut HitInfo, line_index: usize, registry: &mut HitRegistry, ctx: &EvalContext<'_>) {
    let Some(line) = ctx.lines.get(line_index) else {
        return;
    };
    info.line_enabled = line.enabled;

    let reel_count = ctx.grid.reel_count();
    let paths = if line.paths().len() == reel_count {
        line.paths().to_vec()
    } else {
        line.resolve_path(reel_count, ctx.grid.row_offset())
    };
    let traced = ctx.grid.trace(&paths);
    info.traced = traced.iter().map(|(h, _)| *h).collect();
    if traced.len() != reel_count {
        log::debug!(
            "Line {} leaves the visible rows after {} reels, no hit",
            line_index,
            traced.len()
        );
        return;
    }

    let chain = evaluate_chain(ctx.symbols, &traced);
    info.hit_symbol = chain.hit_symbol;
    info.hit_chains = chain.length;
    info.hit_holders = chain.holders;

    let Some(symbol) = chain.hit_symbol.and_then(|id| ctx.symbols.get(id)) else {
        return;
    };
    if !symbol.hits_with(info.hit_chains) {
        return;
    }
    if ctx.alternative_line_check && !accepts_alternative(info, registry, ctx) {
        log::debug!("Line {} suppressed by alternative line check", line_index);
        return;
    }

    info.matched = true;
    info.payout = symbol.pay_amount(info.hit_chains);
    info.pay_type = symbol.pay_type;

    if ctx.alternative_line_check && info.is_hit() {
        registry.register(info.hit_holders.clone());
    }
}

/// Ways rule: reject when the chain could extend one reel further on any
/// visible row, or a registered chain already covers this prefix
fn accepts_alternative(info: &HitInfo, registry: &HitRegistry, ctx: &EvalContext<'_>) -> bool {
    let Some(hit_symbol) = info.hit_symbol.and_then(|id| ctx.symbols.get(id)) else {
        return false;
    };

    let depth = info.hit_holders.len();
    if depth < ctx.grid.reel_count() {
        let extends = (0..ctx.grid.rows()).any(|row| {
            ctx.grid
                .get(depth, row)
                .and_then(|id| ctx.symbols.get(id))
                .is_some_and(|s| s.can_match(hit_symbol))
        });
        if extends {
            return false;
        }
    }

    registry.accepts(&info.hit_holders)
}

fn check_scatter(info: &mut HitInfo, scatter: SymbolId, ctx: &EvalContext<'_>) {
    let Some(symbol) = ctx.symbols.get(scatter) else {
        return;
    };
    if !symbol.is_scatter() {
        return;
    }

    info.hit_holders = ctx
        .grid
        .visible()
        .filter(|&(_, id)| id == scatter)
        .map(|(holder, _)| holder)
        .collect();
    info.traced = info.hit_holders.clone();
    info.hit_chains = info.hit_holders.len();

    if symbol.hits_with(info.hit_chains) {
        info.matched = true;
        info.payout = symbol.pay_amount(info.hit_chains);
        info.pay_type = symbol.pay_type;
    }
}
