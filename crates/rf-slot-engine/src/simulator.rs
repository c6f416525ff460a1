//! Monte-Carlo simulator
//!
//! Runs spins purely in memory against the Default / FreeSpin / Bonus strip
//! variants, evaluating every grid with the same [`RoundHits`] pass the live
//! slot uses. No event queue, no collaborators.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ModeSet, SlotDefinition};
use crate::error::SlotResult;
use crate::generator::{count_on_strip, generate_strips};
use crate::hit::{EvalContext, RoundHits, SymbolGrid};
use crate::line::LineSet;
use crate::mode::{ModeKind, apply_swaps};
use crate::symbols::{PayType, SymbolId, SymbolSet};

/// Chain-length histogram buckets; the last collects longer chains
pub const CHAIN_BUCKETS: usize = 10;

fn bucket(chains: usize) -> usize {
    chains.clamp(1, CHAIN_BUCKETS) - 1
}

/// Per-symbol statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolLog {
    pub symbol: SymbolId,
    pub name: String,
    /// Copies over all clean strips
    pub strip_count: usize,
    pub hits: u64,
    /// Credits paid by normal hits
    pub income: u64,
    pub chains: [u64; CHAIN_BUCKETS],
}

/// Sort order for symbol statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSort {
    #[default]
    Profit,
    Hits,
    Count,
}

/// Aggregate simulation results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub spins: u64,
    pub total_cost: u64,
    pub income: u64,
    /// Spins with at least one hit
    pub hit_spins: u64,
    pub hits: u64,
    pub free_spins_awarded: u64,
    pub free_spins_played: u64,
    pub bonuses_awarded: u64,
    pub bonuses_played: u64,
    /// Default-mode cost not paid on free spin and bonus spins
    pub cost_saved: u64,
    pub chains: [u64; CHAIN_BUCKETS],
    pub symbols: Vec<SymbolLog>,
    pub warnings: Vec<String>,
}

impl SimulationReport {
    /// Income minus cost
    pub fn balance(&self) -> i64 {
        self.income as i64 - self.total_cost as i64
    }

    /// Return to player (income / cost)
    pub fn rtp(&self) -> f64 {
        if self.total_cost > 0 {
            self.income as f64 / self.total_cost as f64
        } else {
            0.0
        }
    }

    /// Fraction of spins with at least one hit
    pub fn hit_rate(&self) -> f64 {
        if self.spins > 0 {
            self.hit_spins as f64 / self.spins as f64
        } else {
            0.0
        }
    }

    pub fn sorted_symbols(&self, sort: ReportSort) -> Vec<&SymbolLog> {
        let mut list: Vec<&SymbolLog> = self.symbols.iter().collect();
        match sort {
            ReportSort::Profit => list.sort_by(|a, b| b.income.cmp(&a.income)),
            ReportSort::Hits => list.sort_by(|a, b| b.hits.cmp(&a.hits)),
            ReportSort::Count => list.sort_by(|a, b| b.strip_count.cmp(&a.strip_count)),
        }
        list
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Spins:        {}", self.spins)?;
        writeln!(f, "Cost:         {}", self.total_cost)?;
        writeln!(f, "Income:       {}", self.income)?;
        writeln!(f, "Balance:      {}", self.balance())?;
        writeln!(f, "RTP:          {:.2}%", self.rtp() * 100.0)?;
        writeln!(f, "Hit rate:     {:.2}%", self.hit_rate() * 100.0)?;
        writeln!(
            f,
            "Free spins:   {} awarded, {} played",
            self.free_spins_awarded, self.free_spins_played
        )?;
        writeln!(
            f,
            "Bonuses:      {} awarded, {} played",
            self.bonuses_awarded, self.bonuses_played
        )?;
        writeln!(f, "Cost saved:   {}", self.cost_saved)?;
        writeln!(f, "Chains:       {:?}", self.chains)?;
        writeln!(f)?;
        writeln!(f, "{:<12} {:>6} {:>10} {:>12}  chains", "symbol", "count", "hits", "income")?;
        for log in self.sorted_symbols(ReportSort::Profit) {
            writeln!(
                f,
                "{:<12} {:>6} {:>10} {:>12}  {:?}",
                log.name, log.strip_count, log.hits, log.income, log.chains
            )?;
        }
        for warning in &self.warnings {
            writeln!(f, "warning: {}", warning)?;
        }
        Ok(())
    }
}

/// Simulator over fixed strips
#[derive(Debug, Clone)]
pub struct Simulator {
    symbols: SymbolSet,
    /// Every line, enabled, resolved without hidden rows
    lines: LineSet,
    rows: usize,
    alternative_line_check: bool,
    clean: Vec<Vec<SymbolId>>,
    /// Strip variants indexed by [`ModeKind::index`]
    strips: [Vec<Vec<SymbolId>>; 3],
    /// Spin cost per mode
    costs: [u64; 3],
}

impl Simulator {
    pub fn new(
        symbols: SymbolSet,
        lines: &LineSet,
        rows: usize,
        clean: Vec<Vec<SymbolId>>,
        modes: &ModeSet,
    ) -> SlotResult<Self> {
        let reel_count = clean.len();
        let enabled = lines.iter().map(|l| l.clone().with_enabled(true)).collect();
        let mut lines = LineSet::new(enabled, false);
        lines.resolve(reel_count, 0);

        let swaps = modes.resolve_swaps(&symbols)?;
        let strips = [
            apply_swaps(&clean, &swaps[0]),
            apply_swaps(&clean, &swaps[1]),
            apply_swaps(&clean, &swaps[2]),
        ];
        let line_count = lines.len() as u64;
        let costs = ModeKind::ALL.map(|kind| modes.get(kind).cost_per_line as u64 * line_count);

        Ok(Self {
            symbols,
            lines,
            rows: rows.max(1),
            alternative_line_check: false,
            clean,
            strips,
            costs,
        })
    }

    /// Build from a definition, generating strips when none are given
    pub fn from_definition<R: Rng + ?Sized>(definition: &SlotDefinition, rng: &mut R) -> SlotResult<Self> {
        definition.validate()?;
        let config = &definition.config;
        let symbols = definition.symbol_set()?;
        let lines = definition.line_set()?;
        let clean = match definition.strip_ids(&symbols)? {
            Some(strips) => strips,
            None => generate_strips(&symbols, config.reel_count, config.symbols_per_reel, rng),
        };

        Ok(Self::new(symbols, &lines, config.rows, clean, &definition.modes)?
            .with_alternative_line_check(config.alternative_line_check))
    }

    pub fn with_alternative_line_check(mut self, enabled: bool) -> Self {
        self.alternative_line_check = enabled;
        self
    }

    pub fn clean_strips(&self) -> &[Vec<SymbolId>] {
        &self.clean
    }

    /// Visible grid for one stop per reel
    pub fn grid_at(&self, mode: ModeKind, stops: &[usize]) -> SymbolGrid {
        let columns = self.strips[mode.index()]
            .iter()
            .zip(stops)
            .map(|(strip, &stop)| {
                (0..self.rows)
                    .map(|row| strip[(stop + self.rows - 1 - row) % strip.len()])
                    .collect()
            })
            .collect();
        SymbolGrid::new(columns, 0)
    }

    /// Run `spins` independent spins
    pub fn run<R: Rng + ?Sized>(&self, spins: u64, rng: &mut R) -> SimulationReport {
        let mut report = self.empty_report();
        let mut free_spins: u64 = 0;
        let mut bonuses: u64 = 0;

        for _ in 0..spins {
            let mode = ModeKind::for_credits(free_spins.min(1) as u32, bonuses.min(1) as u32);
            match mode {
                ModeKind::Bonus => {
                    bonuses -= 1;
                    report.bonuses_played += 1;
                }
                ModeKind::FreeSpin => {
                    free_spins -= 1;
                    report.free_spins_played += 1;
                }
                ModeKind::Default => {}
            }
            let cost = self.costs[mode.index()];
            report.total_cost += cost;
            report.cost_saved += self.costs[ModeKind::Default.index()].saturating_sub(cost);

            let stops: Vec<usize> = self.strips[mode.index()]
                .iter()
                .map(|strip| rng.random_range(0..strip.len()))
                .collect();
            let grid = self.grid_at(mode, &stops);

            let ctx = EvalContext {
                symbols: &self.symbols,
                lines: &self.lines,
                grid: &grid,
                alternative_line_check: self.alternative_line_check,
            };
            let hits = RoundHits::new(&self.lines, &self.symbols).evaluate_all(&ctx);
            if !hits.is_empty() {
                report.hit_spins += 1;
            }

            for hit in &hits {
                report.hits += 1;
                report.chains[bucket(hit.hit_chains)] += 1;
                let Some(log) = hit.hit_symbol.and_then(|id| report.symbols.get_mut(id as usize)) else {
                    continue;
                };
                log.hits += 1;
                log.chains[bucket(hit.hit_chains)] += 1;

                match hit.pay_type {
                    PayType::Normal => {
                        log.income = log.income.saturating_add(hit.payout);
                        report.income = report.income.saturating_add(hit.payout);
                    }
                    PayType::FreeSpin => {
                        free_spins = free_spins.saturating_add(hit.payout);
                        report.free_spins_awarded = report.free_spins_awarded.saturating_add(hit.payout);
                    }
                    PayType::Bonus => {
                        bonuses = bonuses.saturating_add(hit.payout);
                        report.bonuses_awarded = report.bonuses_awarded.saturating_add(hit.payout);
                    }
                    PayType::Custom => {}
                }
            }
        }

        report.spins = spins;
        report.warnings = self.warnings(&report);
        log::info!(
            "Simulated {} spins: RTP {:.2}%, hit rate {:.2}%",
            spins,
            report.rtp() * 100.0,
            report.hit_rate() * 100.0
        );
        report
    }

    fn empty_report(&self) -> SimulationReport {
        let symbols = self
            .symbols
            .iter()
            .map(|s| SymbolLog {
                symbol: s.id,
                name: s.name.clone(),
                strip_count: self.clean.iter().map(|strip| count_on_strip(strip, s.id)).sum(),
                hits: 0,
                income: 0,
                chains: [0; CHAIN_BUCKETS],
            })
            .collect();

        SimulationReport {
            spins: 0,
            total_cost: 0,
            income: 0,
            hit_spins: 0,
            hits: 0,
            free_spins_awarded: 0,
            free_spins_played: 0,
            bonuses_awarded: 0,
            bonuses_played: 0,
            cost_saved: 0,
            chains: [0; CHAIN_BUCKETS],
            symbols,
            warnings: Vec::new(),
        }
    }

    /// Line symbols that never reached a full-length chain
    fn warnings(&self, report: &SimulationReport) -> Vec<String> {
        let full = bucket(self.clean.len());
        self.symbols
            .iter()
            .filter(|s| !s.is_scatter() && s.min_chains().is_some())
            .filter(|s| report.symbols[s.id as usize].chains[full] == 0)
            .map(|s| format!("{} never hit {} in a row", s.name, self.clean.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LineConfig, ModeConfig, SymbolConfig};
    use crate::line::Line;
    use crate::symbols::{MatchType, Symbol};
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_rtp_matches_weighted_pays() {
        // One reel, one row: each spin pays the drawn symbol's pay
        let symbols = SymbolSet::new(vec![
            Symbol::new(0, "A", vec![10]).with_frequency(20),
            Symbol::new(0, "B", vec![2]).with_frequency(30),
            Symbol::new(0, "C", vec![0]).with_frequency(50),
        ])
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let strips = generate_strips(&symbols, 1, 10_000, &mut rng);
        let lines = LineSet::new(vec![Line::straight(0, 0)], false);

        let analytical: f64 = symbols
            .iter()
            .zip(symbols.probabilities())
            .map(|(s, p)| s.pay_amount(1) as f64 * p)
            .sum::<f64>()
            / 5.0;

        let sim = Simulator::new(symbols, &lines, 1, strips, &ModeSet::default()).unwrap();
        let report = sim.run(10_000, &mut rng);

        assert_eq!(report.spins, 10_000);
        assert_eq!(report.total_cost, 50_000);
        assert_abs_diff_eq!(analytical, 0.52, epsilon = 1e-9);
        assert_abs_diff_eq!(report.rtp(), analytical, epsilon = 0.04);
        assert_abs_diff_eq!(report.hit_rate(), 0.5, epsilon = 0.03);
    }

    #[test]
    fn test_grid_reads_rows_top_to_bottom() {
        let symbols = SymbolSet::new(vec![
            Symbol::new(0, "A", vec![0]),
            Symbol::new(0, "B", vec![0]),
            Symbol::new(0, "C", vec![0]),
        ])
        .unwrap();
        let lines = LineSet::new(vec![Line::straight(0, 0)], false);
        let strips = vec![vec![0, 1, 2, 0, 1, 2]];
        let sim = Simulator::new(symbols, &lines, 3, strips, &ModeSet::default()).unwrap();

        // Stop wraps: the top row sits furthest along the strip
        let grid = sim.grid_at(ModeKind::Default, &[5]);
        assert_eq!(grid.columns(), &[vec![1, 0, 2]]);
    }

    #[test]
    fn test_matches_live_evaluation_for_fixed_strips() {
        let def = SlotDefinition::new(
            "all-a",
            vec![SymbolConfig::new("A", "0,0,50,200,1000")],
            vec![LineConfig::new(0, "0"), LineConfig::new(1, "0")],
        )
        .with_strips(vec![vec!["A".to_string(); 6]; 5]);

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let sim = Simulator::from_definition(&def, &mut rng).unwrap();
        let report = sim.run(100, &mut rng);

        assert_eq!(report.hits, 200);
        assert_eq!(report.income, 200_000);
        assert_eq!(report.total_cost, 100 * 5 * 2);
        assert_eq!(report.chains[4], 200);
        assert_eq!(report.symbols[0].strip_count, 30);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_free_spins_use_their_mode() {
        let mut def = SlotDefinition::new(
            "scatter",
            vec![
                SymbolConfig::new("A", "0,0,0,0,0"),
                SymbolConfig {
                    match_type: MatchType::Scatter,
                    pay_type: PayType::FreeSpin,
                    ..SymbolConfig::new("S", "0,0,0,0,2")
                },
            ],
            vec![LineConfig::new(0, "0")],
        )
        .with_strips(vec![vec!["S".to_string(); 6]; 5]);
        def.config.rows = 1;
        def.config.hidden_top = 0;
        def.config.hidden_bottom = 0;
        def.modes.free_spin = ModeConfig::named("Free").with_cost_per_line(0).with_swap("S", "A");

        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let report = Simulator::from_definition(&def, &mut rng).unwrap().run(9, &mut rng);

        // Paid spin awards 2, both free spins show only A
        assert_eq!(report.free_spins_awarded, 6);
        assert_eq!(report.free_spins_played, 6);
        assert_eq!(report.total_cost, 3 * 5);
        assert_eq!(report.cost_saved, 6 * 5);
        assert_eq!(report.symbols[1].hits, 3);
        assert!(report.to_json().unwrap().contains("\"free_spins_awarded\": 6"));
    }

    #[test]
    fn test_warnings_and_sorting() {
        let symbols = SymbolSet::new(vec![
            Symbol::new(0, "A", vec![0, 5, 10]),
            Symbol::new(0, "B", vec![0, 1, 2]),
        ])
        .unwrap();
        let lines = LineSet::new(vec![Line::straight(0, 0)], false);
        let strips = vec![vec![0, 0, 0, 0, 1], vec![0, 0, 0, 0, 1], vec![1, 1, 1, 1]];
        let sim = Simulator::new(symbols, &lines, 1, strips, &ModeSet::default()).unwrap();
        let report = sim.run(500, &mut ChaCha8Rng::seed_from_u64(4));

        assert!(report.warnings.iter().any(|w| w.starts_with("A never hit 3")));
        let by_count = report.sorted_symbols(ReportSort::Count);
        assert_eq!(by_count[0].name, "A");
        assert!(report.to_string().contains("RTP:"));
    }
}
