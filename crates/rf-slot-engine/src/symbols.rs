//! Symbol definitions, pay tables and the symbol set

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SlotError, SlotResult};

/// Index of a symbol inside its [`SymbolSet`]
pub type SymbolId = u32;

/// How a symbol takes part in chain matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Matches only itself (and wilds)
    #[default]
    Normal,
    /// Substitutes for any non-scatter symbol
    Wild,
    /// Never joins line chains, counted anywhere on the visible grid
    Scatter,
    /// Host-defined, matches like `Normal`
    Custom,
}

/// What a hit on this symbol awards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayType {
    /// Payout × bet credited to the balance
    #[default]
    Normal,
    /// Payout added as free spin credits
    FreeSpin,
    /// Payout added as bonus credits
    Bonus,
    /// Counted as a hit, nothing awarded
    Custom,
}

/// Parse a comma-separated pay table such as `"0,0,50,200,1000"`.
///
/// A single trailing comma is tolerated.
pub fn parse_pays(input: &str) -> SlotResult<Vec<u64>> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(SlotError::InvalidPayTable {
            input: input.to_string(),
            reason: "empty".into(),
        });
    }

    trimmed
        .split(',')
        .map(|token| {
            token
                .trim()
                .parse::<u64>()
                .map_err(|e| SlotError::InvalidPayTable {
                    input: input.to_string(),
                    reason: format!("'{}': {}", token.trim(), e),
                })
        })
        .collect()
}

/// Lowest chain length with a nonzero pay, `None` when the symbol never hits
pub fn derive_min_chains(pays: &[u64]) -> Option<u8> {
    pays.iter()
        .position(|&p| p > 0)
        .map(|idx| (idx + 1).min(u8::MAX as usize) as u8)
}

/// A symbol definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Index in the owning symbol set
    pub id: SymbolId,
    /// Symbol name (e.g., "CHERRY", "WILD", "SCATTER")
    pub name: String,
    pub match_type: MatchType,
    pub pay_type: PayType,
    /// Pays indexed by chain length − 1
    pays: Vec<u64>,
    /// Derived from `pays`
    min_chains: Option<u8>,
    /// Relative generation weight
    pub frequency: u32,
    /// Copies guaranteed on every generated strip
    pub min_count_per_reel: u32,
    /// Rows spanned by one occurrence (> 1 = multi-row symbol)
    pub row_size: u8,
}

impl Symbol {
    /// Create a normal paying symbol
    pub fn new(id: SymbolId, name: impl Into<String>, pays: Vec<u64>) -> Self {
        let min_chains = derive_min_chains(&pays);
        Self {
            id,
            name: name.into(),
            match_type: MatchType::Normal,
            pay_type: PayType::Normal,
            pays,
            min_chains,
            frequency: 50,
            min_count_per_reel: 0,
            row_size: 1,
        }
    }

    /// Create a wild symbol
    pub fn wild(id: SymbolId, name: impl Into<String>, pays: Vec<u64>) -> Self {
        Self::new(id, name, pays).with_match_type(MatchType::Wild)
    }

    /// Create a scatter symbol
    pub fn scatter(id: SymbolId, name: impl Into<String>, pays: Vec<u64>) -> Self {
        Self::new(id, name, pays).with_match_type(MatchType::Scatter)
    }

    /// Create a symbol from a pay table string
    pub fn parse(id: SymbolId, name: impl Into<String>, pays: &str) -> SlotResult<Self> {
        Ok(Self::new(id, name, parse_pays(pays)?))
    }

    pub fn with_match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    pub fn with_pay_type(mut self, pay_type: PayType) -> Self {
        self.pay_type = pay_type;
        self
    }

    pub fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_min_count(mut self, min_count_per_reel: u32) -> Self {
        self.min_count_per_reel = min_count_per_reel;
        self
    }

    pub fn with_row_size(mut self, row_size: u8) -> Self {
        self.row_size = row_size.max(1);
        self
    }

    /// Replace the pay table, re-deriving `min_chains`
    pub fn set_pays(&mut self, pays: Vec<u64>) {
        self.min_chains = derive_min_chains(&pays);
        self.pays = pays;
    }

    pub fn pays(&self) -> &[u64] {
        &self.pays
    }

    pub fn min_chains(&self) -> Option<u8> {
        self.min_chains
    }

    pub fn is_wild(&self) -> bool {
        self.match_type == MatchType::Wild
    }

    pub fn is_scatter(&self) -> bool {
        self.match_type == MatchType::Scatter
    }

    /// Multi-row symbol
    pub fn is_mrs(&self) -> bool {
        self.row_size > 1
    }

    /// Chain matching rule: scatters never match, wilds match anything else
    pub fn can_match(&self, other: &Symbol) -> bool {
        if self.is_scatter() || other.is_scatter() {
            return false;
        }
        self.id == other.id || self.is_wild() || other.is_wild()
    }

    /// Pay for a chain of `chains` symbols, clamped to the last table entry
    pub fn pay_amount(&self, chains: usize) -> u64 {
        if chains == 0 || self.pays.is_empty() {
            return 0;
        }
        let idx = (chains - 1).min(self.pays.len() - 1);
        self.pays[idx]
    }

    /// Highest chain pay (last table entry)
    pub fn max_pay(&self) -> u64 {
        self.pays.last().copied().unwrap_or(0)
    }

    /// True when a chain of `chains` satisfies `min_chains`
    pub fn hits_with(&self, chains: usize) -> bool {
        self.min_chains.is_some_and(|min| chains >= min as usize)
    }
}

/// Sort order for symbol listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolSort {
    #[default]
    Declared,
    ByName,
    ByPay,
}

/// The ordered set of symbols of one slot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolSet {
    symbols: Vec<Symbol>,
}

impl SymbolSet {
    /// Build a set, assigning ids by position
    pub fn new(symbols: Vec<Symbol>) -> SlotResult<Self> {
        if symbols.is_empty() {
            return Err(SlotError::InvalidConfig("symbol set is empty".into()));
        }

        let mut symbols = symbols;
        for (idx, symbol) in symbols.iter_mut().enumerate() {
            symbol.id = idx as SymbolId;
        }
        for (idx, symbol) in symbols.iter().enumerate() {
            if symbols[..idx].iter().any(|s| s.name == symbol.name) {
                return Err(SlotError::DuplicateSymbol(symbol.name.clone()));
            }
        }

        Ok(Self { symbols })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// Get symbol by id
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id as usize)
    }

    /// Get symbol by name, `None` when missing
    pub fn by_name(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    /// Resolve a name to an id, failing with `UnknownSymbol`
    pub fn id_of(&self, name: &str) -> SlotResult<SymbolId> {
        self.by_name(name)
            .map(|s| s.id)
            .ok_or_else(|| SlotError::UnknownSymbol(name.to_string()))
    }

    /// Scatter symbols in declaration order
    pub fn scatters(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.is_scatter())
    }

    /// Running sum of generation weights in declaration order
    pub fn cumulative_weights(&self) -> Vec<u64> {
        self.cumulative_weights_where(|_| true)
    }

    /// Running sum where ineligible symbols contribute zero width
    fn cumulative_weights_where(&self, eligible: impl Fn(&Symbol) -> bool) -> Vec<u64> {
        self.symbols
            .iter()
            .scan(0u64, |acc, s| {
                if eligible(s) {
                    *acc += s.frequency as u64;
                }
                Some(*acc)
            })
            .collect()
    }

    /// Probability of drawing each symbol by weight
    pub fn probabilities(&self) -> Vec<f64> {
        let total: u64 = self.symbols.iter().map(|s| s.frequency as u64).sum();
        self.symbols
            .iter()
            .map(|s| {
                if total == 0 {
                    0.0
                } else {
                    s.frequency as f64 / total as f64
                }
            })
            .collect()
    }

    /// Weighted draw by cumulative frequency.
    ///
    /// Falls back to the first eligible symbol when every weight is zero.
    pub fn random_symbol<R: Rng + ?Sized>(&self, rng: &mut R, exclude_mrs: bool) -> Option<SymbolId> {
        let eligible = |s: &Symbol| !(exclude_mrs && s.is_mrs());
        let cumulative = self.cumulative_weights_where(eligible);
        let total = cumulative.last().copied().unwrap_or(0);

        if total == 0 {
            return self.symbols.iter().find(|s| eligible(*s)).map(|s| s.id);
        }

        let roll = rng.random_range(0..total);
        let index = cumulative.partition_point(|&w| w <= roll);
        self.symbols.get(index).map(|s| s.id)
    }

    /// Symbols in the requested order
    pub fn sorted(&self, sort: SymbolSort) -> Vec<&Symbol> {
        let mut list: Vec<&Symbol> = self.symbols.iter().collect();
        match sort {
            SymbolSort::Declared => {}
            SymbolSort::ByName => list.sort_by(|a, b| a.name.cmp(&b.name)),
            SymbolSort::ByPay => list.sort_by(|a, b| b.max_pay().cmp(&a.max_pay())),
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample_set() -> SymbolSet {
        SymbolSet::new(vec![
            Symbol::parse(0, "A", "0,0,50,200,1000").unwrap(),
            Symbol::parse(0, "B", "0,0,10,20,50,").unwrap(),
            Symbol::wild(0, "WILD", vec![]),
            Symbol::scatter(0, "SCATTER", vec![0, 0, 5]),
        ])
        .unwrap()
    }

    #[test]
    fn test_parse_pays() {
        assert_eq!(parse_pays("0,0,50,200,1000").unwrap(), vec![0, 0, 50, 200, 1000]);
        assert_eq!(parse_pays("1, 2,3,").unwrap(), vec![1, 2, 3]);
        assert!(parse_pays("").is_err());
        assert!(parse_pays("1,x,3").is_err());
        assert!(parse_pays("1,,3").is_err());
        assert!(parse_pays("-5").is_err());
    }

    #[test]
    fn test_min_chains_derived() {
        let a = Symbol::parse(0, "A", "0,0,50,200,1000").unwrap();
        assert_eq!(a.min_chains(), Some(3));
        assert!(!a.hits_with(2));
        assert!(a.hits_with(3));

        let never = Symbol::new(0, "N", vec![0, 0, 0]);
        assert_eq!(never.min_chains(), None);
        assert!(!never.hits_with(5));
    }

    #[test]
    fn test_pay_amount_clamps() {
        let a = Symbol::parse(0, "A", "0,0,50,200,1000").unwrap();
        assert_eq!(a.pay_amount(0), 0);
        assert_eq!(a.pay_amount(3), 50);
        assert_eq!(a.pay_amount(5), 1000);
        assert_eq!(a.pay_amount(9), 1000);
        assert_eq!(a.max_pay(), 1000);
    }

    #[test]
    fn test_can_match() {
        let set = sample_set();
        let a = set.by_name("A").unwrap();
        let b = set.by_name("B").unwrap();
        let wild = set.by_name("WILD").unwrap();
        let scatter = set.by_name("SCATTER").unwrap();

        assert!(a.can_match(a));
        assert!(!a.can_match(b));
        assert!(a.can_match(wild));
        assert!(wild.can_match(b));
        assert!(!scatter.can_match(scatter));
        assert!(!wild.can_match(scatter));
    }

    #[test]
    fn test_set_assigns_ids_and_lookups() {
        let set = sample_set();
        assert_eq!(set.len(), 4);
        assert_eq!(set.by_name("B").unwrap().id, 1);
        assert!(set.by_name("MISSING").is_none());
        assert!(matches!(set.id_of("MISSING"), Err(SlotError::UnknownSymbol(_))));
        assert_eq!(set.scatters().count(), 1);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = SymbolSet::new(vec![Symbol::new(0, "A", vec![1]), Symbol::new(0, "A", vec![2])]);
        assert!(matches!(result, Err(SlotError::DuplicateSymbol(name)) if name == "A"));
    }

    #[test]
    fn test_cumulative_weights() {
        let set = SymbolSet::new(vec![
            Symbol::new(0, "A", vec![1]).with_frequency(10),
            Symbol::new(0, "B", vec![1]).with_frequency(30),
            Symbol::new(0, "C", vec![1]).with_frequency(60),
        ])
        .unwrap();
        assert_eq!(set.cumulative_weights(), vec![10, 40, 100]);
        assert_eq!(set.probabilities(), vec![0.1, 0.3, 0.6]);
    }

    #[test]
    fn test_random_symbol_lands_inside_cumulative_bands() {
        let set = SymbolSet::new(vec![
            Symbol::new(0, "A", vec![1]).with_frequency(1),
            Symbol::new(0, "NEVER", vec![1]).with_frequency(0),
            Symbol::new(0, "C", vec![1]).with_frequency(3),
        ])
        .unwrap();
        assert_eq!(set.cumulative_weights(), vec![1, 1, 4]);

        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut counts = [0u32; 3];
        for _ in 0..4_000 {
            let id = set.random_symbol(&mut rng, false).unwrap();
            counts[id as usize] += 1;
        }
        assert_eq!(counts[1], 0);
        let share = counts[2] as f64 / 4_000.0;
        assert!((share - 0.75).abs() < 0.03, "C share {}", share);
    }

    #[test]
    fn test_random_symbol_excludes_mrs() {
        let set = SymbolSet::new(vec![
            Symbol::new(0, "TALL", vec![1]).with_row_size(2).with_frequency(1000),
            Symbol::new(0, "A", vec![1]).with_frequency(1),
        ])
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            assert_eq!(set.random_symbol(&mut rng, true), Some(1));
        }
    }

    #[test]
    fn test_sorted() {
        let set = sample_set();
        let by_pay: Vec<&str> = set.sorted(SymbolSort::ByPay).iter().map(|s| s.name.as_str()).collect();
        assert_eq!(by_pay[0], "A");
        let by_name: Vec<&str> = set.sorted(SymbolSort::ByName).iter().map(|s| s.name.as_str()).collect();
        assert_eq!(by_name, vec!["A", "B", "SCATTER", "WILD"]);
    }
}
