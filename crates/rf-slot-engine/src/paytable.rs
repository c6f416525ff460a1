//! Pay table listing

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::symbols::{MatchType, PayType, SymbolId, SymbolSet, SymbolSort};

/// Pay for one chain length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainPay {
    pub chains: usize,
    pub pay: u64,
}

/// One symbol of the listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayTableEntry {
    pub symbol: SymbolId,
    pub name: String,
    pub match_type: MatchType,
    pub pay_type: PayType,
    /// Nonzero pays, normal pay type only
    pub pays: Vec<ChainPay>,
    /// Shown instead of pays
    pub label: Option<String>,
}

/// Pay table of a symbol set for a reel count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayTable {
    pub reel_count: usize,
    pub entries: Vec<PayTableEntry>,
}

impl PayTable {
    pub fn new(symbols: &SymbolSet, reel_count: usize, sort: SymbolSort) -> Self {
        let entries = symbols
            .sorted(sort)
            .into_iter()
            .map(|s| {
                let pays: Vec<ChainPay> = match s.pay_type {
                    PayType::Normal => (1..=reel_count.min(s.pays().len()))
                        .map(|chains| ChainPay {
                            chains,
                            pay: s.pay_amount(chains),
                        })
                        .filter(|p| p.pay > 0)
                        .collect(),
                    _ => Vec::new(),
                };
                let label = match s.pay_type {
                    PayType::Normal if pays.is_empty() && s.is_wild() => Some("substitutes".to_string()),
                    PayType::Normal => None,
                    PayType::FreeSpin => Some(award_label("free spins", s.min_chains(), s.max_pay())),
                    PayType::Bonus => Some(award_label("bonus", s.min_chains(), s.max_pay())),
                    PayType::Custom => Some("custom".to_string()),
                };

                PayTableEntry {
                    symbol: s.id,
                    name: s.name.clone(),
                    match_type: s.match_type,
                    pay_type: s.pay_type,
                    pays,
                    label,
                }
            })
            .collect();

        Self { reel_count, entries }
    }

    pub fn get(&self, name: &str) -> Option<&PayTableEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Highest listed pay
    pub fn top_pay(&self) -> u64 {
        self.entries
            .iter()
            .flat_map(|e| e.pays.iter().map(|p| p.pay))
            .max()
            .unwrap_or(0)
    }
}

fn award_label(kind: &str, min_chains: Option<u8>, max: u64) -> String {
    match min_chains {
        Some(min) => format!("{} ({}+ for up to {})", kind, min, max),
        None => kind.to_string(),
    }
}

impl fmt::Display for PayTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            match &entry.label {
                Some(label) => writeln!(f, "{:<12} {}", entry.name, label)?,
                None if entry.pays.is_empty() => writeln!(f, "{:<12} -", entry.name)?,
                None => {
                    let pays: Vec<String> = entry
                        .pays
                        .iter()
                        .map(|p| format!("{}x {}", p.chains, p.pay))
                        .collect();
                    writeln!(f, "{:<12} {}", entry.name, pays.join("  "))?;
                }
            }
        }
        Ok(())
    }
}
