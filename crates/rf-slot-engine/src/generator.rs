//! Strip generator — minimum counts plus weighted fill

use rand::Rng;

use crate::reel::validate_multi_row;
use crate::symbols::{Symbol, SymbolId, SymbolSet};

/// Generate one strip.
///
/// Every symbol's `min_count_per_reel` copies come first, in declaration
/// order and truncated at `strip_len`; the rest is drawn by cumulative
/// weight. Multi-row runs are validated next, and any minimum the
/// validation broke is restored from spare single-row slots.
pub fn generate_strip<R: Rng + ?Sized>(symbols: &SymbolSet, strip_len: usize, rng: &mut R) -> Vec<SymbolId> {
    let mut strip: Vec<SymbolId> = symbols
        .iter()
        .flat_map(|s| std::iter::repeat_n(s.id, s.min_count_per_reel as usize))
        .take(strip_len)
        .collect();

    while strip.len() < strip_len {
        match symbols.random_symbol(rng, false) {
            Some(id) => strip.push(id),
            None => break,
        }
    }

    validate_multi_row(&mut strip, symbols, rng);
    restore_minimums(&mut strip, symbols, rng);
    strip
}

/// Top up symbols below their minimum.
///
/// Only single-row slots whose symbol has copies above its own minimum are
/// overwritten. Multi-row symbols are placed first as whole runs that keep
/// the run layout rules of [`validate_multi_row`].
fn restore_minimums<R: Rng + ?Sized>(strip: &mut [SymbolId], symbols: &SymbolSet, rng: &mut R) {
    let mut counts = vec![0usize; symbols.len()];
    for &id in strip.iter() {
        if let Some(count) = counts.get_mut(id as usize) {
            *count += 1;
        }
    }

    let mut needy: Vec<&Symbol> = symbols.iter().filter(|s| s.min_count_per_reel > 0).collect();
    needy.sort_by_key(|s| std::cmp::Reverse(s.row_size));

    for symbol in needy {
        let min = symbol.min_count_per_reel as usize;
        let span = (symbol.row_size as usize).max(1);
        while counts[symbol.id as usize] < min {
            let view: &[SymbolId] = strip;
            let candidates: Vec<usize> = (0..view.len())
                .filter(|&start| run_fits(view, symbols, &counts, start, span))
                .collect();
            if candidates.is_empty() {
                log::warn!(
                    "Strip of {} cannot hold {} copies of {}",
                    strip.len(),
                    min,
                    symbol.name
                );
                break;
            }

            let start = candidates[rng.random_range(0..candidates.len())];
            for slot in &mut strip[start..start + span] {
                counts[*slot as usize] -= 1;
                *slot = symbol.id;
            }
            counts[symbol.id as usize] += span;
        }
    }
}

/// Whether a run of `span` can replace the slots at `start` without
/// dropping another symbol below its minimum
fn run_fits(strip: &[SymbolId], symbols: &SymbolSet, counts: &[usize], start: usize, span: usize) -> bool {
    let single_row = |i: usize| symbols.get(strip[i]).is_some_and(|s| !s.is_mrs());
    if span > 1 && (start == 0 || start + span >= strip.len() || !single_row(start - 1) || !single_row(start + span)) {
        return false;
    }
    if start + span > strip.len() {
        return false;
    }

    let mut taken = vec![0usize; counts.len()];
    for i in start..start + span {
        if !single_row(i) {
            return false;
        }
        let id = strip[i] as usize;
        taken[id] += 1;
        let min = symbols.get(strip[i]).map_or(0, |s| s.min_count_per_reel as usize);
        if counts[id] < min + taken[id] {
            return false;
        }
    }
    true
}

/// Generate a strip for every reel
pub fn generate_strips<R: Rng + ?Sized>(
    symbols: &SymbolSet,
    reel_count: usize,
    strip_len: usize,
    rng: &mut R,
) -> Vec<Vec<SymbolId>> {
    let strips: Vec<Vec<SymbolId>> = (0..reel_count)
        .map(|_| generate_strip(symbols, strip_len, rng))
        .collect();
    log::info!("Generated {} strips of {} symbols", reel_count, strip_len);
    strips
}

/// Copies of `symbol` on a strip
pub fn count_on_strip(strip: &[SymbolId], symbol: SymbolId) -> usize {
    strip.iter().filter(|&&id| id == symbol).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Symbol;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn symbols() -> SymbolSet {
        SymbolSet::new(vec![
            Symbol::new(0, "A", vec![0, 0, 50]).with_frequency(10).with_min_count(2),
            Symbol::new(0, "B", vec![0, 0, 10]).with_frequency(80),
            Symbol::scatter(0, "S", vec![0, 0, 5]).with_frequency(10).with_min_count(1),
        ])
        .unwrap()
    }

    #[test]
    fn test_minimum_counts_lead_each_strip() {
        let set = symbols();
        let strips = generate_strips(&set, 5, 20, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(strips.len(), 5);
        for strip in &strips {
            assert_eq!(strip.len(), 20);
            assert_eq!(&strip[..3], &[0, 0, 2]);
            assert!(count_on_strip(strip, 0) >= 2);
            assert!(count_on_strip(strip, 2) >= 1);
        }
    }

    #[test]
    fn test_same_seed_same_strips() {
        let set = symbols();
        let a = generate_strips(&set, 3, 30, &mut ChaCha8Rng::seed_from_u64(99));
        let b = generate_strips(&set, 3, 30, &mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_minimums_truncate_at_strip_length() {
        let set = SymbolSet::new(vec![
            Symbol::new(0, "A", vec![0, 0, 5]).with_min_count(4),
            Symbol::new(0, "B", vec![0, 0, 5]).with_min_count(4),
        ])
        .unwrap();
        let strip = generate_strip(&set, 6, &mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(strip, vec![0, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_multi_row_runs_keep_other_minimums() {
        let set = SymbolSet::new(vec![
            Symbol::new(0, "TALL", vec![0, 0, 20]).with_row_size(3).with_min_count(2),
            Symbol::new(0, "A", vec![0, 0, 10]).with_min_count(2),
            Symbol::new(0, "B", vec![0, 0, 5]).with_frequency(98),
        ])
        .unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..50 {
            let strip = generate_strip(&set, 20, &mut rng);
            assert_eq!(strip.len(), 20);
            assert!(count_on_strip(&strip, 0) >= 2, "{:?}", strip);
            assert!(count_on_strip(&strip, 1) >= 2, "{:?}", strip);

            // TALL only appears as whole runs away from the strip ends
            assert_ne!(strip[0], 0);
            let mut i = 0;
            while i < strip.len() {
                if strip[i] == 0 {
                    assert!(i + 3 < strip.len(), "{:?}", strip);
                    assert!(strip[i..i + 3].iter().all(|&id| id == 0), "{:?}", strip);
                    i += 3;
                    assert_ne!(strip[i], 0, "{:?}", strip);
                } else {
                    i += 1;
                }
            }
        }
    }

    #[test]
    fn test_weighted_fill_follows_frequency() {
        let set = symbols();
        let strip = generate_strip(&set, 10_000, &mut ChaCha8Rng::seed_from_u64(5));
        let b = count_on_strip(&strip, 1) as f64 / strip.len() as f64;
        assert!((b - 0.8).abs() < 0.03, "B share {}", b);
    }
}
