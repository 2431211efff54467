//! Weighted sampling without replacement.

use rand::Rng;

use super::eligibility::Candidate;

/// Running totals of `weights`; entry `i` is the sum of weights `0..=i`.
pub fn cumulative_weights(weights: impl IntoIterator<Item = f64>) -> Vec<f64> {
    weights
        .into_iter()
        .scan(0.0, |total, weight| {
            *total += weight;
            Some(*total)
        })
        .collect()
}

/// Index of the interval `[c(i-1), c(i))` containing `draw`.
///
/// Draws at or past the last bound (floating point slop) land on the last
/// item.
pub fn pick_index(cumulative: &[f64], draw: f64) -> usize {
    let index = cumulative.partition_point(|&bound| bound <= draw);
    index.min(cumulative.len().saturating_sub(1))
}

/// Cumulative weights of `pool`, scaled down by the largest weight when the
/// plain sum overflows.
fn draw_bounds(pool: &[Candidate]) -> Vec<f64> {
    let cumulative = cumulative_weights(pool.iter().map(|candidate| candidate.weight));
    if cumulative.last().map_or(true, |total| total.is_finite()) {
        return cumulative;
    }
    let largest = pool
        .iter()
        .map(|candidate| candidate.weight)
        .fold(0.0, f64::max);
    cumulative_weights(pool.iter().map(|candidate| candidate.weight / largest))
}

/// Draws candidates in proportion to their weights.
#[derive(Debug)]
pub struct WeightedSelector<R> {
    rng: R,
}

impl<R: Rng> WeightedSelector<R> {
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }

    /// Select up to `count` candidates without replacement, in draw order.
    ///
    /// A pool smaller than `count` is returned whole.
    pub fn select(&mut self, mut pool: Vec<Candidate>, count: usize) -> Vec<Candidate> {
        let mut chosen = Vec::with_capacity(count.min(pool.len()));
        while chosen.len() < count && !pool.is_empty() {
            let cumulative = draw_bounds(&pool);
            let total = cumulative.last().copied().unwrap_or_default();
            let index = if total.is_finite() && total > 0.0 {
                pick_index(&cumulative, self.rng.gen_range(0.0..total))
            } else {
                0
            };
            chosen.push(pool.remove(index));
        }
        tracing::debug!(requested = count, selected = chosen.len(), "Selected menu items");
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{List, ListItem, NewList, NewListItem};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};

    fn pool(weights: &[f64]) -> Vec<Candidate> {
        let list = List::new(NewList::named("Pool")).unwrap();
        weights
            .iter()
            .enumerate()
            .map(|(index, &weight)| {
                let item = ListItem::new(
                    list.id,
                    NewListItem::named(format!("item-{index}")).with_weight(weight),
                )
                .unwrap();
                Candidate::resolve(item, &list)
            })
            .collect()
    }

    #[test]
    fn test_cumulative_weights() {
        assert_eq!(cumulative_weights([1.0, 2.0, 7.0]), vec![1.0, 3.0, 10.0]);
        assert!(cumulative_weights(Vec::<f64>::new()).is_empty());
    }

    #[test]
    fn test_pick_index_uses_half_open_intervals() {
        let cumulative = [1.0, 3.0, 10.0];
        assert_eq!(pick_index(&cumulative, 0.0), 0);
        assert_eq!(pick_index(&cumulative, 0.999), 0);
        assert_eq!(pick_index(&cumulative, 1.0), 1);
        assert_eq!(pick_index(&cumulative, 2.999), 1);
        assert_eq!(pick_index(&cumulative, 3.0), 2);
        assert_eq!(pick_index(&cumulative, 9.999), 2);
        assert_eq!(pick_index(&cumulative, 10.0), 2);
    }

    #[test]
    fn test_select_is_without_replacement() {
        let mut selector = WeightedSelector::new(StdRng::seed_from_u64(7));
        let chosen = selector.select(pool(&[1.0, 1.0, 1.0, 1.0]), 3);
        let ids: HashSet<_> = chosen.iter().map(|c| c.item.id).collect();
        assert_eq!(chosen.len(), 3);
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_small_pool_is_returned_whole() {
        let mut selector = WeightedSelector::new(StdRng::seed_from_u64(1));
        assert_eq!(selector.select(pool(&[1.0, 5.0]), 10).len(), 2);
        assert!(selector.select(Vec::new(), 3).is_empty());
    }

    #[test]
    fn test_seeded_selection_is_reproducible() {
        let candidates = pool(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let draw = |seed| {
            WeightedSelector::new(StdRng::seed_from_u64(seed))
                .select(candidates.clone(), 3)
                .into_iter()
                .map(|c| c.item.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));
    }

    #[test]
    fn test_frequencies_follow_weights() {
        let candidates = pool(&[1.0, 2.0, 7.0]);
        let mut selector = WeightedSelector::new(StdRng::seed_from_u64(2024));
        let draws = 30_000;
        let mut counts: HashMap<_, usize> = HashMap::new();

        for _ in 0..draws {
            let chosen = selector.select(candidates.clone(), 1);
            *counts.entry(chosen[0].item.id).or_default() += 1;
        }

        for candidate in &candidates {
            let observed = counts.get(&candidate.item.id).copied().unwrap_or(0) as f64 / draws as f64;
            let expected = candidate.weight / 10.0;
            assert!(
                (observed - expected).abs() < 0.02,
                "{} drawn {observed:.3}, expected {expected:.3}",
                candidate.item.name
            );
        }
    }

    #[test]
    fn test_huge_weights_do_not_overflow_the_draw() {
        let candidates = pool(&[1e308, 1e308, 1.0]);
        let mut selector = WeightedSelector::new(StdRng::seed_from_u64(5));
        let chosen = selector.select(candidates.clone(), 2);
        assert_eq!(chosen.len(), 2);

        let ids: HashSet<_> = chosen.iter().map(|c| c.item.id).collect();
        assert!(ids.contains(&candidates[0].item.id));
        assert!(ids.contains(&candidates[1].item.id));
    }
}
