//! Random draws used by the zone and facility selectors.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::model::ActivityId;

/// Draws one item with probability proportional to `weight`.
///
/// Returns `None` when the usable weights sum to zero, so callers can move on
/// to the next weighting. Negative and non-finite weights count as zero.
pub fn choose_weighted<'a, T, R, F>(rng: &mut R, items: &'a [T], weight: F) -> Option<&'a T>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> f64,
{
    let weights: Vec<f64> = items
        .iter()
        .map(|item| {
            let w = weight(item);
            if w.is_finite() && w > 0.0 { w } else { 0.0 }
        })
        .collect();

    if weights.iter().sum::<f64>() <= 0.0 {
        return None;
    }

    let dist = WeightedIndex::new(&weights).ok()?;
    items.get(dist.sample(rng))
}

pub fn choose_uniform<'a, T, R>(rng: &mut R, items: &'a [T]) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    items.choose(rng)
}

/// Independent generator for one activity, so parallel row-wise draws do not
/// depend on thread scheduling.
pub fn activity_rng(seed: u64, id: ActivityId) -> StdRng {
    // splitmix64 finalizer to spread consecutive ids
    let mut z = seed ^ id.0.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    StdRng::seed_from_u64(z ^ (z >> 31))
}
