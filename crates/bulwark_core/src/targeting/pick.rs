//! Randomized weighted pick among near-best candidates.

use rand::Rng;

use crate::math::{inverse_lerp, Fixed};

/// Pick weights for `scored`, in input order.
///
/// When the best score is below one, only the first best candidate gets
/// weight one. Otherwise candidates ramp linearly from zero at
/// `best - window` to one at `best`; lower scores get zero.
#[must_use]
pub fn pick_weights<T>(scored: &[(T, Fixed)], window: Fixed) -> Vec<Fixed> {
    let Some(best) = best_index(scored) else {
        return Vec::new();
    };
    let max = scored[best].1;

    if max < Fixed::ONE {
        return (0..scored.len())
            .map(|i| if i == best { Fixed::ONE } else { Fixed::ZERO })
            .collect();
    }

    let floor = max - window;
    scored
        .iter()
        .map(|&(_, score)| {
            if score < floor {
                Fixed::ZERO
            } else {
                inverse_lerp(floor, max, score)
            }
        })
        .collect()
}

/// Weighted random pick from `scored` using `rng`.
///
/// Zero-weight candidates are never chosen. Returns `None` only for an
/// empty input.
pub fn weighted_pick<T: Copy, R: Rng + ?Sized>(
    scored: &[(T, Fixed)],
    window: Fixed,
    rng: &mut R,
) -> Option<T> {
    let best = best_index(scored)?;
    let weights = pick_weights(scored, window);
    let total: Fixed = weights.iter().copied().sum();
    if total <= Fixed::ZERO {
        return Some(scored[best].0);
    }

    let draw = Fixed::from_bits(rng.gen_range(0..total.to_bits()));
    let mut cumulative = Fixed::ZERO;
    for (&(item, _), &weight) in scored.iter().zip(&weights) {
        if weight <= Fixed::ZERO {
            continue;
        }
        cumulative += weight;
        if draw < cumulative {
            return Some(item);
        }
    }
    Some(scored[best].0)
}

/// Index of the first highest score.
fn best_index<T>(scored: &[(T, Fixed)]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, (_, score)) in scored.iter().enumerate() {
        if best.map_or(true, |b| *score > scored[b].1) {
            best = Some(i);
        }
    }
    best
}
