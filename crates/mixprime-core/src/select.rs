//! Pair selection over the accepted pool.

use crate::candidate::{Candidate, hamming_distance};
use crate::config::{ScoreWeights, SelectionFallback};
use crate::error::{GenerationError, Result};

/// Minimum Hamming distance between P and Q.
pub const MIN_PAIR_DISTANCE: u32 = 12;

/// Weighted composite used to rank candidates.
pub fn composite_score(c: &Candidate, w: &ScoreWeights) -> f64 {
    let bit_dist_score = 1.0 - (0.5 - c.bit_distribution).abs();
    (w.bit_distribution * bit_dist_score
        + w.avalanche * c.avalanche_score
        + w.entropy * (c.entropy_score / 2.0))
        / w.total()
}

/// True when `b` is a rotation of `a` or `a` shifted by 1..31 positions.
pub fn rotation_or_shift_related(a: u32, b: u32) -> bool {
    (1..32).any(|k| {
        a == b.rotate_left(k) || a == b.rotate_right(k) || a == b << k || a == b >> k
    })
}

/// P and Q must differ in at least [`MIN_PAIR_DISTANCE`] bits and must not be
/// rotations or shifts of each other.
pub fn sufficiently_different(a: u32, b: u32) -> bool {
    hamming_distance(a, b) >= MIN_PAIR_DISTANCE && !rotation_or_shift_related(a, b)
}

/// The chosen pair.
#[derive(Debug, Clone)]
pub struct Selection {
    pub p: Candidate,
    pub q: Candidate,
    pub p_score: f64,
    pub q_score: f64,
    /// Q was taken by the second-best fallback and may violate the
    /// difference constraint.
    pub fallback_used: bool,
}

/// Rank `pool` by composite score and pick P and Q.
///
/// P is the top scorer. Q is the best-ranked remaining candidate that is
/// sufficiently different from P. Equal scores keep pool order; a NaN score
/// ranks below every number.
pub fn select_pair(
    pool: &[Candidate],
    weights: &ScoreWeights,
    fallback: SelectionFallback,
) -> Result<Selection> {
    if pool.len() < 2 {
        return Err(GenerationError::InsufficientCandidates {
            accepted: pool.len(),
            attempts: 0,
            failed_attempts: 0,
        });
    }

    let mut ranked: Vec<(f64, &Candidate)> =
        pool.iter().map(|c| (composite_score(c, weights), c)).collect();
    let rank = |score: f64| if score.is_nan() { f64::NEG_INFINITY } else { score };
    ranked.sort_by(|a, b| rank(b.0).total_cmp(&rank(a.0)));

    let (p_score, p) = ranked[0];
    let partner = ranked[1..]
        .iter()
        .find(|(_, c)| sufficiently_different(p.value, c.value));

    let (q_score, q, fallback_used) = match (partner, fallback) {
        (Some(&(score, c)), _) => (score, c, false),
        (None, SelectionFallback::SecondBest) => (ranked[1].0, ranked[1].1, true),
        (None, SelectionFallback::Strict) => {
            return Err(GenerationError::SelectionFailure {
                pool: pool.len(),
                best: p.value,
                min_distance: MIN_PAIR_DISTANCE,
            });
        }
    };

    Ok(Selection {
        p: p.clone(),
        q: q.clone(),
        p_score,
        q_score,
        fallback_used,
    })
}
