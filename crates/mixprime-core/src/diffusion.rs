//! Avalanche measurement of a candidate constant.
//!
//! The transform is a reduced RC6-style mixing step: rotate left 5, multiply
//! by the constant (wrapping), rotate left 3. Multiplication only carries a
//! flipped bit toward more significant positions, so the mean avalanche of
//! any constant sits well below the ideal 0.5 (typically 0.25–0.32).

use rand::Rng;

/// The fixed two-stage mixing transform.
#[inline]
pub fn mix_transform(input: u32, constant: u32) -> u32 {
    input
        .rotate_left(5)
        .wrapping_mul(constant)
        .rotate_left(3)
}

/// Output of one avalanche measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvalancheReport {
    /// Mean fraction of output bits flipped per single input-bit flip.
    pub score: f64,
    /// Total output bits that changed.
    pub changes: u64,
    /// Total output bits observed (`trials · 32 · 32`).
    pub total: u64,
}

/// Flip each input bit of `trials` random inputs and count output changes.
pub fn avalanche<R: Rng + ?Sized>(constant: u32, trials: usize, rng: &mut R) -> AvalancheReport {
    let mut changes = 0u64;
    for _ in 0..trials {
        let input: u32 = rng.random();
        let base = mix_transform(input, constant);
        for bit in 0..32 {
            let flipped = mix_transform(input ^ (1 << bit), constant);
            changes += u64::from((base ^ flipped).count_ones());
        }
    }
    let total = trials as u64 * 32 * 32;
    let score = if total == 0 {
        0.0
    } else {
        changes as f64 / total as f64
    };
    AvalancheReport {
        score,
        changes,
        total,
    }
}

/// Combined avalanche of a P/Q pair: flips the low bit of sequential inputs
/// through `(x·P) ⊕ (x·Q)` and returns the mean fraction of changed bits.
pub fn combined_avalanche(p: u32, q: u32, cases: usize) -> f64 {
    if cases == 0 {
        return 0.0;
    }
    let mix = |x: u32| x.wrapping_mul(p) ^ x.wrapping_mul(q);
    let changes: u64 = (0..cases)
        .map(|i| {
            let input = i as u32;
            u64::from((mix(input) ^ mix(input ^ 1)).count_ones())
        })
        .sum();
    changes as f64 / (cases as f64 * 32.0)
}

/// Pearson correlation between the bit vectors of two values.
///
/// Returns 1.0 when either value has constant bits (zero variance).
pub fn bit_correlation(p: u32, q: u32) -> f64 {
    let n = 32.0;
    let mut sum_pq = 0.0;
    let mut sum_p = 0.0;
    let mut sum_q = 0.0;
    for i in 0..32 {
        let pb = f64::from((p >> i) & 1);
        let qb = f64::from((q >> i) & 1);
        sum_pq += pb * qb;
        sum_p += pb;
        sum_q += qb;
    }
    // Bits are 0/1, so Σx² = Σx.
    let var_p = sum_p - sum_p * sum_p / n;
    let var_q = sum_q - sum_q * sum_q / n;
    let denom = (var_p * var_q).sqrt();
    if denom == 0.0 {
        return 1.0;
    }
    (sum_pq - sum_p * sum_q / n) / denom
}
