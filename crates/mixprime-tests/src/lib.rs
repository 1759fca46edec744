//! Randomness battery for a single 32-bit constant.
//!
//! Five independent tests score the bit sequence of a candidate value. Bits
//! are read least-significant first. Each test returns a [`StatTest`] with a
//! normalized score in `[0, 1]`, a pass/fail verdict and a diagnostic string.
//! A 32-bit sample is far too short for real NIST p-values, so scores are
//! deviation measures rather than significance levels.

use std::sync::Mutex;

use statrs::function::erf::erfc;

// ═══════════════════════════════════════════════════════════════════════════════
// Thresholds
// ═══════════════════════════════════════════════════════════════════════════════

/// Bit-frequency: maximum allowed |proportion of ones − 0.5|.
pub const MAX_BIT_FREQUENCY_DEVIATION: f64 = 0.15;
/// Runs: symmetric Z-score band.
pub const MIN_RUNS_Z_SCORE: f64 = -3.0;
pub const MAX_RUNS_Z_SCORE: f64 = 3.0;
/// Serial: symmetric band for the approximate p-value.
pub const MIN_P_VALUE: f64 = 0.01;
pub const MAX_P_VALUE: f64 = 0.99;
/// Autocorrelation: maximum normalized deviation over shifts 1..15.
pub const MAX_AUTOCORRELATION: f64 = 0.5;
/// Linear complexity: minimum LFSR length, and the ideal midpoint for 32 bits.
pub const MIN_LINEAR_COMPLEXITY: usize = 12;
pub const IDEAL_LINEAR_COMPLEXITY: f64 = 16.0;

const BITS: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// Core types
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a single randomness test.
#[derive(Debug, Clone, PartialEq)]
pub struct StatTest {
    pub name: String,
    /// Normalized score, 1.0 is ideal.
    pub score: f64,
    pub passed: bool,
    /// Approximate p-value, where the test produces one.
    pub p_value: Option<f64>,
    pub details: String,
}

/// Unpack a value into its 32 bits, least significant first.
fn to_bits(value: u32) -> [u8; BITS] {
    let mut bits = [0u8; BITS];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = ((value >> i) & 1) as u8;
    }
    bits
}

// ═══════════════════════════════════════════════════════════════════════════════
// 1. FREQUENCY
// ═══════════════════════════════════════════════════════════════════════════════

/// Monobit frequency: proportion of set bits should be ~50%.
pub fn bit_frequency(value: u32) -> StatTest {
    let ones = value.count_ones();
    let proportion = ones as f64 / BITS as f64;
    let deviation = (proportion - 0.5).abs();
    StatTest {
        name: "Bit Frequency Test".to_string(),
        score: (1.0 - 2.0 * deviation).clamp(0.0, 1.0),
        passed: deviation <= MAX_BIT_FREQUENCY_DEVIATION,
        p_value: None,
        details: format!("Proportion of ones: {proportion:.4} (deviation: {deviation:.4})"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 2. RUNS
// ═══════════════════════════════════════════════════════════════════════════════

/// Count maximal runs of identical consecutive bits.
fn count_runs(bits: &[u8]) -> usize {
    if bits.is_empty() {
        return 0;
    }
    1 + bits.windows(2).filter(|w| w[0] != w[1]).count()
}

/// Runs test: observed run count against the Wald–Wolfowitz expectation.
pub fn runs(value: u32) -> StatTest {
    let name = "Runs Test".to_string();
    let bits = to_bits(value);
    let runs = count_runs(&bits);
    let n = BITS as f64;
    let n1 = value.count_ones() as f64;
    let n0 = n - n1;
    let expected = 1.0 + 2.0 * n0 * n1 / n;
    let variance = (expected - 1.0) * (expected - 2.0) / (n - 1.0);

    // All-zero or all-one input: a single run, no variance to measure against.
    if variance <= 1e-12 {
        return StatTest {
            name,
            score: 0.0,
            passed: false,
            p_value: Some(0.0),
            details: format!("Zero variance (runs: {runs}, ones: {n1})"),
        };
    }

    let z = (runs as f64 - expected) / variance.sqrt();
    let p = erfc(z.abs() / 2.0_f64.sqrt());
    StatTest {
        name,
        score: (1.0 - (z / 6.0).abs()).clamp(0.0, 1.0),
        passed: (MIN_RUNS_Z_SCORE..=MAX_RUNS_Z_SCORE).contains(&z),
        p_value: Some(p),
        details: format!("Z-score: {z:.4} (runs: {runs}, expected: {expected:.2})"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 3. SERIAL
// ═══════════════════════════════════════════════════════════════════════════════

/// Serial test over the 31 overlapping 2-bit windows.
///
/// The chi-square statistic against a uniform spread of the four patterns is
/// mapped to `1 − e^(−χ²/2)`; the test fails at either extreme of that value.
pub fn serial(value: u32) -> StatTest {
    let windows = BITS - 1;
    let mut counts = [0u32; 4];
    for i in 0..windows {
        counts[((value >> i) & 0b11) as usize] += 1;
    }
    let expected = windows as f64 / 4.0;
    let chi2: f64 = counts
        .iter()
        .map(|&c| {
            let diff = c as f64 - expected;
            diff * diff / expected
        })
        .sum();
    let p = 1.0 - (-chi2 / 2.0).exp();
    StatTest {
        name: "Serial Test".to_string(),
        score: (1.0 - 2.0 * (p - 0.5).abs()).clamp(0.0, 1.0),
        passed: (MIN_P_VALUE..=MAX_P_VALUE).contains(&p),
        p_value: Some(p),
        details: format!("Chi-square: {chi2:.4} (p-value: {p:.4}, patterns: {counts:?})"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 4. AUTOCORRELATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Agreement between the bit sequence and itself shifted by `shift`,
/// as a deviation from one half scaled to `[0, 1]`.
pub fn autocorrelation_at(value: u32, shift: usize) -> f64 {
    if shift == 0 || shift >= BITS {
        return 0.0;
    }
    let total = BITS - shift;
    let matches = (0..total)
        .filter(|&i| ((value >> i) & 1) == ((value >> (i + shift)) & 1))
        .count();
    ((matches as f64 / total as f64) - 0.5).abs() * 2.0
}

/// Autocorrelation test: worst deviation over shifts 1..15.
pub fn autocorrelation(value: u32) -> StatTest {
    let (worst_shift, max_corr) = (1..16)
        .map(|shift| (shift, autocorrelation_at(value, shift)))
        .fold((0, 0.0_f64), |best, cur| if cur.1 > best.1 { cur } else { best });
    StatTest {
        name: "Autocorrelation Test".to_string(),
        score: (1.0 - max_corr).clamp(0.0, 1.0),
        passed: max_corr <= MAX_AUTOCORRELATION,
        p_value: None,
        details: format!("Maximum correlation: {max_corr:.4} (shift {worst_shift})"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 5. LINEAR COMPLEXITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Berlekamp-Massey algorithm for binary sequences. Returns the LFSR complexity.
pub fn berlekamp_massey(seq: &[u8]) -> usize {
    let n = seq.len();
    if n == 0 {
        return 0;
    }
    let mut c = vec![0u8; n];
    let mut b = vec![0u8; n];
    c[0] = 1;
    b[0] = 1;
    let mut l: usize = 0;
    let mut m: isize = -1;

    for ni in 0..n {
        let mut d: u8 = seq[ni];
        for i in 1..=l {
            d ^= c[i] & seq[ni - i];
        }
        if d == 1 {
            let t = c.clone();
            let shift = (ni as isize - m) as usize;
            for i in shift..n {
                c[i] ^= b[i - shift];
            }
            if l <= ni / 2 {
                l = ni + 1 - l;
                m = ni as isize;
                b = t;
            }
        }
    }
    l
}

/// Linear complexity of the 32-bit sequence, scored by distance from 16.
pub fn linear_complexity(value: u32) -> StatTest {
    let complexity = berlekamp_massey(&to_bits(value));
    let deviation = (complexity as f64 - IDEAL_LINEAR_COMPLEXITY).abs();
    StatTest {
        name: "Linear Complexity Test".to_string(),
        score: (1.0 - deviation / IDEAL_LINEAR_COMPLEXITY).clamp(0.0, 1.0),
        passed: complexity >= MIN_LINEAR_COMPLEXITY,
        p_value: None,
        details: format!("Linear complexity: {complexity} bits"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Test battery
// ═══════════════════════════════════════════════════════════════════════════════

/// The five tests, in their canonical order.
pub const BATTERY: [fn(u32) -> StatTest; 5] = [
    bit_frequency,
    runs,
    serial,
    autocorrelation,
    linear_complexity,
];

/// Run the five-test battery concurrently on one value.
///
/// Each test runs on its own scoped thread; results are appended under a
/// mutex as they finish, so the returned order is unspecified.
pub fn run_all_tests(value: u32) -> Vec<StatTest> {
    let results: Mutex<Vec<StatTest>> = Mutex::new(Vec::with_capacity(BATTERY.len()));

    std::thread::scope(|s| {
        for test_fn in BATTERY {
            let results = &results;
            s.spawn(move || {
                let result = test_fn(value);
                results.lock().unwrap().push(result);
            });
        }
    });

    results.into_inner().unwrap()
}

/// Run the battery sequentially, in canonical order.
pub fn run_all_tests_serial(value: u32) -> Vec<StatTest> {
    BATTERY.iter().map(|test_fn| test_fn(value)).collect()
}

/// Fraction of tests that passed. Empty input yields 0.
pub fn pass_ratio(results: &[StatTest]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().filter(|r| r.passed).count() as f64 / results.len() as f64
}

/// True when at least `min_ratio` of the tests passed.
pub fn meets_quorum(results: &[StatTest], min_ratio: f64) -> bool {
    !results.is_empty() && pass_ratio(results) + 1e-9 >= min_ratio
}

/// Mean score across all tests.
pub fn aggregate_score(results: &[StatTest]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Prime with balanced bits that passes every test.
    const GOOD: u32 = 0x2749_959B;

    #[test]
    fn test_to_bits_lsb_first() {
        let bits = to_bits(0b1011);
        assert_eq!(&bits[..5], &[1, 1, 0, 1, 0]);
        assert!(bits[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_bit_frequency_alternating() {
        let r = bit_frequency(0xAAAA_AAAA);
        assert_eq!(r.score, 1.0);
        assert!(r.passed);
    }

    #[test]
    fn test_bit_frequency_zero() {
        let r = bit_frequency(0);
        assert_eq!(r.score, 0.0);
        assert!(!r.passed);
    }

    #[test]
    fn test_bit_frequency_edges_of_band() {
        // 12 and 20 ones sit exactly on the 0.125 deviation; 11 ones is 0.156.
        assert!(bit_frequency(0x0000_0FFF).passed);
        assert!(bit_frequency(0x000F_FFFF).passed);
        assert!(!bit_frequency(0x0000_07FF).passed);
    }

    #[test]
    fn test_runs_alternating_fails() {
        // 32 runs against ~17 expected.
        let r = runs(0xAAAA_AAAA);
        assert!(!r.passed);
        assert!(r.details.contains("runs: 32"));
    }

    #[test]
    fn test_runs_constant_input() {
        for v in [0, u32::MAX] {
            let r = runs(v);
            assert!(!r.passed);
            assert_eq!(r.score, 0.0);
            assert!(r.details.contains("Zero variance"));
        }
    }

    #[test]
    fn test_runs_balanced_value_passes() {
        let r = runs(GOOD);
        assert!(r.passed, "{}", r.details);
        assert!(r.p_value.unwrap() > 0.01);
    }

    #[test]
    fn test_serial_extremes() {
        // All windows are pattern 0b11: chi-square = 93.
        let r = serial(u32::MAX);
        assert!(!r.passed);
        assert!(r.details.contains("Chi-square: 93.0000"));
        assert!(serial(GOOD).passed);
    }

    #[test]
    fn test_autocorrelation_at() {
        // Alternating bits disagree with themselves at every odd shift.
        assert_eq!(autocorrelation_at(0xAAAA_AAAA, 1), 1.0);
        assert_eq!(autocorrelation_at(0xAAAA_AAAA, 2), 1.0);
        assert_eq!(autocorrelation_at(GOOD, 0), 0.0);
        assert_eq!(autocorrelation_at(GOOD, 32), 0.0);
    }

    #[test]
    fn test_autocorrelation_periodic_fails() {
        let r = autocorrelation(0xAAAA_AAAA);
        assert!(!r.passed);
        assert_eq!(r.score, 0.0);
        assert!(autocorrelation(GOOD).passed);
    }

    #[test]
    fn test_berlekamp_massey_known_sequences() {
        assert_eq!(berlekamp_massey(&[]), 0);
        assert_eq!(berlekamp_massey(&[0; 32]), 0);
        // A single 1 at the end needs a full-length register.
        let mut impulse = [0u8; 8];
        impulse[7] = 1;
        assert_eq!(berlekamp_massey(&impulse), 8);
        // Period-2 sequence 1,0,1,0,... is generated by s[n] = s[n-2].
        assert_eq!(berlekamp_massey(&to_bits(0x5555_5555)), 2);
    }

    #[test]
    fn test_linear_complexity_scores() {
        let r = linear_complexity(0xAAAA_AAAA);
        assert!(!r.passed);
        let r = linear_complexity(GOOD);
        assert!(r.passed);
        assert_eq!(r.score, 1.0);
        assert!(r.details.contains("16 bits"));
    }

    #[test]
    fn test_run_all_tests_matches_serial() {
        let mut concurrent = run_all_tests(GOOD);
        let mut serial = run_all_tests_serial(GOOD);
        assert_eq!(concurrent.len(), 5);
        concurrent.sort_by(|a, b| a.name.cmp(&b.name));
        serial.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(concurrent, serial);
    }

    #[test]
    fn test_good_value_passes_everything() {
        let results = run_all_tests(GOOD);
        assert_eq!(pass_ratio(&results), 1.0);
        assert!(meets_quorum(&results, 0.8));
    }

    #[test]
    fn test_quorum() {
        let results = run_all_tests_serial(0xAAAA_AAAA);
        // Only bit frequency passes.
        assert!((pass_ratio(&results) - 0.2).abs() < 1e-12);
        assert!(!meets_quorum(&results, 0.8));
        assert!(!meets_quorum(&[], 0.0));
    }

    #[test]
    fn test_aggregate_score() {
        assert_eq!(aggregate_score(&[]), 0.0);
        let results = run_all_tests_serial(GOOD);
        let score = aggregate_score(&results);
        assert!(score > 0.5 && score <= 1.0);
    }

    proptest! {
        #[test]
        fn bit_frequency_is_complement_symmetric(v in any::<u32>()) {
            prop_assert_eq!(bit_frequency(v).score, bit_frequency(!v).score);
            prop_assert_eq!(bit_frequency(v).passed, bit_frequency(!v).passed);
        }

        #[test]
        fn scores_stay_in_unit_interval(v in any::<u32>()) {
            for r in run_all_tests_serial(v) {
                prop_assert!((0.0..=1.0).contains(&r.score), "{} = {}", r.name, r.score);
            }
        }
    }
}
