//! Candidate constants and the measurements attached to them.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use mixprime_tests::StatTest;

use crate::config::Config;
use crate::diffusion::avalanche;
use crate::prime::{WITNESSES, is_prime};
use crate::timestamp::now_iso8601;

/// Hamming weight band a usable constant must fall in.
pub const MIN_HAMMING_WEIGHT: u32 = 12;
pub const MAX_HAMMING_WEIGHT: u32 = 20;

/// Low-complexity patterns; a value equal to one of these or its complement is weak.
pub const WEAK_PATTERNS: [(u32, &str); 6] = [
    (0xAAAA_AAAA, "alternating bits"),
    (0x5555_5555, "alternating bits"),
    (0x3333_3333, "alternating pairs"),
    (0xCCCC_CCCC, "alternating pairs"),
    (0x0F0F_0F0F, "alternating nibbles"),
    (0xF0F0_F0F0, "alternating nibbles"),
];

// ---------------------------------------------------------------------------
// Sub-results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimalityTest {
    pub passed: bool,
    pub method: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvalancheTest {
    pub score: f64,
    pub changes: u64,
    pub total: u64,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalTest {
    pub name: String,
    pub score: f64,
    pub passed: bool,
    pub p_value: Option<f64>,
    pub details: String,
}

impl From<StatTest> for StatisticalTest {
    fn from(t: StatTest) -> Self {
        Self {
            name: t.name,
            score: t.score,
            passed: t.passed,
            p_value: t.p_value,
            details: t.details,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeakKeyTest {
    pub passed: bool,
    pub pattern: String,
    pub details: String,
}

/// Every test outcome recorded for one candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResults {
    pub primality: Vec<PrimalityTest>,
    pub avalanche: Vec<AvalancheTest>,
    pub statistical: Vec<StatisticalTest>,
    pub weak_key: Vec<WeakKeyTest>,
}

impl TestResults {
    /// A single failing weak-key test rejects the candidate for good.
    pub fn weak_key_passed(&self) -> bool {
        self.weak_key.iter().all(|t| t.passed)
    }

    pub fn primality_passed(&self) -> bool {
        !self.primality.is_empty() && self.primality.iter().all(|t| t.passed)
    }
}

// ---------------------------------------------------------------------------
// Bit metrics
// ---------------------------------------------------------------------------

/// Fraction of set bits.
pub fn bit_distribution(value: u32) -> f64 {
    f64::from(value.count_ones()) / 32.0
}

/// Binary Shannon entropy of the 32 bits, weighted by bit-value frequency.
pub fn shannon_entropy(value: u32) -> f64 {
    let ones = f64::from(value.count_ones());
    [ones, 32.0 - ones]
        .iter()
        .filter(|&&count| count > 0.0)
        .map(|&count| {
            let p = count / 32.0;
            -p * p.log2()
        })
        .sum()
}

pub fn hamming_distance(a: u32, b: u32) -> u32 {
    (a ^ b).count_ones()
}

/// The weak-pattern entry `value` matches, directly or complemented.
pub fn simple_bit_pattern(value: u32) -> Option<&'static str> {
    WEAK_PATTERNS
        .iter()
        .find(|(pattern, _)| value == *pattern || value == !*pattern)
        .map(|&(_, name)| name)
}

/// Weak-key screening: low Hamming weight and canonical bit patterns.
pub fn weak_key_tests(value: u32) -> Vec<WeakKeyTest> {
    let weight = value.count_ones();
    let pattern = simple_bit_pattern(value);
    vec![
        WeakKeyTest {
            passed: weight >= MIN_HAMMING_WEIGHT,
            pattern: "Low Hamming Weight".to_string(),
            details: format!("{weight} ones (minimum {MIN_HAMMING_WEIGHT})"),
        },
        WeakKeyTest {
            passed: pattern.is_none(),
            pattern: "Simple Bit Pattern".to_string(),
            details: match pattern {
                Some(name) => format!("matches {name} pattern"),
                None => "no canonical pattern".to_string(),
            },
        },
    ]
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A measured prime constant. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub value: u32,
    pub bit_distribution: f64,
    pub avalanche_score: f64,
    pub hamming_weight: u8,
    pub entropy_score: f64,
    pub test_duration_ms: f64,
    pub generated_at: String,
    pub test_results: TestResults,
}

impl Candidate {
    /// Measure `value` under `config`. Avalanche trial inputs come from `rng`.
    pub fn evaluate<R: Rng + ?Sized>(value: u32, config: &Config, rng: &mut R) -> Self {
        let start = Instant::now();
        let generated_at = now_iso8601();

        let aval_start = Instant::now();
        let report = avalanche(value, config.avalanche_test_cases, rng);
        let aval_ms = aval_start.elapsed().as_secs_f64() * 1000.0;

        let statistical = if config.statistical_analysis {
            mixprime_tests::run_all_tests(value)
                .into_iter()
                .map(StatisticalTest::from)
                .collect()
        } else {
            Vec::new()
        };

        let test_results = TestResults {
            primality: vec![PrimalityTest {
                passed: is_prime(value),
                method: "Miller-Rabin".to_string(),
                details: format!("Tested with bases {WITNESSES:?}"),
            }],
            avalanche: vec![AvalancheTest {
                score: report.score,
                changes: report.changes,
                total: report.total,
                duration_ms: aval_ms,
            }],
            statistical,
            weak_key: weak_key_tests(value),
        };

        Self {
            value,
            bit_distribution: bit_distribution(value),
            avalanche_score: report.score,
            hamming_weight: value.count_ones() as u8,
            entropy_score: shannon_entropy(value),
            test_duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            generated_at,
            test_results,
        }
    }

    /// Measure `value` with the trial source `config` asks for: a per-value
    /// seeded generator when `diffusion_seed` is set, else the thread RNG.
    pub fn measure(value: u32, config: &Config) -> Self {
        match config.diffusion_seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed ^ u64::from(value));
                Self::evaluate(value, config, &mut rng)
            }
            None => Self::evaluate(value, config, &mut rand::rng()),
        }
    }

    /// Summary score used in reports: weighted avalanche, bit distribution,
    /// half the entropy, and every statistical score.
    pub fn overall_score(&self) -> f64 {
        let mut total = self.avalanche_score * 2.0 + self.bit_distribution + self.entropy_score / 2.0;
        let mut count = 4.0;
        for test in &self.test_results.statistical {
            total += test.score;
            count += 1.0;
        }
        total / count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy_reference_points() {
        assert!(shannon_entropy(0).abs() < 1e-12);
        assert!(shannon_entropy(u32::MAX).abs() < 1e-12);
        assert!((shannon_entropy(0xAAAA_AAAA) - 1.0).abs() < 0.1);
        // 12 of 32 bits set.
        assert!((shannon_entropy(0x0000_0FFF) - 0.954_434).abs() < 1e-5);
    }

    #[test]
    fn test_bit_distribution() {
        assert_eq!(bit_distribution(0), 0.0);
        assert_eq!(bit_distribution(u32::MAX), 1.0);
        assert_eq!(bit_distribution(0xAAAA_AAAA), 0.5);
    }

    #[test]
    fn test_hamming_distance() {
        assert_eq!(hamming_distance(0, u32::MAX), 32);
        assert_eq!(hamming_distance(0x2749_959B, 0x98B8_4DB3), 18);
    }

    #[test]
    fn test_weak_patterns_and_complements() {
        for (pattern, _) in WEAK_PATTERNS {
            assert!(simple_bit_pattern(pattern).is_some());
            assert!(simple_bit_pattern(!pattern).is_some());
        }
        assert_eq!(simple_bit_pattern(0x2749_959B), None);
    }

    #[test]
    fn test_weak_key_tests() {
        let tests = weak_key_tests(0x0F0F_0F0F);
        assert!(tests[0].passed);
        assert!(!tests[1].passed);
        assert!(tests[1].details.contains("nibbles"));

        let tests = weak_key_tests(0x0000_0101);
        assert!(!tests[0].passed);
        assert!(tests[1].passed);

        assert!(weak_key_tests(0x2749_959B).iter().all(|t| t.passed));
    }

    #[test]
    fn test_evaluate_populates_everything() {
        let config = Config {
            avalanche_test_cases: 200,
            ..Config::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let c = Candidate::evaluate(0x2749_959B, &config, &mut rng);
        assert_eq!(c.hamming_weight, 16);
        assert_eq!(c.bit_distribution, 0.5);
        assert!((c.entropy_score - 1.0).abs() < 1e-12);
        assert!(c.avalanche_score > 0.25);
        assert!(c.test_results.primality_passed());
        assert!(c.test_results.weak_key_passed());
        assert_eq!(c.test_results.statistical.len(), 5);
        assert_eq!(c.test_results.avalanche[0].total, 200 * 32 * 32);
        assert!(c.generated_at.ends_with('Z'));
    }

    #[test]
    fn test_evaluate_without_statistics() {
        let config = Config {
            avalanche_test_cases: 10,
            statistical_analysis: false,
            ..Config::default()
        };
        let c = Candidate::evaluate(0x98B8_4DB3, &config, &mut StdRng::seed_from_u64(2));
        assert!(c.test_results.statistical.is_empty());
        let expected = (c.avalanche_score * 2.0 + c.bit_distribution + c.entropy_score / 2.0) / 4.0;
        assert!((c.overall_score() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_measure_with_diffusion_seed_is_reproducible() {
        let config = Config {
            avalanche_test_cases: 50,
            statistical_analysis: false,
            diffusion_seed: Some(11),
            ..Config::default()
        };
        let a = Candidate::measure(0x2749_959B, &config);
        let b = Candidate::measure(0x2749_959B, &config);
        assert_eq!(a.avalanche_score, b.avalanche_score);
        assert_eq!(a.test_results.avalanche[0].changes, b.test_results.avalanche[0].changes);
    }

    #[test]
    fn test_composite_value_fails_primality_record() {
        let config = Config {
            avalanche_test_cases: 1,
            statistical_analysis: false,
            ..Config::default()
        };
        let c = Candidate::evaluate(1_000_000, &config, &mut StdRng::seed_from_u64(3));
        assert!(!c.test_results.primality_passed());
    }
}
