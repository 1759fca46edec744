//! Acceptance gates for freshly measured candidates.

use crate::candidate::{Candidate, MAX_HAMMING_WEIGHT, MIN_HAMMING_WEIGHT};
use crate::config::Config;

/// Why a candidate was turned away.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    BitDistribution { observed: f64, min: f64, max: f64 },
    Avalanche { observed: f64, min: f64 },
    HammingWeight { observed: u8 },
    Entropy { observed: f64, min: f64 },
    WeakKey { pattern: String },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BitDistribution { observed, min, max } => {
                write!(f, "bit distribution {observed:.4} outside [{min}, {max}]")
            }
            Self::Avalanche { observed, min } => {
                write!(f, "avalanche score {observed:.4} below {min}")
            }
            Self::HammingWeight { observed } => write!(
                f,
                "hamming weight {observed} outside [{MIN_HAMMING_WEIGHT}, {MAX_HAMMING_WEIGHT}]"
            ),
            Self::Entropy { observed, min } => {
                write!(f, "entropy {observed:.4} below {min}")
            }
            Self::WeakKey { pattern } => write!(f, "weak key: {pattern}"),
        }
    }
}

/// Decides whether a candidate enters the shared pool.
pub trait Validator: Send + Sync {
    fn check(&self, candidate: &Candidate) -> Result<(), Rejection>;

    fn accepts(&self, candidate: &Candidate) -> bool {
        self.check(candidate).is_ok()
    }
}

/// The standard gates, with thresholds taken from the run config.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdValidator {
    pub min_bit_distribution: f64,
    pub max_bit_distribution: f64,
    pub min_avalanche_score: f64,
    pub min_entropy_score: f64,
}

impl ThresholdValidator {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_bit_distribution: config.min_bit_distribution,
            max_bit_distribution: config.max_bit_distribution,
            min_avalanche_score: config.min_avalanche_score,
            min_entropy_score: config.min_entropy_score,
        }
    }
}

impl Validator for ThresholdValidator {
    fn check(&self, c: &Candidate) -> Result<(), Rejection> {
        if c.bit_distribution < self.min_bit_distribution
            || c.bit_distribution > self.max_bit_distribution
        {
            return Err(Rejection::BitDistribution {
                observed: c.bit_distribution,
                min: self.min_bit_distribution,
                max: self.max_bit_distribution,
            });
        }
        if c.avalanche_score < self.min_avalanche_score {
            return Err(Rejection::Avalanche {
                observed: c.avalanche_score,
                min: self.min_avalanche_score,
            });
        }
        let weight = u32::from(c.hamming_weight);
        if !(MIN_HAMMING_WEIGHT..=MAX_HAMMING_WEIGHT).contains(&weight) {
            return Err(Rejection::HammingWeight {
                observed: c.hamming_weight,
            });
        }
        if c.entropy_score < self.min_entropy_score {
            return Err(Rejection::Entropy {
                observed: c.entropy_score,
                min: self.min_entropy_score,
            });
        }
        if let Some(failed) = c.test_results.weak_key.iter().find(|t| !t.passed) {
            return Err(Rejection::WeakKey {
                pattern: failed.pattern.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{TestResults, bit_distribution, shannon_entropy, weak_key_tests};

    /// Build a candidate directly, bypassing measurement.
    fn candidate(value: u32, avalanche: f64) -> Candidate {
        Candidate {
            value,
            bit_distribution: bit_distribution(value),
            avalanche_score: avalanche,
            hamming_weight: value.count_ones() as u8,
            entropy_score: shannon_entropy(value),
            test_duration_ms: 0.0,
            generated_at: String::new(),
            test_results: TestResults {
                weak_key: weak_key_tests(value),
                ..TestResults::default()
            },
        }
    }

    fn validator() -> ThresholdValidator {
        ThresholdValidator::from_config(&Config::default())
    }

    #[test]
    fn test_accepts_balanced_prime() {
        assert_eq!(validator().check(&candidate(0x2749_959B, 0.32)), Ok(()));
    }

    #[test]
    fn test_rejects_bit_distribution() {
        // 14 ones = 0.4375.
        let err = validator().check(&candidate(0x0000_3FFF, 0.32)).unwrap_err();
        assert!(matches!(err, Rejection::BitDistribution { .. }));
        assert!(err.to_string().contains("0.4375"));
    }

    #[test]
    fn test_rejects_low_avalanche() {
        let err = validator().check(&candidate(0x2749_959B, 0.2)).unwrap_err();
        assert_eq!(
            err,
            Rejection::Avalanche {
                observed: 0.2,
                min: 0.25
            }
        );
    }

    #[test]
    fn test_hamming_band_checked_with_wide_distribution() {
        let v = ThresholdValidator {
            min_bit_distribution: 0.0,
            max_bit_distribution: 1.0,
            min_avalanche_score: 0.0,
            min_entropy_score: 0.0,
        };
        // 21 ones.
        let err = v.check(&candidate(0x001F_FFFF, 0.3)).unwrap_err();
        assert_eq!(err, Rejection::HammingWeight { observed: 21 });
    }

    #[test]
    fn test_rejects_low_entropy() {
        let v = ThresholdValidator {
            min_entropy_score: 0.99,
            ..validator()
        };
        // 15 ones: entropy 0.9972 passes, 0.45 < 15/32 passes.
        assert!(v.accepts(&candidate(0x0000_7FFF, 0.3)));
        let strict = ThresholdValidator {
            min_entropy_score: 1.0,
            ..validator()
        };
        let err = strict.check(&candidate(0x0000_7FFF, 0.3)).unwrap_err();
        assert!(matches!(err, Rejection::Entropy { .. }));
    }

    #[test]
    fn test_weak_key_is_final() {
        // 0xAAAAAAAA has perfect distribution and entropy but is a weak pattern.
        let err = validator().check(&candidate(0xAAAA_AAAA, 0.5)).unwrap_err();
        assert_eq!(
            err,
            Rejection::WeakKey {
                pattern: "Simple Bit Pattern".to_string()
            }
        );
    }
}
