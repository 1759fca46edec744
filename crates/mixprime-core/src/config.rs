//! Run configuration: thresholds, pool sizing, scoring weights.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};

/// Weights of the composite selection score.
///
/// `score = (w_bd·bitDistScore + w_av·avalanche + w_en·entropy/2) / (w_bd + w_av + w_en)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub bit_distribution: f64,
    pub avalanche: f64,
    pub entropy: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            bit_distribution: 1.0,
            avalanche: 2.0,
            entropy: 1.5,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.bit_distribution + self.avalanche + self.entropy
    }
}

/// What the selector does when no candidate is sufficiently different from P.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionFallback {
    /// Fail the run with `SelectionFailure`.
    #[default]
    Strict,
    /// Take the second-best candidate anyway; the difference invariant
    /// becomes best-effort and the result is flagged `fallback_used`.
    SecondBest,
}

impl std::fmt::Display for SelectionFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::SecondBest => write!(f, "second_best"),
        }
    }
}

/// Longest accepted wall-clock budget: 30 days.
pub const MAX_TIMEOUT_SECS: u64 = 30 * 24 * 60 * 60;

/// Configuration for one generation run. Read-only once the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Total generation attempts, split across workers.
    pub candidate_count: usize,
    /// Random inputs per avalanche measurement.
    pub avalanche_test_cases: usize,
    /// Floor for `max_prime_attempts`.
    pub min_prime_attempts: usize,
    /// Draws per prime search before giving up.
    pub max_prime_attempts: usize,
    pub worker_count: usize,
    pub min_bit_distribution: f64,
    pub max_bit_distribution: f64,
    pub min_avalanche_score: f64,
    /// Minimum binary Shannon entropy of the bits (max 1.0).
    pub min_entropy_score: f64,
    /// Run the statistical battery on every candidate.
    pub statistical_analysis: bool,
    /// Wall-clock budget for the whole run.
    pub timeout_secs: u64,
    /// Bounded collector channel size; 0 means twice the worker count.
    pub channel_capacity: usize,
    pub score_weights: ScoreWeights,
    pub selection_fallback: SelectionFallback,
    /// Seed avalanche trial inputs per candidate for reproducible scores.
    pub diffusion_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            candidate_count: 1000,
            avalanche_test_cases: 10_000,
            min_prime_attempts: 100,
            max_prime_attempts: 10_000,
            worker_count: 8,
            min_bit_distribution: 0.45,
            max_bit_distribution: 0.55,
            min_avalanche_score: 0.25,
            min_entropy_score: 0.95,
            statistical_analysis: true,
            timeout_secs: 30 * 60,
            channel_capacity: 0,
            score_weights: ScoreWeights::default(),
            selection_fallback: SelectionFallback::Strict,
            diffusion_seed: None,
        }
    }
}

impl Config {
    /// Reduced parameters for a fast smoke run.
    pub fn quick(mut self) -> Self {
        self.candidate_count = 10;
        self.avalanche_test_cases = 100;
        self
    }

    /// Load a (possibly partial) JSON config over the defaults and validate it.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn effective_channel_capacity(&self) -> usize {
        if self.channel_capacity == 0 {
            self.worker_count.saturating_mul(2).max(1)
        } else {
            self.channel_capacity
        }
    }

    /// Generation attempts assigned to each worker. The remainder of
    /// `candidate_count / worker_count` goes to the first workers.
    pub fn worker_batches(&self) -> Vec<usize> {
        if self.worker_count == 0 {
            return Vec::new();
        }
        let base = self.candidate_count / self.worker_count;
        let extra = self.candidate_count % self.worker_count;
        (0..self.worker_count)
            .map(|i| base + usize::from(i < extra))
            .filter(|&n| n > 0)
            .collect()
    }

    /// Check every invariant before any work starts.
    pub fn validate(&self) -> Result<()> {
        if self.candidate_count < 1 {
            return Err(GenerationError::config("candidate_count must be positive"));
        }
        if self.worker_count < 1 {
            return Err(GenerationError::config("worker_count must be positive"));
        }
        if self.avalanche_test_cases < 1 {
            return Err(GenerationError::config(
                "avalanche_test_cases must be positive",
            ));
        }
        if self.min_prime_attempts < 1 {
            return Err(GenerationError::config(
                "min_prime_attempts must be positive",
            ));
        }
        if self.max_prime_attempts < self.min_prime_attempts {
            return Err(GenerationError::config(format!(
                "max_prime_attempts ({}) is below min_prime_attempts ({})",
                self.max_prime_attempts, self.min_prime_attempts
            )));
        }
        if !(0.0..=1.0).contains(&self.min_bit_distribution)
            || !(0.0..=1.0).contains(&self.max_bit_distribution)
        {
            return Err(GenerationError::config(
                "bit distribution bounds must lie in [0, 1]",
            ));
        }
        if self.min_bit_distribution >= self.max_bit_distribution {
            return Err(GenerationError::config(format!(
                "invalid bit distribution range [{}, {}]",
                self.min_bit_distribution, self.max_bit_distribution
            )));
        }
        if !(0.0..=1.0).contains(&self.min_avalanche_score) {
            return Err(GenerationError::config(format!(
                "invalid avalanche score threshold {}",
                self.min_avalanche_score
            )));
        }
        if !(0.0..=1.0).contains(&self.min_entropy_score) {
            return Err(GenerationError::config(format!(
                "invalid entropy score threshold {}",
                self.min_entropy_score
            )));
        }
        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(GenerationError::config(format!(
                "timeout_secs must lie in 1..={MAX_TIMEOUT_SECS}, got {}",
                self.timeout_secs
            )));
        }
        let w = self.score_weights;
        let usable = |x: f64| x.is_finite() && x >= 0.0;
        if !(usable(w.bit_distribution) && usable(w.avalanche) && usable(w.entropy))
            || w.total() <= 0.0
        {
            return Err(GenerationError::config(
                "score weights must be finite and non-negative with a positive sum",
            ));
        }
        Ok(())
    }
}
