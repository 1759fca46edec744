//! The finished output of a generation run.

use serde::{Deserialize, Serialize};

use crate::candidate::{Candidate, hamming_distance};
use crate::config::Config;
use crate::diffusion::{bit_correlation, combined_avalanche};

/// How the chosen P and Q relate to each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairDiagnostics {
    pub hamming_distance: u32,
    pub bit_correlation: f64,
    pub combined_avalanche: f64,
}

impl PairDiagnostics {
    pub fn measure(p: u32, q: u32, cases: usize) -> Self {
        Self {
            hamming_distance: hamming_distance(p, q),
            bit_correlation: bit_correlation(p, q),
            combined_avalanche: combined_avalanche(p, q, cases),
        }
    }
}

/// A selected, re-validated P/Q pair plus run bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub run_id: String,
    pub selected_p: Candidate,
    pub selected_q: Candidate,
    pub p_score: f64,
    pub q_score: f64,
    /// Accepted candidates in the pool.
    pub total_candidates: usize,
    pub attempts: usize,
    pub failed_attempts: usize,
    pub rejected: usize,
    pub fallback_used: bool,
    pub pair: PairDiagnostics,
    pub started_at: String,
    pub ended_at: String,
    pub duration_ms: u64,
    pub config: Config,
}

impl GenerationResult {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }
}
