//! # mixprime-core
//!
//! **Search a 32-bit space for a pair of prime mixing constants.**
//!
//! `mixprime-core` samples random 32-bit primes on a pool of worker threads,
//! measures how well each one diffuses bits through an RC6-style
//! rotate-multiply-rotate step, runs a five-test randomness battery over its
//! bits, and keeps only candidates that clear every gate. The best-scoring
//! survivor becomes P; the best one that is far enough from P becomes Q.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mixprime_core::{Config, Generator};
//!
//! let generator = Generator::new(Config::default().quick());
//! let result = generator.generate().unwrap();
//!
//! println!("P = {:#010X}", result.selected_p.value);
//! println!("Q = {:#010X}", result.selected_q.value);
//! ```
//!
//! ## Architecture
//!
//! Workers → Sampler → Diffusion + Statistics → Validator → Collector → Selector
//!
//! - [`prime`]: uniform draws and deterministic Miller–Rabin.
//! - [`diffusion`]: avalanche score of the mixing transform.
//! - [`candidate`]: the measured record of one constant.
//! - [`validate`]: accept/reject gates.
//! - [`select`]: composite scoring and pair choice.
//! - [`generator`]: the worker pool, timeout, cancellation and final checks.
//!
//! The core does no file or network I/O beyond [`Config::from_json_file`].
//! Logging goes through an injected [`EventSink`].

pub mod cancel;
pub mod candidate;
pub mod config;
pub mod diffusion;
pub mod error;
pub mod events;
pub mod generator;
pub mod prime;
pub mod random;
pub mod result;
pub mod select;
pub mod timestamp;
pub mod validate;

pub use cancel::CancellationToken;
pub use candidate::{
    AvalancheTest, Candidate, PrimalityTest, StatisticalTest, TestResults, WeakKeyTest,
    bit_distribution, hamming_distance, shannon_entropy,
};
pub use config::{Config, MAX_TIMEOUT_SECS, ScoreWeights, SelectionFallback};
pub use diffusion::{AvalancheReport, avalanche, bit_correlation, combined_avalanche, mix_transform};
pub use error::{GenerationError, RandomSourceError, Result};
pub use events::{Event, EventSink, Level, LogSink, MemorySink};
pub use generator::{FINAL_PASS_RATIO, Generator, WorkerStats};
pub use prime::{PrimeSample, is_prime, sample_prime};
pub use random::{OsRandom, RandomSource, SeededRandom, SequenceSource};
pub use result::{GenerationResult, PairDiagnostics};
pub use select::{MIN_PAIR_DISTANCE, Selection, composite_score, select_pair};
pub use validate::{Rejection, ThresholdValidator, Validator};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
