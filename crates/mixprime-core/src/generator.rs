//! Run orchestration: worker pool, collector, selection and final checks.
//!
//! Workers run on scoped threads and stream accepted candidates to the
//! collector over a bounded channel. The collector owns the pool, the
//! wall-clock deadline and the decision to abort. Cancellation is checked
//! once per generation attempt; an attempt in flight always finishes.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::{Duration, Instant};

use crate::cancel::CancellationToken;
use crate::candidate::{Candidate, StatisticalTest, bit_distribution};
use crate::config::Config;
use crate::error::{GenerationError, Result};
use crate::events::{Event, EventSink, Level, LogSink};
use crate::prime::{is_prime, sample_prime};
use crate::random::{OsRandom, RandomSource};
use crate::result::{GenerationResult, PairDiagnostics};
use crate::select::{MIN_PAIR_DISTANCE, select_pair, sufficiently_different};
use crate::timestamp::now_iso8601;
use crate::validate::{ThresholdValidator, Validator};

/// Fraction of the re-run statistical tests that must pass for the chosen pair.
pub const FINAL_PASS_RATIO: f64 = 0.8;

/// How often the collector wakes up to check the deadline and cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Per-worker counters, reported when the worker exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub attempts: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl WorkerStats {
    fn merge(&mut self, other: &WorkerStats) {
        self.attempts += other.attempts;
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.failed += other.failed;
    }
}

enum WorkerEvent {
    Accepted(Box<Candidate>),
    Fatal(GenerationError),
    Done(WorkerStats),
}

/// What the collector hands back once the workers are done.
struct Collected {
    pool: Vec<Candidate>,
    stats: WorkerStats,
}

/// Searches for a P/Q constant pair.
///
/// ```no_run
/// use mixprime_core::{Config, Generator};
///
/// let result = Generator::new(Config::default().quick()).generate().unwrap();
/// println!("P = {:#010X}", result.selected_p.value);
/// ```
pub struct Generator {
    config: Config,
    source: Arc<dyn RandomSource>,
    validator: Arc<dyn Validator>,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
}

impl Generator {
    /// OS randomness, threshold validation from `config`, events to `log`.
    pub fn new(config: Config) -> Self {
        let validator = ThresholdValidator::from_config(&config);
        Self {
            config,
            source: Arc::new(OsRandom),
            validator: Arc::new(validator),
            sink: Arc::new(LogSink),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_source(mut self, source: Arc<dyn RandomSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle for stopping a run from another thread. Once cancelled, the
    /// token stays cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the whole search and return the selected, re-validated pair.
    pub fn generate(&self) -> Result<GenerationResult> {
        self.config.validate()?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = now_iso8601();
        let start = Instant::now();
        let deadline = start
            .checked_add(self.config.timeout())
            .ok_or_else(|| GenerationError::config("timeout_secs is too far in the future"))?;
        let batches = self.config.worker_batches();

        self.sink.emit(
            Event::new(Level::Info, "generation started")
                .field("run_id", &run_id)
                .field("source", self.source.name())
                .field("workers", batches.len())
                .field("candidates", self.config.candidate_count),
        );

        // Internal stop signal for timeouts and fatal errors, kept apart from
        // the caller's token so the two outcomes stay distinguishable.
        let halt = CancellationToken::new();
        let (tx, rx) = mpsc::sync_channel(self.config.effective_channel_capacity());

        let collected = std::thread::scope(|s| {
            for (id, &batch) in batches.iter().enumerate() {
                let tx = tx.clone();
                let halt = &halt;
                s.spawn(move || self.worker(id, batch, halt, tx));
            }
            drop(tx);

            let outcome = self.collect(rx, start, deadline);
            if outcome.is_err() {
                halt.cancel();
            }
            outcome
        })?;

        let Collected { pool, stats } = collected;
        if pool.len() < 2 {
            return Err(GenerationError::InsufficientCandidates {
                accepted: pool.len(),
                attempts: stats.attempts,
                failed_attempts: stats.failed,
            });
        }

        let selection = select_pair(
            &pool,
            &self.config.score_weights,
            self.config.selection_fallback,
        )?;
        self.sink.emit(
            Event::new(Level::Info, "pair selected")
                .field("p", format!("{:#010X}", selection.p.value))
                .field("q", format!("{:#010X}", selection.q.value))
                .field("p_score", format!("{:.4}", selection.p_score))
                .field("q_score", format!("{:.4}", selection.q_score))
                .field("pool", pool.len()),
        );
        if selection.fallback_used {
            self.sink.emit(
                Event::new(Level::Warn, "selection fallback used")
                    .field("p", format!("{:#010X}", selection.p.value))
                    .field("q", format!("{:#010X}", selection.q.value))
                    .field("min_distance", MIN_PAIR_DISTANCE),
            );
        }

        let mut p = selection.p;
        let mut q = selection.q;
        self.final_validation(&mut p, &mut q, selection.fallback_used)?;

        let pair = PairDiagnostics::measure(p.value, q.value, self.config.avalanche_test_cases);
        let duration = start.elapsed();
        let result = GenerationResult {
            run_id,
            selected_p: p,
            selected_q: q,
            p_score: selection.p_score,
            q_score: selection.q_score,
            total_candidates: pool.len(),
            attempts: stats.attempts,
            failed_attempts: stats.failed,
            rejected: stats.rejected,
            fallback_used: selection.fallback_used,
            pair,
            started_at,
            ended_at: now_iso8601(),
            duration_ms: duration.as_millis() as u64,
            config: self.config.clone(),
        };

        self.sink.emit(
            Event::new(Level::Info, "generation finished")
                .field("run_id", &result.run_id)
                .field("duration_ms", result.duration_ms)
                .field("accepted", result.total_candidates)
                .field("rejected", result.rejected)
                .field("failed", result.failed_attempts),
        );
        Ok(result)
    }

    fn stopped(&self, halt: &CancellationToken) -> bool {
        self.cancel.is_cancelled() || halt.is_cancelled()
    }

    fn worker(&self, id: usize, batch: usize, halt: &CancellationToken, tx: SyncSender<WorkerEvent>) {
        let mut stats = WorkerStats::default();

        for _ in 0..batch {
            if self.stopped(halt) {
                break;
            }
            stats.attempts += 1;

            let sample = match sample_prime(self.source.as_ref(), self.config.max_prime_attempts) {
                Ok(sample) => sample,
                Err(e) if e.is_fatal() => {
                    let _ = tx.send(WorkerEvent::Fatal(e));
                    return;
                }
                Err(e) => {
                    stats.failed += 1;
                    self.sink.emit(
                        Event::new(Level::Warn, "attempt failed")
                            .field("worker", id)
                            .field("error", e),
                    );
                    continue;
                }
            };

            let candidate = Candidate::measure(sample.value, &self.config);
            match self.validator.check(&candidate) {
                Ok(()) => {
                    stats.accepted += 1;
                    if tx.send(WorkerEvent::Accepted(Box::new(candidate))).is_err() {
                        // Collector is gone; the run already ended.
                        return;
                    }
                }
                Err(reason) => {
                    stats.rejected += 1;
                    self.sink.emit(
                        Event::new(Level::Debug, "candidate rejected")
                            .field("worker", id)
                            .field("value", format!("{:#010X}", candidate.value))
                            .field("reason", reason),
                    );
                }
            }
        }

        self.sink.emit(
            Event::new(Level::Debug, "worker finished")
                .field("worker", id)
                .field("attempts", stats.attempts)
                .field("accepted", stats.accepted)
                .field("rejected", stats.rejected)
                .field("failed", stats.failed),
        );
        let _ = tx.send(WorkerEvent::Done(stats));
    }

    /// Drain the channel until every worker hangs up, the deadline passes,
    /// the caller cancels, or a worker reports a fatal error.
    fn collect(&self, rx: Receiver<WorkerEvent>, start: Instant, deadline: Instant) -> Result<Collected> {
        let mut pool = Vec::new();
        let mut stats = WorkerStats::default();

        loop {
            if self.cancel.is_cancelled() {
                return Err(GenerationError::Cancelled {
                    accepted: pool.len(),
                });
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out(start, pool.len()));
            }

            match rx.recv_timeout(remaining.min(POLL_INTERVAL)) {
                Ok(WorkerEvent::Accepted(candidate)) => pool.push(*candidate),
                Ok(WorkerEvent::Done(worker)) => stats.merge(&worker),
                Ok(WorkerEvent::Fatal(e)) => {
                    self.sink.emit(
                        Event::new(Level::Error, "run aborted")
                            .field("error", &e)
                            .field("accepted", pool.len()),
                    );
                    return Err(e);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // Workers stop early, and quietly, when the caller cancels.
        if self.cancel.is_cancelled() {
            return Err(GenerationError::Cancelled {
                accepted: pool.len(),
            });
        }
        Ok(Collected { pool, stats })
    }

    fn timed_out(&self, start: Instant, accepted: usize) -> GenerationError {
        let elapsed = start.elapsed();
        self.sink.emit(
            Event::new(Level::Error, "generation timed out")
                .field("elapsed_ms", elapsed.as_millis())
                .field("accepted", accepted),
        );
        GenerationError::Timeout { elapsed, accepted }
    }

    /// Re-check the chosen pair: sanity gates on each constant, a fresh
    /// statistical battery per constant with its own pass quorum, and the
    /// difference constraint.
    fn final_validation(&self, p: &mut Candidate, q: &mut Candidate, fallback_used: bool) -> Result<()> {
        for (label, c) in [("P", &*p), ("Q", &*q)] {
            self.check_constant(label, c)?;
        }

        for (label, c) in [("P", &mut *p), ("Q", &mut *q)] {
            let battery = mixprime_tests::run_all_tests(c.value);
            c.test_results.statistical =
                battery.iter().cloned().map(StatisticalTest::from).collect();
            if !mixprime_tests::meets_quorum(&battery, FINAL_PASS_RATIO) {
                return Err(GenerationError::FinalValidationFailure {
                    reason: format!(
                        "only {:.0}% of final statistical tests passed for {label} {:#010X} (need {:.0}%)",
                        mixprime_tests::pass_ratio(&battery) * 100.0,
                        c.value,
                        FINAL_PASS_RATIO * 100.0
                    ),
                });
            }
        }

        if !sufficiently_different(p.value, q.value) {
            if !fallback_used {
                return Err(GenerationError::FinalValidationFailure {
                    reason: format!(
                        "P {:#010X} and Q {:#010X} are not sufficiently different",
                        p.value, q.value
                    ),
                });
            }
            self.sink.emit(
                Event::new(Level::Warn, "pair is not sufficiently different")
                    .field("p", format!("{:#010X}", p.value))
                    .field("q", format!("{:#010X}", q.value)),
            );
        }
        Ok(())
    }

    fn check_constant(&self, label: &str, c: &Candidate) -> Result<()> {
        let fail = |reason: String| Err(GenerationError::FinalValidationFailure { reason });

        if c.value == 0 {
            return fail(format!("{label} is zero"));
        }
        if !is_prime(c.value) {
            return fail(format!("{label} {:#010X} is not prime", c.value));
        }
        if c.avalanche_score < self.config.min_avalanche_score {
            return fail(format!(
                "{label} avalanche score {:.4} below {:.4}",
                c.avalanche_score, self.config.min_avalanche_score
            ));
        }
        let dist = bit_distribution(c.value);
        if dist < self.config.min_bit_distribution || dist > self.config.max_bit_distribution {
            return fail(format!(
                "{label} bit distribution {dist:.4} outside [{}, {}]",
                self.config.min_bit_distribution, self.config.max_bit_distribution
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::random::SequenceSource;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const P: u32 = 0x2749_959B;
    const Q: u32 = 0x98B8_4DB3;

    fn small_config() -> Config {
        Config {
            candidate_count: 2,
            worker_count: 1,
            avalanche_test_cases: 2_000,
            diffusion_seed: Some(7),
            ..Config::default()
        }
    }

    fn evaluated(value: u32) -> Candidate {
        let config = small_config();
        Candidate::evaluate(value, &config, &mut StdRng::seed_from_u64(1))
    }

    #[test]
    fn test_worker_stats_merge() {
        let mut total = WorkerStats::default();
        total.merge(&WorkerStats {
            attempts: 3,
            accepted: 1,
            rejected: 1,
            failed: 1,
        });
        total.merge(&WorkerStats {
            attempts: 2,
            accepted: 2,
            rejected: 0,
            failed: 0,
        });
        assert_eq!(total.attempts, 5);
        assert_eq!(total.accepted, 3);
        assert_eq!(total.failed, 1);
    }

    #[test]
    fn test_final_validation_accepts_good_pair() {
        let generator = Generator::new(small_config());
        let mut p = evaluated(P);
        let mut q = evaluated(Q);
        p.test_results.statistical.clear();
        generator.final_validation(&mut p, &mut q, false).unwrap();
        assert_eq!(p.test_results.statistical.len(), 5);
        assert_eq!(q.test_results.statistical.len(), 5);
    }

    #[test]
    fn test_final_validation_rejects_composite() {
        let generator = Generator::new(small_config());
        let mut p = evaluated(P);
        let mut q = evaluated(Q);
        q.value = Q + 1;
        let err = generator.final_validation(&mut p, &mut q, false).unwrap_err();
        assert!(matches!(err, GenerationError::FinalValidationFailure { .. }));
        assert!(err.to_string().contains("not prime"));
    }

    #[test]
    fn test_final_validation_quorum_applies_to_each_constant() {
        // Prime, 15 ones, clears the validator, but fails autocorrelation and
        // linear complexity: 3 of 5.
        let weak: u32 = 0x101D_5EC7;
        assert!(is_prime(weak));
        let generator = Generator::new(small_config());
        let mut p = evaluated(weak);
        assert!(ThresholdValidator::from_config(generator.config()).accepts(&p));
        let mut q = evaluated(Q);

        let err = generator.final_validation(&mut p, &mut q, false).unwrap_err();
        assert!(matches!(err, GenerationError::FinalValidationFailure { .. }));
        let msg = err.to_string();
        assert!(msg.contains("60%"), "{msg}");
        assert!(msg.contains("P 0x101D5EC7"), "{msg}");
    }

    #[test]
    fn test_oversized_timeout_is_rejected_not_panicking() {
        let config = Config {
            timeout_secs: u64::MAX,
            ..small_config()
        };
        let source = Arc::new(SequenceSource::new(vec![P, Q]));
        let generator = Generator::new(config).with_source(source.clone());
        let err = generator.generate().unwrap_err();
        assert!(matches!(err, GenerationError::ConfigInvalid { .. }), "{err}");
        assert_eq!(source.draws(), 0);
    }

    #[test]
    fn test_final_validation_close_pair_needs_fallback() {
        let sink = Arc::new(MemorySink::new());
        let generator = Generator::new(small_config()).with_sink(sink.clone());
        let near: u32 = 0x2649_959F;
        let mut p = evaluated(P);
        let mut q = evaluated(near);

        let err = generator.final_validation(&mut p, &mut q, false).unwrap_err();
        assert!(err.to_string().contains("not sufficiently different"));

        generator.final_validation(&mut p, &mut q, true).unwrap();
        assert_eq!(sink.find("pair is not sufficiently different").len(), 1);
    }

    #[test]
    fn test_final_validation_rejects_low_avalanche() {
        let config = Config {
            min_avalanche_score: 0.9,
            ..small_config()
        };
        let generator = Generator::new(config);
        let mut p = evaluated(P);
        let mut q = evaluated(Q);
        let err = generator.final_validation(&mut p, &mut q, false).unwrap_err();
        assert!(err.to_string().contains("avalanche"));
    }

    #[test]
    fn test_run_events_are_emitted() {
        let sink = Arc::new(MemorySink::new());
        let generator = Generator::new(small_config())
            .with_source(Arc::new(SequenceSource::new(vec![P, Q])))
            .with_sink(sink.clone());
        let result = generator.generate().unwrap();

        let started = sink.find("generation started");
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].get("run_id"), Some(result.run_id.as_str()));
        assert_eq!(started[0].get("source"), Some("sequence"));
        assert_eq!(sink.find("pair selected").len(), 1);
        assert_eq!(sink.find("worker finished").len(), 1);
        assert_eq!(sink.find("generation finished").len(), 1);
        assert!(sink.find("selection fallback used").is_empty());
    }
}
