//! Entropy sources for prime sampling.
//!
//! The sampler only needs bytes. Production runs read the OS CSPRNG; seeded
//! and replaying sources exist for reproducible runs and tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::error::RandomSourceError;

/// A shareable source of random bytes.
pub trait RandomSource: Send + Sync {
    /// Fill `buf` completely or report failure.
    fn fill(&self, buf: &mut [u8]) -> Result<(), RandomSourceError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Draw four bytes and read them as a big-endian u32.
    fn next_u32(&self) -> Result<u32, RandomSourceError> {
        let mut b = [0u8; 4];
        self.fill(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }
}

/// OS CSPRNG via the `getrandom` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<(), RandomSourceError> {
        getrandom::fill(buf).map_err(|e| RandomSourceError(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "os"
    }
}

/// Deterministic `StdRng` stream shared by all workers.
///
/// The byte stream is reproducible; which worker receives which draw is not.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<(), RandomSourceError> {
        self.rng.lock().unwrap().fill_bytes(buf);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "seeded"
    }
}

/// Replays a fixed list of 32-bit values, cycling when exhausted.
///
/// Each `fill` of four bytes yields the next value big-endian, so the prime
/// sampler sees exactly the listed values in order.
pub struct SequenceSource {
    values: Vec<u32>,
    cursor: AtomicUsize,
}

impl SequenceSource {
    pub fn new(values: Vec<u32>) -> Self {
        Self {
            values,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Number of values handed out so far.
    pub fn draws(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

impl RandomSource for SequenceSource {
    fn fill(&self, buf: &mut [u8]) -> Result<(), RandomSourceError> {
        if self.values.is_empty() {
            return Err(RandomSourceError("sequence source is empty".into()));
        }
        for chunk in buf.chunks_mut(4) {
            let i = self.cursor.fetch_add(1, Ordering::SeqCst);
            let bytes = self.values[i % self.values.len()].to_be_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sequence"
    }
}
