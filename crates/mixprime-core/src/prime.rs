//! Prime sampling with deterministic Miller–Rabin.
//!
//! Witnesses {2, 7, 61} are exact for every n < 4,759,123,141, which covers
//! the whole u32 range.

use crate::error::{GenerationError, RandomSourceError, Result};
use crate::random::RandomSource;

/// Miller–Rabin witnesses that are deterministic over u32.
pub const WITNESSES: [u32; 3] = [2, 7, 61];

/// Sampled values this close to `u32::MAX` are discarded.
pub const OVERFLOW_GUARD: u32 = 100;

/// `base^exp mod modulus` by square-and-multiply with 64-bit intermediates.
///
/// Returns 0 when `modulus` is 0.
pub fn mod_pow(base: u32, exp: u32, modulus: u32) -> u32 {
    if modulus == 0 {
        return 0;
    }
    let m = u64::from(modulus);
    let mut result: u64 = 1 % m;
    let mut b = u64::from(base) % m;
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            result = result * b % m;
        }
        b = b * b % m;
        e >>= 1;
    }
    result as u32
}

/// One Miller–Rabin round for odd `n` with `n − 1 = d·2^r`.
fn witness_passes(n: u32, d: u32, r: u32, a: u32) -> bool {
    if n == a {
        return true;
    }
    let n64 = u64::from(n);
    let mut x = u64::from(mod_pow(a, d, n));
    if x == 1 || x == n64 - 1 {
        return true;
    }
    for _ in 1..r {
        x = x * x % n64;
        if x == n64 - 1 {
            return true;
        }
        if x == 1 {
            return false;
        }
    }
    false
}

/// Deterministic primality test for any u32.
pub fn is_prime(n: u32) -> bool {
    if n <= 1 || n == 4 {
        return false;
    }
    if n <= 3 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }

    let mut d = n - 1;
    let mut r = 0;
    while d % 2 == 0 {
        d /= 2;
        r += 1;
    }
    WITNESSES.iter().all(|&a| witness_passes(n, d, r, a))
}

/// A prime drawn from a random source, with the number of draws it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimeSample {
    pub value: u32,
    pub attempts: usize,
}

/// Draw uniform u32 values until one is prime.
///
/// Read failures count as attempts. If every attempt failed to read, the
/// source is considered unavailable (`RandomSourceFailure`); otherwise an
/// unlucky search ends in `PrimeSearchExhausted`.
pub fn sample_prime(source: &dyn RandomSource, max_attempts: usize) -> Result<PrimeSample> {
    let mut last_error: Option<RandomSourceError> = None;
    let mut read_failures = 0usize;

    for attempt in 1..=max_attempts {
        let value = match source.next_u32() {
            Ok(v) => v,
            Err(e) => {
                read_failures += 1;
                last_error = Some(e);
                continue;
            }
        };
        if value > u32::MAX - OVERFLOW_GUARD {
            continue;
        }
        if is_prime(value) {
            return Ok(PrimeSample {
                value,
                attempts: attempt,
            });
        }
    }

    match last_error {
        Some(source) if read_failures == max_attempts => Err(GenerationError::RandomSourceFailure {
            attempts: max_attempts,
            source,
        }),
        _ => Err(GenerationError::PrimeSearchExhausted {
            attempts: max_attempts,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{SeededRandom, SequenceSource};
    use proptest::prelude::*;

    fn trial_division(n: u32) -> bool {
        if n < 2 {
            return false;
        }
        let n = u64::from(n);
        let mut i = 2u64;
        while i * i <= n {
            if n % i == 0 {
                return false;
            }
            i += 1;
        }
        true
    }

    struct BrokenSource;

    impl RandomSource for BrokenSource {
        fn fill(&self, _buf: &mut [u8]) -> std::result::Result<(), RandomSourceError> {
            Err(RandomSourceError("device gone".into()))
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn test_mod_pow() {
        assert_eq!(mod_pow(2, 10, 1000), 24);
        assert_eq!(mod_pow(3, 0, 7), 1);
        assert_eq!(mod_pow(5, 3, 1), 0);
        assert_eq!(mod_pow(5, 3, 0), 0);
        // Fermat on the largest 32-bit prime: no overflow in the accumulator.
        assert_eq!(mod_pow(2, 4_294_967_290, 4_294_967_291), 1);
    }

    #[test]
    fn test_boundary_cases() {
        assert!(!is_prime(0));
        assert!(!is_prime(1));
        assert!(is_prime(2));
        assert!(is_prime(3));
        assert!(!is_prime(4));
        assert!(is_prime(5));
        assert!(is_prime(7));
        assert!(is_prime(61));
        assert!(!is_prime(u32::MAX));
    }

    #[test]
    fn test_agrees_with_sieve_on_small_range() {
        const N: usize = 200_000;
        let mut sieve = vec![true; N];
        sieve[0] = false;
        sieve[1] = false;
        for i in 2..N {
            if sieve[i] {
                for j in (i * i..N).step_by(i) {
                    sieve[j] = false;
                }
            }
        }
        for (n, &expected) in sieve.iter().enumerate() {
            assert_eq!(is_prime(n as u32), expected, "n = {n}");
        }
    }

    #[test]
    fn test_pseudoprimes_rejected() {
        // Strong pseudoprimes to base 2, Carmichael numbers, and
        // 3215031751 (strong pseudoprime to bases 2, 3, 5 and 7).
        for n in [
            2047u32, 3277, 4033, 4681, 8321, 561, 1105, 1729, 41041, 25_326_001, 3_215_031_751,
        ] {
            assert!(!is_prime(n), "{n} is composite");
        }
    }

    #[test]
    fn test_known_primes_near_top() {
        for n in [2_147_483_647u32, 4_294_967_291, 4_294_967_279, 4_294_967_197] {
            assert!(is_prime(n), "{n} is prime");
        }
        assert!(!is_prime(4_294_967_293));
    }

    #[test]
    fn test_sample_prime_skips_composites_and_guard_band() {
        // 4294967197 is prime but within 100 of u32::MAX.
        let src = SequenceSource::new(vec![4_294_967_197, 1_000_000, 0x2749_959B]);
        let sample = sample_prime(&src, 10).unwrap();
        assert_eq!(sample.value, 0x2749_959B);
        assert_eq!(sample.attempts, 3);
    }

    #[test]
    fn test_sample_prime_exhausted() {
        let src = SequenceSource::new(vec![1_000_000]);
        let err = sample_prime(&src, 25).unwrap_err();
        assert!(matches!(err, GenerationError::PrimeSearchExhausted { attempts: 25 }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_sample_prime_source_failure() {
        let err = sample_prime(&BrokenSource, 4).unwrap_err();
        match err {
            GenerationError::RandomSourceFailure { attempts, source } => {
                assert_eq!(attempts, 4);
                assert!(source.0.contains("device gone"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_sample_prime_from_seeded_source() {
        let src = SeededRandom::new(9);
        let sample = sample_prime(&src, 10_000).unwrap();
        assert!(trial_division(sample.value));
        assert!(sample.value <= u32::MAX - OVERFLOW_GUARD);
    }

    proptest! {
        #[test]
        fn agrees_with_trial_division(n in any::<u32>()) {
            prop_assert_eq!(is_prime(n), trial_division(n));
        }
    }
}
