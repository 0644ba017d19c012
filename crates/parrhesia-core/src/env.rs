//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from system resources (time, randomness).
//! Production uses [`SystemEnvironment`]; tests use the seeded
//! [`sim::SimEnvironment`] with a manually advanced clock.

use std::time::Duration;

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Add<Duration, Output = Self::Instant>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time as Unix seconds.
    ///
    /// Only used for bookkeeping with a calendar horizon (trust-record
    /// timestamps); protocol timers use [`Environment::now`].
    fn wall_clock_secs(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random byte array.
    fn random_array<const N: usize>(&self) -> [u8; N] {
        let mut bytes = [0u8; N];
        self.random_bytes(&mut bytes);
        bytes
    }

    /// Generates a random `u128`, for message and correlation ids.
    fn random_u128(&self) -> u128 {
        u128::from_be_bytes(self.random_array())
    }
}

/// Production environment backed by the OS clock and entropy source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn wall_clock_secs(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs(),
            // Pre-epoch clocks only occur on misconfigured hosts; zero
            // keeps trust bookkeeping monotone instead of panicking.
            Err(_) => 0,
        }
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        use rand::RngCore;
        rand::rngs::OsRng.fill_bytes(buffer);
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod sim {
    //! Deterministic environment for tests: seeded RNG, virtual clock.

    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use rand::{RngCore, SeedableRng, rngs::StdRng};

    use super::Environment;

    struct Inner {
        rng: StdRng,
        now: Duration,
        wall_clock: u64,
    }

    /// A deterministic [`Environment`] with a manually advanced clock.
    ///
    /// Cloning shares the underlying state, so every component holding a
    /// clone observes the same clock and RNG stream.
    #[derive(Clone)]
    pub struct SimEnvironment {
        inner: Arc<Mutex<Inner>>,
    }

    impl SimEnvironment {
        /// Create an environment with a seeded RNG. Virtual time starts
        /// at zero.
        pub fn from_seed(seed: u64) -> Self {
            Self {
                inner: Arc::new(Mutex::new(Inner {
                    rng: StdRng::seed_from_u64(seed),
                    now: Duration::ZERO,
                    wall_clock: 1_700_000_000,
                })),
            }
        }

        /// Advance both the monotonic and wall clocks.
        pub fn advance(&self, by: Duration) {
            let mut inner = self.inner.lock().unwrap();
            inner.now += by;
            inner.wall_clock += by.as_secs();
        }
    }

    impl Environment for SimEnvironment {
        type Instant = Duration;

        fn now(&self) -> Duration {
            self.inner.lock().unwrap().now
        }

        fn wall_clock_secs(&self) -> u64 {
            self.inner.lock().unwrap().wall_clock
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            self.inner.lock().unwrap().rng.fill_bytes(buffer);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn clock_advances_on_demand() {
            let env = SimEnvironment::from_seed(1);
            let before = env.now();
            env.advance(Duration::from_secs(31));
            assert_eq!(env.now() - before, Duration::from_secs(31));
        }

        #[test]
        fn same_seed_same_stream() {
            let a = SimEnvironment::from_seed(7);
            let b = SimEnvironment::from_seed(7);
            assert_eq!(a.random_array::<16>(), b.random_array::<16>());
        }

        #[test]
        fn clones_share_state() {
            let env = SimEnvironment::from_seed(7);
            let clone = env.clone();
            clone.advance(Duration::from_secs(5));
            assert_eq!(env.now(), Duration::from_secs(5));
        }
    }
}
