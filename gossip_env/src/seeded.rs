//! Seeded context for reproducible random decisions.

use crate::GossipContext;
use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

/// Context whose random source is a single seeded ChaCha8 stream.
///
/// Every random decision in the simulation (peer choice, eviction victim,
/// delay, drop and crash rolls) draws from the same generator, so a run's
/// decisions are reproducible from its seed. Task interleaving is still up
/// to the tokio scheduler; under a paused single-threaded test runtime that
/// is reproducible as well.
pub struct SeededContext {
    /// Master seed for this run
    seed: u64,

    /// Shared generator
    rng: Arc<Mutex<ChaCha8Rng>>,

    /// Start time for monotonic duration calculations
    start: Instant,
}

impl SeededContext {
    /// Creates a new SeededContext with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> T) -> T {
        // A poisoned lock only means another task panicked mid-draw; the
        // generator state is still usable.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }
}

impl Clone for SeededContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            rng: Arc::clone(&self.rng),
            start: self.start,
        }
    }
}

#[async_trait]
impl GossipContext for SeededContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(future.instrument(tracing::trace_span!("task", task = name)));
    }

    fn random_below(&self, upper: u64) -> u64 {
        self.with_rng(|rng| rng.gen_range(0..upper))
    }

    fn random_unit(&self) -> f64 {
        self.with_rng(|rng| rng.gen::<f64>())
    }

    fn seed(&self) -> Option<u64> {
        Some(self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_context_deterministic_draws() {
        let ctx1 = SeededContext::new(42);
        let ctx2 = SeededContext::new(42);

        let a: Vec<u64> = (0..32).map(|_| ctx1.random_below(1000)).collect();
        let b: Vec<u64> = (0..32).map(|_| ctx2.random_below(1000)).collect();

        assert_eq!(a, b);
    }

    #[test]
    fn test_seeded_context_different_seeds_diverge() {
        let ctx1 = SeededContext::new(1);
        let ctx2 = SeededContext::new(2);

        let a: Vec<u64> = (0..32).map(|_| ctx1.random_below(u64::MAX)).collect();
        let b: Vec<u64> = (0..32).map(|_| ctx2.random_below(u64::MAX)).collect();

        assert_ne!(a, b);
    }

    #[test]
    fn test_seeded_context_clone_shares_stream() {
        let ctx1 = SeededContext::new(7);
        let ctx2 = ctx1.clone();
        let fresh = SeededContext::new(7);

        // Interleaved draws from both clones consume one stream.
        let interleaved = [ctx1.random_below(1 << 40), ctx2.random_below(1 << 40)];
        let sequential = [fresh.random_below(1 << 40), fresh.random_below(1 << 40)];

        assert_eq!(interleaved, sequential);
    }

    #[test]
    fn test_seeded_context_seed() {
        let ctx = SeededContext::new(12345);
        assert_eq!(ctx.seed(), Some(12345));
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_context_sleep_advances_clock() {
        let ctx = SeededContext::new(0);
        ctx.sleep(Duration::from_millis(250)).await;

        assert!(ctx.now() >= Duration::from_millis(250));
    }
}
