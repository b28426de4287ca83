//! Core environment context trait for simulated gossip nodes.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// The central interface for environment interaction.
///
/// Node actors never touch the clock, the task scheduler or a random
/// number generator directly. Everything goes through this trait so the
/// same state machine runs unseeded in production and reproducibly seeded
/// under test.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, thread-local RNG
/// - **Seeded**: `SeededContext` - wraps `tokio::time`, `ChaCha8Rng(seed)`
///
/// # Concurrency
///
/// A single context is shared by every actor and every detached delivery
/// task, so the random source must tolerate concurrent callers.
#[async_trait]
pub trait GossipContext: Send + Sync + 'static {
    /// Returns the monotonic time elapsed since context creation.
    ///
    /// Follows the tokio clock, so a paused test runtime sees virtual time.
    fn now(&self) -> Duration;

    /// Suspends the calling task for the given duration.
    async fn sleep(&self, duration: Duration);

    /// Spawns a detached background task.
    ///
    /// The name is attached to the task's tracing span.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Returns a uniformly distributed integer in `[0, upper)`.
    ///
    /// # Panics
    /// Panics if `upper` is zero.
    fn random_below(&self, upper: u64) -> u64;

    /// Returns a uniformly distributed float in `[0, 1)`.
    fn random_unit(&self) -> f64;

    /// Returns the context's seed, if it has one.
    ///
    /// Production contexts are not seeded and return `None`.
    fn seed(&self) -> Option<u64>;
}
