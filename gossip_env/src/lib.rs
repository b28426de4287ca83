//! Gossip Environment Abstraction Layer
//!
//! This crate isolates the three sources of non-determinism a simulated
//! node touches:
//! - Time (`now()`, `sleep()`)
//! - Task scheduling (`spawn()`)
//! - Randomness (`random_below()`, `random_unit()`)
//!
//! Production runs use [`TokioContext`], which is deliberately unseeded.
//! Tests and `--seed` runs use [`SeededContext`], which draws every random
//! decision from one seeded stream.
//!
//! # Example
//!
//! ```ignore
//! use gossip_env::{GossipContext, TokioContext};
//!
//! async fn deliver_later<Ctx: GossipContext>(ctx: &Ctx) {
//!     let jitter = ctx.random_below(10);
//!     ctx.sleep(Duration::from_millis(10 + jitter)).await;
//! }
//! ```

mod context;
mod seeded;
mod tokio_impl;
mod types;

pub use context::GossipContext;
pub use seeded::SeededContext;
pub use tokio_impl::TokioContext;
pub use types::NodeId;
