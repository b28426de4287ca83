//! Gossip Simulation Harness
//!
//! Drives a [`gossip_core::Overlay`] through its two convergence phases and
//! reports what it observed.
//!
//! # Phases
//!
//! ```text
//! ┌──────────────┐  quiet windows   ┌──────────────┐  coverage >= target
//! │  Membership  │ ───────────────► │  Broadcast   │ ───────────────────► report
//! │ (grant/evict)│                  │ (one rumor)  │  or stalled
//! └──────────────┘                  └──────────────┘
//! ```
//!
//! Both phases are fixed-interval sampling loops over the shared
//! [`gossip_core::Metrics`]; the runner never touches node state except
//! through the inspection mailbox.
//!
//! # Usage
//!
//! ```ignore
//! use gossip_sim::{ScenarioId, SimulationRunner};
//! use gossip_env::SeededContext;
//!
//! let report = SimulationRunner::new(ScenarioId::Small.config())
//!     .with_scenario("small")
//!     .run(SeededContext::shared(42))
//!     .await?;
//! ```

pub mod error;
pub mod exporter;
pub mod runner;
pub mod scenarios;

pub use error::SimError;
pub use exporter::{BroadcastPhase, ChurnSample, ConfigSummary, CoverageSample, MembershipPhase, RunReport};
pub use runner::{SimulationRunner, DEFAULT_COVERAGE_TARGET, DEFAULT_SAMPLE_INTERVAL};
pub use scenarios::ScenarioId;
