//! Gossip Core - overlay membership and epidemic broadcast under faults
//!
//! A population of node actors builds a random partial-view overlay by
//! trading membership grants and revokes, then floods a single rumor across
//! it. Every hop is delayed, may be dropped, and may crash the node that
//! processes it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Overlay                            │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ Network: registry + config + FaultModel + Metrics + ctx │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │       │ schedule(Delivery)          │                        │
//! │  ┌────▼────┐   delayed, lossy  ┌────▼────┐                   │
//! │  │ Node #0 │◄─────────────────►│ Node #1 │     ...           │
//! │  └─────────┘                   └─────────┘                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use gossip_core::{Overlay, SimulationConfig};
//! use gossip_env::TokioContext;
//!
//! let overlay = Overlay::start(SimulationConfig::default(), TokioContext::shared())?;
//! // ... wait for membership quiescence ...
//! overlay.trigger_broadcast(overlay.random_origin()).await?;
//! ```

pub mod config;
pub mod error;
pub mod fault;
pub mod metrics;
pub mod network;
pub mod node;
pub mod overlay;
pub mod registry;

// Re-export key types for convenience
pub use config::{ProbabilityMode, SimulationConfig, DEFAULT_MAILBOX_CAPACITY};
pub use error::{ConfigError, OverlayError};
pub use fault::FaultModel;
pub use metrics::{ChurnWindow, Counter, Metrics, MetricsSnapshot};
pub use network::{Delivery, Network};
pub use node::NodeActor;
pub use overlay::{DegreeStats, Overlay};
pub use registry::{NodeHandle, NodeSnapshot, OverlayRegistry, Rumor};
