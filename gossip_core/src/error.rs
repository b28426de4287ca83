//! Error types for overlay construction and harness access.
//!
//! Crashes and drops are simulated outcomes recorded in [`crate::Metrics`];
//! nothing here describes them.

use gossip_env::NodeId;
use std::time::Duration;
use thiserror::Error;

/// A rejected simulation configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Population must hold at least 2 nodes, got {0}")]
    PopulationTooSmall(usize),

    #[error("Population of {0} nodes exceeds the 32-bit node id space")]
    PopulationTooLarge(usize),

    #[error("Fanout must be at least 1")]
    ZeroFanout,

    #[error("Fanout {fanout} needs fanout + 1 < population, but population is {population}")]
    FanoutTooLarge { fanout: usize, population: usize },

    #[error("Fanin {fanin} must exceed fanout {fanout}")]
    FaninNotAboveFanout { fanin: usize, fanout: usize },

    #[error("Delay range [{low:?}, {high:?}) is empty")]
    EmptyDelayRange { low: Duration, high: Duration },

    #[error("{name} must lie in [0, 1), got {value}")]
    RateOutOfRange { name: &'static str, value: f64 },

    #[error("Mailbox capacity must be at least 1")]
    ZeroMailboxCapacity,
}

/// Errors surfaced to the harness by the overlay handle.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Unknown node {id}: population is {population}")]
    UnknownNode { id: NodeId, population: usize },

    #[error("Node {0} is not accepting events")]
    NodeUnavailable(NodeId),
}
