//! Simulation parameters and their validation.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default bound on each of a node's mailboxes.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;

/// How drop and crash rates are turned into random decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilityMode {
    /// Truncate `rate * 100` to a whole percentage and compare it against a
    /// uniform draw from `[0, 100)`. Rates below 1% never fire.
    #[default]
    Quantized,

    /// Compare the rate against a uniform draw from `[0, 1)`.
    Continuous,
}

/// Immutable parameters shared by every node in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Number of nodes in the overlay
    pub population_size: usize,

    /// Target (minimum) number of outbound edges per node
    pub fanout: usize,

    /// Edges a node accepts before it must evict one
    pub fanin: usize,

    /// Inclusive lower bound of simulated network latency
    pub delay_low: Duration,

    /// Exclusive upper bound of simulated network latency
    pub delay_high: Duration,

    /// Per-edge message loss probability
    pub drop_rate: f64,

    /// Per-message probability that the processing node crashes
    pub crash_rate: f64,

    /// Bound of each per-node mailbox
    pub mailbox_capacity: usize,

    /// Rate-to-decision rule used by the fault model
    pub probability_mode: ProbabilityMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            population_size: 50_000,
            fanout: 5,
            fanin: 6,
            delay_low: Duration::from_millis(10),
            delay_high: Duration::from_millis(20),
            drop_rate: 0.1,
            crash_rate: 0.001,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            probability_mode: ProbabilityMode::Quantized,
        }
    }
}

impl SimulationConfig {
    /// Sets the population size.
    pub fn with_population(mut self, population_size: usize) -> Self {
        self.population_size = population_size;
        self
    }

    /// Sets fanout and fanin together.
    pub fn with_degree(mut self, fanout: usize, fanin: usize) -> Self {
        self.fanout = fanout;
        self.fanin = fanin;
        self
    }

    /// Sets the latency range `[low, high)`.
    pub fn with_delay(mut self, low: Duration, high: Duration) -> Self {
        self.delay_low = low;
        self.delay_high = high;
        self
    }

    /// Sets the per-edge drop rate.
    pub fn with_drop_rate(mut self, rate: f64) -> Self {
        self.drop_rate = rate;
        self
    }

    /// Sets the per-message crash rate.
    pub fn with_crash_rate(mut self, rate: f64) -> Self {
        self.crash_rate = rate;
        self
    }

    /// Sets the rate-to-decision rule.
    pub fn with_probability_mode(mut self, mode: ProbabilityMode) -> Self {
        self.probability_mode = mode;
        self
    }

    /// Sets the per-mailbox bound.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    /// Checks every parameter combination that would stall or break a run.
    ///
    /// A node must always be able to find a random peer that is neither
    /// itself nor the node it is replacing, and eviction must leave room
    /// above the target degree; otherwise membership repair loops forever.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall(self.population_size));
        }
        if self.population_size > u32::MAX as usize {
            return Err(ConfigError::PopulationTooLarge(self.population_size));
        }
        if self.fanout == 0 {
            return Err(ConfigError::ZeroFanout);
        }
        if self.fanout + 1 >= self.population_size {
            return Err(ConfigError::FanoutTooLarge {
                fanout: self.fanout,
                population: self.population_size,
            });
        }
        if self.fanin <= self.fanout {
            return Err(ConfigError::FaninNotAboveFanout {
                fanin: self.fanin,
                fanout: self.fanout,
            });
        }
        if self.delay_high <= self.delay_low {
            return Err(ConfigError::EmptyDelayRange {
                low: self.delay_low,
                high: self.delay_high,
            });
        }
        check_rate("drop_rate", self.drop_rate)?;
        check_rate("crash_rate", self.crash_rate)?;
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::ZeroMailboxCapacity);
        }
        Ok(())
    }
}

fn check_rate(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RateOutOfRange { name, value })
    }
}

impl fmt::Display for SimulationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Parameters ===")?;
        writeln!(f, "n={}", self.population_size)?;
        writeln!(f, "fanout={}", self.fanout)?;
        writeln!(f, "fanin={}", self.fanin)?;
        writeln!(f, "delaylow={}ms", self.delay_low.as_millis())?;
        writeln!(f, "delayhigh={}ms", self.delay_high.as_millis())?;
        writeln!(f, "droprate={}", self.drop_rate)?;
        writeln!(f, "crashrate={}", self.crash_rate)?;
        writeln!(f, "mailbox={}", self.mailbox_capacity)?;
        write!(f, "probability={:?}", self.probability_mode)
    }
}
