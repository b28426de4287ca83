//! Named parameter presets for common experiments.

use gossip_core::SimulationConfig;
use std::time::Duration;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// 50k nodes with the stock fault mix
    Standard,

    /// 10 nodes; fast membership quiescence check
    Small,

    /// 100 nodes, no loss, no crashes, fixed 1ms latency
    Lossless,

    /// 10k nodes with 30% per-edge loss
    Lossy,

    /// 10k nodes with a 5% per-message crash rate
    Crashy,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Standard,
            ScenarioId::Small,
            ScenarioId::Lossless,
            ScenarioId::Lossy,
            ScenarioId::Crashy,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Standard => "standard",
            ScenarioId::Small => "small",
            ScenarioId::Lossless => "lossless",
            ScenarioId::Lossy => "lossy",
            ScenarioId::Crashy => "crashy",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Standard => "50000 nodes, fanout 5, 10-20ms delay, 10% drop, 0.1% crash",
            ScenarioId::Small => "10 nodes, fanout 3, fanin 4: membership quiescence",
            ScenarioId::Lossless => "100 nodes, fanout 4, fanin 5, 1ms delay, no faults: full coverage",
            ScenarioId::Lossy => "10000 nodes, 30% packet loss",
            ScenarioId::Crashy => "10000 nodes, 5% crash per processed message",
        }
    }

    /// Returns the preset configuration.
    pub fn config(&self) -> SimulationConfig {
        let base = SimulationConfig::default();
        match self {
            ScenarioId::Standard => base,
            ScenarioId::Small => base.with_population(10).with_degree(3, 4),
            ScenarioId::Lossless => base
                .with_population(100)
                .with_degree(4, 5)
                .with_delay(Duration::from_millis(1), Duration::from_millis(1) + Duration::from_nanos(1))
                .with_drop_rate(0.0)
                .with_crash_rate(0.0),
            ScenarioId::Lossy => base.with_population(10_000).with_drop_rate(0.3),
            ScenarioId::Crashy => base.with_population(10_000).with_crash_rate(0.05),
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" | "default" => Ok(ScenarioId::Standard),
            "small" => Ok(ScenarioId::Small),
            "lossless" => Ok(ScenarioId::Lossless),
            "lossy" => Ok(ScenarioId::Lossy),
            "crashy" => Ok(ScenarioId::Crashy),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
