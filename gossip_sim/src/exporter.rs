//! JSON run report.
//!
//! Captures the resolved parameters, both convergence phases and the final
//! counter totals so a run can be compared against another offline.

use crate::error::SimError;
use gossip_core::{DegreeStats, MetricsSnapshot, ProbabilityMode, SimulationConfig};
use gossip_env::NodeId;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Resolved parameters, with durations in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub nodes: usize,
    pub fanout: usize,
    pub fanin: usize,
    pub delay_low_ms: f64,
    pub delay_high_ms: f64,
    pub drop_rate: f64,
    pub crash_rate: f64,
    pub mailbox_capacity: usize,
    pub continuous: bool,
}

impl From<&SimulationConfig> for ConfigSummary {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            nodes: config.population_size,
            fanout: config.fanout,
            fanin: config.fanin,
            delay_low_ms: millis(config.delay_low),
            delay_high_ms: millis(config.delay_high),
            drop_rate: config.drop_rate,
            crash_rate: config.crash_rate,
            mailbox_capacity: config.mailbox_capacity,
            continuous: config.probability_mode == ProbabilityMode::Continuous,
        }
    }
}

/// Membership churn seen in one sampling window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnSample {
    pub elapsed_ms: f64,
    pub grants: u64,
    pub revokes: u64,
}

/// Broadcast coverage at one sampling instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageSample {
    pub elapsed_ms: f64,
    pub reached: u64,
    pub coverage: f64,
}

/// Outcome of the membership construction phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipPhase {
    pub elapsed_ms: f64,
    pub samples: Vec<ChurnSample>,
    pub degrees: DegreeStats,
}

/// Outcome of the broadcast phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastPhase {
    pub origin: NodeId,
    pub elapsed_ms: f64,
    pub coverage: f64,
    pub reached_target: bool,
    /// No rumor work was left while coverage was still below target
    pub stalled: bool,
    pub samples: Vec<CoverageSample>,
}

/// Complete simulation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Scenario preset the parameters started from
    pub scenario: String,

    /// Seed, if the run used a seeded random source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    pub config: ConfigSummary,
    pub coverage_target: f64,
    pub membership: MembershipPhase,
    pub broadcast: BroadcastPhase,
    pub totals: MetricsSnapshot,
}

impl RunReport {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

pub(crate) fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        let config = SimulationConfig::default().with_population(10).with_degree(3, 4);
        RunReport {
            scenario: "small".to_string(),
            seed: None,
            config: ConfigSummary::from(&config),
            coverage_target: 0.99,
            membership: MembershipPhase {
                elapsed_ms: 40.0,
                samples: vec![ChurnSample { elapsed_ms: 10.0, grants: 12, revokes: 2 }],
                degrees: DegreeStats::default(),
            },
            broadcast: BroadcastPhase {
                origin: NodeId(4),
                elapsed_ms: 30.0,
                coverage: 1.0,
                reached_target: true,
                stalled: false,
                samples: Vec::new(),
            },
            totals: MetricsSnapshot::default(),
        }
    }

    #[test]
    fn test_config_summary_uses_milliseconds() {
        let summary = ConfigSummary::from(&SimulationConfig::default());
        assert_eq!(summary.delay_low_ms, 10.0);
        assert_eq!(summary.delay_high_ms, 20.0);
        assert!(!summary.continuous);
    }

    #[test]
    fn test_unseeded_report_omits_seed() {
        let json = report().to_json().unwrap();
        assert!(!json.contains("\"seed\""));
        assert!(json.contains("\"origin\": 4"));

        let mut seeded = report();
        seeded.seed = Some(9);
        assert!(seeded.to_json().unwrap().contains("\"seed\": 9"));
    }

    #[test]
    fn test_write_to_file() {
        let path = std::env::temp_dir().join(format!("gossip-report-{}.json", std::process::id()));
        report().write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: RunReport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.scenario, "small");
        assert_eq!(parsed.config.nodes, 10);
        std::fs::remove_file(&path).unwrap();
    }
}
