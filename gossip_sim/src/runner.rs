//! Simulation runner - drives one overlay through both convergence phases.
//!
//! The runner only observes: it starts the overlay, samples the shared
//! counters at a fixed interval, and decides when each phase is over.

use crate::error::SimError;
use crate::exporter::{
    millis, BroadcastPhase, ChurnSample, ConfigSummary, CoverageSample, MembershipPhase, RunReport,
};
use gossip_core::{Counter, DegreeStats, Overlay, SimulationConfig};
use gossip_env::{GossipContext, NodeId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sampling period used by the CLI.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// Coverage fraction that ends the broadcast phase.
pub const DEFAULT_COVERAGE_TARGET: f64 = 0.99;

/// Runs a configured overlay to membership quiescence, then broadcasts.
#[derive(Debug, Clone)]
pub struct SimulationRunner {
    /// Overlay parameters
    config: SimulationConfig,

    /// Preset name recorded in the report
    scenario: String,

    /// Time between counter samples
    sample_interval: Duration,

    /// Consecutive churn-free windows required for quiescence
    quiet_windows: u32,

    /// Fraction of the population that must hold the rumor
    coverage_target: f64,

    /// Fixed broadcast origin; random when unset
    origin: Option<NodeId>,
}

impl SimulationRunner {
    /// Creates a new runner.
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            scenario: "custom".to_string(),
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            quiet_windows: 1,
            coverage_target: DEFAULT_COVERAGE_TARGET,
            origin: None,
        }
    }

    /// Sets the scenario label.
    pub fn with_scenario(mut self, name: impl Into<String>) -> Self {
        self.scenario = name.into();
        self
    }

    /// Sets the sampling interval.
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Sets how many quiet windows in a row end the membership phase.
    pub fn with_quiet_windows(mut self, windows: u32) -> Self {
        self.quiet_windows = windows;
        self
    }

    /// Sets the coverage target.
    pub fn with_coverage_target(mut self, target: f64) -> Self {
        self.coverage_target = target;
        self
    }

    /// Broadcasts from `origin` instead of a random node.
    pub fn with_origin(mut self, origin: NodeId) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Checks the overlay parameters and the runner's own settings.
    pub fn validate(&self) -> Result<(), SimError> {
        self.config.validate()?;
        if self.sample_interval.is_zero() {
            return Err(SimError::Settings("sample interval must be positive".to_string()));
        }
        if self.quiet_windows == 0 {
            return Err(SimError::Settings("quiet windows must be at least 1".to_string()));
        }
        if !(self.coverage_target > 0.0 && self.coverage_target <= 1.0) {
            return Err(SimError::Settings(format!(
                "coverage target {} must be in (0, 1]",
                self.coverage_target
            )));
        }
        Ok(())
    }

    /// Runs both phases and returns the report.
    pub async fn run<C: GossipContext>(&self, ctx: Arc<C>) -> Result<RunReport, SimError> {
        self.validate()?;
        let seed = ctx.seed();

        let overlay = Overlay::start(self.config.clone(), ctx)?;
        let membership = self.await_membership(&overlay).await?;
        let broadcast = self.broadcast(&overlay).await?;
        let totals = overlay.metrics().snapshot();

        info!(
            "Total message {} Total Crashed {}",
            totals.messages_processed, totals.crashes
        );

        Ok(RunReport {
            scenario: self.scenario.clone(),
            seed,
            config: ConfigSummary::from(&self.config),
            coverage_target: self.coverage_target,
            membership,
            broadcast,
            totals,
        })
    }

    /// Samples churn until the overlay stops changing.
    ///
    /// A window counts as quiet only when it saw no grants or revokes, every
    /// actor has started, and no membership event is still in flight.
    pub async fn await_membership<C: GossipContext>(
        &self,
        overlay: &Overlay<C>,
    ) -> Result<MembershipPhase, SimError> {
        info!("=== Constructing Overlay ===");
        let ctx = overlay.context();
        let metrics = overlay.metrics();
        let population = overlay.population() as u64;
        let start = ctx.now();

        let mut samples = Vec::new();
        let mut quiet = 0;
        loop {
            ctx.sleep(self.sample_interval).await;

            let window = metrics.take_churn_window();
            let started = metrics.load(Counter::ActorsStarted);
            let pending = metrics.load(Counter::PendingMembership);
            let elapsed = ctx.now().saturating_sub(start);

            info!("break {} makeup {} elapsed {:?}", window.revokes, window.grants, elapsed);
            debug!(started, pending, "membership window");
            samples.push(ChurnSample {
                elapsed_ms: millis(elapsed),
                grants: window.grants,
                revokes: window.revokes,
            });

            if window.is_quiet() && started == population && pending == 0 {
                quiet += 1;
                if quiet >= self.quiet_windows {
                    break;
                }
            } else {
                quiet = 0;
            }
        }

        let elapsed = ctx.now().saturating_sub(start);
        info!("--- Took {:?} to stabilize ---", elapsed);

        let snapshots = overlay.inspect_all().await?;
        let degrees = DegreeStats::from_snapshots(&snapshots);
        debug!(
            "degree min={} max={} mean={:.2} self_loops={}",
            degrees.min, degrees.max, degrees.mean, degrees.self_loops
        );

        Ok(MembershipPhase {
            elapsed_ms: millis(elapsed),
            samples,
            degrees,
        })
    }

    /// Triggers one broadcast and samples coverage until the target is met.
    ///
    /// Ends early, flagged as stalled, when no rumor work is left anywhere
    /// and coverage is still short of the target.
    pub async fn broadcast<C: GossipContext>(
        &self,
        overlay: &Overlay<C>,
    ) -> Result<BroadcastPhase, SimError> {
        info!("=== Broadcast one message ===");
        let ctx = overlay.context();
        let metrics = overlay.metrics();
        let population = overlay.population() as f64;

        let origin = self.origin.unwrap_or_else(|| overlay.random_origin());
        let start = ctx.now();
        overlay.trigger_broadcast(origin).await?;

        let mut samples = Vec::new();
        let (coverage, stalled) = loop {
            ctx.sleep(self.sample_interval).await;

            // Gauge first: once it reads zero, the receipt count is final.
            let pending = metrics.load(Counter::PendingRumors);
            let reached = metrics.load(Counter::FirstReceipts);
            let coverage = reached as f64 / population;
            let elapsed = ctx.now().saturating_sub(start);

            info!("{:.2}% covered, took {:?}", coverage * 100.0, elapsed);
            samples.push(CoverageSample {
                elapsed_ms: millis(elapsed),
                reached,
                coverage,
            });

            if coverage >= self.coverage_target {
                break (coverage, false);
            }
            if pending == 0 {
                warn!(
                    reached,
                    "broadcast stalled at {:.2}% with no rumors in flight",
                    coverage * 100.0
                );
                break (coverage, true);
            }
        };

        let elapsed = ctx.now().saturating_sub(start);
        if !stalled {
            info!(
                "--- Took {:?} to get {}% ---",
                elapsed,
                self.coverage_target * 100.0
            );
        }

        Ok(BroadcastPhase {
            origin,
            elapsed_ms: millis(elapsed),
            coverage,
            reached_target: !stalled,
            stalled,
            samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::ScenarioId;
    use gossip_env::SeededContext;

    #[tokio::test(start_paused = true)]
    async fn test_small_scenario_reaches_quiescence() {
        let runner = SimulationRunner::new(ScenarioId::Small.config()).with_quiet_windows(3);
        let overlay = Overlay::start(runner.config().clone(), SeededContext::shared(10)).unwrap();

        let phase = runner.await_membership(&overlay).await.unwrap();

        assert_eq!(overlay.metrics().load(Counter::ActorsStarted), 10);
        let tail = &phase.samples[phase.samples.len() - 3..];
        assert!(tail.iter().all(|s| s.grants == 0 && s.revokes == 0));
        assert_eq!(phase.degrees.nodes, 10);
        assert_eq!(phase.degrees.self_loops, 0);
        assert!(phase.degrees.min >= 3 && phase.degrees.max <= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lossless_scenario_covers_everyone() {
        let report = SimulationRunner::new(ScenarioId::Lossless.config())
            .with_scenario("lossless")
            .with_coverage_target(1.0)
            .with_origin(NodeId(0))
            .run(SeededContext::shared(2024))
            .await
            .unwrap();

        assert_eq!(report.seed, Some(2024));
        assert_eq!(report.broadcast.origin, NodeId(0));
        assert!(report.broadcast.reached_target);
        assert!(!report.broadcast.stalled);
        assert_eq!(report.totals.first_receipts, 100);
        assert_eq!(report.totals.actors_started, 100);
        assert_eq!(report.totals.crashes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_loss_stalls_broadcast() {
        let config = ScenarioId::Small.config().with_drop_rate(0.99).with_crash_rate(0.0);
        let report = SimulationRunner::new(config)
            .run(SeededContext::shared(8))
            .await
            .unwrap();

        assert!(report.broadcast.stalled);
        assert!(!report.broadcast.reached_target);
        assert!(report.broadcast.coverage < 0.99);
        assert!(report.totals.first_receipts < 10);
        assert_eq!(report.broadcast.coverage, report.totals.first_receipts as f64 / 10.0);
        assert_eq!(report.totals.pending_rumors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_bad_settings() {
        let base = || SimulationRunner::new(ScenarioId::Small.config());
        let ctx = SeededContext::shared(1);

        for runner in [
            base().with_coverage_target(0.0),
            base().with_coverage_target(1.5),
            base().with_coverage_target(f64::NAN),
            base().with_quiet_windows(0),
            base().with_sample_interval(Duration::ZERO),
        ] {
            let err = runner.run(Arc::clone(&ctx)).await.unwrap_err();
            assert!(matches!(err, SimError::Settings(_)), "{err}");
            assert_eq!(err.exit_code(), 2);
        }

        let err = SimulationRunner::new(ScenarioId::Small.config().with_degree(9, 10))
            .run(ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }
}
