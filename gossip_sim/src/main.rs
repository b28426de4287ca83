//! Gossip overlay simulator CLI
//!
//! Builds the overlay, waits for membership to settle, broadcasts one rumor
//! and reports coverage.

use clap::Parser;
use gossip_core::{ProbabilityMode, SimulationConfig};
use gossip_env::{GossipContext, SeededContext, TokioContext};
use gossip_sim::{RunReport, ScenarioId, SimError, SimulationRunner};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Gossip overlay simulator
#[derive(Parser, Debug)]
#[command(name = "gossip-sim")]
#[command(about = "Simulate overlay membership and epidemic broadcast under faults", long_about = None)]
struct Args {
    /// Parameter preset (standard, small, lossless, lossy, crashy)
    #[arg(short = 'S', long, default_value = "standard")]
    scenario: ScenarioId,

    /// Population size
    #[arg(short, long)]
    nodes: Option<usize>,

    /// Target outbound friends per node
    #[arg(long)]
    fanout: Option<usize>,

    /// Friend capacity before eviction (default fanout+1)
    #[arg(long)]
    fanin: Option<usize>,

    /// Minimum per-hop delay in milliseconds
    #[arg(long)]
    delay_low: Option<u64>,

    /// Maximum per-hop delay in milliseconds (exclusive)
    #[arg(long)]
    delay_high: Option<u64>,

    /// Probability that a relayed rumor is lost
    #[arg(long)]
    drop_rate: Option<f64>,

    /// Probability that processing a rumor crashes the node
    #[arg(long)]
    crash_rate: Option<f64>,

    /// Compare rates as continuous probabilities instead of whole percents
    #[arg(long)]
    continuous: bool,

    /// Seed the random source (unseeded when absent)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Sampling interval in milliseconds
    #[arg(long, default_value = "10")]
    sample_interval: u64,

    /// Consecutive churn-free windows that declare quiescence
    #[arg(long, default_value = "1")]
    quiet_windows: u32,

    /// Coverage fraction that ends the broadcast phase
    #[arg(long, default_value = "0.99")]
    coverage_target: f64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Write the run report to a JSON file
    #[arg(long)]
    export: Option<String>,
}

impl Args {
    /// Starts from the scenario preset and applies explicit overrides.
    fn resolve_config(&self) -> SimulationConfig {
        let mut config = self.scenario.config();
        if let Some(nodes) = self.nodes {
            config.population_size = nodes;
        }
        if let Some(fanout) = self.fanout {
            config.fanout = fanout;
            config.fanin = fanout.saturating_add(1);
        }
        if let Some(fanin) = self.fanin {
            config.fanin = fanin;
        }
        if let Some(low) = self.delay_low {
            config.delay_low = Duration::from_millis(low);
        }
        if let Some(high) = self.delay_high {
            config.delay_high = Duration::from_millis(high);
        }
        if let Some(rate) = self.drop_rate {
            config.drop_rate = rate;
        }
        if let Some(rate) = self.crash_rate {
            config.crash_rate = rate;
        }
        if self.continuous {
            config.probability_mode = ProbabilityMode::Continuous;
        }
        config
    }

    fn runner(&self) -> SimulationRunner {
        SimulationRunner::new(self.resolve_config())
            .with_scenario(self.scenario.name())
            .with_sample_interval(Duration::from_millis(self.sample_interval))
            .with_quiet_windows(self.quiet_windows)
            .with_coverage_target(self.coverage_target)
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = FmtSubscriber::builder().with_env_filter(filter);

    // Keep stdout clean for the JSON report.
    let result = if json {
        tracing::subscriber::set_global_default(builder.with_writer(std::io::stderr).finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

async fn run<C: GossipContext>(args: &Args, runner: SimulationRunner, ctx: Arc<C>) -> Result<RunReport, SimError> {
    let report = runner.run(ctx).await?;

    if args.json {
        println!("{}", report.to_json()?);
    }
    if let Some(path) = &args.export {
        report.write_to_file(path)?;
        info!("Exported report to {}", path);
    }
    Ok(report)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose, args.json);

    let runner = args.runner();
    if let Err(e) = runner.validate() {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }

    info!("Gossip overlay simulator v{}", env!("CARGO_PKG_VERSION"));
    info!("scenario: {} ({})", args.scenario, args.scenario.description());
    for line in runner.config().to_string().lines() {
        info!("{}", line);
    }

    let result = match args.seed {
        Some(seed) => run(&args, runner, SeededContext::shared(seed)).await,
        None => run(&args, runner, TokioContext::shared()).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("gossip-sim").chain(argv.iter().copied()))
    }

    #[test]
    fn test_defaults_match_standard_preset() {
        let config = parse(&[]).resolve_config();
        assert_eq!(config.population_size, 50_000);
        assert_eq!((config.fanout, config.fanin), (5, 6));
        assert_eq!(config.delay_low, Duration::from_millis(10));
        assert_eq!(config.delay_high, Duration::from_millis(20));
        assert_eq!(config.probability_mode, ProbabilityMode::Quantized);
    }

    #[test]
    fn test_fanin_follows_fanout_unless_given() {
        let config = parse(&["--fanout", "8"]).resolve_config();
        assert_eq!((config.fanout, config.fanin), (8, 9));

        let config = parse(&["--fanout", "8", "--fanin", "12"]).resolve_config();
        assert_eq!((config.fanout, config.fanin), (8, 12));
    }

    #[test]
    fn test_overrides_apply_on_top_of_scenario() {
        let args = parse(&["-S", "lossless", "-n", "200", "--drop-rate", "0.2", "--continuous"]);
        let config = args.resolve_config();
        assert_eq!(config.population_size, 200);
        assert_eq!((config.fanout, config.fanin), (4, 5));
        assert_eq!(config.drop_rate, 0.2);
        assert_eq!(config.probability_mode, ProbabilityMode::Continuous);
    }

    #[test]
    fn test_invalid_parameters_exit_with_config_code() {
        let err = parse(&["-n", "1"]).runner().validate().unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = parse(&["--coverage-target", "2"]).runner().validate().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
