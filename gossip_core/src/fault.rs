//! Fault model: simulated latency, message loss and crash-stop decisions.

use crate::config::{ProbabilityMode, SimulationConfig};
use gossip_env::GossipContext;
use std::time::Duration;

/// A single probabilistic decision derived from a configured rate.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Roll {
    /// Fires when a uniform draw from `[0, 100)` lands below `percent`.
    Percent(u64),

    /// Fires when a uniform draw from `[0, 1)` lands below the rate.
    Unit(f64),
}

impl Roll {
    fn new(rate: f64, mode: ProbabilityMode) -> Self {
        match mode {
            // Truncation, not rounding: 0.009 becomes 0 and never fires.
            ProbabilityMode::Quantized => Roll::Percent((rate * 100.0) as u64),
            ProbabilityMode::Continuous => Roll::Unit(rate),
        }
    }

    fn fires<C: GossipContext + ?Sized>(self, ctx: &C) -> bool {
        match self {
            Roll::Percent(percent) => ctx.random_below(100) < percent,
            Roll::Unit(rate) => ctx.random_unit() < rate,
        }
    }
}

/// Derives randomized delay, drop and crash decisions from the config.
///
/// Holds no random state itself; every sample draws from the context's
/// shared source.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultModel {
    delay_low: Duration,
    delay_span_nanos: u64,
    drop: Roll,
    crash: Roll,
}

impl FaultModel {
    /// Builds the fault model for a validated configuration.
    pub fn new(config: &SimulationConfig) -> Self {
        let span = config.delay_high.saturating_sub(config.delay_low);
        Self {
            delay_low: config.delay_low,
            delay_span_nanos: u64::try_from(span.as_nanos()).unwrap_or(u64::MAX).max(1),
            drop: Roll::new(config.drop_rate, config.probability_mode),
            crash: Roll::new(config.crash_rate, config.probability_mode),
        }
    }

    /// Samples a network latency uniformly from `[delay_low, delay_high)`.
    pub fn sample_delay<C: GossipContext + ?Sized>(&self, ctx: &C) -> Duration {
        self.delay_low + Duration::from_nanos(ctx.random_below(self.delay_span_nanos))
    }

    /// Returns true if a message on one edge should be lost.
    pub fn sample_drop<C: GossipContext + ?Sized>(&self, ctx: &C) -> bool {
        self.drop.fires(ctx)
    }

    /// Returns true if the node processing a message should crash.
    pub fn sample_crash<C: GossipContext + ?Sized>(&self, ctx: &C) -> bool {
        self.crash.fires(ctx)
    }

    /// Effective whole-percent drop probability, if quantized.
    pub fn drop_percent(&self) -> Option<u64> {
        match self.drop {
            Roll::Percent(p) => Some(p),
            Roll::Unit(_) => None,
        }
    }

    /// Effective whole-percent crash probability, if quantized.
    pub fn crash_percent(&self) -> Option<u64> {
        match self.crash {
            Roll::Percent(p) => Some(p),
            Roll::Unit(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gossip_env::SeededContext;
    use proptest::prelude::*;

    const TRIALS: usize = 100_000;

    fn frequency(trials: usize, mut roll: impl FnMut() -> bool) -> f64 {
        let hits = (0..trials).filter(|_| roll()).count();
        hits as f64 / trials as f64
    }

    #[test]
    fn test_drop_rate_is_honored() {
        let ctx = SeededContext::new(42);
        let faults = FaultModel::new(&SimulationConfig::default().with_drop_rate(0.30));

        assert_eq!(faults.drop_percent(), Some(30));
        let observed = frequency(TRIALS, || faults.sample_drop(&ctx));
        assert!((0.27..=0.33).contains(&observed), "observed drop frequency {observed}");
    }

    #[test]
    fn test_sub_percent_crash_rate_never_fires() {
        let ctx = SeededContext::new(42);
        let faults = FaultModel::new(&SimulationConfig::default().with_crash_rate(0.001));

        assert_eq!(faults.crash_percent(), Some(0));
        let observed = frequency(TRIALS, || faults.sample_crash(&ctx));
        assert_eq!(observed, 0.0);
    }

    #[test]
    fn test_quantization_truncates() {
        let faults = FaultModel::new(
            &SimulationConfig::default().with_drop_rate(0.0999).with_crash_rate(0.019),
        );
        assert_eq!(faults.drop_percent(), Some(9));
        assert_eq!(faults.crash_percent(), Some(1));
    }

    #[test]
    fn test_continuous_mode_honors_small_rates() {
        let ctx = SeededContext::new(7);
        let config = SimulationConfig::default()
            .with_crash_rate(0.005)
            .with_probability_mode(ProbabilityMode::Continuous);
        let faults = FaultModel::new(&config);

        assert_eq!(faults.crash_percent(), None);
        let observed = frequency(TRIALS, || faults.sample_crash(&ctx));
        assert!((0.003..=0.007).contains(&observed), "observed crash frequency {observed}");
    }

    #[test]
    fn test_zero_rates_never_fire() {
        let ctx = SeededContext::new(1);
        let faults = FaultModel::new(&SimulationConfig::default().with_drop_rate(0.0).with_crash_rate(0.0));

        assert!((0..10_000).all(|_| !faults.sample_drop(&ctx) && !faults.sample_crash(&ctx)));
    }

    #[test]
    fn test_delay_covers_range() {
        let ctx = SeededContext::new(3);
        let ms = Duration::from_millis;
        let faults = FaultModel::new(&SimulationConfig::default().with_delay(ms(10), ms(20)));

        let samples: Vec<Duration> = (0..10_000).map(|_| faults.sample_delay(&ctx)).collect();
        assert!(samples.iter().all(|d| *d >= ms(10) && *d < ms(20)));
        assert!(samples.iter().any(|d| *d < ms(11)));
        assert!(samples.iter().any(|d| *d >= ms(19)));
    }

    proptest! {
        #[test]
        fn prop_delay_stays_in_bounds(seed in any::<u64>(), low in 0u64..10_000, span in 1u64..10_000) {
            let ctx = SeededContext::new(seed);
            let low = Duration::from_micros(low);
            let high = low + Duration::from_micros(span);
            let faults = FaultModel::new(&SimulationConfig::default().with_delay(low, high));

            for _ in 0..64 {
                let d = faults.sample_delay(&ctx);
                prop_assert!(d >= low && d < high);
            }
        }
    }
}
