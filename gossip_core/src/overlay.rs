//! Overlay lifecycle: build the registry, launch every node, seed the rumor.

use crate::config::SimulationConfig;
use crate::error::OverlayError;
use crate::metrics::{Counter, Metrics};
use crate::network::Network;
use crate::node::NodeActor;
use crate::registry::{NodeSnapshot, Rumor};
use gossip_env::{GossipContext, NodeId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

/// Handle to a running overlay.
///
/// The nodes keep running for the life of the process; dropping the handle
/// does not stop them.
pub struct Overlay<C> {
    network: Arc<Network<C>>,
}

impl<C: GossipContext> Overlay<C> {
    /// Validates `config`, creates every node and starts its actor.
    ///
    /// Each node's first event is a queued need-more-friends request, so
    /// membership construction begins immediately. Must be called from
    /// within a tokio runtime.
    pub fn start(config: SimulationConfig, ctx: Arc<C>) -> Result<Self, OverlayError> {
        config.validate()?;

        let metrics = Metrics::new();
        let (network, inboxes) = Network::new(config, ctx, metrics);

        for (index, inbox) in inboxes.into_iter().enumerate() {
            let id = NodeId::from_index(index);
            network.metrics.increment(Counter::PendingMembership);
            network
                .registry
                .lookup(id)
                .need_friends
                .try_send(())
                .map_err(|_| OverlayError::NodeUnavailable(id))?;

            let actor = NodeActor::new(id, Arc::clone(&network));
            network.ctx.spawn("node", actor.run(inbox));
        }

        info!(
            nodes = network.config.population_size,
            fanout = network.config.fanout,
            fanin = network.config.fanin,
            "overlay started"
        );
        Ok(Self { network })
    }

    /// Asks `origin` to start disseminating the rumor.
    ///
    /// The origin forwards to its friends without marking itself reached;
    /// it is counted only when a relayed copy returns to it. A crashed
    /// origin ignores the request.
    pub async fn trigger_broadcast(&self, origin: NodeId) -> Result<(), OverlayError> {
        let handle = self.network.registry.get(origin)?;
        self.network.metrics.increment(Counter::PendingRumors);
        if handle.rumors.send(Rumor::Originate).await.is_err() {
            self.network.metrics.decrement(Counter::PendingRumors);
            return Err(OverlayError::NodeUnavailable(origin));
        }
        info!(%origin, "broadcast triggered");
        Ok(())
    }

    /// Picks a uniformly random node to originate the broadcast.
    pub fn random_origin(&self) -> NodeId {
        self.network.registry.random_peer(self.network.ctx.as_ref(), &[])
    }

    /// Reads one node's state through its inspection mailbox.
    pub async fn inspect(&self, id: NodeId) -> Result<NodeSnapshot, OverlayError> {
        let handle = self.network.registry.get(id)?;
        let (tx, rx) = oneshot::channel();
        handle.inspect.send(tx).await.map_err(|_| OverlayError::NodeUnavailable(id))?;
        rx.await.map_err(|_| OverlayError::NodeUnavailable(id))
    }

    /// Reads every node's state, in id order.
    pub async fn inspect_all(&self) -> Result<Vec<NodeSnapshot>, OverlayError> {
        let mut snapshots = Vec::with_capacity(self.population());
        for handle in self.network.registry.iter() {
            snapshots.push(self.inspect(handle.id()).await?);
        }
        Ok(snapshots)
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.network.metrics
    }

    pub fn context(&self) -> &Arc<C> {
        &self.network.ctx
    }

    pub fn population(&self) -> usize {
        self.network.registry.len()
    }
}

/// Out-degree summary of an overlay snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DegreeStats {
    pub nodes: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    /// Nodes listing themselves as a friend
    pub self_loops: usize,
    /// Friend entries repeated within one node's list
    pub duplicate_edges: usize,
    pub crashed: usize,
    pub received: usize,
}

impl DegreeStats {
    pub fn from_snapshots(snapshots: &[NodeSnapshot]) -> Self {
        if snapshots.is_empty() {
            return Self::default();
        }

        let degrees = snapshots.iter().map(|s| s.friends.len());
        let total: usize = degrees.clone().sum();

        let duplicate_edges = snapshots
            .iter()
            .map(|s| {
                let mut sorted = s.friends.clone();
                sorted.sort_unstable();
                sorted.windows(2).filter(|w| w[0] == w[1]).count()
            })
            .sum();

        Self {
            nodes: snapshots.len(),
            min: degrees.clone().min().unwrap_or(0),
            max: degrees.max().unwrap_or(0),
            mean: total as f64 / snapshots.len() as f64,
            self_loops: snapshots.iter().filter(|s| s.friends.contains(&s.id)).count(),
            duplicate_edges,
            crashed: snapshots.iter().filter(|s| s.crashed).count(),
            received: snapshots.iter().filter(|s| s.received).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gossip_env::SeededContext;
    use std::time::Duration;

    /// Polls until no membership work is queued anywhere.
    async fn settle<C: GossipContext>(overlay: &Overlay<C>) {
        let metrics = overlay.metrics();
        loop {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let snap = metrics.snapshot();
            if snap.actors_started == overlay.population() as u64 && snap.pending_membership == 0 {
                return;
            }
        }
    }

    fn config(population: usize) -> SimulationConfig {
        SimulationConfig::default()
            .with_population(population)
            .with_degree(4, 5)
            .with_delay(Duration::from_millis(1), Duration::from_millis(3))
            .with_drop_rate(0.0)
            .with_crash_rate(0.0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rejects_invalid_config() {
        let result = Overlay::start(config(5), SeededContext::shared(1));
        assert!(matches!(result, Err(OverlayError::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_membership_settles_within_degree_bounds() {
        let overlay = Overlay::start(config(60), SeededContext::shared(42)).unwrap();
        settle(&overlay).await;

        let snapshots = overlay.inspect_all().await.unwrap();
        let stats = DegreeStats::from_snapshots(&snapshots);

        assert_eq!(stats.nodes, 60);
        assert_eq!(stats.self_loops, 0);
        assert!(stats.min >= 4, "min degree {}", stats.min);
        assert!(stats.max <= 5, "max degree {}", stats.max);
        assert_eq!(overlay.metrics().load(Counter::ActorsStarted), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_broadcast_rejects_unknown_node() {
        let overlay = Overlay::start(config(10), SeededContext::shared(3)).unwrap();

        let err = overlay.trigger_broadcast(NodeId(10)).await.unwrap_err();
        assert!(matches!(err, OverlayError::UnknownNode { population: 10, .. }));
        assert_eq!(overlay.metrics().load(Counter::PendingRumors), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lossless_broadcast_reaches_everyone() {
        let overlay = Overlay::start(config(100), SeededContext::shared(7)).unwrap();
        settle(&overlay).await;

        overlay.trigger_broadcast(NodeId(0)).await.unwrap();
        let metrics = overlay.metrics();
        let mut hops = 0;
        while metrics.load(Counter::PendingRumors) > 0 {
            tokio::time::sleep(Duration::from_millis(3)).await;
            hops += 1;
            assert!(hops < 200, "dissemination did not finish");
        }

        let snap = metrics.snapshot();
        assert_eq!(snap.first_receipts, 100);
        assert_eq!(snap.crashes, 0);
        assert!(snap.messages_processed >= 99);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inspect_reports_origin_state() {
        let overlay = Overlay::start(config(20), SeededContext::shared(5)).unwrap();
        settle(&overlay).await;

        overlay.trigger_broadcast(NodeId(3)).await.unwrap();
        while overlay.metrics().load(Counter::PendingRumors) > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        // Reached only through a copy relayed back by a peer.
        let snap = overlay.inspect(NodeId(3)).await.unwrap();
        assert_eq!(snap.id, NodeId(3));
        assert!(snap.received);
        assert!(!snap.crashed);
        assert_eq!(overlay.metrics().load(Counter::FirstReceipts), 20);
    }

    #[test]
    fn test_degree_stats_counts() {
        let snapshots = vec![
            NodeSnapshot { id: NodeId(0), friends: vec![NodeId(1), NodeId(1)], received: true, crashed: false },
            NodeSnapshot { id: NodeId(1), friends: vec![NodeId(1), NodeId(0), NodeId(2)], received: false, crashed: true },
        ];

        let stats = DegreeStats::from_snapshots(&snapshots);
        assert_eq!(stats.min, 2);
        assert_eq!(stats.max, 3);
        assert!((stats.mean - 2.5).abs() < 1e-9);
        assert_eq!(stats.self_loops, 1);
        assert_eq!(stats.duplicate_edges, 1);
        assert_eq!(stats.crashed, 1);
        assert_eq!(stats.received, 1);
    }
}
