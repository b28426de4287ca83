//! Simulated network: delayed, lossy delivery between node mailboxes.
//!
//! Every cross-node operation becomes a [`Delivery`] work item that is
//! scheduled as its own detached task: sleep for a sampled latency, then
//! push into the target's mailbox. The sending actor never waits on it.
//!
//! ```text
//! Node A                    Network                     Node B
//!   |                          |                           |
//!   |-- schedule(Grant) ------>|                           |
//!   |   (returns at once)      |-- [sampled latency] ----->|
//!   |                          |-- grants.send(A) -------->|-- handle
//! ```

use crate::config::SimulationConfig;
use crate::fault::FaultModel;
use crate::metrics::{Counter, Metrics};
use crate::registry::{Inbox, OverlayRegistry, Rumor};
use gossip_env::{GossipContext, NodeId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

/// A cross-node operation waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// `from` asks `to` for an edge.
    Grant { from: NodeId, to: NodeId },

    /// `from` tells `to` that the edge between them is gone.
    Revoke { from: NodeId, to: NodeId },

    /// A node reminds itself that it is still short of friends.
    NeedFriends { node: NodeId },

    /// `from` forwards the rumor to each of `friends`.
    Broadcast { from: NodeId, friends: Vec<NodeId> },
}

impl Delivery {
    fn name(&self) -> &'static str {
        match self {
            Delivery::Grant { .. } => "grant",
            Delivery::Revoke { .. } => "revoke",
            Delivery::NeedFriends { .. } => "need_friends",
            Delivery::Broadcast { .. } => "broadcast",
        }
    }

    fn pending_gauge(&self) -> Counter {
        match self {
            Delivery::Broadcast { .. } => Counter::PendingRumors,
            _ => Counter::PendingMembership,
        }
    }
}

/// Everything the actors share: registry, config, faults, metrics, context.
pub struct Network<C> {
    pub(crate) registry: OverlayRegistry,
    pub(crate) config: SimulationConfig,
    pub(crate) faults: FaultModel,
    pub(crate) metrics: Arc<Metrics>,
    pub(crate) ctx: Arc<C>,
}

impl<C: GossipContext> Network<C> {
    /// Allocates the registry for a validated configuration.
    pub fn new(config: SimulationConfig, ctx: Arc<C>, metrics: Arc<Metrics>) -> (Arc<Self>, Vec<Inbox>) {
        let (registry, inboxes) = OverlayRegistry::create(config.population_size, config.mailbox_capacity);
        let network = Self {
            registry,
            faults: FaultModel::new(&config),
            config,
            metrics,
            ctx,
        };
        (Arc::new(network), inboxes)
    }

    /// Spawns a detached task that delivers `delivery` after its delay.
    ///
    /// Network operations wait one sampled latency; a node's reminder to
    /// itself is delivered without delay. The matching pending gauge is
    /// raised before the task exists and lowered by whoever finishes the
    /// work.
    pub fn schedule(self: &Arc<Self>, delivery: Delivery) {
        let delay = match delivery {
            Delivery::NeedFriends { .. } => Duration::ZERO,
            _ => self.faults.sample_delay(self.ctx.as_ref()),
        };
        self.metrics.increment(delivery.pending_gauge());

        let network = Arc::clone(self);
        self.ctx.spawn(delivery.name(), async move {
            if !delay.is_zero() {
                network.ctx.sleep(delay).await;
            }
            network.deliver(delivery).await;
        });
    }

    /// Pushes a due delivery into its target mailboxes.
    ///
    /// A full mailbox suspends this task until the receiver makes room.
    async fn deliver(&self, delivery: Delivery) {
        match delivery {
            Delivery::Grant { from, to } => {
                if self.registry.lookup(to).grants.send(from).await.is_err() {
                    self.lost(Counter::PendingMembership, "grant", to);
                }
            }
            Delivery::Revoke { from, to } => {
                if self.registry.lookup(to).revokes.send(from).await.is_err() {
                    self.lost(Counter::PendingMembership, "revoke", to);
                }
            }
            Delivery::NeedFriends { node } => {
                if self.registry.lookup(node).need_friends.send(()).await.is_err() {
                    self.lost(Counter::PendingMembership, "need_friends", node);
                }
            }
            Delivery::Broadcast { from, friends } => {
                for friend in friends {
                    if self.faults.sample_drop(self.ctx.as_ref()) {
                        trace!(%from, to = %friend, "rumor dropped");
                        continue;
                    }
                    self.metrics.increment(Counter::PendingRumors);
                    if self.registry.lookup(friend).rumors.send(Rumor::Relay).await.is_err() {
                        self.lost(Counter::PendingRumors, "rumor", friend);
                    }
                }
                self.metrics.decrement(Counter::PendingRumors);
            }
        }
    }

    fn lost(&self, gauge: Counter, kind: &str, to: NodeId) {
        self.metrics.decrement(gauge);
        warn!(%to, kind, "mailbox closed, delivery lost");
    }
}
