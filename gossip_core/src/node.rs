//! NodeActor - the per-node membership and dissemination state machine.
//!
//! Each node runs as one tokio task that owns its friend list and its two
//! sticky flags outright. It handles one event at a time, picked at random
//! among whichever mailboxes are ready, so none of that state is shared or
//! locked. Everything a node sends goes out through
//! [`Network::schedule`](crate::network::Network::schedule) and never
//! blocks the loop.
//!
//! # Events
//!
//! | Mailbox        | Meaning                                   |
//! |----------------|-------------------------------------------|
//! | `grants`       | a peer wants an edge to this node         |
//! | `revokes`      | a peer dropped its edge to this node      |
//! | `need_friends` | this node is still below fanout           |
//! | `rumors`       | the rumor arrived, or this node originates it |
//! | `inspect`      | diagnostic snapshot request               |
//!
//! A crashed node ignores rumors but keeps answering membership events.

use crate::metrics::Counter;
use crate::network::{Delivery, Network};
use crate::registry::{Inbox, NodeSnapshot, Rumor};
use gossip_env::{GossipContext, NodeId};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// One dequeued mailbox item.
#[derive(Debug)]
enum Event {
    Grant(NodeId),
    Revoke(NodeId),
    NeedFriends,
    Rumor(Rumor),
    Inspect(oneshot::Sender<NodeSnapshot>),
}

/// A simulated node.
pub struct NodeActor<C> {
    id: NodeId,

    /// Outbound forwarding set; may hold duplicates
    friends: Vec<NodeId>,

    /// Set on first receipt of the rumor, never cleared
    received: bool,

    /// Set on crash, never cleared; stops dissemination only
    crashed: bool,

    network: Arc<Network<C>>,
}

impl<C: GossipContext> NodeActor<C> {
    /// Creates a node with no friends.
    pub fn new(id: NodeId, network: Arc<Network<C>>) -> Self {
        Self {
            id,
            friends: Vec::with_capacity(network.config.fanin),
            received: false,
            crashed: false,
            network,
        }
    }

    pub fn friends(&self) -> &[NodeId] {
        &self.friends
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id,
            friends: self.friends.clone(),
            received: self.received,
            crashed: self.crashed,
        }
    }

    /// Runs the event loop for the life of the process.
    pub async fn run(mut self, mut inbox: Inbox) {
        self.network.metrics.record_actor_started();
        trace!(node = %self.id, "actor started");

        loop {
            let event = tokio::select! {
                Some(from) = inbox.grants.recv() => Event::Grant(from),
                Some(from) = inbox.revokes.recv() => Event::Revoke(from),
                Some(()) = inbox.need_friends.recv() => Event::NeedFriends,
                Some(rumor) = inbox.rumors.recv() => Event::Rumor(rumor),
                Some(reply) = inbox.inspect.recv() => Event::Inspect(reply),
                else => break,
            };
            self.dispatch(event);
        }

        debug!(node = %self.id, "all mailboxes closed, actor exiting");
    }

    fn dispatch(&mut self, event: Event) {
        let pending = match event {
            Event::Grant(from) => {
                self.network.metrics.record_grant();
                self.on_grant(from);
                Counter::PendingMembership
            }
            Event::Revoke(from) => {
                self.network.metrics.record_revoke();
                self.on_revoke(from);
                Counter::PendingMembership
            }
            Event::NeedFriends => {
                self.on_need_friends();
                Counter::PendingMembership
            }
            Event::Rumor(rumor) => {
                self.on_rumor(rumor);
                Counter::PendingRumors
            }
            Event::Inspect(reply) => {
                let _ = reply.send(self.snapshot());
                return;
            }
        };
        // Lowered only after any follow-up work has raised its own count.
        self.network.metrics.decrement(pending);
    }

    /// `from` wants an edge to this node.
    ///
    /// Accepts while below fanin; at capacity, a random current friend is
    /// overwritten by `from` and told via a revoke.
    fn on_grant(&mut self, from: NodeId) {
        if self.friends.len() < self.network.config.fanin {
            self.friends.push(from);
            return;
        }

        let slot = self.network.ctx.random_below(self.friends.len() as u64) as usize;
        let victim = std::mem::replace(&mut self.friends[slot], from);
        debug!(node = %self.id, %from, %victim, "at fanin, evicting");
        self.network.schedule(Delivery::Revoke { from: self.id, to: victim });
    }

    /// `evicted` dropped us; drop it too, and repair if that leaves us short.
    fn on_revoke(&mut self, evicted: NodeId) {
        let Some(slot) = self.friends.iter().position(|f| *f == evicted) else {
            return;
        };

        if self.friends.len() > self.network.config.fanout {
            self.friends.remove(slot);
            return;
        }

        let replacement = self.network.registry.random_peer(self.network.ctx.as_ref(), &[self.id, evicted]);
        self.friends[slot] = replacement;
        trace!(node = %self.id, %evicted, %replacement, "repairing edge");
        self.network.schedule(Delivery::Grant { from: self.id, to: replacement });
    }

    /// Adds one random friend, and asks again later if still short.
    fn on_need_friends(&mut self) {
        if self.friends.len() >= self.network.config.fanout {
            return;
        }

        let peer = self.network.registry.random_peer(self.network.ctx.as_ref(), &[self.id]);
        self.friends.push(peer);
        self.network.schedule(Delivery::Grant { from: self.id, to: peer });

        if self.friends.len() < self.network.config.fanout {
            self.network.schedule(Delivery::NeedFriends { node: self.id });
        }
    }

    fn on_rumor(&mut self, rumor: Rumor) {
        if self.crashed {
            return;
        }

        match rumor {
            // The origin only forwards; it counts as reached once a
            // relayed copy comes back to it.
            Rumor::Originate => {
                debug!(node = %self.id, "originating broadcast");
                self.broadcast();
            }
            Rumor::Relay => {
                self.network.metrics.record_message();

                if self.network.faults.sample_crash(self.network.ctx.as_ref()) {
                    self.crashed = true;
                    self.network.metrics.record_crash();
                    debug!(node = %self.id, "crashed");
                    return;
                }
                if self.received {
                    return;
                }
                self.received = true;
                self.network.metrics.record_first_receipt();
                self.broadcast();
            }
        }
    }

    /// Forwards the rumor to the current friends after one shared delay.
    ///
    /// Targets are fixed when the broadcast is scheduled; membership
    /// changes during the delay do not redirect it.
    fn broadcast(&self) {
        self.network.schedule(Delivery::Broadcast {
            from: self.id,
            friends: self.friends.clone(),
        });
    }
}
