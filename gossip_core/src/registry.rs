//! Overlay registry: the fixed id-to-mailbox table every node sends through.

use crate::error::OverlayError;
use gossip_env::{GossipContext, NodeId};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// A rumor event on a node's message mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rumor {
    /// The harness asks this node to start the broadcast.
    Originate,

    /// A copy forwarded by a neighbor.
    Relay,
}

/// A node's state as seen through the inspection mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub friends: Vec<NodeId>,
    pub received: bool,
    pub crashed: bool,
}

/// Sending half of a node's mailboxes.
///
/// Cloning a handle is cheap; every clone feeds the same node.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    id: NodeId,
    pub(crate) grants: mpsc::Sender<NodeId>,
    pub(crate) revokes: mpsc::Sender<NodeId>,
    pub(crate) need_friends: mpsc::Sender<()>,
    pub(crate) rumors: mpsc::Sender<Rumor>,
    pub(crate) inspect: mpsc::Sender<oneshot::Sender<NodeSnapshot>>,
}

impl NodeHandle {
    /// Returns the id of the node behind this handle.
    pub fn id(&self) -> NodeId {
        self.id
    }
}

/// Receiving half of a node's mailboxes, owned by its actor.
#[derive(Debug)]
pub struct Inbox {
    pub(crate) grants: mpsc::Receiver<NodeId>,
    pub(crate) revokes: mpsc::Receiver<NodeId>,
    pub(crate) need_friends: mpsc::Receiver<()>,
    pub(crate) rumors: mpsc::Receiver<Rumor>,
    pub(crate) inspect: mpsc::Receiver<oneshot::Sender<NodeSnapshot>>,
}

/// Creates one node's bounded mailboxes.
pub fn mailbox(id: NodeId, capacity: usize) -> (NodeHandle, Inbox) {
    let (grants_tx, grants_rx) = mpsc::channel(capacity);
    let (revokes_tx, revokes_rx) = mpsc::channel(capacity);
    let (need_tx, need_rx) = mpsc::channel(capacity);
    let (rumors_tx, rumors_rx) = mpsc::channel(capacity);
    let (inspect_tx, inspect_rx) = mpsc::channel(capacity);

    let handle = NodeHandle {
        id,
        grants: grants_tx,
        revokes: revokes_tx,
        need_friends: need_tx,
        rumors: rumors_tx,
        inspect: inspect_tx,
    };
    let inbox = Inbox {
        grants: grants_rx,
        revokes: revokes_rx,
        need_friends: need_rx,
        rumors: rumors_rx,
        inspect: inspect_rx,
    };
    (handle, inbox)
}

/// Fixed table of node handles indexed by id.
///
/// Built once before any actor runs and never resized, so concurrent
/// lookups need no synchronization.
#[derive(Debug)]
pub struct OverlayRegistry {
    nodes: Box<[NodeHandle]>,
}

impl OverlayRegistry {
    /// Allocates `population` nodes with empty mailboxes.
    ///
    /// Returns the registry plus the inboxes, in id order, for the caller
    /// to hand to actors.
    pub fn create(population: usize, capacity: usize) -> (Self, Vec<Inbox>) {
        let (nodes, inboxes): (Vec<_>, Vec<_>) = (0..population)
            .map(|index| mailbox(NodeId::from_index(index), capacity))
            .unzip();

        (Self { nodes: nodes.into_boxed_slice() }, inboxes)
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the handle for an id.
    ///
    /// # Panics
    /// Panics on an id outside the population. Ids produced inside the
    /// simulation are always in range.
    pub fn lookup(&self, id: NodeId) -> &NodeHandle {
        &self.nodes[id.index()]
    }

    /// Returns the handle for an id supplied from outside the simulation.
    pub fn get(&self, id: NodeId) -> Result<&NodeHandle, OverlayError> {
        self.nodes.get(id.index()).ok_or(OverlayError::UnknownNode {
            id,
            population: self.nodes.len(),
        })
    }

    /// Iterates over all handles in id order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeHandle> {
        self.nodes.iter()
    }

    /// Picks a node uniformly among those not in `exclude`.
    ///
    /// Draws once and skips over the excluded ids, so it never retries.
    ///
    /// # Panics
    /// Panics if `exclude` covers the whole population.
    pub fn random_peer<C: GossipContext + ?Sized>(&self, ctx: &C, exclude: &[NodeId]) -> NodeId {
        let mut excluded: Vec<u64> = exclude.iter().map(|id| u64::from(id.0)).collect();
        excluded.sort_unstable();
        excluded.dedup();

        let candidates = self.nodes.len() as u64 - excluded.len() as u64;
        let mut pick = ctx.random_below(candidates);
        for skip in excluded {
            if pick >= skip {
                pick += 1;
            }
        }
        NodeId::from_index(pick as usize)
    }
}
