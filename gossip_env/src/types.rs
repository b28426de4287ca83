//! Common types for the gossip environment abstraction.

use serde::{Deserialize, Serialize};

/// Identifier of a simulated node.
///
/// Nodes are numbered densely from zero, so an id doubles as the node's
/// index in the overlay registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Creates a NodeId from a registry index.
    ///
    /// # Panics
    /// Panics if the index does not fit in 32 bits.
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("node index exceeds u32 range"))
    }

    /// Returns the registry index for this node.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_index_round_trip() {
        let id = NodeId::from_index(4242);
        assert_eq!(id, NodeId(4242));
        assert_eq!(id.index(), 4242);
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId(17).to_string(), "n17");
    }

    #[test]
    #[should_panic]
    fn test_node_id_rejects_oversized_index() {
        let _ = NodeId::from_index(u32::MAX as usize + 1);
    }
}
