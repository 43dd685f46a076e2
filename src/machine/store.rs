//! Arena storage for machine nodes.
//!
//! Nodes live in an append-only vector and refer to each other by index, so
//! the graph can contain cycles without ownership gymnastics. Addressing is
//! 1-based: index 0 is reserved as the null reference, index 1 is the root.
//! Growing the store never invalidates an existing `NodeId`.

use super::node::Node;

/// A node identifier - a 1-based index into the store.
///
/// Can be freely copied; `NodeId::NULL` (0) means "no node".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    /// The null reference.
    pub const NULL: NodeId = NodeId(0);

    /// The root node, allocated at machine construction and never removed.
    pub const ROOT: NodeId = NodeId(1);

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The 1-based index value.
    #[inline]
    pub fn get(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn from_index(index: usize) -> NodeId {
        NodeId(index as u32)
    }

    #[inline]
    pub(crate) fn raw(self) -> u32 {
        self.0
    }
}

/// Append-only arena of nodes, addressed by `NodeId`.
///
/// The store owns all node memory and frees it when dropped.
#[derive(Clone)]
pub struct NodeStore<V, U> {
    nodes: Vec<Node<V, U>>,
}

impl<V, U> Default for NodeStore<V, U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, U> NodeStore<V, U> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Append a node, returning its id.
    pub fn push(&mut self, node: Node<V, U>) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() as u32)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Node<V, U> {
        assert!(!id.is_null(), "attempt to read through a null node reference");
        assert!(id.get() <= self.nodes.len(), "node index outside of storage");
        &self.nodes[id.get() - 1]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node<V, U> {
        assert!(!id.is_null(), "attempt to write through a null node reference");
        assert!(id.get() <= self.nodes.len(), "node index outside of storage");
        &mut self.nodes[id.get() - 1]
    }

    /// Iterate nodes in insertion order, with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node<V, U>)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::from_index(i + 1), n))
    }

    /// Consume the store, yielding the nodes in insertion order.
    pub(crate) fn into_nodes(self) -> Vec<Node<V, U>> {
        self.nodes
    }
}

impl<V, U> std::ops::Index<NodeId> for NodeStore<V, U> {
    type Output = Node<V, U>;

    #[inline]
    fn index(&self, id: NodeId) -> &Self::Output {
        self.get(id)
    }
}

impl<V, U> std::ops::IndexMut<NodeId> for NodeStore<V, U> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        self.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_null() {
        assert!(NodeId::NULL.is_null());
        assert!(!NodeId::ROOT.is_null());
        assert_eq!(NodeId::ROOT.get(), 1);
    }

    #[test]
    fn test_store_push_is_one_based() {
        let mut store: NodeStore<(), u8> = NodeStore::new();
        let first = store.push(Node::default());
        let second = store.push(Node::default());

        assert_eq!(first, NodeId::ROOT);
        assert_eq!(second.get(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    #[should_panic(expected = "null node reference")]
    fn test_store_get_null_panics() {
        let store: NodeStore<(), u8> = NodeStore::new();
        store.get(NodeId::NULL);
    }

    #[test]
    #[should_panic(expected = "outside of storage")]
    fn test_store_get_out_of_range_panics() {
        let mut store: NodeStore<(), u8> = NodeStore::new();
        store.push(Node::default());
        store.get(NodeId::from_index(2));
    }
}
