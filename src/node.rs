use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Value of the edit generation counter.
pub type Generation = u32;

/// Handle of a node inside the arena of the `GenerationStamper` that built it.
///
/// Two handles are equal only if they point to the very same node instance,
/// structurally identical nodes built separately get different handles.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) arena: u32,
    pub(crate) index: usize,
}

impl NodeId {
    /// Position of the node in its arena, in construction order.
    #[must_use]
    pub fn index(self) -> usize { self.index }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}@{}", self.index, self.arena)
    }
}

/// Immutable document tree node. Children are referenced by handle so that a
/// subtree can be shared between the trees of many generations.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Leaf { text: String },
    Branch { kind: String, children: Vec<NodeId> },
}

impl Node {
    /// Returns the children of a branch, leaves have none.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        match self {
            Node::Leaf { .. } => &[],
            Node::Branch { children, .. } => children,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool { matches!(self, Node::Leaf { .. }) }

    /// Length of a leaf's text in UTF-16 code units, which is the unit of the
    /// editor's position space.
    pub(crate) fn text_len(text: &str) -> usize { text.encode_utf16().count() }
}
