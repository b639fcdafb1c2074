use std::sync::atomic::{AtomicU32, Ordering};

use log::{debug, trace};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Generation, Node, NodeId, ReconcileConfig, ReconcileError};

static NEXT_ARENA: AtomicU32 = AtomicU32::new(0);

/// Generation bookkeeping of a single node.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationInfo {
    /// Generation in which this node instance was constructed.
    pub gen_id: Generation,

    /// Smallest `gen_id` among the direct children of a branch; a leaf's or a
    /// childless branch's own `gen_id`.
    pub min_gen_id: Generation,

    /// Generation of the latest branch that took this node as a child, or the
    /// node's own `gen_id` if no branch has claimed it yet.
    pub parent_gen_id: Generation,

    /// Smallest `gen_id` anywhere in the subtree rooted at this node.
    pub oldest_gen_id: Generation,
}

/// The immutable part of an arena entry.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub node: Node,
    pub span: usize,
    pub gen_id: Generation,
    pub min_gen_id: Generation,
    pub oldest_gen_id: Generation,
}

/// State of a [`GenerationStamper`] that can be restored with
/// [`GenerationStamper::rollback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    arena: u32,
    generation: Generation,
    nodes: usize,
    claims: usize,
}

/// Builds document nodes and stamps each of them with the generation it was
/// built in.
///
/// Nodes are never mutated after construction. The one piece of state that
/// changes is the parent generation of a node, which is kept in its own table
/// and overwritten whenever a newer branch claims the node as a child. This is
/// what lets the reconciliation algorithms tell whether content of an older
/// tree is still reachable from the latest one without comparing the trees.
#[derive(Debug)]
pub struct GenerationStamper {
    arena: u32,
    current: Generation,
    config: ReconcileConfig,
    slots: Vec<Slot>,
    parent_gen_ids: Vec<Generation>,

    /// Claims made in the current generation, with the parent generation each
    /// of them overwrote.
    claims: Vec<(usize, Generation)>,
}

impl Default for GenerationStamper {
    fn default() -> Self { Self::new() }
}

impl GenerationStamper {
    #[must_use]
    pub fn new() -> Self { Self::with_config(ReconcileConfig::default()) }

    #[must_use]
    pub fn with_config(config: ReconcileConfig) -> Self {
        Self {
            arena: NEXT_ARENA.fetch_add(1, Ordering::Relaxed),
            current: 0,
            config,
            slots: Vec::new(),
            parent_gen_ids: Vec::new(),
            claims: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ReconcileConfig { &self.config }

    #[must_use]
    pub fn current_generation(&self) -> Generation { self.current }

    /// Starts a new generation. Must be called once per completed edit,
    /// before the edit's tree is constructed.
    pub fn advance_generation(&mut self) -> Generation {
        self.current += 1;
        self.claims.clear();
        trace!("Advanced to generation {}", self.current);

        self.current
    }

    /// Builds a leaf holding `text`.
    pub fn leaf(&mut self, text: impl Into<String>) -> NodeId {
        let text = text.into();
        let span = Node::text_len(&text);

        self.push(Slot {
            node: Node::Leaf { text },
            span,
            gen_id: self.current,
            min_gen_id: self.current,
            oldest_gen_id: self.current,
        })
    }

    /// Builds a branch of the given kind and claims every child for the
    /// current generation.
    ///
    /// # Errors
    ///
    /// Returns `StampMissing` if any child was not built by this stamper. No
    /// child is claimed in that case.
    pub fn branch(
        &mut self,
        kind: impl Into<String>,
        children: Vec<NodeId>,
    ) -> Result<NodeId, ReconcileError> {
        let mut span = 2;
        let mut min_gen_id = None::<Generation>;
        let mut oldest_gen_id = self.current;

        for &child in &children {
            let slot = self.slot(child)?;
            span += slot.span;
            min_gen_id = Some(min_gen_id.map_or(slot.gen_id, |min| min.min(slot.gen_id)));
            oldest_gen_id = oldest_gen_id.min(slot.oldest_gen_id);
        }

        for child in &children {
            let previous = std::mem::replace(&mut self.parent_gen_ids[child.index], self.current);
            self.claims.push((child.index, previous));
        }

        Ok(self.push(Slot {
            node: Node::Branch {
                kind: kind.into(),
                children,
            },
            span,
            gen_id: self.current,
            min_gen_id: min_gen_id.unwrap_or(self.current),
            oldest_gen_id,
        }))
    }

    /// Builds `node`, dispatching on its variant.
    ///
    /// # Errors
    ///
    /// Returns `StampMissing` if a child of a branch was not built by this
    /// stamper.
    pub fn construct(&mut self, node: Node) -> Result<NodeId, ReconcileError> {
        match node {
            Node::Leaf { text } => Ok(self.leaf(text)),
            Node::Branch { kind, children } => self.branch(kind, children),
        }
    }

    /// Returns the stamp record of `id`.
    ///
    /// # Errors
    ///
    /// Returns `StampMissing` if `id` was not built by this stamper.
    pub fn stamp(&self, id: NodeId) -> Result<GenerationInfo, ReconcileError> {
        let slot = self.slot(id)?;

        Ok(GenerationInfo {
            gen_id: slot.gen_id,
            min_gen_id: slot.min_gen_id,
            parent_gen_id: self.parent_gen_ids[id.index],
            oldest_gen_id: slot.oldest_gen_id,
        })
    }

    /// Returns the node behind `id`.
    ///
    /// # Errors
    ///
    /// Returns `StampMissing` if `id` was not built by this stamper.
    pub fn node(&self, id: NodeId) -> Result<&Node, ReconcileError> {
        self.slot(id).map(|slot| &slot.node)
    }

    /// Returns the handle of the `index`-th node built since the last reset,
    /// without checking that it exists.
    #[must_use]
    pub fn handle(&self, index: usize) -> NodeId {
        NodeId {
            arena: self.arena,
            index,
        }
    }

    /// Number of nodes built since the last reset.
    #[must_use]
    pub fn len(&self) -> usize { self.slots.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.slots.is_empty() }

    /// Drops every node and restarts the generation counter. Handles issued
    /// before the reset are rejected afterwards.
    pub fn reset(&mut self) {
        self.arena = NEXT_ARENA.fetch_add(1, Ordering::Relaxed);
        self.current = 0;
        self.slots.clear();
        self.parent_gen_ids.clear();
        self.claims.clear();
    }

    /// Records the current state, so that the nodes built and the claims made
    /// after this point can be undone, for example when a parse fails halfway.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            arena: self.arena,
            generation: self.current,
            nodes: self.slots.len(),
            claims: self.claims.len(),
        }
    }

    /// Drops every node built since `checkpoint` and gives every node claimed
    /// since then its earlier parent generation back. Handles of the dropped
    /// nodes must not be used again: their indices are handed out anew.
    ///
    /// # Errors
    ///
    /// Returns `StaleCheckpoint` if the checkpoint was taken by another
    /// stamper, before a reset or in another generation.
    pub fn rollback(&mut self, checkpoint: Checkpoint) -> Result<(), ReconcileError> {
        if checkpoint.arena != self.arena
            || checkpoint.generation != self.current
            || checkpoint.nodes > self.slots.len()
            || checkpoint.claims > self.claims.len()
        {
            return Err(ReconcileError::StaleCheckpoint {
                generation: checkpoint.generation,
            });
        }

        for (index, previous) in self.claims.drain(checkpoint.claims..).rev() {
            self.parent_gen_ids[index] = previous;
        }
        self.slots.truncate(checkpoint.nodes);
        self.parent_gen_ids.truncate(checkpoint.nodes);

        debug!(
            "Rolled back to {} node(s) in generation {}",
            checkpoint.nodes, self.current
        );

        Ok(())
    }

    pub(crate) fn slot(&self, id: NodeId) -> Result<&Slot, ReconcileError> {
        if id.arena != self.arena {
            return Err(ReconcileError::StampMissing { node: id });
        }

        self.slots
            .get(id.index)
            .ok_or(ReconcileError::StampMissing { node: id })
    }

    fn push(&mut self, slot: Slot) -> NodeId {
        let id = self.handle(self.slots.len());
        trace!(
            "Constructed {id} in generation {} with span {}",
            slot.gen_id, slot.span
        );

        self.parent_gen_ids.push(slot.gen_id);
        self.slots.push(slot);

        id
    }
}
