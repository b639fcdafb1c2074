use thiserror::Error;

use crate::{Generation, NodeId};

/// Error type for stamping, reconciling and applying patches
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The node was not produced by this stamper (or predates a reset of it)
    #[error(
        "Node {node} has no stamp record: it was not constructed by this stamper or it was \
         retained across a reset"
    )]
    StampMissing {
        /// The handle that could not be resolved
        node: NodeId,
    },

    /// The dead/new range computation only holds between adjacent generations
    #[error(
        "Cannot reconcile generation {previous} with generation {current}: the previous root \
         must belong to the generation immediately preceding the current one"
    )]
    NonAdjacentGenerations {
        /// Generation of the previous root
        previous: Generation,
        /// Generation of the current root
        current: Generation,
    },

    /// A checkpoint no longer describes an earlier state of the stamper
    #[error(
        "Cannot roll back to a checkpoint of generation {generation}: it was taken by another \
         stamper, before a reset or in another generation"
    )]
    StaleCheckpoint {
        /// Generation the checkpoint was taken in
        generation: Generation,
    },

    /// A patch addresses a position past the end of the document
    #[error("Invalid patch: position {position} is outside of the document of size {size}")]
    PositionOutOfBounds {
        /// The offending position
        position: usize,
        /// The size of the addressed document
        size: usize,
    },

    /// Applying a patch would leave opening and closing boundaries unmatched
    #[error("Invalid patch: the document's boundaries no longer match around position {position}")]
    UnbalancedDocument {
        /// Position of the first boundary that could not be matched
        position: usize,
    },

    /// The editing surface does not allow a document without content
    #[error("Invalid patch: the document would be left without any content")]
    EmptyDocument,
}
