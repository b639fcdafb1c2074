mod fragment;

use std::{fmt::Display, ops::Range};

pub use fragment::{Fragment, Token};
use log::trace;

use crate::{GenerationStamper, NodeId, PatchOp, ReconcileConfig, ReconcileError};

/// A flat rendering of a document that patches can be applied to, standing in
/// for the editing surface a patch is meant for. It always holds some content
/// and its boundaries are always balanced; an edit that would break either
/// rule is rejected and leaves the document untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    content: Fragment,
}

impl RenderedDocument {
    /// Wraps `content` after checking that it is a valid document body.
    ///
    /// # Errors
    ///
    /// Returns `EmptyDocument` for empty content and `UnbalancedDocument` if a
    /// boundary has no counterpart.
    pub fn new(content: Fragment) -> Result<Self, ReconcileError> {
        if content.is_empty() {
            return Err(ReconcileError::EmptyDocument);
        }

        if let Some(position) = content.unbalanced_position() {
            return Err(ReconcileError::UnbalancedDocument { position });
        }

        Ok(Self { content })
    }

    /// Renders the tree rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `StampMissing` if `root` was not built by `stamper` and
    /// `EmptyDocument` if the root has no content.
    pub fn from_tree(stamper: &GenerationStamper, root: NodeId) -> Result<Self, ReconcileError> {
        Self::new(Fragment::from_tree(stamper, root)?)
    }

    /// The document a fresh editing surface starts with: a single empty branch
    /// of the configured placeholder kind.
    #[must_use]
    pub fn placeholder(config: &ReconcileConfig) -> Self {
        Self {
            content: Fragment::empty_branch(&config.placeholder_kind),
        }
    }

    #[must_use]
    pub fn size(&self) -> usize { self.content.size() }

    #[must_use]
    pub fn fragment(&self) -> &Fragment { &self.content }

    /// # Errors
    ///
    /// Returns `PositionOutOfBounds` if `range` does not fit the document.
    pub fn slice(&self, range: Range<usize>) -> Result<Fragment, ReconcileError> {
        self.content.slice(range)
    }

    /// Applies a single operation.
    ///
    /// # Errors
    ///
    /// Returns `PositionOutOfBounds` if the operation addresses positions
    /// outside the document, `UnbalancedDocument` or `EmptyDocument` if the
    /// result would not be a valid document. The document is unchanged on
    /// error.
    pub fn apply(&mut self, operation: &PatchOp) -> Result<(), ReconcileError> {
        trace!("Applying `{operation}` to a document of size {}", self.size());

        let (before, removed, inserted) = match operation {
            PatchOp::Delete { from, to, .. } if from > to => {
                return Err(ReconcileError::PositionOutOfBounds {
                    position: *from,
                    size: self.size(),
                });
            }
            PatchOp::Delete {
                from,
                to,
                replacement,
            } => (*from, to - from, replacement.as_ref()),
            PatchOp::Insert { at, content } => (*at, 0, Some(content)),
        };

        let (head, rest) = self.content.split_at(before)?;
        let (_, tail) = rest.split_at(removed).map_err(|_| {
            ReconcileError::PositionOutOfBounds {
                position: before + removed,
                size: self.size(),
            }
        })?;

        let mut content = head;
        if let Some(inserted) = inserted {
            content.extend(inserted.tokens().iter().cloned());
        }
        content.extend(tail.tokens().iter().cloned());

        *self = Self::new(content)?;

        Ok(())
    }

    /// Applies every operation of `patch` in order.
    ///
    /// # Errors
    ///
    /// Fails on the first operation that cannot be applied; the operations
    /// before it stay applied.
    pub fn apply_all<'a>(
        &mut self,
        patch: impl IntoIterator<Item = &'a PatchOp>,
    ) -> Result<(), ReconcileError> {
        for operation in patch {
            self.apply(operation)?;
        }

        Ok(())
    }
}

impl Display for RenderedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}
