use log::debug;

use crate::{GenerationStamper, NodeId, PatchOp, ReconcileError, initial_patch, reconcile};

/// Roots of consecutive generations, oldest first.
///
/// Only the two latest roots are needed to reconcile; older ones can be
/// dropped with [`GenerationHistory::retain_latest`].
#[derive(Debug, Clone, Default)]
pub struct GenerationHistory {
    roots: Vec<NodeId>,
}

impl GenerationHistory {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Records the root of the next generation.
    ///
    /// # Errors
    ///
    /// Returns `NonAdjacentGenerations` if `root` was not built exactly one
    /// generation after the latest recorded root and `StampMissing` if it was
    /// not built by `stamper`.
    pub fn push(&mut self, stamper: &GenerationStamper, root: NodeId) -> Result<(), ReconcileError> {
        let current = stamper.stamp(root)?.gen_id;

        if let Some(latest) = self.latest() {
            let previous = stamper.stamp(latest)?.gen_id;
            if previous.checked_add(1) != Some(current) {
                return Err(ReconcileError::NonAdjacentGenerations { previous, current });
            }
        }

        self.roots.push(root);

        Ok(())
    }

    #[must_use]
    pub fn latest(&self) -> Option<NodeId> { self.roots.last().copied() }

    /// The root recorded right before the latest one.
    #[must_use]
    pub fn previous(&self) -> Option<NodeId> {
        self.roots.len().checked_sub(2).map(|index| self.roots[index])
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeId] { &self.roots }

    #[must_use]
    pub fn len(&self) -> usize { self.roots.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.roots.is_empty() }

    /// Computes the patch leading to the latest root: from the previous root
    /// if there is one, from the placeholder document otherwise.
    ///
    /// # Errors
    ///
    /// Returns `StampMissing` if a recorded root was not built by `stamper`.
    pub fn reconcile_latest(
        &self,
        stamper: &GenerationStamper,
    ) -> Result<Vec<PatchOp>, ReconcileError> {
        match (self.previous(), self.latest()) {
            (Some(previous), Some(latest)) => reconcile(stamper, previous, latest),
            (None, Some(latest)) => initial_patch(stamper, latest),
            (_, None) => Ok(Vec::new()),
        }
    }

    /// Drops all but the `count` latest roots.
    pub fn retain_latest(&mut self, count: usize) {
        let dropped = self.roots.len().saturating_sub(count);
        if dropped > 0 {
            debug!("Dropping {dropped} old root(s) from history");
            self.roots.drain(..dropped);
        }
    }
}
