use std::{fmt::Display, ops::Range};

use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    Fragment, GenerationStamper, NodeId, ReconcileConfig, ReconcileError, outline::align,
    position::content_span,
};

/// One step of a patch. Each operation addresses the document as left by the
/// operations before it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOp {
    /// Removes `from..to`, putting `replacement` in its place if present.
    Delete {
        from: usize,
        to: usize,
        replacement: Option<Fragment>,
    },

    /// Inserts `content` at `at`.
    Insert { at: usize, content: Fragment },
}

impl PatchOp {
    /// The first position the operation touches.
    #[must_use]
    pub fn start(&self) -> usize {
        match self {
            PatchOp::Delete { from, .. } => *from,
            PatchOp::Insert { at, .. } => *at,
        }
    }
}

impl Display for PatchOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchOp::Delete {
                from,
                to,
                replacement: None,
            } => write!(f, "delete {from}..{to}"),
            PatchOp::Delete {
                from,
                to,
                replacement: Some(replacement),
            } => write!(f, "replace {from}..{to} with {replacement}"),
            PatchOp::Insert { at, content } => write!(f, "insert {content} at {at}"),
        }
    }
}

/// Computes the operations turning the rendering of `previous_root` into the
/// rendering of `current_root`. The roots must come from consecutive
/// generations.
///
/// Deletions come first, last to first in `previous_root`'s coordinates, so
/// that no deletion shifts the positions of another. Insertions follow in
/// ascending order in `current_root`'s coordinates: once the dead content is
/// gone, every piece of content before an insertion point is already in
/// place.
///
/// A reused node whose surroundings changed, such as text moved under a
/// branch of another kind, is deleted and inserted again together with its
/// new surroundings.
///
/// A deletion that would leave the document empty carries a replacement.
/// If the whole current document is new it is used directly and not inserted
/// again, otherwise an empty placeholder branch fills the gap.
///
/// # Errors
///
/// Returns `NonAdjacentGenerations` unless `current_root` was built exactly
/// one generation after `previous_root`, and `StampMissing` if either root
/// was not built by `stamper`.
pub fn reconcile(
    stamper: &GenerationStamper,
    previous_root: NodeId,
    current_root: NodeId,
) -> Result<Vec<PatchOp>, ReconcileError> {
    let previous = stamper.stamp(previous_root)?.gen_id;
    let current = stamper.stamp(current_root)?.gen_id;
    if previous.checked_add(1) != Some(current) {
        return Err(ReconcileError::NonAdjacentGenerations { previous, current });
    }

    let previous_size = content_span(stamper, previous_root)?;
    let content = Fragment::from_tree(stamper, current_root)?;
    let (dead, mut new) = align(stamper, previous_root, current_root)?;

    let mut patch = Vec::with_capacity(dead.len() + new.len());
    for range in dead.iter().rev() {
        let replacement = if range.from == 0 && range.to == previous_size {
            Some(replacement(stamper.config(), &content, &mut new)?)
        } else {
            None
        };

        patch.push(PatchOp::Delete {
            from: range.from,
            to: range.to,
            replacement,
        });
    }

    for range in new {
        patch.push(PatchOp::Insert {
            at: range.start,
            content: content.slice(range)?,
        });
    }

    debug!(
        "Reconciled generation {previous} with {current} in {} operation(s)",
        patch.len()
    );

    Ok(patch)
}

/// Picks what fills the document once all of its content is deleted. A new
/// range at the very start is taken over if it spans the whole current
/// document or is itself an empty placeholder.
fn replacement(
    config: &ReconcileConfig,
    content: &Fragment,
    new: &mut Vec<Range<usize>>,
) -> Result<Fragment, ReconcileError> {
    let placeholder = Fragment::empty_branch(&config.placeholder_kind);

    if let Some(first) = new.first().filter(|first| first.start == 0) {
        let leading = content.slice(first.clone())?;
        if first.end == content.size() || leading == placeholder {
            debug!("Whole document deleted, replacing it with `{leading}`");
            new.remove(0);

            return Ok(leading);
        }
    }

    debug!("Whole document deleted, substituting `{placeholder}`");

    Ok(placeholder)
}

/// Computes the operations turning a freshly created editing surface, which
/// holds only an empty placeholder branch, into the rendering of `root`.
///
/// # Errors
///
/// Returns `StampMissing` if `root` was not built by `stamper`.
pub fn initial_patch(
    stamper: &GenerationStamper,
    root: NodeId,
) -> Result<Vec<PatchOp>, ReconcileError> {
    let content = Fragment::from_tree(stamper, root)?;
    let placeholder = Fragment::empty_branch(&stamper.config().placeholder_kind);

    if content.is_empty() || content == placeholder {
        debug!("Initial document matches the placeholder");
        return Ok(Vec::new());
    }

    Ok(vec![PatchOp::Delete {
        from: 0,
        to: placeholder.size(),
        replacement: Some(content),
    }])
}
