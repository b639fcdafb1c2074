use log::trace;

use crate::{
    Generation, GenerationStamper, Node, NodeId, ReconcileError,
    position::{ChildPositions, content_start},
};

/// Returns the position separating content that is certainly unchanged from
/// content that may be new, where "new" means built in the generation of
/// `root`. Only stamps are consulted, no older tree is needed.
///
/// Subtrees from older generations are skipped without descending. The first
/// current-generation leaf (or childless branch) in document order gives the
/// answer. Returns `None` if `root` holds no current-generation content.
///
/// ```
/// use tree_reconcile::{GenerationStamper, first_changed_position};
///
/// let mut stamper = GenerationStamper::new();
/// let hello = stamper.leaf("Hello");
/// let first = stamper.branch("paragraph", vec![hello])?;
/// stamper.branch("doc", vec![first])?;
///
/// stamper.advance_generation();
/// let world = stamper.leaf("world");
/// let second = stamper.branch("paragraph", vec![world])?;
/// let doc = stamper.branch("doc", vec![first, second])?;
///
/// assert_eq!(first_changed_position(&stamper, doc)?, Some(8));
/// # Ok::<(), tree_reconcile::ReconcileError>(())
/// ```
///
/// # Errors
///
/// Returns `StampMissing` if `root` was not built by `stamper`.
pub fn first_changed_position(
    stamper: &GenerationStamper,
    root: NodeId,
) -> Result<Option<usize>, ReconcileError> {
    let current = stamper.stamp(root)?.gen_id;

    locate(stamper, root, 0, true, current)
}

fn locate(
    stamper: &GenerationStamper,
    id: NodeId,
    start: usize,
    is_root: bool,
    current: Generation,
) -> Result<Option<usize>, ReconcileError> {
    let slot = stamper.slot(id)?;
    if slot.gen_id < current {
        trace!("{id} at {start} is from generation {}, skipping", slot.gen_id);
        return Ok(None);
    }

    let children = match &slot.node {
        Node::Leaf { .. } => return Ok(Some(start)),
        Node::Branch { children, .. } if children.is_empty() => return Ok(Some(start)),
        Node::Branch { children, .. } => children,
    };

    for child in ChildPositions::new(stamper, children, content_start(start, is_root)) {
        let (child, child_start) = child?;
        if let Some(position) = locate(stamper, child, child_start, false, current)? {
            return Ok(Some(position));
        }
    }

    // A rebuilt branch around reused children only
    Ok(None)
}
