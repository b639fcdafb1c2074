//! Linear coordinates of the rendered document.
//!
//! A leaf occupies one position per UTF-16 code unit of its text. A branch
//! occupies one position for its opening boundary, its children, and one for
//! its closing boundary. The root's own boundaries are not addressable:
//! position 0 is the point just inside the root, before its first child.

use std::ops::Range;

use crate::{GenerationStamper, Node, NodeId, ReconcileError};

/// Number of positions `id` occupies when it is not the root.
///
/// # Errors
///
/// Returns `StampMissing` if `id` was not built by `stamper`.
pub fn span(stamper: &GenerationStamper, id: NodeId) -> Result<usize, ReconcileError> {
    stamper.slot(id).map(|slot| slot.span)
}

/// Number of addressable positions in a document rooted at `root`.
///
/// # Errors
///
/// Returns `StampMissing` if `root` was not built by `stamper`.
pub fn content_span(stamper: &GenerationStamper, root: NodeId) -> Result<usize, ReconcileError> {
    let slot = stamper.slot(root)?;

    Ok(match slot.node {
        Node::Leaf { .. } => slot.span,
        Node::Branch { .. } => slot.span - 2,
    })
}

/// Position of the first child of a branch starting at `start`.
pub(crate) fn content_start(start: usize, is_root: bool) -> usize {
    if is_root { start } else { start + 1 }
}

/// Iterates over children together with their start positions.
pub(crate) struct ChildPositions<'a> {
    stamper: &'a GenerationStamper,
    children: std::slice::Iter<'a, NodeId>,
    position: usize,
}

impl<'a> ChildPositions<'a> {
    pub fn new(stamper: &'a GenerationStamper, children: &'a [NodeId], first: usize) -> Self {
        Self {
            stamper,
            children: children.iter(),
            position: first,
        }
    }

    /// Position right after the last visited child.
    pub fn end(&self) -> usize { self.position }
}

impl Iterator for ChildPositions<'_> {
    type Item = Result<(NodeId, usize), ReconcileError>;

    fn next(&mut self) -> Option<Self::Item> {
        let &child = self.children.next()?;
        let start = self.position;

        Some(span(self.stamper, child).map(|span| {
            self.position += span;
            (child, start)
        }))
    }
}

/// Lists every leaf reachable from `root` with the positions it occupies, in
/// document order.
///
/// # Errors
///
/// Returns `StampMissing` if `root` was not built by `stamper`.
pub fn leaf_positions(
    stamper: &GenerationStamper,
    root: NodeId,
) -> Result<Vec<(NodeId, Range<usize>)>, ReconcileError> {
    fn collect(
        stamper: &GenerationStamper,
        id: NodeId,
        start: usize,
        is_root: bool,
        result: &mut Vec<(NodeId, Range<usize>)>,
    ) -> Result<(), ReconcileError> {
        let slot = stamper.slot(id)?;
        match &slot.node {
            Node::Leaf { .. } => result.push((id, start..start + slot.span)),
            Node::Branch { children, .. } => {
                for child in ChildPositions::new(stamper, children, content_start(start, is_root)) {
                    let (child, child_start) = child?;
                    collect(stamper, child, child_start, false, result)?;
                }
            }
        }

        Ok(())
    }

    let mut result = Vec::new();
    collect(stamper, root, 0, true, &mut result)?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_spans() {
        let mut stamper = GenerationStamper::new();
        let hello = stamper.leaf("Hello");
        let paragraph = stamper.branch("paragraph", vec![hello]).unwrap();
        let empty = stamper.branch("paragraph", vec![]).unwrap();
        let doc = stamper.branch("doc", vec![paragraph, empty]).unwrap();

        assert_eq!(span(&stamper, hello).unwrap(), 5);
        assert_eq!(span(&stamper, paragraph).unwrap(), 7);
        assert_eq!(span(&stamper, empty).unwrap(), 2);
        assert_eq!(span(&stamper, doc).unwrap(), 11);
        assert_eq!(content_span(&stamper, doc).unwrap(), 9);
    }

    #[test]
    fn test_leaf_positions() {
        /*
           doc(paragraph("Hello"), paragraph("world"))
               ^          ^        ^          ^
               0          1        7          8
        */
        let mut stamper = GenerationStamper::new();
        let hello = stamper.leaf("Hello");
        let world = stamper.leaf("world");
        let first = stamper.branch("paragraph", vec![hello]).unwrap();
        let second = stamper.branch("paragraph", vec![world]).unwrap();
        let doc = stamper.branch("doc", vec![first, second]).unwrap();

        assert_eq!(
            leaf_positions(&stamper, doc).unwrap(),
            vec![(hello, 1..6), (world, 8..13)]
        );
    }

    #[test]
    fn test_child_positions_end() {
        let mut stamper = GenerationStamper::new();
        let a = stamper.leaf("ab");
        let b = stamper.leaf("cde");
        let children = [a, b];

        let mut positions = ChildPositions::new(&stamper, &children, 1);
        let visited = positions.by_ref().collect::<Result<Vec<_>, _>>().unwrap();

        assert_eq!(visited, vec![(a, 1), (b, 3)]);
        assert_eq!(positions.end(), 6);
    }
}
