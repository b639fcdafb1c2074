//! Agreement between what survives of the previous tree and what the current
//! tree keeps.
//!
//! Deleting the dead ranges reduces the previous document to its outline: the
//! reused subtrees together with the boundaries of the branches around them.
//! Taking the new ranges out of the current document leaves the current
//! outline. Inserting the new ranges only restores the current document if
//! the two outlines are the same.

use std::{collections::HashSet, ops::Range};

use log::debug;

use crate::{
    DeadRange, GenerationStamper, NodeId, ReconcileError, dead_ranges::detach,
    new_ranges::extract,
};

/// One entry of an outline, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mark<'a> {
    /// Opening boundary of a branch holding reused content.
    Open(&'a str),
    /// Closing boundary of a branch holding reused content.
    Close(&'a str),
    /// A reused subtree, kept with all of its content.
    Kept(NodeId),
}

impl Mark<'_> {
    fn kept(self) -> Option<NodeId> {
        match self {
            Mark::Kept(id) => Some(id),
            Mark::Open(_) | Mark::Close(_) => None,
        }
    }
}

/// Dead ranges of `previous_root` and new ranges of `current_root` that turn
/// one rendering into the other.
///
/// A reused node can end up somewhere its old surroundings do not survive,
/// for instance under a branch of another kind or merged into a sibling. The
/// outlines then diverge, and the reused nodes where they first do are
/// demoted: deleted along with the previous tree and inserted again from the
/// current one. This repeats until the outlines agree, which at the latest
/// happens once no node is kept at all.
///
/// # Errors
///
/// Returns `StampMissing` if either root was not built by `stamper`.
pub(crate) fn align(
    stamper: &GenerationStamper,
    previous_root: NodeId,
    current_root: NodeId,
) -> Result<(Vec<DeadRange>, Vec<Range<usize>>), ReconcileError> {
    let mut demoted = HashSet::new();

    loop {
        let (dead, previous) = detach(stamper, previous_root, &demoted)?;
        let (new, current) = extract(stamper, current_root, &demoted)?;

        let Some(index) = divergence(&previous, &current) else {
            return Ok((dead, new));
        };

        let before = demoted.len();
        demote(&previous, &current, index, &mut demoted);
        debug!(
            "Outlines diverge at mark {index}, demoting {} more reused node(s)",
            demoted.len() - before
        );
    }
}

/// Index of the first mark where the outlines differ.
fn divergence(previous: &[Mark<'_>], current: &[Mark<'_>]) -> Option<usize> {
    let common = previous
        .iter()
        .zip(current)
        .take_while(|(previous, current)| previous == current)
        .count();

    (common < previous.len().max(current.len())).then_some(common)
}

/// Demotes the reused nodes found at `index` in either outline. Where both
/// outlines have a boundary there, everything kept inside the two diverging
/// branches goes instead.
///
/// Every call demotes at least one node: a kept mark is never a demoted node,
/// and every branch of an outline holds a kept mark.
fn demote<'a>(
    previous: &[Mark<'a>],
    current: &[Mark<'a>],
    index: usize,
    demoted: &mut HashSet<NodeId>,
) {
    let kept = [previous, current]
        .into_iter()
        .filter_map(|outline| outline.get(index).copied().and_then(Mark::kept))
        .collect::<Vec<_>>();

    if kept.is_empty() {
        for outline in [previous, current] {
            if let Some(branch) = branch_at(outline, index) {
                demoted.extend(outline[branch].iter().copied().filter_map(Mark::kept));
            }
        }
    } else {
        demoted.extend(kept);
    }
}

/// Marks of the branch whose opening or closing boundary is at `index`.
fn branch_at(outline: &[Mark<'_>], index: usize) -> Option<Range<usize>> {
    let mut depth = 0_usize;

    match outline.get(index)? {
        Mark::Kept(_) => None,
        Mark::Open(_) => {
            for (end, mark) in outline.iter().enumerate().skip(index) {
                match mark {
                    Mark::Open(_) => depth += 1,
                    Mark::Close(_) if depth == 1 => return Some(index..end + 1),
                    Mark::Close(_) => depth -= 1,
                    Mark::Kept(_) => (),
                }
            }

            None
        }
        Mark::Close(_) => {
            for (start, mark) in outline.iter().enumerate().take(index + 1).rev() {
                match mark {
                    Mark::Close(_) => depth += 1,
                    Mark::Open(_) if depth == 1 => return Some(start..index + 1),
                    Mark::Open(_) => depth -= 1,
                    Mark::Kept(_) => (),
                }
            }

            None
        }
    }
}
