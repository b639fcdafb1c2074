use std::{collections::HashSet, fmt::Display, ops::Range};

use log::{debug, trace};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    Generation, GenerationStamper, Node, NodeId, ReconcileError,
    outline::Mark,
    position::{ChildPositions, content_start},
};

/// Range of an older document whose content is no longer reachable from the
/// latest tree.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadRange {
    pub from: usize,
    pub to: usize,

    /// Kind of the branch if the range is exactly one whole branch, the
    /// configured leaf kind otherwise.
    pub kind: String,
}

impl DeadRange {
    #[must_use]
    pub fn new(from: usize, to: usize, kind: impl Into<String>) -> Self {
        Self {
            from,
            to,
            kind: kind.into(),
        }
    }

    #[must_use]
    pub fn range(&self) -> Range<usize> { self.from..self.to }

    #[must_use]
    pub fn len(&self) -> usize { self.to.saturating_sub(self.from) }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Display for DeadRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{} ({})", self.from, self.to, self.kind)
    }
}

/// Finds the content of `previous_root` that nothing built after its
/// generation has claimed, in `previous_root`'s coordinates.
///
/// A node is dead if its latest claiming parent is not newer than
/// `previous_root`. Live nodes are not descended into. Touching ranges are
/// merged, and a non-root branch whose children are all dead is reported as a
/// single range covering its own boundaries too, so that it can be removed in
/// one step.
///
/// # Errors
///
/// Returns `StampMissing` if `previous_root` was not built by `stamper`.
pub fn dead_ranges(
    stamper: &GenerationStamper,
    previous_root: NodeId,
) -> Result<Vec<DeadRange>, ReconcileError> {
    detach(stamper, previous_root, &HashSet::new()).map(|(ranges, _)| ranges)
}

/// Dead ranges of `previous_root` together with the outline left once they
/// are removed. Nodes in `demoted` count as dead even if they were claimed.
pub(crate) fn detach<'a>(
    stamper: &'a GenerationStamper,
    previous_root: NodeId,
    demoted: &HashSet<NodeId>,
) -> Result<(Vec<DeadRange>, Vec<Mark<'a>>), ReconcileError> {
    let old = stamper.stamp(previous_root)?.gen_id;

    let mut detacher = Detacher {
        stamper,
        old,
        demoted,
        ranges: Vec::new(),
        outline: Vec::new(),
    };
    detacher.walk(previous_root, 0, true)?;

    debug!(
        "Found {} dead range(s) in generation {old}: [{}]",
        detacher.ranges.len(),
        detacher
            .ranges
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok((detacher.ranges, detacher.outline))
}

struct Detacher<'a, 'd> {
    stamper: &'a GenerationStamper,
    old: Generation,
    demoted: &'d HashSet<NodeId>,
    ranges: Vec<DeadRange>,
    outline: Vec<Mark<'a>>,
}

impl<'a> Detacher<'a, '_> {
    fn walk(&mut self, id: NodeId, start: usize, is_root: bool) -> Result<(), ReconcileError> {
        let stamper = self.stamper;

        let parent_gen_id = stamper.stamp(id)?.parent_gen_id;
        if parent_gen_id > self.old && !self.demoted.contains(&id) {
            trace!("{id} at {start} was claimed in generation {parent_gen_id}");
            self.outline.push(Mark::Kept(id));
            return Ok(());
        }

        let slot = stamper.slot(id)?;
        match &slot.node {
            Node::Leaf { .. } => {
                trace!("{id} at {start} is dead");
                if slot.span > 0 {
                    let leaf_kind = &stamper.config().leaf_kind;
                    self.push(DeadRange::new(start, start + slot.span, leaf_kind));
                }
            }
            Node::Branch { kind, children } => {
                let first_range = self.ranges.len();
                let first_mark = self.outline.len();
                if !is_root {
                    self.outline.push(Mark::Open(kind));
                }

                let mut positions =
                    ChildPositions::new(stamper, children, content_start(start, is_root));
                for child in positions.by_ref() {
                    let (child, child_start) = child?;
                    self.walk(child, child_start, false)?;
                }

                if is_root {
                    return Ok(());
                }

                if self.outline.len() == first_mark + 1 {
                    trace!("{id} ({kind}) at {start} is dead with all of its content");
                    self.outline.truncate(first_mark);
                    self.ranges.truncate(first_range);
                    self.push(DeadRange::new(start, positions.end() + 1, kind));
                } else {
                    self.outline.push(Mark::Close(kind));
                }
            }
        }

        Ok(())
    }

    /// Appends `range`, joining it with the last one if it starts exactly
    /// where that ends. The joined range keeps the kind of the earlier one.
    fn push(&mut self, range: DeadRange) {
        match self.ranges.last_mut() {
            Some(last) if last.to == range.from => last.to = range.to,
            _ => self.ranges.push(range),
        }
    }
}
