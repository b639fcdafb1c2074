use std::{collections::HashSet, ops::Range};

use log::{debug, trace};

use crate::{
    Generation, GenerationStamper, Node, NodeId, ReconcileError,
    outline::Mark,
    position::{ChildPositions, content_span, content_start},
};

/// Finds the content of `current_root` that was introduced in its own
/// generation, in `current_root`'s coordinates. Each returned range can be
/// copied verbatim from `current_root` into the document that remains after
/// removing the dead ranges of the previous generation.
///
/// The walk alternates between searching for the start of a range and
/// extending an open one:
///
/// - a subtree from an older generation is skipped and closes the open range;
/// - a subtree built entirely in the current generation is never descended:
///   it opens a range at its start, or is absorbed by the open one. Opening at
///   the outermost such subtree keeps the new boundaries around new content
///   inside the range;
/// - a current-generation branch wrapping reused content is expected to stand
///   where an older branch of the same kind survives, so its boundaries close
///   the open range and the walk descends into it.
///
/// [`reconcile`](crate::reconcile) does not rely on that expectation: it
/// checks it, and falls back to inserting such branches whole.
///
/// # Errors
///
/// Returns `StampMissing` if `current_root` was not built by `stamper`.
pub fn new_ranges(
    stamper: &GenerationStamper,
    current_root: NodeId,
) -> Result<Vec<Range<usize>>, ReconcileError> {
    extract(stamper, current_root, &HashSet::new()).map(|(ranges, _)| ranges)
}

/// New ranges of `current_root` together with the outline left once they are
/// taken out. Nodes in `demoted` count as new even though they were reused,
/// and a branch holding no other reused content is new as a whole.
pub(crate) fn extract<'a>(
    stamper: &'a GenerationStamper,
    current_root: NodeId,
    demoted: &HashSet<NodeId>,
) -> Result<(Vec<Range<usize>>, Vec<Mark<'a>>), ReconcileError> {
    let current = stamper.stamp(current_root)?.gen_id;

    let mut extractor = Extractor {
        stamper,
        current,
        demoted,
        open: None,
        ranges: Vec::new(),
        outline: Vec::new(),
    };
    extractor.walk(current_root, 0, true)?;
    extractor.close(content_span(stamper, current_root)?);

    debug!(
        "Found {} new range(s) in generation {current}: {:?}",
        extractor.ranges.len(),
        extractor.ranges
    );

    Ok((extractor.ranges, extractor.outline))
}

struct Extractor<'a, 'd> {
    stamper: &'a GenerationStamper,
    current: Generation,
    demoted: &'d HashSet<NodeId>,

    /// Start of the range being extended, `None` while searching.
    open: Option<usize>,
    ranges: Vec<Range<usize>>,
    outline: Vec<Mark<'a>>,
}

impl<'a> Extractor<'a, '_> {
    fn walk(&mut self, id: NodeId, start: usize, is_root: bool) -> Result<(), ReconcileError> {
        let stamper = self.stamper;
        let slot = stamper.slot(id)?;

        let reused = slot.gen_id < self.current;
        if reused && !self.demoted.contains(&id) {
            trace!("{id} at {start} is reused from generation {}", slot.gen_id);
            self.close(start);
            self.outline.push(Mark::Kept(id));
            return Ok(());
        }

        let (kind, children) = match &slot.node {
            Node::Branch { kind, children }
                if is_root || (!reused && slot.oldest_gen_id < self.current) =>
            {
                (kind, children)
            }
            _ => {
                trace!("{id} at {start} is new with all of its content");
                self.open.get_or_insert(start);
                return Ok(());
            }
        };

        if is_root {
            self.walk_children(children, start, is_root)?;
            return Ok(());
        }

        let saved = (self.open, self.ranges.len(), self.outline.len());
        self.close(start);
        self.outline.push(Mark::Open(kind));

        let end = self.walk_children(children, start, is_root)?;

        if self.outline.len() == saved.2 + 1 {
            trace!("{id} at {start} only wraps demoted content");
            self.open = saved.0;
            self.ranges.truncate(saved.1);
            self.outline.truncate(saved.2);
            self.open.get_or_insert(start);
        } else {
            self.close(end);
            self.outline.push(Mark::Close(kind));
        }

        Ok(())
    }

    /// Walks `children` and returns the position right after the last one.
    fn walk_children(
        &mut self,
        children: &'a [NodeId],
        start: usize,
        is_root: bool,
    ) -> Result<usize, ReconcileError> {
        let mut positions =
            ChildPositions::new(self.stamper, children, content_start(start, is_root));
        for child in positions.by_ref() {
            let (child, child_start) = child?;
            self.walk(child, child_start, false)?;
        }

        Ok(positions.end())
    }

    fn close(&mut self, end: usize) {
        match self.open.take() {
            Some(start) if start < end => self.ranges.push(start..end),
            _ => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fixtures::{paragraph, text_fixture};

    #[test]
    fn test_text_fixture() {
        let mut stamper = GenerationStamper::new();
        let [doc0, doc1, doc2] = text_fixture(&mut stamper);

        assert_eq!(new_ranges(&stamper, doc0).unwrap(), vec![0..7]);

        // The whole second paragraph including its boundaries
        assert_eq!(new_ranges(&stamper, doc1).unwrap(), vec![7..14]);

        // 0..2 fully surrounds the new, empty paragraph node
        assert_eq!(new_ranges(&stamper, doc2).unwrap(), vec![0..2]);
    }

    #[test]
    fn test_reused_node_splits_ranges() {
        let mut stamper = GenerationStamper::new();
        let [_, _, doc2] = text_fixture(&mut stamper);
        let empty = stamper.node(doc2).unwrap().children()[0];

        stamper.advance_generation();
        let brackets = paragraph(&mut stamper, "[]");
        let braces = paragraph(&mut stamper, "{}");
        let doc3 = stamper.branch("doc", vec![brackets, empty, braces]).unwrap();

        /*
           doc(paragraph("[]"), paragraph(), paragraph("{}"))
               ^                ^            ^               ^
               0                4            6               10
        */
        assert_eq!(new_ranges(&stamper, doc3).unwrap(), vec![0..4, 6..10]);
    }

    #[test]
    fn test_rebuilt_branch_keeps_its_boundaries() {
        let mut stamper = GenerationStamper::new();
        let kept = stamper.leaf("ab");
        let old_paragraph = stamper.branch("paragraph", vec![kept]).unwrap();
        stamper.branch("doc", vec![old_paragraph]).unwrap();

        stamper.advance_generation();
        let before = stamper.leaf("xy");
        let after = stamper.leaf("z");
        let new_paragraph = stamper
            .branch("paragraph", vec![before, kept, after])
            .unwrap();
        let doc = stamper.branch("doc", vec![new_paragraph]).unwrap();

        // doc(paragraph("xy", "ab", "z"))
        //               ^     ^     ^  ^
        //               1     3     5  6
        assert_eq!(new_ranges(&stamper, doc).unwrap(), vec![1..3, 5..6]);
    }

    #[test]
    fn test_lifts_start_to_outermost_new_branch() {
        let mut stamper = GenerationStamper::new();
        let kept = paragraph(&mut stamper, "Hi");
        stamper.branch("doc", vec![kept]).unwrap();

        stamper.advance_generation();
        let nested = paragraph(&mut stamper, "new");
        let item = stamper.branch("list_item", vec![nested]).unwrap();
        let list = stamper.branch("bullet_list", vec![item]).unwrap();
        let doc = stamper.branch("doc", vec![kept, list]).unwrap();

        // bullet_list starts right after the 4 positions of paragraph("Hi")
        assert_eq!(new_ranges(&stamper, doc).unwrap(), vec![4..13]);
    }

    #[test]
    fn test_descends_when_reused_content_is_nested_deeper() {
        let mut stamper = GenerationStamper::new();
        let kept = paragraph(&mut stamper, "a");
        let item = stamper.branch("list_item", vec![kept]).unwrap();
        let list = stamper.branch("bullet_list", vec![item]).unwrap();
        stamper.branch("doc", vec![list]).unwrap();

        stamper.advance_generation();
        let new_item = stamper.branch("list_item", vec![kept]).unwrap();
        let new_list = stamper.branch("bullet_list", vec![new_item]).unwrap();
        let appended = paragraph(&mut stamper, "z");
        let doc = stamper.branch("doc", vec![new_list, appended]).unwrap();

        // All direct children of the new list are new, but it still wraps the
        // reused paragraph so it must not be treated as new content.
        assert_eq!(stamper.stamp(new_list).unwrap().min_gen_id, 1);
        assert_eq!(new_ranges(&stamper, doc).unwrap(), vec![7..10]);
    }

    #[test]
    fn test_branch_around_demoted_content_is_new() {
        let mut stamper = GenerationStamper::new();
        let kept = paragraph(&mut stamper, "Hi");
        let wrapped = paragraph(&mut stamper, "a");
        stamper.branch("doc", vec![kept, wrapped]).unwrap();

        stamper.advance_generation();
        let item = stamper.branch("list_item", vec![wrapped]).unwrap();
        let list = stamper.branch("bullet_list", vec![item]).unwrap();
        let doc = stamper.branch("doc", vec![kept, list]).unwrap();

        let (ranges, outline) = extract(&stamper, doc, &HashSet::new()).unwrap();
        assert_eq!(ranges, vec![]);
        assert_eq!(
            outline,
            vec![
                Mark::Kept(kept),
                Mark::Open("bullet_list"),
                Mark::Open("list_item"),
                Mark::Kept(wrapped),
                Mark::Close("list_item"),
                Mark::Close("bullet_list"),
            ]
        );

        // The list and its item only held `wrapped`, so they are new as a whole
        let (ranges, outline) = extract(&stamper, doc, &HashSet::from([wrapped])).unwrap();
        assert_eq!(ranges, vec![4..11]);
        assert_eq!(outline, vec![Mark::Kept(kept)]);
    }

    #[test]
    fn test_nothing_new() {
        let mut stamper = GenerationStamper::new();
        let kept = paragraph(&mut stamper, "Hi");
        stamper.branch("doc", vec![kept]).unwrap();

        stamper.advance_generation();
        let doc = stamper.branch("doc", vec![kept]).unwrap();

        assert_eq!(new_ranges(&stamper, doc).unwrap(), vec![]);
    }
}
