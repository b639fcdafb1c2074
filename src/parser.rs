use std::ops::Range;

use log::{debug, warn};

use crate::{
    GenerationHistory, GenerationStamper, NodeId, PatchOp, ReconcileConfig, ReconcileError,
};

/// A parser that rebuilds its tree after each edit to its source text.
///
/// Every subtree whose source the edit did not touch must come back as the
/// very same handle it had after the previous parse, and all new content must
/// be built through the given stamper.
pub trait IncrementalParser {
    /// Replaces the bytes at `range` of the source with `text`.
    fn edit(&mut self, range: Range<usize>, text: &str);

    /// Parses the current source into a tree and returns its root.
    ///
    /// # Errors
    ///
    /// Returns `StampMissing` if a handle from an earlier parse is no longer
    /// known to `stamper`. Nodes built by a failed parse are discarded, so
    /// their handles must not be kept for the next one.
    fn parse(&mut self, stamper: &mut GenerationStamper) -> Result<NodeId, ReconcileError>;
}

/// Drives an [`IncrementalParser`] one edit at a time, producing the patch for
/// each edit.
#[derive(Debug)]
pub struct EditSession<P> {
    parser: P,
    stamper: GenerationStamper,
    history: GenerationHistory,
    root: NodeId,
}

impl<P: IncrementalParser> EditSession<P> {
    /// Parses the initial source as generation 0.
    ///
    /// # Errors
    ///
    /// Fails if the initial parse fails.
    pub fn new(parser: P) -> Result<Self, ReconcileError> {
        Self::with_config(parser, ReconcileConfig::default())
    }

    /// # Errors
    ///
    /// Fails if the initial parse fails.
    pub fn with_config(mut parser: P, config: ReconcileConfig) -> Result<Self, ReconcileError> {
        let mut stamper = GenerationStamper::with_config(config);
        let root = parser.parse(&mut stamper)?;

        let mut history = GenerationHistory::new();
        history.push(&stamper, root)?;

        Ok(Self {
            parser,
            stamper,
            history,
            root,
        })
    }

    /// Applies an edit to the source and returns the operations turning the
    /// previous rendering into the new one. Only the two latest roots are
    /// kept.
    ///
    /// A failed parse leaves the session at its previous root and undoes
    /// everything the parse built or claimed. The edit stays applied to the
    /// parser's source and the next call retries in the same generation.
    ///
    /// # Errors
    ///
    /// Fails if the parse fails or the parser returns a root that was not
    /// built in the new generation.
    pub fn apply_edit(
        &mut self,
        range: Range<usize>,
        text: &str,
    ) -> Result<Vec<PatchOp>, ReconcileError> {
        if self.stamper.stamp(self.root)?.gen_id == self.stamper.current_generation() {
            self.stamper.advance_generation();
        }
        debug!(
            "Applying edit {range:?} in generation {}",
            self.stamper.current_generation()
        );

        self.parser.edit(range, text);
        let checkpoint = self.stamper.checkpoint();
        let parsed = self
            .parser
            .parse(&mut self.stamper)
            .and_then(|root| self.history.push(&self.stamper, root).map(|()| root));

        let root = match parsed {
            Ok(root) => root,
            Err(error) => {
                warn!("Parsing failed, keeping the previous tree: {error}");
                self.stamper.rollback(checkpoint)?;
                return Err(error);
            }
        };
        self.history.retain_latest(2);
        self.root = root;

        self.history.reconcile_latest(&self.stamper)
    }

    /// The operations rendering the latest tree into a fresh placeholder
    /// document, for a surface that joins after the first parse.
    ///
    /// # Errors
    ///
    /// Returns `StampMissing` if the root is unknown to the stamper.
    pub fn initial_patch(&self) -> Result<Vec<PatchOp>, ReconcileError> {
        crate::initial_patch(&self.stamper, self.root)
    }

    #[must_use]
    pub fn stamper(&self) -> &GenerationStamper { &self.stamper }

    #[must_use]
    pub fn history(&self) -> &GenerationHistory { &self.history }

    #[must_use]
    pub fn latest_root(&self) -> NodeId { self.root }

    #[must_use]
    pub fn parser(&self) -> &P { &self.parser }
}
