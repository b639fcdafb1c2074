//! Expose generation stamping and patch assembly to WebAssembly.
//!
//! Nodes are addressed by their index in the arena of the `Reconciler` that
//! built them. Patch contents are handed over as JSON token lists.
use wasm_bindgen::prelude::*;

use crate::{Fragment, GenerationStamper, NodeId, PatchOp, ReconcileConfig, ReconcileError};

#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc<'_> = wee_alloc::WeeAlloc::INIT;

/// WASM wrapper around a `GenerationStamper`.
#[wasm_bindgen]
#[derive(Debug, Default)]
pub struct Reconciler {
    stamper: GenerationStamper,
}

#[wasm_bindgen]
impl Reconciler {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Self {
        set_panic_hook();

        Self::default()
    }

    /// Creates a reconciler for a document model whose empty documents are
    /// filled with a branch of `placeholder_kind`.
    #[wasm_bindgen(js_name = withPlaceholder)]
    #[must_use]
    pub fn with_placeholder(placeholder_kind: &str) -> Self {
        set_panic_hook();

        Self {
            stamper: GenerationStamper::with_config(ReconcileConfig {
                placeholder_kind: placeholder_kind.to_owned(),
                ..ReconcileConfig::default()
            }),
        }
    }

    #[wasm_bindgen(js_name = currentGeneration)]
    #[must_use]
    pub fn current_generation(&self) -> u32 { self.stamper.current_generation() }

    /// Starts a new generation, to be called before building the tree of an
    /// edit.
    #[wasm_bindgen(js_name = advanceGeneration)]
    pub fn advance_generation(&mut self) -> u32 { self.stamper.advance_generation() }

    /// Builds a leaf and returns its index.
    ///
    /// # Errors
    ///
    /// If the index does not fit a JS handle.
    pub fn leaf(&mut self, text: &str) -> Result<u32, JsError> { export(self.stamper.leaf(text)) }

    /// Builds a branch from the indices of earlier built nodes and returns its
    /// index.
    ///
    /// # Errors
    ///
    /// If any of the children is unknown or the index does not fit a JS
    /// handle.
    pub fn branch(&mut self, kind: &str, children: &[u32]) -> Result<u32, JsError> {
        let children = children
            .iter()
            .map(|&index| self.handle(index))
            .collect::<Result<Vec<_>, _>>()?;

        export(self.stamper.branch(kind, children)?)
    }

    /// WASM wrapper around `crate::reconcile`.
    ///
    /// # Errors
    ///
    /// If either root is unknown or the roots are not from consecutive
    /// generations.
    pub fn reconcile(&self, previous: u32, current: u32) -> Result<Vec<JsPatchOp>, JsError> {
        let patch = crate::reconcile(&self.stamper, self.handle(previous)?, self.handle(current)?)?;

        to_js(&patch)
    }

    /// WASM wrapper around `crate::initial_patch`.
    ///
    /// # Errors
    ///
    /// If the root is unknown.
    #[wasm_bindgen(js_name = initialPatch)]
    pub fn initial_patch(&self, root: u32) -> Result<Vec<JsPatchOp>, JsError> {
        to_js(&crate::initial_patch(&self.stamper, self.handle(root)?)?)
    }

    /// WASM wrapper around `crate::first_changed_position`.
    ///
    /// # Errors
    ///
    /// If the root is unknown.
    #[wasm_bindgen(js_name = firstChangedPosition)]
    pub fn first_changed_position(&self, root: u32) -> Result<Option<usize>, JsError> {
        Ok(crate::first_changed_position(
            &self.stamper,
            self.handle(root)?,
        )?)
    }

    /// Forgets every node and restarts from generation 0.
    pub fn reset(&mut self) { self.stamper.reset(); }
}

impl Reconciler {
    fn handle(&self, index: u32) -> Result<NodeId, ReconcileError> {
        let id = self
            .stamper
            .handle(usize::try_from(index).unwrap_or(usize::MAX));
        self.stamper.stamp(id).map(|_| id)
    }
}

fn export(id: NodeId) -> Result<u32, JsError> { Ok(u32::try_from(id.index())?) }

fn to_js(patch: &[PatchOp]) -> Result<Vec<JsPatchOp>, JsError> {
    patch
        .iter()
        .map(|operation| JsPatchOp::try_from(operation).map_err(JsError::from))
        .collect()
}

fn set_panic_hook() {
    // https://github.com/rustwasm/console_error_panic_hook#readme
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Wrapper type to expose `PatchOp` to JS.
#[wasm_bindgen]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsPatchOp {
    is_delete: bool,
    from: usize,
    to: usize,
    content: Option<String>,
}

#[wasm_bindgen]
impl JsPatchOp {
    #[wasm_bindgen(js_name = isDelete)]
    #[must_use]
    pub fn is_delete(&self) -> bool { self.is_delete }

    /// Start of the deleted range, or the insertion point.
    #[must_use]
    pub fn start(&self) -> usize { self.from }

    /// End of the deleted range; the insertion point for insertions.
    #[must_use]
    pub fn end(&self) -> usize { self.to }

    /// Inserted tokens as JSON, if anything is inserted.
    #[must_use]
    pub fn content(&self) -> Option<String> { self.content.clone() }
}

impl TryFrom<&PatchOp> for JsPatchOp {
    type Error = serde_json::Error;

    fn try_from(operation: &PatchOp) -> Result<Self, Self::Error> {
        let json = |fragment: &Fragment| serde_json::to_string(fragment.tokens());

        Ok(match operation {
            PatchOp::Delete {
                from,
                to,
                replacement,
            } => JsPatchOp {
                is_delete: true,
                from: *from,
                to: *to,
                content: replacement.as_ref().map(json).transpose()?,
            },
            PatchOp::Insert { at, content } => JsPatchOp {
                is_delete: false,
                from: *at,
                to: *at,
                content: Some(json(content)?),
            },
        })
    }
}
