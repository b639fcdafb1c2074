//! Incremental reconciliation of document trees into editor patches.
//!
//! An incremental parser rebuilds its tree after every edit, reusing the
//! nodes of untouched source by handle. Building every node through a
//! [`GenerationStamper`] records which edit generation created it and which
//! generation last took it as a child. From these stamps alone, without
//! comparing the trees, [`reconcile`] derives the deletions and insertions
//! that bring a flat rendering of the previous tree in line with the current
//! one.
//!
//! ```
//! use tree_reconcile::{GenerationStamper, PatchOp, reconcile};
//!
//! let mut stamper = GenerationStamper::new();
//! let hello = stamper.leaf("Hello");
//! let paragraph = stamper.branch("paragraph", vec![hello])?;
//! let previous = stamper.branch("doc", vec![paragraph])?;
//!
//! stamper.advance_generation();
//! let world = stamper.leaf("world");
//! let appended = stamper.branch("paragraph", vec![world])?;
//! let current = stamper.branch("doc", vec![paragraph, appended])?;
//!
//! let patch = reconcile(&stamper, previous, current)?;
//! assert!(matches!(patch.as_slice(), [PatchOp::Insert { at: 7, .. }]));
//! # Ok::<(), tree_reconcile::ReconcileError>(())
//! ```

mod change_locator;
mod config;
mod dead_ranges;
mod document;
mod errors;
mod history;
mod new_ranges;
mod node;
mod outline;
mod parser;
mod patch;
pub mod position;
mod stamper;

#[cfg(test)]
mod fixtures;

pub use change_locator::first_changed_position;
pub use config::{DEFAULT_LEAF_KIND, DEFAULT_PLACEHOLDER_KIND, ReconcileConfig};
pub use dead_ranges::{DeadRange, dead_ranges};
pub use document::{Fragment, RenderedDocument, Token};
pub use errors::ReconcileError;
pub use history::GenerationHistory;
pub use new_ranges::new_ranges;
pub use node::{Generation, Node, NodeId};
pub use parser::{EditSession, IncrementalParser};
pub use patch::{PatchOp, initial_patch, reconcile};
pub use stamper::{Checkpoint, GenerationInfo, GenerationStamper};

#[cfg(feature = "wasm")]
pub mod wasm;
