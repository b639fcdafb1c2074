//! Trees shared by the unit tests.

use crate::{GenerationStamper, NodeId};

/// Three generations of a small document:
///
/// ```not_rust
/// 0: doc(paragraph("Hello"))
/// 1: doc(paragraph("Hello"), paragraph("world"))   // first paragraph reused
/// 2: doc(paragraph())                               // nothing reused
/// ```
pub fn text_fixture(stamper: &mut GenerationStamper) -> [NodeId; 3] {
    let hello = stamper.leaf("Hello");
    let first = stamper.branch("paragraph", vec![hello]).unwrap();
    let doc0 = stamper.branch("doc", vec![first]).unwrap();

    stamper.advance_generation();
    let world = stamper.leaf("world");
    let second = stamper.branch("paragraph", vec![world]).unwrap();
    let doc1 = stamper.branch("doc", vec![first, second]).unwrap();

    stamper.advance_generation();
    let empty = stamper.branch("paragraph", vec![]).unwrap();
    let doc2 = stamper.branch("doc", vec![empty]).unwrap();

    [doc0, doc1, doc2]
}

/// Builds `paragraph(text)`.
pub fn paragraph(stamper: &mut GenerationStamper, text: &str) -> NodeId {
    let leaf = stamper.leaf(text);
    stamper.branch("paragraph", vec![leaf]).unwrap()
}
