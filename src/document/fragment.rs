use std::{fmt::Display, ops::Range};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{GenerationStamper, Node, NodeId, ReconcileError};

/// A single entry of the rendered token stream.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Opening boundary of a branch, one position wide.
    Open(String),
    /// Closing boundary of a branch, one position wide.
    Close(String),
    /// A run of text, one position per UTF-16 code unit.
    Text(String),
}

impl Token {
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Token::Open(_) | Token::Close(_) => 1,
            Token::Text(text) => Node::text_len(text),
        }
    }
}

/// A flat run of tokens, as found between two positions of a rendered
/// document. Adjacent text is always joined into a single token, so equal
/// content compares equal regardless of how the leaves were split.
///
/// A fragment cut out of a document does not need to be balanced. It is
/// serialized as its list of tokens.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(from = "Vec<Token>", into = "Vec<Token>")
)]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    tokens: Vec<Token>,
    size: usize,
}

impl Fragment {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        let mut fragment = Self::default();
        fragment.extend(tokens);

        fragment
    }

    /// A branch of `kind` without children.
    #[must_use]
    pub fn empty_branch(kind: &str) -> Self {
        Self::new([Token::Open(kind.to_owned()), Token::Close(kind.to_owned())])
    }

    /// Renders the content of `root`, leaving out the root's own boundaries.
    ///
    /// # Errors
    ///
    /// Returns `StampMissing` if `root` was not built by `stamper`.
    pub fn from_tree(stamper: &GenerationStamper, root: NodeId) -> Result<Self, ReconcileError> {
        fn render(
            stamper: &GenerationStamper,
            id: NodeId,
            is_root: bool,
            fragment: &mut Fragment,
        ) -> Result<(), ReconcileError> {
            match stamper.node(id)? {
                Node::Leaf { text } => fragment.push(Token::Text(text.clone())),
                Node::Branch { kind, children } => {
                    if !is_root {
                        fragment.push(Token::Open(kind.clone()));
                    }
                    for &child in children {
                        render(stamper, child, false, fragment)?;
                    }
                    if !is_root {
                        fragment.push(Token::Close(kind.clone()));
                    }
                }
            }

            Ok(())
        }

        let mut fragment = Self::default();
        render(stamper, root, true, &mut fragment)?;

        Ok(fragment)
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] { &self.tokens }

    /// Number of positions the fragment occupies.
    #[must_use]
    pub fn size(&self) -> usize { self.size }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.size == 0 }

    /// Appends a token, joining it with a preceding text token.
    pub fn push(&mut self, token: Token) {
        if let Token::Text(text) = &token {
            if text.is_empty() {
                return;
            }

            if let Some(Token::Text(last)) = self.tokens.last_mut() {
                last.push_str(text);
                self.size += token.size();
                return;
            }
        }

        self.size += token.size();
        self.tokens.push(token);
    }

    /// Splits the fragment into the content before and after `position`. A
    /// text token straddling the position is cut in two.
    ///
    /// # Errors
    ///
    /// Returns `PositionOutOfBounds` if `position` is past the end.
    pub fn split_at(&self, position: usize) -> Result<(Fragment, Fragment), ReconcileError> {
        if position > self.size {
            return Err(ReconcileError::PositionOutOfBounds {
                position,
                size: self.size,
            });
        }

        let mut before = Fragment::default();
        let mut after = Fragment::default();

        for token in &self.tokens {
            let remaining = position.saturating_sub(before.size);
            match token {
                _ if remaining == 0 => after.push(token.clone()),
                Token::Text(text) if token.size() > remaining => {
                    let (head, tail) = split_text(text, remaining);
                    before.push(Token::Text(head));
                    after.push(Token::Text(tail));
                }
                _ => before.push(token.clone()),
            }
        }

        Ok((before, after))
    }

    /// Copies the content between the bounds of `range`.
    ///
    /// # Errors
    ///
    /// Returns `PositionOutOfBounds` if `range` does not fit the fragment.
    pub fn slice(&self, range: Range<usize>) -> Result<Fragment, ReconcileError> {
        if range.start > range.end {
            return Err(ReconcileError::PositionOutOfBounds {
                position: range.start,
                size: range.end,
            });
        }

        let (_, rest) = self.split_at(range.start)?;
        let (slice, _) = rest.split_at(range.end - range.start)?;

        Ok(slice)
    }

    /// Returns the first position where an opening boundary has no matching
    /// closing boundary or the other way around.
    #[must_use]
    pub fn unbalanced_position(&self) -> Option<usize> {
        let mut open: Vec<(&str, usize)> = Vec::new();
        let mut position = 0;

        for token in &self.tokens {
            match token {
                Token::Open(kind) => open.push((kind.as_str(), position)),
                Token::Close(kind) => match open.pop() {
                    Some((open_kind, _)) if open_kind == kind.as_str() => (),
                    _ => return Some(position),
                },
                Token::Text(_) => (),
            }
            position += token.size();
        }

        open.first().map(|(_, position)| *position)
    }
}

impl Extend<Token> for Fragment {
    fn extend<I: IntoIterator<Item = Token>>(&mut self, iter: I) {
        for token in iter {
            self.push(token);
        }
    }
}

impl From<Vec<Token>> for Fragment {
    fn from(tokens: Vec<Token>) -> Self { Self::new(tokens) }
}

impl From<Fragment> for Vec<Token> {
    fn from(fragment: Fragment) -> Self { fragment.tokens }
}

impl Display for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for token in &self.tokens {
            match token {
                Token::Open(kind) => write!(f, "<{kind}>")?,
                Token::Close(kind) => write!(f, "</{kind}>")?,
                Token::Text(text) => write!(f, "{text:?}")?,
            }
        }

        Ok(())
    }
}

/// Splits `text` after `units` UTF-16 code units. A surrogate pair cut in half
/// is replaced on both sides by U+FFFD.
fn split_text(text: &str, units: usize) -> (String, String) {
    let encoded = text.encode_utf16().collect::<Vec<_>>();
    let (head, tail) = encoded.split_at(units.min(encoded.len()));

    (String::from_utf16_lossy(head), String::from_utf16_lossy(tail))
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fixtures::text_fixture;

    fn text(text: &str) -> Token { Token::Text(text.to_owned()) }

    fn open(kind: &str) -> Token { Token::Open(kind.to_owned()) }

    fn close(kind: &str) -> Token { Token::Close(kind.to_owned()) }

    #[test]
    fn test_joins_text() {
        let fragment = Fragment::new([text("Hel"), text(""), text("lo")]);

        assert_eq!(fragment.tokens(), &[text("Hello")]);
        assert_eq!(fragment.size(), 5);
    }

    #[test]
    fn test_from_tree() {
        let mut stamper = GenerationStamper::new();
        let [_, doc1, doc2] = text_fixture(&mut stamper);

        let fragment = Fragment::from_tree(&stamper, doc1).unwrap();
        assert_eq!(fragment.size(), 14);
        assert_snapshot!(
            fragment,
            @r#"<paragraph>"Hello"</paragraph><paragraph>"world"</paragraph>"#
        );

        assert_eq!(
            Fragment::from_tree(&stamper, doc2).unwrap(),
            Fragment::empty_branch("paragraph")
        );
    }

    #[test]
    fn test_split_inside_text() {
        let fragment = Fragment::new([open("paragraph"), text("Hello"), close("paragraph")]);

        let (before, after) = fragment.split_at(3).unwrap();
        assert_eq!(before, Fragment::new([open("paragraph"), text("He")]));
        assert_eq!(after, Fragment::new([text("llo"), close("paragraph")]));
    }

    #[test]
    fn test_split_at_bounds() {
        let fragment = Fragment::new([open("paragraph"), close("paragraph")]);

        assert_eq!(fragment.split_at(0).unwrap(), (Fragment::default(), fragment.clone()));
        assert_eq!(fragment.split_at(2).unwrap(), (fragment.clone(), Fragment::default()));
        assert_eq!(
            fragment.split_at(3),
            Err(ReconcileError::PositionOutOfBounds {
                position: 3,
                size: 2
            })
        );
    }

    #[test]
    fn test_slice() {
        let fragment = Fragment::new([
            open("paragraph"),
            text("Hello"),
            close("paragraph"),
            open("paragraph"),
            text("world"),
            close("paragraph"),
        ]);

        assert_snapshot!(fragment.slice(7..14).unwrap(), @r#"<paragraph>"world"</paragraph>"#);
        assert_snapshot!(fragment.slice(2..9).unwrap(), @r#""ello"</paragraph><paragraph>"w""#);
        assert!(fragment.slice(4..4).unwrap().is_empty());
    }

    #[test]
    fn test_split_text_by_utf16_units() {
        assert_eq!(split_text("a🦀b", 3), ("a🦀".to_owned(), "b".to_owned()));
        assert_eq!(split_text("こんにちは", 2), ("こん".to_owned(), "にちは".to_owned()));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserializing_joins_text_and_recounts() {
        let fragment: Fragment =
            serde_json::from_str(r#"[{"Open":"paragraph"},{"Text":"a🦀"},{"Text":""},{"Text":"b"}]"#)
                .unwrap();

        assert_eq!(fragment, Fragment::new([open("paragraph"), text("a🦀b")]));
        assert_eq!(fragment.size(), 5);
        assert_eq!(
            serde_json::to_string(&fragment).unwrap(),
            r#"[{"Open":"paragraph"},{"Text":"a🦀b"}]"#
        );

        // A size can no longer be smuggled in next to the tokens
        assert!(serde_json::from_str::<Fragment>(r#"{"tokens":[],"size":3}"#).is_err());
    }

    #[test]
    fn test_unbalanced_position() {
        assert_eq!(
            Fragment::new([open("paragraph"), text("Hi"), close("paragraph")]).unbalanced_position(),
            None
        );
        assert_eq!(
            Fragment::new([text("Hi"), close("paragraph")]).unbalanced_position(),
            Some(2)
        );
        assert_eq!(
            Fragment::new([open("list_item"), close("paragraph")]).unbalanced_position(),
            Some(1)
        );
        assert_eq!(
            Fragment::new([text("Hi"), open("paragraph")]).unbalanced_position(),
            Some(2)
        );
    }
}
