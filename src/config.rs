use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const DEFAULT_PLACEHOLDER_KIND: &str = "paragraph";
pub const DEFAULT_LEAF_KIND: &str = "text";

/// Describes the target document model the patches are produced for.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Kind of the empty branch that stands in for the content of a document
    /// which would otherwise become empty, the editing surface requires at
    /// least one child in the root.
    #[cfg_attr(feature = "serde", serde(default = "default_placeholder_kind"))]
    pub placeholder_kind: String,

    /// Kind reported for dead ranges that consist of leaf text.
    #[cfg_attr(feature = "serde", serde(default = "default_leaf_kind"))]
    pub leaf_kind: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            placeholder_kind: default_placeholder_kind(),
            leaf_kind: default_leaf_kind(),
        }
    }
}

fn default_placeholder_kind() -> String {
    debug!("Using default placeholder kind: {DEFAULT_PLACEHOLDER_KIND}");
    DEFAULT_PLACEHOLDER_KIND.to_owned()
}

fn default_leaf_kind() -> String {
    debug!("Using default leaf kind: {DEFAULT_LEAF_KIND}");
    DEFAULT_LEAF_KIND.to_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReconcileConfig::default();
        assert_eq!(config.placeholder_kind, "paragraph");
        assert_eq!(config.leaf_kind, "text");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let config: ReconcileConfig = serde_yaml::from_str("placeholder_kind: block\n").unwrap();
        assert_eq!(
            config,
            ReconcileConfig {
                placeholder_kind: "block".to_owned(),
                leaf_kind: "text".to_owned(),
            }
        );
    }
}
