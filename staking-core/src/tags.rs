//! Event tags emitted for indexing

use serde::{Deserialize, Serialize};

/// Action performed
pub const ACTION: &str = "action";
/// Source validator
pub const SRC_VALIDATOR: &str = "source-validator";
/// Destination validator
pub const DST_VALIDATOR: &str = "destination-validator";
/// Delegator
pub const DELEGATOR: &str = "delegator";
/// Validator moniker
pub const MONIKER: &str = "moniker";
/// Validator identity
pub const IDENTITY: &str = "identity";
/// Completion time of an unbonding or redelegation (RFC 3339)
pub const END_TIME: &str = "end-time";

/// Matured unbonding released
pub const ACTION_COMPLETE_UNBONDING: &str = "complete-unbonding";
/// Matured redelegation removed
pub const ACTION_COMPLETE_REDELEGATION: &str = "complete-redelegation";

/// Key/value pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Key
    pub key: String,
    /// Value
    pub value: String,
}

/// Ordered tag list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags(Vec<Tag>);

impl Tags {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// Append a tag in place
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push(Tag {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Append all tags of `other`
    pub fn extend(&mut self, other: Tags) {
        self.0.extend(other.0);
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    /// Every value for `key`
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |t| t.key == key)
            .map(|t| t.value.as_str())
    }

    /// Iterate in emission order
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_builder() {
        let tags = Tags::new()
            .with(ACTION, ACTION_COMPLETE_UNBONDING)
            .with(DELEGATOR, "a")
            .with(DELEGATOR, "b");
        assert_eq!(tags.get(ACTION), Some("complete-unbonding"));
        assert_eq!(tags.get_all(DELEGATOR).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(tags.len(), 3);
    }
}
