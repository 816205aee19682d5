//! Scope key derivation
//!
//! Every aggregator lives in the context under a key in one flat namespace:
//! the fixed prefix [`DEFAULT_SCOPE_KEY`], followed by each caller segment
//! preceded by [`SCOPE_SEPARATOR`]. Segments containing the separator can
//! produce the same key as a longer segment list (`["a_b"]` and `["a", "b"]`),
//! so callers should keep segment names free of `_`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace prefix shared by every scope key
pub const DEFAULT_SCOPE_KEY: &str = "ctxAggCtxKey";

/// Separator placed before each caller segment
pub const SCOPE_SEPARATOR: char = '_';

/// Identifier of one aggregator instance within a context
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeKey(String);

impl ScopeKey {
    /// The bare namespace key, used when no segments are given
    pub fn root() -> Self {
        Self(DEFAULT_SCOPE_KEY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ScopeKey {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ScopeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Build the scope key for a list of segments
///
/// An empty list yields [`DEFAULT_SCOPE_KEY`]; otherwise each segment is
/// appended in order, preceded by [`SCOPE_SEPARATOR`].
pub fn build_key<I, S>(segments: I) -> ScopeKey
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut key = String::from(DEFAULT_SCOPE_KEY);
    for segment in segments {
        key.push(SCOPE_SEPARATOR);
        key.push_str(segment.as_ref());
    }
    ScopeKey(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn test_empty_segments_is_root() {
        assert_eq!(build_key(NONE), ScopeKey::root());
        assert_eq!(build_key(NONE).as_str(), DEFAULT_SCOPE_KEY);
        assert_eq!(build_key(Vec::<String>::new()), ScopeKey::default());
    }

    #[test]
    fn test_segments_joined_in_order() {
        assert_eq!(build_key(["a", "b"]).as_str(), "ctxAggCtxKey_a_b");
        assert_ne!(build_key(["a", "b"]), build_key(["a"]));
        assert_ne!(build_key(["a", "b"]), build_key(["b", "a"]));
    }

    #[test]
    fn test_empty_segment_differs_from_no_segment() {
        assert_ne!(build_key([""]), build_key(NONE));
        assert_eq!(build_key([""]).as_str(), "ctxAggCtxKey_");
    }

    #[test]
    fn test_owned_and_borrowed_segments_agree() {
        let owned = vec!["req1".to_string(), "field".to_string()];
        assert_eq!(build_key(&owned), build_key(["req1", "field"]));
    }

    fn arb_segments() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-zA-Z0-9]{1,8}", 0..5)
    }

    proptest! {
        #[test]
        fn prop_build_key_is_deterministic(segments in arb_segments()) {
            prop_assert_eq!(build_key(&segments), build_key(&segments));
        }

        #[test]
        fn prop_distinct_segment_lists_give_distinct_keys(a in arb_segments(), b in arb_segments()) {
            prop_assume!(a != b);
            prop_assert_ne!(build_key(&a), build_key(&b));
        }

        #[test]
        fn prop_key_keeps_namespace_prefix(segments in arb_segments()) {
            let key = build_key(&segments);
            prop_assert!(key.as_str().starts_with(DEFAULT_SCOPE_KEY));
            prop_assert_eq!(key.as_str().matches(SCOPE_SEPARATOR).count(), segments.len());
        }
    }
}
