//! Context - layered, immutable key/value store carried through a call chain
//!
//! A [`Context`] is a persistent linked list of bindings. Deriving a child
//! with [`Context::with_value`] never touches the parent: the child shares the
//! parent's bindings and adds one of its own in front. Lookups walk from the
//! newest binding toward the root, so a child binding shadows any ancestor
//! binding under the same key.
//!
//! Cloning a context is an `Arc` bump; clones share every binding.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{AggregatorError, AggregatorResult};
use crate::key::ScopeKey;

/// Type-erased value stored in a context, tagged with its concrete type name
#[derive(Clone)]
pub struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Entry {
    fn new<V: Any + Send + Sync>(value: V) -> Self {
        Self {
            value: Arc::new(value),
            type_name: type_name::<V>(),
        }
    }

    /// Name of the concrete type this entry was created with
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<V: Any>(&self) -> bool {
        self.value.is::<V>()
    }

    pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
        self.value.downcast_ref::<V>()
    }

    pub fn downcast<V: Any + Send + Sync>(&self) -> Option<Arc<V>> {
        Arc::clone(&self.value).downcast::<V>().ok()
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry").field("type_name", &self.type_name).finish()
    }
}

struct Node {
    key: ScopeKey,
    entry: Entry,
    parent: Option<Arc<Node>>,
}

/// Request-scoped execution context
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Node>>,
}

impl Context {
    /// Empty root context
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a child context that adds one binding
    ///
    /// The receiver is left untouched. If `key` is already bound in this
    /// lineage the new binding shadows it for the child and its descendants.
    pub fn with_value<V: Any + Send + Sync>(&self, key: ScopeKey, value: V) -> Self {
        if let Some(existing) = self.value(&key) {
            debug!(%key, shadowed = existing.type_name(), "Context::with_value: shadowing existing binding");
        }
        debug!(%key, value_type = type_name::<V>(), depth = self.depth(), "Context::with_value: called");
        Self {
            head: Some(Arc::new(Node {
                key,
                entry: Entry::new(value),
                parent: self.head.clone(),
            })),
        }
    }

    /// Nearest binding for `key`, walking toward the root
    pub fn value(&self, key: &ScopeKey) -> Option<&Entry> {
        self.nodes().find(|node| &node.key == key).map(|node| &node.entry)
    }

    /// Typed lookup
    ///
    /// Fails with [`AggregatorError::NotRegistered`] when nothing is bound to
    /// `key`, and with [`AggregatorError::TypeMismatch`] when the nearest
    /// binding holds a different type.
    pub fn get<V: Any + Send + Sync>(&self, key: &ScopeKey) -> AggregatorResult<Arc<V>> {
        let entry = self
            .value(key)
            .ok_or_else(|| AggregatorError::NotRegistered { key: key.clone() })?;
        entry.downcast::<V>().ok_or_else(|| AggregatorError::TypeMismatch {
            key: key.clone(),
            expected: type_name::<V>(),
            found: entry.type_name(),
        })
    }

    pub fn contains(&self, key: &ScopeKey) -> bool {
        self.value(key).is_some()
    }

    /// Number of bindings in this lineage, shadowed ones included
    pub fn depth(&self) -> usize {
        self.nodes().count()
    }

    /// Keys visible from this context, newest first, shadowed keys once
    pub fn keys(&self) -> Vec<&ScopeKey> {
        let mut keys: Vec<&ScopeKey> = Vec::new();
        for node in self.nodes() {
            if !keys.contains(&&node.key) {
                keys.push(&node.key);
            }
        }
        keys
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        std::iter::successors(self.head.as_deref(), |node| node.parent.as_deref())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.nodes().map(|node| (node.key.as_str(), node.entry.type_name())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::build_key;

    #[test]
    fn test_background_is_empty() {
        let ctx = Context::background();
        assert_eq!(ctx.depth(), 0);
        assert!(ctx.value(&build_key(["a"])).is_none());
    }

    #[test]
    fn test_with_value_leaves_parent_untouched() {
        let parent = Context::background();
        let child = parent.with_value(build_key(["a"]), 42u32);

        assert!(parent.value(&build_key(["a"])).is_none());
        let entry = child.value(&build_key(["a"])).unwrap();
        assert!(entry.is::<u32>());
        assert!(!entry.is::<u64>());
        assert_eq!(entry.type_name(), "u32");
        assert_eq!(child.value(&build_key(["a"])).and_then(|e| e.downcast_ref::<u32>()), Some(&42));
    }

    #[test]
    fn test_child_inherits_parent_bindings() {
        let parent = Context::background().with_value(build_key(["a"]), "first");
        let child = parent.with_value(build_key(["b"]), 7i64);

        assert!(child.contains(&build_key(["a"])));
        assert!(child.contains(&build_key(["b"])));
        assert_eq!(child.depth(), 2);
    }

    #[test]
    fn test_child_binding_shadows_ancestor() {
        let key = build_key(["dup"]);
        let parent = Context::background().with_value(key.clone(), 1u8);
        let child = parent.with_value(key.clone(), 2u8);

        assert_eq!(*parent.get::<u8>(&key).unwrap(), 1);
        assert_eq!(*child.get::<u8>(&key).unwrap(), 2);
        assert_eq!(child.keys(), vec![&key]);
        assert_eq!(child.depth(), 2);
    }

    #[test]
    fn test_get_reports_missing_and_mismatched() {
        let key = build_key(["typed"]);
        let ctx = Context::background().with_value(key.clone(), String::from("hello"));

        let missing = ctx.get::<String>(&build_key(["other"])).unwrap_err();
        assert!(matches!(missing, AggregatorError::NotRegistered { .. }));

        let mismatch = ctx.get::<u64>(&key).unwrap_err();
        match mismatch {
            AggregatorError::TypeMismatch { expected, found, .. } => {
                assert_eq!(expected, "u64");
                assert_eq!(found, "alloc::string::String");
            }
            other => panic!("Expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_context_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Context>();

        let ctx = Context::background().with_value(build_key(["t"]), 5usize);
        let handle = std::thread::spawn(move || *ctx.get::<usize>(&build_key(["t"])).unwrap());
        assert_eq!(handle.join().unwrap(), 5);
    }
}
