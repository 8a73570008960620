//! Listener Registry
//!
//! Two parallel stores of [`Bucket`]s: exact event names and wildcard
//! patterns. A bucket hands out slot indices in insertion order and never
//! reuses one while it exists; removing a listener leaves a gap that
//! iteration skips. Empty buckets are dropped.

use std::collections::{BTreeMap, HashMap};

use crate::dispatcher::listener::Listener;
use crate::dispatcher::names::{is_wildcard, wildcard_of};

/// Which store a name lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    Exact,
    Wildcard,
}

impl BucketKind {
    pub fn of(name: &str) -> Self {
        if is_wildcard(name) {
            BucketKind::Wildcard
        } else {
            BucketKind::Exact
        }
    }
}

/// Ordered, gap-preserving listener slots for one key
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    slots: BTreeMap<usize, Listener>,
    next_slot: usize,
}

impl Bucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener, returning its slot
    pub fn push(&mut self, listener: Listener) -> usize {
        let slot = self.next_slot;
        self.slots.insert(slot, listener);
        self.next_slot += 1;
        slot
    }

    /// Remove every slot matching `listener`; returns how many went
    ///
    /// Unnamed lazy pairs compare as `default_method`.
    pub fn remove_matching(&mut self, listener: &Listener, default_method: &str) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|_, stored| !stored.matches_removal(listener, default_method));
        before - self.slots.len()
    }

    pub fn get(&self, slot: usize) -> Option<&Listener> {
        self.slots.get(&slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &BTreeMap<usize, Listener> {
        &self.slots
    }
}

/// Exact and wildcard listener stores
#[derive(Debug, Default)]
pub struct Registry {
    exact: HashMap<String, Bucket>,
    wildcard: HashMap<String, Bucket>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self, kind: BucketKind) -> &HashMap<String, Bucket> {
        match kind {
            BucketKind::Exact => &self.exact,
            BucketKind::Wildcard => &self.wildcard,
        }
    }

    fn store_mut(&mut self, kind: BucketKind) -> &mut HashMap<String, Bucket> {
        match kind {
            BucketKind::Exact => &mut self.exact,
            BucketKind::Wildcard => &mut self.wildcard,
        }
    }

    /// Append `listener` under an already-normalized name
    pub fn insert(&mut self, name: &str, listener: Listener) -> (BucketKind, usize) {
        let kind = BucketKind::of(name);
        let slot = self
            .store_mut(kind)
            .entry(name.to_string())
            .or_default()
            .push(listener);
        (kind, slot)
    }

    /// Drop both buckets stored under `name`; returns the number of listeners removed
    pub fn remove_all(&mut self, name: &str) -> usize {
        let exact = self.exact.remove(name).map_or(0, |b| b.len());
        let wildcard = self.wildcard.remove(name).map_or(0, |b| b.len());
        exact + wildcard
    }

    /// Remove matching listeners from the bucket of `name`'s own kind
    pub fn remove(&mut self, name: &str, listener: &Listener, default_method: &str) -> usize {
        let store = self.store_mut(BucketKind::of(name));
        let Some(bucket) = store.get_mut(name) else {
            return 0;
        };

        let removed = bucket.remove_matching(listener, default_method);
        if bucket.is_empty() {
            store.remove(name);
        }
        removed
    }

    /// True when either store holds a bucket under exactly this key
    pub fn contains(&self, name: &str) -> bool {
        self.exact.contains_key(name) || self.wildcard.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.wildcard.is_empty()
    }

    pub fn exact(&self, name: &str) -> Option<&Bucket> {
        self.store(BucketKind::Exact).get(name)
    }

    pub fn wildcard(&self, pattern: &str) -> Option<&Bucket> {
        self.store(BucketKind::Wildcard).get(pattern)
    }

    /// The exact bucket for `name` and the wildcard bucket that matches it
    pub fn matching(&self, name: &str) -> (Option<&Bucket>, Option<&Bucket>) {
        let wildcard = wildcard_of(name).and_then(|pattern| self.wildcard(&pattern));
        (self.exact(name), wildcard)
    }

    /// Every registered key, exact names first
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.exact.keys().chain(self.wildcard.keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::listener::DEFAULT_METHOD;
    use serde_json::Value;

    fn listener() -> Listener {
        Listener::direct(|_, _| Ok(Value::Null))
    }

    #[test]
    fn test_bucket_slots_are_never_reused() {
        let mut bucket = Bucket::new();
        let first = listener();
        assert_eq!(bucket.push(first.clone()), 0);
        assert_eq!(bucket.push(listener()), 1);

        assert_eq!(bucket.remove_matching(&first, DEFAULT_METHOD), 1);
        assert_eq!(bucket.push(listener()), 2);
        assert!(bucket.get(0).is_none());
        assert_eq!(bucket.slots().keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_same_listener_occupies_separate_slots() {
        let mut bucket = Bucket::new();
        let l = listener();
        bucket.push(l.clone());
        bucket.push(l.clone());
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket.remove_matching(&l, DEFAULT_METHOD), 2);
        assert!(bucket.is_empty());
    }

    #[test]
    fn test_registry_routes_by_kind() {
        let mut registry = Registry::new();
        assert_eq!(registry.insert("pre.foo", listener()), (BucketKind::Exact, 0));
        assert_eq!(registry.insert("pre.*", listener()), (BucketKind::Wildcard, 0));
        assert_eq!(registry.insert("pre.foo", listener()), (BucketKind::Exact, 1));

        let (exact, wildcard) = registry.matching("pre.foo");
        assert_eq!(exact.map(Bucket::len), Some(2));
        assert_eq!(wildcard.map(Bucket::len), Some(1));

        let (exact, wildcard) = registry.matching("post.foo");
        assert!(exact.is_none() && wildcard.is_none());
    }

    #[test]
    fn test_registry_drops_empty_buckets() {
        let mut registry = Registry::new();
        let l = listener();
        registry.insert("foo", l.clone());
        assert!(registry.contains("foo"));

        assert_eq!(registry.remove("foo", &l, DEFAULT_METHOD), 1);
        assert!(!registry.contains("foo"));
        assert!(registry.is_empty());
        assert_eq!(registry.remove("foo", &l, DEFAULT_METHOD), 0);
    }

    #[test]
    fn test_remove_only_touches_own_kind() {
        let mut registry = Registry::new();
        let l = listener();
        registry.insert("pre.*", l.clone());

        // exact lookup for a wildcard key does not exist
        assert!(registry.exact("pre.*").is_none());
        assert_eq!(registry.remove("pre.*", &l, DEFAULT_METHOD), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_all_clears_both_stores() {
        let mut registry = Registry::new();
        registry.insert("pre.foo", listener());
        registry.insert("pre.foo", listener());
        assert_eq!(registry.remove_all("pre.foo"), 2);
        assert_eq!(registry.remove_all("pre.foo"), 0);
        assert!(registry.is_empty());
    }
}
