//! Resolution Cache
//!
//! Per-name snapshots of the listeners a dispatch of that name would run.
//! Snapshots copy descriptors only; nothing is resolved here, so reading the
//! cache never runs a lazy factory.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::dispatcher::listener::Listener;
use crate::dispatcher::names::{is_wildcard, wildcard_of};
use crate::dispatcher::registry::Registry;

/// Merged listeners for one event name: exact slots, then wildcard slots
#[derive(Debug, Clone, Default)]
pub struct ListenerSet {
    exact: BTreeMap<usize, Listener>,
    wildcard: BTreeMap<usize, Listener>,
}

impl ListenerSet {
    /// Listener at `slot` of the exact bucket
    pub fn get(&self, slot: usize) -> Option<&Listener> {
        self.exact.get(&slot)
    }

    /// Listener at `slot` of the wildcard bucket
    pub fn get_wildcard(&self, slot: usize) -> Option<&Listener> {
        self.wildcard.get(&slot)
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.wildcard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.wildcard.is_empty()
    }

    /// Dispatch order
    pub fn iter(&self) -> impl Iterator<Item = &Listener> {
        self.exact.values().chain(self.wildcard.values())
    }

    pub fn exact(&self) -> &BTreeMap<usize, Listener> {
        &self.exact
    }

    pub fn wildcard(&self) -> &BTreeMap<usize, Listener> {
        &self.wildcard
    }
}

/// Lazily built snapshots keyed by normalized event name
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<String, Arc<ListenerSet>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot what `registry` holds for `name` right now
    pub fn build(registry: &Registry, name: &str) -> ListenerSet {
        let (exact, wildcard) = registry.matching(name);
        ListenerSet {
            exact: exact.map(|b| b.slots().clone()).unwrap_or_default(),
            wildcard: wildcard.map(|b| b.slots().clone()).unwrap_or_default(),
        }
    }

    /// Cached snapshot for `name`, building it on a miss
    pub fn get_or_build(&mut self, registry: &Registry, name: &str) -> Arc<ListenerSet> {
        if let Some(set) = self.entries.get(name) {
            return Arc::clone(set);
        }

        let set = Arc::new(Self::build(registry, name));
        self.entries.insert(name.to_string(), Arc::clone(&set));
        set
    }

    /// Drop every snapshot that the bucket under `name` feeds into.
    ///
    /// An exact name only feeds its own entry. A wildcard pattern feeds
    /// itself and every cached name it matches.
    pub fn invalidate(&mut self, name: &str) {
        if is_wildcard(name) {
            self.entries
                .retain(|cached, _| wildcard_of(cached).as_deref() != Some(name));
        } else {
            self.entries.remove(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
