//! Event Dispatcher
//!
//! Central coordinator: owns the listener registry and the resolution cache,
//! normalizes every event name on the way in, and runs matching listeners
//! synchronously in registration order.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use log::{debug, trace};
use parking_lot::Mutex;
use serde_json::Value;

use crate::config::DispatcherConfig;
use crate::dispatcher::cache::{ListenerSet, ResolutionCache};
use crate::dispatcher::error::{DispatcherError, DispatcherResult};
use crate::dispatcher::listener::{Handler, Listener, DEFAULT_METHOD};
use crate::dispatcher::names::IntoEventNames;
use crate::dispatcher::payload::{Dispatchable, Payload};
use crate::dispatcher::registry::Registry;
use crate::dispatcher::subscriber::Subscriber;
use crate::event::Event;
use crate::normalize::{NameNormalizer, NormalizerKind};

/// Registry and cache share one lock so invalidation is atomic with the mutation
#[derive(Debug, Default)]
struct DispatcherState {
    registry: Registry,
    cache: ResolutionCache,
}

/// Where a dispatch looks to decide whether propagation was stopped
enum StopCheck<'e> {
    /// Dispatched by name; never stoppable
    Never,
    /// The payload is the dispatched event
    Payload,
    /// A derived event dispatched with a separate payload
    Origin(&'e Event),
}

impl StopCheck<'_> {
    fn is_stopped(&self, payload: &Payload<'_>) -> bool {
        match self {
            StopCheck::Never => false,
            StopCheck::Payload => payload.event().is_some_and(Event::is_propagation_stopped),
            StopCheck::Origin(event) => event.is_propagation_stopped(),
        }
    }
}

/// Synchronous in-process event dispatcher
pub struct Dispatcher {
    state: Mutex<DispatcherState>,
    normalizer: Box<dyn NameNormalizer>,
    default_method: Cow<'static, str>,
}

impl Dispatcher {
    /// Create a dispatcher with snake-case name normalization
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Create a dispatcher from loaded configuration
    pub fn from_config(config: &DispatcherConfig) -> Self {
        Self::builder()
            .normalizer_kind(config.normalizer)
            .default_method(config.default_method.clone())
            .build()
    }

    /// Canonical form of `name` as used for every registry lookup
    pub fn normalize(&self, name: &str) -> String {
        self.normalizer.normalize(name)
    }

    /// Method invoked on lazy listener targets registered without one
    pub fn default_method(&self) -> &str {
        &self.default_method
    }

    /// Register `listener` for one or more event names
    ///
    /// Names are validated before anything is registered, so a failing call
    /// leaves the dispatcher untouched.
    pub fn listen<N: IntoEventNames>(&self, names: N, listener: Listener) -> DispatcherResult<()> {
        let names = names.into_event_names();
        if names.is_empty() {
            return Err(DispatcherError::invalid_argument("no event names given"));
        }

        let entries = names.into_iter().map(|name| (name, listener.clone())).collect();
        self.register(entries)
    }

    fn register(&self, entries: Vec<(String, Listener)>) -> DispatcherResult<()> {
        let mut normalized = Vec::with_capacity(entries.len());
        for (name, listener) in entries {
            let name = self.normalize(&name);
            if name.is_empty() {
                return Err(DispatcherError::invalid_argument("event name must not be empty"));
            }
            normalized.push((name, listener));
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        for (name, listener) in normalized {
            let (kind, slot) = state.registry.insert(&name, listener);
            state.cache.invalidate(&name);
            debug!("Registered {:?} listener for '{}' at slot {}", kind, name, slot);
        }
        Ok(())
    }

    /// Remove listeners registered under `name`
    ///
    /// With `None` every listener stored under the name goes. Otherwise only
    /// entries matching `listener` are removed. Returns how many were removed;
    /// removing something that is not registered is not an error.
    pub fn unlisten(&self, name: &str, listener: Option<&Listener>) -> usize {
        let name = self.normalize(name);

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let removed = match listener {
            Some(listener) => state.registry.remove(&name, listener, &self.default_method),
            None => state.registry.remove_all(&name),
        };

        if removed > 0 {
            state.cache.invalidate(&name);
            debug!("Removed {} listener(s) for '{}'", removed, name);
        }
        removed
    }

    /// Register every method `subscriber` declares
    pub fn subscribe<S>(&self, subscriber: &Arc<S>) -> DispatcherResult<()>
    where
        S: Subscriber + Handler + 'static,
    {
        let entries = self.subscription_entries(subscriber)?;
        debug!("Subscribing {} listener(s)", entries.len());
        self.register(entries)
    }

    /// Remove every method `subscriber` declares; returns how many were removed
    pub fn unsubscribe<S>(&self, subscriber: &Arc<S>) -> DispatcherResult<usize>
    where
        S: Subscriber + Handler + 'static,
    {
        let entries = self.subscription_entries(subscriber)?;
        Ok(entries
            .iter()
            .map(|(name, listener)| self.unlisten(name, Some(listener)))
            .sum())
    }

    fn subscription_entries<S>(&self, subscriber: &Arc<S>) -> DispatcherResult<Vec<(String, Listener)>>
    where
        S: Subscriber + Handler + 'static,
    {
        let subscriptions = subscriber.subscribed_events();
        subscriptions.validate()?;

        let target: Arc<dyn Handler> = Arc::clone(subscriber) as Arc<dyn Handler>;
        Ok(subscriptions
            .pairs()
            .map(|(name, method)| {
                (name.to_string(), Listener::bound(Arc::clone(&target), method.clone()))
            })
            .collect())
    }

    /// Dispatch an event to every matching listener
    ///
    /// Returns the value of each listener actually invoked, in order. A
    /// listener error aborts the remaining listeners and is returned.
    pub fn dispatch<'a>(
        &self,
        event: impl Into<Dispatchable<'a>>,
        payload: impl Into<Payload<'a>>,
    ) -> DispatcherResult<Vec<Value>> {
        let (name, mut payload, check) = match event.into() {
            Dispatchable::Name(name) => (name, payload.into(), StopCheck::Never),
            Dispatchable::Named { name, value } => {
                let payload = match payload.into() {
                    Payload::None => Payload::Value(value),
                    given => given,
                };
                (name, payload, StopCheck::Never)
            }
            Dispatchable::Event(event) => {
                let name = Cow::Owned(event.kind().to_string());
                match payload.into() {
                    Payload::None => (name, Payload::Event(event), StopCheck::Payload),
                    _ if event.is_base() => (name, Payload::Event(event), StopCheck::Payload),
                    given => {
                        let origin: &'a Event = event;
                        (name, given, StopCheck::Origin(origin))
                    }
                }
            }
        };

        let name = self.normalize(&name);
        let Some(listeners) = self.snapshot(&name) else {
            debug!("No listeners for '{}'", name);
            return Ok(Vec::new());
        };

        debug!("Dispatching '{}' to {} listener(s)", name, listeners.len());
        let mut results = Vec::with_capacity(listeners.len());
        for listener in listeners.iter() {
            let resolved = listener.resolve(&self.default_method);
            if check.is_stopped(&payload) {
                trace!("Propagation stopped, skipping {:?} for '{}'", listener, name);
                continue;
            }

            trace!("Invoking {:?} for '{}'", listener, name);
            results.push(resolved.invoke(&name, &mut payload, self)?);
        }
        Ok(results)
    }

    /// Cached listener set for an already-normalized name, or `None` when nothing matches
    fn snapshot(&self, name: &str) -> Option<Arc<ListenerSet>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let (exact, wildcard) = state.registry.matching(name);
        if exact.is_none() && wildcard.is_none() {
            return None;
        }
        Some(state.cache.get_or_build(&state.registry, name))
    }

    /// True if a bucket is stored under exactly this (normalized) name
    pub fn has_listeners(&self, name: &str) -> bool {
        let name = self.normalize(name);
        self.state.lock().registry.contains(&name)
    }

    /// True if anything at all is registered
    pub fn has_any_listeners(&self) -> bool {
        !self.state.lock().registry.is_empty()
    }

    /// Listeners a dispatch of `name` would run, exact slots then wildcard slots
    pub fn get_listeners(&self, name: &str) -> ListenerSet {
        let name = self.normalize(name);
        self.snapshot(&name)
            .map(|set| (*set).clone())
            .unwrap_or_default()
    }

    /// Listener sets for every registered exact name and wildcard pattern
    pub fn all_listeners(&self) -> BTreeMap<String, ListenerSet> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let keys: Vec<String> = state.registry.keys().cloned().collect();
        keys.into_iter()
            .map(|key| {
                let set = state.cache.get_or_build(&state.registry, &key);
                (key, (*set).clone())
            })
            .collect()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Dispatcher")
            .field("registry", &state.registry)
            .field("cached", &state.cache.len())
            .field("default_method", &self.default_method)
            .finish()
    }
}

/// Builder for [`Dispatcher`]
pub struct DispatcherBuilder {
    normalizer: Box<dyn NameNormalizer>,
    default_method: Cow<'static, str>,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self {
            normalizer: NormalizerKind::default().build(),
            default_method: Cow::Borrowed(DEFAULT_METHOD),
        }
    }
}

impl DispatcherBuilder {
    /// Use a custom name normalizer
    pub fn normalizer<N: NameNormalizer + 'static>(mut self, normalizer: N) -> Self {
        self.normalizer = Box::new(normalizer);
        self
    }

    /// Use one of the built-in normalizers
    pub fn normalizer_kind(mut self, kind: NormalizerKind) -> Self {
        self.normalizer = kind.build();
        self
    }

    pub fn default_method(mut self, method: impl Into<Cow<'static, str>>) -> Self {
        self.default_method = method.into();
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            state: Mutex::new(DispatcherState::default()),
            normalizer: self.normalizer,
            default_method: self.default_method,
        }
    }
}
