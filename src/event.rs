//! Stoppable Event Value Object
//!
//! An [`Event`] carries an opaque subject, a bag of named arguments and a
//! propagation flag. Dispatching an event (rather than a bare name) makes
//! the dispatch stoppable: once a listener calls
//! [`Event::stop_propagation`], no further listeners run for that call.

use std::borrow::Cow;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Canonical kind of a plain [`Event`]
pub const BASE_EVENT_KIND: &str = "Event";

/// Argument keys that would shadow the subject or the propagation flag
const RESERVED_KEYS: [&str; 2] = ["subject", "propagation_stopped"];

/// Result type for event argument access
pub type EventResult<T> = Result<T, EventError>;

/// Errors raised by event argument access
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EventError {
    /// Requested argument is not present on the event
    #[error("Event argument not found: {key}")]
    ArgumentNotFound { key: String },
}

impl EventError {
    /// Create an argument not found error
    pub fn argument_not_found(key: impl Into<String>) -> Self {
        Self::ArgumentNotFound { key: key.into() }
    }
}

/// Mutable event passed through the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EventRecord")]
pub struct Event {
    kind: Cow<'static, str>,
    subject: Value,
    #[serde(default)]
    arguments: Map<String, Value>,
    #[serde(skip)]
    propagation_stopped: bool,
}

impl Event {
    /// Create a plain event around `subject`
    pub fn new(subject: impl Into<Value>) -> Self {
        Self {
            kind: Cow::Borrowed(BASE_EVENT_KIND),
            subject: subject.into(),
            arguments: Map::new(),
            propagation_stopped: false,
        }
    }

    /// Create a plain event and merge `arguments` onto it
    pub fn with_arguments(subject: impl Into<Value>, arguments: Value) -> Self {
        let mut event = Self::new(subject);
        event.set_arguments(arguments);
        event
    }

    /// Create a derived event whose dispatch name is `kind`
    ///
    /// A derived event keeps the stoppable semantics of a plain event but
    /// is dispatched under its own name, and an explicit payload given to
    /// `dispatch` takes precedence over the event itself.
    pub fn of_kind(kind: impl Into<Cow<'static, str>>, subject: impl Into<Value>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::new(subject)
        }
    }

    /// The name this event is dispatched under
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// True for events built with [`Event::new`]
    pub fn is_base(&self) -> bool {
        self.kind == BASE_EVENT_KIND
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Stop further listeners from receiving this event
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn subject(&self) -> &Value {
        &self.subject
    }

    /// Merge arguments onto the event.
    ///
    /// Objects contribute their keys, arrays contribute their indices as
    /// keys; any other value is ignored. Later values overwrite earlier ones.
    pub fn set_arguments(&mut self, arguments: Value) {
        match arguments {
            Value::Object(map) => {
                for (key, value) in map {
                    self.insert_argument(key, value);
                }
            }
            Value::Array(items) => {
                for (index, value) in items.into_iter().enumerate() {
                    self.insert_argument(index.to_string(), value);
                }
            }
            _ => {}
        }
    }

    /// Set a single argument
    pub fn set_argument(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.insert_argument(key.into(), value.into());
    }

    fn insert_argument(&mut self, key: String, value: Value) {
        if key.is_empty() {
            warn!("Ignoring event argument with an empty key on {} event", self.kind);
            return;
        }
        if RESERVED_KEYS.contains(&key.as_str()) {
            warn!("Ignoring reserved event argument '{}' on {} event", key, self.kind);
            return;
        }
        self.arguments.insert(key, value);
    }

    pub fn has_argument(&self, key: &str) -> bool {
        !key.is_empty() && self.arguments.contains_key(key)
    }

    /// Get a single argument by key
    pub fn argument(&self, key: &str) -> EventResult<&Value> {
        match self.arguments.get(key) {
            Some(value) if self.has_argument(key) => Ok(value),
            _ => Err(EventError::argument_not_found(key)),
        }
    }

    /// All arguments; never includes the subject or the propagation flag
    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }
}

/// Serialized form of an [`Event`]; arguments are re-applied on load
#[derive(Deserialize)]
struct EventRecord {
    kind: String,
    subject: Value,
    #[serde(default)]
    arguments: Map<String, Value>,
}

impl From<EventRecord> for Event {
    fn from(record: EventRecord) -> Self {
        let mut event = Event::of_kind(record.kind, record.subject);
        event.set_arguments(Value::Object(record.arguments));
        event
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}
