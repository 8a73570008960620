//! Dispatch inputs: what is being dispatched and what listeners receive

use std::borrow::Cow;
use log::warn;
use serde_json::Value;

use crate::dispatcher::error::{DispatcherError, DispatcherResult};
use crate::event::Event;

/// The first argument of `dispatch`
#[derive(Debug)]
pub enum Dispatchable<'a> {
    /// A bare event name; the dispatch is not stoppable
    Name(Cow<'a, str>),

    /// An event dispatched under its kind; the dispatch is stoppable
    Event(&'a mut Event),

    /// A value that carries its own event name
    Named { name: Cow<'a, str>, value: Value },
}

impl<'a> Dispatchable<'a> {
    /// Dispatch `value` under `name`
    pub fn named(name: impl Into<Cow<'a, str>>, value: Value) -> Self {
        Self::Named {
            name: name.into(),
            value,
        }
    }

    /// Build a named dispatch from a JSON object exposing a string `name` field
    pub fn from_named_value(value: Value) -> DispatcherResult<Self> {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| DispatcherError::invalid_argument("value does not expose a string 'name' field"))?;

        Ok(Self::named(name, value))
    }
}

impl<'a> From<&'a str> for Dispatchable<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(Cow::Borrowed(name))
    }
}

impl<'a> From<&'a String> for Dispatchable<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(Cow::Borrowed(name.as_str()))
    }
}

impl From<String> for Dispatchable<'_> {
    fn from(name: String) -> Self {
        Self::Name(Cow::Owned(name))
    }
}

impl<'a> From<&'a mut Event> for Dispatchable<'a> {
    fn from(event: &'a mut Event) -> Self {
        Self::Event(event)
    }
}

/// What each listener receives alongside the dispatcher
#[derive(Debug, Default)]
pub enum Payload<'a> {
    #[default]
    None,
    Value(Value),
    Event(&'a mut Event),
}

impl<'a> Payload<'a> {
    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Payload::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn event(&self) -> Option<&Event> {
        match self {
            Payload::Event(event) => Some(&**event),
            _ => None,
        }
    }

    pub fn event_mut(&mut self) -> Option<&mut Event> {
        match self {
            Payload::Event(event) => Some(&mut **event),
            _ => None,
        }
    }

    /// Stop propagation when the payload is an event; returns whether it was
    pub fn stop_propagation(&mut self) -> bool {
        match self.event_mut() {
            Some(event) => {
                event.stop_propagation();
                true
            }
            None => false,
        }
    }

    /// A JSON view of the payload; events render as their serialized form
    pub fn to_value(&self) -> Value {
        match self {
            Payload::None => Value::Null,
            Payload::Value(value) => value.clone(),
            Payload::Event(event) => serde_json::to_value(&**event).unwrap_or_else(|e| {
                warn!("Failed to serialize {} event payload: {}", event.kind(), e);
                Value::Null
            }),
        }
    }
}

impl From<()> for Payload<'_> {
    fn from(_: ()) -> Self {
        Payload::None
    }
}

impl From<Value> for Payload<'_> {
    fn from(value: Value) -> Self {
        Payload::Value(value)
    }
}

impl From<Option<Value>> for Payload<'_> {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Payload::None, Payload::Value)
    }
}

impl From<&str> for Payload<'_> {
    fn from(value: &str) -> Self {
        Payload::Value(Value::from(value))
    }
}

impl From<String> for Payload<'_> {
    fn from(value: String) -> Self {
        Payload::Value(Value::from(value))
    }
}

impl<'a> From<&'a mut Event> for Payload<'a> {
    fn from(event: &'a mut Event) -> Self {
        Payload::Event(event)
    }
}
