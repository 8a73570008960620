//! Subscriber Protocol
//!
//! A subscriber declares, in one place, which of its own methods should be
//! registered for which events. The dispatcher reads the declaration on
//! every `subscribe`/`unsubscribe` and turns it into bound listeners.

use std::borrow::Cow;

use crate::dispatcher::error::{DispatcherError, DispatcherResult};

/// One method or an ordered list of methods registered for an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSpec {
    One(Cow<'static, str>),
    Many(Vec<Cow<'static, str>>),
}

impl MethodSpec {
    /// Methods in registration order
    pub fn methods(&self) -> &[Cow<'static, str>] {
        match self {
            MethodSpec::One(method) => std::slice::from_ref(method),
            MethodSpec::Many(methods) => methods.as_slice(),
        }
    }
}

impl From<&'static str> for MethodSpec {
    fn from(method: &'static str) -> Self {
        MethodSpec::One(Cow::Borrowed(method))
    }
}

impl From<String> for MethodSpec {
    fn from(method: String) -> Self {
        MethodSpec::One(Cow::Owned(method))
    }
}

impl From<Vec<&'static str>> for MethodSpec {
    fn from(methods: Vec<&'static str>) -> Self {
        MethodSpec::Many(methods.into_iter().map(Cow::Borrowed).collect())
    }
}

impl<const N: usize> From<[&'static str; N]> for MethodSpec {
    fn from(methods: [&'static str; N]) -> Self {
        MethodSpec::Many(methods.into_iter().map(Cow::Borrowed).collect())
    }
}

impl From<Vec<String>> for MethodSpec {
    fn from(methods: Vec<String>) -> Self {
        MethodSpec::Many(methods.into_iter().map(Cow::Owned).collect())
    }
}

/// Ordered event-to-method declaration returned by [`Subscriber::subscribed_events`]
///
/// Declaring the same event twice replaces the earlier entry in place, so
/// the mapping keeps first-declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscriptions {
    entries: Vec<(Cow<'static, str>, MethodSpec)>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `methods` for `event`
    pub fn on(mut self, event: impl Into<Cow<'static, str>>, methods: impl Into<MethodSpec>) -> Self {
        self.insert(event, methods);
        self
    }

    pub fn insert(&mut self, event: impl Into<Cow<'static, str>>, methods: impl Into<MethodSpec>) {
        let event = event.into();
        let methods = methods.into();
        match self.entries.iter_mut().find(|(name, _)| *name == event) {
            Some(entry) => entry.1 = methods,
            None => self.entries.push((event, methods)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MethodSpec)> {
        self.entries.iter().map(|(event, spec)| (&**event, spec))
    }

    /// Every `(event, method)` pair in registration order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &Cow<'static, str>)> {
        self.iter()
            .flat_map(|(event, spec)| spec.methods().iter().map(move |method| (event, method)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reject empty event names, empty method lists and empty method names
    pub fn validate(&self) -> DispatcherResult<()> {
        for (event, spec) in self.iter() {
            if event.is_empty() {
                return Err(DispatcherError::invalid_argument("subscribed event name is empty"));
            }
            if spec.methods().is_empty() {
                return Err(DispatcherError::invalid_argument(format!(
                    "no methods subscribed for '{}'",
                    event
                )));
            }
            if spec.methods().iter().any(|method| method.is_empty()) {
                return Err(DispatcherError::invalid_argument(format!(
                    "empty method name subscribed for '{}'",
                    event
                )));
            }
        }
        Ok(())
    }
}

impl<E, M> FromIterator<(E, M)> for Subscriptions
where
    E: Into<Cow<'static, str>>,
    M: Into<MethodSpec>,
{
    fn from_iter<I: IntoIterator<Item = (E, M)>>(iter: I) -> Self {
        let mut subscriptions = Subscriptions::new();
        for (event, methods) in iter {
            subscriptions.insert(event, methods);
        }
        subscriptions
    }
}

/// An object that registers a batch of its own methods at once
///
/// Implementors are also [`Handler`](crate::dispatcher::Handler)s: every
/// declared method is invoked through `Handler::call` on the subscriber.
pub trait Subscriber: Send + Sync {
    fn subscribed_events(&self) -> Subscriptions;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_preserve_order() {
        let subscriptions = Subscriptions::new()
            .on("pre.foo", ["preFoo1", "preFoo2"])
            .on("post.foo", "postFoo");

        let pairs: Vec<_> = subscriptions
            .pairs()
            .map(|(event, method)| (event.to_string(), method.to_string()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("pre.foo".to_string(), "preFoo1".to_string()),
                ("pre.foo".to_string(), "preFoo2".to_string()),
                ("post.foo".to_string(), "postFoo".to_string()),
            ]
        );
    }

    #[test]
    fn test_redeclaring_event_replaces_entry() {
        let subscriptions: Subscriptions =
            vec![("pre.foo", "a"), ("post.foo", "b"), ("pre.foo", "c")].into_iter().collect();

        assert_eq!(subscriptions.len(), 2);
        let first = subscriptions.iter().next().unwrap();
        assert_eq!(first, ("pre.foo", &MethodSpec::from("c")));
    }

    #[test]
    fn test_validate_rejects_empty_names() {
        assert!(Subscriptions::new().on("pre.foo", "m").validate().is_ok());
        assert!(Subscriptions::new().on("", "m").validate().is_err());
        assert!(Subscriptions::new().on("pre.foo", "").validate().is_err());
        assert!(Subscriptions::new().on("pre.foo", Vec::<String>::new()).validate().is_err());
        assert!(Subscriptions::new().on("pre.foo", ["m", ""]).validate().is_err());
    }
}
