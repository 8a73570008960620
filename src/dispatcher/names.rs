//! Event name helpers: wildcard detection and name-list conversion

use std::borrow::Cow;

/// Marker that turns an event name into a wildcard pattern
pub const WILDCARD_SUFFIX: &str = ".*";

/// True when `name` is a wildcard pattern (`prefix.*`)
pub fn is_wildcard(name: &str) -> bool {
    name.contains(WILDCARD_SUFFIX)
}

/// The wildcard pattern that matches `name`, if any.
///
/// Only one level is supported: `pre.foo` is matched by `pre.*`, while
/// `pre.foo.bar` and `prefoo` have no pattern. A pattern is its own match.
pub fn wildcard_of(name: &str) -> Option<Cow<'_, str>> {
    if is_wildcard(name) {
        return Some(Cow::Borrowed(name));
    }
    match name.split_once('.') {
        Some((prefix, rest)) if !rest.contains('.') => {
            Some(Cow::Owned(format!("{}{}", prefix, WILDCARD_SUFFIX)))
        }
        _ => None,
    }
}

/// Anything `listen` accepts as one or more event names
pub trait IntoEventNames {
    fn into_event_names(self) -> Vec<String>;
}

impl IntoEventNames for &str {
    fn into_event_names(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoEventNames for String {
    fn into_event_names(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoEventNames for &String {
    fn into_event_names(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl<S: AsRef<str>> IntoEventNames for Vec<S> {
    fn into_event_names(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>> IntoEventNames for &[S] {
    fn into_event_names(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>, const N: usize> IntoEventNames for [S; N] {
    fn into_event_names(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}
