//! Listener Descriptors and Resolution
//!
//! A [`Listener`] is what gets registered: a direct callback, a method
//! bound to a [`Handler`] target, or a lazy factory producing the target on
//! every dispatch. Descriptors are stored as-is and only turned into
//! something invocable ([`ResolvedListener`]) at dispatch time.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use serde_json::Value;

use crate::dispatcher::error::{DispatcherError, DispatcherResult};
use crate::dispatcher::manager::Dispatcher;
use crate::dispatcher::payload::Payload;

/// Method invoked on a lazy target when none is named
pub const DEFAULT_METHOD: &str = "invoke";

/// Value returned by a listener invocation
pub type ListenerResult = anyhow::Result<Value>;

/// Direct listener callback
pub type Callback = Arc<dyn Fn(&mut Payload<'_>, &Dispatcher) -> ListenerResult + Send + Sync>;

/// Lazy listener factory; called once per matching dispatch
pub type Factory = Arc<dyn Fn() -> Arc<dyn Handler> + Send + Sync>;

/// Target object for bound and lazy listeners
///
/// Implementations route a method name to behaviour. Returning `None`
/// reports that the method does not exist, which aborts the dispatch with
/// [`DispatcherError::MethodNotFound`].
pub trait Handler: Send + Sync {
    fn call(
        &self,
        method: &str,
        payload: &mut Payload<'_>,
        dispatcher: &Dispatcher,
    ) -> Option<ListenerResult>;
}

/// A registered listener descriptor
#[derive(Clone)]
pub enum Listener {
    /// A plain callback
    Direct(Callback),

    /// `method` invoked on `target`
    Bound {
        target: Arc<dyn Handler>,
        method: Cow<'static, str>,
    },

    /// `method` (or [`DEFAULT_METHOD`]) invoked on whatever `factory` produces
    Lazy {
        factory: Factory,
        method: Option<Cow<'static, str>>,
    },
}

impl Listener {
    /// Wrap a closure as a direct listener
    pub fn direct<F>(callback: F) -> Self
    where
        F: Fn(&mut Payload<'_>, &Dispatcher) -> ListenerResult + Send + Sync + 'static,
    {
        Listener::Direct(Arc::new(callback))
    }

    /// Bind `method` on an existing target
    pub fn bound(target: Arc<dyn Handler>, method: impl Into<Cow<'static, str>>) -> Self {
        Listener::Bound {
            target,
            method: method.into(),
        }
    }

    /// Produce the target from `factory` on every dispatch and call `method` on it
    pub fn lazy<F, H>(factory: F, method: Option<&'static str>) -> Self
    where
        F: Fn() -> Arc<H> + Send + Sync + 'static,
        H: Handler + 'static,
    {
        let factory: Factory = Arc::new(move || -> Arc<dyn Handler> { factory() });
        Listener::Lazy {
            factory,
            method: method.map(Cow::Borrowed),
        }
    }

    /// True for bound and lazy listeners (the `[target, method]` shapes)
    pub fn is_pair(&self) -> bool {
        !matches!(self, Listener::Direct(_))
    }

    /// The method component of a pair, as registered
    pub fn method(&self) -> Option<&str> {
        match self {
            Listener::Direct(_) => None,
            Listener::Bound { method, .. } => Some(&**method),
            Listener::Lazy { method, .. } => method.as_deref(),
        }
    }

    /// The method a pair resolves to, with `default_method` standing in for an unnamed lazy one
    pub fn effective_method<'a>(&'a self, default_method: &'a str) -> Option<&'a str> {
        match self {
            Listener::Lazy { method: None, .. } => Some(default_method),
            other => other.method(),
        }
    }

    /// Identity comparison: same callback, target or factory and same method
    pub fn same_as(&self, other: &Listener) -> bool {
        match (self, other) {
            (Listener::Direct(a), Listener::Direct(b)) => same_arc(a, b),
            (
                Listener::Bound { target: a, method: ma },
                Listener::Bound { target: b, method: mb },
            ) => same_arc(a, b) && ma == mb,
            (
                Listener::Lazy { factory: a, method: ma },
                Listener::Lazy { factory: b, method: mb },
            ) => same_arc(a, b) && ma == mb,
            _ => false,
        }
    }

    /// Whether a stored listener should be removed by an `unlisten` naming `requested`.
    ///
    /// Pairs also match on method alone, so a lazy registration can be removed
    /// through the bound pair it resolves to and the other way round.
    pub(crate) fn matches_removal(&self, requested: &Listener, default_method: &str) -> bool {
        self.same_as(requested)
            || (self.is_pair()
                && requested.is_pair()
                && self.effective_method(default_method) == requested.effective_method(default_method))
    }

    /// Turn the descriptor into something invocable; lazy factories run here
    pub fn resolve(&self, default_method: &str) -> ResolvedListener {
        match self {
            Listener::Direct(callback) => ResolvedListener::Callback(Arc::clone(callback)),
            Listener::Bound { target, method } => ResolvedListener::Method {
                target: Arc::clone(target),
                method: method.clone(),
            },
            Listener::Lazy { factory, method } => ResolvedListener::Method {
                target: factory(),
                method: method
                    .clone()
                    .unwrap_or_else(|| Cow::Owned(default_method.to_string())),
            },
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listener::Direct(callback) => f
                .debug_tuple("Direct")
                .field(&Arc::as_ptr(callback).cast::<()>())
                .finish(),
            Listener::Bound { target, method } => f
                .debug_struct("Bound")
                .field("target", &Arc::as_ptr(target).cast::<()>())
                .field("method", method)
                .finish(),
            Listener::Lazy { factory, method } => f
                .debug_struct("Lazy")
                .field("factory", &Arc::as_ptr(factory).cast::<()>())
                .field("method", method)
                .finish(),
        }
    }
}

/// A listener ready to be invoked
pub enum ResolvedListener {
    Callback(Callback),
    Method {
        target: Arc<dyn Handler>,
        method: Cow<'static, str>,
    },
}

impl ResolvedListener {
    /// Invoke with the dispatch payload; listener errors are wrapped, never swallowed
    pub fn invoke(
        &self,
        event_name: &str,
        payload: &mut Payload<'_>,
        dispatcher: &Dispatcher,
    ) -> DispatcherResult<Value> {
        match self {
            ResolvedListener::Callback(callback) => callback(payload, dispatcher)
                .map_err(|e| DispatcherError::listener_failed(event_name, e)),
            ResolvedListener::Method { target, method } => {
                match target.call(method, payload, dispatcher) {
                    Some(result) => result.map_err(|e| DispatcherError::listener_failed(event_name, e)),
                    None => Err(DispatcherError::method_not_found(event_name, &**method)),
                }
            }
        }
    }
}

fn same_arc<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use serde_json::json;

    struct Echo;

    impl Handler for Echo {
        fn call(&self, method: &str, payload: &mut Payload<'_>, _dispatcher: &Dispatcher) -> Option<ListenerResult> {
            match method {
                "echo" | DEFAULT_METHOD => Some(Ok(payload.to_value())),
                _ => None,
            }
        }
    }

    #[test]
    fn test_listener_shapes() {
        let direct = Listener::direct(|_, _| Ok(Value::Null));
        let bound = Listener::bound(Arc::new(Echo), "echo");
        let lazy = Listener::lazy(|| Arc::new(Echo), None);

        assert!(!direct.is_pair());
        assert!(bound.is_pair());
        assert!(lazy.is_pair());
        assert_eq!(direct.method(), None);
        assert_eq!(bound.method(), Some("echo"));
        assert_eq!(lazy.method(), None);
    }

    #[test]
    fn test_identity_comparison() {
        let target: Arc<dyn Handler> = Arc::new(Echo);
        let a = Listener::bound(Arc::clone(&target), "echo");
        let b = Listener::bound(Arc::clone(&target), "echo");
        let c = Listener::bound(Arc::new(Echo), "echo");

        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));

        let direct = Listener::direct(|_, _| Ok(Value::Null));
        assert!(direct.same_as(&direct.clone()));
        assert!(!direct.same_as(&Listener::direct(|_, _| Ok(Value::Null))));
    }

    #[test]
    fn test_removal_matches_on_method() {
        let bound = Listener::bound(Arc::new(Echo), "echo");
        let lazy = Listener::lazy(|| Arc::new(Echo), Some("echo"));
        let other = Listener::bound(Arc::new(Echo), "other");
        let direct = Listener::direct(|_, _| Ok(Value::Null));

        assert!(lazy.matches_removal(&bound, DEFAULT_METHOD));
        assert!(bound.matches_removal(&lazy, DEFAULT_METHOD));
        assert!(!bound.matches_removal(&other, DEFAULT_METHOD));
        assert!(!direct.matches_removal(&bound, DEFAULT_METHOD));
        assert!(!bound.matches_removal(&direct, DEFAULT_METHOD));
    }

    #[test]
    fn test_unnamed_lazy_removal_uses_default_method() {
        let unnamed = Listener::lazy(|| Arc::new(Echo), None);
        let invoke = Listener::bound(Arc::new(Echo), DEFAULT_METHOD);
        let handle = Listener::bound(Arc::new(Echo), "handle");

        assert_eq!(unnamed.effective_method(DEFAULT_METHOD), Some(DEFAULT_METHOD));
        assert!(unnamed.matches_removal(&invoke, DEFAULT_METHOD));
        assert!(invoke.matches_removal(&unnamed, DEFAULT_METHOD));
        assert!(!unnamed.matches_removal(&handle, DEFAULT_METHOD));
        assert!(unnamed.matches_removal(&handle, "handle"));
    }

    #[test]
    fn test_lazy_resolution_calls_factory_each_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = Listener::lazy(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Arc::new(Echo)
            },
            None,
        );

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        match lazy.resolve(DEFAULT_METHOD) {
            ResolvedListener::Method { method, .. } => assert_eq!(method, DEFAULT_METHOD),
            ResolvedListener::Callback(_) => panic!("Expected a method listener"),
        }
        lazy.resolve(DEFAULT_METHOD);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invoke_reports_missing_method() {
        let dispatcher = Dispatcher::new();
        let resolved = Listener::bound(Arc::new(Echo), "missing").resolve(DEFAULT_METHOD);
        let err = resolved.invoke("pre.foo", &mut Payload::None, &dispatcher).unwrap_err();
        assert!(matches!(err, DispatcherError::MethodNotFound { ref method, .. } if method == "missing"));

        let resolved = Listener::bound(Arc::new(Echo), "echo").resolve(DEFAULT_METHOD);
        let value = resolved.invoke("pre.foo", &mut Payload::from(json!(5)), &dispatcher).unwrap();
        assert_eq!(value, json!(5));
    }

    #[test]
    fn test_invoke_wraps_listener_errors() {
        let dispatcher = Dispatcher::new();
        let resolved = Listener::direct(|_, _| Err(anyhow::anyhow!("boom"))).resolve(DEFAULT_METHOD);
        let err = resolved.invoke("pre.foo", &mut Payload::None, &dispatcher).unwrap_err();
        assert_eq!(err.to_string(), "Listener failed while dispatching 'pre.foo': boom");
    }
}
