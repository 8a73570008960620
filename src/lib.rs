//! evdispatch
//!
//! A synchronous, in-process publish/subscribe event dispatcher. Listeners
//! are registered against normalized event names or one-level wildcard
//! patterns (`prefix.*`), may be lazily constructed at dispatch time, and
//! can stop further propagation of an [`Event`].

pub mod config;
pub mod dispatcher;
pub mod event;
pub mod logging;
pub mod normalize;

pub use config::{ConfigManager, DispatcherConfig};
pub use dispatcher::{
    Dispatchable, Dispatcher, DispatcherError, DispatcherResult, Handler, Listener, ListenerSet,
    Payload, Subscriber, Subscriptions,
};
pub use event::{Event, EventError};
pub use normalize::{NameNormalizer, NormalizerKind};
