//! In-Process Event Dispatcher
//!
//! Components register listeners against event names and later dispatch
//! events by name, by [`Event`](crate::event::Event) or by a named value.
//! Every matching listener runs synchronously in registration order and
//! its return value is collected.
//!
//! # Architecture
//!
//! - **Registry**: exact-name and wildcard (`prefix.*`) listener buckets
//! - **Cache**: per-name snapshots of the merged listener set
//! - **Listeners**: direct callbacks, bound handler methods and lazy factories
//! - **Subscribers**: objects registering a batch of their own methods at once
//!
//! # Example Usage
//!
//! ```
//! use evdispatch::dispatcher::{Dispatcher, Listener};
//! use evdispatch::event::Event;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = Dispatcher::new();
//! dispatcher.listen("userCreated", Listener::direct(|payload, _| Ok(payload.to_value())))?;
//!
//! // names are normalized, so both spellings address the same listeners
//! let results = dispatcher.dispatch("user_created", json!({ "id": 1 }))?;
//! assert_eq!(results, vec![json!({ "id": 1 })]);
//!
//! dispatcher.listen("event", Listener::direct(|payload, _| {
//!     payload.stop_propagation();
//!     Ok(json!(null))
//! }))?;
//! let mut event = Event::new("subject");
//! dispatcher.dispatch(&mut event, ())?;
//! assert!(event.is_propagation_stopped());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod listener;
pub mod manager;
pub mod names;
pub mod payload;
pub mod registry;
pub mod subscriber;


// Re-export core types for convenience
pub use cache::ListenerSet;
pub use error::{DispatcherError, DispatcherResult};
pub use listener::{Handler, Listener, ListenerResult, DEFAULT_METHOD};
pub use manager::{Dispatcher, DispatcherBuilder};
pub use names::IntoEventNames;
pub use payload::{Dispatchable, Payload};
pub use subscriber::{MethodSpec, Subscriber, Subscriptions};
