//! Dispatcher Error Types

use thiserror::Error;

/// Result type for dispatcher operations
pub type DispatcherResult<T> = Result<T, DispatcherError>;

/// Errors that can occur while registering or dispatching
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Event names or subscription declarations were malformed
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A bound listener named a method its target does not provide
    #[error("Listener method '{method}' not found while dispatching '{event}'")]
    MethodNotFound { event: String, method: String },

    /// A listener returned an error; the rest of the dispatch was abandoned
    #[error("Listener failed while dispatching '{event}': {source}")]
    ListenerFailed {
        event: String,
        #[source]
        source: anyhow::Error,
    },
}

impl DispatcherError {
    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a method not found error
    pub fn method_not_found<S: Into<String>>(event: S, method: S) -> Self {
        Self::MethodNotFound {
            event: event.into(),
            method: method.into(),
        }
    }

    /// Create a listener failed error
    pub fn listener_failed<S: Into<String>>(event: S, source: anyhow::Error) -> Self {
        Self::ListenerFailed {
            event: event.into(),
            source,
        }
    }
}
