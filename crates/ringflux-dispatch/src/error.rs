use thiserror::Error;

/// Errors surfaced by the dispatch layer's registration-time path.
/// Container operations themselves never return an error type (they return
/// `bool`/`Option`, see `ringflux::Queue`, and so does
/// [`Demultiplexer::enqueue`](crate::Demultiplexer::enqueue)); this enum only
/// covers the registration-time boundary this crate adds.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("control queue is full, registration was dropped")]
    ControlQueueFull,
}

/// Outcome of a [`crate::Reactor::enqueue_and_wait`] call that did not
/// return the handler's data as a plain success.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReactorError {
    #[error("cancelled before a response arrived")]
    Cancelled,
    #[error("timed out waiting for a response")]
    TimedOut,
    /// The matching handler called its response continuation with an
    /// error; the message is whatever the handler supplied.
    #[error("handler responded with an error: {0}")]
    HandlerError(String),
}
