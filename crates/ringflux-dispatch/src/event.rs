use crate::id::EventId;

/// The payload carried across a request/response hop in a [`crate::Reactor`].
///
/// `nonce` increments by one per hop: the event a caller submits carries
/// `nonce = 0`; the correlated response a handler produces carries
/// `nonce = original_nonce + 1`. Correlation between a waiter and its
/// response is by `(id, nonce)`, never by arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<T> {
    pub id: EventId,
    pub nonce: i64,
    pub data: T,
    /// Set by the handler adapter when a handler's response continuation
    /// was called with an error; `None` on the initiating event and on a
    /// successful response.
    pub error: Option<String>,
}

impl<T> Event<T> {
    pub fn new(id: EventId, nonce: i64, data: T) -> Self {
        Self {
            id,
            nonce,
            data,
            error: None,
        }
    }

    pub fn with_error(id: EventId, nonce: i64, data: T, error: String) -> Self {
        Self {
            id,
            nonce,
            data,
            error: Some(error),
        }
    }

    /// The nonce the next hop of this exchange must carry.
    pub fn next_nonce(&self) -> i64 {
        self.nonce + 1
    }
}
