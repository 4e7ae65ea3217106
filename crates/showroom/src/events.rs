//! Synchronous multi-subscriber event streams.
//!
//! Every stream delivers events on the caller's thread, in the order handlers
//! subscribed. There is no queueing: `emit` returns once every handler has run.

use std::fmt;

/// Handle returned by [`EventStream::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<T> = Box<dyn FnMut(&T) + Send + Sync>;

/// An ordered list of handlers for one event type.
pub struct EventStream<T> {
    handlers: Vec<(SubscriptionId, Handler<T>)>,
    next_id: u64,
}

impl<T> Default for EventStream<T> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}

impl<T> EventStream<T> {
    /// Create a stream with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. It runs after every handler registered before it.
    pub fn subscribe(&mut self, handler: impl FnMut(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(existing, _)| *existing != id);
        self.handlers.len() != before
    }

    /// Deliver an event to every subscriber, in subscription order.
    pub fn emit(&mut self, event: &T) {
        for (_, handler) in &mut self.handlers {
            handler(event);
        }
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn test_emit_in_subscription_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stream = EventStream::<u32>::new();

        for tag in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            stream.subscribe(move |value| log.lock().unwrap().push(format!("{tag}:{value}")));
        }

        stream.emit(&7);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:7", "second:7", "third:7"]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let count = Arc::new(Mutex::new(0));
        let mut stream = EventStream::<()>::new();

        let id = {
            let count = Arc::clone(&count);
            stream.subscribe(move |()| *count.lock().unwrap() += 1)
        };
        assert_eq!(stream.len(), 1);

        stream.emit(&());
        assert!(stream.unsubscribe(id));
        assert!(!stream.unsubscribe(id));
        stream.emit(&());

        assert_eq!(*count.lock().unwrap(), 1);
        assert!(stream.is_empty());
    }

    #[test]
    fn test_emit_without_subscribers() {
        let mut stream = EventStream::<String>::new();
        stream.emit(&"nobody listens".to_string());
        assert!(stream.is_empty());
    }
}
