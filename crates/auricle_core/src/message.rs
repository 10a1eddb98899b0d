//! Engine Event Notifications
//!
//! Events flow from the engine (and its stream callbacks) to the host.
//! Data-path conditions that are handled silently (underrun, overflow) do
//! not produce events; only lifecycle transitions and terminal stream
//! errors are surfaced.

/// Events sent from the engine to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Engine started successfully.
    Started,

    /// Engine stopped.
    Stopped,

    /// A stream reported a terminal error. The engine stays in whatever
    /// state it was in; the host should call `stop()` then retry `start()`.
    StreamError { message: String },
}

impl Event {
    /// Create a stream-error event from any error type.
    pub fn error<E: std::fmt::Display>(err: E) -> Self {
        Event::StreamError {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_event() {
        let event = Event::error("device disconnected");
        if let Event::StreamError { message } = event {
            assert_eq!(message, "device disconnected");
        } else {
            panic!("Should be StreamError variant");
        }
    }

    #[test]
    fn test_lifecycle_events_compare() {
        assert_eq!(Event::Started, Event::Started);
        assert_ne!(Event::Started, Event::Stopped);
    }
}
