//! Session events and the observer adapter

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::AirPlayError;

/// Notifications emitted by an [`AirPlaySession`](super::AirPlaySession)
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The paused state changed; observers should reflect it
    PausedChanged {
        /// New paused state
        paused: bool,
    },
    /// The receiver reported a new playback position
    PositionUpdated {
        /// Position in seconds
        position: f64,
    },
    /// The media duration became known or changed
    DurationUpdated {
        /// Duration in seconds
        duration: f64,
    },
    /// The session ended; always the last event
    Stopped {
        /// `None` for a clean stop, otherwise what ended the session
        error: Option<Arc<AirPlayError>>,
    },
}

impl SessionEvent {
    /// Check if this is the final event of a session
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped { .. })
    }
}

/// Event bus for distributing session events
#[derive(Debug)]
pub struct EventBus {
    /// Broadcast sender
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new event bus
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Create a bus buffering `capacity` events per subscriber
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event
    pub fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error
        let _ = self.tx.send(event);
    }

    /// Get subscriber count
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Delegate-style receiver of session events
///
/// All methods but `stopped_with_error` default to doing nothing.
pub trait SessionObserver: Send + Sync {
    /// Paused state changed
    fn set_paused(&self, _paused: bool) {}

    /// Position changed, in seconds
    fn position_updated(&self, _position: f64) {}

    /// Duration known or changed, in seconds
    fn duration_updated(&self, _duration: f64) {}

    /// The session ended; `None` means it stopped cleanly
    fn stopped_with_error(&self, error: Option<&AirPlayError>);
}

/// Forward events from `receiver` to `observer` until the session stops
///
/// The task ends after delivering `Stopped` or when the bus is dropped.
pub fn observe(
    mut receiver: broadcast::Receiver<SessionEvent>,
    observer: Arc<dyn SessionObserver>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let terminal = event.is_terminal();
                    dispatch(observer.as_ref(), &event);
                    if terminal {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Observer lagged, {skipped} session events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Deliver one event to an observer
pub fn dispatch(observer: &dyn SessionObserver, event: &SessionEvent) {
    match event {
        SessionEvent::PausedChanged { paused } => observer.set_paused(*paused),
        SessionEvent::PositionUpdated { position } => observer.position_updated(*position),
        SessionEvent::DurationUpdated { duration } => observer.duration_updated(*duration),
        SessionEvent::Stopped { error } => observer.stopped_with_error(error.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl SessionObserver for Recorder {
        fn set_paused(&self, paused: bool) {
            self.calls.lock().unwrap().push(format!("paused {paused}"));
        }

        fn position_updated(&self, position: f64) {
            self.calls.lock().unwrap().push(format!("position {position}"));
        }

        fn duration_updated(&self, duration: f64) {
            self.calls.lock().unwrap().push(format!("duration {duration}"));
        }

        fn stopped_with_error(&self, error: Option<&AirPlayError>) {
            let what = error.map_or_else(|| "clean".to_string(), ToString::to_string);
            self.calls.lock().unwrap().push(format!("stopped {what}"));
        }
    }

    #[test]
    fn test_event_bus_subscribe() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let _rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_bus_emit() {
        let bus = EventBus::with_capacity(4);
        let mut rx = bus.subscribe();

        bus.emit(SessionEvent::DurationUpdated { duration: 60.0 });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::DurationUpdated { duration } if duration == 60.0));
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::default();
        bus.emit(SessionEvent::Stopped { error: None });
    }

    #[test]
    fn test_is_terminal() {
        assert!(SessionEvent::Stopped { error: None }.is_terminal());
        assert!(!SessionEvent::PausedChanged { paused: true }.is_terminal());
    }

    #[tokio::test]
    async fn test_observe_forwards_until_stopped() {
        let bus = EventBus::new();
        let recorder = Arc::new(Recorder::default());
        let task = observe(bus.subscribe(), recorder.clone());

        bus.emit(SessionEvent::DurationUpdated { duration: 120.0 });
        bus.emit(SessionEvent::PositionUpdated { position: 1.5 });
        bus.emit(SessionEvent::PausedChanged { paused: true });
        bus.emit(SessionEvent::Stopped {
            error: Some(Arc::new(AirPlayError::Timeout)),
        });
        bus.emit(SessionEvent::PositionUpdated { position: 2.0 });

        task.await.unwrap();
        let calls = recorder.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "duration 120",
                "position 1.5",
                "paused true",
                "stopped operation timed out",
            ]
        );
    }

    #[tokio::test]
    async fn test_observe_ends_when_bus_dropped() {
        let bus = EventBus::new();
        let recorder = Arc::new(Recorder::default());
        let task = observe(bus.subscribe(), recorder.clone());
        drop(bus);

        task.await.unwrap();
        assert!(recorder.calls.lock().unwrap().is_empty());
    }
}
