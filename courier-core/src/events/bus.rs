use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rst_common::with_logging::log::{debug, warn};
use rst_common::with_tokio::tokio;
use rst_common::with_tokio::tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::types::{Event, EventError, EventHandler, EventType};

type Handlers = HashMap<EventType, Vec<Arc<dyn EventHandler>>>;

/// `EventBus` delivers state change events to registered handlers
///
/// Emitting never waits for handlers: events are queued and a single dispatcher task
/// delivers them in emission order, calling handlers of the same type in registration order.
/// A failing or panicking handler is logged and does not stop delivery to the next one.
///
/// The dispatcher is spawned on the current tokio runtime and stops once every clone of
/// the bus has been dropped
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<Handlers>>,
    sender: UnboundedSender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handlers: Arc<RwLock<Handlers>> = Arc::new(RwLock::new(HashMap::new()));

        tokio::spawn(EventBus::dispatch(handlers.clone(), receiver));
        Self { handlers, sender }
    }

    pub fn on<H>(&self, event_type: EventType, handler: H)
    where
        H: EventHandler + 'static,
    {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        handlers
            .entry(event_type)
            .or_default()
            .push(Arc::new(handler));
    }

    /// `subscribe` forwards every event of the given type into a channel. The forwarding
    /// handler is removed once the receiver has been dropped
    pub fn subscribe(&self, event_type: EventType) -> UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.on(event_type, move |event: Event| -> Result<(), EventError> {
            tx.send(event).map_err(|_| EventError::HandlerClosed)
        });

        rx
    }

    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&event_type)
            .map_or(0, |registered| registered.len())
    }

    fn deregister(
        handlers: &Arc<RwLock<Handlers>>,
        event_type: EventType,
        closed: &Arc<dyn EventHandler>,
    ) {
        let mut registered = handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(list) = registered.get_mut(&event_type) {
            list.retain(|handler| !Arc::ptr_eq(handler, closed));
        }
    }

    pub fn emit(&self, event: Event) {
        debug!("[events:emit] {:?}", event.event_type());

        if let Err(err) = self.sender.send(event) {
            warn!("[events:emit] dispatcher stopped: {}", err);
        }
    }

    async fn dispatch(handlers: Arc<RwLock<Handlers>>, mut receiver: UnboundedReceiver<Event>) {
        while let Some(event) = receiver.recv().await {
            let event_type = event.event_type();
            let targets: Vec<Arc<dyn EventHandler>> = {
                let registered = handlers
                    .read()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());

                registered.get(&event_type).cloned().unwrap_or_default()
            };

            for handler in targets {
                let delivered = event.clone();
                let target = handler.clone();
                let outcome = tokio::spawn(async move { target.handle(delivered).await }).await;

                match outcome {
                    Ok(Ok(_)) => {}
                    Ok(Err(EventError::HandlerClosed)) => {
                        debug!("[events:dispatch] {:?} subscriber gone", event_type);
                        EventBus::deregister(&handlers, event_type, &handler);
                    }
                    Ok(Err(err)) => warn!("[events:dispatch] {:?} handler failed: {}", event_type, err),
                    Err(err) => warn!("[events:dispatch] {:?} handler panicked: {}", event_type, err),
                }
            }
        }

        debug!("[events:dispatch] stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::time::Duration;

    use rst_common::with_tokio::tokio::time::timeout;

    use crate::connection::{Connection, Role, State};
    use crate::message::ThreadID;

    fn connection_event() -> Event {
        let connection = Connection::new(Role::Inviter, State::Invited, ThreadID::generate());
        Event::connection(None, &connection)
    }

    #[tokio::test]
    async fn test_handlers_called_in_registration_order() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let first = calls.clone();
        bus.on(EventType::ConnectionStateChanged, move |_event: Event| -> Result<(), EventError> {
            first.lock().unwrap().push("first");
            Ok(())
        });

        let second = calls.clone();
        bus.on(EventType::ConnectionStateChanged, move |_event: Event| -> Result<(), EventError> {
            second.lock().unwrap().push("second");
            Ok(())
        });

        let mut done = bus.subscribe(EventType::ConnectionStateChanged);
        bus.emit(connection_event());

        let received = timeout(Duration::from_secs(1), done.recv()).await;
        assert!(received.is_ok());
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"])
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_delivery() {
        let bus = EventBus::new();

        bus.on(EventType::ConnectionStateChanged, |_event: Event| -> Result<(), EventError> {
            Err(EventError::HandlerError("failed".to_string()))
        });

        bus.on(EventType::ConnectionStateChanged, |_event: Event| -> Result<(), EventError> {
            panic!("broken handler")
        });

        let mut rx = bus.subscribe(EventType::ConnectionStateChanged);
        bus.emit(connection_event());

        let received = timeout(Duration::from_secs(1), rx.recv()).await;
        assert!(received.is_ok());

        let event = received.unwrap();
        assert!(event.is_some());
        assert_eq!(
            event.unwrap().event_type(),
            EventType::ConnectionStateChanged
        )
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_removed() {
        let bus = EventBus::new();
        let gone = bus.subscribe(EventType::ConnectionStateChanged);
        let mut kept = bus.subscribe(EventType::ConnectionStateChanged);
        assert_eq!(bus.handler_count(EventType::ConnectionStateChanged), 2);

        drop(gone);
        bus.emit(connection_event());

        let received = timeout(Duration::from_secs(1), kept.recv()).await;
        assert!(received.is_ok());
        assert_eq!(bus.handler_count(EventType::ConnectionStateChanged), 1);

        bus.emit(connection_event());
        let received = timeout(Duration::from_secs(1), kept.recv()).await;
        assert!(received.unwrap().is_some());
        assert_eq!(bus.handler_count(EventType::ConnectionStateChanged), 1)
    }

    #[tokio::test]
    async fn test_only_matching_type_delivered() {
        let bus = EventBus::new();
        let mut credentials = bus.subscribe(EventType::CredentialStateChanged);
        let mut connections = bus.subscribe(EventType::ConnectionStateChanged);

        bus.emit(connection_event());

        let received = timeout(Duration::from_secs(1), connections.recv()).await;
        assert!(received.is_ok());

        let missing = timeout(Duration::from_millis(100), credentials.recv()).await;
        assert!(missing.is_err())
    }
}
