use std::sync::Arc;
use parking_lot::Mutex;
use ahash::AHashMap;

/// Application-wide event bus
///
/// Handlers run synchronously on the publishing thread, after the bus lock
/// is released, so a handler may publish other event types.
pub struct EventBus {
    handlers: Arc<Mutex<AHashMap<std::any::TypeId, Vec<SharedHandler>>>>,
}

type SharedHandler = Arc<Mutex<Box<dyn EventHandler>>>;

/// Event trait that all events must implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Common application events
pub mod events {
    use super::Event;
    use crate::location::HistoryMode;

    /// The controller changed the URL
    #[derive(Debug, Clone)]
    pub struct Navigated {
        pub href: String,
        pub mode: HistoryMode,
    }

    /// Severity of a user-visible notification
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum NotificationLevel {
        Success,
        Info,
        Warning,
        Error,
    }

    /// Transient user-visible message (toast)
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Notification {
        pub level: NotificationLevel,
        pub message: String,
    }

    impl Notification {
        pub fn success(message: impl Into<String>) -> Self {
            Self {
                level: NotificationLevel::Success,
                message: message.into(),
            }
        }

        pub fn info(message: impl Into<String>) -> Self {
            Self {
                level: NotificationLevel::Info,
                message: message.into(),
            }
        }

        pub fn error(message: impl Into<String>) -> Self {
            Self {
                level: NotificationLevel::Error,
                message: message.into(),
            }
        }
    }

    /// A cache bucket was invalidated
    #[derive(Debug, Clone)]
    pub struct CacheInvalidated {
        pub bucket: String,
        pub evicted: usize,
    }

    // Implement Event trait for all event types
    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(Navigated, Notification, CacheInvalidated);
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();
        handlers
            .entry(type_id)
            .or_insert_with(Vec::new)
            .push(Arc::new(Mutex::new(handler)));
    }

    /// Subscribe with a closure receiving the concrete event type
    pub fn on<E, F>(&self, mut f: F)
    where
        E: Event,
        F: FnMut(&E) + Send + Sync + 'static,
    {
        self.subscribe::<E>(handler_from_fn(move |event| {
            if let Some(event) = event.as_any().downcast_ref::<E>() {
                f(event);
            }
        }));
    }

    /// Publish an event
    pub fn publish<E: Event>(&self, event: E) {
        let type_id = std::any::TypeId::of::<E>();
        let snapshot = match self.handlers.lock().get(&type_id) {
            Some(handlers) => handlers.clone(),
            None => return,
        };

        for handler in snapshot {
            handler.lock().handle(&event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}
