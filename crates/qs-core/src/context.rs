//! Process-wide application context
//!
//! Built once at bootstrap and handed to every screen by `Arc`. Holds the
//! shared services and the init-once flags that would otherwise live in
//! module-level globals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::cache::QueryCache;
use crate::config::Settings;
use crate::events::{events::Notification, EventBus};
use crate::location::{History, LocationParams};
use crate::query::QueryCodec;

/// Shared services and init-once state
pub struct AppContext {
    settings: Settings,
    events: Arc<EventBus>,
    cache: Arc<QueryCache>,
    dev_notice_shown: AtomicBool,
    routing_initialized: AtomicBool,
}

impl AppContext {
    /// Build the context from loaded settings
    pub fn bootstrap(settings: Settings) -> Arc<Self> {
        let events = Arc::new(EventBus::new());
        let cache = Arc::new(QueryCache::default().with_events(events.clone()));
        info!(dev_mode = settings.dev_mode, "application context created");

        Arc::new(Self {
            settings,
            events,
            cache,
            dev_notice_shown: AtomicBool::new(false),
            routing_initialized: AtomicBool::new(false),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn codec(&self) -> QueryCodec {
        QueryCodec::new(self.settings.codec.clone())
    }

    /// Controller over `history`, wired to this context's codec and event bus.
    pub fn location(&self, history: Arc<dyn History>) -> LocationParams {
        if self.mark_routing_initialized() {
            info!("routing initialized");
        }
        LocationParams::new(history, self.codec()).with_events(self.events.clone())
    }

    /// True only for the first caller.
    pub fn mark_routing_initialized(&self) -> bool {
        !self.routing_initialized.swap(true, Ordering::SeqCst)
    }

    pub fn is_routing_initialized(&self) -> bool {
        self.routing_initialized.load(Ordering::SeqCst)
    }

    /// True only for the first caller.
    pub fn mark_dev_notice_shown(&self) -> bool {
        !self.dev_notice_shown.swap(true, Ordering::SeqCst)
    }

    /// Publish the development mode notice once per context.
    ///
    /// Returns whether the notice was published by this call.
    pub fn notify_dev_mode(&self) -> bool {
        if !self.settings.dev_mode || !self.mark_dev_notice_shown() {
            return false;
        }
        self.events
            .publish(Notification::info("Running in development mode"));
        true
    }

    /// Clear the init-once flags.
    pub fn reset(&self) {
        self.dev_notice_shown.store(false, Ordering::SeqCst);
        self.routing_initialized.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::MemoryHistory;
    use parking_lot::Mutex;

    #[test]
    fn test_flags_fire_once_and_reset() {
        let ctx = AppContext::bootstrap(Settings::default());

        assert!(ctx.mark_dev_notice_shown());
        assert!(!ctx.mark_dev_notice_shown());

        ctx.reset();
        assert!(ctx.mark_dev_notice_shown());
    }

    #[test]
    fn test_dev_notice_published_once() {
        let ctx = AppContext::bootstrap(Settings {
            dev_mode: true,
            ..Settings::default()
        });
        let count = Arc::new(Mutex::new(0));
        let sink = count.clone();
        ctx.events().on::<Notification, _>(move |_| *sink.lock() += 1);

        assert!(ctx.notify_dev_mode());
        assert!(!ctx.notify_dev_mode());
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_dev_notice_skipped_outside_dev_mode() {
        let ctx = AppContext::bootstrap(Settings::default());
        assert!(!ctx.notify_dev_mode());
    }

    #[test]
    fn test_location_marks_routing_initialized() {
        let ctx = AppContext::bootstrap(Settings::default());
        assert!(!ctx.is_routing_initialized());

        let history = Arc::new(MemoryHistory::new("https://shop.example.com/").unwrap());
        let _params = ctx.location(history);

        assert!(ctx.is_routing_initialized());
        assert!(!ctx.mark_routing_initialized());
    }

    #[test]
    fn test_contexts_are_independent() {
        let a = AppContext::bootstrap(Settings::default());
        let b = AppContext::bootstrap(Settings::default());
        assert!(a.mark_dev_notice_shown());
        assert!(b.mark_dev_notice_shown());
    }
}
