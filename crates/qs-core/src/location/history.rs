//! Browser history seam and its in-memory implementation

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, warn};
use url::Url;

use super::{Location, LocationError, LocationSubscriber, NavigationKind};

/// The routing layer that owns the current URL
///
/// All navigations are shallow: implementations change the URL and notify
/// listeners, they never reload the document.
pub trait History: Send + Sync {
    /// The current location
    fn location(&self) -> Location;

    /// Add a history entry for `href` (absolute, or relative to the current URL)
    fn push(&self, href: &str);

    /// Overwrite the current history entry with `href`
    fn replace(&self, href: &str);

    /// Step back one entry. Returns false when already at the first entry.
    fn back(&self) -> bool;

    /// Step forward one entry. Returns false when already at the last entry.
    fn forward(&self) -> bool;
}

/// History entries stored internally
#[derive(Debug, Clone)]
struct HistoryState {
    entries: Vec<Url>,
    index: usize,
}

impl HistoryState {
    fn current(&self) -> &Url {
        &self.entries[self.index]
    }
}

/// History kept in memory, for headless use and tests
///
/// Counts every navigation event so callers can verify that no-op
/// navigations are skipped.
pub struct MemoryHistory {
    state: Arc<RwLock<HistoryState>>,
    navigations: AtomicUsize,
    subscribers: Arc<RwLock<Vec<Weak<dyn LocationSubscriber>>>>,
}

impl MemoryHistory {
    /// Create a history whose single entry is `initial_url` (absolute)
    pub fn new(initial_url: &str) -> Result<Self, LocationError> {
        let url = Url::parse(initial_url)?;
        if url.cannot_be_a_base() {
            return Err(LocationError::NotHierarchical(initial_url.to_string()));
        }

        Ok(Self {
            state: Arc::new(RwLock::new(HistoryState {
                entries: vec![url],
                index: 0,
            })),
            navigations: AtomicUsize::new(0),
            subscribers: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Number of navigation events fired so far
    pub fn navigation_count(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    /// Number of entries in the history stack
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current full URL
    pub fn href(&self) -> String {
        self.state.read().current().to_string()
    }

    /// Add a subscriber
    pub fn add_subscriber(&self, subscriber: Arc<dyn LocationSubscriber>) {
        let mut subscribers = self.subscribers.write();
        subscribers.push(Arc::downgrade(&subscriber));
    }

    fn resolve(&self, href: &str) -> Option<Url> {
        let state = self.state.read();
        match state.current().join(href) {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(href, error = %err, "ignoring navigation to unparsable href");
                None
            }
        }
    }

    fn commit(&self, kind: NavigationKind) {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        let location = self.location();
        debug!(href = %location.href(), ?kind, "history changed");
        self.notify_subscribers(&location, kind);
    }

    /// Notify all subscribers of a location change
    fn notify_subscribers(&self, location: &Location, kind: NavigationKind) {
        let live: Vec<Arc<dyn LocationSubscriber>> = {
            let mut subscribers = self.subscribers.write();

            // Remove any dead weak references
            subscribers.retain(|weak| weak.strong_count() > 0);
            subscribers.iter().filter_map(|weak| weak.upgrade()).collect()
        };

        // Called without the lock so subscribers may navigate again
        for subscriber in live {
            subscriber.on_location_change(location, kind);
        }
    }
}

impl History for MemoryHistory {
    fn location(&self) -> Location {
        Location::from_url(self.state.read().current())
    }

    fn push(&self, href: &str) {
        let Some(url) = self.resolve(href) else {
            return;
        };
        {
            let mut state = self.state.write();
            let keep = state.index + 1;
            state.entries.truncate(keep);
            state.entries.push(url);
            state.index = keep;
        }
        self.commit(NavigationKind::Push);
    }

    fn replace(&self, href: &str) {
        let Some(url) = self.resolve(href) else {
            return;
        };
        {
            let mut state = self.state.write();
            let index = state.index;
            state.entries[index] = url;
        }
        self.commit(NavigationKind::Replace);
    }

    fn back(&self) -> bool {
        {
            let mut state = self.state.write();
            if state.index == 0 {
                return false;
            }
            state.index -= 1;
        }
        self.commit(NavigationKind::Pop);
        true
    }

    fn forward(&self) -> bool {
        {
            let mut state = self.state.write();
            if state.index + 1 >= state.entries.len() {
                return false;
            }
            state.index += 1;
        }
        self.commit(NavigationKind::Pop);
        true
    }
}
