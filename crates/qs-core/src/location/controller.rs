//! Location-params controller
//!
//! Single point for reading the typed query of the current URL and for
//! issuing navigation intents. Every write is compared against the
//! canonical current URL first, so re-issuing the same filter never adds a
//! history entry or triggers a re-render.
//!
//! Merges are computed against the latest committed history entry, not
//! against a render snapshot. Two merges issued back to back therefore
//! compose: the second sees the keys written by the first.

use std::sync::Arc;

use tracing::debug;

use super::{History, HistoryMode, MergeMode, NavigationIntent, NavigationOutcome, PushOptions};
use crate::events::{events::Navigated, EventBus};
use crate::query::{QueryCodec, QueryPatch, QueryState};

/// Snapshot of the current URL as seen by the controller
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentLocation {
    pub query: QueryState,
    pub pathname: String,
    pub origin: String,
}

/// Read/derive and write-intent adapter over a [`History`]
#[derive(Clone)]
pub struct LocationParams {
    history: Arc<dyn History>,
    codec: QueryCodec,
    events: Option<Arc<EventBus>>,
}

impl LocationParams {
    pub fn new(history: Arc<dyn History>, codec: QueryCodec) -> Self {
        Self {
            history,
            codec,
            events: None,
        }
    }

    /// Publish a [`Navigated`] event for every navigation
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn history(&self) -> &Arc<dyn History> {
        &self.history
    }

    pub fn codec(&self) -> &QueryCodec {
        &self.codec
    }

    /// Current query, pathname and origin.
    ///
    /// Deep links may carry a second query after the fragment
    /// (`/app#/orders?id=5`). That segment is merged over the regular query.
    pub fn current(&self) -> CurrentLocation {
        let location = self.history.location();
        let mut query = self.codec.parse(&location.search);

        if let Some((_, hash_query)) = location.hash.split_once('?') {
            for (key, value) in self.codec.parse(hash_query) {
                query.insert(key, value);
            }
        }

        CurrentLocation {
            query,
            pathname: location.pathname,
            origin: location.origin,
        }
    }

    /// Current typed query
    pub fn query(&self) -> QueryState {
        self.current().query
    }

    /// Navigate with the given patch and flags.
    pub fn push(&self, patch: impl Into<QueryPatch>, options: PushOptions) -> NavigationOutcome {
        self.navigate(NavigationIntent::with_options(patch, options))
    }

    /// Apply a navigation intent.
    ///
    /// Returns [`NavigationOutcome::Unchanged`] without touching the
    /// history when the target URL equals the current one.
    pub fn navigate(&self, intent: NavigationIntent) -> NavigationOutcome {
        let current = self.current();
        let next = match intent.merge {
            MergeMode::Merge => current.query.merged(&intent.query),
            MergeMode::Replace => QueryState::from_patch(&intent.query),
        };

        let pathname = intent.pathname.as_deref().unwrap_or(&current.pathname);
        let target = self.href_for(pathname, &next);
        let canonical = self.href_for(&current.pathname, &current.query);

        if target == canonical {
            debug!(href = %target, "navigation skipped, location unchanged");
            return NavigationOutcome::Unchanged;
        }

        let outcome = match intent.history {
            HistoryMode::Push => {
                self.history.push(&target);
                NavigationOutcome::Pushed(target.clone())
            }
            HistoryMode::Replace => {
                self.history.replace(&target);
                NavigationOutcome::Replaced(target.clone())
            }
        };
        debug!(href = %target, mode = ?intent.history, "navigated");

        if let Some(events) = &self.events {
            events.publish(Navigated {
                href: target,
                mode: intent.history,
            });
        }

        outcome
    }

    /// `pathname` plus the serialized query (no `?` when empty).
    pub fn href_for(&self, pathname: &str, query: &QueryState) -> String {
        let search = self.codec.serialize(query);
        if search.is_empty() {
            pathname.to_string()
        } else {
            format!("{pathname}?{search}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::MemoryHistory;
    use crate::query::QueryValue;
    use parking_lot::Mutex;

    fn controller(url: &str) -> (Arc<MemoryHistory>, LocationParams) {
        let history = Arc::new(MemoryHistory::new(url).unwrap());
        let params = LocationParams::new(history.clone(), QueryCodec::default());
        (history, params)
    }

    #[test]
    fn test_current_reads_typed_query() {
        let (_, params) = controller("https://admin.example.com/users?pageNumber=2&add=true");
        let current = params.current();

        assert_eq!(current.pathname, "/users");
        assert_eq!(current.origin, "https://admin.example.com");
        assert_eq!(current.query.get("pageNumber"), Some(&QueryValue::Number(2.0)));
        assert!(current.query.flag("add"));
    }

    #[test]
    fn test_current_merges_query_after_hash() {
        let (_, params) = controller("https://bot.example.com/app?lang=en#/orders?id=5&lang=de");
        let query = params.query();

        assert_eq!(query.get("id"), Some(&QueryValue::Number(5.0)));
        assert_eq!(query.get("lang"), Some(&QueryValue::from("de")));
    }

    #[test]
    fn test_hash_without_query_is_ignored() {
        let (_, params) = controller("https://bot.example.com/app?lang=en#section");
        assert_eq!(params.query(), QueryState::new().with("lang", "en"));
    }

    #[test]
    fn test_push_verbatim_current_is_noop() {
        let (history, params) = controller("https://admin.example.com/users?b=2&a=1");
        let current = params.query();

        let outcome = params.push(current, PushOptions::default());

        assert_eq!(outcome, NavigationOutcome::Unchanged);
        assert_eq!(history.navigation_count(), 0);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_reissuing_same_filter_is_noop() {
        let (history, params) = controller("https://admin.example.com/users");
        let patch = QueryPatch::new().set("status", "active");

        assert!(params.push(patch.clone(), PushOptions::merge()).navigated());
        assert!(!params.push(patch, PushOptions::merge()).navigated());
        assert_eq!(history.navigation_count(), 1);
    }

    #[test]
    fn test_merge_semantics() {
        let (_, params) = controller("https://admin.example.com/users?a=1&b=2");

        params.push(QueryPatch::new().unset("b").set("c", 3), PushOptions::merge());

        assert_eq!(params.query(), QueryState::new().with("a", 1).with("c", 3));
    }

    #[test]
    fn test_replace_mode_discards_current_state() {
        let (_, params) = controller("https://admin.example.com/users?a=1&b=2");

        params.push(QueryPatch::new().set("c", 3).unset("a"), PushOptions::default());

        assert_eq!(params.query(), QueryState::new().with("c", 3));
    }

    #[test]
    fn test_history_replace_does_not_add_entry() {
        let (history, params) = controller("https://admin.example.com/users");

        let outcome = params.push(QueryPatch::new().set("search", "~bob"), PushOptions::merge_replace());

        assert_eq!(outcome, NavigationOutcome::Replaced("/users?search=%7Ebob".to_string()));
        assert_eq!(history.len(), 1);
        assert_eq!(history.navigation_count(), 1);
    }

    #[test]
    fn test_empty_query_drops_question_mark() {
        let (history, params) = controller("https://admin.example.com/users?add=true");

        params.push(QueryPatch::new().unset("add"), PushOptions::merge());

        assert_eq!(history.href(), "https://admin.example.com/users");
    }

    #[test]
    fn test_intent_with_pathname() {
        let (_, params) = controller("https://admin.example.com/users?pageNumber=4");

        params.navigate(NavigationIntent::new(QueryPatch::new().set("id", 7)).to_path("/orders"));

        let current = params.current();
        assert_eq!(current.pathname, "/orders");
        assert_eq!(current.query, QueryState::new().with("id", 7));
    }

    #[test]
    fn test_back_to_back_merges_compose() {
        let (_, params) = controller("https://admin.example.com/users");

        params.push(QueryPatch::new().set("add", true), PushOptions::merge());
        params.push(QueryPatch::new().set("pageNumber", 2), PushOptions::merge());

        let query = params.query();
        assert!(query.flag("add"));
        assert_eq!(query.get("pageNumber"), Some(&QueryValue::Number(2.0)));
    }

    #[test]
    fn test_hash_deep_link_is_normalized_on_navigation() {
        let (history, params) = controller("https://bot.example.com/app#/x?id=5");

        params.push(QueryPatch::new().set("view", true), PushOptions::merge());

        assert_eq!(history.href(), "https://bot.example.com/app?id=5&view=true");
    }

    #[test]
    fn test_navigation_publishes_event() {
        let (_, params) = controller("https://admin.example.com/users");
        let events = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        events.on::<Navigated, _>(move |e| sink.lock().push(e.href.clone()));
        let params = params.with_events(events);

        params.push(QueryPatch::new().set("tab", "paid"), PushOptions::merge());
        params.push(QueryPatch::new().set("tab", "paid"), PushOptions::merge());

        assert_eq!(*seen.lock(), vec!["/users?tab=paid".to_string()]);
    }
}
