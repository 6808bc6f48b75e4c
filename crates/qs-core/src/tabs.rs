//! Tab and segmented views bound to a query key

use tracing::warn;

use crate::location::{LocationParams, NavigationOutcome, PushOptions};
use crate::query::{QueryPatch, QueryValue};

pub const DEFAULT_TAB_KEY: &str = "tab";

/// Active-tab state of a segmented view, stored in the URL
#[derive(Clone)]
pub struct TabState {
    location: LocationParams,
    key: String,
    tabs: Vec<String>,
}

impl TabState {
    /// Tabs bound to the `tab` key. The first tab is the default.
    pub fn new(location: LocationParams, tabs: &[&str]) -> Self {
        Self::with_key(location, DEFAULT_TAB_KEY, tabs)
    }

    pub fn with_key(location: LocationParams, key: &str, tabs: &[&str]) -> Self {
        Self {
            location,
            key: key.to_string(),
            tabs: tabs.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn tabs(&self) -> &[String] {
        &self.tabs
    }

    /// The tab named in the URL, or the first tab when it names none we know.
    pub fn active(&self) -> Option<&str> {
        let query = self.location.query();
        let named = query.get(&self.key).and_then(tab_text);
        match named {
            Some(name) => self
                .tabs
                .iter()
                .find(|t| **t == name)
                .or_else(|| self.tabs.first())
                .map(String::as_str),
            None => self.tabs.first().map(String::as_str),
        }
    }

    /// Switch tabs. Overwrites the history entry; other keys survive.
    pub fn select(&self, tab: &str) -> NavigationOutcome {
        if !self.tabs.iter().any(|t| t == tab) {
            warn!(tab, key = %self.key, "ignoring unknown tab");
            return NavigationOutcome::Unchanged;
        }
        self.location.push(
            QueryPatch::new().set(self.key.clone(), tab),
            PushOptions::merge_replace(),
        )
    }
}

// Numeric tab names come back from the codec as numbers.
fn tab_text(value: &QueryValue) -> Option<String> {
    value.to_scalar_text()
}
