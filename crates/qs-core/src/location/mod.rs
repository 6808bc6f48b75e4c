use thiserror::Error;
use url::Url;

use crate::query::QueryPatch;

mod controller;
mod history;
mod subscriber;

pub use controller::{CurrentLocation, LocationParams};
pub use history::{History, MemoryHistory};
pub use subscriber::LocationSubscriber;

/// Errors raised while setting up a history
#[derive(Error, Debug)]
pub enum LocationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("URL cannot carry a path: {0}")]
    NotHierarchical(String),
}

/// Components of the current URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Scheme, host and port, e.g. `https://admin.example.com`
    pub origin: String,
    /// Path starting with `/`
    pub pathname: String,
    /// Query including the leading `?`, or empty
    pub search: String,
    /// Fragment including the leading `#`, or empty
    pub hash: String,
}

impl Location {
    pub fn from_url(url: &Url) -> Self {
        Self {
            origin: url.origin().ascii_serialization(),
            pathname: url.path().to_string(),
            search: url.query().map(|q| format!("?{q}")).unwrap_or_default(),
            hash: url.fragment().map(|f| format!("#{f}")).unwrap_or_default(),
        }
    }

    /// Full URL
    pub fn href(&self) -> String {
        format!("{}{}{}{}", self.origin, self.pathname, self.search, self.hash)
    }
}

/// How the history changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// A new entry was added
    Push,
    /// The current entry was overwritten
    Replace,
    /// Back/forward traversal
    Pop,
}

/// How a patch combines with the current query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Union with the current query, patch wins on conflict
    Merge,
    /// Discard the current query
    #[default]
    Replace,
}

/// Which history mutation a navigation uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    /// Add an entry (back-button navigable)
    #[default]
    Push,
    /// Overwrite the current entry
    Replace,
}

/// Flags accepted by [`LocationParams::push`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushOptions {
    pub merge: bool,
    pub replace: bool,
}

impl PushOptions {
    /// Merge into the current query, adding a history entry
    pub fn merge() -> Self {
        Self {
            merge: true,
            replace: false,
        }
    }

    /// Merge into the current query, overwriting the history entry
    pub fn merge_replace() -> Self {
        Self {
            merge: true,
            replace: true,
        }
    }
}

/// A requested change to the query, with merge and history modes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationIntent {
    /// Target path; the current path when `None`
    pub pathname: Option<String>,
    pub query: QueryPatch,
    pub merge: MergeMode,
    pub history: HistoryMode,
}

impl NavigationIntent {
    pub fn new(query: impl Into<QueryPatch>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_options(query: impl Into<QueryPatch>, options: PushOptions) -> Self {
        Self {
            pathname: None,
            query: query.into(),
            merge: if options.merge {
                MergeMode::Merge
            } else {
                MergeMode::Replace
            },
            history: if options.replace {
                HistoryMode::Replace
            } else {
                HistoryMode::Push
            },
        }
    }

    pub fn to_path(mut self, pathname: impl Into<String>) -> Self {
        self.pathname = Some(pathname.into());
        self
    }

    pub fn merged(mut self) -> Self {
        self.merge = MergeMode::Merge;
        self
    }

    pub fn replacing_history(mut self) -> Self {
        self.history = HistoryMode::Replace;
        self
    }
}

/// Result of a navigation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Target equals the current URL; nothing happened
    Unchanged,
    Pushed(String),
    Replaced(String),
}

impl NavigationOutcome {
    pub fn navigated(&self) -> bool {
        !matches!(self, NavigationOutcome::Unchanged)
    }
}
