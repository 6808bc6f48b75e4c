//! Core of the URL-synchronized view state
//!
//! The URL is the single source of truth for list/detail/editor screens.
//! This crate provides the typed query codec, the history seam, the
//! location-params controller that reads and writes it, and the shared
//! application context.

pub mod cache;
pub mod config;
pub mod context;
pub mod events;
pub mod location;
pub mod query;
pub mod tabs;

// Re-export commonly used types
pub use cache::QueryCache;
pub use config::{ConfigError, Settings, SessionSettings, TableSettings};
pub use context::AppContext;
pub use events::{EventBus, events::{Notification, NotificationLevel}};
pub use location::{
    CurrentLocation, History, HistoryMode, Location, LocationParams, LocationSubscriber,
    MemoryHistory, MergeMode, NavigationIntent, NavigationKind, NavigationOutcome, PushOptions,
};
pub use query::{CodecConfig, QueryCodec, QueryPatch, QueryState, QueryValue};
pub use tabs::TabState;
