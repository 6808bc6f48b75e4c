//! Location subscriber trait

use super::{Location, NavigationKind};

/// Trait for components that re-derive their state when the URL changes
pub trait LocationSubscriber: Send + Sync {
    /// Called after every history entry change
    fn on_location_change(&self, location: &Location, kind: NavigationKind);
}
