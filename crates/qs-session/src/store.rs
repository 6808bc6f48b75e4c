//! Observable session store
//!
//! Every mutation goes through a method on [`SessionStore`], which updates
//! the data, writes persisted fields through the repository and notifies
//! subscribers with the kind of change. Storage failures are logged and
//! never surface to the caller.

use std::sync::{Arc, Weak};

use chrono::Utc;
use parking_lot::RwLock;
use qs_core::SessionSettings;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::repository::SessionRepository;
use crate::storage::{FileStorage, MemoryStorage};
use crate::types::{Address, AddressDraft, AddressId, CartLine, ViewedProduct};
use crate::StorageError;

/// What part of the session changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    Addresses,
    DefaultAddress,
    RecentlyViewed,
    Cart,
}

/// Trait for components that react to session changes
pub trait SessionSubscriber: Send + Sync {
    fn on_session_change(&self, change: SessionChange);
}

#[derive(Debug, Default)]
struct SessionData {
    addresses: Vec<Address>,
    default_address: Option<AddressId>,
    /// Most recent first
    recently_viewed: Vec<ViewedProduct>,
    cart: Vec<CartLine>,
}

/// Shopper state shared by the screens of one session
pub struct SessionStore {
    data: RwLock<SessionData>,
    repository: Option<SessionRepository>,
    recently_viewed_limit: usize,
    subscribers: RwLock<Vec<Weak<dyn SessionSubscriber>>>,
}

impl SessionStore {
    /// In-memory store with nothing persisted
    pub fn new(settings: &SessionSettings) -> Self {
        Self {
            data: RwLock::new(SessionData::default()),
            repository: None,
            recently_viewed_limit: settings.recently_viewed_limit,
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Store restored from and writing through to `repository`
    pub fn load(repository: SessionRepository, settings: &SessionSettings) -> Self {
        let persisted = repository.load();
        let mut recently_viewed = persisted.recently_viewed;
        recently_viewed.truncate(settings.recently_viewed_limit);

        // A default that points at a deleted address is dropped
        let default_address = persisted
            .default_address
            .filter(|id| persisted.addresses.iter().any(|a| a.id == *id));

        info!(
            addresses = persisted.addresses.len(),
            recently_viewed = recently_viewed.len(),
            "session restored"
        );

        Self {
            data: RwLock::new(SessionData {
                addresses: persisted.addresses,
                default_address,
                recently_viewed,
                cart: Vec::new(),
            }),
            repository: Some(repository),
            recently_viewed_limit: settings.recently_viewed_limit,
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Store backed by `settings.storage_dir`, or by memory when unset
    pub fn open(settings: &SessionSettings) -> Result<Self, StorageError> {
        let repository = match &settings.storage_dir {
            Some(dir) => SessionRepository::new(Arc::new(FileStorage::open(dir)?)),
            None => SessionRepository::new(Arc::new(MemoryStorage::new())),
        };
        Ok(Self::load(repository, settings))
    }

    /// Add a subscriber. Only a weak reference is kept.
    pub fn subscribe(&self, subscriber: Arc<dyn SessionSubscriber>) {
        self.subscribers.write().push(Arc::downgrade(&subscriber));
    }

    fn notify(&self, change: SessionChange) {
        let live: Vec<Arc<dyn SessionSubscriber>> = {
            let mut subscribers = self.subscribers.write();
            subscribers.retain(|weak| weak.strong_count() > 0);
            subscribers.iter().filter_map(|weak| weak.upgrade()).collect()
        };
        debug!(?change, subscribers = live.len(), "session changed");
        for subscriber in live {
            subscriber.on_session_change(change);
        }
    }

    // --- Addresses ---

    pub fn addresses(&self) -> Vec<Address> {
        self.data.read().addresses.clone()
    }

    pub fn address(&self, id: AddressId) -> Option<Address> {
        self.data.read().addresses.iter().find(|a| a.id == id).cloned()
    }

    /// Save a new address. The first address becomes the default.
    pub fn add_address(&self, draft: AddressDraft) -> Address {
        let address = draft.into_address(Uuid::new_v4());
        let became_default = {
            let mut data = self.data.write();
            data.addresses.push(address.clone());
            let first = data.default_address.is_none();
            if first {
                data.default_address = Some(address.id);
            }
            first
        };

        self.persist_addresses();
        self.notify(SessionChange::Addresses);
        if became_default {
            self.notify(SessionChange::DefaultAddress);
        }
        address
    }

    pub fn update_address(&self, id: AddressId, draft: AddressDraft) -> Option<Address> {
        let updated = {
            let mut data = self.data.write();
            let slot = data.addresses.iter_mut().find(|a| a.id == id)?;
            *slot = draft.into_address(id);
            slot.clone()
        };

        self.persist_addresses();
        self.notify(SessionChange::Addresses);
        Some(updated)
    }

    /// Delete an address. A deleted default moves to the first remaining one.
    pub fn remove_address(&self, id: AddressId) -> bool {
        let default_changed = {
            let mut data = self.data.write();
            let before = data.addresses.len();
            data.addresses.retain(|a| a.id != id);
            if data.addresses.len() == before {
                return false;
            }
            if data.default_address == Some(id) {
                data.default_address = data.addresses.first().map(|a| a.id);
                true
            } else {
                false
            }
        };

        self.persist_addresses();
        self.notify(SessionChange::Addresses);
        if default_changed {
            self.notify(SessionChange::DefaultAddress);
        }
        true
    }

    pub fn default_address(&self) -> Option<Address> {
        let data = self.data.read();
        let id = data.default_address?;
        data.addresses.iter().find(|a| a.id == id).cloned()
    }

    /// Select the default address. Unknown ids are ignored.
    pub fn set_default_address(&self, id: AddressId) -> bool {
        {
            let mut data = self.data.write();
            if !data.addresses.iter().any(|a| a.id == id) {
                warn!(%id, "cannot select unknown address as default");
                return false;
            }
            if data.default_address == Some(id) {
                return true;
            }
            data.default_address = Some(id);
        }

        self.persist_addresses();
        self.notify(SessionChange::DefaultAddress);
        true
    }

    fn persist_addresses(&self) {
        let Some(repository) = &self.repository else {
            return;
        };
        let (addresses, default_address) = {
            let data = self.data.read();
            (data.addresses.clone(), data.default_address)
        };
        if let Err(error) = repository.save_addresses(&addresses, default_address) {
            warn!(%error, "failed to persist addresses");
        }
    }

    // --- Recently viewed ---

    /// Most recent first
    pub fn recently_viewed(&self) -> Vec<ViewedProduct> {
        self.data.read().recently_viewed.clone()
    }

    /// Record a product page visit, moving repeat visits to the front
    pub fn record_view(&self, product_id: impl Into<String>, name: impl Into<String>) {
        let product = ViewedProduct {
            product_id: product_id.into(),
            name: name.into(),
            viewed_at: Utc::now(),
        };
        {
            let mut data = self.data.write();
            data.recently_viewed
                .retain(|p| p.product_id != product.product_id);
            data.recently_viewed.insert(0, product);
            data.recently_viewed.truncate(self.recently_viewed_limit);
        }

        self.persist_recently_viewed();
        self.notify(SessionChange::RecentlyViewed);
    }

    pub fn clear_recently_viewed(&self) {
        {
            let mut data = self.data.write();
            if data.recently_viewed.is_empty() {
                return;
            }
            data.recently_viewed.clear();
        }

        self.persist_recently_viewed();
        self.notify(SessionChange::RecentlyViewed);
    }

    fn persist_recently_viewed(&self) {
        let Some(repository) = &self.repository else {
            return;
        };
        let products = self.data.read().recently_viewed.clone();
        if let Err(error) = repository.save_recently_viewed(&products) {
            warn!(%error, "failed to persist recently viewed products");
        }
    }

    // --- Cart ---

    pub fn cart(&self) -> Vec<CartLine> {
        self.data.read().cart.clone()
    }

    /// Add units of a product, increasing the existing line if any
    pub fn add_to_cart(
        &self,
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: u64,
        quantity: u32,
    ) -> Option<CartLine> {
        if quantity == 0 {
            return None;
        }
        let product_id = product_id.into();
        let line = {
            let mut data = self.data.write();
            match data.cart.iter_mut().find(|l| l.product_id == product_id) {
                Some(line) => {
                    line.quantity = line.quantity.saturating_add(quantity);
                    line.unit_price = unit_price;
                    line.clone()
                }
                None => {
                    let line = CartLine {
                        id: Uuid::new_v4(),
                        product_id,
                        name: name.into(),
                        unit_price,
                        quantity,
                    };
                    data.cart.push(line.clone());
                    line
                }
            }
        };

        self.notify(SessionChange::Cart);
        Some(line)
    }

    /// Set the quantity of a line; zero removes it
    pub fn set_quantity(&self, product_id: &str, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove_from_cart(product_id);
        }
        {
            let mut data = self.data.write();
            let Some(line) = data.cart.iter_mut().find(|l| l.product_id == product_id) else {
                return false;
            };
            if line.quantity == quantity {
                return true;
            }
            line.quantity = quantity;
        }

        self.notify(SessionChange::Cart);
        true
    }

    pub fn remove_from_cart(&self, product_id: &str) -> bool {
        {
            let mut data = self.data.write();
            let before = data.cart.len();
            data.cart.retain(|l| l.product_id != product_id);
            if data.cart.len() == before {
                return false;
            }
        }

        self.notify(SessionChange::Cart);
        true
    }

    pub fn clear_cart(&self) {
        {
            let mut data = self.data.write();
            if data.cart.is_empty() {
                return;
            }
            data.cart.clear();
        }

        self.notify(SessionChange::Cart);
    }

    /// Sum of line subtotals in minor currency units
    pub fn cart_total(&self) -> u64 {
        self.data
            .read()
            .cart
            .iter()
            .fold(0u64, |total, line| total.saturating_add(line.subtotal()))
    }

    /// Number of units in the cart
    pub fn cart_count(&self) -> u32 {
        self.data
            .read()
            .cart
            .iter()
            .fold(0u32, |count, line| count.saturating_add(line.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::KeyValueStorage;
    use parking_lot::Mutex;

    struct Recorder {
        changes: Mutex<Vec<SessionChange>>,
    }

    impl SessionSubscriber for Recorder {
        fn on_session_change(&self, change: SessionChange) {
            self.changes.lock().push(change);
        }
    }

    fn recorder() -> Arc<Recorder> {
        Arc::new(Recorder {
            changes: Mutex::new(Vec::new()),
        })
    }

    fn draft(label: &str) -> AddressDraft {
        AddressDraft {
            label: label.into(),
            recipient: "Ada".into(),
            line1: "1 Main St".into(),
            city: "Springfield".into(),
            postal_code: "12345".into(),
            country: "US".into(),
            ..AddressDraft::default()
        }
    }

    #[test]
    fn test_first_address_becomes_default() {
        let store = SessionStore::new(&SessionSettings::default());
        let home = store.add_address(draft("Home"));
        let office = store.add_address(draft("Office"));

        assert_eq!(store.default_address(), Some(home.clone()));
        assert!(store.set_default_address(office.id));
        assert_eq!(store.default_address().map(|a| a.label), Some("Office".to_string()));
        assert!(!store.set_default_address(Uuid::new_v4()));
    }

    #[test]
    fn test_removing_default_moves_it() {
        let store = SessionStore::new(&SessionSettings::default());
        let home = store.add_address(draft("Home"));
        let office = store.add_address(draft("Office"));

        assert!(store.remove_address(home.id));
        assert_eq!(store.default_address().map(|a| a.id), Some(office.id));

        assert!(store.remove_address(office.id));
        assert_eq!(store.default_address(), None);
        assert!(!store.remove_address(office.id));
    }

    #[test]
    fn test_update_address() {
        let store = SessionStore::new(&SessionSettings::default());
        let home = store.add_address(draft("Home"));

        let updated = store
            .update_address(home.id, AddressDraft { city: "Shelbyville".into(), ..draft("Home") })
            .unwrap();

        assert_eq!(updated.id, home.id);
        assert_eq!(store.address(home.id).unwrap().city, "Shelbyville");
        assert!(store.update_address(Uuid::new_v4(), draft("Nowhere")).is_none());
    }

    #[test]
    fn test_recently_viewed_dedup_and_cap() {
        let settings = SessionSettings {
            recently_viewed_limit: 3,
            ..SessionSettings::default()
        };
        let store = SessionStore::new(&settings);

        for id in ["a", "b", "c", "d"] {
            store.record_view(id, id.to_uppercase());
        }
        store.record_view("c", "C");

        let ids: Vec<_> = store
            .recently_viewed()
            .into_iter()
            .map(|p| p.product_id)
            .collect();
        assert_eq!(ids, vec!["c", "d", "b"]);
    }

    #[test]
    fn test_cart() {
        let store = SessionStore::new(&SessionSettings::default());

        store.add_to_cart("sku-1", "Boots", 12_000, 1);
        store.add_to_cart("sku-1", "Boots", 12_000, 2);
        store.add_to_cart("sku-2", "Socks", 500, 4);
        assert!(store.add_to_cart("sku-3", "Hat", 900, 0).is_none());

        assert_eq!(store.cart().len(), 2);
        assert_eq!(store.cart_count(), 7);
        assert_eq!(store.cart_total(), 38_000);

        assert!(store.set_quantity("sku-2", 1));
        assert_eq!(store.cart_total(), 36_500);

        assert!(store.set_quantity("sku-1", 0));
        assert!(!store.remove_from_cart("sku-1"));
        assert_eq!(store.cart_count(), 1);

        store.clear_cart();
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_subscribers_notified_and_pruned() {
        let store = SessionStore::new(&SessionSettings::default());
        let kept = recorder();
        let dropped = recorder();
        store.subscribe(kept.clone());
        store.subscribe(dropped.clone());
        drop(dropped);

        store.add_address(draft("Home"));
        store.add_to_cart("sku-1", "Boots", 100, 1);
        store.clear_cart();
        store.clear_cart();

        assert_eq!(
            *kept.changes.lock(),
            vec![
                SessionChange::Addresses,
                SessionChange::DefaultAddress,
                SessionChange::Cart,
                SessionChange::Cart,
            ]
        );
        assert_eq!(store.subscribers.read().len(), 1);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SessionSettings {
            storage_dir: Some(dir.path().to_path_buf()),
            ..SessionSettings::default()
        };

        let home = {
            let store = SessionStore::open(&settings).unwrap();
            let home = store.add_address(draft("Home"));
            store.record_view("sku-1", "Boots");
            store.add_to_cart("sku-1", "Boots", 100, 1);
            home
        };

        let restored = SessionStore::open(&settings).unwrap();
        assert_eq!(restored.addresses(), vec![home.clone()]);
        assert_eq!(restored.default_address(), Some(home));
        assert_eq!(restored.recently_viewed().len(), 1);
        assert!(restored.cart().is_empty());
    }

    #[test]
    fn test_corrupt_storage_restores_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("addresses", "not json").unwrap();
        storage.set("default_address", "\"also not a uuid\"").unwrap();

        let store = SessionStore::load(
            SessionRepository::new(storage),
            &SessionSettings::default(),
        );

        assert!(store.addresses().is_empty());
        assert_eq!(store.default_address(), None);
    }
}
