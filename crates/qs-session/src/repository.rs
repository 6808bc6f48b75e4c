//! JSON persistence of session fields

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::storage::KeyValueStorage;
use crate::types::{Address, AddressId, ViewedProduct};
use crate::StorageError;

const ADDRESSES_KEY: &str = "addresses";
const DEFAULT_ADDRESS_KEY: &str = "default_address";
const RECENTLY_VIEWED_KEY: &str = "recently_viewed";

/// Fields restored by [`SessionRepository::load`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedSession {
    pub addresses: Vec<Address>,
    pub default_address: Option<AddressId>,
    pub recently_viewed: Vec<ViewedProduct>,
}

/// Reads and writes session fields as JSON documents
#[derive(Clone)]
pub struct SessionRepository {
    storage: Arc<dyn KeyValueStorage>,
}

impl SessionRepository {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Restore every persisted field. Unreadable fields come back empty.
    pub fn load(&self) -> PersistedSession {
        PersistedSession {
            addresses: self.read_or_default(ADDRESSES_KEY),
            default_address: self.read_or_default(DEFAULT_ADDRESS_KEY),
            recently_viewed: self.read_or_default(RECENTLY_VIEWED_KEY),
        }
    }

    pub fn save_addresses(
        &self,
        addresses: &[Address],
        default_address: Option<AddressId>,
    ) -> Result<(), StorageError> {
        self.write(ADDRESSES_KEY, &addresses)?;
        match default_address {
            Some(id) => self.write(DEFAULT_ADDRESS_KEY, &id),
            None => self.storage.remove(DEFAULT_ADDRESS_KEY),
        }
    }

    pub fn save_recently_viewed(&self, products: &[ViewedProduct]) -> Result<(), StorageError> {
        self.write(RECENTLY_VIEWED_KEY, &products)
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;
        self.storage.set(key, &json)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.storage.get(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn read_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.read(key) {
            Ok(value) => value.unwrap_or_default(),
            Err(error) => {
                warn!(key, %error, "discarding unreadable session data");
                T::default()
            }
        }
    }
}
