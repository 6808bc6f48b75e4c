//! Per-session shopper state
//!
//! Addresses, recently viewed products and the cart, with explicit
//! mutations, weak subscribers and write-through persistence.

pub mod repository;
pub mod storage;
pub mod store;
pub mod types;

use thiserror::Error;

// Re-exports
pub use repository::{PersistedSession, SessionRepository};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{SessionChange, SessionStore, SessionSubscriber};
pub use types::{Address, AddressDraft, AddressId, CartLine, ViewedProduct};

/// Errors raised by session storage
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
