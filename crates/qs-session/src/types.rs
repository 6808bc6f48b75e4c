//! Session data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a saved address
pub type AddressId = Uuid;

/// Shipping address saved by the shopper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,

    /// Short name shown in pickers ("Home", "Office")
    pub label: String,
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

/// Address fields as entered in a form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressDraft {
    pub label: String,
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

impl AddressDraft {
    pub fn into_address(self, id: AddressId) -> Address {
        Address {
            id,
            label: self.label,
            recipient: self.recipient,
            line1: self.line1,
            line2: self.line2,
            city: self.city,
            postal_code: self.postal_code,
            country: self.country,
            phone: self.phone,
        }
    }
}

/// Product detail page visited by the shopper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewedProduct {
    pub product_id: String,
    pub name: String,
    pub viewed_at: DateTime<Utc>,
}

/// One product in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: String,
    pub name: String,

    /// Price of one unit in minor currency units
    pub unit_price: u64,
    pub quantity: u32,
}

impl CartLine {
    pub fn subtotal(&self) -> u64 {
        self.unit_price.saturating_mul(u64::from(self.quantity))
    }
}
