use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::Fulfillment;

/// Summary of the customer's most recent order, for the profile memory
/// block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastOrder {
    pub order_number: String,
    pub summary: String,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A 1-5 rating with optional free text, captured after order completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub order_id: Option<Uuid>,
    pub rating: u8,
    pub comment: Option<String>,
}

/// Read-mostly snapshot of who the customer is, rebuilt from the stores
/// each turn rather than incrementally patched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub contact_id: Uuid,
    pub phone: String,
    pub name: Option<String>,
    #[serde(default)]
    pub loyalty_points: u64,
    #[serde(default)]
    pub lifetime_orders: u64,
    #[serde(default)]
    pub favorite_items: Vec<String>,
    pub last_order: Option<LastOrder>,
    pub preferred_fulfillment: Option<Fulfillment>,
    pub last_delivery_address: Option<String>,
}

impl CustomerProfile {
    /// Fresh profile for a phone number seen for the first time.
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            contact_id: Uuid::new_v4(),
            phone: phone.into(),
            name: None,
            loyalty_points: 0,
            lifetime_orders: 0,
            favorite_items: Vec::new(),
            last_order: None,
            preferred_fulfillment: None,
            last_delivery_address: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("there")
    }
}
