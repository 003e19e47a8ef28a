use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use duka_core::{
    BusinessContext, CustomerProfile, EscalationTicket, Feedback, InventoryItem, NewOrder, Order,
    OrderStatus, Result,
};

/// Catalog, brand metadata, and customer profiles for a business.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Business record by identifier.
    async fn business(&self, business_id: &str) -> Result<BusinessContext>;

    /// Resolve the business a customer messaged by its WhatsApp number.
    async fn business_for_number(&self, whatsapp_number: &str) -> Result<Option<BusinessContext>>;

    /// Product catalog for a business.
    async fn inventory(&self, business_id: &str) -> Result<Vec<InventoryItem>>;

    /// Customer profile, created on first contact from an unknown phone.
    async fn profile(&self, business_id: &str, phone: &str) -> Result<CustomerProfile>;

    /// Credit loyalty points and return the new balance.
    async fn add_loyalty_points(&self, business_id: &str, phone: &str, points: u64) -> Result<u64>;

    /// Record a post-order rating.
    async fn record_feedback(&self, business_id: &str, phone: &str, feedback: Feedback)
        -> Result<()>;

    /// Remember a delivery address as the customer's last known address.
    async fn remember_address(&self, business_id: &str, phone: &str, address: &str) -> Result<()>;
}

/// Order persistence. Identity and numbering are assigned here.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_order(&self, new_order: NewOrder) -> Result<Order>;

    async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()>;

    /// Orders for a customer filtered to the given statuses, most recent
    /// first.
    async fn find_orders(
        &self,
        business_id: &str,
        phone: &str,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>>;

    async fn find_by_number(&self, business_id: &str, order_number: &str)
        -> Result<Option<Order>>;
}

/// Outbound media delivery on the customer's channel.
#[async_trait]
pub trait MediaGateway: Send + Sync {
    async fn send_product_image(
        &self,
        phone: &str,
        channel: &str,
        item: &InventoryItem,
    ) -> Result<()>;

    async fn send_catalog(&self, phone: &str, channel: &str, items: &[InventoryItem])
        -> Result<()>;
}

/// Records complaints for human follow-up.
#[async_trait]
pub trait EscalationSink: Send + Sync {
    async fn create_ticket(&self, ticket: EscalationTicket) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

/// One logged message, either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub business_id: String,
    pub phone: String,
    pub direction: Direction,
    pub channel: String,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Conversation transcript, the source of prompt history.
#[async_trait]
pub trait MessageLog: Send + Sync {
    async fn append(&self, entry: LogEntry) -> Result<()>;

    /// The most recent entries for a conversation, oldest first.
    async fn recent(&self, business_id: &str, phone: &str, limit: usize) -> Result<Vec<LogEntry>>;
}
