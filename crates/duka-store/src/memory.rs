//! In-memory collaborator backings for tests and the demo binary.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use uuid::Uuid;

use duka_core::{
    BusinessContext, CustomerProfile, DukaError, EscalationTicket, Feedback, InventoryItem,
    LastOrder, NewOrder, Order, OrderStatus, Result,
};

use crate::traits::{
    CatalogStore, Direction, EscalationSink, LogEntry, MediaGateway, MessageLog, OrderStore,
};

// ── Catalog ────────────────────────────────────────────────────

#[derive(Default)]
struct CatalogInner {
    businesses: HashMap<String, BusinessContext>,
    inventories: HashMap<String, Vec<InventoryItem>>,
    /// Keyed by (business_id, phone).
    profiles: HashMap<(String, String), CustomerProfile>,
    feedback: Vec<(String, String, Feedback)>,
}

/// Seedable in-memory catalog and profile store.
#[derive(Default)]
pub struct MemoryCatalog {
    inner: Mutex<CatalogInner>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_business(&self, business: BusinessContext, inventory: Vec<InventoryItem>) {
        let mut inner = self.inner.lock();
        inner
            .inventories
            .insert(business.business_id.clone(), inventory);
        inner
            .businesses
            .insert(business.business_id.clone(), business);
    }

    pub fn seed_profile(&self, business_id: &str, profile: CustomerProfile) {
        self.inner
            .lock()
            .profiles
            .insert((business_id.to_string(), profile.phone.clone()), profile);
    }

    /// Recorded feedback, for test assertions.
    pub fn feedback(&self) -> Vec<Feedback> {
        self.inner
            .lock()
            .feedback
            .iter()
            .map(|(_, _, f)| f.clone())
            .collect()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn business(&self, business_id: &str) -> Result<BusinessContext> {
        self.inner
            .lock()
            .businesses
            .get(business_id)
            .cloned()
            .ok_or_else(|| DukaError::BusinessNotFound(business_id.to_string()))
    }

    async fn business_for_number(&self, whatsapp_number: &str) -> Result<Option<BusinessContext>> {
        Ok(self
            .inner
            .lock()
            .businesses
            .values()
            .find(|b| b.whatsapp_number == whatsapp_number)
            .cloned())
    }

    async fn inventory(&self, business_id: &str) -> Result<Vec<InventoryItem>> {
        Ok(self
            .inner
            .lock()
            .inventories
            .get(business_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn profile(&self, business_id: &str, phone: &str) -> Result<CustomerProfile> {
        let mut inner = self.inner.lock();
        let key = (business_id.to_string(), phone.to_string());
        Ok(inner
            .profiles
            .entry(key)
            .or_insert_with(|| CustomerProfile::new(phone))
            .clone())
    }

    async fn add_loyalty_points(&self, business_id: &str, phone: &str, points: u64) -> Result<u64> {
        let mut inner = self.inner.lock();
        let key = (business_id.to_string(), phone.to_string());
        let profile = inner
            .profiles
            .entry(key)
            .or_insert_with(|| CustomerProfile::new(phone));
        profile.loyalty_points += points;
        Ok(profile.loyalty_points)
    }

    async fn record_feedback(
        &self,
        business_id: &str,
        phone: &str,
        feedback: Feedback,
    ) -> Result<()> {
        self.inner
            .lock()
            .feedback
            .push((business_id.to_string(), phone.to_string(), feedback));
        Ok(())
    }

    async fn remember_address(&self, business_id: &str, phone: &str, address: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let key = (business_id.to_string(), phone.to_string());
        let profile = inner
            .profiles
            .entry(key)
            .or_insert_with(|| CustomerProfile::new(phone));
        profile.last_delivery_address = Some(address.to_string());
        Ok(())
    }
}

// ── Orders ─────────────────────────────────────────────────────

/// In-memory order store. Assigns ids, "ORD-XXXX" numbers and payment
/// references, and keeps the customer's profile order history in sync.
#[derive(Default)]
pub struct MemoryOrders {
    orders: Mutex<Vec<Order>>,
}

impl MemoryOrders {
    pub fn new() -> Self {
        Self::default()
    }

    /// All orders, for test assertions.
    pub fn all(&self) -> Vec<Order> {
        self.orders.lock().clone()
    }

    pub fn seed_order(&self, order: Order) {
        self.orders.lock().push(order);
    }

    fn next_order_number(existing: &[Order]) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let candidate = format!("ORD-{}", rng.gen_range(1000..=9999));
            if !existing.iter().any(|o| o.order_number == candidate) {
                return candidate;
            }
        }
    }
}

#[async_trait]
impl OrderStore for MemoryOrders {
    async fn create_order(&self, new_order: NewOrder) -> Result<Order> {
        let mut orders = self.orders.lock();
        let order_number = Self::next_order_number(&orders);
        let payment_reference = order_number.replace("ORD", "PAY");
        let order = Order {
            id: Uuid::new_v4(),
            order_number,
            payment_reference,
            business_id: new_order.business_id,
            contact_id: new_order.contact_id,
            phone: new_order.phone,
            items: new_order.items,
            total_amount: new_order.total_amount,
            fulfillment: new_order.fulfillment,
            delivery_address: new_order.delivery_address,
            status: OrderStatus::PendingPayment,
            created_at: Utc::now(),
        };
        orders.push(order.clone());
        Ok(order)
    }

    async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
        let mut orders = self.orders.lock();
        let order = orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| DukaError::Store(format!("order not found: {order_id}")))?;
        order.status = status;
        Ok(())
    }

    async fn find_orders(
        &self,
        business_id: &str,
        phone: &str,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>> {
        let mut found: Vec<Order> = self
            .orders
            .lock()
            .iter()
            .filter(|o| {
                o.business_id == business_id
                    && o.phone == phone
                    && (statuses.is_empty() || statuses.contains(&o.status))
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_by_number(
        &self,
        business_id: &str,
        order_number: &str,
    ) -> Result<Option<Order>> {
        Ok(self
            .orders
            .lock()
            .iter()
            .find(|o| o.business_id == business_id && o.order_number.eq_ignore_ascii_case(order_number))
            .cloned())
    }
}

/// Profile snapshot helper: summarize a customer's order history the way
/// a database-backed catalog would.
pub fn profile_with_history(mut profile: CustomerProfile, orders: &[Order]) -> CustomerProfile {
    let mut own: Vec<&Order> = orders.iter().filter(|o| o.phone == profile.phone).collect();
    own.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    profile.lifetime_orders = own.len() as u64;
    if let Some(last) = own.first() {
        profile.last_order = Some(LastOrder {
            order_number: last.order_number.clone(),
            summary: last.summary(),
            total_amount: last.total_amount,
            created_at: last.created_at,
        });
        profile.preferred_fulfillment = Some(last.fulfillment);
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for order in &own {
        for item in &order.items {
            *counts.entry(item.product_name.as_str()).or_default() += 1;
        }
    }
    let mut favorites: Vec<(&str, usize)> = counts.into_iter().collect();
    favorites.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    profile.favorite_items = favorites.into_iter().take(3).map(|(n, _)| n.to_string()).collect();
    profile
}

// ── Media ──────────────────────────────────────────────────────

/// Records outbound media sends instead of delivering anything.
#[derive(Default)]
pub struct MemoryMedia {
    sends: Mutex<Vec<(String, String, Vec<String>)>>,
}

impl MemoryMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// (phone, channel, item names) per send, for test assertions.
    pub fn sends(&self) -> Vec<(String, String, Vec<String>)> {
        self.sends.lock().clone()
    }
}

#[async_trait]
impl MediaGateway for MemoryMedia {
    async fn send_product_image(
        &self,
        phone: &str,
        channel: &str,
        item: &InventoryItem,
    ) -> Result<()> {
        self.sends.lock().push((
            phone.to_string(),
            channel.to_string(),
            vec![item.name.clone()],
        ));
        Ok(())
    }

    async fn send_catalog(
        &self,
        phone: &str,
        channel: &str,
        items: &[InventoryItem],
    ) -> Result<()> {
        self.sends.lock().push((
            phone.to_string(),
            channel.to_string(),
            items.iter().map(|i| i.name.clone()).collect(),
        ));
        Ok(())
    }
}

// ── Escalations ────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryEscalations {
    tickets: Mutex<Vec<EscalationTicket>>,
}

impl MemoryEscalations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tickets(&self) -> Vec<EscalationTicket> {
        self.tickets.lock().clone()
    }
}

#[async_trait]
impl EscalationSink for MemoryEscalations {
    async fn create_ticket(&self, ticket: EscalationTicket) -> Result<()> {
        self.tickets.lock().push(ticket);
        Ok(())
    }
}

// ── Message log ────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryMessageLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryMessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl MessageLog for MemoryMessageLog {
    async fn append(&self, entry: LogEntry) -> Result<()> {
        self.entries.lock().push(entry);
        Ok(())
    }

    async fn recent(&self, business_id: &str, phone: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let entries = self.entries.lock();
        let mut matched: Vec<LogEntry> = entries
            .iter()
            .filter(|e| e.business_id == business_id && e.phone == phone)
            .cloned()
            .collect();
        let skip = matched.len().saturating_sub(limit);
        Ok(matched.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_order(phone: &str) -> NewOrder {
        NewOrder {
            business_id: "biz-1".into(),
            contact_id: Uuid::new_v4(),
            phone: phone.into(),
            items: vec![duka_core::OrderItem {
                product_name: "Chocolate Cake".into(),
                unit_price: Decimal::from(5000),
                quantity: 1,
            }],
            total_amount: Decimal::from(5000),
            fulfillment: duka_core::Fulfillment::Pickup,
            delivery_address: None,
        }
    }

    #[tokio::test]
    async fn creates_orders_with_unique_numbers() {
        let store = MemoryOrders::new();
        let a = store.create_order(new_order("+234800")).await.unwrap();
        let b = store.create_order(new_order("+234800")).await.unwrap();
        assert_ne!(a.order_number, b.order_number);
        assert!(a.order_number.starts_with("ORD-"));
        assert_eq!(a.status, OrderStatus::PendingPayment);
        assert_eq!(a.payment_reference, a.order_number.replace("ORD", "PAY"));
    }

    #[tokio::test]
    async fn finds_orders_by_status_most_recent_first() {
        let store = MemoryOrders::new();
        let a = store.create_order(new_order("+234800")).await.unwrap();
        let _b = store.create_order(new_order("+234801")).await.unwrap();
        store
            .update_status(a.id, OrderStatus::Completed)
            .await
            .unwrap();

        let pending = store
            .find_orders("biz-1", "+234800", &[OrderStatus::PendingPayment])
            .await
            .unwrap();
        assert!(pending.is_empty());

        let completed = store
            .find_orders("biz-1", "+234800", &[OrderStatus::Completed])
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, a.id);
    }

    #[tokio::test]
    async fn profile_created_on_first_contact() {
        let catalog = MemoryCatalog::new();
        let p1 = catalog.profile("biz-1", "+234800").await.unwrap();
        let p2 = catalog.profile("biz-1", "+234800").await.unwrap();
        assert_eq!(p1.contact_id, p2.contact_id);
        assert_eq!(p1.loyalty_points, 0);
    }

    #[tokio::test]
    async fn loyalty_points_accumulate() {
        let catalog = MemoryCatalog::new();
        catalog.profile("biz-1", "+234800").await.unwrap();
        assert_eq!(
            catalog.add_loyalty_points("biz-1", "+234800", 50).await.unwrap(),
            50
        );
        assert_eq!(
            catalog.add_loyalty_points("biz-1", "+234800", 25).await.unwrap(),
            75
        );
    }

    #[tokio::test]
    async fn message_log_returns_trailing_window_oldest_first() {
        let log = MemoryMessageLog::new();
        for i in 0..5 {
            log.append(LogEntry {
                business_id: "biz-1".into(),
                phone: "+234800".into(),
                direction: Direction::In,
                channel: "whatsapp".into(),
                text: format!("msg {i}"),
                at: Utc::now(),
            })
            .await
            .unwrap();
        }
        let recent = log.recent("biz-1", "+234800", 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].text, "msg 2");
        assert_eq!(recent[2].text, "msg 4");
    }

    #[test]
    fn history_summarizes_favorites_and_last_order() {
        let profile = CustomerProfile::new("+234800");
        let orders = vec![];
        let summarized = profile_with_history(profile, &orders);
        assert_eq!(summarized.lifetime_orders, 0);
        assert!(summarized.last_order.is_none());
    }
}
