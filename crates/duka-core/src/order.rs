use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the customer takes possession of the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fulfillment {
    Pickup,
    Delivery,
}

impl Fulfillment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Fulfillment::Pickup => "pickup",
            Fulfillment::Delivery => "delivery",
        }
    }
}

/// Order lifecycle. The agent only drives the payment-side transitions;
/// fulfillment transitions belong to the merchant's order management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    PaymentPendingReview,
    AwaitingConfirmation,
    Paid,
    PaymentRejected,
    Preparing,
    ReadyForPickup,
    OutForDelivery,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::PaymentPendingReview => "payment_pending_review",
            OrderStatus::AwaitingConfirmation => "awaiting_confirmation",
            OrderStatus::Paid => "paid",
            OrderStatus::PaymentRejected => "payment_rejected",
            OrderStatus::Preparing => "preparing",
            OrderStatus::ReadyForPickup => "ready_for_pickup",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Completed => "completed",
        }
    }

    /// Statuses where payment has not yet been confirmed by the merchant.
    /// Payment-confirmation replies only consider these.
    pub fn is_awaiting_payment(&self) -> bool {
        matches!(
            self,
            OrderStatus::PendingPayment
                | OrderStatus::PaymentPendingReview
                | OrderStatus::AwaitingConfirmation
        )
    }
}

/// One line of a committed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Request to persist a new order. The store assigns identity.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub business_id: String,
    pub contact_id: Uuid,
    pub phone: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub fulfillment: Fulfillment,
    pub delivery_address: Option<String>,
}

/// A committed order as the store returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    /// Human-facing reference, "ORD-4821" style.
    pub order_number: String,
    pub payment_reference: String,
    pub business_id: String,
    pub contact_id: Uuid,
    pub phone: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub fulfillment: Fulfillment,
    pub delivery_address: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Short one-line summary for history blocks and order lists.
    pub fn summary(&self) -> String {
        let items = self
            .items
            .iter()
            .map(|i| {
                if i.quantity > 1 {
                    format!("{}x {}", i.quantity, i.product_name)
                } else {
                    i.product_name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} ({}, {})", self.order_number, items, self.status.as_str())
    }
}

/// Required fields of a pending order, in the order clarifying questions
/// should ask for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Product,
    Price,
    Fulfillment,
    Address,
}

/// The in-progress order assembled across conversational turns. Fields fill
/// in incrementally as the extractor recognizes them in message text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingOrder {
    pub product_name: Option<String>,
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub quantity: u32,
    pub fulfillment: Option<Fulfillment>,
    pub delivery_address: Option<String>,
}

impl PendingOrder {
    /// Effective quantity, never below one.
    pub fn quantity(&self) -> u32 {
        self.quantity.max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.product_name.is_none()
            && self.unit_price.is_none()
            && self.fulfillment.is_none()
            && self.delivery_address.is_none()
    }

    /// Complete iff product, price and fulfillment are set, and delivery
    /// orders also carry a non-empty address. Pickup never needs an address.
    pub fn is_complete(&self) -> bool {
        self.missing_field().is_none()
    }

    /// First missing required field, used to drive the deterministic
    /// clarifying question for that field.
    pub fn missing_field(&self) -> Option<OrderField> {
        if self.product_name.is_none() {
            return Some(OrderField::Product);
        }
        if self.unit_price.is_none() {
            return Some(OrderField::Price);
        }
        match self.fulfillment {
            None => Some(OrderField::Fulfillment),
            Some(Fulfillment::Delivery) => match &self.delivery_address {
                Some(addr) if !addr.trim().is_empty() => None,
                _ => Some(OrderField::Address),
            },
            Some(Fulfillment::Pickup) => None,
        }
    }

    /// Total for the known fields, None until a price is known.
    pub fn total(&self) -> Option<Decimal> {
        self.unit_price
            .map(|p| p * Decimal::from(self.quantity()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn priced(fulfillment: Option<Fulfillment>) -> PendingOrder {
        PendingOrder {
            product_name: Some("Chocolate Cake".into()),
            unit_price: Some(Decimal::from(5000)),
            quantity: 1,
            fulfillment,
            delivery_address: None,
        }
    }

    #[test]
    fn empty_order_is_incomplete() {
        let pending = PendingOrder::default();
        assert!(!pending.is_complete());
        assert_eq!(pending.missing_field(), Some(OrderField::Product));
    }

    #[test]
    fn pickup_needs_no_address() {
        let pending = priced(Some(Fulfillment::Pickup));
        assert!(pending.is_complete());
        assert_eq!(pending.missing_field(), None);
    }

    #[test]
    fn delivery_incomplete_until_address_set() {
        let mut pending = priced(Some(Fulfillment::Delivery));
        assert!(!pending.is_complete());
        assert_eq!(pending.missing_field(), Some(OrderField::Address));

        pending.delivery_address = Some("  ".into());
        assert!(!pending.is_complete());

        pending.delivery_address = Some("12 Allen Avenue, Ikeja".into());
        assert!(pending.is_complete());
    }

    #[test]
    fn missing_fulfillment_reported_before_address() {
        let pending = priced(None);
        assert_eq!(pending.missing_field(), Some(OrderField::Fulfillment));
    }

    #[test]
    fn total_multiplies_quantity() {
        let mut pending = priced(Some(Fulfillment::Pickup));
        pending.quantity = 3;
        assert_eq!(pending.total(), Some(Decimal::from(15000)));
    }

    #[test]
    fn zero_quantity_counts_as_one() {
        let pending = PendingOrder {
            quantity: 0,
            ..priced(Some(Fulfillment::Pickup))
        };
        assert_eq!(pending.quantity(), 1);
        assert_eq!(pending.total(), Some(Decimal::from(5000)));
    }

    #[test]
    fn awaiting_payment_statuses() {
        assert!(OrderStatus::PendingPayment.is_awaiting_payment());
        assert!(OrderStatus::AwaitingConfirmation.is_awaiting_payment());
        assert!(!OrderStatus::Paid.is_awaiting_payment());
        assert!(!OrderStatus::Completed.is_awaiting_payment());
    }
}
