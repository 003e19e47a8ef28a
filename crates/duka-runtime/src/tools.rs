//! Tool registry: the named, schema-described operations the model may
//! request. Execution never raises; failures come back as structured
//! `{"error": ...}` strings the model can recover from conversationally.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use duka_core::{
    Feedback, Fulfillment, IssueType, NewOrder, OrderItem, OrderStatus, ToolSpec,
};
use duka_store::{CatalogStore, EscalationSink, MediaGateway, OrderStore};

/// Result of one tool execution: the content fed back to the model plus
/// side-channel effects captured into conversation state.
#[derive(Debug, Clone, Default)]
pub struct ToolOutcome {
    pub content: String,
    /// Catalog items this call sent as media.
    pub shown_products: Vec<String>,
}

impl ToolOutcome {
    fn text(content: String) -> Self {
        Self { content, shown_products: Vec::new() }
    }

    fn error(message: impl std::fmt::Display) -> Self {
        Self::text(json!({ "error": message.to_string() }).to_string())
    }
}

pub struct ToolRegistry {
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    media: Arc<dyn MediaGateway>,
    escalations: Arc<dyn EscalationSink>,
}

impl ToolRegistry {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        media: Arc<dyn MediaGateway>,
        escalations: Arc<dyn EscalationSink>,
    ) -> Self {
        Self { catalog, orders, media, escalations }
    }

    /// Media tools additionally get the conversation channel injected.
    pub fn is_media_tool(name: &str) -> bool {
        matches!(name, "send_product_with_image" | "send_all_products")
    }

    /// Tools guarded by the per-conversation cooldown.
    pub fn is_cooldown_tool(name: &str) -> bool {
        Self::is_media_tool(name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        matches!(
            name,
            "get_inventory"
                | "get_orders"
                | "create_order"
                | "send_product_with_image"
                | "send_all_products"
                | "award_loyalty_points"
                | "check_loyalty_points"
                | "save_feedback"
                | "log_complaint"
        )
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "get_inventory".into(),
                description: "List the business's products with prices and availability.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
            ToolSpec {
                name: "get_orders".into(),
                description: "Fetch the customer's orders, optionally filtered by status.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "status": {
                            "type": "string",
                            "description": "Optional status filter, e.g. pending_payment"
                        }
                    },
                    "required": []
                }),
            },
            ToolSpec {
                name: "create_order".into(),
                description: "Create an order once the customer has confirmed product, quantity and fulfillment. Delivery orders need delivery_address.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "product_name": { "type": "string" },
                        "quantity": { "type": "integer", "minimum": 1 },
                        "fulfillment_type": { "type": "string", "enum": ["pickup", "delivery"] },
                        "delivery_address": { "type": "string" }
                    },
                    "required": ["product_name", "fulfillment_type"]
                }),
            },
            ToolSpec {
                name: "send_product_with_image".into(),
                description: "Send one product's photo and details to the customer.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "product_name": { "type": "string" }
                    },
                    "required": ["product_name"]
                }),
            },
            ToolSpec {
                name: "send_all_products".into(),
                description: "Send the full catalog to the customer. Rate limited; do not repeat if recently sent.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
            ToolSpec {
                name: "award_loyalty_points".into(),
                description: "Credit loyalty points to the customer.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "points": { "type": "integer", "minimum": 1 }
                    },
                    "required": ["points"]
                }),
            },
            ToolSpec {
                name: "check_loyalty_points".into(),
                description: "Look up the customer's loyalty point balance.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
            ToolSpec {
                name: "save_feedback".into(),
                description: "Record the customer's 1-5 rating and optional comment.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                        "comment": { "type": "string" }
                    },
                    "required": ["rating"]
                }),
            },
            ToolSpec {
                name: "log_complaint".into(),
                description: "Open an escalation ticket for the business owner to follow up.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "issue_type": {
                            "type": "string",
                            "enum": ["service_complaint", "refund_request", "owner_callback", "payment_conflict", "order_issue", "delivery_issue"]
                        },
                        "description": { "type": "string" }
                    },
                    "required": ["description"]
                }),
            },
        ]
    }

    /// Execute a tool by name. Unknown tools and tool failures come back
    /// as error strings, never as Err.
    pub async fn execute(&self, name: &str, params: &Value) -> ToolOutcome {
        debug!(tool = name, "executing tool");
        match name {
            "get_inventory" => self.exec_get_inventory(params).await,
            "get_orders" => self.exec_get_orders(params).await,
            "create_order" => self.exec_create_order(params).await,
            "send_product_with_image" => self.exec_send_product(params).await,
            "send_all_products" => self.exec_send_all_products(params).await,
            "award_loyalty_points" => self.exec_award_points(params).await,
            "check_loyalty_points" => self.exec_check_points(params).await,
            "save_feedback" => self.exec_save_feedback(params).await,
            "log_complaint" => self.exec_log_complaint(params).await,
            other => ToolOutcome::error(format!("unknown tool: {other}")),
        }
    }

    async fn exec_get_inventory(&self, params: &Value) -> ToolOutcome {
        let business_id = match str_param(params, "business_id") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        match self.catalog.inventory(&business_id).await {
            Ok(items) => {
                let listed: Vec<Value> = items
                    .iter()
                    .map(|i| {
                        json!({
                            "name": i.name,
                            "price": i.price.map(|p| p.to_string()),
                            "available": i.available,
                        })
                    })
                    .collect();
                ToolOutcome::text(json!({ "items": listed }).to_string())
            }
            Err(e) => ToolOutcome::error(e),
        }
    }

    async fn exec_get_orders(&self, params: &Value) -> ToolOutcome {
        let (business_id, phone) = match identity_params(params) {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let statuses: Vec<OrderStatus> = match params.get("status").and_then(Value::as_str) {
            Some(s) => match serde_json::from_value(Value::String(s.to_string())) {
                Ok(status) => vec![status],
                Err(_) => return ToolOutcome::error(format!("unknown status: {s}")),
            },
            None => vec![],
        };
        match self.orders.find_orders(&business_id, &phone, &statuses).await {
            Ok(orders) => {
                let listed: Vec<Value> = orders
                    .iter()
                    .map(|o| {
                        json!({
                            "order_number": o.order_number,
                            "status": o.status.as_str(),
                            "total": o.total_amount.to_string(),
                            "summary": o.summary(),
                        })
                    })
                    .collect();
                ToolOutcome::text(json!({ "orders": listed }).to_string())
            }
            Err(e) => ToolOutcome::error(e),
        }
    }

    async fn exec_create_order(&self, params: &Value) -> ToolOutcome {
        let (business_id, phone) = match identity_params(params) {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let product_name = match str_param(params, "product_name") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let fulfillment = match str_param(params, "fulfillment_type").and_then(|s| {
            serde_json::from_value::<Fulfillment>(Value::String(s.clone()))
                .map_err(|_| format!("unknown fulfillment_type: {s}"))
        }) {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let delivery_address = params
            .get("delivery_address")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        if fulfillment == Fulfillment::Delivery && delivery_address.is_none() {
            return ToolOutcome::error("delivery orders need delivery_address");
        }
        let quantity = params
            .get("quantity")
            .and_then(Value::as_u64)
            .map(|q| q.max(1) as u32)
            .unwrap_or(1);

        let inventory = match self.catalog.inventory(&business_id).await {
            Ok(items) => items,
            Err(e) => return ToolOutcome::error(e),
        };
        let Some(item) = inventory
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(&product_name))
        else {
            return ToolOutcome::error(format!("product not in catalog: {product_name}"));
        };
        let Some(unit_price) = item.price else {
            return ToolOutcome::error(format!("{product_name} has no listed price"));
        };

        let profile = match self.catalog.profile(&business_id, &phone).await {
            Ok(p) => p,
            Err(e) => return ToolOutcome::error(e),
        };

        let total = unit_price * rust_decimal::Decimal::from(quantity);
        let new_order = NewOrder {
            business_id,
            contact_id: profile.contact_id,
            phone,
            items: vec![OrderItem {
                product_name: item.name.clone(),
                unit_price,
                quantity,
            }],
            total_amount: total,
            fulfillment,
            delivery_address,
        };
        match self.orders.create_order(new_order).await {
            Ok(order) => ToolOutcome::text(
                json!({
                    "order_number": order.order_number,
                    "payment_reference": order.payment_reference,
                    "total": order.total_amount.to_string(),
                    "status": order.status.as_str(),
                })
                .to_string(),
            ),
            Err(e) => ToolOutcome::error(e),
        }
    }

    async fn exec_send_product(&self, params: &Value) -> ToolOutcome {
        let (business_id, phone) = match identity_params(params) {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let channel = match str_param(params, "channel") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let product_name = match str_param(params, "product_name") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let inventory = match self.catalog.inventory(&business_id).await {
            Ok(items) => items,
            Err(e) => return ToolOutcome::error(e),
        };
        let Some(item) = inventory
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(&product_name))
        else {
            return ToolOutcome::error(format!("product not in catalog: {product_name}"));
        };
        match self.media.send_product_image(&phone, &channel, item).await {
            Ok(()) => ToolOutcome {
                content: json!({ "status": "sent", "product": item.name }).to_string(),
                shown_products: vec![item.name.clone()],
            },
            Err(e) => ToolOutcome::error(e),
        }
    }

    async fn exec_send_all_products(&self, params: &Value) -> ToolOutcome {
        let (business_id, phone) = match identity_params(params) {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let channel = match str_param(params, "channel") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let inventory = match self.catalog.inventory(&business_id).await {
            Ok(items) => items,
            Err(e) => return ToolOutcome::error(e),
        };
        let available: Vec<_> = inventory.iter().filter(|i| i.available).cloned().collect();
        match self.media.send_catalog(&phone, &channel, &available).await {
            Ok(()) => ToolOutcome {
                content: json!({ "status": "sent", "count": available.len() }).to_string(),
                shown_products: available.into_iter().map(|i| i.name).collect(),
            },
            Err(e) => ToolOutcome::error(e),
        }
    }

    async fn exec_award_points(&self, params: &Value) -> ToolOutcome {
        let (business_id, phone) = match identity_params(params) {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let Some(points) = params.get("points").and_then(Value::as_u64) else {
            return ToolOutcome::error("missing parameter: points");
        };
        match self.catalog.add_loyalty_points(&business_id, &phone, points).await {
            Ok(balance) => {
                ToolOutcome::text(json!({ "awarded": points, "balance": balance }).to_string())
            }
            Err(e) => ToolOutcome::error(e),
        }
    }

    async fn exec_check_points(&self, params: &Value) -> ToolOutcome {
        let (business_id, phone) = match identity_params(params) {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        match self.catalog.profile(&business_id, &phone).await {
            Ok(profile) => {
                ToolOutcome::text(json!({ "balance": profile.loyalty_points }).to_string())
            }
            Err(e) => ToolOutcome::error(e),
        }
    }

    async fn exec_save_feedback(&self, params: &Value) -> ToolOutcome {
        let (business_id, phone) = match identity_params(params) {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let Some(rating) = params.get("rating").and_then(Value::as_u64) else {
            return ToolOutcome::error("missing parameter: rating");
        };
        if !(1..=5).contains(&rating) {
            return ToolOutcome::error("rating must be 1-5");
        }
        let comment = params
            .get("comment")
            .and_then(Value::as_str)
            .map(String::from);
        let feedback = Feedback { order_id: None, rating: rating as u8, comment };
        match self.catalog.record_feedback(&business_id, &phone, feedback).await {
            Ok(()) => ToolOutcome::text(json!({ "status": "saved" }).to_string()),
            Err(e) => ToolOutcome::error(e),
        }
    }

    async fn exec_log_complaint(&self, params: &Value) -> ToolOutcome {
        let (business_id, phone) = match identity_params(params) {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let description = match str_param(params, "description") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::error(e),
        };
        let issue = params
            .get("issue_type")
            .and_then(Value::as_str)
            .and_then(|s| serde_json::from_value::<IssueType>(Value::String(s.to_string())).ok())
            .unwrap_or(IssueType::ServiceComplaint);
        let profile = match self.catalog.profile(&business_id, &phone).await {
            Ok(p) => p,
            Err(e) => return ToolOutcome::error(e),
        };
        let ticket = duka_core::EscalationTicket::open(
            business_id,
            profile.contact_id,
            phone,
            issue,
            description,
        );
        match self.escalations.create_ticket(ticket).await {
            Ok(()) => ToolOutcome::text(json!({ "status": "logged" }).to_string()),
            Err(e) => ToolOutcome::error(e),
        }
    }
}

fn str_param(params: &Value, key: &str) -> Result<String, String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| format!("missing parameter: {key}"))
}

fn identity_params(params: &Value) -> Result<(String, String), String> {
    Ok((str_param(params, "business_id")?, str_param(params, "phone")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use duka_core::{BusinessContext, InventoryItem};
    use duka_store::{MemoryCatalog, MemoryEscalations, MemoryMedia, MemoryOrders};
    use rust_decimal::Decimal;

    fn registry() -> (Arc<MemoryOrders>, Arc<MemoryMedia>, ToolRegistry) {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.seed_business(
            BusinessContext {
                business_id: "biz-1".into(),
                name: "Ada's Cakes".into(),
                whatsapp_number: "+234900".into(),
                description: None,
                tone: None,
                website: None,
                instagram: None,
                pickup_instructions: None,
                settlement: None,
                currency_symbol: "₦".into(),
                channels: vec!["whatsapp".into()],
            },
            vec![InventoryItem {
                name: "Chocolate Cake".into(),
                price: Some(Decimal::from(5000)),
                available: true,
                image_ref: None,
            }],
        );
        let orders = Arc::new(MemoryOrders::new());
        let media = Arc::new(MemoryMedia::new());
        let registry = ToolRegistry::new(
            catalog,
            orders.clone(),
            media.clone(),
            Arc::new(MemoryEscalations::new()),
        );
        (orders, media, registry)
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_string() {
        let (_, _, registry) = registry();
        let outcome = registry.execute("fly_to_moon", &json!({})).await;
        assert!(outcome.content.contains("unknown tool"));
    }

    #[tokio::test]
    async fn create_order_requires_address_for_delivery() {
        let (orders, _, registry) = registry();
        let outcome = registry
            .execute(
                "create_order",
                &json!({
                    "business_id": "biz-1",
                    "phone": "+234800",
                    "product_name": "Chocolate Cake",
                    "fulfillment_type": "delivery"
                }),
            )
            .await;
        assert!(outcome.content.contains("error"));
        assert!(orders.all().is_empty());
    }

    #[tokio::test]
    async fn create_order_uses_catalog_price() {
        let (orders, _, registry) = registry();
        let outcome = registry
            .execute(
                "create_order",
                &json!({
                    "business_id": "biz-1",
                    "phone": "+234800",
                    "product_name": "chocolate cake",
                    "quantity": 2,
                    "fulfillment_type": "pickup"
                }),
            )
            .await;
        assert!(outcome.content.contains("ORD-"), "{}", outcome.content);
        let all = orders.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].total_amount, Decimal::from(10000));
    }

    #[tokio::test]
    async fn send_all_products_reports_shown_items() {
        let (_, media, registry) = registry();
        let outcome = registry
            .execute(
                "send_all_products",
                &json!({ "business_id": "biz-1", "phone": "+234800", "channel": "whatsapp" }),
            )
            .await;
        assert_eq!(outcome.shown_products, vec!["Chocolate Cake".to_string()]);
        assert_eq!(media.sends().len(), 1);
    }
}
