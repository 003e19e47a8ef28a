//! Prompt assembly: turns conversation state, profile memory, brand
//! guidelines, and the inventory snapshot into the structured context the
//! model sees each turn.

use std::fmt::Write as _;

use duka_core::{format_price, BusinessContext, CustomerProfile, InventoryItem, PendingOrder, ToolSpec};
use duka_store::{Direction, LogEntry};

/// System prompt: who the assistant is, the action envelope contract, and
/// the tool surface.
pub fn system_prompt(business: &BusinessContext, tools: &[ToolSpec]) -> String {
    let mut prompt = format!(
        "You are the sales assistant for {name}, replying to customers on \
         their messaging channel. Be warm and concise. Never invent prices, \
         payment details, or order numbers.\n\n\
         Respond ONLY with JSON objects, one per action:\n\
         - {{\"action\": \"tool_call\", \"tool_name\": \"...\", \"parameters\": {{...}}}}\n\
         - {{\"action\": \"final_answer\", \"message\": \"...\"}}\n\
         After a tool result arrives you will be prompted again before the \
         customer sees anything.\n\nAvailable tools:\n",
        name = business.name
    );
    for tool in tools {
        let _ = writeln!(
            prompt,
            "- {}: {}\n  parameters: {}",
            tool.name, tool.description, tool.parameters
        );
    }
    prompt
}

/// Everything the model needs about this customer and this turn.
#[allow(clippy::too_many_arguments)]
pub fn context_block(
    business: &BusinessContext,
    profile: &CustomerProfile,
    pending: &PendingOrder,
    inventory: &[InventoryItem],
    inventory_cap: usize,
    shown_products: &[String],
    notes: &[String],
    history: &[LogEntry],
    channel: &str,
    message: &str,
) -> String {
    let mut ctx = String::new();

    let _ = writeln!(ctx, "Channel: {channel}");
    let _ = writeln!(ctx, "Business: {}", business.name);
    ctx.push('\n');

    // ── Customer memory ───
    let _ = writeln!(ctx, "Customer:");
    let _ = writeln!(ctx, "- phone: {}", profile.phone);
    if let Some(name) = &profile.name {
        let _ = writeln!(ctx, "- name: {name}");
    }
    let _ = writeln!(ctx, "- loyalty points: {}", profile.loyalty_points);
    let _ = writeln!(ctx, "- lifetime orders: {}", profile.lifetime_orders);
    if !profile.favorite_items.is_empty() {
        let _ = writeln!(ctx, "- favorites: {}", profile.favorite_items.join(", "));
    }
    if let Some(last) = &profile.last_order {
        let _ = writeln!(ctx, "- last order: {}", last.summary);
    }
    if let Some(addr) = &profile.last_delivery_address {
        let _ = writeln!(ctx, "- last delivery address: {addr}");
    }
    if !pending.is_empty() {
        let _ = writeln!(
            ctx,
            "- order in progress: {} x{}",
            pending.product_name.as_deref().unwrap_or("(product not set)"),
            pending.quantity()
        );
        if let Some(field) = pending.missing_field() {
            let _ = writeln!(ctx, "- still missing: {field:?}");
        }
    }
    ctx.push('\n');

    // ── Brand guidelines ───
    let _ = writeln!(ctx, "Brand:");
    if let Some(tone) = &business.tone {
        let _ = writeln!(ctx, "- tone: {tone}");
    }
    if let Some(desc) = &business.description {
        let _ = writeln!(ctx, "- about: {desc}");
    }
    if let Some(site) = &business.website {
        let _ = writeln!(ctx, "- website: {site}");
    }
    if let Some(ig) = &business.instagram {
        let _ = writeln!(ctx, "- instagram: {ig}");
    }
    if !business.channels.is_empty() {
        let _ = writeln!(ctx, "- channels: {}", business.channels.join(", "));
    }
    if let Some(pickup) = &business.pickup_instructions {
        let _ = writeln!(ctx, "- pickup: {pickup}");
    }
    if let Some(settlement) = &business.settlement {
        let _ = writeln!(ctx, "- settlement: {}", settlement.descriptor());
    }
    ctx.push('\n');

    // ── Inventory snapshot ───
    let _ = writeln!(ctx, "Inventory (first {inventory_cap} items):");
    for item in inventory.iter().filter(|i| i.available).take(inventory_cap) {
        let _ = writeln!(
            ctx,
            "- {}: {}",
            item.name,
            format_price(item.price.as_ref(), &business.currency_symbol)
        );
    }
    ctx.push('\n');

    if !shown_products.is_empty() {
        let _ = writeln!(
            ctx,
            "Already sent as media in this conversation (do not re-send): {}",
            shown_products.join(", ")
        );
        ctx.push('\n');
    }

    if !notes.is_empty() {
        let _ = writeln!(ctx, "Notes for this turn:");
        for note in notes {
            let _ = writeln!(ctx, "- {note}");
        }
        ctx.push('\n');
    }

    if !history.is_empty() {
        let _ = writeln!(ctx, "Recent conversation (oldest first):");
        for entry in history {
            let who = match entry.direction {
                Direction::In => "customer",
                Direction::Out => "assistant",
            };
            let _ = writeln!(ctx, "{who}: {}", entry.text);
        }
        ctx.push('\n');
    }

    let _ = write!(ctx, "Customer message: {message}");
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn business() -> BusinessContext {
        BusinessContext {
            business_id: "biz-1".into(),
            name: "Ada's Cakes".into(),
            whatsapp_number: "+234900".into(),
            description: Some("Fresh cakes daily".into()),
            tone: Some("warm".into()),
            website: None,
            instagram: None,
            pickup_instructions: Some("Shop 4, Ikeja mall".into()),
            settlement: None,
            currency_symbol: "₦".into(),
            channels: vec!["whatsapp".into()],
        }
    }

    #[test]
    fn inventory_is_capped_and_priced() {
        let items: Vec<InventoryItem> = (0..10)
            .map(|i| InventoryItem {
                name: format!("Item {i}"),
                price: Some(Decimal::from(1000 * (i + 1))),
                available: true,
                image_ref: None,
            })
            .collect();
        let ctx = context_block(
            &business(),
            &CustomerProfile::new("+234800"),
            &PendingOrder::default(),
            &items,
            6,
            &[],
            &[],
            &[],
            "whatsapp",
            "hello",
        );
        assert!(ctx.contains("Item 5"));
        assert!(!ctx.contains("Item 6"));
        assert!(ctx.contains("₦1,000"));
    }

    #[test]
    fn missing_price_renders_on_request() {
        let items = vec![InventoryItem {
            name: "Mystery Box".into(),
            price: None,
            available: true,
            image_ref: None,
        }];
        let ctx = context_block(
            &business(),
            &CustomerProfile::new("+234800"),
            &PendingOrder::default(),
            &items,
            6,
            &[],
            &[],
            &[],
            "whatsapp",
            "hello",
        );
        assert!(ctx.contains("price on request"));
    }

    #[test]
    fn pending_order_notes_missing_field() {
        let pending = PendingOrder {
            product_name: Some("Chocolate Cake".into()),
            unit_price: Some(Decimal::from(5000)),
            quantity: 1,
            fulfillment: None,
            delivery_address: None,
        };
        let ctx = context_block(
            &business(),
            &CustomerProfile::new("+234800"),
            &pending,
            &[],
            6,
            &[],
            &[],
            &[],
            "whatsapp",
            "hi",
        );
        assert!(ctx.contains("order in progress: Chocolate Cake"));
        assert!(ctx.contains("still missing: Fulfillment"));
    }

    #[test]
    fn shown_products_are_flagged_against_resending() {
        let shown = vec!["Chocolate Cake".to_string()];
        let ctx = context_block(
            &business(),
            &CustomerProfile::new("+234800"),
            &PendingOrder::default(),
            &[],
            6,
            &shown,
            &[],
            &[],
            "whatsapp",
            "show me the menu",
        );
        assert!(ctx.contains("Already sent as media"));
        assert!(ctx.contains("Chocolate Cake"));
    }

    #[test]
    fn system_prompt_lists_tools() {
        let tools = vec![ToolSpec {
            name: "get_inventory".into(),
            description: "List products".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let prompt = system_prompt(&business(), &tools);
        assert!(prompt.contains("Ada's Cakes"));
        assert!(prompt.contains("get_inventory"));
        assert!(prompt.contains("final_answer"));
    }
}
