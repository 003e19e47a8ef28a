//! Order commitment: the completeness+intent gate, the create-order call,
//! and the templated confirmation. The payment block is always rendered
//! from store data, never by the model.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

use duka_core::{
    format_price, BusinessContext, CustomerProfile, Fulfillment, NewOrder, Order, OrderItem,
    PendingOrder,
};
use duka_store::{CatalogStore, OrderStore};

use crate::detectors;
use crate::state::ConversationState;

/// Order creation failed; pending state is kept so the customer does not
/// re-state everything.
pub const COMMIT_RETRY: &str =
    "Sorry, I couldn't place that order just now. Nothing was lost — please say \"yes\" again in a moment.";

/// Set the intent flag from this message: ordering verbs always count, a
/// bare affirmative counts only when a product is already on the table.
pub fn update_intent(state: &mut ConversationState, normalized: &str) {
    if detectors::has_order_intent(normalized) {
        state.intent_confirmed = true;
    } else if detectors::is_affirmative(normalized) && state.pending.product_name.is_some() {
        state.intent_confirmed = true;
    }
}

/// True when every condition to create the order holds.
pub fn gate_open(state: &ConversationState) -> bool {
    state.pending.is_complete() && state.intent_confirmed
}

/// Commit the pending order if the gate is open. Returns the customer
/// reply; `None` means there was nothing to commit this turn.
pub async fn try_commit(
    conv: &Arc<Mutex<ConversationState>>,
    orders: &dyn OrderStore,
    catalog: &dyn CatalogStore,
    business: &BusinessContext,
    profile: &CustomerProfile,
) -> Option<String> {
    // Snapshot under the data lock; the turn lock serializes whole turns
    // so the pending order cannot change between snapshot and clear.
    let pending = {
        let state = conv.lock();
        if !gate_open(&state) {
            return None;
        }
        state.pending.clone()
    };

    let (product_name, unit_price, fulfillment) = match (
        pending.product_name.clone(),
        pending.unit_price,
        pending.fulfillment,
    ) {
        (Some(p), Some(u), Some(f)) => (p, u, f),
        _ => return None,
    };

    let quantity = pending.quantity();
    let total = unit_price * rust_decimal::Decimal::from(quantity);
    let new_order = NewOrder {
        business_id: business.business_id.clone(),
        contact_id: profile.contact_id,
        phone: profile.phone.clone(),
        items: vec![OrderItem {
            product_name: product_name.clone(),
            unit_price,
            quantity,
        }],
        total_amount: total,
        fulfillment,
        delivery_address: pending.delivery_address.clone(),
    };

    let order = match orders.create_order(new_order).await {
        Ok(order) => order,
        Err(e) => {
            warn!(error = %e, "order creation failed, keeping pending state");
            return Some(COMMIT_RETRY.to_string());
        }
    };

    info!(order_number = %order.order_number, total = %order.total_amount, "order committed");

    // Success: clear the in-progress order and remember the address for
    // future "same address" shortcuts.
    conv.lock().reset_pending();
    if let Some(address) = &order.delivery_address {
        if let Err(e) = catalog
            .remember_address(&business.business_id, &profile.phone, address)
            .await
        {
            warn!(error = %e, "failed to remember delivery address");
        }
    }

    Some(confirmation_reply(business, &order, &pending))
}

fn confirmation_reply(business: &BusinessContext, order: &Order, pending: &PendingOrder) -> String {
    let currency = &business.currency_symbol;
    let quantity = pending.quantity();
    let product = pending.product_name.as_deref().unwrap_or("your order");
    let line = if quantity > 1 {
        format!(
            "{quantity}x {product} — {}",
            format_price(Some(&order.total_amount), currency)
        )
    } else {
        format!("{product} — {}", format_price(Some(&order.total_amount), currency))
    };

    let mut reply = format!(
        "Your order is in! 🎉\n\nOrder {}\n{line}\n\n{}",
        order.order_number,
        payment_block(business, order)
    );
    reply.push_str("\n\nReply here as soon as payment is sent and we'll confirm it.");
    reply
}

/// Bank/settlement details for an order, shared by the confirmation reply
/// and the payment-instructions fast path.
pub fn payment_block(business: &BusinessContext, order: &Order) -> String {
    let currency = &business.currency_symbol;
    let mut block = format!(
        "To pay, transfer {}:",
        format_price(Some(&order.total_amount), currency)
    );
    match &business.settlement {
        Some(account) => {
            block.push_str(&format!(
                "\n{} — {}\nAccount name: {}",
                account.bank_name, account.account_number, account.account_name
            ));
        }
        None => block.push_str("\n(payment details to follow from the business)"),
    }
    block.push_str(&format!("\nReference: {}", order.payment_reference));
    if order.fulfillment == Fulfillment::Pickup {
        if let Some(pickup) = &business.pickup_instructions {
            block.push_str(&format!("\nPickup: {pickup}"));
        }
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use duka_core::PendingOrder;
    use rust_decimal::Decimal;

    fn complete_pending() -> PendingOrder {
        PendingOrder {
            product_name: Some("Chocolate Cake".into()),
            unit_price: Some(Decimal::from(5000)),
            quantity: 1,
            fulfillment: Some(Fulfillment::Pickup),
            delivery_address: None,
        }
    }

    #[test]
    fn gate_needs_both_completeness_and_intent() {
        let mut state = ConversationState::default();
        state.pending = complete_pending();
        assert!(!gate_open(&state));

        state.intent_confirmed = true;
        assert!(gate_open(&state));

        state.pending.fulfillment = None;
        assert!(!gate_open(&state));
    }

    #[test]
    fn ordering_verbs_always_set_intent() {
        let mut state = ConversationState::default();
        update_intent(&mut state, &detectors::normalize("I want to order a cake"));
        assert!(state.intent_confirmed);
    }

    #[test]
    fn bare_affirmative_needs_a_known_product() {
        let mut state = ConversationState::default();
        update_intent(&mut state, &detectors::normalize("yes"));
        assert!(!state.intent_confirmed);

        state.pending.product_name = Some("Chocolate Cake".into());
        update_intent(&mut state, &detectors::normalize("yes"));
        assert!(state.intent_confirmed);
    }
}
