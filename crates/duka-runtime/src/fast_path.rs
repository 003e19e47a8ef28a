//! The deterministic short-circuit ladder: ordered guard predicates
//! evaluated before the model ever runs. The first rung that produces a
//! reply answers the turn; rungs 6 and 7 only annotate the model's
//! context.

use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

use duka_config::CommerceConfig;
use duka_core::{
    BusinessContext, CustomerProfile, EscalationTicket, Order, OrderStatus, Result,
};
use duka_store::{CatalogStore, EscalationSink, OrderStore};

use crate::commit::payment_block;
use crate::detectors;
use crate::state::ConversationState;

/// What the ladder decided for this turn.
#[derive(Debug, Default)]
pub struct FastPathOutcome {
    /// A deterministic reply; the agent loop is skipped entirely.
    pub reply: Option<String>,
    /// Context annotations for the model when no rung replied.
    pub notes: Vec<String>,
}

pub struct FastPath<'a> {
    pub orders: &'a dyn OrderStore,
    pub catalog: &'a dyn CatalogStore,
    pub escalations: &'a dyn EscalationSink,
    pub commerce: &'a CommerceConfig,
}

impl FastPath<'_> {
    pub async fn evaluate(
        &self,
        conv: &Arc<Mutex<ConversationState>>,
        business: &BusinessContext,
        profile: &CustomerProfile,
        message: &str,
    ) -> Result<FastPathOutcome> {
        let normalized = detectors::normalize(message);
        let business_id = business.business_id.as_str();
        let phone = profile.phone.as_str();
        let mut outcome = FastPathOutcome::default();

        // 1. Payment confirmation
        if detectors::is_payment_confirmation(&normalized) {
            let awaiting = self
                .orders
                .find_orders(business_id, phone, &[OrderStatus::PendingPayment])
                .await?;
            outcome.reply = Some(match awaiting.as_slice() {
                [order] => {
                    self.orders
                        .update_status(order.id, OrderStatus::AwaitingConfirmation)
                        .await?;
                    info!(order_number = %order.order_number, "payment confirmation received");
                    format!(
                        "Thank you! We've noted your payment for {} and the team is confirming it now. You'll hear from us shortly.",
                        order.order_number
                    )
                }
                [] => "Thanks for letting us know! I couldn't find an order awaiting payment though. Could you share the order number (it looks like ORD-1234)?".to_string(),
                many => {
                    // "I paid for ORD-1234" resolves directly; otherwise ask.
                    let referenced = detectors::find_order_reference(message).and_then(|r| {
                        many.iter().find(|o| o.order_number.eq_ignore_ascii_case(&r))
                    });
                    match referenced {
                        Some(order) => {
                            self.orders
                                .update_status(order.id, OrderStatus::AwaitingConfirmation)
                                .await?;
                            info!(order_number = %order.order_number, "payment confirmation received");
                            format!(
                                "Thank you! We've noted your payment for {} and the team is confirming it now. You'll hear from us shortly.",
                                order.order_number
                            )
                        }
                        None => {
                            conv.lock().awaiting_payment_disambiguation = true;
                            let listed = enumerate(many);
                            format!(
                                "Thanks! You have a few orders awaiting payment:\n{listed}\nWhich one did you pay for?"
                            )
                        }
                    }
                }
            });
            return Ok(outcome);
        }

        // 2. Order-reference mention. A status transition only happens when
        // the number answers the "which one did you pay for?" question;
        // plain inquiries get a status report.
        if let Some(reference) = detectors::find_order_reference(message) {
            let disambiguating = {
                let mut state = conv.lock();
                std::mem::take(&mut state.awaiting_payment_disambiguation)
            };
            let found = self.orders.find_by_number(business_id, &reference).await?;
            outcome.reply = Some(match found {
                Some(order) if order.phone == profile.phone => {
                    if disambiguating && order.status.is_awaiting_payment() {
                        self.orders
                            .update_status(order.id, OrderStatus::AwaitingConfirmation)
                            .await?;
                        format!(
                            "Got it — {} is marked as paid and the team is confirming now. Thank you!",
                            order.order_number
                        )
                    } else {
                        format!(
                            "{}: {} — current status is {}.",
                            order.order_number,
                            order.summary(),
                            order.status.as_str().replace('_', " ")
                        )
                    }
                }
                _ => format!(
                    "I couldn't find an order {reference} for this number. Could you double-check the reference?"
                ),
            });
            return Ok(outcome);
        }

        // 3. Payment-instructions request
        if detectors::wants_payment_instructions(&normalized) {
            let awaiting = self
                .orders
                .find_orders(business_id, phone, &[OrderStatus::PendingPayment])
                .await?;
            outcome.reply = Some(match awaiting.as_slice() {
                [order] => {
                    conv.lock().payment_instructions_sent = true;
                    format!(
                        "Here are the payment details for {}:\n\n{}",
                        order.order_number,
                        payment_block(business, order)
                    )
                }
                [] => "You don't have an order awaiting payment right now. Would you like to place one?".to_string(),
                many => {
                    let listed = enumerate(many);
                    format!(
                        "You have a few orders awaiting payment:\n{listed}\nWhich one would you like the details for?"
                    )
                }
            });
            return Ok(outcome);
        }

        // 4. Rating / feedback phrases. A bare digit only counts as a
        // rating when no order is being assembled, so quantity replies
        // survive.
        let pending_active = !conv.lock().pending.is_empty();
        if !pending_active {
            if let Some(rating) = detectors::detect_rating(&normalized) {
                self.catalog
                    .record_feedback(
                        business_id,
                        phone,
                        duka_core::Feedback { order_id: None, rating, comment: None },
                    )
                    .await?;
                outcome.reply = Some(format!(
                    "Thank you for the {rating}-star rating! We really appreciate you. 💛"
                ));
                return Ok(outcome);
            }
        }
        if detectors::is_feedback_phrase(&normalized)
            && !detectors::has_order_intent(&normalized)
            && !detectors::has_commerce_keyword(&normalized)
        {
            outcome.reply =
                Some("Thank you so much for the kind words! We look forward to serving you again. 💛".to_string());
            return Ok(outcome);
        }

        // 5. Pickup/delivery completion confirmation
        if detectors::is_completion_confirmation(&normalized) {
            let ready = self
                .orders
                .find_orders(
                    business_id,
                    phone,
                    &[OrderStatus::ReadyForPickup, OrderStatus::OutForDelivery],
                )
                .await?;
            if let Some(order) = ready.first() {
                self.orders
                    .update_status(order.id, OrderStatus::Completed)
                    .await?;
                let points = loyalty_points(&order.total_amount, self.commerce.loyalty_divisor);
                if points > 0 {
                    self.catalog
                        .add_loyalty_points(business_id, phone, points)
                        .await?;
                }
                info!(order_number = %order.order_number, points, "order completed, points awarded");
                outcome.reply = Some(format!(
                    "Wonderful — enjoy! {} is all done and you've earned {points} loyalty points. How would you rate your experience, 1-5?",
                    order.order_number
                ));
                return Ok(outcome);
            }
            // Nothing to complete; let the model respond.
        }

        // 6. Escalation keywords — create the ticket once, annotate always.
        if let Some(issue) = detectors::detect_escalation(&normalized) {
            let signature = detectors::escalation_signature(issue, &normalized);
            let is_new = {
                let mut state = conv.lock();
                if state.last_escalation_signature.as_deref() == Some(signature.as_str()) {
                    false
                } else {
                    state.last_escalation_signature = Some(signature);
                    true
                }
            };
            if is_new {
                self.escalations
                    .create_ticket(EscalationTicket::open(
                        business_id,
                        profile.contact_id,
                        phone,
                        issue,
                        message.trim(),
                    ))
                    .await?;
                info!(issue = issue.as_str(), "escalation ticket created");
            } else {
                debug!(issue = issue.as_str(), "duplicate escalation signature, no new ticket");
            }
            outcome.notes.push(format!(
                "The customer raised a {} issue and it has been logged for the owner to follow up. Acknowledge empathetically and reassure them — do not ask them to repeat the complaint.",
                issue.as_str().replace('_', " ")
            ));
        }

        // 7. Greeting-only
        if detectors::is_greeting_only(&normalized) {
            outcome.notes.push(
                "This is a casual greeting, not a transactional message. Reply warmly and briefly; do not push a sale or payment.".to_string(),
            );
        }

        Ok(outcome)
    }
}

fn enumerate(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("- {}", o.summary()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// floor(total / divisor), never negative.
pub fn loyalty_points(total: &Decimal, divisor: u32) -> u64 {
    if divisor == 0 {
        return 0;
    }
    (total / Decimal::from(divisor))
        .floor()
        .to_u64()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loyalty_formula_floors() {
        assert_eq!(loyalty_points(&Decimal::from(5000), 100), 50);
        assert_eq!(loyalty_points(&Decimal::from(199), 100), 1);
        assert_eq!(loyalty_points(&Decimal::from(99), 100), 0);
        assert_eq!(loyalty_points(&Decimal::new(12550, 2), 100), 1);
    }
}
