//! Incremental pending-order field extraction and the deterministic
//! clarifying questions for whatever is still missing.

use regex::Regex;
use std::sync::LazyLock;

use duka_core::{format_price, Fulfillment, InventoryItem, OrderField, PendingOrder};

use crate::detectors;

static QUANTITY_SUFFIXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})\s*(?:x|pieces?|pcs)\b").expect("quantity regex"));

const WORD_NUMBERS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
];

const PICKUP_CUES: &[&str] = &[
    "pickup",
    "pick up",
    "pick it up",
    "i'll come",
    "i will come",
    "come and get",
    "come get it",
    "collect it myself",
];

const DELIVERY_CUES: &[&str] = &[
    "delivery",
    "deliver",
    "send it to",
    "bring it to",
    "ship it",
];

/// Fold whatever the message reveals into the pending order. Returns true
/// when any field changed.
pub fn apply_message(
    pending: &mut PendingOrder,
    message: &str,
    inventory: &[InventoryItem],
) -> bool {
    let normalized = detectors::normalize(message);
    let mut changed = false;

    // Product mentions only count once ordering is in motion, so a price
    // enquiry with no intent does not start an order.
    let has_intent = detectors::has_order_intent(&normalized);
    let order_active = !pending.is_empty() || has_intent;
    let mut product_mentioned = false;
    if order_active {
        if let Some(item) = match_inventory(&normalized, inventory) {
            product_mentioned = true;
            if pending.product_name.as_deref() != Some(item.name.as_str()) {
                pending.product_name = Some(item.name.clone());
                pending.unit_price = item.price;
                changed = true;
            }
        }
    }

    // Quantities must be stated explicitly, so a street number or phone
    // fragment in an ordering message never becomes a quantity.
    if pending.product_name.is_some() {
        if let Some(qty) = extract_quantity(&normalized, pending.product_name.as_deref()) {
            if pending.quantity() != qty {
                pending.quantity = qty;
                changed = true;
            }
        }
    }

    let pickup_cue = PICKUP_CUES.iter().any(|c| normalized.contains(c));
    let delivery_cue = !pickup_cue && DELIVERY_CUES.iter().any(|c| normalized.contains(c));
    if pickup_cue {
        if pending.fulfillment != Some(Fulfillment::Pickup) {
            pending.fulfillment = Some(Fulfillment::Pickup);
            changed = true;
        }
    } else if delivery_cue {
        if pending.fulfillment != Some(Fulfillment::Delivery) {
            pending.fulfillment = Some(Fulfillment::Delivery);
            changed = true;
        }
    }

    // When the address is the only thing missing, a free-text message that
    // isn't a bare confirmation is the address. Messages that themselves
    // carry a fulfillment cue or product mention only yield an address via
    // an explicit "deliver to ..." prefix.
    if pending.missing_field() == Some(OrderField::Address)
        && !detectors::is_affirmative(&normalized)
        && !detectors::is_greeting_only(&normalized)
    {
        let allow_whole = !delivery_cue && !pickup_cue && !product_mentioned && !has_intent;
        if let Some(address) = capture_address(message, allow_whole) {
            pending.delivery_address = Some(address);
            changed = true;
        }
    }

    changed
}

/// Longest inventory name contained in the message wins, so "chocolate
/// cake" beats "cake" when both are catalog items.
fn match_inventory<'a>(normalized: &str, inventory: &'a [InventoryItem]) -> Option<&'a InventoryItem> {
    inventory
        .iter()
        .filter(|item| item.available)
        .filter(|item| normalized.contains(&item.name.to_lowercase()))
        .max_by_key(|item| item.name.len())
}

/// Explicit quantity forms only: a "2x"/"2 pieces" suffix anywhere, or a
/// digit/number word directly before the product name.
fn extract_quantity(normalized: &str, product: Option<&str>) -> Option<u32> {
    if let Some(caps) = QUANTITY_SUFFIXED.captures(normalized) {
        if let Ok(n) = caps[1].parse::<u32>() {
            if n >= 1 {
                return Some(n);
            }
        }
    }
    let product = product?.to_lowercase();
    let pos = normalized.find(&product)?;
    let last_word = normalized[..pos].trim_end().rsplit(' ').next()?;
    if let Ok(n) = last_word.parse::<u32>() {
        if (1..=99).contains(&n) {
            return Some(n);
        }
    }
    WORD_NUMBERS
        .iter()
        .find(|(word, _)| *word == last_word)
        .map(|(_, n)| *n)
}

fn capture_address(original: &str, allow_whole: bool) -> Option<String> {
    let trimmed = original.trim();
    let lower = trimmed.to_lowercase();
    // "deliver to 12 Allen Avenue" — take everything after the cue.
    for prefix in [
        "deliver it to",
        "deliver to",
        "send it to",
        "bring it to",
        "my address is",
        "the address is",
        "address is",
    ] {
        if lower.starts_with(prefix) {
            let addr = trimmed[prefix.len()..].trim_start_matches([':', ',', ' ']).trim();
            if addr.len() >= 5 {
                return Some(addr.to_string());
            }
        }
    }
    if allow_whole && trimmed.len() >= 5 {
        return Some(trimmed.to_string());
    }
    None
}

/// Deterministic clarifying question for the first missing field, naming
/// what is already known.
pub fn clarifying_question(pending: &PendingOrder, currency: &str) -> Option<String> {
    let field = pending.missing_field()?;
    let product = pending.product_name.as_deref().unwrap_or("your order");
    Some(match field {
        OrderField::Product => {
            "Which item would you like to order?".to_string()
        }
        OrderField::Price => format!(
            "I'll confirm the current price of {product} with the team and get right back to you."
        ),
        OrderField::Fulfillment => {
            let qty = pending.quantity();
            let what = if qty > 1 {
                format!("{qty}x {product}")
            } else {
                product.to_string()
            };
            format!(
                "Got it — {what} at {} each. Would you like pickup or delivery?",
                format_price(pending.unit_price.as_ref(), currency)
            )
        }
        OrderField::Address => format!(
            "Almost done with your {product} order. What's the delivery address?"
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn inventory() -> Vec<InventoryItem> {
        vec![
            InventoryItem {
                name: "Cake".into(),
                price: Some(Decimal::from(3000)),
                available: true,
                image_ref: None,
            },
            InventoryItem {
                name: "Chocolate Cake".into(),
                price: Some(Decimal::from(5000)),
                available: true,
                image_ref: None,
            },
        ]
    }

    #[test]
    fn intent_message_sets_product_and_price() {
        let mut pending = PendingOrder::default();
        assert!(apply_message(&mut pending, "I want chocolate cake", &inventory()));
        assert_eq!(pending.product_name.as_deref(), Some("Chocolate Cake"));
        assert_eq!(pending.unit_price, Some(Decimal::from(5000)));
    }

    #[test]
    fn longest_name_wins() {
        let mut pending = PendingOrder::default();
        apply_message(&mut pending, "i'd like the chocolate cake please", &inventory());
        assert_eq!(pending.product_name.as_deref(), Some("Chocolate Cake"));
    }

    #[test]
    fn no_intent_no_product() {
        let mut pending = PendingOrder::default();
        assert!(!apply_message(&mut pending, "do you sell chocolate cake?", &inventory()));
        assert!(pending.product_name.is_none());
    }

    #[test]
    fn fulfillment_cues() {
        let mut pending = PendingOrder::default();
        pending.product_name = Some("Cake".into());
        apply_message(&mut pending, "pickup please", &inventory());
        assert_eq!(pending.fulfillment, Some(Fulfillment::Pickup));

        apply_message(&mut pending, "actually deliver it", &inventory());
        assert_eq!(pending.fulfillment, Some(Fulfillment::Delivery));
    }

    #[test]
    fn quantity_from_digits_and_words() {
        let mut pending = PendingOrder::default();
        apply_message(&mut pending, "i want 3 chocolate cake", &inventory());
        assert_eq!(pending.quantity(), 3);

        let mut pending = PendingOrder::default();
        apply_message(&mut pending, "i want two chocolate cake please", &inventory());
        assert_eq!(pending.quantity(), 2);
    }

    #[test]
    fn street_number_is_not_a_quantity() {
        let mut pending = PendingOrder::default();
        apply_message(&mut pending, "i want chocolate cake", &inventory());
        apply_message(&mut pending, "i want it delivered to 12 allen avenue", &inventory());
        assert_eq!(pending.quantity(), 1);
        assert_eq!(pending.fulfillment, Some(Fulfillment::Delivery));
    }

    #[test]
    fn suffixed_quantity_applies_to_known_product() {
        let mut pending = PendingOrder::default();
        apply_message(&mut pending, "i want chocolate cake", &inventory());
        apply_message(&mut pending, "make it 2x please", &inventory());
        assert_eq!(pending.quantity(), 2);
    }

    #[test]
    fn address_captured_when_sole_missing_field() {
        let mut pending = PendingOrder {
            product_name: Some("Chocolate Cake".into()),
            unit_price: Some(Decimal::from(5000)),
            quantity: 1,
            fulfillment: Some(Fulfillment::Delivery),
            delivery_address: None,
        };
        apply_message(&mut pending, "12 Allen Avenue, Ikeja", &inventory());
        assert_eq!(pending.delivery_address.as_deref(), Some("12 Allen Avenue, Ikeja"));
        assert!(pending.is_complete());
    }

    #[test]
    fn affirmative_is_not_an_address() {
        let mut pending = PendingOrder {
            product_name: Some("Chocolate Cake".into()),
            unit_price: Some(Decimal::from(5000)),
            quantity: 1,
            fulfillment: Some(Fulfillment::Delivery),
            delivery_address: None,
        };
        apply_message(&mut pending, "okay", &inventory());
        assert!(pending.delivery_address.is_none());
    }

    #[test]
    fn clarifying_questions_name_known_items() {
        let pending = PendingOrder {
            product_name: Some("Chocolate Cake".into()),
            unit_price: Some(Decimal::from(5000)),
            quantity: 2,
            fulfillment: None,
            delivery_address: None,
        };
        let q = clarifying_question(&pending, "₦").unwrap();
        assert!(q.contains("2x Chocolate Cake"));
        assert!(q.contains("₦5,000"));
        assert!(q.contains("pickup or delivery"));

        let complete = PendingOrder {
            fulfillment: Some(Fulfillment::Pickup),
            ..pending
        };
        assert!(clarifying_question(&complete, "₦").is_none());
    }
}
