//! Rule-based signal detectors. Pure functions over the lower-cased
//! message; the fast-path ladder decides what to do with a hit.

use regex::Regex;
use std::sync::LazyLock;

use duka_core::IssueType;

static ORDER_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bORD-\d{3,}\b").expect("order ref regex"));

static RATING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([1-5])\s*(?:stars?\b|/\s*5)").expect("rating regex"));

/// Lower-case, trim, and collapse internal whitespace.
pub fn normalize(message: &str) -> String {
    message
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

const PAYMENT_CONFIRMATIONS: &[&str] = &[
    "i paid",
    "i've paid",
    "i have paid",
    "just paid",
    "i don pay",
    "payment done",
    "payment sent",
    "payment made",
    "transfer done",
    "transfer sent",
    "i transferred",
    "i've transferred",
    "sent the money",
    "made the payment",
    "made the transfer",
];

pub fn is_payment_confirmation(normalized: &str) -> bool {
    PAYMENT_CONFIRMATIONS.iter().any(|p| normalized.contains(p))
}

/// First "ORD-1234"-style reference in the message, upper-cased.
pub fn find_order_reference(message: &str) -> Option<String> {
    ORDER_REF.find(message).map(|m| m.as_str().to_uppercase())
}

const PAYMENT_INSTRUCTION_REQUESTS: &[&str] = &[
    "account number",
    "account details",
    "bank details",
    "payment details",
    "how do i pay",
    "how to pay",
    "where do i pay",
    "send your account",
    "send the account",
    "resend the account",
];

pub fn wants_payment_instructions(normalized: &str) -> bool {
    PAYMENT_INSTRUCTION_REQUESTS
        .iter()
        .any(|p| normalized.contains(p))
}

/// A 1-5 rating if the message carries one ("5 stars", "4/5", or a bare
/// digit).
pub fn detect_rating(normalized: &str) -> Option<u8> {
    if let Some(caps) = RATING.captures(normalized) {
        return caps[1].parse().ok();
    }
    // A bare digit is a rating reply to the rating question.
    let trimmed = normalized.trim();
    if trimmed.len() == 1 {
        if let Ok(n) = trimmed.parse::<u8>() {
            if (1..=5).contains(&n) {
                return Some(n);
            }
        }
    }
    None
}

const FEEDBACK_PHRASES: &[&str] = &[
    "thank you",
    "thanks so much",
    "great service",
    "excellent service",
    "well done",
    "loved it",
    "delicious",
    "amazing service",
];

pub fn is_feedback_phrase(normalized: &str) -> bool {
    FEEDBACK_PHRASES.iter().any(|p| normalized.contains(p))
}

const COMPLETION_CONFIRMATIONS: &[&str] = &[
    "picked it up",
    "i picked up",
    "i have picked it up",
    "i've picked it up",
    "just picked up",
    "collected it",
    "i collected",
    "received it",
    "i received",
    "i've received",
    "i have received",
    "got the delivery",
    "order received",
    "it has been delivered",
];

pub fn is_completion_confirmation(normalized: &str) -> bool {
    COMPLETION_CONFIRMATIONS.iter().any(|p| normalized.contains(p))
}

/// Keyword → issue-type map, checked in order of specificity.
pub fn detect_escalation(normalized: &str) -> Option<IssueType> {
    const MAP: &[(&str, IssueType)] = &[
        ("refund", IssueType::RefundRequest),
        ("money back", IssueType::RefundRequest),
        ("charged twice", IssueType::PaymentConflict),
        ("double charge", IssueType::PaymentConflict),
        ("paid but", IssueType::PaymentConflict),
        ("not delivered", IssueType::DeliveryIssue),
        ("late delivery", IssueType::DeliveryIssue),
        ("still waiting for my order", IssueType::DeliveryIssue),
        ("wrong order", IssueType::OrderIssue),
        ("wrong item", IssueType::OrderIssue),
        ("missing item", IssueType::OrderIssue),
        ("incomplete order", IssueType::OrderIssue),
        ("speak to the owner", IssueType::OwnerCallback),
        ("speak with the owner", IssueType::OwnerCallback),
        ("talk to the manager", IssueType::OwnerCallback),
        ("call me back", IssueType::OwnerCallback),
        ("terrible", IssueType::ServiceComplaint),
        ("disappointed", IssueType::ServiceComplaint),
        ("bad service", IssueType::ServiceComplaint),
        ("poor service", IssueType::ServiceComplaint),
        ("complaint", IssueType::ServiceComplaint),
        ("complain", IssueType::ServiceComplaint),
        ("unacceptable", IssueType::ServiceComplaint),
    ];
    MAP.iter()
        .find(|(kw, _)| normalized.contains(kw))
        .map(|(_, issue)| *issue)
}

/// Dedup fingerprint: same issue and same normalized text never spawn a
/// second ticket.
pub fn escalation_signature(issue: IssueType, normalized: &str) -> String {
    format!("{}:{}", issue.as_str(), normalized)
}

const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "how are you",
    "how far",
    "what's up",
];

const COMMERCE_KEYWORDS: &[&str] = &[
    "order", "buy", "price", "pay", "paid", "deliver", "delivery", "delivered", "pickup",
    "pick up", "menu", "catalog", "catalogue", "product", "cost", "how much", "refund",
    "account", "status", "ready",
];

/// Whole-word containment, so "hi" never matches inside "this" and "pay"
/// never matches inside "okay".
fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    let padded = format!(" {} ", normalized.replace(['?', '!', '.', ','], " "));
    padded.contains(&format!(" {phrase} "))
}

/// Any commerce word present, whole-word matched. Used to keep canned
/// pleasantry replies away from messages that also ask for something.
pub fn has_commerce_keyword(normalized: &str) -> bool {
    COMMERCE_KEYWORDS
        .iter()
        .any(|k| contains_phrase(normalized, k))
}

/// Greeting with no commerce content and short enough to be only a
/// greeting.
pub fn is_greeting_only(normalized: &str) -> bool {
    if normalized.len() > 120 {
        return false;
    }
    let greets = GREETINGS.iter().any(|g| contains_phrase(normalized, g));
    greets && !has_commerce_keyword(normalized)
}

const ORDER_VERBS: &[&str] = &[
    "order",
    "buy",
    "purchase",
    "i want",
    "i'd like",
    "i would like",
    "can i get",
    "get me",
    "give me",
    "i'll take",
];

pub fn has_order_intent(normalized: &str) -> bool {
    ORDER_VERBS.iter().any(|v| normalized.contains(v))
}

const AFFIRMATIVES: &[&str] = &[
    "yes",
    "yes please",
    "yeah",
    "yup",
    "sure",
    "ok",
    "okay",
    "go ahead",
    "confirm",
    "confirmed",
    "correct",
    "that's right",
    "proceed",
    "alright",
    "sounds good",
];

/// Bare affirmative. Matched against the whole message so "yes" confirms
/// but "yesterday's order was wrong" does not.
pub fn is_affirmative(normalized: &str) -> bool {
    let stripped = normalized.trim_end_matches(['!', '.', ',']);
    AFFIRMATIVES.contains(&stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_confirmation_phrases() {
        for msg in ["i just paid", "transfer done ✅", "i don pay o", "payment sent now"] {
            assert!(is_payment_confirmation(&normalize(msg)), "{msg}");
        }
        for msg in ["how do i pay", "i will pay tomorrow"] {
            assert!(!is_payment_confirmation(&normalize(msg)), "{msg}");
        }
    }

    #[test]
    fn order_reference_extraction() {
        assert_eq!(
            find_order_reference("where is ord-4821 please"),
            Some("ORD-4821".to_string())
        );
        assert_eq!(find_order_reference("ORD-12 is too short"), None);
        assert_eq!(find_order_reference("no reference here"), None);
    }

    #[test]
    fn rating_detection() {
        assert_eq!(detect_rating("5 stars!"), Some(5));
        assert_eq!(detect_rating("i'd say 4/5"), Some(4));
        assert_eq!(detect_rating("3"), Some(3));
        assert_eq!(detect_rating("9"), None);
        assert_eq!(detect_rating("i ordered 2 cakes"), None);
    }

    #[test]
    fn escalation_keyword_map() {
        let cases = [
            ("i want a refund now", IssueType::RefundRequest),
            ("i was charged twice", IssueType::PaymentConflict),
            ("my food was not delivered", IssueType::DeliveryIssue),
            ("you sent the wrong order", IssueType::OrderIssue),
            ("i need to speak to the owner", IssueType::OwnerCallback),
            ("this is terrible service", IssueType::ServiceComplaint),
        ];
        for (msg, expected) in cases {
            assert_eq!(detect_escalation(&normalize(msg)), Some(expected), "{msg}");
        }
        assert_eq!(detect_escalation("the cake was lovely"), None);
    }

    #[test]
    fn signature_is_stable_per_issue_and_text() {
        let a = escalation_signature(IssueType::RefundRequest, "i want a refund");
        let b = escalation_signature(IssueType::RefundRequest, "i want a refund");
        let c = escalation_signature(IssueType::RefundRequest, "refund me now");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn greeting_only_rules() {
        assert!(is_greeting_only(&normalize("Good morning")));
        assert!(is_greeting_only(&normalize("hey, how are you?")));
        // Commerce keyword disqualifies
        assert!(!is_greeting_only(&normalize("good morning, how much is the cake?")));
        // Length cap
        let long = format!("hello {}", "a".repeat(130));
        assert!(!is_greeting_only(&normalize(&long)));
    }

    #[test]
    fn commerce_keywords_are_whole_word() {
        assert!(has_commerce_keyword(&normalize("when will it be delivered?")));
        assert!(has_commerce_keyword(&normalize("what's the status of my order")));
        // "pay" must not fire inside "okay"
        assert!(!has_commerce_keyword(&normalize("okay thanks, see you soon")));
    }

    #[test]
    fn affirmatives_are_whole_message_only() {
        assert!(is_affirmative(&normalize("Yes")));
        assert!(is_affirmative(&normalize("go ahead!")));
        assert!(!is_affirmative(&normalize("yes i have a complaint")));
    }

    #[test]
    fn completion_and_instruction_phrases() {
        assert!(is_completion_confirmation(&normalize("I picked it up, thanks")));
        assert!(is_completion_confirmation(&normalize("just received it")));
        assert!(wants_payment_instructions(&normalize("send your account details")));
        assert!(!wants_payment_instructions(&normalize("i paid already")));
    }
}
