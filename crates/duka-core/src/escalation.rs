use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Categories a complaint can escalate under. The keyword map that picks
/// one lives with the detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    ServiceComplaint,
    RefundRequest,
    OwnerCallback,
    PaymentConflict,
    OrderIssue,
    DeliveryIssue,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::ServiceComplaint => "service_complaint",
            IssueType::RefundRequest => "refund_request",
            IssueType::OwnerCallback => "owner_callback",
            IssueType::PaymentConflict => "payment_conflict",
            IssueType::OrderIssue => "order_issue",
            IssueType::DeliveryIssue => "delivery_issue",
        }
    }
}

/// A complaint recorded for human follow-up. Created at most once per
/// distinct (issue type, normalized message) pair per conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationTicket {
    pub id: Uuid,
    pub business_id: String,
    pub contact_id: Uuid,
    pub phone: String,
    pub issue: IssueType,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl EscalationTicket {
    pub fn open(
        business_id: impl Into<String>,
        contact_id: Uuid,
        phone: impl Into<String>,
        issue: IssueType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            business_id: business_id.into(),
            contact_id,
            phone: phone.into(),
            issue,
            description: description.into(),
            status: "open".to_string(),
            created_at: Utc::now(),
        }
    }
}
