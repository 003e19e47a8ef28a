//! # duka-core
//!
//! Core types and error types for the Duka conversational commerce agent.
//! This crate defines the shared vocabulary used by every other crate in
//! the workspace.

pub mod business;
pub mod chat;
pub mod contact;
pub mod error;
pub mod escalation;
pub mod money;
pub mod order;
pub mod tool;

pub use business::{BusinessContext, InventoryItem, SettlementAccount};
pub use chat::{ChatMessage, ChatRole};
pub use contact::{CustomerProfile, Feedback, LastOrder};
pub use error::{DukaError, Result};
pub use escalation::{EscalationTicket, IssueType};
pub use money::format_price;
pub use order::{Fulfillment, NewOrder, Order, OrderField, OrderItem, OrderStatus, PendingOrder};
pub use tool::ToolSpec;
