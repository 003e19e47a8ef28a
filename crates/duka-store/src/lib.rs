//! # duka-store
//!
//! Narrow contracts for the external collaborators the agent core depends
//! on: catalog/business-profile store, order persistence, media delivery,
//! escalation tickets, and the message log. Production deployments put
//! database- or API-backed implementations behind these traits; the
//! in-memory backings here serve tests and the demo binary.

pub mod memory;
pub mod traits;

pub use memory::{
    profile_with_history, MemoryCatalog, MemoryEscalations, MemoryMedia, MemoryMessageLog,
    MemoryOrders,
};
pub use traits::{
    CatalogStore, Direction, EscalationSink, LogEntry, MediaGateway, MessageLog, OrderStore,
};
