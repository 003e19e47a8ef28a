//! # duka-runtime
//!
//! The conversational commerce core: per-conversation state, deterministic
//! short-circuit detectors, prompt assembly, the bounded model↔tool loop,
//! and order commitment. The [`Engine`] ties these together behind a single
//! `process_message` entry point that channel adapters call with a
//! normalized inbound message.

pub mod agent_loop;
pub mod commit;
pub mod context;
pub mod detectors;
pub mod engine;
pub mod envelope;
pub mod extract;
pub mod fast_path;
pub mod state;
pub mod tools;

pub use engine::{Engine, InboundMessage, TurnReply};
pub use state::{ConvKey, ConversationState, ConversationStore};
pub use tools::ToolRegistry;
