//! # duka-llm
//!
//! Chat-completion provider abstraction. The engine treats the model as a
//! black box: role-tagged messages and a temperature in, one completion
//! string out. Structured output is a convention enforced downstream by
//! the envelope decoder, never assumed here.

pub mod mock;
pub mod openai;
pub mod provider;

pub use mock::MockProvider;
pub use openai::OpenAiProvider;
pub use provider::{ChatProvider, CompletionRequest};
