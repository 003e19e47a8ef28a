use thiserror::Error;

/// Unified error type for the Duka runtime.
#[derive(Error, Debug)]
pub enum DukaError {
    // ── Model / provider errors ────────────────────────────────
    #[error("model provider error: {0}")]
    Provider(String),

    #[error("model completion timed out after {0}s")]
    ProviderTimeout(u64),

    // ── Collaborator / store errors ────────────────────────────
    #[error("store error: {0}")]
    Store(String),

    #[error("business not found: {0}")]
    BusinessNotFound(String),

    #[error("media delivery failed: {0}")]
    Media(String),

    // ── Tool errors ────────────────────────────────────────────
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool execution failed: {tool}: {reason}")]
    ToolExecution { tool: String, reason: String },

    // ── Envelope / parsing errors ──────────────────────────────
    #[error("malformed agent envelope: {0}")]
    Envelope(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DukaError>;
