use serde::{Deserialize, Serialize};

use duka_core::{DukaError, Result};

/// Root configuration — maps to `duka.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DukaConfig {
    pub agent: AgentConfig,
    pub commerce: CommerceConfig,
    pub provider: ProviderConfig,
    pub logging: LoggingConfig,
}

// ── Agent ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier, e.g. "gpt-4o-mini".
    pub model: String,
    /// Temperature (0.0 - 2.0). Kept low to favor determinism.
    pub temperature: f32,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Maximum model round-trips per customer turn before the fixed
    /// "taking longer than expected" fallback.
    pub max_iterations: u32,
    /// Hard timeout per completion call, seconds. The turn fails soft.
    pub completion_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            temperature: 0.4,
            max_tokens: 1024,
            max_iterations: 5,
            completion_timeout_secs: 30,
        }
    }
}

// ── Commerce ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommerceConfig {
    /// Currency symbol used when a business record carries none.
    pub currency_symbol: String,
    /// Loyalty points = floor(order total / divisor).
    pub loyalty_divisor: u32,
    /// Minimum seconds before the same tool may fire again for one
    /// conversation.
    pub tool_cooldown_secs: u64,
    /// Catalog items included in the prompt. Bounds prompt size, not the
    /// catalog.
    pub inventory_prompt_items: usize,
    /// Trailing exchanges of history included in the prompt.
    pub history_depth: usize,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "₦".into(),
            loyalty_divisor: 100,
            tool_cooldown_secs: 90,
            inventory_prompt_items: 6,
            history_depth: 10,
        }
    }
}

// ── Provider ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// OpenAI-compatible base URL (no trailing "/chat/completions").
    pub base_url: String,
    /// API key. Falls back to the OPENAI_API_KEY environment variable.
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty" or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

impl DukaConfig {
    /// Reject values the runtime cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.agent.model.is_empty() {
            return Err(DukaError::ConfigValidation {
                field: "agent.model".into(),
                reason: "model is empty".into(),
            });
        }
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            return Err(DukaError::ConfigValidation {
                field: "agent.temperature".into(),
                reason: format!("{} is out of range 0.0-2.0", self.agent.temperature),
            });
        }
        if self.agent.max_iterations == 0 {
            return Err(DukaError::ConfigValidation {
                field: "agent.max_iterations".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.agent.completion_timeout_secs == 0 {
            return Err(DukaError::ConfigValidation {
                field: "agent.completion_timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.commerce.loyalty_divisor == 0 {
            return Err(DukaError::ConfigValidation {
                field: "commerce.loyalty_divisor".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.commerce.inventory_prompt_items == 0 {
            return Err(DukaError::ConfigValidation {
                field: "commerce.inventory_prompt_items".into(),
                reason: "must be at least 1".into(),
            });
        }
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(DukaError::ConfigValidation {
                field: "logging.level".into(),
                reason: format!("unknown log level '{}'", self.logging.level),
            });
        }
        Ok(())
    }
}
