use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Description of a tool the agent may invoke, advertised in the system
/// prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique name, e.g. "create_order", "get_inventory".
    pub name: String,
    /// Human-readable description for the model.
    pub description: String,
    /// JSON Schema of the parameters object.
    pub parameters: Value,
}
