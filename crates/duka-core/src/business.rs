use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where the customer sends payment. Rendered into the templated payment
/// block, never into model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementAccount {
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
}

impl SettlementAccount {
    /// One-line descriptor for the brand-guidelines prompt block.
    pub fn descriptor(&self) -> String {
        format!(
            "{} — {} ({})",
            self.bank_name, self.account_number, self.account_name
        )
    }
}

/// A catalog entry as the store returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    /// None renders as "price on request".
    pub price: Option<Decimal>,
    #[serde(default = "default_available")]
    pub available: bool,
    /// Reference the media gateway resolves to an actual image.
    pub image_ref: Option<String>,
}

fn default_available() -> bool {
    true
}

/// Brand and settlement context for one business, cached per conversation
/// and refreshed whenever the business record is re-fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessContext {
    pub business_id: String,
    pub name: String,
    /// The WhatsApp number customers message.
    pub whatsapp_number: String,
    pub description: Option<String>,
    /// Brand voice guidance, e.g. "warm, concise, light humour".
    pub tone: Option<String>,
    pub website: Option<String>,
    pub instagram: Option<String>,
    pub pickup_instructions: Option<String>,
    pub settlement: Option<SettlementAccount>,
    pub currency_symbol: String,
    /// Channels this business is reachable on ("whatsapp", "sms", ...).
    #[serde(default)]
    pub channels: Vec<String>,
}
