use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex as TokioMutex;

use duka_core::PendingOrder;

/// Conversation identity: one customer talking to one business.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConvKey {
    pub business_id: String,
    pub phone: String,
}

impl ConvKey {
    pub fn new(business_id: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            business_id: business_id.into(),
            phone: phone.into(),
        }
    }
}

/// Per-conversation mutable state. Lives in process memory only; the
/// pending order is the one thing lost on restart, everything else
/// re-derives from the stores.
#[derive(Debug, Default)]
pub struct ConversationState {
    pub pending: PendingOrder,
    pub intent_confirmed: bool,
    /// Last invocation per tool name, for cooldown enforcement.
    pub tool_cooldowns: HashMap<String, Instant>,
    /// Dedup fingerprint of the last escalation this conversation raised.
    pub last_escalation_signature: Option<String>,
    /// Set when the customer was just asked which of several
    /// awaiting-payment orders they paid for; the next order-number
    /// mention answers that question.
    pub awaiting_payment_disambiguation: bool,
    /// Catalog items already sent as media, so the loop can avoid an
    /// immediate re-send.
    pub shown_products: Vec<String>,
    pub payment_instructions_sent: bool,
}

impl ConversationState {
    /// Remaining cooldown for a tool, None when it may fire.
    pub fn cooldown_remaining(&self, tool: &str, interval: Duration, now: Instant) -> Option<Duration> {
        let last = self.tool_cooldowns.get(tool)?;
        let elapsed = now.duration_since(*last);
        if elapsed < interval {
            Some(interval - elapsed)
        } else {
            None
        }
    }

    pub fn stamp_cooldown(&mut self, tool: &str, now: Instant) {
        self.tool_cooldowns.insert(tool.to_string(), now);
    }

    /// Drop the in-progress order and its confirmation flag.
    pub fn reset_pending(&mut self) {
        self.pending = PendingOrder::default();
        self.intent_confirmed = false;
    }
}

struct ConversationEntry {
    data: Arc<Mutex<ConversationState>>,
    /// Held for a whole turn so rapid-fire messages for one conversation
    /// serialize instead of racing on pending-order mutation.
    turn_lock: Arc<TokioMutex<()>>,
}

/// All live conversations, keyed by (business, phone). Unrelated
/// conversations proceed concurrently; the map lock is never held across
/// an await.
#[derive(Default)]
pub struct ConversationStore {
    inner: RwLock<HashMap<ConvKey, ConversationEntry>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the state and turn lock for a conversation.
    pub fn entry(&self, key: &ConvKey) -> (Arc<Mutex<ConversationState>>, Arc<TokioMutex<()>>) {
        // Fast path: conversation already exists
        {
            let map = self.inner.read();
            if let Some(entry) = map.get(key) {
                return (Arc::clone(&entry.data), Arc::clone(&entry.turn_lock));
            }
        }
        // Slow path: create it
        let mut map = self.inner.write();
        let entry = map.entry(key.clone()).or_insert_with(|| ConversationEntry {
            data: Arc::new(Mutex::new(ConversationState::default())),
            turn_lock: Arc::new(TokioMutex::new(())),
        });
        (Arc::clone(&entry.data), Arc::clone(&entry.turn_lock))
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_shares_state() {
        let store = ConversationStore::new();
        let key = ConvKey::new("biz-1", "+234800");
        let (a, _) = store.entry(&key);
        a.lock().intent_confirmed = true;
        let (b, _) = store.entry(&key);
        assert!(b.lock().intent_confirmed);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn different_keys_are_isolated() {
        let store = ConversationStore::new();
        let (a, _) = store.entry(&ConvKey::new("biz-1", "+234800"));
        a.lock().intent_confirmed = true;
        let (b, _) = store.entry(&ConvKey::new("biz-1", "+234801"));
        assert!(!b.lock().intent_confirmed);
    }

    #[test]
    fn cooldown_expires_after_interval() {
        let mut state = ConversationState::default();
        let start = Instant::now();
        let interval = Duration::from_secs(90);

        assert!(state.cooldown_remaining("send_all_products", interval, start).is_none());

        state.stamp_cooldown("send_all_products", start);
        assert!(state
            .cooldown_remaining("send_all_products", interval, start + Duration::from_secs(10))
            .is_some());
        assert!(state
            .cooldown_remaining("send_all_products", interval, start + Duration::from_secs(91))
            .is_none());
    }

    #[test]
    fn reset_clears_pending_and_intent() {
        let mut state = ConversationState::default();
        state.pending.product_name = Some("Cake".into());
        state.intent_confirmed = true;
        state.reset_pending();
        assert!(state.pending.is_empty());
        assert!(!state.intent_confirmed);
    }
}
