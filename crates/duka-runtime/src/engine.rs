//! The turn engine. Channel adapters hand it a normalized inbound message;
//! it resolves the business, serializes the turn against concurrent
//! messages from the same customer, walks the deterministic ladder, and
//! only then lets the model speak.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use duka_config::DukaConfig;
use duka_core::{BusinessContext, DukaError, Result};
use duka_llm::ChatProvider;
use duka_store::{
    profile_with_history, CatalogStore, Direction, EscalationSink, LogEntry, MediaGateway,
    MessageLog, OrderStore,
};

use crate::agent_loop::AgentLoop;
use crate::commit;
use crate::context;
use crate::detectors;
use crate::extract;
use crate::fast_path::FastPath;
use crate::state::{ConvKey, ConversationStore};
use crate::tools::ToolRegistry;

/// A message as received from a channel adapter, already stripped of
/// transport framing.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Customer phone in E.164 form.
    pub phone: String,
    pub text: String,
    pub message_id: String,
    /// The business-side number the customer wrote to.
    pub destination: String,
    /// Channel label, e.g. "whatsapp".
    pub channel: String,
    /// Set when the adapter already knows the business.
    pub business_id: Option<String>,
}

/// The engine's answer for one turn.
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub text: String,
    pub contact_id: Uuid,
    /// True when a deterministic path answered without the model.
    pub short_circuit: bool,
}

const ENGINE_APOLOGY: &str =
    "Sorry, something went wrong on my end just now. Please send that again in a moment.";

pub struct Engine {
    config: DukaConfig,
    provider: Arc<dyn ChatProvider>,
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    escalations: Arc<dyn EscalationSink>,
    message_log: Arc<dyn MessageLog>,
    registry: ToolRegistry,
    conversations: ConversationStore,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: DukaConfig,
        provider: Arc<dyn ChatProvider>,
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        media: Arc<dyn MediaGateway>,
        escalations: Arc<dyn EscalationSink>,
        message_log: Arc<dyn MessageLog>,
    ) -> Self {
        let registry = ToolRegistry::new(
            Arc::clone(&catalog),
            Arc::clone(&orders),
            media,
            Arc::clone(&escalations),
        );
        Self {
            config,
            provider,
            catalog,
            orders,
            escalations,
            message_log,
            registry,
            conversations: ConversationStore::new(),
        }
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// Process one customer message to one reply. Never errors outward:
    /// internal failures become an apology so the channel always has
    /// something to send.
    pub async fn process_message(&self, inbound: InboundMessage) -> TurnReply {
        match self.handle_turn(&inbound).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(phone = %inbound.phone, error = %e, "turn failed");
                TurnReply {
                    text: ENGINE_APOLOGY.to_string(),
                    contact_id: Uuid::nil(),
                    short_circuit: true,
                }
            }
        }
    }

    async fn handle_turn(&self, inbound: &InboundMessage) -> Result<TurnReply> {
        let business = self.resolve_business(inbound).await?;
        let key = ConvKey::new(&business.business_id, &inbound.phone);
        let (conv, turn_lock) = self.conversations.entry(&key);

        // Whole-turn serialization per conversation.
        let _turn = turn_lock.lock().await;

        self.log_message(&business, inbound, Direction::In, &inbound.text)
            .await;

        let profile = self
            .catalog
            .profile(&business.business_id, &inbound.phone)
            .await?;
        let past_orders = self
            .orders
            .find_orders(&business.business_id, &inbound.phone, &[])
            .await?;
        let profile = profile_with_history(profile, &past_orders);
        let contact_id = profile.contact_id;

        // Deterministic ladder before anything touches the model.
        let fast = FastPath {
            orders: self.orders.as_ref(),
            catalog: self.catalog.as_ref(),
            escalations: self.escalations.as_ref(),
            commerce: &self.config.commerce,
        };
        let ladder = fast
            .evaluate(&conv, &business, &profile, &inbound.text)
            .await?;
        if let Some(text) = ladder.reply {
            self.log_message(&business, inbound, Direction::Out, &text)
                .await;
            return Ok(TurnReply { text, contact_id, short_circuit: true });
        }

        // Slot filling and the commit gate.
        let inventory = self.catalog.inventory(&business.business_id).await?;
        let normalized = detectors::normalize(&inbound.text);
        let (changed, pending_snapshot) = {
            let mut state = conv.lock();
            let changed = extract::apply_message(&mut state.pending, &inbound.text, &inventory);
            commit::update_intent(&mut state, &normalized);
            (changed, state.pending.clone())
        };

        if let Some(text) = commit::try_commit(
            &conv,
            self.orders.as_ref(),
            self.catalog.as_ref(),
            &business,
            &profile,
        )
        .await
        {
            self.log_message(&business, inbound, Direction::Out, &text)
                .await;
            return Ok(TurnReply { text, contact_id, short_circuit: true });
        }

        // The message advanced the order but something is still missing:
        // ask for it directly rather than spending a model round.
        if changed && !pending_snapshot.is_complete() && pending_snapshot.product_name.is_some() {
            if let Some(text) =
                extract::clarifying_question(&pending_snapshot, &business.currency_symbol)
            {
                self.log_message(&business, inbound, Direction::Out, &text)
                    .await;
                return Ok(TurnReply { text, contact_id, short_circuit: true });
            }
        }

        // Model turn.
        let history = self
            .message_log
            .recent(
                &business.business_id,
                &inbound.phone,
                self.config.commerce.history_depth,
            )
            .await?;
        let (pending, shown_products) = {
            let state = conv.lock();
            (state.pending.clone(), state.shown_products.clone())
        };
        let system = context::system_prompt(&business, &self.registry.specs());
        let ctx = context::context_block(
            &business,
            &profile,
            &pending,
            &inventory,
            self.config.commerce.inventory_prompt_items,
            &shown_products,
            &ladder.notes,
            &history,
            &inbound.channel,
            &inbound.text,
        );

        let agent = AgentLoop {
            provider: self.provider.as_ref(),
            registry: &self.registry,
            agent: &self.config.agent,
            commerce: &self.config.commerce,
        };
        let text = agent
            .run(
                system,
                ctx,
                &conv,
                &business.business_id,
                &inbound.phone,
                &inbound.channel,
            )
            .await;

        self.log_message(&business, inbound, Direction::Out, &text)
            .await;
        info!(business_id = %business.business_id, phone = %inbound.phone, "turn answered by model");
        Ok(TurnReply { text, contact_id, short_circuit: false })
    }

    async fn resolve_business(&self, inbound: &InboundMessage) -> Result<BusinessContext> {
        if let Some(id) = &inbound.business_id {
            return self.catalog.business(id).await;
        }
        self.catalog
            .business_for_number(&inbound.destination)
            .await?
            .ok_or_else(|| DukaError::BusinessNotFound(inbound.destination.clone()))
    }

    /// Transcript writes are best effort; a log-store hiccup must not eat
    /// the reply.
    async fn log_message(
        &self,
        business: &BusinessContext,
        inbound: &InboundMessage,
        direction: Direction,
        text: &str,
    ) {
        let entry = LogEntry {
            business_id: business.business_id.clone(),
            phone: inbound.phone.clone(),
            direction,
            channel: inbound.channel.clone(),
            text: text.to_string(),
            at: Utc::now(),
        };
        if let Err(e) = self.message_log.append(entry).await {
            warn!(phone = %inbound.phone, error = %e, "failed to append message log");
        }
    }
}
