//! The bounded model↔tool loop. Each customer turn gets at most
//! `max_iterations` model round-trips; a tool call feeds its result back
//! and always earns the model another round before a final answer is
//! trusted.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use duka_config::{AgentConfig, CommerceConfig};
use duka_core::ChatMessage;
use duka_llm::{ChatProvider, CompletionRequest};

use crate::envelope::{decode_actions, AgentAction};
use crate::state::ConversationState;
use crate::tools::ToolRegistry;

/// Turn failed soft: model error, timeout, or empty completion.
pub const FALLBACK_APOLOGY: &str =
    "Sorry, something went wrong on my end just now. Please send that again in a moment.";

/// Iteration budget ran out with tool activity but no final answer.
pub const FALLBACK_BUSY: &str =
    "Sorry, this is taking longer than expected. Please give me a moment and ask again.";

pub struct AgentLoop<'a> {
    pub provider: &'a dyn ChatProvider,
    pub registry: &'a ToolRegistry,
    pub agent: &'a AgentConfig,
    pub commerce: &'a CommerceConfig,
}

impl AgentLoop<'_> {
    /// Run the loop to a natural-language reply. Never errors: every
    /// failure path terminates in a plain-language sentence.
    pub async fn run(
        &self,
        system: String,
        context: String,
        conv: &Arc<Mutex<ConversationState>>,
        business_id: &str,
        phone: &str,
        channel: &str,
    ) -> String {
        let mut messages = vec![ChatMessage::system(system), ChatMessage::user(context)];
        let cooldown = Duration::from_secs(self.commerce.tool_cooldown_secs);
        let completion_timeout = Duration::from_secs(self.agent.completion_timeout_secs);

        for iteration in 1..=self.agent.max_iterations {
            let request = CompletionRequest {
                model: self.agent.model.clone(),
                messages: messages.clone(),
                temperature: self.agent.temperature,
                max_tokens: self.agent.max_tokens,
            };

            let completion =
                match tokio::time::timeout(completion_timeout, self.provider.complete(&request))
                    .await
                {
                    Ok(Ok(text)) if !text.trim().is_empty() => text,
                    Ok(Ok(_)) => {
                        warn!(iteration, "empty completion");
                        return FALLBACK_APOLOGY.to_string();
                    }
                    Ok(Err(e)) => {
                        warn!(iteration, error = %e, "completion failed");
                        return FALLBACK_APOLOGY.to_string();
                    }
                    Err(_) => {
                        warn!(
                            iteration,
                            timeout_secs = self.agent.completion_timeout_secs,
                            "completion timed out"
                        );
                        return FALLBACK_APOLOGY.to_string();
                    }
                };

            let actions = decode_actions(&completion);
            if actions.is_empty() {
                // The model forgot the envelope; the raw text is the answer.
                debug!(iteration, "no envelope decoded, returning raw text");
                return completion.trim().to_string();
            }

            let mut tool_ran = false;
            let mut final_answer: Option<String> = None;

            for action in actions {
                match action {
                    AgentAction::ToolCall { tool_name, mut parameters } => {
                        self.inject_identity(&mut parameters, business_id, phone, channel, &tool_name);

                        let result = self
                            .run_tool(&tool_name, &parameters, conv, cooldown)
                            .await;
                        tool_ran = true;

                        messages.push(ChatMessage::assistant(
                            json!({
                                "action": "tool_call",
                                "tool_name": tool_name,
                                "parameters": parameters,
                            })
                            .to_string(),
                        ));
                        messages.push(ChatMessage::user(format!(
                            "Tool result for {tool_name}: {result}"
                        )));
                    }
                    AgentAction::FinalAnswer { message } => final_answer = Some(message),
                }
            }

            // A final answer co-occurring with an executed tool is not
            // trusted; the model gets another round with the tool result.
            if let Some(answer) = final_answer {
                if !tool_ran {
                    return answer;
                }
                debug!(iteration, "discarding final_answer in same batch as tool call");
            }
        }

        warn!(max_iterations = self.agent.max_iterations, "iteration budget exhausted");
        FALLBACK_BUSY.to_string()
    }

    /// Auto-inject conversation identity the model routinely omits.
    fn inject_identity(
        &self,
        parameters: &mut Value,
        business_id: &str,
        phone: &str,
        channel: &str,
        tool_name: &str,
    ) {
        if !parameters.is_object() {
            *parameters = Value::Object(Default::default());
        }
        if let Value::Object(obj) = parameters {
            obj.entry("business_id")
                .or_insert_with(|| Value::String(business_id.to_string()));
            obj.entry("phone")
                .or_insert_with(|| Value::String(phone.to_string()));
            if ToolRegistry::is_media_tool(tool_name) {
                obj.entry("channel")
                    .or_insert_with(|| Value::String(channel.to_string()));
            }
        }
    }

    /// Cooldown gate, then execution. The state lock is never held across
    /// the tool's await.
    async fn run_tool(
        &self,
        tool_name: &str,
        parameters: &Value,
        conv: &Arc<Mutex<ConversationState>>,
        cooldown: Duration,
    ) -> String {
        let now = Instant::now();
        if ToolRegistry::is_cooldown_tool(tool_name) {
            let remaining = conv.lock().cooldown_remaining(tool_name, cooldown, now);
            if let Some(remaining) = remaining {
                debug!(tool = tool_name, remaining_secs = remaining.as_secs(), "tool throttled");
                return json!({
                    "status": "throttled",
                    "reason": format!(
                        "{tool_name} was used moments ago; it can run again in {}s. Acknowledge without retrying.",
                        remaining.as_secs().max(1)
                    ),
                })
                .to_string();
            }
        }

        let outcome = self.registry.execute(tool_name, parameters).await;

        let mut state = conv.lock();
        if ToolRegistry::is_cooldown_tool(tool_name) {
            state.stamp_cooldown(tool_name, now);
        }
        for product in outcome.shown_products {
            if !state.shown_products.contains(&product) {
                state.shown_products.push(product);
            }
        }
        outcome.content
    }
}
