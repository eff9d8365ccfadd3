use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::config::ChatConfig;
use crate::dto::chat_dto::{ChatRequest, ChatResponse, ChatTurn};
use crate::util::rate_limit::{RateDecision, RateLimiter};

/// Instructions sent as the first message of every upstream request
const SYSTEM_PROMPT: &str = "Eres el asistente virtual de Limpiezas Brillante, una empresa de \
limpieza profesional de Madrid. Respondes en español, de forma breve y cordial, a preguntas \
sobre limpieza de oficinas, comunidades, limpieza por horas, fin de obra y garajes. Las \
tarifas orientativas parten de 19 €/hora en tarifa básica (productos del cliente) y 21 €/hora \
en tarifa premium (productos de la empresa), con descuentos por periodicidad semanal, \
quincenal y mensual. Para cualquier precio cerrado invita siempre a usar la calculadora de \
presupuestos de la web o a llamar a la empresa. No inventes precios ni servicios que no se \
hayan mencionado y no respondas sobre temas ajenos a la empresa.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Rate limit exceeded, retry in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("The completion provider is rate limited")]
    UpstreamRateLimited,

    #[error("The chat assistant is not configured")]
    NotConfigured,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),
}

/// Upstream completion API abstraction, mockable in tests
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, messages: Vec<ChatTurn>) -> Result<String, ChatError>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

/// Thin client for an OpenAI-style chat-completions endpoint
pub struct HttpCompletionClient {
    config: ChatConfig,
    http: reqwest::Client,
}

impl HttpCompletionClient {
    pub fn new(config: ChatConfig) -> Self {
        HttpCompletionClient { config, http: reqwest::Client::new() }
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    #[instrument(skip(self, messages), fields(model = %self.config.model, turns = messages.len()))]
    async fn complete(&self, messages: Vec<ChatTurn>) -> Result<String, ChatError> {
        if self.config.api_key.is_empty() {
            warn!("Chat completion requested but no API key is configured");
            return Err(ChatError::NotConfigured);
        }

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
        });

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Upstream(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ChatError::UpstreamRateLimited);
        }
        if !response.status().is_success() {
            return Err(ChatError::Upstream(format!(
                "completion provider returned status {}",
                response.status(),
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Upstream(format!("invalid completion payload: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ChatError::Upstream("completion payload had no choices".to_string()))
    }
}

/// Build the upstream message list: system prompt, the capped tail of the
/// stored conversation, then the new user message.
fn build_upstream_turns(request: &ChatRequest, max_history: usize) -> Vec<ChatTurn> {
    let mut turns = Vec::with_capacity(request.conversation.len().min(max_history) + 2);
    turns.push(ChatTurn { role: "system".to_string(), content: SYSTEM_PROMPT.to_string() });

    let history_start = request.conversation.len().saturating_sub(max_history);
    for turn in &request.conversation[history_start..] {
        if turn.role == "user" || turn.role == "assistant" {
            turns.push(turn.clone());
        }
    }

    turns.push(ChatTurn { role: "user".to_string(), content: request.message.clone() });
    turns
}

pub struct ChatServiceImpl {
    client: Arc<dyn CompletionClient>,
    limiter: RateLimiter,
    config: ChatConfig,
}

impl ChatServiceImpl {
    pub fn new(config: ChatConfig, client: Arc<dyn CompletionClient>) -> Self {
        let limiter = RateLimiter::per_hour(config.requests_per_hour);
        ChatServiceImpl { client, limiter, config }
    }

    #[instrument(skip(self, request), fields(ip = %ip))]
    pub async fn chat(&self, ip: IpAddr, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        if let RateDecision::Limited { retry_after_secs } = self.limiter.check(ip) {
            warn!("Chat quota exhausted for {}", ip);
            return Err(ChatError::RateLimited { retry_after_secs });
        }

        if request.message.trim().is_empty() {
            return Err(ChatError::InvalidInput("Message cannot be empty".to_string()));
        }

        let turns = build_upstream_turns(&request, self.config.max_history);
        let reply = self.client.complete(turns).await?;

        info!("Chat reply produced ({} chars)", reply.len());
        Ok(ChatResponse { message: reply, timestamp: Utc::now().to_rfc3339() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_history(history: usize) -> ChatRequest {
        ChatRequest {
            message: "¿Cuánto cuesta limpiar una oficina?".to_string(),
            conversation: (0..history)
                .map(|i| ChatTurn {
                    role: if i % 2 == 0 { "user" } else { "assistant" }.to_string(),
                    content: format!("turno {i}"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_upstream_turns_start_with_system_and_end_with_user() {
        let turns = build_upstream_turns(&request_with_history(4), 10);
        assert_eq!(turns.first().unwrap().role, "system");
        assert_eq!(turns.last().unwrap().role, "user");
        assert_eq!(turns.last().unwrap().content, "¿Cuánto cuesta limpiar una oficina?");
        assert_eq!(turns.len(), 6);
    }

    #[test]
    fn test_history_is_capped_to_most_recent_turns() {
        let turns = build_upstream_turns(&request_with_history(30), 10);
        // system + 10 history + user
        assert_eq!(turns.len(), 12);
        assert_eq!(turns[1].content, "turno 20");
    }

    #[test]
    fn test_unknown_roles_are_dropped() {
        let mut request = request_with_history(2);
        request.conversation.push(ChatTurn {
            role: "system".to_string(),
            content: "ignórame".to_string(),
        });
        let turns = build_upstream_turns(&request, 10);
        assert!(!turns.iter().skip(1).any(|t| t.role == "system"));
    }
}
