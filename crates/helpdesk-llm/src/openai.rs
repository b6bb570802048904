//! OpenAI-compatible HTTP providers.
//!
//! Works against api.openai.com and any server exposing the same
//! `/chat/completions` and `/embeddings` routes (Ollama, LM Studio, vLLM).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use helpdesk_core::config::{EmbeddingConfig, ModelConfig};
use helpdesk_core::error::HelpdeskError;

use crate::chat::{ChatMessage, ChatModel, ChatRole, ModelReply, ToolCall, ToolSpec};
use crate::embedding::EmbeddingService;

/// Base URL, credentials and a timeout-bounded HTTP client.
#[derive(Debug, Clone)]
struct Endpoint {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl Endpoint {
    fn new(
        base_url: &str,
        api_key_env: &str,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> Result<Self, HelpdeskError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| HelpdeskError::Config(format!("HTTP client: {e}")))?;

        let api_key = std::env::var(api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            warn!(env = api_key_env, base_url, "No API key set; sending unauthenticated requests");
        }

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<String, HelpdeskError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                HelpdeskError::Model(format!("request to {url} timed out"))
            } else {
                HelpdeskError::Model(format!("request to {url} failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| HelpdeskError::Model(format!("reading response from {url}: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(HelpdeskError::Model(format!("{url} returned {status}: {message}")));
        }
        Ok(body)
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: ChatRole,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolSpec,
}

#[derive(Debug, Serialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<RawToolCall>>,
}

/// Tool calls are kept loose so a malformed entry degrades instead of
/// failing the whole response.
#[derive(Debug, Deserialize)]
struct RawToolCall {
    id: Option<String>,
    function: Option<RawFunction>,
}

#[derive(Debug, Deserialize)]
struct RawFunction {
    name: Option<String>,
    arguments: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: "function",
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

/// Parse a chat-completion response body.
///
/// A reply whose tool calls cannot be interpreted (missing name, arguments
/// that are not a JSON object) is returned as plain text with no calls.
pub fn parse_chat_response(body: &str) -> Result<ModelReply, HelpdeskError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| HelpdeskError::Model(format!("unreadable completion: {e}")))?;
    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| HelpdeskError::Model("completion has no choices".to_string()))?
        .message;

    let text = message.content.unwrap_or_default();
    let raw_calls = message.tool_calls.unwrap_or_default();

    let parsed: Result<Vec<ToolCall>, String> = raw_calls
        .into_iter()
        .enumerate()
        .map(|(i, raw)| convert_tool_call(i, raw))
        .collect();

    match parsed {
        Ok(tool_calls) => Ok(ModelReply { text, tool_calls }),
        Err(reason) => {
            warn!(reason = %reason, "Malformed tool call in completion, treating as plain answer");
            Ok(ModelReply::text(text))
        }
    }
}

fn convert_tool_call(index: usize, raw: RawToolCall) -> Result<ToolCall, String> {
    let function = raw.function.ok_or("tool call without function")?;
    let name = function
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or("tool call without name")?;

    let arguments = match function.arguments {
        None => serde_json::Value::Object(Default::default()),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => {
            serde_json::Value::Object(Default::default())
        }
        Some(serde_json::Value::String(s)) => serde_json::from_str(&s)
            .map_err(|e| format!("arguments of {name} are not JSON: {e}"))?,
        Some(other) => other,
    };
    if !arguments.is_object() {
        return Err(format!("arguments of {name} are not an object"));
    }

    Ok(ToolCall {
        id: raw.id.unwrap_or_else(|| format!("call_{index}")),
        name,
        arguments,
    })
}

// =============================================================================
// Chat
// =============================================================================

/// [`ChatModel`] backed by `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    endpoint: Endpoint,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    pub fn from_config(config: &ModelConfig) -> Result<Self, HelpdeskError> {
        let endpoint = Endpoint::new(
            &config.base_url,
            &config.api_key_env,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self {
            endpoint,
            model: config.chat_model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ModelReply, HelpdeskError> {
        let request = ChatRequest {
            model: &self.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: self.temperature,
            tools: tools
                .iter()
                .map(|spec| WireTool {
                    kind: "function",
                    function: spec,
                })
                .collect(),
            stream: false,
        };

        debug!(model = %self.model, messages = messages.len(), tools = tools.len(), "Chat completion");
        let body = self.endpoint.post("/chat/completions", &request).await?;
        parse_chat_response(&body)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// =============================================================================
// Embeddings
// =============================================================================

/// [`EmbeddingService`] backed by `POST {base_url}/embeddings`.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedding {
    endpoint: Endpoint,
    model: String,
}

impl OpenAiEmbedding {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, HelpdeskError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let endpoint = Endpoint::new(
            &config.base_url,
            &config.api_key_env,
            timeout.min(Duration::from_secs(10)),
            timeout,
        )?;
        Ok(Self {
            endpoint,
            model: config.model.clone(),
        })
    }
}

impl EmbeddingService for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, HelpdeskError> {
        if text.trim().is_empty() {
            return Err(HelpdeskError::Embedding("Cannot embed empty text".to_string()));
        }
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let body = self
            .endpoint
            .post("/embeddings", &request)
            .await
            .map_err(|e| HelpdeskError::Embedding(e.to_string()))?;
        let response: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|e| HelpdeskError::Embedding(format!("unreadable embedding response: {e}")))?;
        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| HelpdeskError::Embedding("embedding response has no data".to_string()))
    }

    fn dimensions(&self) -> Option<usize> {
        None
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}
