use super::catalog::{ListModelsResponse, ModelCatalog};
use super::config::ProviderConfig;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use reqwest::blocking::Client as HttpClient;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

const PROBE_QUERY: &str = "Hello, can you hear me?";

/// A single-turn request: optional system instructions plus the user text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            system: String::new(),
            user: text.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unreadable provider response: {0}")]
    Decode(String),
    #[error("provider returned no text")]
    EmptyResponse,
}

impl InvocationError {
    /// Short stable name written into failed-response markers.
    pub fn kind(&self) -> &'static str {
        match self {
            InvocationError::Transport(_) => "transport",
            InvocationError::Status { .. } => "status",
            InvocationError::Decode(_) => "decode",
            InvocationError::EmptyResponse => "empty",
        }
    }
}

pub trait ChatModel: Send + Sync {
    fn model_id(&self) -> &str;
    fn invoke(&self, prompt: &Prompt) -> Result<String, InvocationError>;
}

/// Shared HTTP plumbing for the Bedrock control and runtime APIs.
#[derive(Clone)]
pub struct BedrockClient {
    http: HttpClient,
    config: Arc<ProviderConfig>,
}

impl BedrockClient {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build the HTTP client for Bedrock")?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Binds a model identifier. The identifier is not checked here; an
    /// unknown model only fails once it is invoked.
    pub fn chat_model(&self, model_id: impl Into<String>) -> BedrockChatModel {
        BedrockChatModel {
            client: self.clone(),
            model_id: model_id.into(),
        }
    }

    fn converse_url(&self, model_id: &str) -> Result<Url, InvocationError> {
        let mut url = Url::parse(&self.config.runtime_endpoint)
            .map_err(|err| InvocationError::Transport(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| InvocationError::Transport("runtime endpoint cannot be a base".into()))?
            .pop_if_empty()
            .extend(["model", model_id, "converse"]);
        Ok(url)
    }
}

impl ModelCatalog for BedrockClient {
    fn list_foundation_models(&self) -> Result<ListModelsResponse> {
        let url = format!("{}/foundation-models", self.config.control_endpoint);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .with_context(|| format!("request to {} failed", url))?
            .error_for_status()
            .context("Bedrock returned an error status while listing models")?;

        response
            .json()
            .context("unreadable model listing from Bedrock")
    }
}

/// Loads a chat handle for `model_id` from an explicit configuration.
pub fn load_model(config: ProviderConfig, model_id: &str) -> Result<BedrockChatModel> {
    let client = BedrockClient::new(config)?;
    info!(model = model_id, region = %client.config().region, "model handle ready");
    Ok(client.chat_model(model_id))
}

#[derive(Clone)]
pub struct BedrockChatModel {
    client: BedrockClient,
    model_id: String,
}

impl ChatModel for BedrockChatModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn invoke(&self, prompt: &Prompt) -> Result<String, InvocationError> {
        let config = &self.client.config;
        let url = self.client.converse_url(&self.model_id)?;
        let payload = ConverseRequest::new(prompt, config);

        let response = self
            .client
            .http
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .map_err(|err| InvocationError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InvocationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw: ConverseResponse = response
            .json()
            .map_err(|err| InvocationError::Decode(err.to_string()))?;
        debug!(stop_reason = ?raw.stop_reason, "converse call finished");
        raw.into_text()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest<'a> {
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<TextBlock<'a>>,
    inference_config: InferenceConfig,
}

impl<'a> ConverseRequest<'a> {
    fn new(prompt: &'a Prompt, config: &ProviderConfig) -> Self {
        let system = if prompt.system.trim().is_empty() {
            Vec::new()
        } else {
            vec![TextBlock {
                text: &prompt.system,
            }]
        };
        Self {
            messages: vec![Message {
                role: "user",
                content: vec![TextBlock { text: &prompt.user }],
            }],
            system,
            inference_config: InferenceConfig {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<TextBlock<'a>>,
}

#[derive(Debug, Serialize)]
struct TextBlock<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceConfig {
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseResponse {
    output: ConverseOutput,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConverseOutput {
    message: Option<OutputMessage>,
}

#[derive(Debug, Deserialize)]
struct OutputMessage {
    #[serde(default)]
    content: Vec<OutputBlock>,
}

#[derive(Debug, Deserialize)]
struct OutputBlock {
    #[serde(default)]
    text: Option<String>,
}

impl ConverseResponse {
    fn into_text(self) -> Result<String, InvocationError> {
        let text: Vec<String> = self
            .output
            .message
            .map(|message| message.content)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            return Err(InvocationError::EmptyResponse);
        }
        Ok(text.join("\n"))
    }
}

/// Sends a fixed greeting to check credentials and model access.
pub fn probe_model(model: &dyn ChatModel) -> bool {
    match model.invoke(&Prompt::user(PROBE_QUERY)) {
        Ok(reply) => {
            info!(model = model.model_id(), %reply, "model answered");
            true
        }
        Err(err) => {
            error!(model = model.model_id(), %err, "model probe failed");
            false
        }
    }
}

/// Scripted model for tests: replays queued results in order and records
/// every prompt it receives.
#[derive(Clone, Default)]
pub struct MockChatModel {
    responses: Arc<Mutex<VecDeque<Result<String, InvocationError>>>>,
    prompts: Arc<Mutex<Vec<Prompt>>>,
}

impl MockChatModel {
    pub fn push_response(&self, response: impl Into<String>) {
        self.responses.lock().push_back(Ok(response.into()));
    }

    pub fn push_error(&self, error: InvocationError) {
        self.responses.lock().push_back(Err(error));
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().clone()
    }
}

impl ChatModel for MockChatModel {
    fn model_id(&self) -> &str {
        "mock"
    }

    fn invoke(&self, prompt: &Prompt) -> Result<String, InvocationError> {
        self.prompts.lock().push(prompt.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or(Err(InvocationError::EmptyResponse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> BedrockClient {
        BedrockClient::new(ProviderConfig::new("us-east-1", "secret")).unwrap()
    }

    #[test]
    fn converse_url_keeps_model_id_in_one_segment() {
        let url = test_client()
            .converse_url("anthropic.claude-3-5-sonnet-20240620-v1:0")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/anthropic.claude-3-5-sonnet-20240620-v1:0/converse"
        );

        let url = test_client().converse_url("arn:aws:bedrock/x").unwrap();
        assert!(url.path().ends_with("/model/arn:aws:bedrock%2Fx/converse"));
    }

    #[test]
    fn request_carries_system_only_when_present() {
        let config = ProviderConfig::new("us-east-1", "secret").with_max_tokens(256);
        let prompt = Prompt {
            system: "Classify.".into(),
            user: "A / B".into(),
        };
        let value = serde_json::to_value(ConverseRequest::new(&prompt, &config)).unwrap();
        assert_eq!(value["system"][0]["text"], "Classify.");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"][0]["text"], "A / B");
        assert_eq!(value["inferenceConfig"]["maxTokens"], 256);

        let value =
            serde_json::to_value(ConverseRequest::new(&Prompt::user("hi"), &config)).unwrap();
        assert!(value.get("system").is_none());
    }

    #[test]
    fn response_text_blocks_are_joined() {
        let json = r#"{
            "output": {"message": {"role": "assistant", "content": [
                {"text": "label: 1"}, {"text": "explanation: fine"}
            ]}},
            "stopReason": "end_turn",
            "usage": {"inputTokens": 10, "outputTokens": 5, "totalTokens": 15}
        }"#;
        let parsed: ConverseResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.into_text().unwrap(), "label: 1\nexplanation: fine");

        let empty: ConverseResponse =
            serde_json::from_str(r#"{"output": {"message": {"content": []}}}"#).unwrap();
        assert!(matches!(empty.into_text(), Err(InvocationError::EmptyResponse)));
    }

    #[test]
    fn probe_reports_success_and_failure() {
        let model = MockChatModel::default();
        model.push_response("Yes, I can hear you.");
        model.push_error(InvocationError::Status {
            status: 403,
            body: "AccessDeniedException".into(),
        });

        assert!(probe_model(&model));
        assert!(!probe_model(&model));
        assert_eq!(model.prompts()[0].user, PROBE_QUERY);
    }
}
