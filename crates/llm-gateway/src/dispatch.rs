//! Completion request model and the provider dispatch seam
//!
//! Forwarding to an upstream completion API lives behind
//! [`CompletionDispatcher`]; the gateway only shapes and routes the request.

use std::collections::BTreeMap;

use async_trait::async_trait;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSpec,
}

/// OpenAI-style chat completion request.
///
/// `model` is overwritten from the route as `{provider}/{model_id}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default)]
    pub presence_penalty: f64,
    #[serde(default)]
    pub frequency_penalty: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Caller session, taken from the `session` query parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

const fn default_temperature() -> f64 {
    1.0
}

const fn default_top_p() -> f64 {
    1.0
}

impl ChatCompletionRequest {
    /// Split `model` into provider and model name
    pub fn provider_and_model(&self) -> Result<(&str, &str), DispatchError> {
        match self.model.split_once('/') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
                Ok((provider, model))
            }
            _ => Err(DispatchError::InvalidModel(self.model.clone())),
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No completion provider is configured")]
    NotConfigured,

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Expected model as provider/model_name, got '{0}'")]
    InvalidModel(String),

    #[error("Upstream completion request failed: {0}")]
    Upstream(String),
}

impl DispatchError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotConfigured => StatusCode::NOT_IMPLEMENTED,
            Self::UnknownProvider(_) => StatusCode::NOT_FOUND,
            Self::InvalidModel(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

/// Forwards a completion request to the named provider
#[async_trait]
pub trait CompletionDispatcher: Send + Sync {
    async fn complete(&self, request: ChatCompletionRequest) -> Result<Value, DispatchError>;

    /// Models per provider, for `/models/list`
    fn supported_models(&self) -> BTreeMap<String, Vec<String>> {
        BTreeMap::new()
    }
}

/// Dispatcher used when no provider backend is wired in
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredDispatcher;

#[async_trait]
impl CompletionDispatcher for UnconfiguredDispatcher {
    async fn complete(&self, request: ChatCompletionRequest) -> Result<Value, DispatchError> {
        tracing::warn!(model = %request.model, "Completion requested but no provider is configured");
        Err(DispatchError::NotConfigured)
    }
}
