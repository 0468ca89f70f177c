use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel_parser::{Channel, ChannelEvent};
use crate::config::{ConfigResult, ConfigValidator, SamplingDefaults};
use crate::engine::{EnginePrompt, SamplingConfig};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

/// Optional sampling fields shared by both request kinds.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SamplingRequest {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl SamplingRequest {
    /// Fill in defaults and check ranges.
    pub fn resolve(&self, defaults: &SamplingDefaults) -> ConfigResult<SamplingConfig> {
        let temperature = self.temperature.unwrap_or(defaults.temperature);
        let top_p = self.top_p.unwrap_or(defaults.top_p);
        let max_tokens = self.max_tokens.unwrap_or(defaults.max_tokens);

        ConfigValidator::check_temperature("temperature", temperature)?;
        ConfigValidator::check_top_p("top_p", top_p)?;
        ConfigValidator::check_max_tokens("max_tokens", max_tokens)?;

        Ok(SamplingConfig {
            temperature,
            top_p,
            max_tokens,
        })
    }
}

/// Body of the plain completion endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateReqInput {
    pub prompt: Option<String>,
    pub input_ids: Option<Vec<u32>>,

    #[serde(flatten)]
    pub sampling: SamplingRequest,
}

impl GenerateReqInput {
    pub fn engine_prompt(&self) -> Result<EnginePrompt, ApiError> {
        match (&self.prompt, &self.input_ids) {
            (Some(_), Some(_)) => Err(ApiError::BadRequest(
                "Both prompt and input_ids are present in the request".to_string(),
            )),
            (Some(prompt), None) if !prompt.is_empty() => Ok(EnginePrompt::Text(prompt.clone())),
            (None, Some(ids)) if !ids.is_empty() => Ok(EnginePrompt::TokenIds(ids.clone())),
            _ => Err(ApiError::BadRequest("Prompt is required".to_string())),
        }
    }
}

/// Body of the chat endpoint. Messages stay loosely typed here so that a
/// single bad message can be skipped instead of failing the request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatReqInput {
    #[serde(default)]
    pub messages: Vec<Value>,

    #[serde(default)]
    pub reasoning_effort: ReasoningEffort,

    #[serde(flatten)]
    pub sampling: SamplingRequest,
}

/// One line of the NDJSON response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamChunk {
    Channel {
        #[serde(rename = "type")]
        channel: Channel,
        text: String,
    },
    Text {
        text: String,
    },
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        StreamChunk::Text { text: text.into() }
    }

    /// Serialize as a single newline-terminated JSON line.
    pub fn to_ndjson(&self) -> Result<Bytes, serde_json::Error> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(Bytes::from(line))
    }
}

impl From<ChannelEvent> for StreamChunk {
    fn from(event: ChannelEvent) -> Self {
        StreamChunk::Channel {
            channel: event.channel,
            text: event.text,
        }
    }
}
