// Inference engine collaborator: submit a prompt, receive cumulative text
// snapshots.

pub mod http;

use async_trait::async_trait;
use futures::stream::BoxStream;

pub use http::HttpEngine;

/// Prompt handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePrompt {
    Text(String),
    TokenIds(Vec<u32>),
}

/// Resolved sampling settings for one generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine request failed: {0}")]
    Request(String),

    #[error("Engine returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// A record in the snapshot stream could not be decoded. The stream
    /// itself is still usable.
    #[error("Malformed upstream record: {0}")]
    MalformedRecord(String),

    #[error("Engine stream failed: {0}")]
    Stream(String),
}

/// Stream of cumulative generated text. Each item is the full text so far,
/// not a delta.
pub type SnapshotStream = BoxStream<'static, Result<String, EngineError>>;

/// The shared token generator. One instance is built at startup and owned by
/// the application state.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn submit(
        &self,
        prompt: EnginePrompt,
        sampling: SamplingConfig,
    ) -> Result<SnapshotStream, EngineError>;

    fn model_name(&self) -> &str;
}
