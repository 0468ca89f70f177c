use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use sgl_chat_gateway::context_shaper::ConversationTurn;
use sgl_chat_gateway::engine::{
    EngineError, EnginePrompt, InferenceEngine, SamplingConfig, SnapshotStream,
};
use sgl_chat_gateway::io_struct::ReasoningEffort;
use sgl_chat_gateway::template::PromptRenderer;

/// What the mock engine does for one submitted generation.
#[derive(Debug)]
pub enum MockResponse {
    /// Yield these cumulative snapshots, then end.
    Snapshots(Vec<Result<String, EngineError>>),
    /// Accept the generation but never produce output.
    Hang,
    /// Refuse the generation.
    Fail(EngineError),
}

impl MockResponse {
    pub fn snapshots(items: &[&str]) -> Self {
        MockResponse::Snapshots(items.iter().map(|s| Ok(s.to_string())).collect())
    }

    /// Snapshots built from a list of increments.
    pub fn increments(parts: &[&str]) -> Self {
        let mut text = String::new();
        MockResponse::Snapshots(
            parts
                .iter()
                .map(|part| {
                    text.push_str(part);
                    Ok(text.clone())
                })
                .collect(),
        )
    }
}

/// Scripted engine. Responses are consumed in order; once the script is
/// exhausted every generation produces no output.
#[derive(Debug)]
pub struct MockEngine {
    model_name: String,
    responses: Mutex<VecDeque<MockResponse>>,
    submissions: Mutex<Vec<(EnginePrompt, SamplingConfig)>>,
}

impl MockEngine {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            model_name: "mock-model".to_string(),
            responses: Mutex::new(responses.into()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn submissions(&self) -> Vec<(EnginePrompt, SamplingConfig)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn last_text_prompt(&self) -> Option<String> {
        self.submissions()
            .into_iter()
            .rev()
            .find_map(|(prompt, _)| match prompt {
                EnginePrompt::Text(text) => Some(text),
                EnginePrompt::TokenIds(_) => None,
            })
    }
}

#[async_trait]
impl InferenceEngine for MockEngine {
    async fn submit(
        &self,
        prompt: EnginePrompt,
        sampling: SamplingConfig,
    ) -> Result<SnapshotStream, EngineError> {
        self.submissions.lock().unwrap().push((prompt, sampling));
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockResponse::Snapshots(Vec::new()));

        match response {
            MockResponse::Snapshots(items) => Ok(stream::iter(items).boxed()),
            MockResponse::Hang => Ok(stream::pending().boxed()),
            MockResponse::Fail(e) => Err(e),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Renders one `role: text` line per turn so tests can see which turns
/// survived shaping.
#[derive(Debug, Default)]
pub struct MockRenderer;

impl PromptRenderer for MockRenderer {
    fn render(&self, turns: &[ConversationTurn], effort: ReasoningEffort) -> String {
        let mut prompt = format!("effort: {}\n", effort.as_str());
        for turn in turns {
            prompt.push_str(&format!("{}: {}\n", turn.role.as_str(), turn.text));
        }
        prompt
    }

    fn name(&self) -> &str {
        "mock"
    }
}
