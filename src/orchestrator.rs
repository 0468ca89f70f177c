// Glue between the HTTP layer and the engine: prompt preparation, admission,
// snapshot diffing and channel demultiplexing.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use log::{error, info, warn};

use crate::admission::{AdmissionGuard, AdmissionPermit};
use crate::channel_parser::ChannelDemultiplexer;
use crate::config::ServerConfig;
use crate::context_shaper::{char_budget, shape, turns_from_messages};
use crate::engine::{EngineError, EnginePrompt, InferenceEngine, SnapshotStream};
use crate::error::ApiError;
use crate::io_struct::{ChatReqInput, GenerateReqInput, StreamChunk};
use crate::template::PromptRenderer;

/// Response body of one generation, one chunk per NDJSON line.
pub type ChunkStream = BoxStream<'static, StreamChunk>;

/// Computes increments between cumulative snapshots.
#[derive(Debug, Default)]
pub struct IncrementTracker {
    last: String,
}

impl IncrementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text in `snapshot` past the longest common prefix with the previous
    /// snapshot. Text that was already streamed cannot be retracted, so a
    /// rewritten snapshot only contributes its new suffix.
    pub fn advance(&mut self, snapshot: String) -> String {
        let common = common_prefix_len(&self.last, &snapshot);
        if common < self.last.len() {
            warn!(
                "Snapshot diverged from streamed text at byte {} of {}",
                common,
                self.last.len()
            );
        }
        let increment = snapshot[common..].to_string();
        self.last = snapshot;
        increment
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map_or_else(|| a.len().min(b.len()), |((idx, _), _)| idx)
}

/// State of one streamed generation. Owns the admission permit, so the slot
/// is freed when the stream ends or is dropped by a disconnecting client.
pub struct Generation {
    request_id: String,
    snapshots: SnapshotStream,
    tracker: IncrementTracker,
    demux: Option<ChannelDemultiplexer>,
    pending: VecDeque<StreamChunk>,
    done: bool,
    malformed: usize,
    _permit: AdmissionPermit,
}

impl Generation {
    /// Plain completion: every increment is forwarded as `{"text"}`.
    pub fn completion(
        request_id: String,
        snapshots: SnapshotStream,
        permit: AdmissionPermit,
    ) -> Self {
        Self::new(request_id, snapshots, None, permit)
    }

    /// Chat: increments go through the channel demultiplexer.
    pub fn chat(request_id: String, snapshots: SnapshotStream, permit: AdmissionPermit) -> Self {
        Self::new(
            request_id,
            snapshots,
            Some(ChannelDemultiplexer::new()),
            permit,
        )
    }

    fn new(
        request_id: String,
        snapshots: SnapshotStream,
        demux: Option<ChannelDemultiplexer>,
        permit: AdmissionPermit,
    ) -> Self {
        Self {
            request_id,
            snapshots,
            tracker: IncrementTracker::new(),
            demux,
            pending: VecDeque::new(),
            done: false,
            malformed: 0,
            _permit: permit,
        }
    }

    pub fn into_stream(self) -> ChunkStream {
        stream::unfold(self, |mut generation| async move {
            generation
                .next_chunk()
                .await
                .map(|chunk| (chunk, generation))
        })
        .boxed()
    }

    async fn next_chunk(&mut self) -> Option<StreamChunk> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Some(chunk);
            }
            if self.done {
                return None;
            }

            match self.snapshots.next().await {
                Some(Ok(snapshot)) => {
                    let increment = self.tracker.advance(snapshot);
                    self.on_increment(&increment);
                }
                Some(Err(EngineError::MalformedRecord(detail))) => {
                    // Treated as an empty increment.
                    self.malformed += 1;
                    warn!("[{}] Skipping upstream record: {}", self.request_id, detail);
                }
                Some(Err(e)) => {
                    error!("[{}] Generation failed: {}", self.request_id, e);
                    self.on_end();
                }
                None => {
                    self.on_end();
                    info!(
                        "[{}] Generation finished ({} malformed records)",
                        self.request_id, self.malformed
                    );
                }
            }
        }
    }

    fn on_increment(&mut self, increment: &str) {
        match &mut self.demux {
            Some(demux) => self
                .pending
                .extend(demux.feed(increment).into_iter().map(StreamChunk::from)),
            None if !increment.is_empty() => self.pending.push_back(StreamChunk::text(increment)),
            None => {}
        }
    }

    fn on_end(&mut self) {
        if let Some(demux) = &mut self.demux {
            self.pending
                .extend(demux.finish().into_iter().map(StreamChunk::from));
        }
        self.done = true;
    }
}

impl Drop for Generation {
    fn drop(&mut self) {
        if !self.done {
            info!(
                "[{}] Stream dropped before completion, releasing admission slot",
                self.request_id
            );
        }
    }
}

/// Entry point for both request kinds. Holds the engine, the optional chat
/// renderer and the admission guard for the lifetime of the server.
pub struct Orchestrator {
    engine: Arc<dyn InferenceEngine>,
    renderer: Option<Arc<dyn PromptRenderer>>,
    admission: Arc<AdmissionGuard>,
    config: ServerConfig,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        renderer: Option<Arc<dyn PromptRenderer>>,
        config: ServerConfig,
    ) -> Self {
        Self {
            engine,
            renderer,
            admission: Arc::new(AdmissionGuard::new()),
            config,
        }
    }

    pub fn model_name(&self) -> &str {
        self.engine.model_name()
    }

    pub fn is_busy(&self) -> bool {
        self.admission.is_busy()
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    pub async fn completion(&self, req: GenerateReqInput) -> Result<ChunkStream, ApiError> {
        let sampling = req.sampling.resolve(&self.config.sampling)?;
        let prompt = req.engine_prompt()?;

        let permit = self.admit()?;
        let request_id = new_request_id();
        info!("[{}] Starting completion", request_id);

        let snapshots = self.engine.submit(prompt, sampling).await?;
        Ok(Generation::completion(request_id, snapshots, permit).into_stream())
    }

    pub async fn chat(&self, req: ChatReqInput) -> Result<ChunkStream, ApiError> {
        let sampling = req.sampling.resolve(&self.config.sampling)?;
        if req.messages.is_empty() {
            return Err(ApiError::BadRequest("Messages list is required".to_string()));
        }
        let turns = turns_from_messages(&req.messages);
        if turns.is_empty() {
            return Err(ApiError::BadRequest(
                "No renderable messages in request".to_string(),
            ));
        }

        let renderer = self.renderer.as_ref().ok_or_else(|| {
            ApiError::EngineUnavailable("chat template is not loaded".to_string())
        })?;

        let budget = char_budget(
            self.config.context_window_tokens,
            sampling.max_tokens as usize,
        );
        let turns = shape(turns, budget);
        let prompt = renderer.render(&turns, req.reasoning_effort);

        let permit = self.admit()?;
        let request_id = new_request_id();
        info!(
            "[{}] Starting chat with {} turn(s), reasoning effort {}",
            request_id,
            turns.len(),
            req.reasoning_effort.as_str()
        );

        let snapshots = self.engine.submit(EnginePrompt::Text(prompt), sampling).await?;
        Ok(Generation::chat(request_id, snapshots, permit).into_stream())
    }

    fn admit(&self) -> Result<AdmissionPermit, ApiError> {
        self.admission.try_permit().ok_or_else(|| {
            warn!("Rejecting request: a generation is already in progress");
            ApiError::AdmissionRejected
        })
    }
}

fn new_request_id() -> String {
    format!("gen-{:016x}", rand::random::<u64>())
}
