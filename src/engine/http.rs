// Engine backed by an SGLang-style `/generate` HTTP endpoint that streams the
// cumulative output text.

use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use log::{debug, info};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::engine::{EngineError, EnginePrompt, InferenceEngine, SamplingConfig, SnapshotStream};

/// Longest slice of a bad record quoted in errors and logs.
const RECORD_PREVIEW_LEN: usize = 120;

#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: reqwest::Client,
    url: String,
    model_name: String,
}

impl HttpEngine {
    pub fn new(url: &str, model_name: &str, timeout_secs: u64) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| EngineError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            model_name: model_name.to_string(),
        })
    }

    pub fn api_path(&self, api_path: &str) -> String {
        if api_path.starts_with('/') {
            format!("{}{}", self.url, api_path)
        } else {
            format!("{}/{}", self.url, api_path)
        }
    }

    fn request_body(prompt: &EnginePrompt, sampling: &SamplingConfig) -> Value {
        let mut body = json!({
            "sampling_params": {
                "temperature": sampling.temperature,
                "top_p": sampling.top_p,
                "max_new_tokens": sampling.max_tokens,
            },
            "stream": true,
        });
        match prompt {
            EnginePrompt::Text(text) => body["text"] = json!(text),
            EnginePrompt::TokenIds(ids) => body["input_ids"] = json!(ids),
        }
        body
    }
}

#[async_trait]
impl InferenceEngine for HttpEngine {
    async fn submit(
        &self,
        prompt: EnginePrompt,
        sampling: SamplingConfig,
    ) -> Result<SnapshotStream, EngineError> {
        let url = self.api_path("/generate");
        let body = Self::request_body(&prompt, &sampling);
        debug!("Submitting generation to {}", url);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        info!("Engine accepted generation ({})", status);
        Ok(snapshot_stream(resp.bytes_stream()))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotRecord {
    text: String,
}

enum LineOutcome {
    Continue,
    Done,
}

/// Splits a streamed body into lines and decodes each into a snapshot.
#[derive(Debug, Default)]
struct RecordDecoder {
    pending: Vec<u8>,
}

impl RecordDecoder {
    /// Returns true once the end-of-stream record was seen.
    fn push(&mut self, chunk: &[u8], out: &mut VecDeque<Result<String, EngineError>>) -> bool {
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let LineOutcome::Done = decode_line(&line, out) {
                self.pending.clear();
                return true;
            }
        }
        false
    }

    fn flush(&mut self, out: &mut VecDeque<Result<String, EngineError>>) {
        let line = std::mem::take(&mut self.pending);
        decode_line(&line, out);
    }
}

fn decode_line(line: &[u8], out: &mut VecDeque<Result<String, EngineError>>) -> LineOutcome {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    // Blank separators and SSE comments.
    if line.is_empty() || line.starts_with(':') {
        return LineOutcome::Continue;
    }

    let payload = line
        .strip_prefix("data:")
        .map(str::trim_start)
        .unwrap_or(line);
    if payload == "[DONE]" {
        return LineOutcome::Done;
    }

    match serde_json::from_str::<SnapshotRecord>(payload) {
        Ok(record) => out.push_back(Ok(record.text)),
        Err(e) => {
            let preview: String = payload.chars().take(RECORD_PREVIEW_LEN).collect();
            out.push_back(Err(EngineError::MalformedRecord(format!(
                "{} ({})",
                e, preview
            ))));
        }
    }
    LineOutcome::Continue
}

/// Turn a streamed response body into cumulative snapshots.
pub fn snapshot_stream<S, E>(body: S) -> SnapshotStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = (
        Box::pin(body),
        RecordDecoder::default(),
        VecDeque::new(),
        false,
    );

    stream::unfold(
        state,
        |(mut body, mut decoder, mut ready, mut done)| async move {
            loop {
                if let Some(item) = ready.pop_front() {
                    return Some((item, (body, decoder, ready, done)));
                }
                if done {
                    return None;
                }
                match body.next().await {
                    Some(Ok(chunk)) => done = decoder.push(&chunk, &mut ready),
                    Some(Err(e)) => {
                        ready.push_back(Err(EngineError::Stream(e.to_string())));
                        done = true;
                    }
                    None => {
                        decoder.flush(&mut ready);
                        done = true;
                    }
                }
            }
        },
    )
    .boxed()
}
