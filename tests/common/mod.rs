// These modules are used by several integration test binaries
#![allow(dead_code)]

pub mod mock_engine;
pub mod mock_engine_server;

use std::sync::Arc;

use actix_web::web;
use serde_json::Value;
use sgl_chat_gateway::config::ServerConfig;
use sgl_chat_gateway::engine::InferenceEngine;
use sgl_chat_gateway::orchestrator::Orchestrator;
use sgl_chat_gateway::server::AppState;
use sgl_chat_gateway::template::PromptRenderer;

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        model_name: "mock-model".to_string(),
        engine_url: "http://127.0.0.1:1".to_string(),
        request_timeout_secs: 5,
        max_payload_size: 64 * 1024,
        ..Default::default()
    }
}

/// Helper function to create AppState for tests
pub fn create_app_state(
    engine: Arc<dyn InferenceEngine>,
    renderer: Option<Arc<dyn PromptRenderer>>,
    config: ServerConfig,
) -> web::Data<AppState> {
    web::Data::new(AppState::new(Orchestrator::new(engine, renderer, config)))
}

/// Parse an NDJSON response body into one value per line.
pub fn parse_ndjson(body: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(body)
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).expect("every line must be valid JSON"))
        .collect()
}

/// Concatenate the `text` of every event with the given `type`.
pub fn joined_text(events: &[Value], kind: &str) -> String {
    events
        .iter()
        .filter(|e| e["type"] == kind)
        .filter_map(|e| e["text"].as_str())
        .collect()
}
