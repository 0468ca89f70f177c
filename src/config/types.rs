/// Main gateway configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address to bind the HTTP server
    pub host: String,
    /// Port to bind the HTTP server
    pub port: u16,
    /// Model name reported by the health endpoint
    pub model_name: String,
    /// Base URL of the upstream inference engine
    pub engine_url: String,
    /// Name of the chat template used on the chat path
    pub chat_template: String,
    /// Model context window in tokens
    pub context_window_tokens: usize,
    /// Sampling values applied when a request leaves them out
    pub sampling: SamplingDefaults,
    /// Timeout for one upstream generation, including the streamed body
    pub request_timeout_secs: u64,
    /// Maximum accepted request body in bytes
    pub max_payload_size: usize,
    /// Log level filter (error, warn, info, debug, trace)
    pub log_level: Option<String>,
    /// Origins allowed to call the gateway from a browser; empty allows any
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_name: "gpt-oss-20b".to_string(),
            engine_url: "http://127.0.0.1:30000".to_string(),
            chat_template: "harmony".to_string(),
            context_window_tokens: 8192,
            sampling: SamplingDefaults::default(),
            request_timeout_secs: 600,
            max_payload_size: 4 * 1024 * 1024,
            log_level: None,
            cors_allowed_origins: Vec::new(),
        }
    }
}

/// Defaults for the optional sampling fields of a request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingDefaults {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for SamplingDefaults {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            max_tokens: 100,
        }
    }
}
