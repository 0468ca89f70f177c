use clap::Parser;
use log::info;
use sgl_chat_gateway::config::{ConfigValidator, SamplingDefaults, ServerConfig};
use sgl_chat_gateway::logging;
use sgl_chat_gateway::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "sgl-chat-gateway")]
#[command(about = "Streaming chat and completion gateway in front of a single inference engine")]
struct CliArgs {
    /// Host address to bind the gateway
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the gateway
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Model name reported by the health endpoint
    #[arg(long, env = "MODEL_NAME", default_value = "gpt-oss-20b")]
    model_name: String,

    /// Base URL of the inference engine
    #[arg(long, env = "ENGINE_URL", default_value = "http://127.0.0.1:30000")]
    engine_url: String,

    /// Chat template used to render conversations
    #[arg(long, env = "CHAT_TEMPLATE", default_value = "harmony")]
    chat_template: String,

    /// Model context window in tokens
    #[arg(long, env = "CONTEXT_WINDOW_TOKENS", default_value_t = 8192)]
    context_window_tokens: usize,

    /// Default sampling temperature
    #[arg(long, default_value_t = 0.7)]
    temperature: f32,

    /// Default nucleus sampling probability
    #[arg(long, default_value_t = 0.95)]
    top_p: f32,

    /// Default maximum number of generated tokens
    #[arg(long, default_value_t = 100)]
    max_tokens: u32,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 600)]
    request_timeout_secs: u64,

    /// Maximum payload size in bytes
    #[arg(long, default_value_t = 4194304)] // 4MB
    max_payload_size: usize,

    /// CORS allowed origins; any origin is allowed when none are given
    #[arg(long, num_args = 0..)]
    cors_allowed_origins: Vec<String>,

    /// Set the logging level
    #[arg(long, env = "LOG_LEVEL", value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: Option<String>,
}

impl CliArgs {
    fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            model_name: self.model_name.clone(),
            engine_url: self.engine_url.clone(),
            chat_template: self.chat_template.clone(),
            context_window_tokens: self.context_window_tokens,
            sampling: SamplingDefaults {
                temperature: self.temperature,
                top_p: self.top_p,
                max_tokens: self.max_tokens,
            },
            request_timeout_secs: self.request_timeout_secs,
            max_payload_size: self.max_payload_size,
            log_level: self.log_level.clone(),
            cors_allowed_origins: self.cors_allowed_origins.clone(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli_args = CliArgs::parse();

    let config = cli_args.to_server_config();
    ConfigValidator::validate(&config)?;

    logging::init(config.log_level.as_deref());
    info!("Model: {}", config.model_name);
    info!("Engine: {}", config.engine_url);

    let app_state = AppState::from_config(&config)?;

    actix_web::rt::System::new().block_on(server::startup(config, app_state))?;

    Ok(())
}
