use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, HttpServer, error, get, post, web};
use futures::StreamExt;
use log::{error, info};
use serde_json::json;

use crate::config::ServerConfig;
use crate::engine::HttpEngine;
use crate::error::ApiError;
use crate::io_struct::{ChatReqInput, GenerateReqInput};
use crate::orchestrator::{ChunkStream, Orchestrator};
use crate::template::load_renderer;

pub struct AppState {
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Build the engine and chat renderer described by `config`.
    ///
    /// A renderer that fails to load is logged and left out; the server still
    /// starts and the chat path answers with a server error.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let engine = HttpEngine::new(
            &config.engine_url,
            &config.model_name,
            config.request_timeout_secs,
        )?;

        let renderer = match load_renderer(&config.chat_template) {
            Ok(renderer) => {
                info!("Loaded chat template '{}'", renderer.name());
                Some(renderer)
            }
            Err(e) => {
                error!("Chat template unavailable, /chat is disabled: {}", e);
                None
            }
        };

        let orchestrator = Orchestrator::new(Arc::new(engine), renderer, config.clone());
        Ok(Self::new(orchestrator))
    }
}

fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    error!("JSON payload error: {:?}", err);
    match &err {
        error::JsonPayloadError::OverflowKnownLength { length, limit } => {
            error::ErrorPayloadTooLarge(format!(
                "Payload too large: {} bytes exceeds limit of {} bytes",
                length, limit
            ))
        }
        error::JsonPayloadError::Overflow { limit } => {
            error::ErrorPayloadTooLarge(format!("Payload exceeds limit of {} bytes", limit))
        }
        _ => ApiError::BadRequest(format!("Invalid JSON payload: {}", err)).into(),
    }
}

pub fn json_config(max_payload_size: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(max_payload_size)
        .error_handler(json_error_handler)
}

/// CORS policy for browser front ends. An empty list allows any origin.
pub fn create_cors(allowed_origins: &[String]) -> Cors {
    let cors = if allowed_origins.is_empty() {
        Cors::permissive()
    } else {
        allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    cors.max_age(3600)
}

fn ndjson_response(chunks: ChunkStream) -> HttpResponse {
    let body = chunks.map(|chunk| chunk.to_ndjson().map_err(error::ErrorInternalServerError));
    HttpResponse::Ok()
        .content_type("application/x-ndjson")
        .streaming(body)
}

#[get("/health")]
pub async fn health(app_state: web::Data<AppState>) -> HttpResponse {
    let orchestrator = &app_state.orchestrator;
    HttpResponse::Ok().json(json!({
        "status": "active",
        "model": orchestrator.model_name(),
        "busy": orchestrator.is_busy(),
        "chat": orchestrator.has_renderer(),
    }))
}

async fn stream_completion(
    req: GenerateReqInput,
    app_state: &AppState,
) -> Result<HttpResponse, ApiError> {
    let chunks = app_state.orchestrator.completion(req).await?;
    Ok(ndjson_response(chunks))
}

#[post("/generate")]
pub async fn generate(
    req: web::Json<GenerateReqInput>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    stream_completion(req.into_inner(), &app_state).await
}

#[post("/completion")]
pub async fn completion(
    req: web::Json<GenerateReqInput>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    stream_completion(req.into_inner(), &app_state).await
}

#[post("/chat")]
pub async fn chat(
    req: web::Json<ChatReqInput>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let chunks = app_state.orchestrator.chat(req.into_inner()).await?;
    Ok(ndjson_response(chunks))
}

/// Register every route of the gateway.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(generate)
        .service(completion)
        .service(chat);
}

pub async fn startup(config: ServerConfig, app_state: AppState) -> std::io::Result<()> {
    let app_state = web::Data::new(app_state);
    let max_payload_size = config.max_payload_size;
    let cors_allowed_origins = config.cors_allowed_origins.clone();

    info!("Starting server at {}:{}", config.host, config.port);
    if cors_allowed_origins.is_empty() {
        info!("CORS: any origin allowed");
    } else {
        info!("CORS allowed origins: {:?}", cors_allowed_origins);
    }

    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(create_cors(&cors_allowed_origins))
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .app_data(json_config(max_payload_size))
            .configure(configure)
    })
    .bind((config.host, config.port))?
    .run()
    .await
}
