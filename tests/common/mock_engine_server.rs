use std::sync::{Arc, Mutex};

use actix_web::dev::ServerHandle;
use actix_web::{App, HttpResponse, HttpServer, web};
use bytes::Bytes;
use futures::stream;
use serde_json::Value;

/// Behaviour of the mock `/generate` endpoint.
#[derive(Debug, Clone)]
pub struct MockEngineServerConfig {
    /// Raw body lines, sent as separate chunks.
    pub records: Vec<String>,
    /// Answer with this status and no stream.
    pub fail_status: Option<u16>,
}

impl MockEngineServerConfig {
    /// SSE records carrying the cumulative snapshots, closed by `[DONE]`.
    pub fn sse(snapshots: &[&str]) -> Self {
        let mut records: Vec<String> = snapshots
            .iter()
            .map(|s| format!("data: {}\n\n", serde_json::json!({ "text": s })))
            .collect();
        records.push("data: [DONE]\n\n".to_string());
        Self {
            records,
            fail_status: None,
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            records: Vec::new(),
            fail_status: Some(status),
        }
    }
}

struct MockState {
    config: MockEngineServerConfig,
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn generate_handler(body: web::Json<Value>, state: web::Data<MockState>) -> HttpResponse {
    state.requests.lock().unwrap().push(body.into_inner());

    if let Some(status) = state.config.fail_status {
        let status = actix_web::http::StatusCode::from_u16(status).unwrap();
        return HttpResponse::build(status).body("mock engine failure");
    }

    let chunks: Vec<Result<Bytes, actix_web::Error>> = state
        .config
        .records
        .iter()
        .map(|r| Ok(Bytes::from(r.clone())))
        .collect();
    HttpResponse::Ok()
        .content_type("text/event-stream")
        .streaming(stream::iter(chunks))
}

/// Upstream engine stand-in bound to an ephemeral local port. Must be
/// started from inside an actix system.
pub struct MockEngineServer {
    pub url: String,
    handle: ServerHandle,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockEngineServer {
    pub fn start(config: MockEngineServerConfig) -> std::io::Result<Self> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let state = web::Data::new(MockState {
            config,
            requests: requests.clone(),
        });
        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .route("/generate", web::post().to(generate_handler))
        })
        .workers(1)
        .listen(listener)?
        .run();

        let handle = server.handle();
        actix_web::rt::spawn(server);

        Ok(Self {
            url: format!("http://127.0.0.1:{}", port),
            handle,
            requests,
        })
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn stop(self) {
        self.handle.stop(true).await;
    }
}
