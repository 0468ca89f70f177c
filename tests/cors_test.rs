mod common;

use std::sync::Arc;

use actix_web::{App, http::StatusCode, rt::System, test as actix_test};
use common::mock_engine::{MockEngine, MockRenderer};
use common::{create_app_state, test_config};
use sgl_chat_gateway::server::{configure, create_cors};

const FRONTEND: &str = "http://localhost:3000";

fn preflight(uri: &str, origin: &str) -> actix_test::TestRequest {
    actix_test::TestRequest::default()
        .method(actix_web::http::Method::OPTIONS)
        .uri(uri)
        .insert_header(("origin", origin))
        .insert_header(("access-control-request-method", "POST"))
        .insert_header(("access-control-request-headers", "content-type"))
}

#[test]
fn test_any_origin_allowed_by_default() {
    System::new().block_on(async {
        let engine = Arc::new(MockEngine::new(vec![]));
        let state = create_app_state(engine, Some(Arc::new(MockRenderer)), test_config());
        let app = actix_test::init_service(
            App::new()
                .wrap(create_cors(&[]))
                .app_data(state.clone())
                .configure(configure),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/health")
            .insert_header(("origin", FRONTEND))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            FRONTEND
        );

        let req = preflight("/chat", FRONTEND).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            FRONTEND
        );
        assert!(resp.headers().contains_key("access-control-allow-methods"));
    });
}

#[test]
fn test_configured_origins_restrict_access() {
    System::new().block_on(async {
        let engine = Arc::new(MockEngine::new(vec![]));
        let state = create_app_state(engine, Some(Arc::new(MockRenderer)), test_config());
        let app = actix_test::init_service(
            App::new()
                .wrap(create_cors(&[FRONTEND.to_string()]))
                .app_data(state.clone())
                .configure(configure),
        )
        .await;

        let req = preflight("/chat", FRONTEND).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            FRONTEND
        );

        let req = preflight("/chat", "http://evil.example").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(!resp.headers().contains_key("access-control-allow-origin"));

        // Same-origin callers send no Origin header and are unaffected.
        let req = actix_test::TestRequest::get().uri("/health").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    });
}
