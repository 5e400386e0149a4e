//! Admission behavior of the full kernel router, driven without a socket.

use axum::body::Body;
use axum::http::{Method, StatusCode};
use axum::Router;
use tower::ServiceExt;

use platform_kernel::config::{KernelConfig, SecurityConfig};
use platform_kernel::{HttpServer, Kernel, ModuleCatalog};

mod common;
use common::{body_json, client, get, json_post, request};

async fn kernel_with(security: SecurityConfig) -> (Kernel, Router) {
    let config = KernelConfig {
        security,
        ..KernelConfig::default()
    };
    let kernel = Kernel::start(config.clone(), ModuleCatalog::builtin()).await;
    let router = HttpServer::new(config, &kernel).router();
    (kernel, router)
}

#[tokio::test]
async fn test_rate_limit_rejects_past_limit() {
    let (kernel, app) = kernel_with(SecurityConfig {
        max_requests_per_minute: 3,
        ..SecurityConfig::default()
    })
    .await;

    for i in 0..3 {
        let res = app.clone().oneshot(get("/health", client(1))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["ratelimit-limit"], "3");
        assert_eq!(
            res.headers()["ratelimit-remaining"],
            (2 - i).to_string().as_str()
        );
    }

    let res = app.clone().oneshot(get("/health", client(1))).await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.headers()["ratelimit-remaining"], "0");
    assert!(res.headers().contains_key("retry-after"));
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    let body = body_json(res).await;
    assert_eq!(body["status"], 429);
    assert_eq!(body["error"], "Rate limit exceeded");

    // Another client has its own window.
    let res = app.clone().oneshot(get("/health", client(2))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let stats = kernel.stats().snapshot();
    assert_eq!(stats.gateway.requests_total, 5);
    assert_eq!(stats.gateway.rejected.rate_limited, 1);
    kernel.shutdown().await;
}

#[tokio::test]
async fn test_disabled_rate_limiting_admits_everything() {
    let (kernel, app) = kernel_with(SecurityConfig {
        enable_rate_limiting: false,
        max_requests_per_minute: 1,
        ..SecurityConfig::default()
    })
    .await;

    for _ in 0..150 {
        let res = app.clone().oneshot(get("/health", client(1))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(!res.headers().contains_key("ratelimit-limit"));
    }
    assert_eq!(kernel.gateway().rate_limiter().tracked_clients(), 0);
    kernel.shutdown().await;
}

#[tokio::test]
async fn test_content_type_and_size_validation() {
    let (kernel, app) = kernel_with(SecurityConfig {
        enable_csrf_protection: false,
        ..SecurityConfig::default()
    })
    .await;

    let text = request(Method::POST, "/api/stats", client(1))
        .header("content-type", "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    let res = app.clone().oneshot(text).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["status"], 400);

    // Admitted by the gateway; the route itself only serves GET.
    let json = request(Method::POST, "/api/stats", client(1))
        .header("content-type", "application/json; charset=utf-8")
        .body(Body::from("{}"))
        .unwrap();
    let res = app.clone().oneshot(json).await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    let huge = json_post("/api/stats", client(1))
        .header("content-length", (20 * 1024 * 1024).to_string())
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(huge).await.unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = body_json(res).await;
    assert_eq!(body["status"], 413);

    let stats = kernel.stats().snapshot();
    assert_eq!(stats.gateway.rejected.invalid_request, 1);
    assert_eq!(stats.gateway.rejected.payload_too_large, 1);
    kernel.shutdown().await;
}

fn chunked_body(chunks: usize, chunk_size: usize) -> Body {
    let parts = (0..chunks).map(move |_| Ok::<_, std::io::Error>(vec![b' '; chunk_size]));
    Body::from_stream(futures_util::stream::iter(parts))
}

#[tokio::test]
async fn test_chunked_body_without_content_length_is_bounded() {
    let (kernel, app) = kernel_with(SecurityConfig {
        enable_csrf_protection: false,
        ..SecurityConfig::default()
    })
    .await;

    let huge = json_post("/api/stats", client(1))
        .body(chunked_body(20, 1024 * 1024))
        .unwrap();
    assert!(!huge.headers().contains_key("content-length"));
    let res = app.clone().oneshot(huge).await.unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
    assert_eq!(body_json(res).await["status"], 413);

    let small = json_post("/api/stats", client(1))
        .body(chunked_body(4, 1024))
        .unwrap();
    let res = app.clone().oneshot(small).await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    assert_eq!(kernel.stats().snapshot().gateway.rejected.payload_too_large, 1);
    kernel.shutdown().await;
}

#[tokio::test]
async fn test_disabled_validation_skips_checks() {
    let (kernel, app) = kernel_with(SecurityConfig {
        enable_request_validation: false,
        enable_csrf_protection: false,
        ..SecurityConfig::default()
    })
    .await;

    let req = request(Method::POST, "/api/stats", client(1))
        .header("content-type", "text/plain")
        .header("content-length", (20 * 1024 * 1024).to_string())
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    kernel.shutdown().await;
}

#[tokio::test]
async fn test_security_headers_and_hsts() {
    let (kernel, app) = kernel_with(SecurityConfig {
        trust_forwarded_proto: true,
        ..SecurityConfig::default()
    })
    .await;

    let res = app.clone().oneshot(get("/health", client(1))).await.unwrap();
    let headers = res.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-xss-protection"], "1; mode=block");
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    assert!(headers["content-security-policy"]
        .to_str()
        .unwrap()
        .contains("frame-ancestors 'none'"));
    assert!(!headers.contains_key("strict-transport-security"));
    assert!(headers.contains_key("x-request-id"));

    let secure = request(Method::GET, "/health", client(1))
        .header("x-forwarded-proto", "https")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(secure).await.unwrap();
    assert_eq!(
        res.headers()["strict-transport-security"],
        "max-age=31536000; includeSubDomains"
    );
    kernel.shutdown().await;
}

#[tokio::test]
async fn test_csrf_token_flow() {
    let (kernel, app) = kernel_with(SecurityConfig {
        csrf_single_use: true,
        ..SecurityConfig::default()
    })
    .await;

    let res = app
        .clone()
        .oneshot(get("/api/csrf-token", client(1)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let token = body_json(res).await["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);

    let missing = json_post("/api/stats", client(1)).body(Body::empty()).unwrap();
    let res = app.clone().oneshot(missing).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(res).await["status"], 403);

    let with_token = json_post("/api/stats", client(1))
        .header("x-csrf-token", &token)
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(with_token).await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    let replay = json_post("/api/stats", client(1))
        .header("x-csrf-token", &token)
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(replay).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    assert_eq!(kernel.stats().snapshot().gateway.rejected.csrf_rejected, 2);
    kernel.shutdown().await;
}

#[tokio::test]
async fn test_bearer_api_key_bypasses_csrf() {
    let (kernel, app) = kernel_with(SecurityConfig {
        api_keys: vec!["service-key".to_string()],
        ..SecurityConfig::default()
    })
    .await;

    let authorized = json_post("/api/stats", client(1))
        .header("authorization", "Bearer service-key")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(authorized).await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    let wrong = json_post("/api/stats", client(1))
        .header("authorization", "Bearer service-kez")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(wrong).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    kernel.shutdown().await;
}

#[tokio::test]
async fn test_policy_reload_applies_to_live_router() {
    let (kernel, app) = kernel_with(SecurityConfig::default()).await;

    let mut next = kernel.config().clone();
    next.security.max_requests_per_minute = 1;
    kernel.apply_config(&next);

    let res = app.clone().oneshot(get("/health", client(7))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = app.clone().oneshot(get("/health", client(7))).await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    kernel.shutdown().await;
}

#[tokio::test]
async fn test_module_endpoints() {
    let (kernel, app) = kernel_with(SecurityConfig::default()).await;

    let res = app.clone().oneshot(get("/health", client(1))).await.unwrap();
    let body = body_json(res).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["modules"]["ready"], 1);

    let res = app
        .clone()
        .oneshot(get("/api/modules", client(1)))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["heartbeat"]["status"], "ready");

    let res = app
        .clone()
        .oneshot(get("/api/modules/heartbeat/health", client(1)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["healthy"], true);

    let res = app
        .clone()
        .oneshot(get("/api/modules/missing/status", client(1)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    kernel.shutdown().await;
}
