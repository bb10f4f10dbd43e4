//! End-to-end request mapping through the axum router.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use webhost::HttpServer;

mod common;

async fn send(router: &Router, host: &str, uri: &str, version: Option<&str>) -> Response {
    let mut request = Request::builder().uri(uri).header(header::HOST, host);
    if let Some(version) = version {
        request = request.header("x-app-version", version);
    }
    router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

fn server() -> (tempfile::TempDir, HttpServer) {
    let dir = tempfile::tempdir().unwrap();
    common::write_site(dir.path());
    let server = HttpServer::new(common::shop_config(dir.path()));
    (dir, server)
}

#[tokio::test]
async fn test_echo_reports_mapping() {
    let (_dir, server) = server();
    let response = send(&server.router(), "shop.local:8080", "/store/items/42", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let report = body_json(response).await;
    assert_eq!(report["host"], "shop.local");
    assert_eq!(report["application_path"], "/store");
    assert_eq!(report["handler_path"], "/items");
    assert_eq!(report["path_info"], "/42");
    assert_eq!(report["match_type"], "WILDCARD");
    assert_eq!(report["handler"], "echo");
}

#[tokio::test]
async fn test_context_root_redirect() {
    let (_dir, server) = server();
    let response = send(&server.router(), "www.shop.local", "/store?tab=1", None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/store/?tab=1");
}

#[tokio::test]
async fn test_static_files_and_welcome_file() {
    let (_dir, server) = server();
    let router = server.router();

    let index = send(&router, "shop.local", "/store/", None).await;
    assert_eq!(index.status(), StatusCode::OK);
    assert_eq!(index.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
    assert_eq!(body_text(index).await, "<h1>store</h1>");

    let guide = send(&router, "shop.local", "/store/docs/guide.txt", None).await;
    assert_eq!(body_text(guide).await, "read me");

    let docs = send(&router, "shop.local", "/store/docs", None).await;
    assert_eq!(docs.status(), StatusCode::FOUND);
    assert_eq!(docs.headers()[header::LOCATION], "/store/docs/");

    let missing = send(&router, "shop.local", "/store/missing.txt", None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_text_endpoint() {
    let (_dir, server) = server();
    let response = send(&server.router(), "SHOP.local", "/store/hello", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "hello from the store");
}

#[tokio::test]
async fn test_version_header_selects_version() {
    let (_dir, server) = server();
    let router = server.router();

    let latest = body_json(send(&router, "shop.local", "/api/users", None).await).await;
    assert_eq!(latest["version"], "2");
    assert_eq!(latest["versions"], serde_json::json!(["1", "2"]));

    let pinned = body_json(send(&router, "shop.local", "/api/users", Some("1")).await).await;
    assert_eq!(pinned["version"], "1");
    assert_eq!(pinned["path_info"], "/users");
}

#[tokio::test]
async fn test_unmapped_and_paused() {
    let (_dir, server) = server();
    let router = server.router();

    assert_eq!(send(&router, "other.local", "/store/", None).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(send(&router, "shop.local", "/nothing", None).await.status(), StatusCode::NOT_FOUND);

    server.table().pause_application_version("shop.local", "/store", "").unwrap();
    assert_eq!(
        send(&router, "shop.local", "/store/items/1", None).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_reload_updates_live_router() {
    let (dir, server) = server();
    let router = server.router();

    let mut updated = common::shop_config(dir.path());
    updated.hosts[0].applications[0].handlers.push(common::text_handler("/sale", "50% off"));
    updated.hosts[0].aliases.clear();
    assert!(server.reload(&updated) >= 2);

    let sale = send(&router, "shop.local", "/store/sale", None).await;
    assert_eq!(body_text(sale).await, "50% off");
    let aliased = send(&router, "www.shop.local", "/store/sale", None).await;
    assert_eq!(aliased.status(), StatusCode::NOT_FOUND);
}
