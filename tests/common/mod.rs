//! Shared utilities for integration tests.

use std::path::Path;

use webhost::config::{ApplicationConfig, EndpointKind, HandlerConfig, HostConfig, ServerConfig};
use webhost::mapper::{
    ApplicationDeployment, Handles, HandlerRegistration, RoutingResult, RoutingTable,
};

/// Plain string handles, so assertions read like the table they test.
pub struct TestHandles;

impl Handles for TestHandles {
    type Host = &'static str;
    type Application = &'static str;
    type Handler = &'static str;
}

pub type TestTable = RoutingTable<TestHandles>;

/// `shop.local` (alias `www.shop.local`) with `/store` serving `/items/*`.
#[allow(dead_code)]
pub fn shop_table() -> TestTable {
    let table = TestTable::default();
    table
        .add_host("shop.local", &["www.shop.local".to_string()], "shop")
        .unwrap();
    let deployment = ApplicationDeployment::new("/store", "", "store")
        .with_handler(HandlerRegistration::new("/items/*", "items"));
    table
        .add_application_version("shop.local", "shop", deployment)
        .unwrap();
    table
}

/// Look up and return a fresh result.
#[allow(dead_code)]
pub fn map(
    table: &TestTable,
    host: &str,
    path: &str,
    version: Option<&str>,
) -> RoutingResult<TestHandles> {
    let mut result = RoutingResult::new();
    table.lookup(host, path, version, &mut result).unwrap();
    result
}

#[allow(dead_code)]
pub fn handler(pattern: &str, kind: EndpointKind) -> HandlerConfig {
    HandlerConfig {
        pattern: pattern.to_string(),
        kind,
        body: None,
        content_type: None,
        resource_only: false,
    }
}

#[allow(dead_code)]
pub fn text_handler(pattern: &str, body: &str) -> HandlerConfig {
    HandlerConfig {
        body: Some(body.to_string()),
        ..handler(pattern, EndpointKind::Text)
    }
}

/// A server config hosting `shop.local` with static files from `root`.
#[allow(dead_code)]
pub fn shop_config(root: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.hosts.push(HostConfig {
        name: "shop.local".to_string(),
        aliases: vec!["www.shop.local".to_string()],
        applications: vec![
            ApplicationConfig {
                path: "/store".to_string(),
                version: String::new(),
                resource_root: Some(root.to_path_buf()),
                welcome_files: vec!["index.html".to_string()],
                paused: false,
                handlers: vec![
                    handler("/items/*", EndpointKind::Echo),
                    text_handler("/hello", "hello from the store"),
                    handler("/", EndpointKind::Static),
                ],
            },
            ApplicationConfig {
                path: "/api".to_string(),
                version: "1".to_string(),
                resource_root: None,
                welcome_files: Vec::new(),
                paused: false,
                handlers: vec![handler("/*", EndpointKind::Echo)],
            },
            ApplicationConfig {
                path: "/api".to_string(),
                version: "2".to_string(),
                resource_root: None,
                welcome_files: Vec::new(),
                paused: false,
                handlers: vec![handler("/*", EndpointKind::Echo)],
            },
        ],
    });
    config
}

/// Lay out a small static site: `index.html` and `docs/guide.txt`.
#[allow(dead_code)]
pub fn write_site(root: &Path) {
    std::fs::write(root.join("index.html"), "<h1>store</h1>").unwrap();
    std::fs::create_dir(root.join("docs")).unwrap();
    std::fs::write(root.join("docs").join("guide.txt"), "read me").unwrap();
}
