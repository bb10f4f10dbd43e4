//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the application server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, version header).
    pub listener: ListenerConfig,

    /// Matching options for the request mapper.
    pub mapper: MapperConfig,

    /// Virtual hosts and the applications deployed on them.
    #[serde(rename = "host")]
    pub hosts: Vec<HostConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request header carrying the requested application version.
    pub version_header: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            version_header: "x-app-version".to_string(),
        }
    }
}

/// Request mapper options.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MapperConfig {
    /// Host used when no host name matches the request.
    pub default_host: Option<String>,

    /// Redirect `/app` to `/app/` when nothing maps the bare application path.
    pub context_root_redirect: bool,

    /// Redirect directory requests that lack a trailing `/`.
    pub directory_redirect: bool,

    /// Idle routing results kept for reuse.
    pub result_pool_size: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            default_host: None,
            context_root_redirect: true,
            directory_redirect: true,
            result_pool_size: 256,
        }
    }
}

/// A virtual host.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HostConfig {
    /// Host name; a leading `*.` makes it a wildcard domain.
    pub name: String,

    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default, rename = "application")]
    pub applications: Vec<ApplicationConfig>,
}

/// One deployed application version.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ApplicationConfig {
    /// Application path; `""` is the root application.
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub version: String,

    /// Directory backing static resources.
    #[serde(default)]
    pub resource_root: Option<PathBuf>,

    #[serde(default = "default_welcome_files")]
    pub welcome_files: Vec<String>,

    /// Deployed but not serving requests.
    #[serde(default)]
    pub paused: bool,

    #[serde(default, rename = "handler")]
    pub handlers: Vec<HandlerConfig>,
}

fn default_welcome_files() -> Vec<String> {
    vec!["index.html".to_string(), "index.htm".to_string()]
}

/// A handler bound to a URL pattern.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HandlerConfig {
    /// `""`, `/`, `*.ext`, `/prefix/*` or an exact path.
    pub pattern: String,

    pub kind: EndpointKind,

    /// Response body for `text` handlers.
    #[serde(default)]
    pub body: Option<String>,

    /// Content type for `text` handlers.
    #[serde(default)]
    pub content_type: Option<String>,

    /// Only map this handler when a physical resource backs the request.
    #[serde(default)]
    pub resource_only: bool,
}

/// Built-in endpoints a handler can run.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// Serve the file under the application's resource root.
    Static,
    /// Describe how the request was mapped, as JSON.
    Echo,
    /// Fixed response body.
    Text,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
