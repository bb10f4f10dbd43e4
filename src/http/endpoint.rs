//! Handles the server registers with the routing table.

use std::fmt;
use std::sync::Arc;

use crate::config::schema::{EndpointKind, HandlerConfig};
use crate::mapper::Handles;

/// Handle types used by the HTTP server.
pub struct ServerHandles;

impl Handles for ServerHandles {
    type Host = Arc<str>;
    type Application = ApplicationId;
    type Handler = Endpoint;
}

/// Identity of one deployed application version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApplicationId {
    host: Arc<str>,
    path: Arc<str>,
    version: Arc<str>,
}

impl ApplicationId {
    pub fn new(host: &str, path: &str, version: &str) -> Self {
        Self {
            host: host.to_ascii_lowercase().into(),
            path: path.into(),
            version: version.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.host, self.path)?;
        if !self.version.is_empty() {
            write!(f, "@{}", self.version)?;
        }
        Ok(())
    }
}

/// What runs when a request maps to a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Static,
    Echo,
    Text { body: Arc<str>, content_type: Arc<str> },
}

impl Endpoint {
    pub fn from_config(handler: &HandlerConfig) -> Self {
        match handler.kind {
            EndpointKind::Static => Endpoint::Static,
            EndpointKind::Echo => Endpoint::Echo,
            EndpointKind::Text => Endpoint::Text {
                body: handler.body.as_deref().unwrap_or_default().into(),
                content_type: handler
                    .content_type
                    .as_deref()
                    .unwrap_or(mime::TEXT_PLAIN_UTF_8.as_ref())
                    .into(),
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Endpoint::Static => "static",
            Endpoint::Echo => "echo",
            Endpoint::Text { .. } => "text",
        }
    }
}
