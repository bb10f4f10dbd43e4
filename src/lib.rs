//! Embeddable application-hosting HTTP engine with a copy-on-write request mapper.

pub mod admin;
pub mod config;
pub mod deploy;
pub mod http;
pub mod lifecycle;
pub mod mapper;
pub mod observability;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use mapper::{RoutingResult, RoutingTable};
