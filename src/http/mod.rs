//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, host, version token)
//!     → mapper lookup (pooled RoutingResult)
//!     → endpoint.rs (static / echo / text)
//!     → response.rs (redirect, 404, 503, endpoint output)
//!     → Send to client
//! ```

pub mod endpoint;
pub mod request;
pub mod response;
pub mod server;

pub use endpoint::{ApplicationId, Endpoint, ServerHandles};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
