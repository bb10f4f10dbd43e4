//! Deployment subsystem.
//!
//! # Data Flow
//! ```text
//! ServerConfig (startup or reload)
//!     → plan.rs (initial deploy, or diff old → new)
//!     → DeploymentEvent sequence (events.rs)
//!     → listener.rs (mutation calls on the routing table)
//!     → outcome logged and counted
//! ```
//!
//! # Design Decisions
//! - Events carry handles, not config, so other sources can drive the table
//! - A rejected event is logged and skipped; later events still apply
//! - Reloads only touch hosts and applications that changed

pub mod events;
pub mod listener;
pub mod plan;

pub use events::{DeploymentEvent, VersionKey};
pub use listener::{EventOutcome, MapperListener};
pub use plan::ServerEvent;
