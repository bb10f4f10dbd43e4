//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → deploy::plan turns it into deployment events
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → deploy::plan diffs old and new into deployment events
//!     → routing table updated in place, no restart
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes arrive as a full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A config that fails validation never reaches the routing table

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, ApplicationConfig, EndpointKind, HandlerConfig, HostConfig, ListenerConfig,
    MapperConfig, ServerConfig,
};
pub use validation::ValidationError;
