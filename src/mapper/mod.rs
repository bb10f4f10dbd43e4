//! Request mapping subsystem.
//!
//! # Data Flow
//! ```text
//! Deployment events (deploy module)
//!     → table.rs (copy-on-write mutation, per-host writer lock)
//!     → new snapshot published with one atomic swap
//!
//! Inbound request (host, path, version?)
//!     → lookup.rs (host → application → version → handler)
//!     → result.rs (caller-owned RoutingResult, pooled)
//!     → HTTP layer invokes the handler or redirects
//! ```
//!
//! # Design Decisions
//! - Every table is a name-sorted `Vec` behind an `ArcSwap`; published
//!   arrays are never mutated
//! - Readers take no lock and see either the old or the new snapshot
//! - Aliases share their real host's application list by reference
//! - Handles are opaque to the mapper (see [`Handles`])

pub mod entry;
pub mod error;
pub mod lookup;
pub mod model;
pub mod pattern;
pub mod resource;
pub mod result;
pub mod table;

pub use error::{MapperError, MapperResult};
pub use model::{
    ApplicationDeployment, ApplicationEntry, ApplicationList, ApplicationVersion, Handles,
    HandlerEntry, HandlerRegistration, HostEntry,
};
pub use pattern::HandlerPattern;
pub use resource::{FsResourceRoot, ResourceRoot};
pub use result::{MatchType, PooledResult, RoutingResult, RoutingResultPool};
pub use table::{
    canonical_host_name, ApplicationSnapshot, HostSnapshot, MapperOptions, RoutingTable,
    VersionSnapshot,
};
