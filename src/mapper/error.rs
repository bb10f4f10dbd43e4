//! Caller-misuse errors raised by the mapper.
//!
//! Not-found and registration conflicts are not errors: lookups leave the
//! result empty and mutations return `Ok(false)`.

use thiserror::Error;

/// Malformed input handed to the routing table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapperError {
    /// Host names must contain at least one character after canonicalization.
    #[error("host name must not be empty")]
    EmptyHostName,

    /// Application paths are either `""` (root) or start with `/` and do not end with one.
    #[error("invalid application path '{0}'")]
    InvalidApplicationPath(String),

    /// Request paths must start with `/`.
    #[error("request path '{0}' does not start with '/'")]
    InvalidRequestPath(String),

    /// Handler patterns must be `""`, `/`, `*.ext`, `/prefix/*` or an absolute path.
    #[error("invalid handler pattern '{0}'")]
    InvalidPattern(String),
}

/// Result alias for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;
