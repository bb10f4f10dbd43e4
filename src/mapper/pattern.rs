//! Handler pattern classification.
//!
//! | pattern        | table     | stored name |
//! |----------------|-----------|-------------|
//! | `""`           | exact     | `""` (application root) |
//! | `/`            | default   | -           |
//! | `/items/*`     | wildcard  | `/items`    |
//! | `/*`           | wildcard  | `""`        |
//! | `*.jsp`        | extension | `jsp`       |
//! | `/exact/path`  | exact     | `/exact/path` |

use crate::mapper::error::{MapperError, MapperResult};

/// Which handler table a pattern lives in, with its stored name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerPattern<'a> {
    Exact(&'a str),
    Wildcard(&'a str),
    Extension(&'a str),
    Default,
}

impl<'a> HandlerPattern<'a> {
    pub fn parse(pattern: &'a str) -> MapperResult<Self> {
        if pattern.is_empty() {
            return Ok(Self::Exact(""));
        }
        if pattern == "/" {
            return Ok(Self::Default);
        }
        if let Some(extension) = pattern.strip_prefix("*.") {
            if extension.is_empty() || extension.contains('/') || extension.contains('*') {
                return Err(MapperError::InvalidPattern(pattern.to_string()));
            }
            return Ok(Self::Extension(extension));
        }
        if !pattern.starts_with('/') {
            return Err(MapperError::InvalidPattern(pattern.to_string()));
        }
        if let Some(prefix) = pattern.strip_suffix("/*") {
            if prefix.contains('*') {
                return Err(MapperError::InvalidPattern(pattern.to_string()));
            }
            return Ok(Self::Wildcard(prefix));
        }
        if pattern.contains('*') {
            return Err(MapperError::InvalidPattern(pattern.to_string()));
        }
        Ok(Self::Exact(pattern))
    }
}

/// Number of `/` characters in `path`.
pub fn slash_count(path: &str) -> usize {
    path.bytes().filter(|b| *b == b'/').count()
}

/// Byte index of the `n`th `/` (1-based), or the path length if there are fewer.
pub fn nth_slash(path: &str, n: usize) -> usize {
    path.bytes()
        .enumerate()
        .filter(|(_, b)| *b == b'/')
        .nth(n.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(path.len())
}

/// Validate an application path: `""` or `/segment[/segment...]` without a trailing `/`.
pub fn validate_application_path(path: &str) -> MapperResult<()> {
    if path.is_empty() || (path.starts_with('/') && !path.ends_with('/')) {
        Ok(())
    } else {
        Err(MapperError::InvalidApplicationPath(path.to_string()))
    }
}

/// Validate a request path handed to a lookup.
pub fn validate_request_path(path: &str) -> MapperResult<()> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(MapperError::InvalidRequestPath(path.to_string()))
    }
}
