//! Lookup output and its pool.
//!
//! A [`RoutingResult`] is filled by one lookup and recycled before the next.
//! Its strings keep their allocations across recycles, which is why request
//! handlers take one from a [`RoutingResultPool`] instead of building one per
//! request.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::mapper::model::{ApplicationVersion, Handles};

/// Which matching rule selected the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    ContextRoot,
    Exact,
    Wildcard,
    Extension,
    Default,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::ContextRoot => "context_root",
            MatchType::Exact => "exact",
            MatchType::Wildcard => "wildcard",
            MatchType::Extension => "extension",
            MatchType::Default => "default",
        }
    }
}

/// Caller-owned output of a lookup.
pub struct RoutingResult<T: Handles> {
    pub(crate) host: Option<T::Host>,
    pub(crate) application: Option<T::Application>,
    pub(crate) application_version: Option<Arc<ApplicationVersion<T>>>,
    pub(crate) handler: Option<T::Handler>,
    pub(crate) application_path: String,
    pub(crate) request_path: String,
    pub(crate) handler_path: String,
    pub(crate) path_info: String,
    pub(crate) redirect_path: String,
    pub(crate) match_type: Option<MatchType>,
    pub(crate) applications_for_version_choice: Vec<T::Application>,
    /// Candidate paths built during welcome-file resolution.
    pub(crate) scratch: String,
}

impl<T: Handles> RoutingResult<T> {
    pub fn new() -> Self {
        Self {
            host: None,
            application: None,
            application_version: None,
            handler: None,
            application_path: String::new(),
            request_path: String::new(),
            handler_path: String::new(),
            path_info: String::new(),
            redirect_path: String::new(),
            match_type: None,
            applications_for_version_choice: Vec::new(),
            scratch: String::new(),
        }
    }

    /// Clear every field, keeping allocations.
    pub fn recycle(&mut self) {
        self.host = None;
        self.application = None;
        self.application_version = None;
        self.handler = None;
        self.application_path.clear();
        self.request_path.clear();
        self.handler_path.clear();
        self.path_info.clear();
        self.redirect_path.clear();
        self.match_type = None;
        self.applications_for_version_choice.clear();
        self.scratch.clear();
    }

    pub fn host(&self) -> Option<&T::Host> {
        self.host.as_ref()
    }

    pub fn application(&self) -> Option<&T::Application> {
        self.application.as_ref()
    }

    pub fn application_version(&self) -> Option<&Arc<ApplicationVersion<T>>> {
        self.application_version.as_ref()
    }

    pub fn handler(&self) -> Option<&T::Handler> {
        self.handler.as_ref()
    }

    /// Path of the matched application (`""` for the root application).
    pub fn application_path(&self) -> &str {
        &self.application_path
    }

    /// Request path relative to the application.
    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    pub fn handler_path(&self) -> &str {
        &self.handler_path
    }

    pub fn path_info(&self) -> Option<&str> {
        if self.path_info.is_empty() {
            None
        } else {
            Some(&self.path_info)
        }
    }

    /// Location to redirect to instead of invoking a handler.
    pub fn redirect_path(&self) -> Option<&str> {
        if self.redirect_path.is_empty() {
            None
        } else {
            Some(&self.redirect_path)
        }
    }

    pub fn match_type(&self) -> Option<MatchType> {
        self.match_type
    }

    /// Every deployed version when the application has more than one.
    pub fn applications_for_version_choice(&self) -> &[T::Application] {
        &self.applications_for_version_choice
    }

    /// The application was found but is paused, so no handler was mapped.
    pub fn is_paused(&self) -> bool {
        self.application_version
            .as_ref()
            .is_some_and(|v| v.is_paused())
    }

    pub(crate) fn set_handler(
        &mut self,
        handle: &T::Handler,
        match_type: MatchType,
        handler_path: &str,
        path_info: &str,
    ) {
        self.handler = Some(handle.clone());
        self.match_type = Some(match_type);
        self.handler_path.clear();
        self.handler_path.push_str(handler_path);
        self.path_info.clear();
        self.path_info.push_str(path_info);
    }

    pub(crate) fn set_redirect(&mut self, parts: &[&str]) {
        self.handler = None;
        self.match_type = None;
        self.redirect_path.clear();
        for part in parts {
            self.redirect_path.push_str(part);
        }
    }
}

impl<T: Handles> Default for RoutingResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Handles> fmt::Debug for RoutingResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingResult")
            .field("has_host", &self.host.is_some())
            .field("application_path", &self.application_path)
            .field(
                "version",
                &self.application_version.as_ref().map(|v| v.version()),
            )
            .field("has_handler", &self.handler.is_some())
            .field("request_path", &self.request_path)
            .field("handler_path", &self.handler_path)
            .field("path_info", &self.path_info)
            .field("redirect_path", &self.redirect_path)
            .field("match_type", &self.match_type)
            .finish()
    }
}

/// Pool of recyclable results shared by request handlers.
pub struct RoutingResultPool<T: Handles> {
    idle: Mutex<Vec<RoutingResult<T>>>,
    max_idle: usize,
}

impl<T: Handles> RoutingResultPool<T> {
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
        }
    }

    /// Take a clean result; it goes back to the pool when the guard drops.
    pub fn acquire(&self) -> PooledResult<'_, T> {
        let result = self.idle.lock().pop().unwrap_or_default();
        PooledResult { result, pool: self }
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    fn release(&self, mut result: RoutingResult<T>) {
        result.recycle();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(result);
        }
    }
}

/// A RAII guard that recycles its result into the pool on drop.
pub struct PooledResult<'a, T: Handles> {
    result: RoutingResult<T>,
    pool: &'a RoutingResultPool<T>,
}

impl<T: Handles> Deref for PooledResult<'_, T> {
    type Target = RoutingResult<T>;

    fn deref(&self) -> &Self::Target {
        &self.result
    }
}

impl<T: Handles> DerefMut for PooledResult<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.result
    }
}

impl<T: Handles> Drop for PooledResult<'_, T> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestHandles;

    impl Handles for TestHandles {
        type Host = &'static str;
        type Application = u32;
        type Handler = &'static str;
    }

    #[test]
    fn test_recycle_clears_fields() {
        let mut result = RoutingResult::<TestHandles>::new();
        result.host = Some("a.com");
        result.application = Some(1);
        result.application_path.push_str("/store");
        result.set_handler(&"h1", MatchType::Wildcard, "/items", "/42");
        result.applications_for_version_choice.push(1);

        result.recycle();
        assert!(result.host().is_none());
        assert!(result.application().is_none());
        assert!(result.handler().is_none());
        assert!(result.match_type().is_none());
        assert!(result.path_info().is_none());
        assert_eq!(result.handler_path(), "");
        assert!(result.applications_for_version_choice().is_empty());
    }

    #[test]
    fn test_redirect_clears_handler() {
        let mut result = RoutingResult::<TestHandles>::new();
        result.set_handler(&"h1", MatchType::Default, "/docs", "");
        result.set_redirect(&["/store", "/docs", "/"]);
        assert!(result.handler().is_none());
        assert_eq!(result.redirect_path(), Some("/store/docs/"));
    }

    #[test]
    fn test_pool_returns_clean_results() {
        let pool = RoutingResultPool::<TestHandles>::new(2);
        {
            let mut result = pool.acquire();
            result.handler = Some("h1");
            result.redirect_path.push_str("/x/");
        }
        assert_eq!(pool.idle_count(), 1);

        let result = pool.acquire();
        assert_eq!(pool.idle_count(), 0);
        assert!(result.handler().is_none());
        assert!(result.redirect_path().is_none());
    }

    #[test]
    fn test_pool_caps_idle_results() {
        let pool = RoutingResultPool::<TestHandles>::new(1);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_pool_releases_on_panic() {
        let pool = RoutingResultPool::<TestHandles>::new(4);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut result = pool.acquire();
            result.handler = Some("h1");
            panic!("handler failed");
        }));
        assert!(outcome.is_err());
        assert_eq!(pool.idle_count(), 1);
        assert!(pool.acquire().handler().is_none());
    }
}
