//! Request mapping.
//!
//! # Data Flow
//! ```text
//! (host, path, version?)
//!     → host:        exact (case-insensitive) → wildcard domain → default host
//!     → application: longest `/`-bounded path prefix → root application
//!     → version:     requested token → last registered
//!     → handler:     exact → wildcard → context-root redirect → extension
//!                    → welcome files → default → directory redirect
//! ```
//!
//! Nothing here allocates once the result's buffers are warm, and nothing
//! takes a lock.

use std::sync::Arc;

use crate::mapper::entry::{self, Entry};
use crate::mapper::error::{MapperError, MapperResult};
use crate::mapper::model::{ApplicationVersion, Handles, HandlerEntry, HostEntry};
use crate::mapper::pattern::validate_request_path;
use crate::mapper::result::{MatchType, RoutingResult};
use crate::mapper::table::RoutingTable;

impl<T: Handles> RoutingTable<T> {
    /// Map an inbound request into `result`.
    ///
    /// `result` is recycled first. A request that maps to nothing leaves the
    /// handler unset; only malformed input is an error.
    pub fn lookup(
        &self,
        host: &str,
        path: &str,
        version: Option<&str>,
        result: &mut RoutingResult<T>,
    ) -> MapperResult<()> {
        result.recycle();
        let host = host.strip_prefix('*').unwrap_or(host);
        if host.is_empty() {
            return Err(MapperError::EmptyHostName);
        }
        validate_request_path(path)?;

        let hosts = self.hosts.load();
        let Some(host_entry) = self.resolve_host(&hosts, host) else {
            return Ok(());
        };
        result.host = Some(host_entry.handle().clone());

        let list = host_entry.real.applications.load();
        let Some(application) = list.resolve(path) else {
            return Ok(());
        };

        let versions = application.versions();
        let Some(last) = versions.last() else {
            return Ok(());
        };
        let selected = match version {
            Some(requested) if versions.len() > 1 => {
                entry::exact_find(versions, requested).unwrap_or(last)
            }
            _ => last,
        };
        if versions.len() > 1 {
            result
                .applications_for_version_choice
                .extend(versions.iter().map(|v| v.handle.clone()));
        }

        let remainder = &path[application.path.len()..];
        self.map_application(selected, remainder, result);
        Ok(())
    }

    /// Map `path` (relative to the application) inside the application
    /// registered under `handle`, skipping host and path resolution.
    pub fn lookup_by_application(
        &self,
        handle: &T::Application,
        path: &str,
        result: &mut RoutingResult<T>,
    ) -> MapperResult<()> {
        result.recycle();
        validate_request_path(path)?;

        let index = self.by_application.load();
        let Some(application) = index.get(handle) else {
            return Ok(());
        };
        self.map_application(application, path, result);
        Ok(())
    }

    fn resolve_host<'a>(
        &self,
        hosts: &'a [Arc<HostEntry<T>>],
        host: &str,
    ) -> Option<&'a Arc<HostEntry<T>>> {
        if let Some(found) = entry::exact_find_ignore_case(hosts, host) {
            return Some(found);
        }
        if let Some(dot) = host.find('.') {
            if let Some(found) = entry::exact_find_ignore_case(hosts, &host[dot..]) {
                return Some(found);
            }
        }
        let default_host = self.default_host.load();
        let found = default_host
            .as_deref()
            .and_then(|name| entry::exact_find(hosts, name));
        found
    }

    fn map_application(
        &self,
        application: &Arc<ApplicationVersion<T>>,
        path: &str,
        result: &mut RoutingResult<T>,
    ) {
        result.application = Some(application.handle.clone());
        result.application_version = Some(Arc::clone(application));
        result.application_path.push_str(&application.path);
        result.request_path.push_str(path);

        if !application.is_paused() {
            self.map_handler(application, path, result);
        }
    }

    fn map_handler(
        &self,
        application: &ApplicationVersion<T>,
        path: &str,
        result: &mut RoutingResult<T>,
    ) {
        let exact = application.exact.load();
        if match_exact(&exact, path, result) {
            return;
        }

        let wildcard = application.wildcard.load();
        if match_wildcard(&wildcard, path, result) {
            return;
        }

        if path.is_empty() && self.options.context_root_redirect {
            result.set_redirect(&[&application.path, "/"]);
            return;
        }
        let path = if path.is_empty() { "/" } else { path };

        let extension = application.extension.load();
        if match_extension(&extension, path, true, result) {
            return;
        }

        if path.ends_with('/')
            && self.map_welcome_file(application, path, &exact, &wildcard, &extension, result)
        {
            return;
        }

        let default_handler = application.default_handler.load();
        let Some(default_handler) = default_handler.as_deref() else {
            return;
        };
        if self.options.directory_redirect && !path.ends_with('/') {
            if let Some(root) = &application.resource_root {
                if root.is_directory(path) {
                    result.set_redirect(&[&application.path, path, "/"]);
                    return;
                }
            }
        }
        result.set_handler(&default_handler.handle, MatchType::Default, path, "");
    }

    /// Resolve `path + welcome` for each welcome file, in three passes:
    /// exact/wildcard mappings, then physically present files, then
    /// extension mappings that do not require a resource.
    fn map_welcome_file(
        &self,
        application: &ApplicationVersion<T>,
        path: &str,
        exact: &[HandlerEntry<T>],
        wildcard: &[HandlerEntry<T>],
        extension: &[HandlerEntry<T>],
        result: &mut RoutingResult<T>,
    ) -> bool {
        let welcome_files = application.welcome_files.load();
        if welcome_files.is_empty() {
            return false;
        }
        let mut candidate = std::mem::take(&mut result.scratch);
        let mut matched = false;

        for file in welcome_files.iter() {
            welcome_candidate(&mut candidate, path, file);
            if match_exact(exact, &candidate, result)
                || match_wildcard(wildcard, &candidate, result)
            {
                matched = true;
                break;
            }
        }

        if !matched {
            if let Some(root) = &application.resource_root {
                for file in welcome_files.iter() {
                    welcome_candidate(&mut candidate, path, file);
                    if !root.is_file(&candidate) {
                        continue;
                    }
                    if match_extension(extension, &candidate, true, result) {
                        matched = true;
                        break;
                    }
                    if let Some(default_handler) = application.default_handler.load().as_deref() {
                        let handle = &default_handler.handle;
                        result.set_handler(handle, MatchType::Default, &candidate, "");
                        matched = true;
                        break;
                    }
                }
            }
        }

        if !matched {
            for file in welcome_files.iter() {
                welcome_candidate(&mut candidate, path, file);
                if match_extension(extension, &candidate, false, result) {
                    matched = true;
                    break;
                }
            }
        }

        if matched {
            result.request_path.clear();
            result.request_path.push_str(&candidate);
        }
        result.scratch = candidate;
        matched
    }
}

fn welcome_candidate(candidate: &mut String, path: &str, file: &str) {
    candidate.clear();
    candidate.push_str(path);
    candidate.push_str(file);
}

fn match_exact<T: Handles>(
    entries: &[HandlerEntry<T>],
    path: &str,
    result: &mut RoutingResult<T>,
) -> bool {
    if path.is_empty() || path == "/" {
        if let Some(root) = entry::exact_find(entries, "") {
            result.set_handler(&root.handle, MatchType::ContextRoot, "", "/");
            return true;
        }
        if path.is_empty() {
            return false;
        }
    }
    match entry::exact_find(entries, path) {
        Some(found) => {
            result.set_handler(&found.handle, MatchType::Exact, path, "");
            true
        }
        None => false,
    }
}

/// Every entry is checked; the last match in sorted order wins, which puts
/// `/api/v2` ahead of `/api`.
fn match_wildcard<T: Handles>(
    entries: &[HandlerEntry<T>],
    path: &str,
    result: &mut RoutingResult<T>,
) -> bool {
    let mut matched = None;
    for candidate in entries {
        let prefix = candidate.name();
        let bounded = path.as_bytes().get(prefix.len()).map_or(true, |b| *b == b'/');
        if path.starts_with(prefix) && bounded {
            matched = Some(candidate);
        }
    }
    match matched {
        Some(found) => {
            let prefix = found.name();
            result.set_handler(&found.handle, MatchType::Wildcard, prefix, &path[prefix.len()..]);
            true
        }
        None => false,
    }
}

fn match_extension<T: Handles>(
    entries: &[HandlerEntry<T>],
    path: &str,
    resource_expected: bool,
    result: &mut RoutingResult<T>,
) -> bool {
    let segment = path.rfind('/').map_or(path, |slash| &path[slash + 1..]);
    let Some(dot) = segment.rfind('.') else {
        return false;
    };
    match entry::exact_find(entries, &segment[dot + 1..]) {
        Some(found) if resource_expected || !found.resource_only => {
            result.set_handler(&found.handle, MatchType::Extension, path, "");
            true
        }
        _ => false,
    }
}
