//! Mapping tree: hosts → applications → versions → handlers.
//!
//! Hosts and application lists are immutable snapshots. An
//! [`ApplicationVersion`] is shared (`Arc`) between its application entry and
//! the table's side index, so its handler tables and welcome files are
//! individually swappable cells instead of plain fields.

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::Mutex;

use crate::mapper::entry::{self, Entry};
use crate::mapper::pattern::{slash_count, HandlerPattern};
use crate::mapper::resource::ResourceRoot;

/// The opaque handle types a routing table stores.
///
/// Handles are cloned into every [`RoutingResult`](crate::mapper::RoutingResult),
/// so they should be cheap to clone (`Arc`s, ids, small enums).
pub trait Handles: Send + Sync + 'static {
    type Host: Clone + PartialEq + Send + Sync + 'static;
    type Application: Clone + Eq + Hash + Send + Sync + 'static;
    type Handler: Clone + PartialEq + Send + Sync + 'static;
}

/// A handler bound to one pattern fragment.
pub struct HandlerEntry<T: Handles> {
    pub(crate) name: String,
    pub(crate) handle: T::Handler,
    pub(crate) resource_only: bool,
}

impl<T: Handles> HandlerEntry<T> {
    pub fn handle(&self) -> &T::Handler {
        &self.handle
    }

    /// The handler only makes sense when a physical resource backs the request.
    pub fn is_resource_only(&self) -> bool {
        self.resource_only
    }
}

impl<T: Handles> Clone for HandlerEntry<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handle: self.handle.clone(),
            resource_only: self.resource_only,
        }
    }
}

impl<T: Handles> Entry for HandlerEntry<T> {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A handler to register together with an application, or in a batch.
pub struct HandlerRegistration<T: Handles> {
    pub pattern: String,
    pub handle: T::Handler,
    pub resource_only: bool,
}

impl<T: Handles> HandlerRegistration<T> {
    pub fn new(pattern: impl Into<String>, handle: T::Handler) -> Self {
        Self {
            pattern: pattern.into(),
            handle,
            resource_only: false,
        }
    }

    pub fn resource_only(mut self, resource_only: bool) -> Self {
        self.resource_only = resource_only;
        self
    }
}

/// Everything needed to register one application version.
pub struct ApplicationDeployment<T: Handles> {
    pub path: String,
    pub version: String,
    pub handle: T::Application,
    pub welcome_files: Vec<String>,
    pub resource_root: Option<Arc<dyn ResourceRoot>>,
    pub handlers: Vec<HandlerRegistration<T>>,
}

impl<T: Handles> ApplicationDeployment<T> {
    pub fn new(
        path: impl Into<String>,
        version: impl Into<String>,
        handle: T::Application,
    ) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
            handle,
            welcome_files: Vec::new(),
            resource_root: None,
            handlers: Vec::new(),
        }
    }

    pub fn with_welcome_files(mut self, files: Vec<String>) -> Self {
        self.welcome_files = files;
        self
    }

    pub fn with_resource_root(mut self, root: Arc<dyn ResourceRoot>) -> Self {
        self.resource_root = Some(root);
        self
    }

    pub fn with_handler(mut self, registration: HandlerRegistration<T>) -> Self {
        self.handlers.push(registration);
        self
    }
}

/// One deployed version of an application.
pub struct ApplicationVersion<T: Handles> {
    pub(crate) version: String,
    pub(crate) path: String,
    pub(crate) slash_count: usize,
    pub(crate) handle: T::Application,
    pub(crate) resource_root: Option<Arc<dyn ResourceRoot>>,
    pub(crate) welcome_files: ArcSwap<Vec<String>>,
    pub(crate) exact: ArcSwap<Vec<HandlerEntry<T>>>,
    pub(crate) wildcard: ArcSwap<Vec<HandlerEntry<T>>>,
    pub(crate) extension: ArcSwap<Vec<HandlerEntry<T>>>,
    pub(crate) default_handler: ArcSwapOption<HandlerEntry<T>>,
    pub(crate) nesting: AtomicUsize,
    pub(crate) paused: AtomicBool,
}

impl<T: Handles> ApplicationVersion<T> {
    pub(crate) fn new(
        path: String,
        version: String,
        handle: T::Application,
        welcome_files: Vec<String>,
        resource_root: Option<Arc<dyn ResourceRoot>>,
    ) -> Self {
        Self {
            slash_count: slash_count(&path),
            version,
            path,
            handle,
            resource_root,
            welcome_files: ArcSwap::from_pointee(welcome_files),
            exact: ArcSwap::from_pointee(Vec::new()),
            wildcard: ArcSwap::from_pointee(Vec::new()),
            extension: ArcSwap::from_pointee(Vec::new()),
            default_handler: ArcSwapOption::empty(),
            nesting: AtomicUsize::new(0),
            paused: AtomicBool::new(false),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn slash_count(&self) -> usize {
        self.slash_count
    }

    pub fn handle(&self) -> &T::Application {
        &self.handle
    }

    pub fn resource_root(&self) -> Option<&Arc<dyn ResourceRoot>> {
        self.resource_root.as_ref()
    }

    pub fn welcome_files(&self) -> Arc<Vec<String>> {
        self.welcome_files.load_full()
    }

    /// Deepest wildcard pattern, in slashes.
    pub fn nesting(&self) -> usize {
        self.nesting.load(Ordering::Relaxed)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Registered patterns, rebuilt into their original spelling.
    pub fn patterns(&self) -> Vec<String> {
        let mut patterns = Vec::new();
        for e in self.exact.load().iter() {
            patterns.push(e.name.clone());
        }
        for e in self.wildcard.load().iter() {
            patterns.push(format!("{}/*", e.name));
        }
        for e in self.extension.load().iter() {
            patterns.push(format!("*.{}", e.name));
        }
        if self.default_handler.load().is_some() {
            patterns.push("/".to_string());
        }
        patterns
    }

    /// Writers must hold the owning host's lock.
    pub(crate) fn add_handler(
        &self,
        pattern: HandlerPattern<'_>,
        handle: T::Handler,
        resource_only: bool,
    ) -> bool {
        let table = match pattern {
            HandlerPattern::Default => {
                let current = self.default_handler.load();
                return match current.as_deref() {
                    Some(existing) => existing.handle == handle,
                    None => {
                        self.default_handler.store(Some(Arc::new(HandlerEntry {
                            name: String::new(),
                            handle,
                            resource_only,
                        })));
                        true
                    }
                };
            }
            HandlerPattern::Exact(_) => &self.exact,
            HandlerPattern::Wildcard(_) => &self.wildcard,
            HandlerPattern::Extension(_) => &self.extension,
        };
        let name = pattern_name(pattern);

        let current = table.load();
        if let Some(existing) = entry::exact_find(&current, name) {
            return existing.handle == handle;
        }
        let added = HandlerEntry {
            name: name.to_string(),
            handle,
            resource_only,
        };
        if let Some(updated) = entry::insert(&current, added) {
            table.store(Arc::new(updated));
        }
        if let HandlerPattern::Wildcard(prefix) = pattern {
            self.nesting.fetch_max(slash_count(prefix), Ordering::Relaxed);
        }
        true
    }

    /// Writers must hold the owning host's lock.
    pub(crate) fn remove_handler(&self, pattern: HandlerPattern<'_>) -> bool {
        let table = match pattern {
            HandlerPattern::Default => return self.default_handler.swap(None).is_some(),
            HandlerPattern::Exact(_) => &self.exact,
            HandlerPattern::Wildcard(_) => &self.wildcard,
            HandlerPattern::Extension(_) => &self.extension,
        };

        let current = table.load();
        let Some(updated) = entry::remove(&current, pattern_name(pattern)) else {
            return false;
        };
        if let HandlerPattern::Wildcard(_) = pattern {
            let nesting = updated.iter().map(|e| slash_count(&e.name)).max().unwrap_or(0);
            self.nesting.store(nesting, Ordering::Relaxed);
        }
        table.store(Arc::new(updated));
        true
    }
}

impl<T: Handles> Entry for ApplicationVersion<T> {
    fn name(&self) -> &str {
        &self.version
    }
}

fn pattern_name<'a>(pattern: HandlerPattern<'a>) -> &'a str {
    match pattern {
        HandlerPattern::Exact(name)
        | HandlerPattern::Wildcard(name)
        | HandlerPattern::Extension(name) => name,
        HandlerPattern::Default => "",
    }
}

/// All versions deployed under one application path.
pub struct ApplicationEntry<T: Handles> {
    pub(crate) path: String,
    pub(crate) versions: Arc<Vec<Arc<ApplicationVersion<T>>>>,
}

impl<T: Handles> ApplicationEntry<T> {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Versions sorted by version name; never empty while registered.
    pub fn versions(&self) -> &[Arc<ApplicationVersion<T>>] {
        &self.versions
    }

    /// Copy with `version` inserted or replacing the one of the same name.
    pub(crate) fn with_version(&self, version: Arc<ApplicationVersion<T>>) -> Self {
        Self {
            path: self.path.clone(),
            versions: Arc::new(entry::upsert(&self.versions, version)),
        }
    }

    /// Copy without `version`; `None` if the version was not registered.
    pub(crate) fn without_version(&self, version: &str) -> Option<Self> {
        let versions = entry::remove(&self.versions, version)?;
        Some(Self {
            path: self.path.clone(),
            versions: Arc::new(versions),
        })
    }
}

impl<T: Handles> Clone for ApplicationEntry<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            versions: Arc::clone(&self.versions),
        }
    }
}

impl<T: Handles> Entry for ApplicationEntry<T> {
    fn name(&self) -> &str {
        &self.path
    }
}

/// Immutable snapshot of every application deployed on a host.
pub struct ApplicationList<T: Handles> {
    pub(crate) applications: Vec<ApplicationEntry<T>>,
    pub(crate) nesting_depth: usize,
    pub(crate) default_index: Option<usize>,
}

impl<T: Handles> ApplicationList<T> {
    pub(crate) fn new(applications: Vec<ApplicationEntry<T>>) -> Self {
        let nesting_depth = applications
            .iter()
            .map(|a| slash_count(&a.path))
            .max()
            .unwrap_or(0);
        let default_index = entry::find(&applications, "").ok();
        Self {
            applications,
            nesting_depth,
            default_index,
        }
    }

    pub(crate) fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn applications(&self) -> &[ApplicationEntry<T>] {
        &self.applications
    }

    pub fn nesting_depth(&self) -> usize {
        self.nesting_depth
    }

    /// The root (`""`) application, if one is deployed.
    pub fn default_application(&self) -> Option<&ApplicationEntry<T>> {
        self.default_index.map(|i| &self.applications[i])
    }

    /// Longest application path that is `path` itself or a `/`-bounded prefix
    /// of it, falling back to the root application.
    pub fn resolve(&self, path: &str) -> Option<&ApplicationEntry<T>> {
        let mut end = crate::mapper::pattern::nth_slash(path, self.nesting_depth + 1);
        while end > 0 {
            if let Some(application) = entry::exact_find(&self.applications, &path[..end]) {
                return Some(application);
            }
            end = path[..end].rfind('/').unwrap_or(0);
        }
        self.default_application()
    }
}

/// State shared by a real host and all of its aliases.
pub(crate) struct RealHost<T: Handles> {
    pub(crate) name: String,
    pub(crate) handle: T::Host,
    pub(crate) applications: ArcSwap<ApplicationList<T>>,
    pub(crate) aliases: ArcSwap<Vec<String>>,
    /// Serialises application and handler changes on this host.
    pub(crate) lock: Mutex<()>,
}

/// A virtual host, or an alias pointing at one.
pub struct HostEntry<T: Handles> {
    pub(crate) name: String,
    pub(crate) real: Arc<RealHost<T>>,
}

impl<T: Handles> HostEntry<T> {
    pub(crate) fn new_real(name: String, handle: T::Host) -> Self {
        let real = Arc::new(RealHost {
            name: name.clone(),
            handle,
            applications: ArcSwap::from_pointee(ApplicationList::empty()),
            aliases: ArcSwap::from_pointee(Vec::new()),
            lock: Mutex::new(()),
        });
        Self { name, real }
    }

    pub(crate) fn new_alias(name: String, real: &Arc<RealHost<T>>) -> Self {
        Self {
            name,
            real: Arc::clone(real),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_alias(&self) -> bool {
        self.name != self.real.name
    }

    /// Name of the host this entry resolves to (itself for a real host).
    pub fn real_name(&self) -> &str {
        &self.real.name
    }

    pub fn handle(&self) -> &T::Host {
        &self.real.handle
    }

    pub fn aliases(&self) -> Arc<Vec<String>> {
        self.real.aliases.load_full()
    }

    pub fn applications(&self) -> Arc<ApplicationList<T>> {
        self.real.applications.load_full()
    }

    pub(crate) fn shares_real(&self, other: &Arc<RealHost<T>>) -> bool {
        Arc::ptr_eq(&self.real, other)
    }
}

impl<T: Handles> Entry for HostEntry<T> {
    fn name(&self) -> &str {
        &self.name
    }
}
