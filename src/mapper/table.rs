//! The routing table and its mutation API.
//!
//! # Locking
//! - Host array changes (hosts, aliases) serialise on the table lock.
//! - Application, handler and welcome-file changes serialise on the lock of
//!   the real host they belong to, so deployments to different hosts never
//!   contend.
//! - A writer needing both locks takes the table lock first.
//! - Lookups take no lock at all. Each level is an `ArcSwap` snapshot loaded
//!   once and scanned to completion.
//!
//! Separate publishes are not linearizable with each other: a lookup running
//! between "add application" and a later "add handler" sees the application
//! without that handler. Handlers passed in [`ApplicationDeployment::handlers`]
//! are published together with their application.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::Mutex;
use serde::Serialize;

use crate::mapper::entry;
use crate::mapper::error::{MapperError, MapperResult};
use crate::mapper::model::{
    ApplicationDeployment, ApplicationEntry, ApplicationList, ApplicationVersion, Handles,
    HandlerRegistration, HostEntry, RealHost,
};
use crate::mapper::pattern::{validate_application_path, HandlerPattern};

/// Table-wide matching options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperOptions {
    /// Redirect `/app` to `/app/` when nothing maps the bare application path.
    pub context_root_redirect: bool,
    /// Redirect directory requests without a trailing `/` instead of serving them.
    pub directory_redirect: bool,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            context_root_redirect: true,
            directory_redirect: true,
        }
    }
}

/// Resolves (host, path, version) to a handler. Shared through `Arc`.
pub struct RoutingTable<T: Handles> {
    pub(crate) hosts: ArcSwap<Vec<Arc<HostEntry<T>>>>,
    pub(crate) default_host: ArcSwapOption<String>,
    /// Application handle → live version, for lookups that skip host/path resolution.
    pub(crate) by_application: ArcSwap<HashMap<T::Application, Arc<ApplicationVersion<T>>>>,
    pub(crate) options: MapperOptions,
    lock: Mutex<()>,
}

/// Canonical host key: lower case, with a single leading `*` dropped.
pub fn canonical_host_name(name: &str) -> MapperResult<String> {
    let name = name.strip_prefix('*').unwrap_or(name);
    if name.is_empty() {
        return Err(MapperError::EmptyHostName);
    }
    Ok(name.to_ascii_lowercase())
}

impl<T: Handles> RoutingTable<T> {
    pub fn new(options: MapperOptions) -> Self {
        Self {
            hosts: ArcSwap::from_pointee(Vec::new()),
            default_host: ArcSwapOption::empty(),
            by_application: ArcSwap::from_pointee(HashMap::new()),
            options,
            lock: Mutex::new(()),
        }
    }

    pub fn options(&self) -> MapperOptions {
        self.options
    }

    /// Current host array, aliases included, sorted by name.
    pub fn hosts(&self) -> Arc<Vec<Arc<HostEntry<T>>>> {
        self.hosts.load_full()
    }

    pub fn host_names(&self) -> Vec<String> {
        self.hosts.load().iter().map(|h| h.name.clone()).collect()
    }

    pub fn default_host(&self) -> Option<String> {
        self.default_host.load().as_deref().cloned()
    }

    /// Host used when a lookup matches no host name. `None` disables the fallback.
    pub fn set_default_host(&self, name: Option<&str>) -> MapperResult<()> {
        let name = name.map(canonical_host_name).transpose()?;
        self.default_host.store(name.map(Arc::new));
        Ok(())
    }

    // --- Hosts ---

    /// Register a host and its aliases.
    ///
    /// Re-registering the same handle is idempotent (new aliases are still
    /// added); a different handle under an existing name is rejected.
    pub fn add_host(&self, name: &str, aliases: &[String], handle: T::Host) -> MapperResult<bool> {
        let name = canonical_host_name(name)?;
        let aliases = aliases
            .iter()
            .map(|a| canonical_host_name(a))
            .collect::<MapperResult<Vec<_>>>()?;

        let _guard = self.lock.lock();
        let current = self.hosts.load_full();
        let (mut hosts, real) = match entry::exact_find(&current, &name) {
            Some(existing) if !existing.is_alias() && existing.real.handle == handle => {
                (current.to_vec(), Arc::clone(&existing.real))
            }
            Some(_) => return Ok(false),
            None => {
                let added = Arc::new(HostEntry::new_real(name, handle));
                let real = Arc::clone(&added.real);
                match entry::insert(&current, added) {
                    Some(hosts) => (hosts, real),
                    None => return Ok(false),
                }
            }
        };

        let mut alias_names = real.aliases.load().to_vec();
        for alias in aliases {
            if entry::exact_find(&hosts, &alias).is_some() {
                continue;
            }
            let added = Arc::new(HostEntry::new_alias(alias.clone(), &real));
            if let Some(updated) = entry::insert(&hosts, added) {
                hosts = updated;
                alias_names.push(alias);
            }
        }

        real.aliases.store(Arc::new(alias_names));
        self.hosts.store(Arc::new(hosts));
        Ok(true)
    }

    /// Remove a real host together with every alias of it.
    pub fn remove_host(&self, name: &str) -> MapperResult<bool> {
        let name = canonical_host_name(name)?;

        let _guard = self.lock.lock();
        let current = self.hosts.load_full();
        let real = match entry::exact_find(&current, &name) {
            Some(host) if !host.is_alias() => Arc::clone(&host.real),
            _ => return Ok(false),
        };

        // Table lock first, then the host lock. Deployments racing with the
        // removal either land before the prune or see the host unpublished.
        let _host_guard = real.lock.lock();
        let hosts: Vec<_> = current
            .iter()
            .filter(|h| !h.shares_real(&real))
            .cloned()
            .collect();
        self.hosts.store(Arc::new(hosts));

        let list = real.applications.load();
        let versions: Vec<_> = list
            .applications
            .iter()
            .flat_map(|a| a.versions.iter())
            .map(|version| (&version.handle, version))
            .collect();
        self.unindex(&versions);
        Ok(true)
    }

    /// Add `alias` for the host registered as `name`.
    ///
    /// Returns `Ok(true)` when the alias already points at that host and
    /// `Ok(false)` when the name belongs to another host.
    pub fn add_host_alias(&self, name: &str, alias: &str) -> MapperResult<bool> {
        let name = canonical_host_name(name)?;
        let alias = canonical_host_name(alias)?;

        let _guard = self.lock.lock();
        let current = self.hosts.load_full();
        let Some(real) = entry::exact_find(&current, &name).map(|h| Arc::clone(&h.real)) else {
            return Ok(false);
        };
        if let Some(existing) = entry::exact_find(&current, &alias) {
            return Ok(existing.shares_real(&real));
        }

        let added = Arc::new(HostEntry::new_alias(alias.clone(), &real));
        let Some(hosts) = entry::insert(&current, added) else {
            return Ok(false);
        };
        let mut alias_names = real.aliases.load().to_vec();
        alias_names.push(alias);
        real.aliases.store(Arc::new(alias_names));
        self.hosts.store(Arc::new(hosts));
        Ok(true)
    }

    pub fn remove_host_alias(&self, alias: &str) -> MapperResult<bool> {
        let alias = canonical_host_name(alias)?;

        let _guard = self.lock.lock();
        let current = self.hosts.load_full();
        let real = match entry::exact_find(&current, &alias) {
            Some(host) if host.is_alias() => Arc::clone(&host.real),
            _ => return Ok(false),
        };
        let Some(hosts) = entry::remove(&current, &alias) else {
            return Ok(false);
        };

        let alias_names: Vec<String> = real
            .aliases
            .load()
            .iter()
            .filter(|a| **a != alias)
            .cloned()
            .collect();
        real.aliases.store(Arc::new(alias_names));
        self.hosts.store(Arc::new(hosts));
        Ok(true)
    }

    // --- Applications ---

    /// Deploy one application version, creating the host if needed.
    ///
    /// A version already registered under the same (path, version) is
    /// replaced. The deployment's handlers are published together with it.
    pub fn add_application_version(
        &self,
        host_name: &str,
        host_handle: T::Host,
        deployment: ApplicationDeployment<T>,
    ) -> MapperResult<bool> {
        validate_application_path(&deployment.path)?;
        let name = canonical_host_name(host_name)?;
        let ApplicationDeployment {
            path,
            version,
            handle,
            welcome_files,
            resource_root,
            handlers,
        } = deployment;
        let added = Arc::new(ApplicationVersion::new(
            path.clone(),
            version,
            handle.clone(),
            welcome_files,
            resource_root,
        ));
        for registration in handlers {
            let pattern = HandlerPattern::parse(&registration.pattern)?;
            added.add_handler(pattern, registration.handle, registration.resource_only);
        }

        loop {
            let Some(real) = self.real_host_or_create(&name, host_handle.clone())? else {
                return Ok(false);
            };
            let _guard = real.lock.lock();
            // A concurrent remove_host may have unpublished the host; start over.
            if !self.is_published(&name, &real) {
                continue;
            }

            let list = real.applications.load_full();
            let (application, replaced) = match entry::exact_find(&list.applications, &path) {
                Some(existing) => {
                    let replaced = entry::exact_find(&existing.versions, &added.version).cloned();
                    (existing.with_version(Arc::clone(&added)), replaced)
                }
                None => (
                    ApplicationEntry {
                        path: path.clone(),
                        versions: Arc::new(vec![Arc::clone(&added)]),
                    },
                    None,
                ),
            };
            let applications = entry::upsert(&list.applications, application);
            real.applications.store(Arc::new(ApplicationList::new(applications)));

            self.by_application.rcu(|index| {
                let mut index = HashMap::clone(index);
                if let Some(replaced) = &replaced {
                    if replaced.handle != handle {
                        index.remove(&replaced.handle);
                    }
                }
                index.insert(handle.clone(), Arc::clone(&added));
                index
            });
            return Ok(true);
        }
    }

    /// Undeploy one version; the application disappears with its last version.
    ///
    /// The side index forgets `handle` only if it still points at the
    /// version that was removed.
    pub fn remove_application_version(
        &self,
        handle: &T::Application,
        host_name: &str,
        path: &str,
        version: &str,
    ) -> MapperResult<bool> {
        validate_application_path(path)?;
        let Some(real) = self.real_host(host_name)? else {
            return Ok(false);
        };
        let _guard = real.lock.lock();
        let list = real.applications.load_full();
        let Some(application) = entry::exact_find(&list.applications, path) else {
            return Ok(false);
        };
        let Some(removed) = entry::exact_find(&application.versions, version).cloned() else {
            return Ok(false);
        };
        let Some(remaining) = application.without_version(version) else {
            return Ok(false);
        };

        let applications = if remaining.versions.is_empty() {
            entry::remove(&list.applications, path).unwrap_or_default()
        } else {
            entry::upsert(&list.applications, remaining)
        };
        real.applications.store(Arc::new(ApplicationList::new(applications)));
        self.unindex(&[(handle, &removed), (&removed.handle, &removed)]);
        Ok(true)
    }

    /// Stop mapping requests to a version without undeploying it.
    pub fn pause_application_version(
        &self,
        host_name: &str,
        path: &str,
        version: &str,
    ) -> MapperResult<bool> {
        self.set_paused(host_name, path, version, true)
    }

    pub fn resume_application_version(
        &self,
        host_name: &str,
        path: &str,
        version: &str,
    ) -> MapperResult<bool> {
        self.set_paused(host_name, path, version, false)
    }

    fn set_paused(
        &self,
        host_name: &str,
        path: &str,
        version: &str,
        paused: bool,
    ) -> MapperResult<bool> {
        let Some((real, application)) = self.find_version(host_name, path, version)? else {
            return Ok(false);
        };
        let _guard = real.lock.lock();
        application.set_paused(paused);
        Ok(true)
    }

    // --- Handlers ---

    pub fn add_handler(
        &self,
        host_name: &str,
        path: &str,
        version: &str,
        pattern: &str,
        handle: T::Handler,
        resource_only: bool,
    ) -> MapperResult<bool> {
        let pattern = HandlerPattern::parse(pattern)?;
        let Some((real, application)) = self.find_version(host_name, path, version)? else {
            return Ok(false);
        };
        let _guard = real.lock.lock();
        Ok(application.add_handler(pattern, handle, resource_only))
    }

    /// Register several handlers; returns how many were accepted.
    pub fn add_handlers(
        &self,
        host_name: &str,
        path: &str,
        version: &str,
        registrations: Vec<HandlerRegistration<T>>,
    ) -> MapperResult<usize> {
        let patterns = registrations
            .iter()
            .map(|r| HandlerPattern::parse(&r.pattern))
            .collect::<MapperResult<Vec<_>>>()?;
        let Some((real, application)) = self.find_version(host_name, path, version)? else {
            return Ok(0);
        };

        let _guard = real.lock.lock();
        let mut accepted = 0;
        for (pattern, registration) in patterns.into_iter().zip(registrations.iter()) {
            let handle = registration.handle.clone();
            if application.add_handler(pattern, handle, registration.resource_only) {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    pub fn remove_handler(
        &self,
        host_name: &str,
        path: &str,
        version: &str,
        pattern: &str,
    ) -> MapperResult<bool> {
        let pattern = HandlerPattern::parse(pattern)?;
        let Some((real, application)) = self.find_version(host_name, path, version)? else {
            return Ok(false);
        };
        let _guard = real.lock.lock();
        Ok(application.remove_handler(pattern))
    }

    // --- Welcome files ---

    pub fn add_welcome_file(
        &self,
        host_name: &str,
        path: &str,
        version: &str,
        file: &str,
    ) -> MapperResult<bool> {
        self.update_welcome_files(host_name, path, version, |files| {
            files.push(file.to_string());
            true
        })
    }

    pub fn remove_welcome_file(
        &self,
        host_name: &str,
        path: &str,
        version: &str,
        file: &str,
    ) -> MapperResult<bool> {
        self.update_welcome_files(host_name, path, version, |files| {
            match files.iter().position(|f| f == file) {
                Some(pos) => {
                    files.remove(pos);
                    true
                }
                None => false,
            }
        })
    }

    pub fn clear_welcome_files(
        &self,
        host_name: &str,
        path: &str,
        version: &str,
    ) -> MapperResult<bool> {
        self.update_welcome_files(host_name, path, version, |files| {
            files.clear();
            true
        })
    }

    fn update_welcome_files(
        &self,
        host_name: &str,
        path: &str,
        version: &str,
        update: impl FnOnce(&mut Vec<String>) -> bool,
    ) -> MapperResult<bool> {
        let Some((real, application)) = self.find_version(host_name, path, version)? else {
            return Ok(false);
        };
        let _guard = real.lock.lock();
        let mut files = application.welcome_files.load().to_vec();
        if !update(&mut files) {
            return Ok(false);
        }
        application.welcome_files.store(Arc::new(files));
        Ok(true)
    }

    // --- Resolution helpers ---

    fn real_host(&self, host_name: &str) -> MapperResult<Option<Arc<RealHost<T>>>> {
        let name = canonical_host_name(host_name)?;
        let hosts = self.hosts.load();
        Ok(entry::exact_find(&hosts, &name).map(|h| Arc::clone(&h.real)))
    }

    fn real_host_or_create(
        &self,
        host_name: &str,
        handle: T::Host,
    ) -> MapperResult<Option<Arc<RealHost<T>>>> {
        if let Some(real) = self.real_host(host_name)? {
            return Ok(Some(real));
        }
        self.add_host(host_name, &[], handle)?;
        self.real_host(host_name)
    }

    /// Whether `real` is still the host published under `name`.
    fn is_published(&self, name: &str, real: &Arc<RealHost<T>>) -> bool {
        entry::exact_find(&self.hosts.load(), name).is_some_and(|h| h.shares_real(real))
    }

    /// Drop index entries that still point at the given versions.
    fn unindex(&self, versions: &[(&T::Application, &Arc<ApplicationVersion<T>>)]) {
        self.by_application.rcu(|index| {
            let mut index = HashMap::clone(index);
            for (handle, version) in versions {
                if index.get(*handle).is_some_and(|live| Arc::ptr_eq(live, *version)) {
                    index.remove(*handle);
                }
            }
            index
        });
    }

    /// The registered version for (host, path, version) and the host owning it.
    pub(crate) fn find_version(
        &self,
        host_name: &str,
        path: &str,
        version: &str,
    ) -> MapperResult<Option<(Arc<RealHost<T>>, Arc<ApplicationVersion<T>>)>> {
        validate_application_path(path)?;
        let Some(real) = self.real_host(host_name)? else {
            return Ok(None);
        };
        let list = real.applications.load();
        let found = entry::exact_find(&list.applications, path)
            .and_then(|a| entry::exact_find(&a.versions, version))
            .cloned();
        Ok(found.map(|application| (Arc::clone(&real), application)))
    }

    /// Serialisable view of the whole table.
    pub fn snapshot(&self) -> Vec<HostSnapshot> {
        self.hosts
            .load()
            .iter()
            .filter(|h| !h.is_alias())
            .map(|host| {
                let list = host.real.applications.load();
                HostSnapshot {
                    name: host.name.clone(),
                    aliases: host.real.aliases.load().to_vec(),
                    applications: list
                        .applications
                        .iter()
                        .map(|a| ApplicationSnapshot {
                            path: a.path.clone(),
                            versions: a
                                .versions
                                .iter()
                                .map(|v| VersionSnapshot {
                                    version: v.version.clone(),
                                    paused: v.is_paused(),
                                    welcome_files: v.welcome_files.load().to_vec(),
                                    patterns: v.patterns(),
                                })
                                .collect(),
                        })
                        .collect(),
                }
            })
            .collect()
    }

    /// Patterns registered on one version, or `None` if it is not deployed.
    pub fn handler_patterns(
        &self,
        host_name: &str,
        path: &str,
        version: &str,
    ) -> MapperResult<Option<Vec<String>>> {
        Ok(self
            .find_version(host_name, path, version)?
            .map(|(_, application)| application.patterns()))
    }
}

impl<T: Handles> Default for RoutingTable<T> {
    fn default() -> Self {
        Self::new(MapperOptions::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostSnapshot {
    pub name: String,
    pub aliases: Vec<String>,
    pub applications: Vec<ApplicationSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationSnapshot {
    pub path: String,
    pub versions: Vec<VersionSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSnapshot {
    pub version: String,
    pub paused: bool,
    pub welcome_files: Vec<String>,
    pub patterns: Vec<String>,
}
