//! Applies deployment events to a routing table.

use std::sync::Arc;

use crate::deploy::events::DeploymentEvent;
use crate::mapper::{Handles, MapperResult, RoutingTable};
use crate::observability::metrics;

/// Outcome of one applied event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Rejected,
    Invalid,
}

impl EventOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventOutcome::Applied => "applied",
            EventOutcome::Rejected => "rejected",
            EventOutcome::Invalid => "invalid",
        }
    }
}

/// Translates lifecycle events into routing table mutations.
///
/// The table itself stays silent on conflicts; this is where they get
/// logged and counted.
pub struct MapperListener<T: Handles> {
    table: Arc<RoutingTable<T>>,
}

impl<T: Handles> MapperListener<T> {
    pub fn new(table: Arc<RoutingTable<T>>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Arc<RoutingTable<T>> {
        &self.table
    }

    /// Apply one event.
    pub fn apply(&self, event: DeploymentEvent<T>) -> EventOutcome {
        let kind = event.kind();
        let target = event.target();

        let outcome = match self.dispatch(event) {
            Ok(true) => {
                tracing::debug!(event = kind, target = %target, "Deployment event applied");
                EventOutcome::Applied
            }
            Ok(false) => {
                tracing::warn!(
                    event = kind,
                    target = %target,
                    "Deployment event rejected by routing table"
                );
                EventOutcome::Rejected
            }
            Err(e) => {
                tracing::warn!(
                    event = kind,
                    target = %target,
                    error = %e,
                    "Invalid deployment event"
                );
                EventOutcome::Invalid
            }
        };
        metrics::record_deployment_event(kind, outcome.as_str());
        outcome
    }

    /// Apply events in order; returns how many were applied.
    pub fn apply_all(&self, events: impl IntoIterator<Item = DeploymentEvent<T>>) -> usize {
        events
            .into_iter()
            .map(|event| self.apply(event))
            .filter(|outcome| *outcome == EventOutcome::Applied)
            .count()
    }

    fn dispatch(&self, event: DeploymentEvent<T>) -> MapperResult<bool> {
        let table = &self.table;
        match event {
            DeploymentEvent::HostAdded {
                name,
                aliases,
                handle,
            } => table.add_host(&name, &aliases, handle),
            DeploymentEvent::HostRemoved { name } => table.remove_host(&name),
            DeploymentEvent::AliasAdded { host, alias } => table.add_host_alias(&host, &alias),
            DeploymentEvent::AliasRemoved { alias } => table.remove_host_alias(&alias),
            DeploymentEvent::DefaultHostChanged { name } => {
                table.set_default_host(name.as_deref()).map(|_| true)
            }
            DeploymentEvent::ApplicationStarted {
                host,
                host_handle,
                deployment,
            } => table.add_application_version(&host, host_handle, deployment),
            DeploymentEvent::ApplicationStopped { key, handle } => {
                table.remove_application_version(&handle, &key.host, &key.path, &key.version)
            }
            DeploymentEvent::ApplicationPaused { key } => {
                table.pause_application_version(&key.host, &key.path, &key.version)
            }
            DeploymentEvent::ApplicationResumed { key } => {
                table.resume_application_version(&key.host, &key.path, &key.version)
            }
            DeploymentEvent::HandlerAdded { key, registration } => table.add_handler(
                &key.host,
                &key.path,
                &key.version,
                &registration.pattern,
                registration.handle,
                registration.resource_only,
            ),
            DeploymentEvent::HandlerRemoved { key, pattern } => {
                table.remove_handler(&key.host, &key.path, &key.version, &pattern)
            }
            DeploymentEvent::WelcomeFileAdded { key, file } => {
                table.add_welcome_file(&key.host, &key.path, &key.version, &file)
            }
            DeploymentEvent::WelcomeFileRemoved { key, file } => {
                table.remove_welcome_file(&key.host, &key.path, &key.version, &file)
            }
            DeploymentEvent::WelcomeFilesCleared { key } => {
                table.clear_welcome_files(&key.host, &key.path, &key.version)
            }
        }
    }
}
