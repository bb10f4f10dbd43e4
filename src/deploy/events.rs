//! Lifecycle events that change the routing table.

use crate::mapper::{ApplicationDeployment, Handles, HandlerRegistration};

/// Coordinates of one deployed application version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionKey {
    pub host: String,
    pub path: String,
    pub version: String,
}

impl VersionKey {
    pub fn new(
        host: impl Into<String>,
        path: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            version: version.into(),
        }
    }
}

/// A container lifecycle change, as seen by the mapper.
pub enum DeploymentEvent<T: Handles> {
    HostAdded {
        name: String,
        aliases: Vec<String>,
        handle: T::Host,
    },
    HostRemoved {
        name: String,
    },
    AliasAdded {
        host: String,
        alias: String,
    },
    AliasRemoved {
        alias: String,
    },
    DefaultHostChanged {
        name: Option<String>,
    },
    ApplicationStarted {
        host: String,
        host_handle: T::Host,
        deployment: ApplicationDeployment<T>,
    },
    ApplicationStopped {
        key: VersionKey,
        handle: T::Application,
    },
    ApplicationPaused {
        key: VersionKey,
    },
    ApplicationResumed {
        key: VersionKey,
    },
    HandlerAdded {
        key: VersionKey,
        registration: HandlerRegistration<T>,
    },
    HandlerRemoved {
        key: VersionKey,
        pattern: String,
    },
    WelcomeFileAdded {
        key: VersionKey,
        file: String,
    },
    WelcomeFileRemoved {
        key: VersionKey,
        file: String,
    },
    WelcomeFilesCleared {
        key: VersionKey,
    },
}

impl<T: Handles> DeploymentEvent<T> {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DeploymentEvent::HostAdded { .. } => "host_added",
            DeploymentEvent::HostRemoved { .. } => "host_removed",
            DeploymentEvent::AliasAdded { .. } => "alias_added",
            DeploymentEvent::AliasRemoved { .. } => "alias_removed",
            DeploymentEvent::DefaultHostChanged { .. } => "default_host_changed",
            DeploymentEvent::ApplicationStarted { .. } => "application_started",
            DeploymentEvent::ApplicationStopped { .. } => "application_stopped",
            DeploymentEvent::ApplicationPaused { .. } => "application_paused",
            DeploymentEvent::ApplicationResumed { .. } => "application_resumed",
            DeploymentEvent::HandlerAdded { .. } => "handler_added",
            DeploymentEvent::HandlerRemoved { .. } => "handler_removed",
            DeploymentEvent::WelcomeFileAdded { .. } => "welcome_file_added",
            DeploymentEvent::WelcomeFileRemoved { .. } => "welcome_file_removed",
            DeploymentEvent::WelcomeFilesCleared { .. } => "welcome_files_cleared",
        }
    }

    /// Host the event targets, for log fields.
    pub fn target(&self) -> String {
        match self {
            DeploymentEvent::HostAdded { name, .. } | DeploymentEvent::HostRemoved { name } => {
                name.clone()
            }
            DeploymentEvent::AliasAdded { alias, .. } | DeploymentEvent::AliasRemoved { alias } => {
                alias.clone()
            }
            DeploymentEvent::DefaultHostChanged { name } => name.clone().unwrap_or_default(),
            DeploymentEvent::ApplicationStarted { host, deployment, .. } => {
                format!("{}{}@{}", host, deployment.path, deployment.version)
            }
            DeploymentEvent::ApplicationStopped { key, .. }
            | DeploymentEvent::ApplicationPaused { key }
            | DeploymentEvent::ApplicationResumed { key }
            | DeploymentEvent::HandlerAdded { key, .. }
            | DeploymentEvent::HandlerRemoved { key, .. }
            | DeploymentEvent::WelcomeFileAdded { key, .. }
            | DeploymentEvent::WelcomeFileRemoved { key, .. }
            | DeploymentEvent::WelcomeFilesCleared { key } => {
                format!("{}{}@{}", key.host, key.path, key.version)
            }
        }
    }
}
