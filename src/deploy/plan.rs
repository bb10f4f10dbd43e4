//! Turns configurations into deployment events.
//!
//! [`initial`] deploys a configuration onto an empty table; [`diff`] yields
//! the smallest event sequence moving a table from one configuration to the
//! next, so a reload never rebuilds hosts that did not change.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::schema::{ApplicationConfig, HandlerConfig, HostConfig, ServerConfig};
use crate::deploy::events::{DeploymentEvent, VersionKey};
use crate::http::endpoint::{ApplicationId, Endpoint, ServerHandles};
use crate::mapper::{
    canonical_host_name, ApplicationDeployment, FsResourceRoot, HandlerRegistration,
};

pub type ServerEvent = DeploymentEvent<ServerHandles>;

/// Events deploying `config` onto an empty table.
pub fn initial(config: &ServerConfig) -> Vec<ServerEvent> {
    diff(&ServerConfig::default(), config)
}

/// Events moving a table deployed from `old` to `new`.
pub fn diff(old: &ServerConfig, new: &ServerConfig) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    let old_hosts = hosts_by_name(old);
    let new_hosts = hosts_by_name(new);

    // Every name is released before any is claimed, so a host or alias can
    // move to another host within one reload.
    for (name, host) in &old_hosts {
        match new_hosts.get(name) {
            None => events.push(DeploymentEvent::HostRemoved { name: name.clone() }),
            Some(next) => {
                for alias in host.aliases.iter().filter(|a| !next.aliases.contains(a)) {
                    events.push(DeploymentEvent::AliasRemoved { alias: alias.clone() });
                }
            }
        }
    }

    for (name, host) in &new_hosts {
        match old_hosts.get(name) {
            None => {
                events.push(DeploymentEvent::HostAdded {
                    name: name.clone(),
                    aliases: host.aliases.clone(),
                    handle: Arc::from(name.as_str()),
                });
                for application in &host.applications {
                    start_application(&mut events, name, application);
                }
            }
            Some(previous) => diff_host(&mut events, name, previous, host),
        }
    }

    if old.mapper.default_host != new.mapper.default_host {
        events.push(DeploymentEvent::DefaultHostChanged {
            name: new.mapper.default_host.clone(),
        });
    }
    events
}

fn hosts_by_name(config: &ServerConfig) -> BTreeMap<String, &HostConfig> {
    config
        .hosts
        .iter()
        .filter_map(|host| canonical_host_name(&host.name).ok().map(|name| (name, host)))
        .collect()
}

fn versions_by_key(host: &HostConfig) -> BTreeMap<(&str, &str), &ApplicationConfig> {
    host.applications
        .iter()
        .map(|a| ((a.path.as_str(), a.version.as_str()), a))
        .collect()
}

fn diff_host(events: &mut Vec<ServerEvent>, name: &str, old: &HostConfig, new: &HostConfig) {
    for alias in &new.aliases {
        if !old.aliases.contains(alias) {
            events.push(DeploymentEvent::AliasAdded {
                host: name.to_string(),
                alias: alias.clone(),
            });
        }
    }

    let old_versions = versions_by_key(old);
    let new_versions = versions_by_key(new);

    for (path, version) in old_versions.keys() {
        if !new_versions.contains_key(&(*path, *version)) {
            events.push(DeploymentEvent::ApplicationStopped {
                key: VersionKey::new(name, *path, *version),
                handle: ApplicationId::new(name, path, version),
            });
        }
    }

    for (key, application) in &new_versions {
        match old_versions.get(key) {
            None => start_application(events, name, application),
            Some(previous) if *previous == *application => {}
            Some(previous) if previous.resource_root != application.resource_root => {
                start_application(events, name, application);
            }
            Some(previous) => diff_application(events, name, previous, application),
        }
    }
}

fn diff_application(
    events: &mut Vec<ServerEvent>,
    host: &str,
    old: &ApplicationConfig,
    new: &ApplicationConfig,
) {
    let key = || VersionKey::new(host, &new.path, &new.version);

    if old.welcome_files != new.welcome_files {
        events.push(DeploymentEvent::WelcomeFilesCleared { key: key() });
        for file in &new.welcome_files {
            events.push(DeploymentEvent::WelcomeFileAdded {
                key: key(),
                file: file.clone(),
            });
        }
    }

    let old_handlers: BTreeMap<&str, &HandlerConfig> =
        old.handlers.iter().map(|h| (h.pattern.as_str(), h)).collect();
    let new_handlers: BTreeMap<&str, &HandlerConfig> =
        new.handlers.iter().map(|h| (h.pattern.as_str(), h)).collect();

    for (pattern, handler) in &old_handlers {
        if new_handlers.get(pattern) != Some(handler) {
            events.push(DeploymentEvent::HandlerRemoved {
                key: key(),
                pattern: pattern.to_string(),
            });
        }
    }
    for (pattern, handler) in &new_handlers {
        if old_handlers.get(pattern) != Some(handler) {
            events.push(DeploymentEvent::HandlerAdded {
                key: key(),
                registration: registration(handler),
            });
        }
    }

    match (old.paused, new.paused) {
        (false, true) => events.push(DeploymentEvent::ApplicationPaused { key: key() }),
        (true, false) => events.push(DeploymentEvent::ApplicationResumed { key: key() }),
        _ => {}
    }
}

fn start_application(events: &mut Vec<ServerEvent>, host: &str, application: &ApplicationConfig) {
    let mut deployment = ApplicationDeployment::new(
        &application.path,
        &application.version,
        ApplicationId::new(host, &application.path, &application.version),
    )
    .with_welcome_files(application.welcome_files.clone());
    if let Some(root) = &application.resource_root {
        deployment = deployment.with_resource_root(Arc::new(FsResourceRoot::new(root)));
    }
    for handler in &application.handlers {
        deployment = deployment.with_handler(registration(handler));
    }

    events.push(DeploymentEvent::ApplicationStarted {
        host: host.to_string(),
        host_handle: Arc::from(host),
        deployment,
    });
    if application.paused {
        events.push(DeploymentEvent::ApplicationPaused {
            key: VersionKey::new(host, &application.path, &application.version),
        });
    }
}

fn registration(handler: &HandlerConfig) -> HandlerRegistration<ServerHandles> {
    HandlerRegistration::new(&handler.pattern, Endpoint::from_config(handler))
        .resource_only(handler.resource_only)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::EndpointKind;
    use crate::deploy::MapperListener;
    use crate::mapper::RoutingTable;

    fn handler(pattern: &str, kind: EndpointKind) -> HandlerConfig {
        HandlerConfig {
            pattern: pattern.to_string(),
            kind,
            body: Some("body".to_string()),
            content_type: None,
            resource_only: false,
        }
    }

    fn application(path: &str, version: &str, handlers: Vec<HandlerConfig>) -> ApplicationConfig {
        ApplicationConfig {
            path: path.to_string(),
            version: version.to_string(),
            resource_root: None,
            welcome_files: vec!["index.html".to_string()],
            paused: false,
            handlers,
        }
    }

    fn config(hosts: Vec<HostConfig>) -> ServerConfig {
        ServerConfig {
            hosts,
            ..ServerConfig::default()
        }
    }

    fn shop(aliases: &[&str], applications: Vec<ApplicationConfig>) -> HostConfig {
        HostConfig {
            name: "Shop.local".to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            applications,
        }
    }

    fn kinds(events: &[ServerEvent]) -> Vec<&'static str> {
        events.iter().map(|e| e.kind()).collect()
    }

    #[test]
    fn test_initial_deploys_everything() {
        let mut app = application("/store", "", vec![handler("/items/*", EndpointKind::Echo)]);
        app.paused = true;
        let mut config = config(vec![shop(&["www.shop.local"], vec![app])]);
        config.mapper.default_host = Some("shop.local".to_string());

        let events = initial(&config);
        assert_eq!(
            kinds(&events),
            vec![
                "host_added",
                "application_started",
                "application_paused",
                "default_host_changed",
            ]
        );
        match &events[0] {
            DeploymentEvent::HostAdded { name, aliases, .. } => {
                assert_eq!(name, "shop.local");
                assert_eq!(aliases, &vec!["www.shop.local".to_string()]);
            }
            _ => panic!("expected host_added"),
        }
    }

    #[test]
    fn test_unchanged_config_yields_nothing() {
        let config = config(vec![shop(&[], vec![application("/store", "", Vec::new())])]);
        assert!(diff(&config, &config).is_empty());
    }

    #[test]
    fn test_handler_and_alias_changes() {
        let old = config(vec![shop(
            &["old.shop.local"],
            vec![application(
                "/store",
                "",
                vec![
                    handler("/items/*", EndpointKind::Echo),
                    handler("/about", EndpointKind::Text),
                ],
            )],
        )]);
        let new = config(vec![shop(
            &["new.shop.local"],
            vec![application(
                "/store",
                "",
                vec![
                    handler("/items/*", EndpointKind::Text),
                    handler("*.json", EndpointKind::Echo),
                ],
            )],
        )]);

        let events = diff(&old, &new);
        assert_eq!(
            kinds(&events),
            vec![
                "alias_removed",
                "alias_added",
                "handler_removed",
                "handler_removed",
                "handler_added",
                "handler_added",
            ]
        );
    }

    #[test]
    fn test_application_versions_come_and_go() {
        let old = config(vec![shop(&[], vec![application("/store", "1", Vec::new())])]);
        let new = config(vec![shop(&[], vec![application("/store", "2", Vec::new())])]);

        let events = diff(&old, &new);
        assert_eq!(kinds(&events), vec!["application_stopped", "application_started"]);
        match &events[0] {
            DeploymentEvent::ApplicationStopped { key, handle } => {
                assert_eq!(key, &VersionKey::new("shop.local", "/store", "1"));
                assert_eq!(handle, &ApplicationId::new("shop.local", "/store", "1"));
            }
            _ => panic!("expected application_stopped"),
        }
    }

    #[test]
    fn test_incremental_reload_matches_fresh_deploy() {
        let old = config(vec![
            shop(
                &["www.shop.local"],
                vec![
                    application("/store", "", vec![handler("/items/*", EndpointKind::Echo)]),
                    application("/legacy", "", Vec::new()),
                ],
            ),
            HostConfig {
                name: "gone.local".to_string(),
                aliases: Vec::new(),
                applications: vec![application("", "", Vec::new())],
            },
        ]);
        let mut store = application(
            "/store",
            "",
            vec![
                handler("/items/*", EndpointKind::Echo),
                handler("/cart", EndpointKind::Text),
            ],
        );
        store.welcome_files = vec!["index.htm".to_string(), "index.html".to_string()];
        store.paused = true;
        let new = config(vec![shop(
            &["www.shop.local"],
            vec![store, application("/api", "1", vec![handler("/", EndpointKind::Echo)])],
        )]);

        let incremental = listener();
        incremental.apply_all(initial(&old));
        incremental.apply_all(diff(&old, &new));

        let fresh = listener();
        fresh.apply_all(initial(&new));

        assert_eq!(incremental.table().snapshot(), fresh.table().snapshot());
        assert_eq!(incremental.table().host_names(), vec!["shop.local", "www.shop.local"]);
    }

    fn listener() -> MapperListener<ServerHandles> {
        MapperListener::new(Arc::new(RoutingTable::default()))
    }

    fn bare_host(name: &str, aliases: &[&str]) -> HostConfig {
        HostConfig {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            applications: Vec::new(),
        }
    }

    #[test]
    fn test_alias_moves_between_hosts() {
        let old = config(vec![bare_host("a.com", &[]), bare_host("b.com", &["www.x.com"])]);
        let new = config(vec![bare_host("a.com", &["www.x.com"]), bare_host("b.com", &[])]);

        let events = diff(&old, &new);
        assert_eq!(kinds(&events), vec!["alias_removed", "alias_added"]);

        let listener = listener();
        listener.apply_all(initial(&old));
        listener.apply_all(events);
        assert_eq!(listener.table().host_names(), vec!["a.com", "b.com", "www.x.com"]);
        let hosts = listener.table().hosts();
        assert_eq!(hosts[2].real_name(), "a.com");
    }

    #[test]
    fn test_removed_host_name_reused_as_alias() {
        let old = config(vec![bare_host("a.com", &[]), bare_host("www.a.com", &[])]);
        let new = config(vec![bare_host("a.com", &["www.a.com"])]);

        let listener = listener();
        listener.apply_all(initial(&old));
        listener.apply_all(diff(&old, &new));
        let hosts = listener.table().hosts();
        assert_eq!(listener.table().host_names(), vec!["a.com", "www.a.com"]);
        assert!(hosts[1].is_alias());
    }
}
