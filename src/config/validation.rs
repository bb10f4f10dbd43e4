//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check host names, aliases and application paths are unique
//! - Check handler patterns parse and endpoints have what they need
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::{EndpointKind, ServerConfig};
use crate::mapper::pattern::validate_application_path;
use crate::mapper::{canonical_host_name, HandlerPattern};

/// A semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid address for {field}: '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("invalid version header '{0}'")]
    InvalidVersionHeader(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("admin API enabled without an api_key")]
    MissingApiKey,

    #[error("host name must not be empty")]
    EmptyHostName,

    #[error("host name '{0}' is declared more than once")]
    DuplicateHostName(String),

    #[error("default host '{0}' is not declared")]
    UnknownDefaultHost(String),

    #[error("host '{host}': invalid application path '{path}'")]
    InvalidApplicationPath { host: String, path: String },

    #[error("host '{host}': application '{path}' version '{version}' is declared more than once")]
    DuplicateApplication { host: String, path: String, version: String },

    #[error("application '{application}': invalid handler pattern '{pattern}'")]
    InvalidPattern { application: String, pattern: String },

    #[error("application '{application}': pattern '{pattern}' is mapped more than once")]
    DuplicatePattern { application: String, pattern: String },

    #[error("application '{application}': text handler '{pattern}' has no body")]
    MissingBody { application: String, pattern: String },

    #[error("application '{application}': static handler '{pattern}' needs a resource_root")]
    MissingResourceRoot { application: String, pattern: String },
}

/// Check `config`, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if HeaderName::from_bytes(config.listener.version_header.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidVersionHeader(
            config.listener.version_header.clone(),
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingApiKey);
        }
    }

    let mut names = HashSet::new();
    for host in &config.hosts {
        for name in std::iter::once(&host.name).chain(host.aliases.iter()) {
            match canonical_host_name(name) {
                Ok(canonical) => {
                    if !names.insert(canonical.clone()) {
                        errors.push(ValidationError::DuplicateHostName(canonical));
                    }
                }
                Err(_) => errors.push(ValidationError::EmptyHostName),
            }
        }

        let mut applications = HashSet::new();
        for application in &host.applications {
            if validate_application_path(&application.path).is_err() {
                errors.push(ValidationError::InvalidApplicationPath {
                    host: host.name.clone(),
                    path: application.path.clone(),
                });
            }
            if !applications.insert((application.path.as_str(), application.version.as_str())) {
                errors.push(ValidationError::DuplicateApplication {
                    host: host.name.clone(),
                    path: application.path.clone(),
                    version: application.version.clone(),
                });
            }

            let label = format!("{}{}", host.name, application.path);
            let mut patterns = HashSet::new();
            for handler in &application.handlers {
                match HandlerPattern::parse(&handler.pattern) {
                    Ok(pattern) => {
                        if !patterns.insert(pattern) {
                            errors.push(ValidationError::DuplicatePattern {
                                application: label.clone(),
                                pattern: handler.pattern.clone(),
                            });
                        }
                    }
                    Err(_) => errors.push(ValidationError::InvalidPattern {
                        application: label.clone(),
                        pattern: handler.pattern.clone(),
                    }),
                }
                match handler.kind {
                    EndpointKind::Text if handler.body.is_none() => {
                        errors.push(ValidationError::MissingBody {
                            application: label.clone(),
                            pattern: handler.pattern.clone(),
                        });
                    }
                    EndpointKind::Static if application.resource_root.is_none() => {
                        errors.push(ValidationError::MissingResourceRoot {
                            application: label.clone(),
                            pattern: handler.pattern.clone(),
                        });
                    }
                    _ => {}
                }
            }
        }
    }

    if let Some(default_host) = &config.mapper.default_host {
        let known = canonical_host_name(default_host).is_ok_and(|name| names.contains(&name));
        if !known {
            errors.push(ValidationError::UnknownDefaultHost(default_host.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ApplicationConfig, HandlerConfig, HostConfig};

    fn handler(pattern: &str, kind: EndpointKind) -> HandlerConfig {
        HandlerConfig {
            pattern: pattern.to_string(),
            kind,
            body: None,
            content_type: None,
            resource_only: false,
        }
    }

    fn application(path: &str, handlers: Vec<HandlerConfig>) -> ApplicationConfig {
        ApplicationConfig {
            path: path.to_string(),
            version: String::new(),
            resource_root: None,
            welcome_files: Vec::new(),
            paused: false,
            handlers,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "nowhere".to_string();
        config.timeouts.request_secs = 0;
        config.mapper.default_host = Some("missing.local".to_string());
        config.hosts.push(HostConfig {
            name: "Shop.local".to_string(),
            aliases: vec!["*.shop.local".to_string(), "shop.local".to_string()],
            applications: vec![
                application("/store/", vec![handler("items/*", EndpointKind::Echo)]),
                application(
                    "/api",
                    vec![
                        handler("/v1/*", EndpointKind::Echo),
                        handler("/v1/*", EndpointKind::Text),
                        handler("/", EndpointKind::Static),
                    ],
                ),
            ],
        });

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: "nowhere".into(),
        }));
        assert!(errors.contains(&ValidationError::ZeroTimeout));
        assert!(errors.contains(&ValidationError::UnknownDefaultHost("missing.local".into())));
        assert!(errors.contains(&ValidationError::DuplicateHostName("shop.local".into())));
        assert!(errors.contains(&ValidationError::InvalidApplicationPath {
            host: "Shop.local".into(),
            path: "/store/".into(),
        }));
        assert!(errors.contains(&ValidationError::InvalidPattern {
            application: "Shop.local/store/".into(),
            pattern: "items/*".into(),
        }));
        assert!(errors.contains(&ValidationError::DuplicatePattern {
            application: "Shop.local/api".into(),
            pattern: "/v1/*".into(),
        }));
        assert!(errors.contains(&ValidationError::MissingBody {
            application: "Shop.local/api".into(),
            pattern: "/v1/*".into(),
        }));
        assert!(errors.contains(&ValidationError::MissingResourceRoot {
            application: "Shop.local/api".into(),
            pattern: "/".into(),
        }));
    }

    #[test]
    fn test_duplicate_application_version() {
        let mut config = ServerConfig::default();
        config.hosts.push(HostConfig {
            name: "a.com".to_string(),
            aliases: Vec::new(),
            applications: vec![application("/x", Vec::new()), application("/x", Vec::new())],
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateApplication {
                host: "a.com".into(),
                path: "/x".into(),
                version: String::new(),
            }]
        );
    }

    #[test]
    fn test_admin_requires_key() {
        let mut config = ServerConfig::default();
        config.admin.enabled = true;
        config.admin.api_key.clear();
        assert_eq!(validate_config(&config).unwrap_err(), vec![ValidationError::MissingApiKey]);
    }
}
