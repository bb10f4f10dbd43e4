//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Deploy the configured applications into the routing table
//! - Map every request through the table and run the matched endpoint
//! - Apply configuration reloads while serving

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::deploy::{plan, MapperListener};
use crate::http::endpoint::{Endpoint, ServerHandles};
use crate::http::request::{request_host, request_id, version_token, UuidRequestId};
use crate::http::response::{self, MappingReport};
use crate::mapper::{MapperOptions, RoutingResult, RoutingResultPool, RoutingTable};
use crate::observability::metrics;

const DEFAULT_VERSION_HEADER: &str = "x-app-version";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RoutingTable<ServerHandles>>,
    pub pool: Arc<RoutingResultPool<ServerHandles>>,
    pub version_header: HeaderName,
}

/// HTTP server hosting the configured applications.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    deployer: Arc<MapperListener<ServerHandles>>,
}

impl HttpServer {
    /// Create a new HTTP server and deploy the configuration's hosts.
    pub fn new(config: ServerConfig) -> Self {
        let options = MapperOptions {
            context_root_redirect: config.mapper.context_root_redirect,
            directory_redirect: config.mapper.directory_redirect,
        };
        let table = Arc::new(RoutingTable::new(options));
        let deployer = Arc::new(MapperListener::new(Arc::clone(&table)));

        let events = plan::initial(&config);
        let total = events.len();
        let applied = deployer.apply_all(events);
        tracing::info!(
            applied,
            rejected = total - applied,
            hosts = table.host_names().len(),
            "Initial deployment complete"
        );

        let version_header = HeaderName::from_bytes(config.listener.version_header.as_bytes())
            .unwrap_or_else(|_| HeaderName::from_static(DEFAULT_VERSION_HEADER));
        let state = AppState {
            table,
            pool: Arc::new(RoutingResultPool::new(config.mapper.result_pool_size)),
            version_header,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            deployer,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The request router, for serving or for driving requests in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn table(&self) -> &Arc<RoutingTable<ServerHandles>> {
        self.deployer.table()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Apply a reloaded configuration; returns how many events were applied.
    pub fn reload(&self, new_config: &ServerConfig) -> usize {
        apply_config_update(&self.deployer, &self.config, new_config)
    }

    /// Run the server until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<ServerConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        tokio::spawn(watch_config_updates(
            Arc::clone(&self.deployer),
            self.config.clone(),
            config_updates,
            shutdown.resubscribe(),
        ));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn watch_config_updates(
    deployer: Arc<MapperListener<ServerHandles>>,
    mut current: ServerConfig,
    mut updates: mpsc::UnboundedReceiver<ServerConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(new_config) => {
                    apply_config_update(&deployer, &current, &new_config);
                    current = new_config;
                }
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
}

fn apply_config_update(
    deployer: &MapperListener<ServerHandles>,
    old: &ServerConfig,
    new: &ServerConfig,
) -> usize {
    if old.listener != new.listener
        || old.timeouts != new.timeouts
        || old.mapper.context_root_redirect != new.mapper.context_root_redirect
        || old.mapper.directory_redirect != new.mapper.directory_redirect
        || old.mapper.result_pool_size != new.mapper.result_pool_size
    {
        tracing::warn!("Listener, timeout and mapper option changes take effect after a restart");
    }

    let events = plan::diff(old, new);
    let total = events.len();
    let applied = deployer.apply_all(events);
    tracing::info!(applied, rejected = total - applied, "Configuration reloaded");
    applied
}

/// What to do once the mapping is known; owns everything it needs so the
/// pooled result can go back before any I/O.
enum Action {
    Redirect(String),
    Paused,
    NotFound,
    Echo(MappingReport),
    Text { body: Arc<str>, content_type: Arc<str> },
    Static(Option<std::path::PathBuf>),
}

impl Action {
    fn from_result(result: &RoutingResult<ServerHandles>) -> Self {
        if let Some(location) = result.redirect_path() {
            return Action::Redirect(location.to_string());
        }
        if result.is_paused() {
            return Action::Paused;
        }
        match result.handler() {
            None => Action::NotFound,
            Some(Endpoint::Echo) => Action::Echo(MappingReport::from_result(result)),
            Some(Endpoint::Text { body, content_type }) => Action::Text {
                body: Arc::clone(body),
                content_type: Arc::clone(content_type),
            },
            Some(Endpoint::Static) => Action::Static(
                result
                    .application_version()
                    .and_then(|v| v.resource_root())
                    .and_then(|root| root.real_path(result.request_path())),
            ),
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            Action::Redirect(_) => "redirect",
            Action::Paused => "paused",
            Action::NotFound => "not_found",
            _ => "handler",
        }
    }
}

/// Map the request and run whatever it mapped to.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers());
    let path = request.uri().path();

    let Some(host) = request_host(&request) else {
        metrics::record_lookup("invalid", start);
        metrics::record_request(400, "none");
        return response::bad_request("Missing Host header");
    };
    let version = version_token(request.headers(), &state.version_header);

    let (action, match_type) = {
        let mut result = state.pool.acquire();
        if let Err(e) = state.table.lookup(host, path, version, &mut result) {
            tracing::warn!(
                request_id = %request_id,
                host = %host,
                path = %path,
                error = %e,
                "Malformed request"
            );
            metrics::record_lookup("invalid", start);
            metrics::record_request(400, "none");
            return response::bad_request("Malformed request");
        }
        let match_type = result.match_type().map_or("none", |m| m.as_str());
        (Action::from_result(&result), match_type)
    };

    let outcome = action.outcome();
    metrics::record_lookup(outcome, start);
    tracing::debug!(
        request_id = %request_id,
        host = %host,
        path = %path,
        outcome,
        match_type,
        "Request mapped"
    );

    let response = match action {
        Action::Redirect(location) => response::redirect(&location, request.uri().query()),
        Action::Paused => response::paused(),
        Action::NotFound => response::not_found(),
        Action::Echo(report) => response::echo(report),
        Action::Text { body, content_type } => response::text(&body, &content_type),
        Action::Static(Some(file)) => response::static_file(&file).await,
        Action::Static(None) => response::not_found(),
    };
    metrics::record_request(response.status().as_u16(), match_type);
    response
}
