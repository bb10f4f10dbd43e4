//! Admin API: live view of the routing table.
//!
//! - `GET /admin/status`: version, uptime and table size
//! - `GET /admin/hosts`: hosts, aliases, applications, versions and patterns
//! - `GET /admin/lookup?host=&path=&version=`: how a request would be mapped
//!
//! Every route requires the configured bearer token.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::endpoint::ServerHandles;
use crate::mapper::RoutingTable;

#[derive(Clone)]
pub struct AdminState {
    pub table: Arc<RoutingTable<ServerHandles>>,
    pub api_key: Arc<str>,
    pub started: Instant,
}

impl AdminState {
    pub fn new(table: Arc<RoutingTable<ServerHandles>>, api_key: &str) -> Self {
        Self {
            table,
            api_key: api_key.into(),
            started: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/hosts", get(get_hosts))
        .route("/admin/lookup", get(get_lookup))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::endpoint::{ApplicationId, Endpoint};
    use crate::mapper::{ApplicationDeployment, HandlerRegistration, MapperOptions};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    fn admin() -> Router {
        let table = Arc::new(RoutingTable::<ServerHandles>::new(MapperOptions::default()));
        let application = ApplicationId::new("shop.local", "/store", "");
        let deployment = ApplicationDeployment::new("/store", "", application)
            .with_handler(HandlerRegistration::new("/items/*", Endpoint::Echo));
        table.add_application_version("shop.local", "shop.local".into(), deployment).unwrap();
        setup_admin_router(AdminState::new(table, "secret"))
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut request = Request::builder().uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        request.body(Body::empty()).unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let router = admin();
        let missing = router.clone().oneshot(get("/admin/status", None)).await.unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        let wrong = router.oneshot(get("/admin/status", Some("nope"))).await.unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status_and_lookup() {
        let router = admin();
        let status = router.clone().oneshot(get("/admin/status", Some("secret"))).await.unwrap();
        assert_eq!(status.status(), StatusCode::OK);
        let status = json(status).await;
        assert_eq!(status["hosts"], 1);
        assert_eq!(status["applications"], 1);

        let lookup = router
            .clone()
            .oneshot(get("/admin/lookup?host=shop.local&path=/store/items/42", Some("secret")))
            .await
            .unwrap();
        let report = json(lookup).await;
        assert_eq!(report["match_type"], "WILDCARD");
        assert_eq!(report["path_info"], "/42");

        let malformed = router
            .oneshot(get("/admin/lookup?host=&path=/store", Some("secret")))
            .await
            .unwrap();
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    }
}
