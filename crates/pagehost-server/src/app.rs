//! Application state and router assembly
//!
//! `AppState` holds the content store behind the `ContentStore` trait, so the
//! same handlers run against an on-disk or an in-memory SQLite database.

use async_trait::async_trait;
use axum::{Router, middleware as axum_middleware, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use pagehost_core::{ContentStore, PageResolver, PreviewSigner, TenantDirectory};
use pagehost_observability::health::{
    ComponentStatus, HealthState, ReadinessChecker, health_router,
};
use pagehost_observability::metrics::Metrics;

use crate::{admin, middleware, site};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub directory: TenantDirectory,
    pub resolver: PageResolver,
    pub metrics: Arc<Metrics>,
    /// Bearer token for the admin API; `None` disables it
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ContentStore>,
        signer: PreviewSigner,
        metrics: Arc<Metrics>,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            directory: TenantDirectory::new(store.clone()),
            resolver: PageResolver::new(store.clone(), Arc::new(signer)),
            store,
            metrics,
            admin_token: admin_token.filter(|t| !t.is_empty()).map(Arc::from),
        }
    }
}

/// Readiness probe backed by a store ping
struct StoreReadiness {
    store: Arc<dyn ContentStore>,
}

#[async_trait]
impl ReadinessChecker for StoreReadiness {
    async fn check(&self) -> ComponentStatus {
        match self.store.ping().await {
            Ok(()) => ComponentStatus::ok("database"),
            Err(e) => ComponentStatus::unavailable("database", e.to_string()),
        }
    }
}

/// Build the full HTTP surface: public site, admin API and health endpoints
pub fn build_router(state: AppState) -> Router {
    let health_state = HealthState::new(state.metrics.clone()).with_checker(Arc::new(
        StoreReadiness {
            store: state.store.clone(),
        },
    ));

    let site = Router::new()
        .route("/", get(site::home))
        .route("/sitemap.xml", get(site::sitemap))
        .route("/__preview/{token}/", get(site::preview))
        .route("/{slug}/", get(site::page))
        .route("/{slug}", get(site::page))
        .fallback(site::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::tenant_middleware,
        ));

    let admin = admin::router().route_layer(axum_middleware::from_fn_with_state(
        state.clone(),
        middleware::admin_auth_middleware,
    ));

    Router::new()
        .nest("/admin/api", admin)
        .merge(site)
        .with_state(state)
        .merge(health_router(health_state))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
}
