#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use chrono::Duration;
use pagehost_core::{
    ContentStore, DomainInput, DomainStatus, Page, PageInput, PreviewSigner, Tenant, TenantInput,
};
use pagehost_observability::metrics::Metrics;
use pagehost_server::{AppState, build_router};
use pagehost_store_sqlite::SqliteContentStore;
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "test-admin-token";
pub const SECRET: &str = "test-secret";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn ContentStore>,
    pub metrics: Arc<Metrics>,
    pub signer: PreviewSigner,
}

pub async fn app_with_token(admin_token: Option<&str>) -> TestApp {
    let store: Arc<dyn ContentStore> = Arc::new(SqliteContentStore::in_memory().await.unwrap());
    let metrics = Arc::new(Metrics::new().unwrap());
    let signer = PreviewSigner::new(SECRET, Duration::seconds(3600));
    let state = AppState::new(
        store.clone(),
        signer.clone(),
        metrics.clone(),
        admin_token.map(str::to_string),
    );
    TestApp {
        router: build_router(state),
        store,
        metrics,
        signer,
    }
}

pub async fn app() -> TestApp {
    app_with_token(Some(ADMIN_TOKEN)).await
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// GET against a host
    pub async fn get(&self, host: &str, uri: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::HOST, host)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn tenant(&self, slug: &str, name: &str, host: &str) -> Tenant {
        let tenant = self
            .store
            .create_tenant(TenantInput {
                name: name.to_string(),
                slug: slug.to_string(),
            })
            .await
            .unwrap();
        self.store
            .add_domain(
                tenant.id,
                DomainInput {
                    host: host.to_string(),
                    is_primary: true,
                    status: DomainStatus::Active,
                },
            )
            .await
            .unwrap();
        tenant
    }

    pub async fn page(&self, tenant: &Tenant, title: &str, published: bool, home: bool) -> Page {
        self.store
            .create_page(PageInput {
                tenant_id: tenant.id,
                title: title.to_string(),
                slug: String::new(),
                is_published: published,
                is_home: home,
                nav_label: String::new(),
                nav_order: 0,
            })
            .await
            .unwrap()
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
