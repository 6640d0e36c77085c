//! Tenant and page resolution against a real SQLite store

use chrono::{Duration, Utc};
use pagehost_core::{
    BlockInput, BlockKind, ContentStore, DomainInput, DomainStatus, Error, PageInput,
    PageResolver, PreviewSigner, ResolvedBy, Tenant, TenantDirectory, TenantInput,
};
use pagehost_store_sqlite::SqliteContentStore;
use serde_json::json;
use std::sync::Arc;

struct Fixture {
    store: Arc<dyn ContentStore>,
    directory: TenantDirectory,
    resolver: PageResolver,
    acme: Tenant,
}

async fn fixture() -> Fixture {
    let store: Arc<dyn ContentStore> = Arc::new(SqliteContentStore::in_memory().await.unwrap());
    let acme = store
        .create_tenant(TenantInput {
            name: "Acme".to_string(),
            slug: "acme".to_string(),
        })
        .await
        .unwrap();
    store
        .add_domain(
            acme.id,
            DomainInput {
                host: "acme.test".to_string(),
                is_primary: true,
                status: DomainStatus::Pending,
            },
        )
        .await
        .unwrap();

    let signer = Arc::new(PreviewSigner::new("test-secret", Duration::seconds(3600)));
    Fixture {
        directory: TenantDirectory::new(store.clone()),
        resolver: PageResolver::new(store.clone(), signer),
        store,
        acme,
    }
}

fn page(tenant: &Tenant, title: &str, published: bool, home: bool) -> PageInput {
    PageInput {
        tenant_id: tenant.id,
        title: title.to_string(),
        slug: String::new(),
        is_published: published,
        is_home: home,
        nav_label: String::new(),
        nav_order: 0,
    }
}

#[tokio::test]
async fn test_host_with_port_resolves() {
    let f = fixture().await;
    let resolved = f
        .directory
        .resolve(Some("ACME.test:8000"), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.tenant.id, f.acme.id);
    assert_eq!(resolved.resolved_by, ResolvedBy::Host);
}

#[tokio::test]
async fn test_query_param_overrides_host() {
    let f = fixture().await;
    let globex = f
        .store
        .create_tenant(TenantInput {
            name: "Globex".to_string(),
            slug: "globex".to_string(),
        })
        .await
        .unwrap();

    let resolved = f
        .directory
        .resolve(Some("acme.test"), Some("GLOBEX"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.tenant.id, globex.id);
    assert_eq!(resolved.resolved_by, ResolvedBy::QueryParam);

    // Unknown override falls through to the host
    let resolved = f
        .directory
        .resolve(Some("acme.test"), Some("nobody"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.tenant.id, f.acme.id);
}

#[tokio::test]
async fn test_unknown_host_resolves_nothing() {
    let f = fixture().await;
    assert!(f.directory.resolve(Some("other.test"), None).await.unwrap().is_none());
    assert!(f.directory.resolve(None, None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_home_fallback_chain() {
    let f = fixture().await;
    assert!(f.resolver.home(Some(&f.acme)).await.unwrap().is_none());
    assert!(f.resolver.home(None).await.unwrap().is_none());

    // Unpublished home page is skipped
    f.store
        .create_page(page(&f.acme, "Draft Home", false, true))
        .await
        .unwrap();
    let about = f
        .store
        .create_page(page(&f.acme, "About", true, false))
        .await
        .unwrap();

    let rendered = f.resolver.home(Some(&f.acme)).await.unwrap().unwrap();
    assert_eq!(rendered.page.id, about.id);

    let welcome = f
        .store
        .create_page(page(&f.acme, "Welcome", true, true))
        .await
        .unwrap();
    let rendered = f.resolver.home(Some(&f.acme)).await.unwrap().unwrap();
    assert_eq!(rendered.page.id, welcome.id);
    assert_eq!(rendered.nav.len(), 2);
}

#[tokio::test]
async fn test_by_slug_with_blocks() {
    let f = fixture().await;
    let about = f
        .store
        .create_page(page(&f.acme, "About", true, false))
        .await
        .unwrap();
    f.store
        .replace_blocks(
            about.id,
            vec![
                BlockInput {
                    kind: BlockKind::Image,
                    order: 1,
                    data: json!({ "src": "/team.jpg" }),
                },
                BlockInput {
                    kind: BlockKind::Hero,
                    order: 0,
                    data: json!({ "title": "Who we are" }),
                },
            ],
        )
        .await
        .unwrap();

    let rendered = f.resolver.by_slug(Some(&f.acme), "about").await.unwrap();
    assert_eq!(rendered.blocks.len(), 2);
    assert_eq!(rendered.blocks[0].kind, BlockKind::Hero);

    let err = f.resolver.by_slug(Some(&f.acme), "missing").await.unwrap_err();
    assert!(matches!(err, Error::PageNotFound(_)));

    let err = f.resolver.by_slug(None, "about").await.unwrap_err();
    assert!(matches!(err, Error::TenantNotFound(_)));
}

#[tokio::test]
async fn test_unpublished_page_hidden_but_previewable() {
    let f = fixture().await;
    let draft = f
        .store
        .create_page(page(&f.acme, "Draft", false, false))
        .await
        .unwrap();

    assert!(f.resolver.by_slug(Some(&f.acme), "draft").await.is_err());

    let token = f.resolver.signer().sign(draft.id, Utc::now());
    let rendered = f.resolver.preview(&token).await.unwrap();
    assert_eq!(rendered.page.id, draft.id);
}

#[tokio::test]
async fn test_expired_and_tampered_preview_rejected() {
    let f = fixture().await;
    let draft = f
        .store
        .create_page(page(&f.acme, "Draft", false, false))
        .await
        .unwrap();

    let old = f
        .resolver
        .signer()
        .sign(draft.id, Utc::now() - Duration::seconds(7200));
    assert!(matches!(
        f.resolver.preview(&old).await.unwrap_err(),
        Error::PreviewToken(_)
    ));

    let token = f.resolver.signer().sign(draft.id, Utc::now());
    let tampered = format!("x{}", token);
    assert!(matches!(
        f.resolver.preview(&tampered).await.unwrap_err(),
        Error::PreviewToken(_)
    ));

    // Valid token for a deleted page
    f.store.delete_page(draft.id).await.unwrap();
    assert!(f.resolver.preview(&token).await.unwrap_err().is_not_found());
}
