//! Public site behaviour through the full router

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use pagehost_core::{BlockInput, BlockKind, ContentStore};
use serde_json::json;

use common::{app, body_string};

#[tokio::test]
async fn test_placeholder_without_tenant() {
    let app = app().await;

    let response = app.get("unknown.test", "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("No tenant home page yet."));
}

#[tokio::test]
async fn test_placeholder_for_tenant_without_pages() {
    let app = app().await;
    let acme = app.tenant("acme", "Acme", "acme.test").await;
    app.page(&acme, "Draft", false, false).await;

    let response = app.get("acme.test", "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("No tenant home page yet."));
}

#[tokio::test]
async fn test_home_page_by_host_with_port() {
    let app = app().await;
    let acme = app.tenant("acme", "Acme", "acme.test").await;
    let home = app.page(&acme, "Welcome", true, true).await;
    app.store
        .add_block(
            home.id,
            BlockInput {
                kind: BlockKind::Hero,
                order: 0,
                data: json!({ "title": "Hello from Acme", "cta_url": "/about/", "cta_label": "About" }),
            },
        )
        .await
        .unwrap();
    app.page(&acme, "About", true, false).await;

    let response = app.get("ACME.test:8080", "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());

    let body = body_string(response).await;
    assert!(body.contains("Hello from Acme"));
    assert!(body.contains("href=\"/about/\""));
}

#[tokio::test]
async fn test_home_falls_back_to_first_published_page() {
    let app = app().await;
    let acme = app.tenant("acme", "Acme", "acme.test").await;
    let about = app.page(&acme, "About", true, false).await;
    app.store
        .add_block(
            about.id,
            BlockInput {
                kind: BlockKind::Hero,
                order: 0,
                data: json!({ "title": "About Acme" }),
            },
        )
        .await
        .unwrap();

    let response = app.get("acme.test", "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("About Acme"));
}

#[tokio::test]
async fn test_tenant_query_param_overrides_host() {
    let app = app().await;
    app.tenant("acme", "Acme", "acme.test").await;
    let globex = app.tenant("globex", "Globex", "globex.test").await;
    let page = app.page(&globex, "Products", true, false).await;
    app.store
        .add_block(
            page.id,
            BlockInput {
                kind: BlockKind::Hero,
                order: 0,
                data: json!({ "title": "Globex products" }),
            },
        )
        .await
        .unwrap();

    let response = app.get("acme.test", "/products/?tenant=globex").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("Globex products"));

    let response = app.get("acme.test", "/products/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(
        app.metrics
            .tenant_resolutions_total
            .with_label_values(&["query_param"])
            .get(),
        1.0
    );
}

#[tokio::test]
async fn test_unparseable_tenant_query_falls_back_to_host() {
    let app = app().await;
    let acme = app.tenant("acme", "Acme", "acme.test").await;
    app.tenant("globex", "Globex", "globex.test").await;
    app.page(&acme, "About", true, false).await;

    let response = app
        .get("acme.test", "/about/?tenant=globex&tenant=other")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("Acme"));
    assert_eq!(
        app.metrics
            .tenant_resolutions_total
            .with_label_values(&["host"])
            .get(),
        1.0
    );
}

#[tokio::test]
async fn test_slug_with_and_without_trailing_slash() {
    let app = app().await;
    let acme = app.tenant("acme", "Acme", "acme.test").await;
    app.page(&acme, "About Us", true, false).await;

    assert_eq!(app.get("acme.test", "/about-us/").await.status(), StatusCode::OK);
    assert_eq!(app.get("acme.test", "/about-us").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unpublished_page_is_not_found() {
    let app = app().await;
    let acme = app.tenant("acme", "Acme", "acme.test").await;
    app.page(&acme, "Home", true, true).await;
    app.page(&acme, "Secret", false, false).await;

    let response = app.get("acme.test", "/secret/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_string(response).await;
    assert!(body.contains("/secret/"));
    // 404 page carries the tenant's navigation
    assert!(body.contains("href=\"/\""));
    assert!(!body.contains("href=\"/secret/\""));
}

#[tokio::test]
async fn test_slug_without_tenant_is_not_found() {
    let app = app().await;
    let response = app.get("nobody.test", "/about/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unmatched_path_renders_site_404() {
    let app = app().await;
    app.tenant("acme", "Acme", "acme.test").await;

    let response = app.get("acme.test", "/a/b/c").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_string(response).await.contains("/a/b/c"));
}

#[tokio::test]
async fn test_preview_renders_unpublished_page() {
    let app = app().await;
    let acme = app.tenant("acme", "Acme", "acme.test").await;
    let globex = app.tenant("globex", "Globex", "globex.test").await;
    app.page(&globex, "Globex Careers", true, false).await;
    app.page(&acme, "Acme Pricing", true, false).await;
    let draft = app.page(&acme, "Draft", false, false).await;
    app.store
        .add_block(
            draft.id,
            BlockInput {
                kind: BlockKind::Hero,
                order: 0,
                data: json!({ "title": "Work in progress" }),
            },
        )
        .await
        .unwrap();

    let token = app.signer.sign(draft.id, Utc::now());
    // Requested through another tenant's domain; chrome follows the page
    let response = app
        .get("globex.test", &format!("/__preview/{}/", token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");

    let body = body_string(response).await;
    assert!(body.contains("Work in progress"));
    assert!(body.contains("Preview (not published)"));
    assert!(body.contains("href=\"/acme-pricing/\""));
    assert!(body.contains("Acme Pricing"));
    assert!(!body.contains("Globex"));
}

#[tokio::test]
async fn test_bad_preview_tokens_are_not_found() {
    let app = app().await;
    let acme = app.tenant("acme", "Acme", "acme.test").await;
    let draft = app.page(&acme, "Draft", false, false).await;

    let expired = app.signer.sign(draft.id, Utc::now() - Duration::hours(2));
    let response = app
        .get("acme.test", &format!("/__preview/{}/", expired))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("acme.test", "/__preview/not.a.token/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let forged = pagehost_core::PreviewSigner::new("other-secret", Duration::hours(1))
        .sign(draft.id, Utc::now());
    let response = app
        .get("acme.test", &format!("/__preview/{}/", forged))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sitemap() {
    let app = app().await;
    let acme = app.tenant("acme", "Acme", "acme.test").await;
    app.page(&acme, "Home", true, true).await;
    app.page(&acme, "About", true, false).await;
    app.page(&acme, "Draft", false, false).await;

    let response = app
        .send(
            axum::http::Request::builder()
                .uri("/sitemap.xml")
                .header("host", "acme.test")
                .header("x-forwarded-proto", "https")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("application/xml")
    );

    let xml = body_string(response).await;
    assert!(xml.contains("<loc>https://acme.test/</loc>"));
    assert!(xml.contains("<loc>https://acme.test/about/</loc>"));
    assert!(!xml.contains("draft"));
    assert!(xml.contains(&format!("<lastmod>{}</lastmod>", Utc::now().format("%Y-%m-%d"))));
}

#[tokio::test]
async fn test_sitemap_without_tenant() {
    let app = app().await;
    let response = app.get("nobody.test", "/sitemap.xml").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_operational_endpoints() {
    let app = app().await;

    assert_eq!(app.get("any.test", "/healthz").await.status(), StatusCode::OK);
    assert_eq!(app.get("any.test", "/readyz").await.status(), StatusCode::OK);

    app.get("any.test", "/").await;
    let response = app.get("any.test", "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_string(response).await;
    assert!(text.contains("pagehost_tenant_resolutions_total{source=\"none\"}"));
    assert!(text.contains("pagehost_page_renders_total"));
}
