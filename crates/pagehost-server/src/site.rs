//! Public site handlers

use askama::Template;
use axum::{
    Extension,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};
use std::time::Instant;
use tracing::{debug, error};

use pagehost_core::{Error, NavEntry, PageFilter, RenderedPage};
use pagehost_observability::metrics::RenderOutcome;

use crate::app::AppState;
use crate::middleware::CurrentTenant;
use crate::render::{
    NotFoundTemplate, PageTemplate, PlaceholderTemplate, SitemapTemplate, SitemapUrl,
};

fn html<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            error!(error = %e, "template rendering failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn server_error(err: &Error) -> Response {
    error!(error = %err, "page resolution failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

/// Site 404 page with the tenant's navigation
async fn not_found_page(state: &AppState, current: &CurrentTenant, path: &str) -> Response {
    let nav: Vec<NavEntry> = match state.resolver.nav(current.tenant()).await {
        Ok(nav) => nav,
        Err(e) => return server_error(&e),
    };
    html(
        StatusCode::NOT_FOUND,
        &NotFoundTemplate::new(current.site_name(), &nav, path),
    )
}

fn finish(state: &AppState, route: &str, started: Instant, outcome: RenderOutcome) {
    state
        .metrics
        .record_render(route, outcome, started.elapsed().as_secs_f64());
}

/// `/`: published home page, else first published page, else a placeholder
pub async fn home(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentTenant>,
) -> Response {
    let started = Instant::now();

    match state.resolver.home(current.tenant()).await {
        Ok(Some(rendered)) => {
            finish(&state, "home", started, RenderOutcome::Ok);
            html(
                StatusCode::OK,
                &PageTemplate::new(&rendered, current.site_name(), false),
            )
        }
        Ok(None) => {
            finish(&state, "home", started, RenderOutcome::Placeholder);
            html(
                StatusCode::OK,
                &PlaceholderTemplate::new(current.site_name()),
            )
        }
        Err(e) => {
            finish(&state, "home", started, RenderOutcome::Error);
            server_error(&e)
        }
    }
}

/// `/{slug}/`: a published page of the current tenant
pub async fn page(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentTenant>,
    Path(slug): Path<String>,
    uri: Uri,
) -> Response {
    let started = Instant::now();

    match state.resolver.by_slug(current.tenant(), &slug).await {
        Ok(rendered) => {
            finish(&state, "page", started, RenderOutcome::Ok);
            html(
                StatusCode::OK,
                &PageTemplate::new(&rendered, current.site_name(), false),
            )
        }
        Err(e) if e.is_not_found() => {
            debug!(slug = %slug, "page not found");
            finish(&state, "page", started, RenderOutcome::NotFound);
            not_found_page(&state, &current, uri.path()).await
        }
        Err(e) => {
            finish(&state, "page", started, RenderOutcome::Error);
            server_error(&e)
        }
    }
}

/// `/__preview/{token}/`: any page, published or not, behind a signed link
pub async fn preview(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentTenant>,
    Path(token): Path<String>,
    uri: Uri,
) -> Response {
    let started = Instant::now();

    let rendered: RenderedPage = match state.resolver.preview(&token).await {
        Ok(rendered) => rendered,
        Err(e) if e.is_not_found() || matches!(e, Error::PreviewToken(_)) => {
            finish(&state, "preview", started, RenderOutcome::NotFound);
            return not_found_page(&state, &current, uri.path()).await;
        }
        Err(e) => {
            finish(&state, "preview", started, RenderOutcome::Error);
            return server_error(&e);
        }
    };

    // Chrome comes from the page's own tenant, not the request host
    let site_name = match state.store.get_tenant(rendered.page.tenant_id).await {
        Ok(tenant) => tenant.name,
        Err(e) => {
            finish(&state, "preview", started, RenderOutcome::Error);
            return server_error(&e);
        }
    };

    finish(&state, "preview", started, RenderOutcome::Ok);
    let mut response = html(
        StatusCode::OK,
        &PageTemplate::new(&rendered, &site_name, true),
    );
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

/// `/sitemap.xml`: published pages of the current tenant
pub async fn sitemap(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentTenant>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let started = Instant::now();

    let Some(tenant) = current.tenant() else {
        finish(&state, "sitemap", started, RenderOutcome::NotFound);
        return not_found_page(&state, &current, uri.path()).await;
    };

    let pages = match state
        .store
        .list_pages(PageFilter {
            tenant_id: Some(tenant.id),
            is_published: Some(true),
            ..Default::default()
        })
        .await
    {
        Ok(pages) => pages,
        Err(e) => {
            finish(&state, "sitemap", started, RenderOutcome::Error);
            return server_error(&e);
        }
    };

    let base_url = base_url(&headers, uri.authority().map(|a| a.as_str()));
    let template = SitemapTemplate {
        urls: pages
            .iter()
            .map(|page| SitemapUrl::new(&base_url, &page.path(), page.updated_at))
            .collect(),
    };

    finish(&state, "sitemap", started, RenderOutcome::Ok);
    match template.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "sitemap rendering failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Scheme from `x-forwarded-proto` (default `http`) plus the request host
fn base_url(headers: &HeaderMap, authority: Option<&str>) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or(authority)
        .unwrap_or("localhost");
    format!("{}://{}", scheme, host)
}

/// Fallback for every unmatched path
pub async fn not_found(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentTenant>,
    uri: Uri,
) -> Response {
    let started = Instant::now();
    let response = not_found_page(&state, &current, uri.path()).await;
    finish(&state, "fallback", started, RenderOutcome::NotFound);
    response
}
