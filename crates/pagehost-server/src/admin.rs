//! Admin JSON API
//!
//! CRUD over tenants, domains, pages and blocks, plus the bulk page actions
//! and preview links. Mounted under `/admin/api` behind the bearer token.

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, put},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use pagehost_core::{
    Block, BlockId, BlockInput, Domain, DomainFilter, DomainId, DomainInput, DomainUpdate, Page,
    PageAction, PageFilter, PageId, PageInput, Tenant, TenantId, TenantInput,
};

use crate::app::AppState;
use crate::error::ApiError;

type ApiResult<T> = Result<T, ApiError>;

/// `Path` with JSON error bodies
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `Query` with JSON error bodies
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `Json` with JSON error bodies
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tenants", get(list_tenants).post(create_tenant))
        .route(
            "/tenants/{id}",
            get(get_tenant).put(update_tenant).delete(delete_tenant),
        )
        .route(
            "/tenants/{id}/domains",
            get(list_tenant_domains).post(add_domain),
        )
        .route("/domains", get(list_domains))
        .route("/domains/{id}", put(update_domain).delete(delete_domain))
        .route("/domains/{id}/verify", post(verify_domain))
        .route("/pages", get(list_pages).post(create_page))
        .route("/pages/actions", post(page_action))
        .route(
            "/pages/{id}",
            get(get_page).put(update_page).delete(delete_page),
        )
        .route("/pages/{id}/preview", get(preview_link))
        .route(
            "/pages/{id}/blocks",
            get(list_blocks).post(add_block).put(replace_blocks),
        )
        .route("/blocks/{id}", put(update_block).delete(delete_block))
}

fn tenant_id(raw: &str) -> ApiResult<TenantId> {
    Ok(TenantId::from_string(raw)?)
}

fn domain_id(raw: &str) -> ApiResult<DomainId> {
    Ok(DomainId::from_string(raw)?)
}

#[derive(Debug, Default, Deserialize)]
pub struct TenantSearch {
    #[serde(default)]
    pub search: Option<String>,
}

async fn list_tenants(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TenantSearch>,
) -> ApiResult<Json<Vec<Tenant>>> {
    Ok(Json(state.store.list_tenants(query.search.as_deref()).await?))
}

async fn create_tenant(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<TenantInput>,
) -> ApiResult<(StatusCode, Json<Tenant>)> {
    let tenant = state.store.create_tenant(input).await?;
    Ok((StatusCode::CREATED, Json(tenant)))
}

async fn get_tenant(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.store.get_tenant(tenant_id(&id)?).await?))
}

async fn update_tenant(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<TenantInput>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(
        state.store.update_tenant(tenant_id(&id)?, input).await?,
    ))
}

async fn delete_tenant(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_tenant(tenant_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_tenant_domains(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Vec<Domain>>> {
    let tenant = state.store.get_tenant(tenant_id(&id)?).await?;
    let domains = state
        .store
        .list_domains(DomainFilter {
            tenant_id: Some(tenant.id),
            ..Default::default()
        })
        .await?;
    Ok(Json(domains))
}

async fn add_domain(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<DomainInput>,
) -> ApiResult<(StatusCode, Json<Domain>)> {
    let domain = state.store.add_domain(tenant_id(&id)?, input).await?;
    Ok((StatusCode::CREATED, Json(domain)))
}

async fn list_domains(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<DomainFilter>,
) -> ApiResult<Json<Vec<Domain>>> {
    Ok(Json(state.store.list_domains(filter).await?))
}

async fn update_domain(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<DomainUpdate>,
) -> ApiResult<Json<Domain>> {
    Ok(Json(
        state.store.update_domain(domain_id(&id)?, update).await?,
    ))
}

async fn verify_domain(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Domain>> {
    let domain = state.store.verify_domain(domain_id(&id)?).await?;
    info!(host = %domain.host, "Domain verified");
    Ok(Json(domain))
}

async fn delete_domain(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_domain(domain_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_pages(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<PageFilter>,
) -> ApiResult<Json<Vec<Page>>> {
    Ok(Json(state.store.list_pages(filter).await?))
}

async fn create_page(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<PageInput>,
) -> ApiResult<(StatusCode, Json<Page>)> {
    let page = state.store.create_page(input).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

async fn get_page(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PageId>,
) -> ApiResult<Json<Page>> {
    Ok(Json(state.store.get_page(id).await?))
}

async fn update_page(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PageId>,
    ApiJson(input): ApiJson<PageInput>,
) -> ApiResult<Json<Page>> {
    Ok(Json(state.store.update_page(id, input).await?))
}

async fn delete_page(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PageId>,
) -> ApiResult<StatusCode> {
    state.store.delete_page(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PageActionRequest {
    pub action: PageAction,
    pub ids: Vec<PageId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageActionResponse {
    pub updated: u64,
    pub message: String,
}

async fn page_action(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PageActionRequest>,
) -> ApiResult<Json<PageActionResponse>> {
    if request.ids.is_empty() {
        return Err(ApiError::bad_request("ids must not be empty"));
    }

    let updated = match request.action {
        PageAction::Publish => state.store.publish_pages(&request.ids).await?,
        PageAction::Unpublish => state.store.unpublish_pages(&request.ids).await?,
        PageAction::MakeHome => state.store.make_home(&request.ids).await?,
    };

    Ok(Json(PageActionResponse {
        updated,
        message: request.action.message(updated),
    }))
}

/// Redirect to a fresh signed preview of the page
async fn preview_link(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PageId>,
) -> ApiResult<Response> {
    let page = state.store.get_page(id).await?;
    let token = state.resolver.signer().sign(page.id, Utc::now());
    Ok(Redirect::to(&format!("/__preview/{}/", token)).into_response())
}

async fn list_blocks(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PageId>,
) -> ApiResult<Json<Vec<Block>>> {
    let page = state.store.get_page(id).await?;
    Ok(Json(state.store.list_blocks(page.id).await?))
}

async fn add_block(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PageId>,
    ApiJson(input): ApiJson<BlockInput>,
) -> ApiResult<(StatusCode, Json<Block>)> {
    let block = state.store.add_block(id, input).await?;
    Ok((StatusCode::CREATED, Json(block)))
}

async fn replace_blocks(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PageId>,
    ApiJson(blocks): ApiJson<Vec<BlockInput>>,
) -> ApiResult<Json<Vec<Block>>> {
    Ok(Json(state.store.replace_blocks(id, blocks).await?))
}

async fn update_block(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BlockId>,
    ApiJson(input): ApiJson<BlockInput>,
) -> ApiResult<Json<Block>> {
    Ok(Json(state.store.update_block(id, input).await?))
}

async fn delete_block(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BlockId>,
) -> ApiResult<StatusCode> {
    state.store.delete_block(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
