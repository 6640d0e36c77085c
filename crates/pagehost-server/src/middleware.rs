//! Request middleware: request ids, tenant resolution and admin auth

use axum::{
    extract::{Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error};
use uuid::Uuid;

use pagehost_core::ResolvedTenant;

use crate::app::AppState;
use crate::error::ApiError;

/// Extension key for the generated request id
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

/// Tenant resolved for the current request, if any
#[derive(Debug, Clone)]
pub struct CurrentTenant(pub Option<ResolvedTenant>);

impl CurrentTenant {
    pub fn tenant(&self) -> Option<&pagehost_core::Tenant> {
        self.0.as_ref().map(|resolved| &resolved.tenant)
    }

    /// Display name for page chrome; empty without a tenant
    pub fn site_name(&self) -> &str {
        self.tenant().map(|t| t.name.as_str()).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct TenantQuery {
    tenant: Option<String>,
}

/// Middleware to add a request ID to every request and response
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    req.extensions_mut().insert(RequestId(request_id));

    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

/// Raw host of the request, port included
pub fn request_host(req: &Request) -> Option<String> {
    req.headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            req.uri().authority().map(|authority| authority.to_string())
        })
}

/// Middleware to resolve the tenant from the `tenant` query parameter or the host
pub async fn tenant_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let host = request_host(&req);
    let tenant_param = match Query::<TenantQuery>::try_from_uri(req.uri()) {
        Ok(Query(query)) => query.tenant,
        Err(rejection) => {
            debug!(
                query = req.uri().query().unwrap_or_default(),
                error = %rejection.body_text(),
                "ignoring tenant override in unparseable query"
            );
            None
        }
    };

    match state
        .directory
        .resolve(host.as_deref(), tenant_param.as_deref())
        .await
    {
        Ok(resolved) => {
            state.metrics.record_resolution(
                resolved
                    .as_ref()
                    .map(|r| r.resolved_by.as_str())
                    .unwrap_or("none"),
            );
            req.extensions_mut().insert(CurrentTenant(resolved));
            next.run(req).await
        }
        Err(e) => {
            error!(error = %e, host = host.as_deref().unwrap_or("-"), "tenant resolution failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// Middleware guarding the admin API with a static bearer token
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(ApiError::forbidden("admin API is disabled"));
    };

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token);

    match provided {
        Some(token) if tokens_match(token, expected) => Ok(next.run(req).await),
        Some(_) => Err(ApiError::unauthorized("invalid admin token")),
        None => Err(ApiError::unauthorized("missing bearer token")),
    }
}

/// Token from an `Authorization` value; the scheme name is case-insensitive
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
}

/// Constant-time comparison over fixed-length digests
fn tokens_match(provided: &str, expected: &str) -> bool {
    let a = Sha256::digest(provided.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
