//! Tenant directory: maps an inbound request to a tenant
//!
//! Resolution is a two-step lookup:
//! 1. an explicit `tenant` slug override (query parameter)
//! 2. the request host, matched against the domain table
//!
//! An override that names no tenant falls through to the host lookup.

use std::sync::Arc;
use tracing::debug;

use crate::slug::normalize_request_host;
use crate::store::ContentStore;
use crate::tenant::Tenant;
use crate::Result;

/// How a tenant was picked for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedBy {
    QueryParam,
    Host,
}

impl ResolvedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolvedBy::QueryParam => "query_param",
            ResolvedBy::Host => "host",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTenant {
    pub tenant: Tenant,
    pub resolved_by: ResolvedBy,
}

/// Trim and lower-case the slug override; blank means absent.
pub fn normalize_tenant_param(raw: Option<&str>) -> Option<String> {
    let slug = raw?.trim().to_lowercase();
    if slug.is_empty() { None } else { Some(slug) }
}

#[derive(Clone)]
pub struct TenantDirectory {
    store: Arc<dyn ContentStore>,
}

impl TenantDirectory {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Resolve the tenant for a request.
    ///
    /// # Arguments
    /// * `host_header` - raw `Host` header value, port included
    /// * `tenant_param` - raw `tenant` query parameter
    pub async fn resolve(
        &self,
        host_header: Option<&str>,
        tenant_param: Option<&str>,
    ) -> Result<Option<ResolvedTenant>> {
        let slug = normalize_tenant_param(tenant_param);
        let host = host_header.and_then(normalize_request_host);

        let mut resolved = None;
        if let Some(slug) = &slug
            && let Some(tenant) = self.store.find_tenant_by_slug(slug).await?
        {
            resolved = Some(ResolvedTenant {
                tenant,
                resolved_by: ResolvedBy::QueryParam,
            });
        }

        if resolved.is_none()
            && let Some(host) = &host
            && let Some(tenant) = self.store.find_tenant_by_host(host).await?
        {
            resolved = Some(ResolvedTenant {
                tenant,
                resolved_by: ResolvedBy::Host,
            });
        }

        if let Some(host) = &host {
            debug!(
                host = %host,
                slug = slug.as_deref().unwrap_or("-"),
                tenant = resolved.as_ref().map(|r| r.tenant.slug.as_str()).unwrap_or("-"),
                "tenant resolution"
            );
        }

        Ok(resolved)
    }
}
