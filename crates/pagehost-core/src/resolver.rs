//! Page resolver: decides which page a request renders

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::page::{Block, NavEntry, Page};
use crate::preview::PreviewSigner;
use crate::store::ContentStore;
use crate::tenant::Tenant;
use crate::{Error, Result};

/// Everything needed to draw one page
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub page: Page,
    /// Ordered by `(order, id)`
    pub blocks: Vec<Block>,
    /// Published pages of the page's tenant
    pub nav: Vec<NavEntry>,
}

#[derive(Clone)]
pub struct PageResolver {
    store: Arc<dyn ContentStore>,
    signer: Arc<PreviewSigner>,
}

impl PageResolver {
    pub fn new(store: Arc<dyn ContentStore>, signer: Arc<PreviewSigner>) -> Self {
        Self { store, signer }
    }

    pub fn signer(&self) -> &PreviewSigner {
        &self.signer
    }

    /// Home page selection.
    ///
    /// Falls back from the published home page to the first published page.
    /// `None` means the site has nothing to show yet (or no tenant resolved).
    pub async fn home(&self, tenant: Option<&Tenant>) -> Result<Option<RenderedPage>> {
        let Some(tenant) = tenant else {
            return Ok(None);
        };

        if let Some(page) = self.store.find_home_page(tenant.id).await? {
            return self.assemble(page).await.map(Some);
        }

        match self.store.first_published_page(tenant.id).await? {
            Some(page) => {
                debug!(tenant = %tenant.slug, page = %page.slug, "no home page, using first published page");
                self.assemble(page).await.map(Some)
            }
            None => Ok(None),
        }
    }

    /// Published page lookup by slug
    pub async fn by_slug(&self, tenant: Option<&Tenant>, slug: &str) -> Result<RenderedPage> {
        let tenant =
            tenant.ok_or_else(|| Error::TenantNotFound("tenant not resolved".to_string()))?;

        let page = self
            .store
            .find_published_page(tenant.id, slug)
            .await?
            .ok_or_else(|| Error::PageNotFound(format!("{}/{}", tenant.slug, slug)))?;

        self.assemble(page).await
    }

    /// Render the page a signed preview token points at, published or not
    pub async fn preview(&self, token: &str) -> Result<RenderedPage> {
        let page_id = self.signer.verify(token, Utc::now()).map_err(|e| {
            warn!(error = %e, "preview token rejected");
            Error::PreviewToken(e)
        })?;

        let page = self.store.get_page(page_id).await?;
        self.assemble(page).await
    }

    /// Navigation for a tenant; empty without one
    pub async fn nav(&self, tenant: Option<&Tenant>) -> Result<Vec<NavEntry>> {
        match tenant {
            Some(tenant) => self.store.nav_pages(tenant.id).await,
            None => Ok(Vec::new()),
        }
    }

    async fn assemble(&self, page: Page) -> Result<RenderedPage> {
        let blocks = self.store.list_blocks(page.id).await?;
        let nav = self.store.nav_pages(page.tenant_id).await?;
        Ok(RenderedPage { page, blocks, nav })
    }
}
