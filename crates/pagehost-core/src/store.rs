//! Content store trait
//!
//! The `ContentStore` trait abstracts the relational storage behind the site,
//! so the directory, resolver and admin surface work against any backend.
//! The SQLite implementation lives in `pagehost-store-sqlite`.

use async_trait::async_trait;

use crate::Result;
use crate::page::{Block, BlockId, BlockInput, NavEntry, Page, PageFilter, PageId, PageInput};
use crate::tenant::{
    Domain, DomainFilter, DomainId, DomainInput, DomainUpdate, Tenant, TenantId, TenantInput,
};

/// Storage for tenants, domains, pages and blocks.
///
/// Invariants every implementation must uphold:
/// - tenant slugs and domain hosts are globally unique
/// - page slugs are unique per tenant
/// - at most one home page and one primary domain per tenant
/// - deleting a tenant removes its domains, pages and blocks;
///   deleting a page removes its blocks
///
/// # Errors
/// - `Error::Validation` for input that breaks a field rule
/// - `Error::Conflict` for uniqueness violations
/// - `Error::TenantNotFound` / `DomainNotFound` / `PageNotFound` /
///   `BlockNotFound` when an id does not exist
/// - `Error::Database` for backend failures
#[async_trait]
pub trait ContentStore: Send + Sync {
    // Tenants

    async fn create_tenant(&self, input: TenantInput) -> Result<Tenant>;

    async fn get_tenant(&self, id: TenantId) -> Result<Tenant>;

    /// Look a tenant up by its (already lower-cased) slug
    async fn find_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>>;

    /// Look a tenant up through its domain table entry
    async fn find_tenant_by_host(&self, host: &str) -> Result<Option<Tenant>>;

    /// All tenants ordered by slug, optionally narrowed by a
    /// case-insensitive search over slug and name
    async fn list_tenants(&self, search: Option<&str>) -> Result<Vec<Tenant>>;

    async fn update_tenant(&self, id: TenantId, input: TenantInput) -> Result<Tenant>;

    async fn delete_tenant(&self, id: TenantId) -> Result<()>;

    // Domains

    /// Attach a domain; a fresh verification token is generated
    async fn add_domain(&self, tenant_id: TenantId, input: DomainInput) -> Result<Domain>;

    async fn get_domain(&self, id: DomainId) -> Result<Domain>;

    async fn find_domain_by_host(&self, host: &str) -> Result<Option<Domain>>;

    /// Domains ordered by host
    async fn list_domains(&self, filter: DomainFilter) -> Result<Vec<Domain>>;

    async fn update_domain(&self, id: DomainId, update: DomainUpdate) -> Result<Domain>;

    /// Mark a domain active and stamp its verification time
    async fn verify_domain(&self, id: DomainId) -> Result<Domain>;

    async fn delete_domain(&self, id: DomainId) -> Result<()>;

    // Pages

    async fn create_page(&self, input: PageInput) -> Result<Page>;

    async fn update_page(&self, id: PageId, input: PageInput) -> Result<Page>;

    async fn get_page(&self, id: PageId) -> Result<Page>;

    async fn delete_page(&self, id: PageId) -> Result<()>;

    /// Pages ordered by tenant slug, nav order and title
    async fn list_pages(&self, filter: PageFilter) -> Result<Vec<Page>>;

    /// The tenant's published home page
    async fn find_home_page(&self, tenant_id: TenantId) -> Result<Option<Page>>;

    /// The tenant's first published page by nav order, then title
    async fn first_published_page(&self, tenant_id: TenantId) -> Result<Option<Page>>;

    async fn find_published_page(&self, tenant_id: TenantId, slug: &str) -> Result<Option<Page>>;

    /// Navigation for the tenant's published pages, ordered by nav order, then title
    async fn nav_pages(&self, tenant_id: TenantId) -> Result<Vec<NavEntry>>;

    /// Publish the selected pages, stamping first publication where missing.
    ///
    /// Returns how many pages changed; pages already published with a
    /// timestamp are not counted. Unknown ids are ignored.
    async fn publish_pages(&self, ids: &[PageId]) -> Result<u64>;

    /// Unpublish the selected pages, keeping `published_at` as history.
    ///
    /// Returns how many selected pages exist.
    async fn unpublish_pages(&self, ids: &[PageId]) -> Result<u64>;

    /// Make each selected page its tenant's home, in order; the last page of
    /// a tenant wins. Returns how many selected pages exist.
    async fn make_home(&self, ids: &[PageId]) -> Result<u64>;

    // Blocks

    /// Blocks of a page ordered by `(order, id)`
    async fn list_blocks(&self, page_id: PageId) -> Result<Vec<Block>>;

    async fn add_block(&self, page_id: PageId, input: BlockInput) -> Result<Block>;

    async fn update_block(&self, id: BlockId, input: BlockInput) -> Result<Block>;

    async fn delete_block(&self, id: BlockId) -> Result<()>;

    /// Atomically swap a page's whole block set
    async fn replace_blocks(&self, page_id: PageId, blocks: Vec<BlockInput>) -> Result<Vec<Block>>;

    // Health

    /// Check the backing store is reachable
    async fn ping(&self) -> Result<()>;
}
