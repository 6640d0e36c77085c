//! PageHost Core Types and Traits
//!
//! This crate provides the fundamental pieces of the multi-tenant site:
//! - Tenant, domain, page and block types with their validation rules
//! - The `ContentStore` trait implemented by storage backends
//! - Tenant resolution from request host or slug override
//! - Page selection (home fallback chain, slug lookup, signed preview)
//! - Core error types

pub mod directory;
pub mod error;
pub mod page;
pub mod preview;
pub mod resolver;
pub mod slug;
pub mod store;
pub mod tenant;

pub use directory::{ResolvedBy, ResolvedTenant, TenantDirectory};
pub use error::{Error, Result};
pub use page::{
    Block, BlockId, BlockInput, BlockKind, NavEntry, Page, PageAction, PageFilter, PageId,
    PageInput, PreparedPage,
};
pub use preview::{PreviewSigner, PreviewTokenError};
pub use resolver::{PageResolver, RenderedPage};
pub use store::ContentStore;
pub use tenant::{
    Domain, DomainFilter, DomainId, DomainInput, DomainStatus, DomainUpdate, Tenant, TenantId,
    TenantInput,
};
