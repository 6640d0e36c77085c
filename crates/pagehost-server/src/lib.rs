//! PageHost HTTP server
//!
//! Serves every tenant's public site from one process and exposes a JSON
//! admin API for managing tenants, domains, pages and blocks.
//!
//! Routes:
//! - `/`, `/{slug}/`, `/sitemap.xml` - public site of the resolved tenant
//! - `/__preview/{token}/` - signed preview of any page
//! - `/admin/api/...` - admin API (bearer token)
//! - `/healthz`, `/readyz`, `/metrics` - operational endpoints

pub mod admin;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod render;
pub mod site;

pub use app::{AppState, build_router};
pub use config::ServerConfig;
