//! SQLite content storage for PageHost
//!
//! This crate implements the `ContentStore` trait on top of a single SQLite
//! database accessed through sqlx.
//!
//! # Features
//! - Schema created on first connect, with a version check
//! - Foreign keys with cascading deletes (tenant → domains/pages → blocks)
//! - Uniqueness enforced by the schema and reported as `Error::Conflict`
//! - Multi-row invariants (single home page, single primary domain) applied
//!   inside transactions
//!
//! # Example
//! ```no_run
//! # use pagehost_store_sqlite::SqliteContentStore;
//! # async fn example() -> pagehost_core::Result<()> {
//! let store = SqliteContentStore::new("./data/pagehost.db", 5).await?;
//! # Ok(())
//! # }
//! ```

mod sqlite_content_store;

pub use sqlite_content_store::SqliteContentStore;
