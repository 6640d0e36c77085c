//! SqliteContentStore - ContentStore trait implementation for SQLite storage

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Executor, QueryBuilder, Row, Sqlite};
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use pagehost_core::{
    Block, BlockId, BlockInput, BlockKind, ContentStore, Domain, DomainFilter, DomainId,
    DomainInput, DomainStatus, DomainUpdate, Error, NavEntry, Page, PageFilter, PageId,
    PageInput, Result, Tenant, TenantId, TenantInput,
    slug::normalize_domain_host,
    tenant::generate_verify_token,
};

const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tenants (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        created_at TIMESTAMP NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS domains (
        id TEXT PRIMARY KEY,
        tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
        host TEXT NOT NULL UNIQUE,
        is_primary BOOLEAN NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'active', 'error')),
        verify_token TEXT NOT NULL,
        verified_at TIMESTAMP,
        created_at TIMESTAMP NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_domains_tenant ON domains(tenant_id)",
    r#"
    CREATE TABLE IF NOT EXISTS pages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
        slug TEXT NOT NULL,
        title TEXT NOT NULL,
        is_published BOOLEAN NOT NULL DEFAULT 0,
        published_at TIMESTAMP,
        is_home BOOLEAN NOT NULL DEFAULT 0,
        nav_label TEXT NOT NULL DEFAULT '',
        nav_order INTEGER NOT NULL DEFAULT 0 CHECK (nav_order >= 0),
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        UNIQUE (tenant_id, slug)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_pages_tenant_nav ON pages(tenant_id, is_published, nav_order, title)",
    r#"
    CREATE TABLE IF NOT EXISTS blocks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        page_id INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
        kind TEXT NOT NULL CHECK (kind IN ('hero', 'image')),
        sort_order INTEGER NOT NULL DEFAULT 0 CHECK (sort_order >= 0),
        data TEXT NOT NULL DEFAULT '{}'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_blocks_page ON blocks(page_id, sort_order, id)",
];

macro_rules! tenant_select {
    ($tail:literal) => {
        concat!(
            "SELECT t.id AS id, t.name AS name, t.slug AS slug, t.created_at AS created_at ",
            "FROM tenants t ",
            $tail
        )
    };
}

macro_rules! domain_select {
    ($tail:literal) => {
        concat!(
            "SELECT d.id AS id, d.tenant_id AS tenant_id, d.host AS host, ",
            "d.is_primary AS is_primary, d.status AS status, d.verify_token AS verify_token, ",
            "d.verified_at AS verified_at, d.created_at AS created_at ",
            "FROM domains d ",
            $tail
        )
    };
}

macro_rules! page_select {
    ($tail:literal) => {
        concat!(
            "SELECT p.id AS id, p.tenant_id AS tenant_id, p.slug AS slug, p.title AS title, ",
            "p.is_published AS is_published, p.published_at AS published_at, ",
            "p.is_home AS is_home, p.nav_label AS nav_label, p.nav_order AS nav_order, ",
            "p.created_at AS created_at, p.updated_at AS updated_at ",
            "FROM pages p ",
            $tail
        )
    };
}

macro_rules! block_select {
    ($tail:literal) => {
        concat!(
            "SELECT b.id AS id, b.page_id AS page_id, b.kind AS kind, ",
            "b.sort_order AS sort_order, b.data AS data ",
            "FROM blocks b ",
            $tail
        )
    };
}

/// SQLite-backed content store
///
/// Every multi-row invariant (single home page, single primary domain,
/// block set replacement) runs inside one transaction.
#[derive(Clone)]
pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
    /// Open (or create) a database file and bring its schema up to date
    ///
    /// # Errors
    /// - `Error::Database` if the file cannot be opened or the schema version
    ///   is not supported
    pub async fn new(db_path: impl Into<PathBuf>, max_connections: u32) -> Result<Self> {
        let db_path = db_path.into();

        // Create directory if needed
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&db_path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
                    .foreign_keys(true),
            )
            .await
            .map_err(db_error("Failed to open SQLite database"))?;

        info!(path = %db_path.display(), "Opened content database");
        Self::from_pool(pool).await
    }

    /// Private in-memory database, mainly for tests
    ///
    /// The pool is pinned to a single connection that never expires, since
    /// every SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(db_error("Invalid in-memory connection string"))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to open in-memory database"))?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, initializing the schema
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn initialize_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error("Failed to initialize schema"))?;
        }

        sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
            .bind(SCHEMA_VERSION)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to record schema version"))?;

        let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to read schema version"))?;

        if version != SCHEMA_VERSION {
            return Err(Error::Database(format!(
                "Unsupported schema version: {}",
                version
            )));
        }

        debug!(version, "Content schema ready");
        Ok(())
    }
}

fn db_error(context: &str) -> impl FnOnce(sqlx::Error) -> Error + '_ {
    move |e| Error::Database(format!("{}: {}", context, e))
}

/// Map a failed write, turning unique-constraint violations into conflicts
fn write_error(e: sqlx::Error, conflict: impl FnOnce() -> String) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict(conflict()),
        _ => Error::Database(e.to_string()),
    }
}

fn col<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| Error::Database(format!("Failed to read column '{}': {}", name, e)))
}

fn uuid_col(row: &SqliteRow, name: &str) -> Result<Uuid> {
    let raw: String = col(row, name)?;
    Uuid::parse_str(&raw)
        .map_err(|e| Error::Database(format!("Invalid UUID in column '{}': {}", name, e)))
}

fn u32_col(row: &SqliteRow, name: &str) -> Result<u32> {
    let raw: i64 = col(row, name)?;
    u32::try_from(raw)
        .map_err(|_| Error::Database(format!("Value out of range in column '{}': {}", name, raw)))
}

fn tenant_from_row(row: &SqliteRow) -> Result<Tenant> {
    Ok(Tenant {
        id: TenantId::from_uuid(uuid_col(row, "id")?),
        name: col(row, "name")?,
        slug: col(row, "slug")?,
        created_at: col(row, "created_at")?,
    })
}

fn domain_from_row(row: &SqliteRow) -> Result<Domain> {
    let id: String = col(row, "id")?;
    let status: String = col(row, "status")?;
    Ok(Domain {
        id: DomainId::from_string(&id)?,
        tenant_id: TenantId::from_uuid(uuid_col(row, "tenant_id")?),
        host: col(row, "host")?,
        is_primary: col(row, "is_primary")?,
        status: DomainStatus::from_str(&status)?,
        verify_token: col(row, "verify_token")?,
        verified_at: col(row, "verified_at")?,
        created_at: col(row, "created_at")?,
    })
}

fn page_from_row(row: &SqliteRow) -> Result<Page> {
    Ok(Page {
        id: col(row, "id")?,
        tenant_id: TenantId::from_uuid(uuid_col(row, "tenant_id")?),
        slug: col(row, "slug")?,
        title: col(row, "title")?,
        is_published: col(row, "is_published")?,
        published_at: col(row, "published_at")?,
        is_home: col(row, "is_home")?,
        nav_label: col(row, "nav_label")?,
        nav_order: u32_col(row, "nav_order")?,
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

fn block_from_row(row: &SqliteRow) -> Result<Block> {
    let kind: String = col(row, "kind")?;
    let data: String = col(row, "data")?;
    Ok(Block {
        id: col(row, "id")?,
        page_id: col(row, "page_id")?,
        kind: BlockKind::from_str(&kind)?,
        order: u32_col(row, "sort_order")?,
        data: serde_json::from_str(&data)?,
    })
}

/// `%term%` for a case-insensitive LIKE, with wildcards in the term escaped
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn search_term(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(like_pattern)
}

async fn ensure_tenant<'e, E>(executor: E, id: TenantId) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("SELECT 1 FROM tenants WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(executor)
        .await
        .map_err(db_error("Failed to look up tenant"))?
        .map(|_| ())
        .ok_or_else(|| Error::TenantNotFound(id.to_string()))
}

async fn ensure_page<'e, E>(executor: E, id: PageId) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("SELECT 1 FROM pages WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(db_error("Failed to look up page"))?
        .map(|_| ())
        .ok_or_else(|| Error::PageNotFound(id.to_string()))
}

async fn fetch_domain<'e, E>(executor: E, id: DomainId) -> Result<Option<Domain>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(domain_select!("WHERE d.id = ?"))
        .bind(id.to_string())
        .fetch_optional(executor)
        .await
        .map_err(db_error("Failed to load domain"))?
        .as_ref()
        .map(domain_from_row)
        .transpose()
}

async fn fetch_page<'e, E>(executor: E, id: PageId) -> Result<Option<Page>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(page_select!("WHERE p.id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(db_error("Failed to load page"))?
        .as_ref()
        .map(page_from_row)
        .transpose()
}

async fn fetch_block<'e, E>(executor: E, id: BlockId) -> Result<Option<Block>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(block_select!("WHERE b.id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(db_error("Failed to load block"))?
        .as_ref()
        .map(block_from_row)
        .transpose()
}

/// Unset the home flag on every other page of the tenant
async fn clear_other_homes<'e, E>(executor: E, tenant_id: TenantId, keep: PageId) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE pages SET is_home = 0 WHERE tenant_id = ? AND is_home = 1 AND id != ?")
        .bind(tenant_id.to_string())
        .bind(keep)
        .execute(executor)
        .await
        .map_err(db_error("Failed to clear home page"))?;
    Ok(())
}

/// Unset the primary flag on every other domain of the tenant
async fn clear_other_primaries<'e, E>(
    executor: E,
    tenant_id: TenantId,
    keep: DomainId,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE domains SET is_primary = 0 WHERE tenant_id = ? AND is_primary = 1 AND id != ?",
    )
    .bind(tenant_id.to_string())
    .bind(keep.to_string())
    .execute(executor)
    .await
    .map_err(db_error("Failed to clear primary domain"))?;
    Ok(())
}

async fn insert_block<'e, E>(executor: E, page_id: PageId, input: &BlockInput) -> Result<BlockId>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result =
        sqlx::query("INSERT INTO blocks (page_id, kind, sort_order, data) VALUES (?, ?, ?, ?)")
            .bind(page_id)
            .bind(input.kind.as_str())
            .bind(i64::from(input.order))
            .bind(input.data.to_string())
            .execute(executor)
            .await
            .map_err(db_error("Failed to insert block"))?;
    Ok(result.last_insert_rowid())
}

/// Selected ids with repeats removed, first occurrence kept in place
fn distinct_ids(ids: &[PageId]) -> Vec<PageId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn page_conflict(slug: &str) -> impl FnOnce() -> String + '_ {
    move || format!("page slug '{}' already exists for this tenant", slug)
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn create_tenant(&self, input: TenantInput) -> Result<Tenant> {
        let input = input.normalize()?;
        let tenant = Tenant {
            id: TenantId::new(),
            name: input.name,
            slug: input.slug,
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO tenants (id, name, slug, created_at) VALUES (?, ?, ?, ?)")
            .bind(tenant.id.to_string())
            .bind(&tenant.name)
            .bind(&tenant.slug)
            .bind(tenant.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, || format!("tenant slug '{}' is already taken", tenant.slug)))?;

        info!(tenant = %tenant.slug, id = %tenant.id, "Created tenant");
        Ok(tenant)
    }

    async fn get_tenant(&self, id: TenantId) -> Result<Tenant> {
        sqlx::query(tenant_select!("WHERE t.id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load tenant"))?
            .as_ref()
            .map(tenant_from_row)
            .transpose()?
            .ok_or_else(|| Error::TenantNotFound(id.to_string()))
    }

    async fn find_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>> {
        sqlx::query(tenant_select!("WHERE t.slug = ?"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to look up tenant by slug"))?
            .as_ref()
            .map(tenant_from_row)
            .transpose()
    }

    async fn find_tenant_by_host(&self, host: &str) -> Result<Option<Tenant>> {
        sqlx::query(tenant_select!(
            "JOIN domains d ON d.tenant_id = t.id WHERE d.host = ?"
        ))
        .bind(host)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to look up tenant by host"))?
        .as_ref()
        .map(tenant_from_row)
        .transpose()
    }

    async fn list_tenants(&self, search: Option<&str>) -> Result<Vec<Tenant>> {
        let mut query = QueryBuilder::<Sqlite>::new(tenant_select!(""));
        if let Some(pattern) = search_term(search) {
            query
                .push("WHERE (lower(t.slug) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR lower(t.name) LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\') ");
        }
        query.push("ORDER BY t.slug");

        query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list tenants"))?
            .iter()
            .map(tenant_from_row)
            .collect()
    }

    async fn update_tenant(&self, id: TenantId, input: TenantInput) -> Result<Tenant> {
        let input = input.normalize()?;

        let result = sqlx::query("UPDATE tenants SET name = ?, slug = ? WHERE id = ?")
            .bind(&input.name)
            .bind(&input.slug)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, || format!("tenant slug '{}' is already taken", input.slug)))?;

        if result.rows_affected() == 0 {
            return Err(Error::TenantNotFound(id.to_string()));
        }
        self.get_tenant(id).await
    }

    async fn delete_tenant(&self, id: TenantId) -> Result<()> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete tenant"))?;

        if result.rows_affected() == 0 {
            return Err(Error::TenantNotFound(id.to_string()));
        }
        info!(id = %id, "Deleted tenant");
        Ok(())
    }

    async fn add_domain(&self, tenant_id: TenantId, input: DomainInput) -> Result<Domain> {
        let input = input.normalize()?;
        let domain = Domain {
            id: DomainId::new(),
            tenant_id,
            host: input.host,
            is_primary: input.is_primary,
            status: input.status,
            verify_token: generate_verify_token(),
            verified_at: None,
            created_at: Utc::now(),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        ensure_tenant(&mut *tx, tenant_id).await?;

        sqlx::query(
            r#"
            INSERT INTO domains (id, tenant_id, host, is_primary, status, verify_token, verified_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(domain.id.to_string())
        .bind(tenant_id.to_string())
        .bind(&domain.host)
        .bind(domain.is_primary)
        .bind(domain.status.as_str())
        .bind(&domain.verify_token)
        .bind(domain.verified_at)
        .bind(domain.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, || format!("host '{}' is already registered", domain.host)))?;

        if domain.is_primary {
            clear_other_primaries(&mut *tx, tenant_id, domain.id).await?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        info!(host = %domain.host, tenant = %tenant_id, "Added domain");
        Ok(domain)
    }

    async fn get_domain(&self, id: DomainId) -> Result<Domain> {
        fetch_domain(&self.pool, id)
            .await?
            .ok_or_else(|| Error::DomainNotFound(id.to_string()))
    }

    async fn find_domain_by_host(&self, host: &str) -> Result<Option<Domain>> {
        sqlx::query(domain_select!("WHERE d.host = ?"))
            .bind(host)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to look up domain"))?
            .as_ref()
            .map(domain_from_row)
            .transpose()
    }

    async fn list_domains(&self, filter: DomainFilter) -> Result<Vec<Domain>> {
        let mut query = QueryBuilder::<Sqlite>::new(domain_select!(
            "JOIN tenants t ON t.id = d.tenant_id WHERE 1 = 1 "
        ));
        if let Some(tenant_id) = filter.tenant_id {
            query
                .push("AND d.tenant_id = ")
                .push_bind(tenant_id.to_string())
                .push(" ");
        }
        if let Some(status) = filter.status {
            query
                .push("AND d.status = ")
                .push_bind(status.as_str())
                .push(" ");
        }
        if let Some(is_primary) = filter.is_primary {
            query
                .push("AND d.is_primary = ")
                .push_bind(is_primary)
                .push(" ");
        }
        if let Some(pattern) = search_term(filter.search.as_deref()) {
            query
                .push("AND (d.host LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR t.slug LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\') ");
        }
        query.push("ORDER BY d.host");

        query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list domains"))?
            .iter()
            .map(domain_from_row)
            .collect()
    }

    async fn update_domain(&self, id: DomainId, update: DomainUpdate) -> Result<Domain> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        let existing = fetch_domain(&mut *tx, id)
            .await?
            .ok_or_else(|| Error::DomainNotFound(id.to_string()))?;

        let host = match update.host {
            Some(host) => normalize_domain_host(&host)?,
            None => existing.host,
        };
        let is_primary = update.is_primary.unwrap_or(existing.is_primary);
        let status = update.status.unwrap_or(existing.status);

        sqlx::query("UPDATE domains SET host = ?, is_primary = ?, status = ? WHERE id = ?")
            .bind(&host)
            .bind(is_primary)
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error(e, || format!("host '{}' is already registered", host)))?;

        if is_primary {
            clear_other_primaries(&mut *tx, existing.tenant_id, id).await?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        self.get_domain(id).await
    }

    async fn verify_domain(&self, id: DomainId) -> Result<Domain> {
        let result =
            sqlx::query("UPDATE domains SET status = 'active', verified_at = ? WHERE id = ?")
                .bind(Utc::now())
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .map_err(db_error("Failed to verify domain"))?;

        if result.rows_affected() == 0 {
            return Err(Error::DomainNotFound(id.to_string()));
        }
        self.get_domain(id).await
    }

    async fn delete_domain(&self, id: DomainId) -> Result<()> {
        let result = sqlx::query("DELETE FROM domains WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete domain"))?;

        if result.rows_affected() == 0 {
            return Err(Error::DomainNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn create_page(&self, input: PageInput) -> Result<Page> {
        let now = Utc::now();
        let page = input.prepare(None, now)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        ensure_tenant(&mut *tx, page.tenant_id).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO pages (
                tenant_id, slug, title, is_published, published_at, is_home,
                nav_label, nav_order, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(page.tenant_id.to_string())
        .bind(&page.slug)
        .bind(&page.title)
        .bind(page.is_published)
        .bind(page.published_at)
        .bind(page.is_home)
        .bind(&page.nav_label)
        .bind(i64::from(page.nav_order))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, page_conflict(&page.slug)))?;

        let id = result.last_insert_rowid();
        if page.is_home {
            clear_other_homes(&mut *tx, page.tenant_id, id).await?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        debug!(id, slug = %page.slug, "Created page");
        self.get_page(id).await
    }

    async fn update_page(&self, id: PageId, input: PageInput) -> Result<Page> {
        let now = Utc::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        let existing = fetch_page(&mut *tx, id)
            .await?
            .ok_or_else(|| Error::PageNotFound(id.to_string()))?;

        let page = input.prepare(existing.published_at, now)?;
        if page.tenant_id != existing.tenant_id {
            ensure_tenant(&mut *tx, page.tenant_id).await?;
        }

        sqlx::query(
            r#"
            UPDATE pages
            SET tenant_id = ?, slug = ?, title = ?, is_published = ?, published_at = ?,
                is_home = ?, nav_label = ?, nav_order = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(page.tenant_id.to_string())
        .bind(&page.slug)
        .bind(&page.title)
        .bind(page.is_published)
        .bind(page.published_at)
        .bind(page.is_home)
        .bind(&page.nav_label)
        .bind(i64::from(page.nav_order))
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, page_conflict(&page.slug)))?;

        if page.is_home {
            clear_other_homes(&mut *tx, page.tenant_id, id).await?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        self.get_page(id).await
    }

    async fn get_page(&self, id: PageId) -> Result<Page> {
        fetch_page(&self.pool, id)
            .await?
            .ok_or_else(|| Error::PageNotFound(id.to_string()))
    }

    async fn delete_page(&self, id: PageId) -> Result<()> {
        let result = sqlx::query("DELETE FROM pages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete page"))?;

        if result.rows_affected() == 0 {
            return Err(Error::PageNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_pages(&self, filter: PageFilter) -> Result<Vec<Page>> {
        let mut query = QueryBuilder::<Sqlite>::new(page_select!(
            "JOIN tenants t ON t.id = p.tenant_id WHERE 1 = 1 "
        ));
        if let Some(tenant_id) = filter.tenant_id {
            query
                .push("AND p.tenant_id = ")
                .push_bind(tenant_id.to_string())
                .push(" ");
        }
        if let Some(is_published) = filter.is_published {
            query
                .push("AND p.is_published = ")
                .push_bind(is_published)
                .push(" ");
        }
        if let Some(is_home) = filter.is_home {
            query.push("AND p.is_home = ").push_bind(is_home).push(" ");
        }
        if let Some(pattern) = search_term(filter.search.as_deref()) {
            query
                .push("AND (lower(p.title) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR lower(p.slug) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR lower(p.nav_label) LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\') ");
        }
        query.push("ORDER BY t.slug, p.nav_order, p.title");

        query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list pages"))?
            .iter()
            .map(page_from_row)
            .collect()
    }

    async fn find_home_page(&self, tenant_id: TenantId) -> Result<Option<Page>> {
        sqlx::query(page_select!(
            "WHERE p.tenant_id = ? AND p.is_home = 1 AND p.is_published = 1 LIMIT 1"
        ))
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load home page"))?
        .as_ref()
        .map(page_from_row)
        .transpose()
    }

    async fn first_published_page(&self, tenant_id: TenantId) -> Result<Option<Page>> {
        sqlx::query(page_select!(
            "WHERE p.tenant_id = ? AND p.is_published = 1 ORDER BY p.nav_order, p.title, p.id LIMIT 1"
        ))
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load first published page"))?
        .as_ref()
        .map(page_from_row)
        .transpose()
    }

    async fn find_published_page(&self, tenant_id: TenantId, slug: &str) -> Result<Option<Page>> {
        sqlx::query(page_select!(
            "WHERE p.tenant_id = ? AND p.slug = ? AND p.is_published = 1"
        ))
        .bind(tenant_id.to_string())
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load page by slug"))?
        .as_ref()
        .map(page_from_row)
        .transpose()
    }

    async fn nav_pages(&self, tenant_id: TenantId) -> Result<Vec<NavEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT slug, nav_label, is_home, title
            FROM pages
            WHERE tenant_id = ? AND is_published = 1
            ORDER BY nav_order, title
            "#,
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load navigation"))?;

        rows.iter()
            .map(|row| {
                Ok(NavEntry {
                    slug: col(row, "slug")?,
                    nav_label: col(row, "nav_label")?,
                    is_home: col(row, "is_home")?,
                    title: col(row, "title")?,
                })
            })
            .collect()
    }

    async fn publish_pages(&self, ids: &[PageId]) -> Result<u64> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        let mut updated = 0;
        for id in distinct_ids(ids) {
            let Some(page) = fetch_page(&mut *tx, id).await? else {
                continue;
            };
            if page.is_published && page.published_at.is_some() {
                continue;
            }

            sqlx::query(
                r#"
                UPDATE pages
                SET is_published = 1, published_at = COALESCE(published_at, ?), updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to publish page"))?;
            updated += 1;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        info!(selected = ids.len(), updated, "Published pages");
        Ok(updated)
    }

    async fn unpublish_pages(&self, ids: &[PageId]) -> Result<u64> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        let mut updated = 0;
        for id in distinct_ids(ids) {
            let result =
                sqlx::query("UPDATE pages SET is_published = 0, updated_at = ? WHERE id = ?")
                    .bind(now)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error("Failed to unpublish page"))?;
            updated += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        info!(selected = ids.len(), updated, "Unpublished pages");
        Ok(updated)
    }

    async fn make_home(&self, ids: &[PageId]) -> Result<u64> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        let mut updated = 0;
        for id in distinct_ids(ids) {
            let Some(page) = fetch_page(&mut *tx, id).await? else {
                continue;
            };

            clear_other_homes(&mut *tx, page.tenant_id, id).await?;
            sqlx::query("UPDATE pages SET is_home = 1, updated_at = ? WHERE id = ?")
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to set home page"))?;
            updated += 1;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        info!(selected = ids.len(), updated, "Set home pages");
        Ok(updated)
    }

    async fn list_blocks(&self, page_id: PageId) -> Result<Vec<Block>> {
        sqlx::query(block_select!("WHERE b.page_id = ? ORDER BY b.sort_order, b.id"))
            .bind(page_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list blocks"))?
            .iter()
            .map(block_from_row)
            .collect()
    }

    async fn add_block(&self, page_id: PageId, input: BlockInput) -> Result<Block> {
        input.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        ensure_page(&mut *tx, page_id).await?;
        let id = insert_block(&mut *tx, page_id, &input).await?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        Ok(Block {
            id,
            page_id,
            kind: input.kind,
            order: input.order,
            data: input.data,
        })
    }

    async fn update_block(&self, id: BlockId, input: BlockInput) -> Result<Block> {
        input.validate()?;

        let result = sqlx::query("UPDATE blocks SET kind = ?, sort_order = ?, data = ? WHERE id = ?")
            .bind(input.kind.as_str())
            .bind(i64::from(input.order))
            .bind(input.data.to_string())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update block"))?;

        if result.rows_affected() == 0 {
            return Err(Error::BlockNotFound(id.to_string()));
        }
        fetch_block(&self.pool, id)
            .await?
            .ok_or_else(|| Error::BlockNotFound(id.to_string()))
    }

    async fn delete_block(&self, id: BlockId) -> Result<()> {
        let result = sqlx::query("DELETE FROM blocks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete block"))?;

        if result.rows_affected() == 0 {
            return Err(Error::BlockNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn replace_blocks(&self, page_id: PageId, blocks: Vec<BlockInput>) -> Result<Vec<Block>> {
        for block in &blocks {
            block.validate()?;
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        ensure_page(&mut *tx, page_id).await?;

        sqlx::query("DELETE FROM blocks WHERE page_id = ?")
            .bind(page_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to clear blocks"))?;

        for block in &blocks {
            insert_block(&mut *tx, page_id, block).await?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        debug!(page_id, count = blocks.len(), "Replaced blocks");
        self.list_blocks(page_id).await
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error("Database ping failed"))?;
        Ok(())
    }
}
