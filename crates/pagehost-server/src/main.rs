//! PageHost Server - multi-tenant page hosting
//!
//! Usage:
//! ```bash
//! # With config file
//! pagehost-server --config pagehost.yaml
//!
//! # Or with environment variables (they override the config file)
//! PAGEHOST_ADMIN_TOKEN=changeme PAGEHOST_SECRET_KEY=... pagehost-server
//!
//! # Create a tenant and attach a domain
//! pagehost-server create-tenant --slug acme --name "Acme" --host acme.localhost
//!
//! # Print a preview link for a draft page
//! pagehost-server preview-link --page-id 12 --base-url https://acme.example
//! ```

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pagehost_core::{ContentStore, DomainInput, DomainStatus, PreviewSigner, TenantInput};
use pagehost_observability::metrics::Metrics;
use pagehost_server::{AppState, ServerConfig, build_router};
use pagehost_store_sqlite::SqliteContentStore;

/// PageHost Server - one process, many tenant sites
#[derive(Parser)]
#[command(name = "pagehost-server")]
#[command(about = "Multi-tenant page hosting server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (YAML or TOML)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "PAGEHOST_CONFIG",
        global = true
    )]
    config: Option<String>,

    /// Port to listen on (overrides config and environment)
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// SQLite database path (overrides config and environment)
    #[arg(long, value_name = "PATH", global = true)]
    database: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server (default if no command specified)
    Serve,
    /// Create a tenant, optionally attaching domains
    CreateTenant {
        /// Tenant slug (lower-case letters, digits, '-' and '_')
        #[arg(long)]
        slug: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Hostname to attach; the first one becomes the primary domain
        #[arg(long = "host", value_name = "HOST")]
        hosts: Vec<String>,
    },
    /// Print a signed preview URL for a page
    PreviewLink {
        #[arg(long)]
        page_id: i64,

        /// Site origin the link should point at
        #[arg(long, default_value = "http://localhost:8080")]
        base_url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    // Environment overrides the file, CLI flags override both
    config.merge_env();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(database) = cli.database {
        config.database.path = database;
    }

    init_tracing(&config)?;
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path);
    }

    let db_path = config.database_path();
    let store: Arc<dyn ContentStore> = Arc::new(
        SqliteContentStore::new(&db_path, config.database.max_connections)
            .await
            .with_context(|| format!("Failed to open database {}", db_path.display()))?,
    );

    match cli.command {
        Some(Commands::CreateTenant { slug, name, hosts }) => {
            create_tenant(store.as_ref(), slug, name, hosts).await
        }
        Some(Commands::PreviewLink { page_id, base_url }) => {
            preview_link(&config, store.as_ref(), page_id, &base_url).await
        }
        Some(Commands::Serve) | None => serve(config, store).await,
    }
}

/// Initialize tracing with configured level and sqlx query control
fn init_tracing(config: &ServerConfig) -> anyhow::Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::new(format!("{}", log_level));

    // sqlx logs every statement at debug; keep it at warn unless asked for
    if !config.logging.log_sql_queries {
        match "sqlx=warn".parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Failed to set sqlx log filter: {}", e),
        }
    }

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

async fn serve(config: ServerConfig, store: Arc<dyn ContentStore>) -> anyhow::Result<()> {
    let metrics = Arc::new(Metrics::new().context("Failed to register metrics")?);
    let signer = PreviewSigner::new(config.signing_key(), config.preview_max_age()?);

    if config.admin.token.is_none() {
        warn!("No admin token configured; the admin API will reject every request");
    }

    let state = AppState::new(store, signer, metrics, config.admin.token.clone());
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("PageHost listening on http://{}", addr);
    info!("   Admin API:          http://{}/admin/api", addr);
    info!("   Health check:       http://{}/healthz", addr);
    info!("   Readiness check:    http://{}/readyz", addr);
    info!("   Prometheus metrics: http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn create_tenant(
    store: &dyn ContentStore,
    slug: String,
    name: String,
    hosts: Vec<String>,
) -> anyhow::Result<()> {
    let tenant = store.create_tenant(TenantInput { name, slug }).await?;
    println!("Created tenant {} ({})", tenant, tenant.id);

    for (i, host) in hosts.into_iter().enumerate() {
        let domain = store
            .add_domain(
                tenant.id,
                DomainInput {
                    host,
                    is_primary: i == 0,
                    status: DomainStatus::Active,
                },
            )
            .await?;
        println!(
            "  domain {}{}",
            domain.host,
            if domain.is_primary { " (primary)" } else { "" }
        );
    }

    Ok(())
}

async fn preview_link(
    config: &ServerConfig,
    store: &dyn ContentStore,
    page_id: i64,
    base_url: &str,
) -> anyhow::Result<()> {
    if config.secret_key.is_none() {
        anyhow::bail!(
            "preview links need a fixed secret_key (set PAGEHOST_SECRET_KEY) so the server can verify them"
        );
    }

    let page = store.get_page(page_id).await?;
    let signer = PreviewSigner::new(config.signing_key(), config.preview_max_age()?);
    let token = signer.sign(page.id, Utc::now());

    println!(
        "{}/__preview/{}/",
        base_url.trim_end_matches('/'),
        token
    );
    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
