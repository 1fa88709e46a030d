//! amr-catalog - AMR surveillance resource catalog service
//!
//! Serves the public catalog (browse/filter/search), accepts submissions,
//! runs the admin moderation workflow, and hosts the AI extraction pipeline.

use amr_common::config::ServiceConfig;
use amr_common::taxonomy::Taxonomy;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use amr_catalog::extract::{AnthropicClassifier, DocumentClassifier};
use amr_catalog::AppState;

#[derive(Debug, Parser)]
#[command(name = "amr-catalog", about = "AMR surveillance resource catalog service")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, env = "AMR_CATALOG_CONFIG", default_value = "amr-catalog.toml")]
    config: PathBuf,

    /// Override the configured port
    #[arg(long, env = "AMR_CATALOG_PORT")]
    port: Option<u16>,

    /// Override the configured database path
    #[arg(long, env = "AMR_CATALOG_DB")]
    database: Option<PathBuf>,

    /// Override the configured taxonomy document path
    #[arg(long, env = "AMR_CATALOG_TAXONOMY")]
    taxonomy: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    info!("Starting amr-catalog");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = ServiceConfig::load(&args.config)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(taxonomy) = args.taxonomy {
        config.taxonomy_path = taxonomy;
    }

    // The taxonomy degrades to empty on failure; the service still starts
    // and hierarchy-dependent endpoints answer 503.
    let taxonomy = Arc::new(Taxonomy::load(&config.taxonomy_path));
    if !taxonomy.available() {
        warn!("Running without a taxonomy; submissions cannot be validated until one is provided");
    }

    info!("Database: {}", config.database_path.display());
    let db_pool = amr_catalog::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    let classifier: Option<Arc<dyn DocumentClassifier>> =
        match AnthropicClassifier::from_config(&config.classifier) {
            Some(classifier) => {
                info!(model = %config.classifier.model, "Extraction classifier configured");
                Some(Arc::new(classifier))
            }
            None => {
                warn!("No classifier API key; AI extraction endpoints disabled");
                None
            }
        };

    if config.admin.password.is_none() || config.admin.token.is_none() {
        warn!("Admin credentials not fully configured; admin endpoints disabled");
    }

    let http_client =
        amr_catalog::fetch_client(Duration::from_secs(config.classifier.timeout_secs))?;

    let state = AppState::new(
        db_pool,
        taxonomy,
        classifier,
        http_client,
        config.admin.password.clone(),
        config.admin.token.clone(),
    );
    let app = amr_catalog::build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
