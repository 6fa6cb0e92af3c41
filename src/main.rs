mod app;
mod auth;
mod catalog;
mod config;
mod embedding;
mod index;
mod ingest;
mod matching;
mod models;
mod routes;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::AppState;
use catalog::ShopifyCatalog;
use config::load_settings_from_path;
use embedding::replicate::ReplicateEmbedder;
use index::pinecone::PineconeIndex;
use ingest::IngestPipeline;
use store::postgres::PostgresImageStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting inspmatch server...");

    // Load configuration.
    let settings = load_settings_from_path("inspmatch.toml")?;
    info!(
        "Configuration loaded: environment={}, host={}, port={}",
        settings.environment, settings.host, settings.port
    );

    // Initialize the primary image store.
    let store: Arc<dyn store::ImageStore> = Arc::new(
        PostgresImageStore::new(&settings.postgres_uri, settings.db_pool_size).await?,
    );
    store.initialize().await?;
    info!("Image store initialized");

    // Initialize the secondary index. Missing credentials fail here,
    // before any network call.
    let index: Arc<dyn index::VectorIndex> = Arc::new(PineconeIndex::new(
        &settings.pinecone_api_key,
        &settings.pinecone_index_host,
        &settings.pinecone_namespace,
    )?);
    info!("Vector index initialized: {}", settings.pinecone_index_host);

    // Initialize the embedding provider.
    let embedder: Arc<dyn embedding::EmbeddingProvider> = Arc::new(ReplicateEmbedder::new(
        &settings.embedding_model_version,
        settings.replicate_api_token.clone(),
        settings.vector_dimensions,
        Duration::from_secs(settings.embed_request_timeout_secs),
        Duration::from_secs(settings.prediction_deadline_secs),
    ));
    info!(
        "Embedding provider initialized: {} ({} dims)",
        settings.embedding_model_version,
        embedder.dimensions()
    );

    // Ingestion pipeline.
    let pipeline = IngestPipeline::new(
        embedder.clone(),
        store.clone(),
        index,
        settings.embed_concurrency,
        settings.upsert_batch_size,
    );

    // Catalog client.
    let catalog = ShopifyCatalog::new(
        &settings.shopify_api_version,
        settings.admin_access_token.clone(),
    );
    if !catalog.is_configured() {
        info!("Catalog import disabled (SHOPIFY_ADMIN_TOKEN not set)");
    }

    // Build application state.
    let state = Arc::new(AppState {
        settings: settings.clone(),
        store,
        embedder,
        pipeline,
        catalog,
    });

    // Build router.
    let app = routes::build_router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server.
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
