use std::sync::Arc;

use comment_tree::{
    App,
    config::{LogFormat, ServerConfig, Storage},
    router,
    store::{CommentStore, memory::MemoryCommentStore, postgres::PgCommentStore},
};
use dotenv::dotenv;
use eyre::WrapErr;
use mimalloc::MiMalloc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "comment_tree=info,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn open_store(storage: &Storage) -> eyre::Result<Arc<dyn CommentStore>> {
    match storage {
        Storage::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PgCommentStore::connect(database_url, *max_connections)
                .wrap_err("couldn't build the database pool")?;
            store
                .migrate()
                .await
                .wrap_err("couldn't apply the comments schema")?;
            tracing::info!(max_connections, "Connected to Postgres");
            Ok(Arc::new(store))
        }
        Storage::Memory => {
            tracing::warn!("Using in-memory storage, comments are lost on shutdown");
            Ok(Arc::new(MemoryCommentStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal");
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    let config = ServerConfig::new_from_env()?;
    init_tracing(config.log_format);
    tracing::info!(env = ?config.env, "Starting comment service");

    let store = open_store(&config.storage).await?;

    let app = router(App::new(store))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .wrap_err_with(|| format!("couldn't bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
