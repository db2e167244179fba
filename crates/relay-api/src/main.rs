use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relay_api::{app::build_router, config::Config, state::AppState};
use relay_llm::OpenAIClient;
use relay_persist::{RedisBus, StoreBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting SSE relay server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let shutdown = CancellationToken::new();
    let mut state = AppState::new(config.clone(), shutdown.clone());

    match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database");
            let store = StoreBuilder::new()
                .database_url(url)
                .max_connections(config.database.max_connections)
                .acquire_timeout(Duration::from_millis(config.database.acquire_timeout_ms))
                .run_migrations(config.database.run_migrations)
                .build()
                .await?;
            state = state.with_store(Arc::new(store));
            tracing::info!("Database connected");
        }
        None => tracing::warn!("DATABASE_URL is not set; database streams are disabled"),
    }

    match &config.redis_url {
        Some(url) => {
            tracing::info!("Connecting to Redis");
            let bus = RedisBus::connect(url).await?;
            state = state.with_bus(Arc::new(bus));
            tracing::info!("Redis connected");
        }
        None => tracing::warn!("REDIS_URL is not set; pub/sub streams are disabled"),
    }

    match &config.openai_api_key {
        Some(key) => {
            let mut client = OpenAIClient::new(key.clone())?;
            if let Some(base_url) = &config.llm.base_url {
                client = client.with_base_url(base_url.clone());
            }
            state = state.with_chat(Arc::new(client));
        }
        None => tracing::warn!("OPENAI_API_KEY is not set; chat streams will report an error"),
    }

    let app = build_router(Arc::new(state));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api/docs", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown))
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM after cancelling every open session
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received, closing streams");
    shutdown.cancel();
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        }
        _ => {
            registry.with(tracing_subscriber::fmt::layer().pretty()).init();
        }
    }
}
