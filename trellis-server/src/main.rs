use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trellis_core::{
    MIGRATOR, TaskService,
    database::{PostgresTaskStore, PostgresUserStore},
};
use trellis_server::{
    AppState,
    infra::{
        config::Config, maintenance::spawn_retention_sweep,
        websocket::ConnectionManager,
    },
    routes,
};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "trellis-server")]
#[command(about = "Task tracker server with real-time fan-out to connected sessions")]
struct Args {
    /// Bind address override (otherwise SERVER_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port override (otherwise SERVER_PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
            |_| "trellis_server=info,trellis_core=info,tower_http=info".into(),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(host) = args.host {
        config.server_host = host;
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    MIGRATOR
        .run(&pool)
        .await
        .context("failed to run database migrations")?;
    info!("database migrations up to date");

    let channels = Arc::new(ConnectionManager::new());
    let task_store = Arc::new(PostgresTaskStore::new(pool.clone()));
    let user_store = Arc::new(PostgresUserStore::new(pool.clone()));
    let tasks = Arc::new(TaskService::new(task_store.clone(), channels.clone()));

    let state = AppState {
        tasks,
        users: user_store,
        channels,
        config: Arc::new(config.clone()),
    };

    spawn_retention_sweep(
        task_store,
        chrono::Duration::days(config.task_retention_days),
        Duration::from_secs(config.retention_sweep_interval_secs),
    );

    let cors_origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(cors_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request());

    let app = routes::create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr =
        format!("{}:{}", config.server_host, config.server_port)
            .parse()
            .context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "trellis-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
    }
}
