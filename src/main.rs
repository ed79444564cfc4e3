use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use penpal::app::auth::TokenService;
use penpal::app::messages::MessageSettings;
use penpal::config::{AppConfig, AppMode, StoreBackend};
use penpal::http;
use penpal::infra::{cache::RedisCache, db::Db, store::MemoryStore, store::Stores};
use penpal::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    match config.app_mode {
        AppMode::Migrate => {
            let db = Db::connect(&config).await?;
            let applied = db
                .apply_migrations(Path::new(&config.db_migrations_dir))
                .await?;
            tracing::info!(applied, "migrations complete");
        }
        AppMode::Api => {
            let stores = match config.store_backend {
                StoreBackend::Postgres => Stores::postgres(Db::connect(&config).await?),
                StoreBackend::Memory => {
                    tracing::warn!("using in-memory store; data is lost on restart");
                    Stores::memory(Arc::new(MemoryStore::new()))
                }
            };
            let cache = match &config.redis_url {
                Some(url) => Some(RedisCache::connect(url).await?),
                None => {
                    tracing::info!("REDIS_URL not set; rate limiting disabled");
                    None
                }
            };

            let state = AppState {
                stores,
                cache,
                tokens: TokenService::new(config.paseto_access_key, config.token_issuer.clone()),
                messaging: MessageSettings {
                    policy: config.moderation_policy,
                    max_chars: config.message_max_chars,
                    max_attachments: config.message_max_attachments,
                },
                rate_limits: config.rate_limits,
                unread_poll_interval_seconds: config.unread_poll_interval_seconds,
                request_body_limit_bytes: config.request_body_limit_bytes,
            };

            let app: Router = http::router(state).layer(TraceLayer::new_for_http());
            let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
            tracing::info!(
                moderation_policy = ?config.moderation_policy,
                "listening on {}",
                config.http_addr
            );

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
