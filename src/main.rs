use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use vapechat::config::Config;
use vapechat::services::notify::TracingNotifier;
use vapechat::services::store::{ChatStore, MemoryChatStore, PgChatStore};
use vapechat::{db, routes, state};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let store: Arc<dyn ChatStore> = match &config.database_url {
        Some(database_url) => {
            let pool = db::init_pool(database_url, config.db_max_connections)
                .await
                .expect("database init failed");
            Arc::new(PgChatStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; chat history is kept in memory only");
            Arc::new(MemoryChatStore::new())
        }
    };

    let state = state::AppState::new(store, Arc::new(TracingNotifier), config.chat);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "vapechat listening");
    axum::serve(listener, app).await.expect("server failed");
}
