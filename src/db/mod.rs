//! Postgres pool for the message store.
//!
//! Only built when `DATABASE_URL` is set. The `chat_messages` schema is
//! migrated before the server accepts connections.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Connect to Postgres and apply pending migrations.
///
/// # Errors
///
/// Returns the SQLx error if the database is unreachable or a migration fails.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;
    Ok(pool)
}
