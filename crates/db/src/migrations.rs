use sqlx::PgPool;

/// Embeds and applies the SQL migrations under `crates/db/migrations/` at
/// startup. `sqlx::migrate!` tracks applied versions in its own
/// `_sqlx_migrations` table, so this is safe to call on every connect.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
  sqlx::migrate!("./migrations").run(pool).await
}
