//! Embedded database migrations for `SQLite`.
//!
//! # Example
//!
//! ```rust,ignore
//! use clusteraccess::sqlite::migrations;
//! use sqlx::SqlitePool;
//!
//! async fn setup_database(pool: &SqlitePool) -> Result<(), sqlx::Error> {
//!     migrations::run(pool).await?;
//!     Ok(())
//! }
//! ```

use sqlx::{Executor, SqlitePool};

const MEMBER_MIGRATIONS: &[(&str, &str)] = &[(
    "20250301000001_create_cluster_bindings_table",
    include_str!("../../migrations_sqlite/members/20250301000001_create_cluster_bindings_table.sql"),
)];

/// Runs all pending migrations.
///
/// Applied migrations are tracked in the `_clusteraccess_migrations` table,
/// so calling this on every startup is safe.
pub async fn run(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    pool.execute(
        r"
        CREATE TABLE IF NOT EXISTS _clusteraccess_migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )
        ",
    )
    .await?;

    run_migrations(pool, MEMBER_MIGRATIONS).await
}

/// Runs a set of migrations against the database.
///
/// # Limitations
///
/// Statements are split on `;`, so migrations must not contain semicolons
/// inside string literals.
async fn run_migrations(pool: &SqlitePool, migrations: &[(&str, &str)]) -> Result<(), sqlx::Error> {
    for (name, sql) in migrations {
        let applied: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM _clusteraccess_migrations WHERE name = ?)",
        )
        .bind(*name)
        .fetch_one(pool)
        .await?;

        if applied {
            continue;
        }

        for statement in sql.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                pool.execute(trimmed).await?;
            }
        }

        sqlx::query("INSERT INTO _clusteraccess_migrations (name) VALUES (?)")
            .bind(*name)
            .execute(pool)
            .await?;

        log::info!(target: "clusteraccess", "msg=\"migration applied\", name=\"{name}\"");
    }
    Ok(())
}
