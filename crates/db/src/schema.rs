//! Idempotent schema bootstrap driven by module migrations

use bookshelf_kernel::Migration;

use crate::error::PersistenceError;
use crate::pool::Database;

const BOOKKEEPING_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _schema_migrations (
        module     TEXT        NOT NULL,
        id         TEXT        NOT NULL,
        applied_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (module, id)
    )
"#;

impl Database {
    /// Ensure every declared table exists.
    ///
    /// Migrations already recorded in `_schema_migrations` are skipped. Each
    /// remaining one runs in its own session together with its bookkeeping
    /// row. Returns how many migrations were applied.
    pub async fn init_schema(
        &self,
        migrations: &[(String, Migration)],
    ) -> Result<usize, PersistenceError> {
        sqlx::raw_sql(BOOKKEEPING_TABLE)
            .execute(self.pool())
            .await?;

        let mut applied = 0;
        for (module, migration) in migrations {
            let mut session = self.acquire_session().await?;

            let recorded: Option<i32> = sqlx::query_scalar(
                "SELECT 1 FROM _schema_migrations WHERE module = $1 AND id = $2",
            )
            .bind(module)
            .bind(migration.id)
            .fetch_optional(session.conn())
            .await?;

            if recorded.is_some() {
                tracing::debug!(module = %module, migration = migration.id, "migration already applied");
                continue;
            }

            sqlx::raw_sql(migration.up)
                .execute(session.conn())
                .await
                .map_err(|source| PersistenceError::Migration {
                    module: module.clone(),
                    id: migration.id.to_string(),
                    source,
                })?;

            sqlx::query(
                "INSERT INTO _schema_migrations (module, id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(module)
            .bind(migration.id)
            .execute(session.conn())
            .await?;

            session.commit().await?;

            tracing::info!(module = %module, migration = migration.id, "migration applied");
            applied += 1;
        }

        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_kernel::settings::DatabaseSettings;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn init_schema_is_idempotent() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let db = Database::connect(&DatabaseSettings {
            url,
            ..DatabaseSettings::default()
        })
        .await
        .expect("pool creation failed");

        let module = format!("schema_probe_{}", std::process::id());
        let migrations = vec![(
            module,
            Migration {
                id: "001_init",
                up: "CREATE TABLE IF NOT EXISTS schema_probe (id INT PRIMARY KEY)",
            },
        )];

        assert_eq!(db.init_schema(&migrations).await.unwrap(), 1);
        assert_eq!(db.init_schema(&migrations).await.unwrap(), 0);
    }
}
