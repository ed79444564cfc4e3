use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or_else(|| anyhow!("DATABASE_URL is required for the postgres store"))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.db_idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(config.db_max_lifetime_seconds))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Runs every `.sql` file in `dir` in file-name order. Scripts are
    /// written to be re-runnable.
    pub async fn apply_migrations(&self, dir: &Path) -> Result<usize> {
        let mut files: Vec<_> = std::fs::read_dir(dir)
            .map_err(|err| anyhow!("cannot read {}: {}", dir.display(), err))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "sql"))
            .collect();
        files.sort();

        for path in &files {
            let sql = std::fs::read_to_string(path)
                .map_err(|err| anyhow!("cannot read {}: {}", path.display(), err))?;
            (&self.pool)
                .execute(sql.as_str())
                .await
                .map_err(|err| anyhow!("migration {} failed: {}", path.display(), err))?;
            tracing::info!(migration = %path.display(), "applied migration");
        }

        Ok(files.len())
    }
}
