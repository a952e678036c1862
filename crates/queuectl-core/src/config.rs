use std::collections::HashMap;

use crate::error::Result;
use crate::store::Store;

const DEFAULT_MAX_RETRIES: i64 = 3;
const DEFAULT_BACKOFF_BASE: i64 = 2;
const DEFAULT_BACKOFF_CAP_SECONDS: i64 = 60;

/// Key-value runtime configuration backed by the `config` table: retry
/// policy knobs (`max_retries`, `backoff_base`, `backoff_cap_seconds`) that
/// `enqueue` and `worker start` read at the moment they need them.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    store: Store,
}

impl ConfigStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM config WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.store.pool)
            .await?;
        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO config (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.store.pool)
        .await?;
        Ok(())
    }

    pub async fn all(&self) -> Result<HashMap<String, String>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM config")
            .fetch_all(&self.store.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    /// Falls back to `default` if the key is missing or fails to parse,
    /// mirroring the source's `MustGetInt`.
    async fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.get(key).await {
            Ok(Some(raw)) => raw.parse().unwrap_or(default),
            _ => default,
        }
    }

    pub async fn max_retries(&self) -> i64 {
        self.get_int("max_retries", DEFAULT_MAX_RETRIES).await
    }

    pub async fn backoff_base(&self) -> i64 {
        self.get_int("backoff_base", DEFAULT_BACKOFF_BASE).await
    }

    pub async fn backoff_cap_seconds(&self) -> i64 {
        self.get_int("backoff_cap_seconds", DEFAULT_BACKOFF_CAP_SECONDS)
            .await
    }
}
