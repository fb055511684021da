//! Database-backed wizard store.
//!
//! One row per `(wizard, identity)`: authenticated users are keyed by
//! `user_id`, anonymous visitors by `ip_address`. Exactly one of the two
//! columns is populated on each row. Writes are an update-then-insert
//! upsert with no locking, so concurrent requests for the same identity
//! are last-writer-wins.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::{into_document, Document, WizardCache};
use crate::error::{Result, WizardError};
use crate::identity::Identity;

pub struct DatabaseStore {
    pool: SqlitePool,
    table: String,
    namespace: String,
    identity: Identity,
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(WizardError::invalid(format!(
            "Wizard table name [{}] is not a valid identifier.",
            table
        )))
    }
}

/// Open a pool for the wizard database.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(url)
        .await?;
    Ok(pool)
}

impl DatabaseStore {
    pub fn new(
        pool: SqlitePool,
        table: impl Into<String>,
        namespace: impl Into<String>,
        identity: Identity,
    ) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;

        Ok(Self {
            pool,
            table,
            namespace: namespace.into(),
            identity,
        })
    }

    /// Create the wizard table and its lookup indexes if they don't exist.
    pub async fn migrate(pool: &SqlitePool, table: &str) -> Result<()> {
        validate_table_name(table)?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                wizard TEXT NOT NULL,
                user_id INTEGER,
                ip_address TEXT,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#
        ))
        .execute(pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_wizard_user ON {table}(wizard, user_id)"
        ))
        .execute(pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_wizard_ip ON {table}(wizard, ip_address)"
        ))
        .execute(pool)
        .await?;

        tracing::debug!(table, "wizard table ready");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    fn identity_column(&self) -> &'static str {
        match self.identity {
            Identity::Authenticated(_) => "user_id",
            Identity::Anonymous(_) => "ip_address",
        }
    }

    async fn fetch_payload(&self) -> Result<Option<String>> {
        let sql = format!(
            "SELECT payload FROM {} WHERE wizard = ?1 AND {} = ?2 ORDER BY id LIMIT 1",
            self.table,
            self.identity_column()
        );
        let query = sqlx::query(&sql).bind(&self.namespace);
        let query = match &self.identity {
            Identity::Authenticated(id) => query.bind(*id),
            Identity::Anonymous(ip) => query.bind(ip.clone()),
        };

        let row: Option<SqliteRow> = query.fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(Some(row.try_get("payload")?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl WizardCache for DatabaseStore {
    async fn load(&self) -> Result<Document> {
        match self.fetch_payload().await? {
            Some(payload) => into_document(serde_json::from_str::<Value>(&payload)?),
            None => Ok(Document::new()),
        }
    }

    async fn store(&self, document: Document) -> Result<()> {
        let payload = serde_json::to_string(&document)?;

        let sql = format!(
            "UPDATE {} SET payload = ?1, updated_at = datetime('now') WHERE wizard = ?2 AND {} = ?3",
            self.table,
            self.identity_column()
        );
        let query = sqlx::query(&sql).bind(&payload).bind(&self.namespace);
        let query = match &self.identity {
            Identity::Authenticated(id) => query.bind(*id),
            Identity::Anonymous(ip) => query.bind(ip.clone()),
        };
        let updated = query.execute(&self.pool).await?.rows_affected();

        if updated == 0 {
            sqlx::query(&format!(
                "INSERT INTO {} (wizard, user_id, ip_address, payload) VALUES (?1, ?2, ?3, ?4)",
                self.table
            ))
            .bind(&self.namespace)
            .bind(self.identity.user_id())
            .bind(self.identity.ip_address().map(str::to_string))
            .bind(&payload)
            .execute(&self.pool)
            .await?;
        }

        tracing::debug!(
            wizard = %self.namespace,
            identity = %self.identity,
            inserted = updated == 0,
            "stored wizard document"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let sql = format!(
            "DELETE FROM {} WHERE wizard = ?1 AND {} = ?2",
            self.table,
            self.identity_column()
        );
        let query = sqlx::query(&sql).bind(&self.namespace);
        let query = match &self.identity {
            Identity::Authenticated(id) => query.bind(*id),
            Identity::Anonymous(ip) => query.bind(ip.clone()),
        };
        let deleted = query.execute(&self.pool).await?.rows_affected();

        tracing::debug!(
            wizard = %self.namespace,
            identity = %self.identity,
            deleted,
            "cleared wizard document"
        );
        Ok(())
    }
}
