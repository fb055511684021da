//! Builds the configured wizard store for one request.

use std::sync::Arc;

use sqlx::sqlite::SqlitePool;

use super::{DatabaseStore, Session, SessionStore, WizardCache};
use crate::config::{CacheDriver, WizardConfig};
use crate::error::{Result, WizardError};
use crate::identity::Identity;

/// Request-scoped collaborators a store may need.
#[derive(Clone)]
pub struct CacheContext {
    pub identity: Identity,
    pub session: Option<Arc<dyn Session>>,
    pub pool: Option<SqlitePool>,
}

impl CacheContext {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            session: None,
            pool: None,
        }
    }

    pub fn with_session(mut self, session: Arc<dyn Session>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_pool(mut self, pool: SqlitePool) -> Self {
        self.pool = Some(pool);
        self
    }
}

pub struct CacheManager<'a> {
    config: &'a WizardConfig,
}

impl<'a> CacheManager<'a> {
    pub fn new(config: &'a WizardConfig) -> Self {
        Self { config }
    }

    pub fn default_driver(&self) -> CacheDriver {
        self.config.driver
    }

    /// Build the default driver for the `namespace` wizard.
    pub fn driver(&self, namespace: &str, context: &CacheContext) -> Result<Arc<dyn WizardCache>> {
        self.create(self.default_driver(), namespace, context)
    }

    pub fn create(
        &self,
        driver: CacheDriver,
        namespace: &str,
        context: &CacheContext,
    ) -> Result<Arc<dyn WizardCache>> {
        match driver {
            CacheDriver::Session => {
                let session = context.session.clone().ok_or_else(|| {
                    WizardError::invalid("The session wizard driver requires a session.")
                })?;
                Ok(Arc::new(SessionStore::new(namespace, session)))
            }
            CacheDriver::Database => {
                let pool = context.pool.clone().ok_or_else(|| {
                    WizardError::invalid("The database wizard driver requires a connection.")
                })?;
                Ok(Arc::new(DatabaseStore::new(
                    pool,
                    self.config.table.clone(),
                    namespace,
                    context.identity.clone(),
                )?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemorySession;
    use serde_json::json;

    fn context() -> CacheContext {
        CacheContext::new(Identity::Authenticated(1))
    }

    #[tokio::test]
    async fn test_session_driver() {
        let config = WizardConfig::default();
        let session = Arc::new(MemorySession::new());
        let context = context().with_session(session.clone());

        let cache = CacheManager::new(&config).driver("register", &context).unwrap();
        cache.put("account", json!({"email": "a@b.c"}), Some(0)).await.unwrap();

        assert_eq!(
            session.get("wizard:register").unwrap(),
            Some(json!({"account": {"email": "a@b.c"}, "_last_index": 0}))
        );
    }

    #[test]
    fn test_session_driver_requires_session() {
        let config = WizardConfig::default();
        let err = CacheManager::new(&config)
            .driver("register", &context())
            .err()
            .unwrap();

        assert!(matches!(err, WizardError::InvalidArgument(_)));
    }

    #[test]
    fn test_database_driver_requires_pool() {
        let config = WizardConfig {
            driver: CacheDriver::Database,
            ..WizardConfig::default()
        };
        let err = CacheManager::new(&config)
            .driver("register", &context())
            .err()
            .unwrap();

        assert!(matches!(err, WizardError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_database_driver() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        DatabaseStore::migrate(&pool, "wizards").await.unwrap();

        let config = WizardConfig {
            driver: CacheDriver::Database,
            ..WizardConfig::default()
        };
        let cache = CacheManager::new(&config)
            .driver("register", &context().with_pool(pool))
            .unwrap();

        cache.put("account", json!({"email": "a@b.c"}), None).await.unwrap();
        assert_eq!(
            cache.get("account.email").await.unwrap(),
            Some(json!("a@b.c"))
        );
    }
}
