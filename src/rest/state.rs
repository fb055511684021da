//! API state management for the REST server.

use std::collections::BTreeMap;
use std::sync::Arc;

use sqlx::sqlite::SqlitePool;

use crate::cache::{CacheContext, SessionRegistry};
use crate::config::{CacheDriver, Config};
use crate::rest::caller::Caller;
use crate::rest::error::ApiError;
use crate::wizard::{ConfiguredWizard, Wizard, WizardDefinition};

/// Shared state for the REST API
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    /// Hosted wizards by name
    pub wizards: Arc<BTreeMap<String, Arc<dyn WizardDefinition>>>,
    /// In-process sessions for the session driver
    pub sessions: Arc<SessionRegistry>,
    /// Connection pool for the database driver
    pub pool: Option<SqlitePool>,
}

impl ApiState {
    /// Create new API state hosting every wizard declared in `config`
    pub fn new(config: Config, pool: Option<SqlitePool>) -> Self {
        let definitions = config
            .wizards
            .iter()
            .cloned()
            .map(|declaration| {
                Arc::new(ConfiguredWizard::new(declaration)) as Arc<dyn WizardDefinition>
            })
            .collect::<Vec<_>>();
        Self::with_definitions(config, pool, definitions)
    }

    /// Create API state hosting the given wizard definitions
    pub fn with_definitions(
        config: Config,
        pool: Option<SqlitePool>,
        definitions: impl IntoIterator<Item = Arc<dyn WizardDefinition>>,
    ) -> Self {
        let wizards = definitions
            .into_iter()
            .map(|definition| (definition.name(), definition))
            .collect::<BTreeMap<_, _>>();

        Self {
            config: Arc::new(config),
            wizards: Arc::new(wizards),
            sessions: Arc::new(SessionRegistry::new()),
            pool,
        }
    }

    pub fn definition(&self, name: &str) -> Result<Arc<dyn WizardDefinition>, ApiError> {
        self.wizards
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Wizard '{}' not found", name)))
    }

    /// Build the named wizard bound to the caller's stored progress
    pub fn open_wizard(&self, name: &str, caller: &Caller) -> Result<Wizard, ApiError> {
        let definition = self.definition(name)?;

        let mut context = CacheContext::new(caller.identity.clone());
        if self.config.wizard.cache {
            match self.config.wizard.driver {
                CacheDriver::Session => {
                    context = context.with_session(self.sessions.session(&caller.session_id)?);
                }
                CacheDriver::Database => {
                    if let Some(pool) = &self.pool {
                        context = context.with_pool(pool.clone());
                    }
                }
            }
        }

        Ok(Wizard::new(definition, &self.config.wizard, context)?)
    }

    /// Release a wizard opened for `caller`, dropping the caller's session
    /// once it no longer holds any wizard.
    pub fn close_wizard(&self, wizard: Wizard, caller: &Caller) -> Result<(), ApiError> {
        drop(wizard);
        if self.uses_sessions() {
            self.sessions.forget_idle(&caller.session_id)?;
        }
        Ok(())
    }

    fn uses_sessions(&self) -> bool {
        self.config.wizard.cache && self.config.wizard.driver == CacheDriver::Session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    fn caller() -> Caller {
        Caller {
            identity: Identity::Authenticated(1),
            session_id: "user:1".to_string(),
        }
    }

    #[test]
    fn test_api_state_new() {
        let state = ApiState::new(Config::default(), None);

        assert!(state.wizards.contains_key("register"));
        assert!(state.definition("register").is_ok());
        assert!(matches!(
            state.definition("missing"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_open_wizard_uses_caller_session() {
        let state = ApiState::new(Config::default(), None);

        let wizard = state.open_wizard("register", &caller()).unwrap();
        assert!(wizard.steps().has_cache());
        assert_eq!(state.sessions.session_count(), 1);

        state.open_wizard("register", &caller()).unwrap();
        assert_eq!(state.sessions.session_count(), 1);
    }

    #[test]
    fn test_close_wizard_drops_empty_session() {
        let state = ApiState::new(Config::default(), None);

        let wizard = state.open_wizard("register", &caller()).unwrap();
        state.close_wizard(wizard, &caller()).unwrap();
        assert_eq!(state.sessions.session_count(), 0);
    }

    #[tokio::test]
    async fn test_close_wizard_keeps_session_with_progress() {
        let state = ApiState::new(Config::default(), None);

        let wizard = state.open_wizard("register", &caller()).unwrap();
        let first = wizard.steps().first().unwrap().clone();
        wizard.set_current_step(&first).await.unwrap();
        state.close_wizard(wizard, &caller()).unwrap();
        assert_eq!(state.sessions.session_count(), 1);

        let wizard = state.open_wizard("register", &caller()).unwrap();
        wizard.steps().clear_cache().await.unwrap();
        state.close_wizard(wizard, &caller()).unwrap();
        assert_eq!(state.sessions.session_count(), 0);
    }

    #[tokio::test]
    async fn test_database_driver_leaves_sessions_alone() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let mut config = Config::default();
        config.wizard.driver = CacheDriver::Database;
        let state = ApiState::new(config, Some(pool));

        let wizard = state.open_wizard("register", &caller()).unwrap();
        assert!(wizard.steps().has_cache());
        assert_eq!(state.sessions.session_count(), 0);
    }

    #[test]
    fn test_uncached_wizard_opens_without_collaborators() {
        let mut config = Config::default();
        config.wizard.cache = false;
        let state = ApiState::new(config, None);

        let wizard = state.open_wizard("register", &caller()).unwrap();
        assert!(!wizard.steps().has_cache());
        assert_eq!(state.sessions.session_count(), 0);
    }

    #[test]
    fn test_database_driver_without_pool_fails() {
        let mut config = Config::default();
        config.wizard.driver = CacheDriver::Database;
        let state = ApiState::new(config, None);

        assert!(matches!(
            state.open_wizard("register", &caller()),
            Err(ApiError::InternalError(_))
        ));
    }
}
