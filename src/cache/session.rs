//! Session-backed wizard store.
//!
//! The session is already scoped to one client, so the whole wizard document
//! lives under a single `wizard:{namespace}` key with no identity column.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::{into_document, Document, WizardCache};
use crate::error::{Result, WizardError};

/// Per-client session storage provided by the hosting framework.
pub trait Session: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn put(&self, key: &str, value: Value) -> Result<()>;
    fn forget(&self, key: &str) -> Result<()>;
}

pub struct SessionStore {
    namespace: String,
    session: Arc<dyn Session>,
}

impl SessionStore {
    pub fn new(namespace: impl Into<String>, session: Arc<dyn Session>) -> Self {
        Self {
            namespace: namespace.into(),
            session,
        }
    }

    /// Session key holding this wizard's document
    pub fn key(&self) -> String {
        format!("wizard:{}", self.namespace)
    }
}

#[async_trait]
impl WizardCache for SessionStore {
    async fn load(&self) -> Result<Document> {
        match self.session.get(&self.key())? {
            Some(value) => into_document(value),
            None => Ok(Document::new()),
        }
    }

    async fn store(&self, document: Document) -> Result<()> {
        tracing::debug!(key = %self.key(), "storing wizard document in session");
        self.session.put(&self.key(), Value::Object(document))
    }

    async fn clear(&self) -> Result<()> {
        tracing::debug!(key = %self.key(), "clearing wizard document from session");
        self.session.forget(&self.key())
    }
}

/// In-process session used by the bundled server and by tests.
#[derive(Debug, Default)]
pub struct MemorySession {
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().map(|values| values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> WizardError {
    WizardError::Session("session lock poisoned".to_string())
}

impl Session for MemorySession {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self.values.read().map_err(poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.write().map_err(poisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().map_err(poisoned)?;
        values.remove(key);
        Ok(())
    }
}

/// Sessions addressed by an opaque session id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<MemorySession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session for `id`, starting a fresh one if none exists
    pub fn session(&self, id: &str) -> Result<Arc<MemorySession>> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        Ok(Arc::clone(
            sessions
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(MemorySession::new())),
        ))
    }

    /// Drop the session for `id` once it holds nothing and no request is
    /// using it. Returns whether it was removed.
    pub fn forget_idle(&self, id: &str) -> Result<bool> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        let idle = sessions
            .get(id)
            .is_some_and(|session| Arc::strong_count(session) == 1 && session.is_empty());
        if idle {
            sessions.remove(id);
        }
        Ok(idle)
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .map(|sessions| sessions.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KEY: &str = "wizard:ycs77_test";

    fn store_with(initial: Option<Value>) -> (SessionStore, Arc<MemorySession>) {
        let session = Arc::new(MemorySession::new());
        if let Some(value) = initial {
            session.put(KEY, value).unwrap();
        }
        let store = SessionStore::new("ycs77_test", session.clone());
        (store, session)
    }

    #[test]
    fn test_session_key() {
        let (store, _) = store_with(None);
        assert_eq!(store.key(), KEY);
    }

    #[tokio::test]
    async fn test_get_all_step_and_field_data() {
        let (store, _) = store_with(Some(json!({"step": {"field": "data"}})));

        assert_eq!(
            store.get("").await.unwrap(),
            Some(json!({"step": {"field": "data"}}))
        );
        assert_eq!(
            store.get("step").await.unwrap(),
            Some(json!({"field": "data"}))
        );
        assert_eq!(store.get("step.field").await.unwrap(), Some(json!("data")));
    }

    #[tokio::test]
    async fn test_set_data() {
        let (store, session) = store_with(None);

        store
            .set(json!({"step": {"field": "data"}}).as_object().cloned().unwrap(), None)
            .await
            .unwrap();

        assert_eq!(
            session.get(KEY).unwrap(),
            Some(json!({"step": {"field": "data"}}))
        );
    }

    #[tokio::test]
    async fn test_set_data_include_last_processed() {
        let (store, session) = store_with(None);

        store
            .set(json!({"step": {"field": "data"}}).as_object().cloned().unwrap(), Some(1))
            .await
            .unwrap();

        assert_eq!(
            session.get(KEY).unwrap(),
            Some(json!({"step": {"field": "data"}, "_last_index": 1}))
        );
        assert_eq!(store.last_processed_index().await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_get_last_processed_index() {
        let (store, _) = store_with(Some(json!({"_last_index": 0})));
        assert_eq!(store.last_processed_index().await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_set_last_processed_index_keeps_document() {
        let (store, session) =
            store_with(Some(json!({"step": {"field": "data"}, "_last_index": 0})));

        store.set_last_processed_index(1).await.unwrap();

        assert_eq!(
            session.get(KEY).unwrap(),
            Some(json!({"step": {"field": "data"}, "_last_index": 1}))
        );
    }

    #[tokio::test]
    async fn test_put_data() {
        let (store, session) = store_with(None);

        store.put("step", json!({"field": "data"}), None).await.unwrap();

        assert_eq!(
            session.get(KEY).unwrap(),
            Some(json!({"step": {"field": "data"}}))
        );
    }

    #[tokio::test]
    async fn test_overwrite_data() {
        let (store, session) = store_with(Some(json!({"step": {"field": "old data"}})));

        store.put("step", json!({"field": "data"}), None).await.unwrap();

        assert_eq!(
            session.get(KEY).unwrap(),
            Some(json!({"step": {"field": "data"}}))
        );
    }

    #[tokio::test]
    async fn test_has_data() {
        let (store, _) = store_with(Some(json!({"step": {"field": "data", "empty": null}})));

        assert!(store.has("step").await.unwrap());
        assert!(store.has("step.field").await.unwrap());
        assert!(!store.has("not-found").await.unwrap());
        // null values read as absent
        assert!(!store.has("step.empty").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let (store, session) = store_with(Some(json!({"step": {"field": "data"}})));

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(session.get(KEY).unwrap(), None);
        assert_eq!(store.get("").await.unwrap(), Some(json!({})));
        assert_eq!(store.last_processed_index().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let session = Arc::new(MemorySession::new());
        let first = SessionStore::new("first", session.clone());
        let second = SessionStore::new("second", session.clone());

        first.put("step", json!({"field": "data"}), Some(0)).await.unwrap();

        assert_eq!(second.get("step").await.unwrap(), None);
        assert_eq!(second.last_processed_index().await.unwrap(), None);
        assert_eq!(session.len(), 1);
    }

    #[tokio::test]
    async fn test_non_object_session_value_is_rejected() {
        let (store, _) = store_with(Some(json!("garbage")));

        let err = store.get("step").await.unwrap_err();
        assert!(matches!(err, WizardError::CorruptDocument(_)));
    }

    #[test]
    fn test_registry_reuses_sessions() {
        let registry = SessionRegistry::new();
        let a = registry.session("abc").unwrap();
        let b = registry.session("abc").unwrap();
        let c = registry.session("def").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.session_count(), 2);
    }

    #[test]
    fn test_registry_forgets_only_idle_sessions() {
        let registry = SessionRegistry::new();

        let held = registry.session("abc").unwrap();
        assert!(!registry.forget_idle("abc").unwrap());

        held.put(KEY, json!({"_last_index": 0})).unwrap();
        drop(held);
        assert!(!registry.forget_idle("abc").unwrap());
        assert_eq!(registry.session_count(), 1);

        registry.session("abc").unwrap().forget(KEY).unwrap();
        assert!(registry.forget_idle("abc").unwrap());
        assert_eq!(registry.session_count(), 0);

        assert!(!registry.forget_idle("missing").unwrap());
    }
}
