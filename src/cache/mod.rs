//! Key-addressed storage for partially entered wizard data.
//!
//! Every store keeps one JSON document per wizard namespace (and, for the
//! database store, per identity). Backends only implement `load`, `store`
//! and `clear`; path addressing and the `_last_index` progress field are
//! shared by all of them so both backends behave identically.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub mod database;
pub mod manager;
pub mod path;
pub mod session;
pub mod temp;

pub use database::DatabaseStore;
pub use manager::{CacheContext, CacheManager};
pub use path::Document;
pub use session::{MemorySession, Session, SessionRegistry, SessionStore};
pub use temp::{FilesystemTempSerializer, Temp, TempSerializer, UploadedFile};

/// Reserved document field holding the last processed step index.
pub const LAST_INDEX_KEY: &str = "_last_index";

#[async_trait]
pub trait WizardCache: Send + Sync {
    /// Read the whole stored document. A missing document reads as empty.
    async fn load(&self) -> Result<Document>;

    /// Replace the whole stored document.
    async fn store(&self, document: Document) -> Result<()>;

    /// Delete the stored document entirely. Clearing twice is harmless.
    async fn clear(&self) -> Result<()>;

    /// Resolve a dotted `key`, or the whole document when `key` is empty.
    ///
    /// A path that resolves to JSON `null` reads as absent, so `has` and
    /// `get` always agree.
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let document = self.load().await?;
        if key.is_empty() {
            return Ok(Some(Value::Object(document)));
        }
        Ok(path::get(&document, key)
            .filter(|value| !value.is_null())
            .cloned())
    }

    /// Replace the stored document with `data`, stamping `_last_index` when
    /// given. Top-level keys are not merged with what was stored before.
    async fn set(&self, mut data: Document, last_index: Option<usize>) -> Result<()> {
        if let Some(index) = last_index {
            data.insert(LAST_INDEX_KEY.to_string(), Value::from(index));
        }
        self.store(data).await
    }

    /// Write `value` at the dotted `key` of the current document.
    async fn put(&self, key: &str, value: Value, last_index: Option<usize>) -> Result<()> {
        let mut document = self.load().await?;
        path::set(&mut document, key, value);
        self.set(document, last_index).await
    }

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn last_processed_index(&self) -> Result<Option<usize>> {
        Ok(self
            .get(LAST_INDEX_KEY)
            .await?
            .and_then(|value| value.as_u64())
            .map(|index| index as usize))
    }

    /// Refresh only `_last_index`, keeping the rest of the document.
    async fn set_last_processed_index(&self, index: usize) -> Result<()> {
        let document = self.load().await?;
        self.set(document, Some(index)).await
    }
}

/// Turn a stored JSON value into a document, rejecting non-objects.
pub(crate) fn into_document(value: Value) -> Result<Document> {
    match value {
        Value::Object(document) => Ok(document),
        Value::Null => Ok(Document::new()),
        other => Err(crate::error::WizardError::CorruptDocument(other.to_string())),
    }
}
