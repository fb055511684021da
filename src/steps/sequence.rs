//! Ordered, slug-addressable collection of wizard steps.
//!
//! Steps are kept in an index-keyed map. Indices are handed out in push
//! order and never renumbered, so `forget` leaves a hole that navigation
//! honours rather than skips. The current position comes from the bound
//! cache's last processed index; without a cache there is never progress.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::step::{Step, StepSource};
use crate::cache::{path, WizardCache};
use crate::error::{Result, WizardError};

pub struct StepSequence {
    wizard: String,
    view_path: String,
    steps: BTreeMap<usize, Step>,
    cache: Option<Arc<dyn WizardCache>>,
}

impl StepSequence {
    /// Create an empty sequence for the `wizard` namespace.
    pub fn new(wizard: impl Into<String>, view_path: impl Into<String>) -> Self {
        Self {
            wizard: wizard.into(),
            view_path: view_path.into(),
            steps: BTreeMap::new(),
            cache: None,
        }
    }

    pub fn wizard(&self) -> &str {
        &self.wizard
    }

    // ─── Lookup ──────────────────────────────────────────────────────────────

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(&index)
    }

    /// First step whose slug matches
    pub fn find(&self, slug: &str) -> Option<&Step> {
        self.steps.values().find(|step| step.slug() == slug)
    }

    pub fn find_key(&self, slug: &str) -> Option<usize> {
        self.find(slug).map(Step::index)
    }

    pub fn has(&self, index: usize) -> bool {
        self.steps.contains_key(&index)
    }

    pub fn first(&self) -> Option<&Step> {
        self.steps.values().next()
    }

    pub fn last(&self) -> Option<&Step> {
        self.steps.values().next_back()
    }

    pub fn all(&self) -> impl Iterator<Item = &Step> {
        self.steps.values()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    // ─── Navigation ──────────────────────────────────────────────────────────

    pub async fn current_index(&self) -> Result<Option<usize>> {
        match &self.cache {
            Some(cache) => cache.last_processed_index().await,
            None => Ok(None),
        }
    }

    /// Step at the current index. `None` when there is no progress or the
    /// recorded index no longer has a step.
    pub async fn current(&self) -> Result<Option<&Step>> {
        Ok(self
            .current_index()
            .await?
            .and_then(|index| self.get(index)))
    }

    /// Record `step` as the last processed one. No-op without a cache.
    pub async fn set_current(&self, step: &Step) -> Result<()> {
        match &self.cache {
            Some(cache) => cache.set_last_processed_index(step.index()).await,
            None => Ok(()),
        }
    }

    pub async fn prev(&self) -> Result<Option<&Step>> {
        Ok(self
            .current_index()
            .await?
            .and_then(|index| index.checked_sub(1))
            .and_then(|index| self.get(index)))
    }

    pub async fn next(&self) -> Result<Option<&Step>> {
        Ok(self
            .current_index()
            .await?
            .and_then(|index| self.get(index + 1)))
    }

    pub async fn has_prev(&self) -> Result<bool> {
        Ok(self.prev().await?.is_some())
    }

    pub async fn has_next(&self) -> Result<bool> {
        Ok(self.next().await?.is_some())
    }

    pub async fn prev_slug(&self) -> Result<Option<String>> {
        Ok(self.prev().await?.map(|step| step.slug().to_string()))
    }

    pub async fn next_slug(&self) -> Result<Option<String>> {
        Ok(self.next().await?.map(|step| step.slug().to_string()))
    }

    // ─── Building ────────────────────────────────────────────────────────────

    /// Index the next pushed step will get
    pub fn next_free_index(&self) -> usize {
        self.steps
            .keys()
            .next_back()
            .map(|index| index + 1)
            .unwrap_or(0)
    }

    /// Append a step. A step kind is instantiated at the next free index; a
    /// ready-made step must already carry that index.
    pub fn push(&mut self, source: impl Into<StepSource>) -> Result<&mut Self> {
        let index = self.next_free_index();

        let step = match source.into() {
            StepSource::Kind(kind) => Step::new(kind, index, &self.wizard, &self.view_path),
            StepSource::Instance(step) => {
                if step.index() != index {
                    return Err(WizardError::invalid(format!(
                        "Step [{}] has index {} but the next position in wizard [{}] is {}.",
                        step.slug(),
                        step.index(),
                        self.wizard,
                        index
                    )));
                }
                step
            }
        };

        self.steps.insert(index, step);
        Ok(self)
    }

    pub fn push_many<I, S>(&mut self, sources: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<StepSource>,
    {
        for source in sources {
            self.push(source)?;
        }
        Ok(self)
    }

    /// Replace every step, keeping each at its own index.
    pub fn set(&mut self, steps: Vec<Step>) -> Result<&mut Self> {
        let mut replacement = BTreeMap::new();
        for step in steps {
            let index = step.index();
            if replacement.insert(index, step).is_some() {
                return Err(WizardError::invalid(format!(
                    "Wizard [{}] declares more than one step at index {}.",
                    self.wizard, index
                )));
            }
        }
        self.steps = replacement;
        Ok(self)
    }

    /// Remove the step at `index` without renumbering the others.
    pub fn forget(&mut self, index: usize) -> &mut Self {
        self.steps.remove(&index);
        self
    }

    // ─── Cache ───────────────────────────────────────────────────────────────

    pub fn set_cache(&mut self, cache: Arc<dyn WizardCache>) -> &mut Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&Arc<dyn WizardCache>> {
        self.cache.as_ref()
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Cached data for `slug`, or one field of it.
    pub async fn data(&self, slug: &str, key: Option<&str>) -> Result<Option<Value>> {
        match &self.cache {
            Some(cache) => cache.get(&path::step_key(slug, key)).await,
            None => Ok(None),
        }
    }

    /// Cache `data` for `slug` (or one field of it), advancing the last
    /// processed index when `last_index` is given.
    pub async fn cache_data(
        &self,
        slug: &str,
        key: Option<&str>,
        data: Value,
        last_index: Option<usize>,
    ) -> Result<()> {
        match &self.cache {
            Some(cache) => {
                cache
                    .put(&path::step_key(slug, key), data, last_index)
                    .await
            }
            None => Ok(()),
        }
    }

    pub async fn clear_cache(&self) -> Result<()> {
        match &self.cache {
            Some(cache) => cache.clear().await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for StepSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepSequence")
            .field("wizard", &self.wizard)
            .field("steps", &self.steps.values().collect::<Vec<_>>())
            .field("has_cache", &self.has_cache())
            .finish()
    }
}
