//! Wizard controller.
//!
//! A `Wizard` wraps one `WizardDefinition` for one request: it builds the
//! step sequence, binds the configured cache for the caller and answers the
//! navigation questions a hosting controller asks (which step is current,
//! where to go next, whether the request must be redirected).

pub mod definition;

use std::sync::Arc;

use serde_json::Value;

use crate::cache::{CacheContext, CacheManager, Document, LAST_INDEX_KEY};
use crate::config::WizardConfig;
use crate::error::{Result, WizardError};
use crate::steps::{Step, StepSequence};

pub use definition::{ConfiguredWizard, WizardDefinition};

/// A step addressed either directly or by slug.
#[derive(Debug, Clone, Copy)]
pub enum StepRef<'a> {
    Step(&'a Step),
    Slug(&'a str),
}

impl<'a> From<&'a Step> for StepRef<'a> {
    fn from(step: &'a Step) -> Self {
        StepRef::Step(step)
    }
}

impl<'a> From<&'a str> for StepRef<'a> {
    fn from(slug: &'a str) -> Self {
        StepRef::Slug(slug)
    }
}

pub struct Wizard {
    definition: Arc<dyn WizardDefinition>,
    config: WizardConfig,
    context: CacheContext,
    steps: StepSequence,
}

impl Wizard {
    /// Build the wizard and its step sequence for one caller.
    pub fn new(
        definition: Arc<dyn WizardDefinition>,
        config: &WizardConfig,
        context: CacheContext,
    ) -> Result<Self> {
        let mut wizard = Self {
            steps: StepSequence::new(definition.name(), config.step_view_path.clone()),
            definition,
            config: config.clone(),
            context,
        };
        wizard.set_steps(None)?;
        Ok(wizard)
    }

    pub fn name(&self) -> String {
        self.definition.name()
    }

    pub fn title(&self) -> String {
        self.definition.title()
    }

    pub fn definition(&self) -> &Arc<dyn WizardDefinition> {
        &self.definition
    }

    // ─── Steps ───────────────────────────────────────────────────────────────

    /// Build a fresh sequence from the declared steps, bound to the
    /// configured cache when caching is enabled.
    pub fn create_steps(&self) -> Result<StepSequence> {
        let declared = self.definition.steps();
        if declared.is_empty() {
            return Err(WizardError::invalid(format!(
                "Wizard [{}] does not contain any steps.",
                self.definition.type_name()
            )));
        }

        let name = self.definition.name();
        let mut steps = StepSequence::new(name.as_str(), self.config.step_view_path.as_str());

        if self.config.cache {
            let cache = CacheManager::new(&self.config).driver(&name, &self.context)?;
            steps.set_cache(cache);
        }

        steps.push_many(declared)?;
        Ok(steps)
    }

    pub fn steps(&self) -> &StepSequence {
        &self.steps
    }

    /// Replace the step sequence, or rebuild it when `None`.
    pub fn set_steps(&mut self, steps: Option<StepSequence>) -> Result<&mut Self> {
        self.steps = match steps {
            Some(steps) => steps,
            None => self.create_steps()?,
        };
        Ok(self)
    }

    pub fn get_step(&self, slug: &str) -> Option<&Step> {
        self.steps.find(slug)
    }

    // ─── Progress ────────────────────────────────────────────────────────────

    pub async fn current_step_index(&self) -> Result<Option<usize>> {
        self.steps.current_index().await
    }

    pub async fn has_current_step_index(&self) -> Result<bool> {
        Ok(self.current_step_index().await?.is_some())
    }

    pub async fn current_step_index_with_default(&self) -> Result<usize> {
        Ok(self.current_step_index().await?.unwrap_or(0))
    }

    pub async fn current_step(&self) -> Result<Option<&Step>> {
        self.steps.current().await
    }

    /// Current step, falling back to the first position when there is no
    /// progress yet.
    pub async fn current_step_with_default(&self) -> Result<&Step> {
        let index = self.current_step_index_with_default().await?;
        self.steps
            .get(index)
            .ok_or_else(|| WizardError::StepNotFound(index.to_string()))
    }

    /// Step the caller belongs on: the current one, or the first step when
    /// there is no progress or it points at a step that no longer exists.
    pub async fn landing_step(&self) -> Result<&Step> {
        if let Some(step) = self.current_step().await? {
            return Ok(step);
        }
        self.steps
            .first()
            .ok_or_else(|| WizardError::StepNotFound(self.name()))
    }

    /// Move stored progress that points past the declared steps back to the
    /// first step. Returns whether anything was rewritten.
    pub async fn restart_stale_progress(&self) -> Result<bool> {
        let Some(index) = self.current_step_index().await? else {
            return Ok(false);
        };
        if self.steps.get(index).is_some() {
            return Ok(false);
        }
        let Some(first) = self.steps.first() else {
            return Ok(false);
        };

        tracing::warn!(
            wizard = %self.name(),
            stale_index = index,
            "stored progress points at a missing step, restarting"
        );
        self.steps.set_current(first).await?;
        Ok(true)
    }

    pub async fn set_current_step(&self, step: &Step) -> Result<&Self> {
        self.steps.set_current(step).await?;
        Ok(self)
    }

    pub async fn prev_step(&self) -> Result<Option<&Step>> {
        self.steps.prev().await
    }

    pub async fn next_step(&self) -> Result<Option<&Step>> {
        self.steps.next().await
    }

    pub async fn has_prev_step(&self) -> Result<bool> {
        self.steps.has_prev().await
    }

    pub async fn has_next_step(&self) -> Result<bool> {
        self.steps.has_next().await
    }

    // ─── Navigation checks ───────────────────────────────────────────────────

    /// Whether `step` is the current step. Before any progress every step
    /// counts as current; after it, `None` or an unknown slug never does.
    pub async fn is_current_step(&self, step: Option<StepRef<'_>>) -> Result<bool> {
        let Some(current) = self.current_step_index().await? else {
            return Ok(true);
        };

        let index = match step {
            Some(StepRef::Step(step)) => Some(step.index()),
            Some(StepRef::Slug(slug)) => self.steps.find_key(slug),
            None => None,
        };
        Ok(index == Some(current))
    }

    pub async fn is_last_step(&self) -> Result<bool> {
        let current = self.current_step_index_with_default().await?;
        Ok(self.steps.last().map(Step::index) == Some(current))
    }

    /// Whether a request for `slug` has to be sent back to the current step.
    pub async fn need_redirect_to_correct_step(&self, slug: Option<&str>) -> Result<bool> {
        let Some(slug) = slug else {
            return Ok(true);
        };

        if !self.has_current_step_index().await? || self.get_step(slug).is_none() {
            return Ok(false);
        }

        let redirect = !self.is_current_step(Some(StepRef::Slug(slug))).await?;
        if redirect {
            tracing::warn!(
                wizard = %self.name(),
                requested = slug,
                "out of order step request"
            );
        }
        Ok(redirect)
    }

    // ─── Data ────────────────────────────────────────────────────────────────

    /// Submitted fields without framework-internal ones (`_token`, `_method`).
    pub fn get_data(&self, input: &Document) -> Document {
        input
            .iter()
            .filter(|(key, _)| !key.starts_with('_'))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub async fn step_data(&self, slug: &str, key: Option<&str>) -> Result<Option<Value>> {
        self.steps.data(slug, key).await
    }

    /// Keep the submitted data for `slug`.
    ///
    /// With a cache the data is stored under the step's slug and progress
    /// moves to the following step. Without one the step's save handler
    /// receives the data directly.
    pub async fn save_step_data(&self, slug: &str, input: &Document) -> Result<()> {
        let data = self.get_data(input);

        if self.steps.has_cache() {
            let next_index = self.next_step().await?.map(Step::index);
            return self
                .steps
                .cache_data(slug, None, Value::Object(data), next_index)
                .await;
        }

        let step = self
            .get_step(slug)
            .ok_or_else(|| WizardError::StepNotFound(slug.to_string()))?;
        self.save_step(step, &data).await
    }

    async fn save_step(&self, step: &Step, data: &Document) -> Result<()> {
        let saver = step.saver().ok_or_else(|| {
            WizardError::invalid(format!(
                "Step [{}] has no save handler and wizard caching is disabled.",
                step.slug()
            ))
        })?;

        saver.save(data).await.map_err(|source| WizardError::Save {
            slug: step.slug().to_string(),
            source,
        })
    }

    /// Finish the wizard: hand the collected data to the definition, then
    /// discard everything cached for this caller.
    pub async fn save_steps_data(&self, input: &Document) -> Result<()> {
        let data = match self.steps.cache() {
            Some(cache) => {
                let mut document = cache.load().await?;
                document.remove(LAST_INDEX_KEY);
                document
            }
            None => self.get_data(input),
        };

        self.definition
            .save_all(&data)
            .await
            .map_err(|source| WizardError::Complete {
                wizard: self.name(),
                source,
            })?;

        self.steps.clear_cache().await
    }
}
