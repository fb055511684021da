//! Step definitions.
//!
//! A `StepKind` is the behaviour a step type contributes (its type tag,
//! optional name overrides, per-request validation hooks and an optional
//! save handler). A `Step` is that kind registered at a fixed position in a
//! sequence, with every default name filled in once at registration time.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::Document;
use crate::config::StepDeclaration;
use crate::naming;

/// Field name -> validation rules
pub type Rules = BTreeMap<String, Vec<String>>;

/// Field name -> text (custom messages or attribute display names)
pub type FieldText = BTreeMap<String, String>;

/// Persists one step's submitted data when wizard caching is disabled.
#[async_trait]
pub trait SaveStep: Send + Sync {
    async fn save(&self, data: &Document) -> anyhow::Result<()>;
}

pub trait StepKind: Send + Sync {
    /// Type tag, e.g. `UserProfileStep`
    fn type_name(&self) -> &str;

    fn slug(&self) -> Option<&str> {
        None
    }

    fn label(&self) -> Option<&str> {
        None
    }

    fn view(&self) -> Option<&str> {
        None
    }

    /// Validation rules for the submitted `input`
    fn rules(&self, _input: &Document) -> Rules {
        Rules::new()
    }

    fn messages(&self, _input: &Document) -> FieldText {
        FieldText::new()
    }

    fn attributes(&self, _input: &Document) -> FieldText {
        FieldText::new()
    }

    /// Save handler used when no wizard cache is bound
    fn saver(&self) -> Option<&dyn SaveStep> {
        None
    }
}

/// A step registered at a fixed index.
#[derive(Clone)]
pub struct Step {
    index: usize,
    slug: String,
    label: String,
    view: String,
    kind: Arc<dyn StepKind>,
}

impl Step {
    /// Register `kind` at `index` for the `wizard` namespace.
    pub fn new(kind: Arc<dyn StepKind>, index: usize, wizard: &str, view_path: &str) -> Self {
        let slug = kind
            .slug()
            .map(str::to_string)
            .unwrap_or_else(|| naming::kebab_case(kind.type_name()));
        let label = kind
            .label()
            .map(str::to_string)
            .unwrap_or_else(|| naming::label_from_slug(&slug));
        let view = kind
            .view()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.{}.{}", view_path, wizard, slug));

        Self {
            index,
            slug,
            label,
            view,
            kind,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// One-based position for display
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn kind(&self) -> &Arc<dyn StepKind> {
        &self.kind
    }

    pub fn rules(&self, input: &Document) -> Rules {
        self.kind.rules(input)
    }

    pub fn messages(&self, input: &Document) -> FieldText {
        self.kind.messages(input)
    }

    pub fn attributes(&self, input: &Document) -> FieldText {
        self.kind.attributes(input)
    }

    pub fn saver(&self) -> Option<&dyn SaveStep> {
        self.kind.saver()
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("index", &self.index)
            .field("slug", &self.slug)
            .field("label", &self.label)
            .field("view", &self.view)
            .field("kind", &self.kind.type_name())
            .finish()
    }
}

impl PartialEq for Step {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.slug == other.slug
    }
}

/// What can be pushed into a sequence: a step type, instantiated at the next
/// free index, or an already registered step.
#[derive(Clone)]
pub enum StepSource {
    Kind(Arc<dyn StepKind>),
    Instance(Step),
}

impl StepSource {
    pub fn kind(kind: impl StepKind + 'static) -> Self {
        StepSource::Kind(Arc::new(kind))
    }
}

impl From<Step> for StepSource {
    fn from(step: Step) -> Self {
        StepSource::Instance(step)
    }
}

impl From<Arc<dyn StepKind>> for StepSource {
    fn from(kind: Arc<dyn StepKind>) -> Self {
        StepSource::Kind(kind)
    }
}

/// Save handler for configured steps: records the submission in the log.
#[derive(Debug, Clone)]
pub struct LoggedSave {
    step: String,
}

#[async_trait]
impl SaveStep for LoggedSave {
    async fn save(&self, data: &Document) -> anyhow::Result<()> {
        tracing::info!(step = %self.step, fields = data.len(), "step saved");
        Ok(())
    }
}

/// Step type declared in configuration.
#[derive(Debug, Clone)]
pub struct ConfiguredStep {
    declaration: StepDeclaration,
    saver: LoggedSave,
}

impl ConfiguredStep {
    pub fn new(declaration: StepDeclaration) -> Self {
        let saver = LoggedSave {
            step: declaration.kind.clone(),
        };
        Self { declaration, saver }
    }
}

impl StepKind for ConfiguredStep {
    fn type_name(&self) -> &str {
        &self.declaration.kind
    }

    fn slug(&self) -> Option<&str> {
        self.declaration.slug.as_deref()
    }

    fn label(&self) -> Option<&str> {
        self.declaration.label.as_deref()
    }

    fn view(&self) -> Option<&str> {
        self.declaration.view.as_deref()
    }

    fn rules(&self, _input: &Document) -> Rules {
        self.declaration.rules.clone()
    }

    fn saver(&self) -> Option<&dyn SaveStep> {
        Some(&self.saver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StepFirstStub;

    impl StepKind for StepFirstStub {
        fn type_name(&self) -> &str {
            "StepFirstStub"
        }
    }

    struct ExplicitStep;

    impl StepKind for ExplicitStep {
        fn type_name(&self) -> &str {
            "ExplicitStep"
        }

        fn slug(&self) -> Option<&str> {
            Some("step-first-stub")
        }

        fn label(&self) -> Option<&str> {
            Some("Step first stub")
        }

        fn view(&self) -> Option<&str> {
            Some("steps.first")
        }

        fn rules(&self, input: &Document) -> Rules {
            let mut rules = Rules::new();
            rules.insert("name".to_string(), vec!["required".to_string()]);
            if input.contains_key("company") {
                rules.insert("vat".to_string(), vec!["required".to_string()]);
            }
            rules
        }
    }

    #[test]
    fn test_defaults_derived_from_type_tag() {
        let step = Step::new(Arc::new(StepFirstStub), 0, "ycs77_test", "wizard.steps");

        assert_eq!(step.index(), 0);
        assert_eq!(step.number(), 1);
        assert_eq!(step.slug(), "step-first-stub");
        assert_eq!(step.label(), "Step first stub");
        assert_eq!(step.view(), "wizard.steps.ycs77_test.step-first-stub");
        assert!(step.rules(&Document::new()).is_empty());
        assert!(step.saver().is_none());
    }

    #[test]
    fn test_explicit_overrides_win() {
        let step = Step::new(Arc::new(ExplicitStep), 2, "ycs77_test", "wizard.steps");

        assert_eq!(step.slug(), "step-first-stub");
        assert_eq!(step.label(), "Step first stub");
        assert_eq!(step.view(), "steps.first");
        assert_eq!(step.number(), 3);
    }

    #[test]
    fn test_rules_are_produced_per_request() {
        let step = Step::new(Arc::new(ExplicitStep), 0, "w", "v");

        let plain = step.rules(&Document::new());
        assert_eq!(plain.len(), 1);

        let mut input = Document::new();
        input.insert("company".to_string(), serde_json::json!("ACME"));
        assert!(step.rules(&input).contains_key("vat"));
    }

    #[test]
    fn test_configured_step() {
        let declaration = StepDeclaration::new("AccountStep").rule("email", &["required"]);
        let step = Step::new(Arc::new(ConfiguredStep::new(declaration)), 0, "register", "wizard.steps");

        assert_eq!(step.slug(), "account-step");
        assert_eq!(step.label(), "Account step");
        assert_eq!(
            step.rules(&Document::new()).get("email"),
            Some(&vec!["required".to_string()])
        );
        assert!(format!("{:?}", step).contains("AccountStep"));
    }

    #[tokio::test]
    async fn test_configured_step_accepts_uncached_saves() {
        let step = Step::new(
            Arc::new(ConfiguredStep::new(StepDeclaration::new("AccountStep"))),
            0,
            "register",
            "wizard.steps",
        );

        let saver = step.saver().expect("configured steps carry a save handler");
        let mut data = Document::new();
        data.insert("email".to_string(), serde_json::json!("a@b.c"));
        assert!(saver.save(&data).await.is_ok());
    }
}
