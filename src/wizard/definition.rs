//! What a wizard declares: its name, title, steps and completion handler.

use async_trait::async_trait;

use crate::cache::Document;
use crate::config::WizardDeclaration;
use crate::naming;
use crate::steps::{ConfiguredStep, StepSource};

#[async_trait]
pub trait WizardDefinition: Send + Sync {
    /// Type tag, e.g. `RegisterWizard`
    fn type_name(&self) -> &str;

    /// Unique wizard name. Also the namespace of its stored data.
    fn name(&self) -> String {
        naming::snake_case(self.type_name())
    }

    fn title(&self) -> String {
        naming::title_from_name(&self.name())
    }

    /// Declared steps, in order
    fn steps(&self) -> Vec<StepSource>;

    /// Persist the aggregate data of a finished wizard. Called right before
    /// the cached data is discarded.
    async fn save_all(&self, _data: &Document) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Wizard declared in configuration.
#[derive(Debug, Clone)]
pub struct ConfiguredWizard {
    declaration: WizardDeclaration,
}

impl ConfiguredWizard {
    pub fn new(declaration: WizardDeclaration) -> Self {
        Self { declaration }
    }

    pub fn declaration(&self) -> &WizardDeclaration {
        &self.declaration
    }
}

#[async_trait]
impl WizardDefinition for ConfiguredWizard {
    fn type_name(&self) -> &str {
        &self.declaration.name
    }

    fn name(&self) -> String {
        self.declaration.name.clone()
    }

    fn title(&self) -> String {
        self.declaration
            .title
            .clone()
            .unwrap_or_else(|| naming::title_from_name(&self.declaration.name))
    }

    fn steps(&self) -> Vec<StepSource> {
        self.declaration
            .steps
            .iter()
            .cloned()
            .map(|step| StepSource::kind(ConfiguredStep::new(step)))
            .collect()
    }

    async fn save_all(&self, data: &Document) -> anyhow::Result<()> {
        tracing::info!(
            wizard = %self.declaration.name,
            steps = data.len(),
            "wizard completed"
        );
        Ok(())
    }
}
