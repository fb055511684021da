//! Data Transfer Objects for the REST API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::cache::Document;
use crate::steps::Step;
use crate::wizard::WizardDefinition;

// =============================================================================
// Wizard DTOs
// =============================================================================

/// Summary response for listing wizards
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WizardSummary {
    pub name: String,
    pub title: String,
    pub step_count: usize,
}

impl WizardSummary {
    pub fn from_definition(definition: &dyn WizardDefinition) -> Self {
        Self {
            name: definition.name(),
            title: definition.title(),
            step_count: definition.steps().len(),
        }
    }
}

/// A wizard with its steps and the caller's progress
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WizardResponse {
    pub name: String,
    pub title: String,
    pub steps: Vec<StepResponse>,
    /// Last processed step index, absent before any progress
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_index: Option<usize>,
    /// Slug of the step the caller should be on
    pub current_step: String,
}

// =============================================================================
// Step DTOs
// =============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StepResponse {
    pub index: usize,
    pub number: usize,
    pub slug: String,
    pub label: String,
    pub view: String,
    /// Field name -> validation rules
    pub rules: BTreeMap<String, Vec<String>>,
}

impl From<&Step> for StepResponse {
    fn from(step: &Step) -> Self {
        Self {
            index: step.index(),
            number: step.number(),
            slug: step.slug().to_string(),
            label: step.label().to_string(),
            view: step.view().to_string(),
            rules: step.rules(&Document::new()),
        }
    }
}

/// Everything needed to render one step's form
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StepFormResponse {
    pub wizard: String,
    pub title: String,
    pub step: StepResponse,
    /// Previously submitted data for this step
    #[schema(value_type = Option<Object>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,
    pub is_last: bool,
}

/// Submitted form fields
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(value_type = Object)]
pub struct StepSubmission(pub Document);

/// Response once the last step has been submitted
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompletedResponse {
    pub wizard: String,
    pub completed: bool,
}

// =============================================================================
// Health DTOs
// =============================================================================

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
