//! OpenAPI specification builder using utoipa.

use utoipa::OpenApi;

use crate::rest::dto::{
    CompletedResponse, HealthResponse, StepFormResponse, StepResponse, StepSubmission,
    WizardResponse, WizardSummary,
};
use crate::rest::error::ErrorResponse;

/// OpenAPI documentation for the formwizard REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Formwizard API",
        description = "Multi-step form wizards: step navigation and cached step data.",
        license(name = "MIT")
    ),
    paths(
        crate::rest::routes::health::health,
        crate::rest::routes::wizards::list,
        crate::rest::routes::wizards::get_one,
        crate::rest::routes::wizards::get_step,
        crate::rest::routes::wizards::submit_step,
        crate::rest::routes::wizards::reset,
    ),
    components(
        schemas(
            // Response types
            HealthResponse,
            WizardSummary,
            WizardResponse,
            StepResponse,
            StepFormResponse,
            CompletedResponse,
            ErrorResponse,
            // Request types
            StepSubmission,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Wizards", description = "Wizard navigation and step submission"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI specification as a JSON string
    pub fn json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
