//! Wizard navigation endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};

use crate::cache::Document;
use crate::rest::caller::Caller;
use crate::rest::dto::{
    CompletedResponse, StepFormResponse, StepResponse, StepSubmission, WizardResponse,
    WizardSummary,
};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;
use crate::steps::Step;
use crate::wizard::Wizard;

/// URL of a step form
pub fn step_location(wizard: &str, slug: &str) -> String {
    format!("/api/v1/wizards/{}/steps/{}", wizard, slug)
}

async fn redirect_to_current(wizard: &Wizard) -> Result<Response, ApiError> {
    let current = wizard.landing_step().await?;
    Ok(Redirect::to(&step_location(&wizard.name(), current.slug())).into_response())
}

/// List hosted wizards
#[utoipa::path(
    get,
    path = "/api/v1/wizards",
    tag = "Wizards",
    responses(
        (status = 200, description = "List of wizards", body = Vec<WizardSummary>)
    )
)]
pub async fn list(State(state): State<ApiState>) -> Json<Vec<WizardSummary>> {
    let wizards = state
        .wizards
        .values()
        .map(|definition| WizardSummary::from_definition(definition.as_ref()))
        .collect();
    Json(wizards)
}

/// Get a wizard with the caller's progress
#[utoipa::path(
    get,
    path = "/api/v1/wizards/{name}",
    tag = "Wizards",
    params(
        ("name" = String, Path, description = "Wizard name")
    ),
    responses(
        (status = 200, description = "Wizard details", body = WizardResponse),
        (status = 404, description = "Wizard not found", body = ErrorResponse)
    )
)]
pub async fn get_one(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    caller: Caller,
) -> Result<Json<WizardResponse>, ApiError> {
    let wizard = state.open_wizard(&name, &caller)?;
    let response = describe(&wizard).await;
    state.close_wizard(wizard, &caller)?;
    Ok(Json(response?))
}

async fn describe(wizard: &Wizard) -> Result<WizardResponse, ApiError> {
    wizard.restart_stale_progress().await?;

    Ok(WizardResponse {
        name: wizard.name(),
        title: wizard.title(),
        steps: wizard.steps().all().map(StepResponse::from).collect(),
        current_index: wizard.current_step_index().await?,
        current_step: wizard.landing_step().await?.slug().to_string(),
    })
}

/// Get the form for one step
#[utoipa::path(
    get,
    path = "/api/v1/wizards/{name}/steps/{slug}",
    tag = "Wizards",
    params(
        ("name" = String, Path, description = "Wizard name"),
        ("slug" = String, Path, description = "Step slug")
    ),
    responses(
        (status = 200, description = "Step form", body = StepFormResponse),
        (status = 303, description = "Redirect to the caller's current step"),
        (status = 404, description = "Wizard or step not found", body = ErrorResponse)
    )
)]
pub async fn get_step(
    State(state): State<ApiState>,
    Path((name, slug)): Path<(String, String)>,
    caller: Caller,
) -> Result<Response, ApiError> {
    let wizard = state.open_wizard(&name, &caller)?;
    let response = step_form(&wizard, &slug).await;
    state.close_wizard(wizard, &caller)?;
    response
}

async fn step_form(wizard: &Wizard, slug: &str) -> Result<Response, ApiError> {
    wizard.restart_stale_progress().await?;

    if wizard.need_redirect_to_correct_step(Some(slug)).await? {
        return redirect_to_current(wizard).await;
    }

    let step = find_step(wizard, slug)?;

    let form = StepFormResponse {
        wizard: wizard.name(),
        title: wizard.title(),
        step: StepResponse::from(step),
        data: wizard.step_data(step.slug(), None).await?,
        prev_step: wizard.steps().prev_slug().await?,
        next_step: wizard.steps().next_slug().await?,
        is_last: wizard.is_last_step().await?,
    };
    Ok(Json(form).into_response())
}

/// Submit one step
#[utoipa::path(
    post,
    path = "/api/v1/wizards/{name}/steps/{slug}",
    tag = "Wizards",
    params(
        ("name" = String, Path, description = "Wizard name"),
        ("slug" = String, Path, description = "Step slug")
    ),
    request_body = StepSubmission,
    responses(
        (status = 200, description = "Wizard completed", body = CompletedResponse),
        (status = 303, description = "Redirect to the next or the current step"),
        (status = 404, description = "Wizard or step not found", body = ErrorResponse)
    )
)]
pub async fn submit_step(
    State(state): State<ApiState>,
    Path((name, slug)): Path<(String, String)>,
    caller: Caller,
    Json(StepSubmission(input)): Json<StepSubmission>,
) -> Result<Response, ApiError> {
    let wizard = state.open_wizard(&name, &caller)?;
    let response = submit(&wizard, &slug, &input).await;
    if matches!(response, Ok(Submitted::Completed)) {
        tracing::info!(wizard = %name, identity = %caller.identity, "wizard finished");
    }
    state.close_wizard(wizard, &caller)?;

    Ok(match response? {
        Submitted::Redirect(location) => Redirect::to(&location).into_response(),
        Submitted::Completed => Json(CompletedResponse {
            wizard: name,
            completed: true,
        })
        .into_response(),
    })
}

/// Outcome of a step submission
enum Submitted {
    Redirect(String),
    Completed,
}

async fn submit(wizard: &Wizard, slug: &str, input: &Document) -> Result<Submitted, ApiError> {
    let name = wizard.name();
    let step = find_step(wizard, slug)?.clone();
    let cached = wizard.steps().has_cache();

    wizard.restart_stale_progress().await?;

    if wizard.need_redirect_to_correct_step(Some(slug)).await? {
        let current = wizard.landing_step().await?;
        return Ok(Submitted::Redirect(step_location(&name, current.slug())));
    }

    // A cached wizard is always entered through its first step
    if cached && !wizard.has_current_step_index().await? {
        let first = wizard.landing_step().await?;
        if first.index() != step.index() {
            tracing::warn!(wizard = %name, requested = slug, "submission before the first step");
            return Ok(Submitted::Redirect(step_location(&name, first.slug())));
        }
        wizard.set_current_step(&step).await?;
    }

    // Without a cache there is no stored progress, so position follows the
    // submitted step.
    let last = if cached {
        wizard.is_last_step().await?
    } else {
        wizard.steps().last().map(Step::index) == Some(step.index())
    };
    wizard.save_step_data(step.slug(), input).await?;

    if last {
        wizard.save_steps_data(input).await?;
        return Ok(Submitted::Completed);
    }

    let next = if cached {
        wizard.landing_step().await?
    } else {
        wizard
            .steps()
            .all()
            .find(|candidate| candidate.index() > step.index())
            .unwrap_or(&step)
    };
    Ok(Submitted::Redirect(step_location(&name, next.slug())))
}

/// Discard the caller's progress
#[utoipa::path(
    delete,
    path = "/api/v1/wizards/{name}",
    tag = "Wizards",
    params(
        ("name" = String, Path, description = "Wizard name")
    ),
    responses(
        (status = 204, description = "Progress cleared"),
        (status = 404, description = "Wizard not found", body = ErrorResponse)
    )
)]
pub async fn reset(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    caller: Caller,
) -> Result<StatusCode, ApiError> {
    let wizard = state.open_wizard(&name, &caller)?;
    let cleared = wizard.steps().clear_cache().await;
    state.close_wizard(wizard, &caller)?;
    cleared?;
    Ok(StatusCode::NO_CONTENT)
}

fn find_step<'a>(wizard: &'a Wizard, slug: &str) -> Result<&'a Step, ApiError> {
    wizard.get_step(slug).ok_or_else(|| {
        ApiError::NotFound(format!("Step '{}' not found in '{}'", slug, wizard.name()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_location() {
        assert_eq!(
            step_location("register", "profile-step"),
            "/api/v1/wizards/register/steps/profile-step"
        );
    }
}
